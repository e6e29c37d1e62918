//! The small filesystem contract every component relies on.
//!
//! The shared directories may be a network mount seen by several hosts;
//! nothing here assumes more than regular files and directories.

use std::fs::{self, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

/// Regular files directly inside `dir`, sorted by path.
pub fn list_regular_files(dir: &Path) -> io::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in WalkDir::new(dir).min_depth(1).max_depth(1) {
        let entry = entry.map_err(io::Error::from)?;
        if entry.file_type().is_file() {
            files.push(entry.into_path());
        }
    }
    files.sort();
    Ok(files)
}

/// Job inputs: regular files directly inside `dir` whose extension is
/// `.txt` or absent, sorted by path.
pub fn list_input_files(dir: &Path) -> io::Result<Vec<PathBuf>> {
    let mut files = list_regular_files(dir)?;
    files.retain(|path| match path.extension() {
        None => true,
        Some(ext) => ext == "txt",
    });
    Ok(files)
}

/// Every line of `path`, with `\n` and a trailing `\r` removed.
pub fn read_lines(path: &Path) -> io::Result<Vec<String>> {
    let contents = fs::read(path)?;
    let text = String::from_utf8_lossy(&contents);
    Ok(text
        .lines()
        .map(|line| line.strip_suffix('\r').unwrap_or(line).to_string())
        .collect())
}

/// Append `line` plus a newline, creating the file if needed.
pub fn append_line(path: &Path, line: &str) -> io::Result<()> {
    append_lines(path, std::iter::once(line))
}

/// Append several lines through one open handle.
pub fn append_lines<I, S>(path: &Path, lines: I) -> io::Result<()>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let file = OpenOptions::new().create(true).append(true).open(path)?;
    let mut writer = BufWriter::new(file);
    for line in lines {
        writer.write_all(line.as_ref().as_bytes())?;
        writer.write_all(b"\n")?;
    }
    writer.flush()
}

/// Replace the contents of `path` with `contents`.
pub fn write_all(path: &Path, contents: &str) -> io::Result<()> {
    fs::write(path, contents)
}

/// Create `path` and any missing parents.
pub fn ensure_dir(path: &Path) -> io::Result<()> {
    fs::create_dir_all(path)
}

pub fn exists(path: &Path) -> bool {
    path.exists()
}

/// Create an empty completion marker.
pub fn touch(path: &Path) -> io::Result<()> {
    write_all(path, "")
}

/// Remove `path` if it is there.
pub fn remove_if_exists(path: &Path) -> io::Result<()> {
    match fs::remove_file(path) {
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
        other => other,
    }
}
