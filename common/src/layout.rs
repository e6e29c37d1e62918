//! Names of every file a job produces. Workers on other hosts reconstruct
//! these paths independently, so the formats here are fixed.

use std::path::{Path, PathBuf};

/// `<temp_dir>/mapper_input_<mapper_id>.txt`
pub fn manifest_path(temp_dir: &Path, mapper_id: u32) -> PathBuf {
    temp_dir.join(format!("mapper_input_{mapper_id}.txt"))
}

/// `<temp_dir>/m<mapper_id>_r<bucket>.txt`
pub fn intermediate_path(temp_dir: &Path, mapper_id: u32, bucket: u32) -> PathBuf {
    temp_dir.join(format!("m{mapper_id}_r{bucket}.txt"))
}

/// Recover `(mapper_id, bucket)` from an intermediate file name.
pub fn parse_intermediate_name(file_name: &str) -> Option<(u32, u32)> {
    let stem = file_name.strip_prefix('m')?.strip_suffix(".txt")?;
    let (mapper, bucket) = stem.split_once("_r")?;
    Some((parse_id(mapper)?, parse_id(bucket)?))
}

fn parse_id(s: &str) -> Option<u32> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}

/// `<temp_dir>/SUCCESS_m<mapper_id>`, written once a mapper's last flush is done.
pub fn mapper_marker_path(temp_dir: &Path, mapper_id: u32) -> PathBuf {
    temp_dir.join(format!("SUCCESS_m{mapper_id}"))
}

/// Default output suffix of a reducer.
pub fn reducer_suffix(reducer_id: u32) -> String {
    format!("r{reducer_id}")
}

/// `<output_dir>/word_counts_<suffix>.txt`
pub fn reducer_output_path(output_dir: &Path, suffix: &str) -> PathBuf {
    output_dir.join(format!("word_counts_{suffix}.txt"))
}

/// `<output_dir>/SUCCESS_<suffix>`
pub fn reducer_marker_path(output_dir: &Path, suffix: &str) -> PathBuf {
    output_dir.join(format!("SUCCESS_{suffix}"))
}

/// `<output_dir>/word_counts.txt`
pub fn merged_output_path(output_dir: &Path) -> PathBuf {
    output_dir.join("word_counts.txt")
}

/// `<output_dir>/SUCCESS`
pub fn job_marker_path(output_dir: &Path) -> PathBuf {
    output_dir.join("SUCCESS")
}
