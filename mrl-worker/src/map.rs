use std::collections::HashMap;
use std::io;
use std::path::PathBuf;

use anyhow::{Context, Error};
use common::job::Manifest;
use common::utils::format_count_line;
use common::{assign_bucket, layout, storage, JobError, Workload};
use tracing::{debug, info};

/// Buffered entries across all buckets before the mapper appends them to disk.
pub const DEFAULT_FLUSH_THRESHOLD: usize = 1000;

#[derive(Debug, Clone)]
pub struct MapperConfig {
    pub mapper_id: u32,
    pub num_reducers: u32,
    pub manifest: PathBuf,
    pub temp_dir: PathBuf,
    pub flush_threshold: usize,
}

/// What one map task did.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct MapStats {
    pub files: usize,
    pub lines: usize,
    pub emitted: u64,
    pub flushes: usize,
}

/// Reads the files of one manifest and partitions every emitted word into
/// `m<id>_r<bucket>.txt`.
///
/// Counts are combined in memory per bucket and appended to disk whenever the
/// number of buffered entries reaches the flush threshold, so one word may
/// appear on several rows of the same intermediate file.
pub struct Mapper {
    config: MapperConfig,
    workload: Workload,
    buffers: Vec<HashMap<String, u64>>,
    buffered: usize,
    stats: MapStats,
}

impl Mapper {
    pub fn new(config: MapperConfig, workload: Workload) -> Self {
        let buffers = (0..config.num_reducers).map(|_| HashMap::new()).collect();
        Self {
            config,
            workload,
            buffers,
            buffered: 0,
            stats: MapStats::default(),
        }
    }

    /// Run the whole task: reset owned outputs, map every input line, flush
    /// what is left, then write `SUCCESS_m<id>`.
    pub fn run(mut self) -> Result<MapStats, Error> {
        let id = self.config.mapper_id;
        if self.config.num_reducers == 0 {
            return Err(JobError::Config("a mapper needs at least one reducer".into()).into());
        }

        let manifest = Manifest::read_from(&self.config.manifest, id)
            .with_context(|| format!("mapper {id}: cannot load manifest"))?;
        info!(
            mapper_id = id,
            files = manifest.files.len(),
            "starting map task"
        );

        self.reset_outputs()
            .with_context(|| format!("mapper {id}: cannot clear previous outputs"))?;

        for file in &manifest.files {
            if !storage::exists(file) {
                return Err(JobError::MissingArtifact { path: file.clone() }.into());
            }
            let lines = storage::read_lines(file)
                .with_context(|| format!("mapper {id}: cannot read {}", file.display()))?;
            debug!(mapper_id = id, file = %file.display(), lines = lines.len(), "mapping file");
            for line in &lines {
                self.map_line(line)?;
            }
            self.stats.files += 1;
        }

        self.flush()
            .with_context(|| format!("mapper {id}: final flush failed"))?;
        storage::touch(&layout::mapper_marker_path(&self.config.temp_dir, id))?;

        info!(mapper_id = id, stats = ?self.stats, "map task finished");
        Ok(self.stats)
    }

    /// Feed one line through the map function.
    pub fn map_line(&mut self, line: &str) -> io::Result<()> {
        let map_fn = self.workload.map_fn;
        let mut emitted = Vec::new();
        map_fn(line, &mut |word, count| emitted.push((word.to_string(), count)));

        self.stats.lines += 1;
        for (word, count) in emitted {
            self.buffer(word, count)?;
        }
        Ok(())
    }

    fn buffer(&mut self, word: String, count: u64) -> io::Result<()> {
        let bucket = assign_bucket(&word, self.config.num_reducers) as usize;
        self.stats.emitted += count;

        match self.buffers[bucket].get_mut(&word) {
            Some(total) => *total += count,
            None => {
                self.buffers[bucket].insert(word, count);
                self.buffered += 1;
            }
        }

        if self.buffered >= self.config.flush_threshold.max(1) {
            self.flush()?;
        }
        Ok(())
    }

    /// Append every buffered entry to its bucket file and empty the buffers.
    pub fn flush(&mut self) -> io::Result<()> {
        if self.buffered == 0 {
            return Ok(());
        }

        for (bucket, buffer) in self.buffers.iter_mut().enumerate() {
            if buffer.is_empty() {
                continue;
            }
            let mut rows: Vec<(String, u64)> = buffer.drain().collect();
            rows.sort_unstable();
            let path = layout::intermediate_path(&self.config.temp_dir, self.config.mapper_id, bucket as u32);
            storage::append_lines(&path, rows.iter().map(|(word, count)| format_count_line(word, *count)))?;
        }

        debug!(mapper_id = self.config.mapper_id, entries = self.buffered, "flushed buffers");
        self.buffered = 0;
        self.stats.flushes += 1;
        Ok(())
    }

    /// Remove this mapper's intermediates and marker from an earlier attempt.
    /// Other mappers' files are never touched.
    fn reset_outputs(&self) -> io::Result<()> {
        let temp_dir = &self.config.temp_dir;
        let id = self.config.mapper_id;
        storage::remove_if_exists(&layout::mapper_marker_path(temp_dir, id))?;
        for bucket in 0..self.config.num_reducers {
            storage::remove_if_exists(&layout::intermediate_path(temp_dir, id, bucket))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::Path;

    use super::*;

    fn config(temp_dir: &Path, mapper_id: u32, num_reducers: u32, flush_threshold: usize) -> MapperConfig {
        MapperConfig {
            mapper_id,
            num_reducers,
            manifest: layout::manifest_path(temp_dir, mapper_id),
            temp_dir: temp_dir.to_path_buf(),
            flush_threshold,
        }
    }

    fn write_inputs(dir: &Path, mapper_id: u32, inputs: &[(&str, &str)]) {
        let files = inputs
            .iter()
            .map(|(name, contents)| {
                let path = dir.join(name);
                fs::write(&path, contents).unwrap();
                path
            })
            .collect();
        Manifest { mapper_id, files }.write_to(dir).unwrap();
    }

    fn rows(path: &Path) -> Vec<String> {
        let mut rows: Vec<String> = fs::read_to_string(path)
            .unwrap()
            .lines()
            .map(str::to_string)
            .collect();
        rows.sort();
        rows
    }

    #[test]
    fn words_land_in_their_bucket() {
        let dir = tempfile::tempdir().unwrap();
        write_inputs(dir.path(), 0, &[("a.txt", "The cat sat\n"), ("b.txt", "the dog sat\n")]);

        let stats = Mapper::new(config(dir.path(), 0, 2, 1000), workload::named("wc").unwrap())
            .run()
            .unwrap();

        assert_eq!(rows(&dir.path().join("m0_r0.txt")), vec!["the\t2"]);
        assert_eq!(
            rows(&dir.path().join("m0_r1.txt")),
            vec!["cat\t1", "dog\t1", "sat\t2"]
        );
        assert!(dir.path().join("SUCCESS_m0").exists());
        assert_eq!(stats.files, 2);
        assert_eq!(stats.lines, 2);
        assert_eq!(stats.emitted, 6);
    }

    #[test]
    fn small_threshold_splits_counts_across_flushes() {
        let dir = tempfile::tempdir().unwrap();
        write_inputs(dir.path(), 1, &[("a.txt", "a b\na b\na\n")]);

        let stats = Mapper::new(config(dir.path(), 1, 1, 2), workload::named("wc").unwrap())
            .run()
            .unwrap();

        let rows = rows(&dir.path().join("m1_r0.txt"));
        assert_eq!(rows, vec!["a\t1", "a\t1", "a\t1", "b\t1", "b\t1"]);
        assert!(stats.flushes >= 2);

        let total: u64 = rows
            .iter()
            .map(|row| common::utils::parse_count_line(row).unwrap().1)
            .sum();
        assert_eq!(total, stats.emitted);
    }

    #[test]
    fn rerun_replaces_only_own_outputs() {
        let dir = tempfile::tempdir().unwrap();
        write_inputs(dir.path(), 0, &[("a.txt", "cat\n")]);
        fs::write(dir.path().join("m0_r0.txt"), "stale\t99\n").unwrap();
        fs::write(dir.path().join("m1_r0.txt"), "other\t1\n").unwrap();

        let mapper = || Mapper::new(config(dir.path(), 0, 1, 1000), workload::named("wc").unwrap());
        mapper().run().unwrap();
        mapper().run().unwrap();

        assert_eq!(rows(&dir.path().join("m0_r0.txt")), vec!["cat\t1"]);
        assert_eq!(rows(&dir.path().join("m1_r0.txt")), vec!["other\t1"]);
    }

    #[test]
    fn empty_manifest_still_completes() {
        let dir = tempfile::tempdir().unwrap();
        write_inputs(dir.path(), 2, &[]);

        let stats = Mapper::new(config(dir.path(), 2, 3, 1000), workload::named("wc").unwrap())
            .run()
            .unwrap();

        assert_eq!(stats, MapStats::default());
        assert!(dir.path().join("SUCCESS_m2").exists());
        assert!(!dir.path().join("m2_r0.txt").exists());
    }

    #[test]
    fn missing_manifest_or_input_fails_without_marker() {
        let dir = tempfile::tempdir().unwrap();
        let err = Mapper::new(config(dir.path(), 0, 1, 1000), workload::named("wc").unwrap())
            .run()
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<JobError>(),
            Some(JobError::MissingArtifact { .. })
        ));

        Manifest {
            mapper_id: 0,
            files: vec![dir.path().join("gone.txt")],
        }
        .write_to(dir.path())
        .unwrap();
        let err = Mapper::new(config(dir.path(), 0, 1, 1000), workload::named("wc").unwrap())
            .run()
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<JobError>(),
            Some(JobError::MissingArtifact { path }) if path.ends_with("gone.txt")
        ));
        assert!(!dir.path().join("SUCCESS_m0").exists());
    }
}
