use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Error};
use common::utils::{format_count_line, parse_count_line};
use common::{layout, storage, JobError, Workload};
use glob::Pattern;
use tracing::{debug, info, warn};

#[derive(Debug, Clone)]
pub struct ReducerConfig {
    pub reducer_id: u32,
    pub temp_dir: PathBuf,
    pub output_dir: PathBuf,

    /// When set, every `SUCCESS_m<i>` for `i < num_mappers` must exist and
    /// intermediates of mappers `>= num_mappers` are left out.
    pub num_mappers: Option<u32>,

    pub output_suffix: String,
}

impl ReducerConfig {
    pub fn new(reducer_id: u32, temp_dir: impl Into<PathBuf>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            reducer_id,
            temp_dir: temp_dir.into(),
            output_dir: output_dir.into(),
            num_mappers: None,
            output_suffix: layout::reducer_suffix(reducer_id),
        }
    }

    pub fn output_path(&self) -> PathBuf {
        layout::reducer_output_path(&self.output_dir, &self.output_suffix)
    }

    pub fn marker_path(&self) -> PathBuf {
        layout::reducer_marker_path(&self.output_dir, &self.output_suffix)
    }
}

/// What one reduce task did.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ReduceStats {
    pub inputs: usize,
    pub rows: usize,
    pub skipped_rows: usize,
    pub words: usize,
}

/// Folds every `m*_r<id>.txt` into one `word<TAB>count` row per word.
pub struct Reducer {
    config: ReducerConfig,
    workload: Workload,
}

impl Reducer {
    pub fn new(config: ReducerConfig, workload: Workload) -> Self {
        Self { config, workload }
    }

    pub fn run(&self) -> Result<ReduceStats, Error> {
        let id = self.config.reducer_id;
        let output = self.config.output_path();
        let marker = self.config.marker_path();

        storage::ensure_dir(&self.config.output_dir)?;
        storage::remove_if_exists(&marker)?;
        storage::write_all(&output, "")
            .with_context(|| format!("reducer {id}: cannot truncate {}", output.display()))?;

        self.check_mapper_markers()?;
        let inputs = self.collect_inputs()?;
        info!(reducer_id = id, inputs = inputs.len(), "starting reduce task");

        let mut stats = ReduceStats {
            inputs: inputs.len(),
            ..ReduceStats::default()
        };
        let mut grouped: BTreeMap<String, Vec<u64>> = BTreeMap::new();
        for path in &inputs {
            let lines = storage::read_lines(path)
                .with_context(|| format!("reducer {id}: cannot read {}", path.display()))?;
            for line in lines.iter().filter(|line| !line.is_empty()) {
                match parse_count_line(line) {
                    Some((word, count)) => {
                        grouped.entry(word.to_string()).or_default().push(count);
                        stats.rows += 1;
                    }
                    None => {
                        debug!(reducer_id = id, file = %path.display(), %line, "skipping malformed row");
                        stats.skipped_rows += 1;
                    }
                }
            }
        }
        if stats.skipped_rows > 0 {
            warn!(reducer_id = id, skipped = stats.skipped_rows, "intermediate files contained malformed rows");
        }

        let reduce_fn = self.workload.reduce_fn;
        let mut contents = String::new();
        for (word, counts) in &grouped {
            let total = reduce_fn(word, Box::new(counts.iter().copied()));
            contents.push_str(&format_count_line(word, total));
            contents.push('\n');
        }
        stats.words = grouped.len();

        storage::write_all(&output, &contents)
            .with_context(|| format!("reducer {id}: cannot write {}", output.display()))?;
        storage::touch(&marker)?;

        info!(reducer_id = id, stats = ?stats, output = %output.display(), "reduce task finished");
        Ok(stats)
    }

    /// Intermediate files of this reducer's bucket, sorted by path.
    pub fn collect_inputs(&self) -> Result<Vec<PathBuf>, Error> {
        let id = self.config.reducer_id;
        let pattern = bucket_pattern(&self.config.temp_dir, id);

        let mut inputs = Vec::new();
        for entry in glob::glob(&pattern).with_context(|| format!("bad glob pattern `{pattern}`"))? {
            let path = entry?;
            let Some(name) = path.file_name().and_then(|name| name.to_str()) else {
                continue;
            };
            let Some((mapper_id, bucket)) = layout::parse_intermediate_name(name) else {
                continue;
            };
            if bucket != id {
                continue;
            }
            if let Some(num_mappers) = self.config.num_mappers {
                if mapper_id >= num_mappers {
                    warn!(reducer_id = id, file = %path.display(), "ignoring intermediate of unknown mapper");
                    continue;
                }
            }
            inputs.push(path);
        }
        inputs.sort();
        Ok(inputs)
    }

    fn check_mapper_markers(&self) -> Result<(), JobError> {
        let Some(num_mappers) = self.config.num_mappers else {
            return Ok(());
        };
        for mapper_id in 0..num_mappers {
            let marker = layout::mapper_marker_path(&self.config.temp_dir, mapper_id);
            if !storage::exists(&marker) {
                return Err(JobError::MissingArtifact { path: marker });
            }
        }
        Ok(())
    }
}

fn bucket_pattern(temp_dir: &Path, bucket: u32) -> String {
    let dir = Pattern::escape(&temp_dir.to_string_lossy());
    Path::new(&dir)
        .join(format!("m*_r{bucket}.txt"))
        .to_string_lossy()
        .into_owned()
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    fn reducer(config: ReducerConfig) -> Reducer {
        Reducer::new(config, workload::named("wc").unwrap())
    }

    #[test]
    fn sums_partials_across_mappers_and_flushes() {
        let tmp = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        fs::write(tmp.path().join("m0_r1.txt"), "sat\t1\ncat\t1\nsat\t1\n").unwrap();
        fs::write(tmp.path().join("m1_r1.txt"), "dog\t1\nsat\t1\n").unwrap();
        fs::write(tmp.path().join("m1_r0.txt"), "the\t2\n").unwrap();
        fs::write(tmp.path().join("m11_r1.txt"), "cat\t4\n").unwrap();

        let config = ReducerConfig::new(1, tmp.path(), out.path());
        let stats = reducer(config.clone()).run().unwrap();

        assert_eq!(
            fs::read_to_string(config.output_path()).unwrap(),
            "cat\t5\ndog\t1\nsat\t3\n"
        );
        assert!(out.path().join("SUCCESS_r1").exists());
        assert_eq!(stats.inputs, 3);
        assert_eq!(stats.words, 3);
    }

    #[test]
    fn no_intermediates_gives_empty_output_and_marker() {
        let tmp = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();

        let config = ReducerConfig::new(0, tmp.path(), out.path());
        reducer(config.clone()).run().unwrap();

        assert_eq!(fs::read_to_string(config.output_path()).unwrap(), "");
        assert!(config.marker_path().exists());
    }

    #[test]
    fn malformed_rows_are_skipped() {
        let tmp = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        fs::write(tmp.path().join("m0_r0.txt"), "ok\t2\nnocount\n\t3\nbad\tx\nok 1\n").unwrap();

        let config = ReducerConfig::new(0, tmp.path(), out.path());
        let stats = reducer(config.clone()).run().unwrap();

        assert_eq!(fs::read_to_string(config.output_path()).unwrap(), "ok\t3\n");
        assert_eq!(stats.skipped_rows, 3);
    }

    #[test]
    fn waits_for_every_mapper_marker() {
        let tmp = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        fs::write(tmp.path().join("m0_r0.txt"), "a\t1\n").unwrap();
        storage::touch(&layout::mapper_marker_path(tmp.path(), 0)).unwrap();

        let mut config = ReducerConfig::new(0, tmp.path(), out.path());
        config.num_mappers = Some(2);
        let err = reducer(config.clone()).run().unwrap_err();

        assert!(matches!(
            err.downcast_ref::<JobError>(),
            Some(JobError::MissingArtifact { path }) if path.ends_with("SUCCESS_m1")
        ));
        assert!(!config.marker_path().exists());
    }

    #[test]
    fn stale_mapper_ids_are_ignored_when_count_is_known() {
        let tmp = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        fs::write(tmp.path().join("m0_r0.txt"), "a\t1\n").unwrap();
        fs::write(tmp.path().join("m5_r0.txt"), "a\t100\n").unwrap();
        storage::touch(&layout::mapper_marker_path(tmp.path(), 0)).unwrap();

        let mut config = ReducerConfig::new(0, tmp.path(), out.path());
        config.num_mappers = Some(1);
        reducer(config.clone()).run().unwrap();

        assert_eq!(fs::read_to_string(config.output_path()).unwrap(), "a\t1\n");
    }

    #[test]
    fn temp_dir_with_glob_characters() {
        let root = tempfile::tempdir().unwrap();
        let tmp = root.path().join("job[1]");
        fs::create_dir(&tmp).unwrap();
        fs::write(tmp.join("m0_r0.txt"), "a\t1\n").unwrap();

        let config = ReducerConfig::new(0, &tmp, root.path().join("out"));
        let inputs = reducer(config).collect_inputs().unwrap();

        assert_eq!(inputs, vec![tmp.join("m0_r0.txt")]);
    }

    #[test]
    fn custom_suffix_names_output_and_marker() {
        let tmp = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        fs::write(out.path().join("word_counts_retry.txt"), "old\t9\n").unwrap();

        let mut config = ReducerConfig::new(0, tmp.path(), out.path());
        config.output_suffix = "retry".to_string();
        reducer(config).run().unwrap();

        assert_eq!(fs::read_to_string(out.path().join("word_counts_retry.txt")).unwrap(), "");
        assert!(out.path().join("SUCCESS_retry").exists());
        assert!(!out.path().join("SUCCESS_r0").exists());
    }
}
