//! Merge of per-reducer outputs into the final, sorted word table.

use std::collections::BTreeMap;
use std::path::PathBuf;

use tracing::{debug, info, warn};

use crate::error::JobError;
use crate::utils::{format_count_line, parse_count_line};
use crate::{layout, storage};

/// Outcome of a merge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeSummary {
    /// Where the merged table was written.
    pub output: PathBuf,

    /// Number of distinct words.
    pub words: usize,

    /// Sum of every count.
    pub total: u64,

    /// Rows skipped because they did not parse.
    pub skipped_rows: usize,
}

/// Merges `word_counts_r<id>.txt` for `0..num_reducers` into
/// `word_counts.txt` inside `output_dir`.
#[derive(Debug, Clone)]
pub struct Aggregator {
    output_dir: PathBuf,
    num_reducers: u32,
}

impl Aggregator {
    pub fn new(output_dir: impl Into<PathBuf>, num_reducers: u32) -> Self {
        Self {
            output_dir: output_dir.into(),
            num_reducers,
        }
    }

    /// Read every reducer output, sum per word, and write the table sorted
    /// by word, replacing any earlier merged output.
    ///
    /// Refuses to merge unless every reducer's completion marker and output
    /// file are present.
    pub fn merge(&self) -> Result<MergeSummary, JobError> {
        self.check_markers()?;

        let mut totals: BTreeMap<String, u64> = BTreeMap::new();
        let mut skipped_rows = 0;

        for reducer_id in 0..self.num_reducers {
            let path = self.reducer_output(reducer_id);
            if !storage::exists(&path) {
                return Err(JobError::MissingArtifact { path });
            }

            for line in storage::read_lines(&path)? {
                if line.is_empty() {
                    continue;
                }
                match parse_count_line(&line) {
                    Some((word, count)) => *totals.entry(word.to_string()).or_insert(0) += count,
                    None => {
                        debug!(reducer_id, line = %line, "skipping malformed row");
                        skipped_rows += 1;
                    }
                }
            }
        }

        if skipped_rows > 0 {
            warn!(skipped_rows, "reducer outputs contained malformed rows");
        }

        let mut contents = String::new();
        for (word, count) in &totals {
            contents.push_str(&format_count_line(word, *count));
            contents.push('\n');
        }

        let output = layout::merged_output_path(&self.output_dir);
        storage::write_all(&output, &contents)?;

        let summary = MergeSummary {
            output,
            words: totals.len(),
            total: totals.values().sum(),
            skipped_rows,
        };
        info!(
            words = summary.words,
            total = summary.total,
            output = %summary.output.display(),
            "merged reducer outputs"
        );
        Ok(summary)
    }

    fn check_markers(&self) -> Result<(), JobError> {
        for reducer_id in 0..self.num_reducers {
            let marker =
                layout::reducer_marker_path(&self.output_dir, &layout::reducer_suffix(reducer_id));
            if !storage::exists(&marker) {
                return Err(JobError::MissingArtifact { path: marker });
            }
        }
        Ok(())
    }

    fn reducer_output(&self, reducer_id: u32) -> PathBuf {
        layout::reducer_output_path(&self.output_dir, &layout::reducer_suffix(reducer_id))
    }
}
