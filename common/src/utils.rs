//! Helpers for the `word<TAB>count` rows shared by intermediate files,
//! reducer outputs and the merged output.

/// Parse `word\tcount`, or `word count` when there is no tab.
///
/// Returns `None` for blank lines, an empty word, or a count that is not a
/// non-negative integer. Callers skip such rows.
pub fn parse_count_line(line: &str) -> Option<(&str, u64)> {
    let line = line.strip_suffix('\r').unwrap_or(line);
    let (word, count) = line.split_once('\t').or_else(|| line.split_once(' '))?;
    if word.is_empty() {
        return None;
    }
    let count = count.trim().parse().ok()?;
    Some((word, count))
}

/// Render one output row, without the trailing newline.
#[inline]
pub fn format_count_line(word: &str, count: u64) -> String {
    format!("{word}\t{count}")
}
