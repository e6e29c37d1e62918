//! A MapReduce-compatible implementation of word count.
//!
//! Text is lowercased and every non-letter is treated as whitespace, so
//! `"Don't stop!"` yields `don`, `t`, `stop`.

/// Emit `(word, 1)` for every word of `line`.
pub fn map(line: &str, emit: &mut dyn FnMut(&str, u64)) {
    for word in line
        .split(|c: char| !c.is_alphabetic())
        .filter(|s| !s.is_empty())
    {
        emit(&word.to_lowercase(), 1);
    }
}

pub fn reduce(_key: &str, values: Box<dyn Iterator<Item = u64> + '_>) -> u64 {
    values.sum()
}
