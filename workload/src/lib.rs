//! Converts MapReduce application names to actual application code.
//!
//! # Example
//!
//! ```
//! # use anyhow::Result;
//! # fn main() -> Result<()> {
//! let wc = workload::named("wc")?;
//! let mut words = Vec::new();
//! (wc.map_fn)("The cat", &mut |word, count| words.push((word.to_string(), count)));
//! assert_eq!(words, vec![("the".to_string(), 1), ("cat".to_string(), 1)]);
//! # Ok(())
//! # }
//! ```

use anyhow::{bail, Result};
use common::Workload;

pub mod wc;

/// Name of the workload workers run when none is given.
pub const DEFAULT_WORKLOAD: &str = "wc";

/// Gets the [`Workload`] named `name`.
///
/// Returns [`None`] if no application with the given name was found.
pub fn try_named(name: &str) -> Option<Workload> {
    match name {
        "wc" => Some(Workload {
            map_fn: wc::map,
            reduce_fn: wc::reduce,
        }),
        _ => None,
    }
}

/// Gets the [`Workload`] named `name`.
///
/// Returns an [`anyhow::Error`] if no application with the given name was found.
pub fn named(name: &str) -> Result<Workload> {
    match try_named(name) {
        Some(app) => Ok(app),
        None => bail!("No app named `{}` found.", name),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_word_count_is_registered() {
        assert!(try_named("wc").is_some());
        assert!(try_named("grep").is_none());
        assert!(named("vertex-degree").is_err());
    }
}
