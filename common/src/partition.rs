//! Routing of words to reducer buckets and of input files to mappers.
//!
//! The bucket hash is shared by every process of a job, possibly on
//! different hosts, so it must never depend on a per-process seed.

use std::hash::Hasher;
use std::path::PathBuf;

use crate::job::Manifest;

/// Hashes an intermediate key. Compute a reduce bucket for a given key
/// by calculating `ihash(key) % n_reduce`.
///
/// This is 64-bit FNV-1a over the raw bytes, truncated to 31 bits.
pub fn ihash(key: &[u8]) -> u32 {
    let mut hasher = fnv::FnvHasher::default();
    hasher.write(key);
    (hasher.finish() & 0x7fff_ffff) as u32
}

/// Bucket (reducer id) that owns `word`.
///
/// # Panics
///
/// Panics if `num_reducers` is zero. Job configuration rejects that value
/// before any word is routed.
pub fn assign_bucket(word: &str, num_reducers: u32) -> u32 {
    assert!(num_reducers > 0, "num_reducers must be positive");
    ihash(word.as_bytes()) % num_reducers
}

/// Deal input files to `num_mappers` manifests round-robin by index,
/// keeping input order inside each manifest.
///
/// Always returns exactly `num_mappers` manifests; some may be empty when
/// there are fewer files than mappers.
pub fn assign_files(files: &[PathBuf], num_mappers: u32) -> Vec<Manifest> {
    let mut manifests: Vec<Manifest> = (0..num_mappers).map(Manifest::empty).collect();
    if manifests.is_empty() {
        return manifests;
    }

    for (index, file) in files.iter().enumerate() {
        let slot = index % manifests.len();
        manifests[slot].files.push(file.clone());
    }
    manifests
}
