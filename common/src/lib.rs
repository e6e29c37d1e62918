//! Shared pieces of the word-count control plane.
//!
//! A controller partitions the input, asks per-host stubs to launch mapper
//! and reducer processes, admits those workers over a line-oriented TCP
//! protocol, and merges their outputs. Every process in a job links this
//! crate so that bucket assignment, file naming and the wire format agree.

use std::fmt;
use std::str::FromStr;

pub mod aggregate;
pub mod codec;
pub mod error;
pub mod job;
pub mod layout;
pub mod net;
pub mod partition;
pub mod storage;
pub mod utils;

pub use error::JobError;
pub use partition::{assign_bucket, assign_files, ihash};

/////////////////////////////////////////////////////////////////////////////
// MapReduce application types
/////////////////////////////////////////////////////////////////////////////

/// A map function takes one input line and emits `(key, count)` pairs
/// through `emit`.
pub type MapFn = fn(line: &str, emit: &mut dyn FnMut(&str, u64));

/// A reduce function folds every partial count seen for `key` into a
/// single total.
pub type ReduceFn = fn(key: &str, values: Box<dyn Iterator<Item = u64> + '_>) -> u64;

/// A map reduce application.
#[derive(Copy, Clone)]
pub struct Workload {
    pub map_fn: MapFn,
    pub reduce_fn: ReduceFn,
}

impl fmt::Debug for Workload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Workload").finish_non_exhaustive()
    }
}

/////////////////////////////////////////////////////////////////////////////
// Worker roles
/////////////////////////////////////////////////////////////////////////////

/// The phase a worker process performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Role {
    Map,
    Reduce,
}

impl Role {
    /// Token used on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Map => "MAP",
            Role::Reduce => "REDUCE",
        }
    }

    /// Name of the worker executable a stub launches for this role,
    /// without the platform suffix.
    pub fn worker_program(&self) -> &'static str {
        match self {
            Role::Map => "mapper-worker",
            Role::Reduce => "reducer-worker",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = JobError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "MAP" => Ok(Role::Map),
            "REDUCE" => Ok(Role::Reduce),
            other => Err(JobError::Config(format!("unknown role `{other}`"))),
        }
    }
}
