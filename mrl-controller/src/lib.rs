//! The job controller: partitions input, has stubs launch workers, admits
//! those workers, waits for their markers and merges their outputs.

pub mod args;
pub mod barrier;
pub mod core;
pub mod dispatch;
pub mod rendezvous;
pub mod worker_info;
pub mod worker_registry;

pub use crate::core::{Controller, ControllerSettings, JobSummary};
