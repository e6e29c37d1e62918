//! Per-host launcher agent.
//!
//! A stub listens for `SPAWN` requests from the controller, starts the
//! matching worker executable from its bin directory and replies at once.

pub mod args;
pub mod core;
pub mod spawn;

pub use crate::core::{Invocation, Stub, StubConfig};
pub use spawn::{ProcessSpawner, Spawner};
