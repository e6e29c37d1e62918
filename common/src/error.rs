use std::io;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::codec::ErrorReason;
use crate::job::Endpoint;
use crate::Role;

/// Failures that stop forward progress of a job or of one worker.
///
/// Malformed data rows are not represented here; they are skipped where
/// they are read.
#[derive(Error, Debug)]
pub enum JobError {
    #[error("stub {endpoint} unreachable: {source}")]
    StubUnreachable {
        endpoint: Endpoint,
        #[source]
        source: io::Error,
    },

    #[error("stub {endpoint} rejected {role} {id}: {reason}")]
    SpawnRejected {
        endpoint: Endpoint,
        role: Role,
        id: u32,
        reason: ErrorReason,
    },

    #[error("unexpected reply from {endpoint}: `{reply}`")]
    UnexpectedReply { endpoint: Endpoint, reply: String },

    #[error("controller {endpoint} unreachable: {source}")]
    ControllerUnreachable {
        endpoint: Endpoint,
        #[source]
        source: io::Error,
    },

    #[error("handshake for {role} {id} failed: {detail}")]
    Handshake { role: Role, id: u32, detail: String },

    #[error("missing artifact {}", path.display())]
    MissingArtifact { path: PathBuf },

    #[error("timed out after {waited:?} waiting for {stage}")]
    Timeout { stage: String, waited: Duration },

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}
