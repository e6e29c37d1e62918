//! Waiting for workers to finish, observed through their completion markers.

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use common::{storage, JobError};
use tokio::time::{sleep, Instant};
use tracing::{debug, info, warn};

/// Poll interval used when none is configured.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(200);

/// Blocks until a set of completion markers exists.
#[async_trait]
pub trait CompletionBarrier: Send + Sync {
    /// Return once every path in `markers` exists, or fail with
    /// [`JobError::Timeout`] after `limit`.
    async fn await_completion(
        &self,
        stage: &str,
        markers: &[PathBuf],
        limit: Duration,
    ) -> Result<(), JobError>;
}

/// Checks the filesystem at a fixed interval.
#[derive(Debug, Clone, Copy)]
pub struct PollingBarrier {
    pub interval: Duration,
}

impl Default for PollingBarrier {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

#[async_trait]
impl CompletionBarrier for PollingBarrier {
    async fn await_completion(
        &self,
        stage: &str,
        markers: &[PathBuf],
        limit: Duration,
    ) -> Result<(), JobError> {
        let started = Instant::now();
        let deadline = started + limit;

        loop {
            let missing: Vec<&PathBuf> = markers.iter().filter(|m| !storage::exists(m)).collect();
            if missing.is_empty() {
                info!(stage, markers = markers.len(), waited = ?started.elapsed(), "barrier passed");
                return Ok(());
            }

            let now = Instant::now();
            if now >= deadline {
                warn!(
                    stage,
                    missing = missing.len(),
                    first_missing = %missing[0].display(),
                    "barrier timed out"
                );
                return Err(JobError::Timeout {
                    stage: stage.to_string(),
                    waited: limit,
                });
            }

            debug!(stage, missing = missing.len(), "waiting for completion markers");
            sleep(self.interval.min(deadline - now)).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn barrier() -> PollingBarrier {
        PollingBarrier {
            interval: Duration::from_millis(10),
        }
    }

    #[tokio::test]
    async fn passes_immediately_when_markers_exist() {
        let dir = tempfile::tempdir().unwrap();
        let marker = dir.path().join("SUCCESS_r0");
        storage::touch(&marker).unwrap();

        barrier()
            .await_completion("reducers", &[marker], Duration::ZERO)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn passes_once_late_marker_appears() {
        let dir = tempfile::tempdir().unwrap();
        let early = dir.path().join("SUCCESS_r0");
        let late = dir.path().join("SUCCESS_r1");
        storage::touch(&early).unwrap();

        let writer = {
            let late = late.clone();
            tokio::spawn(async move {
                sleep(Duration::from_millis(50)).await;
                storage::touch(&late).unwrap();
            })
        };

        barrier()
            .await_completion("reducers", &[early, late], Duration::from_secs(5))
            .await
            .unwrap();
        writer.await.unwrap();
    }

    #[tokio::test]
    async fn expires_with_timeout_error() {
        let dir = tempfile::tempdir().unwrap();
        let never = dir.path().join("SUCCESS_m3");

        let err = barrier()
            .await_completion("mappers", &[never], Duration::from_millis(50))
            .await
            .unwrap_err();

        assert!(matches!(err, JobError::Timeout { ref stage, .. } if stage == "mappers"), "{err}");
    }

    #[tokio::test]
    async fn empty_marker_set_passes() {
        barrier()
            .await_completion("nothing", &[], Duration::ZERO)
            .await
            .unwrap();
    }
}
