//! Process creation, kept behind a trait so the stub's dispatch logic does
//! not depend on how (or whether) a real process is started.

use std::io;
use std::path::Path;
use std::process::Stdio;

use tokio::process::Command;
use tracing::{info, warn};

/// Starts a worker and returns its process id without waiting for it.
pub trait Spawner: Send + Sync {
    fn spawn(&self, program: &Path, args: &[String]) -> io::Result<u32>;
}

/// Launches a detached OS process.
///
/// The child inherits stdout/stderr so worker logs land next to the stub's.
/// A background task reaps it and logs how it exited, so this must be
/// called from inside a tokio runtime.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessSpawner;

impl Spawner for ProcessSpawner {
    fn spawn(&self, program: &Path, args: &[String]) -> io::Result<u32> {
        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .spawn()?;

        let pid = child.id().ok_or_else(|| {
            io::Error::new(io::ErrorKind::Other, "child exited before its pid was read")
        })?;

        let program = program.display().to_string();
        tokio::spawn(async move {
            match child.wait().await {
                Ok(status) if status.success() => info!(pid, %program, "worker exited cleanly"),
                Ok(status) => warn!(pid, %program, %status, "worker exited with failure"),
                Err(e) => warn!(pid, %program, error = %e, "failed to wait on worker"),
            }
        });

        Ok(pid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_program_is_an_error() {
        let result = ProcessSpawner.spawn(Path::new("/definitely/not/here/worker"), &[]);
        assert!(result.is_err());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn real_process_reports_a_pid() {
        let pid = ProcessSpawner
            .spawn(Path::new("/bin/sh"), &["-c".to_string(), "exit 0".to_string()])
            .unwrap();
        assert!(pid > 0);
    }
}
