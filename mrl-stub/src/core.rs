use std::io;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use common::codec::{ControlMessage, ErrorReason, SpawnRequest};
use common::job::Endpoint;
use common::{net, Role};
use tokio::io::BufReader;
use tokio::net::{TcpListener, TcpStream};
use tokio::time::timeout;
use tracing::{debug, error, info, warn};

use crate::spawn::Spawner;

/// How long a connected client gets to send its request line.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone)]
pub struct StubConfig {
    /// Directory the worker executables are looked up in.
    pub bin_dir: PathBuf,

    /// Rendezvous address used when a SPAWN does not name one.
    pub controller: Endpoint,
}

/// A worker launch, fully resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: PathBuf,
    pub args: Vec<String>,
}

/// Per-host launcher: turns each SPAWN into a worker process and answers
/// `OK|<pid>` or `ERR|<reason>`. It never waits for the worker.
pub struct Stub<S> {
    config: StubConfig,
    spawner: S,
}

impl<S: Spawner + 'static> Stub<S> {
    pub fn new(config: StubConfig, spawner: S) -> Self {
        Self { config, spawner }
    }

    /// Accept connections until the listener fails. Each connection carries
    /// exactly one request.
    pub async fn serve(self, listener: TcpListener) -> io::Result<()> {
        let stub = Arc::new(self);
        info!(addr = %listener.local_addr()?, bin_dir = %stub.config.bin_dir.display(), "stub listening");

        loop {
            let (stream, peer) = listener.accept().await?;
            let stub = Arc::clone(&stub);
            tokio::spawn(async move {
                if let Err(e) = stub.handle_connection(stream, peer).await {
                    warn!(%peer, error = %e, "connection failed");
                }
            });
        }
    }

    async fn handle_connection(&self, stream: TcpStream, peer: SocketAddr) -> io::Result<()> {
        let mut stream = BufReader::new(stream);
        let line = match timeout(REQUEST_TIMEOUT, net::read_line(&mut stream)).await {
            Ok(line) => line?,
            Err(_) => {
                warn!(%peer, "no request within {:?}", REQUEST_TIMEOUT);
                return Ok(());
            }
        };
        let Some(line) = line else {
            debug!(%peer, "peer closed without a request");
            return Ok(());
        };

        let reply = self.handle_line(&line);
        net::write_message(stream.get_mut(), &reply).await
    }

    /// Decode one request line and act on it.
    pub fn handle_line(&self, line: &str) -> ControlMessage {
        let request = match ControlMessage::decode(line) {
            ControlMessage::Spawn(request) => request,
            other => {
                warn!(line = line.trim_end(), decoded = %other, "rejecting non-SPAWN request");
                return ControlMessage::bad_command();
            }
        };

        let invocation = match self.invocation(&request) {
            Ok(invocation) => invocation,
            Err(reason) => {
                error!(role = %request.role, id = request.id, %reason, "cannot launch worker");
                return ControlMessage::Err(reason);
            }
        };

        match self.spawner.spawn(&invocation.program, &invocation.args) {
            Ok(pid) => {
                info!(role = %request.role, id = request.id, pid, args = ?invocation.args, "worker launched");
                ControlMessage::Ok { pid: Some(pid) }
            }
            Err(e) => {
                error!(role = %request.role, id = request.id, error = %e, "failed to start worker");
                ControlMessage::Err(ErrorReason::CreateProcessFailed)
            }
        }
    }

    /// Resolve the executable and argument vector for `request`.
    ///
    /// Mappers get `<id> <reducers> <manifest> <temp dir> <host> <port>`;
    /// reducers get `<id> <temp dir> <output dir> <host> <port> --mappers <n>`.
    pub fn invocation(&self, request: &SpawnRequest) -> Result<Invocation, ErrorReason> {
        let program = worker_executable(&self.config.bin_dir, request.role);
        if !program.is_file() {
            return Err(ErrorReason::WorkerExeMissing);
        }

        let controller = request.controller.as_ref().unwrap_or(&self.config.controller);
        let temp_dir = path_arg(&request.temp_dir);
        let target = path_arg(&request.target);

        let args = match request.role {
            Role::Map => vec![
                request.id.to_string(),
                request.peer_count.to_string(),
                target,
                temp_dir,
                controller.host.clone(),
                controller.port.to_string(),
            ],
            Role::Reduce => vec![
                request.id.to_string(),
                temp_dir,
                target,
                controller.host.clone(),
                controller.port.to_string(),
                "--mappers".to_string(),
                request.peer_count.to_string(),
            ],
        };

        Ok(Invocation { program, args })
    }
}

/// `<bin_dir>/<worker program><platform suffix>`
pub fn worker_executable(bin_dir: &Path, role: Role) -> PathBuf {
    bin_dir.join(format!("{}{}", role.worker_program(), std::env::consts::EXE_SUFFIX))
}

fn path_arg(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}
