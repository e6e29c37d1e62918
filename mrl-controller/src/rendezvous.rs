//! The controller's HELLO/BEGIN listener.

use std::io;
use std::net::SocketAddr;
use std::time::Duration;

use common::codec::ControlMessage;
use common::{net, JobError, Role};
use tokio::io::BufReader;
use tokio::net::{TcpListener, TcpStream};
use tokio::time::{timeout, Instant};
use tracing::{debug, info, warn};

use crate::worker_registry::{Admission, WorkerRegistry};

/// Longest a connected worker gets to send its HELLO line.
pub const HELLO_READ_TIMEOUT: Duration = Duration::from_secs(5);

/// One listening socket, bound before any SPAWN goes out so that no worker
/// can connect before the controller is ready.
pub struct Rendezvous {
    listener: TcpListener,
}

impl Rendezvous {
    pub async fn bind(addr: &str) -> io::Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        Ok(Self { listener })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Accept connections until every dispatched worker of `role` has said
    /// HELLO and been sent BEGIN, or `limit` runs out.
    ///
    /// Connections are handled one at a time. Anything that is not a HELLO
    /// from a dispatched worker of `role` is logged and dropped.
    pub async fn admit(
        &self,
        role: Role,
        registry: &mut WorkerRegistry,
        limit: Duration,
    ) -> Result<(), JobError> {
        let deadline = Instant::now() + limit;
        let timed_out = || JobError::Timeout {
            stage: format!("{role} handshakes"),
            waited: limit,
        };

        while registry.pending(role) > 0 {
            let remaining = deadline.saturating_duration_since(Instant::now());
            let (stream, peer) = match timeout(remaining, self.listener.accept()).await {
                Ok(accepted) => accepted?,
                Err(_) => {
                    warn!(%role, pending = registry.pending(role), "workers never said hello");
                    return Err(timed_out());
                }
            };

            if let Err(e) = handle_hello(stream, peer, role, registry).await {
                warn!(%peer, error = %e, "rendezvous connection failed");
            }
        }

        info!(%role, workers = registry.workers(role).count(), "all workers begun");
        Ok(())
    }
}

async fn handle_hello(
    stream: TcpStream,
    peer: SocketAddr,
    role: Role,
    registry: &mut WorkerRegistry,
) -> io::Result<()> {
    let mut stream = BufReader::new(stream);
    let message = match timeout(HELLO_READ_TIMEOUT, net::read_message(&mut stream)).await {
        Ok(message) => message?,
        Err(_) => {
            warn!(%peer, "no HELLO within {:?}", HELLO_READ_TIMEOUT);
            return Ok(());
        }
    };

    let (hello_role, id) = match message {
        Some(ControlMessage::Hello { role, id }) => (role, id),
        Some(other) => {
            warn!(%peer, message = %other, "ignoring unexpected message");
            return Ok(());
        }
        None => {
            debug!(%peer, "peer closed without a message");
            return Ok(());
        }
    };

    if hello_role != role {
        warn!(%peer, expected = %role, got = %hello_role, id, "ignoring hello from the wrong phase");
        return Ok(());
    }

    match registry.admit(role, id) {
        Admission::Admitted => info!(%role, id, %peer, "worker said hello"),
        Admission::Duplicate => debug!(%role, id, %peer, "repeated hello"),
        Admission::Unknown => {
            warn!(%role, id, %peer, "ignoring hello from a worker that was not dispatched");
            return Ok(());
        }
    }

    net::write_message(stream.get_mut(), &ControlMessage::Begin).await
}
