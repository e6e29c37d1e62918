//! Sending SPAWN requests to stubs.

use std::time::Duration;

use common::codec::{ControlMessage, SpawnRequest};
use common::job::Endpoint;
use common::{net, JobError};
use tokio::io::BufReader;
use tokio::time::timeout;
use tracing::{debug, info};

/// Ask `stub` to launch the worker described by `request`.
///
/// Returns the pid the stub reported, if any. Every failure is fatal to the
/// job: an unreachable stub, an `ERR` reply, or a reply that is not `OK`.
pub async fn spawn_worker(
    stub: &Endpoint,
    request: SpawnRequest,
    limit: Duration,
) -> Result<Option<u32>, JobError> {
    let unreachable = |source: std::io::Error| JobError::StubUnreachable {
        endpoint: stub.clone(),
        source,
    };

    let stream = net::connect(stub, limit).await.map_err(unreachable)?;
    let mut stream = BufReader::new(stream);

    let (role, id) = (request.role, request.id);
    let message = ControlMessage::Spawn(request);
    debug!(%stub, %message, "dispatching");
    net::write_message(stream.get_mut(), &message)
        .await
        .map_err(unreachable)?;

    let reply = match timeout(limit, net::read_message(&mut stream)).await {
        Ok(reply) => reply.map_err(unreachable)?,
        Err(_) => {
            return Err(JobError::Timeout {
                stage: format!("reply from stub {stub}"),
                waited: limit,
            })
        }
    };

    match reply {
        Some(ControlMessage::Ok { pid }) => {
            info!(%stub, %role, id, ?pid, "stub launched worker");
            Ok(pid)
        }
        Some(ControlMessage::Err(reason)) => Err(JobError::SpawnRejected {
            endpoint: stub.clone(),
            role,
            id,
            reason,
        }),
        Some(other) => Err(JobError::UnexpectedReply {
            endpoint: stub.clone(),
            reply: other.to_string(),
        }),
        None => Err(JobError::UnexpectedReply {
            endpoint: stub.clone(),
            reply: "<connection closed>".to_string(),
        }),
    }
}
