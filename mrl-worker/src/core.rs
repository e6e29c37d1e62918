//! Rendezvous with the controller before any work starts.

use std::time::Duration;

use common::codec::ControlMessage;
use common::job::Endpoint;
use common::{net, JobError, Role};
use tokio::io::BufReader;
use tokio::time::timeout;
use tracing::{debug, info};

/// Say `HELLO|<role>|<id>` to the controller and block until it answers
/// `BEGIN`.
///
/// A worker that never hears `BEGIN` must not touch any file, so every other
/// outcome is an error.
pub async fn handshake(
    controller: &Endpoint,
    role: Role,
    id: u32,
    limit: Duration,
) -> Result<(), JobError> {
    let stream = net::connect(controller, limit)
        .await
        .map_err(|source| JobError::ControllerUnreachable {
            endpoint: controller.clone(),
            source,
        })?;
    let mut stream = BufReader::new(stream);

    let hello = ControlMessage::Hello { role, id };
    debug!(%controller, %hello, "saying hello");
    net::write_message(stream.get_mut(), &hello)
        .await
        .map_err(|e| handshake_error(role, id, format!("failed to send HELLO: {e}")))?;

    let reply = match timeout(limit, net::read_message(&mut stream)).await {
        Ok(Ok(reply)) => reply,
        Ok(Err(e)) => return Err(handshake_error(role, id, format!("read failed: {e}"))),
        Err(_) => {
            return Err(handshake_error(
                role,
                id,
                format!("no BEGIN within {limit:?}"),
            ))
        }
    };

    match reply {
        Some(ControlMessage::Begin) => {
            info!(%role, id, "controller said BEGIN");
            Ok(())
        }
        Some(other) => Err(handshake_error(
            role,
            id,
            format!("expected BEGIN, got `{other}`"),
        )),
        None => Err(handshake_error(
            role,
            id,
            "connection closed before BEGIN".to_string(),
        )),
    }
}

fn handshake_error(role: Role, id: u32, detail: String) -> JobError {
    JobError::Handshake { role, id, detail }
}
