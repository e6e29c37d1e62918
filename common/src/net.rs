//! One-shot request/response exchanges over fresh TCP connections.

use std::io;
use std::time::Duration;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::debug;

use crate::codec::ControlMessage;
use crate::job::Endpoint;

/// Longest control line accepted; anything longer is cut and will not decode.
pub const MAX_LINE_LEN: u64 = 8192;

/// Read one line. Returns `None` if the peer closed before sending anything.
pub async fn read_line<R>(reader: &mut R) -> io::Result<Option<String>>
where
    R: AsyncBufRead + Unpin,
{
    let mut line = String::new();
    let read = reader.take(MAX_LINE_LEN).read_line(&mut line).await?;
    if read == 0 {
        return Ok(None);
    }
    Ok(Some(line))
}

/// Read and decode one message.
pub async fn read_message<R>(reader: &mut R) -> io::Result<Option<ControlMessage>>
where
    R: AsyncBufRead + Unpin,
{
    Ok(read_line(reader).await?.map(|line| ControlMessage::decode(&line)))
}

pub async fn write_message<W>(writer: &mut W, message: &ControlMessage) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    writer.write_all(message.encode().as_bytes()).await?;
    writer.flush().await
}

/// Open a connection to `endpoint`, giving up after `limit`.
pub async fn connect(endpoint: &Endpoint, limit: Duration) -> io::Result<TcpStream> {
    match timeout(limit, TcpStream::connect(endpoint.addr())).await {
        Ok(stream) => stream,
        Err(_) => Err(io::Error::new(
            io::ErrorKind::TimedOut,
            format!("connecting to {endpoint} took longer than {limit:?}"),
        )),
    }
}

/// Send `message` on a new connection and wait for the single reply line.
///
/// Returns `None` when the peer hangs up without replying.
pub async fn request(
    endpoint: &Endpoint,
    message: &ControlMessage,
    limit: Duration,
) -> io::Result<Option<ControlMessage>> {
    let stream = connect(endpoint, limit).await?;
    let mut stream = BufReader::new(stream);

    debug!(%endpoint, message = %message, "sending control message");
    write_message(stream.get_mut(), message).await?;

    match timeout(limit, read_message(&mut stream)).await {
        Ok(reply) => reply,
        Err(_) => Err(io::Error::new(
            io::ErrorKind::TimedOut,
            format!("no reply from {endpoint} within {limit:?}"),
        )),
    }
}
