use std::sync::Arc;
use std::time::Duration;

use log::{debug, info, warn};
use serde_json::json;
use tokio::io::{AsyncBufRead, AsyncRead, AsyncWrite, BufReader, WriteHalf};
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::time::timeout;

use crate::protocol::{read_frame, write_frame, Frame};
use crate::relay::{Connection, ConnectionId};
use crate::{CommandRelay, Error, Result, CONNECT, SEND_CMD};

pub const DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Serves one client until it disconnects.
///
/// The connection is registered before the handshake frame is written, so a client
/// that has read the handshake is guaranteed to receive every later broadcast. It is
/// deregistered when the read side ends, whatever the reason; frames already queued
/// for it are still written, for at most [`DRAIN_TIMEOUT`].
pub async fn handle_connection<S>(stream: S, relay: Arc<dyn CommandRelay>) -> Result<()>
where
    S: AsyncRead + AsyncWrite + Send + 'static,
{
    let (reader, writer) = tokio::io::split(stream);
    let mut reader = BufReader::new(reader);

    let (conn, outbox) = Connection::open();
    let id = conn.id();
    info!("new connection {}", id);

    conn.deliver(Frame::new(CONNECT, Some(json!({ "sid": id.as_u64() }))));
    relay.on_connect(conn);
    let mut writer_task = tokio::spawn(write_loop(writer, outbox, id));

    let result = read_loop(&mut reader, id, relay.as_ref()).await;

    // Deregistering drops the last sender, so the writer ends once the outbox is empty.
    relay.on_disconnect(id);
    if timeout(DRAIN_TIMEOUT, &mut writer_task).await.is_err() {
        debug!("Connection {} did not drain in time", id);
        writer_task.abort();
    }
    info!("connection {} closed", id);
    result
}

async fn read_loop<R>(reader: &mut R, id: ConnectionId, relay: &dyn CommandRelay) -> Result<()>
where
    R: AsyncBufRead + Unpin,
{
    loop {
        match read_frame(reader).await {
            Ok(Some(frame)) if frame.is_tagged(SEND_CMD) => relay.on_command(id, frame.payload),
            Ok(Some(frame)) => debug!("Ignoring frame tagged {} from connection {}", frame.event, id),
            Ok(None) => return Ok(()),
            Err(Error::Protocol(msg)) => warn!("Connection {}: {}", id, msg),
            Err(e) => return Err(e),
        }
    }
}

async fn write_loop<W>(mut writer: WriteHalf<W>, mut outbox: UnboundedReceiver<Frame>, id: ConnectionId)
where
    W: AsyncWrite,
{
    while let Some(frame) = outbox.recv().await {
        if let Err(e) = write_frame(&mut writer, &frame).await {
            debug!("Write to connection {} failed: {}", id, e);
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::relay::RelayRouter;
    use tokio::io::{duplex, AsyncBufReadExt, AsyncWriteExt};

    #[tokio::test]
    async fn test_handshake_then_deregister_on_eof() {
        let router = Arc::new(RelayRouter::new());
        let (client, server) = duplex(4096);

        let task = tokio::spawn(handle_connection(server, router.clone()));

        let (read_half, mut write_half) = tokio::io::split(client);
        let mut lines = BufReader::new(read_half).lines();
        let hello = lines.next_line().await.unwrap().unwrap();
        let hello = Frame::decode(&hello).unwrap().unwrap();
        assert!(hello.is_tagged(CONNECT));
        assert_eq!(router.connection_count(), 1);

        write_half.write_all(b"this is not json\n").await.unwrap();
        write_half.write_all(b"{\"event\":\"other\",\"payload\":1}\n").await.unwrap();
        write_half.shutdown().await.unwrap();
        drop(write_half);

        task.await.unwrap().unwrap();
        assert_eq!(router.connection_count(), 0);
    }

    #[tokio::test]
    async fn test_invalid_utf8_keeps_connection_open() {
        let router = Arc::new(RelayRouter::new());
        let (peer, mut peer_rx) = Connection::open();
        router.on_connect(peer);

        let (client, server) = duplex(4096);
        let task = tokio::spawn(handle_connection(server, router.clone()));

        let (read_half, mut write_half) = tokio::io::split(client);
        let mut lines = BufReader::new(read_half).lines();
        lines.next_line().await.unwrap().unwrap();
        assert_eq!(router.connection_count(), 2);

        write_half.write_all(b"\xff\xfe garbage\n").await.unwrap();
        write_half
            .write_all(b"{\"event\":\"send_cmd\",\"payload\":{\"dest\":\"B\",\"data\":1}}\n")
            .await
            .unwrap();

        let frame = peer_rx.recv().await.unwrap();
        assert!(frame.is_tagged("B"));
        assert_eq!(router.connection_count(), 2);

        write_half.shutdown().await.unwrap();
        task.await.unwrap().unwrap();
        assert_eq!(router.connection_count(), 1);
    }

    #[tokio::test]
    async fn test_queued_frames_survive_half_close() {
        let router = Arc::new(RelayRouter::new());
        let (client, server) = duplex(64);
        let task = tokio::spawn(handle_connection(server, router.clone()));

        let (read_half, mut write_half) = tokio::io::split(client);
        let mut lines = BufReader::new(read_half).lines();
        lines.next_line().await.unwrap().unwrap();

        let elsewhere = ConnectionId::next();
        for seq in 0..200 {
            router.on_command(elsewhere, Some(json!({"dest": "B", "data": {"seq": seq}})));
        }
        write_half.shutdown().await.unwrap();

        let mut received = 0;
        while let Some(line) = lines.next_line().await.unwrap() {
            let frame = Frame::decode(&line).unwrap().unwrap();
            assert_eq!(frame.payload, Some(json!({"data": {"seq": received}})));
            received += 1;
        }
        assert_eq!(received, 200);
        task.await.unwrap().unwrap();
    }
}
