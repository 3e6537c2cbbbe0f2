use std::path::Path;

use async_trait::async_trait;
use futures::stream::{self, Stream};
use serde_json::Value;
use tokio::io::{AsyncRead, AsyncWrite, BufReader, ReadHalf, WriteHalf};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio_rustls::rustls::ServerName;

use crate::protocol::{read_frame, write_frame, Frame};
use crate::relay::Envelope;
use crate::{tls, CommandSender, Error, EventSource, Result, CONNECT, SEND_CMD};

trait Transport: AsyncRead + AsyncWrite + Send + Unpin {}
impl<T: AsyncRead + AsyncWrite + Send + Unpin> Transport for T {}

type BoxedTransport = Box<dyn Transport>;

/// A relay client.
///
/// Sending and receiving use separate locks, so one task can block in
/// [`EventSource::next_event`] while another submits commands.
pub struct Client {
    sid: u64,
    reader: Mutex<BufReader<ReadHalf<BoxedTransport>>>,
    writer: Mutex<WriteHalf<BoxedTransport>>,
}

impl Client {
    pub async fn connect_plain(addr: &str) -> Result<Self> {
        let stream = TcpStream::connect(addr).await?;
        Self::from_stream(stream).await
    }

    /// Connects over TLS, trusting only the certificates in `ca_pem`.
    pub async fn connect_tls(addr: &str, domain: &str, ca_pem: &Path) -> Result<Self> {
        let connector = tls::connector(ca_pem)?;
        let server_name = ServerName::try_from(domain)
            .map_err(|_| Error::InvalidConfig(format!("invalid server name: {}", domain)))?;
        let tcp = TcpStream::connect(addr).await?;
        let stream = connector.connect(server_name, tcp).await?;
        Self::from_stream(stream).await
    }

    /// Wraps an established stream and waits for the relay's handshake.
    pub async fn from_stream<S>(stream: S) -> Result<Self>
    where
        S: AsyncRead + AsyncWrite + Send + Unpin + 'static,
    {
        let boxed: BoxedTransport = Box::new(stream);
        let (reader, writer) = tokio::io::split(boxed);
        let mut reader = BufReader::new(reader);

        let hello = read_frame(&mut reader).await?.ok_or(Error::ConnectionClosed)?;
        if !hello.is_tagged(CONNECT) {
            return Err(Error::Protocol(format!(
                "expected {} handshake, got {}",
                CONNECT, hello.event
            )));
        }
        let sid = hello
            .payload
            .as_ref()
            .and_then(|p| p.get("sid"))
            .and_then(Value::as_u64)
            .ok_or_else(|| Error::Protocol("handshake without sid".to_string()))?;

        Ok(Self {
            sid,
            reader: Mutex::new(reader),
            writer: Mutex::new(writer),
        })
    }

    /// The connection id the relay assigned to this client.
    pub fn sid(&self) -> u64 {
        self.sid
    }

    /// Writes an arbitrary frame. Useful for sending payloads that are not envelopes.
    pub async fn send_frame(&self, frame: &Frame) -> Result<()> {
        let mut writer = self.writer.lock().await;
        write_frame(&mut *writer, frame).await
    }

    pub async fn send(&self, source: &str, dest: &str, data: Value) -> Result<()> {
        self.send_cmd(&Envelope::new(source, dest, data)).await
    }

    /// Waits for the next event under `tag`, discarding events under other tags.
    pub async fn recv_on(&self, tag: &str) -> Result<Option<Value>> {
        while let Some(frame) = self.next_event().await? {
            if frame.is_tagged(tag) {
                return Ok(frame.payload);
            }
        }
        Ok(None)
    }

    /// Consumes the client into a stream of events.
    ///
    /// A malformed frame is yielded as an error and the stream continues; any other
    /// error ends it.
    pub fn into_events(self) -> impl Stream<Item = Result<Frame>> {
        stream::unfold(Some(self), |state| async move {
            let client = state?;
            match client.next_event().await {
                Ok(Some(frame)) => Some((Ok(frame), Some(client))),
                Ok(None) => None,
                Err(e @ Error::Protocol(_)) => Some((Err(e), Some(client))),
                Err(e) => Some((Err(e), None)),
            }
        })
    }
}

#[async_trait]
impl CommandSender for Client {
    async fn send_cmd(&self, envelope: &Envelope) -> Result<()> {
        let payload = serde_json::to_value(envelope)?;
        self.send_frame(&Frame::new(SEND_CMD, Some(payload))).await
    }
}

#[async_trait]
impl EventSource for Client {
    async fn next_event(&self) -> Result<Option<Frame>> {
        let mut reader = self.reader.lock().await;
        read_frame(&mut *reader).await
    }
}
