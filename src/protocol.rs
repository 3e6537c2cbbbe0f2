//! Wire framing.
//!
//! Every message in either direction is one JSON object per line:
//! `{"event": <tag>, "payload": <any>}`. The tag is a JSON value rather than a string
//! because outbound deliveries copy the sender's `dest` verbatim, whatever it holds.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

use crate::{Error, Result};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    pub event: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
}

impl Frame {
    pub fn new(event: impl Into<Value>, payload: Option<Value>) -> Self {
        Self {
            event: event.into(),
            payload,
        }
    }

    /// The tag as a string, if it is one.
    pub fn tag(&self) -> Option<&str> {
        self.event.as_str()
    }

    pub fn is_tagged(&self, tag: &str) -> bool {
        self.tag() == Some(tag)
    }

    /// Serializes the frame as a single line, including the trailing newline.
    pub fn encode(&self) -> Result<String> {
        let mut line = serde_json::to_string(self)?;
        line.push('\n');
        Ok(line)
    }

    /// Parses one line. Returns `Ok(None)` for blank lines.
    pub fn decode(line: &str) -> Result<Option<Self>> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(None);
        }
        Ok(Some(serde_json::from_str(line)?))
    }
}

pub async fn write_frame<W>(writer: &mut W, frame: &Frame) -> Result<()>
where
    W: AsyncWrite + Unpin + ?Sized,
{
    writer.write_all(frame.encode()?.as_bytes()).await?;
    writer.flush().await?;
    Ok(())
}

/// Reads the next non-blank frame. `Ok(None)` means the stream ended.
///
/// A line that is not valid UTF-8 or not a frame is consumed and reported as
/// [`Error::Protocol`], so the caller can skip it and keep reading.
pub async fn read_frame<R>(reader: &mut R) -> Result<Option<Frame>>
where
    R: AsyncBufRead + Unpin + ?Sized,
{
    let mut buf = Vec::new();
    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf).await? == 0 {
            return Ok(None);
        }
        let line = match std::str::from_utf8(&buf) {
            Ok(line) => line,
            Err(e) => return Err(Error::Protocol(format!("frame is not UTF-8: {}", e))),
        };
        match Frame::decode(line) {
            Ok(Some(frame)) => return Ok(Some(frame)),
            Ok(None) => continue,
            Err(Error::Serialization(e)) => {
                return Err(Error::Protocol(format!("malformed frame: {}", e)))
            }
            Err(e) => return Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tokio::io::BufReader;

    #[test]
    fn test_missing_and_null_payload_are_absent() {
        let frame = Frame::decode(r#"{"event":"send_cmd"}"#).unwrap().unwrap();
        assert!(frame.is_tagged("send_cmd"));
        assert_eq!(frame.payload, None);

        let frame = Frame::decode(r#"{"event":"send_cmd","payload":null}"#).unwrap().unwrap();
        assert_eq!(frame.payload, None);
    }

    #[test]
    fn test_non_string_tag_survives() {
        let frame = Frame::new(json!(42), Some(json!({})));
        let line = frame.encode().unwrap();
        assert!(line.ends_with('\n'));
        let back = Frame::decode(&line).unwrap().unwrap();
        assert_eq!(back.event, json!(42));
        assert_eq!(back.tag(), None);
    }

    #[test]
    fn test_blank_line_is_skipped() {
        assert!(Frame::decode("   \n").unwrap().is_none());
    }

    #[tokio::test]
    async fn test_read_frame_stream() {
        let input = b"\n{\"event\":\"B\",\"payload\":{\"data\":1}}\nnot json\n".to_vec();
        let mut reader = BufReader::new(&input[..]);

        let frame = read_frame(&mut reader).await.unwrap().unwrap();
        assert!(frame.is_tagged("B"));
        assert_eq!(frame.payload, Some(json!({"data": 1})));

        match read_frame(&mut reader).await {
            Err(Error::Protocol(_)) => {}
            other => panic!("expected protocol error, got {:?}", other),
        }

        assert!(read_frame(&mut reader).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_invalid_utf8_line_is_skippable() {
        let mut input = b"\xff\xfe garbage\n".to_vec();
        input.extend_from_slice(b"{\"event\":\"send_cmd\"}\n");
        let mut reader = BufReader::new(&input[..]);

        assert!(matches!(read_frame(&mut reader).await, Err(Error::Protocol(_))));
        let frame = read_frame(&mut reader).await.unwrap().unwrap();
        assert!(frame.is_tagged("send_cmd"));
    }
}
