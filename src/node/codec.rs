//! Framing for the node protocol
//!
//! Every message is a JSON body preceded by HTTP-style headers:
//! ```text
//! Content-Length: <byte-length>\r\n
//! \r\n
//! <JSON body>
//! ```
//!
//! The harness reads and writes frames asynchronously over the child's
//! pipes. A node implementation (such as the `mock_node` binary) uses the
//! [`blocking`] variants over its own stdio. Both sides share header parsing
//! and frame encoding, so a frame one side accepts the other side produces.

use std::io;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::common::{Error, Result};

/// Upper bound on a single message; table dumps stay far below this
const MAX_MESSAGE_BYTES: usize = 64 * 1024 * 1024;

const CONTENT_LENGTH: &str = "Content-Length:";

/// Headers of one frame, fed line by line
#[derive(Debug, Default)]
struct FrameHeader {
    content_length: Option<usize>,
    lines: usize,
}

impl FrameHeader {
    /// Consume one header line; `true` at the blank line that ends the headers
    fn feed(&mut self, line: &str) -> Result<bool> {
        self.lines += 1;
        if line == "\r\n" || line == "\n" {
            return Ok(true);
        }
        if let Some(value) = line.trim().strip_prefix(CONTENT_LENGTH) {
            let value = value.trim();
            let len = value.parse().map_err(|_| {
                Error::NodeProtocol(format!("Invalid Content-Length: {}", value))
            })?;
            self.content_length = Some(len);
        }
        // Other headers are ignored
        Ok(false)
    }

    fn started(&self) -> bool {
        self.lines > 0
    }

    /// Length of the body that follows the headers
    fn body_len(&self) -> Result<usize> {
        let len = self
            .content_length
            .ok_or_else(|| Error::NodeProtocol("Missing Content-Length header".to_string()))?;
        if len > MAX_MESSAGE_BYTES {
            return Err(Error::NodeProtocol(format!(
                "Content-Length too large: {} bytes",
                len
            )));
        }
        Ok(len)
    }
}

fn decode_body(body: Vec<u8>) -> Result<String> {
    String::from_utf8(body).map_err(|e| Error::NodeProtocol(format!("Invalid UTF-8: {}", e)))
}

/// Encode `json` as one complete frame
pub fn encode(json: &str) -> Vec<u8> {
    let mut frame = format!("{} {}\r\n\r\n", CONTENT_LENGTH, json.len()).into_bytes();
    frame.extend_from_slice(json.as_bytes());
    frame
}

/// The node closing its stdout means the process went away
fn node_gone(e: io::Error) -> Error {
    if e.kind() == io::ErrorKind::UnexpectedEof {
        Error::NodeCrashed
    } else {
        Error::Io(e)
    }
}

/// Read a message sent by the node
pub async fn read_message<R: AsyncBufRead + Unpin>(reader: &mut R) -> Result<String> {
    let mut header = FrameHeader::default();
    loop {
        let mut line = String::new();
        if reader.read_line(&mut line).await.map_err(node_gone)? == 0 {
            return Err(Error::NodeCrashed);
        }
        if header.feed(&line)? {
            break;
        }
    }

    let mut body = vec![0u8; header.body_len()?];
    reader.read_exact(&mut body).await.map_err(node_gone)?;
    decode_body(body)
}

/// Write a message to the node
pub async fn write_message<W: AsyncWrite + Unpin>(writer: &mut W, json: &str) -> Result<()> {
    writer.write_all(&encode(json)).await?;
    writer.flush().await?;
    Ok(())
}

/// Blocking framing for the node side of the protocol
pub mod blocking {
    use std::io::{BufRead, Write};

    use super::{decode_body, encode, FrameHeader};
    use crate::common::{Error, Result};

    /// Read a message sent by the harness
    ///
    /// Returns `None` when the harness closed the stream between frames.
    /// A stream that ends inside a frame is a protocol error.
    pub fn read_message<R: BufRead>(reader: &mut R) -> Result<Option<String>> {
        let mut header = FrameHeader::default();
        loop {
            let mut line = String::new();
            if reader.read_line(&mut line)? == 0 {
                if header.started() {
                    return Err(Error::NodeProtocol(
                        "Stream ended inside frame headers".to_string(),
                    ));
                }
                return Ok(None);
            }
            if header.feed(&line)? {
                break;
            }
        }

        let len = header.body_len()?;
        let mut body = vec![0u8; len];
        reader.read_exact(&mut body).map_err(|e| {
            Error::NodeProtocol(format!("Truncated body of {} bytes: {}", len, e))
        })?;
        decode_body(body).map(Some)
    }

    /// Write a message to the harness
    pub fn write_message<W: Write>(writer: &mut W, json: &str) -> Result<()> {
        writer.write_all(&encode(json))?;
        writer.flush()?;
        Ok(())
    }
}
