//! Line-delimited JSON transport.
//!
//! Each JSON-RPC message is one line terminated by `\n`, as in the MCP
//! stdio transport. Generic over reader/writer so tests can use in-memory
//! pipes.

use crate::protocol::JsonRpcResponse;
use bytes::BytesMut;
use futures::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_util::codec::{Decoder, FramedRead, FramedWrite, LinesCodec, LinesCodecError};

/// Longest accepted message line
pub const MAX_LINE_BYTES: usize = 16 * 1024 * 1024;

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Message exceeds the maximum line length")]
    LineTooLong,

    #[error("Message is not valid UTF-8")]
    InvalidUtf8,

    #[error("Failed to encode response: {0}")]
    Encode(#[from] serde_json::Error),
}

impl TransportError {
    /// Errors confined to a single line; reading continues after them.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, TransportError::LineTooLong | TransportError::InvalidUtf8)
    }
}

impl From<LinesCodecError> for TransportError {
    fn from(err: LinesCodecError) -> Self {
        match err {
            LinesCodecError::MaxLineLengthExceeded => TransportError::LineTooLong,
            LinesCodecError::Io(e) if e.kind() == std::io::ErrorKind::InvalidData => {
                TransportError::InvalidUtf8
            }
            LinesCodecError::Io(e) => TransportError::Io(e),
        }
    }
}

/// Line decoder that reports a bad line as an item instead of failing.
///
/// `FramedRead` pauses after a decoder error, so per-line problems must
/// not surface as one. `LinesCodec` has already dropped the offending line
/// (or is discarding the rest of it) when it reports them.
struct MessageCodec {
    lines: LinesCodec,
}

impl MessageCodec {
    fn lift(
        decoded: Result<Option<String>, LinesCodecError>,
    ) -> Result<Option<Result<String, TransportError>>, std::io::Error> {
        match decoded {
            Ok(line) => Ok(line.map(Ok)),
            Err(e) => match TransportError::from(e) {
                TransportError::Io(e) => Err(e),
                recoverable => Ok(Some(Err(recoverable))),
            },
        }
    }
}

impl Decoder for MessageCodec {
    type Item = Result<String, TransportError>;
    type Error = std::io::Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        Self::lift(self.lines.decode(src))
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        Self::lift(self.lines.decode_eof(src))
    }
}

pub struct StdioTransport<R, W> {
    reader: FramedRead<R, MessageCodec>,
    writer: FramedWrite<W, LinesCodec>,
}

impl<R, W> StdioTransport<R, W>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    pub fn new(reader: R, writer: W) -> Self {
        Self::with_max_line_length(reader, writer, MAX_LINE_BYTES)
    }

    pub fn with_max_line_length(reader: R, writer: W, max_length: usize) -> Self {
        let codec = MessageCodec {
            lines: LinesCodec::new_with_max_length(max_length),
        };
        Self {
            reader: FramedRead::new(reader, codec),
            writer: FramedWrite::new(writer, LinesCodec::new()),
        }
    }

    /// Next non-empty line, or `None` once the input is closed.
    ///
    /// A line that is too long or not UTF-8 comes back as a recoverable
    /// error; the following call continues with the next line.
    pub async fn next_line(&mut self) -> Result<Option<String>, TransportError> {
        while let Some(line) = self.reader.next().await {
            let line = line??;
            let trimmed = line.trim();
            if !trimmed.is_empty() {
                tracing::trace!("Read message ({} bytes)", trimmed.len());
                return Ok(Some(trimmed.to_string()));
            }
        }
        Ok(None)
    }

    /// Write one response as a single line and flush.
    pub async fn send(&mut self, response: &JsonRpcResponse) -> Result<(), TransportError> {
        let json = serde_json::to_string(response)?;
        tracing::trace!("Writing message ({} bytes)", json.len());
        self.writer.send(json).await?;
        Ok(())
    }
}

impl StdioTransport<tokio::io::Stdin, tokio::io::Stdout> {
    /// Transport over the process's stdin and stdout
    pub fn stdio() -> Self {
        Self::new(tokio::io::stdin(), tokio::io::stdout())
    }
}
