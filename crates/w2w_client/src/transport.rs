//! Line framing shared by both servers and the clients.
//!
//! Every message is one `\n`-terminated line: a JSON envelope on the command
//! port, plain text on the chat port. [`Connection`] owns the receive buffer,
//! so a line split across reads is reassembled and several lines arriving in
//! one read come out one at a time.

use bytes::BytesMut;
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio_util::codec::{Decoder, Encoder, LinesCodec, LinesCodecError};

/// Upper bound on a single line, in bytes.
pub const MAX_LINE_BYTES: usize = 1024 * 1024;

/// Bytes requested from the socket per read.
pub const READ_CHUNK: usize = 4096;

/// How much of an undecodable payload is echoed back in errors.
pub const PREVIEW_CHARS: usize = 100;

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("request timed out")]
    TimedOut,
    #[error("invalid JSON ({source}): {preview}")]
    Malformed {
        preview: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("message exceeds the {} byte line limit", MAX_LINE_BYTES)]
    TooLong,
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl TransportError {
    /// True when the peer sent bytes that could not be framed or parsed.
    pub fn is_decode(&self) -> bool {
        matches!(self, TransportError::Malformed { .. } | TransportError::TooLong)
    }
}

impl From<LinesCodecError> for TransportError {
    fn from(e: LinesCodecError) -> Self {
        match e {
            LinesCodecError::MaxLineLengthExceeded => TransportError::TooLong,
            LinesCodecError::Io(io) => TransportError::Io(io),
        }
    }
}

/// First [`PREVIEW_CHARS`] characters of `text`, with an ellipsis when cut.
pub fn preview(text: &str) -> String {
    let mut chars = text.chars();
    let head: String = chars.by_ref().take(PREVIEW_CHARS).collect();
    if chars.next().is_some() {
        format!("{}...", head)
    } else {
        head
    }
}

/// Plain-text line codec used on the chat port.
pub fn text_codec() -> LinesCodec {
    LinesCodec::new_with_max_length(MAX_LINE_BYTES)
}

/// Newline-delimited JSON. Decodes to a raw [`Value`] so callers can tell
/// "not JSON" apart from "JSON of the wrong shape".
#[derive(Debug, Clone)]
pub struct EnvelopeCodec {
    lines: LinesCodec,
}

impl EnvelopeCodec {
    pub fn new() -> Self {
        Self {
            lines: text_codec(),
        }
    }

    fn parse(line: &str) -> Result<Value, TransportError> {
        serde_json::from_str(line).map_err(|source| TransportError::Malformed {
            preview: preview(line),
            source,
        })
    }
}

impl Default for EnvelopeCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for EnvelopeCodec {
    type Item = Value;
    type Error = TransportError;

    fn decode(&mut self, buf: &mut BytesMut) -> Result<Option<Value>, TransportError> {
        while let Some(line) = self.lines.decode(buf)? {
            if line.trim().is_empty() {
                continue;
            }
            return Self::parse(&line).map(Some);
        }
        Ok(None)
    }

    fn decode_eof(&mut self, buf: &mut BytesMut) -> Result<Option<Value>, TransportError> {
        while let Some(line) = self.lines.decode_eof(buf)? {
            if line.trim().is_empty() {
                continue;
            }
            return Self::parse(&line).map(Some);
        }
        Ok(None)
    }
}

impl<'a, T: Serialize + ?Sized> Encoder<&'a T> for EnvelopeCodec {
    type Error = TransportError;

    fn encode(&mut self, item: &'a T, dst: &mut BytesMut) -> Result<(), TransportError> {
        let line = serde_json::to_string(item).map_err(std::io::Error::other)?;
        self.lines.encode(line, dst)?;
        Ok(())
    }
}

/// One end of a framed byte stream.
///
/// `receive` keeps reading [`READ_CHUNK`]-sized pieces until the codec yields
/// a message, the peer closes, or the idle timeout fires. Once the peer has
/// closed, the connection stays closed.
#[derive(Debug)]
pub struct Connection<S, C = EnvelopeCodec> {
    stream: S,
    codec: C,
    buffer: BytesMut,
    closed: bool,
}

impl<S> Connection<S, EnvelopeCodec> {
    pub fn new(stream: S) -> Self {
        Self::with_codec(stream, EnvelopeCodec::new())
    }
}

impl<S, C> Connection<S, C> {
    pub fn with_codec(stream: S, codec: C) -> Self {
        Self {
            stream,
            codec,
            buffer: BytesMut::with_capacity(READ_CHUNK),
            closed: false,
        }
    }

    /// False once the peer has half-closed its side.
    pub fn is_open(&self) -> bool {
        !self.closed
    }
}

impl<S, C> Connection<S, C>
where
    S: AsyncRead + Unpin,
    C: Decoder,
    TransportError: From<C::Error>,
{
    /// Wait for the next message.
    ///
    /// `Ok(None)` means the peer closed with nothing left buffered. When the
    /// idle timeout fires with bytes already buffered, those bytes are decoded
    /// as the final message; with nothing buffered it is [`TransportError::TimedOut`].
    pub async fn receive(&mut self, idle: Option<Duration>) -> Result<Option<C::Item>, TransportError> {
        loop {
            if let Some(item) = self.codec.decode(&mut self.buffer)? {
                return Ok(Some(item));
            }
            if self.closed {
                return Ok(self.codec.decode_eof(&mut self.buffer)?);
            }

            self.buffer.reserve(READ_CHUNK);
            let mut chunk = (&mut self.stream).take(READ_CHUNK as u64);
            let read = match idle {
                Some(limit) => tokio::time::timeout(limit, chunk.read_buf(&mut self.buffer))
                    .await
                    .ok(),
                None => Some(chunk.read_buf(&mut self.buffer).await),
            };

            match read {
                Some(n) => {
                    if n? == 0 {
                        self.closed = true;
                    }
                }
                None => return self.on_idle(),
            }
        }
    }

    fn on_idle(&mut self) -> Result<Option<C::Item>, TransportError> {
        if self.buffer.iter().all(u8::is_ascii_whitespace) {
            return Err(TransportError::TimedOut);
        }
        match self.codec.decode_eof(&mut self.buffer)? {
            Some(item) => Ok(Some(item)),
            None => Err(TransportError::TimedOut),
        }
    }
}

impl<S, C> Connection<S, C>
where
    S: AsyncWrite + Unpin,
{
    /// Encode `item` and hand the whole frame to the socket in one write.
    pub async fn send<I>(&mut self, item: I) -> Result<(), TransportError>
    where
        C: Encoder<I>,
        TransportError: From<<C as Encoder<I>>::Error>,
    {
        let mut frame = BytesMut::new();
        self.codec.encode(item, &mut frame)?;
        self.stream.write_all(&frame).await?;
        self.stream.flush().await?;
        Ok(())
    }

    /// Half-close the write side so the peer sees EOF.
    pub async fn shutdown(&mut self) -> Result<(), TransportError> {
        self.stream.shutdown().await?;
        Ok(())
    }
}
