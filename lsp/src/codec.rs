//! JSON-RPC framing codec for LSP communication.
//!
//! LSP uses `Content-Length: N\r\n\r\n{json}` framing over stdin/stdout.
//! [`encode`] and [`decode`] work on exactly one complete frame per call.
//! [`FrameReader`] is the reassembly stage that cuts an arbitrary byte
//! stream into such frames, and [`FrameWriter`] writes encoded frames out.

use serde::Serialize;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader};

use crate::protocol::Envelope;

/// Maximum frame size (4 MiB) to prevent unbounded memory allocation.
const MAX_FRAME_BYTES: usize = 4 * 1024 * 1024;

const SEPARATOR: &str = "\r\n\r\n";

const CONTENT_LENGTH: &str = "Content-Length";

/// A frame that cannot be split into header and body.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FramingError {
    #[error("no blank line between header and content")]
    MissingSeparator,
    #[error("frame header is empty")]
    EmptyHeader,
    #[error("frame content is empty")]
    EmptyContent,
    #[error("missing Content-Length header")]
    MissingContentLength,
    #[error("invalid Content-Length value {0:?}")]
    InvalidContentLength(String),
    #[error("Content-Length {declared} does not match body length {actual}")]
    LengthMismatch { declared: usize, actual: usize },
    #[error("Content-Length {0} exceeds maximum {MAX_FRAME_BYTES}")]
    TooLarge(usize),
    #[error("frame header is not valid UTF-8")]
    NonUtf8Header,
    #[error("frame body is not valid UTF-8")]
    NonUtf8Body,
}

#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("framing error: {0}")]
    Framing(#[from] FramingError),
    #[error("parsing JSON-RPC body: {0}")]
    Parse(#[source] serde_json::Error),
    #[error("serializing JSON-RPC body: {0}")]
    Serialize(#[source] serde_json::Error),
    #[error("transport I/O: {0}")]
    Io(#[from] std::io::Error),
}

/// A decoded frame: the declared length next to the JSON body it framed.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub content_length: usize,
    pub body: serde_json::Value,
}

/// Serialize `value` as compact JSON and prepend the `Content-Length` header.
///
/// The length counts bytes, not characters.
pub fn encode<T: Serialize + ?Sized>(value: &T) -> Result<String, CodecError> {
    let body = serde_json::to_string(value).map_err(CodecError::Serialize)?;
    Ok(format!("{CONTENT_LENGTH}: {}{SEPARATOR}{body}", body.len()))
}

/// Split one frame and parse its body as arbitrary JSON.
pub fn decode_frame(message: &str) -> Result<Frame, CodecError> {
    let (content_length, content) = split_frame(message)?;
    let body = serde_json::from_str(content).map_err(CodecError::Parse)?;
    Ok(Frame {
        content_length,
        body,
    })
}

/// Split one frame and interpret its body as a request or notification.
pub fn decode(message: &str) -> Result<Envelope, CodecError> {
    let (content_length, content) = split_frame(message)?;
    Envelope::from_json(content, content_length).map_err(CodecError::Parse)
}

fn split_frame(message: &str) -> Result<(usize, &str), FramingError> {
    let (header, content) = message
        .split_once(SEPARATOR)
        .ok_or(FramingError::MissingSeparator)?;
    if header.trim().is_empty() {
        return Err(FramingError::EmptyHeader);
    }
    if content.is_empty() {
        return Err(FramingError::EmptyContent);
    }

    let declared = parse_content_length(header)?;
    if declared > MAX_FRAME_BYTES {
        return Err(FramingError::TooLarge(declared));
    }
    if declared != content.len() {
        return Err(FramingError::LengthMismatch {
            declared,
            actual: content.len(),
        });
    }
    Ok((declared, content))
}

/// Find `Content-Length` among the header lines.
///
/// The key is matched case-insensitively; other headers (e.g. `Content-Type`)
/// are ignored.
fn parse_content_length(header: &str) -> Result<usize, FramingError> {
    let mut content_length = None;
    for line in header.lines() {
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        if key.trim().eq_ignore_ascii_case(CONTENT_LENGTH) {
            let value = value.trim();
            let len = value
                .parse()
                .map_err(|_| FramingError::InvalidContentLength(value.to_string()))?;
            content_length = Some(len);
        }
    }
    content_length.ok_or(FramingError::MissingContentLength)
}

/// Reassembles frames from an async byte stream.
///
/// Reads header lines up to the blank separator, then exactly
/// `Content-Length` body bytes, and yields the canonical frame text that
/// [`decode`] accepts.
pub struct FrameReader<R> {
    reader: BufReader<R>,
}

impl<R: AsyncRead + Unpin> FrameReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader: BufReader::new(reader),
        }
    }

    /// Read the next complete frame.
    ///
    /// Returns `Ok(None)` on EOF between frames (clean shutdown).
    /// A header block without a usable `Content-Length` is consumed and
    /// reported as [`CodecError::Framing`]; the stream stays readable.
    /// EOF inside a frame is [`CodecError::Io`].
    pub async fn read_frame(&mut self) -> Result<Option<String>, CodecError> {
        let Some(header) = self.read_headers().await? else {
            return Ok(None);
        };
        let content_length = parse_content_length(&header)?;

        if content_length > MAX_FRAME_BYTES {
            let mut oversized = (&mut self.reader).take(content_length as u64);
            tokio::io::copy(&mut oversized, &mut tokio::io::sink()).await?;
            return Err(FramingError::TooLarge(content_length).into());
        }

        let mut body = vec![0u8; content_length];
        self.reader.read_exact(&mut body).await?;
        let body = String::from_utf8(body).map_err(|_| FramingError::NonUtf8Body)?;

        Ok(Some(format!("{header}{SEPARATOR}{body}")))
    }

    /// Collect header lines until the empty line separator.
    ///
    /// Lines are re-joined with `\r\n`, so peers that send bare `\n` still
    /// produce canonical frames. Returns `None` on EOF before any header.
    /// A block containing a non-UTF-8 line is consumed whole and reported as
    /// [`FramingError::NonUtf8Header`].
    async fn read_headers(&mut self) -> Result<Option<String>, CodecError> {
        let mut lines: Vec<String> = Vec::new();
        let mut line = Vec::new();
        let mut saw_line = false;
        let mut non_utf8 = false;

        loop {
            line.clear();
            let bytes_read = self.reader.read_until(b'\n', &mut line).await?;

            if bytes_read == 0 {
                if !saw_line {
                    return Ok(None);
                }
                return Err(std::io::Error::new(
                    std::io::ErrorKind::UnexpectedEof,
                    "unexpected EOF while reading headers",
                )
                .into());
            }

            let trimmed = line.trim_ascii();
            if trimmed.is_empty() {
                if !saw_line {
                    // Stray blank line between frames.
                    continue;
                }
                break;
            }
            saw_line = true;
            match std::str::from_utf8(trimmed) {
                Ok(text) => lines.push(text.to_string()),
                Err(_) => non_utf8 = true,
            }
        }

        if non_utf8 {
            return Err(FramingError::NonUtf8Header.into());
        }
        Ok(Some(lines.join("\r\n")))
    }
}

/// Writes JSON-RPC frames to an async writer.
pub struct FrameWriter<W> {
    writer: W,
}

impl<W: AsyncWrite + Unpin> FrameWriter<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    /// Encode `msg` with [`encode`] and write it.
    pub async fn write_message<T: Serialize + ?Sized>(&mut self, msg: &T) -> Result<(), CodecError> {
        let frame = encode(msg)?;
        self.write_frame(&frame).await
    }

    /// Write an already-encoded frame and flush.
    pub async fn write_frame(&mut self, frame: &str) -> Result<(), CodecError> {
        self.writer.write_all(frame.as_bytes()).await?;
        self.writer.flush().await?;
        Ok(())
    }
}
