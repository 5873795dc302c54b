//! LSP header framing over byte streams.
//!
//! ```text
//! Content-Length: <length>\r\n
//! \r\n
//! <payload>
//! ```
//!
//! Reading and writing are split so the reader can live on its own thread
//! while requests are written from the supervisor thread.

use std::io::{self, BufRead, Write};

use super::error::TransportError;

const CONTENT_LENGTH: &str = "content-length";

/// Reads LSP-framed messages.
#[derive(Debug)]
pub struct MessageReader<R> {
    reader: R,
}

impl<R> MessageReader<R>
where
    R: BufRead,
{
    /// Wraps a buffered reader.
    #[must_use]
    pub const fn new(reader: R) -> Self {
        Self { reader }
    }

    /// Receives one message payload, blocking until it is complete.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::MissingContentLength`] when the header block
    /// has no length, [`TransportError::InvalidHeader`] for malformed headers
    /// and [`TransportError::Io`] (with `UnexpectedEof` when the peer closed
    /// the stream) for read failures.
    pub fn receive(&mut self) -> Result<Vec<u8>, TransportError> {
        let content_length = self.read_headers()?;
        let mut content = vec![0_u8; content_length];
        self.reader.read_exact(&mut content)?;
        Ok(content)
    }

    fn read_headers(&mut self) -> Result<usize, TransportError> {
        let mut content_length: Option<usize> = None;

        loop {
            let mut line = String::new();
            if self.reader.read_line(&mut line)? == 0 {
                return Err(TransportError::Io(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "connection closed while reading headers",
                )));
            }

            let trimmed = line.trim();
            if trimmed.is_empty() {
                break;
            }

            let (name, value) =
                trimmed
                    .split_once(':')
                    .ok_or_else(|| TransportError::InvalidHeader {
                        line: trimmed.to_owned(),
                    })?;
            if name.trim().eq_ignore_ascii_case(CONTENT_LENGTH) {
                let length = value
                    .trim()
                    .parse()
                    .map_err(|_| TransportError::InvalidHeader {
                        line: trimmed.to_owned(),
                    })?;
                content_length = Some(length);
            }
        }

        content_length.ok_or(TransportError::MissingContentLength)
    }
}

/// Writes LSP-framed messages.
#[derive(Debug)]
pub struct MessageWriter<W> {
    writer: W,
}

impl<W> MessageWriter<W>
where
    W: Write,
{
    /// Wraps a writer.
    #[must_use]
    pub const fn new(writer: W) -> Self {
        Self { writer }
    }

    /// Sends one framed message and flushes.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Io`] if writing fails.
    pub fn send(&mut self, message: &[u8]) -> Result<(), TransportError> {
        let header = format!("Content-Length: {}\r\n\r\n", message.len());
        self.writer.write_all(header.as_bytes())?;
        self.writer.write_all(message)?;
        self.writer.flush()?;
        Ok(())
    }

    /// Borrows the underlying writer.
    #[must_use]
    pub const fn get_ref(&self) -> &W {
        &self.writer
    }
}
