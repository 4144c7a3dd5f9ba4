//! Newline-delimited JSON framing for the streamed RPC shapes.
//!
//! One JSON document per line, `\n` terminated (a trailing `\r` is
//! tolerated). Blank lines are skipped. A final record without a terminating
//! newline is still decoded when the byte stream ends.

use std::fmt;

use bytes::Bytes;
use futures::{stream, Stream, StreamExt};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::domain::errors::DomainError;

pub const CONTENT_TYPE: &str = "application/x-ndjson";

/// Longest accepted line, terminator excluded.
pub const MAX_LINE: usize = 64 * 1024;

/// Encode one record as a complete line.
pub fn encode<T: Serialize>(record: &T) -> Result<Bytes, DomainError> {
    let mut line = serde_json::to_vec(record)
        .map_err(|e| DomainError::Internal(format!("cannot encode stream record: {e}")))?;
    line.push(b'\n');
    Ok(Bytes::from(line))
}

/// Decode a single line. Returns `None` for blank lines.
pub fn decode_line<T: DeserializeOwned>(line: &[u8]) -> Option<Result<T, DomainError>> {
    let line = line.strip_suffix(b"\r").unwrap_or(line);
    if line.iter().all(u8::is_ascii_whitespace) {
        return None;
    }
    Some(
        serde_json::from_slice(line)
            .map_err(|e| DomainError::InvalidInput(format!("malformed stream record: {e}"))),
    )
}

struct LineReader<S> {
    chunks: S,
    buffer: Vec<u8>,
    /// Prefix of `buffer` already known to hold no newline.
    scanned: usize,
    exhausted: bool,
}

impl<S> LineReader<S> {
    fn take_line(&mut self) -> Option<Result<Vec<u8>, DomainError>> {
        match self.buffer[self.scanned..].iter().position(|b| *b == b'\n') {
            Some(offset) => {
                let end = self.scanned + offset;
                self.scanned = 0;
                let mut line: Vec<u8> = self.buffer.drain(..=end).collect();
                line.pop();
                if line.len() > MAX_LINE {
                    return Some(Err(self.oversized()));
                }
                Some(Ok(line))
            }
            None => {
                self.scanned = self.buffer.len();
                if self.buffer.len() > MAX_LINE {
                    return Some(Err(self.oversized()));
                }
                None
            }
        }
    }

    fn oversized(&mut self) -> DomainError {
        self.exhausted = true;
        self.buffer.clear();
        self.scanned = 0;
        DomainError::InvalidInput(format!("stream record exceeds {MAX_LINE} bytes"))
    }
}

/// Turn a stream of byte chunks into a stream of decoded records.
///
/// Chunk boundaries need not align with lines. A failing chunk stream ends
/// the record stream with a [`DomainError::Transport`].
pub fn decode<T, S, E>(chunks: S) -> impl Stream<Item = Result<T, DomainError>>
where
    T: DeserializeOwned,
    S: Stream<Item = Result<Bytes, E>>,
    E: fmt::Display,
{
    let reader = LineReader {
        chunks: Box::pin(chunks),
        buffer: Vec::new(),
        scanned: 0,
        exhausted: false,
    };
    stream::unfold(reader, |mut reader| async move {
        loop {
            match reader.take_line() {
                Some(Ok(line)) => match decode_line(&line) {
                    Some(record) => return Some((record, reader)),
                    None => continue,
                },
                Some(Err(e)) => return Some((Err(e), reader)),
                None => {}
            }
            if reader.exhausted {
                let rest = std::mem::take(&mut reader.buffer);
                reader.scanned = 0;
                return decode_line(&rest).map(|record| (record, reader));
            }
            match reader.chunks.next().await {
                Some(Ok(chunk)) => reader.buffer.extend_from_slice(&chunk),
                Some(Err(e)) => {
                    reader.exhausted = true;
                    reader.buffer.clear();
                    reader.scanned = 0;
                    return Some((Err(DomainError::Transport(e.to_string())), reader));
                }
                None => reader.exhausted = true,
            }
        }
    })
}
