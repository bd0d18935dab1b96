// Log line source: raw log bytes in, decoded text lines out

use crate::error::DataError;
use crate::runtime::{ContainerHandle, RawStream};
use bytes::BytesMut;
use futures_util::stream::{self, BoxStream, StreamExt};

/// Existing lines replayed before following new output.
pub const DEFAULT_TAIL_BACKLOG: usize = 1;

/// Decoded, trailing-whitespace-trimmed output lines of one container.
pub struct LogLineSource<H> {
    handle: H,
}

impl<H: ContainerHandle> LogLineSource<H> {
    pub fn new(handle: H) -> Self {
        Self { handle }
    }

    /// Lazy, unbounded sequence of lines: up to `tail_backlog` recent lines, then live output.
    /// Invalid UTF-8 is yielded as an error and ends the sequence.
    pub fn stream(self, tail_backlog: usize) -> BoxStream<'static, Result<String, DataError>> {
        decode_lines(self.handle.log_stream(true, tail_backlog))
    }
}

/// A line with no newline after this many bytes is emitted as is.
pub const MAX_LINE_BYTES: usize = 64 * 1024;

struct LineSplitter {
    chunks: RawStream,
    buf: BytesMut,
    eof: bool,
}

type Step = (Result<String, DataError>, Option<LineSplitter>);

fn emit(line: &[u8], splitter: LineSplitter) -> Step {
    match std::str::from_utf8(line) {
        Ok(text) => (Ok(text.trim_end().to_string()), Some(splitter)),
        Err(e) => (Err(e.into()), None),
    }
}

/// Re-frame raw output chunks into lines split on `\n`.
///
/// Chunks may hold several lines or end mid-line (even mid-character). A trailing
/// partial line is flushed at end of stream.
pub fn decode_lines(chunks: RawStream) -> BoxStream<'static, Result<String, DataError>> {
    let splitter = LineSplitter {
        chunks,
        buf: BytesMut::new(),
        eof: false,
    };
    stream::unfold(Some(splitter), |state| async move {
        let mut s = state?;
        loop {
            if let Some(pos) = s.buf.iter().position(|b| *b == b'\n') {
                let line = s.buf.split_to(pos + 1);
                return Some(emit(&line, s));
            }
            if s.buf.len() >= MAX_LINE_BYTES {
                // Cut before an incomplete trailing character, if any.
                let cut = match std::str::from_utf8(&s.buf) {
                    Ok(_) => s.buf.len(),
                    Err(e) if e.error_len().is_none() => e.valid_up_to(),
                    Err(e) => return Some((Err(e.into()), None)),
                };
                let line = s.buf.split_to(cut);
                return Some(emit(&line, s));
            }
            if s.eof {
                if s.buf.is_empty() {
                    return None;
                }
                let line = s.buf.split();
                return Some(emit(&line, s));
            }
            match s.chunks.next().await {
                Some(Ok(chunk)) => s.buf.extend_from_slice(&chunk),
                Some(Err(e)) => return Some((Err(e.into()), None)),
                None => s.eof = true,
            }
        }
    })
    .boxed()
}
