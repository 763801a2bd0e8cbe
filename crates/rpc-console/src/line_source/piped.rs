//! Plain buffered reads for redirected input.

use std::io::BufRead;

use super::{LineRequest, LineSource, LineSourceError, ReadOutcome};

/// Prints the prompt, flushes, then reads one line from `reader`.
///
/// Input is read as bytes; a line that is not UTF-8 is returned as
/// [`ReadOutcome::Undecodable`] and the next read carries on after it.
///
/// The read itself blocks until a line or end of input arrives and cannot be
/// interrupted; cancellation is only observed before the prompt is written.
#[derive(Debug)]
pub struct PipedSource<R> {
    reader: R,
}

impl<R> PipedSource<R> {
    /// Wraps a buffered reader.
    pub const fn new(reader: R) -> Self {
        Self { reader }
    }

    /// Returns the wrapped reader.
    pub fn into_inner(self) -> R {
        self.reader
    }
}

impl<R: BufRead + Send> LineSource for PipedSource<R> {
    fn read_line(&mut self, request: LineRequest<'_>) -> Result<ReadOutcome, LineSourceError> {
        if request.cancel.is_cancelled() {
            return Ok(ReadOutcome::Cancelled);
        }
        request.output.write_all(request.prompt.as_bytes())?;
        request.output.flush()?;

        let mut bytes = Vec::new();
        if self.reader.read_until(b'\n', &mut bytes)? == 0 {
            return Ok(ReadOutcome::EndOfInput);
        }
        strip_terminator(&mut bytes);
        Ok(String::from_utf8(bytes).map_or_else(ReadOutcome::Undecodable, ReadOutcome::Line))
    }
}

fn strip_terminator(bytes: &mut Vec<u8>) {
    if bytes.last() == Some(&b'\n') {
        bytes.pop();
        if bytes.last() == Some(&b'\r') {
            bytes.pop();
        }
    }
}
