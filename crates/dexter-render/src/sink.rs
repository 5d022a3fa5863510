//! Output sinks: a direct stream pass-through and a buffering sink that
//! decides at flush time whether to involve a pager.

use std::io::{self, Write};
use std::path::PathBuf;

use crate::pager;

/// Destination for rendered text. Writes may buffer; `finish` delivers
/// everything to the final destination. Sinks are held across awaits in
/// async callers, hence the `Send` bound.
pub trait Sink: Send {
    /// Append a chunk of rendered text.
    ///
    /// # Errors
    ///
    /// Returns an error when the underlying destination fails.
    fn write_text(&mut self, text: &str) -> io::Result<()>;

    /// Deliver any buffered output to the destination.
    ///
    /// # Errors
    ///
    /// Returns an error when the underlying destination fails.
    fn finish(&mut self) -> io::Result<()>;
}

/// Unbuffered sink writing straight to any [`Write`] destination.
#[derive(Debug)]
pub struct StreamSink<W: Write> {
    inner: W,
}

impl<W: Write> StreamSink<W> {
    /// Wrap a writer.
    #[must_use]
    pub const fn new(inner: W) -> Self {
        Self { inner }
    }

    /// Consume the sink, returning the underlying writer.
    #[must_use]
    pub fn into_inner(self) -> W {
        self.inner
    }
}

impl<W: Write + Send> Sink for StreamSink<W> {
    fn write_text(&mut self, text: &str) -> io::Result<()> {
        self.inner.write_all(text.as_bytes())
    }

    fn finish(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

/// Buffers rendered text and, on `finish`, pipes it through a pager when
/// the estimated line count exceeds the terminal height. Falls back to a
/// direct stdout write when no pager resolves or spawning fails.
#[derive(Debug)]
pub struct PagedSink {
    buffer: String,
    rows: usize,
    columns: usize,
    pager: Option<PathBuf>,
}

impl PagedSink {
    /// Create a sink targeting a terminal of `rows` × `columns`, using
    /// `pager` when the content does not fit.
    #[must_use]
    pub const fn new(rows: usize, columns: usize, pager: Option<PathBuf>) -> Self {
        Self {
            buffer: String::new(),
            rows,
            columns,
            pager,
        }
    }

    /// Text accumulated so far.
    #[must_use]
    pub fn buffered(&self) -> &str {
        &self.buffer
    }

    fn wants_pager(&self) -> bool {
        pager::estimate_lines(&self.buffer, self.columns) > self.rows
    }
}

impl Sink for PagedSink {
    fn write_text(&mut self, text: &str) -> io::Result<()> {
        self.buffer.push_str(text);
        Ok(())
    }

    fn finish(&mut self) -> io::Result<()> {
        if self.wants_pager()
            && let Some(pager) = &self.pager
        {
            match pager::page_through(pager, &self.buffer) {
                Ok(()) => return Ok(()),
                Err(err) => {
                    tracing::debug!(error = %err, "pager spawn failed; writing directly");
                }
            }
        }
        let mut stdout = io::stdout().lock();
        stdout.write_all(self.buffer.as_bytes())?;
        stdout.flush()
    }
}
