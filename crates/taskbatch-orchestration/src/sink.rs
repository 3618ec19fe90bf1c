//! Shared output sink.
//!
//! One writer shared by every task and the driver. Lines written under a
//! single [`SinkGuard`] appear together; the lock is released when the guard
//! drops, including during unwinding.

use std::fmt;
use std::io::{self, Write};
use std::sync::Arc;

use parking_lot::{Mutex, MutexGuard};

type BoxedWriter = Box<dyn Write + Send>;

/// Cloneable handle to a serialized writer.
#[derive(Clone)]
pub struct OutputSink {
    writer: Arc<Mutex<BoxedWriter>>,
}

impl OutputSink {
    pub fn from_writer<W: Write + Send + 'static>(writer: W) -> Self {
        Self {
            writer: Arc::new(Mutex::new(Box::new(writer))),
        }
    }

    #[must_use]
    pub fn stdout() -> Self {
        Self::from_writer(io::stdout())
    }

    #[must_use]
    pub fn stderr() -> Self {
        Self::from_writer(io::stderr())
    }

    /// Sink that discards everything.
    #[must_use]
    pub fn null() -> Self {
        Self::from_writer(io::sink())
    }

    /// In-memory sink plus a handle to read what was written.
    #[must_use]
    pub fn memory() -> (Self, CaptureBuffer) {
        let buffer = CaptureBuffer::default();
        (Self::from_writer(buffer.clone()), buffer)
    }

    /// Acquire exclusive access until the guard drops.
    pub fn lock(&self) -> SinkGuard<'_> {
        SinkGuard {
            inner: self.writer.lock(),
        }
    }

    /// Write `lines` contiguously and flush.
    pub fn write_block<S: AsRef<str>>(&self, lines: &[S]) -> io::Result<()> {
        let mut guard = self.lock();
        for line in lines {
            guard.line(line.as_ref())?;
        }
        guard.flush()
    }

    /// Write one line.
    pub fn line(&self, text: &str) -> io::Result<()> {
        self.write_block(&[text])
    }
}

impl fmt::Debug for OutputSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OutputSink").finish_non_exhaustive()
    }
}

/// Exclusive access to an [`OutputSink`].
pub struct SinkGuard<'a> {
    inner: MutexGuard<'a, BoxedWriter>,
}

impl SinkGuard<'_> {
    /// Write `text` followed by a newline.
    pub fn line(&mut self, text: &str) -> io::Result<()> {
        self.inner.write_all(text.as_bytes())?;
        self.inner.write_all(b"\n")
    }
}

impl Write for SinkGuard<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.inner.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

/// Shared in-memory buffer backing [`OutputSink::memory`].
#[derive(Clone, Default)]
pub struct CaptureBuffer {
    bytes: Arc<Mutex<Vec<u8>>>,
}

impl CaptureBuffer {
    /// Everything written so far, lossily decoded.
    #[must_use]
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.bytes.lock()).into_owned()
    }

    #[must_use]
    pub fn lines(&self) -> Vec<String> {
        self.contents().lines().map(str::to_owned).collect()
    }
}

impl Write for CaptureBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.bytes.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
