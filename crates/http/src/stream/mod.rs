//! Byte stream abstraction backing message bodies.
//!
//! A [`Stream`] owns one [`Handle`] and derives its capabilities from it:
//!
//! - literal buffers live in a spooled temp channel (memory first, a temp file past
//!   [`SPOOL_LIMIT`]) and are always readable, writable and seekable
//! - files carry the capabilities of the [`OpenMode`] they were opened with
//! - pipes are read-only, sinks write-only, neither is seekable nor has a size
//!
//! The size is discovered lazily and cached until the next write. Once a stream
//! is closed or detached every operation fails with [`StreamError::State`].

mod handle;
mod mode;

pub use handle::Handle;
pub use mode::OpenMode;

use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::Path;

use bytes::Bytes;
use tempfile::SpooledTempFile;
use tracing::{trace, warn};

use crate::ensure;
use crate::protocol::StreamError;

/// In-memory capacity of literal streams before they roll over to disk
pub const SPOOL_LIMIT: usize = 2 * 1024 * 1024;

#[derive(Debug)]
pub struct Stream {
    handle: Option<Handle>,
    readable: bool,
    writable: bool,
    seekable: bool,
    size: Option<u64>,
    eof: bool,
    /// Bytes moved through a non-seekable handle
    position: u64,
}

impl Stream {
    /// Creates an empty, readable, writable and seekable stream.
    pub fn empty() -> Self {
        Self::with_flags(Handle::Temp(SpooledTempFile::new(SPOOL_LIMIT)), true, true, true)
    }

    /// Creates a stream holding `data`.
    ///
    /// The position is left after the written content, call [`Stream::rewind`] before
    /// reading it back.
    pub fn from_bytes<B: AsRef<[u8]>>(data: B) -> Result<Self, StreamError> {
        let mut stream = Self::empty();
        stream.write(data.as_ref())?;
        Ok(stream)
    }

    /// Wraps an already opened file, taking its capabilities from `mode`.
    pub fn from_file(file: File, mode: OpenMode) -> Self {
        let mut handle = Handle::File(file, mode);
        let seekable = handle.probe_seekable();
        Self::with_flags(handle, mode.is_readable(), mode.is_writable(), seekable)
    }

    /// Opens `path` with an fopen-style `mode` such as `"r"`, `"w+"` or `"a+b"`.
    pub fn open<P: AsRef<Path>>(path: P, mode: &str) -> Result<Self, StreamError> {
        let mode: OpenMode = mode.parse()?;
        let file = mode.open_options().open(path)?;
        Ok(Self::from_file(file, mode))
    }

    /// Wraps a non-seekable source of unknown length.
    pub fn from_reader<R: Read + Send + 'static>(reader: R) -> Self {
        Self::with_flags(Handle::Pipe(Box::new(reader)), true, false, false)
    }

    /// Wraps a non-seekable sink.
    pub fn from_writer<W: Write + Send + 'static>(writer: W) -> Self {
        Self::with_flags(Handle::Sink(Box::new(writer)), false, true, false)
    }

    fn with_flags(handle: Handle, readable: bool, writable: bool, seekable: bool) -> Self {
        Self { handle: Some(handle), readable, writable, seekable, size: None, eof: false, position: 0 }
    }

    #[inline]
    pub fn is_readable(&self) -> bool {
        self.readable
    }

    #[inline]
    pub fn is_writable(&self) -> bool {
        self.writable
    }

    #[inline]
    pub fn is_seekable(&self) -> bool {
        self.seekable
    }

    #[inline]
    pub fn is_detached(&self) -> bool {
        self.handle.is_none()
    }

    /// Returns the total size in bytes, or `None` when it cannot be known.
    pub fn size(&mut self) -> Option<u64> {
        if self.size.is_some() {
            return self.size;
        }

        let handle = self.handle.as_mut()?;
        match handle.len() {
            Ok(size) => {
                self.size = size;
                size
            }
            Err(e) => {
                warn!(cause = %e, "unable to query stream size");
                None
            }
        }
    }

    /// Reads up to `len` bytes; fewer are returned only at the end of the stream.
    pub fn read(&mut self, len: usize) -> Result<Bytes, StreamError> {
        ensure!(self.readable, StreamError::state("cannot read from non-readable stream"));
        let handle = self.handle_mut()?;

        let mut buf = Vec::with_capacity(len.min(64 * 1024));
        Read::by_ref(handle).take(len as u64).read_to_end(&mut buf)?;
        self.position += buf.len() as u64;
        if buf.len() < len {
            self.eof = true;
        }
        Ok(Bytes::from(buf))
    }

    /// Reads everything from the current position to the end.
    pub fn contents(&mut self) -> Result<Bytes, StreamError> {
        ensure!(self.readable, StreamError::state("unable to read stream contents"));
        let handle = self.handle_mut()?;

        let mut buf = Vec::new();
        handle.read_to_end(&mut buf)?;
        self.position += buf.len() as u64;
        self.eof = true;
        Ok(Bytes::from(buf))
    }

    /// Writes all of `data`, returning the number of bytes written.
    pub fn write(&mut self, data: &[u8]) -> Result<usize, StreamError> {
        ensure!(self.writable, StreamError::state("cannot write to a non-writable stream"));
        self.size = None;
        let handle = self.handle_mut()?;
        handle.write_all(data)?;
        self.position += data.len() as u64;
        Ok(data.len())
    }

    pub fn seek(&mut self, pos: SeekFrom) -> Result<u64, StreamError> {
        ensure!(self.seekable, StreamError::state("stream is not seekable"));
        let handle = self.handle_mut()?;
        let position = handle.seek(pos).map_err(|e| StreamError::state(format!("unable to seek to {pos:?}: {e}")))?;
        self.eof = false;
        self.position = position;
        Ok(position)
    }

    #[inline]
    pub fn rewind(&mut self) -> Result<(), StreamError> {
        self.seek(SeekFrom::Start(0)).map(|_| ())
    }

    /// Returns the current position.
    ///
    /// Non-seekable streams report the number of bytes read or written so far.
    pub fn tell(&mut self) -> Result<u64, StreamError> {
        let seekable = self.seekable;
        let position = self.position;
        let handle = self.handle_mut()?;
        if !seekable {
            return Ok(position);
        }
        Ok(handle.stream_position()?)
    }

    /// Returns true once the position reached the end of the stream.
    pub fn eof(&mut self) -> Result<bool, StreamError> {
        let seekable = self.seekable;
        let eof = self.eof;
        let handle = self.handle_mut()?;
        if !seekable {
            return Ok(eof);
        }

        let position = handle.stream_position()?;
        Ok(handle.len()?.is_some_and(|len| position >= len))
    }

    /// Releases the underlying handle.
    pub fn close(&mut self) {
        if let Some(handle) = self.detach() {
            trace!(?handle, "closing stream");
            drop(handle);
        }
    }

    /// Hands the underlying handle back to the caller and leaves this stream unusable.
    pub fn detach(&mut self) -> Option<Handle> {
        let handle = self.handle.take()?;
        self.size = None;
        self.readable = false;
        self.writable = false;
        self.seekable = false;
        self.eof = false;
        self.position = 0;
        Some(handle)
    }

    /// Rewinds when possible and reads everything.
    ///
    /// This is a best-effort convenience: any failure yields empty bytes. Use
    /// [`Stream::contents`] where errors have to be observed.
    pub fn to_bytes(&mut self) -> Bytes {
        let result = if self.seekable { self.rewind().and_then(|()| self.contents()) } else { self.contents() };
        result.unwrap_or_default()
    }

    /// Lossy UTF-8 rendering of [`Stream::to_bytes`].
    pub fn to_string_lossy(&mut self) -> String {
        String::from_utf8_lossy(&self.to_bytes()).into_owned()
    }

    fn handle_mut(&mut self) -> Result<&mut Handle, StreamError> {
        self.handle.as_mut().ok_or_else(|| StreamError::state("stream is detached"))
    }
}

impl Default for Stream {
    fn default() -> Self {
        Self::empty()
    }
}

impl From<Handle> for Stream {
    /// Wraps a handle, deriving capabilities from its kind.
    fn from(handle: Handle) -> Self {
        match handle {
            Handle::Temp(_) => Self::with_flags(handle, true, true, true),
            Handle::File(file, mode) => Self::from_file(file, mode),
            Handle::Pipe(_) => Self::with_flags(handle, true, false, false),
            Handle::Sink(_) => Self::with_flags(handle, false, true, false),
        }
    }
}

impl From<StreamError> for io::Error {
    fn from(e: StreamError) -> Self {
        match e {
            StreamError::Io { source } => source,
            state @ StreamError::State { .. } => io::Error::other(state),
        }
    }
}

impl Read for Stream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if !self.readable {
            return Err(StreamError::state("cannot read from non-readable stream").into());
        }
        let n = self.handle_mut()?.read(buf)?;
        self.position += n as u64;
        if n == 0 && !buf.is_empty() {
            self.eof = true;
        }
        Ok(n)
    }
}

impl Write for Stream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if !self.writable {
            return Err(StreamError::state("cannot write to a non-writable stream").into());
        }
        self.size = None;
        let n = self.handle_mut()?.write(buf)?;
        self.position += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(self.handle_mut()?.flush()?)
    }
}

impl Seek for Stream {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        Ok(Stream::seek(self, pos)?)
    }
}
