use std::fmt;
use std::fs::File;
use std::io::{self, ErrorKind, Read, Seek, SeekFrom, Write};

use tempfile::SpooledTempFile;

use super::OpenMode;

/// The byte channel a [`Stream`](super::Stream) owns.
///
/// Returned to the caller by [`Stream::detach`](super::Stream::detach).
pub enum Handle {
    /// In-memory buffer that spills into an anonymous temp file past its limit
    Temp(SpooledTempFile),
    /// Regular file handle with the mode it was opened with
    File(File, OpenMode),
    /// Read-only, non-seekable source such as a pipe or socket
    Pipe(Box<dyn Read + Send>),
    /// Write-only, non-seekable sink
    Sink(Box<dyn Write + Send>),
}

impl Handle {
    /// Returns whether the handle supports seeking right now.
    pub(crate) fn probe_seekable(&mut self) -> bool {
        match self {
            Handle::Temp(_) => true,
            Handle::File(file, _) => file.stream_position().is_ok(),
            Handle::Pipe(_) | Handle::Sink(_) => false,
        }
    }

    /// Returns the total length, or `None` when the channel exposes none.
    pub(crate) fn len(&mut self) -> io::Result<Option<u64>> {
        match self {
            Handle::Temp(temp) => {
                let position = temp.stream_position()?;
                let end = temp.seek(SeekFrom::End(0))?;
                temp.seek(SeekFrom::Start(position))?;
                Ok(Some(end))
            }
            Handle::File(file, _) => Ok(Some(file.metadata()?.len())),
            Handle::Pipe(_) | Handle::Sink(_) => Ok(None),
        }
    }
}

impl Read for Handle {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            Handle::Temp(temp) => temp.read(buf),
            Handle::File(file, _) => file.read(buf),
            Handle::Pipe(reader) => reader.read(buf),
            Handle::Sink(_) => Err(io::Error::from(ErrorKind::Unsupported)),
        }
    }
}

impl Write for Handle {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Handle::Temp(temp) => temp.write(buf),
            Handle::File(file, _) => file.write(buf),
            Handle::Sink(writer) => writer.write(buf),
            Handle::Pipe(_) => Err(io::Error::from(ErrorKind::Unsupported)),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Handle::Temp(temp) => temp.flush(),
            Handle::File(file, _) => file.flush(),
            Handle::Sink(writer) => writer.flush(),
            Handle::Pipe(_) => Ok(()),
        }
    }
}

impl Seek for Handle {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        match self {
            Handle::Temp(temp) => temp.seek(pos),
            Handle::File(file, _) => file.seek(pos),
            Handle::Pipe(_) | Handle::Sink(_) => Err(io::Error::from(ErrorKind::Unsupported)),
        }
    }
}

impl fmt::Debug for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Handle::Temp(temp) => f.debug_struct("Temp").field("rolled", &temp.is_rolled()).finish(),
            Handle::File(file, mode) => f.debug_tuple("File").field(file).field(mode).finish(),
            Handle::Pipe(_) => f.write_str("Pipe"),
            Handle::Sink(_) => f.write_str("Sink"),
        }
    }
}
