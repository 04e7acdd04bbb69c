use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::protocol::StreamError;
use crate::stream::Stream;

/// Shared handle to the [`Stream`] a message carries.
///
/// Cloning a `Body` shares the underlying stream: messages derived from one another
/// observe the same position and content. The stream lives as long as its longest
/// holder.
#[derive(Clone)]
pub struct Body(Arc<Mutex<Stream>>);

impl Body {
    pub fn new(stream: Stream) -> Self {
        Self(Arc::new(Mutex::new(stream)))
    }

    pub fn empty() -> Self {
        Self::new(Stream::empty())
    }

    /// Creates a body holding `data`, positioned at its start.
    pub fn from_bytes<B: AsRef<[u8]>>(data: B) -> Result<Self, StreamError> {
        let mut stream = Stream::from_bytes(data)?;
        stream.rewind()?;
        Ok(Self::new(stream))
    }

    /// Locks the stream for exclusive access.
    ///
    /// A lock poisoned by a panicking holder is recovered.
    pub fn lock(&self) -> MutexGuard<'_, Stream> {
        self.0.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    #[inline]
    pub fn ptr_eq(this: &Body, other: &Body) -> bool {
        Arc::ptr_eq(&this.0, &other.0)
    }

    pub fn size(&self) -> Option<u64> {
        self.lock().size()
    }

    pub fn to_string_lossy(&self) -> String {
        self.lock().to_string_lossy()
    }
}

impl Default for Body {
    fn default() -> Self {
        Self::empty()
    }
}

impl From<Stream> for Body {
    fn from(stream: Stream) -> Self {
        Self::new(stream)
    }
}

impl fmt::Debug for Body {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0.try_lock() {
            Ok(stream) => f.debug_tuple("Body").field(&*stream).finish(),
            Err(_) => f.write_str("Body(<locked>)"),
        }
    }
}
