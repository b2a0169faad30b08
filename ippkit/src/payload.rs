//!
//! Document payload which follows the IPP attributes in the message body
//!
use std::{
    fmt,
    io::{self, Read},
};

use bytes::Bytes;
#[cfg(feature = "async")]
use {
    futures_util::io::{AllowStdIo, AsyncRead, AsyncReadExt},
    std::{
        pin::Pin,
        task::{Context, Poll},
    },
};

enum PayloadKind {
    #[cfg(feature = "async")]
    Async(Box<dyn AsyncRead + Send + Sync + Unpin>),
    Sync(Box<dyn Read + Send + Sync>),
    Empty,
}

/// IPP payload, a streaming source of document bytes.
///
/// The payload is never buffered by the crate, it is copied verbatim after the end-of-attributes tag.
pub struct IppPayload {
    inner: PayloadKind,
}

impl IppPayload {
    /// Create empty payload
    pub fn empty() -> Self {
        IppPayload {
            inner: PayloadKind::Empty,
        }
    }

    #[cfg(feature = "async")]
    /// Create an async payload from the AsyncRead object
    pub fn new_async<R>(r: R) -> Self
    where
        R: 'static + AsyncRead + Send + Sync + Unpin,
    {
        IppPayload {
            inner: PayloadKind::Async(Box::new(r)),
        }
    }

    /// Create a sync payload from the Read object
    pub fn new<R>(r: R) -> Self
    where
        R: 'static + Read + Send + Sync,
    {
        IppPayload {
            inner: PayloadKind::Sync(Box::new(r)),
        }
    }

    /// Create a payload from in-memory document data
    pub fn from_bytes<B: Into<Bytes>>(data: B) -> Self {
        let data = data.into();
        if data.is_empty() {
            IppPayload::empty()
        } else {
            IppPayload::new(io::Cursor::new(data))
        }
    }

    /// Return true if the payload is known to carry no data
    pub fn is_empty(&self) -> bool {
        matches!(self.inner, PayloadKind::Empty)
    }
}

impl Default for IppPayload {
    fn default() -> Self {
        IppPayload::empty()
    }
}

impl fmt::Debug for IppPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.inner {
            #[cfg(feature = "async")]
            PayloadKind::Async(_) => "async",
            PayloadKind::Sync(_) => "sync",
            PayloadKind::Empty => "empty",
        };
        f.debug_struct("IppPayload").field("kind", &kind).finish()
    }
}

#[cfg(feature = "async")]
impl AsyncRead for IppPayload {
    fn poll_read(mut self: Pin<&mut Self>, cx: &mut Context, buf: &mut [u8]) -> Poll<io::Result<usize>> {
        match self.inner {
            PayloadKind::Async(ref mut inner) => Pin::new(&mut *inner).poll_read(cx, buf),
            PayloadKind::Sync(ref mut inner) => Pin::new(&mut AllowStdIo::new(inner)).poll_read(cx, buf),
            PayloadKind::Empty => Poll::Ready(Ok(0)),
        }
    }
}

impl Read for IppPayload {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self.inner {
            #[cfg(feature = "async")]
            PayloadKind::Async(ref mut inner) => futures_executor::block_on(inner.read(buf)),
            PayloadKind::Sync(ref mut inner) => inner.read(buf),
            PayloadKind::Empty => Ok(0),
        }
    }
}
