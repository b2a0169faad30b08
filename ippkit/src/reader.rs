//!
//! IPP reader
//!
use std::io::{self, Read};

use bytes::Bytes;

#[cfg(feature = "async")]
use futures_util::io::{AsyncRead, AsyncReadExt};

use crate::{payload::IppPayload, IppHeader};

#[cfg(feature = "async")]
/// Asynchronous IPP reader contains a set of methods to read from IPP data stream
pub struct AsyncIppReader<R> {
    inner: R,
}

#[cfg(feature = "async")]
impl<R> AsyncIppReader<R>
where
    R: AsyncRead + Send + Sync + Unpin,
{
    /// Create IppReader from AsyncRead instance
    pub fn new(inner: R) -> Self {
        AsyncIppReader { inner }
    }

    async fn read_array<const N: usize>(&mut self) -> io::Result<[u8; N]> {
        let mut buf = [0u8; N];
        self.inner.read_exact(&mut buf).await?;
        Ok(buf)
    }

    async fn read_len_prefixed(&mut self) -> io::Result<Bytes> {
        let len = u16::from_be_bytes(self.read_array().await?) as usize;
        let mut buf = vec![0; len];
        self.inner.read_exact(&mut buf).await?;
        Ok(buf.into())
    }

    /// Read tag
    pub async fn read_tag(&mut self) -> io::Result<u8> {
        let [tag] = self.read_array().await?;
        Ok(tag)
    }

    /// Read IPP name from [len; name] element
    pub async fn read_name(&mut self) -> io::Result<String> {
        self.read_len_prefixed().await.map(|b| String::from_utf8_lossy(&b).into_owned())
    }

    /// Read IPP value from [len; value] element
    pub async fn read_value(&mut self) -> io::Result<Bytes> {
        self.read_len_prefixed().await
    }

    /// Read IPP header
    pub async fn read_header(&mut self) -> io::Result<IppHeader> {
        Ok(IppHeader::from_be_bytes(self.read_array().await?))
    }

    /// Convert the remaining inner stream into IppPayload
    pub fn into_payload(self) -> IppPayload
    where
        R: 'static,
    {
        IppPayload::new_async(self.inner)
    }
}

#[cfg(feature = "async")]
impl<R> From<R> for AsyncIppReader<R>
where
    R: AsyncRead + Send + Sync + Unpin,
{
    fn from(r: R) -> Self {
        AsyncIppReader::new(r)
    }
}

/// Synchronous IPP reader contains a set of methods to read from IPP data stream
pub struct IppReader<R> {
    inner: R,
}

impl<R> IppReader<R>
where
    R: Read + Send + Sync,
{
    /// Create IppReader from Read instance
    pub fn new(inner: R) -> Self {
        IppReader { inner }
    }

    fn read_array<const N: usize>(&mut self) -> io::Result<[u8; N]> {
        let mut buf = [0u8; N];
        self.inner.read_exact(&mut buf)?;
        Ok(buf)
    }

    fn read_len_prefixed(&mut self) -> io::Result<Bytes> {
        let len = u16::from_be_bytes(self.read_array()?) as usize;
        let mut buf = vec![0; len];
        self.inner.read_exact(&mut buf)?;
        Ok(buf.into())
    }

    /// Read tag
    pub fn read_tag(&mut self) -> io::Result<u8> {
        let [tag] = self.read_array()?;
        Ok(tag)
    }

    /// Read IPP name from [len; name] element
    pub fn read_name(&mut self) -> io::Result<String> {
        self.read_len_prefixed()
            .map(|b| String::from_utf8_lossy(&b).into_owned())
    }

    /// Read IPP value from [len; value] element
    pub fn read_value(&mut self) -> io::Result<Bytes> {
        self.read_len_prefixed()
    }

    /// Read IPP header
    pub fn read_header(&mut self) -> io::Result<IppHeader> {
        Ok(IppHeader::from_be_bytes(self.read_array()?))
    }

    /// Convert the remaining inner stream into IppPayload
    pub fn into_payload(self) -> IppPayload
    where
        R: 'static,
    {
        IppPayload::new(self.inner)
    }
}

impl<R> From<R> for IppReader<R>
where
    R: Read + Send + Sync,
{
    fn from(r: R) -> Self {
        IppReader::new(r)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{IppVersion, StatusCode};

    #[test]
    fn test_read_name_and_value() {
        let data = io::Cursor::new(vec![0x00, 0x04, b't', b'e', b's', b't', 0x00, 0x02, 0xff, 0x01]);
        let mut reader = IppReader::new(data);
        assert_eq!(reader.read_name().unwrap(), "test");
        assert_eq!(reader.read_value().unwrap().as_ref(), &[0xff, 0x01]);
    }

    #[test]
    fn test_read_empty_value() {
        let mut reader = IppReader::new(io::Cursor::new(vec![0x00, 0x00]));
        assert!(reader.read_value().unwrap().is_empty());
    }

    #[test]
    fn test_read_short_value() {
        let mut reader = IppReader::new(io::Cursor::new(vec![0x00, 0x08, b'a']));
        let err = reader.read_value().unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    }

    #[test]
    fn test_read_header() {
        let data = io::Cursor::new(vec![0x01, 0x01, 0x04, 0x06, 0x11, 0x22, 0x33, 0x44]);
        let mut reader = IppReader::new(data);
        let header = reader.read_header().unwrap();
        assert_eq!(header.version, IppVersion::v1_1());
        assert_eq!(header.operation_or_status, 0x406);
        assert_eq!(header.request_id, 0x11223344);
        assert_eq!(header.status_code(), StatusCode::ClientErrorNotFound);
    }

    #[cfg(feature = "async")]
    #[tokio::test]
    async fn test_async_read_name_and_value() {
        let data = futures_util::io::Cursor::new(vec![0x00, 0x04, b't', b'e', b's', b't', 0x00, 0x01, 0x07]);
        let mut reader = AsyncIppReader::new(data);
        assert_eq!(reader.read_name().await.unwrap(), "test");
        assert_eq!(reader.read_value().await.unwrap().as_ref(), &[0x07]);
    }

    #[cfg(feature = "async")]
    #[tokio::test]
    async fn test_async_read_header() {
        let data = futures_util::io::Cursor::new(vec![0x02, 0x00, 0x00, 0x02, 0x00, 0x00, 0x00, 0x01]);
        let mut reader = AsyncIppReader::new(data);
        let header = reader.read_header().await.unwrap();
        assert_eq!(header.version, IppVersion::v2_0());
        assert_eq!(header.operation_or_status, 0x0002);
        assert_eq!(header.request_id, 1);
    }
}
