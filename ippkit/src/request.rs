//!
//! IPP request
//!
use std::io::{self, Read};

use bytes::{BufMut, Bytes, BytesMut};
#[cfg(feature = "async")]
use futures_util::io::{AsyncRead, AsyncReadExt};
use http::Uri;
use log::debug;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{
    attribute::{IppAttribute, IppAttributes},
    model::{DelimiterTag, IppVersion, Operation, StatusCode},
    parser::{IppParseError, IppParser},
    payload::IppPayload,
    reader::IppReader,
    value::IppValue,
    IppHeader,
};

/// IPP request/response struct
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug)]
pub struct IppRequestResponse {
    pub(crate) header: IppHeader,
    pub(crate) attributes: IppAttributes,
    #[cfg_attr(feature = "serde", serde(skip))]
    pub(crate) payload: IppPayload,
}

fn add_natural_language(attributes: &mut IppAttributes) {
    attributes.add(
        DelimiterTag::OperationAttributes,
        IppAttribute::new(IppAttribute::ATTRIBUTES_CHARSET, IppValue::Charset("utf-8".to_owned())),
    );
    attributes.add(
        DelimiterTag::OperationAttributes,
        IppAttribute::new(
            IppAttribute::ATTRIBUTES_NATURAL_LANGUAGE,
            IppValue::NaturalLanguage("en".to_owned()),
        ),
    );
}

impl IppRequestResponse {
    /// Create new IPP request for the operation and uri.
    /// The request id is 1, clients replace it with their own counter value.
    pub fn new(version: IppVersion, operation: Operation, uri: Option<Uri>) -> IppRequestResponse {
        let header = IppHeader::new(version, operation as u16, 1);
        let mut attributes = IppAttributes::new();

        add_natural_language(&mut attributes);

        if let Some(uri) = uri {
            attributes.add(
                DelimiterTag::OperationAttributes,
                IppAttribute::new(
                    IppAttribute::PRINTER_URI,
                    IppValue::Uri(crate::util::canonicalize_uri(&uri).to_string()),
                ),
            );
        }

        IppRequestResponse {
            header,
            attributes,
            payload: IppPayload::empty(),
        }
    }

    /// Create response from status and id
    pub fn new_response(version: IppVersion, status: StatusCode, id: u32) -> IppRequestResponse {
        let mut attributes = IppAttributes::new();
        add_natural_language(&mut attributes);

        IppRequestResponse {
            header: IppHeader::new(version, status as u16, id),
            attributes,
            payload: IppPayload::empty(),
        }
    }

    /// Decode a complete in-memory IPP message, the bytes after the attributes become the payload
    pub fn from_bytes<B: Into<Bytes>>(data: B) -> Result<IppRequestResponse, IppParseError> {
        IppParser::new(IppReader::new(io::Cursor::new(data.into()))).parse()
    }

    /// Get IPP header
    pub fn header(&self) -> &IppHeader {
        &self.header
    }

    /// Get mutable IPP header
    pub fn header_mut(&mut self) -> &mut IppHeader {
        &mut self.header
    }

    /// Get attributes
    pub fn attributes(&self) -> &IppAttributes {
        &self.attributes
    }

    /// Get attributes
    pub fn attributes_mut(&mut self) -> &mut IppAttributes {
        &mut self.attributes
    }

    /// Get payload
    pub fn payload(&self) -> &IppPayload {
        &self.payload
    }

    /// Get mutable payload
    pub fn payload_mut(&mut self) -> &mut IppPayload {
        &mut self.payload
    }

    /// Stamp a request id into the header
    pub fn with_request_id(mut self, request_id: u32) -> Self {
        self.header.request_id = request_id;
        self
    }

    /// Write request to byte array not including payload
    pub fn to_bytes(&self) -> Bytes {
        let mut buffer = BytesMut::new();
        buffer.put(self.header.to_bytes());
        buffer.put(self.attributes.to_bytes());
        buffer.freeze()
    }

    #[cfg(feature = "async")]
    /// Convert request/response into AsyncRead including payload
    pub fn into_async_read(self) -> impl AsyncRead + Send + Sync + 'static {
        let header = self.to_bytes();
        debug!(
            "IPP request {:#06x} id {}, attributes size: {}",
            self.header.operation_or_status,
            self.header.request_id,
            header.len()
        );

        futures_util::io::Cursor::new(header).chain(self.payload)
    }

    /// Convert request/response into Read including payload
    pub fn into_read(self) -> impl Read + Send + Sync + 'static {
        let header = self.to_bytes();
        debug!(
            "IPP request {:#06x} id {}, attributes size: {}",
            self.header.operation_or_status,
            self.header.request_id,
            header.len()
        );

        io::Cursor::new(header).chain(self.payload)
    }

    /// Consume request/response and return a payload
    pub fn into_payload(self) -> IppPayload {
        self.payload
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uri() -> Uri {
        "ipp://user@printer.local/ipp/print".parse().unwrap()
    }

    #[test]
    fn test_new_request_operation_group() {
        let req = IppRequestResponse::new(IppVersion::v1_1(), Operation::GetPrinterAttributes, Some(uri()));
        assert_eq!(req.header().request_id, 1);
        assert_eq!(req.header().operation_or_status, 0x000b);

        let attrs = req.attributes();
        let op = DelimiterTag::OperationAttributes;
        assert_eq!(
            attrs.get(op, IppAttribute::ATTRIBUTES_CHARSET).map(|a| a.value()),
            Some(&IppValue::Charset("utf-8".to_owned()))
        );
        assert_eq!(
            attrs.get(op, IppAttribute::ATTRIBUTES_NATURAL_LANGUAGE).map(|a| a.value()),
            Some(&IppValue::NaturalLanguage("en".to_owned()))
        );
        assert_eq!(
            attrs.get(op, IppAttribute::PRINTER_URI).map(|a| a.value()),
            Some(&IppValue::Uri("ipp://printer.local/ipp/print".to_owned()))
        );
    }

    #[test]
    fn test_request_id_only_changes_id_bytes() {
        let a = IppRequestResponse::new(IppVersion::v1_1(), Operation::GetJobs, Some(uri())).with_request_id(7);
        let b = IppRequestResponse::new(IppVersion::v1_1(), Operation::GetJobs, Some(uri())).with_request_id(8);
        let (a, b) = (a.to_bytes(), b.to_bytes());
        assert_eq!(a.len(), b.len());
        assert_eq!(a[..4], b[..4]);
        assert_eq!(&a[4..8], &[0, 0, 0, 7]);
        assert_eq!(&b[4..8], &[0, 0, 0, 8]);
        assert_eq!(a[8..], b[8..]);
    }

    #[test]
    fn test_into_read_appends_payload() {
        let mut req = IppRequestResponse::new(IppVersion::v2_0(), Operation::PrintJob, Some(uri()));
        *req.payload_mut() = IppPayload::from_bytes(&b"data"[..]);
        let attr_len = req.to_bytes().len();

        let mut buf = Vec::new();
        req.into_read().read_to_end(&mut buf).unwrap();
        assert_eq!(buf.len(), attr_len + 4);
        assert_eq!(&buf[buf.len() - 5..], b"\x03data");
    }

    #[test]
    fn test_decode_encoded_response() {
        let mut resp = IppRequestResponse::new_response(IppVersion::v1_1(), StatusCode::ClientErrorNotFound, 42);
        resp.attributes_mut().add(
            DelimiterTag::OperationAttributes,
            IppAttribute::new(
                IppAttribute::STATUS_MESSAGE,
                IppValue::TextWithoutLanguage("no such job".to_owned()),
            ),
        );
        let decoded = IppRequestResponse::from_bytes(resp.to_bytes()).unwrap();
        assert_eq!(decoded.header().request_id, 42);
        assert_eq!(decoded.header().status_code(), StatusCode::ClientErrorNotFound);
        assert_eq!(decoded.attributes(), resp.attributes());
    }
}
