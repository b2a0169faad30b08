//!
//! Minimal IPP client core for Rust. This crate can be used in several ways:
//! * using the low-level request/response API and building the requests manually.
//! * using the typed operations API with builders, covering job submission, job control and printer control.
//! * using the built-in asynchronous IPP client which also interprets the response status.
//! * using any third-party HTTP client and send the serialized request manually.
//!
//! The following feature flags are supported:
//! * `async` - enable async APIs (parser, I/O)
//! * `async-client` - enable async HTTP client via `reqwest` crate
//! * `async-client-tls` - enable async client with TLS support via `native-tls` crate (default)
//! * `async-client-rustls` - enable async client with TLS support via `rustls` crate
//! * `serde` - serialization support for the model and attribute types
//!
//! Implementation notes:
//! * all RFC IPP values are supported including arrays and collections, for both de- and serialization.
//! * requests are validated when built, invalid attributes never reach the network.
//! * a non-successful IPP status is an error of its own kind, distinct from transport failures.
//!
//! Usage examples:
//!
//!```rust,no_run
//! // using low-level async API
//! use ippkit::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let uri: Uri = "ipp://localhost:631/printers/test-printer".parse()?;
//!     let req = IppRequestResponse::new(
//!         IppVersion::v1_1(),
//!         Operation::GetPrinterAttributes,
//!         Some(uri.clone())
//!     );
//!     let client = AsyncIppClient::new(uri);
//!     let resp = client.send(req).await?;
//!     if resp.header().status_code().is_success() {
//!         println!("{:?}", resp.attributes());
//!     }
//!     Ok(())
//! }
//!```
//!```rust,no_run
//! // using typed operations
//! use ippkit::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let uri: Uri = "ipp://localhost:631/printers/test-printer".parse()?;
//!     let client = AsyncIppClient::new(uri.clone());
//!     let operation = IppOperationBuilder::print_job(uri, IppPayload::from_bytes(&b"hello"[..]))
//!         .job_title("Test")
//!         .copies(1)
//!         .sides(Sides::OneSided)
//!         .build()?;
//!     match client.execute(operation).await {
//!         Ok(job) => println!("job {} created", job.id),
//!         Err(e) if e.is_not_found() => println!("no such printer"),
//!         Err(e) => return Err(e.into()),
//!     }
//!     Ok(())
//! }
//!```

use bytes::{BufMut, Bytes, BytesMut};
use num_traits::FromPrimitive;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::model::{IppVersion, StatusClass, StatusCode};

pub mod attribute;
#[cfg(feature = "async-client")]
pub mod client;
pub mod error;
pub mod model;
pub mod operation;
pub mod parser;
pub mod payload;
pub mod reader;
pub mod request;
pub mod response;
pub mod util;
pub mod value;

pub mod prelude {
    //!
    //! Common imports
    //!
    pub use http::Uri;
    pub use num_traits::FromPrimitive as _;

    pub use crate::{
        attribute::{IppAttribute, IppAttributeGroup, IppAttributes},
        error::{ErrorClass, IppError},
        model::*,
        operation::{builder::IppOperationBuilder, IppOperation},
        payload::IppPayload,
        request::IppRequestResponse,
        response::{check_status, JobInfo, OperationStatus, PrinterInfo, StatusErrorKind},
        value::IppValue,
    };

    #[cfg(feature = "async-client")]
    pub use super::client::non_blocking::AsyncIppClient;

    pub use super::IppHeader;
}

/// IPP request and response header
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Debug, PartialEq)]
pub struct IppHeader {
    /// IPP protocol version
    pub version: IppVersion,
    /// Operation tag for requests, status for responses
    pub operation_or_status: u16,
    /// ID of the request
    pub request_id: u32,
}

impl IppHeader {
    /// Create IPP header
    pub fn new(version: IppVersion, operation_or_status: u16, request_id: u32) -> IppHeader {
        IppHeader {
            version,
            operation_or_status,
            request_id,
        }
    }

    /// Decode header from its 8-byte wire form
    pub fn from_be_bytes(data: [u8; 8]) -> IppHeader {
        IppHeader {
            version: IppVersion(u16::from_be_bytes([data[0], data[1]])),
            operation_or_status: u16::from_be_bytes([data[2], data[3]]),
            request_id: u32::from_be_bytes([data[4], data[5], data[6], data[7]]),
        }
    }

    /// Write header to a given writer
    pub fn to_bytes(&self) -> Bytes {
        let mut buffer = BytesMut::new();
        buffer.put_u16(self.version.0);
        buffer.put_u16(self.operation_or_status);
        buffer.put_u32(self.request_id);

        buffer.freeze()
    }

    /// Decode and get IPP status code from the header
    pub fn status_code(&self) -> StatusCode {
        StatusCode::from_u16(self.operation_or_status).unwrap_or(StatusCode::UnknownStatusCode)
    }

    /// Status family of the raw status code, also for codes without a `StatusCode` constant
    pub fn status_class(&self) -> StatusClass {
        StatusClass::from_code(self.operation_or_status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_to_bytes() {
        let header = IppHeader::new(IppVersion::v2_1(), 0x1234, 0xaa55_aa55);
        let buf = header.to_bytes();
        assert_eq!(buf, vec![0x02, 0x01, 0x12, 0x34, 0xaa, 0x55, 0xaa, 0x55]);
        assert_eq!(IppHeader::from_be_bytes([0x02, 0x01, 0x12, 0x34, 0xaa, 0x55, 0xaa, 0x55]), header);
    }

    #[test]
    fn test_unregistered_status_class() {
        let header = IppHeader::new(IppVersion::v1_1(), 0x04ff, 1);
        assert_eq!(header.status_code(), StatusCode::UnknownStatusCode);
        assert_eq!(header.status_class(), StatusClass::ClientError);
    }
}
