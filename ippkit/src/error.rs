//!
//! IPP error
//!
use crate::{parser::IppParseError, response::IppStatusError};

/// Broad category of an [`IppError`]
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ErrorClass {
    /// Connection, TLS, timeout, HTTP status or body transfer failure, cancellation
    Network,
    /// The printer answered with a non-successful IPP status
    Protocol,
    /// The request could not be built or encoded, nothing was sent
    Encoding,
    /// The response body is not a valid IPP message or lacks required attributes
    Decoding,
}

/// IPP error
#[allow(clippy::large_enum_variant)]
#[derive(Debug, thiserror::Error)]
pub enum IppError {
    #[error(transparent)]
    #[cfg(feature = "async-client")]
    /// Client error
    AsyncClientError(#[from] reqwest::Error),

    #[error("HTTP request error: {0}")]
    /// HTTP request error
    RequestError(u16),

    #[error("Request cancelled")]
    /// Request was abandoned by the caller
    Cancelled,

    #[error("Invalid certificate: {0}")]
    /// Custom CA certificate could not be loaded
    InvalidCertificate(String),

    #[error(transparent)]
    /// IPP status error
    Status(#[from] IppStatusError),

    #[error("Invalid request: {0}")]
    /// Request rejected before sending
    InvalidRequest(String),

    #[error(transparent)]
    /// Parsing error
    ParseError(#[from] IppParseError),

    #[error("Missing attribute in response: {0}")]
    /// Missing attribute in response
    MissingAttribute(&'static str),

    #[error("Invalid attribute type: {0}")]
    /// Invalid attribute type
    InvalidAttributeType(String),
}

impl IppError {
    /// Classify this error
    pub fn class(&self) -> ErrorClass {
        match self {
            #[cfg(feature = "async-client")]
            IppError::AsyncClientError(_) => ErrorClass::Network,
            IppError::RequestError(_)
            | IppError::Cancelled
            | IppError::InvalidCertificate(_)
            | IppError::ParseError(IppParseError::IoError(_)) => ErrorClass::Network,
            IppError::Status(_) => ErrorClass::Protocol,
            IppError::InvalidRequest(_) => ErrorClass::Encoding,
            IppError::ParseError(_) | IppError::MissingAttribute(_) | IppError::InvalidAttributeType(_) => {
                ErrorClass::Decoding
            }
        }
    }

    /// Return IPP status error if the printer rejected the request
    pub fn as_status(&self) -> Option<&IppStatusError> {
        match self {
            IppError::Status(status) => Some(status),
            _ => None,
        }
    }

    /// True if the printer reported that the target job or printer does not exist
    pub fn is_not_found(&self) -> bool {
        self.as_status().is_some_and(IppStatusError::is_not_found)
    }

    /// True if the printer does not implement the operation
    pub fn is_operation_not_supported(&self) -> bool {
        self.as_status()
            .is_some_and(IppStatusError::is_operation_not_supported)
    }
}
