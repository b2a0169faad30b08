//!
//! High-level IPP operation abstractions
//!
use http::Uri;

use crate::{
    attribute::IppAttribute,
    error::IppError,
    model::{DelimiterTag, IppVersion, Operation},
    payload::IppPayload,
    request::IppRequestResponse,
    response::{FromIppResponse, JobInfo, OperationStatus, PrinterInfo},
    value::IppValue,
};

pub mod builder;

/// Trait which represents a single IPP operation
pub trait IppOperation {
    /// Typed result of a successful response
    type Response: FromIppResponse;

    /// Convert this operation to IPP request which is ready for sending
    fn into_ipp_request(self) -> IppRequestResponse;

    /// Return IPP version for this operation. Default is 1.1
    fn version(&self) -> IppVersion {
        IppVersion::v1_1()
    }
}

impl<T: IppOperation> From<T> for IppRequestResponse {
    fn from(op: T) -> Self {
        op.into_ipp_request()
    }
}

/// Operation attributes a request of the given operation may carry besides the common ones
pub fn legal_operation_attributes(operation: Operation) -> &'static [&'static str] {
    match operation {
        Operation::PrintJob | Operation::ValidateJob => &[
            IppAttribute::JOB_NAME,
            IppAttribute::DOCUMENT_NAME,
            IppAttribute::DOCUMENT_FORMAT,
            IppAttribute::COMPRESSION,
            IppAttribute::IPP_ATTRIBUTE_FIDELITY,
        ],
        Operation::GetPrinterAttributes => &[IppAttribute::REQUESTED_ATTRIBUTES, IppAttribute::DOCUMENT_FORMAT],
        Operation::GetJobs => &[
            IppAttribute::REQUESTED_ATTRIBUTES,
            IppAttribute::WHICH_JOBS,
            IppAttribute::MY_JOBS,
            IppAttribute::LIMIT,
        ],
        Operation::GetJobAttributes => &[IppAttribute::JOB_ID, IppAttribute::REQUESTED_ATTRIBUTES],
        Operation::HoldJob => &[IppAttribute::JOB_ID, IppAttribute::MESSAGE, IppAttribute::JOB_HOLD_UNTIL],
        Operation::CancelJob | Operation::ReleaseJob | Operation::RestartJob => {
            &[IppAttribute::JOB_ID, IppAttribute::MESSAGE]
        }
        Operation::PausePrinter | Operation::ResumePrinter | Operation::PurgeJobs => &[],
    }
}

const COMMON_OPERATION_ATTRIBUTES: &[&str] = &[
    IppAttribute::ATTRIBUTES_CHARSET,
    IppAttribute::ATTRIBUTES_NATURAL_LANGUAGE,
    IppAttribute::PRINTER_URI,
    IppAttribute::REQUESTING_USER_NAME,
];

/// Validated content of a single request
pub(crate) struct RequestParts {
    pub(crate) version: IppVersion,
    pub(crate) operation: Operation,
    pub(crate) printer_uri: Uri,
    pub(crate) job_id: Option<i32>,
    pub(crate) operation_attributes: Vec<IppAttribute>,
    pub(crate) job_attributes: Vec<IppAttribute>,
    pub(crate) payload: IppPayload,
}

impl RequestParts {
    pub(crate) fn new(operation: Operation, printer_uri: Uri) -> Self {
        RequestParts {
            version: IppVersion::default(),
            operation,
            printer_uri,
            job_id: None,
            operation_attributes: Vec::new(),
            job_attributes: Vec::new(),
            payload: IppPayload::empty(),
        }
    }

    pub(crate) fn add_operation_attribute(&mut self, name: &str, value: IppValue) {
        self.operation_attributes.push(IppAttribute::new(name, value));
    }

    pub(crate) fn validate(&self) -> Result<(), IppError> {
        let operation = self.operation;

        match self.printer_uri.scheme_str() {
            Some("ipp" | "ipps" | "http" | "https") if self.printer_uri.authority().is_some() => {}
            _ => {
                return Err(IppError::InvalidRequest(format!(
                    "unsupported printer URI: {}",
                    self.printer_uri
                )))
            }
        }

        if operation.targets_job() {
            match self.job_id {
                Some(id) if id > 0 => {}
                Some(id) => return Err(IppError::InvalidRequest(format!("{operation}: invalid job-id {id}"))),
                None => return Err(IppError::InvalidRequest(format!("{operation}: job-id is required"))),
            }
        } else if self.job_id.is_some() {
            return Err(IppError::InvalidRequest(format!("{operation} does not take a job-id")));
        }

        let legal = legal_operation_attributes(operation);
        for attr in &self.operation_attributes {
            if !COMMON_OPERATION_ATTRIBUTES.contains(&attr.name()) && !legal.contains(&attr.name()) {
                return Err(IppError::InvalidRequest(format!(
                    "{operation} does not accept operation attribute '{}'",
                    attr.name()
                )));
            }
            attr.validate()?;
        }

        if !self.job_attributes.is_empty() && !operation.accepts_job_attributes() {
            return Err(IppError::InvalidRequest(format!("{operation} does not accept job attributes")));
        }

        for attr in &self.job_attributes {
            if COMMON_OPERATION_ATTRIBUTES.contains(&attr.name()) || legal.contains(&attr.name()) {
                return Err(IppError::InvalidRequest(format!(
                    "'{}' is an operation attribute",
                    attr.name()
                )));
            }
            attr.validate()?;
        }

        if !self.payload.is_empty() && !operation.accepts_document() {
            return Err(IppError::InvalidRequest(format!("{operation} does not accept document data")));
        }

        Ok(())
    }

    pub(crate) fn into_request(self) -> IppRequestResponse {
        let mut retval = IppRequestResponse::new(self.version, self.operation, Some(self.printer_uri));

        if let Some(job_id) = self.job_id {
            retval.attributes_mut().add(
                DelimiterTag::OperationAttributes,
                IppAttribute::new(IppAttribute::JOB_ID, IppValue::Integer(job_id)),
            );
        }

        for attr in self.operation_attributes {
            retval.attributes_mut().add(DelimiterTag::OperationAttributes, attr);
        }

        for attr in self.job_attributes {
            retval.attributes_mut().add(DelimiterTag::JobAttributes, attr);
        }

        *retval.payload_mut() = self.payload;

        retval
    }
}

macro_rules! ipp_operation {
    ($($(#[$meta:meta])* $name:ident => $response:ty),* $(,)?) => {
        $(
            $(#[$meta])*
            pub struct $name(pub(crate) RequestParts);

            impl IppOperation for $name {
                type Response = $response;

                fn into_ipp_request(self) -> IppRequestResponse {
                    self.0.into_request()
                }

                fn version(&self) -> IppVersion {
                    self.0.version
                }
            }
        )*
    };
}

ipp_operation! {
    /// IPP operation Print-Job
    PrintJob => JobInfo,
    /// IPP operation Validate-Job, never carries document data
    ValidateJob => OperationStatus,
    /// IPP operation Get-Printer-Attributes
    GetPrinterAttributes => PrinterInfo,
    /// IPP operation Get-Jobs
    GetJobs => Vec<JobInfo>,
    /// IPP operation Get-Job-Attributes
    GetJobAttributes => JobInfo,
    /// IPP operation Cancel-Job
    CancelJob => OperationStatus,
    /// IPP operation Hold-Job
    HoldJob => OperationStatus,
    /// IPP operation Release-Job
    ReleaseJob => OperationStatus,
    /// IPP operation Restart-Job
    RestartJob => OperationStatus,
    /// IPP operation Pause-Printer
    PausePrinter => OperationStatus,
    /// IPP operation Resume-Printer
    ResumePrinter => OperationStatus,
    /// IPP operation Purge-Jobs
    PurgeJobs => OperationStatus,
}
