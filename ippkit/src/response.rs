//!
//! Response interpretation: status checking and typed results
//!
use std::fmt;

use chrono::{DateTime, FixedOffset};
use log::debug;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{
    attribute::{IppAttribute, IppAttributeGroup, IppAttributes},
    error::IppError,
    model::{DelimiterTag, JobState, PrinterState, StatusClass, StatusCode},
    request::IppRequestResponse,
    value::IppValue,
    FromPrimitive as _,
};

// printer-state-reasons which prevent printing
const ERROR_STATES: &[&str] = &[
    "media-jam",
    "media-empty",
    "toner-empty",
    "spool-area-full",
    "cover-open",
    "door-open",
    "input-tray-missing",
    "output-tray-missing",
    "marker-supply-empty",
    "paused",
    "shutdown",
];

/// Coarse kind of a non-successful IPP status
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum StatusErrorKind {
    /// The target job or printer does not exist or is no longer available
    NotFound,
    /// The printer does not implement the operation
    OperationNotSupported,
    ClientError,
    ServerError,
    Other,
}

/// Non-successful IPP status returned by the printer
#[derive(Debug, Clone)]
pub struct IppStatusError {
    status: StatusCode,
    code: u16,
    message: Option<String>,
    unsupported: Option<IppAttributeGroup>,
}

impl IppStatusError {
    /// Decoded status code, `UnknownStatusCode` for unregistered codes
    pub fn status_code(&self) -> StatusCode {
        self.status
    }

    /// Raw numeric status code
    pub fn code(&self) -> u16 {
        self.code
    }

    /// status-message reported by the printer
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    /// Attributes the printer did not support
    pub fn unsupported_attributes(&self) -> Option<&IppAttributeGroup> {
        self.unsupported.as_ref()
    }

    /// Status family of the raw code
    pub fn class(&self) -> StatusClass {
        StatusClass::from_code(self.code)
    }

    pub fn kind(&self) -> StatusErrorKind {
        match self.code {
            0x0404 | 0x0406 | 0x0407 => StatusErrorKind::NotFound,
            0x0501 => StatusErrorKind::OperationNotSupported,
            _ => match self.class() {
                StatusClass::ClientError => StatusErrorKind::ClientError,
                StatusClass::ServerError => StatusErrorKind::ServerError,
                _ => StatusErrorKind::Other,
            },
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.kind() == StatusErrorKind::NotFound
    }

    pub fn is_operation_not_supported(&self) -> bool {
        self.kind() == StatusErrorKind::OperationNotSupported
    }
}

impl fmt::Display for IppStatusError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "IPP status {:#06x}: {}", self.code, self.status)?;
        if let Some(ref message) = self.message {
            write!(f, " ({message})")?;
        }
        Ok(())
    }
}

impl std::error::Error for IppStatusError {}

fn status_message(attributes: &IppAttributes) -> Option<String> {
    attributes
        .get(DelimiterTag::OperationAttributes, IppAttribute::STATUS_MESSAGE)
        .and_then(|a| a.value().as_str())
        .map(ToOwned::to_owned)
}

fn unsupported_group(attributes: &IppAttributes) -> Option<IppAttributeGroup> {
    attributes.groups_of(DelimiterTag::UnsupportedAttributes).next().cloned()
}

/// Pass a successful response through, turn any other status into [`IppError::Status`]
pub fn check_status(response: IppRequestResponse) -> Result<IppRequestResponse, IppError> {
    let code = response.header().operation_or_status;
    if StatusClass::from_code(code) == StatusClass::Successful {
        return Ok(response);
    }

    let error = IppStatusError {
        status: response.header().status_code(),
        code,
        message: status_message(response.attributes()),
        unsupported: unsupported_group(response.attributes()),
    };
    debug!("IPP request failed: {error}");
    Err(IppError::Status(error))
}

/// Conversion of a successful response into a typed result
pub trait FromIppResponse: Sized {
    fn from_response(response: IppRequestResponse) -> Result<Self, IppError>;
}

impl FromIppResponse for IppRequestResponse {
    fn from_response(response: IppRequestResponse) -> Result<Self, IppError> {
        Ok(response)
    }
}

fn string_value(group: &IppAttributeGroup, name: &str) -> Option<String> {
    group.value(name).and_then(IppValue::as_str).map(ToOwned::to_owned)
}

fn string_list(group: &IppAttributeGroup, name: &str) -> Vec<String> {
    group
        .value(name)
        .into_iter()
        .flat_map(|v| v.into_iter())
        .filter_map(IppValue::as_str)
        .map(ToOwned::to_owned)
        .collect()
}

fn integer_value(group: &IppAttributeGroup, name: &str) -> Result<Option<i32>, IppError> {
    match group.value(name) {
        None => Ok(None),
        Some(IppValue::Integer(i)) => Ok(Some(*i)),
        Some(v) if v.is_out_of_band() => Ok(None),
        Some(v) => Err(IppError::InvalidAttributeType(format!("{name}: {v}"))),
    }
}

fn enum_value(group: &IppAttributeGroup, name: &str) -> Result<Option<i32>, IppError> {
    match group.value(name) {
        None => Ok(None),
        Some(IppValue::Enum(i)) => Ok(Some(*i)),
        Some(v) if v.is_out_of_band() => Ok(None),
        Some(v) => Err(IppError::InvalidAttributeType(format!("{name}: {v}"))),
    }
}

/// Job description as returned by Print-Job, Get-Jobs and Get-Job-Attributes
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct JobInfo {
    pub id: i32,
    pub uri: Option<String>,
    pub name: Option<String>,
    pub state: Option<JobState>,
    pub state_reasons: Vec<String>,
    pub state_message: Option<String>,
    pub originating_user: Option<String>,
    pub printer_uri: Option<String>,
    /// Seconds since printer startup
    pub time_at_creation: Option<i32>,
    pub date_time_at_creation: Option<DateTime<FixedOffset>>,
    pub k_octets_processed: Option<i32>,
    pub impressions_completed: Option<i32>,
}

impl JobInfo {
    /// Build job description from a job attributes group
    pub fn from_group(group: &IppAttributeGroup) -> Result<JobInfo, IppError> {
        let id = integer_value(group, IppAttribute::JOB_ID)?.ok_or(IppError::MissingAttribute(IppAttribute::JOB_ID))?;

        Ok(JobInfo {
            id,
            uri: string_value(group, IppAttribute::JOB_URI),
            name: string_value(group, IppAttribute::JOB_NAME),
            state: enum_value(group, IppAttribute::JOB_STATE)?.and_then(JobState::from_i32),
            state_reasons: string_list(group, IppAttribute::JOB_STATE_REASONS),
            state_message: string_value(group, IppAttribute::JOB_STATE_MESSAGE),
            originating_user: string_value(group, IppAttribute::JOB_ORIGINATING_USER_NAME),
            printer_uri: string_value(group, IppAttribute::JOB_PRINTER_URI),
            time_at_creation: integer_value(group, IppAttribute::TIME_AT_CREATION)?,
            date_time_at_creation: group
                .value(IppAttribute::DATE_TIME_AT_CREATION)
                .and_then(IppValue::to_date_time),
            k_octets_processed: integer_value(group, IppAttribute::JOB_K_OCTETS_PROCESSED)?,
            impressions_completed: integer_value(group, IppAttribute::JOB_IMPRESSIONS_COMPLETED)?,
        })
    }
}

impl FromIppResponse for JobInfo {
    fn from_response(response: IppRequestResponse) -> Result<Self, IppError> {
        let group = response
            .attributes()
            .groups_of(DelimiterTag::JobAttributes)
            .next()
            .ok_or(IppError::MissingAttribute(IppAttribute::JOB_ID))?;
        JobInfo::from_group(group)
    }
}

impl FromIppResponse for Vec<JobInfo> {
    fn from_response(response: IppRequestResponse) -> Result<Self, IppError> {
        response
            .attributes()
            .groups_of(DelimiterTag::JobAttributes)
            .map(JobInfo::from_group)
            .collect()
    }
}

/// Printer description as returned by Get-Printer-Attributes
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct PrinterInfo {
    pub uri: Option<String>,
    pub name: Option<String>,
    pub state: Option<PrinterState>,
    pub state_reasons: Vec<String>,
    pub state_message: Option<String>,
    pub document_formats: Vec<String>,
    pub accepting_jobs: Option<bool>,
    pub make_and_model: Option<String>,
    pub location: Option<String>,
    pub queued_job_count: Option<i32>,
    /// Full printer attributes group
    pub attributes: IppAttributeGroup,
}

impl PrinterInfo {
    /// Build printer description from a printer attributes group
    pub fn from_group(group: &IppAttributeGroup) -> Result<PrinterInfo, IppError> {
        let accepting_jobs = match group.value(IppAttribute::PRINTER_IS_ACCEPTING_JOBS) {
            None => None,
            Some(IppValue::Boolean(b)) => Some(*b),
            Some(v) => {
                return Err(IppError::InvalidAttributeType(format!(
                    "{}: {v}",
                    IppAttribute::PRINTER_IS_ACCEPTING_JOBS
                )))
            }
        };

        Ok(PrinterInfo {
            uri: string_list(group, IppAttribute::PRINTER_URI_SUPPORTED).into_iter().next(),
            name: string_value(group, IppAttribute::PRINTER_NAME),
            state: enum_value(group, IppAttribute::PRINTER_STATE)?.and_then(PrinterState::from_i32),
            state_reasons: string_list(group, IppAttribute::PRINTER_STATE_REASONS),
            state_message: string_value(group, IppAttribute::PRINTER_STATE_MESSAGE),
            document_formats: string_list(group, IppAttribute::DOCUMENT_FORMAT_SUPPORTED),
            accepting_jobs,
            make_and_model: string_value(group, IppAttribute::PRINTER_MAKE_AND_MODEL),
            location: string_value(group, IppAttribute::PRINTER_LOCATION),
            queued_job_count: integer_value(group, IppAttribute::QUEUED_JOB_COUNT)?,
            attributes: group.clone(),
        })
    }

    /// State reasons which prevent printing
    pub fn error_reasons(&self) -> Vec<&str> {
        self.state_reasons
            .iter()
            .map(String::as_str)
            .filter(|r| {
                let keyword = r
                    .strip_suffix("-error")
                    .or_else(|| r.strip_suffix("-warning"))
                    .or_else(|| r.strip_suffix("-report"));
                match keyword {
                    Some(keyword) => r.ends_with("-error") && ERROR_STATES.contains(&keyword),
                    None => ERROR_STATES.contains(r),
                }
            })
            .collect()
    }

    /// Printer is not stopped, accepts jobs and reports no blocking state reasons
    pub fn is_ready(&self) -> bool {
        self.state != Some(PrinterState::Stopped) && self.accepting_jobs != Some(false) && self.error_reasons().is_empty()
    }
}

impl FromIppResponse for PrinterInfo {
    fn from_response(response: IppRequestResponse) -> Result<Self, IppError> {
        let group = response
            .attributes()
            .groups_of(DelimiterTag::PrinterAttributes)
            .next()
            .ok_or(IppError::MissingAttribute(IppAttribute::PRINTER_STATE))?;
        PrinterInfo::from_group(group)
    }
}

/// Outcome of operations without a typed payload
#[derive(Debug, Clone)]
pub struct OperationStatus {
    pub status: StatusCode,
    pub code: u16,
    pub message: Option<String>,
    pub unsupported: Option<IppAttributeGroup>,
}

impl FromIppResponse for OperationStatus {
    fn from_response(response: IppRequestResponse) -> Result<Self, IppError> {
        Ok(OperationStatus {
            status: response.header().status_code(),
            code: response.header().operation_or_status,
            message: status_message(response.attributes()),
            unsupported: unsupported_group(response.attributes()),
        })
    }
}
