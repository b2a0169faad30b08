//!
//! IPP operation builders
//!
use http::Uri;

use crate::{
    attribute::IppAttribute,
    error::IppError,
    model::{IppVersion, Operation, Orientation, PrintQuality, Sides, WhichJobs},
    operation::*,
    payload::IppPayload,
    value::IppValue,
};

/// Builder to create IPP operations
pub struct IppOperationBuilder;

impl IppOperationBuilder {
    /// Create PrintJob operation
    ///
    /// * `printer_uri` - printer URI<br/>
    /// * `payload` - `IppPayload`
    pub fn print_job(printer_uri: Uri, payload: IppPayload) -> PrintJobBuilder {
        PrintJobBuilder::new(printer_uri, payload)
    }

    /// Create ValidateJob operation
    ///
    /// * `printer_uri` - printer URI
    pub fn validate_job(printer_uri: Uri) -> ValidateJobBuilder {
        ValidateJobBuilder::new(printer_uri)
    }

    /// Create GetPrinterAttributes operation
    ///
    /// * `printer_uri` - printer URI
    pub fn get_printer_attributes(printer_uri: Uri) -> GetPrinterAttributesBuilder {
        GetPrinterAttributesBuilder::new(printer_uri)
    }

    /// Create GetJobs operation
    ///
    /// * `printer_uri` - printer URI
    pub fn get_jobs(printer_uri: Uri) -> GetJobsBuilder {
        GetJobsBuilder::new(printer_uri)
    }

    /// Create GetJobAttributes operation
    ///
    /// * `printer_uri` - printer URI
    /// * `job_id` - job id <br/>
    pub fn get_job_attributes(printer_uri: Uri, job_id: i32) -> GetJobAttributesBuilder {
        GetJobAttributesBuilder::new(printer_uri, job_id)
    }

    /// Create CancelJob operation
    ///
    /// * `printer_uri` - printer URI
    /// * `job_id` - job id to cancel <br/>
    pub fn cancel_job(printer_uri: Uri, job_id: i32) -> CancelJobBuilder {
        CancelJobBuilder::new(printer_uri, job_id)
    }

    /// Create HoldJob operation
    ///
    /// * `printer_uri` - printer URI
    /// * `job_id` - job id to hold <br/>
    pub fn hold_job(printer_uri: Uri, job_id: i32) -> HoldJobBuilder {
        HoldJobBuilder::new(printer_uri, job_id)
    }

    /// Create ReleaseJob operation
    ///
    /// * `printer_uri` - printer URI
    /// * `job_id` - job id to release <br/>
    pub fn release_job(printer_uri: Uri, job_id: i32) -> ReleaseJobBuilder {
        ReleaseJobBuilder::new(printer_uri, job_id)
    }

    /// Create RestartJob operation
    ///
    /// * `printer_uri` - printer URI
    /// * `job_id` - job id to restart <br/>
    pub fn restart_job(printer_uri: Uri, job_id: i32) -> RestartJobBuilder {
        RestartJobBuilder::new(printer_uri, job_id)
    }

    /// Create PausePrinter operation
    ///
    /// * `printer_uri` - printer URI
    pub fn pause_printer(printer_uri: Uri) -> PausePrinterBuilder {
        PausePrinterBuilder::new(printer_uri)
    }

    /// Create ResumePrinter operation
    ///
    /// * `printer_uri` - printer URI
    pub fn resume_printer(printer_uri: Uri) -> ResumePrinterBuilder {
        ResumePrinterBuilder::new(printer_uri)
    }

    /// Create PurgeJobs operation
    ///
    /// * `printer_uri` - printer URI
    pub fn purge_jobs(printer_uri: Uri) -> PurgeJobsBuilder {
        PurgeJobsBuilder::new(printer_uri)
    }
}

// setters shared by every builder
macro_rules! common_setters {
    () => {
        /// Specify requesting-user-name attribute
        pub fn user_name<S>(mut self, user_name: S) -> Self
        where
            S: AsRef<str>,
        {
            self.parts.add_operation_attribute(
                IppAttribute::REQUESTING_USER_NAME,
                IppValue::NameWithoutLanguage(user_name.as_ref().to_owned()),
            );
            self
        }

        /// Set IPP protocol version of the request. Default is 1.1
        pub fn version(mut self, version: IppVersion) -> Self {
            self.parts.version = version;
            self
        }
    };
}

// setters of the job creation operations
macro_rules! job_template_setters {
    () => {
        /// Specify job-name attribute
        pub fn job_title<S>(mut self, job_name: S) -> Self
        where
            S: AsRef<str>,
        {
            self.parts.add_operation_attribute(
                IppAttribute::JOB_NAME,
                IppValue::NameWithoutLanguage(job_name.as_ref().to_owned()),
            );
            self
        }

        /// Specify document-name attribute
        pub fn document_name<S>(mut self, name: S) -> Self
        where
            S: AsRef<str>,
        {
            self.parts.add_operation_attribute(
                IppAttribute::DOCUMENT_NAME,
                IppValue::NameWithoutLanguage(name.as_ref().to_owned()),
            );
            self
        }

        /// Specify document-format attribute, for example `application/pdf`
        pub fn document_format<S>(mut self, format: S) -> Self
        where
            S: AsRef<str>,
        {
            self.parts.add_operation_attribute(
                IppAttribute::DOCUMENT_FORMAT,
                IppValue::MimeMediaType(format.as_ref().to_owned()),
            );
            self
        }

        /// Specify copies job attribute
        pub fn copies(self, copies: i32) -> Self {
            self.attribute(IppAttribute::new(IppAttribute::COPIES, IppValue::Integer(copies)))
        }

        /// Specify sides job attribute
        pub fn sides(self, sides: Sides) -> Self {
            self.attribute(IppAttribute::new(
                IppAttribute::SIDES,
                IppValue::Keyword(sides.as_keyword().to_owned()),
            ))
        }

        /// Specify orientation-requested job attribute
        pub fn orientation(self, orientation: Orientation) -> Self {
            self.attribute(IppAttribute::new(
                IppAttribute::ORIENTATION_REQUESTED,
                IppValue::Enum(orientation as i32),
            ))
        }

        /// Specify print-quality job attribute
        pub fn print_quality(self, quality: PrintQuality) -> Self {
            self.attribute(IppAttribute::new(IppAttribute::PRINT_QUALITY, IppValue::Enum(quality as i32)))
        }

        /// Specify custom job attribute
        pub fn attribute(mut self, attribute: IppAttribute) -> Self {
            self.parts.job_attributes.push(attribute);
            self
        }

        /// Specify custom job attributes
        pub fn attributes<I>(mut self, attributes: I) -> Self
        where
            I: IntoIterator<Item = IppAttribute>,
        {
            self.parts.job_attributes.extend(attributes);
            self
        }
    };
}

macro_rules! requested_attributes_setter {
    ($($required:expr),* $(,)?) => {
        /// Specify requested-attributes, when absent the printer decides what to return
        pub fn requested_attributes<I, T>(mut self, attributes: I) -> Self
        where
            I: IntoIterator<Item = T>,
            T: AsRef<str>,
        {
            let mut names: Vec<String> = attributes.into_iter().map(|a| a.as_ref().to_owned()).collect();
            if !names.is_empty() {
                // attributes the typed response needs are always requested
                let required: &[&str] = &[$($required),*];
                for (i, name) in required.iter().enumerate() {
                    if !names.iter().any(|n| n == name) {
                        names.insert(i, (*name).to_owned());
                    }
                }
                let vals = names.into_iter().map(IppValue::Keyword).collect();
                self.parts
                    .add_operation_attribute(IppAttribute::REQUESTED_ATTRIBUTES, IppValue::Array(vals));
            }
            self
        }
    };
}

macro_rules! message_setter {
    () => {
        /// Specify message attribute, a free-form text for the operator
        pub fn message<S>(mut self, message: S) -> Self
        where
            S: AsRef<str>,
        {
            self.parts.add_operation_attribute(
                IppAttribute::MESSAGE,
                IppValue::TextWithoutLanguage(message.as_ref().to_owned()),
            );
            self
        }
    };
}

macro_rules! build_fn {
    ($op:ident) => {
        /// Validate and build operation
        pub fn build(self) -> Result<$op, IppError> {
            self.parts.validate()?;
            Ok($op(self.parts))
        }
    };
}

/// Builder to create PrintJob operation
pub struct PrintJobBuilder {
    parts: RequestParts,
}

impl PrintJobBuilder {
    fn new(printer_uri: Uri, payload: IppPayload) -> PrintJobBuilder {
        let mut parts = RequestParts::new(Operation::PrintJob, printer_uri);
        parts.payload = payload;
        PrintJobBuilder { parts }
    }

    common_setters!();
    job_template_setters!();
    build_fn!(PrintJob);
}

/// Builder to create ValidateJob operation
pub struct ValidateJobBuilder {
    parts: RequestParts,
}

impl ValidateJobBuilder {
    fn new(printer_uri: Uri) -> ValidateJobBuilder {
        ValidateJobBuilder {
            parts: RequestParts::new(Operation::ValidateJob, printer_uri),
        }
    }

    common_setters!();
    job_template_setters!();
    build_fn!(ValidateJob);
}

/// Builder to create GetPrinterAttributes operation
pub struct GetPrinterAttributesBuilder {
    parts: RequestParts,
}

impl GetPrinterAttributesBuilder {
    fn new(printer_uri: Uri) -> GetPrinterAttributesBuilder {
        GetPrinterAttributesBuilder {
            parts: RequestParts::new(Operation::GetPrinterAttributes, printer_uri),
        }
    }

    /// Specify document-format to query format-specific capabilities
    pub fn document_format<S>(mut self, format: S) -> Self
    where
        S: AsRef<str>,
    {
        self.parts.add_operation_attribute(
            IppAttribute::DOCUMENT_FORMAT,
            IppValue::MimeMediaType(format.as_ref().to_owned()),
        );
        self
    }

    common_setters!();
    requested_attributes_setter!();
    build_fn!(GetPrinterAttributes);
}

/// Builder to create GetJobs operation
pub struct GetJobsBuilder {
    parts: RequestParts,
}

impl GetJobsBuilder {
    fn new(printer_uri: Uri) -> GetJobsBuilder {
        GetJobsBuilder {
            parts: RequestParts::new(Operation::GetJobs, printer_uri),
        }
    }

    /// Specify which-jobs attribute. Default on the printer side is `not-completed`
    pub fn which_jobs(mut self, which: WhichJobs) -> Self {
        self.parts.add_operation_attribute(
            IppAttribute::WHICH_JOBS,
            IppValue::Keyword(which.as_keyword().to_owned()),
        );
        self
    }

    /// Only return jobs of the requesting user
    pub fn my_jobs(mut self, flag: bool) -> Self {
        self.parts
            .add_operation_attribute(IppAttribute::MY_JOBS, IppValue::Boolean(flag));
        self
    }

    /// Limit the number of returned jobs
    pub fn limit(mut self, limit: i32) -> Self {
        self.parts
            .add_operation_attribute(IppAttribute::LIMIT, IppValue::Integer(limit));
        self
    }

    common_setters!();
    requested_attributes_setter!(IppAttribute::JOB_ID, IppAttribute::JOB_URI);
    build_fn!(GetJobs);
}

/// Builder to create GetJobAttributes operation
pub struct GetJobAttributesBuilder {
    parts: RequestParts,
}

impl GetJobAttributesBuilder {
    fn new(printer_uri: Uri, job_id: i32) -> GetJobAttributesBuilder {
        let mut parts = RequestParts::new(Operation::GetJobAttributes, printer_uri);
        parts.job_id = Some(job_id);
        GetJobAttributesBuilder { parts }
    }

    common_setters!();
    requested_attributes_setter!(IppAttribute::JOB_ID, IppAttribute::JOB_URI);
    build_fn!(GetJobAttributes);
}

macro_rules! job_builder {
    ($(#[$meta:meta])* $builder:ident, $operation:ident) => {
        $(#[$meta])*
        pub struct $builder {
            parts: RequestParts,
        }

        impl $builder {
            fn new(printer_uri: Uri, job_id: i32) -> $builder {
                let mut parts = RequestParts::new(Operation::$operation, printer_uri);
                parts.job_id = Some(job_id);
                $builder { parts }
            }

            common_setters!();
            message_setter!();
            build_fn!($operation);
        }
    };
}

job_builder!(
    /// Builder to create CancelJob operation
    CancelJobBuilder,
    CancelJob
);
job_builder!(
    /// Builder to create HoldJob operation
    HoldJobBuilder,
    HoldJob
);
job_builder!(
    /// Builder to create ReleaseJob operation
    ReleaseJobBuilder,
    ReleaseJob
);
job_builder!(
    /// Builder to create RestartJob operation
    RestartJobBuilder,
    RestartJob
);

impl HoldJobBuilder {
    /// Specify job-hold-until keyword, for example `indefinite` or `night`
    pub fn hold_until<S>(mut self, until: S) -> Self
    where
        S: AsRef<str>,
    {
        self.parts.add_operation_attribute(
            IppAttribute::JOB_HOLD_UNTIL,
            IppValue::Keyword(until.as_ref().to_owned()),
        );
        self
    }
}

macro_rules! printer_builder {
    ($(#[$meta:meta])* $builder:ident, $operation:ident) => {
        $(#[$meta])*
        pub struct $builder {
            parts: RequestParts,
        }

        impl $builder {
            fn new(printer_uri: Uri) -> $builder {
                $builder {
                    parts: RequestParts::new(Operation::$operation, printer_uri),
                }
            }

            common_setters!();
            build_fn!($operation);
        }
    };
}

printer_builder!(
    /// Builder to create PausePrinter operation
    PausePrinterBuilder,
    PausePrinter
);
printer_builder!(
    /// Builder to create ResumePrinter operation
    ResumePrinterBuilder,
    ResumePrinter
);
printer_builder!(
    /// Builder to create PurgeJobs operation
    PurgeJobsBuilder,
    PurgeJobs
);
