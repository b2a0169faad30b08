//!
//! Command-line IPP utility covering job submission, job control and printer control
//!

use std::{error::Error, fs, io, path::PathBuf, time::Duration};

use clap::{Args, Parser, Subcommand};
use log::debug;
use tokio_util::compat::TokioAsyncReadCompatExt;

use ippkit::prelude::*;

type CliResult = Result<(), Box<dyn Error>>;

fn new_client(uri: Uri, params: &IppParams) -> io::Result<AsyncIppClient> {
    let mut builder = AsyncIppClient::builder(uri).ignore_tls_errors(params.ignore_tls_errors);
    if let Some(timeout) = params.timeout {
        builder = builder.request_timeout(Duration::from_secs(timeout));
    }

    for param in &params.headers {
        if let Some((k, v)) = param.split_once('=') {
            builder = builder.http_header(k, v);
        }
    }

    for cert in &params.ca_certs {
        builder = builder.ca_cert(fs::read(cert)?);
    }

    Ok(builder.build())
}

async fn new_payload(file: &Option<PathBuf>) -> io::Result<IppPayload> {
    let payload = match file {
        Some(filename) => IppPayload::new_async(tokio::fs::File::open(filename).await?.compat()),
        None => IppPayload::new_async(tokio::io::stdin().compat()),
    };
    Ok(payload)
}

fn parse_options(options: &[String]) -> Vec<IppAttribute> {
    options
        .iter()
        .filter_map(|arg| arg.split_once('='))
        .map(|(k, v)| IppAttribute::new(k, v.parse().unwrap_or_else(|e| match e {})))
        .collect()
}

fn print_attributes<'a, I>(groups: I)
where
    I: Iterator<Item = &'a IppAttributeGroup>,
{
    for group in groups {
        for attr in group.attributes().values() {
            println!("{}: {}", attr.name(), attr.value());
        }
    }
}

fn print_status(status: &OperationStatus) {
    println!("{} ({:#06x})", status.status, status.code);
    if let Some(ref message) = status.message {
        println!("status-message: {message}");
    }
    if let Some(ref unsupported) = status.unsupported {
        print_attributes(std::iter::once(unsupported));
    }
}

fn print_job(job: &JobInfo) {
    let state = job.state.map(|s| s.to_string()).unwrap_or_else(|| "unknown".to_owned());
    println!(
        "{}\t{}\t{}\t{}",
        job.id,
        state,
        job.name.as_deref().unwrap_or("-"),
        job.originating_user.as_deref().unwrap_or("-")
    );
}

async fn do_print(params: &IppParams, cmd: PrintCmd) -> CliResult {
    let uri: Uri = cmd.target.uri.parse()?;
    let client = new_client(uri.clone(), params)?;

    if !cmd.no_check_state {
        let operation = IppOperationBuilder::get_printer_attributes(uri.clone())
            .requested_attributes([
                IppAttribute::PRINTER_STATE,
                IppAttribute::PRINTER_STATE_REASONS,
                IppAttribute::PRINTER_IS_ACCEPTING_JOBS,
            ])
            .build()?;
        let printer = client.execute(operation).await?;
        if !printer.is_ready() {
            debug!("Printer state: {:?}, reasons: {:?}", printer.state, printer.state_reasons);
            return Err(format!("printer is not ready: {}", printer.error_reasons().join(", ")).into());
        }
    }

    let payload = new_payload(&cmd.file).await?;
    let builder = cmd.job.apply(IppOperationBuilder::print_job(uri, payload).version(params.ipp_version), params);
    let job = client.execute(builder.build()?).await?;

    println!("job-id: {}", job.id);
    if let Some(uri) = job.uri {
        println!("job-uri: {uri}");
    }
    if let Some(state) = job.state {
        println!("job-state: {state}");
    }
    Ok(())
}

async fn do_validate(params: &IppParams, cmd: ValidateCmd) -> CliResult {
    let uri: Uri = cmd.target.uri.parse()?;
    let client = new_client(uri.clone(), params)?;
    let builder = cmd.job.apply(IppOperationBuilder::validate_job(uri).version(params.ipp_version), params);
    print_status(&client.execute(builder.build()?).await?);
    Ok(())
}

async fn do_status(params: &IppParams, cmd: StatusCmd) -> CliResult {
    let uri: Uri = cmd.target.uri.parse()?;
    let client = new_client(uri.clone(), params)?;

    let mut builder = IppOperationBuilder::get_printer_attributes(uri)
        .requested_attributes(&cmd.attributes)
        .version(params.ipp_version);
    if let Some(ref user_name) = params.user_name {
        builder = builder.user_name(user_name);
    }

    let printer = client.execute(builder.build()?).await?;
    print_attributes(std::iter::once(&printer.attributes));
    Ok(())
}

async fn do_jobs(params: &IppParams, cmd: JobsCmd) -> CliResult {
    let uri: Uri = cmd.target.uri.parse()?;
    let client = new_client(uri.clone(), params)?;

    let mut builder = IppOperationBuilder::get_jobs(uri)
        .which_jobs(cmd.which)
        .requested_attributes(&cmd.attributes)
        .version(params.ipp_version);
    if cmd.my_jobs {
        builder = builder.my_jobs(true);
    }
    if let Some(limit) = cmd.limit {
        builder = builder.limit(limit);
    }
    if let Some(ref user_name) = params.user_name {
        builder = builder.user_name(user_name);
    }

    for job in client.execute(builder.build()?).await? {
        print_job(&job);
    }
    Ok(())
}

async fn do_job(params: &IppParams, cmd: JobCmd) -> CliResult {
    let uri: Uri = cmd.target.uri.parse()?;
    let client = new_client(uri.clone(), params)?;

    let mut builder = IppOperationBuilder::get_job_attributes(uri, cmd.job_id)
        .requested_attributes(&cmd.attributes)
        .version(params.ipp_version);
    if let Some(ref user_name) = params.user_name {
        builder = builder.user_name(user_name);
    }

    let job = client.execute(builder.build()?).await?;
    print_job(&job);
    if !job.state_reasons.is_empty() {
        println!("job-state-reasons: {}", job.state_reasons.join(", "));
    }
    if let Some(created) = job.date_time_at_creation {
        println!("date-time-at-creation: {}", created.to_rfc3339());
    }
    Ok(())
}

async fn do_job_control(params: &IppParams, action: JobAction, cmd: JobControlCmd) -> CliResult {
    let uri: Uri = cmd.target.uri.parse()?;
    let client = new_client(uri.clone(), params)?;

    macro_rules! run {
        ($builder:expr) => {{
            let mut builder = $builder.version(params.ipp_version);
            if let Some(ref user_name) = params.user_name {
                builder = builder.user_name(user_name);
            }
            if let Some(ref message) = cmd.message {
                builder = builder.message(message);
            }
            client.execute(builder.build()?).await?
        }};
    }

    let status = match action {
        JobAction::Cancel => run!(IppOperationBuilder::cancel_job(uri, cmd.job_id)),
        JobAction::Hold => match cmd.until {
            Some(ref until) => run!(IppOperationBuilder::hold_job(uri, cmd.job_id).hold_until(until)),
            None => run!(IppOperationBuilder::hold_job(uri, cmd.job_id)),
        },
        JobAction::Release => run!(IppOperationBuilder::release_job(uri, cmd.job_id)),
        JobAction::Restart => run!(IppOperationBuilder::restart_job(uri, cmd.job_id)),
    };
    print_status(&status);
    Ok(())
}

async fn do_printer_control(params: &IppParams, action: PrinterAction, target: Target) -> CliResult {
    let uri: Uri = target.uri.parse()?;
    let client = new_client(uri.clone(), params)?;

    macro_rules! run {
        ($builder:expr) => {{
            let mut builder = $builder.version(params.ipp_version);
            if let Some(ref user_name) = params.user_name {
                builder = builder.user_name(user_name);
            }
            client.execute(builder.build()?).await?
        }};
    }

    let status = match action {
        PrinterAction::Pause => run!(IppOperationBuilder::pause_printer(uri)),
        PrinterAction::Resume => run!(IppOperationBuilder::resume_printer(uri)),
        PrinterAction::Purge => run!(IppOperationBuilder::purge_jobs(uri)),
    };
    print_status(&status);
    Ok(())
}

#[derive(Parser)]
#[clap(about = "IPP print utility", name = "ipputil", rename_all = "kebab-case")]
struct IppParams {
    #[clap(
        long = "ignore-tls-errors",
        short = 'i',
        global = true,
        help = "Ignore TLS handshake errors"
    )]
    ignore_tls_errors: bool,

    #[clap(
        long = "ca-cert",
        short = 'c',
        global = true,
        help = "One or more additional CA certs in PEM or DER format"
    )]
    ca_certs: Vec<PathBuf>,

    #[clap(
        long = "timeout",
        short = 't',
        global = true,
        help = "Request timeout in seconds, default = no timeout"
    )]
    timeout: Option<u64>,

    #[clap(
        long = "header",
        short = 'H',
        global = true,
        help = "Extra HTTP headers in key=value format"
    )]
    headers: Vec<String>,

    #[clap(
        long = "user-name",
        short = 'u',
        global = true,
        help = "User name to send as requesting-user-name attribute"
    )]
    user_name: Option<String>,

    #[clap(
        long = "ipp-version",
        short = 'V',
        global = true,
        default_value = "1.1",
        help = "IPP protocol version: 1.0, 1.1, 2.0, 2.1 or 2.2"
    )]
    ipp_version: IppVersion,

    #[clap(subcommand)]
    command: IppCommand,
}

#[derive(Subcommand)]
enum IppCommand {
    #[clap(name = "print", about = "Print file to an IPP printer")]
    Print(PrintCmd),
    #[clap(name = "validate", about = "Validate job attributes without printing")]
    Validate(ValidateCmd),
    #[clap(name = "status", about = "Get status of an IPP printer")]
    Status(StatusCmd),
    #[clap(name = "jobs", about = "List jobs of an IPP printer")]
    Jobs(JobsCmd),
    #[clap(name = "job", about = "Get attributes of a single job")]
    Job(JobCmd),
    #[clap(name = "cancel", about = "Cancel a job")]
    Cancel(JobControlCmd),
    #[clap(name = "hold", about = "Hold a job")]
    Hold(JobControlCmd),
    #[clap(name = "release", about = "Release a held job")]
    Release(JobControlCmd),
    #[clap(name = "restart", about = "Restart a job")]
    Restart(JobControlCmd),
    #[clap(name = "pause", about = "Pause the printer")]
    Pause(Target),
    #[clap(name = "resume", about = "Resume the printer")]
    Resume(Target),
    #[clap(name = "purge", about = "Remove all jobs from the printer")]
    Purge(Target),
}

#[derive(Clone, Copy)]
enum JobAction {
    Cancel,
    Hold,
    Release,
    Restart,
}

#[derive(Clone, Copy)]
enum PrinterAction {
    Pause,
    Resume,
    Purge,
}

#[derive(Args, Clone)]
struct Target {
    #[clap(env = "IPPKIT_PRINTER_URI", help = "Printer URI, supported schemes: ipp, ipps, http, https")]
    uri: String,
}

#[derive(Args, Clone)]
#[clap(rename_all = "kebab-case")]
struct JobTemplate {
    #[clap(long = "job-name", short = 'j', help = "Job name to send as job-name attribute")]
    job_name: Option<String>,

    #[clap(long = "document-format", short = 'F', help = "MIME type of the document")]
    document_format: Option<String>,

    #[clap(long = "copies", short = 'n', help = "Number of copies")]
    copies: Option<i32>,

    #[clap(
        long = "sides",
        short = 's',
        help = "one-sided, two-sided-long-edge or two-sided-short-edge"
    )]
    sides: Option<Sides>,

    #[clap(long = "option", short = 'o', help = "Extra IPP job attributes in key=value format")]
    options: Vec<String>,
}

// setters shared by Print-Job and Validate-Job builders
trait JobTemplateBuilder: Sized {
    fn job_title(self, name: &str) -> Self;
    fn document_format(self, format: &str) -> Self;
    fn copies(self, copies: i32) -> Self;
    fn sides(self, sides: Sides) -> Self;
    fn user_name(self, name: &str) -> Self;
    fn attributes(self, attributes: Vec<IppAttribute>) -> Self;
}

macro_rules! job_template_builder {
    ($builder:ty) => {
        impl JobTemplateBuilder for $builder {
            fn job_title(self, name: &str) -> Self {
                <$builder>::job_title(self, name)
            }
            fn document_format(self, format: &str) -> Self {
                <$builder>::document_format(self, format)
            }
            fn copies(self, copies: i32) -> Self {
                <$builder>::copies(self, copies)
            }
            fn sides(self, sides: Sides) -> Self {
                <$builder>::sides(self, sides)
            }
            fn user_name(self, name: &str) -> Self {
                <$builder>::user_name(self, name)
            }
            fn attributes(self, attributes: Vec<IppAttribute>) -> Self {
                <$builder>::attributes(self, attributes)
            }
        }
    };
}

job_template_builder!(ippkit::operation::builder::PrintJobBuilder);
job_template_builder!(ippkit::operation::builder::ValidateJobBuilder);

impl JobTemplate {
    fn apply<B: JobTemplateBuilder>(&self, mut builder: B, params: &IppParams) -> B {
        if let Some(ref job_name) = self.job_name {
            builder = builder.job_title(job_name);
        }
        if let Some(ref format) = self.document_format {
            builder = builder.document_format(format);
        }
        if let Some(copies) = self.copies {
            builder = builder.copies(copies);
        }
        if let Some(sides) = self.sides {
            builder = builder.sides(sides);
        }
        if let Some(ref user_name) = params.user_name {
            builder = builder.user_name(user_name);
        }
        builder.attributes(parse_options(&self.options))
    }
}

#[derive(Args, Clone)]
#[clap(rename_all = "kebab-case")]
struct PrintCmd {
    #[clap(flatten)]
    target: Target,

    #[clap(
        long = "no-check-state",
        short = 'N',
        help = "Do not check printer state before printing"
    )]
    no_check_state: bool,

    #[clap(
        long = "file",
        short = 'f',
        help = "Input file name to print [default: standard input]"
    )]
    file: Option<PathBuf>,

    #[clap(flatten)]
    job: JobTemplate,
}

#[derive(Args, Clone)]
struct ValidateCmd {
    #[clap(flatten)]
    target: Target,

    #[clap(flatten)]
    job: JobTemplate,
}

#[derive(Args, Clone)]
struct StatusCmd {
    #[clap(flatten)]
    target: Target,

    #[clap(long = "attribute", short = 'a', help = "Attributes to query, default is to get all")]
    attributes: Vec<String>,
}

#[derive(Args, Clone)]
#[clap(rename_all = "kebab-case")]
struct JobsCmd {
    #[clap(flatten)]
    target: Target,

    #[clap(
        long = "which",
        short = 'w',
        default_value = "not-completed",
        help = "not-completed or completed"
    )]
    which: WhichJobs,

    #[clap(long = "my-jobs", short = 'm', help = "Only list jobs of the requesting user")]
    my_jobs: bool,

    #[clap(long = "limit", short = 'l', help = "Maximum number of jobs to return")]
    limit: Option<i32>,

    #[clap(long = "attribute", short = 'a', help = "Job attributes to query")]
    attributes: Vec<String>,
}

#[derive(Args, Clone)]
#[clap(rename_all = "kebab-case")]
struct JobCmd {
    #[clap(flatten)]
    target: Target,

    #[clap(long = "job-id", short = 'j', help = "Job id")]
    job_id: i32,

    #[clap(long = "attribute", short = 'a', help = "Job attributes to query")]
    attributes: Vec<String>,
}

#[derive(Args, Clone)]
#[clap(rename_all = "kebab-case")]
struct JobControlCmd {
    #[clap(flatten)]
    target: Target,

    #[clap(long = "job-id", short = 'j', help = "Job id")]
    job_id: i32,

    #[clap(long = "message", short = 'm', help = "Message for the operator")]
    message: Option<String>,

    #[clap(long = "until", help = "job-hold-until keyword, hold only")]
    until: Option<String>,
}

#[tokio::main]
async fn main() -> CliResult {
    env_logger::init();

    let params = IppParams::parse();

    match params.command {
        IppCommand::Print(ref cmd) => do_print(&params, cmd.clone()).await,
        IppCommand::Validate(ref cmd) => do_validate(&params, cmd.clone()).await,
        IppCommand::Status(ref cmd) => do_status(&params, cmd.clone()).await,
        IppCommand::Jobs(ref cmd) => do_jobs(&params, cmd.clone()).await,
        IppCommand::Job(ref cmd) => do_job(&params, cmd.clone()).await,
        IppCommand::Cancel(ref cmd) => do_job_control(&params, JobAction::Cancel, cmd.clone()).await,
        IppCommand::Hold(ref cmd) => do_job_control(&params, JobAction::Hold, cmd.clone()).await,
        IppCommand::Release(ref cmd) => do_job_control(&params, JobAction::Release, cmd.clone()).await,
        IppCommand::Restart(ref cmd) => do_job_control(&params, JobAction::Restart, cmd.clone()).await,
        IppCommand::Pause(ref target) => do_printer_control(&params, PrinterAction::Pause, target.clone()).await,
        IppCommand::Resume(ref target) => do_printer_control(&params, PrinterAction::Resume, target.clone()).await,
        IppCommand::Purge(ref target) => do_printer_control(&params, PrinterAction::Purge, target.clone()).await,
    }
}
