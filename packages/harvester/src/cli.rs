//! Command-line interface for the harvester.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};

use crate::client::SruClient;
use crate::config::{
    ClientConfig, HttpMethod, SruVersion, DEFAULT_MAX_RETRIES, DEFAULT_PAGE_SIZE_THRESHOLD,
    DEFAULT_RETRY_AFTER_SECS, DEFAULT_RETRY_STATUS_CODES, DEFAULT_START_RECORD, HTTP_TIMEOUT_SECS,
};
use crate::error::Result;
use crate::output::{open_output, write_explain, OutputFormat, RecordWriter};
use crate::types::SearchRequest;
use crate::xml::NamespacePolicy;

/// SRU Harvester - Harvest records from SRU search servers.
#[derive(Parser)]
#[command(name = "sru-harvester")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run a searchRetrieve query and write every matching record.
    Search(SearchArgs),

    /// Fetch the server's explain document.
    Explain(ExplainArgs),
}

/// Options shared by all commands.
#[derive(Args, Debug, Clone)]
pub struct ConnectionArgs {
    /// HTTP method (GET or POST)
    #[arg(long, default_value = "GET")]
    pub method: String,

    /// SRU protocol version (2.0, 1.2 or 1.1)
    #[arg(long = "sru-version", default_value = "2.0")]
    pub sru_version: String,

    /// Retries after a retryable status
    #[arg(long, default_value_t = DEFAULT_MAX_RETRIES)]
    pub retries: u32,

    /// Seconds to wait before a retry when the server sends no Retry-After
    #[arg(long, default_value_t = DEFAULT_RETRY_AFTER_SECS)]
    pub retry_after: u64,

    /// Comma-separated HTTP statuses that trigger a retry
    #[arg(long, value_delimiter = ',', default_values_t = DEFAULT_RETRY_STATUS_CODES.to_vec())]
    pub retry_status: Vec<u16>,

    /// HTTP timeout in seconds
    #[arg(long, default_value_t = HTTP_TIMEOUT_SECS)]
    pub timeout: u64,

    /// Decode responses with this encoding, ignoring what they declare
    #[arg(long)]
    pub encoding: Option<String>,
}

impl ConnectionArgs {
    /// Build a client configuration for `endpoint`.
    pub fn to_config(&self, endpoint: &str) -> Result<ClientConfig> {
        let method: HttpMethod = self.method.parse()?;
        let version: SruVersion = self.sru_version.parse()?;
        let config = ClientConfig::new(endpoint)
            .with_http_method(method)
            .with_version(version)
            .with_max_retries(self.retries)
            .with_retry_status_codes(self.retry_status.iter().copied())
            .with_default_retry_after(Duration::from_secs(self.retry_after))
            .with_timeout(Duration::from_secs(self.timeout));
        Ok(match &self.encoding {
            Some(label) => config.with_encoding(label),
            None => config,
        })
    }
}

#[derive(Args, Debug)]
pub struct SearchArgs {
    /// Base URL of the SRU server
    pub endpoint: String,

    /// CQL query
    pub query: String,

    /// Maximum number of records to harvest (default: all)
    #[arg(short = 'n', long)]
    pub max: Option<u32>,

    /// Position of the first record
    #[arg(long, default_value_t = DEFAULT_START_RECORD)]
    pub start: u32,

    /// Record schema to request (e.g., dc, marcxml)
    #[arg(short, long)]
    pub schema: Option<String>,

    /// Records requested per page
    #[arg(long, default_value_t = DEFAULT_PAGE_SIZE_THRESHOLD)]
    pub page_size: u32,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Json)]
    pub format: OutputFormat,

    /// Output file (default: stdout)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Keep namespaces in keys as {uri}name
    #[arg(long)]
    pub keep_namespaces: bool,

    #[command(flatten)]
    pub connection: ConnectionArgs,
}

#[derive(Args, Debug)]
pub struct ExplainArgs {
    /// Base URL of the SRU server
    pub endpoint: String,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Json)]
    pub format: OutputFormat,

    /// Output file (default: stdout)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    #[command(flatten)]
    pub connection: ConnectionArgs,
}

/// Run the CLI.
pub fn run() -> Result<()> {
    execute(Cli::parse())
}

/// Execute a parsed command line.
pub fn execute(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Search(args) => search_command(&args),
        Commands::Explain(args) => explain_command(&args),
    }
}

fn spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    #[allow(clippy::expect_used)] // Static template string that is guaranteed to be valid
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .expect("valid template"),
    );
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

/// Execute the search command.
fn search_command(args: &SearchArgs) -> Result<()> {
    let policy = if args.keep_namespaces {
        NamespacePolicy::Preserve
    } else {
        NamespacePolicy::Strip
    };
    let config = args
        .connection
        .to_config(&args.endpoint)?
        .with_page_size_threshold(args.page_size)
        .with_namespace_policy(policy);

    let mut request = SearchRequest::new(&args.query).with_start_record(args.start);
    if let Some(max) = args.max {
        request = request.with_maximum_records(max);
    }
    if let Some(schema) = &args.schema {
        request = request.with_record_schema(schema);
    }

    // Validate everything before touching the network or the output file
    let client = SruClient::new(config)?;
    request.to_parameters(client.version())?;
    let out = open_output(args.output.as_deref())?;

    eprintln!(
        "{} {} at {}",
        style("Searching").bold(),
        style(&args.query).cyan(),
        style(&args.endpoint).green()
    );

    let pb = spinner("Fetching first page...");
    let mut writer = RecordWriter::new(out, args.format);
    let result = harvest_records(&client, &request, &mut writer, &pb);
    pb.finish_and_clear();
    let total = result?;
    let written = writer.written();
    writer.finish()?;

    eprintln!(
        "{} {} of {} records",
        style("Harvested").green().bold(),
        written,
        total
    );
    print_destination(args.output.as_deref());
    Ok(())
}

/// Stream all records of a search into `writer`, returning the server's total.
fn harvest_records<W: Write>(
    client: &SruClient,
    request: &SearchRequest,
    writer: &mut RecordWriter<W>,
    pb: &ProgressBar,
) -> Result<u64> {
    let mut records = client.search_retrieve(request)?;
    let total = records.number_of_records();

    for record in records.by_ref() {
        writer.write(&record?)?;
        pb.set_message(format!("Harvested {} of {total} records...", writer.written()));
    }

    Ok(total)
}

/// Execute the explain command.
fn explain_command(args: &ExplainArgs) -> Result<()> {
    let config = args.connection.to_config(&args.endpoint)?;
    let client = SruClient::new(config)?;
    let mut out = open_output(args.output.as_deref())?;

    let pb = spinner("Fetching explain document...");
    let explain = client.explain();
    pb.finish_and_clear();
    let explain = explain?;

    write_explain(&mut out, &explain, args.format)?;
    print_destination(args.output.as_deref());
    Ok(())
}

fn print_destination(output: Option<&Path>) {
    if let Some(path) = output {
        eprintln!("{} {}", style("Saved to:").green().bold(), path.display());
    }
}
