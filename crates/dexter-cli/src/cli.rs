//! Argument parsing and command dispatch for the `dexter` binary.

use std::fs::File;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use dexter_render::{PagedSink, Sink, StreamSink, pager};
use tracing_subscriber::EnvFilter;

use crate::client::{ApiClient, CliError, CliResult};
use crate::commands::reports;
use crate::config::Profile;

const DEFAULT_RCFILE: &str = "~/.dexter.conf";

/// Parse CLI arguments, execute the requested command, and return the
/// process exit code.
pub async fn run() -> i32 {
    let cli = Cli::parse();
    init_tracing(cli.debug);

    match dispatch(cli).await {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {}", err.display_message());
            err.exit_code()
        }
    }
}

fn init_tracing(debug: bool) {
    let default_directive = if debug { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

async fn dispatch(cli: Cli) -> CliResult<i32> {
    let profile = Profile::resolve(&cli)?;
    let client = ApiClient::new(&profile)?;
    let mut sink = make_sink(cli.output.as_deref(), &profile)?;

    let result = match cli.command {
        Command::List(args) => reports::list(&client, &profile, args, sink.as_mut()).await,
        Command::Queue(args) => reports::queue(&client, &profile, args, sink.as_mut()).await,
        Command::Update(args) => reports::update(&client, &profile, args, sink.as_mut()).await,
        Command::Status(args) => reports::status(&client, &profile, &args, sink.as_mut()).await,
        Command::Delete(args) => reports::delete(&client, &profile, &args, sink.as_mut()).await,
        Command::Fetch(args) => reports::fetch(&client, &profile, &args, sink.as_mut()).await,
    };

    sink.finish().map_err(CliError::from)?;
    result
}

/// Build the output sink: a direct stream for `--output`, otherwise a
/// paged stdout buffer sized from the terminal.
fn make_sink(output: Option<&std::path::Path>, profile: &Profile) -> CliResult<Box<dyn Sink>> {
    if let Some(path) = output {
        let file = File::create(path).map_err(|err| {
            CliError::validation(format!("cannot write to '{}': {err}", path.display()))
        })?;
        return Ok(Box::new(StreamSink::new(file)));
    }

    let (rows, columns) = terminal_size::terminal_size().map_or(
        // Not a terminal: never page.
        (usize::MAX, profile.width),
        |(width, height)| (usize::from(height.0), usize::from(width.0)),
    );
    Ok(Box::new(PagedSink::new(
        rows,
        columns,
        pager::resolve_pager(),
    )))
}

#[derive(Parser)]
#[command(
    name = "dexter",
    about = "Command-line interface for the Dexter report API",
    version
)]
pub(crate) struct Cli {
    #[arg(long, global = true, env = "DEXTER_API_KEY", help = "The API key to use")]
    pub(crate) api_key: Option<String>,
    #[arg(
        long,
        global = true,
        env = "DEXTER_ROOT",
        help = "The root URL of the API interface"
    )]
    pub(crate) root: Option<String>,
    #[arg(
        short = 'p',
        long,
        global = true,
        default_value = "default",
        help = "The configuration profile to use"
    )]
    pub(crate) profile: String,
    #[arg(
        long,
        global = true,
        default_value = DEFAULT_RCFILE,
        help = "The configuration file to load"
    )]
    pub(crate) rcfile: String,
    #[arg(
        short = 'o',
        long,
        global = true,
        value_name = "FILENAME",
        help = "Write output to this file instead of stdout"
    )]
    pub(crate) output: Option<PathBuf>,
    #[arg(short = 'd', long, global = true, help = "Display debug output")]
    pub(crate) debug: bool,
    #[arg(short = 'q', long, global = true, help = "No output")]
    pub(crate) quiet: bool,
    #[arg(
        short = 'v',
        long,
        global = true,
        help = "Render response bodies as a verbose tree"
    )]
    pub(crate) verbose: bool,
    #[arg(long, global = true, help = "Dump response bodies as raw JSON")]
    pub(crate) json: bool,
    #[arg(
        long,
        global = true,
        value_name = "COLS",
        help = "Target table width in columns"
    )]
    pub(crate) width: Option<usize>,
    #[command(subcommand)]
    pub(crate) command: Command,
}

#[derive(Subcommand)]
pub(crate) enum Command {
    /// List reports
    List(ListArgs),
    /// Queue a report
    Queue(QueueArgs),
    /// Update the metadata of a report
    Update(UpdateArgs),
    /// Display the status of a report
    #[command(visible_alias = "info")]
    Status(ReportArgs),
    /// Delete a report
    #[command(visible_alias = "cancel")]
    Delete(ReportArgs),
    /// Fetch a full report
    Fetch(ReportArgs),
}

/// Report status filters accepted by `list`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum StatusFilter {
    Incomplete,
    Queued,
    Running,
    Callback,
    Complete,
    All,
}

impl StatusFilter {
    pub(crate) const fn api_name(self) -> &'static str {
        match self {
            Self::Incomplete => "incomplete",
            Self::Queued => "queued",
            Self::Running => "running",
            Self::Callback => "callback",
            Self::Complete => "complete",
            Self::All => "all",
        }
    }
}

#[derive(Args, Default)]
pub(crate) struct ListArgs {
    #[arg(long, help = "Display reports requested by this user")]
    pub(crate) user: Option<String>,
    #[arg(
        value_enum,
        default_values_t = [StatusFilter::Incomplete],
        help = "Display reports that are in this status"
    )]
    pub(crate) status: Vec<StatusFilter>,
}

#[derive(Args)]
pub(crate) struct QueueArgs {
    #[arg(long, value_name = "URL", help = "The callback URL")]
    pub(crate) callback: Option<String>,
    #[arg(long, value_name = "ID", help = "The callback ID")]
    pub(crate) callback_id: Option<String>,
    #[arg(
        long,
        value_name = "JSON",
        conflicts_with = "config_file",
        help = "The configuration"
    )]
    pub(crate) config: Option<String>,
    #[arg(
        long,
        value_name = "FILENAME",
        help = "Read the configuration from this file"
    )]
    pub(crate) config_file: Option<PathBuf>,
    #[arg(long, value_name = "DAYS", help = "The report lifetime")]
    pub(crate) lifetime: Option<u32>,
    #[arg(
        long,
        value_name = "JSON",
        conflicts_with = "metadata_file",
        help = "The metadata"
    )]
    pub(crate) metadata: Option<String>,
    #[arg(
        long,
        value_name = "FILENAME",
        help = "Read the metadata from this file"
    )]
    pub(crate) metadata_file: Option<PathBuf>,
    #[arg(value_name = "URL", help = "The start URL")]
    pub(crate) url: String,
    #[arg(
        value_name = "PAGES",
        default_value_t = 1,
        help = "The number of pages to scan (default: 1)"
    )]
    pub(crate) pages: u32,
}

#[derive(Args)]
pub(crate) struct UpdateArgs {
    #[arg(
        long,
        value_name = "JSON",
        conflicts_with = "metadata_file",
        required_unless_present = "metadata_file",
        help = "The metadata"
    )]
    pub(crate) metadata: Option<String>,
    #[arg(
        long,
        value_name = "FILENAME",
        help = "Read the metadata from this file"
    )]
    pub(crate) metadata_file: Option<PathBuf>,
    #[arg(value_name = "ID", help = "The report ID or its status URL")]
    pub(crate) report: String,
}

#[derive(Args)]
pub(crate) struct ReportArgs {
    #[arg(value_name = "ID", help = "The report ID or its status URL")]
    pub(crate) report: String,
}
