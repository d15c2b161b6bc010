//! squery - command-line query client
//!
//! Connects to a server's query port, runs raw command lines or waits for
//! notifications, and prints the results as JSON lines.

use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use serde::Serialize;
use squery_client::{Adapter, ClientConfig, ConfigError, QueryClient, QueryError, Transport};
use squery_protocol::{Event, Record, Reply};
use thiserror::Error;
use tracing::{debug, error, info};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

const DEFAULT_LOG_FILTER: &str = "squery=info,squery_client=info";

/// squery - command-line query client
#[derive(Parser, Debug)]
#[command(name = "squery")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to a YAML client configuration
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Server host, overriding the configuration
    #[arg(long)]
    host: Option<String>,

    /// Query port, overriding the configuration
    #[arg(short, long)]
    port: Option<u16>,

    /// Connect and read timeout in seconds, overriding the configuration
    #[arg(long)]
    timeout: Option<u64>,

    /// Serve Prometheus metrics on this address
    #[cfg(feature = "prometheus")]
    #[arg(long)]
    metrics_listen: Option<std::net::SocketAddr>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run raw command lines in order and print each reply
    Exec {
        /// Command lines, e.g. "login client_login_name=serveradmin client_login_password=secret"
        #[arg(required = true)]
        lines: Vec<String>,

        /// Print failed replies instead of stopping at the first one
        #[arg(long)]
        keep_going: bool,
    },

    /// Wait for notifications and print them as they arrive
    Wait {
        /// Command lines to run before waiting, e.g. "servernotifyregister event=server"
        #[arg(short, long = "setup")]
        setup: Vec<String>,

        /// Stop after this many events
        #[arg(short = 'n', long)]
        count: Option<usize>,
    },
}

#[derive(Debug, Error)]
enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Query(#[from] QueryError),

    #[error("failed to write output: {0}")]
    Output(#[from] io::Error),

    #[error("failed to encode output: {0}")]
    Json(#[from] serde_json::Error),

    #[cfg(feature = "prometheus")]
    #[error("failed to install metrics exporter: {0}")]
    Metrics(String),
}

#[derive(Serialize)]
struct ReplyOutput<'a> {
    command: &'a str,
    id: i64,
    msg: String,
    records: Vec<Record>,
}

impl<'a> ReplyOutput<'a> {
    fn new(reply: &'a Reply) -> Self {
        ReplyOutput {
            command: reply.command(),
            id: reply.error().id(),
            msg: reply.error().msg(),
            records: reply.records(),
        }
    }
}

#[derive(Serialize)]
struct EventOutput<'a> {
    event: &'a str,
    records: &'a [Record],
}

impl<'a> EventOutput<'a> {
    fn new(event: &'a Event) -> Self {
        EventOutput {
            event: event.kind(),
            records: event.records(),
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr).with_target(false))
        .init();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn load_config(cli: &Cli) -> Result<ClientConfig, CliError> {
    let mut config = match &cli.config {
        Some(path) => ClientConfig::load(path)?,
        None => ClientConfig::default(),
    };
    if let Some(host) = &cli.host {
        config.host = host.clone();
    }
    if let Some(port) = cli.port {
        config.port = port;
    }
    if let Some(timeout) = cli.timeout {
        config.timeout_secs = timeout;
    }
    config.validate()?;
    Ok(config)
}

fn run(cli: Cli) -> Result<(), CliError> {
    #[cfg(feature = "prometheus")]
    if let Some(addr) = cli.metrics_listen {
        squery_metrics::install_prometheus(addr).map_err(|e| CliError::Metrics(e.to_string()))?;
        info!("serving metrics on {}", addr);
    }
    squery_metrics::describe_metrics();

    let config = load_config(&cli)?;
    info!("connecting to {}", config.address());
    let mut client = QueryClient::connect_tcp(config)?;

    let result = match &cli.command {
        Commands::Exec { lines, keep_going } => exec(&mut client, lines, *keep_going),
        Commands::Wait { setup, count } => wait(&mut client, setup, *count),
    };

    client.teardown();
    debug!(
        "{} commands in {:?}",
        client.query_count(),
        client.query_runtime()
    );
    result
}

fn exec<T: Transport>(
    client: &mut QueryClient<T>,
    lines: &[String],
    keep_going: bool,
) -> Result<(), CliError> {
    let mut stdout = io::stdout().lock();
    for line in lines {
        let reply = client.request(line, !keep_going)?;
        serde_json::to_writer(&mut stdout, &ReplyOutput::new(&reply))?;
        writeln!(stdout)?;
    }
    Ok(())
}

fn wait<T: Transport>(
    client: &mut QueryClient<T>,
    setup: &[String],
    count: Option<usize>,
) -> Result<(), CliError> {
    for line in setup {
        client.request(line, true)?;
    }
    client.transport_mut().set_blocking(false).map_err(QueryError::from)?;

    let mut stdout = io::stdout().lock();
    let mut seen = 0;
    while count.map_or(true, |n| seen < n) {
        let event = client.wait()?;
        serde_json::to_writer(&mut stdout, &EventOutput::new(&event))?;
        writeln!(stdout)?;
        stdout.flush()?;
        seen += 1;
    }

    client.transport_mut().set_blocking(true).map_err(QueryError::from)?;
    Ok(())
}
