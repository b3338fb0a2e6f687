use clap::{Parser, Subcommand};
use anyhow::Result;
use std::path::PathBuf;
use log::debug;
use crate::config::QueueKind;

/// Bounded and elastic blocking queues with producer/consumer flow control
#[derive(Parser, Debug)]
#[command(name = "flowq")]
#[command(about = "Bounded and elastic blocking queues with producer/consumer flow control")]
#[command(version)]
pub struct Args {
    /// Verbose output (debug level logging)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Quiet output (error level logging only)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Debug output (trace level logging)
    #[arg(long, global = true)]
    pub debug: bool,

    /// Log format: text or json
    #[arg(long, value_name = "FORMAT", default_value = "text", global = true)]
    pub log_format: String,

    /// Log file path for file output
    #[arg(long, value_name = "FILE", global = true)]
    pub log_file: Option<PathBuf>,

    /// Log level for file output (independent of console level)
    #[arg(long, value_name = "LEVEL", global = true)]
    pub log_file_level: Option<String>,

    /// Configuration file path
    #[arg(long, value_name = "FILE", global = true)]
    pub config_file: Option<PathBuf>,

    /// Configuration section name
    #[arg(long, value_name = "SECTION", global = true)]
    pub config_name: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Run producers and consumers against one in-process queue
    Demo(DemoArgs),

    /// Serve a shared queue over TCP
    Serve(ServeArgs),

    /// Interactively produce and consume against a running server
    Client(ClientArgs),
}

/// Queue selection shared by `demo` and `serve`
#[derive(clap::Args, Debug, Clone, Default, PartialEq, Eq)]
pub struct QueueArgs {
    /// Queue kind: bounded or elastic
    #[arg(short = 'k', long, value_name = "KIND")]
    pub kind: Option<QueueKind>,

    /// Capacity (initial capacity for an elastic queue)
    #[arg(short = 'c', long, value_name = "N", allow_negative_numbers = true)]
    pub capacity: Option<i64>,
}

#[derive(clap::Args, Debug, Clone, Default, PartialEq, Eq)]
pub struct DemoArgs {
    #[command(flatten)]
    pub queue: QueueArgs,

    /// Number of producer threads
    #[arg(short = 'p', long, value_name = "N")]
    pub producers: Option<usize>,

    /// Number of consumer threads
    #[arg(short = 'n', long, value_name = "N")]
    pub consumers: Option<usize>,

    /// Items each producer puts
    #[arg(short = 'i', long, value_name = "N")]
    pub items_per_producer: Option<usize>,

    /// Consumers stop at shutdown instead of draining the queue
    #[arg(long)]
    pub no_drain: bool,

    /// Use short back-off intervals suited to interactive runs
    #[arg(long)]
    pub responsive: bool,
}

#[derive(clap::Args, Debug, Clone, Default, PartialEq, Eq)]
pub struct ServeArgs {
    #[command(flatten)]
    pub queue: QueueArgs,

    /// Listen address
    #[arg(short = 'a', long, value_name = "HOST:PORT")]
    pub address: Option<String>,
}

#[derive(clap::Args, Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientArgs {
    /// Server address
    #[arg(short = 'a', long, value_name = "HOST:PORT")]
    pub address: Option<String>,

    /// Prompt shown before each input line
    #[arg(long, value_name = "TEXT", default_value = "flowq> ")]
    pub prompt: String,
}

/// Parse command line arguments
pub fn parse_args() -> Args {
    let args = Args::parse();
    debug!("Parsed CLI arguments: {:?}", args);
    args
}

/// Validate CLI argument combinations
pub fn validate_args(args: &Args) -> Result<()> {
    let log_flags_count = [args.verbose, args.quiet, args.debug]
        .iter()
        .filter(|&&flag| flag)
        .count();

    if log_flags_count > 1 {
        return Err(anyhow::anyhow!(
            "Conflicting log level flags: only one of --verbose, --quiet, or --debug may be specified"
        ));
    }

    match args.log_format.to_lowercase().as_str() {
        "text" | "json" => {},
        _ => return Err(anyhow::anyhow!(
            "Invalid log format '{}'. Valid options: text, json", args.log_format
        )),
    }

    if let Some(ref level) = args.log_file_level {
        match level.to_lowercase().as_str() {
            "error" | "warn" | "info" | "debug" | "trace" => {},
            _ => return Err(anyhow::anyhow!(
                "Invalid log file level '{}'. Valid levels: error, warn, info, debug, trace", level
            )),
        }
    }

    if args.log_file_level.is_some() && args.log_file.is_none() {
        return Err(anyhow::anyhow!(
            "--log-file-level requires --log-file to be specified"
        ));
    }

    match &args.command {
        Commands::Demo(demo) => {
            validate_queue_args(&demo.queue)?;
            if demo.consumers == Some(0) {
                return Err(anyhow::anyhow!("--consumers must be at least 1"));
            }
        }
        Commands::Serve(serve) => validate_queue_args(&serve.queue)?,
        Commands::Client(_) => {}
    }

    Ok(())
}

fn validate_queue_args(queue: &QueueArgs) -> Result<()> {
    match queue.capacity {
        Some(capacity) if capacity < 1 => Err(anyhow::anyhow!(
            "Invalid capacity {}: capacity must be at least 1", capacity
        )),
        _ => Ok(()),
    }
}
