//! Command line reader for the [`yomu`] manga library.
//!
//! This crate provides the `yomu` binary. It supports:
//! - Setting up a configuration and database
//! - Searching the active catalog and inspecting manga
//! - Bookmarks and per-chapter read state
//! - Downloading chapters for offline reading
//! - Switching between content sources
//!
//! # Usage
//!
//! ```bash
//! # Create ~/.yomu/config.toml and the database
//! yomu init
//!
//! # Find something to read
//! yomu search "one piece"
//! yomu info <manga-id>
//!
//! # Keep it around
//! yomu bookmark add <manga-id>
//! yomu download <manga-id> <chapter-id>
//! yomu downloads --filter "romance"
//!
//! # Read from another catalog
//! yomu source set mangahere
//! ```
//!
//! Every command accepts `--json` to print machine-readable output and `-v`
//! (repeatable) for more logging on stderr.

#![warn(missing_docs, clippy::missing_docs_in_private_items)]

use std::path::PathBuf;

use clap::{builder::ArgAction, Args, Parser, Subcommand};
use console::style;
use tracing::{debug, trace};
use tracing_subscriber::EnvFilter;
use yomu::{configuration::CONFIG_FILE, prelude::*, Config, Yomu};

pub mod commands;
pub mod error;
pub mod interaction;

use crate::{commands::*, error::*, interaction::*};

/// Command line interface configuration and argument parsing
#[derive(Parser)]
#[command(author, version, about = "Read, bookmark and download manga from the command line")]
pub struct Cli {
  /// Verbose mode (-v, -vv, -vvv) for different levels of logging detail
  #[arg(
        short,
        long,
        action = ArgAction::Count,
        global = true,
        help = "Increase logging verbosity"
    )]
  verbose: u8,

  /// Configuration directory holding `config.toml`. Defaults to `~/.yomu`.
  #[arg(long, short, global = true)]
  path: Option<PathBuf>,

  /// Print results as JSON
  #[arg(long, global = true)]
  json: bool,

  /// The subcommand to execute
  #[command(subcommand)]
  command: Commands,

  /// Skip all prompts and accept defaults (mostly for testing)
  #[arg(long, hide = true, global = true)]
  accept_defaults: bool,
}

impl Cli {
  /// The configuration directory in use.
  fn config_dir(&self) -> Result<PathBuf> {
    match &self.path {
      Some(path) => Ok(path.clone()),
      None => Ok(Config::default_path()?),
    }
  }
}

/// Configures the logging system based on the verbosity level
///
/// # Arguments
///
/// * `verbosity` - Number of times the verbose flag was used
///
/// The verbosity levels are:
/// - 0: error (default)
/// - 1: warn
/// - 2: info
/// - 3: debug
/// - 4+: trace
///
/// Logs go to stderr so `--json` output stays parseable.
fn setup_logging(verbosity: u8) {
  let filter = match verbosity {
    0 => "error",
    1 => "warn",
    2 => "info",
    3 => "debug",
    _ => "trace",
  };

  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

  tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_writer(std::io::stderr)
    .with_file(true)
    .with_line_number(true)
    .with_thread_ids(true)
    .with_target(true)
    .init();
}

/// Opens the library described by the configuration in `cli`'s directory.
async fn open(cli: &Cli) -> Result<Yomu> {
  let dir = cli.config_dir()?;
  trace!("Using configuration directory {}", dir.display());
  let config = Config::load(&dir)?;
  Ok(Yomu::from_config(config).await?)
}

/// Dispatches the parsed command.
async fn run(cli: &Cli, interaction: &Terminal) -> Result<()> {
  if let Commands::Init(options) = &cli.command {
    return init(interaction, cli.config_dir()?, options.clone()).await;
  }

  let yomu = open(cli).await?;
  debug!(source = %yomu.active_source().await?, "Library opened");
  match cli.command.clone() {
    Commands::Init(_) => Ok(()),
    Commands::Search(options) => search(interaction, yomu, options).await,
    Commands::Info(options) => info(interaction, yomu, options).await,
    Commands::Pages(options) => pages(interaction, yomu, options).await,
    Commands::Bookmark { cmd } => bookmark(interaction, yomu, cmd).await,
    Commands::Read { cmd } => read(interaction, yomu, cmd).await,
    Commands::Download(options) => download(interaction, yomu, options).await,
    Commands::Downloads(options) => downloads(interaction, yomu, options).await,
    Commands::Delete(options) => delete(interaction, yomu, options).await,
    Commands::Source { cmd } => source(interaction, yomu, cmd).await,
  }
}

/// Entry point for the yomu CLI application
///
/// Handles command line argument parsing, sets up logging, and executes the
/// requested command. Failures are printed to stderr and end the process
/// with exit code 1.
#[tokio::main]
async fn main() {
  let cli = Cli::parse();
  setup_logging(cli.verbose);

  let interaction = Terminal::new(cli.accept_defaults, cli.json);
  if let Err(e) = run(&cli, &interaction).await {
    eprintln!("{} {e}", style(ERROR_PREFIX).red());
    std::process::exit(1);
  }
}
