mod commands;
mod config;

use clap::Parser;
use color_eyre::Result;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

use kennel::remote::HttpEndpoint;
use kennel::storage::SqliteStorage;
use kennel::workspace::Workspace;

#[derive(Parser, Debug)]
#[command(name = "kennel")]
#[command(about = "Local-first records and sync queue for a pet hotel scheduler")]
#[command(version)]
struct Args {
  /// Path to config file (default: $XDG_CONFIG_HOME/kennel/config.yaml)
  #[arg(short, long)]
  config: Option<PathBuf>,

  /// Write logs to stderr instead of the log file
  #[arg(long)]
  log_stderr: bool,

  #[command(subcommand)]
  command: commands::Command,
}

/// Filter directives come from `KENNEL_LOG`, e.g. `KENNEL_LOG=kennel=debug`.
fn init_tracing(log_stderr: bool, data_dir: Option<&std::path::Path>) -> Option<WorkerGuard> {
  let filter = EnvFilter::try_from_env("KENNEL_LOG").unwrap_or_else(|_| EnvFilter::new("info"));

  match data_dir {
    Some(dir) if !log_stderr => {
      let appender = tracing_appender::rolling::never(dir, "kennel.log");
      let (writer, guard) = tracing_appender::non_blocking(appender);
      tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(false)
        .init();
      Some(guard)
    }
    _ => {
      tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
      None
    }
  }
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  let args = Args::parse();

  // Load configuration
  let config = config::Config::load(args.config.as_deref())?;
  let db_path = config.storage_path()?;

  // Opening the database also creates the data directory the log lives in.
  let storage = Arc::new(SqliteStorage::open(&db_path)?);
  let _log_guard = init_tracing(args.log_stderr, db_path.parent());

  let endpoint = HttpEndpoint::new(config.api.url.as_deref())?;
  let can_sync = endpoint.is_configured();

  // The CLI exits after one command, so syncing happens in the foreground.
  let mut settings = config.workspace_settings();
  settings.outbox.auto_drain = false;

  let app = Workspace::new(storage, endpoint, settings);
  tracing::debug!(db = %db_path.display(), can_sync, "workspace ready");

  commands::run(&app, args.command, config.outbox.auto_drain && can_sync).await?;

  Ok(())
}
