//! CLI subcommands and their handlers.

use chrono::{Local, NaiveDate};
use clap::Subcommand;
use color_eyre::{eyre::eyre, Result};
use serde_json::Value;
use std::sync::Arc;

use kennel::model::{CompletionStatus, Entity, Kind, PaymentStatus};
use kennel::registry;
use kennel::remote::HttpEndpoint;
use kennel::storage::SqliteStorage;
use kennel::workspace::Workspace;

pub type App = Workspace<Arc<SqliteStorage>, HttpEndpoint>;

#[derive(Subcommand, Debug)]
pub enum Command {
  /// Validate and save a record given as JSON (must carry "kind")
  Save { json: String },
  /// Show one record
  Get { kind: String, id: String },
  /// List a family: customers, animals, services or tasks
  List { family: String },
  /// Delete one record
  Remove { kind: String, id: String },
  /// Mark a service or task completed
  Complete {
    kind: String,
    id: String,
    /// Set back to scheduled instead
    #[arg(long)]
    undo: bool,
  },
  /// Mark a service paid
  Pay {
    kind: String,
    id: String,
    /// Set back to unpaid instead
    #[arg(long)]
    undo: bool,
  },
  /// Show the day's schedule from the backend
  Today {
    /// Day as DD-MM-YYYY (default: today)
    #[arg(long)]
    date: Option<String>,
  },
  /// Show lookup lists from the backend
  Lookups,
  /// Search the backend
  Search { q: String },
  /// Check that the backend answers
  Ping,
  /// Replay queued writes now
  Sync,
  /// Show queued writes and the last sync error
  Status,
  /// Delete all local records and queued writes
  Reset {
    /// Required, as this cannot be undone
    #[arg(long)]
    yes: bool,
  },
}

impl Command {
  fn is_write(&self) -> bool {
    matches!(
      self,
      Command::Save { .. } | Command::Remove { .. } | Command::Complete { .. } | Command::Pay { .. }
    )
  }
}

/// Run one command against the workspace.
///
/// When `drain_after_write` is set, writes are pushed to the backend before
/// returning.
pub async fn run(app: &App, command: Command, drain_after_write: bool) -> Result<()> {
  let is_write = command.is_write();

  match command {
    Command::Save { json } => {
      let record: Value = serde_json::from_str(&json).map_err(|e| eyre!("Invalid JSON: {}", e))?;
      let entity = app.save(record)?;
      print_entity(&entity)?;
    }
    Command::Get { kind, id } => match app.get(parse_kind(&kind)?, &id)? {
      Some(entity) => print_entity(&entity)?,
      None => return Err(eyre!("No {} with id {}", kind, id)),
    },
    Command::List { family } => {
      let records: Vec<Value> = app.list(&family)?.iter().map(Entity::to_record).collect();
      print_json(&Value::Array(records))?;
    }
    Command::Remove { kind, id } => {
      if app.remove(parse_kind(&kind)?, &id)? {
        println!("Removed {} {}", kind, id);
      } else {
        println!("Nothing stored under {} {}", kind, id);
      }
    }
    Command::Complete { kind, id, undo } => {
      let status = if undo {
        CompletionStatus::Scheduled
      } else {
        CompletionStatus::Completed
      };
      print_entity(&app.set_completion(parse_kind(&kind)?, &id, status)?)?;
    }
    Command::Pay { kind, id, undo } => {
      let status = if undo {
        PaymentStatus::Unpaid
      } else {
        PaymentStatus::Paid
      };
      print_entity(&app.set_payment(parse_kind(&kind)?, &id, status)?)?;
    }
    Command::Today { date } => {
      let date = match date {
        Some(d) => NaiveDate::parse_from_str(&d, "%d-%m-%Y")
          .map_err(|_| eyre!("Invalid date {:?}; use DD-MM-YYYY", d))?,
        None => Local::now().date_naive(),
      };
      print_json(&app.today(date).await?.data)?;
    }
    Command::Lookups => print_json(&app.lookups().await?.data)?,
    Command::Search { q } => print_json(&app.search(&q).await?.data)?,
    Command::Ping => {
      app.ping().await?;
      println!("Backend is reachable");
    }
    Command::Sync => sync(app).await,
    Command::Status => print_status(app)?,
    Command::Reset { yes } => {
      if !yes {
        return Err(eyre!("Refusing to reset without --yes"));
      }
      app.reset()?;
      println!("Local data and queued writes removed");
    }
  }

  if is_write && drain_after_write {
    sync(app).await;
  }

  Ok(())
}

async fn sync(app: &App) {
  let report = app.sync().await;
  if report.skipped {
    println!("Sync already in progress");
    return;
  }
  match report.error {
    Some(e) => eprintln!(
      "Synced {} write(s); {} still queued: {}",
      report.replayed, report.remaining, e
    ),
    None => println!("Synced {} write(s)", report.replayed),
  }
}

fn print_status(app: &App) -> Result<()> {
  let status = app.status();
  let pending = app.pending()?;

  println!("Queued writes: {}", pending.len());
  for job in &pending {
    println!(
      "  {}  {}  {}",
      job.enqueued_at.format("%d-%m-%Y %H:%M:%S"),
      job.action,
      job.job_id
    );
  }
  if let Some(err) = status.last_error {
    println!("Last error: {}", err);
  }
  Ok(())
}

fn parse_kind(name: &str) -> Result<Kind> {
  name.parse().map_err(|_| {
    eyre!(
      "Unknown kind {:?}; supported kinds: {}",
      name,
      registry::supported_kinds().join(", ")
    )
  })
}

fn print_entity(entity: &Entity) -> Result<()> {
  print_json(&entity.to_record())
}

fn print_json(value: &Value) -> Result<()> {
  println!("{}", serde_json::to_string_pretty(value)?);
  Ok(())
}
