//! Queued remote mutations.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::cache::keys;
use crate::model::{Family, Kind};
use crate::remote::actions;

/// A remote mutation waiting to be replayed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
  pub job_id: String,
  pub action: String,
  pub payload: Value,
  pub enqueued_at: DateTime<Utc>,
}

impl Job {
  pub fn new(action: impl Into<String>, payload: Value) -> Self {
    Self {
      job_id: uuid::Uuid::new_v4().to_string(),
      action: action.into(),
      payload,
      enqueued_at: Utc::now(),
    }
  }

  /// Read-cache prefixes made stale once this job reaches the backend.
  pub fn invalidates(&self) -> &'static [&'static str] {
    invalidation_prefixes(&self.action)
  }
}

/// Create, update or delete of one entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mutation {
  Create,
  Update,
  Delete,
}

impl Mutation {
  const ALL: [Mutation; 3] = [Mutation::Create, Mutation::Update, Mutation::Delete];

  fn verb(&self) -> &'static str {
    match self {
      Mutation::Create => "create",
      Mutation::Update => "update",
      Mutation::Delete => "delete",
    }
  }

  /// Action name, e.g. `createBathService`.
  pub fn action(&self, kind: Kind) -> String {
    format!("{}{}", self.verb(), kind)
  }

  /// Splits `updateCustomer` into its mutation and kind.
  pub fn parse_action(action: &str) -> Option<(Mutation, Kind)> {
    Mutation::ALL.into_iter().find_map(|m| {
      let kind = action.strip_prefix(m.verb())?.parse().ok()?;
      Some((m, kind))
    })
  }
}

const PEOPLE_AND_ANIMALS: &[&str] = &[keys::LOOKUPS, keys::SEARCH, keys::TODAY];
const SCHEDULE: &[&str] = &[keys::TODAY];

/// Which cached reads an action can change.
///
/// Customers and animals feed the lookup lists, search and the day view;
/// services and tasks only show up in the day view. Unknown actions drop
/// every read.
pub fn invalidation_prefixes(action: &str) -> &'static [&'static str] {
  if action == actions::SET_COMPLETION_STATUS || action == actions::SET_PAYMENT_STATUS {
    return SCHEDULE;
  }

  match Mutation::parse_action(action) {
    Some((_, kind)) => match kind.family() {
      Family::Customers | Family::Animals => PEOPLE_AND_ANIMALS,
      Family::Services | Family::Tasks => SCHEDULE,
    },
    None => &keys::ALL,
  }
}
