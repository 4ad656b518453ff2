use serde::{Deserialize, Serialize};

use super::fields::{nullable, optional_id, required_text, CalendarDate, CompletionStatus};
use super::Kind;
use crate::error::ValidationError;

/// Plain stored form of a [`Task`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TaskRecord {
  pub id: Option<String>,
  #[serde(deserialize_with = "nullable")]
  pub title: String,
  #[serde(deserialize_with = "nullable")]
  pub date: String,
  pub completion_status: Option<String>,
  #[serde(deserialize_with = "nullable")]
  pub description: String,
}

/// An internal to-do for the staff on a given day.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task {
  pub(crate) id: Option<String>,
  pub(crate) title: String,
  pub(crate) date: CalendarDate,
  pub(crate) completion_status: CompletionStatus,
  pub(crate) description: String,
}

impl Task {
  pub fn id(&self) -> Option<&str> {
    self.id.as_deref()
  }

  pub fn title(&self) -> &str {
    &self.title
  }

  pub fn date(&self) -> CalendarDate {
    self.date
  }

  pub fn completion_status(&self) -> CompletionStatus {
    self.completion_status
  }

  pub fn description(&self) -> &str {
    &self.description
  }
}

impl TryFrom<TaskRecord> for Task {
  type Error = ValidationError;

  fn try_from(record: TaskRecord) -> Result<Self, Self::Error> {
    const KIND: Kind = Kind::Task;

    Ok(Self {
      id: optional_id(KIND, record.id)?,
      title: required_text(KIND, "title", record.title)?,
      date: CalendarDate::parse(KIND, "date", &record.date)?,
      completion_status: CompletionStatus::parse(
        KIND,
        "completionStatus",
        record.completion_status.as_deref(),
      )?,
      description: record.description,
    })
  }
}

impl From<&Task> for TaskRecord {
  fn from(task: &Task) -> Self {
    Self {
      id: task.id.clone(),
      title: task.title.clone(),
      date: task.date.to_string(),
      completion_status: Some(task.completion_status.as_str().to_string()),
      description: task.description.clone(),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_task_defaults_to_scheduled() {
    let task = Task::try_from(TaskRecord {
      title: "Buy kibble".to_string(),
      date: "02-02-2026".to_string(),
      ..Default::default()
    })
    .unwrap();
    assert_eq!(task.completion_status(), CompletionStatus::Scheduled);
    assert_eq!(
      TaskRecord::from(&task).completion_status.as_deref(),
      Some("Scheduled")
    );
  }

  #[test]
  fn test_task_requires_title_and_date() {
    let err = Task::try_from(TaskRecord {
      date: "02-02-2026".to_string(),
      ..Default::default()
    })
    .unwrap_err();
    assert_eq!(err.field, "title");

    let err = Task::try_from(TaskRecord {
      title: "Clean kennels".to_string(),
      ..Default::default()
    })
    .unwrap_err();
    assert_eq!(err.field, "date");
  }
}
