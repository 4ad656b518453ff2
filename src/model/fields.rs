//! Field value types and the structural rules shared by every entity kind.
//!
//! Dates travel as `DD-MM-YYYY` strings and times as `HHhMMm` strings. Once
//! parsed they are held as [`CalendarDate`] and [`TimeOfDay`], so an entity
//! can never carry a malformed value. Formatting either type back yields
//! the exact string it was parsed from.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

use super::Kind;
use crate::error::ValidationError;

const MIN_YEAR: i32 = 1900;
const MAX_YEAR: i32 = 2100;

/// A calendar day, written `DD-MM-YYYY`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CalendarDate(NaiveDate);

impl CalendarDate {
  pub fn parse(kind: Kind, field: &'static str, value: &str) -> Result<Self, ValidationError> {
    let bytes = value.as_bytes();
    let shaped = bytes.len() == 10
      && bytes[2] == b'-'
      && bytes[5] == b'-'
      && bytes
        .iter()
        .enumerate()
        .all(|(i, b)| i == 2 || i == 5 || b.is_ascii_digit());
    if !shaped {
      return Err(ValidationError::new(kind, field, "use DD-MM-YYYY"));
    }

    // Shape is checked above, so the slices are all ASCII digits.
    let day: u32 = value[0..2].parse().unwrap_or(0);
    let month: u32 = value[3..5].parse().unwrap_or(0);
    let year: i32 = value[6..10].parse().unwrap_or(0);

    if !(MIN_YEAR..=MAX_YEAR).contains(&year) {
      return Err(ValidationError::new(kind, field, "invalid date"));
    }

    NaiveDate::from_ymd_opt(year, month, day)
      .map(CalendarDate)
      .ok_or_else(|| ValidationError::new(kind, field, "invalid date"))
  }

  pub fn from_naive(date: NaiveDate) -> Option<Self> {
    (MIN_YEAR..=MAX_YEAR)
      .contains(&date.year())
      .then_some(CalendarDate(date))
  }

  pub fn naive(&self) -> NaiveDate {
    self.0
  }
}

impl fmt::Display for CalendarDate {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.0.format("%d-%m-%Y"))
  }
}

/// A time of day, written `HHhMMm`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimeOfDay {
  hour: u8,
  minute: u8,
}

impl TimeOfDay {
  pub fn parse(kind: Kind, field: &'static str, value: &str) -> Result<Self, ValidationError> {
    let bytes = value.as_bytes();
    let shaped = bytes.len() == 6
      && bytes[2] == b'h'
      && bytes[5] == b'm'
      && [0, 1, 3, 4].iter().all(|&i| bytes[i].is_ascii_digit());
    if !shaped {
      return Err(ValidationError::new(kind, field, "use HHhMMm"));
    }

    let hour: u8 = value[0..2].parse().unwrap_or(u8::MAX);
    let minute: u8 = value[3..5].parse().unwrap_or(u8::MAX);
    if hour > 23 || minute > 59 {
      return Err(ValidationError::new(kind, field, "invalid time"));
    }

    Ok(Self { hour, minute })
  }

  pub fn hour(&self) -> u8 {
    self.hour
  }

  pub fn minute(&self) -> u8 {
    self.minute
  }
}

impl fmt::Display for TimeOfDay {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{:02}h{:02}m", self.hour, self.minute)
  }
}

/// Whether a service or task has been carried out.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CompletionStatus {
  #[default]
  Scheduled,
  Completed,
}

impl CompletionStatus {
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Scheduled => "Scheduled",
      Self::Completed => "Completed",
    }
  }

  pub fn toggled(&self) -> Self {
    match self {
      Self::Scheduled => Self::Completed,
      Self::Completed => Self::Scheduled,
    }
  }

  pub(crate) fn parse(
    kind: Kind,
    field: &'static str,
    value: Option<&str>,
  ) -> Result<Self, ValidationError> {
    match value {
      None => Ok(Self::default()),
      Some("Scheduled") => Ok(Self::Scheduled),
      Some("Completed") => Ok(Self::Completed),
      Some(_) => Err(ValidationError::new(
        kind,
        field,
        "use \"Scheduled\" or \"Completed\"",
      )),
    }
  }
}

/// Whether a service has been paid for.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PaymentStatus {
  #[default]
  Unpaid,
  Paid,
}

impl PaymentStatus {
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Unpaid => "Unpaid",
      Self::Paid => "Paid",
    }
  }

  pub(crate) fn parse(
    kind: Kind,
    field: &'static str,
    value: Option<&str>,
  ) -> Result<Self, ValidationError> {
    match value {
      None => Ok(Self::default()),
      Some("Unpaid") => Ok(Self::Unpaid),
      Some("Paid") => Ok(Self::Paid),
      Some(_) => Err(ValidationError::new(kind, field, "use \"Unpaid\" or \"Paid\"")),
    }
  }
}

/// Which way a transport goes. Matched exactly, with no normalization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
  ToHotel,
  ToHome,
}

impl Direction {
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::ToHotel => "Para o Hotel",
      Self::ToHome => "Para Casa",
    }
  }

  pub(crate) fn parse(kind: Kind, field: &'static str, value: &str) -> Result<Self, ValidationError> {
    match value {
      "Para o Hotel" => Ok(Self::ToHotel),
      "Para Casa" => Ok(Self::ToHome),
      _ => Err(ValidationError::new(
        kind,
        field,
        "invalid value, must be exactly 'Para o Hotel' or 'Para Casa'",
      )),
    }
  }
}

// ============================================================================
// Rule helpers
// ============================================================================

pub(crate) fn optional_id(kind: Kind, id: Option<String>) -> Result<Option<String>, ValidationError> {
  match id {
    Some(id) if id.trim().is_empty() => Err(ValidationError::new(kind, "id", "must not be empty")),
    other => Ok(other),
  }
}

pub(crate) fn required_text(
  kind: Kind,
  field: &'static str,
  value: String,
) -> Result<String, ValidationError> {
  if value.trim().is_empty() {
    return Err(ValidationError::new(kind, field, "must not be empty"));
  }
  Ok(value)
}

pub(crate) fn id_list(
  kind: Kind,
  field: &'static str,
  ids: Vec<String>,
) -> Result<Vec<String>, ValidationError> {
  if ids.iter().any(|id| id.trim().is_empty()) {
    return Err(ValidationError::new(kind, field, "contains an invalid id"));
  }
  Ok(ids)
}

pub(crate) fn credit_count(kind: Kind, field: &'static str, value: i64) -> Result<u32, ValidationError> {
  if value < 0 {
    return Err(ValidationError::new(kind, field, "must not be negative"));
  }
  u32::try_from(value).map_err(|_| ValidationError::new(kind, field, "is too large"))
}

/// Parses a date that may be left blank.
pub(crate) fn optional_date(
  kind: Kind,
  field: &'static str,
  value: &str,
) -> Result<Option<CalendarDate>, ValidationError> {
  if value.trim().is_empty() {
    return Ok(None);
  }
  CalendarDate::parse(kind, field, value).map(Some)
}

/// Parses a time that may be left blank.
pub(crate) fn optional_time(
  kind: Kind,
  field: &'static str,
  value: &str,
) -> Result<Option<TimeOfDay>, ValidationError> {
  if value.trim().is_empty() {
    return Ok(None);
  }
  TimeOfDay::parse(kind, field, value).map(Some)
}

/// Treats an explicit JSON `null` the same as a missing field.
pub(crate) fn nullable<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
  D: Deserializer<'de>,
  T: Default + Deserialize<'de>,
{
  Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_date_round_trips_its_text() {
    let date = CalendarDate::parse(Kind::Task, "date", "05-01-2026").unwrap();
    assert_eq!(date.to_string(), "05-01-2026");
    assert_eq!(date.naive(), NaiveDate::from_ymd_opt(2026, 1, 5).unwrap());
  }

  #[test]
  fn test_date_rejects_iso_layout() {
    let err = CalendarDate::parse(Kind::Task, "date", "2025-12-15").unwrap_err();
    assert_eq!(err.field, "date");
    assert_eq!(err.message, "use DD-MM-YYYY");
  }

  #[test]
  fn test_date_rejects_impossible_days() {
    for bad in ["31-04-2025", "29-02-2025", "00-01-2025", "10-13-2025", "01-01-1899"] {
      let err = CalendarDate::parse(Kind::Task, "date", bad).unwrap_err();
      assert_eq!(err.message, "invalid date", "{bad}");
    }
    assert!(CalendarDate::parse(Kind::Task, "date", "29-02-2024").is_ok());
  }

  #[test]
  fn test_time_bounds() {
    assert_eq!(
      TimeOfDay::parse(Kind::BathService, "time", "23h59m")
        .unwrap()
        .to_string(),
      "23h59m"
    );
    let err = TimeOfDay::parse(Kind::BathService, "time", "25h00m").unwrap_err();
    assert_eq!(err.message, "invalid time");
    let err = TimeOfDay::parse(Kind::BathService, "time", "10:30").unwrap_err();
    assert_eq!(err.message, "use HHhMMm");
  }

  #[test]
  fn test_direction_is_exact_match() {
    assert_eq!(
      Direction::parse(Kind::TransportationService, "direction", "Para o Hotel").unwrap(),
      Direction::ToHotel
    );
    for bad in ["To Hotel", "para o hotel", " Para Casa", ""] {
      assert!(Direction::parse(Kind::TransportationService, "direction", bad).is_err());
    }
  }

  #[test]
  fn test_status_defaults_when_missing() {
    assert_eq!(
      CompletionStatus::parse(Kind::Task, "completionStatus", None).unwrap(),
      CompletionStatus::Scheduled
    );
    assert_eq!(
      PaymentStatus::parse(Kind::BathService, "paymentStatus", None).unwrap(),
      PaymentStatus::Unpaid
    );
    assert!(CompletionStatus::parse(Kind::Task, "completionStatus", Some("Done")).is_err());
  }

  #[test]
  fn test_credit_count_rejects_negative() {
    let err = credit_count(Kind::Customer, "bathCredits", -1).unwrap_err();
    assert_eq!(err.to_string(), "Customer.bathCredits: must not be negative");
  }
}
