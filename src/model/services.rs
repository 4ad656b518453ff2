//! The six bookable service kinds.
//!
//! All services share one plain record shape; each kind reads the fields it
//! needs and writes back only those, so a day care record never grows a
//! `time` field on its way through storage.

use serde::{Deserialize, Serialize};

use super::fields::{
  nullable, optional_id, optional_time, required_text, CalendarDate, CompletionStatus, Direction,
  PaymentStatus, TimeOfDay,
};
use super::Kind;
use crate::error::ValidationError;

/// Plain stored form shared by every service kind.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServiceRecord {
  pub id: Option<String>,
  #[serde(deserialize_with = "nullable")]
  pub animal_id: String,
  #[serde(deserialize_with = "nullable")]
  pub date: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub time: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub description: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub direction: Option<String>,
  pub completion_status: Option<String>,
  pub payment_status: Option<String>,
}

/// Fields common to every service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceCore {
  pub(crate) id: Option<String>,
  pub(crate) animal_id: String,
  pub(crate) date: CalendarDate,
  pub(crate) completion_status: CompletionStatus,
  pub(crate) payment_status: PaymentStatus,
}

impl ServiceCore {
  fn parse(kind: Kind, record: &mut ServiceRecord) -> Result<Self, ValidationError> {
    Ok(Self {
      id: optional_id(kind, record.id.take())?,
      animal_id: required_text(kind, "animalId", std::mem::take(&mut record.animal_id))?,
      date: CalendarDate::parse(kind, "date", &record.date)?,
      completion_status: CompletionStatus::parse(
        kind,
        "completionStatus",
        record.completion_status.as_deref(),
      )?,
      payment_status: PaymentStatus::parse(kind, "paymentStatus", record.payment_status.as_deref())?,
    })
  }

  fn to_record(&self) -> ServiceRecord {
    ServiceRecord {
      id: self.id.clone(),
      animal_id: self.animal_id.clone(),
      date: self.date.to_string(),
      completion_status: Some(self.completion_status.as_str().to_string()),
      payment_status: Some(self.payment_status.as_str().to_string()),
      ..Default::default()
    }
  }

  pub fn id(&self) -> Option<&str> {
    self.id.as_deref()
  }

  pub fn animal_id(&self) -> &str {
    &self.animal_id
  }

  pub fn date(&self) -> CalendarDate {
    self.date
  }

  pub fn completion_status(&self) -> CompletionStatus {
    self.completion_status
  }

  pub fn payment_status(&self) -> PaymentStatus {
    self.payment_status
  }
}

/// A bath, booked for a date and time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BathService {
  pub(crate) core: ServiceCore,
  pub(crate) time: TimeOfDay,
}

/// A hygienic trim, booked for a date and time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HygienicWipeService {
  pub(crate) core: ServiceCore,
  pub(crate) time: TimeOfDay,
}

/// A day at day care.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DayCareService {
  pub(crate) core: ServiceCore,
}

/// One night of hotel stay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HotelStayService {
  pub(crate) core: ServiceCore,
}

/// A free-form service; the description says what it is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OtherService {
  pub(crate) core: ServiceCore,
  pub(crate) time: Option<TimeOfDay>,
  pub(crate) description: String,
}

/// A pick-up or drop-off run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportationService {
  pub(crate) core: ServiceCore,
  pub(crate) direction: Direction,
}

impl BathService {
  pub fn core(&self) -> &ServiceCore {
    &self.core
  }

  pub fn time(&self) -> TimeOfDay {
    self.time
  }
}

impl HygienicWipeService {
  pub fn core(&self) -> &ServiceCore {
    &self.core
  }

  pub fn time(&self) -> TimeOfDay {
    self.time
  }
}

impl DayCareService {
  pub fn core(&self) -> &ServiceCore {
    &self.core
  }
}

impl HotelStayService {
  pub fn core(&self) -> &ServiceCore {
    &self.core
  }
}

impl OtherService {
  pub fn core(&self) -> &ServiceCore {
    &self.core
  }

  pub fn time(&self) -> Option<TimeOfDay> {
    self.time
  }

  pub fn description(&self) -> &str {
    &self.description
  }
}

impl TransportationService {
  pub fn core(&self) -> &ServiceCore {
    &self.core
  }

  pub fn direction(&self) -> Direction {
    self.direction
  }
}

// ============================================================================
// Record conversions
// ============================================================================

fn required_time(
  kind: Kind,
  record: &ServiceRecord,
) -> Result<TimeOfDay, ValidationError> {
  TimeOfDay::parse(kind, "time", record.time.as_deref().unwrap_or_default())
}

impl TryFrom<ServiceRecord> for BathService {
  type Error = ValidationError;

  fn try_from(mut record: ServiceRecord) -> Result<Self, Self::Error> {
    let core = ServiceCore::parse(Kind::BathService, &mut record)?;
    let time = required_time(Kind::BathService, &record)?;
    Ok(Self { core, time })
  }
}

impl TryFrom<ServiceRecord> for HygienicWipeService {
  type Error = ValidationError;

  fn try_from(mut record: ServiceRecord) -> Result<Self, Self::Error> {
    let core = ServiceCore::parse(Kind::HygienicWipeService, &mut record)?;
    let time = required_time(Kind::HygienicWipeService, &record)?;
    Ok(Self { core, time })
  }
}

impl TryFrom<ServiceRecord> for DayCareService {
  type Error = ValidationError;

  fn try_from(mut record: ServiceRecord) -> Result<Self, Self::Error> {
    let core = ServiceCore::parse(Kind::DayCareService, &mut record)?;
    Ok(Self { core })
  }
}

impl TryFrom<ServiceRecord> for HotelStayService {
  type Error = ValidationError;

  fn try_from(mut record: ServiceRecord) -> Result<Self, Self::Error> {
    let core = ServiceCore::parse(Kind::HotelStayService, &mut record)?;
    Ok(Self { core })
  }
}

impl TryFrom<ServiceRecord> for OtherService {
  type Error = ValidationError;

  fn try_from(mut record: ServiceRecord) -> Result<Self, Self::Error> {
    const KIND: Kind = Kind::OtherService;

    let core = ServiceCore::parse(KIND, &mut record)?;
    let description = required_text(KIND, "description", record.description.unwrap_or_default())?;
    let time = optional_time(KIND, "time", record.time.as_deref().unwrap_or_default())?;
    Ok(Self {
      core,
      time,
      description,
    })
  }
}

impl TryFrom<ServiceRecord> for TransportationService {
  type Error = ValidationError;

  fn try_from(mut record: ServiceRecord) -> Result<Self, Self::Error> {
    const KIND: Kind = Kind::TransportationService;

    let core = ServiceCore::parse(KIND, &mut record)?;
    let direction = Direction::parse(KIND, "direction", record.direction.as_deref().unwrap_or_default())?;
    Ok(Self { core, direction })
  }
}

impl From<&BathService> for ServiceRecord {
  fn from(service: &BathService) -> Self {
    Self {
      time: Some(service.time.to_string()),
      ..service.core.to_record()
    }
  }
}

impl From<&HygienicWipeService> for ServiceRecord {
  fn from(service: &HygienicWipeService) -> Self {
    Self {
      time: Some(service.time.to_string()),
      ..service.core.to_record()
    }
  }
}

impl From<&DayCareService> for ServiceRecord {
  fn from(service: &DayCareService) -> Self {
    service.core.to_record()
  }
}

impl From<&HotelStayService> for ServiceRecord {
  fn from(service: &HotelStayService) -> Self {
    service.core.to_record()
  }
}

impl From<&OtherService> for ServiceRecord {
  fn from(service: &OtherService) -> Self {
    Self {
      time: Some(service.time.map(|t| t.to_string()).unwrap_or_default()),
      description: Some(service.description.clone()),
      ..service.core.to_record()
    }
  }
}

impl From<&TransportationService> for ServiceRecord {
  fn from(service: &TransportationService) -> Self {
    Self {
      direction: Some(service.direction.as_str().to_string()),
      ..service.core.to_record()
    }
  }
}
