//! # Domain Model
//!
//! Every business record the scheduler keeps is an [`Entity`]: a closed sum
//! over the record kinds. Each variant validates all of its fields when it is
//! built from a plain record, and writes itself back to exactly the same
//! plain record, so
//!
//! ```text
//! construct(serialize(e)) == e
//! ```
//!
//! holds for every entity. There is no way to hold a half-valid entity:
//! construction either succeeds with every rule satisfied or fails naming the
//! offending field.
//!
//! ## Families
//!
//! Kinds are grouped into storage families. Customers, animals and tasks each
//! get their own family; the six service kinds share `services`.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

mod animal;
mod customer;
pub mod fields;
mod services;
mod task;

pub use animal::{Animal, AnimalRecord};
pub use customer::{Customer, CustomerRecord};
pub use fields::{CalendarDate, CompletionStatus, Direction, PaymentStatus, TimeOfDay};
pub use services::{
  BathService, DayCareService, HotelStayService, HygienicWipeService, OtherService, ServiceCore,
  ServiceRecord, TransportationService,
};
pub use task::{Task, TaskRecord};

use crate::error::StoreError;

/// Discriminator naming which entity variant a plain record holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Kind {
  Customer,
  #[serde(alias = "Dog")]
  Animal,
  BathService,
  HygienicWipeService,
  DayCareService,
  HotelStayService,
  OtherService,
  TransportationService,
  Task,
}

impl Kind {
  pub const ALL: [Kind; 9] = [
    Kind::Customer,
    Kind::Animal,
    Kind::BathService,
    Kind::HygienicWipeService,
    Kind::DayCareService,
    Kind::HotelStayService,
    Kind::OtherService,
    Kind::TransportationService,
    Kind::Task,
  ];

  pub fn as_str(&self) -> &'static str {
    match self {
      Kind::Customer => "Customer",
      Kind::Animal => "Animal",
      Kind::BathService => "BathService",
      Kind::HygienicWipeService => "HygienicWipeService",
      Kind::DayCareService => "DayCareService",
      Kind::HotelStayService => "HotelStayService",
      Kind::OtherService => "OtherService",
      Kind::TransportationService => "TransportationService",
      Kind::Task => "Task",
    }
  }

  pub fn family(&self) -> Family {
    match self {
      Kind::Customer => Family::Customers,
      Kind::Animal => Family::Animals,
      Kind::Task => Family::Tasks,
      Kind::BathService
      | Kind::HygienicWipeService
      | Kind::DayCareService
      | Kind::HotelStayService
      | Kind::OtherService
      | Kind::TransportationService => Family::Services,
    }
  }

  /// Prefix used for ids the local store generates.
  pub fn id_prefix(&self) -> &'static str {
    match self.family() {
      Family::Customers => "cust",
      Family::Animals => "dog",
      Family::Services => "svc",
      Family::Tasks => "task",
    }
  }
}

impl fmt::Display for Kind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for Kind {
  type Err = ();

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    if s == "Dog" {
      return Ok(Kind::Animal);
    }
    Kind::ALL.into_iter().find(|k| k.as_str() == s).ok_or(())
  }
}

/// Storage grouping of kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Family {
  Customers,
  Animals,
  Services,
  Tasks,
}

impl Family {
  pub const ALL: [Family; 4] = [
    Family::Customers,
    Family::Animals,
    Family::Services,
    Family::Tasks,
  ];

  pub fn as_str(&self) -> &'static str {
    match self {
      Family::Customers => "customers",
      Family::Animals => "animals",
      Family::Services => "services",
      Family::Tasks => "tasks",
    }
  }

  /// Storage key holding this family's `id -> record` map.
  pub fn storage_key(&self) -> &'static str {
    match self {
      Family::Customers => "kennel.customers.v1",
      Family::Animals => "kennel.animals.v1",
      Family::Services => "kennel.services.v1",
      Family::Tasks => "kennel.tasks.v1",
    }
  }
}

impl fmt::Display for Family {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for Family {
  type Err = StoreError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let name = s.trim().to_lowercase();
    Family::ALL
      .into_iter()
      .find(|f| f.as_str() == name)
      .ok_or_else(|| StoreError::UnknownFamily(s.to_string()))
  }
}

/// A validated business record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Entity {
  Customer(Customer),
  Animal(Animal),
  BathService(BathService),
  HygienicWipeService(HygienicWipeService),
  DayCareService(DayCareService),
  HotelStayService(HotelStayService),
  OtherService(OtherService),
  TransportationService(TransportationService),
  Task(Task),
}

impl Entity {
  pub fn kind(&self) -> Kind {
    match self {
      Entity::Customer(_) => Kind::Customer,
      Entity::Animal(_) => Kind::Animal,
      Entity::BathService(_) => Kind::BathService,
      Entity::HygienicWipeService(_) => Kind::HygienicWipeService,
      Entity::DayCareService(_) => Kind::DayCareService,
      Entity::HotelStayService(_) => Kind::HotelStayService,
      Entity::OtherService(_) => Kind::OtherService,
      Entity::TransportationService(_) => Kind::TransportationService,
      Entity::Task(_) => Kind::Task,
    }
  }

  pub fn family(&self) -> Family {
    self.kind().family()
  }

  pub fn id(&self) -> Option<&str> {
    match self {
      Entity::Customer(c) => c.id(),
      Entity::Animal(a) => a.id(),
      Entity::Task(t) => t.id(),
      _ => self.service_core().and_then(ServiceCore::id),
    }
  }

  /// Shared service fields, for the six service kinds.
  pub fn service_core(&self) -> Option<&ServiceCore> {
    match self {
      Entity::BathService(s) => Some(&s.core),
      Entity::HygienicWipeService(s) => Some(&s.core),
      Entity::DayCareService(s) => Some(&s.core),
      Entity::HotelStayService(s) => Some(&s.core),
      Entity::OtherService(s) => Some(&s.core),
      Entity::TransportationService(s) => Some(&s.core),
      Entity::Customer(_) | Entity::Animal(_) | Entity::Task(_) => None,
    }
  }

  fn service_core_mut(&mut self) -> Option<&mut ServiceCore> {
    match self {
      Entity::BathService(s) => Some(&mut s.core),
      Entity::HygienicWipeService(s) => Some(&mut s.core),
      Entity::DayCareService(s) => Some(&mut s.core),
      Entity::HotelStayService(s) => Some(&mut s.core),
      Entity::OtherService(s) => Some(&mut s.core),
      Entity::TransportationService(s) => Some(&mut s.core),
      Entity::Customer(_) | Entity::Animal(_) | Entity::Task(_) => None,
    }
  }

  pub fn completion_status(&self) -> Option<CompletionStatus> {
    match self {
      Entity::Task(t) => Some(t.completion_status),
      _ => self.service_core().map(|c| c.completion_status),
    }
  }

  pub fn payment_status(&self) -> Option<PaymentStatus> {
    self.service_core().map(|c| c.payment_status)
  }

  /// Returns a copy with the completion status replaced.
  pub fn with_completion(&self, status: CompletionStatus) -> Result<Entity, StoreError> {
    let mut next = self.clone();
    match &mut next {
      Entity::Task(t) => t.completion_status = status,
      other => match other.service_core_mut() {
        Some(core) => core.completion_status = status,
        None => {
          return Err(StoreError::StatusNotApplicable {
            kind: self.kind(),
            field: "completionStatus",
          })
        }
      },
    }
    Ok(next)
  }

  /// Returns a copy with the payment status replaced.
  pub fn with_payment(&self, status: PaymentStatus) -> Result<Entity, StoreError> {
    let mut next = self.clone();
    match next.service_core_mut() {
      Some(core) => core.payment_status = status,
      None => {
        return Err(StoreError::StatusNotApplicable {
          kind: self.kind(),
          field: "paymentStatus",
        })
      }
    }
    Ok(next)
  }

  /// Assigns the storage id. Callers guarantee the id is non-blank.
  pub(crate) fn with_id(mut self, id: String) -> Entity {
    match &mut self {
      Entity::Customer(c) => c.id = Some(id),
      Entity::Animal(a) => a.id = Some(id),
      Entity::Task(t) => t.id = Some(id),
      other => {
        if let Some(core) = other.service_core_mut() {
          core.id = Some(id);
        }
      }
    }
    self
  }

  /// Serializes to the plain record form, `kind` included.
  pub fn to_record(&self) -> Value {
    let body = match self {
      Entity::Customer(c) => serde_json::to_value(CustomerRecord::from(c)),
      Entity::Animal(a) => serde_json::to_value(AnimalRecord::from(a)),
      Entity::Task(t) => serde_json::to_value(TaskRecord::from(t)),
      Entity::BathService(s) => serde_json::to_value(ServiceRecord::from(s)),
      Entity::HygienicWipeService(s) => serde_json::to_value(ServiceRecord::from(s)),
      Entity::DayCareService(s) => serde_json::to_value(ServiceRecord::from(s)),
      Entity::HotelStayService(s) => serde_json::to_value(ServiceRecord::from(s)),
      Entity::OtherService(s) => serde_json::to_value(ServiceRecord::from(s)),
      Entity::TransportationService(s) => serde_json::to_value(ServiceRecord::from(s)),
    };

    debug_assert!(
      matches!(body, Ok(Value::Object(_))),
      "{} record must serialize to a JSON object",
      self.kind()
    );
    let mut body = match body {
      Ok(Value::Object(map)) => map,
      other => {
        tracing::error!(kind = %self.kind(), result = ?other, "record did not serialize to an object");
        serde_json::Map::new()
      }
    };
    body.insert("kind".to_string(), Value::String(self.kind().to_string()));
    Value::Object(body)
  }
}
