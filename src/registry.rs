//! Type registry: turns plain records into validated entities and back.
//!
//! The `kind` field of a plain record selects the variant. Dispatch is an
//! exhaustive match over [`Kind`], so adding a kind without teaching the
//! registry about it does not compile.

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::{RegistryError, ValidationError};
use crate::model::{
  Animal, AnimalRecord, BathService, Customer, CustomerRecord, DayCareService, Entity,
  HotelStayService, HygienicWipeService, Kind, OtherService, ServiceRecord, Task, TaskRecord,
  TransportationService,
};

/// Names of every kind the registry can reify.
pub fn supported_kinds() -> Vec<&'static str> {
  Kind::ALL.iter().map(Kind::as_str).collect()
}

pub fn is_known_kind(name: &str) -> bool {
  name.parse::<Kind>().is_ok()
}

/// Reads the `kind` discriminator of a plain record.
pub fn kind_of(record: &Value) -> Result<Kind, RegistryError> {
  let map = record.as_object().ok_or(RegistryError::NotAnObject)?;
  let found = map
    .get("kind")
    .and_then(Value::as_str)
    .map(str::trim)
    .filter(|k| !k.is_empty());

  match found {
    Some(name) => name.parse().map_err(|_| unknown_kind(Some(name))),
    None => Err(unknown_kind(None)),
  }
}

fn unknown_kind(found: Option<&str>) -> RegistryError {
  RegistryError::UnknownKind {
    found: found.map(String::from),
    supported: supported_kinds().join(", "),
  }
}

/// Builds a validated entity from a plain record.
pub fn reify(record: &Value) -> Result<Entity, RegistryError> {
  let kind = kind_of(record)?;

  let entity = match kind {
    Kind::Customer => Entity::Customer(construct::<CustomerRecord, Customer>(kind, record)?),
    Kind::Animal => Entity::Animal(construct::<AnimalRecord, Animal>(kind, record)?),
    Kind::BathService => {
      Entity::BathService(construct::<ServiceRecord, BathService>(kind, record)?)
    }
    Kind::HygienicWipeService => Entity::HygienicWipeService(construct::<
      ServiceRecord,
      HygienicWipeService,
    >(kind, record)?),
    Kind::DayCareService => {
      Entity::DayCareService(construct::<ServiceRecord, DayCareService>(kind, record)?)
    }
    Kind::HotelStayService => {
      Entity::HotelStayService(construct::<ServiceRecord, HotelStayService>(kind, record)?)
    }
    Kind::OtherService => {
      Entity::OtherService(construct::<ServiceRecord, OtherService>(kind, record)?)
    }
    Kind::TransportationService => Entity::TransportationService(construct::<
      ServiceRecord,
      TransportationService,
    >(kind, record)?),
    Kind::Task => Entity::Task(construct::<TaskRecord, Task>(kind, record)?),
  };

  Ok(entity)
}

fn construct<R, T>(kind: Kind, record: &Value) -> Result<T, RegistryError>
where
  R: DeserializeOwned,
  T: TryFrom<R, Error = ValidationError>,
{
  let raw: R = serde_json::from_value(record.clone()).map_err(|e| RegistryError::Malformed {
    kind,
    detail: e.to_string(),
  })?;
  Ok(T::try_from(raw)?)
}

/// Anything that can be flattened into a plain record.
pub trait IntoRecord {
  fn into_record(self) -> Result<Value, RegistryError>;
}

impl IntoRecord for Entity {
  fn into_record(self) -> Result<Value, RegistryError> {
    Ok(self.to_record())
  }
}

impl IntoRecord for &Entity {
  fn into_record(self) -> Result<Value, RegistryError> {
    Ok(self.to_record())
  }
}

impl IntoRecord for Value {
  fn into_record(self) -> Result<Value, RegistryError> {
    match &self {
      Value::Object(map) if map.contains_key("kind") => Ok(self),
      Value::Object(_) => Err(RegistryError::MissingKind),
      _ => Err(RegistryError::NotAnObject),
    }
  }
}

impl IntoRecord for &Value {
  fn into_record(self) -> Result<Value, RegistryError> {
    self.clone().into_record()
  }
}

/// Returns the plain record for an entity, or the record itself if it
/// already carries a `kind`.
pub fn flatten(source: impl IntoRecord) -> Result<Value, RegistryError> {
  source.into_record()
}
