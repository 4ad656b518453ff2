use serde::{Deserialize, Serialize};

use super::fields::{id_list, nullable, optional_date, optional_id, required_text, CalendarDate};
use super::Kind;
use crate::error::ValidationError;

/// Plain stored form of an [`Animal`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AnimalRecord {
  pub id: Option<String>,
  #[serde(deserialize_with = "nullable")]
  pub name: String,
  #[serde(deserialize_with = "nullable")]
  pub breed: String,
  #[serde(deserialize_with = "nullable")]
  pub birth_date: String,
  #[serde(deserialize_with = "nullable")]
  pub owner_id: String,
  #[serde(deserialize_with = "nullable")]
  pub diet_notes: String,
  #[serde(deserialize_with = "nullable")]
  pub temperament_notes: String,
  #[serde(deserialize_with = "nullable")]
  pub vaccine_notes: String,
  #[serde(deserialize_with = "nullable")]
  pub health_notes: String,
  #[serde(deserialize_with = "nullable")]
  pub additional_notes: String,
  #[serde(deserialize_with = "nullable")]
  pub service_ids: Vec<String>,
}

/// A dog under the care of the hotel. The owner link is structural only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Animal {
  pub(crate) id: Option<String>,
  pub(crate) name: String,
  pub(crate) breed: String,
  pub(crate) birth_date: Option<CalendarDate>,
  pub(crate) owner_id: String,
  pub(crate) diet_notes: String,
  pub(crate) temperament_notes: String,
  pub(crate) vaccine_notes: String,
  pub(crate) health_notes: String,
  pub(crate) additional_notes: String,
  pub(crate) service_ids: Vec<String>,
}

impl Animal {
  pub fn id(&self) -> Option<&str> {
    self.id.as_deref()
  }

  pub fn name(&self) -> &str {
    &self.name
  }

  pub fn breed(&self) -> &str {
    &self.breed
  }

  pub fn owner_id(&self) -> &str {
    &self.owner_id
  }

  pub fn birth_date(&self) -> Option<CalendarDate> {
    self.birth_date
  }
}

impl TryFrom<AnimalRecord> for Animal {
  type Error = ValidationError;

  fn try_from(record: AnimalRecord) -> Result<Self, Self::Error> {
    const KIND: Kind = Kind::Animal;

    Ok(Self {
      id: optional_id(KIND, record.id)?,
      name: required_text(KIND, "name", record.name)?,
      breed: record.breed,
      birth_date: optional_date(KIND, "birthDate", &record.birth_date)?,
      owner_id: required_text(KIND, "ownerId", record.owner_id)?,
      diet_notes: record.diet_notes,
      temperament_notes: record.temperament_notes,
      vaccine_notes: record.vaccine_notes,
      health_notes: record.health_notes,
      additional_notes: record.additional_notes,
      service_ids: id_list(KIND, "serviceIds", record.service_ids)?,
    })
  }
}

impl From<&Animal> for AnimalRecord {
  fn from(animal: &Animal) -> Self {
    Self {
      id: animal.id.clone(),
      name: animal.name.clone(),
      breed: animal.breed.clone(),
      birth_date: animal
        .birth_date
        .map(|d| d.to_string())
        .unwrap_or_default(),
      owner_id: animal.owner_id.clone(),
      diet_notes: animal.diet_notes.clone(),
      temperament_notes: animal.temperament_notes.clone(),
      vaccine_notes: animal.vaccine_notes.clone(),
      health_notes: animal.health_notes.clone(),
      additional_notes: animal.additional_notes.clone(),
      service_ids: animal.service_ids.clone(),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn record() -> AnimalRecord {
    AnimalRecord {
      name: "Thor".to_string(),
      breed: "Golden Retriever".to_string(),
      birth_date: "12-03-2020".to_string(),
      owner_id: "cust_1".to_string(),
      diet_notes: "no chicken".to_string(),
      ..Default::default()
    }
  }

  #[test]
  fn test_valid_animal_round_trips() {
    let animal = Animal::try_from(record()).unwrap();
    assert_eq!(animal.birth_date().unwrap().to_string(), "12-03-2020");
    assert_eq!(AnimalRecord::from(&animal), record());
  }

  #[test]
  fn test_birth_date_is_optional() {
    let animal = Animal::try_from(AnimalRecord {
      birth_date: String::new(),
      ..record()
    })
    .unwrap();
    assert_eq!(animal.birth_date(), None);
    assert_eq!(AnimalRecord::from(&animal).birth_date, "");
  }

  #[test]
  fn test_bad_birth_date_is_rejected() {
    let err = Animal::try_from(AnimalRecord {
      birth_date: "2020-03-12".to_string(),
      ..record()
    })
    .unwrap_err();
    assert_eq!(err.to_string(), "Animal.birthDate: use DD-MM-YYYY");
  }

  #[test]
  fn test_owner_is_required() {
    let err = Animal::try_from(AnimalRecord {
      owner_id: String::new(),
      ..record()
    })
    .unwrap_err();
    assert_eq!(err.field, "ownerId");
  }
}
