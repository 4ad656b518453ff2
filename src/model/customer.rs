use serde::{Deserialize, Serialize};

use super::fields::{credit_count, id_list, nullable, optional_id, required_text};
use super::Kind;
use crate::error::ValidationError;

/// Plain stored form of a [`Customer`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CustomerRecord {
  pub id: Option<String>,
  #[serde(deserialize_with = "nullable")]
  pub name: String,
  #[serde(deserialize_with = "nullable")]
  pub whatsapp: String,
  #[serde(deserialize_with = "nullable")]
  pub email: String,
  #[serde(deserialize_with = "nullable")]
  pub address: String,
  #[serde(deserialize_with = "nullable")]
  pub dog_ids: Vec<String>,
  #[serde(deserialize_with = "nullable")]
  pub service_ids: Vec<String>,
  #[serde(deserialize_with = "nullable")]
  pub daycare_credits: i64,
  #[serde(deserialize_with = "nullable")]
  pub transport_credits: i64,
  #[serde(deserialize_with = "nullable")]
  pub bath_credits: i64,
}

/// A pet owner and the prepaid credits they hold.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Customer {
  pub(crate) id: Option<String>,
  pub(crate) name: String,
  pub(crate) whatsapp: String,
  pub(crate) email: String,
  pub(crate) address: String,
  pub(crate) dog_ids: Vec<String>,
  pub(crate) service_ids: Vec<String>,
  pub(crate) daycare_credits: u32,
  pub(crate) transport_credits: u32,
  pub(crate) bath_credits: u32,
}

impl Customer {
  pub fn id(&self) -> Option<&str> {
    self.id.as_deref()
  }

  pub fn name(&self) -> &str {
    &self.name
  }

  pub fn whatsapp(&self) -> &str {
    &self.whatsapp
  }

  pub fn email(&self) -> &str {
    &self.email
  }

  pub fn dog_ids(&self) -> &[String] {
    &self.dog_ids
  }

  /// Credits as (daycare, transport, bath).
  pub fn credits(&self) -> (u32, u32, u32) {
    (self.daycare_credits, self.transport_credits, self.bath_credits)
  }
}

impl TryFrom<CustomerRecord> for Customer {
  type Error = ValidationError;

  fn try_from(record: CustomerRecord) -> Result<Self, Self::Error> {
    const KIND: Kind = Kind::Customer;

    Ok(Self {
      id: optional_id(KIND, record.id)?,
      name: required_text(KIND, "name", record.name)?,
      whatsapp: record.whatsapp,
      email: record.email,
      address: record.address,
      dog_ids: id_list(KIND, "dogIds", record.dog_ids)?,
      service_ids: id_list(KIND, "serviceIds", record.service_ids)?,
      daycare_credits: credit_count(KIND, "daycareCredits", record.daycare_credits)?,
      transport_credits: credit_count(KIND, "transportCredits", record.transport_credits)?,
      bath_credits: credit_count(KIND, "bathCredits", record.bath_credits)?,
    })
  }
}

impl From<&Customer> for CustomerRecord {
  fn from(customer: &Customer) -> Self {
    Self {
      id: customer.id.clone(),
      name: customer.name.clone(),
      whatsapp: customer.whatsapp.clone(),
      email: customer.email.clone(),
      address: customer.address.clone(),
      dog_ids: customer.dog_ids.clone(),
      service_ids: customer.service_ids.clone(),
      daycare_credits: customer.daycare_credits.into(),
      transport_credits: customer.transport_credits.into(),
      bath_credits: customer.bath_credits.into(),
    }
  }
}
