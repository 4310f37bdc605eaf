//! Animal identity: the partition key of every log.
//!
//! There is no `animals` table. An animal exists because some non-deleted
//! answer references its identity triple.

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// `(owner, animal type, animal number)`, one physical animal in one herd.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AnimalIdentity {
  pub owner_id:       i64,
  pub animal_type_id: i64,
  pub animal_number:  String,
}

impl AnimalIdentity {
  /// Build and validate an identity. Malformed triples are a caller error.
  pub fn new(
    owner_id: i64,
    animal_type_id: i64,
    animal_number: impl Into<String>,
  ) -> Result<Self> {
    let identity = Self {
      owner_id,
      animal_type_id,
      animal_number: animal_number.into(),
    };
    identity.validate()?;
    Ok(identity)
  }

  pub fn validate(&self) -> Result<()> {
    if self.owner_id <= 0 {
      return Err(Error::InvalidIdentity(format!(
        "owner id must be positive, got {}",
        self.owner_id
      )));
    }
    if self.animal_type_id <= 0 {
      return Err(Error::InvalidIdentity(format!(
        "animal type id must be positive, got {}",
        self.animal_type_id
      )));
    }
    if self.animal_number.trim().is_empty() {
      return Err(Error::InvalidIdentity("animal number is blank".into()));
    }
    Ok(())
  }

  /// Another animal in the same herd (same owner and animal type).
  pub fn sibling(&self, animal_number: impl Into<String>) -> Self {
    Self {
      owner_id:       self.owner_id,
      animal_type_id: self.animal_type_id,
      animal_number:  animal_number.into(),
    }
  }

  pub fn herd(&self) -> Herd {
    Herd { owner_id: self.owner_id, animal_type_id: self.animal_type_id }
  }
}

impl std::fmt::Display for AnimalIdentity {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "{}/{}/{}", self.owner_id, self.animal_type_id, self.animal_number)
  }
}

/// All animals of one type belonging to one owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Herd {
  pub owner_id:       i64,
  pub animal_type_id: i64,
}

impl Herd {
  pub fn new(owner_id: i64, animal_type_id: i64) -> Result<Self> {
    if owner_id <= 0 || animal_type_id <= 0 {
      return Err(Error::InvalidIdentity(format!(
        "herd ids must be positive, got owner {owner_id} type {animal_type_id}"
      )));
    }
    Ok(Self { owner_id, animal_type_id })
  }

  pub fn animal(&self, animal_number: impl Into<String>) -> AnimalIdentity {
    AnimalIdentity {
      owner_id:       self.owner_id,
      animal_type_id: self.animal_type_id,
      animal_number:  animal_number.into(),
    }
  }
}
