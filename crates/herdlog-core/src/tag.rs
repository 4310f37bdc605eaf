//! Tags: the semantic layer between questions and derived facts.
//!
//! Every question carries exactly one tag. The engine never asks "what is the
//! answer to question 412"; it asks "what is the latest answer tagged
//! [`Tag::Pregnant`]". Tag ids are fixed reference data shared with the
//! surrounding system, so they are spelled out here once and validated against
//! the registry at startup.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use strum::{EnumIter, IntoEnumIterator, IntoStaticStr};

use crate::{Error, Result};

/// A registered tag with a fixed integer id.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  PartialOrd,
  Ord,
  Hash,
  Serialize,
  Deserialize,
  EnumIter,
  IntoStaticStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
#[repr(i64)]
pub enum Tag {
  /// "male" / "female".
  Sex            = 8,
  /// "yes" / "no".
  Pregnant       = 15,
  /// "yes" / "no".
  Lactating      = 16,
  DateOfAi       = 23,
  HeatDate       = 28,
  SemenCompany   = 34,
  BullNumber     = 35,
  /// Milk yield of the bull's dam, as recorded alongside the AI event.
  BullDamYield   = 36,
  /// Heifer/calf classifier; carries `logic_value = "calf"` for immature
  /// animals.
  LifeStage      = 60,
  DeliveryType   = 65,
  DeliveryDate   = 66,
}

impl Tag {
  /// The integer id stored in the registry.
  pub fn id(self) -> i64 { self as i64 }

  /// Snake-case name, e.g. `"date_of_ai"`.
  pub fn name(self) -> &'static str { self.into() }

  /// Tags grouped into one AI record per write batch.
  pub const AI_EVENT: [Tag; 4] = [
    Tag::DateOfAi,
    Tag::BullNumber,
    Tag::BullDamYield,
    Tag::SemenCompany,
  ];

  /// Tags grouped into one delivery record per write batch.
  pub const DELIVERY_EVENT: [Tag; 2] = [Tag::DeliveryType, Tag::DeliveryDate];

  /// Tags the classification engine resolves for every animal.
  pub const CLASSIFICATION: [Tag; 4] =
    [Tag::Sex, Tag::LifeStage, Tag::Pregnant, Tag::Lactating];
}

impl TryFrom<i64> for Tag {
  type Error = Error;

  fn try_from(id: i64) -> Result<Self> {
    Tag::iter()
      .find(|t| t.id() == id)
      .ok_or(Error::UnregisteredTag(id))
  }
}

impl std::fmt::Display for Tag {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "{}({})", self.name(), self.id())
  }
}

/// Proof that the backing registry knows every [`Tag`] the engine uses.
///
/// Obtained once at startup; ids in the registry that the engine does not
/// know about are ignored.
#[derive(Debug, Clone)]
pub struct TagRegistry {
  known: BTreeSet<i64>,
}

impl TagRegistry {
  /// Check `registered` (tag ids read from the store) against [`Tag`].
  pub fn verify(registered: impl IntoIterator<Item = i64>) -> Result<Self> {
    let known: BTreeSet<i64> = registered.into_iter().collect();
    let missing: Vec<Tag> =
      Tag::iter().filter(|t| !known.contains(&t.id())).collect();
    if !missing.is_empty() {
      return Err(Error::MissingTags(missing));
    }
    Ok(Self { known })
  }

  /// Resolve a raw id coming from the outside world.
  pub fn resolve(&self, id: i64) -> Result<Tag> {
    if !self.known.contains(&id) {
      return Err(Error::UnregisteredTag(id));
    }
    Tag::try_from(id)
  }
}
