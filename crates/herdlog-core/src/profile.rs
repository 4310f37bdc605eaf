//! The full animal profile: every derivation for one animal, read
//! concurrently under a single deadline.

use serde::{Deserialize, Serialize};

use crate::{
  Result,
  analytics::Analytics,
  animal::AnimalIdentity,
  breeding::{BreedingHistory, Pedigree},
  classify::Classification,
  lactation::LactationSummary,
  store::HerdStore,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnimalProfile {
  pub animal:         AnimalIdentity,
  pub classification: Classification,
  pub lactation:      LactationSummary,
  /// All-time milk, both shifts.
  pub total_milk:     f64,
  pub pedigree:       Pedigree,
  pub breeding:       BreedingHistory,
}

impl<S: HerdStore> Analytics<S> {
  /// Build the whole profile for `animal`. Any failing sub-derivation fails
  /// the profile.
  pub async fn animal_profile(&self, animal: &AnimalIdentity) -> Result<AnimalProfile> {
    animal.validate()?;
    self
      .bounded("animal_profile", async {
        let (classification, lactation, total_milk, pedigree, breeding) = futures::try_join!(
          self.classify_one(animal),
          self.summarize_lactation(animal),
          self.milk_all_time(animal),
          self.pedigree_of(animal),
          self.breeding_of(animal),
        )?;
        tracing::debug!(%animal, class = ?classification.class, "profile built");
        Ok(AnimalProfile {
          animal: animal.clone(),
          classification,
          lactation,
          total_milk,
          pedigree,
          breeding,
        })
      })
      .await
  }
}

#[cfg(test)]
mod tests {
  use std::{sync::Arc, time::Duration};

  use chrono::{NaiveDate, TimeZone, Utc};

  use super::*;
  use crate::{
    AnalyticsConfig, Error,
    animal::Herd,
    classify::AnimalClass,
    memory::MemoryStore,
    records::{LactationSample, MilkRecord, MotherCalfLink},
    tag::Tag,
  };

  fn herd() -> Herd { Herd::new(2, 1).unwrap() }

  fn day(m: u32, d: u32) -> NaiveDate { NaiveDate::from_ymd_opt(2024, m, d).unwrap() }

  fn seeded() -> MemoryStore {
    let store = MemoryStore::with_default_questions();
    let cow = herd().animal("B12");
    let at = Utc.with_ymd_and_hms(2024, 1, 2, 8, 0, 0).unwrap();
    store.answer(&cow, Tag::Sex, "female", at).unwrap();
    store.answer(&cow, Tag::Lactating, "yes", at).unwrap();
    store.record_sample(LactationSample {
      owner_id:         2,
      animal_type_id:   1,
      animal_number:    "B12".into(),
      created_at:       at,
      lactating_status: "yes".into(),
      pregnancy_status: "no".into(),
    });
    for d in 2..=4 {
      store.record_milk(MilkRecord {
        owner_id:       2,
        animal_type_id: 1,
        animal_number:  "B12".into(),
        record_date:    day(1, d),
        morning_qty:    5.0,
        evening_qty:    4.5,
      });
    }
    store.record_birth(MotherCalfLink {
      owner_id:             2,
      animal_type_id:       1,
      delivery_date:        day(1, 1),
      mother_animal_number: "M1".into(),
      calf_animal_number:   "B12".into(),
    });
    store
  }

  #[tokio::test]
  async fn profile_combines_every_derivation() {
    let engine = Analytics::with_config(
      Arc::new(seeded()),
      AnalyticsConfig { today: Some(day(1, 4)), ..Default::default() },
    );
    let p = engine.animal_profile(&herd().animal("B12")).await.unwrap();

    assert_eq!(p.classification.class, AnimalClass::Cow);
    assert!(p.classification.lactating);
    assert_eq!(p.lactation.lactation_count, 1);
    assert_eq!(p.lactation.current.days_in_milk, 3);
    assert_eq!(p.lactation.current.yield_total, 28.5);
    assert_eq!(p.total_milk, 28.5);
    assert_eq!(p.pedigree.dam_number, "M1");
    assert!(p.pedigree.sire_number.is_empty());
    assert!(p.breeding.calves.is_empty());
  }

  #[tokio::test]
  async fn profile_of_unknown_animal_is_defaults() {
    let engine = Analytics::new(Arc::new(seeded()));
    let p = engine.animal_profile(&herd().animal("NOBODY")).await.unwrap();
    assert_eq!(p.classification.class, AnimalClass::Cow);
    assert_eq!(p.lactation.lactation_count, 0);
    assert_eq!(p.total_milk, 0.0);
    assert!(!p.pedigree.is_known());
  }

  #[tokio::test]
  async fn profile_fails_whole_on_store_error() {
    let store = seeded();
    store.set_unavailable(true);
    let engine = Analytics::new(Arc::new(store));
    let err = engine.animal_profile(&herd().animal("B12")).await.unwrap_err();
    assert!(matches!(err, Error::Store(_)));
  }

  #[tokio::test]
  async fn profile_respects_deadline() {
    let store = seeded();
    store.set_latency(Duration::from_millis(400));
    let engine = Analytics::with_config(
      Arc::new(store),
      AnalyticsConfig {
        deadline: Some(Duration::from_millis(25)),
        ..Default::default()
      },
    );
    let err = engine.animal_profile(&herd().animal("B12")).await.unwrap_err();
    assert!(matches!(err, Error::DeadlineExceeded(_)));
  }

  #[tokio::test]
  async fn invalid_identity_fails_fast() {
    let engine = Analytics::new(Arc::new(seeded()));
    let bad = AnimalIdentity { owner_id: 2, animal_type_id: 1, animal_number: " ".into() };
    let err = engine.animal_profile(&bad).await.unwrap_err();
    assert!(err.is_contract_violation());
  }
}
