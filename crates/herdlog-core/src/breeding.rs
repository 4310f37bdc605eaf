//! Breeding and pedigree derivation.
//!
//! Breeding events are written as batches of tagged answers sharing one
//! `created_at`, so a history is rebuilt by grouping answers on their exact
//! timestamp. Pedigree walks one generation up through the birth links, then
//! reads the dam's most recent AI batch for the sire.
//!
//! A missing link at any hop is a normal outcome and leaves the dependent
//! fields empty.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::{
  Error, Result,
  analytics::Analytics,
  animal::AnimalIdentity,
  answer::{AnswerEvent, TagAnswers},
  records::MotherCalfLink,
  store::HerdStore,
  tag::Tag,
};

// ─── Records ─────────────────────────────────────────────────────────────────

/// One artificial insemination, assembled from a single write batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AiRecord {
  pub recorded_at:    DateTime<Utc>,
  pub date_of_ai:     String,
  pub bull_number:    String,
  pub semen_company:  String,
  /// Yield of the bull's dam as recorded with the AI.
  pub bull_dam_yield: String,
}

/// One delivery, assembled from a single write batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryRecord {
  pub recorded_at:   DateTime<Utc>,
  pub delivery_type: String,
  pub delivery_date: String,
  /// The calf whose birth link carries the same delivery date.
  pub calf_number:   Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeatRecord {
  pub recorded_at: DateTime<Utc>,
  pub value:       String,
}

/// Every breeding event on record for one animal, newest first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BreedingHistory {
  pub ai:         Vec<AiRecord>,
  pub deliveries: Vec<DeliveryRecord>,
  pub heats:      Vec<HeatRecord>,
  /// Birth links where this animal is the mother.
  pub calves:     Vec<MotherCalfLink>,
}

/// One generation of ancestry. Unknown fields are empty / zero.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Pedigree {
  pub dam_number:         String,
  /// All-time milk of the dam, both shifts.
  pub dam_total_yield:    f64,
  /// Date of the dam's most recent AI.
  pub dam_ai_date:        String,
  pub sire_number:        String,
  pub sire_semen_company: String,
  /// Yield of the sire's dam as recorded with that AI.
  pub sire_dam_yield:     String,
}

impl Pedigree {
  pub fn is_known(&self) -> bool { !self.dam_number.is_empty() }
}

/// Group answers (newest first, as the store returns them) by exact
/// timestamp. Groups come back newest first; within a group the last
/// inserted answer per tag wins.
fn batches(answers: Vec<AnswerEvent>) -> Vec<(DateTime<Utc>, TagAnswers)> {
  let mut grouped: BTreeMap<DateTime<Utc>, Vec<AnswerEvent>> = BTreeMap::new();
  for answer in answers {
    grouped.entry(answer.created_at).or_default().push(answer);
  }
  grouped
    .into_iter()
    .rev()
    .map(|(at, group)| (at, group.into_iter().rev().collect()))
    .collect()
}

fn calf_born_on(links: &[MotherCalfLink], day: Option<NaiveDate>) -> Option<String> {
  let day = day?;
  links
    .iter()
    .find(|l| l.delivery_date == day)
    .map(|l| l.calf_animal_number.clone())
}

// ─── Engine operations ───────────────────────────────────────────────────────

impl<S: HerdStore> Analytics<S> {
  pub async fn ai_history(&self, animal: &AnimalIdentity) -> Result<Vec<AiRecord>> {
    animal.validate()?;
    self.bounded("ai_history", self.ai_records(animal)).await
  }

  pub async fn delivery_history(
    &self,
    animal: &AnimalIdentity,
  ) -> Result<Vec<DeliveryRecord>> {
    animal.validate()?;
    self
      .bounded("delivery_history", async {
        let (answers, links) = futures::try_join!(
          self.history(animal, &Tag::DELIVERY_EVENT),
          self.calves_of(animal),
        )?;
        Ok(delivery_records(answers, &links))
      })
      .await
  }

  pub async fn heat_history(&self, animal: &AnimalIdentity) -> Result<Vec<HeatRecord>> {
    animal.validate()?;
    self.bounded("heat_history", self.heat_records(animal)).await
  }

  /// Birth links where `animal` is the mother.
  pub async fn calves(&self, animal: &AnimalIdentity) -> Result<Vec<MotherCalfLink>> {
    animal.validate()?;
    self.bounded("calves", self.calves_of(animal)).await
  }

  /// AI, delivery and heat history plus calves, read concurrently.
  pub async fn breeding_history(
    &self,
    animal: &AnimalIdentity,
  ) -> Result<BreedingHistory> {
    animal.validate()?;
    self
      .bounded("breeding_history", self.breeding_of(animal))
      .await
  }

  pub async fn pedigree(&self, animal: &AnimalIdentity) -> Result<Pedigree> {
    animal.validate()?;
    self.bounded("pedigree", self.pedigree_of(animal)).await
  }

  // ── Unbounded building blocks ─────────────────────────────────────────

  pub(crate) async fn breeding_of(
    &self,
    animal: &AnimalIdentity,
  ) -> Result<BreedingHistory> {
    let (ai, delivery_answers, heats, calves) = futures::try_join!(
      self.ai_records(animal),
      self.history(animal, &Tag::DELIVERY_EVENT),
      self.heat_records(animal),
      self.calves_of(animal),
    )?;
    Ok(BreedingHistory {
      ai,
      deliveries: delivery_records(delivery_answers, &calves),
      heats,
      calves,
    })
  }

  async fn ai_records(&self, animal: &AnimalIdentity) -> Result<Vec<AiRecord>> {
    let answers = self.history(animal, &Tag::AI_EVENT).await?;
    Ok(
      batches(answers)
        .into_iter()
        .map(|(recorded_at, batch)| AiRecord {
          recorded_at,
          date_of_ai: batch.value(Tag::DateOfAi).to_owned(),
          bull_number: batch.value(Tag::BullNumber).to_owned(),
          semen_company: batch.value(Tag::SemenCompany).to_owned(),
          bull_dam_yield: batch.value(Tag::BullDamYield).to_owned(),
        })
        .collect(),
    )
  }

  async fn heat_records(&self, animal: &AnimalIdentity) -> Result<Vec<HeatRecord>> {
    let answers = self.history(animal, &[Tag::HeatDate]).await?;
    Ok(
      answers
        .into_iter()
        .map(|a| HeatRecord { recorded_at: a.created_at, value: a.value })
        .collect(),
    )
  }

  async fn calves_of(&self, animal: &AnimalIdentity) -> Result<Vec<MotherCalfLink>> {
    self.store.calf_links(animal).await.map_err(Error::store)
  }

  /// calf → dam → dam's latest AI → sire attributes from the same batch.
  pub(crate) async fn pedigree_of(&self, animal: &AnimalIdentity) -> Result<Pedigree> {
    let link = self.store.mother_link(animal).await.map_err(Error::store)?;
    let Some(link) = link else {
      tracing::debug!(%animal, "no birth link; pedigree unknown");
      return Ok(Pedigree::default());
    };
    let dam = animal.sibling(link.mother_animal_number);

    let (dam_total_yield, ai) = futures::try_join!(
      self.milk_all_time(&dam),
      self.resolve(&dam, Tag::DateOfAi),
    )?;
    let mut pedigree = Pedigree {
      dam_number: dam.animal_number.clone(),
      dam_total_yield,
      ..Pedigree::default()
    };
    let Some(ai) = ai else {
      return Ok(pedigree);
    };

    let (bull, company, bull_dam_yield) = futures::try_join!(
      self.resolve_at(&dam, Tag::BullNumber, ai.created_at),
      self.resolve_at(&dam, Tag::SemenCompany, ai.created_at),
      self.resolve_at(&dam, Tag::BullDamYield, ai.created_at),
    )?;
    pedigree.dam_ai_date = ai.value;
    pedigree.sire_number = bull.map(|a| a.value).unwrap_or_default();
    pedigree.sire_semen_company = company.map(|a| a.value).unwrap_or_default();
    pedigree.sire_dam_yield = bull_dam_yield.map(|a| a.value).unwrap_or_default();
    Ok(pedigree)
  }
}

fn delivery_records(
  answers: Vec<AnswerEvent>,
  links: &[MotherCalfLink],
) -> Vec<DeliveryRecord> {
  batches(answers)
    .into_iter()
    .map(|(recorded_at, batch)| {
      let delivered_on = batch.get(Tag::DeliveryDate).and_then(AnswerEvent::as_day);
      DeliveryRecord {
        recorded_at,
        delivery_type: batch.value(Tag::DeliveryType).to_owned(),
        delivery_date: batch.value(Tag::DeliveryDate).to_owned(),
        calf_number: calf_born_on(links, delivered_on),
      }
    })
    .collect()
}
