//! Classification Engine: what kind of animal is this, and how does the herd
//! break down?
//!
//! Classification reads four tags per animal (sex, life stage, pregnancy,
//! lactation). Animals are independent, so a herd is classified with a
//! bounded concurrent fan-out and reduced by summing [`HerdSummary`] values.

use futures::{StreamExt, TryStreamExt, stream};
use serde::{Deserialize, Serialize};

use crate::{
  Error, Result,
  analytics::Analytics,
  animal::{AnimalIdentity, Herd},
  answer::TagAnswers,
  store::HerdStore,
  tag::Tag,
};

/// Herd bucket an animal is counted in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnimalClass {
  /// Adult female; also the default when sex and life stage are unknown.
  Cow,
  Heifer,
  Bull,
}

/// Sex as recorded, if it was.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sex {
  Male,
  Female,
  Unknown,
}

impl Sex {
  fn from_answers(answers: &TagAnswers) -> Self {
    match answers.get(Tag::Sex) {
      Some(a) if a.value.trim().eq_ignore_ascii_case("male") => Self::Male,
      Some(a) if a.value.trim().eq_ignore_ascii_case("female") => Self::Female,
      _ => Self::Unknown,
    }
  }
}

/// Pick the herd bucket from an animal's latest answers.
///
/// A sex answer that is neither "male" nor "female" (blank included) counts
/// as unresolved, same as no answer. Rule order matters:
/// 1. sex unresolved, no life stage → cow;
/// 2. sex unresolved, life stage known → heifer only if the life-stage answer
///    itself is "calf" (a `logic_value` of "calf" alone still counts as cow);
/// 3. male → bull;
/// 4. female with life-stage `logic_value` "calf" → heifer;
/// 5. everything else → cow.
pub fn classify(answers: &TagAnswers) -> AnimalClass {
  let stage = answers.get(Tag::LifeStage);

  match (Sex::from_answers(answers), stage) {
    (Sex::Unknown, Some(stage)) if stage.value.trim().eq_ignore_ascii_case("calf") => {
      AnimalClass::Heifer
    }
    (Sex::Unknown, _) => AnimalClass::Cow,
    (Sex::Male, _) => AnimalClass::Bull,
    (Sex::Female, Some(stage)) if stage.logic_is("calf") => AnimalClass::Heifer,
    (Sex::Female, _) => AnimalClass::Cow,
  }
}

/// One animal's classification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Classification {
  pub animal:    AnimalIdentity,
  pub class:     AnimalClass,
  pub sex:       Sex,
  /// Life stage carries `logic_value = "calf"`.
  pub calf:      bool,
  pub pregnant:  bool,
  pub lactating: bool,
}

impl Classification {
  pub fn from_answers(animal: AnimalIdentity, answers: &TagAnswers) -> Self {
    Self {
      animal,
      class: classify(answers),
      sex: Sex::from_answers(answers),
      calf: answers.get(Tag::LifeStage).is_some_and(|a| a.logic_is("calf")),
      pregnant: answers.is_yes(Tag::Pregnant),
      lactating: answers.is_yes(Tag::Lactating),
    }
  }
}

/// Herd-level counts. Summaries add, so any partition of a herd sums to the
/// same totals.
#[derive(
  Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize,
)]
pub struct HerdSummary {
  pub cows:                 u64,
  pub heifers:              u64,
  pub bulls:                u64,
  pub pregnant:             u64,
  pub non_pregnant:         u64,
  pub pregnant_heifers:     u64,
  pub non_pregnant_heifers: u64,
  pub lactating:            u64,
  pub non_lactating:        u64,
}

impl HerdSummary {
  pub fn total(&self) -> u64 { self.cows + self.heifers + self.bulls }
}

impl From<&Classification> for HerdSummary {
  fn from(c: &Classification) -> Self {
    let mut s = Self::default();
    match c.class {
      AnimalClass::Bull => s.bulls = 1,
      AnimalClass::Heifer => {
        s.heifers = 1;
        if c.pregnant {
          s.pregnant_heifers = 1;
        } else {
          s.non_pregnant_heifers = 1;
        }
      }
      AnimalClass::Cow => {
        s.cows = 1;
        if c.pregnant {
          s.pregnant = 1;
        } else {
          s.non_pregnant = 1;
        }
        if c.lactating {
          s.lactating = 1;
        } else {
          s.non_lactating = 1;
        }
      }
    }
    s
  }
}

impl std::ops::Add for HerdSummary {
  type Output = Self;

  fn add(self, o: Self) -> Self {
    Self {
      cows:                 self.cows + o.cows,
      heifers:              self.heifers + o.heifers,
      bulls:                self.bulls + o.bulls,
      pregnant:             self.pregnant + o.pregnant,
      non_pregnant:         self.non_pregnant + o.non_pregnant,
      pregnant_heifers:     self.pregnant_heifers + o.pregnant_heifers,
      non_pregnant_heifers: self.non_pregnant_heifers + o.non_pregnant_heifers,
      lactating:            self.lactating + o.lactating,
      non_lactating:        self.non_lactating + o.non_lactating,
    }
  }
}

impl std::iter::Sum for HerdSummary {
  fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
    iter.fold(Self::default(), |acc, s| acc + s)
  }
}

impl<S: HerdStore> Analytics<S> {
  /// Classify a single animal.
  pub async fn classify_animal(
    &self,
    animal: &AnimalIdentity,
  ) -> Result<Classification> {
    animal.validate()?;
    self.bounded("classify_animal", self.classify_one(animal)).await
  }

  /// Breakdown of every animal in `herd`.
  pub async fn herd_summary(&self, herd: Herd) -> Result<HerdSummary> {
    self
      .bounded("herd_summary", async {
        let animals = self.members_of(&[herd]).await?;
        self.summarize(&animals).await
      })
      .await
  }

  /// Breakdown of an explicit batch of animal numbers within `herd`.
  pub async fn classify_batch(
    &self,
    herd: Herd,
    animal_numbers: &[String],
  ) -> Result<HerdSummary> {
    let animals: Vec<AnimalIdentity> = animal_numbers
      .iter()
      .map(|n| herd.animal(n.as_str()))
      .collect();
    for animal in &animals {
      animal.validate()?;
    }
    self.bounded("classify_batch", self.summarize(&animals)).await
  }

  /// Combined breakdown across the herds of every owner in a business
  /// outlet.
  pub async fn outlet_summary(
    &self,
    owner_ids: &[i64],
    animal_type_id: i64,
  ) -> Result<HerdSummary> {
    let herds = owner_ids
      .iter()
      .map(|&owner| Herd::new(owner, animal_type_id))
      .collect::<Result<Vec<_>>>()?;
    self
      .bounded("outlet_summary", async {
        let animals = self.members_of(&herds).await?;
        self.summarize(&animals).await
      })
      .await
  }

  // ── Unbounded building blocks ─────────────────────────────────────────

  pub(crate) async fn classify_one(
    &self,
    animal: &AnimalIdentity,
  ) -> Result<Classification> {
    let answers = self.resolve_many(animal, &Tag::CLASSIFICATION).await?;
    Ok(Classification::from_answers(animal.clone(), &answers))
  }

  async fn summarize(&self, animals: &[AnimalIdentity]) -> Result<HerdSummary> {
    let summary = stream::iter(animals.iter().cloned())
      .map(|animal| async move { self.classify_one(&animal).await })
      .buffer_unordered(self.concurrency())
      .try_fold(HerdSummary::default(), |acc, c| async move {
        Ok::<_, Error>(acc + HerdSummary::from(&c))
      })
      .await?;
    tracing::debug!(animals = animals.len(), total = summary.total(), "herd classified");
    Ok(summary)
  }
}
