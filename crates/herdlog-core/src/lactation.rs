//! Interval Reconstructor: lactation episodes from point samples.
//!
//! Lactation status is only sampled when something happens (a delivery, a
//! drying, a pregnancy check), so the signal is irregular. Episodes are
//! rebuilt by walking the samples in time order with one sample of
//! look-ahead.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::{
  Error, Result,
  analytics::Analytics,
  animal::AnimalIdentity,
  milk::{CurrentLactation, DateRange},
  records::LactationSample,
  store::HerdStore,
};

/// A contiguous lactating episode. `start == end` is a legitimate one-day
/// episode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LactationInterval {
  pub start:     NaiveDate,
  /// Date of the last lactating sample in the episode.
  pub end:       NaiveDate,
  /// Date of the non-lactating sample that ended the episode. `None` while
  /// the episode runs to the end of the samples.
  pub closed_on: Option<NaiveDate>,
}

impl LactationInterval {
  fn open(day: NaiveDate) -> Self { Self { start: day, end: day, closed_on: None } }

  /// True when a later non-lactating sample ended this episode.
  pub fn is_closed(&self) -> bool { self.closed_on.is_some() }

  /// Inclusive day count from `start` to `end`.
  pub fn days(&self) -> i64 { (self.end - self.start).num_days() + 1 }

  /// The full span of a closed episode, through the day it was dried off.
  pub fn through_close(&self) -> DateRange {
    DateRange { start: self.start, end: self.closed_on.unwrap_or(self.end) }
  }
}

/// Rebuild lactation episodes from `samples`, which must already be sorted by
/// `created_at` ascending.
///
/// A "yes" sample opens an episode or extends its end. A "yes" sample whose
/// successor is missing or not "yes" ends the episode. O(n).
pub fn reconstruct(samples: &[LactationSample]) -> Vec<LactationInterval> {
  let mut episodes = Vec::new();
  let mut open: Option<LactationInterval> = None;
  let mut walk = samples.iter().peekable();

  while let Some(current) = walk.next() {
    let next = walk.peek();

    if current.is_lactating() {
      let day = current.day();
      match open.as_mut() {
        Some(episode) => episode.end = day,
        None => open = Some(LactationInterval::open(day)),
      }
      if next.is_none_or(|n| !n.is_lactating())
        && let Some(mut episode) = open.take()
      {
        episode.closed_on = next.map(|n| n.day());
        episodes.push(episode);
      }
    } else if let Some(mut episode) = open.take() {
      episode.closed_on = Some(current.day());
      episodes.push(episode);
    }
  }

  episodes
}

/// Everything derivable from one animal's lactation samples.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LactationSummary {
  pub intervals:            Vec<LactationInterval>,
  /// Number of episodes, ongoing one included.
  pub lactation_count:      usize,
  pub current:              CurrentLactation,
  pub last_lactation_yield: f64,
  /// Pregnancy status carried by the most recent sample.
  pub pregnant:             bool,
}

impl<S: HerdStore> Analytics<S> {
  /// Lactation episodes for `animal`.
  pub async fn lactation_intervals(
    &self,
    animal: &AnimalIdentity,
  ) -> Result<Vec<LactationInterval>> {
    animal.validate()?;
    self
      .bounded("lactation_intervals", async {
        Ok(reconstruct(&self.samples(animal).await?))
      })
      .await
  }

  /// Episodes plus current and last lactation yields.
  pub async fn lactation_summary(
    &self,
    animal: &AnimalIdentity,
  ) -> Result<LactationSummary> {
    animal.validate()?;
    self
      .bounded("lactation_summary", self.summarize_lactation(animal))
      .await
  }

  pub(crate) async fn summarize_lactation(
    &self,
    animal: &AnimalIdentity,
  ) -> Result<LactationSummary> {
    let samples = self.samples(animal).await?;
    let intervals = reconstruct(&samples);
    let (current, last_lactation_yield) = futures::try_join!(
      self.current_lactation_of(animal, &samples),
      self.last_lactation_of(animal, &samples, &intervals),
    )?;
    tracing::debug!(
      %animal,
      samples = samples.len(),
      episodes = intervals.len(),
      "lactation summarised"
    );
    Ok(LactationSummary {
      lactation_count: intervals.len(),
      pregnant: samples.last().is_some_and(LactationSample::is_pregnant),
      intervals,
      current,
      last_lactation_yield,
    })
  }

  /// Samples in time order. The store already sorts them; the stable sort
  /// here keeps the reconstructor's precondition local.
  pub(crate) async fn samples(
    &self,
    animal: &AnimalIdentity,
  ) -> Result<Vec<LactationSample>> {
    let mut samples = self
      .store
      .lactation_samples(animal)
      .await
      .map_err(Error::store)?;
    samples.sort_by_key(|s| s.created_at);
    Ok(samples)
  }
}
