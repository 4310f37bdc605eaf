//! Yield Aggregator: milk sums over date ranges and lactation episodes.
//!
//! Ranges are handed to the store as inclusive bounds; the store sums both
//! shifts for records dated within them. Sums keep full precision;
//! [`round2`] is for presentation only.

use chrono::{Datelike as _, NaiveDate};
use futures::{StreamExt, TryStreamExt, stream};
use serde::{Deserialize, Serialize};

use crate::{
  Error, Result,
  analytics::Analytics,
  animal::{AnimalIdentity, Herd},
  answer::parse_day,
  lactation::LactationInterval,
  records::{LactationSample, MilkSum},
  store::HerdStore,
};

// ─── DateRange ───────────────────────────────────────────────────────────────

/// Longest span, in days, a request may ask to aggregate over.
pub const MAX_RANGE_DAYS: i64 = 36_600;

/// An inclusive range of calendar days.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
  pub start: NaiveDate,
  pub end:   NaiveDate,
}

impl DateRange {
  /// `None` when `start` is after `end`.
  pub fn new(start: NaiveDate, end: NaiveDate) -> Option<Self> {
    (start <= end).then_some(Self { start, end })
  }

  /// Build a range from loosely-typed bounds. A missing or unparseable bound
  /// gives `None`, which aggregates to zero.
  pub fn parse(start: Option<&str>, end: Option<&str>) -> Option<Self> {
    Self::new(parse_day(start?)?, parse_day(end?)?)
  }

  /// Like [`parse`](Self::parse), but for untrusted input. A bound that is
  /// present and not a four-digit-year date, or a range longer than
  /// [`MAX_RANGE_DAYS`], is an [`Error::InvalidDate`]. Missing bounds or an
  /// inverted range still give `Ok(None)`.
  pub fn parse_strict(start: Option<&str>, end: Option<&str>) -> Result<Option<Self>> {
    let day = |raw: &str| {
      parse_day(raw)
        .filter(|d| (1..=9999).contains(&d.year()))
        .ok_or_else(|| Error::InvalidDate(raw.to_owned()))
    };
    let start = start.map(day).transpose()?;
    let end = end.map(day).transpose()?;
    let Some(range) = start.zip(end).and_then(|(s, e)| Self::new(s, e)) else {
      return Ok(None);
    };
    if range.len() > MAX_RANGE_DAYS {
      return Err(Error::InvalidDate(format!(
        "{}..{} spans {} days, more than {MAX_RANGE_DAYS}",
        range.start,
        range.end,
        range.len()
      )));
    }
    Ok(Some(range))
  }

  /// Inclusive day count.
  pub fn len(&self) -> i64 { (self.end - self.start).num_days() + 1 }

  pub fn contains(&self, day: NaiveDate) -> bool { self.start <= day && day <= self.end }

  /// Every day from `start` to `end`, inclusive.
  pub fn days(&self) -> impl Iterator<Item = NaiveDate> {
    let end = self.end;
    self.start.iter_days().take_while(move |d| *d <= end)
  }
}

impl From<&LactationInterval> for DateRange {
  fn from(interval: &LactationInterval) -> Self {
    Self { start: interval.start, end: interval.end }
  }
}

/// Round to 2 decimal places for display.
pub fn round2(value: f64) -> f64 { (value * 100.0).round() / 100.0 }

// ─── Lactation yields ────────────────────────────────────────────────────────

/// The ongoing lactation, if the latest sample says the animal is milking.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CurrentLactation {
  pub lactating:    bool,
  /// Date of the latest sample, which opens the ongoing episode.
  pub since:        Option<NaiveDate>,
  pub days_in_milk: i64,
  pub yield_total:  f64,
}

impl<S: HerdStore> Analytics<S> {
  /// Milk produced by `animal` over `range`. `None` sums to zero.
  pub async fn sum_milk(
    &self,
    animal: &AnimalIdentity,
    range: Option<DateRange>,
  ) -> Result<f64> {
    animal.validate()?;
    self.bounded("sum_milk", self.milk_over(animal, range)).await
  }

  /// [`sum_milk`](Self::sum_milk) with raw string bounds as they arrive from
  /// requests and answers.
  pub async fn sum_milk_between(
    &self,
    animal: &AnimalIdentity,
    start: Option<&str>,
    end: Option<&str>,
  ) -> Result<f64> {
    self.sum_milk(animal, DateRange::parse(start, end)).await
  }

  /// Milk produced over a reconstructed episode, `start` through `end`.
  pub async fn sum_milk_interval(
    &self,
    animal: &AnimalIdentity,
    interval: &LactationInterval,
  ) -> Result<f64> {
    self.sum_milk(animal, Some(DateRange::from(interval))).await
  }

  /// All milk ever recorded for `animal`.
  pub async fn total_milk(&self, animal: &AnimalIdentity) -> Result<f64> {
    animal.validate()?;
    self.bounded("total_milk", self.milk_all_time(animal)).await
  }

  /// Milk produced by every member of `herd` over `range`.
  pub async fn herd_milk(&self, herd: Herd, range: Option<DateRange>) -> Result<f64> {
    self
      .bounded("herd_milk", async {
        let animals = self.members_of(&[herd]).await?;
        self.milk_across(&animals, range).await
      })
      .await
  }

  /// Milk produced across the herds of every owner in a business outlet.
  pub async fn outlet_milk(
    &self,
    owner_ids: &[i64],
    animal_type_id: i64,
    range: Option<DateRange>,
  ) -> Result<f64> {
    let herds = owner_ids
      .iter()
      .map(|&owner| Herd::new(owner, animal_type_id))
      .collect::<Result<Vec<_>>>()?;
    self
      .bounded("outlet_milk", async {
        let animals = self.members_of(&herds).await?;
        self.milk_across(&animals, range).await
      })
      .await
  }

  // ── Unbounded building blocks ─────────────────────────────────────────

  pub(crate) async fn milk_over(
    &self,
    animal: &AnimalIdentity,
    range: Option<DateRange>,
  ) -> Result<f64> {
    let Some(range) = range else {
      return Ok(0.0);
    };
    let sum = self
      .store
      .milk_sum(animal, Some(range))
      .await
      .map_err(Error::store)?;
    Ok(sum.total().max(0.0))
  }

  pub(crate) async fn milk_all_time(&self, animal: &AnimalIdentity) -> Result<f64> {
    let sum = self.store.milk_sum(animal, None).await.map_err(Error::store)?;
    Ok(sum.total().max(0.0))
  }

  async fn milk_across(
    &self,
    animals: &[AnimalIdentity],
    range: Option<DateRange>,
  ) -> Result<f64> {
    let Some(range) = range else {
      return Ok(0.0);
    };
    let total: MilkSum = stream::iter(animals.iter().cloned())
      .map(|animal| async move {
        self
          .store
          .milk_sum(&animal, Some(range))
          .await
          .map_err(Error::store)
      })
      .buffer_unordered(self.concurrency())
      .try_fold(MilkSum::default(), |acc, sum| async move { Ok(acc + sum) })
      .await?;
    Ok(total.total().max(0.0))
  }

  /// The ongoing episode runs from the latest sample to today, and only if
  /// that sample is lactating.
  pub(crate) async fn current_lactation_of(
    &self,
    animal: &AnimalIdentity,
    samples: &[LactationSample],
  ) -> Result<CurrentLactation> {
    let Some(latest) = samples.last().filter(|s| s.is_lactating()) else {
      return Ok(CurrentLactation::default());
    };
    let since = latest.day();
    let range = DateRange::new(since, self.today());
    Ok(CurrentLactation {
      lactating:    true,
      since:        Some(since),
      days_in_milk: range.map_or(0, |r| r.len()),
      yield_total:  self.milk_over(animal, range).await?,
    })
  }

  /// Yield of the most recent episode that a drying sample closed, through
  /// the drying day.
  pub(crate) async fn last_lactation_of(
    &self,
    animal: &AnimalIdentity,
    samples: &[LactationSample],
    intervals: &[LactationInterval],
  ) -> Result<f64> {
    if samples.len() < 2 {
      return Ok(0.0);
    }
    let Some(last) = intervals.iter().rev().find(|i| i.is_closed()) else {
      return Ok(0.0);
    };
    self.milk_over(animal, Some(last.through_close())).await
  }
}

#[cfg(test)]
mod tests {
  use std::sync::Arc;

  use chrono::{TimeZone, Utc};

  use super::*;
  use crate::{
    analytics::AnalyticsConfig,
    lactation::reconstruct,
    memory::MemoryStore,
    records::MilkRecord,
    tag::Tag,
  };

  fn day(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
  }

  fn cow() -> AnimalIdentity { AnimalIdentity::new(7, 1, "A123").unwrap() }

  fn milk(store: &MemoryStore, animal: &AnimalIdentity, range: DateRange, am: f64, pm: f64) {
    for d in range.days() {
      store.record_milk(MilkRecord {
        owner_id:       animal.owner_id,
        animal_type_id: animal.animal_type_id,
        animal_number:  animal.animal_number.clone(),
        record_date:    d,
        morning_qty:    am,
        evening_qty:    pm,
      });
    }
  }

  fn sample(animal: &AnimalIdentity, on: NaiveDate, lactating: &str) -> LactationSample {
    LactationSample {
      owner_id:         animal.owner_id,
      animal_type_id:   animal.animal_type_id,
      animal_number:    animal.animal_number.clone(),
      created_at:       Utc.from_utc_datetime(&on.and_hms_opt(6, 0, 0).unwrap()),
      lactating_status: lactating.into(),
      pregnancy_status: "no".into(),
    }
  }

  fn engine_at(store: MemoryStore, today: NaiveDate) -> Analytics<MemoryStore> {
    Analytics::with_config(
      Arc::new(store),
      AnalyticsConfig { today: Some(today), ..Default::default() },
    )
  }

  #[test]
  fn range_days_are_inclusive() {
    let r = DateRange::new(day(2024, 2, 27), day(2024, 3, 2)).unwrap();
    assert_eq!(r.len(), 5);
    assert_eq!(r.days().count(), 5);
    assert_eq!(r.days().last(), Some(day(2024, 3, 2)));
    assert!(r.contains(day(2024, 2, 29)));
    assert!(!r.contains(day(2024, 3, 3)));
    assert!(DateRange::new(day(2024, 3, 2), day(2024, 3, 1)).is_none());
  }

  #[test]
  fn unparseable_bounds_give_no_range() {
    assert!(DateRange::parse(None, Some("2024-01-01")).is_none());
    assert!(DateRange::parse(Some("yesterday"), Some("2024-01-01")).is_none());
    assert_eq!(
      DateRange::parse(Some("2024-01-01 10:00:00"), Some("2024-01-03")),
      DateRange::new(day(2024, 1, 1), day(2024, 1, 3))
    );
  }

  #[test]
  fn strict_parse_rejects_garbage_only() {
    assert!(matches!(
      DateRange::parse_strict(Some("soon"), Some("2024-01-01")),
      Err(Error::InvalidDate(ref raw)) if raw == "soon"
    ));
    assert_eq!(DateRange::parse_strict(None, Some("2024-01-01")).unwrap(), None);
    assert_eq!(
      DateRange::parse_strict(Some("2024-02-01"), Some("2024-01-01")).unwrap(),
      None
    );
  }

  #[test]
  fn strict_parse_rejects_oversized_ranges() {
    assert!(matches!(
      DateRange::parse_strict(Some("0001-01-01"), Some("9999-12-31")),
      Err(Error::InvalidDate(_))
    ));
    assert!(matches!(
      DateRange::parse_strict(Some("+200000-01-01"), Some("2024-01-01")),
      Err(Error::InvalidDate(_))
    ));
    let century = DateRange::parse_strict(Some("1950-01-01"), Some("2049-12-31"))
      .unwrap()
      .unwrap();
    assert!(century.len() <= MAX_RANGE_DAYS);
  }

  #[test]
  fn rounding_is_two_places() {
    assert_eq!(round2(10.005_1), 10.01);
    assert_eq!(round2(3.0), 3.0);
    assert_eq!(round2(1.234), 1.23);
  }

  #[tokio::test]
  async fn sums_both_shifts_over_range() {
    let store = MemoryStore::with_default_questions();
    milk(&store, &cow(), DateRange::new(day(2024, 1, 1), day(2024, 1, 10)).unwrap(), 5.5, 4.0);
    milk(&store, &cow().sibling("OTHER"), DateRange::new(day(2024, 1, 1), day(2024, 1, 10)).unwrap(), 100.0, 100.0);
    let engine = engine_at(store, day(2024, 6, 1));

    let sum = engine
      .sum_milk_between(&cow(), Some("2024-01-03"), Some("2024-01-05"))
      .await
      .unwrap();
    assert_eq!(sum, 3.0 * 9.5);
    assert_eq!(engine.total_milk(&cow()).await.unwrap(), 10.0 * 9.5);
    assert_eq!(engine.sum_milk_between(&cow(), None, Some("2024-01-05")).await.unwrap(), 0.0);
  }

  #[tokio::test]
  async fn zero_length_interval_sums_single_day() {
    let store = MemoryStore::with_default_questions();
    milk(&store, &cow(), DateRange::new(day(2024, 3, 1), day(2024, 3, 3)).unwrap(), 6.0, 5.0);
    store.record_sample(sample(&cow(), day(2024, 3, 2), "yes"));
    let engine = engine_at(store, day(2024, 3, 3));

    let episodes = engine.lactation_intervals(&cow()).await.unwrap();
    assert_eq!(episodes.len(), 1);
    let sum = engine.sum_milk_interval(&cow(), &episodes[0]).await.unwrap();
    assert_eq!(sum, 11.0);
  }

  #[tokio::test]
  async fn same_day_milk_record_is_replaced() {
    let store = MemoryStore::with_default_questions();
    let one_day = DateRange::new(day(2024, 4, 1), day(2024, 4, 1)).unwrap();
    milk(&store, &cow(), one_day, 1.0, 1.0);
    milk(&store, &cow(), one_day, 8.0, 2.0);
    let engine = engine_at(store, day(2024, 4, 2));
    assert_eq!(engine.sum_milk(&cow(), Some(one_day)).await.unwrap(), 10.0);
  }

  #[tokio::test]
  async fn current_and_last_lactation_end_to_end() {
    let today = day(2024, 9, 15);
    let store = MemoryStore::with_default_questions();
    store.record_sample(sample(&cow(), day(2024, 1, 1), "yes"));
    store.record_sample(sample(&cow(), day(2024, 4, 1), "no"));
    store.record_sample(sample(&cow(), day(2024, 6, 1), "yes"));
    let first = DateRange::new(day(2024, 1, 1), day(2024, 4, 1)).unwrap();
    let second = DateRange::new(day(2024, 6, 1), today).unwrap();
    milk(&store, &cow(), first, 10.0, 8.0);
    milk(&store, &cow(), second, 12.0, 9.0);
    let engine = engine_at(store, today);

    let summary = engine.lactation_summary(&cow()).await.unwrap();
    assert_eq!(first.len(), 92);
    assert_eq!(summary.last_lactation_yield, 18.0 * 92.0);
    assert!(summary.current.lactating);
    assert_eq!(summary.current.since, Some(day(2024, 6, 1)));
    assert_eq!(summary.current.days_in_milk, second.len());
    assert_eq!(summary.current.yield_total, 21.0 * second.len() as f64);
    assert_eq!(summary.lactation_count, 2);
  }

  #[tokio::test]
  async fn dry_animal_has_no_current_lactation() {
    let store = MemoryStore::with_default_questions();
    store.record_sample(sample(&cow(), day(2024, 1, 1), "yes"));
    store.record_sample(sample(&cow(), day(2024, 2, 1), "no"));
    let engine = engine_at(store, day(2024, 3, 1));

    let summary = engine.lactation_summary(&cow()).await.unwrap();
    assert_eq!(summary.current, CurrentLactation::default());
    assert_eq!(summary.lactation_count, 1);
  }

  #[tokio::test]
  async fn last_lactation_needs_two_samples() {
    let store = MemoryStore::with_default_questions();
    let samples = vec![sample(&cow(), day(2024, 1, 1), "yes")];
    let intervals = reconstruct(&samples);
    let engine = engine_at(store, day(2024, 2, 1));
    let last = engine
      .last_lactation_of(&cow(), &samples, &intervals)
      .await
      .unwrap();
    assert_eq!(last, 0.0);
  }

  #[tokio::test]
  async fn outlet_milk_sums_every_owner() {
    let store = MemoryStore::with_default_questions();
    let june = DateRange::new(day(2024, 6, 1), day(2024, 6, 30)).unwrap();
    let a = AnimalIdentity::new(1, 1, "A").unwrap();
    let b = AnimalIdentity::new(2, 1, "B").unwrap();
    let outsider = AnimalIdentity::new(3, 1, "C").unwrap();
    for animal in [&a, &b, &outsider] {
      store.answer(animal, Tag::Sex, "female", Utc::now()).unwrap();
      milk(&store, animal, june, 1.0, 1.0);
    }
    let engine = engine_at(store, day(2024, 7, 1));

    let total = engine.outlet_milk(&[1, 2], 1, Some(june)).await.unwrap();
    assert_eq!(total, 2.0 * 2.0 * 30.0);
    let herd = engine.herd_milk(a.herd(), Some(june)).await.unwrap();
    assert_eq!(herd, 60.0);
  }
}
