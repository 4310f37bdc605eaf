//! The `HerdStore` trait, the data-access contract the engine reads through.
//!
//! The trait is implemented by storage backends (e.g. `herdlog-store-sqlite`)
//! and by [`crate::memory::MemoryStore`] for tests. Every method is a read;
//! writes belong to the backend and the surrounding system.
//!
//! Methods return `Send` futures so independent lookups can be driven
//! concurrently from a multi-threaded runtime.

use std::future::Future;

use chrono::{DateTime, Utc};

use crate::{
  animal::{AnimalIdentity, Herd},
  answer::{AnswerEvent, TagAnswers},
  milk::DateRange,
  records::{LactationSample, MilkSum, MotherCalfLink},
  tag::Tag,
};

/// Abstraction over a herdlog storage backend.
///
/// Answer reads only ever see non-deleted events. "Latest" means greatest
/// `created_at`, ties broken by insertion order (last write wins).
pub trait HerdStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Registry ──────────────────────────────────────────────────────────

  /// Every tag id present in the registry.
  fn registered_tags(
    &self,
  ) -> impl Future<Output = Result<Vec<i64>, Self::Error>> + Send + '_;

  // ── Answers ───────────────────────────────────────────────────────────

  /// The active answer for `(animal, tag)`, or `None` if the fact is
  /// unknown.
  fn latest_answer<'a>(
    &'a self,
    animal: &'a AnimalIdentity,
    tag: Tag,
  ) -> impl Future<Output = Result<Option<AnswerEvent>, Self::Error>> + Send + 'a;

  /// The active answer for each of `tags`. Tags with no answer are absent
  /// from the result.
  ///
  /// The default issues one [`latest_answer`](Self::latest_answer) per tag
  /// concurrently; backends that can answer in a single query should
  /// override it.
  fn latest_answers<'a>(
    &'a self,
    animal: &'a AnimalIdentity,
    tags: &'a [Tag],
  ) -> impl Future<Output = Result<TagAnswers, Self::Error>> + Send + 'a {
    async move {
      let found = futures::future::try_join_all(
        tags.iter().map(|&tag| self.latest_answer(animal, tag)),
      )
      .await?;
      Ok(found.into_iter().flatten().collect())
    }
  }

  /// The non-deleted answer for `tag` written at exactly `at`, i.e. in the
  /// same write batch as some other answer.
  fn answer_at<'a>(
    &'a self,
    animal: &'a AnimalIdentity,
    tag: Tag,
    at: DateTime<Utc>,
  ) -> impl Future<Output = Result<Option<AnswerEvent>, Self::Error>> + Send + 'a;

  /// All non-deleted answers for any of `tags`, newest first.
  fn answers<'a>(
    &'a self,
    animal: &'a AnimalIdentity,
    tags: &'a [Tag],
  ) -> impl Future<Output = Result<Vec<AnswerEvent>, Self::Error>> + Send + 'a;

  /// Distinct animal numbers in `herd` with at least one non-deleted answer,
  /// sorted.
  fn animal_numbers(
    &self,
    herd: Herd,
  ) -> impl Future<Output = Result<Vec<String>, Self::Error>> + Send + '_;

  // ── Lactation & milk ──────────────────────────────────────────────────

  /// Lactation samples for `animal`, oldest first.
  fn lactation_samples<'a>(
    &'a self,
    animal: &'a AnimalIdentity,
  ) -> impl Future<Output = Result<Vec<LactationSample>, Self::Error>> + Send + 'a;

  /// Sum both milk shifts over the records dated within `range`, or over
  /// every record when `range` is `None`.
  fn milk_sum<'a>(
    &'a self,
    animal: &'a AnimalIdentity,
    range: Option<DateRange>,
  ) -> impl Future<Output = Result<MilkSum, Self::Error>> + Send + 'a;

  // ── Birth links ───────────────────────────────────────────────────────

  /// The link recording `calf`'s birth, if any. When corrections have left
  /// several, the most recently inserted wins.
  fn mother_link<'a>(
    &'a self,
    calf: &'a AnimalIdentity,
  ) -> impl Future<Output = Result<Option<MotherCalfLink>, Self::Error>> + Send + 'a;

  /// Every link where `mother` is the mother, in insertion order.
  fn calf_links<'a>(
    &'a self,
    mother: &'a AnimalIdentity,
  ) -> impl Future<Output = Result<Vec<MotherCalfLink>, Self::Error>> + Send + 'a;
}
