//! [`MemoryStore`]: an in-process [`HerdStore`] for tests and fixtures.
//!
//! Holds every log in plain vectors behind a lock. Reads never hold the lock
//! across an await point. An optional artificial latency and an
//! "unavailable" switch let tests exercise deadlines and infrastructure
//! failures.

use std::{
  collections::{BTreeSet, HashMap},
  sync::{
    RwLock, RwLockReadGuard, RwLockWriteGuard,
    atomic::{AtomicBool, AtomicU64, Ordering},
  },
  time::Duration,
};

use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::{
  animal::{AnimalIdentity, Herd},
  answer::{AnswerEvent, NewAnswer},
  milk::DateRange,
  records::{LactationSample, MilkRecord, MilkSum, MotherCalfLink},
  store::HerdStore,
  tag::Tag,
};

#[derive(Debug, Error)]
pub enum MemoryError {
  #[error("question {0} is not registered")]
  UnknownQuestion(i64),

  #[error("answer not found: {0}")]
  AnswerNotFound(Uuid),

  #[error("store unavailable")]
  Unavailable,
}

#[derive(Default)]
struct Logs {
  questions: HashMap<i64, Tag>,
  /// Insertion order doubles as the tie-breaker for equal timestamps.
  answers:   Vec<AnswerEvent>,
  links:     Vec<MotherCalfLink>,
  milk:      Vec<MilkRecord>,
  samples:   Vec<LactationSample>,
}

/// An in-memory herd store.
#[derive(Default)]
pub struct MemoryStore {
  logs:        RwLock<Logs>,
  latency_ms:  AtomicU64,
  unavailable: AtomicBool,
}

impl MemoryStore {
  pub fn new() -> Self { Self::default() }

  /// A store with one question per [`Tag`], whose question id equals the tag
  /// id.
  pub fn with_default_questions() -> Self {
    let store = Self::new();
    {
      let mut logs = store.write();
      for tag in <Tag as strum::IntoEnumIterator>::iter() {
        logs.questions.insert(tag.id(), tag);
      }
    }
    store
  }

  fn read(&self) -> RwLockReadGuard<'_, Logs> {
    self.logs.read().unwrap_or_else(|e| e.into_inner())
  }

  fn write(&self) -> RwLockWriteGuard<'_, Logs> {
    self.logs.write().unwrap_or_else(|e| e.into_inner())
  }

  // ── Test controls ─────────────────────────────────────────────────────

  /// Delay every read by `latency`.
  pub fn set_latency(&self, latency: Duration) {
    self
      .latency_ms
      .store(latency.as_millis() as u64, Ordering::Relaxed);
  }

  /// Make every read fail with [`MemoryError::Unavailable`].
  pub fn set_unavailable(&self, unavailable: bool) {
    self.unavailable.store(unavailable, Ordering::Relaxed);
  }

  async fn before_read(&self) -> Result<(), MemoryError> {
    let ms = self.latency_ms.load(Ordering::Relaxed);
    if ms > 0 {
      tokio::time::sleep(Duration::from_millis(ms)).await;
    }
    if self.unavailable.load(Ordering::Relaxed) {
      return Err(MemoryError::Unavailable);
    }
    Ok(())
  }

  // ── Writes ────────────────────────────────────────────────────────────

  pub fn register_question(&self, question_id: i64, tag: Tag) {
    self.write().questions.insert(question_id, tag);
  }

  /// Append a batch of answers that share the timestamp `at`.
  pub fn record_answers(
    &self,
    batch: Vec<NewAnswer>,
    at: DateTime<Utc>,
  ) -> Result<Vec<AnswerEvent>, MemoryError> {
    let mut logs = self.write();
    let mut written = Vec::with_capacity(batch.len());
    for input in batch {
      let tag = *logs
        .questions
        .get(&input.question_id)
        .ok_or(MemoryError::UnknownQuestion(input.question_id))?;
      written.push(AnswerEvent {
        answer_id: Uuid::new_v4(),
        animal: input.animal,
        question_id: input.question_id,
        tag,
        value: input.value,
        logic_value: input.logic_value,
        created_at: at,
        deleted: false,
      });
    }
    logs.answers.extend(written.iter().cloned());
    Ok(written)
  }

  /// Convenience for a single answer to the default question for `tag`.
  pub fn answer(
    &self,
    animal: &AnimalIdentity,
    tag: Tag,
    value: &str,
    at: DateTime<Utc>,
  ) -> Result<AnswerEvent, MemoryError> {
    let mut written = self
      .record_answers(vec![NewAnswer::new(animal.clone(), tag.id(), value)], at)?;
    written.pop().ok_or(MemoryError::UnknownQuestion(tag.id()))
  }

  /// Set the tombstone on an answer.
  pub fn tombstone(&self, answer_id: Uuid) -> Result<(), MemoryError> {
    let mut logs = self.write();
    let answer = logs
      .answers
      .iter_mut()
      .find(|a| a.answer_id == answer_id)
      .ok_or(MemoryError::AnswerNotFound(answer_id))?;
    answer.deleted = true;
    Ok(())
  }

  /// Replace any record for the same animal and day, then insert.
  pub fn record_milk(&self, record: MilkRecord) {
    let mut logs = self.write();
    logs.milk.retain(|m| {
      !(m.owner_id == record.owner_id
        && m.animal_type_id == record.animal_type_id
        && m.animal_number == record.animal_number
        && m.record_date == record.record_date)
    });
    logs.milk.push(record);
  }

  pub fn record_birth(&self, link: MotherCalfLink) { self.write().links.push(link); }

  pub fn record_sample(&self, sample: LactationSample) {
    self.write().samples.push(sample);
  }
}

fn is_animal(animal: &AnimalIdentity, owner: i64, kind: i64, number: &str) -> bool {
  animal.owner_id == owner
    && animal.animal_type_id == kind
    && animal.animal_number == number
}

fn live<'l>(
  logs: &'l Logs,
  animal: &'l AnimalIdentity,
) -> impl Iterator<Item = (usize, &'l AnswerEvent)> + 'l {
  logs
    .answers
    .iter()
    .enumerate()
    .filter(move |(_, a)| !a.deleted && a.animal == *animal)
}

impl HerdStore for MemoryStore {
  type Error = MemoryError;

  async fn registered_tags(&self) -> Result<Vec<i64>, MemoryError> {
    self.before_read().await?;
    let logs = self.read();
    let ids: BTreeSet<i64> = logs.questions.values().map(|t| t.id()).collect();
    Ok(ids.into_iter().collect())
  }

  async fn latest_answer(
    &self,
    animal: &AnimalIdentity,
    tag: Tag,
  ) -> Result<Option<AnswerEvent>, MemoryError> {
    self.before_read().await?;
    let logs = self.read();
    Ok(
      live(&logs, animal)
        .filter(|(_, a)| a.tag == tag)
        .max_by_key(|(seq, a)| (a.created_at, *seq))
        .map(|(_, a)| a.clone()),
    )
  }

  async fn answer_at(
    &self,
    animal: &AnimalIdentity,
    tag: Tag,
    at: DateTime<Utc>,
  ) -> Result<Option<AnswerEvent>, MemoryError> {
    self.before_read().await?;
    let logs = self.read();
    Ok(
      live(&logs, animal)
        .filter(|(_, a)| a.tag == tag && a.created_at == at)
        .last()
        .map(|(_, a)| a.clone()),
    )
  }

  async fn answers(
    &self,
    animal: &AnimalIdentity,
    tags: &[Tag],
  ) -> Result<Vec<AnswerEvent>, MemoryError> {
    self.before_read().await?;
    let logs = self.read();
    let mut found: Vec<(usize, &AnswerEvent)> = live(&logs, animal)
      .filter(|(_, a)| tags.contains(&a.tag))
      .collect();
    found.sort_by(|(sa, a), (sb, b)| (b.created_at, sb).cmp(&(a.created_at, sa)));
    Ok(found.into_iter().map(|(_, a)| a.clone()).collect())
  }

  async fn animal_numbers(&self, herd: Herd) -> Result<Vec<String>, MemoryError> {
    self.before_read().await?;
    let logs = self.read();
    let numbers: BTreeSet<String> = logs
      .answers
      .iter()
      .filter(|a| {
        !a.deleted
          && a.animal.owner_id == herd.owner_id
          && a.animal.animal_type_id == herd.animal_type_id
      })
      .map(|a| a.animal.animal_number.clone())
      .collect();
    Ok(numbers.into_iter().collect())
  }

  async fn lactation_samples(
    &self,
    animal: &AnimalIdentity,
  ) -> Result<Vec<LactationSample>, MemoryError> {
    self.before_read().await?;
    let logs = self.read();
    let mut samples: Vec<LactationSample> = logs
      .samples
      .iter()
      .filter(|s| {
        is_animal(animal, s.owner_id, s.animal_type_id, &s.animal_number)
      })
      .cloned()
      .collect();
    samples.sort_by_key(|s| s.created_at);
    Ok(samples)
  }

  async fn milk_sum(
    &self,
    animal: &AnimalIdentity,
    range: Option<DateRange>,
  ) -> Result<MilkSum, MemoryError> {
    self.before_read().await?;
    let logs = self.read();
    Ok(
      logs
        .milk
        .iter()
        .filter(|m| {
          is_animal(animal, m.owner_id, m.animal_type_id, &m.animal_number)
        })
        .filter(|m| range.is_none_or(|r| r.contains(m.record_date)))
        .map(|m| MilkSum { morning: m.morning_qty, evening: m.evening_qty })
        .sum(),
    )
  }

  async fn mother_link(
    &self,
    calf: &AnimalIdentity,
  ) -> Result<Option<MotherCalfLink>, MemoryError> {
    self.before_read().await?;
    let logs = self.read();
    Ok(
      logs
        .links
        .iter()
        .rev()
        .find(|l| {
          is_animal(calf, l.owner_id, l.animal_type_id, &l.calf_animal_number)
        })
        .cloned(),
    )
  }

  async fn calf_links(
    &self,
    mother: &AnimalIdentity,
  ) -> Result<Vec<MotherCalfLink>, MemoryError> {
    self.before_read().await?;
    let logs = self.read();
    Ok(
      logs
        .links
        .iter()
        .filter(|l| {
          is_animal(mother, l.owner_id, l.animal_type_id, &l.mother_animal_number)
        })
        .cloned()
        .collect(),
    )
  }
}
