//! Answer events, the append-only log every animal fact is derived from.
//!
//! An answer is never edited. A correction is a newer answer for the same
//! tag; a withdrawal sets the `deleted` tombstone. The active answer for an
//! `(identity, tag)` pair is the newest non-deleted one.

use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{animal::AnimalIdentity, tag::Tag};

// ─── AnswerEvent ─────────────────────────────────────────────────────────────

/// One answer to one tagged question about one animal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnswerEvent {
  pub answer_id:   Uuid,
  pub animal:      AnimalIdentity,
  pub question_id: i64,
  /// Tag of the owning question, resolved through the registry.
  pub tag:         Tag,
  pub value:       String,
  /// Pre-classified secondary value, e.g. `"calf"` on life-stage answers.
  pub logic_value: Option<String>,
  /// Shared by every answer written in the same batch.
  pub created_at:  DateTime<Utc>,
  pub deleted:     bool,
}

impl AnswerEvent {
  /// Case-insensitive "yes", the encoding of every boolean question.
  pub fn is_yes(&self) -> bool { is_yes(&self.value) }

  /// True when `logic_value` equals `expected`, ignoring case.
  pub fn logic_is(&self, expected: &str) -> bool {
    self
      .logic_value
      .as_deref()
      .is_some_and(|v| v.trim().eq_ignore_ascii_case(expected))
  }

  /// The answer interpreted as a calendar day, if it is one.
  pub fn as_day(&self) -> Option<NaiveDate> { parse_day(&self.value) }
}

/// Input for recording answers. `created_at` is assigned by the store when
/// absent; a batch written together shares one timestamp.
#[derive(Debug, Clone)]
pub struct NewAnswer {
  pub animal:      AnimalIdentity,
  pub question_id: i64,
  pub value:       String,
  pub logic_value: Option<String>,
}

impl NewAnswer {
  pub fn new(
    animal: AnimalIdentity,
    question_id: i64,
    value: impl Into<String>,
  ) -> Self {
    Self { animal, question_id, value: value.into(), logic_value: None }
  }

  pub fn with_logic_value(mut self, logic_value: impl Into<String>) -> Self {
    self.logic_value = Some(logic_value.into());
    self
  }
}

// ─── TagAnswers ──────────────────────────────────────────────────────────────

/// The latest answer per tag for one animal.
///
/// Missing tags are unknown facts; the accessors coalesce them to empty
/// string / `false` the way every consumer wants.
#[derive(Debug, Clone, Default)]
pub struct TagAnswers {
  by_tag: HashMap<Tag, AnswerEvent>,
}

impl TagAnswers {
  pub fn get(&self, tag: Tag) -> Option<&AnswerEvent> { self.by_tag.get(&tag) }

  pub fn value(&self, tag: Tag) -> &str {
    self.get(tag).map(|a| a.value.as_str()).unwrap_or_default()
  }

  pub fn is_yes(&self, tag: Tag) -> bool {
    self.get(tag).is_some_and(AnswerEvent::is_yes)
  }

  pub fn len(&self) -> usize { self.by_tag.len() }

  pub fn is_empty(&self) -> bool { self.by_tag.is_empty() }
}

impl FromIterator<AnswerEvent> for TagAnswers {
  /// Later items win over earlier ones for the same tag.
  fn from_iter<I: IntoIterator<Item = AnswerEvent>>(iter: I) -> Self {
    Self {
      by_tag: iter.into_iter().map(|a| (a.tag, a)).collect(),
    }
  }
}

// ─── Value parsing ───────────────────────────────────────────────────────────

pub(crate) fn is_yes(value: &str) -> bool {
  value.trim().eq_ignore_ascii_case("yes")
}

/// Parse the date forms found in answers and request parameters:
/// `2024-01-31`, `2024-01-31 06:30:00`, and RFC 3339.
pub fn parse_day(raw: &str) -> Option<NaiveDate> {
  let raw = raw.trim();
  if raw.is_empty() {
    return None;
  }
  if let Ok(day) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
    return Some(day);
  }
  if let Ok(dt) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S") {
    return Some(dt.date());
  }
  DateTime::parse_from_rfc3339(raw)
    .ok()
    .map(|dt| dt.with_timezone(&Utc).date_naive())
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn parses_supported_day_formats() {
    let day = NaiveDate::from_ymd_opt(2024, 3, 9).unwrap();
    assert_eq!(parse_day("2024-03-09"), Some(day));
    assert_eq!(parse_day(" 2024-03-09 17:45:00 "), Some(day));
    assert_eq!(parse_day("2024-03-09T05:00:00Z"), Some(day));
    assert_eq!(parse_day("09/03/2024"), None);
    assert_eq!(parse_day(""), None);
  }

  #[test]
  fn yes_is_case_insensitive() {
    assert!(is_yes("YES"));
    assert!(is_yes(" yes "));
    assert!(!is_yes("no"));
    assert!(!is_yes("y"));
  }
}
