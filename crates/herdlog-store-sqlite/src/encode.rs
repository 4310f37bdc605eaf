//! Encoding and decoding helpers between herdlog domain types and the
//! plain-text representations stored in SQLite columns.
//!
//! Timestamps are stored as fixed-width RFC 3339 strings (microseconds, `Z`)
//! so that text order is time order. Calendar days are stored as
//! `YYYY-MM-DD`. UUIDs are stored as hyphenated lowercase strings.

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use herdlog_core::{
  AnimalIdentity, Tag,
  answer::AnswerEvent,
  records::{LactationSample, MotherCalfLink},
};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Uuid ────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String {
  dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── NaiveDate ───────────────────────────────────────────────────────────────

pub fn encode_day(day: NaiveDate) -> String { day.format("%Y-%m-%d").to_string() }

pub fn decode_day(s: &str) -> Result<NaiveDate> {
  NaiveDate::parse_from_str(s, "%Y-%m-%d")
    .map_err(|e| Error::DateParse(format!("{s:?}: {e}")))
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Column list matching [`RawAnswer::from_row`]. Expects `answers a` joined
/// with `questions q`.
pub const ANSWER_COLUMNS: &str = "a.answer_id, a.owner_id, a.animal_type_id, \
   a.animal_number, a.question_id, q.tag_id, a.value, a.logic_value, \
   a.created_at, a.deleted";

/// Raw values read directly from an `answers` row joined with its question.
pub struct RawAnswer {
  pub answer_id:      String,
  pub owner_id:       i64,
  pub animal_type_id: i64,
  pub animal_number:  String,
  pub question_id:    i64,
  pub tag_id:         i64,
  pub value:          String,
  pub logic_value:    Option<String>,
  pub created_at:     String,
  pub deleted:        bool,
}

impl RawAnswer {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      answer_id:      row.get(0)?,
      owner_id:       row.get(1)?,
      animal_type_id: row.get(2)?,
      animal_number:  row.get(3)?,
      question_id:    row.get(4)?,
      tag_id:         row.get(5)?,
      value:          row.get(6)?,
      logic_value:    row.get(7)?,
      created_at:     row.get(8)?,
      deleted:        row.get(9)?,
    })
  }

  pub fn into_answer(self) -> Result<AnswerEvent> {
    Ok(AnswerEvent {
      answer_id:   decode_uuid(&self.answer_id)?,
      animal:      AnimalIdentity {
        owner_id:       self.owner_id,
        animal_type_id: self.animal_type_id,
        animal_number:  self.animal_number,
      },
      question_id: self.question_id,
      tag:         Tag::try_from(self.tag_id)?,
      value:       self.value,
      logic_value: self.logic_value,
      created_at:  decode_dt(&self.created_at)?,
      deleted:     self.deleted,
    })
  }
}

/// Raw values read directly from a `mother_calf_links` row.
pub struct RawLink {
  pub owner_id:             i64,
  pub animal_type_id:       i64,
  pub delivery_date:        String,
  pub mother_animal_number: String,
  pub calf_animal_number:   String,
}

impl RawLink {
  pub const COLUMNS: &str = "owner_id, animal_type_id, delivery_date, \
     mother_animal_number, calf_animal_number";

  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      owner_id:             row.get(0)?,
      animal_type_id:       row.get(1)?,
      delivery_date:        row.get(2)?,
      mother_animal_number: row.get(3)?,
      calf_animal_number:   row.get(4)?,
    })
  }

  pub fn into_link(self) -> Result<MotherCalfLink> {
    Ok(MotherCalfLink {
      owner_id:             self.owner_id,
      animal_type_id:       self.animal_type_id,
      delivery_date:        decode_day(&self.delivery_date)?,
      mother_animal_number: self.mother_animal_number,
      calf_animal_number:   self.calf_animal_number,
    })
  }
}

/// Raw values read directly from a `lactation_samples` row.
pub struct RawSample {
  pub owner_id:         i64,
  pub animal_type_id:   i64,
  pub animal_number:    String,
  pub created_at:       String,
  pub lactating_status: String,
  pub pregnancy_status: String,
}

impl RawSample {
  pub fn into_sample(self) -> Result<LactationSample> {
    Ok(LactationSample {
      owner_id:         self.owner_id,
      animal_type_id:   self.animal_type_id,
      animal_number:    self.animal_number,
      created_at:       decode_dt(&self.created_at)?,
      lactating_status: self.lactating_status,
      pregnancy_status: self.pregnancy_status,
    })
  }
}
