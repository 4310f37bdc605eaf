//! The non-answer logs: birth links, daily milk records and lactation
//! samples.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::answer::is_yes;

/// Written when a birth is recorded. Not unique: a correction is a new link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MotherCalfLink {
  pub owner_id:             i64,
  pub animal_type_id:       i64,
  pub delivery_date:        NaiveDate,
  pub mother_animal_number: String,
  pub calf_animal_number:   String,
}

/// One animal's milk for one day, both shifts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MilkRecord {
  pub owner_id:       i64,
  pub animal_type_id: i64,
  pub animal_number:  String,
  pub record_date:    NaiveDate,
  pub morning_qty:    f64,
  pub evening_qty:    f64,
}

impl MilkRecord {
  pub fn total(&self) -> f64 { self.morning_qty + self.evening_qty }
}

/// Sum of both shifts over some set of days.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MilkSum {
  pub morning: f64,
  pub evening: f64,
}

impl MilkSum {
  pub fn total(&self) -> f64 { self.morning + self.evening }
}

impl std::ops::Add for MilkSum {
  type Output = Self;

  fn add(self, rhs: Self) -> Self {
    Self {
      morning: self.morning + rhs.morning,
      evening: self.evening + rhs.evening,
    }
  }
}

impl std::iter::Sum for MilkSum {
  fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
    iter.fold(Self::default(), |acc, s| acc + s)
  }
}

/// A point sample of lactation and pregnancy status, appended whenever a
/// delivery, drying or pregnancy detection is recorded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LactationSample {
  pub owner_id:         i64,
  pub animal_type_id:   i64,
  pub animal_number:    String,
  pub created_at:       DateTime<Utc>,
  pub lactating_status: String,
  pub pregnancy_status: String,
}

impl LactationSample {
  pub fn is_lactating(&self) -> bool { is_yes(&self.lactating_status) }

  pub fn is_pregnant(&self) -> bool { is_yes(&self.pregnancy_status) }

  pub fn day(&self) -> NaiveDate { self.created_at.date_naive() }
}
