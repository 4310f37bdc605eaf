//! Response bodies. Quantities are rounded to two decimals here and nowhere
//! else; the engine keeps full precision.

use chrono::NaiveDate;
use herdlog_core::{
  AnimalIdentity,
  breeding::{BreedingHistory, Pedigree},
  classify::Classification,
  lactation::{LactationInterval, LactationSummary},
  milk::{DateRange, round2},
  profile::AnimalProfile,
};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct MilkView {
  pub from:  Option<NaiveDate>,
  pub to:    Option<NaiveDate>,
  pub total: f64,
}

impl MilkView {
  pub fn new(range: Option<DateRange>, total: f64) -> Self {
    Self {
      from:  range.map(|r| r.start),
      to:    range.map(|r| r.end),
      total: round2(total),
    }
  }
}

#[derive(Debug, Serialize)]
pub struct LactationView {
  pub intervals:            Vec<LactationInterval>,
  pub lactation_count:      usize,
  pub lactating:            bool,
  pub since:                Option<NaiveDate>,
  pub days_in_milk:         i64,
  pub current_yield:        f64,
  pub last_lactation_yield: f64,
  pub pregnant:             bool,
}

impl From<LactationSummary> for LactationView {
  fn from(s: LactationSummary) -> Self {
    Self {
      intervals:            s.intervals,
      lactation_count:      s.lactation_count,
      lactating:            s.current.lactating,
      since:                s.current.since,
      days_in_milk:         s.current.days_in_milk,
      current_yield:        round2(s.current.yield_total),
      last_lactation_yield: round2(s.last_lactation_yield),
      pregnant:             s.pregnant,
    }
  }
}

pub fn pedigree_view(mut pedigree: Pedigree) -> Pedigree {
  pedigree.dam_total_yield = round2(pedigree.dam_total_yield);
  pedigree
}

#[derive(Debug, Serialize)]
pub struct ProfileView {
  pub animal:         AnimalIdentity,
  pub classification: Classification,
  pub lactation:      LactationView,
  pub total_milk:     f64,
  pub pedigree:       Pedigree,
  pub breeding:       BreedingHistory,
}

impl From<AnimalProfile> for ProfileView {
  fn from(p: AnimalProfile) -> Self {
    Self {
      animal:         p.animal,
      classification: p.classification,
      lactation:      p.lactation.into(),
      total_milk:     round2(p.total_milk),
      pedigree:       pedigree_view(p.pedigree),
      breeding:       p.breeding,
    }
  }
}
