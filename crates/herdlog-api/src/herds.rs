//! Handlers for herd- and outlet-level endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/herds/{owner_id}/{animal_type_id}/summary` | Herd breakdown |
//! | `GET`  | `/herds/{owner_id}/{animal_type_id}/milk` | `?from&to`; herd milk total |
//! | `GET`  | `/outlets/summary` | `?animal_type_id&owners=1,2` |
//! | `GET`  | `/outlets/milk` | `?animal_type_id&owners=1,2&from&to` |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, Query, State},
};
use herdlog_core::{
  Analytics,
  animal::Herd,
  classify::HerdSummary,
  milk::DateRange,
  store::HerdStore,
};
use serde::Deserialize;

use crate::{error::ApiError, views::MilkView};

#[derive(Debug, Deserialize, Default)]
pub struct RangeParams {
  pub from: Option<String>,
  pub to:   Option<String>,
}

impl RangeParams {
  pub fn range(&self) -> Result<Option<DateRange>, ApiError> {
    Ok(DateRange::parse_strict(self.from.as_deref(), self.to.as_deref())?)
  }
}

#[derive(Debug, Deserialize)]
pub struct OutletParams {
  pub animal_type_id: i64,
  /// Comma-separated owner ids, e.g. `1,2,7`.
  pub owners:         String,
  pub from:           Option<String>,
  pub to:             Option<String>,
}

impl OutletParams {
  fn owner_ids(&self) -> Result<Vec<i64>, ApiError> {
    self
      .owners
      .split(',')
      .map(str::trim)
      .filter(|s| !s.is_empty())
      .map(|s| {
        s.parse::<i64>()
          .map_err(|_| ApiError::BadRequest(format!("invalid owner id {s:?}")))
      })
      .collect()
  }
}

// ─── Herds ───────────────────────────────────────────────────────────────────

/// `GET /herds/{owner_id}/{animal_type_id}/summary`
pub async fn summary<S: HerdStore + 'static>(
  State(engine): State<Arc<Analytics<S>>>,
  Path((owner_id, animal_type_id)): Path<(i64, i64)>,
) -> Result<Json<HerdSummary>, ApiError> {
  let herd = Herd::new(owner_id, animal_type_id)?;
  Ok(Json(engine.herd_summary(herd).await?))
}

/// `GET /herds/{owner_id}/{animal_type_id}/milk[?from=..&to=..]`
pub async fn milk<S: HerdStore + 'static>(
  State(engine): State<Arc<Analytics<S>>>,
  Path((owner_id, animal_type_id)): Path<(i64, i64)>,
  Query(params): Query<RangeParams>,
) -> Result<Json<MilkView>, ApiError> {
  let herd = Herd::new(owner_id, animal_type_id)?;
  let range = params.range()?;
  let total = engine.herd_milk(herd, range).await?;
  Ok(Json(MilkView::new(range, total)))
}

// ─── Outlets ─────────────────────────────────────────────────────────────────

/// `GET /outlets/summary?animal_type_id=..&owners=..`
pub async fn outlet_summary<S: HerdStore + 'static>(
  State(engine): State<Arc<Analytics<S>>>,
  Query(params): Query<OutletParams>,
) -> Result<Json<HerdSummary>, ApiError> {
  let owners = params.owner_ids()?;
  let summary = engine
    .outlet_summary(&owners, params.animal_type_id)
    .await?;
  Ok(Json(summary))
}

/// `GET /outlets/milk?animal_type_id=..&owners=..[&from=..&to=..]`
pub async fn outlet_milk<S: HerdStore + 'static>(
  State(engine): State<Arc<Analytics<S>>>,
  Query(params): Query<OutletParams>,
) -> Result<Json<MilkView>, ApiError> {
  let owners = params.owner_ids()?;
  let range = DateRange::parse_strict(params.from.as_deref(), params.to.as_deref())?;
  let total = engine
    .outlet_milk(&owners, params.animal_type_id, range)
    .await?;
  Ok(Json(MilkView::new(range, total)))
}
