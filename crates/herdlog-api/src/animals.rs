//! Handlers for `/animals/{owner_id}/{animal_type_id}/{number}/...`.
//!
//! | Method | Path suffix | Notes |
//! |--------|-------------|-------|
//! | `GET`  | `/profile` | Every derivation at once |
//! | `GET`  | `/class` | Classification |
//! | `GET`  | `/lactations` | Episodes, current and last lactation |
//! | `GET`  | `/milk` | `?from&to`; both bounds required for a non-zero sum |
//! | `GET`  | `/breeding` | AI, delivery and heat history plus calves |
//! | `GET`  | `/pedigree` | Dam and sire |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, Query, State},
};
use herdlog_core::{
  Analytics, AnimalIdentity,
  breeding::{BreedingHistory, Pedigree},
  classify::Classification,
  store::HerdStore,
};

use crate::{
  error::ApiError,
  herds::RangeParams,
  views::{LactationView, MilkView, ProfileView, pedigree_view},
};

type AnimalPath = Path<(i64, i64, String)>;

fn identity(Path((owner, kind, number)): AnimalPath) -> Result<AnimalIdentity, ApiError> {
  Ok(AnimalIdentity::new(owner, kind, number)?)
}

/// `GET /animals/{owner_id}/{animal_type_id}/{number}/profile`
pub async fn profile<S: HerdStore + 'static>(
  State(engine): State<Arc<Analytics<S>>>,
  path: AnimalPath,
) -> Result<Json<ProfileView>, ApiError> {
  let animal = identity(path)?;
  Ok(Json(engine.animal_profile(&animal).await?.into()))
}

/// `GET /animals/{owner_id}/{animal_type_id}/{number}/class`
pub async fn class<S: HerdStore + 'static>(
  State(engine): State<Arc<Analytics<S>>>,
  path: AnimalPath,
) -> Result<Json<Classification>, ApiError> {
  let animal = identity(path)?;
  Ok(Json(engine.classify_animal(&animal).await?))
}

/// `GET /animals/{owner_id}/{animal_type_id}/{number}/lactations`
pub async fn lactations<S: HerdStore + 'static>(
  State(engine): State<Arc<Analytics<S>>>,
  path: AnimalPath,
) -> Result<Json<LactationView>, ApiError> {
  let animal = identity(path)?;
  Ok(Json(engine.lactation_summary(&animal).await?.into()))
}

/// `GET /animals/{owner_id}/{animal_type_id}/{number}/milk[?from=..&to=..]`
pub async fn milk<S: HerdStore + 'static>(
  State(engine): State<Arc<Analytics<S>>>,
  path: AnimalPath,
  Query(params): Query<RangeParams>,
) -> Result<Json<MilkView>, ApiError> {
  let animal = identity(path)?;
  let range = params.range()?;
  let total = engine.sum_milk(&animal, range).await?;
  Ok(Json(MilkView::new(range, total)))
}

/// `GET /animals/{owner_id}/{animal_type_id}/{number}/breeding`
pub async fn breeding<S: HerdStore + 'static>(
  State(engine): State<Arc<Analytics<S>>>,
  path: AnimalPath,
) -> Result<Json<BreedingHistory>, ApiError> {
  let animal = identity(path)?;
  Ok(Json(engine.breeding_history(&animal).await?))
}

/// `GET /animals/{owner_id}/{animal_type_id}/{number}/pedigree`
pub async fn pedigree<S: HerdStore + 'static>(
  State(engine): State<Arc<Analytics<S>>>,
  path: AnimalPath,
) -> Result<Json<Pedigree>, ApiError> {
  let animal = identity(path)?;
  Ok(Json(pedigree_view(engine.pedigree(&animal).await?)))
}
