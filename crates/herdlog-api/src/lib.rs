//! Read-only JSON API for herdlog.
//!
//! Exposes an axum [`Router`] over an [`Analytics`] engine backed by any
//! [`HerdStore`]. Auth, TLS, and transport concerns are the caller's
//! responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", herdlog_api::api_router(engine.clone()))
//! ```

pub mod animals;
pub mod error;
pub mod herds;
pub mod views;

use std::sync::Arc;

use axum::{Router, routing::get};
use herdlog_core::{Analytics, store::HerdStore};

pub use error::ApiError;

/// Build the API router for `engine`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S>(engine: Arc<Analytics<S>>) -> Router<()>
where
  S: HerdStore + 'static,
{
  Router::new()
    // Herds and outlets
    .route("/herds/{owner_id}/{animal_type_id}/summary", get(herds::summary::<S>))
    .route("/herds/{owner_id}/{animal_type_id}/milk", get(herds::milk::<S>))
    .route("/outlets/summary", get(herds::outlet_summary::<S>))
    .route("/outlets/milk", get(herds::outlet_milk::<S>))
    // Individual animals
    .route("/animals/{owner_id}/{animal_type_id}/{number}/profile", get(animals::profile::<S>))
    .route("/animals/{owner_id}/{animal_type_id}/{number}/class", get(animals::class::<S>))
    .route(
      "/animals/{owner_id}/{animal_type_id}/{number}/lactations",
      get(animals::lactations::<S>),
    )
    .route("/animals/{owner_id}/{animal_type_id}/{number}/milk", get(animals::milk::<S>))
    .route(
      "/animals/{owner_id}/{animal_type_id}/{number}/breeding",
      get(animals::breeding::<S>),
    )
    .route(
      "/animals/{owner_id}/{animal_type_id}/{number}/pedigree",
      get(animals::pedigree::<S>),
    )
    .with_state(engine)
}
