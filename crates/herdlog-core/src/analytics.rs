//! [`Analytics`], the derivation engine over a [`HerdStore`].
//!
//! The engine is stateless: it holds a store handle and its configuration,
//! nothing else. Each public operation re-reads the logs it needs, fans
//! independent lookups out concurrently (bounded by
//! [`AnalyticsConfig::lookup_concurrency`]), and runs under the configured
//! deadline as one unit. Sub-lookups are joined in place, never spawned, so
//! dropping an operation on deadline drops every lookup still in flight.
//!
//! Operations are split by concern across the sibling modules:
//! [`resolver`](crate::resolver), [`lactation`](crate::lactation),
//! [`milk`](crate::milk), [`classify`](crate::classify),
//! [`breeding`](crate::breeding) and [`profile`](crate::profile).

use std::{future::Future, sync::Arc, time::Duration};

use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use tracing::Instrument as _;

use crate::{Error, Result, store::HerdStore, tag::TagRegistry};

/// Engine configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AnalyticsConfig {
  /// Upper bound on store lookups in flight for one fan-out.
  pub lookup_concurrency: usize,
  /// Deadline applied to every top-level operation. `None` disables it.
  #[serde(with = "millis")]
  pub deadline:           Option<Duration>,
  /// Pin "today" for open lactations. Defaults to the current UTC date.
  pub today:              Option<NaiveDate>,
}

impl Default for AnalyticsConfig {
  fn default() -> Self {
    Self { lookup_concurrency: 16, deadline: None, today: None }
  }
}

mod millis {
  use std::time::Duration;

  use serde::{Deserialize, Deserializer};

  pub fn deserialize<'de, D>(d: D) -> Result<Option<Duration>, D::Error>
  where
    D: Deserializer<'de>,
  {
    Ok(Option::<u64>::deserialize(d)?.map(Duration::from_millis))
  }
}

/// The animal-fact derivation engine.
///
/// Cloning is cheap; the store is reference-counted.
pub struct Analytics<S> {
  pub(crate) store: Arc<S>,
  config:           AnalyticsConfig,
}

impl<S> Clone for Analytics<S> {
  fn clone(&self) -> Self {
    Self { store: Arc::clone(&self.store), config: self.config.clone() }
  }
}

impl<S: HerdStore> Analytics<S> {
  pub fn new(store: Arc<S>) -> Self {
    Self::with_config(store, AnalyticsConfig::default())
  }

  pub fn with_config(store: Arc<S>, config: AnalyticsConfig) -> Self {
    Self { store, config }
  }

  pub fn store(&self) -> &S { &self.store }

  pub fn config(&self) -> &AnalyticsConfig { &self.config }

  /// Check the store's tag registry covers every [`Tag`](crate::Tag). Run once at
  /// startup.
  pub async fn verify_registry(&self) -> Result<TagRegistry> {
    let ids = self.store.registered_tags().await.map_err(Error::store)?;
    let registry = TagRegistry::verify(ids)?;
    tracing::info!("tag registry verified");
    Ok(registry)
  }

  pub(crate) fn today(&self) -> NaiveDate {
    self.config.today.unwrap_or_else(|| Utc::now().date_naive())
  }

  pub(crate) fn concurrency(&self) -> usize { self.config.lookup_concurrency.max(1) }

  /// Run `op` as one cancellable unit under the configured deadline, inside a
  /// debug span named after it.
  pub(crate) async fn bounded<T, F>(&self, op: &'static str, fut: F) -> Result<T>
  where
    F: Future<Output = Result<T>>,
  {
    let fut = fut.instrument(tracing::debug_span!("analytics", op));
    let Some(limit) = self.config.deadline else {
      return fut.await;
    };
    match tokio::time::timeout(limit, fut).await {
      Ok(result) => result,
      Err(_) => {
        tracing::warn!(op, ?limit, "operation exceeded deadline");
        Err(Error::DeadlineExceeded(limit))
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use std::sync::Arc;

  use super::*;
  use crate::{memory::MemoryStore, tag::Tag};

  #[tokio::test]
  async fn verify_registry_accepts_full_registry() {
    let engine = Analytics::new(Arc::new(MemoryStore::with_default_questions()));
    let registry = engine.verify_registry().await.unwrap();
    assert_eq!(registry.resolve(8).unwrap(), Tag::Sex);
  }

  #[tokio::test]
  async fn verify_registry_rejects_partial_registry() {
    let store = MemoryStore::new();
    store.register_question(1, Tag::Sex);
    let engine = Analytics::new(Arc::new(store));
    let err = engine.verify_registry().await.unwrap_err();
    assert!(matches!(err, Error::MissingTags(ref m) if m.contains(&Tag::Pregnant)));
  }

  #[test]
  fn config_deserialises_deadline_in_millis() {
    let cfg: AnalyticsConfig = serde_json::from_value(serde_json::json!({
      "lookup_concurrency": 4,
      "deadline": 250
    }))
    .unwrap();
    assert_eq!(cfg.lookup_concurrency, 4);
    assert_eq!(cfg.deadline, Some(Duration::from_millis(250)));
    assert!(cfg.today.is_none());
  }

  #[test]
  fn zero_concurrency_is_clamped() {
    let engine = Analytics::with_config(
      Arc::new(MemoryStore::new()),
      AnalyticsConfig { lookup_concurrency: 0, ..Default::default() },
    );
    assert_eq!(engine.concurrency(), 1);
  }
}
