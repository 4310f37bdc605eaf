//! herdlog server wiring: configuration and the HTTP application.
//!
//! The binary in `main.rs` reads [`ServerConfig`], opens the SQLite store and
//! serves [`app`].

use std::{path::PathBuf, sync::Arc, time::Duration};

use axum::Router;
use herdlog_core::{Analytics, AnalyticsConfig, store::HerdStore};
use serde::Deserialize;
use tower_http::trace::TraceLayer;

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml` and
/// `HERDLOG_*` environment variables.
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
  #[serde(default = "default_host")]
  pub host:               String,
  #[serde(default = "default_port")]
  pub port:               u16,
  pub store_path:         PathBuf,
  #[serde(default = "default_concurrency")]
  pub lookup_concurrency: usize,
  /// Per-request derivation deadline. Absent means no deadline.
  #[serde(default)]
  pub request_timeout_ms: Option<u64>,
  #[serde(default)]
  pub seed_tag_registry:  bool,
}

fn default_host() -> String { "127.0.0.1".to_owned() }

fn default_port() -> u16 { 8080 }

fn default_concurrency() -> usize { AnalyticsConfig::default().lookup_concurrency }

impl ServerConfig {
  /// Engine settings derived from this configuration.
  pub fn analytics(&self) -> AnalyticsConfig {
    AnalyticsConfig {
      lookup_concurrency: self.lookup_concurrency,
      deadline: self.request_timeout_ms.map(Duration::from_millis),
      today: None,
    }
  }

  pub fn address(&self) -> String { format!("{}:{}", self.host, self.port) }
}

// ─── Application ──────────────────────────────────────────────────────────────

/// The API router with request tracing.
pub fn app<S>(engine: Arc<Analytics<S>>) -> Router
where
  S: HerdStore + 'static,
{
  herdlog_api::api_router(engine).layer(TraceLayer::new_for_http())
}
