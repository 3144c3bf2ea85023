//! Server assembly for the placement portal: configuration, shared state,
//! and the top-level router.

pub mod seed;

use std::{
  path::{Path, PathBuf},
  sync::Arc,
};

use anyhow::Context as _;
use axum::Router;
use chrono::Duration;
use placement_api::{AppState, TokenKeys, api_router, token::DEFAULT_TTL_HOURS};
use placement_core::{Portal, store::PortalStore};
use serde::Deserialize;
use tower_http::trace::TraceLayer;

/// Shortest accepted signing secret, in bytes.
const MIN_SECRET_LEN: usize = 16;

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml` layered
/// with `PLACEMENT_*` environment variables.
#[derive(Deserialize, Clone)]
pub struct ServerConfig {
  #[serde(default = "default_host")]
  pub host:            String,
  #[serde(default = "default_port")]
  pub port:            u16,
  #[serde(default = "default_store_path")]
  pub store_path:      PathBuf,
  /// HS256 signing secret for bearer tokens.
  pub jwt_secret:      String,
  #[serde(default = "default_token_ttl_hours")]
  pub token_ttl_hours: i64,
}

fn default_host() -> String { "127.0.0.1".to_string() }

fn default_port() -> u16 { 5000 }

fn default_store_path() -> PathBuf { PathBuf::from("placement.db") }

fn default_token_ttl_hours() -> i64 { DEFAULT_TTL_HOURS }

impl ServerConfig {
  /// Read `path` (optional) and the environment.
  pub fn load(path: &Path) -> anyhow::Result<Self> {
    let settings = config::Config::builder()
      .add_source(config::File::from(path).required(false))
      .add_source(config::Environment::with_prefix("PLACEMENT").try_parsing(true))
      .build()
      .context("failed to read config file")?;

    let cfg: ServerConfig = settings
      .try_deserialize()
      .context("failed to deserialise ServerConfig")?;
    cfg.check()?;
    Ok(cfg)
  }

  fn check(&self) -> anyhow::Result<()> {
    if self.jwt_secret.len() < MIN_SECRET_LEN {
      anyhow::bail!("jwt_secret must be at least {MIN_SECRET_LEN} bytes");
    }
    if self.token_ttl_hours <= 0 {
      anyhow::bail!("token_ttl_hours must be positive");
    }
    Ok(())
  }

  pub fn address(&self) -> String { format!("{}:{}", self.host, self.port) }

  pub fn token_keys(&self) -> TokenKeys {
    TokenKeys::new(
      self.jwt_secret.as_bytes(),
      Duration::hours(self.token_ttl_hours),
    )
  }
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// Shared handler state over `store`.
pub fn state<S: PortalStore>(store: S, cfg: &ServerConfig) -> AppState<S> {
  AppState {
    portal: Portal::new(Arc::new(store)),
    tokens: Arc::new(cfg.token_keys()),
  }
}

/// The full HTTP application: the API under `/api`, with request tracing.
pub fn app<S: PortalStore + 'static>(state: AppState<S>) -> Router {
  Router::new()
    .nest("/api", api_router(state))
    .layer(TraceLayer::new_for_http())
}

/// Expand a leading `~` to the user's home directory.
pub fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}
