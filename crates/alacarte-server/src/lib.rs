//! HTTP surface of the alacarte catalog.
//!
//! Exposes an axum [`Router`] over any [`Store`], authenticated with session
//! tokens issued after Google sign-in.

pub mod auth;
pub mod error;
pub mod google;
pub mod handlers;
pub mod token;

pub use error::Error;

use std::{path::PathBuf, sync::Arc};

use alacarte_core::{
  catalog::Catalog, directory::UserDirectory, engine::RatingEngine, identity::IdentityProvider,
  store::Store,
};
use axum::{
  Router,
  http::{HeaderValue, Method, header},
  routing::{delete, get, patch, post, put},
};
use serde::Deserialize;
use tower_http::{
  cors::{AllowOrigin, CorsLayer},
  trace::TraceLayer,
};

use handlers::{admin, items, ratings, session, stats, users};
use token::{TokenError, TokenService};

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml` and
/// `ALACARTE_*` environment variables.
#[derive(Deserialize, Clone)]
pub struct ServerConfig {
  pub host:                String,
  pub port:                u16,
  pub store_path:          PathBuf,
  /// OAuth client id that Google ID tokens must be issued for.
  pub google_client_id:    String,
  /// Secret the session-token MAC key is derived from.
  pub token_secret:        String,
  #[serde(default = "default_token_ttl_hours")]
  pub token_ttl_hours:     i64,
  /// Account that always has admin rights and cannot be demoted.
  #[serde(default)]
  pub initial_admin_email: Option<String>,
  /// CORS origins; empty means the local development defaults.
  #[serde(default)]
  pub allowed_origins:     Vec<String>,
}

fn default_token_ttl_hours() -> i64 { 24 }

const DEV_ORIGINS: [&str; 2] = ["http://localhost:3000", "http://localhost:8080"];

// ─── Application state ────────────────────────────────────────────────────────

/// Shared state threaded through all axum handlers.
pub struct AppState<S: Store> {
  pub store:    Arc<S>,
  pub config:   Arc<ServerConfig>,
  pub tokens:   Arc<TokenService>,
  pub identity: Arc<dyn IdentityProvider>,
}

impl<S: Store> Clone for AppState<S> {
  fn clone(&self) -> Self {
    Self {
      store:    Arc::clone(&self.store),
      config:   Arc::clone(&self.config),
      tokens:   Arc::clone(&self.tokens),
      identity: Arc::clone(&self.identity),
    }
  }
}

impl<S: Store> AppState<S> {
  pub fn new(
    store: Arc<S>,
    config: ServerConfig,
    identity: Arc<dyn IdentityProvider>,
  ) -> Result<Self, TokenError> {
    let ttl = chrono::Duration::hours(config.token_ttl_hours);
    let tokens = TokenService::new(&config.token_secret, ttl)?;
    Ok(Self {
      store,
      config: Arc::new(config),
      tokens: Arc::new(tokens),
      identity,
    })
  }

  pub fn ratings(&self) -> RatingEngine<S> { RatingEngine::new(Arc::clone(&self.store)) }

  pub fn catalog(&self) -> Catalog<S> { Catalog::new(Arc::clone(&self.store)) }

  pub fn users(&self) -> UserDirectory<S> {
    UserDirectory::new(Arc::clone(&self.store), self.config.initial_admin_email.clone())
  }
}

// ─── Router ───────────────────────────────────────────────────────────────────

fn cors_layer(configured: &[String]) -> CorsLayer {
  let origins: Vec<HeaderValue> = if configured.is_empty() {
    DEV_ORIGINS.into_iter().map(HeaderValue::from_static).collect()
  } else {
    configured
      .iter()
      .filter_map(|o| match o.parse::<HeaderValue>() {
        Ok(v) => Some(v),
        Err(_) => {
          tracing::warn!(origin = %o, "ignoring invalid CORS origin");
          None
        }
      })
      .collect()
  };
  CorsLayer::new()
    .allow_origin(AllowOrigin::list(origins))
    .allow_methods([
      Method::GET,
      Method::POST,
      Method::PUT,
      Method::PATCH,
      Method::DELETE,
      Method::OPTIONS,
    ])
    .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
    .allow_credentials(true)
}

/// Build the application [`Router`].
pub fn router<S>(state: AppState<S>) -> Router
where
  S: Store + 'static,
{
  let cors = cors_layer(&state.config.allowed_origins);
  Router::new()
    .route("/health", get(session::health))
    // Sign-in and profile setup
    .route("/auth/google", post(session::google_sign_in::<S>))
    .route("/profile/complete", post(session::complete_profile::<S>))
    .route("/profile/check-display-name", get(session::check_display_name::<S>))
    .route("/api/auth/check-admin", get(session::check_admin::<S>))
    // Users
    .route(
      "/api/user/me",
      get(users::me).patch(users::update_me::<S>).delete(users::delete_me::<S>),
    )
    .route("/api/users/shareable", get(users::shareable::<S>))
    // Catalog
    .route("/api/items/{item_type}/new", post(items::create::<S>))
    .route("/api/items/{item_type}/all", get(items::list::<S>))
    .route("/api/items/{item_type}/{id}", get(items::get_one::<S>).put(items::update::<S>))
    // Ratings
    .route("/api/ratings/new", post(ratings::create::<S>))
    .route("/api/ratings/author/{user_id}", get(ratings::by_author::<S>))
    .route("/api/ratings/viewer/{user_id}", get(ratings::by_viewer::<S>))
    .route("/api/ratings/item/{item_type}/{id}", get(ratings::by_item::<S>))
    .route("/api/ratings/bulk/private", put(ratings::bulk_private::<S>))
    .route("/api/ratings/bulk/unshare/{user_id}", put(ratings::bulk_unshare::<S>))
    .route("/api/ratings/{id}", put(ratings::edit::<S>).delete(ratings::remove::<S>))
    .route("/api/ratings/{id}/share", put(ratings::share::<S>))
    .route("/api/ratings/{id}/hide", put(ratings::hide::<S>))
    .route("/api/stats/community/{item_type}/{id}", get(stats::community::<S>))
    // Administration
    .route("/admin/users", get(admin::list_users::<S>))
    .route("/admin/users/{id}", get(admin::user_details::<S>).delete(admin::delete_user::<S>))
    .route("/admin/users/{id}/delete-impact", get(admin::user_delete_impact::<S>))
    .route("/admin/users/{id}/promote", patch(admin::promote::<S>))
    .route("/admin/users/{id}/demote", patch(admin::demote::<S>))
    .route("/admin/items/{item_type}/{id}", delete(admin::delete_item::<S>))
    .route("/admin/items/{item_type}/{id}/delete-impact", get(admin::item_delete_impact::<S>))
    .route("/admin/items/{item_type}/{id}/image", put(admin::set_item_image::<S>))
    .layer(TraceLayer::new_for_http())
    .layer(cors)
    .with_state(state)
}
