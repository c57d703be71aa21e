//! # Sweet Store API
//!
//! REST server for the Sweet Store back-office: catalog, orders, branches,
//! inventory, staff, suppliers and the delivery fleet.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Store API Layers                                │
//! │                                                                         │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │  Router (axum)         TraceLayer • CorsLayer • fallback 404     │  │
//! │  │   /api/v1/users  /products  /orders  /branches  /inventory       │  │
//! │  │   /employees  /raw-materials  /vendors  /warehouses              │  │
//! │  │   /agencies  /vehicles                                           │  │
//! │  └───────────────────────────────┬──────────────────────────────────┘  │
//! │                                  │                                      │
//! │  ┌────────────────┐  ┌───────────▼────────┐  ┌───────────────────────┐ │
//! │  │  auth          │  │  handlers          │  │  response / error     │ │
//! │  │  JWT, roles    │─►│  validate → repo   │─►│  JSON envelopes       │ │
//! │  └────────────────┘  └───────────┬────────┘  └───────────────────────┘ │
//! │                                  │                                      │
//! │  ┌───────────────────────────────▼──────────────────────────────────┐  │
//! │  │  AppState: Database • SchemaRegistry • JwtManager •              │  │
//! │  │            PasswordService • Mailer • ApiConfig                  │  │
//! │  └──────────────────────────────────────────────────────────────────┘  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration
//! Environment variables (or `store-api.toml`):
//! - `PORT` - HTTP port (default: 5000)
//! - `HOST` - Bind address (default: 0.0.0.0)
//! - `DATABASE_PATH` - SQLite file (default: ./sweet_store.db)
//! - `DB_MAX_CONNECTIONS` - Pool size (default: 5)
//! - `JWT_SECRET` - Secret for JWT signing (required in production)
//! - `JWT_EXPIRES_IN` - Token lifetime (default: 30d)
//! - `APP_ENV` - development | production | test (default: production)
//! - `EMAIL_FROM` - Sender of outgoing mail
//! - `RESET_TOKEN_TTL_MINUTES` - Password-reset code lifetime (default: 10)

pub mod auth;
pub mod config;
pub mod error;
pub mod mailer;
pub mod password;
pub mod response;
pub mod routes;
pub mod validate;

use std::sync::Arc;

use axum::middleware;
use axum::Router;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use store_core::SchemaRegistry;
use store_db::Database;

// Re-exports
pub use auth::JwtManager;
pub use config::ApiConfig;
pub use error::{ApiError, ApiResult};
pub use mailer::{LogMailer, Mailer};
pub use password::PasswordService;

/// Shared application state.
///
/// Built once at startup and cloned into every handler.
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub config: Arc<ApiConfig>,
    pub jwt: Arc<JwtManager>,
    pub passwords: Arc<PasswordService>,
    pub schemas: Arc<SchemaRegistry>,
    pub mailer: Arc<dyn Mailer>,
}

impl AppState {
    pub fn new(db: Database, config: ApiConfig, mailer: Arc<dyn Mailer>) -> Self {
        let jwt = JwtManager::new(config.jwt_secret.clone(), config.jwt_expires_in.duration());
        AppState {
            db,
            config: Arc::new(config),
            jwt: Arc::new(jwt),
            passwords: Arc::new(PasswordService::default()),
            schemas: Arc::new(SchemaRegistry::standard()),
            mailer,
        }
    }

    /// Validates `data` against the named schema and decodes it.
    pub fn validate<T: DeserializeOwned>(&self, schema: &str, data: &Value) -> ApiResult<T> {
        Ok(self.schemas.validate_into(schema, data)?)
    }
}

/// The full HTTP surface.
pub fn build_router(state: AppState) -> Router {
    let api = Router::new()
        .nest("/users", routes::users::router())
        .nest("/products", routes::products::router())
        .nest("/orders", routes::orders::router())
        .nest("/branches", routes::branches::router())
        .nest("/inventory", routes::inventory::router())
        .nest("/employees", routes::employees::router())
        .nest("/raw-materials", routes::raw_materials::router())
        .nest("/vendors", routes::vendors::router())
        .nest("/warehouses", routes::warehouses::router())
        .nest("/agencies", routes::agencies::router())
        .nest("/vehicles", routes::vehicles::router());

    let mut app = Router::new()
        .merge(routes::root_router())
        .nest("/api/v1", api)
        .fallback(routes::not_found);

    if state.config.app_env.is_development() {
        app = app.layer(middleware::from_fn(error::expose_error_details));
    }

    app.layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

#[cfg(test)]
pub(crate) mod testing;
