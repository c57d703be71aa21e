//! Route modules, one per resource, mounted under `/api/v1`.
//!
//! ## Access Levels
//! ```text
//! ┌──────────────────┬────────────────────┬──────────────────────────────┐
//! │ Resource         │ Reads              │ Writes                       │
//! ├──────────────────┼────────────────────┼──────────────────────────────┤
//! │ users            │ customer (profile) │ public (auth) / customer     │
//! │ products         │ public             │ employee                     │
//! │ orders           │ authenticated      │ customer create, owner/staff │
//! │ branches         │ public             │ employee                     │
//! │ inventory        │ employee           │ employee                     │
//! │ employees        │ employee           │ employee                     │
//! │ raw-materials    │ public             │ employee                     │
//! │ vendors          │ public             │ employee                     │
//! │ warehouses       │ public             │ employee                     │
//! │ agencies         │ public             │ employee                     │
//! │ vehicles         │ public             │ employee                     │
//! └──────────────────┴────────────────────┴──────────────────────────────┘
//! ```

pub mod agencies;
pub mod branches;
pub mod employees;
pub mod inventory;
pub mod orders;
pub mod products;
pub mod raw_materials;
pub mod users;
pub mod vehicles;
pub mod vendors;
pub mod warehouses;

use axum::extract::State;
use axum::http::Uri;
use axum::routing::get;
use axum::Router;
use serde_json::json;

use crate::error::{ApiError, ApiResult, ErrorCode};
use crate::response::Reply;
use crate::AppState;

/// `GET /` and `GET /health`.
pub fn root_router() -> Router<AppState> {
    Router::new()
        .route("/", get(welcome))
        .route("/health", get(health))
}

async fn welcome() -> Reply {
    Reply::ok().message("Welcome to Sweet Store API")
}

async fn health(State(state): State<AppState>) -> ApiResult<Reply> {
    if state.db.health_check().await {
        let (embedded, applied) = state.db.migration_status().await?;
        Ok(Reply::ok().data(
            "health",
            json!({
                "database": "up",
                "migrations": { "embedded": embedded, "applied": applied }
            }),
        ))
    } else {
        Err(ApiError::new(ErrorCode::Unavailable, "Database is unavailable"))
    }
}

pub async fn not_found(uri: Uri) -> ApiError {
    ApiError::not_found(format!("Can't find {} on this server!", uri.path()))
}
