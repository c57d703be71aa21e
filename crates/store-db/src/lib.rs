//! # store-db: Database Layer for the Sweet Store Back-Office
//!
//! SQLite access for every resource the API exposes, through sqlx.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Sweet Store Data Flow                            │
//! │                                                                         │
//! │  axum handler (POST /raw-materials)                                    │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     store-db (THIS CRATE)                       │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │   Database    │    │  Repositories │    │  Migrations  │  │   │
//! │  │   │   (pool.rs)   │    │  one per      │    │  (embedded)  │  │   │
//! │  │   │               │◄───│  resource     │    │              │  │   │
//! │  │   │  SqlitePool   │    │               │    │ 001_schema   │  │   │
//! │  │   └───────────────┘    └───────┬───────┘    │ 002_refdata  │  │   │
//! │  │                                │            └──────────────┘  │   │
//! │  │                        ┌───────▼───────┐                       │   │
//! │  │                        │   unit.rs     │ BEGIN … COMMIT        │   │
//! │  │                        │  atomically   │ or ROLLBACK           │   │
//! │  │                        └───────────────┘                       │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`unit`] - Atomic multi-write units and their step helpers
//! - [`repository`] - One repository per resource
//!
//! ## Usage
//!
//! ```rust,ignore
//! use store_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("sweet_store.db")).await?;
//! let vendors = db.vendors().list().await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;
pub mod unit;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};
pub use repository::*;
