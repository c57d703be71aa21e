//! # store-core: Domain Layer for the Sweet Store Back-Office
//!
//! Records, typed inputs, money arithmetic and request validation, with no
//! I/O of any kind.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     Sweet Store Architecture                            │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                store-api (axum REST service)                    │   │
//! │  │   auth gate ──► schema validation ──► handler ──► envelope      │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ store-core (THIS CRATE) ★                       │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌────────────┐  ┌───────────┐  │   │
//! │  │   │   types   │  │   money   │  │ validation │  │  schemas  │  │   │
//! │  │   │  records  │  │   Money   │  │   Schema   │  │ registry  │  │   │
//! │  │   │  inputs   │  │  (cents)  │  │   Field    │  │  by name  │  │   │
//! │  │   └───────────┘  └───────────┘  └────────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK                             │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                store-db (Database Layer)                        │   │
//! │  │         SQLite pool, migrations, repositories, units            │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Records and request inputs per resource
//! - [`money`] - Integer-cents money
//! - [`error`] - Domain and validation errors
//! - [`validation`] - The declarative schema engine
//! - [`schemas`] - Every named request schema
//!
//! ## Example Usage
//!
//! ```rust
//! use serde_json::json;
//! use store_core::{NewProduct, SchemaRegistry};
//!
//! let registry = SchemaRegistry::standard();
//! let product: NewProduct = registry
//!     .validate_into(
//!         "products.create",
//!         &json!({ "product_name": "Baklava", "base_price_cents": 450 }),
//!     )
//!     .unwrap();
//! assert_eq!(product.base_price_cents, 450);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod money;
pub mod schemas;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, CoreResult, ValidationError, ValidationErrors};
pub use money::Money;
pub use schemas::SchemaRegistry;
pub use types::*;
pub use validation::{Field, Schema};

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Lifetime of a password-reset token.
pub const DEFAULT_RESET_TOKEN_TTL_MINUTES: i64 = 10;

/// Digits in an email verification code.
pub const VERIFICATION_CODE_LENGTH: usize = 6;
