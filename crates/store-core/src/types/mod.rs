//! # Domain Types
//!
//! Records read from the database and the typed inputs decoded from
//! validated requests.
//!
//! ## Type Map
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  people     Person ──┬── CustomerProfile      Identity (auth)          │
//! │                      └── (employee, user_account share the id)         │
//! │                                                                         │
//! │  org        Branch, BranchExpense, Role, EmployeeSummary, Shift,       │
//! │             Phone, Address                                             │
//! │                                                                         │
//! │  catalog    Product, ProductMaterial, Order, OrderLine, Shipping,      │
//! │             Payment                                                    │
//! │                                                                         │
//! │  supply     Vendor, RawMaterial, Purchase, InventoryLevel,             │
//! │             Warehouse, WarehouseStock                                  │
//! │                                                                         │
//! │  fleet      Agency, Vehicle, Rental                                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Conventions
//! - Records derive `FromRow` behind the `sqlx` feature and export
//!   TypeScript bindings.
//! - `*Detail` types flatten a record and attach related rows.
//! - `New*` inputs are created from validated payloads; `*Patch` inputs use
//!   `Option` fields where `None` (absent or null) keeps the stored value.
//! - Money is integer cents; raw-material quantities are `f64` with at most
//!   two decimal places.

pub mod catalog;
pub mod fleet;
pub mod org;
pub mod people;
pub mod supply;

pub use catalog::*;
pub use fleet::*;
pub use org::*;
pub use people::*;
pub use supply::*;
