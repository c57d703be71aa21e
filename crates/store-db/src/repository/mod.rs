//! # Repository Module
//!
//! One repository per resource, each holding a clone of the pool.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Repository Shape                                     │
//! │                                                                         │
//! │  axum handler                                                          │
//! │       │  db.vendors().update(id, patch)                                │
//! │       ▼                                                                 │
//! │  VendorRepository                                                      │
//! │  ├── list()            all rows, optional filter, related rows         │
//! │  ├── get(id)           Option<T>                                       │
//! │  ├── create(input)     T                                               │
//! │  ├── update(id, patch) T   (None keeps the stored value)               │
//! │  └── delete(id)        refused while dependents exist                  │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite (single statements, or unit::atomically for several)           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Merge on Update
//! Patches bind `Option` values into `COALESCE(?, column)`, so a field that
//! is omitted or null keeps its current value and a supplied value
//! (including an empty string) overwrites it.
//!
//! ## Guarded Deletes
//! Dependent counts and the delete itself run in one unit, so a dependent
//! inserted concurrently cannot slip between the check and the delete.

pub mod agency;
pub mod branch;
pub mod employee;
pub mod inventory;
pub mod order;
pub mod people;
pub mod product;
pub mod raw_material;
pub mod vehicle;
pub mod vendor;
pub mod warehouse;

pub use agency::AgencyRepository;
pub use branch::BranchRepository;
pub use employee::EmployeeRepository;
pub use inventory::{InventoryRepository, UpsertOutcome};
pub use order::OrderRepository;
pub use people::{NewCustomerAccount, PeopleRepository, VerificationState};
pub use product::ProductRepository;
pub use raw_material::RawMaterialRepository;
pub use vehicle::VehicleRepository;
pub use vendor::VendorRepository;
pub use warehouse::WarehouseRepository;

// =============================================================================
// Existence Probes
// =============================================================================
// Shared by repositories that check a referenced row before writing.

pub(crate) const BRANCH_EXISTS: &str = "SELECT EXISTS(SELECT 1 FROM branch WHERE branch_id = ?)";
pub(crate) const VENDOR_EXISTS: &str = "SELECT EXISTS(SELECT 1 FROM vendor WHERE vendor_id = ?)";
pub(crate) const AGENCY_EXISTS: &str = "SELECT EXISTS(SELECT 1 FROM agency WHERE agency_id = ?)";
pub(crate) const PRODUCT_EXISTS: &str =
    "SELECT EXISTS(SELECT 1 FROM product WHERE product_id = ?)";
pub(crate) const RAW_MATERIAL_EXISTS: &str =
    "SELECT EXISTS(SELECT 1 FROM raw_material WHERE raw_material_id = ?)";
pub(crate) const ROLE_EXISTS: &str = "SELECT EXISTS(SELECT 1 FROM role WHERE role_id = ?)";
