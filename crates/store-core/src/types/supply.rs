//! Vendors, raw materials, purchases, branch inventory and warehouse stock.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

// =============================================================================
// Vendors
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Vendor {
    pub vendor_id: i64,
    pub vendor_name: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub country: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct VendorDetail {
    #[serde(flatten)]
    pub vendor: Vendor,
    pub materials: Vec<RawMaterial>,
    pub purchases: Vec<Purchase>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewVendor {
    pub vendor_name: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub country: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct VendorPatch {
    pub vendor_name: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub country: Option<String>,
}

// =============================================================================
// Raw Materials
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct RawMaterial {
    pub raw_material_id: i64,
    pub material_name: String,
    pub description: Option<String>,
    pub vendor_id: Option<i64>,
    #[ts(as = "String")]
    pub last_updated: DateTime<Utc>,
}

/// A raw material with its supplier, purchase history and stock.
#[derive(Debug, Clone, Serialize)]
pub struct RawMaterialDetail {
    #[serde(flatten)]
    pub material: RawMaterial,
    pub vendor: Option<Vendor>,
    pub purchases: Vec<Purchase>,
    pub inventory: Vec<InventoryLevel>,
}

/// List entry: the material and its supplier.
#[derive(Debug, Clone, Serialize)]
pub struct RawMaterialWithVendor {
    #[serde(flatten)]
    pub material: RawMaterial,
    pub vendor: Option<Vendor>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewRawMaterial {
    pub material_name: String,
    pub description: Option<String>,
    pub vendor_id: Option<i64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawMaterialPatch {
    pub material_name: Option<String>,
    pub description: Option<String>,
    pub vendor_id: Option<i64>,
}

/// `GET /raw-materials?vendor_id=`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawMaterialFilter {
    pub vendor_id: Option<i64>,
}

// =============================================================================
// Purchases
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum PurchaseStatus {
    #[default]
    Pending,
    Delivered,
    Cancelled,
}

impl PurchaseStatus {
    pub const ALL: &'static [&'static str] = &["pending", "delivered", "cancelled"];
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Purchase {
    pub purchase_id: i64,
    pub raw_material_id: i64,
    pub vendor_id: i64,
    pub quantity: f64,
    pub unit_price_cents: i64,
    #[ts(as = "String")]
    pub purchase_date: DateTime<Utc>,
    #[ts(as = "Option<String>")]
    pub delivery_date: Option<DateTime<Utc>>,
    pub status: PurchaseStatus,
}

/// `POST /raw-materials/{id}/purchases`
#[derive(Debug, Clone, Deserialize)]
pub struct NewPurchase {
    pub vendor_id: i64,
    pub quantity: f64,
    pub unit_price_cents: i64,
    pub purchase_date: DateTime<Utc>,
    pub delivery_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub status: PurchaseStatus,
}

// =============================================================================
// Branch Inventory
// =============================================================================

/// Stock of one material at one branch, named on both sides.
///
/// `version` increases on every write; clients echo it back as
/// `expected_version` to detect concurrent modification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct InventoryLevel {
    pub branch_id: i64,
    pub branch_name: String,
    pub raw_material_id: i64,
    pub material_name: String,
    pub quantity: f64,
    pub version: i64,
    #[ts(as = "String")]
    pub last_updated: DateTime<Utc>,
}

/// `POST /inventory`
#[derive(Debug, Clone, Deserialize)]
pub struct InventoryUpsert {
    pub branch_id: i64,
    pub raw_material_id: i64,
    pub quantity: f64,
    pub expected_version: Option<i64>,
}

/// `POST /inventory/{branch_id}/{raw_material_id}/adjust`
#[derive(Debug, Clone, Deserialize)]
pub struct InventoryAdjustment {
    pub delta: f64,
}

/// Path key of one inventory row.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct InventoryKey {
    pub branch_id: i64,
    pub raw_material_id: i64,
}

// =============================================================================
// Warehouses
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Warehouse {
    pub warehouse_id: i64,
    pub phone_number: Option<String>,
    pub address: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct WarehouseStock {
    pub warehouse_id: i64,
    pub raw_material_id: i64,
    pub material_name: String,
    pub quantity: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct WarehouseDetail {
    #[serde(flatten)]
    pub warehouse: Warehouse,
    pub stock: Vec<WarehouseStock>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewWarehouse {
    pub phone_number: Option<String>,
    pub address: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct WarehousePatch {
    pub phone_number: Option<String>,
    pub address: Option<String>,
}

/// `PUT /warehouses/{id}/stock`
#[derive(Debug, Clone, Deserialize)]
pub struct StockLevel {
    pub raw_material_id: i64,
    pub quantity: f64,
}
