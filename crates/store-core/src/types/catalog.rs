//! Products, their recipes, and customer orders with shipping and payments.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use super::people::Person;
use crate::error::{CoreError, CoreResult};
use crate::money::Money;

// =============================================================================
// Products
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Product {
    pub product_id: i64,
    pub product_name: String,
    pub description: Option<String>,
    pub base_price_cents: i64,
}

impl Product {
    pub fn base_price(&self) -> Money {
        Money::from_cents(self.base_price_cents)
    }
}

/// One raw material a product's recipe calls for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct ProductMaterial {
    pub raw_material_id: i64,
    pub material_name: String,
    pub quantity_needed: f64,
    pub unit_of_measure: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProductDetail {
    #[serde(flatten)]
    pub product: Product,
    pub materials: Vec<ProductMaterial>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewProduct {
    pub product_name: String,
    pub description: Option<String>,
    pub base_price_cents: i64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProductPatch {
    pub product_name: Option<String>,
    pub description: Option<String>,
    pub base_price_cents: Option<i64>,
}

/// `PUT /products/{id}/materials`
#[derive(Debug, Clone, Deserialize)]
pub struct RecipeLine {
    pub raw_material_id: i64,
    pub quantity_needed: f64,
    pub unit_of_measure: String,
}

// =============================================================================
// Order Status
// =============================================================================

/// Lifecycle of an order, tracked on its shipping record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum OrderStatus {
    #[default]
    Pending,
    Processing,
    Shipped,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    pub const ALL: &'static [&'static str] =
        &["pending", "processing", "shipped", "delivered", "cancelled"];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum PaymentMethod {
    Cash,
    Card,
    BankTransfer,
}

impl PaymentMethod {
    pub const ALL: &'static [&'static str] = &["cash", "card", "bank_transfer"];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum PaymentType {
    #[default]
    Deposit,
    Balance,
}

impl PaymentType {
    pub const ALL: &'static [&'static str] = &["deposit", "balance"];
}

// =============================================================================
// Orders
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Order {
    pub order_id: i64,
    pub customer_id: i64,
    #[ts(as = "String")]
    pub order_date: DateTime<Utc>,
    pub total_amount_cents: i64,
    pub discount_cents: i64,
    pub deposit_paid_cents: i64,
    pub address: Option<String>,
}

impl Order {
    pub fn total(&self) -> Money {
        Money::from_cents(self.total_amount_cents)
    }

    pub fn paid(&self) -> Money {
        Money::from_cents(self.deposit_paid_cents)
    }

    /// Amount still owed after discount and payments so far.
    pub fn outstanding(&self) -> Money {
        (self.total() - Money::from_cents(self.discount_cents)).remaining_after(self.paid())
    }

    /// Refuses a payment larger than what is still owed.
    pub fn accept_payment(&self, amount: Money) -> CoreResult<Money> {
        let outstanding = self.outstanding();
        if amount > outstanding {
            return Err(CoreError::Overpayment {
                attempted: amount.to_string(),
                outstanding: outstanding.to_string(),
            });
        }
        Ok(self.paid() + amount)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct OrderLine {
    pub order_line_number: i64,
    pub order_id: i64,
    pub product_id: i64,
    pub quantity: i64,
    pub unit_price_cents: i64,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl OrderLine {
    pub fn line_total(&self) -> Money {
        Money::from_cents(self.unit_price_cents).multiply_quantity(self.quantity)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Shipping {
    pub shipping_id: i64,
    pub order_id: i64,
    pub address: String,
    pub city: Option<String>,
    pub postal_code: Option<String>,
    pub country: Option<String>,
    pub shipping_method: Option<String>,
    pub tracking_number: Option<String>,
    #[ts(as = "Option<String>")]
    pub shipping_date: Option<DateTime<Utc>>,
    #[ts(as = "Option<String>")]
    pub estimated_delivery: Option<DateTime<Utc>>,
    pub shipping_status: OrderStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Payment {
    pub payment_id: i64,
    pub order_id: i64,
    #[ts(as = "String")]
    pub payment_date: DateTime<Utc>,
    pub payment_method: PaymentMethod,
    pub amount_cents: i64,
    pub payment_type: PaymentType,
}

/// An order with everything hanging off it.
#[derive(Debug, Clone, Serialize)]
pub struct OrderDetail {
    #[serde(flatten)]
    pub order: Order,
    #[serde(rename = "orderDetails")]
    pub lines: Vec<OrderLine>,
    pub shipping: Option<Shipping>,
    pub payments: Vec<Payment>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer: Option<Person>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewOrderItem {
    pub product_id: i64,
    pub quantity: i64,
    pub price_cents: i64,
}

/// `POST /orders`
#[derive(Debug, Clone, Deserialize)]
pub struct NewOrder {
    pub order_date: DateTime<Utc>,
    pub total_amount_cents: i64,
    #[serde(default)]
    pub status: OrderStatus,
    #[serde(rename = "orderItems")]
    pub items: Vec<NewOrderItem>,
    pub shipping_address: Option<String>,
    pub shipping_city: Option<String>,
    pub shipping_postal_code: Option<String>,
    pub shipping_country: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OrderPatch {
    pub status: Option<OrderStatus>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewPayment {
    pub payment_method: PaymentMethod,
    pub amount_cents: i64,
    #[serde(default)]
    pub payment_type: PaymentType,
    pub payment_date: DateTime<Utc>,
}
