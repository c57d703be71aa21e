//! # Schema Registry
//!
//! Every named request schema of the HTTP surface, keyed
//! `"<resource>.<operation>"`.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  handler ── registry.validate_into::<NewVendor>("vendors.create", body) │
//! │                │                                                        │
//! │                ├── unknown name   → CoreError::SchemaNotFound (500)     │
//! │                ├── bad payload    → CoreError::Validation     (400)     │
//! │                └── ok             → typed input                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Update schemas never carry the path id; handlers validate the path with
//! the matching `*.get` schema first.

use std::collections::HashMap;

use chrono::{Datelike, Utc};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::error::{CoreError, CoreResult};
use crate::types::{AcquisitionType, OrderStatus, PaymentMethod, PaymentType, PurchaseStatus};
use crate::validation::{Field, Schema};

const AT_LEAST_ONE: &str = "At least one field must be provided for update";

// =============================================================================
// Registry
// =============================================================================

/// Schemas by name.
#[derive(Debug, Clone, Default)]
pub struct SchemaRegistry {
    schemas: HashMap<String, Schema>,
}

impl SchemaRegistry {
    pub fn new() -> Self {
        SchemaRegistry::default()
    }

    /// The registry with every schema the API uses.
    pub fn standard() -> Self {
        let mut registry = SchemaRegistry::new();
        let all = users()
            .into_iter()
            .chain(products())
            .chain(orders())
            .chain(branches())
            .chain(inventory())
            .chain(employees())
            .chain(vehicles())
            .chain(warehouses())
            .chain(vendors())
            .chain(raw_materials())
            .chain(agencies());
        for schema in all {
            registry.register(schema);
        }
        registry
    }

    /// Adds a schema, replacing any previous one with the same name.
    pub fn register(&mut self, schema: Schema) {
        self.schemas.insert(schema.name().to_string(), schema);
    }

    pub fn get(&self, name: &str) -> CoreResult<&Schema> {
        self.schemas
            .get(name)
            .ok_or_else(|| CoreError::SchemaNotFound(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.schemas.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }

    /// Validates `data` against the named schema.
    pub fn validate(&self, name: &str, data: &Value) -> CoreResult<Map<String, Value>> {
        Ok(self.get(name)?.validate(data)?)
    }

    /// Validates and decodes into the typed input.
    pub fn validate_into<T: DeserializeOwned>(&self, name: &str, data: &Value) -> CoreResult<T> {
        let normalized = self.validate(name, data)?;
        serde_json::from_value(Value::Object(normalized)).map_err(|e| CoreError::Decode(e.to_string()))
    }
}

// =============================================================================
// Shared Field Builders
// =============================================================================

/// At least one lowercase letter, one uppercase letter and one digit.
pub fn is_strong_password(password: &str) -> bool {
    password.chars().any(|c| c.is_ascii_lowercase())
        && password.chars().any(|c| c.is_ascii_uppercase())
        && password.chars().any(|c| c.is_ascii_digit())
}

fn by_id(name: &str, label: &str) -> Schema {
    Schema::new(name).field(Field::integer("id").label(label).required().positive())
}

fn person_name(key: &'static str) -> Field {
    Field::string(key).min_len(2).max_len(50)
}

fn new_password(key: &'static str, label: &'static str, message: &'static str) -> Field {
    Field::string(key)
        .label(label)
        .required()
        .min_len(8)
        .check(is_strong_password, message)
}

fn optional_text(key: &'static str) -> Field {
    Field::string(key).nullable().allow_empty()
}

fn address_object() -> Field {
    Field::object(
        "address",
        vec![
            Field::string("street"),
            Field::string("city"),
            Field::string("state"),
            Field::string("postal_code"),
            Field::string("country"),
        ],
    )
}

// =============================================================================
// Users
// =============================================================================

fn users() -> Vec<Schema> {
    const STRENGTH: &str = "Password must contain at least one uppercase letter, one lowercase letter, and one number";
    vec![
        Schema::new("users.register")
            .field(person_name("first_name").required())
            .field(person_name("last_name").required())
            .field(Field::email("email").required())
            .field(new_password("password", "Password", STRENGTH))
            .field(
                Field::string("confirmPassword")
                    .label("Password confirmation")
                    .required()
                    .matches("password", "Passwords do not match"),
            )
            .field(
                Field::string("type")
                    .one_of(&["person", "organization"])
                    .default_value("person"),
            ),
        Schema::new("users.login")
            .field(Field::email("email").required())
            .field(Field::string("password").required()),
        Schema::new("users.updateProfile")
            .field(person_name("first_name"))
            .field(person_name("last_name"))
            .field(Field::email("email")),
        Schema::new("users.changePassword")
            .field(Field::string("currentPassword").label("Current password").required())
            .field(new_password(
                "newPassword",
                "New password",
                "New password must contain at least one uppercase letter, one lowercase letter, and one number",
            ))
            .field(
                Field::string("confirmNewPassword")
                    .label("New password confirmation")
                    .required()
                    .matches("newPassword", "New passwords do not match"),
            ),
        Schema::new("users.forgotPassword").field(Field::email("email").required()),
        Schema::new("users.resetPassword")
            .field(new_password("password", "Password", STRENGTH))
            .field(
                Field::string("confirmPassword")
                    .label("Password confirmation")
                    .required()
                    .matches("password", "Passwords do not match"),
            ),
        Schema::new("users.verifyEmail")
            .field(Field::email("email").required())
            .field(Field::string("code").label("Verification code").required().max_len(32)),
        Schema::new("users.resendVerificationCode").field(Field::email("email").required()),
    ]
}

// =============================================================================
// Products
// =============================================================================

fn products() -> Vec<Schema> {
    vec![
        by_id("products.get", "Product ID"),
        Schema::new("products.create")
            .field(Field::string("product_name").required().min_len(2).max_len(100))
            .field(optional_text("description").max_len(1000))
            .field(Field::integer("base_price_cents").label("Base price").required().positive()),
        Schema::new("products.update")
            .field(Field::string("product_name").min_len(2).max_len(100))
            .field(optional_text("description").max_len(1000))
            .field(Field::integer("base_price_cents").label("Base price").positive()),
        Schema::new("products.setMaterial")
            .field(Field::integer("raw_material_id").required().positive())
            .field(
                Field::number("quantity_needed")
                    .required()
                    .positive()
                    .precision(2),
            )
            .field(Field::string("unit_of_measure").required().max_len(20)),
    ]
}

// =============================================================================
// Orders
// =============================================================================

fn orders() -> Vec<Schema> {
    let item = Field::object(
        "item",
        vec![
            Field::integer("product_id").label("Product ID").required().positive(),
            Field::integer("quantity").required().positive(),
            Field::integer("price_cents").label("Price").required().positive(),
        ],
    );
    vec![
        by_id("orders.get", "Order ID"),
        Schema::new("orders.create")
            .field(Field::date("order_date").default_now())
            .field(Field::integer("total_amount_cents").label("Total amount").required().positive())
            .field(
                Field::string("status")
                    .one_of(OrderStatus::ALL)
                    .default_value("pending"),
            )
            .field(
                Field::array("orderItems", item)
                    .label("Order items")
                    .required()
                    .min_items(1, "Order must contain at least one item"),
            )
            .field(Field::string("shipping_address").max_len(200))
            .field(Field::string("shipping_city").max_len(50))
            .field(Field::string("shipping_postal_code").max_len(20))
            .field(Field::string("shipping_country").max_len(50)),
        Schema::new("orders.update")
            .field(Field::string("status").one_of(OrderStatus::ALL))
            .min_fields(1, AT_LEAST_ONE),
        Schema::new("orders.payment")
            .field(
                Field::string("payment_method")
                    .required()
                    .one_of(PaymentMethod::ALL),
            )
            .field(Field::integer("amount_cents").label("Amount").required().positive())
            .field(
                Field::string("payment_type")
                    .one_of(PaymentType::ALL)
                    .default_value("deposit"),
            )
            .field(Field::date("payment_date").default_now()),
    ]
}

// =============================================================================
// Branches
// =============================================================================

fn branches() -> Vec<Schema> {
    vec![
        by_id("branches.get", "Branch ID"),
        Schema::new("branches.create")
            .field(Field::string("branch_name").required().min_len(2).max_len(100))
            .field(Field::string("address").required().max_len(200))
            .field(Field::string("city").required().max_len(50))
            .field(Field::string("postal_code").max_len(20))
            .field(Field::string("country").required().max_len(50))
            .field(Field::string("phone").max_len(20))
            .field(Field::email("email")),
        Schema::new("branches.update")
            .field(Field::string("branch_name").min_len(2).max_len(100))
            .field(Field::string("address").max_len(200))
            .field(Field::string("city").max_len(50))
            .field(Field::string("postal_code").max_len(20))
            .field(Field::string("country").max_len(50))
            .field(Field::string("phone").max_len(20))
            .field(Field::email("email")),
        Schema::new("branches.expense")
            .field(Field::integer("category_id").label("Category ID").positive().nullable())
            .field(Field::integer("amount_cents").label("Amount").required().positive())
            .field(Field::date("date").default_now())
            .field(optional_text("description").max_len(500)),
    ]
}

// =============================================================================
// Inventory
// =============================================================================

fn inventory() -> Vec<Schema> {
    vec![
        Schema::new("inventory.upsert")
            .field(Field::integer("branch_id").required().positive())
            .field(Field::integer("raw_material_id").required().positive())
            .field(Field::number("quantity").required().non_negative().precision(2))
            .field(Field::integer("expected_version").positive()),
        Schema::new("inventory.byBranch").field(Field::integer("branch_id").required().positive()),
        Schema::new("inventory.byMaterial")
            .field(Field::integer("material_id").required().positive()),
        Schema::new("inventory.key")
            .field(Field::integer("branch_id").required().positive())
            .field(Field::integer("raw_material_id").required().positive()),
        Schema::new("inventory.adjust")
            .field(Field::number("delta").label("Adjustment").required().precision(2)),
    ]
}

// =============================================================================
// Employees
// =============================================================================

fn employees() -> Vec<Schema> {
    vec![
        by_id("employees.get", "Employee ID"),
        Schema::new("employees.create")
            .field(Field::integer("identity_card").required().positive())
            .field(person_name("first_name").required())
            .field(person_name("last_name").required())
            .field(Field::email("email").required())
            .field(Field::string("password").required().min_len(8).max_len(30))
            .field(Field::string("phone_number").max_len(20))
            .field(address_object())
            .field(Field::date("hire_date").default_now())
            .field(
                Field::integer("hourly_wage_cents")
                    .label("Hourly wage")
                    .required()
                    .non_negative(),
            )
            .field(Field::integer("branch_id").required().positive())
            .field(Field::integer("role_id").required().positive()),
        Schema::new("employees.update")
            .field(person_name("first_name"))
            .field(person_name("last_name"))
            .field(Field::email("email"))
            .field(Field::string("phone_number").max_len(20))
            .field(address_object())
            .field(Field::integer("hourly_wage_cents").label("Hourly wage").non_negative())
            .field(Field::integer("branch_id").positive())
            .field(Field::integer("role_id").positive())
            .field(Field::date("termination_date")),
        Schema::new("employees.shift")
            .field(Field::integer("branch_id").required().positive())
            .field(Field::date("date").required())
            .field(Field::string("start_time").required().check(is_clock_time, "Start time must be HH:MM"))
            .field(Field::string("end_time").required().check(is_clock_time, "End time must be HH:MM"))
            .field(Field::number("working_hours").required().non_negative().max(24))
            .field(Field::boolean("is_present").default_value(true)),
    ]
}

/// `HH:MM`, 24-hour clock.
fn is_clock_time(value: &str) -> bool {
    let Some((h, m)) = value.split_once(':') else {
        return false;
    };
    h.len() == 2
        && m.len() == 2
        && h.parse::<u8>().is_ok_and(|h| h < 24)
        && m.parse::<u8>().is_ok_and(|m| m < 60)
}

// =============================================================================
// Vehicles
// =============================================================================

fn vehicles() -> Vec<Schema> {
    let max_year = i64::from(Utc::now().year()) + 1;
    vec![
        Schema::new("vehicles.list")
            .field(Field::integer("org_id").label("Agency ID").positive()),
        by_id("vehicles.get", "Vehicle ID"),
        Schema::new("vehicles.create")
            .field(Field::string("vin").label("VIN").required().max_len(17))
            .field(Field::string("plate_number").required().max_len(20))
            .field(Field::string("make").required().max_len(50))
            .field(Field::string("model").required().max_len(50))
            .field(Field::integer("year").required().min(1900).max(max_year))
            .field(Field::integer("mileage").non_negative().default_value(0))
            .field(
                Field::string("acquisition_type")
                    .required()
                    .one_of(AcquisitionType::ALL),
            )
            .field(Field::date("acquisition_date").default_now())
            .field(
                Field::integer("purchase_price_cents")
                    .label("Purchase price")
                    .non_negative()
                    .default_value(0),
            )
            .field(optional_text("notes"))
            .field(Field::integer("org_id").label("Agency ID").positive().nullable()),
        Schema::new("vehicles.update")
            .field(Field::string("vin").label("VIN").max_len(17))
            .field(Field::string("plate_number").max_len(20))
            .field(Field::string("make").max_len(50))
            .field(Field::string("model").max_len(50))
            .field(Field::integer("year").min(1900).max(max_year))
            .field(Field::integer("mileage").non_negative())
            .field(Field::string("acquisition_type").one_of(AcquisitionType::ALL))
            .field(Field::date("acquisition_date"))
            .field(Field::integer("purchase_price_cents").label("Purchase price").non_negative())
            .field(optional_text("notes"))
            .field(Field::integer("org_id").label("Agency ID").positive().nullable()),
        Schema::new("vehicles.rental")
            .field(Field::integer("agency_id").required().positive())
            .field(Field::date("start_date").required())
            .field(
                Field::date("end_date")
                    .required()
                    .not_before("start_date", "End date cannot be before start date"),
            )
            .field(Field::integer("daily_rate_cents").label("Daily rate").required().positive()),
    ]
}

// =============================================================================
// Warehouses
// =============================================================================

fn warehouses() -> Vec<Schema> {
    vec![
        by_id("warehouses.get", "Warehouse ID"),
        Schema::new("warehouses.create")
            .field(Field::string("phone_number").max_len(20))
            .field(Field::string("address").required()),
        Schema::new("warehouses.update")
            .field(Field::string("phone_number").max_len(20))
            .field(Field::string("address")),
        Schema::new("warehouses.stock")
            .field(Field::integer("raw_material_id").required().positive())
            .field(Field::number("quantity").required().non_negative().precision(2)),
    ]
}

// =============================================================================
// Vendors
// =============================================================================

fn vendors() -> Vec<Schema> {
    vec![
        by_id("vendors.get", "Vendor ID"),
        Schema::new("vendors.create")
            .field(Field::string("vendor_name").required().min_len(2).max_len(100))
            .field(optional_text("phone").max_len(20))
            .field(Field::email("email").nullable().allow_empty())
            .field(optional_text("address"))
            .field(optional_text("country").max_len(50)),
        Schema::new("vendors.update")
            .field(Field::string("vendor_name").min_len(2).max_len(100))
            .field(optional_text("phone").max_len(20))
            .field(Field::email("email").nullable().allow_empty())
            .field(optional_text("address"))
            .field(optional_text("country").max_len(50))
            .min_fields(1, AT_LEAST_ONE),
    ]
}

// =============================================================================
// Raw Materials
// =============================================================================

fn raw_materials() -> Vec<Schema> {
    vec![
        Schema::new("rawMaterials.list").field(Field::integer("vendor_id").positive()),
        by_id("rawMaterials.get", "Raw material ID"),
        Schema::new("rawMaterials.create")
            .field(Field::string("material_name").required().min_len(2).max_len(100))
            .field(optional_text("description"))
            .field(Field::integer("vendor_id").positive().nullable()),
        Schema::new("rawMaterials.update")
            .field(Field::string("material_name").min_len(2).max_len(100))
            .field(optional_text("description"))
            .field(Field::integer("vendor_id").positive().nullable())
            .min_fields(1, AT_LEAST_ONE),
        Schema::new("rawMaterials.purchase")
            .field(Field::integer("vendor_id").required().positive())
            .field(Field::number("quantity").required().positive().precision(2))
            .field(Field::integer("unit_price_cents").label("Unit price").required().positive())
            .field(Field::date("purchase_date").default_now())
            .field(Field::date("delivery_date").nullable().not_before(
                "purchase_date",
                "Delivery date cannot be before purchase date",
            ))
            .field(
                Field::string("status")
                    .one_of(PurchaseStatus::ALL)
                    .default_value("pending"),
            ),
    ]
}

// =============================================================================
// Agencies
// =============================================================================

fn agencies() -> Vec<Schema> {
    vec![
        by_id("agencies.get", "Agency ID"),
        Schema::new("agencies.create")
            .field(Field::string("name").required().min_len(2).max_len(100))
            .field(optional_text("contact_info")),
        Schema::new("agencies.update")
            .field(Field::string("name").min_len(2).max_len(100))
            .field(optional_text("contact_info")),
    ]
}

// =============================================================================
// Unit Tests
// =============================================================================
