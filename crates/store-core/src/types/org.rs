//! Branches, roles and staff.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use super::supply::InventoryLevel;
use crate::money::Money;

// =============================================================================
// Branch
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Branch {
    pub branch_id: i64,
    pub branch_name: String,
    pub address: String,
    pub city: String,
    pub postal_code: Option<String>,
    pub country: String,
    pub phone: Option<String>,
    pub email: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct BranchExpense {
    pub expense_id: i64,
    pub branch_id: i64,
    pub category_id: Option<i64>,
    pub amount_cents: i64,
    #[ts(as = "String")]
    pub date: DateTime<Utc>,
    pub description: Option<String>,
}

impl BranchExpense {
    pub fn amount(&self) -> Money {
        Money::from_cents(self.amount_cents)
    }
}

/// A branch with its stock levels and expenses.
#[derive(Debug, Clone, Serialize)]
pub struct BranchDetail {
    #[serde(flatten)]
    pub branch: Branch,
    pub inventory: Vec<InventoryLevel>,
    pub expenses: Vec<BranchExpense>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewBranch {
    pub branch_name: String,
    pub address: String,
    pub city: String,
    pub postal_code: Option<String>,
    pub country: String,
    pub phone: Option<String>,
    pub email: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BranchPatch {
    pub branch_name: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub postal_code: Option<String>,
    pub country: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewExpense {
    pub category_id: Option<i64>,
    pub amount_cents: i64,
    pub date: DateTime<Utc>,
    pub description: Option<String>,
}

// =============================================================================
// Roles
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Role {
    pub role_id: i64,
    pub name: String,
    pub description: Option<String>,
}

// =============================================================================
// Employees
// =============================================================================

/// Employee row joined with the person, branch and role it points at.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct EmployeeSummary {
    pub id: i64,
    pub identity_card: Option<i64>,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    #[ts(as = "String")]
    pub hire_date: DateTime<Utc>,
    #[ts(as = "Option<String>")]
    pub termination_date: Option<DateTime<Utc>>,
    pub hourly_wage_cents: i64,
    pub branch_id: i64,
    pub branch_name: String,
    pub role_id: i64,
    pub role_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Phone {
    pub phone_id: i64,
    pub owner_id: i64,
    #[serde(rename = "type")]
    #[cfg_attr(feature = "sqlx", sqlx(rename = "type"))]
    pub kind: String,
    pub number: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Address {
    pub address_id: i64,
    pub person_id: i64,
    pub street: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub postal_code: Option<String>,
    pub country: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Shift {
    pub shift_id: i64,
    pub employee_id: i64,
    pub branch_id: i64,
    #[ts(as = "String")]
    pub date: DateTime<Utc>,
    pub start_time: String,
    pub end_time: String,
    pub working_hours: f64,
    pub is_present: bool,
}

/// Everything `GET /employees/{id}` returns.
#[derive(Debug, Clone, Serialize)]
pub struct EmployeeDetail {
    #[serde(flatten)]
    pub employee: EmployeeSummary,
    pub phone: Option<Phone>,
    pub address: Option<Address>,
    pub shifts: Vec<Shift>,
}

/// Address fields as sent by clients; every part optional.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AddressInput {
    pub street: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub postal_code: Option<String>,
    pub country: Option<String>,
}

/// `POST /employees`. The password is hashed by the caller before storage.
#[derive(Clone, Deserialize)]
pub struct NewEmployee {
    pub identity_card: i64,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password: String,
    pub phone_number: Option<String>,
    pub address: Option<AddressInput>,
    pub hire_date: DateTime<Utc>,
    pub hourly_wage_cents: i64,
    pub branch_id: i64,
    pub role_id: i64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EmployeePatch {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone_number: Option<String>,
    pub address: Option<AddressInput>,
    pub hourly_wage_cents: Option<i64>,
    pub branch_id: Option<i64>,
    pub role_id: Option<i64>,
    pub termination_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewShift {
    pub branch_id: i64,
    pub date: DateTime<Utc>,
    pub start_time: String,
    pub end_time: String,
    pub working_hours: f64,
    pub is_present: bool,
}
