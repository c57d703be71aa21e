//! Identities: the base person/organization row, customer accounts and the
//! authenticated [`Identity`] that handlers authorize against.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

// =============================================================================
// Party Kind
// =============================================================================

/// Whether an identity is an individual or a company.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum PartyKind {
    #[default]
    Person,
    Organization,
}

// =============================================================================
// Person
// =============================================================================

/// Base identity row. Customers and employees share its id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Person {
    pub id: i64,
    pub identity_card: Option<i64>,
    pub first_name: String,
    pub last_name: String,
    #[serde(rename = "type")]
    #[cfg_attr(feature = "sqlx", sqlx(rename = "type"))]
    pub kind: PartyKind,
    pub email: String,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl Person {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// What a customer sees about their own account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct CustomerProfile {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    #[serde(rename = "type")]
    #[cfg_attr(feature = "sqlx", sqlx(rename = "type"))]
    pub kind: PartyKind,
    #[ts(as = "String")]
    pub registration_date: DateTime<Utc>,
    pub is_verified: bool,
}

// =============================================================================
// Identity & Role Tags
// =============================================================================

/// Specialization an identity can carry, used by route guards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoleTag {
    Customer,
    Employee,
}

/// The person behind a verified token, with the specializations they hold.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Identity {
    pub person: Person,
    pub is_customer: bool,
    pub is_employee: bool,
}

impl Identity {
    pub fn id(&self) -> i64 {
        self.person.id
    }

    pub fn has(&self, tag: RoleTag) -> bool {
        match tag {
            RoleTag::Customer => self.is_customer,
            RoleTag::Employee => self.is_employee,
        }
    }

    /// True when any of `tags` matches.
    pub fn has_any(&self, tags: &[RoleTag]) -> bool {
        tags.iter().any(|tag| self.has(*tag))
    }
}

/// Stored password hashes for one email, from either credential table.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct LoginCredentials {
    pub person_id: i64,
    pub customer_password: Option<String>,
    pub account_password: Option<String>,
}

/// An outstanding password-reset code (hashed) and its expiry.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct ResetTicket {
    pub customer_id: i64,
    pub reset_token: String,
    pub reset_token_expires: DateTime<Utc>,
}

// =============================================================================
// Inputs
// =============================================================================

/// `POST /users/register`. `confirmPassword` is checked by the schema only.
#[derive(Clone, Deserialize)]
pub struct RegisterCustomer {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password: String,
    #[serde(rename = "type", default)]
    pub kind: PartyKind,
}

#[derive(Clone, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Partial profile update; `None` keeps the stored value.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfilePatch {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
}

#[derive(Clone, Deserialize)]
pub struct ChangePassword {
    #[serde(rename = "currentPassword")]
    pub current_password: String,
    #[serde(rename = "newPassword")]
    pub new_password: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EmailOnly {
    pub email: String,
}

#[derive(Clone, Deserialize)]
pub struct ResetPassword {
    pub password: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VerifyEmail {
    pub email: String,
    pub code: String,
}
