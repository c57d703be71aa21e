//! # People Repository
//!
//! Base identities, customer accounts and their credentials.
//!
//! ## Tables
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  people_or_organization (id)                                           │
//! │       ├── customer      (customer_id = id)  password, verification,    │
//! │       │                                      reset token               │
//! │       ├── user_account  (id)                password_hash, last_login  │
//! │       └── employee      (id)                                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Registration writes the person and the customer row in one unit, so a
//! person without a credential row never becomes visible.
//!
//! Verification and reset codes arrive here already hashed.

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use crate::unit::atomically;
use store_core::{
    CustomerProfile, Identity, LoginCredentials, PartyKind, Person, ProfilePatch, ResetTicket,
};

const EMAIL_IN_USE: &str = "Email already in use";

const PERSON_COLUMNS: &str = "id, identity_card, first_name, last_name, type, email, created_at";

const PROFILE_SELECT: &str = r#"
    SELECT p.id, p.first_name, p.last_name, p.email, p.type,
           c.registration_date, c.is_verified
    FROM people_or_organization p
    JOIN customer c ON c.customer_id = p.id
"#;

/// A customer account ready to be written. Hashing happens before this point.
#[derive(Debug, Clone)]
pub struct NewCustomerAccount {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password_hash: String,
    pub kind: PartyKind,
    pub verification_code_hash: Option<String>,
}

/// Where a customer stands with email verification.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct VerificationState {
    pub customer_id: i64,
    pub is_verified: bool,
    pub verification_code: Option<String>,
}

#[derive(Debug, Clone)]
pub struct PeopleRepository {
    pool: SqlitePool,
}

impl PeopleRepository {
    pub fn new(pool: SqlitePool) -> Self {
        PeopleRepository { pool }
    }

    // =========================================================================
    // Registration & Identity
    // =========================================================================

    /// Creates the person and customer rows together.
    ///
    /// Fails with `Rejected("Email already in use")` and writes nothing when
    /// the email belongs to any identity.
    pub async fn register(&self, account: &NewCustomerAccount) -> DbResult<CustomerProfile> {
        debug!(email = %account.email, "Registering customer");
        let account = account.clone();
        atomically(&self.pool, "register customer", move |conn| {
            Box::pin(register_steps(conn, account))
        })
        .await
    }

    pub async fn find_person(&self, id: i64) -> DbResult<Option<Person>> {
        let sql = format!("SELECT {PERSON_COLUMNS} FROM people_or_organization WHERE id = ?1");
        let person = sqlx::query_as::<_, Person>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(person)
    }

    /// The person with the specializations they hold, or `None` when the id
    /// no longer exists.
    pub async fn load_identity(&self, id: i64) -> DbResult<Option<Identity>> {
        let Some(person) = self.find_person(id).await? else {
            return Ok(None);
        };

        let (is_customer, is_employee): (bool, bool) = sqlx::query_as(
            r#"
            SELECT EXISTS(SELECT 1 FROM customer WHERE customer_id = ?1),
                   EXISTS(SELECT 1 FROM employee WHERE id = ?1)
            "#,
        )
        .bind(id)
        .fetch_one(&self.pool)
        .await?;

        Ok(Some(Identity {
            person,
            is_customer,
            is_employee,
        }))
    }

    /// Both stored password hashes for `email`.
    pub async fn credentials_by_email(&self, email: &str) -> DbResult<Option<LoginCredentials>> {
        let credentials = sqlx::query_as::<_, LoginCredentials>(
            r#"
            SELECT p.id AS person_id,
                   c.password AS customer_password,
                   u.password_hash AS account_password
            FROM people_or_organization p
            LEFT JOIN customer c ON c.customer_id = p.id
            LEFT JOIN user_account u ON u.id = p.id
            WHERE p.email = ?1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(credentials)
    }

    pub async fn stamp_last_login(&self, id: i64) -> DbResult<()> {
        sqlx::query("UPDATE user_account SET last_login = ?2 WHERE id = ?1")
            .bind(id)
            .bind(Utc::now())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    // =========================================================================
    // Profile
    // =========================================================================

    pub async fn profile(&self, id: i64) -> DbResult<Option<CustomerProfile>> {
        let mut conn = self.pool.acquire().await?;
        fetch_profile(&mut conn, id).await
    }

    /// Merges `patch` into the person row. A new email must be unused.
    pub async fn update_profile(&self, id: i64, patch: &ProfilePatch) -> DbResult<CustomerProfile> {
        debug!(id, "Updating profile");
        let patch = patch.clone();
        atomically(&self.pool, "update profile", move |conn| {
            Box::pin(profile_steps(conn, id, patch))
        })
        .await
    }

    pub async fn customer_password(&self, id: i64) -> DbResult<Option<String>> {
        let hash = sqlx::query_scalar("SELECT password FROM customer WHERE customer_id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(hash)
    }

    pub async fn set_customer_password(&self, id: i64, password_hash: &str) -> DbResult<()> {
        let result = sqlx::query("UPDATE customer SET password = ?2 WHERE customer_id = ?1")
            .bind(id)
            .bind(password_hash)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(DbError::not_found("User", id));
        }
        Ok(())
    }

    // =========================================================================
    // Email Verification
    // =========================================================================

    pub async fn customer_id_by_email(&self, email: &str) -> DbResult<Option<i64>> {
        let id = sqlx::query_scalar(
            r#"
            SELECT c.customer_id
            FROM customer c
            JOIN people_or_organization p ON p.id = c.customer_id
            WHERE p.email = ?1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(id)
    }

    pub async fn verification_state(&self, email: &str) -> DbResult<Option<VerificationState>> {
        let state = sqlx::query_as::<_, VerificationState>(
            r#"
            SELECT c.customer_id, c.is_verified, c.verification_code
            FROM customer c
            JOIN people_or_organization p ON p.id = c.customer_id
            WHERE p.email = ?1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(state)
    }

    pub async fn mark_verified(&self, customer_id: i64) -> DbResult<()> {
        sqlx::query(
            "UPDATE customer SET is_verified = 1, verification_code = NULL WHERE customer_id = ?1",
        )
        .bind(customer_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// `None` clears the code.
    pub async fn set_verification_code(
        &self,
        customer_id: i64,
        code_hash: Option<&str>,
    ) -> DbResult<()> {
        sqlx::query("UPDATE customer SET verification_code = ?2 WHERE customer_id = ?1")
            .bind(customer_id)
            .bind(code_hash)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    // =========================================================================
    // Password Reset
    // =========================================================================

    pub async fn set_reset_token(
        &self,
        customer_id: i64,
        token_hash: &str,
        expires: DateTime<Utc>,
    ) -> DbResult<()> {
        sqlx::query(
            r#"
            UPDATE customer SET reset_token = ?2, reset_token_expires = ?3
            WHERE customer_id = ?1
            "#,
        )
        .bind(customer_id)
        .bind(token_hash)
        .bind(expires)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn clear_reset_token(&self, customer_id: i64) -> DbResult<()> {
        sqlx::query(
            r#"
            UPDATE customer SET reset_token = NULL, reset_token_expires = NULL
            WHERE customer_id = ?1
            "#,
        )
        .bind(customer_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Reset codes that have not expired at `now`.
    pub async fn pending_resets(&self, now: DateTime<Utc>) -> DbResult<Vec<ResetTicket>> {
        let tickets = sqlx::query_as::<_, ResetTicket>(
            r#"
            SELECT customer_id, reset_token, reset_token_expires
            FROM customer
            WHERE reset_token IS NOT NULL AND reset_token_expires IS NOT NULL
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(tickets
            .into_iter()
            .filter(|t| t.reset_token_expires > now)
            .collect())
    }

    /// Stores the new password and consumes the reset code.
    pub async fn complete_reset(&self, customer_id: i64, password_hash: &str) -> DbResult<()> {
        sqlx::query(
            r#"
            UPDATE customer
            SET password = ?2, reset_token = NULL, reset_token_expires = NULL
            WHERE customer_id = ?1
            "#,
        )
        .bind(customer_id)
        .bind(password_hash)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

// =============================================================================
// Unit Steps
// =============================================================================

/// True when `email` belongs to an identity other than `except`.
pub(crate) async fn email_taken(
    conn: &mut SqliteConnection,
    email: &str,
    except: Option<i64>,
) -> DbResult<bool> {
    let taken: bool = sqlx::query_scalar(
        r#"
        SELECT EXISTS(
            SELECT 1 FROM people_or_organization
            WHERE email = ?1 AND (?2 IS NULL OR id <> ?2)
        )
        "#,
    )
    .bind(email)
    .bind(except)
    .fetch_one(conn)
    .await?;
    Ok(taken)
}

async fn fetch_profile(conn: &mut SqliteConnection, id: i64) -> DbResult<Option<CustomerProfile>> {
    let sql = format!("{PROFILE_SELECT} WHERE p.id = ?1");
    let profile = sqlx::query_as::<_, CustomerProfile>(&sql)
        .bind(id)
        .fetch_optional(conn)
        .await?;
    Ok(profile)
}

async fn register_steps(
    conn: &mut SqliteConnection,
    account: NewCustomerAccount,
) -> DbResult<CustomerProfile> {
    if email_taken(&mut *conn, &account.email, None).await? {
        return Err(DbError::rejected(EMAIL_IN_USE));
    }

    let now = Utc::now();
    let id: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO people_or_organization (first_name, last_name, type, email, created_at)
        VALUES (?1, ?2, ?3, ?4, ?5)
        RETURNING id
        "#,
    )
    .bind(&account.first_name)
    .bind(&account.last_name)
    .bind(account.kind)
    .bind(&account.email)
    .bind(now)
    .fetch_one(&mut *conn)
    .await?;

    sqlx::query(
        r#"
        INSERT INTO customer (customer_id, registration_date, password, verification_code)
        VALUES (?1, ?2, ?3, ?4)
        "#,
    )
    .bind(id)
    .bind(now)
    .bind(&account.password_hash)
    .bind(&account.verification_code_hash)
    .execute(&mut *conn)
    .await?;

    fetch_profile(&mut *conn, id)
        .await?
        .ok_or_else(|| DbError::not_found("User", id))
}

async fn profile_steps(
    conn: &mut SqliteConnection,
    id: i64,
    patch: ProfilePatch,
) -> DbResult<CustomerProfile> {
    if fetch_profile(&mut *conn, id).await?.is_none() {
        return Err(DbError::not_found("User", id));
    }
    if let Some(email) = &patch.email {
        if email_taken(&mut *conn, email, Some(id)).await? {
            return Err(DbError::rejected(EMAIL_IN_USE));
        }
    }

    sqlx::query(
        r#"
        UPDATE people_or_organization SET
            first_name = COALESCE(?2, first_name),
            last_name = COALESCE(?3, last_name),
            email = COALESCE(?4, email)
        WHERE id = ?1
        "#,
    )
    .bind(id)
    .bind(&patch.first_name)
    .bind(&patch.last_name)
    .bind(&patch.email)
    .execute(&mut *conn)
    .await?;

    fetch_profile(&mut *conn, id)
        .await?
        .ok_or_else(|| DbError::not_found("User", id))
}
