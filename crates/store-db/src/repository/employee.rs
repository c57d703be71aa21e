//! # Employee Repository
//!
//! Staff records. An employee is a person with a user account, an employee
//! row, a role assignment, and optionally a phone and an address.
//!
//! ## Onboarding Unit
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  create(employee, password_hash)                                       │
//! │    ├── email / identity card unused      else Rejected                 │
//! │    ├── branch, role exist                else NotFound                 │
//! │    ├── INSERT people_or_organization                                    │
//! │    ├── INSERT user_account   (username = email)                         │
//! │    ├── INSERT phone, address (when given)                               │
//! │    ├── INSERT employee                                                  │
//! │    └── INSERT user_roles                                                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use crate::repository::people::email_taken;
use crate::repository::{BRANCH_EXISTS, ROLE_EXISTS};
use crate::unit::{atomically, count, ensure_exists};
use store_core::{
    Address, AddressInput, EmployeeDetail, EmployeePatch, EmployeeSummary, NewEmployee,
    NewShift, Phone, Role, Shift,
};

const EMPLOYEE_EXISTS: &str = "SELECT EXISTS(SELECT 1 FROM employee WHERE id = ?)";

const SUMMARY_SELECT: &str = r#"
    SELECT e.id, p.identity_card, p.first_name, p.last_name, p.email,
           e.hire_date, e.termination_date, e.hourly_wage_cents,
           e.branch_id, b.branch_name, e.role_id, r.name AS role_name
    FROM employee e
    JOIN people_or_organization p ON p.id = e.id
    JOIN branch b ON b.branch_id = e.branch_id
    JOIN role r ON r.role_id = e.role_id
"#;

const SHIFT_COLUMNS: &str =
    "shift_id, employee_id, branch_id, date, start_time, end_time, working_hours, is_present";

#[derive(Debug, Clone)]
pub struct EmployeeRepository {
    pool: SqlitePool,
}

impl EmployeeRepository {
    pub fn new(pool: SqlitePool) -> Self {
        EmployeeRepository { pool }
    }

    pub async fn list(&self) -> DbResult<Vec<EmployeeSummary>> {
        let sql = format!("{SUMMARY_SELECT} ORDER BY e.id");
        let employees = sqlx::query_as::<_, EmployeeSummary>(&sql)
            .fetch_all(&self.pool)
            .await?;
        debug!(count = employees.len(), "Listed employees");
        Ok(employees)
    }

    /// The employee with phone, address and shifts.
    pub async fn get(&self, id: i64) -> DbResult<Option<EmployeeDetail>> {
        let mut conn = self.pool.acquire().await?;
        load_detail(&mut conn, id).await
    }

    /// Onboards an employee. `password_hash` is stored on the user account.
    pub async fn create(
        &self,
        input: &NewEmployee,
        password_hash: &str,
    ) -> DbResult<EmployeeDetail> {
        debug!(email = %input.email, "Onboarding employee");
        let input = input.clone();
        let password_hash = password_hash.to_string();
        atomically(&self.pool, "create employee", move |conn| {
            Box::pin(create_steps(conn, input, password_hash))
        })
        .await
    }

    /// Merges `patch` across the person, account, employee, phone and
    /// address rows.
    pub async fn update(&self, id: i64, patch: &EmployeePatch) -> DbResult<EmployeeDetail> {
        debug!(id, "Updating employee");
        let patch = patch.clone();
        atomically(&self.pool, "update employee", move |conn| {
            Box::pin(update_steps(conn, id, patch))
        })
        .await
    }

    /// Removes the employee and their identity. Refused while shifts or
    /// worked orders reference them.
    pub async fn delete(&self, id: i64) -> DbResult<()> {
        debug!(id, "Deleting employee");
        atomically(&self.pool, "delete employee", move |conn| {
            Box::pin(delete_steps(conn, id))
        })
        .await
    }

    pub async fn add_shift(&self, id: i64, shift: &NewShift) -> DbResult<Shift> {
        debug!(id, branch_id = shift.branch_id, "Recording shift");
        let shift = shift.clone();
        atomically(&self.pool, "record shift", move |conn| {
            Box::pin(shift_steps(conn, id, shift))
        })
        .await
    }

    pub async fn roles(&self) -> DbResult<Vec<Role>> {
        let roles = sqlx::query_as::<_, Role>(
            "SELECT role_id, name, description FROM role ORDER BY role_id",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(roles)
    }
}

// =============================================================================
// Unit Steps
// =============================================================================

async fn load_detail(conn: &mut SqliteConnection, id: i64) -> DbResult<Option<EmployeeDetail>> {
    let sql = format!("{SUMMARY_SELECT} WHERE e.id = ?1");
    let Some(employee) = sqlx::query_as::<_, EmployeeSummary>(&sql)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?
    else {
        return Ok(None);
    };

    let phone = sqlx::query_as::<_, Phone>(
        "SELECT phone_id, owner_id, type, number FROM phone WHERE owner_id = ?1 ORDER BY phone_id",
    )
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;

    let address = sqlx::query_as::<_, Address>(
        r#"
        SELECT address_id, person_id, street, city, state, postal_code, country
        FROM address WHERE person_id = ?1 ORDER BY address_id
        "#,
    )
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;

    let sql = format!(
        "SELECT {SHIFT_COLUMNS} FROM employee_shift WHERE employee_id = ?1 ORDER BY date DESC"
    );
    let shifts = sqlx::query_as::<_, Shift>(&sql)
        .bind(id)
        .fetch_all(&mut *conn)
        .await?;

    Ok(Some(EmployeeDetail {
        employee,
        phone,
        address,
        shifts,
    }))
}

async fn create_steps(
    conn: &mut SqliteConnection,
    input: NewEmployee,
    password_hash: String,
) -> DbResult<EmployeeDetail> {
    if email_taken(&mut *conn, &input.email, None).await? {
        return Err(DbError::rejected("Email already in use"));
    }
    let card_taken: bool = sqlx::query_scalar(
        "SELECT EXISTS(SELECT 1 FROM people_or_organization WHERE identity_card = ?1)",
    )
    .bind(input.identity_card)
    .fetch_one(&mut *conn)
    .await?;
    if card_taken {
        return Err(DbError::rejected("Identity card already in use"));
    }
    ensure_exists(&mut *conn, BRANCH_EXISTS, "Branch", input.branch_id).await?;
    ensure_exists(&mut *conn, ROLE_EXISTS, "Role", input.role_id).await?;

    let now = Utc::now();
    let id: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO people_or_organization
            (identity_card, first_name, last_name, type, email, created_at)
        VALUES (?1, ?2, ?3, 'person', ?4, ?5)
        RETURNING id
        "#,
    )
    .bind(input.identity_card)
    .bind(&input.first_name)
    .bind(&input.last_name)
    .bind(&input.email)
    .bind(now)
    .fetch_one(&mut *conn)
    .await?;

    sqlx::query(
        "INSERT INTO user_account (id, username, password_hash, created_at) VALUES (?1, ?2, ?3, ?4)",
    )
    .bind(id)
    .bind(&input.email)
    .bind(&password_hash)
    .bind(now)
    .execute(&mut *conn)
    .await?;

    if let Some(number) = &input.phone_number {
        upsert_phone(&mut *conn, id, number).await?;
    }
    if let Some(address) = &input.address {
        upsert_address(&mut *conn, id, address).await?;
    }

    sqlx::query(
        r#"
        INSERT INTO employee (id, hire_date, hourly_wage_cents, branch_id, role_id)
        VALUES (?1, ?2, ?3, ?4, ?5)
        "#,
    )
    .bind(id)
    .bind(input.hire_date)
    .bind(input.hourly_wage_cents)
    .bind(input.branch_id)
    .bind(input.role_id)
    .execute(&mut *conn)
    .await?;

    sqlx::query("INSERT INTO user_roles (user_id, role_id, start_date) VALUES (?1, ?2, ?3)")
        .bind(id)
        .bind(input.role_id)
        .bind(input.hire_date)
        .execute(&mut *conn)
        .await?;

    load_detail(conn, id)
        .await?
        .ok_or_else(|| DbError::not_found("Employee", id))
}

async fn update_steps(
    conn: &mut SqliteConnection,
    id: i64,
    patch: EmployeePatch,
) -> DbResult<EmployeeDetail> {
    ensure_exists(&mut *conn, EMPLOYEE_EXISTS, "Employee", id).await?;
    if let Some(email) = &patch.email {
        if email_taken(&mut *conn, email, Some(id)).await? {
            return Err(DbError::rejected("Email already in use"));
        }
    }
    if let Some(branch_id) = patch.branch_id {
        ensure_exists(&mut *conn, BRANCH_EXISTS, "Branch", branch_id).await?;
    }
    if let Some(role_id) = patch.role_id {
        ensure_exists(&mut *conn, ROLE_EXISTS, "Role", role_id).await?;
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

    // The login name follows the email
    if let Some(email) = &patch.email {
        sqlx::query("UPDATE user_account SET username = ?2 WHERE id = ?1")
            .bind(id)
            .bind(email)
            .execute(&mut *conn)
            .await?;
    }

    let previous_role: i64 = sqlx::query_scalar("SELECT role_id FROM employee WHERE id = ?1")
        .bind(id)
        .fetch_one(&mut *conn)
        .await?;

    sqlx::query(
        r#"
        UPDATE employee SET
            hourly_wage_cents = COALESCE(?2, hourly_wage_cents),
            branch_id = COALESCE(?3, branch_id),
            role_id = COALESCE(?4, role_id),
            termination_date = COALESCE(?5, termination_date)
        WHERE id = ?1
        "#,
    )
    .bind(id)
    .bind(patch.hourly_wage_cents)
    .bind(patch.branch_id)
    .bind(patch.role_id)
    .bind(patch.termination_date)
    .execute(&mut *conn)
    .await?;

    if let Some(role_id) = patch.role_id.filter(|r| *r != previous_role) {
        let now = Utc::now();
        sqlx::query(
            "UPDATE user_roles SET end_date = ?2 WHERE user_id = ?1 AND end_date IS NULL",
        )
        .bind(id)
        .bind(now)
        .execute(&mut *conn)
        .await?;
        sqlx::query(
            r#"
            INSERT INTO user_roles (user_id, role_id, start_date) VALUES (?1, ?2, ?3)
            ON CONFLICT (user_id, role_id) DO UPDATE SET
                start_date = excluded.start_date,
                end_date = NULL
            "#,
        )
        .bind(id)
        .bind(role_id)
        .bind(now)
        .execute(&mut *conn)
        .await?;
    }

    if let Some(number) = &patch.phone_number {
        upsert_phone(&mut *conn, id, number).await?;
    }
    if let Some(address) = &patch.address {
        upsert_address(&mut *conn, id, address).await?;
    }

    load_detail(conn, id)
        .await?
        .ok_or_else(|| DbError::not_found("Employee", id))
}

async fn delete_steps(conn: &mut SqliteConnection, id: i64) -> DbResult<()> {
    ensure_exists(&mut *conn, EMPLOYEE_EXISTS, "Employee", id).await?;

    let shifts = count(
        &mut *conn,
        "SELECT COUNT(*) FROM employee_shift WHERE employee_id = ?",
        id,
    )
    .await?;
    if shifts > 0 {
        return Err(DbError::rejected(
            "Cannot delete employee with associated shifts. Please reassign or delete the shifts first.",
        ));
    }

    let orders = count(
        &mut *conn,
        "SELECT COUNT(*) FROM works_on WHERE employee_id = ?",
        id,
    )
    .await?;
    if orders > 0 {
        return Err(DbError::rejected(
            "Cannot delete employee with associated orders. Please reassign the orders first.",
        ));
    }

    sqlx::query("DELETE FROM branch_management WHERE employee_id = ?1")
        .bind(id)
        .execute(&mut *conn)
        .await?;
    sqlx::query("DELETE FROM employee WHERE id = ?1")
        .bind(id)
        .execute(&mut *conn)
        .await?;
    // Cascades to user_account, user_roles, phone and address
    sqlx::query("DELETE FROM people_or_organization WHERE id = ?1")
        .bind(id)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

async fn shift_steps(conn: &mut SqliteConnection, id: i64, shift: NewShift) -> DbResult<Shift> {
    ensure_exists(&mut *conn, EMPLOYEE_EXISTS, "Employee", id).await?;
    ensure_exists(&mut *conn, BRANCH_EXISTS, "Branch", shift.branch_id).await?;

    let sql = format!(
        "INSERT INTO employee_shift \
             (employee_id, branch_id, date, start_time, end_time, working_hours, is_present) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7) RETURNING {SHIFT_COLUMNS}"
    );
    let shift = sqlx::query_as::<_, Shift>(&sql)
        .bind(id)
        .bind(shift.branch_id)
        .bind(shift.date)
        .bind(&shift.start_time)
        .bind(&shift.end_time)
        .bind(shift.working_hours)
        .bind(shift.is_present)
        .fetch_one(&mut *conn)
        .await?;
    Ok(shift)
}

async fn upsert_phone(conn: &mut SqliteConnection, owner_id: i64, number: &str) -> DbResult<()> {
    let updated = sqlx::query("UPDATE phone SET number = ?2 WHERE owner_id = ?1")
        .bind(owner_id)
        .bind(number)
        .execute(&mut *conn)
        .await?;
    if updated.rows_affected() == 0 {
        sqlx::query("INSERT INTO phone (owner_id, type, number) VALUES (?1, 'mobile', ?2)")
            .bind(owner_id)
            .bind(number)
            .execute(&mut *conn)
            .await?;
    }
    Ok(())
}

async fn upsert_address(
    conn: &mut SqliteConnection,
    person_id: i64,
    address: &AddressInput,
) -> DbResult<()> {
    let updated = sqlx::query(
        r#"
        UPDATE address SET
            street = COALESCE(?2, street),
            city = COALESCE(?3, city),
            state = COALESCE(?4, state),
            postal_code = COALESCE(?5, postal_code),
            country = COALESCE(?6, country)
        WHERE person_id = ?1
        "#,
    )
    .bind(person_id)
    .bind(&address.street)
    .bind(&address.city)
    .bind(&address.state)
    .bind(&address.postal_code)
    .bind(&address.country)
    .execute(&mut *conn)
    .await?;

    if updated.rows_affected() == 0 {
        sqlx::query(
            r#"
            INSERT INTO address (person_id, street, city, state, postal_code, country)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )
        .bind(person_id)
        .bind(&address.street)
        .bind(&address.city)
        .bind(&address.state)
        .bind(&address.postal_code)
        .bind(&address.country)
        .execute(&mut *conn)
        .await?;
    }
    Ok(())
}
