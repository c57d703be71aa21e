//! # Branch Repository
//!
//! Shop locations, their expenses, and the stock view per branch.

use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use crate::repository::inventory::levels_for_branch;
use crate::repository::BRANCH_EXISTS;
use crate::unit::{atomically, ensure_exists, refuse_if_dependents};
use store_core::{Branch, BranchDetail, BranchExpense, BranchPatch, NewBranch, NewExpense};

const BRANCH_COLUMNS: &str =
    "branch_id, branch_name, address, city, postal_code, country, phone, email";

const EXPENSE_COLUMNS: &str = "expense_id, branch_id, category_id, amount_cents, date, description";

const CATEGORY_EXISTS: &str =
    "SELECT EXISTS(SELECT 1 FROM expense_category WHERE category_id = ?)";

const BRANCH_DEPENDENTS: &[&str] = &[
    "SELECT COUNT(*) FROM inventory WHERE branch_id = ?",
    "SELECT COUNT(*) FROM branch_expenses WHERE branch_id = ?",
    "SELECT COUNT(*) FROM employee_shift WHERE branch_id = ?",
    "SELECT COUNT(*) FROM employee WHERE branch_id = ?",
    "SELECT COUNT(*) FROM branch_management WHERE branch_id = ?",
];

#[derive(Debug, Clone)]
pub struct BranchRepository {
    pool: SqlitePool,
}

impl BranchRepository {
    pub fn new(pool: SqlitePool) -> Self {
        BranchRepository { pool }
    }

    pub async fn list(&self) -> DbResult<Vec<Branch>> {
        let sql = format!("SELECT {BRANCH_COLUMNS} FROM branch ORDER BY branch_id");
        let branches = sqlx::query_as::<_, Branch>(&sql)
            .fetch_all(&self.pool)
            .await?;
        debug!(count = branches.len(), "Listed branches");
        Ok(branches)
    }

    pub async fn get(&self, id: i64) -> DbResult<Option<Branch>> {
        let sql = format!("SELECT {BRANCH_COLUMNS} FROM branch WHERE branch_id = ?1");
        let branch = sqlx::query_as::<_, Branch>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(branch)
    }

    /// The branch with its stock levels and expenses, newest expense first.
    pub async fn detail(&self, id: i64) -> DbResult<Option<BranchDetail>> {
        let Some(branch) = self.get(id).await? else {
            return Ok(None);
        };

        let mut conn = self.pool.acquire().await?;
        let inventory = levels_for_branch(&mut conn, id).await?;

        let sql = format!(
            "SELECT {EXPENSE_COLUMNS} FROM branch_expenses WHERE branch_id = ?1 ORDER BY date DESC"
        );
        let expenses = sqlx::query_as::<_, BranchExpense>(&sql)
            .bind(id)
            .fetch_all(&mut *conn)
            .await?;

        Ok(Some(BranchDetail {
            branch,
            inventory,
            expenses,
        }))
    }

    pub async fn create(&self, input: &NewBranch) -> DbResult<Branch> {
        debug!(name = %input.branch_name, "Inserting branch");
        let sql = format!(
            "INSERT INTO branch (branch_name, address, city, postal_code, country, phone, email) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7) RETURNING {BRANCH_COLUMNS}"
        );
        let branch = sqlx::query_as::<_, Branch>(&sql)
            .bind(&input.branch_name)
            .bind(&input.address)
            .bind(&input.city)
            .bind(&input.postal_code)
            .bind(&input.country)
            .bind(&input.phone)
            .bind(&input.email)
            .fetch_one(&self.pool)
            .await?;
        Ok(branch)
    }

    pub async fn update(&self, id: i64, patch: &BranchPatch) -> DbResult<Branch> {
        debug!(id, "Updating branch");
        let sql = format!(
            "UPDATE branch SET \
                 branch_name = COALESCE(?2, branch_name), \
                 address = COALESCE(?3, address), \
                 city = COALESCE(?4, city), \
                 postal_code = COALESCE(?5, postal_code), \
                 country = COALESCE(?6, country), \
                 phone = COALESCE(?7, phone), \
                 email = COALESCE(?8, email) \
             WHERE branch_id = ?1 RETURNING {BRANCH_COLUMNS}"
        );
        sqlx::query_as::<_, Branch>(&sql)
            .bind(id)
            .bind(&patch.branch_name)
            .bind(&patch.address)
            .bind(&patch.city)
            .bind(&patch.postal_code)
            .bind(&patch.country)
            .bind(&patch.phone)
            .bind(&patch.email)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DbError::not_found("Branch", id))
    }

    /// Deletes a branch with no stock, expenses, shifts, staff or managers.
    pub async fn delete(&self, id: i64) -> DbResult<()> {
        debug!(id, "Deleting branch");
        atomically(&self.pool, "delete branch", move |conn| {
            Box::pin(delete_steps(conn, id))
        })
        .await
    }

    pub async fn add_expense(&self, id: i64, input: &NewExpense) -> DbResult<BranchExpense> {
        debug!(id, amount_cents = input.amount_cents, "Recording branch expense");
        let input = input.clone();
        atomically(&self.pool, "record expense", move |conn| {
            Box::pin(expense_steps(conn, id, input))
        })
        .await
    }
}

async fn delete_steps(conn: &mut SqliteConnection, id: i64) -> DbResult<()> {
    ensure_exists(&mut *conn, BRANCH_EXISTS, "Branch", id).await?;
    refuse_if_dependents(
        &mut *conn,
        BRANCH_DEPENDENTS,
        id,
        "Cannot delete branch with associated data",
    )
    .await?;
    sqlx::query("DELETE FROM branch WHERE branch_id = ?1")
        .bind(id)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

async fn expense_steps(
    conn: &mut SqliteConnection,
    id: i64,
    input: NewExpense,
) -> DbResult<BranchExpense> {
    ensure_exists(&mut *conn, BRANCH_EXISTS, "Branch", id).await?;
    if let Some(category_id) = input.category_id {
        ensure_exists(&mut *conn, CATEGORY_EXISTS, "Expense category", category_id).await?;
    }

    let sql = format!(
        "INSERT INTO branch_expenses (branch_id, category_id, amount_cents, date, description) \
         VALUES (?1, ?2, ?3, ?4, ?5) RETURNING {EXPENSE_COLUMNS}"
    );
    let expense = sqlx::query_as::<_, BranchExpense>(&sql)
        .bind(id)
        .bind(input.category_id)
        .bind(input.amount_cents)
        .bind(input.date)
        .bind(&input.description)
        .fetch_one(&mut *conn)
        .await?;
    Ok(expense)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::testing::{count, db, insert_branch, insert_material};
    use chrono::Utc;
    use store_core::InventoryUpsert;

    fn downtown() -> NewBranch {
        NewBranch {
            branch_name: "Downtown".to_string(),
            address: "12 Tahrir Sq".to_string(),
            city: "Cairo".to_string(),
            postal_code: None,
            country: "Egypt".to_string(),
            phone: Some("555-0101".to_string()),
            email: None,
        }
    }

    #[tokio::test]
    async fn test_create_update_get() {
        let db = db().await;
        let repo = db.branches();
        let branch = repo.create(&downtown()).await.unwrap();

        let updated = repo
            .update(
                branch.branch_id,
                &BranchPatch {
                    city: Some("Giza".to_string()),
                    ..BranchPatch::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.city, "Giza");
        assert_eq!(updated.phone, branch.phone);
        assert_eq!(repo.get(branch.branch_id).await.unwrap(), Some(updated));
    }

    #[tokio::test]
    async fn test_expense_category_must_exist() {
        let db = db().await;
        let branch_id = insert_branch(&db, "Downtown").await;
        let err = db
            .branches()
            .add_expense(
                branch_id,
                &NewExpense {
                    category_id: Some(999),
                    amount_cents: 12000,
                    date: Utc::now(),
                    description: None,
                },
            )
            .await
            .unwrap_err();
        assert!(
            matches!(err, DbError::NotFound { ref entity, .. } if entity == "Expense category")
        );
        assert_eq!(count(&db, "SELECT COUNT(*) FROM branch_expenses").await, 0);
    }

    #[tokio::test]
    async fn test_detail_and_guarded_delete() {
        let db = db().await;
        let branch_id = insert_branch(&db, "Downtown").await;
        let flour = insert_material(&db, "Flour", None).await;
        db.inventory()
            .upsert(&InventoryUpsert {
                branch_id,
                raw_material_id: flour,
                quantity: 40.0,
                expected_version: None,
            })
            .await
            .unwrap();
        db.branches()
            .add_expense(
                branch_id,
                &NewExpense {
                    category_id: Some(1),
                    amount_cents: 250000,
                    date: Utc::now(),
                    description: Some("Rent".to_string()),
                },
            )
            .await
            .unwrap();

        let detail = db.branches().detail(branch_id).await.unwrap().unwrap();
        assert_eq!(detail.inventory.len(), 1);
        assert_eq!(detail.expenses.len(), 1);
        assert_eq!(detail.expenses[0].amount().cents(), 250000);

        let err = db.branches().delete(branch_id).await.unwrap_err();
        assert_eq!(err.to_string(), "Cannot delete branch with associated data");
        assert_eq!(count(&db, "SELECT COUNT(*) FROM branch").await, 1);
    }

    #[tokio::test]
    async fn test_delete_empty_branch() {
        let db = db().await;
        let branch_id = insert_branch(&db, "Pop-up").await;
        db.branches().delete(branch_id).await.unwrap();
        assert!(db.branches().get(branch_id).await.unwrap().is_none());
    }
}
