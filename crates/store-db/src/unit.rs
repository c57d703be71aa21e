//! # Units of Work
//!
//! Runs a sequence of dependent writes as one atomic unit.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  atomically(pool, "register", |conn| Box::pin(async move { ... }))     │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  BEGIN ──► step 1 ──► step 2 ──► ... ──► COMMIT                        │
//! │                │          │                                             │
//! │                └── Err ───┴──► ROLLBACK ──► err.in_unit("register")    │
//! │                                                                         │
//! │  No partial state is ever visible to other connections.                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Steps receive the transaction's connection. They must own what they
//! capture, so callers move cloned inputs into the closure.

use std::future::Future;
use std::pin::Pin;

use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, warn};

use crate::error::{DbError, DbResult};

/// Future returned by the steps of a unit.
pub type StepFuture<'c, T> = Pin<Box<dyn Future<Output = DbResult<T>> + Send + 'c>>;

/// Runs `steps` inside a transaction, committing on success and rolling
/// back on any error.
pub async fn atomically<T, F>(pool: &SqlitePool, label: &'static str, steps: F) -> DbResult<T>
where
    T: Send,
    F: for<'c> FnOnce(&'c mut SqliteConnection) -> StepFuture<'c, T>,
{
    debug!(unit = label, "Beginning unit");
    let mut tx = pool.begin().await?;

    match steps(&mut *tx).await {
        Ok(value) => {
            tx.commit()
                .await
                .map_err(|e| DbError::from(e).in_unit(label))?;
            debug!(unit = label, "Unit committed");
            Ok(value)
        }
        Err(err) => {
            if let Err(rollback_err) = tx.rollback().await {
                warn!(unit = label, error = %rollback_err, "Rollback failed");
            }
            debug!(unit = label, error = %err, "Unit rolled back");
            Err(err.in_unit(label))
        }
    }
}

// =============================================================================
// Step Helpers
// =============================================================================

/// Runs a `SELECT COUNT(*) ... WHERE x = ?` style query.
pub async fn count(conn: &mut SqliteConnection, sql: &str, id: i64) -> DbResult<i64> {
    let n: i64 = sqlx::query_scalar(sql).bind(id).fetch_one(conn).await?;
    Ok(n)
}

/// Fails with `NotFound { entity }` unless `sql` (an `EXISTS` probe bound to
/// `id`) is true.
pub async fn ensure_exists(
    conn: &mut SqliteConnection,
    sql: &str,
    entity: &str,
    id: i64,
) -> DbResult<()> {
    let found: bool = sqlx::query_scalar(sql).bind(id).fetch_one(conn).await?;
    if found {
        Ok(())
    } else {
        Err(DbError::not_found(entity, id))
    }
}

/// Fails with `Rejected(message)` when any of the counting queries finds rows.
pub async fn refuse_if_dependents(
    conn: &mut SqliteConnection,
    checks: &[&str],
    id: i64,
    message: &str,
) -> DbResult<()> {
    for sql in checks {
        if count(&mut *conn, sql, id).await? > 0 {
            return Err(DbError::rejected(message));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};

    async fn db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    async fn vendor_count(db: &Database) -> i64 {
        sqlx::query_scalar("SELECT COUNT(*) FROM vendor")
            .fetch_one(db.pool())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_unit_commits_all_steps() {
        let db = db().await;

        let id = atomically(db.pool(), "two vendors", |conn| {
            Box::pin(async move {
                sqlx::query("INSERT INTO vendor (vendor_name) VALUES ('Mill')")
                    .execute(&mut *conn)
                    .await?;
                let res = sqlx::query("INSERT INTO vendor (vendor_name) VALUES ('Dairy')")
                    .execute(&mut *conn)
                    .await?;
                Ok::<_, DbError>(res.last_insert_rowid())
            })
        })
        .await
        .unwrap();

        assert_eq!(id, 2);
        assert_eq!(vendor_count(&db).await, 2);
    }

    #[tokio::test]
    async fn test_failed_step_rolls_back_earlier_writes() {
        let db = db().await;

        let err = atomically(db.pool(), "vendor then bad material", |conn| {
            Box::pin(async move {
                sqlx::query("INSERT INTO vendor (vendor_name) VALUES ('Mill')")
                    .execute(&mut *conn)
                    .await?;
                sqlx::query(
                    "INSERT INTO raw_material (material_name, vendor_id, last_updated) \
                     VALUES ('Flour', 999, '2024-01-01T00:00:00Z')",
                )
                .execute(&mut *conn)
                .await?;
                Ok::<_, DbError>(())
            })
        })
        .await
        .unwrap_err();

        assert!(matches!(err, DbError::TransactionFailed(_)));
        assert_eq!(vendor_count(&db).await, 0);
    }

    #[tokio::test]
    async fn test_rejection_surfaces_unchanged() {
        let db = db().await;

        let err = atomically(db.pool(), "refuse", |conn| {
            Box::pin(async move {
                sqlx::query("INSERT INTO vendor (vendor_name) VALUES ('Mill')")
                    .execute(&mut *conn)
                    .await?;
                Err::<(), _>(DbError::rejected("nope"))
            })
        })
        .await
        .unwrap_err();

        assert_eq!(err.to_string(), "nope");
        assert_eq!(vendor_count(&db).await, 0);
    }

    #[tokio::test]
    async fn test_ensure_exists() {
        let db = db().await;
        let mut conn = db.pool().acquire().await.unwrap();

        let err = ensure_exists(
            &mut *conn,
            "SELECT EXISTS(SELECT 1 FROM vendor WHERE vendor_id = ?)",
            "Vendor",
            4,
        )
        .await
        .unwrap_err();
        assert_eq!(err.to_string(), "Vendor not found: 4");
    }
}
