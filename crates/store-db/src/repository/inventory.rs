//! # Inventory Repository
//!
//! Raw-material stock per branch, keyed by (branch_id, raw_material_id).
//!
//! ## Guarded Writes
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Two Ways to Change Stock                             │
//! │                                                                         │
//! │  1. UPSERT (absolute quantity)                                         │
//! │     client reads { quantity: 12.5, version: 4 }                        │
//! │     client writes { quantity: 10, expected_version: 4 }                │
//! │        UPDATE ... SET quantity = 10, version = version + 1             │
//! │        WHERE ... AND version = 4                                       │
//! │     0 rows → someone else wrote first → 409 StaleVersion               │
//! │                                                                         │
//! │  2. ADJUST (delta)                                                     │
//! │        UPDATE ... SET quantity = quantity + Δ, version = version + 1   │
//! │        WHERE ... AND quantity + Δ >= 0                                 │
//! │     one statement: no read-modify-write window at all                  │
//! │     0 rows → missing row (404) or not enough stock (400)               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use crate::repository::{BRANCH_EXISTS, RAW_MATERIAL_EXISTS};
use crate::unit::{atomically, ensure_exists};
use store_core::{InventoryKey, InventoryLevel, InventoryUpsert};

/// Inventory rows named on both sides. Callers append `WHERE`/`ORDER BY`.
pub(crate) const LEVEL_SELECT: &str = r#"
    SELECT i.branch_id, b.branch_name, i.raw_material_id, m.material_name,
           i.quantity, i.version, i.last_updated
    FROM inventory i
    JOIN branch b ON b.branch_id = i.branch_id
    JOIN raw_material m ON m.raw_material_id = i.raw_material_id
"#;

/// Result of an upsert: the row as stored and whether it was new.
#[derive(Debug, Clone)]
pub struct UpsertOutcome {
    pub level: InventoryLevel,
    pub created: bool,
}

#[derive(Debug, Clone)]
pub struct InventoryRepository {
    pool: SqlitePool,
}

impl InventoryRepository {
    pub fn new(pool: SqlitePool) -> Self {
        InventoryRepository { pool }
    }

    pub async fn list(&self) -> DbResult<Vec<InventoryLevel>> {
        let sql = format!("{LEVEL_SELECT} ORDER BY i.branch_id, i.raw_material_id");
        let levels = sqlx::query_as::<_, InventoryLevel>(&sql)
            .fetch_all(&self.pool)
            .await?;

        debug!(count = levels.len(), "Listed inventory");
        Ok(levels)
    }

    /// Stock held by one branch. Fails with `NotFound` for an unknown branch.
    pub async fn by_branch(&self, branch_id: i64) -> DbResult<Vec<InventoryLevel>> {
        let mut conn = self.pool.acquire().await?;
        ensure_exists(&mut *conn, BRANCH_EXISTS, "Branch", branch_id).await?;

        let sql = format!("{LEVEL_SELECT} WHERE i.branch_id = ?1 ORDER BY i.raw_material_id");
        let levels = sqlx::query_as::<_, InventoryLevel>(&sql)
            .bind(branch_id)
            .fetch_all(&mut *conn)
            .await?;
        Ok(levels)
    }

    /// Stock of one material across branches.
    pub async fn by_material(&self, raw_material_id: i64) -> DbResult<Vec<InventoryLevel>> {
        let mut conn = self.pool.acquire().await?;
        ensure_exists(&mut *conn, RAW_MATERIAL_EXISTS, "Raw material", raw_material_id).await?;
        levels_for_material(&mut conn, raw_material_id).await
    }

    pub async fn get(&self, key: InventoryKey) -> DbResult<Option<InventoryLevel>> {
        let mut conn = self.pool.acquire().await?;
        fetch_level(&mut conn, key).await
    }

    /// Sets an absolute quantity, creating the row when needed.
    ///
    /// With `expected_version`, the write only lands if the stored version
    /// still matches; otherwise [`DbError::StaleVersion`].
    pub async fn upsert(&self, input: &InventoryUpsert) -> DbResult<UpsertOutcome> {
        debug!(
            branch_id = input.branch_id,
            raw_material_id = input.raw_material_id,
            quantity = input.quantity,
            "Upserting inventory"
        );
        let input = input.clone();
        atomically(&self.pool, "upsert inventory", move |conn| {
            Box::pin(upsert_steps(conn, input))
        })
        .await
    }

    /// Applies `delta` in one guarded statement that never lets the quantity
    /// drop below zero.
    pub async fn adjust(&self, key: InventoryKey, delta: f64) -> DbResult<InventoryLevel> {
        debug!(
            branch_id = key.branch_id,
            raw_material_id = key.raw_material_id,
            delta,
            "Adjusting inventory"
        );
        let mut conn = self.pool.acquire().await?;

        let result = sqlx::query(
            r#"
            UPDATE inventory SET
                quantity = ROUND(quantity + ?3, 2),
                version = version + 1,
                last_updated = ?4
            WHERE branch_id = ?1 AND raw_material_id = ?2
              AND ROUND(quantity + ?3, 2) >= 0
            "#,
        )
        .bind(key.branch_id)
        .bind(key.raw_material_id)
        .bind(delta)
        .bind(Utc::now())
        .execute(&mut *conn)
        .await?;

        if result.rows_affected() == 0 {
            return match fetch_level(&mut conn, key).await? {
                None => Err(not_found(key)),
                Some(_) => Err(DbError::rejected("Insufficient stock for this adjustment")),
            };
        }

        fetch_level(&mut conn, key).await?.ok_or_else(|| not_found(key))
    }

    pub async fn delete(&self, key: InventoryKey) -> DbResult<()> {
        debug!(
            branch_id = key.branch_id,
            raw_material_id = key.raw_material_id,
            "Deleting inventory record"
        );
        let result =
            sqlx::query("DELETE FROM inventory WHERE branch_id = ?1 AND raw_material_id = ?2")
                .bind(key.branch_id)
                .bind(key.raw_material_id)
                .execute(&self.pool)
                .await?;

        if result.rows_affected() == 0 {
            return Err(not_found(key));
        }
        Ok(())
    }
}

fn not_found(key: InventoryKey) -> DbError {
    DbError::not_found(
        "Inventory record",
        format!("{}/{}", key.branch_id, key.raw_material_id),
    )
}

async fn fetch_level(
    conn: &mut SqliteConnection,
    key: InventoryKey,
) -> DbResult<Option<InventoryLevel>> {
    let sql = format!("{LEVEL_SELECT} WHERE i.branch_id = ?1 AND i.raw_material_id = ?2");
    let level = sqlx::query_as::<_, InventoryLevel>(&sql)
        .bind(key.branch_id)
        .bind(key.raw_material_id)
        .fetch_optional(conn)
        .await?;
    Ok(level)
}

pub(crate) async fn levels_for_material(
    conn: &mut SqliteConnection,
    raw_material_id: i64,
) -> DbResult<Vec<InventoryLevel>> {
    let sql = format!("{LEVEL_SELECT} WHERE i.raw_material_id = ?1 ORDER BY i.branch_id");
    let levels = sqlx::query_as::<_, InventoryLevel>(&sql)
        .bind(raw_material_id)
        .fetch_all(conn)
        .await?;
    Ok(levels)
}

pub(crate) async fn levels_for_branch(
    conn: &mut SqliteConnection,
    branch_id: i64,
) -> DbResult<Vec<InventoryLevel>> {
    let sql = format!("{LEVEL_SELECT} WHERE i.branch_id = ?1 ORDER BY i.raw_material_id");
    let levels = sqlx::query_as::<_, InventoryLevel>(&sql)
        .bind(branch_id)
        .fetch_all(conn)
        .await?;
    Ok(levels)
}

async fn upsert_steps(conn: &mut SqliteConnection, input: InventoryUpsert) -> DbResult<UpsertOutcome> {
    let key = InventoryKey {
        branch_id: input.branch_id,
        raw_material_id: input.raw_material_id,
    };
    ensure_exists(&mut *conn, BRANCH_EXISTS, "Branch", key.branch_id).await?;
    ensure_exists(&mut *conn, RAW_MATERIAL_EXISTS, "Raw material", key.raw_material_id).await?;

    let stored: Option<i64> = sqlx::query_scalar(
        "SELECT version FROM inventory WHERE branch_id = ?1 AND raw_material_id = ?2",
    )
    .bind(key.branch_id)
    .bind(key.raw_material_id)
    .fetch_optional(&mut *conn)
    .await?;

    let now = Utc::now();
    let created = match (stored, input.expected_version) {
        (None, Some(_)) => return Err(DbError::StaleVersion),
        (None, None) => {
            sqlx::query(
                r#"
                INSERT INTO inventory (branch_id, raw_material_id, quantity, version, last_updated)
                VALUES (?1, ?2, ?3, 1, ?4)
                "#,
            )
            .bind(key.branch_id)
            .bind(key.raw_material_id)
            .bind(input.quantity)
            .bind(now)
            .execute(&mut *conn)
            .await?;
            true
        }
        (Some(version), expected) => {
            if expected.is_some_and(|e| e != version) {
                return Err(DbError::StaleVersion);
            }
            let result = sqlx::query(
                r#"
                UPDATE inventory SET
                    quantity = ?3,
                    version = version + 1,
                    last_updated = ?4
                WHERE branch_id = ?1 AND raw_material_id = ?2 AND version = ?5
                "#,
            )
            .bind(key.branch_id)
            .bind(key.raw_material_id)
            .bind(input.quantity)
            .bind(now)
            .bind(version)
            .execute(&mut *conn)
            .await?;
            if result.rows_affected() == 0 {
                return Err(DbError::StaleVersion);
            }
            false
        }
    };

    let level = fetch_level(&mut *conn, key).await?.ok_or_else(|| not_found(key))?;
    Ok(UpsertOutcome { level, created })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::testing::{db, insert_branch, insert_material};
    use crate::Database;

    async fn fixture() -> (Database, InventoryKey) {
        let db = db().await;
        let branch_id = insert_branch(&db, "Downtown").await;
        let raw_material_id = insert_material(&db, "Sugar", None).await;
        (
            db,
            InventoryKey {
                branch_id,
                raw_material_id,
            },
        )
    }

    fn upsert(key: InventoryKey, quantity: f64, expected_version: Option<i64>) -> InventoryUpsert {
        InventoryUpsert {
            branch_id: key.branch_id,
            raw_material_id: key.raw_material_id,
            quantity,
            expected_version,
        }
    }

    #[tokio::test]
    async fn test_upsert_creates_then_updates() {
        let (db, key) = fixture().await;
        let repo = db.inventory();

        let first = repo.upsert(&upsert(key, 12.5, None)).await.unwrap();
        assert!(first.created);
        assert_eq!(first.level.version, 1);
        assert_eq!(first.level.branch_name, "Downtown");
        assert_eq!(first.level.material_name, "Sugar");

        let second = repo.upsert(&upsert(key, 10.0, Some(1))).await.unwrap();
        assert!(!second.created);
        assert_eq!(second.level.quantity, 10.0);
        assert_eq!(second.level.version, 2);
    }

    #[tokio::test]
    async fn test_upsert_with_stale_version_is_refused() {
        let (db, key) = fixture().await;
        let repo = db.inventory();
        repo.upsert(&upsert(key, 5.0, None)).await.unwrap();
        repo.upsert(&upsert(key, 6.0, Some(1))).await.unwrap();

        let err = repo.upsert(&upsert(key, 7.0, Some(1))).await.unwrap_err();
        assert!(matches!(err, DbError::StaleVersion));

        let level = repo.get(key).await.unwrap().unwrap();
        assert_eq!(level.quantity, 6.0);
    }

    #[tokio::test]
    async fn test_upsert_unknown_branch() {
        let (db, key) = fixture().await;
        let err = db
            .inventory()
            .upsert(&upsert(
                InventoryKey {
                    branch_id: 99,
                    ..key
                },
                1.0,
                None,
            ))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Branch not found: 99");
    }

    #[tokio::test]
    async fn test_adjust_never_goes_negative() {
        let (db, key) = fixture().await;
        let repo = db.inventory();
        repo.upsert(&upsert(key, 3.0, None)).await.unwrap();

        let level = repo.adjust(key, -1.25).await.unwrap();
        assert_eq!(level.quantity, 1.75);
        assert_eq!(level.version, 2);

        let err = repo.adjust(key, -2.0).await.unwrap_err();
        assert_eq!(err.to_string(), "Insufficient stock for this adjustment");
        assert_eq!(repo.get(key).await.unwrap().unwrap().quantity, 1.75);
    }

    #[tokio::test]
    async fn test_adjust_and_delete_missing_record() {
        let (db, key) = fixture().await;
        let repo = db.inventory();

        let err = repo.adjust(key, 1.0).await.unwrap_err();
        assert!(matches!(err, DbError::NotFound { ref entity, .. } if entity == "Inventory record"));

        let err = repo.delete(key).await.unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_lookups_by_branch_and_material() {
        let (db, key) = fixture().await;
        let repo = db.inventory();
        repo.upsert(&upsert(key, 4.0, None)).await.unwrap();

        assert_eq!(repo.by_branch(key.branch_id).await.unwrap().len(), 1);
        assert_eq!(repo.by_material(key.raw_material_id).await.unwrap().len(), 1);
        assert_eq!(repo.list().await.unwrap().len(), 1);

        let err = repo.by_material(404).await.unwrap_err();
        assert_eq!(err.to_string(), "Raw material not found: 404");
    }
}
