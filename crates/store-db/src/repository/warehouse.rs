//! # Warehouse Repository
//!
//! Central stores and the raw-material stock they hold.

use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use crate::repository::RAW_MATERIAL_EXISTS;
use crate::unit::{atomically, ensure_exists, refuse_if_dependents};
use store_core::{
    NewWarehouse, StockLevel, Warehouse, WarehouseDetail, WarehousePatch, WarehouseStock,
};

const WAREHOUSE_EXISTS: &str = "SELECT EXISTS(SELECT 1 FROM warehouse WHERE warehouse_id = ?)";

const WAREHOUSE_DEPENDENTS: &[&str] =
    &["SELECT COUNT(*) FROM warehouse_have_raw_material WHERE warehouse_id = ?"];

#[derive(Debug, Clone)]
pub struct WarehouseRepository {
    pool: SqlitePool,
}

impl WarehouseRepository {
    pub fn new(pool: SqlitePool) -> Self {
        WarehouseRepository { pool }
    }

    pub async fn list(&self) -> DbResult<Vec<Warehouse>> {
        let warehouses = sqlx::query_as::<_, Warehouse>(
            "SELECT warehouse_id, phone_number, address FROM warehouse ORDER BY warehouse_id",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(warehouses)
    }

    pub async fn get(&self, id: i64) -> DbResult<Option<Warehouse>> {
        let warehouse = sqlx::query_as::<_, Warehouse>(
            "SELECT warehouse_id, phone_number, address FROM warehouse WHERE warehouse_id = ?1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(warehouse)
    }

    pub async fn detail(&self, id: i64) -> DbResult<Option<WarehouseDetail>> {
        let Some(warehouse) = self.get(id).await? else {
            return Ok(None);
        };
        let mut conn = self.pool.acquire().await?;
        let stock = stock_of(&mut conn, id).await?;
        Ok(Some(WarehouseDetail { warehouse, stock }))
    }

    pub async fn create(&self, input: &NewWarehouse) -> DbResult<Warehouse> {
        debug!(address = %input.address, "Inserting warehouse");
        let warehouse = sqlx::query_as::<_, Warehouse>(
            r#"
            INSERT INTO warehouse (phone_number, address) VALUES (?1, ?2)
            RETURNING warehouse_id, phone_number, address
            "#,
        )
        .bind(&input.phone_number)
        .bind(&input.address)
        .fetch_one(&self.pool)
        .await?;
        Ok(warehouse)
    }

    pub async fn update(&self, id: i64, patch: &WarehousePatch) -> DbResult<Warehouse> {
        debug!(id, "Updating warehouse");
        sqlx::query_as::<_, Warehouse>(
            r#"
            UPDATE warehouse SET
                phone_number = COALESCE(?2, phone_number),
                address = COALESCE(?3, address)
            WHERE warehouse_id = ?1
            RETURNING warehouse_id, phone_number, address
            "#,
        )
        .bind(id)
        .bind(&patch.phone_number)
        .bind(&patch.address)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| DbError::not_found("Warehouse", id))
    }

    pub async fn delete(&self, id: i64) -> DbResult<()> {
        debug!(id, "Deleting warehouse");
        atomically(&self.pool, "delete warehouse", move |conn| {
            Box::pin(delete_steps(conn, id))
        })
        .await
    }

    /// Sets the quantity of one material held at the warehouse, creating the
    /// stock row if needed. Returns the warehouse's full stock afterwards.
    pub async fn set_stock(&self, id: i64, level: &StockLevel) -> DbResult<Vec<WarehouseStock>> {
        debug!(id, raw_material_id = level.raw_material_id, "Setting warehouse stock");
        let level = level.clone();
        atomically(&self.pool, "set warehouse stock", move |conn| {
            Box::pin(stock_steps(conn, id, level))
        })
        .await
    }
}

async fn stock_of(conn: &mut SqliteConnection, id: i64) -> DbResult<Vec<WarehouseStock>> {
    let stock = sqlx::query_as::<_, WarehouseStock>(
        r#"
        SELECT w.warehouse_id, w.raw_material_id, rm.material_name, w.quantity
        FROM warehouse_have_raw_material w
        JOIN raw_material rm ON rm.raw_material_id = w.raw_material_id
        WHERE w.warehouse_id = ?1
        ORDER BY w.raw_material_id
        "#,
    )
    .bind(id)
    .fetch_all(conn)
    .await?;
    Ok(stock)
}

async fn delete_steps(conn: &mut SqliteConnection, id: i64) -> DbResult<()> {
    ensure_exists(&mut *conn, WAREHOUSE_EXISTS, "Warehouse", id).await?;
    refuse_if_dependents(
        &mut *conn,
        WAREHOUSE_DEPENDENTS,
        id,
        "Cannot delete warehouse with associated stock entries",
    )
    .await?;
    sqlx::query("DELETE FROM warehouse WHERE warehouse_id = ?1")
        .bind(id)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

async fn stock_steps(
    conn: &mut SqliteConnection,
    id: i64,
    level: StockLevel,
) -> DbResult<Vec<WarehouseStock>> {
    ensure_exists(&mut *conn, WAREHOUSE_EXISTS, "Warehouse", id).await?;
    ensure_exists(
        &mut *conn,
        RAW_MATERIAL_EXISTS,
        "Raw material",
        level.raw_material_id,
    )
    .await?;

    sqlx::query(
        r#"
        INSERT INTO warehouse_have_raw_material (warehouse_id, raw_material_id, quantity)
        VALUES (?1, ?2, ?3)
        ON CONFLICT (warehouse_id, raw_material_id) DO UPDATE SET quantity = excluded.quantity
        "#,
    )
    .bind(id)
    .bind(level.raw_material_id)
    .bind(level.quantity)
    .execute(&mut *conn)
    .await?;

    stock_of(&mut *conn, id).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::testing::{db, insert_material};

    fn depot() -> NewWarehouse {
        NewWarehouse {
            phone_number: None,
            address: "Industrial Zone 4".to_string(),
        }
    }

    #[tokio::test]
    async fn test_set_stock_upserts() {
        let db = db().await;
        let repo = db.warehouses();
        let warehouse = repo.create(&depot()).await.unwrap();
        let flour = insert_material(&db, "Flour", None).await;

        repo.set_stock(
            warehouse.warehouse_id,
            &StockLevel {
                raw_material_id: flour,
                quantity: 100.0,
            },
        )
        .await
        .unwrap();
        let stock = repo
            .set_stock(
                warehouse.warehouse_id,
                &StockLevel {
                    raw_material_id: flour,
                    quantity: 82.5,
                },
            )
            .await
            .unwrap();

        assert_eq!(stock.len(), 1);
        assert_eq!(stock[0].material_name, "Flour");
        assert_eq!(stock[0].quantity, 82.5);
    }

    #[tokio::test]
    async fn test_set_stock_unknown_material() {
        let db = db().await;
        let repo = db.warehouses();
        let warehouse = repo.create(&depot()).await.unwrap();
        let err = repo
            .set_stock(
                warehouse.warehouse_id,
                &StockLevel {
                    raw_material_id: 77,
                    quantity: 1.0,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::NotFound { ref entity, .. } if entity == "Raw material"));
    }

    #[tokio::test]
    async fn test_delete_refused_with_stock() {
        let db = db().await;
        let repo = db.warehouses();
        let warehouse = repo.create(&depot()).await.unwrap();
        let sugar = insert_material(&db, "Sugar", None).await;
        repo.set_stock(
            warehouse.warehouse_id,
            &StockLevel {
                raw_material_id: sugar,
                quantity: 5.0,
            },
        )
        .await
        .unwrap();

        let err = repo.delete(warehouse.warehouse_id).await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "Cannot delete warehouse with associated stock entries"
        );

        let patched = repo
            .update(
                warehouse.warehouse_id,
                &WarehousePatch {
                    phone_number: Some("555-0199".to_string()),
                    address: None,
                },
            )
            .await
            .unwrap();
        assert_eq!(patched.address, "Industrial Zone 4");
        assert_eq!(patched.phone_number.as_deref(), Some("555-0199"));
    }
}
