//! # Raw Material Repository
//!
//! Ingredients and supplies, their vendor and purchase history.

use std::collections::HashMap;

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use crate::repository::inventory::levels_for_material;
use crate::repository::{RAW_MATERIAL_EXISTS, VENDOR_EXISTS};
use crate::unit::{atomically, ensure_exists, refuse_if_dependents};
use store_core::{
    NewPurchase, NewRawMaterial, Purchase, RawMaterial, RawMaterialDetail, RawMaterialFilter,
    RawMaterialPatch, RawMaterialWithVendor, Vendor,
};

const RAW_MATERIAL_DEPENDENTS: &[&str] = &[
    "SELECT COUNT(*) FROM is_purchased WHERE raw_material_id = ?",
    "SELECT COUNT(*) FROM inventory WHERE raw_material_id = ?",
    "SELECT COUNT(*) FROM warehouse_have_raw_material WHERE raw_material_id = ?",
    "SELECT COUNT(*) FROM recipe WHERE raw_material_id = ?",
];

#[derive(Debug, Clone)]
pub struct RawMaterialRepository {
    pool: SqlitePool,
}

impl RawMaterialRepository {
    pub fn new(pool: SqlitePool) -> Self {
        RawMaterialRepository { pool }
    }

    /// All materials with their vendor, optionally only one vendor's.
    pub async fn list(&self, filter: &RawMaterialFilter) -> DbResult<Vec<RawMaterialWithVendor>> {
        let materials = sqlx::query_as::<_, RawMaterial>(
            r#"
            SELECT raw_material_id, material_name, description, vendor_id, last_updated
            FROM raw_material
            WHERE ?1 IS NULL OR vendor_id = ?1
            ORDER BY raw_material_id
            "#,
        )
        .bind(filter.vendor_id)
        .fetch_all(&self.pool)
        .await?;

        let vendors: HashMap<i64, Vendor> = sqlx::query_as::<_, Vendor>(
            "SELECT vendor_id, vendor_name, phone, email, address, country FROM vendor",
        )
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .map(|v| (v.vendor_id, v))
        .collect();

        debug!(count = materials.len(), "Listed raw materials");
        Ok(materials
            .into_iter()
            .map(|material| RawMaterialWithVendor {
                vendor: material.vendor_id.and_then(|id| vendors.get(&id).cloned()),
                material,
            })
            .collect())
    }

    pub async fn get(&self, id: i64) -> DbResult<Option<RawMaterial>> {
        let mut conn = self.pool.acquire().await?;
        fetch_material(&mut conn, id).await
    }

    /// The material with its vendor, purchases and stock per branch.
    pub async fn detail(&self, id: i64) -> DbResult<Option<RawMaterialDetail>> {
        let mut conn = self.pool.acquire().await?;
        let Some(material) = fetch_material(&mut conn, id).await? else {
            return Ok(None);
        };

        let vendor = match material.vendor_id {
            Some(vendor_id) => {
                sqlx::query_as::<_, Vendor>(
                    r#"
                    SELECT vendor_id, vendor_name, phone, email, address, country
                    FROM vendor WHERE vendor_id = ?1
                    "#,
                )
                .bind(vendor_id)
                .fetch_optional(&mut *conn)
                .await?
            }
            None => None,
        };

        let purchases = sqlx::query_as::<_, Purchase>(
            r#"
            SELECT purchase_id, raw_material_id, vendor_id, quantity, unit_price_cents,
                   purchase_date, delivery_date, status
            FROM is_purchased
            WHERE raw_material_id = ?1
            ORDER BY purchase_date DESC
            "#,
        )
        .bind(id)
        .fetch_all(&mut *conn)
        .await?;

        let inventory = levels_for_material(&mut conn, id).await?;

        Ok(Some(RawMaterialDetail {
            material,
            vendor,
            purchases,
            inventory,
        }))
    }

    /// Inserts a material. A named vendor must exist.
    pub async fn create(&self, input: &NewRawMaterial) -> DbResult<RawMaterial> {
        debug!(name = %input.material_name, "Inserting raw material");
        let input = input.clone();
        atomically(&self.pool, "create raw material", move |conn| {
            Box::pin(create_steps(conn, input))
        })
        .await
    }

    pub async fn update(&self, id: i64, patch: &RawMaterialPatch) -> DbResult<RawMaterial> {
        debug!(id, "Updating raw material");
        let patch = patch.clone();
        atomically(&self.pool, "update raw material", move |conn| {
            Box::pin(update_steps(conn, id, patch))
        })
        .await
    }

    /// Deletes a material nothing else refers to.
    pub async fn delete(&self, id: i64) -> DbResult<()> {
        debug!(id, "Deleting raw material");
        atomically(&self.pool, "delete raw material", move |conn| {
            Box::pin(delete_steps(conn, id))
        })
        .await
    }

    /// Records a purchase of the material from a vendor.
    pub async fn record_purchase(&self, id: i64, input: &NewPurchase) -> DbResult<Purchase> {
        debug!(id, vendor_id = input.vendor_id, "Recording purchase");
        let input = input.clone();
        atomically(&self.pool, "record purchase", move |conn| {
            Box::pin(purchase_steps(conn, id, input))
        })
        .await
    }
}

async fn fetch_material(conn: &mut SqliteConnection, id: i64) -> DbResult<Option<RawMaterial>> {
    let material = sqlx::query_as::<_, RawMaterial>(
        r#"
        SELECT raw_material_id, material_name, description, vendor_id, last_updated
        FROM raw_material
        WHERE raw_material_id = ?1
        "#,
    )
    .bind(id)
    .fetch_optional(conn)
    .await?;
    Ok(material)
}

async fn create_steps(conn: &mut SqliteConnection, input: NewRawMaterial) -> DbResult<RawMaterial> {
    if let Some(vendor_id) = input.vendor_id {
        ensure_exists(&mut *conn, VENDOR_EXISTS, "Vendor", vendor_id).await?;
    }

    let material = sqlx::query_as::<_, RawMaterial>(
        r#"
        INSERT INTO raw_material (material_name, description, vendor_id, last_updated)
        VALUES (?1, ?2, ?3, ?4)
        RETURNING raw_material_id, material_name, description, vendor_id, last_updated
        "#,
    )
    .bind(&input.material_name)
    .bind(&input.description)
    .bind(input.vendor_id)
    .bind(Utc::now())
    .fetch_one(&mut *conn)
    .await?;
    Ok(material)
}

async fn update_steps(
    conn: &mut SqliteConnection,
    id: i64,
    patch: RawMaterialPatch,
) -> DbResult<RawMaterial> {
    ensure_exists(&mut *conn, RAW_MATERIAL_EXISTS, "Raw material", id).await?;
    if let Some(vendor_id) = patch.vendor_id {
        ensure_exists(&mut *conn, VENDOR_EXISTS, "Vendor", vendor_id).await?;
    }

    sqlx::query_as::<_, RawMaterial>(
        r#"
        UPDATE raw_material SET
            material_name = COALESCE(?2, material_name),
            description = COALESCE(?3, description),
            vendor_id = COALESCE(?4, vendor_id),
            last_updated = ?5
        WHERE raw_material_id = ?1
        RETURNING raw_material_id, material_name, description, vendor_id, last_updated
        "#,
    )
    .bind(id)
    .bind(&patch.material_name)
    .bind(&patch.description)
    .bind(patch.vendor_id)
    .bind(Utc::now())
    .fetch_optional(&mut *conn)
    .await?
    .ok_or_else(|| DbError::not_found("Raw material", id))
}

async fn delete_steps(conn: &mut SqliteConnection, id: i64) -> DbResult<()> {
    ensure_exists(&mut *conn, RAW_MATERIAL_EXISTS, "Raw material", id).await?;
    refuse_if_dependents(
        &mut *conn,
        RAW_MATERIAL_DEPENDENTS,
        id,
        "Cannot delete raw material with associated records",
    )
    .await?;
    sqlx::query("DELETE FROM raw_material WHERE raw_material_id = ?1")
        .bind(id)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

async fn purchase_steps(
    conn: &mut SqliteConnection,
    id: i64,
    input: NewPurchase,
) -> DbResult<Purchase> {
    ensure_exists(&mut *conn, RAW_MATERIAL_EXISTS, "Raw material", id).await?;
    ensure_exists(&mut *conn, VENDOR_EXISTS, "Vendor", input.vendor_id).await?;

    let purchase = sqlx::query_as::<_, Purchase>(
        r#"
        INSERT INTO is_purchased (
            raw_material_id, vendor_id, quantity, unit_price_cents,
            purchase_date, delivery_date, status
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
        RETURNING purchase_id, raw_material_id, vendor_id, quantity, unit_price_cents,
                  purchase_date, delivery_date, status
        "#,
    )
    .bind(id)
    .bind(input.vendor_id)
    .bind(input.quantity)
    .bind(input.unit_price_cents)
    .bind(input.purchase_date)
    .bind(input.delivery_date)
    .bind(input.status)
    .fetch_one(&mut *conn)
    .await?;

    sqlx::query("UPDATE raw_material SET last_updated = ?2 WHERE raw_material_id = ?1")
        .bind(id)
        .bind(Utc::now())
        .execute(&mut *conn)
        .await?;

    Ok(purchase)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::testing::{count, db, insert_branch, insert_vendor};
    use chrono::Duration;
    use store_core::PurchaseStatus;

    fn flour(vendor_id: Option<i64>) -> NewRawMaterial {
        NewRawMaterial {
            material_name: "Flour".to_string(),
            description: Some("Type 00".to_string()),
            vendor_id,
        }
    }

    #[tokio::test]
    async fn test_create_with_vendor_and_get() {
        let db = db().await;
        let vendor_id = insert_vendor(&db, "Nile Mill").await;
        let repo = db.raw_materials();

        let created = repo.create(&flour(Some(vendor_id))).await.unwrap();
        let fetched = repo.get(created.raw_material_id).await.unwrap().unwrap();
        assert_eq!(created, fetched);
        assert_eq!(fetched.vendor_id, Some(vendor_id));
    }

    #[tokio::test]
    async fn test_create_with_missing_vendor() {
        let db = db().await;
        let err = db.raw_materials().create(&flour(Some(77))).await.unwrap_err();
        assert!(matches!(err, DbError::NotFound { ref entity, .. } if entity == "Vendor"));
        assert_eq!(count(&db, "SELECT COUNT(*) FROM raw_material").await, 0);
    }

    #[tokio::test]
    async fn test_list_filters_by_vendor() {
        let db = db().await;
        let mill = insert_vendor(&db, "Nile Mill").await;
        let dairy = insert_vendor(&db, "Dairy Co").await;
        let repo = db.raw_materials();
        repo.create(&flour(Some(mill))).await.unwrap();
        repo.create(&NewRawMaterial {
            material_name: "Butter".to_string(),
            description: None,
            vendor_id: Some(dairy),
        })
        .await
        .unwrap();

        let all = repo.list(&RawMaterialFilter::default()).await.unwrap();
        assert_eq!(all.len(), 2);

        let dairy_only = repo
            .list(&RawMaterialFilter {
                vendor_id: Some(dairy),
            })
            .await
            .unwrap();
        assert_eq!(dairy_only.len(), 1);
        assert_eq!(dairy_only[0].material.material_name, "Butter");
        assert_eq!(
            dairy_only[0].vendor.as_ref().map(|v| v.vendor_name.as_str()),
            Some("Dairy Co")
        );
    }

    #[tokio::test]
    async fn test_update_null_keeps_description() {
        let db = db().await;
        let repo = db.raw_materials();
        let material = repo.create(&flour(None)).await.unwrap();

        let updated = repo
            .update(
                material.raw_material_id,
                &RawMaterialPatch {
                    material_name: Some("Bread flour".to_string()),
                    description: None,
                    vendor_id: None,
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.material_name, "Bread flour");
        assert_eq!(updated.description.as_deref(), Some("Type 00"));
    }

    #[tokio::test]
    async fn test_delete_refused_with_inventory() {
        let db = db().await;
        let repo = db.raw_materials();
        let material = repo.create(&flour(None)).await.unwrap();
        let branch_id = insert_branch(&db, "Downtown").await;
        sqlx::query(
            "INSERT INTO inventory (branch_id, raw_material_id, quantity, last_updated) \
             VALUES (?, ?, 5, '2024-01-01T00:00:00Z')",
        )
        .bind(branch_id)
        .bind(material.raw_material_id)
        .execute(db.pool())
        .await
        .unwrap();

        let err = repo.delete(material.raw_material_id).await.unwrap_err();
        assert_eq!(err.to_string(), "Cannot delete raw material with associated records");
        assert!(repo.get(material.raw_material_id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_record_purchase_shows_in_detail() {
        let db = db().await;
        let vendor_id = insert_vendor(&db, "Nile Mill").await;
        let repo = db.raw_materials();
        let material = repo.create(&flour(Some(vendor_id))).await.unwrap();

        let bought = Utc::now();
        let purchase = repo
            .record_purchase(
                material.raw_material_id,
                &NewPurchase {
                    vendor_id,
                    quantity: 25.5,
                    unit_price_cents: 180,
                    purchase_date: bought,
                    delivery_date: Some(bought + Duration::days(2)),
                    status: PurchaseStatus::Pending,
                },
            )
            .await
            .unwrap();
        assert_eq!(purchase.quantity, 25.5);

        let detail = repo.detail(material.raw_material_id).await.unwrap().unwrap();
        assert_eq!(detail.purchases.len(), 1);
        assert_eq!(detail.vendor.map(|v| v.vendor_id), Some(vendor_id));
        assert!(detail.inventory.is_empty());

        // purchases now block deletion
        assert!(matches!(
            repo.delete(material.raw_material_id).await.unwrap_err(),
            DbError::Rejected(_)
        ));
    }
}
