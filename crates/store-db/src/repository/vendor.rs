//! # Vendor Repository
//!
//! Suppliers of raw materials.

use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use crate::repository::VENDOR_EXISTS;
use crate::unit::{atomically, ensure_exists, refuse_if_dependents};
use store_core::{NewVendor, Purchase, RawMaterial, Vendor, VendorDetail, VendorPatch};

const VENDOR_DEPENDENTS: &[&str] = &[
    "SELECT COUNT(*) FROM raw_material WHERE vendor_id = ?",
    "SELECT COUNT(*) FROM is_purchased WHERE vendor_id = ?",
];

#[derive(Debug, Clone)]
pub struct VendorRepository {
    pool: SqlitePool,
}

impl VendorRepository {
    pub fn new(pool: SqlitePool) -> Self {
        VendorRepository { pool }
    }

    pub async fn list(&self) -> DbResult<Vec<Vendor>> {
        let vendors = sqlx::query_as::<_, Vendor>(
            r#"
            SELECT vendor_id, vendor_name, phone, email, address, country
            FROM vendor
            ORDER BY vendor_id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        debug!(count = vendors.len(), "Listed vendors");
        Ok(vendors)
    }

    pub async fn get(&self, id: i64) -> DbResult<Option<Vendor>> {
        let vendor = sqlx::query_as::<_, Vendor>(
            r#"
            SELECT vendor_id, vendor_name, phone, email, address, country
            FROM vendor
            WHERE vendor_id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(vendor)
    }

    /// The vendor with the materials it supplies and its purchase history.
    pub async fn detail(&self, id: i64) -> DbResult<Option<VendorDetail>> {
        let Some(vendor) = self.get(id).await? else {
            return Ok(None);
        };

        let materials = sqlx::query_as::<_, RawMaterial>(
            r#"
            SELECT raw_material_id, material_name, description, vendor_id, last_updated
            FROM raw_material
            WHERE vendor_id = ?1
            ORDER BY raw_material_id
            "#,
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        let purchases = sqlx::query_as::<_, Purchase>(
            r#"
            SELECT purchase_id, raw_material_id, vendor_id, quantity, unit_price_cents,
                   purchase_date, delivery_date, status
            FROM is_purchased
            WHERE vendor_id = ?1
            ORDER BY purchase_date DESC
            "#,
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        Ok(Some(VendorDetail {
            vendor,
            materials,
            purchases,
        }))
    }

    pub async fn create(&self, input: &NewVendor) -> DbResult<Vendor> {
        debug!(name = %input.vendor_name, "Inserting vendor");

        let vendor = sqlx::query_as::<_, Vendor>(
            r#"
            INSERT INTO vendor (vendor_name, phone, email, address, country)
            VALUES (?1, ?2, ?3, ?4, ?5)
            RETURNING vendor_id, vendor_name, phone, email, address, country
            "#,
        )
        .bind(&input.vendor_name)
        .bind(&input.phone)
        .bind(&input.email)
        .bind(&input.address)
        .bind(&input.country)
        .fetch_one(&self.pool)
        .await?;

        Ok(vendor)
    }

    /// Merges `patch` into the stored row.
    pub async fn update(&self, id: i64, patch: &VendorPatch) -> DbResult<Vendor> {
        debug!(id, "Updating vendor");

        sqlx::query_as::<_, Vendor>(
            r#"
            UPDATE vendor SET
                vendor_name = COALESCE(?2, vendor_name),
                phone = COALESCE(?3, phone),
                email = COALESCE(?4, email),
                address = COALESCE(?5, address),
                country = COALESCE(?6, country)
            WHERE vendor_id = ?1
            RETURNING vendor_id, vendor_name, phone, email, address, country
            "#,
        )
        .bind(id)
        .bind(&patch.vendor_name)
        .bind(&patch.phone)
        .bind(&patch.email)
        .bind(&patch.address)
        .bind(&patch.country)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| DbError::not_found("Vendor", id))
    }

    /// Deletes a vendor that supplies no materials and has no purchases.
    pub async fn delete(&self, id: i64) -> DbResult<()> {
        debug!(id, "Deleting vendor");
        atomically(&self.pool, "delete vendor", move |conn| {
            Box::pin(delete_steps(conn, id))
        })
        .await
    }
}

async fn delete_steps(conn: &mut SqliteConnection, id: i64) -> DbResult<()> {
    ensure_exists(&mut *conn, VENDOR_EXISTS, "Vendor", id).await?;
    refuse_if_dependents(
        &mut *conn,
        VENDOR_DEPENDENTS,
        id,
        "Cannot delete vendor with associated materials or purchases",
    )
    .await?;
    sqlx::query("DELETE FROM vendor WHERE vendor_id = ?1")
        .bind(id)
        .execute(&mut *conn)
        .await?;
    Ok(())
}
