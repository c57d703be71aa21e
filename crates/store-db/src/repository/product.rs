//! # Product Repository
//!
//! Catalog items and the raw materials each recipe calls for.

use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use crate::repository::{PRODUCT_EXISTS, RAW_MATERIAL_EXISTS};
use crate::unit::{atomically, ensure_exists, refuse_if_dependents};
use store_core::{NewProduct, Product, ProductDetail, ProductMaterial, ProductPatch, RecipeLine};

const PRODUCT_DEPENDENTS: &[&str] = &["SELECT COUNT(*) FROM order_details WHERE product_id = ?"];

#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

impl ProductRepository {
    pub fn new(pool: SqlitePool) -> Self {
        ProductRepository { pool }
    }

    pub async fn list(&self) -> DbResult<Vec<Product>> {
        let products = sqlx::query_as::<_, Product>(
            r#"
            SELECT product_id, product_name, description, base_price_cents
            FROM product
            ORDER BY product_id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        debug!(count = products.len(), "Listed products");
        Ok(products)
    }

    pub async fn get(&self, id: i64) -> DbResult<Option<Product>> {
        let mut conn = self.pool.acquire().await?;
        fetch_product(&mut conn, id).await
    }

    /// The product with its recipe.
    pub async fn detail(&self, id: i64) -> DbResult<Option<ProductDetail>> {
        let mut conn = self.pool.acquire().await?;
        let Some(product) = fetch_product(&mut conn, id).await? else {
            return Ok(None);
        };
        let materials = recipe_of(&mut conn, id).await?;
        Ok(Some(ProductDetail { product, materials }))
    }

    pub async fn create(&self, input: &NewProduct) -> DbResult<Product> {
        debug!(name = %input.product_name, "Inserting product");
        let product = sqlx::query_as::<_, Product>(
            r#"
            INSERT INTO product (product_name, description, base_price_cents)
            VALUES (?1, ?2, ?3)
            RETURNING product_id, product_name, description, base_price_cents
            "#,
        )
        .bind(&input.product_name)
        .bind(&input.description)
        .bind(input.base_price_cents)
        .fetch_one(&self.pool)
        .await?;
        Ok(product)
    }

    pub async fn update(&self, id: i64, patch: &ProductPatch) -> DbResult<Product> {
        debug!(id, "Updating product");
        sqlx::query_as::<_, Product>(
            r#"
            UPDATE product SET
                product_name = COALESCE(?2, product_name),
                description = COALESCE(?3, description),
                base_price_cents = COALESCE(?4, base_price_cents)
            WHERE product_id = ?1
            RETURNING product_id, product_name, description, base_price_cents
            "#,
        )
        .bind(id)
        .bind(&patch.product_name)
        .bind(&patch.description)
        .bind(patch.base_price_cents)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| DbError::not_found("Product", id))
    }

    /// Deletes a product that no order line references. Its recipe rows go
    /// with it.
    pub async fn delete(&self, id: i64) -> DbResult<()> {
        debug!(id, "Deleting product");
        atomically(&self.pool, "delete product", move |conn| {
            Box::pin(delete_steps(conn, id))
        })
        .await
    }

    /// Adds a material to the recipe or replaces its quantity and unit.
    pub async fn set_material(&self, id: i64, line: &RecipeLine) -> DbResult<ProductDetail> {
        debug!(id, raw_material_id = line.raw_material_id, "Setting recipe line");
        let line = line.clone();
        atomically(&self.pool, "set recipe material", move |conn| {
            Box::pin(recipe_steps(conn, id, line))
        })
        .await
    }
}

async fn fetch_product(conn: &mut SqliteConnection, id: i64) -> DbResult<Option<Product>> {
    let product = sqlx::query_as::<_, Product>(
        r#"
        SELECT product_id, product_name, description, base_price_cents
        FROM product
        WHERE product_id = ?1
        "#,
    )
    .bind(id)
    .fetch_optional(conn)
    .await?;
    Ok(product)
}

async fn recipe_of(conn: &mut SqliteConnection, id: i64) -> DbResult<Vec<ProductMaterial>> {
    let materials = sqlx::query_as::<_, ProductMaterial>(
        r#"
        SELECT r.raw_material_id, rm.material_name, r.quantity_needed, r.unit_of_measure
        FROM recipe r
        JOIN raw_material rm ON rm.raw_material_id = r.raw_material_id
        WHERE r.product_id = ?1
        ORDER BY r.raw_material_id
        "#,
    )
    .bind(id)
    .fetch_all(conn)
    .await?;
    Ok(materials)
}

async fn delete_steps(conn: &mut SqliteConnection, id: i64) -> DbResult<()> {
    ensure_exists(&mut *conn, PRODUCT_EXISTS, "Product", id).await?;
    refuse_if_dependents(
        &mut *conn,
        PRODUCT_DEPENDENTS,
        id,
        "Cannot delete product with associated orders",
    )
    .await?;
    sqlx::query("DELETE FROM product WHERE product_id = ?1")
        .bind(id)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

async fn recipe_steps(
    conn: &mut SqliteConnection,
    id: i64,
    line: RecipeLine,
) -> DbResult<ProductDetail> {
    let product = fetch_product(&mut *conn, id)
        .await?
        .ok_or_else(|| DbError::not_found("Product", id))?;
    ensure_exists(
        &mut *conn,
        RAW_MATERIAL_EXISTS,
        "Raw material",
        line.raw_material_id,
    )
    .await?;

    sqlx::query(
        r#"
        INSERT INTO recipe (product_id, raw_material_id, quantity_needed, unit_of_measure)
        VALUES (?1, ?2, ?3, ?4)
        ON CONFLICT (product_id, raw_material_id) DO UPDATE SET
            quantity_needed = excluded.quantity_needed,
            unit_of_measure = excluded.unit_of_measure
        "#,
    )
    .bind(id)
    .bind(line.raw_material_id)
    .bind(line.quantity_needed)
    .bind(&line.unit_of_measure)
    .execute(&mut *conn)
    .await?;

    let materials = recipe_of(&mut *conn, id).await?;
    Ok(ProductDetail { product, materials })
}
