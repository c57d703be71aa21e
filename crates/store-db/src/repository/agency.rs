//! # Agency Repository
//!
//! Rental agencies that own or lease fleet vehicles.

use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use crate::repository::AGENCY_EXISTS;
use crate::unit::{atomically, ensure_exists, refuse_if_dependents};
use store_core::{Agency, AgencyDetail, AgencyPatch, NewAgency, Rental, Vehicle};

const AGENCY_DEPENDENTS: &[&str] = &[
    "SELECT COUNT(*) FROM vehicle WHERE org_id = ?",
    "SELECT COUNT(*) FROM vehicle_rental WHERE agency_id = ?",
];

#[derive(Debug, Clone)]
pub struct AgencyRepository {
    pool: SqlitePool,
}

impl AgencyRepository {
    pub fn new(pool: SqlitePool) -> Self {
        AgencyRepository { pool }
    }

    pub async fn list(&self) -> DbResult<Vec<Agency>> {
        let agencies = sqlx::query_as::<_, Agency>(
            "SELECT agency_id, name, contact_info FROM agency ORDER BY agency_id",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(agencies)
    }

    pub async fn get(&self, id: i64) -> DbResult<Option<Agency>> {
        let agency = sqlx::query_as::<_, Agency>(
            "SELECT agency_id, name, contact_info FROM agency WHERE agency_id = ?1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(agency)
    }

    /// The agency with its vehicles and rentals.
    pub async fn detail(&self, id: i64) -> DbResult<Option<AgencyDetail>> {
        let Some(agency) = self.get(id).await? else {
            return Ok(None);
        };

        let vehicles = sqlx::query_as::<_, Vehicle>(
            r#"
            SELECT vehicle_id, vin, plate_number, make, model, year, mileage,
                   acquisition_type, acquisition_date, purchase_price_cents, notes, org_id
            FROM vehicle
            WHERE org_id = ?1
            ORDER BY vehicle_id
            "#,
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        let rentals = sqlx::query_as::<_, Rental>(
            r#"
            SELECT rental_id, vehicle_id, agency_id, start_date, end_date, daily_rate_cents
            FROM vehicle_rental
            WHERE agency_id = ?1
            ORDER BY start_date DESC
            "#,
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        Ok(Some(AgencyDetail {
            agency,
            vehicles,
            rentals,
        }))
    }

    pub async fn create(&self, input: &NewAgency) -> DbResult<Agency> {
        debug!(name = %input.name, "Inserting agency");
        let agency = sqlx::query_as::<_, Agency>(
            r#"
            INSERT INTO agency (name, contact_info) VALUES (?1, ?2)
            RETURNING agency_id, name, contact_info
            "#,
        )
        .bind(&input.name)
        .bind(&input.contact_info)
        .fetch_one(&self.pool)
        .await?;
        Ok(agency)
    }

    pub async fn update(&self, id: i64, patch: &AgencyPatch) -> DbResult<Agency> {
        debug!(id, "Updating agency");
        sqlx::query_as::<_, Agency>(
            r#"
            UPDATE agency SET
                name = COALESCE(?2, name),
                contact_info = COALESCE(?3, contact_info)
            WHERE agency_id = ?1
            RETURNING agency_id, name, contact_info
            "#,
        )
        .bind(id)
        .bind(&patch.name)
        .bind(&patch.contact_info)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| DbError::not_found("Agency", id))
    }

    pub async fn delete(&self, id: i64) -> DbResult<()> {
        debug!(id, "Deleting agency");
        atomically(&self.pool, "delete agency", move |conn| {
            Box::pin(delete_steps(conn, id))
        })
        .await
    }
}

async fn delete_steps(conn: &mut SqliteConnection, id: i64) -> DbResult<()> {
    ensure_exists(&mut *conn, AGENCY_EXISTS, "Agency", id).await?;
    refuse_if_dependents(
        &mut *conn,
        AGENCY_DEPENDENTS,
        id,
        "Cannot delete agency with associated vehicles or rentals",
    )
    .await?;
    sqlx::query("DELETE FROM agency WHERE agency_id = ?1")
        .bind(id)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::testing::{count, db};

    #[tokio::test]
    async fn test_crud_round() {
        let db = db().await;
        let repo = db.agencies();

        let agency = repo
            .create(&NewAgency {
                name: "Cairo Fleet".to_string(),
                contact_info: Some("fleet@example.com".to_string()),
            })
            .await
            .unwrap();

        let renamed = repo
            .update(
                agency.agency_id,
                &AgencyPatch {
                    name: Some("Cairo Fleet Ltd".to_string()),
                    contact_info: None,
                },
            )
            .await
            .unwrap();
        assert_eq!(renamed.name, "Cairo Fleet Ltd");
        assert_eq!(renamed.contact_info, agency.contact_info);

        assert_eq!(repo.list().await.unwrap().len(), 1);
        repo.delete(agency.agency_id).await.unwrap();
        assert!(repo.get(agency.agency_id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_refused_with_vehicles() {
        let db = db().await;
        let repo = db.agencies();
        let agency = repo
            .create(&NewAgency {
                name: "Cairo Fleet".to_string(),
                contact_info: None,
            })
            .await
            .unwrap();
        sqlx::query(
            "INSERT INTO vehicle (vin, plate_number, make, model, year, acquisition_type, \
             acquisition_date, org_id) VALUES ('1HGCM', 'ABC-1', 'Ford', 'Transit', 2022, \
             'lease', '2024-01-01T00:00:00Z', ?)",
        )
        .bind(agency.agency_id)
        .execute(db.pool())
        .await
        .unwrap();

        let err = repo.delete(agency.agency_id).await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "Cannot delete agency with associated vehicles or rentals"
        );
        assert_eq!(count(&db, "SELECT COUNT(*) FROM agency").await, 1);
        assert_eq!(count(&db, "SELECT COUNT(*) FROM vehicle").await, 1);

        let detail = repo.detail(agency.agency_id).await.unwrap().unwrap();
        assert_eq!(detail.vehicles.len(), 1);
    }
}
