//! # Vehicle Repository
//!
//! Delivery fleet and rental records.

use std::collections::HashMap;

use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use crate::repository::AGENCY_EXISTS;
use crate::unit::{atomically, ensure_exists, refuse_if_dependents};
use store_core::{
    Agency, NewRental, NewVehicle, Rental, Vehicle, VehicleDetail, VehicleFilter, VehiclePatch,
    VehicleWithAgency,
};

const VEHICLE_EXISTS: &str = "SELECT EXISTS(SELECT 1 FROM vehicle WHERE vehicle_id = ?)";

const VEHICLE_DEPENDENTS: &[&str] = &["SELECT COUNT(*) FROM vehicle_rental WHERE vehicle_id = ?"];

const VEHICLE_COLUMNS: &str = "vehicle_id, vin, plate_number, make, model, year, mileage, \
     acquisition_type, acquisition_date, purchase_price_cents, notes, org_id";

#[derive(Debug, Clone)]
pub struct VehicleRepository {
    pool: SqlitePool,
}

impl VehicleRepository {
    pub fn new(pool: SqlitePool) -> Self {
        VehicleRepository { pool }
    }

    /// Vehicles with their agency, optionally only one agency's.
    pub async fn list(&self, filter: &VehicleFilter) -> DbResult<Vec<VehicleWithAgency>> {
        let sql = format!(
            "SELECT {VEHICLE_COLUMNS} FROM vehicle \
             WHERE ?1 IS NULL OR org_id = ?1 ORDER BY vehicle_id"
        );
        let vehicles = sqlx::query_as::<_, Vehicle>(&sql)
            .bind(filter.org_id)
            .fetch_all(&self.pool)
            .await?;

        let agencies: HashMap<i64, Agency> =
            sqlx::query_as::<_, Agency>("SELECT agency_id, name, contact_info FROM agency")
                .fetch_all(&self.pool)
                .await?
                .into_iter()
                .map(|a| (a.agency_id, a))
                .collect();

        debug!(count = vehicles.len(), "Listed vehicles");
        Ok(vehicles
            .into_iter()
            .map(|vehicle| VehicleWithAgency {
                agency: vehicle.org_id.and_then(|id| agencies.get(&id).cloned()),
                vehicle,
            })
            .collect())
    }

    pub async fn get(&self, id: i64) -> DbResult<Option<Vehicle>> {
        let mut conn = self.pool.acquire().await?;
        fetch_vehicle(&mut conn, id).await
    }

    /// The vehicle with its agency and rental history.
    pub async fn detail(&self, id: i64) -> DbResult<Option<VehicleDetail>> {
        let mut conn = self.pool.acquire().await?;
        let Some(vehicle) = fetch_vehicle(&mut conn, id).await? else {
            return Ok(None);
        };

        let agency = match vehicle.org_id {
            Some(org_id) => {
                sqlx::query_as::<_, Agency>(
                    "SELECT agency_id, name, contact_info FROM agency WHERE agency_id = ?1",
                )
                .bind(org_id)
                .fetch_optional(&mut *conn)
                .await?
            }
            None => None,
        };

        let rentals = sqlx::query_as::<_, Rental>(
            r#"
            SELECT rental_id, vehicle_id, agency_id, start_date, end_date, daily_rate_cents
            FROM vehicle_rental
            WHERE vehicle_id = ?1
            ORDER BY start_date DESC
            "#,
        )
        .bind(id)
        .fetch_all(&mut *conn)
        .await?;

        Ok(Some(VehicleDetail {
            vehicle,
            agency,
            rentals,
        }))
    }

    /// Inserts a vehicle. A named agency must exist.
    pub async fn create(&self, input: &NewVehicle) -> DbResult<Vehicle> {
        debug!(vin = %input.vin, "Inserting vehicle");
        let input = input.clone();
        atomically(&self.pool, "create vehicle", move |conn| {
            Box::pin(create_steps(conn, input))
        })
        .await
    }

    pub async fn update(&self, id: i64, patch: &VehiclePatch) -> DbResult<Vehicle> {
        debug!(id, "Updating vehicle");
        let patch = patch.clone();
        atomically(&self.pool, "update vehicle", move |conn| {
            Box::pin(update_steps(conn, id, patch))
        })
        .await
    }

    pub async fn delete(&self, id: i64) -> DbResult<()> {
        debug!(id, "Deleting vehicle");
        atomically(&self.pool, "delete vehicle", move |conn| {
            Box::pin(delete_steps(conn, id))
        })
        .await
    }

    /// Records a rental of the vehicle through an agency.
    pub async fn record_rental(&self, id: i64, input: &NewRental) -> DbResult<Rental> {
        debug!(id, agency_id = input.agency_id, "Recording rental");
        let input = input.clone();
        atomically(&self.pool, "record rental", move |conn| {
            Box::pin(rental_steps(conn, id, input))
        })
        .await
    }
}

async fn fetch_vehicle(conn: &mut SqliteConnection, id: i64) -> DbResult<Option<Vehicle>> {
    let sql = format!("SELECT {VEHICLE_COLUMNS} FROM vehicle WHERE vehicle_id = ?1");
    let vehicle = sqlx::query_as::<_, Vehicle>(&sql)
        .bind(id)
        .fetch_optional(conn)
        .await?;
    Ok(vehicle)
}

async fn create_steps(conn: &mut SqliteConnection, input: NewVehicle) -> DbResult<Vehicle> {
    if let Some(org_id) = input.org_id {
        ensure_exists(&mut *conn, AGENCY_EXISTS, "Agency", org_id).await?;
    }

    let sql = format!(
        "INSERT INTO vehicle (vin, plate_number, make, model, year, mileage, acquisition_type, \
         acquisition_date, purchase_price_cents, notes, org_id) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11) \
         RETURNING {VEHICLE_COLUMNS}"
    );
    let vehicle = sqlx::query_as::<_, Vehicle>(&sql)
        .bind(&input.vin)
        .bind(&input.plate_number)
        .bind(&input.make)
        .bind(&input.model)
        .bind(input.year)
        .bind(input.mileage)
        .bind(input.acquisition_type)
        .bind(input.acquisition_date)
        .bind(input.purchase_price_cents)
        .bind(&input.notes)
        .bind(input.org_id)
        .fetch_one(&mut *conn)
        .await?;
    Ok(vehicle)
}

async fn update_steps(
    conn: &mut SqliteConnection,
    id: i64,
    patch: VehiclePatch,
) -> DbResult<Vehicle> {
    ensure_exists(&mut *conn, VEHICLE_EXISTS, "Vehicle", id).await?;
    if let Some(org_id) = patch.org_id {
        ensure_exists(&mut *conn, AGENCY_EXISTS, "Agency", org_id).await?;
    }

    let sql = format!(
        "UPDATE vehicle SET \
             vin = COALESCE(?2, vin), \
             plate_number = COALESCE(?3, plate_number), \
             make = COALESCE(?4, make), \
             model = COALESCE(?5, model), \
             year = COALESCE(?6, year), \
             mileage = COALESCE(?7, mileage), \
             acquisition_type = COALESCE(?8, acquisition_type), \
             acquisition_date = COALESCE(?9, acquisition_date), \
             purchase_price_cents = COALESCE(?10, purchase_price_cents), \
             notes = COALESCE(?11, notes), \
             org_id = COALESCE(?12, org_id) \
         WHERE vehicle_id = ?1 \
         RETURNING {VEHICLE_COLUMNS}"
    );
    sqlx::query_as::<_, Vehicle>(&sql)
        .bind(id)
        .bind(&patch.vin)
        .bind(&patch.plate_number)
        .bind(&patch.make)
        .bind(&patch.model)
        .bind(patch.year)
        .bind(patch.mileage)
        .bind(patch.acquisition_type)
        .bind(patch.acquisition_date)
        .bind(patch.purchase_price_cents)
        .bind(&patch.notes)
        .bind(patch.org_id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| DbError::not_found("Vehicle", id))
}

async fn delete_steps(conn: &mut SqliteConnection, id: i64) -> DbResult<()> {
    ensure_exists(&mut *conn, VEHICLE_EXISTS, "Vehicle", id).await?;
    refuse_if_dependents(
        &mut *conn,
        VEHICLE_DEPENDENTS,
        id,
        "Cannot delete vehicle with associated rentals",
    )
    .await?;
    sqlx::query("DELETE FROM vehicle WHERE vehicle_id = ?1")
        .bind(id)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

async fn rental_steps(conn: &mut SqliteConnection, id: i64, input: NewRental) -> DbResult<Rental> {
    ensure_exists(&mut *conn, VEHICLE_EXISTS, "Vehicle", id).await?;
    ensure_exists(&mut *conn, AGENCY_EXISTS, "Agency", input.agency_id).await?;

    let rental = sqlx::query_as::<_, Rental>(
        r#"
        INSERT INTO vehicle_rental (vehicle_id, agency_id, start_date, end_date, daily_rate_cents)
        VALUES (?1, ?2, ?3, ?4, ?5)
        RETURNING rental_id, vehicle_id, agency_id, start_date, end_date, daily_rate_cents
        "#,
    )
    .bind(id)
    .bind(input.agency_id)
    .bind(input.start_date)
    .bind(input.end_date)
    .bind(input.daily_rate_cents)
    .fetch_one(&mut *conn)
    .await?;
    Ok(rental)
}
