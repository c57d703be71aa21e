//! Agencies, vehicles and rentals.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::Money;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Agency {
    pub agency_id: i64,
    pub name: String,
    pub contact_info: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AgencyDetail {
    #[serde(flatten)]
    pub agency: Agency,
    pub vehicles: Vec<Vehicle>,
    pub rentals: Vec<Rental>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewAgency {
    pub name: String,
    pub contact_info: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AgencyPatch {
    pub name: Option<String>,
    pub contact_info: Option<String>,
}

// =============================================================================
// Vehicles
// =============================================================================

/// How the business came to hold a vehicle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum AcquisitionType {
    Purchase,
    Lease,
    Rental,
}

impl AcquisitionType {
    pub const ALL: &'static [&'static str] = &["purchase", "lease", "rental"];
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Vehicle {
    pub vehicle_id: i64,
    pub vin: String,
    pub plate_number: String,
    pub make: String,
    pub model: String,
    pub year: i64,
    pub mileage: i64,
    pub acquisition_type: AcquisitionType,
    #[ts(as = "String")]
    pub acquisition_date: DateTime<Utc>,
    pub purchase_price_cents: i64,
    pub notes: Option<String>,
    pub org_id: Option<i64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct VehicleWithAgency {
    #[serde(flatten)]
    pub vehicle: Vehicle,
    pub agency: Option<Agency>,
}

#[derive(Debug, Clone, Serialize)]
pub struct VehicleDetail {
    #[serde(flatten)]
    pub vehicle: Vehicle,
    pub agency: Option<Agency>,
    pub rentals: Vec<Rental>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewVehicle {
    pub vin: String,
    pub plate_number: String,
    pub make: String,
    pub model: String,
    pub year: i64,
    #[serde(default)]
    pub mileage: i64,
    pub acquisition_type: AcquisitionType,
    pub acquisition_date: DateTime<Utc>,
    #[serde(default)]
    pub purchase_price_cents: i64,
    pub notes: Option<String>,
    pub org_id: Option<i64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct VehiclePatch {
    pub vin: Option<String>,
    pub plate_number: Option<String>,
    pub make: Option<String>,
    pub model: Option<String>,
    pub year: Option<i64>,
    pub mileage: Option<i64>,
    pub acquisition_type: Option<AcquisitionType>,
    pub acquisition_date: Option<DateTime<Utc>>,
    pub purchase_price_cents: Option<i64>,
    pub notes: Option<String>,
    pub org_id: Option<i64>,
}

/// `GET /vehicles?org_id=`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct VehicleFilter {
    pub org_id: Option<i64>,
}

// =============================================================================
// Rentals
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Rental {
    pub rental_id: i64,
    pub vehicle_id: i64,
    pub agency_id: i64,
    #[ts(as = "String")]
    pub start_date: DateTime<Utc>,
    #[ts(as = "String")]
    pub end_date: DateTime<Utc>,
    pub daily_rate_cents: i64,
}

impl Rental {
    /// Whole days billed, counting a partial day as a full one (minimum one).
    pub fn billable_days(&self) -> i64 {
        let hours = (self.end_date - self.start_date).num_hours().max(0);
        ((hours + 23) / 24).max(1)
    }

    pub fn total_cost(&self) -> Money {
        Money::from_cents(self.daily_rate_cents).multiply_quantity(self.billable_days())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewRental {
    pub agency_id: i64,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub daily_rate_cents: i64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn rental(hours: i64) -> Rental {
        let start = Utc::now();
        Rental {
            rental_id: 1,
            vehicle_id: 1,
            agency_id: 1,
            start_date: start,
            end_date: start + Duration::hours(hours),
            daily_rate_cents: 4500,
        }
    }

    #[test]
    fn test_billable_days_round_up() {
        assert_eq!(rental(0).billable_days(), 1);
        assert_eq!(rental(24).billable_days(), 1);
        assert_eq!(rental(25).billable_days(), 2);
        assert_eq!(rental(72).total_cost().cents(), 13500);
    }
}
