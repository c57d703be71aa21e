//! `/api/v1/vehicles`: delivery fleet and its rentals.

use axum::extract::State;
use axum::routing::{get, post};
use axum::Router;
use serde_json::json;

use store_core::{NewRental, NewVehicle, VehicleFilter, VehiclePatch};

use crate::auth::StaffUser;
use crate::error::{ApiError, ApiResult};
use crate::response::Reply;
use crate::validate::{IdParam, JsonBody, Params, QueryParams};
use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_vehicles).post(create_vehicle))
        .route(
            "/{id}",
            get(get_vehicle).patch(update_vehicle).delete(delete_vehicle),
        )
        .route("/{id}/rentals", post(record_rental))
}

/// `GET /vehicles?org_id=`
async fn list_vehicles(
    State(state): State<AppState>,
    QueryParams(query): QueryParams,
) -> ApiResult<Reply> {
    let filter: VehicleFilter = state.validate("vehicles.list", &query)?;
    let vehicles = state.db.vehicles().list(&filter).await?;
    Ok(Reply::ok().list("vehicles", &vehicles))
}

async fn get_vehicle(State(state): State<AppState>, Params(params): Params) -> ApiResult<Reply> {
    let IdParam { id } = state.validate("vehicles.get", &params)?;
    let vehicle = state
        .db
        .vehicles()
        .detail(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Vehicle not found"))?;
    Ok(Reply::ok().data("vehicle", vehicle))
}

async fn create_vehicle(
    State(state): State<AppState>,
    _staff: StaffUser,
    JsonBody(body): JsonBody,
) -> ApiResult<Reply> {
    let input: NewVehicle = state.validate("vehicles.create", &body)?;
    let vehicle = state.db.vehicles().create(&input).await?;
    Ok(Reply::created().data("vehicle", vehicle))
}

async fn update_vehicle(
    State(state): State<AppState>,
    _staff: StaffUser,
    Params(params): Params,
    JsonBody(body): JsonBody,
) -> ApiResult<Reply> {
    let IdParam { id } = state.validate("vehicles.get", &params)?;
    let patch: VehiclePatch = state.validate("vehicles.update", &body)?;
    let vehicle = state.db.vehicles().update(id, &patch).await?;
    Ok(Reply::ok().data("vehicle", vehicle))
}

async fn delete_vehicle(
    State(state): State<AppState>,
    _staff: StaffUser,
    Params(params): Params,
) -> ApiResult<Reply> {
    let IdParam { id } = state.validate("vehicles.get", &params)?;
    state.db.vehicles().delete(id).await?;
    Ok(Reply::no_content())
}

/// Records a rental and reports its billed cost alongside.
async fn record_rental(
    State(state): State<AppState>,
    _staff: StaffUser,
    Params(params): Params,
    JsonBody(body): JsonBody,
) -> ApiResult<Reply> {
    let IdParam { id } = state.validate("vehicles.get", &params)?;
    let input: NewRental = state.validate("vehicles.rental", &body)?;
    let rental = state.db.vehicles().record_rental(id, &input).await?;
    let cost = json!({
        "billable_days": rental.billable_days(),
        "total_cost_cents": rental.total_cost().cents(),
    });
    Ok(Reply::created().data("rental", rental).data("cost", cost))
}
