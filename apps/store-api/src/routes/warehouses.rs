//! `/api/v1/warehouses`: public reads, employee writes and stock levels.

use axum::extract::State;
use axum::routing::{get, put};
use axum::Router;

use store_core::{NewWarehouse, StockLevel, WarehousePatch};

use crate::auth::StaffUser;
use crate::error::{ApiError, ApiResult};
use crate::response::Reply;
use crate::validate::{IdParam, JsonBody, Params};
use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_warehouses).post(create_warehouse))
        .route(
            "/{id}",
            get(get_warehouse)
                .patch(update_warehouse)
                .delete(delete_warehouse),
        )
        .route("/{id}/stock", put(set_stock))
}

async fn list_warehouses(State(state): State<AppState>) -> ApiResult<Reply> {
    let warehouses = state.db.warehouses().list().await?;
    Ok(Reply::ok().list("warehouses", &warehouses))
}

async fn get_warehouse(State(state): State<AppState>, Params(params): Params) -> ApiResult<Reply> {
    let IdParam { id } = state.validate("warehouses.get", &params)?;
    let warehouse = state
        .db
        .warehouses()
        .detail(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Warehouse not found"))?;
    Ok(Reply::ok().data("warehouse", warehouse))
}

async fn create_warehouse(
    State(state): State<AppState>,
    _staff: StaffUser,
    JsonBody(body): JsonBody,
) -> ApiResult<Reply> {
    let input: NewWarehouse = state.validate("warehouses.create", &body)?;
    let warehouse = state.db.warehouses().create(&input).await?;
    Ok(Reply::created().data("warehouse", warehouse))
}

async fn update_warehouse(
    State(state): State<AppState>,
    _staff: StaffUser,
    Params(params): Params,
    JsonBody(body): JsonBody,
) -> ApiResult<Reply> {
    let IdParam { id } = state.validate("warehouses.get", &params)?;
    let patch: WarehousePatch = state.validate("warehouses.update", &body)?;
    let warehouse = state.db.warehouses().update(id, &patch).await?;
    Ok(Reply::ok().data("warehouse", warehouse))
}

async fn delete_warehouse(
    State(state): State<AppState>,
    _staff: StaffUser,
    Params(params): Params,
) -> ApiResult<Reply> {
    let IdParam { id } = state.validate("warehouses.get", &params)?;
    state.db.warehouses().delete(id).await?;
    Ok(Reply::no_content())
}

/// `PUT /warehouses/{id}/stock`: sets one material's quantity.
async fn set_stock(
    State(state): State<AppState>,
    _staff: StaffUser,
    Params(params): Params,
    JsonBody(body): JsonBody,
) -> ApiResult<Reply> {
    let IdParam { id } = state.validate("warehouses.get", &params)?;
    let level: StockLevel = state.validate("warehouses.stock", &body)?;
    let stock = state.db.warehouses().set_stock(id, &level).await?;
    Ok(Reply::ok().list("stock", &stock))
}
