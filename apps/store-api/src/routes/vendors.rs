//! `/api/v1/vendors`: public reads, employee writes.

use axum::extract::State;
use axum::routing::get;
use axum::Router;

use store_core::{NewVendor, VendorPatch};

use crate::auth::StaffUser;
use crate::error::{ApiError, ApiResult};
use crate::response::Reply;
use crate::validate::{IdParam, JsonBody, Params};
use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_vendors).post(create_vendor))
        .route(
            "/{id}",
            get(get_vendor).patch(update_vendor).delete(delete_vendor),
        )
}

async fn list_vendors(State(state): State<AppState>) -> ApiResult<Reply> {
    let vendors = state.db.vendors().list().await?;
    Ok(Reply::ok().list("vendors", &vendors))
}

async fn get_vendor(State(state): State<AppState>, Params(params): Params) -> ApiResult<Reply> {
    let IdParam { id } = state.validate("vendors.get", &params)?;
    let vendor = state
        .db
        .vendors()
        .detail(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Vendor not found"))?;
    Ok(Reply::ok().data("vendor", vendor))
}

async fn create_vendor(
    State(state): State<AppState>,
    _staff: StaffUser,
    JsonBody(body): JsonBody,
) -> ApiResult<Reply> {
    let input: NewVendor = state.validate("vendors.create", &body)?;
    let vendor = state.db.vendors().create(&input).await?;
    Ok(Reply::created().data("vendor", vendor))
}

async fn update_vendor(
    State(state): State<AppState>,
    _staff: StaffUser,
    Params(params): Params,
    JsonBody(body): JsonBody,
) -> ApiResult<Reply> {
    let IdParam { id } = state.validate("vendors.get", &params)?;
    let patch: VendorPatch = state.validate("vendors.update", &body)?;
    let vendor = state.db.vendors().update(id, &patch).await?;
    Ok(Reply::ok().data("vendor", vendor))
}

async fn delete_vendor(
    State(state): State<AppState>,
    _staff: StaffUser,
    Params(params): Params,
) -> ApiResult<Reply> {
    let IdParam { id } = state.validate("vendors.get", &params)?;
    state.db.vendors().delete(id).await?;
    Ok(Reply::no_content())
}
