//! `/api/v1/raw-materials`: public reads, employee writes and purchases.

use axum::extract::State;
use axum::routing::{get, post};
use axum::Router;

use store_core::{NewPurchase, NewRawMaterial, RawMaterialFilter, RawMaterialPatch};

use crate::auth::StaffUser;
use crate::error::{ApiError, ApiResult};
use crate::response::Reply;
use crate::validate::{IdParam, JsonBody, Params, QueryParams};
use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_materials).post(create_material))
        .route(
            "/{id}",
            get(get_material)
                .patch(update_material)
                .delete(delete_material),
        )
        .route("/{id}/purchases", post(record_purchase))
}

/// `GET /raw-materials?vendor_id=`
async fn list_materials(
    State(state): State<AppState>,
    QueryParams(query): QueryParams,
) -> ApiResult<Reply> {
    let filter: RawMaterialFilter = state.validate("rawMaterials.list", &query)?;
    let materials = state.db.raw_materials().list(&filter).await?;
    Ok(Reply::ok().list("rawMaterials", &materials))
}

async fn get_material(State(state): State<AppState>, Params(params): Params) -> ApiResult<Reply> {
    let IdParam { id } = state.validate("rawMaterials.get", &params)?;
    let material = state
        .db
        .raw_materials()
        .detail(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Raw material not found"))?;
    Ok(Reply::ok().data("rawMaterial", material))
}

async fn create_material(
    State(state): State<AppState>,
    _staff: StaffUser,
    JsonBody(body): JsonBody,
) -> ApiResult<Reply> {
    let input: NewRawMaterial = state.validate("rawMaterials.create", &body)?;
    let material = state.db.raw_materials().create(&input).await?;
    Ok(Reply::created().data("rawMaterial", material))
}

async fn update_material(
    State(state): State<AppState>,
    _staff: StaffUser,
    Params(params): Params,
    JsonBody(body): JsonBody,
) -> ApiResult<Reply> {
    let IdParam { id } = state.validate("rawMaterials.get", &params)?;
    let patch: RawMaterialPatch = state.validate("rawMaterials.update", &body)?;
    let material = state.db.raw_materials().update(id, &patch).await?;
    Ok(Reply::ok().data("rawMaterial", material))
}

async fn delete_material(
    State(state): State<AppState>,
    _staff: StaffUser,
    Params(params): Params,
) -> ApiResult<Reply> {
    let IdParam { id } = state.validate("rawMaterials.get", &params)?;
    state.db.raw_materials().delete(id).await?;
    Ok(Reply::no_content())
}

async fn record_purchase(
    State(state): State<AppState>,
    _staff: StaffUser,
    Params(params): Params,
    JsonBody(body): JsonBody,
) -> ApiResult<Reply> {
    let IdParam { id } = state.validate("rawMaterials.get", &params)?;
    let input: NewPurchase = state.validate("rawMaterials.purchase", &body)?;
    let purchase = state.db.raw_materials().record_purchase(id, &input).await?;
    Ok(Reply::created().data("purchase", purchase))
}
