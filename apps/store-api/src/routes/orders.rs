//! `/api/v1/orders`: authenticated.
//!
//! Customers see and manage only their own orders. Any identity that is
//! also an employee gets the staff view: every order, with its customer.

use axum::extract::State;
use axum::routing::{delete, get, post};
use axum::Router;
use tracing::info;

use store_core::{Identity, NewOrder, NewPayment, OrderDetail, OrderPatch};

use crate::auth::CurrentUser;
use crate::error::{ApiError, ApiResult};
use crate::response::Reply;
use crate::validate::{IdParam, JsonBody, Params};
use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_orders).post(create_order))
        .route("/{id}", get(get_order).patch(update_order))
        .route("/{id}/cancel", delete(cancel_order))
        .route("/{id}/payments", post(record_payment))
}

/// Loads an order the caller may act on; `action` names the verb in the
/// refusal message.
async fn owned_order(
    state: &AppState,
    identity: &Identity,
    id: i64,
    action: &str,
) -> ApiResult<OrderDetail> {
    let order = state
        .db
        .orders()
        .get(id, identity.is_employee)
        .await?
        .ok_or_else(|| ApiError::not_found("Order not found"))?;
    if !identity.is_employee && order.order.customer_id != identity.id() {
        return Err(ApiError::forbidden(format!(
            "You do not have permission to {action} this order"
        )));
    }
    Ok(order)
}

async fn list_orders(
    State(state): State<AppState>,
    CurrentUser(identity): CurrentUser,
) -> ApiResult<Reply> {
    let scope = (!identity.is_employee).then(|| identity.id());
    let orders = state.db.orders().list(scope).await?;
    Ok(Reply::ok().list("orders", &orders))
}

async fn get_order(
    State(state): State<AppState>,
    CurrentUser(identity): CurrentUser,
    Params(params): Params,
) -> ApiResult<Reply> {
    let IdParam { id } = state.validate("orders.get", &params)?;
    let order = owned_order(&state, &identity, id, "view").await?;
    Ok(Reply::ok().data("order", order))
}

async fn create_order(
    State(state): State<AppState>,
    CurrentUser(identity): CurrentUser,
    JsonBody(body): JsonBody,
) -> ApiResult<Reply> {
    if !identity.is_customer {
        return Err(ApiError::forbidden("Only customers can create orders"));
    }
    let input: NewOrder = state.validate("orders.create", &body)?;
    let order = state.db.orders().create(identity.id(), &input).await?;
    info!(
        order_id = order.order.order_id,
        customer_id = identity.id(),
        "Order placed"
    );
    Ok(Reply::created().data("order", order))
}

async fn update_order(
    State(state): State<AppState>,
    CurrentUser(identity): CurrentUser,
    Params(params): Params,
    JsonBody(body): JsonBody,
) -> ApiResult<Reply> {
    let IdParam { id } = state.validate("orders.get", &params)?;
    let OrderPatch { status } = state.validate("orders.update", &body)?;
    let status = status.ok_or_else(|| ApiError::bad_request("Status is required"))?;
    owned_order(&state, &identity, id, "update").await?;

    let updated = state.db.orders().update_status(id, status).await?;
    Ok(Reply::ok()
        .data("order", &updated.order)
        .data("shipping", &updated.shipping))
}

async fn cancel_order(
    State(state): State<AppState>,
    CurrentUser(identity): CurrentUser,
    Params(params): Params,
) -> ApiResult<Reply> {
    let IdParam { id } = state.validate("orders.get", &params)?;
    owned_order(&state, &identity, id, "cancel").await?;
    state.db.orders().cancel(id).await?;
    info!(order_id = id, by = identity.id(), "Order cancelled");
    Ok(Reply::ok().message("Order cancelled successfully"))
}

/// Payments may not exceed what is still owed.
async fn record_payment(
    State(state): State<AppState>,
    CurrentUser(identity): CurrentUser,
    Params(params): Params,
    JsonBody(body): JsonBody,
) -> ApiResult<Reply> {
    let IdParam { id } = state.validate("orders.get", &params)?;
    let input: NewPayment = state.validate("orders.payment", &body)?;
    owned_order(&state, &identity, id, "pay for").await?;
    let payment = state.db.orders().record_payment(id, &input).await?;
    Ok(Reply::created().data("payment", payment))
}
