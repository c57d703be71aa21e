//! `/api/v1/inventory`: branch stock levels, employee only.
//!
//! Writes are guarded. Upserts may echo the row's `version` back as
//! `expected_version`; adjustments are a single conditional update.

use axum::extract::State;
use axum::routing::{get, post};
use axum::Router;
use serde::Deserialize;

use store_core::{InventoryAdjustment, InventoryKey, InventoryUpsert};

use crate::auth::StaffUser;
use crate::error::{ApiError, ApiResult};
use crate::response::Reply;
use crate::validate::{JsonBody, Params};
use crate::AppState;

#[derive(Debug, Deserialize)]
struct BranchParam {
    branch_id: i64,
}

#[derive(Debug, Deserialize)]
struct MaterialParam {
    material_id: i64,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_inventory).post(upsert_inventory))
        .route("/branch/{branch_id}", get(branch_inventory))
        .route("/material/{material_id}", get(material_inventory))
        .route(
            "/{branch_id}/{raw_material_id}",
            get(get_inventory).delete(delete_inventory),
        )
        .route("/{branch_id}/{raw_material_id}/adjust", post(adjust_inventory))
}

async fn list_inventory(State(state): State<AppState>, _staff: StaffUser) -> ApiResult<Reply> {
    let levels = state.db.inventory().list().await?;
    Ok(Reply::ok().list("inventory", &levels))
}

async fn branch_inventory(
    State(state): State<AppState>,
    _staff: StaffUser,
    Params(params): Params,
) -> ApiResult<Reply> {
    let BranchParam { branch_id } = state.validate("inventory.byBranch", &params)?;
    let branch = state
        .db
        .branches()
        .get(branch_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Branch not found"))?;
    let levels = state.db.inventory().by_branch(branch_id).await?;
    Ok(Reply::ok()
        .data("branch", branch)
        .list("inventory", &levels))
}

async fn material_inventory(
    State(state): State<AppState>,
    _staff: StaffUser,
    Params(params): Params,
) -> ApiResult<Reply> {
    let MaterialParam { material_id } = state.validate("inventory.byMaterial", &params)?;
    let material = state
        .db
        .raw_materials()
        .get(material_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Raw material not found"))?;
    let levels = state.db.inventory().by_material(material_id).await?;
    Ok(Reply::ok()
        .data("material", material)
        .list("inventory", &levels))
}

async fn get_inventory(
    State(state): State<AppState>,
    _staff: StaffUser,
    Params(params): Params,
) -> ApiResult<Reply> {
    let key: InventoryKey = state.validate("inventory.key", &params)?;
    let level = state
        .db
        .inventory()
        .get(key)
        .await?
        .ok_or_else(|| ApiError::not_found("Inventory record not found"))?;
    Ok(Reply::ok().data("inventory", level))
}

/// `POST /inventory`: 201 when the row is new, 200 when it was updated.
async fn upsert_inventory(
    State(state): State<AppState>,
    _staff: StaffUser,
    JsonBody(body): JsonBody,
) -> ApiResult<Reply> {
    let input: InventoryUpsert = state.validate("inventory.upsert", &body)?;
    let outcome = state.db.inventory().upsert(&input).await?;
    let reply = if outcome.created {
        Reply::created()
    } else {
        Reply::ok()
    };
    Ok(reply.data("inventory", outcome.level))
}

async fn adjust_inventory(
    State(state): State<AppState>,
    _staff: StaffUser,
    Params(params): Params,
    JsonBody(body): JsonBody,
) -> ApiResult<Reply> {
    let key: InventoryKey = state.validate("inventory.key", &params)?;
    let InventoryAdjustment { delta } = state.validate("inventory.adjust", &body)?;
    let level = state.db.inventory().adjust(key, delta).await?;
    Ok(Reply::ok().data("inventory", level))
}

async fn delete_inventory(
    State(state): State<AppState>,
    _staff: StaffUser,
    Params(params): Params,
) -> ApiResult<Reply> {
    let key: InventoryKey = state.validate("inventory.key", &params)?;
    state.db.inventory().delete(key).await?;
    Ok(Reply::no_content())
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use serde_json::json;

    use crate::testing::TestApp;

    /// A branch and a material to stock there.
    async fn pair(app: &TestApp, token: &str) -> (i64, i64) {
        let branch_id = app.branch().await;
        let (_, body) = app
            .post("/api/v1/raw-materials", Some(token), json!({"material_name": "Flour"}))
            .await;
        let material_id = body["data"]["rawMaterial"]["raw_material_id"].as_i64().unwrap();
        (branch_id, material_id)
    }

    #[tokio::test]
    async fn test_upsert_created_then_updated() {
        let app = TestApp::new().await;
        let token = app.staff_token().await;
        let (branch_id, material_id) = pair(&app, &token).await;
        let input = json!({"branch_id": branch_id, "raw_material_id": material_id, "quantity": 40});

        let (status, body) = app.post("/api/v1/inventory", Some(&token), input.clone()).await;
        assert_eq!(status, StatusCode::CREATED);
        let version = body["data"]["inventory"]["version"].as_i64().unwrap();

        let input = json!({
            "branch_id": branch_id,
            "raw_material_id": material_id,
            "quantity": 55.25,
            "expected_version": version
        });
        let (status, body) = app.post("/api/v1/inventory", Some(&token), input).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["inventory"]["quantity"], 55.25);
        assert_eq!(body["data"]["inventory"]["material_name"], "Flour");

        let (_, body) = app.get("/api/v1/inventory", Some(&token)).await;
        assert_eq!(body["results"], 1);
    }

    #[tokio::test]
    async fn test_stale_version_conflicts() {
        let app = TestApp::new().await;
        let token = app.staff_token().await;
        let (branch_id, material_id) = pair(&app, &token).await;
        let (_, body) = app
            .post(
                "/api/v1/inventory",
                Some(&token),
                json!({"branch_id": branch_id, "raw_material_id": material_id, "quantity": 10}),
            )
            .await;
        let version = body["data"]["inventory"]["version"].as_i64().unwrap();
        app.post(
            &format!("/api/v1/inventory/{branch_id}/{material_id}/adjust"),
            Some(&token),
            json!({"delta": 5}),
        )
        .await;

        let (status, body) = app
            .post(
                "/api/v1/inventory",
                Some(&token),
                json!({
                    "branch_id": branch_id,
                    "raw_material_id": material_id,
                    "quantity": 1,
                    "expected_version": version
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["message"], "Inventory record was modified by another request");

        let (_, body) = app
            .get(&format!("/api/v1/inventory/{branch_id}/{material_id}"), Some(&token))
            .await;
        assert_eq!(body["data"]["inventory"]["quantity"], 15.0);
    }

    #[tokio::test]
    async fn test_quantity_precision() {
        let app = TestApp::new().await;
        let token = app.staff_token().await;
        let (branch_id, material_id) = pair(&app, &token).await;
        let (status, _) = app
            .post(
                "/api/v1/inventory",
                Some(&token),
                json!({"branch_id": branch_id, "raw_material_id": material_id, "quantity": 1.234}),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_adjust_never_goes_negative() {
        let app = TestApp::new().await;
        let token = app.staff_token().await;
        let (branch_id, material_id) = pair(&app, &token).await;
        app.post(
            "/api/v1/inventory",
            Some(&token),
            json!({"branch_id": branch_id, "raw_material_id": material_id, "quantity": 3}),
        )
        .await;
        let uri = format!("/api/v1/inventory/{branch_id}/{material_id}/adjust");

        let (status, body) = app.post(&uri, Some(&token), json!({"delta": -3.5})).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Insufficient stock for this adjustment");

        let (status, body) = app.post(&uri, Some(&token), json!({"delta": -3})).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["inventory"]["quantity"], 0.0);
    }

    #[tokio::test]
    async fn test_by_branch_and_material() {
        let app = TestApp::new().await;
        let token = app.staff_token().await;
        let (branch_id, material_id) = pair(&app, &token).await;
        app.post(
            "/api/v1/inventory",
            Some(&token),
            json!({"branch_id": branch_id, "raw_material_id": material_id, "quantity": 8}),
        )
        .await;

        let (status, body) = app
            .get(&format!("/api/v1/inventory/branch/{branch_id}"), Some(&token))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["results"], 1);
        assert_eq!(body["data"]["branch"]["branch_id"], branch_id);

        let (status, body) = app
            .get(&format!("/api/v1/inventory/material/{material_id}"), Some(&token))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["material"]["material_name"], "Flour");
        assert_eq!(body["data"]["inventory"][0]["quantity"], 8.0);

        let (status, body) = app.get("/api/v1/inventory/branch/9999", Some(&token)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["message"], "Branch not found");

        let (status, body) = app.get("/api/v1/inventory/material/9999", Some(&token)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["message"], "Raw material not found");
    }

    #[tokio::test]
    async fn test_delete_missing_record() {
        let app = TestApp::new().await;
        let token = app.staff_token().await;
        let (branch_id, material_id) = pair(&app, &token).await;
        let uri = format!("/api/v1/inventory/{branch_id}/{material_id}");

        let (status, body) = app.delete(&uri, Some(&token)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["message"], "Inventory record not found");

        app.post(
            "/api/v1/inventory",
            Some(&token),
            json!({"branch_id": branch_id, "raw_material_id": material_id, "quantity": 1}),
        )
        .await;
        let (status, _) = app.delete(&uri, Some(&token)).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
    }

    #[tokio::test]
    async fn test_customers_are_refused() {
        let app = TestApp::new().await;
        let (_, token) = app.customer("layla@example.com").await;
        let (status, _) = app.get("/api/v1/inventory", Some(&token)).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }
}
