//! `/api/v1/branches`: public reads, employee writes and expenses.

use axum::extract::State;
use axum::routing::{get, post};
use axum::Router;

use store_core::{BranchPatch, NewBranch, NewExpense};

use crate::auth::StaffUser;
use crate::error::{ApiError, ApiResult};
use crate::response::Reply;
use crate::validate::{IdParam, JsonBody, Params};
use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_branches).post(create_branch))
        .route(
            "/{id}",
            get(get_branch).patch(update_branch).delete(delete_branch),
        )
        .route("/{id}/expenses", post(add_expense))
}

async fn list_branches(State(state): State<AppState>) -> ApiResult<Reply> {
    let branches = state.db.branches().list().await?;
    Ok(Reply::ok().list("branches", &branches))
}

async fn get_branch(State(state): State<AppState>, Params(params): Params) -> ApiResult<Reply> {
    let IdParam { id } = state.validate("branches.get", &params)?;
    let branch = state
        .db
        .branches()
        .detail(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Branch not found"))?;
    Ok(Reply::ok().data("branch", branch))
}

async fn create_branch(
    State(state): State<AppState>,
    _staff: StaffUser,
    JsonBody(body): JsonBody,
) -> ApiResult<Reply> {
    let input: NewBranch = state.validate("branches.create", &body)?;
    let branch = state.db.branches().create(&input).await?;
    Ok(Reply::created().data("branch", branch))
}

async fn update_branch(
    State(state): State<AppState>,
    _staff: StaffUser,
    Params(params): Params,
    JsonBody(body): JsonBody,
) -> ApiResult<Reply> {
    let IdParam { id } = state.validate("branches.get", &params)?;
    let patch: BranchPatch = state.validate("branches.update", &body)?;
    let branch = state.db.branches().update(id, &patch).await?;
    Ok(Reply::ok().data("branch", branch))
}

async fn delete_branch(
    State(state): State<AppState>,
    _staff: StaffUser,
    Params(params): Params,
) -> ApiResult<Reply> {
    let IdParam { id } = state.validate("branches.get", &params)?;
    state.db.branches().delete(id).await?;
    Ok(Reply::no_content())
}

async fn add_expense(
    State(state): State<AppState>,
    _staff: StaffUser,
    Params(params): Params,
    JsonBody(body): JsonBody,
) -> ApiResult<Reply> {
    let IdParam { id } = state.validate("branches.get", &params)?;
    let input: NewExpense = state.validate("branches.expense", &body)?;
    let expense = state.db.branches().add_expense(id, &input).await?;
    Ok(Reply::created().data("expense", expense))
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use serde_json::{json, Value};

    use crate::testing::TestApp;

    fn downtown() -> Value {
        json!({
            "branch_name": "Downtown",
            "address": "12 Tahrir Square",
            "city": "Cairo",
            "country": "Egypt",
            "email": "Downtown@SweetStore.example"
        })
    }

    #[tokio::test]
    async fn test_create_normalizes_email() {
        let app = TestApp::new().await;
        let token = app.staff_token().await;
        let (status, body) = app.post("/api/v1/branches", Some(&token), downtown()).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["data"]["branch"]["email"], "downtown@sweetstore.example");
    }

    #[tokio::test]
    async fn test_create_requires_city() {
        let app = TestApp::new().await;
        let token = app.staff_token().await;
        let mut input = downtown();
        input.as_object_mut().unwrap().remove("city");
        let (status, body) = app.post("/api/v1/branches", Some(&token), input).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "City is required");
    }

    #[tokio::test]
    async fn test_expense_shows_on_detail() {
        let app = TestApp::new().await;
        let token = app.staff_token().await;
        let (_, body) = app.post("/api/v1/branches", Some(&token), downtown()).await;
        let id = body["data"]["branch"]["branch_id"].as_i64().unwrap();

        let (status, body) = app
            .post(
                &format!("/api/v1/branches/{id}/expenses"),
                Some(&token),
                json!({"amount_cents": 12000, "description": "Oven repair"}),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["data"]["expense"]["amount_cents"], 12000);

        let (status, body) = app.get(&format!("/api/v1/branches/{id}"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["branch"]["expenses"][0]["description"], "Oven repair");
    }

    #[tokio::test]
    async fn test_delete_refused_with_expenses() {
        let app = TestApp::new().await;
        let token = app.staff_token().await;
        let (_, body) = app.post("/api/v1/branches", Some(&token), downtown()).await;
        let id = body["data"]["branch"]["branch_id"].as_i64().unwrap();
        app.post(
            &format!("/api/v1/branches/{id}/expenses"),
            Some(&token),
            json!({"amount_cents": 500}),
        )
        .await;

        let (status, body) = app.delete(&format!("/api/v1/branches/{id}"), Some(&token)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Cannot delete branch with associated data");
        let (status, _) = app.get(&format!("/api/v1/branches/{id}"), None).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_delete_empty_branch() {
        let app = TestApp::new().await;
        let token = app.staff_token().await;
        let (_, body) = app.post("/api/v1/branches", Some(&token), downtown()).await;
        let id = body["data"]["branch"]["branch_id"].as_i64().unwrap();

        let (status, body) = app.delete(&format!("/api/v1/branches/{id}"), Some(&token)).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        assert!(body.is_null());
    }
}
