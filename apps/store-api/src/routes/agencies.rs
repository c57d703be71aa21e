//! `/api/v1/agencies`

use axum::extract::State;
use axum::routing::get;
use axum::Router;

use store_core::{AgencyPatch, NewAgency};

use crate::auth::StaffUser;
use crate::error::{ApiError, ApiResult};
use crate::response::Reply;
use crate::validate::{IdParam, JsonBody, Params};
use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_agencies).post(create_agency))
        .route(
            "/{id}",
            get(get_agency).patch(update_agency).delete(delete_agency),
        )
}

async fn list_agencies(State(state): State<AppState>) -> ApiResult<Reply> {
    let agencies = state.db.agencies().list().await?;
    Ok(Reply::ok().list("agencies", &agencies))
}

async fn get_agency(State(state): State<AppState>, Params(params): Params) -> ApiResult<Reply> {
    let IdParam { id } = state.validate("agencies.get", &params)?;
    let agency = state
        .db
        .agencies()
        .detail(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Agency not found"))?;
    Ok(Reply::ok().data("agency", agency))
}

async fn create_agency(
    State(state): State<AppState>,
    _staff: StaffUser,
    JsonBody(body): JsonBody,
) -> ApiResult<Reply> {
    let input: NewAgency = state.validate("agencies.create", &body)?;
    let agency = state.db.agencies().create(&input).await?;
    Ok(Reply::created().data("agency", agency))
}

async fn update_agency(
    State(state): State<AppState>,
    _staff: StaffUser,
    Params(params): Params,
    JsonBody(body): JsonBody,
) -> ApiResult<Reply> {
    let IdParam { id } = state.validate("agencies.get", &params)?;
    let patch: AgencyPatch = state.validate("agencies.update", &body)?;
    let agency = state.db.agencies().update(id, &patch).await?;
    Ok(Reply::ok().data("agency", agency))
}

async fn delete_agency(
    State(state): State<AppState>,
    _staff: StaffUser,
    Params(params): Params,
) -> ApiResult<Reply> {
    let IdParam { id } = state.validate("agencies.get", &params)?;
    state.db.agencies().delete(id).await?;
    Ok(Reply::no_content())
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use serde_json::json;

    use crate::testing::TestApp;

    #[tokio::test]
    async fn test_crud_cycle() {
        let app = TestApp::new().await;
        let token = app.staff_token().await;

        let (status, body) = app
            .post(
                "/api/v1/agencies",
                Some(&token),
                json!({"name": "Cairo Fleet", "contact_info": "fleet@example.com"}),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        let id = body["data"]["agency"]["agency_id"].as_i64().unwrap();

        let (status, body) = app
            .patch(&format!("/api/v1/agencies/{id}"), Some(&token), json!({"name": "Delta Fleet"}))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["agency"]["name"], "Delta Fleet");
        assert_eq!(body["data"]["agency"]["contact_info"], "fleet@example.com");

        let (_, body) = app.get(&format!("/api/v1/agencies/{id}"), None).await;
        assert_eq!(body["data"]["agency"]["vehicles"], json!([]));
        assert_eq!(body["data"]["agency"]["rentals"], json!([]));

        let (status, _) = app.delete(&format!("/api/v1/agencies/{id}"), Some(&token)).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (status, body) = app.get(&format!("/api/v1/agencies/{id}"), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["message"], "Agency not found");
    }

    #[tokio::test]
    async fn test_create_requires_name() {
        let app = TestApp::new().await;
        let token = app.staff_token().await;
        let (status, body) = app
            .post("/api/v1/agencies", Some(&token), json!({"contact_info": "x"}))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Name is required");
    }

    #[tokio::test]
    async fn test_delete_refused_with_vehicles() {
        let app = TestApp::new().await;
        let token = app.staff_token().await;
        let (_, body) = app
            .post("/api/v1/agencies", Some(&token), json!({"name": "Cairo Fleet"}))
            .await;
        let id = body["data"]["agency"]["agency_id"].as_i64().unwrap();
        let (status, _) = app
            .post(
                "/api/v1/vehicles",
                Some(&token),
                json!({
                    "vin": "1FTBW3XM5HKA12345",
                    "plate_number": "SWT-001",
                    "make": "Ford",
                    "model": "Transit",
                    "year": 2021,
                    "acquisition_type": "lease",
                    "org_id": id
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);

        let (status, body) = app.delete(&format!("/api/v1/agencies/{id}"), Some(&token)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Cannot delete agency with associated vehicles or rentals");
    }
}
