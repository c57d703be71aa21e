//! `/api/v1/employees`: staff records, employee only.

use axum::extract::State;
use axum::routing::{get, post};
use axum::Router;
use tracing::info;

use store_core::{EmployeePatch, NewEmployee, NewShift};

use crate::auth::StaffUser;
use crate::error::{ApiError, ApiResult};
use crate::response::Reply;
use crate::validate::{IdParam, JsonBody, Params};
use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_employees).post(create_employee))
        .route("/roles", get(list_roles))
        .route(
            "/{id}",
            get(get_employee)
                .patch(update_employee)
                .delete(delete_employee),
        )
        .route("/{id}/shifts", post(add_shift))
}

async fn list_employees(State(state): State<AppState>, _staff: StaffUser) -> ApiResult<Reply> {
    let employees = state.db.employees().list().await?;
    Ok(Reply::ok().list("employees", &employees))
}

async fn list_roles(State(state): State<AppState>, _staff: StaffUser) -> ApiResult<Reply> {
    let roles = state.db.employees().roles().await?;
    Ok(Reply::ok().list("roles", &roles))
}

async fn get_employee(
    State(state): State<AppState>,
    _staff: StaffUser,
    Params(params): Params,
) -> ApiResult<Reply> {
    let IdParam { id } = state.validate("employees.get", &params)?;
    let employee = state
        .db
        .employees()
        .get(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Employee not found"))?;
    Ok(Reply::ok().data("employee", employee))
}

/// Hashes the account password before the row is written.
async fn create_employee(
    State(state): State<AppState>,
    StaffUser(creator): StaffUser,
    JsonBody(body): JsonBody,
) -> ApiResult<Reply> {
    let input: NewEmployee = state.validate("employees.create", &body)?;
    let hash = state.passwords.hash_async(&input.password).await?;
    let employee = state.db.employees().create(&input, &hash).await?;
    info!(
        employee_id = employee.employee.id,
        created_by = creator.id(),
        "Employee created"
    );
    Ok(Reply::created().data("employee", employee))
}

async fn update_employee(
    State(state): State<AppState>,
    _staff: StaffUser,
    Params(params): Params,
    JsonBody(body): JsonBody,
) -> ApiResult<Reply> {
    let IdParam { id } = state.validate("employees.get", &params)?;
    let patch: EmployeePatch = state.validate("employees.update", &body)?;
    let employee = state.db.employees().update(id, &patch).await?;
    Ok(Reply::ok().data("employee", employee))
}

async fn delete_employee(
    State(state): State<AppState>,
    _staff: StaffUser,
    Params(params): Params,
) -> ApiResult<Reply> {
    let IdParam { id } = state.validate("employees.get", &params)?;
    state.db.employees().delete(id).await?;
    Ok(Reply::no_content())
}

async fn add_shift(
    State(state): State<AppState>,
    _staff: StaffUser,
    Params(params): Params,
    JsonBody(body): JsonBody,
) -> ApiResult<Reply> {
    let IdParam { id } = state.validate("employees.get", &params)?;
    let shift: NewShift = state.validate("employees.shift", &body)?;
    let shift = state.db.employees().add_shift(id, &shift).await?;
    Ok(Reply::created().data("shift", shift))
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use serde_json::{json, Value};

    use crate::testing::TestApp;

    fn baker(branch_id: i64) -> Value {
        json!({
            "identity_card": 29_001_234,
            "first_name": "Omar",
            "last_name": "Farouk",
            "email": "omar@sweetstore.example",
            "password": "Bakery2024",
            "phone_number": "0100 222 3333",
            "address": {"street": "5 Nile Corniche", "city": "Cairo"},
            "hourly_wage_cents": 2200,
            "branch_id": branch_id,
            "role_id": 2
        })
    }

    #[tokio::test]
    async fn test_create_and_get_with_contact() {
        let app = TestApp::new().await;
        let token = app.staff_token().await;
        let branch_id = app.branch().await;

        let (status, body) = app.post("/api/v1/employees", Some(&token), baker(branch_id)).await;
        assert_eq!(status, StatusCode::CREATED);
        let id = body["data"]["employee"]["id"].as_i64().unwrap();
        assert!(body["data"]["employee"].get("password").is_none());

        let (status, body) = app.get(&format!("/api/v1/employees/{id}"), Some(&token)).await;
        assert_eq!(status, StatusCode::OK);
        let employee = &body["data"]["employee"];
        assert_eq!(employee["phone"]["number"], "0100 222 3333");
        assert_eq!(employee["address"]["city"], "Cairo");
        assert_eq!(employee["branch_id"], branch_id);
    }

    #[tokio::test]
    async fn test_new_employee_can_log_in() {
        let app = TestApp::new().await;
        let token = app.staff_token().await;
        let branch_id = app.branch().await;
        app.post("/api/v1/employees", Some(&token), baker(branch_id)).await;

        let (status, body) = app
            .post(
                "/api/v1/users/login",
                None,
                json!({"email": "omar@sweetstore.example", "password": "Bakery2024"}),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["token"].is_string());
    }

    #[tokio::test]
    async fn test_duplicate_email_rejected() {
        let app = TestApp::new().await;
        let token = app.staff_token().await;
        let branch_id = app.branch().await;
        app.post("/api/v1/employees", Some(&token), baker(branch_id)).await;

        let mut again = baker(branch_id);
        again["identity_card"] = json!(29_009_999);
        let (status, body) = app.post("/api/v1/employees", Some(&token), again).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Email already in use");
    }

    #[tokio::test]
    async fn test_short_password_rejected() {
        let app = TestApp::new().await;
        let token = app.staff_token().await;
        let branch_id = app.branch().await;
        let mut input = baker(branch_id);
        input["password"] = json!("short");
        let (status, _) = app.post("/api/v1/employees", Some(&token), input).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_update_merges() {
        let app = TestApp::new().await;
        let token = app.staff_token().await;
        let branch_id = app.branch().await;
        let (_, body) = app.post("/api/v1/employees", Some(&token), baker(branch_id)).await;
        let id = body["data"]["employee"]["id"].as_i64().unwrap();

        let (status, body) = app
            .patch(
                &format!("/api/v1/employees/{id}"),
                Some(&token),
                json!({"hourly_wage_cents": 2600, "address": {"city": "Giza"}}),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        let employee = &body["data"]["employee"];
        assert_eq!(employee["hourly_wage_cents"], 2600);
        assert_eq!(employee["first_name"], "Omar");
        assert_eq!(employee["address"]["city"], "Giza");
        assert_eq!(employee["address"]["street"], "5 Nile Corniche");
    }

    #[tokio::test]
    async fn test_shift_blocks_delete() {
        let app = TestApp::new().await;
        let token = app.staff_token().await;
        let branch_id = app.branch().await;
        let (_, body) = app.post("/api/v1/employees", Some(&token), baker(branch_id)).await;
        let id = body["data"]["employee"]["id"].as_i64().unwrap();

        let (status, body) = app
            .post(
                &format!("/api/v1/employees/{id}/shifts"),
                Some(&token),
                json!({
                    "branch_id": branch_id,
                    "date": "2026-05-02",
                    "start_time": "07:00",
                    "end_time": "15:00",
                    "working_hours": 8
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["data"]["shift"]["is_present"], true);

        let (status, body) = app.delete(&format!("/api/v1/employees/{id}"), Some(&token)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["message"]
            .as_str()
            .unwrap()
            .starts_with("Cannot delete employee with associated shifts"));
    }

    #[tokio::test]
    async fn test_shift_time_format() {
        let app = TestApp::new().await;
        let (id, token) = app.staff().await;
        let branch_id = app.branch().await;
        let (status, body) = app
            .post(
                &format!("/api/v1/employees/{id}/shifts"),
                Some(&token),
                json!({
                    "branch_id": branch_id,
                    "date": "2026-05-02",
                    "start_time": "7am",
                    "end_time": "15:00",
                    "working_hours": 8
                }),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Start time must be HH:MM");
    }

    #[tokio::test]
    async fn test_delete_plain_employee() {
        let app = TestApp::new().await;
        let token = app.staff_token().await;
        let branch_id = app.branch().await;
        let (_, body) = app.post("/api/v1/employees", Some(&token), baker(branch_id)).await;
        let id = body["data"]["employee"]["id"].as_i64().unwrap();

        let (status, _) = app.delete(&format!("/api/v1/employees/{id}"), Some(&token)).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (status, body) = app.get(&format!("/api/v1/employees/{id}"), Some(&token)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["message"], "Employee not found");
    }

    #[tokio::test]
    async fn test_roles_and_customers_refused() {
        let app = TestApp::new().await;
        let token = app.staff_token().await;
        let (status, body) = app.get("/api/v1/employees/roles", Some(&token)).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["results"].as_u64().unwrap() >= 2);

        let (_, customer) = app.customer("layla@example.com").await;
        let (status, _) = app.get("/api/v1/employees", Some(&customer)).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }
}
