//! `/api/v1/users`: registration, login, email verification, password
//! recovery and the customer's own profile.
//!
//! ## Password Reset
//! ```text
//! POST /forgot-password { email }
//!     │  code = 8 uppercase hex chars, stored as an Argon2 hash
//!     │  expires = now + RESET_TOKEN_TTL_MINUTES
//!     ▼
//! mail ── failure ──► token cleared, 500 "Error sending email…"
//!     │
//!     ▼
//! POST /reset-password/{code} { password, confirmPassword }
//!     │  match against every unexpired ticket
//!     ▼
//! password replaced, token cleared, new JWT
//! ```

use axum::extract::{Path, State};
use axum::routing::{get, patch, post};
use axum::Router;
use chrono::{Duration, Utc};
use serde::Serialize;
use tracing::{error, info, warn};

use store_core::{
    ChangePassword, CustomerProfile, EmailOnly, LoginRequest, PartyKind, Person, ProfilePatch,
    RegisterCustomer, ResetPassword, VerifyEmail,
};
use store_db::NewCustomerAccount;

use crate::auth::CustomerUser;
use crate::error::{ApiError, ApiResult};
use crate::mailer::MailMessage;
use crate::response::Reply;
use crate::validate::JsonBody;
use crate::AppState;

const BAD_LOGIN: &str = "Incorrect email or password";
const NO_SUCH_EMAIL: &str = "No user found with that email";
const MAIL_FAILED: &str = "Error sending email. Please try again later.";

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/verify", post(verify_email))
        .route("/resend-code", post(resend_code))
        .route("/forgot-password", post(forgot_password))
        .route("/reset-password/{token}", post(reset_password))
        .route("/profile", get(get_profile).patch(update_profile))
        .route("/change-password", patch(change_password))
}

/// The public face of an account in auth responses.
#[derive(Debug, Serialize)]
struct UserView {
    id: i64,
    first_name: String,
    last_name: String,
    email: String,
    #[serde(rename = "type")]
    kind: PartyKind,
}

impl From<CustomerProfile> for UserView {
    fn from(profile: CustomerProfile) -> Self {
        UserView {
            id: profile.id,
            first_name: profile.first_name,
            last_name: profile.last_name,
            email: profile.email,
            kind: profile.kind,
        }
    }
}

impl From<Person> for UserView {
    fn from(person: Person) -> Self {
        UserView {
            id: person.id,
            first_name: person.first_name,
            last_name: person.last_name,
            email: person.email,
            kind: person.kind,
        }
    }
}

// =============================================================================
// Registration & Login
// =============================================================================

async fn register(State(state): State<AppState>, JsonBody(body): JsonBody) -> ApiResult<Reply> {
    let input: RegisterCustomer = state.validate("users.register", &body)?;

    let code = state.passwords.verification_code();
    let account = NewCustomerAccount {
        first_name: input.first_name,
        last_name: input.last_name,
        email: input.email,
        password_hash: state.passwords.hash_async(&input.password).await?,
        kind: input.kind,
        verification_code_hash: Some(state.passwords.hash_async(&code).await?),
    };
    let profile = state.db.people().register(&account).await?;
    info!(customer_id = profile.id, "Customer registered");

    let welcome = MailMessage::welcome(
        &state.config.email_from,
        &profile.email,
        &profile.first_name,
        &code,
    );
    if let Err(e) = state.mailer.send(&welcome) {
        warn!(customer_id = profile.id, error = %e, "Welcome email not sent");
    }

    let token = state.jwt.issue(profile.id)?;
    Ok(Reply::created()
        .token(token)
        .data("user", UserView::from(profile)))
}

/// Customers sign in with their customer password, employees with their
/// account password.
async fn login(State(state): State<AppState>, JsonBody(body): JsonBody) -> ApiResult<Reply> {
    let input: LoginRequest = state.validate("users.login", &body)?;
    let people = state.db.people();

    let credentials = people
        .credentials_by_email(&input.email)
        .await?
        .ok_or_else(|| ApiError::unauthorized(BAD_LOGIN))?;
    let id = credentials.person_id;

    let as_customer = match credentials.customer_password.as_deref() {
        Some(hash) => state.passwords.verify_async(&input.password, hash).await,
        None => false,
    };
    let as_employee = match credentials.account_password.as_deref() {
        Some(hash) if !as_customer => state.passwords.verify_async(&input.password, hash).await,
        _ => false,
    };

    if !as_customer && !as_employee {
        return Err(ApiError::unauthorized(BAD_LOGIN));
    }
    if as_employee {
        people.stamp_last_login(id).await?;
    }

    let person = people
        .find_person(id)
        .await?
        .ok_or_else(|| ApiError::unauthorized(BAD_LOGIN))?;
    info!(person_id = id, employee = as_employee, "Logged in");

    let token = state.jwt.issue(id)?;
    Ok(Reply::ok().token(token).data("user", UserView::from(person)))
}

// =============================================================================
// Email Verification
// =============================================================================

async fn verify_email(State(state): State<AppState>, JsonBody(body): JsonBody) -> ApiResult<Reply> {
    let input: VerifyEmail = state.validate("users.verifyEmail", &body)?;
    let people = state.db.people();

    let record = people
        .verification_state(&input.email)
        .await?
        .ok_or_else(|| ApiError::not_found(NO_SUCH_EMAIL))?;
    if record.is_verified {
        return Err(ApiError::bad_request("Email is already verified"));
    }
    let matches = match record.verification_code.as_deref() {
        Some(hash) => state.passwords.verify_async(input.code.trim(), hash).await,
        None => false,
    };
    if !matches {
        return Err(ApiError::bad_request("Verification code is invalid"));
    }

    people.mark_verified(record.customer_id).await?;
    info!(customer_id = record.customer_id, "Email verified");
    Ok(Reply::ok().message("Email verified successfully"))
}

async fn resend_code(State(state): State<AppState>, JsonBody(body): JsonBody) -> ApiResult<Reply> {
    let input: EmailOnly = state.validate("users.resendVerificationCode", &body)?;
    let people = state.db.people();

    let record = people
        .verification_state(&input.email)
        .await?
        .ok_or_else(|| ApiError::not_found(NO_SUCH_EMAIL))?;
    if record.is_verified {
        return Err(ApiError::bad_request("Email is already verified"));
    }

    let code = state.passwords.verification_code();
    let hash = state.passwords.hash_async(&code).await?;
    people
        .set_verification_code(record.customer_id, Some(hash.as_str()))
        .await?;

    // The previous code stays valid when the new one never arrives.
    let message = MailMessage::verification(&state.config.email_from, &input.email, &code);
    if let Err(e) = state.mailer.send(&message) {
        error!(customer_id = record.customer_id, error = %e, "Verification email failed");
        people
            .set_verification_code(record.customer_id, record.verification_code.as_deref())
            .await?;
        return Err(ApiError::internal(MAIL_FAILED));
    }
    Ok(Reply::ok().message("Verification code sent to email"))
}

// =============================================================================
// Password Recovery
// =============================================================================

async fn forgot_password(
    State(state): State<AppState>,
    JsonBody(body): JsonBody,
) -> ApiResult<Reply> {
    let input: EmailOnly = state.validate("users.forgotPassword", &body)?;
    let people = state.db.people();

    let customer_id = people
        .customer_id_by_email(&input.email)
        .await?
        .ok_or_else(|| ApiError::not_found(NO_SUCH_EMAIL))?;

    let ttl = state.config.reset_token_ttl_minutes;
    let code = state.passwords.reset_code();
    let expires = Utc::now() + Duration::minutes(ttl);
    people
        .set_reset_token(customer_id, &state.passwords.hash_async(&code).await?, expires)
        .await?;

    let message = MailMessage::password_reset(&state.config.email_from, &input.email, &code, ttl);
    if let Err(e) = state.mailer.send(&message) {
        error!(customer_id, error = %e, "Reset email failed");
        people.clear_reset_token(customer_id).await?;
        return Err(ApiError::internal(MAIL_FAILED));
    }

    info!(customer_id, "Password reset requested");
    Ok(Reply::ok().message("Token sent to email"))
}

async fn reset_password(
    State(state): State<AppState>,
    Path(token): Path<String>,
    JsonBody(body): JsonBody,
) -> ApiResult<Reply> {
    let input: ResetPassword = state.validate("users.resetPassword", &body)?;
    let people = state.db.people();
    let token = token.trim().to_uppercase();

    let tickets = people.pending_resets(Utc::now()).await?;
    let hashes = tickets.iter().map(|t| t.reset_token.clone()).collect();
    let ticket = state
        .passwords
        .find_match(&token, hashes)
        .await
        .and_then(|i| tickets.get(i))
        .ok_or_else(|| ApiError::bad_request("Token is invalid or has expired"))?;

    let hash = state.passwords.hash_async(&input.password).await?;
    people.complete_reset(ticket.customer_id, &hash).await?;
    info!(customer_id = ticket.customer_id, "Password reset");

    let token = state.jwt.issue(ticket.customer_id)?;
    Ok(Reply::ok().token(token).message("Password reset successful"))
}

// =============================================================================
// Profile
// =============================================================================

async fn get_profile(
    State(state): State<AppState>,
    CustomerUser(identity): CustomerUser,
) -> ApiResult<Reply> {
    let profile = state
        .db
        .people()
        .profile(identity.id())
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;
    Ok(Reply::ok().data("user", profile))
}

async fn update_profile(
    State(state): State<AppState>,
    CustomerUser(identity): CustomerUser,
    JsonBody(body): JsonBody,
) -> ApiResult<Reply> {
    let patch: ProfilePatch = state.validate("users.updateProfile", &body)?;
    let profile = state.db.people().update_profile(identity.id(), &patch).await?;
    Ok(Reply::ok().data("user", profile))
}

async fn change_password(
    State(state): State<AppState>,
    CustomerUser(identity): CustomerUser,
    JsonBody(body): JsonBody,
) -> ApiResult<Reply> {
    let input: ChangePassword = state.validate("users.changePassword", &body)?;
    let people = state.db.people();
    let id = identity.id();

    let stored = people
        .customer_password(id)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;
    if !state.passwords.verify_async(&input.current_password, &stored).await {
        return Err(ApiError::unauthorized("Current password is incorrect"));
    }

    people
        .set_customer_password(id, &state.passwords.hash_async(&input.new_password).await?)
        .await?;
    info!(customer_id = id, "Password changed");

    let token = state.jwt.issue(id)?;
    Ok(Reply::ok()
        .token(token)
        .message("Password updated successfully"))
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use chrono::{Duration, Utc};
    use serde_json::{json, Value};

    use crate::auth::JwtManager;
    use crate::testing::{code_in, TestApp, PASSWORD};

    fn signup(email: &str) -> Value {
        json!({
            "first_name": "Nour",
            "last_name": "Adel",
            "email": email,
            "password": "Sugar2024",
            "confirmPassword": "Sugar2024"
        })
    }

    fn is_verification_code(word: &str) -> bool {
        word.len() == 6 && word.chars().all(|c| c.is_ascii_digit())
    }

    fn is_reset_code(word: &str) -> bool {
        word.len() == 8 && word.chars().all(|c| c.is_ascii_digit() || ('A'..='F').contains(&c))
    }

    #[tokio::test]
    async fn test_register_returns_token_and_user() {
        let app = TestApp::new().await;
        let (status, body) = app
            .post("/api/v1/users/register", None, signup("Nour@Example.com"))
            .await;
        assert_eq!(status, StatusCode::CREATED);
        assert!(body["token"].is_string());
        let user = &body["data"]["user"];
        assert_eq!(user["email"], "nour@example.com");
        assert_eq!(user["type"], "person");
        assert!(user.get("password").is_none());

        let mail = app.mailer.last_to("nour@example.com").unwrap();
        assert!(code_in(&mail.text, is_verification_code).is_some());
    }

    #[tokio::test]
    async fn test_duplicate_email_creates_nothing() {
        let app = TestApp::new().await;
        let (_, first) = app
            .post("/api/v1/users/register", None, signup("nour@example.com"))
            .await;
        let id = first["data"]["user"]["id"].as_i64().unwrap();

        let (status, body) = app
            .post("/api/v1/users/register", None, signup("nour@example.com"))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Email already in use");
        assert!(app.db().people().find_person(id + 1).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_register_password_rules() {
        let app = TestApp::new().await;
        let mut input = signup("nour@example.com");
        input["confirmPassword"] = json!("Sugar2025");
        let (status, body) = app.post("/api/v1/users/register", None, input).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Passwords do not match");

        let mut input = signup("nour@example.com");
        input["password"] = json!("sugarsugar");
        input["confirmPassword"] = json!("sugarsugar");
        let (status, _) = app.post("/api/v1/users/register", None, input).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_login() {
        let app = TestApp::new().await;
        app.customer("layla@example.com").await;

        let (status, body) = app
            .post(
                "/api/v1/users/login",
                None,
                json!({"email": "layla@example.com", "password": PASSWORD}),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["token"].is_string());
        assert_eq!(body["data"]["user"]["first_name"], "Layla");

        for (email, password) in [("layla@example.com", "Wrong1234"), ("ghost@example.com", PASSWORD)] {
            let (status, body) = app
                .post("/api/v1/users/login", None, json!({"email": email, "password": password}))
                .await;
            assert_eq!(status, StatusCode::UNAUTHORIZED);
            assert_eq!(body["message"], "Incorrect email or password");
        }
    }

    #[tokio::test]
    async fn test_token_failures_are_distinct() {
        let app = TestApp::new().await;
        let (id, _) = app.customer("layla@example.com").await;

        let (status, body) = app.get("/api/v1/users/profile", None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["message"], "Not authenticated. Please log in");

        let forged = JwtManager::new("someone-else", Duration::hours(1)).issue(id).unwrap();
        let (status, body) = app.get("/api/v1/users/profile", Some(&forged)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["message"], "Invalid token. Please log in again");

        let secret = app.state.config.jwt_secret.clone();
        let stale = JwtManager::new(secret, Duration::minutes(-5)).issue(id).unwrap();
        let (status, body) = app.get("/api/v1/users/profile", Some(&stale)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["message"], "Token expired. Please log in again");
    }

    #[tokio::test]
    async fn test_verify_email_flow() {
        let app = TestApp::new().await;
        let (_, body) = app
            .post("/api/v1/users/register", None, signup("nour@example.com"))
            .await;
        let token = body["token"].as_str().unwrap().to_string();
        let mail = app.mailer.last_to("nour@example.com").unwrap();
        let code = code_in(&mail.text, is_verification_code).unwrap();

        let (status, body) = app
            .post(
                "/api/v1/users/verify",
                None,
                json!({"email": "nour@example.com", "code": "not-it"}),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Verification code is invalid");

        let (status, _) = app
            .post(
                "/api/v1/users/verify",
                None,
                json!({"email": "nour@example.com", "code": code}),
            )
            .await;
        assert_eq!(status, StatusCode::OK);

        let (_, body) = app.get("/api/v1/users/profile", Some(&token)).await;
        assert_eq!(body["data"]["user"]["is_verified"], true);

        let (status, body) = app
            .post("/api/v1/users/resend-code", None, json!({"email": "nour@example.com"}))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Email is already verified");
    }

    #[tokio::test]
    async fn test_resend_code_replaces_old_one() {
        let app = TestApp::new().await;
        app.post("/api/v1/users/register", None, signup("nour@example.com"))
            .await;
        let first = app.mailer.last_to("nour@example.com").unwrap();
        let old = code_in(&first.text, is_verification_code).unwrap();

        let (status, _) = app
            .post("/api/v1/users/resend-code", None, json!({"email": "nour@example.com"}))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(app.mailer.sent().len(), 2);
        let second = app.mailer.last_to("nour@example.com").unwrap();
        let new = code_in(&second.text, is_verification_code).unwrap();

        if old != new {
            let (status, _) = app
                .post("/api/v1/users/verify", None, json!({"email": "nour@example.com", "code": old}))
                .await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
        }
        let (status, _) = app
            .post("/api/v1/users/verify", None, json!({"email": "nour@example.com", "code": new}))
            .await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_resend_mail_failure_keeps_old_code() {
        let app = TestApp::new().await;
        app.post("/api/v1/users/register", None, signup("nour@example.com"))
            .await;
        let welcome = app.mailer.last_to("nour@example.com").unwrap();
        let code = code_in(&welcome.text, is_verification_code).unwrap();
        app.mailer.fail_from_now();

        let (status, body) = app
            .post("/api/v1/users/resend-code", None, json!({"email": "nour@example.com"}))
            .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["message"], "Error sending email. Please try again later.");

        let (status, body) = app
            .post("/api/v1/users/verify", None, json!({"email": "nour@example.com", "code": code}))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Email verified successfully");
    }

    #[tokio::test]
    async fn test_forgot_and_reset_password() {
        let app = TestApp::new().await;
        app.customer("layla@example.com").await;

        let (status, body) = app
            .post("/api/v1/users/forgot-password", None, json!({"email": "layla@example.com"}))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Token sent to email");
        let mail = app.mailer.last_to("layla@example.com").unwrap();
        let code = code_in(&mail.text, is_reset_code).unwrap();

        let new_password = json!({"password": "Honey2024", "confirmPassword": "Honey2024"});
        let (status, body) = app
            .post("/api/v1/users/reset-password/00000000Z", None, new_password.clone())
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Token is invalid or has expired");

        let uri = format!("/api/v1/users/reset-password/{code}");
        let (status, body) = app.post(&uri, None, new_password.clone()).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Password reset successful");
        assert!(body["token"].is_string());

        let (status, _) = app
            .post(
                "/api/v1/users/login",
                None,
                json!({"email": "layla@example.com", "password": "Honey2024"}),
            )
            .await;
        assert_eq!(status, StatusCode::OK);

        let (status, _) = app.post(&uri, None, new_password).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_forgot_password_unknown_email() {
        let app = TestApp::new().await;
        let (status, body) = app
            .post("/api/v1/users/forgot-password", None, json!({"email": "ghost@example.com"}))
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["message"], "No user found with that email");
    }

    #[tokio::test]
    async fn test_forgot_password_mail_failure_clears_token() {
        let app = TestApp::new().await;
        app.customer("layla@example.com").await;
        app.mailer.fail_from_now();

        let (status, body) = app
            .post("/api/v1/users/forgot-password", None, json!({"email": "layla@example.com"}))
            .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["status"], "error");
        assert_eq!(body["message"], "Error sending email. Please try again later.");

        let pending = app.db().people().pending_resets(Utc::now()).await.unwrap();
        assert!(pending.is_empty());
    }

    #[tokio::test]
    async fn test_change_password() {
        let app = TestApp::new().await;
        let (_, token) = app.customer("layla@example.com").await;

        let (status, body) = app
            .patch(
                "/api/v1/users/change-password",
                Some(&token),
                json!({
                    "currentPassword": "Wrong1234",
                    "newPassword": "Honey2024",
                    "confirmNewPassword": "Honey2024"
                }),
            )
            .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["message"], "Current password is incorrect");

        let (status, body) = app
            .patch(
                "/api/v1/users/change-password",
                Some(&token),
                json!({
                    "currentPassword": PASSWORD,
                    "newPassword": "Honey2024",
                    "confirmNewPassword": "Honey2024"
                }),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Password updated successfully");
        assert!(body["token"].is_string());

        let (status, _) = app
            .post(
                "/api/v1/users/login",
                None,
                json!({"email": "layla@example.com", "password": "Honey2024"}),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_profile_update_and_email_clash() {
        let app = TestApp::new().await;
        let (_, token) = app.customer("layla@example.com").await;
        app.customer("karim@example.com").await;

        let (status, body) = app
            .patch("/api/v1/users/profile", Some(&token), json!({"first_name": "Laila"}))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["user"]["first_name"], "Laila");
        assert_eq!(body["data"]["user"]["email"], "layla@example.com");

        let (status, body) = app
            .patch("/api/v1/users/profile", Some(&token), json!({"email": "karim@example.com"}))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Email already in use");
    }

    #[tokio::test]
    async fn test_profile_is_for_customers() {
        let app = TestApp::new().await;
        let token = app.staff_token().await;
        let (status, body) = app.get("/api/v1/users/profile", Some(&token)).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["message"], "You do not have permission to perform this action");
    }
}
