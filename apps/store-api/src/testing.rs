//! Router harness for HTTP tests: an in-memory database, a capturing
//! mailer and helpers that drive requests through `oneshot`.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use chrono::Utc;
use serde_json::Value;
use tower::ServiceExt;

use store_core::{NewBranch, NewEmployee, PartyKind};
use store_db::{Database, DbConfig, NewCustomerAccount};

use crate::config::ApiConfig;
use crate::mailer::MemoryMailer;
use crate::password::PasswordService;
use crate::{build_router, AppState};

pub const PASSWORD: &str = "Sweet1234";

pub struct TestApp {
    pub state: AppState,
    pub router: Router,
    pub mailer: Arc<MemoryMailer>,
    next: AtomicI64,
}

impl TestApp {
    pub async fn new() -> Self {
        TestApp::with_config(ApiConfig::for_tests()).await
    }

    pub async fn with_config(config: ApiConfig) -> Self {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let mailer = Arc::new(MemoryMailer::default());
        let mut state = AppState::new(db, config, mailer.clone());
        state.passwords = Arc::new(PasswordService::fast());
        let router = build_router(state.clone());
        TestApp {
            state,
            router,
            mailer,
            next: AtomicI64::new(1),
        }
    }

    pub fn db(&self) -> &Database {
        &self.state.db
    }

    fn next(&self) -> i64 {
        self.next.fetch_add(1, Ordering::SeqCst)
    }

    // =========================================================================
    // Requests
    // =========================================================================

    pub async fn send(
        &self,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let raw = body.map(|b| b.to_string()).unwrap_or_default();
        self.send_raw(method, uri, token, &raw).await
    }

    pub async fn send_raw(
        &self,
        method: &str,
        uri: &str,
        token: Option<&str>,
        raw: &str,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if !raw.is_empty() {
            builder = builder.header(header::CONTENT_TYPE, "application/json");
        }
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = builder.body(Body::from(raw.to_string())).unwrap();

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, body)
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        self.send("GET", uri, token, None).await
    }

    pub async fn post(&self, uri: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        self.send("POST", uri, token, Some(body)).await
    }

    pub async fn patch(&self, uri: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        self.send("PATCH", uri, token, Some(body)).await
    }

    pub async fn put(&self, uri: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        self.send("PUT", uri, token, Some(body)).await
    }

    pub async fn delete(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        self.send("DELETE", uri, token, None).await
    }

    // =========================================================================
    // Fixtures
    // =========================================================================

    pub async fn branch(&self) -> i64 {
        let n = self.next();
        self.db()
            .branches()
            .create(&NewBranch {
                branch_name: format!("Branch {n}"),
                address: "12 Tahrir Square".to_string(),
                city: "Cairo".to_string(),
                postal_code: None,
                country: "Egypt".to_string(),
                phone: None,
                email: None,
            })
            .await
            .unwrap()
            .branch_id
    }

    /// A manager employee; returns (person id, token).
    pub async fn staff(&self) -> (i64, String) {
        let n = self.next();
        let branch_id = self.branch().await;
        let hash = self.state.passwords.hash(PASSWORD).unwrap();
        let detail = self
            .db()
            .employees()
            .create(
                &NewEmployee {
                    identity_card: 30_000_000 + n,
                    first_name: "Staff".to_string(),
                    last_name: format!("Member{n}"),
                    email: format!("staff{n}@sweetstore.local"),
                    password: PASSWORD.to_string(),
                    phone_number: None,
                    address: None,
                    hire_date: Utc::now(),
                    hourly_wage_cents: 1500,
                    branch_id,
                    role_id: 1,
                },
                &hash,
            )
            .await
            .unwrap();
        let id = detail.employee.id;
        (id, self.state.jwt.issue(id).unwrap())
    }

    pub async fn staff_token(&self) -> String {
        self.staff().await.1
    }

    /// A customer with the shared test password; returns (person id, token).
    pub async fn customer(&self, email: &str) -> (i64, String) {
        let hash = self.state.passwords.hash(PASSWORD).unwrap();
        let profile = self
            .db()
            .people()
            .register(&NewCustomerAccount {
                first_name: "Layla".to_string(),
                last_name: "Hassan".to_string(),
                email: email.to_string(),
                password_hash: hash,
                kind: PartyKind::Person,
                verification_code_hash: None,
            })
            .await
            .unwrap();
        (profile.id, self.state.jwt.issue(profile.id).unwrap())
    }
}

/// The last whitespace-separated word of `text` that satisfies `pred`,
/// trimmed of punctuation and path prefixes.
pub fn code_in(text: &str, pred: impl Fn(&str) -> bool) -> Option<String> {
    text.split(|c: char| c.is_whitespace() || c == '/')
        .map(|word| word.trim_matches(|c: char| !c.is_ascii_alphanumeric()))
        .filter(|word| pred(word))
        .last()
        .map(str::to_string)
}
