//! Success envelope.
//!
//! ```text
//! {
//!   "status": "success",
//!   "results": 3,            // lists only
//!   "token": "…",            // auth endpoints only
//!   "message": "…",          // optional
//!   "data": { "vendors": [ … ] }
//! }
//! ```
//!
//! `204 No Content` responses carry no body at all.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::ApiError;

#[derive(Debug, Serialize)]
struct Envelope {
    status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    results: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<Map<String, Value>>,
}

#[derive(Debug)]
pub struct Reply {
    status: StatusCode,
    envelope: Envelope,
    failure: Option<serde_json::Error>,
}

impl Reply {
    fn with_status(status: StatusCode) -> Self {
        Reply {
            status,
            envelope: Envelope {
                status: "success",
                results: None,
                token: None,
                message: None,
                data: None,
            },
            failure: None,
        }
    }

    pub fn ok() -> Self {
        Reply::with_status(StatusCode::OK)
    }

    pub fn created() -> Self {
        Reply::with_status(StatusCode::CREATED)
    }

    pub fn no_content() -> Self {
        Reply::with_status(StatusCode::NO_CONTENT)
    }

    /// Adds `data.<key>`.
    pub fn data(mut self, key: &str, value: impl Serialize) -> Self {
        match serde_json::to_value(value) {
            Ok(value) => {
                self.envelope
                    .data
                    .get_or_insert_with(Map::new)
                    .insert(key.to_string(), value);
            }
            Err(e) => {
                self.failure.get_or_insert(e);
            }
        }
        self
    }

    /// Adds `data.<key>` and the `results` count.
    pub fn list<T: Serialize>(mut self, key: &str, items: &[T]) -> Self {
        self.envelope.results = Some(items.len());
        self.data(key, items)
    }

    pub fn token(mut self, token: String) -> Self {
        self.envelope.token = Some(token);
        self
    }

    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.envelope.message = Some(message.into());
        self
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl IntoResponse for Reply {
    fn into_response(self) -> Response {
        if let Some(e) = self.failure {
            return ApiError::from(e).into_response();
        }
        if self.status == StatusCode::NO_CONTENT {
            return StatusCode::NO_CONTENT.into_response();
        }
        (self.status, Json(self.envelope)).into_response()
    }
}
