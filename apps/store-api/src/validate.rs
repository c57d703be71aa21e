//! Request data extraction for schema validation.
//!
//! Writes validate the JSON body ([`JsonBody`]); reads and deletes validate
//! path parameters merged with the query string ([`Params`]). Both arrive
//! as untyped JSON so the schema layer can coerce and report on them.

use std::collections::HashMap;

use axum::body::Bytes;
use axum::extract::{FromRequest, FromRequestParts, Path, Query, Request};
use axum::http::request::Parts;
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::error::ApiError;

/// `{ "id": … }` after a `*.get` schema.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct IdParam {
    pub id: i64,
}

/// The raw JSON body. An empty body reads as `null`, which schemas treat as
/// an empty object.
#[derive(Debug, Clone)]
pub struct JsonBody(pub Value);

impl<S> FromRequest<S> for JsonBody
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, ApiError> {
        let bytes = Bytes::from_request(req, state)
            .await
            .map_err(|e| ApiError::bad_request(e.body_text()))?;
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(JsonBody(Value::Null));
        }
        serde_json::from_slice(&bytes)
            .map(JsonBody)
            .map_err(|e| ApiError::bad_request(format!("Invalid JSON in request body: {e}")))
    }
}

/// Path parameters merged with the query string, as strings.
#[derive(Debug, Clone)]
pub struct Params(pub Value);

impl<S> FromRequestParts<S> for Params
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, ApiError> {
        let Path(path) = Path::<HashMap<String, String>>::from_request_parts(parts, state)
            .await
            .map_err(|e| ApiError::bad_request(e.body_text()))?;
        let Query(query) = Query::<HashMap<String, String>>::from_request_parts(parts, state)
            .await
            .map_err(|e| ApiError::bad_request(e.body_text()))?;
        Ok(Params(merge(path, query)))
    }
}

/// Query string only, for routes without path parameters.
#[derive(Debug, Clone)]
pub struct QueryParams(pub Value);

impl<S> FromRequestParts<S> for QueryParams
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, ApiError> {
        let Query(query) = Query::<HashMap<String, String>>::from_request_parts(parts, state)
            .await
            .map_err(|e| ApiError::bad_request(e.body_text()))?;
        Ok(QueryParams(merge(HashMap::new(), query)))
    }
}

/// Path values win over query values with the same name.
fn merge(path: HashMap<String, String>, query: HashMap<String, String>) -> Value {
    let mut merged: Map<String, Value> = query
        .into_iter()
        .map(|(k, v)| (k, Value::String(v)))
        .collect();
    for (key, value) in path {
        merged.insert(key, Value::String(value));
    }
    Value::Object(merged)
}
