//! `/api/v1/products`: the public catalogue and its recipes.

use axum::extract::State;
use axum::routing::{get, put};
use axum::Router;

use store_core::{NewProduct, ProductPatch, RecipeLine};

use crate::auth::StaffUser;
use crate::error::{ApiError, ApiResult};
use crate::response::Reply;
use crate::validate::{IdParam, JsonBody, Params};
use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_products).post(create_product))
        .route(
            "/{id}",
            get(get_product).patch(update_product).delete(delete_product),
        )
        .route("/{id}/materials", put(set_material))
}

async fn list_products(State(state): State<AppState>) -> ApiResult<Reply> {
    let products = state.db.products().list().await?;
    Ok(Reply::ok().list("products", &products))
}

async fn get_product(State(state): State<AppState>, Params(params): Params) -> ApiResult<Reply> {
    let IdParam { id } = state.validate("products.get", &params)?;
    let product = state
        .db
        .products()
        .detail(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Product not found"))?;
    Ok(Reply::ok().data("product", product))
}

async fn create_product(
    State(state): State<AppState>,
    _staff: StaffUser,
    JsonBody(body): JsonBody,
) -> ApiResult<Reply> {
    let input: NewProduct = state.validate("products.create", &body)?;
    let product = state.db.products().create(&input).await?;
    Ok(Reply::created().data("product", product))
}

async fn update_product(
    State(state): State<AppState>,
    _staff: StaffUser,
    Params(params): Params,
    JsonBody(body): JsonBody,
) -> ApiResult<Reply> {
    let IdParam { id } = state.validate("products.get", &params)?;
    let patch: ProductPatch = state.validate("products.update", &body)?;
    let product = state.db.products().update(id, &patch).await?;
    Ok(Reply::ok().data("product", product))
}

async fn delete_product(
    State(state): State<AppState>,
    _staff: StaffUser,
    Params(params): Params,
) -> ApiResult<Reply> {
    let IdParam { id } = state.validate("products.get", &params)?;
    state.db.products().delete(id).await?;
    Ok(Reply::no_content())
}

/// `PUT /products/{id}/materials`: adds or replaces one recipe line.
async fn set_material(
    State(state): State<AppState>,
    _staff: StaffUser,
    Params(params): Params,
    JsonBody(body): JsonBody,
) -> ApiResult<Reply> {
    let IdParam { id } = state.validate("products.get", &params)?;
    let line: RecipeLine = state.validate("products.setMaterial", &body)?;
    let product = state.db.products().set_material(id, &line).await?;
    Ok(Reply::ok().data("product", product))
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use serde_json::json;

    use crate::testing::TestApp;

    async fn cake(app: &TestApp, token: &str) -> i64 {
        let (status, body) = app
            .post(
                "/api/v1/products",
                Some(token),
                json!({"product_name": "Basbousa", "base_price_cents": 2500}),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        body["data"]["product"]["product_id"].as_i64().unwrap()
    }

    #[tokio::test]
    async fn test_catalogue_is_public() {
        let app = TestApp::new().await;
        let token = app.staff_token().await;
        let id = cake(&app, &token).await;

        let (status, body) = app.get("/api/v1/products", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["results"], 1);
        assert_eq!(body["data"]["products"][0]["product_id"], id);

        let (status, body) = app.get(&format!("/api/v1/products/{id}"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["product"]["base_price_cents"], 2500);
        assert_eq!(body["data"]["product"]["materials"], json!([]));
    }

    #[tokio::test]
    async fn test_price_must_be_positive() {
        let app = TestApp::new().await;
        let token = app.staff_token().await;
        let (status, _) = app
            .post(
                "/api/v1/products",
                Some(&token),
                json!({"product_name": "Basbousa", "base_price_cents": -5}),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_recipe_line_replaces() {
        let app = TestApp::new().await;
        let token = app.staff_token().await;
        let id = cake(&app, &token).await;
        let (_, body) = app
            .post("/api/v1/raw-materials", Some(&token), json!({"material_name": "Semolina"}))
            .await;
        let semolina = body["data"]["rawMaterial"]["raw_material_id"].as_i64().unwrap();
        let uri = format!("/api/v1/products/{id}/materials");

        app.put(
            &uri,
            Some(&token),
            json!({"raw_material_id": semolina, "quantity_needed": 0.5, "unit_of_measure": "kg"}),
        )
        .await;
        let (status, body) = app
            .put(
                &uri,
                Some(&token),
                json!({"raw_material_id": semolina, "quantity_needed": 750, "unit_of_measure": "g"}),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        let materials = body["data"]["product"]["materials"].as_array().unwrap();
        assert_eq!(materials.len(), 1);
        assert_eq!(materials[0]["unit_of_measure"], "g");
        assert_eq!(materials[0]["material_name"], "Semolina");
    }

    #[tokio::test]
    async fn test_update_and_delete() {
        let app = TestApp::new().await;
        let token = app.staff_token().await;
        let id = cake(&app, &token).await;

        let (status, body) = app
            .patch(
                &format!("/api/v1/products/{id}"),
                Some(&token),
                json!({"base_price_cents": "3000"}),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["product"]["base_price_cents"], 3000);
        assert_eq!(body["data"]["product"]["product_name"], "Basbousa");

        let (status, _) = app.delete(&format!("/api/v1/products/{id}"), Some(&token)).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (status, body) = app.get(&format!("/api/v1/products/{id}"), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["message"], "Product not found");
    }
}
