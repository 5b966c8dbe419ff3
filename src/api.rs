//! HTTP surface of the cart service.
//!
//! The upstream auth gateway authenticates the visitor and forwards their id
//! in the `x-user-id` header; handlers only ever touch that user's cart.

use axum::{
    async_trait,
    extract::{FromRequestParts, Path, State},
    http::{request::Parts, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use uuid::Uuid;
use validator::Validate;

use crate::domain::aggregates::LocalCartItem;
use crate::domain::value_objects::{LineItemId, ProductId, UserId, VariantKey};
use crate::services::CartService;
use crate::CartError;

pub const USER_ID_HEADER: &str = "x-user-id";

#[derive(Clone)]
pub struct AppState {
    pub cart: CartService,
}

impl AppState {
    pub fn new(cart: CartService) -> Self { Self { cart } }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { Json(json!({"status": "healthy", "service": "opensase-cart"})) }))
        .route("/api/v1/cart", get(list_cart).delete(clear_cart))
        .route("/api/v1/cart/items", post(add_to_cart))
        .route("/api/v1/cart/items/:id", put(set_quantity).delete(remove_item))
        .route("/api/v1/cart/sync", post(sync_cart))
        .route("/api/v1/cart/summary", get(cart_summary))
        .route("/api/v1/cart/checkout/validate", post(validate_checkout))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

// =============================================================================
// Errors
// =============================================================================

#[derive(Debug)]
pub enum ApiError {
    Cart(CartError),
    Unauthorized(String),
}

impl From<CartError> for ApiError {
    fn from(err: CartError) -> Self { Self::Cart(err) }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut messages: Vec<String> = errors
            .field_errors()
            .into_iter()
            .map(|(field, errs)| {
                let codes: Vec<&str> = errs.iter().map(|e| e.code.as_ref()).collect();
                format!("{field}: {}", codes.join(", "))
            })
            .collect();
        messages.sort();
        Self::Cart(CartError::Validation(messages))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            Self::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, json!({"error": "unauthorized", "message": msg})),
            Self::Cart(err) => match err {
                CartError::Validation(messages) => (
                    StatusCode::UNPROCESSABLE_ENTITY,
                    json!({"error": "validation_error", "message": err.to_string(), "messages": messages}),
                ),
                CartError::NotFound(_) => (StatusCode::NOT_FOUND, json!({"error": "not_found", "message": err.to_string()})),
                CartError::InsufficientStock { available, requested, product_name } => (
                    StatusCode::CONFLICT,
                    json!({
                        "error": "insufficient_stock",
                        "message": err.to_string(),
                        "available": available,
                        "requested": requested,
                        "product_name": product_name,
                    }),
                ),
                CartError::StoreUnavailable(_) => {
                    tracing::error!(error = %err, "cart store unavailable");
                    (StatusCode::SERVICE_UNAVAILABLE, json!({"error": "store_unavailable", "message": "Cart storage is temporarily unavailable"}))
                }
                CartError::CatalogUnavailable(_) => {
                    tracing::error!(error = %err, "catalog unavailable");
                    (StatusCode::BAD_GATEWAY, json!({"error": "catalog_unavailable", "message": "Catalog is temporarily unavailable"}))
                }
            },
        };
        (status, Json(body)).into_response()
    }
}

// =============================================================================
// Authenticated user
// =============================================================================

pub struct AuthenticatedUser(pub UserId);

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for AuthenticatedUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let raw = parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| ApiError::Unauthorized(format!("missing {USER_ID_HEADER} header")))?;
        UserId::parse(raw)
            .map(Self)
            .map_err(|e| ApiError::Unauthorized(format!("invalid {USER_ID_HEADER} header: {e}")))
    }
}

// =============================================================================
// Handlers
// =============================================================================

#[derive(Debug, Deserialize, Validate)]
pub struct AddToCartRequest {
    pub product_id: ProductId,
    #[validate(range(min = 1, max = 10000))]
    pub quantity: i32,
    #[validate(length(max = 64))]
    pub color: Option<String>,
    #[validate(length(max = 64))]
    pub size: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct SetQuantityRequest {
    #[validate(range(min = 0, max = 10000))]
    pub quantity: i32,
}

#[derive(Debug, Deserialize, Validate)]
pub struct SyncRequest {
    #[validate(length(max = 500))]
    pub items: Vec<LocalCartItem>,
}

/// Range-validated request quantities always fit.
fn as_count(quantity: i32) -> u32 { u32::try_from(quantity).unwrap_or(0) }

async fn list_cart(State(s): State<AppState>, AuthenticatedUser(user): AuthenticatedUser) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(s.cart.list_cart(&user).await?))
}

async fn add_to_cart(
    State(s): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Json(r): Json<AddToCartRequest>,
) -> Result<impl IntoResponse, ApiError> {
    r.validate()?;
    let variant = VariantKey::new(r.color.as_deref(), r.size.as_deref());
    let item = s.cart.add_to_cart(&user, r.product_id, as_count(r.quantity), variant).await?;
    Ok((StatusCode::CREATED, Json(item)))
}

async fn set_quantity(
    State(s): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(r): Json<SetQuantityRequest>,
) -> Result<Response, ApiError> {
    r.validate()?;
    let updated = s.cart.set_quantity(&user, LineItemId::from_uuid(id), as_count(r.quantity)).await?;
    Ok(match updated {
        Some(item) => Json(item).into_response(),
        None => StatusCode::NO_CONTENT.into_response(),
    })
}

async fn remove_item(
    State(s): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    s.cart.remove_item(&user, LineItemId::from_uuid(id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn sync_cart(
    State(s): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Json(r): Json<SyncRequest>,
) -> Result<impl IntoResponse, ApiError> {
    r.validate()?;
    Ok(Json(s.cart.sync(&user, &r.items).await?))
}

async fn cart_summary(State(s): State<AppState>, AuthenticatedUser(user): AuthenticatedUser) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(s.cart.summarize(&user).await?))
}

async fn validate_checkout(State(s): State<AppState>, AuthenticatedUser(user): AuthenticatedUser) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(s.cart.validate_for_checkout(&user).await?))
}

async fn clear_cart(State(s): State<AppState>, AuthenticatedUser(user): AuthenticatedUser) -> Result<impl IntoResponse, ApiError> {
    let deleted = s.cart.clear_cart(&user).await?;
    Ok(Json(json!({"deleted_count": deleted})))
}

#[cfg(test)]
mod tests {
    use axum::body::{to_bytes, Body};
    use axum::http::{Method, Request};
    use serde_json::Value;
    use tower::ServiceExt;

    use super::*;
    use crate::services::testing::{user, Harness};

    fn app(h: &Harness) -> Router {
        router(AppState::new(h.service.clone()))
    }

    async fn call(app: Router, method: Method, uri: &str, user: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(user) = user {
            builder = builder.header(USER_ID_HEADER, user);
        }
        let request = match body {
            Some(body) => builder.header("content-type", "application/json").body(Body::from(body.to_string())).unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes).unwrap() };
        (status, value)
    }

    #[tokio::test]
    async fn test_health() {
        let h = Harness::new();
        let (status, body) = call(app(&h), Method::GET, "/health", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
    }

    #[tokio::test]
    async fn test_requests_without_user_are_unauthorized() {
        let h = Harness::new();
        let (status, body) = call(app(&h), Method::GET, "/api/v1/cart", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "unauthorized");
    }

    #[tokio::test]
    async fn test_add_then_list() {
        let h = Harness::new();
        let p = h.product("Tee", 2500, 10).await;
        let body = json!({"product_id": p, "quantity": 2, "color": "Red"});

        let (status, item) = call(app(&h), Method::POST, "/api/v1/cart/items", Some("u1"), Some(body)).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(item["quantity"], 2);
        assert_eq!(item["color"], "Red");

        let (status, items) = call(app(&h), Method::GET, "/api/v1/cart", Some("u1"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(items.as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_add_rejects_non_positive_quantity() {
        let h = Harness::new();
        let p = h.product("Tee", 2500, 10).await;
        let body = json!({"product_id": p, "quantity": 0});
        let (status, body) = call(app(&h), Method::POST, "/api/v1/cart/items", Some("u1"), Some(body)).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["error"], "validation_error");
        assert_eq!(body["messages"][0], "quantity: range");
    }

    #[tokio::test]
    async fn test_insufficient_stock_body() {
        let h = Harness::new();
        let p = h.product("Tee", 2500, 3).await;
        let body = json!({"product_id": p, "quantity": 5});
        let (status, body) = call(app(&h), Method::POST, "/api/v1/cart/items", Some("u1"), Some(body)).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"], "insufficient_stock");
        assert_eq!(body["available"], 3);
        assert_eq!(body["requested"], 5);
        assert_eq!(body["product_name"], "Tee");
    }

    #[tokio::test]
    async fn test_sync_endpoint_reports_conflicts() {
        let h = Harness::new();
        let u = user("u1");
        let p = h.product("P1", 1000, 10).await;
        h.persist(&u, p, 2).await;
        let body = json!({"items": [{"product_id": p, "quantity": 1, "product": {"name": "P1"}}]});

        let (status, report) = call(app(&h), Method::POST, "/api/v1/cart/sync", Some("u1"), Some(body)).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(report["conflicts"][0]["reason"], "recent_local_activity");
        assert_eq!(report["merged"][0]["quantity"], 1);
        assert_eq!(report["rejected"].as_array().unwrap().len(), 0);
    }

    #[tokio::test]
    async fn test_set_quantity_and_remove() {
        let h = Harness::new();
        let u = user("u1");
        let p = h.product("Mug", 1200, 10).await;
        let item = h.service.add_to_cart(&u, p, 1, VariantKey::none()).await.unwrap();
        let uri = format!("/api/v1/cart/items/{}", item.id);

        let (status, body) = call(app(&h), Method::PUT, &uri, Some("u1"), Some(json!({"quantity": 4}))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["quantity"], 4);

        let (status, _) = call(app(&h), Method::DELETE, &uri, Some("u2"), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = call(app(&h), Method::PUT, &uri, Some("u1"), Some(json!({"quantity": 0}))).await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (status, _) = call(app(&h), Method::DELETE, &uri, Some("u1"), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_summary_checkout_and_clear() {
        let h = Harness::new();
        let u = user("u1");
        let p = h.product("Mug", 1200, 10).await;
        h.service.add_to_cart(&u, p, 2, VariantKey::none()).await.unwrap();

        let (status, summary) = call(app(&h), Method::GET, "/api/v1/cart/summary", Some("u1"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(summary["item_count"], 2);
        assert_eq!(summary["subtotal"]["amount"], "24.00");

        let (status, checkout) = call(app(&h), Method::POST, "/api/v1/cart/checkout/validate", Some("u1"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(checkout["items"].as_array().unwrap().len(), 1);

        let (status, cleared) = call(app(&h), Method::DELETE, "/api/v1/cart", Some("u1"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(cleared["deleted_count"], 1);

        let (status, body) = call(app(&h), Method::POST, "/api/v1/cart/checkout/validate", Some("u1"), None).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["messages"][0], "Cart is empty");
    }

    #[tokio::test]
    async fn test_store_outage_is_503() {
        let h = Harness::new();
        h.store.set_unavailable(true);
        let (status, body) = call(app(&h), Method::POST, "/api/v1/cart/sync", Some("u1"), Some(json!({"items": []}))).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["error"], "store_unavailable");
    }
}
