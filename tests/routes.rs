//! Router tests that never reach PostgreSQL: health checks, docs, and requests rejected before any query.

use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use rigstore::models::{Role, User, UserStatus};
use rigstore::service::order::{self, CheckoutInput};
use rigstore::{app_router, common_routes, AppConfig, AppError, AppState, LocalStorage, SmtpMailer};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

async fn body_json(res: axum::response::Response) -> Value {
    let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn lazy_pool() -> sqlx::PgPool {
    sqlx::postgres::PgPoolOptions::new()
        .acquire_timeout(Duration::from_millis(200))
        .connect_lazy("postgres://rigstore@127.0.0.1:1/rigstore")
        .unwrap()
}

/// Full router over a pool that never connects.
fn lazy_app() -> Router {
    lazy_app_with(&[])
}

fn lazy_app_with(env: &[(&str, &str)]) -> Router {
    let config = AppConfig::from_lookup(|key| match key {
        "DATABASE_URL" => Some("postgres://rigstore@127.0.0.1:1/rigstore".into()),
        _ => env.iter().find(|(k, _)| *k == key).map(|(_, v)| v.to_string()),
    })
    .unwrap();
    let pool = lazy_pool();
    let storage = LocalStorage::new(std::env::temp_dir().join("rigstore-route-tests"), "/uploads");
    app_router(AppState {
        pool,
        config: Arc::new(config),
        storage: Arc::new(storage),
        mailer: Arc::new(SmtpMailer),
    })
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

#[tokio::test]
async fn health_is_ok() {
    let res = common_routes().oneshot(get("/health")).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(body_json(res).await["status"], "ok");
}

#[tokio::test]
async fn version_and_info_name_the_crate() {
    let res = common_routes().oneshot(get("/version")).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body = body_json(res).await;
    assert_eq!(body["name"], "rigstore");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));

    let res = common_routes().oneshot(get("/info")).await.unwrap();
    let body = body_json(res).await;
    assert_eq!(body["schema"], rigstore::store::store_schema());
}

#[tokio::test]
async fn openapi_lists_schemas() {
    let res = lazy_app().oneshot(get("/api/openapi.json")).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body = body_json(res).await;
    let schemas = &body["components"]["schemas"];
    for name in ["Product", "Category", "OrderStatus", "SeoReport", "PublicSettings"] {
        assert!(schemas.get(name).is_some(), "missing schema {}", name);
    }
}

#[tokio::test]
async fn admin_routes_require_login() {
    for uri in ["/api/admin/orders", "/api/admin/settings/smtp", "/api/admin/analytics/summary"] {
        let res = lazy_app().oneshot(get(uri)).await.unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED, "{}", uri);
        let body = body_json(res).await;
        assert_eq!(body["error"]["code"], "unauthorized");
    }
}

#[tokio::test]
async fn upload_requires_login() {
    let req = Request::builder()
        .method(Method::POST)
        .uri("/api/admin/uploads")
        .header(header::CONTENT_TYPE, "multipart/form-data; boundary=x")
        .body(Body::from("--x--\r\n"))
        .unwrap();
    let res = lazy_app().oneshot(req).await.unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn oversized_upload_is_413() {
    let req = Request::builder()
        .method(Method::POST)
        .uri("/api/admin/uploads")
        .header(header::CONTENT_TYPE, "multipart/form-data; boundary=x")
        .header(header::CONTENT_LENGTH, (1024 + 64 * 1024 + 1).to_string())
        .body(Body::from("--x--\r\n"))
        .unwrap();
    let res = lazy_app_with(&[("UPLOAD_MAX_BYTES", "1024")]).oneshot(req).await.unwrap();
    assert_eq!(res.status(), StatusCode::PAYLOAD_TOO_LARGE);
}

#[tokio::test]
async fn blocked_user_cannot_check_out() {
    let now = chrono::Utc::now();
    let user = User {
        id: uuid::Uuid::new_v4(),
        email: "blocked@example.com".into(),
        password_hash: String::new(),
        name: "Blocked".into(),
        phone: None,
        role: Role::Customer,
        status: UserStatus::Blocked,
        email_verified: true,
        verification_token: None,
        created_at: now,
        updated_at: now,
    };
    let input: CheckoutInput = serde_json::from_value(serde_json::json!({
        "shipping_address": {
            "full_name": "Blocked Customer",
            "phone": null,
            "line1": "1 Main St",
            "line2": null,
            "city": "Springfield",
            "state": null,
            "postal_code": "12345",
            "country": "US",
        },
        "payment_method": "CASH_ON_DELIVERY",
        "notes": null,
    }))
    .unwrap();
    let res = order::checkout(&lazy_pool(), &SmtpMailer, &user, input, 5).await;
    assert!(matches!(res, Err(AppError::Forbidden(_))));
}

#[tokio::test]
async fn checkout_requires_login() {
    let req = Request::builder()
        .method(Method::POST)
        .uri("/api/orders/checkout")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{}"))
        .unwrap();
    let res = lazy_app().oneshot(req).await.unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn track_rejects_relative_path() {
    let beacon = serde_json::json!({
        "session_id": "s-1",
        "visitor_id": "v-1",
        "path": "products/rtx-4090",
        "event": "PAGE_VIEW",
    });
    let req = Request::builder()
        .method(Method::POST)
        .uri("/api/analytics/track")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(beacon.to_string()))
        .unwrap();
    let res = lazy_app().oneshot(req).await.unwrap();
    assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body_json(res).await["error"]["code"], "validation_error");
}

#[tokio::test]
async fn unknown_route_is_404() {
    let res = lazy_app().oneshot(get("/api/nope")).await.unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}
