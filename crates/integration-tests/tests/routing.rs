//! In-process router tests.
//!
//! The database behind these routers is unreachable, so they cover what the
//! stack does before and around persistence: middleware, guards, and the
//! error mapping when a query fails.

#![allow(clippy::unwrap_used)]

use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use axum::response::Response;
use tower::ServiceExt;

use livestall_integration_tests::offline_app;

async fn get(path: &str) -> Response {
    offline_app()
        .oneshot(Request::get(path).body(Body::empty()).unwrap())
        .await
        .unwrap()
}

async fn post_form(path: &str, body: &str) -> Response {
    offline_app()
        .oneshot(
            Request::post(path)
                .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(Body::from(body.to_owned()))
                .unwrap(),
        )
        .await
        .unwrap()
}

async fn body_text(response: Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

fn location(response: &Response) -> &str {
    response
        .headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
}

#[tokio::test]
async fn test_health_does_not_touch_the_database() {
    let response = get("/health").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_text(response).await, "ok");
}

#[tokio::test]
async fn test_readiness_reports_unreachable_database() {
    let response = get("/health/ready").await;
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_pages_carry_security_headers() {
    let response = get("/auth/login").await;
    assert_eq!(response.status(), StatusCode::OK);

    let headers = response.headers();
    assert_eq!(headers.get(header::X_FRAME_OPTIONS).unwrap(), "DENY");
    assert_eq!(headers.get(header::X_CONTENT_TYPE_OPTIONS).unwrap(), "nosniff");
    assert_eq!(
        headers.get(header::CACHE_CONTROL).unwrap(),
        "no-store, max-age=0"
    );
    let csp = headers
        .get(header::CONTENT_SECURITY_POLICY)
        .unwrap()
        .to_str()
        .unwrap();
    assert!(csp.contains("frame-ancestors 'none'"));
    assert!(csp.contains("style-src 'self'"));
}

#[tokio::test]
async fn test_script_tag_uses_the_csp_nonce() {
    let response = get("/auth/login").await;
    let csp = response
        .headers()
        .get(header::CONTENT_SECURITY_POLICY)
        .unwrap()
        .to_str()
        .unwrap()
        .to_owned();
    let html = body_text(response).await;

    let nonce = csp
        .split("'nonce-")
        .nth(1)
        .and_then(|rest| rest.split('\'').next())
        .unwrap();
    assert!(!nonce.is_empty());
    assert!(html.contains(&format!("nonce=\"{nonce}\"")));
}

#[tokio::test]
async fn test_nonce_changes_per_request() {
    let first = get("/auth/login").await;
    let second = get("/auth/login").await;
    assert_ne!(
        first.headers().get(header::CONTENT_SECURITY_POLICY),
        second.headers().get(header::CONTENT_SECURITY_POLICY)
    );
}

#[tokio::test]
async fn test_request_id_is_echoed_or_generated() {
    let response = offline_app()
        .oneshot(
            Request::get("/health")
                .header("x-request-id", "trace-me-123")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.headers().get("x-request-id").unwrap(), "trace-me-123");

    let response = get("/health").await;
    let generated = response.headers().get("x-request-id").unwrap();
    assert!(!generated.is_empty());
}

#[tokio::test]
async fn test_login_and_register_pages_render_without_database() {
    let login = get("/auth/login").await;
    assert_eq!(login.status(), StatusCode::OK);
    let html = body_text(login).await;
    assert!(html.contains("name=\"email\""));
    assert!(html.contains("name=\"password\""));

    let register = get("/auth/register").await;
    assert_eq!(register.status(), StatusCode::OK);
    let html = body_text(register).await;
    assert!(html.contains("name=\"password_confirm\""));
}

#[tokio::test]
async fn test_anonymous_cart_is_empty() {
    let response = get("/cart/count").await;
    assert_eq!(response.status(), StatusCode::OK);
    let html = body_text(response).await;
    assert!(html.contains("id=\"cart-count\""));
}

#[tokio::test]
async fn test_signed_in_pages_redirect_to_login() {
    for path in ["/account", "/orders", "/messages", "/checkout"] {
        let response = get(path).await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER, "{path}");
        assert_eq!(location(&response), "/auth/login", "{path}");
    }
}

#[tokio::test]
async fn test_seller_and_admin_areas_redirect_anonymous_users() {
    for path in ["/seller", "/seller/products", "/admin", "/admin/users"] {
        let response = get(path).await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER, "{path}");
        assert_eq!(location(&response), "/auth/login", "{path}");
    }
}

#[tokio::test]
async fn test_api_rejects_anonymous_callers_with_401() {
    let response = offline_app()
        .oneshot(
            Request::post("/api/identity/sessions")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = offline_app()
        .oneshot(
            Request::post("/api/counters/order/next")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_database_failure_hides_details() {
    let response = get("/").await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = body_text(response).await;
    assert_eq!(body, "Internal server error");
}

#[tokio::test]
async fn test_register_validates_before_touching_the_database() {
    let response = post_form(
        "/auth/register",
        "email=not-an-email&display_name=Sam&password=short&password_confirm=short",
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let html = body_text(response).await;
    assert!(html.contains("Invalid email address"));
    assert!(html.contains("value=\"Sam\""));
}

#[tokio::test]
async fn test_unknown_route_is_404() {
    let response = get("/definitely/not/here").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
