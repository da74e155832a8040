use axum::{
    Router,
    body::Body,
    http::{Request, Response, StatusCode, header},
};
use base64ct::{Base64, Encoding};
use http_body_util::BodyExt;
use sqlx::sqlite::SqlitePoolOptions;
use std::sync::Arc;
use tower::ServiceExt;

use tax_intake::{
    app,
    auth::{self, AdminCredential},
    db,
    rate_limit::RateLimiter,
    state::AppState,
    storage::Storage,
};

const PASSWORD: &str = "hunter2-battery-staple";

async fn test_app(credential: Option<AdminCredential>) -> Router {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    db::init_schema(&pool).await.unwrap();

    app(AppState {
        db: pool,
        limiter: Arc::new(RateLimiter::memory()),
        credential,
        storage: None,
        secure_cookies: false,
    })
}

async fn test_app_with_storage(storage: Storage) -> Router {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    db::init_schema(&pool).await.unwrap();

    app(AppState {
        db: pool,
        limiter: Arc::new(RateLimiter::memory()),
        credential: None,
        storage: Some(storage),
        secure_cookies: false,
    })
}

/// Serve a stand-in object store holding one tax document and one signature
/// photo, and return its base URL.
async fn mock_store() -> String {
    use axum::{extract::Path, response::IntoResponse, routing::get};

    let router = Router::new().route(
        "/object/{bucket}/{key}",
        get(|Path((bucket, key)): Path<(String, String)>| async move {
            match (bucket.as_str(), key.as_str()) {
                ("tax-documents", "1700000000-abcd.pdf") => (
                    [(header::CONTENT_TYPE, "application/pdf")],
                    b"%PDF-1.4 stub".to_vec(),
                )
                    .into_response(),
                ("signatures", "signature_123_ab.png") => (
                    [(header::CONTENT_TYPE, "image/png")],
                    b"\x89PNG stub".to_vec(),
                )
                    .into_response(),
                _ => StatusCode::NOT_FOUND.into_response(),
            }
        }),
    );

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}")
}

fn test_credential() -> AdminCredential {
    let phc = auth::hash_password(PASSWORD).unwrap();
    AdminCredential::from_base64(&Base64::encode_string(phc.as_bytes())).unwrap()
}

fn login_request(password: &str, ip: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/admin/login")
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .header("x-forwarded-for", ip)
        .body(Body::from(format!("password={password}")))
        .unwrap()
}

fn contact_request(ip: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/contact")
        .header(header::CONTENT_TYPE, "application/json")
        .header("x-forwarded-for", ip)
        .body(Body::from(
            r#"{"name":"Pat","email":"pat@example.com","message":"Hello"}"#,
        ))
        .unwrap()
}

async fn body_string(resp: Response<Body>) -> String {
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

fn set_cookie(resp: &Response<Body>) -> Option<String> {
    resp.headers()
        .get(header::SET_COOKIE)
        .map(|v| v.to_str().unwrap().to_string())
}

// ── Login ─────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn wrong_password_never_sets_a_cookie() {
    let app = test_app(Some(test_credential())).await;

    let resp = app.oneshot(login_request("not-the-password", "203.0.113.1")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(set_cookie(&resp).is_none());

    let body = body_string(resp).await;
    assert!(body.contains("Authentication failed."));
    // The generic message must not distinguish a bad password from a
    // missing credential.
    assert!(!body.contains("Invalid credential"));
}

#[tokio::test]
async fn correct_password_sets_the_session_cookie() {
    let app = test_app(Some(test_credential())).await;

    let resp = app.oneshot(login_request(PASSWORD, "203.0.113.1")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(resp.headers().get(header::LOCATION).unwrap(), "/admin");

    let cookie = set_cookie(&resp).unwrap();
    assert!(cookie.starts_with("admin_session=authenticated"));
    assert!(cookie.contains("HttpOnly"));
    assert!(cookie.contains("SameSite=Strict"));
    assert!(cookie.contains("Path=/"));
    // 8 hours exactly.
    assert!(cookie.contains("Max-Age=28800"));
}

#[tokio::test]
async fn sixth_attempt_is_throttled_even_with_the_correct_password() {
    let app = test_app(Some(test_credential())).await;

    for _ in 0..5 {
        let resp = app
            .clone()
            .oneshot(login_request("wrong", "203.0.113.7"))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    let resp = app
        .clone()
        .oneshot(login_request(PASSWORD, "203.0.113.7"))
        .await
        .unwrap();
    assert!(set_cookie(&resp).is_none());
    assert!(body_string(resp).await.contains("Too many attempts"));

    // Denial is idempotent: the next attempt is denied too.
    let resp = app
        .oneshot(login_request(PASSWORD, "203.0.113.7"))
        .await
        .unwrap();
    assert!(set_cookie(&resp).is_none());
    assert!(body_string(resp).await.contains("Too many attempts"));
}

#[tokio::test]
async fn login_throttling_is_isolated_per_identity() {
    let app = test_app(Some(test_credential())).await;

    for _ in 0..6 {
        app.clone()
            .oneshot(login_request("wrong", "203.0.113.8"))
            .await
            .unwrap();
    }

    // Another identity is unaffected.
    let resp = app
        .oneshot(login_request(PASSWORD, "203.0.113.9"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert!(set_cookie(&resp).is_some());
}

#[tokio::test]
async fn missing_credential_fails_with_a_generic_message() {
    let app = test_app(None).await;

    let resp = app.oneshot(login_request(PASSWORD, "203.0.113.1")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(set_cookie(&resp).is_none());

    let body = body_string(resp).await;
    assert!(body.contains("Authentication failed."));
    assert!(!body.contains("configured"));
}

// ── Protected routes ──────────────────────────────────────────────────────────

#[tokio::test]
async fn dashboard_redirects_to_login_without_a_session() {
    let app = test_app(Some(test_credential())).await;

    let resp = app
        .oneshot(Request::builder().uri("/admin").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(
        resp.headers().get(header::LOCATION).unwrap(),
        "/admin/login"
    );
}

#[tokio::test]
async fn dashboard_renders_with_a_session() {
    let app = test_app(Some(test_credential())).await;

    let resp = app
        .oneshot(
            Request::builder()
                .uri("/admin")
                .header(header::COOKIE, "admin_session=authenticated")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(body_string(resp).await.contains("Client Intake Dashboard"));
}

#[tokio::test]
async fn a_tampered_cookie_value_is_rejected() {
    let app = test_app(Some(test_credential())).await;

    let resp = app
        .oneshot(
            Request::builder()
                .uri("/admin")
                .header(header::COOKIE, "admin_session=admin")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
}

#[tokio::test]
async fn logout_clears_the_cookie_and_redirects() {
    let app = test_app(Some(test_credential())).await;

    let resp = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/admin/logout")
                .header(header::COOKIE, "admin_session=authenticated")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(
        resp.headers().get(header::LOCATION).unwrap(),
        "/admin/login"
    );
    let cookie = set_cookie(&resp).unwrap();
    assert!(cookie.starts_with("admin_session=;"));
    assert!(cookie.contains("Max-Age=0"));

    // With the cookie gone, the very next protected request redirects.
    let resp = app
        .oneshot(Request::builder().uri("/admin").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
}

#[tokio::test]
async fn logout_without_a_session_is_not_an_error() {
    let app = test_app(Some(test_credential())).await;

    let resp = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/admin/logout")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
}

// ── Contact form ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn contact_submissions_throttle_after_five_per_minute() {
    let app = test_app(Some(test_credential())).await;

    for _ in 0..5 {
        let resp = app
            .clone()
            .oneshot(contact_request("198.51.100.4"))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::CREATED);
    }

    let resp = app.oneshot(contact_request("198.51.100.4")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::TOO_MANY_REQUESTS);
    assert!(body_string(resp).await.contains("try again later"));
}

#[tokio::test]
async fn contact_requires_name_email_and_message() {
    let app = test_app(Some(test_credential())).await;

    let resp = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/contact")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(r#"{"name":"Pat","email":"","message":"hi"}"#))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert!(body_string(resp).await.contains("required"));
}

// ── Public pages ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn public_pages_render_without_auth() {
    let app = test_app(None).await;

    for path in ["/", "/privacy", "/terms", "/consent", "/healthz"] {
        let resp = app
            .clone()
            .oneshot(Request::builder().uri(path).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK, "path {path}");
    }
}

#[tokio::test]
async fn document_proxy_without_storage_is_unavailable_not_a_crash() {
    let app = test_app(None).await;

    let resp = app
        .oneshot(
            Request::builder()
                .uri("/api/documents/abc123.pdf")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn document_proxy_streams_tax_documents() {
    let base = mock_store().await;
    let app = test_app_with_storage(Storage::new(&base, "test-key".into())).await;

    let resp = app
        .oneshot(
            Request::builder()
                .uri("/api/documents/1700000000-abcd.pdf")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(
        resp.headers().get(header::CONTENT_TYPE).unwrap(),
        "application/pdf"
    );
    assert!(body_string(resp).await.starts_with("%PDF"));
}

#[tokio::test]
async fn document_proxy_serves_signature_photos_too() {
    let base = mock_store().await;
    let app = test_app_with_storage(Storage::new(&base, "test-key".into())).await;

    // Signature photos live in their own bucket but share the proxy route,
    // so a key absent from the documents bucket must still resolve.
    let resp = app
        .oneshot(
            Request::builder()
                .uri("/api/documents/signature_123_ab.png")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(
        resp.headers().get(header::CONTENT_TYPE).unwrap(),
        "image/png"
    );
}

#[tokio::test]
async fn document_proxy_reports_missing_objects_as_not_found() {
    let base = mock_store().await;
    let app = test_app_with_storage(Storage::new(&base, "test-key".into())).await;

    let resp = app
        .oneshot(
            Request::builder()
                .uri("/api/documents/never-uploaded.pdf")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}
