pub mod admin;
pub mod auth;
pub mod db;
pub mod error;
pub mod rate_limit;
pub mod site;
pub mod state;
pub mod storage;
pub mod template;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::StatusCode,
    routing::{get, post},
};
use tower_http::{catch_panic::CatchPanicLayer, trace::TraceLayer};

use state::AppState;

/// Uploads are capped well above any realistic tax-document batch.
const BODY_LIMIT_BYTES: usize = 25 * 1024 * 1024;

/// Build the full application router.
///
/// CatchPanicLayer is outermost so it recovers from panics anywhere in the
/// stack.
pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(|| async { StatusCode::OK }))
        .route("/", get(site::get_index))
        .route("/privacy", get(site::get_privacy))
        .route("/terms", get(site::get_terms))
        .route("/consent", get(site::get_consent).post(site::post_consent))
        .route("/tax-request", post(site::post_tax_request))
        .route("/api/contact", post(site::post_contact))
        .route("/api/documents/{filename}", get(site::get_document))
        .merge(admin::router())
        .layer(DefaultBodyLimit::max(BODY_LIMIT_BYTES))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CatchPanicLayer::new())
}
