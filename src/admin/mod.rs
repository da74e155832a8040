mod handlers;
mod template;

use axum::{
    Form, Router,
    extract::{Request, State},
    http::{HeaderMap, StatusCode, header},
    middleware::{self, Next},
    response::{Html, IntoResponse, Redirect, Response},
    routing::{get, post},
};
use serde::Deserialize;

use crate::{
    auth::{self, AuthError, LOGIN_PATH, Session},
    state::AppState,
};

// ── Router ────────────────────────────────────────────────────────────────────

pub fn router() -> Router<AppState> {
    let public = Router::new()
        .route("/admin/login", get(get_login).post(post_login))
        // Logout is public on purpose: clearing a cookie that isn't there
        // is not an error.
        .route("/admin/logout", post(post_logout));

    let protected = Router::new()
        .route("/admin", get(handlers::get_dashboard))
        .route("/admin/consent-doc/{id}", get(handlers::get_consent_doc))
        .route_layer(middleware::from_fn(require_auth));

    Router::new().merge(public).merge(protected)
}

// ── Auth gate ─────────────────────────────────────────────────────────────────

/// Route middleware in front of every protected handler, so the check runs
/// strictly before any data fetching.
async fn require_auth(req: Request, next: Next) -> Response {
    if auth::is_authorized(req.headers()) {
        return next.run(req).await;
    }
    Redirect::to(LOGIN_PATH).into_response()
}

// ── Login / logout ────────────────────────────────────────────────────────────

async fn get_login() -> Response {
    Html(template::login_page(None).into_string()).into_response()
}

#[derive(Deserialize)]
struct LoginForm {
    password: String,
}

async fn post_login(
    State(state): State<AppState>,
    headers: HeaderMap,
    Form(form): Form<LoginForm>,
) -> Response {
    let identity = auth::client_ip(&headers);

    match auth::login(&state, &form.password, &identity).await {
        Ok(_session) => (
            StatusCode::SEE_OTHER,
            [
                (header::SET_COOKIE, Session::set_cookie(state.secure_cookies)),
                (header::LOCATION, "/admin".to_string()),
            ],
        )
            .into_response(),
        Err(AuthError::TooManyAttempts) => {
            // Carries no secret information, so it may be surfaced as-is.
            tracing::warn!("Throttled admin login from {}", identity);
            Html(
                template::login_page(Some("Too many attempts. Please try again later."))
                    .into_string(),
            )
            .into_response()
        }
        Err(e) => {
            // Misconfiguration vs. wrong password is logged in detail but
            // collapsed to one generic message for the user.
            tracing::warn!("Admin login failed from {}: {}", identity, e);
            Html(template::login_page(Some("Authentication failed.")).into_string())
                .into_response()
        }
    }
}

async fn post_logout(State(state): State<AppState>) -> Response {
    (
        StatusCode::SEE_OTHER,
        [
            (header::SET_COOKIE, Session::clear_cookie(state.secure_cookies)),
            (header::LOCATION, LOGIN_PATH.to_string()),
        ],
    )
        .into_response()
}
