use axum::{
    Json,
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use maud::{DOCTYPE, html};

#[derive(thiserror::Error, Debug)]
pub enum AppError {
    #[error("Not found")]
    NotFound,
    #[error("Too many requests")]
    TooManyAttempts,
    #[error("Upstream service unavailable")]
    UpstreamUnavailable,
    #[error("{0}")]
    BadRequest(String),
    #[error(transparent)]
    Database(#[from] anyhow::Error),
    #[error("{0}")]
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            // API-shaped failures respond as JSON.
            AppError::TooManyAttempts => (
                StatusCode::TOO_MANY_REQUESTS,
                Json(serde_json::json!({
                    "error": "Too many requests. Please try again later."
                })),
            )
                .into_response(),
            AppError::BadRequest(msg) => (
                StatusCode::BAD_REQUEST,
                Json(serde_json::json!({ "error": msg })),
            )
                .into_response(),
            AppError::NotFound => error_page(
                StatusCode::NOT_FOUND,
                "404 Not Found",
                "The page or file you requested could not be found.",
            ),
            AppError::UpstreamUnavailable => error_page(
                StatusCode::SERVICE_UNAVAILABLE,
                "503 Service Unavailable",
                "A required service is temporarily unavailable. Please try again later.",
            ),
            AppError::Database(e) => {
                tracing::error!("Database error: {:#}", e);
                error_page(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "500 Internal Server Error",
                    "An internal server error occurred.",
                )
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                error_page(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "500 Internal Server Error",
                    "An internal server error occurred.",
                )
            }
        }
    }
}

fn error_page(status: StatusCode, title: &str, message: &str) -> Response {
    let body = html! {
        (DOCTYPE)
        html lang="en" {
            head {
                meta charset="utf-8";
                title { (title) }
            }
            body {
                h1 { (title) }
                p { (message) }
            }
        }
    };

    (status, Html(body.into_string())).into_response()
}
