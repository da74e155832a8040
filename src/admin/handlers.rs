use axum::{
    extract::{Path, State},
    http::{StatusCode, header},
    response::{Html, IntoResponse, Response},
};
use std::collections::HashMap;

use crate::{
    db,
    error::AppError,
    state::AppState,
    storage::{self, DOCUMENTS_BUCKET, SIGNATURES_BUCKET},
};

use super::template;

/// Signed-URL lifetime for dashboard file previews.
const PREVIEW_TTL_SECS: u64 = 3600;
/// Longer lifetime for consent/signature links.
const DOCUMENT_TTL_SECS: u64 = 86400;

// ── Dashboard ─────────────────────────────────────────────────────────────────

pub async fn get_dashboard(State(state): State<AppState>) -> Result<Response, AppError> {
    let tax_requests = db::list_tax_requests(&state.db).await?;
    let contacts = db::list_contacts(&state.db).await?;
    let consents = db::list_consents(&state.db).await?;

    // Fresh signed URLs per render; they are short-lived by design. Each
    // file resolves independently so one failure cannot blank its siblings.
    let mut file_urls: HashMap<String, String> = HashMap::new();
    for request in &tax_requests {
        for stored in &request.uploaded_file_urls {
            let url = storage::resolve_access_url(
                state.storage.as_ref(),
                DOCUMENTS_BUCKET,
                stored,
                PREVIEW_TTL_SECS,
            )
            .await;
            file_urls.insert(stored.clone(), url);
        }
    }

    let mut signature_urls: HashMap<String, String> = HashMap::new();
    for consent in &consents {
        if let Some(stored) = &consent.signature_photo_url {
            let url = storage::resolve_access_url(
                state.storage.as_ref(),
                SIGNATURES_BUCKET,
                stored,
                DOCUMENT_TTL_SECS,
            )
            .await;
            signature_urls.insert(stored.clone(), url);
        }
    }

    Ok(Html(
        template::dashboard(&tax_requests, &contacts, &consents, &file_urls, &signature_urls)
            .into_string(),
    )
    .into_response())
}

// ── Printable consent document ────────────────────────────────────────────────

pub async fn get_consent_doc(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Response, AppError> {
    let consent = db::get_consent(&state.db, id)
        .await?
        .ok_or(AppError::NotFound)?;

    let signature_url = match &consent.signature_photo_url {
        Some(stored) => Some(
            storage::resolve_access_url(
                state.storage.as_ref(),
                SIGNATURES_BUCKET,
                stored,
                DOCUMENT_TTL_SECS,
            )
            .await,
        ),
        None => None,
    };

    let filename = format!(
        "consent-{}-{}.pdf",
        consent.client_name.replace(char::is_whitespace, "_"),
        consent.id
    );
    let body = template::consent_document(&consent, signature_url.as_deref()).into_string();

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "text/html; charset=utf-8")
        .header(
            header::CONTENT_DISPOSITION,
            format!("inline; filename=\"{}\"", filename),
        )
        .body(body.into())
        .map_err(|e| AppError::Internal(e.to_string()))
}
