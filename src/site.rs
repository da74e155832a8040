use axum::{
    Json,
    body::Body,
    extract::{Multipart, Path, State},
    http::{HeaderMap, StatusCode, header},
    response::{Html, IntoResponse, Response},
};
use chrono::Utc;
use serde::Deserialize;

use crate::{
    auth,
    db::{self, NewClientConsent, NewTaxRequest},
    error::AppError,
    rate_limit::Action,
    state::AppState,
    storage::{self, DOCUMENTS_BUCKET, SIGNATURES_BUCKET},
    template,
};

// ── Pages ─────────────────────────────────────────────────────────────────────

pub async fn get_index() -> Html<String> {
    Html(template::index().into_string())
}

pub async fn get_privacy() -> Html<String> {
    Html(template::privacy().into_string())
}

pub async fn get_terms() -> Html<String> {
    Html(template::terms().into_string())
}

pub async fn get_consent() -> Html<String> {
    Html(template::consent_page().into_string())
}

// ── Contact form API ──────────────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct ContactPayload {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub message: Option<String>,
}

pub async fn post_contact(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<ContactPayload>,
) -> Result<Response, AppError> {
    let ip = auth::client_ip(&headers);
    if !state.limiter.admit(Action::Contact, &ip).await {
        return Err(AppError::TooManyAttempts);
    }

    let name = payload.name.as_deref().unwrap_or("").trim();
    let email = payload.email.as_deref().unwrap_or("").trim();
    let message = payload.message.as_deref().unwrap_or("").trim();

    if name.is_empty() || email.is_empty() || message.is_empty() {
        return Err(AppError::BadRequest(
            "Name, email, and message are required".to_string(),
        ));
    }

    db::insert_contact(&state.db, name, email, payload.phone.as_deref(), message).await?;

    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({
            "message": "Contact form submitted successfully"
        })),
    )
        .into_response())
}

// ── Tax service request ───────────────────────────────────────────────────────

pub async fn post_tax_request(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Response, AppError> {
    let mut name = String::new();
    let mut email = String::new();
    let mut phone = None;
    let mut province = None;
    let mut tax_year = None;
    let mut employment_status = None;
    let mut documents_readiness = None;
    let mut notes = None;
    let mut uploaded: Vec<String> = Vec::new();
    let mut uploads_degraded = false;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(e.to_string()))?
    {
        let field_name = field.name().map(str::to_string);
        match field_name.as_deref() {
            Some("documents") => {
                let Some(filename) = field.file_name().map(str::to_string) else {
                    continue;
                };
                if filename.is_empty() {
                    continue;
                }
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::BadRequest(e.to_string()))?;
                if data.is_empty() || uploads_degraded {
                    continue;
                }

                // The submission itself must go through even if storage is
                // down — degrade to a filing without attachments.
                match &state.storage {
                    Some(store) => {
                        let key = generated_key(&filename);
                        let content_type = storage::content_type_for(&filename);
                        match store
                            .upload(DOCUMENTS_BUCKET, &key, content_type, data.to_vec())
                            .await
                        {
                            Ok(()) => uploaded.push(key),
                            Err(e) => {
                                tracing::warn!(
                                    "Document upload failed, continuing without files: {:#}",
                                    e
                                );
                                uploads_degraded = true;
                            }
                        }
                    }
                    None => {
                        tracing::warn!("Object storage not configured; skipping uploaded files");
                        uploads_degraded = true;
                    }
                }
            }
            Some(other) => {
                let value = field
                    .text()
                    .await
                    .map_err(|e| AppError::BadRequest(e.to_string()))?;
                let value = value.trim().to_string();
                match other {
                    "name" => name = value,
                    "email" => email = value,
                    "phone" => phone = non_empty(value),
                    "province" => province = non_empty(value),
                    "tax_year" => tax_year = non_empty(value),
                    "employment_status" => employment_status = non_empty(value),
                    "documents_ready" => documents_readiness = non_empty(value),
                    "notes" => notes = non_empty(value),
                    _ => {}
                }
            }
            None => {}
        }
    }

    if name.is_empty() || email.is_empty() {
        return Err(AppError::BadRequest("Name and email are required".to_string()));
    }

    let (documents_ready, support_needed) = readiness_flags(documents_readiness.as_deref());

    db::insert_tax_request(
        &state.db,
        NewTaxRequest {
            name: &name,
            email: &email,
            phone: phone.as_deref(),
            province: province.as_deref(),
            tax_year: tax_year.as_deref(),
            employment_status: employment_status.as_deref(),
            documents_ready,
            support_needed,
            notes: notes.as_deref(),
            uploaded_file_urls: &uploaded,
        },
    )
    .await?;

    Ok(Html(
        template::submission_received(
            "Request received",
            "Thank you — your tax service request has been received. \
             We will contact you within one business day.",
        )
        .into_string(),
    )
    .into_response())
}

// ── Consent form ──────────────────────────────────────────────────────────────

pub async fn post_consent(
    State(state): State<AppState>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Result<Response, AppError> {
    let mut client_name = String::new();
    let mut client_email = String::new();
    let mut client_phone = None;
    let mut consent_date = String::new();
    let mut signature_type = "draw".to_string();
    let mut signature_data = None;
    let mut signature_photo_url = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(e.to_string()))?
    {
        let field_name = field.name().map(str::to_string);
        match field_name.as_deref() {
            Some("signature_photo") => {
                let Some(filename) = field.file_name().map(str::to_string) else {
                    continue;
                };
                if filename.is_empty() {
                    continue;
                }
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::BadRequest(e.to_string()))?;
                if data.is_empty() {
                    continue;
                }

                let Some(store) = &state.storage else {
                    tracing::warn!("Object storage not configured; cannot store signature photo");
                    continue;
                };

                let key = signature_key(&filename);
                let content_type = storage::content_type_for(&filename);
                store
                    .upload(SIGNATURES_BUCKET, &key, content_type, data.to_vec())
                    .await
                    .map_err(|e| {
                        tracing::error!("Signature upload failed: {:#}", e);
                        AppError::UpstreamUnavailable
                    })?;
                signature_photo_url = Some(key);
            }
            Some(other) => {
                let value = field
                    .text()
                    .await
                    .map_err(|e| AppError::BadRequest(e.to_string()))?;
                let value = value.trim().to_string();
                match other {
                    "client_name" => client_name = value,
                    "client_email" => client_email = value,
                    "client_phone" => client_phone = non_empty(value),
                    "consent_date" => consent_date = value,
                    "signature_type" => signature_type = value,
                    "signature_data" => signature_data = non_empty(value),
                    _ => {}
                }
            }
            None => {}
        }
    }

    if client_name.is_empty() || client_email.is_empty() || consent_date.is_empty() {
        return Err(AppError::BadRequest(
            "Name, email, and consent date are required".to_string(),
        ));
    }
    match signature_type.as_str() {
        "draw" if signature_data.is_none() => {
            return Err(AppError::BadRequest(
                "Please provide your signature by drawing".to_string(),
            ));
        }
        "upload" if signature_photo_url.is_none() => {
            return Err(AppError::BadRequest(
                "Please upload your signature photo".to_string(),
            ));
        }
        _ => {}
    }

    let ip_address = auth::client_ip(&headers);
    let user_agent = headers
        .get(header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    db::insert_consent(
        &state.db,
        NewClientConsent {
            client_name: &client_name,
            client_email: &client_email,
            client_phone: client_phone.as_deref(),
            consent_date: &consent_date,
            signature_data: if signature_type == "draw" {
                signature_data.as_deref()
            } else {
                None
            },
            signature_photo_url: if signature_type == "upload" {
                signature_photo_url.as_deref()
            } else {
                None
            },
            signature_type: &signature_type,
            ip_address: Some(&ip_address),
            user_agent: user_agent.as_deref(),
        },
    )
    .await?;

    Ok(Html(
        template::submission_received(
            "Consent recorded",
            "Thank you — your signed consent has been recorded. \
             A copy is kept on file with your tax records.",
        )
        .into_string(),
    )
    .into_response())
}

// ── Document proxy ────────────────────────────────────────────────────────────

/// Fallback delivery path for stored objects: streams the file from the
/// object store when signed-URL generation was unavailable at render time.
pub async fn get_document(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> Result<Response, AppError> {
    let Some(store) = &state.storage else {
        return Err(AppError::UpstreamUnavailable);
    };

    // Both buckets share this fallback path, so a key missing from the
    // documents bucket may still be a signature photo.
    let resp = match store.download(DOCUMENTS_BUCKET, &filename).await {
        Ok(resp) => resp,
        Err(AppError::NotFound) => store.download(SIGNATURES_BUCKET, &filename).await?,
        Err(e) => return Err(e),
    };
    let content_type = storage::content_type_for(&filename);
    let body = Body::from_stream(resp.bytes_stream());

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, content_type)
        .header(
            header::CONTENT_DISPOSITION,
            format!("inline; filename=\"{}\"", filename.replace('"', "")),
        )
        .header(header::CACHE_CONTROL, "private, max-age=3600")
        .body(body)
        .map_err(|e| AppError::Internal(e.to_string()))
}

// ── Helpers ───────────────────────────────────────────────────────────────────

fn non_empty(value: String) -> Option<String> {
    (!value.is_empty()).then_some(value)
}

/// Map the documents-ready answer to `(documents_ready, support_needed)`.
/// An absent or blank answer asserts neither flag.
fn readiness_flags(answer: Option<&str>) -> (bool, bool) {
    match answer {
        Some("yes") => (true, false),
        Some("no") => (false, true),
        _ => (false, false),
    }
}

fn file_ext(filename: &str) -> &str {
    std::path::Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("bin")
}

fn generated_key(filename: &str) -> String {
    format!(
        "{}-{}.{}",
        Utc::now().timestamp_millis(),
        random_suffix(),
        file_ext(filename)
    )
}

fn signature_key(filename: &str) -> String {
    format!(
        "signature_{}_{}.{}",
        Utc::now().timestamp_millis(),
        random_suffix(),
        file_ext(filename)
    )
}

fn random_suffix() -> String {
    use rand::RngCore;
    let mut bytes = [0u8; 4];
    rand::rng().fill_bytes(&mut bytes);
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_keys_keep_the_extension() {
        let key = generated_key("T4 slip.pdf");
        assert!(key.ends_with(".pdf"));
        let key = signature_key("sig.PNG");
        assert!(key.ends_with(".PNG") || key.ends_with(".png"));
        let key = generated_key("no-extension");
        assert!(key.ends_with(".bin"));
    }

    #[test]
    fn generated_keys_are_unique() {
        assert_ne!(generated_key("a.pdf"), generated_key("a.pdf"));
    }

    #[test]
    fn readiness_flags_assert_neither_when_unanswered() {
        assert_eq!(readiness_flags(Some("yes")), (true, false));
        assert_eq!(readiness_flags(Some("no")), (false, true));
        assert_eq!(readiness_flags(Some("maybe")), (false, false));
        assert_eq!(readiness_flags(None), (false, false));
    }
}
