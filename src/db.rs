use anyhow::{Context, Result};
use sqlx::{Row, SqlitePool, sqlite::SqliteConnectOptions};
use std::{path::Path, str::FromStr};

#[derive(Debug, Clone)]
pub struct Contact {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub message: String,
    pub created_at: String,
}

#[derive(Debug, Clone)]
pub struct TaxRequest {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub province: Option<String>,
    pub tax_year: Option<String>,
    pub employment_status: Option<String>,
    pub documents_ready: bool,
    pub support_needed: bool,
    pub notes: Option<String>,
    /// Stored object keys (or, for older rows, full public URLs).
    pub uploaded_file_urls: Vec<String>,
    pub created_at: String,
}

#[derive(Debug, Clone)]
pub struct ClientConsent {
    pub id: i64,
    pub client_name: String,
    pub client_email: String,
    pub client_phone: Option<String>,
    pub consent_date: String,
    /// Data URL of a drawn signature, when `signature_type` is "draw".
    pub signature_data: Option<String>,
    /// Stored key of an uploaded signature photo, when "upload".
    pub signature_photo_url: Option<String>,
    pub signature_type: String,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub consent_type: String,
    pub created_at: String,
}

pub async fn init_pool(db_path: &Path) -> Result<SqlitePool> {
    let url = format!("sqlite:{}", db_path.display());
    let opts = SqliteConnectOptions::from_str(&url)
        .context("Invalid DB path")?
        .create_if_missing(true);

    let pool = SqlitePool::connect_with(opts)
        .await
        .context("Failed to open SQLite database")?;

    init_schema(&pool).await?;

    Ok(pool)
}

pub async fn init_schema(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS contacts (
            id         INTEGER PRIMARY KEY AUTOINCREMENT,
            name       TEXT    NOT NULL,
            email      TEXT    NOT NULL,
            phone      TEXT,
            message    TEXT    NOT NULL,
            created_at TEXT    NOT NULL DEFAULT (datetime('now'))
        )",
    )
    .execute(pool)
    .await
    .context("Failed to create contacts table")?;

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS tax_requests (
            id                 INTEGER PRIMARY KEY AUTOINCREMENT,
            name               TEXT    NOT NULL,
            email              TEXT    NOT NULL,
            phone              TEXT,
            province           TEXT,
            tax_year           TEXT,
            employment_status  TEXT,
            documents_ready    INTEGER NOT NULL DEFAULT 0,
            support_needed     INTEGER NOT NULL DEFAULT 0,
            notes              TEXT,
            uploaded_file_urls TEXT    NOT NULL DEFAULT '[]',
            created_at         TEXT    NOT NULL DEFAULT (datetime('now'))
        )",
    )
    .execute(pool)
    .await
    .context("Failed to create tax_requests table")?;

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS client_consents (
            id                  INTEGER PRIMARY KEY AUTOINCREMENT,
            client_name         TEXT    NOT NULL,
            client_email        TEXT    NOT NULL,
            client_phone        TEXT,
            consent_date        TEXT    NOT NULL,
            signature_data      TEXT,
            signature_photo_url TEXT,
            signature_type      TEXT    NOT NULL,
            ip_address          TEXT,
            user_agent          TEXT,
            consent_type        TEXT    NOT NULL DEFAULT 'tax_service_agreement',
            created_at          TEXT    NOT NULL DEFAULT (datetime('now'))
        )",
    )
    .execute(pool)
    .await
    .context("Failed to create client_consents table")?;

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS rate_limit_attempts (
            id           INTEGER PRIMARY KEY AUTOINCREMENT,
            action       TEXT    NOT NULL,
            identity     TEXT    NOT NULL,
            attempted_at TEXT    NOT NULL DEFAULT (datetime('now'))
        )",
    )
    .execute(pool)
    .await
    .context("Failed to create rate_limit_attempts table")?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_rate_limit_key \
         ON rate_limit_attempts(action, identity, attempted_at)",
    )
    .execute(pool)
    .await
    .context("Failed to create rate-limit index")?;

    Ok(())
}

// ── Contacts ──────────────────────────────────────────────────────────────────

pub async fn insert_contact(
    pool: &SqlitePool,
    name: &str,
    email: &str,
    phone: Option<&str>,
    message: &str,
) -> Result<()> {
    sqlx::query("INSERT INTO contacts (name, email, phone, message) VALUES (?, ?, ?, ?)")
        .bind(name)
        .bind(email)
        .bind(phone)
        .bind(message)
        .execute(pool)
        .await
        .context("Failed to insert contact")?;
    Ok(())
}

pub async fn list_contacts(pool: &SqlitePool) -> Result<Vec<Contact>> {
    let rows = sqlx::query(
        "SELECT id, name, email, phone, message, created_at \
         FROM contacts ORDER BY created_at DESC",
    )
    .fetch_all(pool)
    .await
    .context("Failed to list contacts")?;

    Ok(rows
        .into_iter()
        .map(|r| Contact {
            id: r.get("id"),
            name: r.get("name"),
            email: r.get("email"),
            phone: r.get("phone"),
            message: r.get("message"),
            created_at: r.get("created_at"),
        })
        .collect())
}

// ── Tax requests ──────────────────────────────────────────────────────────────

pub struct NewTaxRequest<'a> {
    pub name: &'a str,
    pub email: &'a str,
    pub phone: Option<&'a str>,
    pub province: Option<&'a str>,
    pub tax_year: Option<&'a str>,
    pub employment_status: Option<&'a str>,
    pub documents_ready: bool,
    pub support_needed: bool,
    pub notes: Option<&'a str>,
    pub uploaded_file_urls: &'a [String],
}

pub async fn insert_tax_request(pool: &SqlitePool, req: NewTaxRequest<'_>) -> Result<()> {
    let files_json =
        serde_json::to_string(req.uploaded_file_urls).context("Failed to encode file list")?;

    sqlx::query(
        "INSERT INTO tax_requests \
         (name, email, phone, province, tax_year, employment_status, \
          documents_ready, support_needed, notes, uploaded_file_urls) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(req.name)
    .bind(req.email)
    .bind(req.phone)
    .bind(req.province)
    .bind(req.tax_year)
    .bind(req.employment_status)
    .bind(req.documents_ready)
    .bind(req.support_needed)
    .bind(req.notes)
    .bind(files_json)
    .execute(pool)
    .await
    .context("Failed to insert tax request")?;
    Ok(())
}

pub async fn list_tax_requests(pool: &SqlitePool) -> Result<Vec<TaxRequest>> {
    let rows = sqlx::query(
        "SELECT id, name, email, phone, province, tax_year, employment_status, \
                documents_ready, support_needed, notes, uploaded_file_urls, created_at \
         FROM tax_requests ORDER BY created_at DESC",
    )
    .fetch_all(pool)
    .await
    .context("Failed to list tax requests")?;

    Ok(rows
        .into_iter()
        .map(|r| {
            let files_json: String = r.get("uploaded_file_urls");
            let uploaded_file_urls = serde_json::from_str(&files_json).unwrap_or_else(|e| {
                tracing::warn!("Unparseable file list on tax request: {}", e);
                Vec::new()
            });

            TaxRequest {
                id: r.get("id"),
                name: r.get("name"),
                email: r.get("email"),
                phone: r.get("phone"),
                province: r.get("province"),
                tax_year: r.get("tax_year"),
                employment_status: r.get("employment_status"),
                documents_ready: r.get("documents_ready"),
                support_needed: r.get("support_needed"),
                notes: r.get("notes"),
                uploaded_file_urls,
                created_at: r.get("created_at"),
            }
        })
        .collect())
}

// ── Client consents ───────────────────────────────────────────────────────────

pub struct NewClientConsent<'a> {
    pub client_name: &'a str,
    pub client_email: &'a str,
    pub client_phone: Option<&'a str>,
    pub consent_date: &'a str,
    pub signature_data: Option<&'a str>,
    pub signature_photo_url: Option<&'a str>,
    pub signature_type: &'a str,
    pub ip_address: Option<&'a str>,
    pub user_agent: Option<&'a str>,
}

pub async fn insert_consent(pool: &SqlitePool, consent: NewClientConsent<'_>) -> Result<()> {
    sqlx::query(
        "INSERT INTO client_consents \
         (client_name, client_email, client_phone, consent_date, signature_data, \
          signature_photo_url, signature_type, ip_address, user_agent) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(consent.client_name)
    .bind(consent.client_email)
    .bind(consent.client_phone)
    .bind(consent.consent_date)
    .bind(consent.signature_data)
    .bind(consent.signature_photo_url)
    .bind(consent.signature_type)
    .bind(consent.ip_address)
    .bind(consent.user_agent)
    .execute(pool)
    .await
    .context("Failed to insert consent")?;
    Ok(())
}

pub async fn list_consents(pool: &SqlitePool) -> Result<Vec<ClientConsent>> {
    let rows = sqlx::query(
        "SELECT id, client_name, client_email, client_phone, consent_date, signature_data, \
                signature_photo_url, signature_type, ip_address, user_agent, consent_type, \
                created_at \
         FROM client_consents ORDER BY created_at DESC",
    )
    .fetch_all(pool)
    .await
    .context("Failed to list consents")?;

    Ok(rows.into_iter().map(consent_from_row).collect())
}

pub async fn get_consent(pool: &SqlitePool, id: i64) -> Result<Option<ClientConsent>> {
    let row = sqlx::query(
        "SELECT id, client_name, client_email, client_phone, consent_date, signature_data, \
                signature_photo_url, signature_type, ip_address, user_agent, consent_type, \
                created_at \
         FROM client_consents WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(pool)
    .await
    .context("Failed to fetch consent")?;

    Ok(row.map(consent_from_row))
}

fn consent_from_row(r: sqlx::sqlite::SqliteRow) -> ClientConsent {
    ClientConsent {
        id: r.get("id"),
        client_name: r.get("client_name"),
        client_email: r.get("client_email"),
        client_phone: r.get("client_phone"),
        consent_date: r.get("consent_date"),
        signature_data: r.get("signature_data"),
        signature_photo_url: r.get("signature_photo_url"),
        signature_type: r.get("signature_type"),
        ip_address: r.get("ip_address"),
        user_agent: r.get("user_agent"),
        consent_type: r.get("consent_type"),
        created_at: r.get("created_at"),
    }
}
