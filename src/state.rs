use sqlx::SqlitePool;
use std::sync::Arc;

use crate::{auth::AdminCredential, rate_limit::RateLimiter, storage::Storage};

#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    /// Admission control for login attempts and contact submissions.
    pub limiter: Arc<RateLimiter>,
    /// `None` when no (valid) admin password hash is configured — login
    /// then fails closed with a generic error.
    pub credential: Option<AdminCredential>,
    /// `None` when object storage is unconfigured: uploads are skipped and
    /// file links always take the proxy-download fallback.
    pub storage: Option<Storage>,
    /// Mark session cookies `Secure` (production behind TLS).
    pub secure_cookies: bool,
}
