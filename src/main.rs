use anyhow::Context;
use base64ct::{Base64, Encoding};
use clap::Parser;
use std::{path::PathBuf, sync::Arc};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use tax_intake::{app, auth, db, rate_limit::RateLimiter, state::AppState, storage::Storage};

#[derive(Parser, Debug)]
#[command(
    name = "tax-intake",
    about = "Marketing site and client intake for a tax preparation practice"
)]
struct Args {
    /// Port to listen on
    #[arg(short, long, env = "PORT", default_value = "3000")]
    port: u16,

    /// Host address to bind to
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    host: String,

    /// Path to the SQLite database file
    #[arg(long, env = "DATABASE_PATH", default_value = "intake.db")]
    database: PathBuf,

    /// Base64-encoded Argon2 PHC hash of the admin password.
    /// If unset or invalid, admin login is disabled (fails closed).
    #[arg(long, env = "ADMIN_PASSWORD_HASH_B64")]
    admin_password_hash_b64: Option<String>,

    /// Object store endpoint including its API prefix,
    /// e.g. "https://xyz.supabase.co/storage/v1"
    #[arg(long, env = "STORAGE_URL")]
    storage_url: Option<String>,

    /// Service-role key for the object store
    #[arg(long, env = "STORAGE_SERVICE_KEY")]
    storage_service_key: Option<String>,

    /// Mark session cookies Secure (set in production behind TLS)
    #[arg(long, env = "SECURE_COOKIES")]
    secure_cookies: bool,

    /// Disable request rate limiting entirely
    #[arg(long, env = "RATE_LIMIT_DISABLED")]
    rate_limit_disabled: bool,

    /// Admit requests when the rate-limit counter store errors.
    /// Applied uniformly to login and contact throttling.
    #[arg(long, env = "RATE_LIMIT_FAIL_OPEN")]
    rate_limit_fail_open: bool,

    /// Hash PASSWORD for ADMIN_PASSWORD_HASH_B64, print it, and exit
    #[arg(long, value_name = "PASSWORD")]
    hash_password: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tax_intake=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load .env file if present (silently ignored if absent).
    dotenvy::dotenv().ok();

    let args = Args::parse();

    if let Some(password) = args.hash_password {
        let phc = auth::hash_password(&password)?;
        println!("{}", Base64::encode_string(phc.as_bytes()));
        return Ok(());
    }

    let pool = db::init_pool(&args.database).await?;

    let credential = match args.admin_password_hash_b64.as_deref() {
        Some(encoded) => match auth::AdminCredential::from_base64(encoded) {
            Ok(credential) => {
                tracing::info!("Admin dashboard enabled at /admin");
                Some(credential)
            }
            Err(e) => {
                // Never echo the configured value; the decode error is enough.
                tracing::error!("Invalid ADMIN_PASSWORD_HASH_B64 ({e}); admin login disabled");
                None
            }
        },
        None => {
            tracing::warn!("ADMIN_PASSWORD_HASH_B64 not set; admin login disabled");
            None
        }
    };

    let storage = match (args.storage_url.as_deref(), args.storage_service_key) {
        (Some(url), Some(key)) => {
            tracing::info!("Object storage configured at {url}");
            Some(Storage::new(url, key))
        }
        _ => {
            tracing::warn!(
                "Object storage not configured; uploads disabled, file links use the proxy route"
            );
            None
        }
    };

    let limiter = if args.rate_limit_disabled {
        tracing::warn!("Rate limiting disabled; all requests admitted");
        RateLimiter::disabled()
    } else {
        RateLimiter::db(pool.clone(), args.rate_limit_fail_open)
    };

    let state = AppState {
        db: pool,
        limiter: Arc::new(limiter),
        credential,
        storage,
        secure_cookies: args.secure_cookies,
    };

    let addr = format!("{}:{}", args.host, args.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Cannot bind to {addr}"))?;

    tracing::info!("Listening on http://{addr}");
    axum::serve(listener, app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    Ok(())
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};
        let mut sigterm =
            signal(SignalKind::terminate()).expect("failed to register SIGTERM handler");
        tokio::select! {
            result = tokio::signal::ctrl_c() => {
                if let Err(e) = result { tracing::error!("ctrl-c error: {}", e); }
            }
            _ = sigterm.recv() => {
                tracing::info!("Received SIGTERM");
            }
        }
    }
    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await.ok();
    }
    tracing::info!("Shutting down gracefully");
}
