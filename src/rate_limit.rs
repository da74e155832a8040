use sqlx::SqlitePool;
use std::{
    collections::HashMap,
    sync::Mutex,
    time::{Duration, Instant},
};

/// Throttled request categories, each with its own sliding-window policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    /// Admin login attempts: 5 per rolling 10 minutes per identity.
    Login,
    /// Contact form submissions: 5 per rolling minute per identity.
    Contact,
}

impl Action {
    pub fn max_attempts(self) -> usize {
        5
    }

    pub fn window(self) -> Duration {
        match self {
            Action::Login => Duration::from_secs(600),
            Action::Contact => Duration::from_secs(60),
        }
    }

    fn key(self) -> &'static str {
        match self {
            Action::Login => "login",
            Action::Contact => "contact",
        }
    }
}

/// Sliding-window rate limiter keyed by `(action, client identity)`.
///
/// Every call to [`RateLimiter::admit`] records an attempt — admitted or
/// not — so retry storms cannot reset the window.
pub enum RateLimiter {
    /// Counters in the shared service database, visible to all instances.
    Db { pool: SqlitePool, fail_open: bool },
    /// In-process windows. Used by tests and single-instance deployments.
    Memory {
        windows: Mutex<HashMap<(Action, String), Vec<Instant>>>,
    },
    /// Limiting explicitly disabled; every request is admitted.
    Disabled,
}

impl RateLimiter {
    pub fn db(pool: SqlitePool, fail_open: bool) -> Self {
        RateLimiter::Db { pool, fail_open }
    }

    pub fn memory() -> Self {
        RateLimiter::Memory {
            windows: Mutex::new(HashMap::new()),
        }
    }

    pub fn disabled() -> Self {
        RateLimiter::Disabled
    }

    /// Record an attempt for `(action, identity)` and return whether it is
    /// within policy. Counter-store errors are logged and resolved by the
    /// configured `fail_open` policy, uniformly across actions.
    pub async fn admit(&self, action: Action, identity: &str) -> bool {
        match self {
            RateLimiter::Db { pool, fail_open } => {
                match admit_db(pool, action, identity).await {
                    Ok(allowed) => allowed,
                    Err(e) => {
                        tracing::error!("Rate-limit counter store error: {:#}", e);
                        *fail_open
                    }
                }
            }
            RateLimiter::Memory { windows } => {
                let mut windows = windows.lock().expect("rate-limit lock poisoned");
                let attempts = windows
                    .entry((action, identity.to_string()))
                    .or_default();
                window_allows(attempts, Instant::now(), action.window(), action.max_attempts())
            }
            RateLimiter::Disabled => true,
        }
    }
}

/// Record `now` in `attempts`, drop entries older than `window`, and return
/// whether the count is within `max`.
fn window_allows(
    attempts: &mut Vec<Instant>,
    now: Instant,
    window: Duration,
    max: usize,
) -> bool {
    attempts.push(now);
    attempts.retain(|t| now.duration_since(*t) < window);
    attempts.len() <= max
}

async fn admit_db(pool: &SqlitePool, action: Action, identity: &str) -> anyhow::Result<bool> {
    let window_offset = format!("-{} seconds", action.window().as_secs());

    // Record first so denied attempts still count toward the window.
    sqlx::query("INSERT INTO rate_limit_attempts (action, identity) VALUES (?, ?)")
        .bind(action.key())
        .bind(identity)
        .execute(pool)
        .await?;

    // Expired rows no longer count either way; deleting them just keeps the
    // table bounded.
    sqlx::query(
        "DELETE FROM rate_limit_attempts \
         WHERE action = ? AND identity = ? AND attempted_at < datetime('now', ?)",
    )
    .bind(action.key())
    .bind(identity)
    .bind(&window_offset)
    .execute(pool)
    .await?;

    let count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM rate_limit_attempts \
         WHERE action = ? AND identity = ? AND attempted_at >= datetime('now', ?)",
    )
    .bind(action.key())
    .bind(identity)
    .bind(&window_offset)
    .fetch_one(pool)
    .await?;

    Ok(count as usize <= action.max_attempts())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_admits_up_to_max() {
        let mut attempts = Vec::new();
        let now = Instant::now();
        let window = Duration::from_secs(600);

        for _ in 0..5 {
            assert!(window_allows(&mut attempts, now, window, 5));
        }
        assert!(!window_allows(&mut attempts, now, window, 5));
        // Denial is idempotent: the 7th attempt is also denied.
        assert!(!window_allows(&mut attempts, now, window, 5));
    }

    #[test]
    fn window_expires_by_time() {
        let window = Duration::from_secs(600);
        let then = Instant::now();
        let mut attempts = vec![then; 5];

        // Well past the window, old attempts no longer count.
        let later = then + window + Duration::from_secs(1);
        assert!(window_allows(&mut attempts, later, window, 5));
        assert_eq!(attempts.len(), 1);
    }

    #[tokio::test]
    async fn memory_limiter_isolates_identities() {
        let limiter = RateLimiter::memory();

        for _ in 0..5 {
            assert!(limiter.admit(Action::Login, "10.0.0.1").await);
        }
        assert!(!limiter.admit(Action::Login, "10.0.0.1").await);

        // A different identity is unaffected.
        assert!(limiter.admit(Action::Login, "10.0.0.2").await);
    }

    #[tokio::test]
    async fn memory_limiter_isolates_actions() {
        let limiter = RateLimiter::memory();

        for _ in 0..5 {
            assert!(limiter.admit(Action::Contact, "10.0.0.1").await);
        }
        assert!(!limiter.admit(Action::Contact, "10.0.0.1").await);

        // The login window for the same identity is separate.
        assert!(limiter.admit(Action::Login, "10.0.0.1").await);
    }

    #[tokio::test]
    async fn disabled_limiter_admits_everything() {
        let limiter = RateLimiter::disabled();
        for _ in 0..20 {
            assert!(limiter.admit(Action::Login, "10.0.0.1").await);
        }
    }

    async fn test_pool() -> SqlitePool {
        let pool = sqlx::sqlite::SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        crate::db::init_schema(&pool).await.unwrap();
        pool
    }

    #[tokio::test]
    async fn db_limiter_admits_up_to_max_then_denies() {
        let limiter = RateLimiter::db(test_pool().await, false);

        for _ in 0..5 {
            assert!(limiter.admit(Action::Login, "10.0.0.1").await);
        }
        assert!(!limiter.admit(Action::Login, "10.0.0.1").await);
        // Denied attempts are recorded too, so the window does not reset.
        assert!(!limiter.admit(Action::Login, "10.0.0.1").await);
    }

    #[tokio::test]
    async fn db_limiter_isolates_identities_and_actions() {
        let limiter = RateLimiter::db(test_pool().await, false);

        for _ in 0..6 {
            limiter.admit(Action::Contact, "10.0.0.1").await;
        }
        assert!(!limiter.admit(Action::Contact, "10.0.0.1").await);

        assert!(limiter.admit(Action::Contact, "10.0.0.2").await);
        assert!(limiter.admit(Action::Login, "10.0.0.1").await);
    }

    #[tokio::test]
    async fn db_limiter_applies_fail_open_policy_on_store_errors() {
        let pool = test_pool().await;
        let fail_open = RateLimiter::db(pool.clone(), true);
        let fail_closed = RateLimiter::db(pool.clone(), false);

        // A closed pool stands in for an unreachable counter store.
        pool.close().await;

        assert!(fail_open.admit(Action::Login, "10.0.0.1").await);
        assert!(!fail_closed.admit(Action::Login, "10.0.0.1").await);
    }
}
