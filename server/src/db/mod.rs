//! Process-wide database handle.
//!
//! [`Database`] owns the single shared [`PgPool`] used by the service. The
//! connect-and-ping sequence runs at most once per `Database`, no matter how
//! many callers race on the first [`Database::connect`]; every caller
//! observes the same pool, or the same failure.

use std::error::Error as StdError;
use std::future::Future;
use std::sync::Arc;

use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::Connection;
use thiserror::Error;
use tokio::sync::OnceCell;
use tracing::{error, info};

use crate::config::DbConfig;

type BoxError = Arc<dyn StdError + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectStage {
    Dial,
    Ping,
    Timeout,
}

impl std::fmt::Display for ConnectStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConnectStage::Dial => f.write_str("failed to connect to database"),
            ConnectStage::Ping => f.write_str("failed to ping database"),
            ConnectStage::Timeout => f.write_str("timed out connecting to database"),
        }
    }
}

#[derive(Debug, Clone, Error)]
pub enum DbError {
    #[error("database connection failed: {stage}")]
    ConnectionFailed {
        stage: ConnectStage,
        #[source]
        source: BoxError,
    },
}

impl DbError {
    pub fn connection_failed<E>(stage: ConnectStage, source: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        DbError::ConnectionFailed {
            stage,
            source: Arc::new(source),
        }
    }
}

/// Lazily-initialised shared connection handle.
///
/// Generic over the handle so the one-time initialisation can be exercised
/// without a server; the service always uses the `PgPool` default.
pub struct Database<C = PgPool> {
    cell: Arc<OnceCell<Result<C, DbError>>>,
}

impl<C> Default for Database<C> {
    fn default() -> Self {
        Self {
            cell: Arc::new(OnceCell::new()),
        }
    }
}

impl<C> Database<C>
where
    C: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs `init` if, and only if, no caller has initialised this handle
    /// yet. Concurrent callers wait for the running initialiser and then see
    /// its outcome. Failures are cached like successes.
    ///
    /// The initialiser runs on its own task, so a caller that is cancelled
    /// mid-connect does not abandon the attempt; later callers pick up its
    /// outcome instead of dialing again.
    pub async fn connect_with<F, Fut>(&self, init: F) -> Result<C, DbError>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<C, DbError>> + Send + 'static,
    {
        if let Some(result) = self.cell.get() {
            return result.clone();
        }

        let cell = Arc::clone(&self.cell);
        let attempt = tokio::spawn(async move { cell.get_or_init(init).await.clone() });

        match attempt.await {
            Ok(result) => result,
            Err(e) => Err(DbError::connection_failed(ConnectStage::Dial, e)),
        }
    }

    /// Returns the established handle, if any. Never connects.
    pub fn get_conn(&self) -> Option<C> {
        self.cell.get().and_then(|result| result.as_ref().ok()).cloned()
    }
}

impl Database<PgPool> {
    pub async fn connect(&self, config: &DbConfig) -> Result<PgPool, DbError> {
        let config = config.clone();
        self.connect_with(move || async move { dial_and_ping(&config).await })
            .await
    }

    /// Closes the shared pool if one was established. Safe to call more than
    /// once.
    pub async fn close(&self) {
        if let Some(pool) = self.get_conn() {
            if !pool.is_closed() {
                pool.close().await;
                info!("Database connection closed");
            }
        }
    }
}

async fn dial_and_ping(config: &DbConfig) -> Result<PgPool, DbError> {
    let attempt = async {
        let mut options = PgPoolOptions::new().max_connections(config.max_connections);
        if !config.connect_timeout.is_zero() {
            options = options.acquire_timeout(config.connect_timeout);
        }

        let pool = options
            .connect(&config.url)
            .await
            .map_err(|e| DbError::connection_failed(ConnectStage::Dial, e))?;

        if let Err(e) = ping(&pool).await {
            pool.close().await;
            return Err(DbError::connection_failed(ConnectStage::Ping, e));
        }

        Ok(pool)
    };

    let result = if config.connect_timeout.is_zero() {
        attempt.await
    } else {
        match tokio::time::timeout(config.connect_timeout, attempt).await {
            Ok(result) => result,
            Err(elapsed) => Err(DbError::connection_failed(ConnectStage::Timeout, elapsed)),
        }
    };

    match &result {
        Ok(_) => info!(max_connections = config.max_connections, "Connected to database"),
        Err(e) => error!(error = %e, cause = ?e.source(), "Database connection failed"),
    }

    result
}

async fn ping(pool: &PgPool) -> Result<(), sqlx::Error> {
    let mut conn = pool.acquire().await?;
    conn.ping().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn protocol_error(message: &str) -> DbError {
        DbError::connection_failed(ConnectStage::Dial, sqlx::Error::Protocol(message.to_string()))
    }

    #[tokio::test]
    async fn test_get_conn_is_empty_before_connect() {
        let db: Database<u32> = Database::new();
        assert!(db.get_conn().is_none());
    }

    #[tokio::test]
    async fn test_concurrent_first_connect_runs_once() {
        let db: Arc<Database<u32>> = Arc::new(Database::new());
        let attempts = Arc::new(AtomicUsize::new(0));

        let tasks: Vec<_> = (0..16)
            .map(|_| {
                let db = Arc::clone(&db);
                let attempts = Arc::clone(&attempts);
                tokio::spawn(async move {
                    db.connect_with(|| async move {
                        attempts.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(20)).await;
                        Ok(42)
                    })
                    .await
                })
            })
            .collect();

        for task in tasks {
            assert_eq!(task.await.unwrap().unwrap(), 42);
        }
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
        assert_eq!(db.get_conn(), Some(42));
    }

    #[tokio::test]
    async fn test_later_callers_reuse_cached_connection() {
        let db: Database<u32> = Database::new();

        assert_eq!(db.connect_with(|| async { Ok(1) }).await.unwrap(), 1);
        assert_eq!(db.connect_with(|| async { Ok(2) }).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_failure_is_cached() {
        let db: Database<u32> = Database::new();
        let attempts = Arc::new(AtomicUsize::new(0));

        let first_attempts = Arc::clone(&attempts);
        let first = db
            .connect_with(move || async move {
                first_attempts.fetch_add(1, Ordering::SeqCst);
                Err(protocol_error("connection refused"))
            })
            .await;
        let second_attempts = Arc::clone(&attempts);
        let second = db
            .connect_with(move || async move {
                second_attempts.fetch_add(1, Ordering::SeqCst);
                Ok(7)
            })
            .await;

        assert!(matches!(
            first,
            Err(DbError::ConnectionFailed { stage: ConnectStage::Dial, .. })
        ));
        assert!(second.is_err());
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
        assert!(db.get_conn().is_none());
    }

    #[tokio::test]
    async fn test_cancelled_first_caller_does_not_dial_twice() {
        let db: Database<u32> = Database::new();
        let attempts = Arc::new(AtomicUsize::new(0));

        let first_attempts = Arc::clone(&attempts);
        let first = tokio::time::timeout(
            Duration::from_millis(20),
            db.connect_with(move || async move {
                first_attempts.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(200)).await;
                Ok(1)
            }),
        )
        .await;
        assert!(first.is_err(), "first caller should have given up");

        let second_attempts = Arc::clone(&attempts);
        let second = db
            .connect_with(move || async move {
                second_attempts.fetch_add(1, Ordering::SeqCst);
                Ok(2)
            })
            .await;

        assert_eq!(second.unwrap(), 1);
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
        assert_eq!(db.get_conn(), Some(1));
    }

    #[test]
    fn test_connection_error_keeps_cause() {
        let err = protocol_error("connection refused");
        assert_eq!(
            err.to_string(),
            "database connection failed: failed to connect to database"
        );
        assert!(err.source().unwrap().to_string().contains("connection refused"));
    }

    #[tokio::test]
    async fn test_unreachable_database_fails() {
        let db: Database = Database::new();
        let config = DbConfig {
            // Reserved TEST-NET address; nothing answers there.
            url: "postgres://postgres@192.0.2.1:5432/events".to_string(),
            connect_timeout: Duration::from_millis(200),
            max_connections: 1,
        };

        let err = db.connect(&config).await.unwrap_err();
        let DbError::ConnectionFailed { stage, .. } = err;
        assert!(matches!(stage, ConnectStage::Timeout | ConnectStage::Dial));
        assert!(db.get_conn().is_none());
    }

    #[tokio::test]
    async fn test_close_without_connection_is_noop() {
        let db: Database = Database::new();
        db.close().await;
        assert!(db.get_conn().is_none());
    }
}
