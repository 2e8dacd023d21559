//! PostgreSQL connection pool.
//!
//! # Responsibilities
//! - Own the pooled connection to the subscriber database
//! - Apply pool bounds (open connections, idle reclaim, connection lifetime)
//! - Run parameterized writes for the signup service
//!
//! # Design Decisions
//! - The pool connects lazily; an unreachable database shows up on the first
//!   request and on `/health`, not at startup
//! - Errors are returned unmodified; unique violations (SQLSTATE 23505) are
//!   mapped to `StoreError::Conflict` at the store seam
//! - The password never appears in logs

use std::time::Duration;

use async_trait::async_trait;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use sqlx::PgPool;

use crate::config::DatabaseConfig;
use crate::storage::{StoreError, SubscriberStore};

const UNIQUE_VIOLATION: &str = "23505";

/// Idle timeout used when `max_idle_connections` is zero.
const IDLE_RECLAIM: Duration = Duration::from_secs(1);

/// Handle to the subscriber database.
#[derive(Debug, Clone)]
pub struct Database {
    pool: PgPool,
    config: DatabaseConfig,
}

impl Database {
    /// Build the pool from configuration. No connection is opened yet.
    pub fn new(config: DatabaseConfig) -> Self {
        let connect = PgConnectOptions::new()
            .host(&config.host)
            .port(config.port)
            .username(&config.user)
            .password(&config.password)
            .database(&config.name);

        let mut pool = PgPoolOptions::new()
            .max_connections(config.max_open_connections)
            .max_lifetime(config.connection_max_lifetime());
        if config.max_idle_connections == 0 {
            pool = pool.idle_timeout(IDLE_RECLAIM);
        }

        tracing::info!(
            host = %config.host,
            port = config.port,
            database = %config.name,
            max_open_connections = config.max_open_connections,
            max_idle_connections = config.max_idle_connections,
            connection_max_lifetime_secs = config.connection_max_lifetime_secs,
            "Database pool configured"
        );

        Self {
            pool: pool.connect_lazy_with(connect),
            config,
        }
    }

    /// Execute a parameterized statement, binding `args` positionally.
    ///
    /// Returns the number of rows affected.
    pub async fn execute(&self, query: &str, args: &[&str]) -> Result<u64, sqlx::Error> {
        let mut statement = sqlx::query(query);
        for arg in args {
            statement = statement.bind(*arg);
        }
        let result = statement.execute(&self.pool).await?;
        Ok(result.rows_affected())
    }

    /// Round-trip a trivial query.
    pub async fn ping(&self) -> Result<(), sqlx::Error> {
        sqlx::query("select 1").execute(&self.pool).await?;
        Ok(())
    }

    /// The configuration this handle was built from.
    pub fn config(&self) -> &DatabaseConfig {
        &self.config
    }

    /// Close all pooled connections.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[async_trait]
impl SubscriberStore for Database {
    async fn insert(&self, email: &str, token: &str) -> Result<(), StoreError> {
        let query = "insert into newsletter_subscribers (email, token) values ($1, $2)";
        match self.execute(query, &[email, token]).await {
            Ok(_) => Ok(()),
            Err(err) if is_unique_violation(&err) => Err(StoreError::Conflict),
            Err(err) => Err(StoreError::Database(err)),
        }
    }

    async fn refresh_token(&self, email: &str, token: &str) -> Result<(), StoreError> {
        let query = "update newsletter_subscribers set token = $2, updated = now() where email = $1";
        match self.execute(query, &[email, token]).await? {
            0 => Err(StoreError::Missing),
            _ => Ok(()),
        }
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Database::ping(self).await.map_err(StoreError::Database)
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err
            .code()
            .map(|code| code == UNIQUE_VIOLATION)
            .unwrap_or(false),
        _ => false,
    }
}
