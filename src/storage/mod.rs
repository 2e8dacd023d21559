//! Subscriber storage subsystem.
//!
//! # Data Flow
//! ```text
//! POST /newsletter/signup
//!     → newsletter.rs (token generation, insert-or-refresh)
//!     → SubscriberStore
//!         → database.rs (PostgreSQL pool)
//!         → memory.rs   (tests, local runs)
//! ```
//!
//! # Design Decisions
//! - The upsert is two store calls (insert, then refresh on conflict) so any
//!   store that can report a unique-key conflict can back the service
//! - Store errors travel to the caller unmodified; nothing here retries

use async_trait::async_trait;

pub mod database;
pub mod memory;
pub mod newsletter;

pub use database::Database;
pub use memory::MemoryStore;
pub use newsletter::{Newsletter, OsTokenSource, SignupError, Token, TokenSource};

/// Errors reported by a [`SubscriberStore`].
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A row with this email already exists.
    #[error("subscriber already exists")]
    Conflict,

    /// The refresh branch found no row for the email.
    #[error("no subscriber row for email")]
    Missing,

    /// Connectivity or constraint failure from the database.
    #[error(transparent)]
    Database(#[from] sqlx::Error),

    /// Failure from a non-database backend.
    #[error("{0}")]
    Backend(String),
}

/// The store operations the signup service needs.
#[async_trait]
pub trait SubscriberStore: Send + Sync {
    /// Insert a new subscriber. Fails with [`StoreError::Conflict`] if the
    /// email is already present.
    async fn insert(&self, email: &str, token: &str) -> Result<(), StoreError>;

    /// Replace the token of an existing subscriber and bump `updated`.
    /// Fails with [`StoreError::Missing`] if no row matched.
    async fn refresh_token(&self, email: &str, token: &str) -> Result<(), StoreError>;

    /// Check that the store is reachable.
    async fn ping(&self) -> Result<(), StoreError>;
}
