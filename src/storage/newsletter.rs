//! Newsletter signup.
//!
//! # Responsibilities
//! - Generate a confirmation token from the OS random source
//! - Insert the subscriber, or refresh the token of an existing one
//!
//! # Design Decisions
//! - Token is 32 random bytes, lowercase hex (64 characters)
//! - Randomness failure aborts before any write
//! - A second signup for the same email supersedes the first token

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use rand::rngs::OsRng;
use rand::RngCore;

use crate::observability::metrics;
use crate::storage::{StoreError, SubscriberStore};

/// Number of random bytes behind a token.
pub const TOKEN_BYTES: usize = 32;

/// Source of token bytes.
pub trait TokenSource: Send + Sync {
    fn fill(&self, dest: &mut [u8]) -> Result<(), rand::Error>;
}

/// Cryptographically secure source backed by the operating system.
#[derive(Debug, Clone, Copy, Default)]
pub struct OsTokenSource;

impl TokenSource for OsTokenSource {
    fn fill(&self, dest: &mut [u8]) -> Result<(), rand::Error> {
        OsRng.try_fill_bytes(dest)
    }
}

/// Confirmation token handed out on signup.
#[derive(Clone, PartialEq, Eq)]
pub struct Token(String);

impl Token {
    fn from_bytes(bytes: &[u8]) -> Self {
        Self(bytes.iter().map(|b| format!("{:02x}", b)).collect())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// Tokens grant confirmation rights; keep them out of debug output.
impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Token(..)")
    }
}

/// Signup failures.
#[derive(Debug, thiserror::Error)]
pub enum SignupError {
    #[error("failed to read random bytes for token: {0}")]
    Randomness(#[source] rand::Error),

    #[error("failed to store subscriber: {0}")]
    Store(#[from] StoreError),
}

impl SignupError {
    fn outcome(&self) -> &'static str {
        match self {
            SignupError::Randomness(_) => "randomness_error",
            SignupError::Store(_) => "store_error",
        }
    }
}

/// Signup service over a subscriber store.
#[derive(Clone)]
pub struct Newsletter {
    store: Arc<dyn SubscriberStore>,
    tokens: Arc<dyn TokenSource>,
}

impl Newsletter {
    /// Create a service drawing tokens from the OS random source.
    pub fn new(store: Arc<dyn SubscriberStore>) -> Self {
        Self::with_token_source(store, Arc::new(OsTokenSource))
    }

    pub fn with_token_source(store: Arc<dyn SubscriberStore>, tokens: Arc<dyn TokenSource>) -> Self {
        Self { store, tokens }
    }

    /// Sign `email` up and return its confirmation token.
    ///
    /// Inserts a new subscriber; if the email already exists, its token and
    /// `updated` timestamp are replaced instead. On error no token is returned
    /// and the caller must assume nothing was written.
    pub async fn signup(&self, email: &str) -> Result<Token, SignupError> {
        let start = Instant::now();
        let result = self.upsert(email).await;

        match &result {
            Ok(_) => {
                tracing::debug!("Subscriber signed up");
                metrics::record_signup("ok", start);
            }
            Err(err) => {
                tracing::warn!(error = %err, "Signup failed");
                metrics::record_signup(err.outcome(), start);
            }
        }
        result
    }

    /// Check the backing store.
    pub async fn ping(&self) -> Result<(), StoreError> {
        self.store.ping().await
    }

    async fn upsert(&self, email: &str) -> Result<Token, SignupError> {
        let token = self.create_token()?;

        match self.store.insert(email, token.as_str()).await {
            Ok(()) => Ok(token),
            Err(StoreError::Conflict) => {
                tracing::debug!("Subscriber exists, refreshing token");
                self.store.refresh_token(email, token.as_str()).await?;
                Ok(token)
            }
            Err(err) => Err(err.into()),
        }
    }

    fn create_token(&self) -> Result<Token, SignupError> {
        let mut secret = [0u8; TOKEN_BYTES];
        self.tokens
            .fill(&mut secret)
            .map_err(SignupError::Randomness)?;
        Ok(Token::from_bytes(&secret))
    }
}
