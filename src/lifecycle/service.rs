//! The start/stop contract the coordinator drives.

use async_trait::async_trait;

/// A long-running service with an explicit start and graceful stop.
#[async_trait]
pub trait Service: Send + Sync {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Acquire resources and serve until stopped. Returns early with an error
    /// if startup fails.
    async fn start(&self) -> Result<(), Self::Error>;

    /// Trigger graceful shutdown and wait for it to finish. Calling this more
    /// than once must be safe.
    async fn stop(&self) -> Result<(), Self::Error>;
}
