//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware, lifecycle)
//!     → request.rs (request ID, email validation)
//!     → handlers.rs (signup, thanks page, health)
//!     → storage::Newsletter
//! ```

pub mod handlers;
pub mod request;
pub mod server;

pub use handlers::AppState;
pub use request::{Email, EmailError, MakeRequestUuid, X_REQUEST_ID};
pub use server::{Server, ServerError, ServerOptions};
