//! Newsletter signup service.
//!
//! An HTTP service with a single real job: sign an email up for the
//! newsletter, issuing a confirmation token and storing it against the email
//! in PostgreSQL.
//!
//! # Architecture Overview
//!
//! ```text
//!   SIGINT/SIGTERM ──▶ lifecycle::signals ──▶ CancellationToken
//!                                                   │
//!                                                   ▼
//!                                      lifecycle::Coordinator
//!                                        │ start()      │ stop()
//!                                        ▼              ▼
//!   Client ──▶ http::Server ──▶ handlers ──▶ storage::Newsletter ──▶ Database (sqlx pool)
//!
//!   Cross-cutting: config (TOML + env), observability (tracing, metrics)
//! ```

pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod storage;

pub use config::AppConfig;
pub use http::{Server, ServerOptions};
pub use lifecycle::Coordinator;
pub use storage::{Database, Newsletter};
