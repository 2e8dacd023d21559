//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → cancel the process-wide shutdown token
//!
//! Coordinator (coordinator.rs):
//!     start() ─────────────┐
//!     token cancelled → stop() ─┴→ aggregated result → exit code
//!
//! State (state.rs):
//!     Idle → Starting → Running → Stopping → Stopped (or Failed)
//! ```
//!
//! # Design Decisions
//! - The shutdown token is created once in main and handed only to the
//!   coordinator
//! - Shutdown has a bounded grace period; stop fails if it elapses
//! - Stop is idempotent; repeated signals never re-run shutdown

pub mod coordinator;
pub mod service;
pub mod signals;
pub mod state;

pub use coordinator::{exit_code, Coordinator, LifecycleError, EXIT_FAILURE, EXIT_SUCCESS};
pub use service::Service;
pub use state::{Lifecycle, LifecycleState, TransitionError};
