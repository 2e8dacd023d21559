//! Server lifecycle state machine.
//!
//! # States
//! - Idle: created, not started
//! - Starting: acquiring the listening socket
//! - Running: serving requests
//! - Stopping: draining in-flight requests
//! - Stopped: shut down cleanly
//! - Failed: startup, serving or shutdown failed
//!
//! # State Transitions
//! ```text
//! Idle     → Starting | Stopped (stop before start)
//! Starting → Running | Stopping | Failed
//! Running  → Stopping | Stopped (serving loop exited on its own) | Failed
//! Stopping → Stopped | Failed
//! ```
//!
//! # Design Decisions
//! - State lives in a watch channel so observers can await transitions
//! - Every transition is a compare-and-set against the allowed table

use std::fmt;

use tokio::sync::watch;

/// Observable phase of the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LifecycleState {
    Idle,
    Starting,
    Running,
    Stopping,
    Stopped,
    Failed,
}

impl LifecycleState {
    /// Whether `self → next` is a legal transition.
    pub fn can_transition_to(self, next: LifecycleState) -> bool {
        use LifecycleState::*;
        matches!(
            (self, next),
            (Idle, Starting)
                | (Idle, Stopped)
                | (Starting, Running)
                | (Starting, Stopping)
                | (Starting, Failed)
                | (Running, Stopping)
                | (Running, Stopped)
                | (Running, Failed)
                | (Stopping, Stopped)
                | (Stopping, Failed)
        )
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LifecycleState::Idle => "idle",
            LifecycleState::Starting => "starting",
            LifecycleState::Running => "running",
            LifecycleState::Stopping => "stopping",
            LifecycleState::Stopped => "stopped",
            LifecycleState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Rejected transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("cannot move from {from} to {to}")]
pub struct TransitionError {
    pub from: LifecycleState,
    pub to: LifecycleState,
}

/// Shared, observable lifecycle state.
#[derive(Debug)]
pub struct Lifecycle {
    tx: watch::Sender<LifecycleState>,
}

impl Lifecycle {
    /// Create a lifecycle in `Idle`.
    pub fn new() -> Self {
        let (tx, _) = watch::channel(LifecycleState::Idle);
        Self { tx }
    }

    /// Current state.
    pub fn current(&self) -> LifecycleState {
        *self.tx.borrow()
    }

    /// Watch state changes.
    pub fn subscribe(&self) -> watch::Receiver<LifecycleState> {
        self.tx.subscribe()
    }

    /// Move to `next` from whatever the current state is, if allowed.
    ///
    /// Returns the state that was replaced.
    pub fn advance(&self, next: LifecycleState) -> Result<LifecycleState, TransitionError> {
        self.transition(|_| true, next)
    }

    /// Move to `next` only if the current state is `expected`.
    pub fn advance_from(&self, expected: LifecycleState, next: LifecycleState) -> bool {
        self.transition(|current| current == expected, next).is_ok()
    }

    fn transition<F>(&self, guard: F, next: LifecycleState) -> Result<LifecycleState, TransitionError>
    where
        F: FnOnce(LifecycleState) -> bool,
    {
        let mut outcome = Err(TransitionError {
            from: self.current(),
            to: next,
        });
        self.tx.send_if_modified(|state| {
            let from = *state;
            if guard(from) && from.can_transition_to(next) {
                *state = next;
                outcome = Ok(from);
                true
            } else {
                outcome = Err(TransitionError { from, to: next });
                false
            }
        });

        if let Ok(from) = outcome {
            tracing::debug!(from = %from, to = %next, "Lifecycle transition");
        }
        outcome
    }
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self::new()
    }
}
