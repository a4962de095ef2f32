//! Action status state machine
//!
//! Every action carries one [`ActionStatus`]. The host moves it between
//! `Stopped` and `Idle`; the action's own execution context drives the
//! per-event `Idle -> Processing -> {Success, Failure, Timeout} -> Idle` cycle.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::{Arc, RwLock};

use crate::error::StatusError;

/// Lifecycle state of an action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionStatus {
    /// Not running (initial state)
    #[default]
    Stopped,
    /// Running and waiting for work
    Idle,
    /// Working on one unit of work
    Processing,
    /// Last unit of work completed
    Success,
    /// Last unit of work failed
    Failure,
    /// Last unit of work ran out of time
    Timeout,
}

impl ActionStatus {
    pub fn label(self) -> &'static str {
        match self {
            ActionStatus::Stopped => "stopped",
            ActionStatus::Idle => "idle",
            ActionStatus::Processing => "processing",
            ActionStatus::Success => "success",
            ActionStatus::Failure => "failure",
            ActionStatus::Timeout => "timeout",
        }
    }

    /// Whether the unit of work that just ended left the action in an outcome state
    pub fn is_outcome(self) -> bool {
        matches!(
            self,
            ActionStatus::Success | ActionStatus::Failure | ActionStatus::Timeout
        )
    }

    /// Check whether `self -> next` is a legal edge.
    ///
    /// Stopping is legal from every non-Stopped state.
    pub fn can_transition_to(self, next: ActionStatus) -> bool {
        use ActionStatus::*;
        match (self, next) {
            (Stopped, Idle) => true,
            (Stopped, _) => false,
            (_, Stopped) => true,
            (Idle, Processing) => true,
            (Processing, Success | Failure | Timeout) => true,
            (from, Idle) => from.is_outcome(),
            _ => false,
        }
    }
}

impl fmt::Display for ActionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Shared, transition-checked status slot for one action.
///
/// The host holds one clone and the action's execution context another.
#[derive(Debug, Clone, Default)]
pub struct StatusCell {
    inner: Arc<RwLock<ActionStatus>>,
}

impl StatusCell {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self) -> ActionStatus {
        match self.inner.read() {
            Ok(status) => *status,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }

    /// Move to `next` if the edge is legal, leaving the value untouched otherwise
    pub fn transition(&self, next: ActionStatus) -> Result<ActionStatus, StatusError> {
        let mut status = self.inner.write().unwrap_or_else(|poisoned| {
            tracing::warn!("Status lock was poisoned, recovering...");
            poisoned.into_inner()
        });

        let current = *status;
        if !current.can_transition_to(next) {
            return Err(StatusError::InvalidTransition {
                from: current,
                to: next,
            });
        }

        *status = next;
        Ok(current)
    }

    /// Drive the action to Stopped. Returns the previous status.
    pub fn stop(&self) -> ActionStatus {
        let mut status = self
            .inner
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        std::mem::replace(&mut *status, ActionStatus::Stopped)
    }
}
