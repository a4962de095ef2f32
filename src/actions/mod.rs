//! Actions
//!
//! An action is a named unit of background work. Implementations provide the
//! business logic only: `activate` runs on the action's own execution context
//! until `deactivate` is called from the host. The host performs the
//! Stopped/Idle transitions and lifecycle reporting around those calls.

pub mod archive_mover;
pub mod status;

use std::sync::Arc;

use crate::error::ActionError;
use crate::host::messages::{MessageSink, TITLE_ERROR, TITLE_INFO, TITLE_WARNING};
use status::{ActionStatus, StatusCell};

pub use archive_mover::ArchiveMoverAction;

pub trait Action: Send + Sync {
    /// Unique name within a host
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    /// Run until deactivated. Blocking is fine: this runs on a dedicated
    /// execution context.
    fn activate(&self, ctx: &ActionContext) -> Result<(), ActionError>;

    /// Ask a running `activate` to return. Must not wait for in-flight work.
    fn deactivate(&self) -> Result<(), ActionError>;
}

/// What a running action may touch: its own status and the host's message sink
#[derive(Clone)]
pub struct ActionContext {
    name: String,
    status: StatusCell,
    sink: Arc<dyn MessageSink>,
}

impl ActionContext {
    pub fn new(name: &str, status: StatusCell, sink: Arc<dyn MessageSink>) -> Self {
        Self {
            name: name.to_string(),
            status,
            sink,
        }
    }

    pub fn status(&self) -> ActionStatus {
        self.status.get()
    }

    pub fn report(&self, title: &str, body: &str) {
        self.sink.report(title, body);
    }

    pub fn info(&self, body: &str) {
        self.report(TITLE_INFO, body);
    }

    pub fn warn(&self, body: &str) {
        self.report(TITLE_WARNING, body);
    }

    pub fn error(&self, body: &str) {
        self.report(TITLE_ERROR, body);
    }

    pub fn request_refresh(&self) {
        self.sink.request_refresh();
    }

    /// Idle -> Processing
    pub fn begin_work(&self) {
        self.set_status(ActionStatus::Processing);
    }

    /// Processing -> outcome -> Idle, then refresh the host display
    pub fn finish_work(&self, outcome: ActionStatus) {
        if self.set_status(outcome) {
            self.set_status(ActionStatus::Idle);
        }
        self.request_refresh();
    }

    /// Apply a transition. A rejected transition usually means the host
    /// stopped the action while this unit of work was still running.
    fn set_status(&self, next: ActionStatus) -> bool {
        match self.status.transition(next) {
            Ok(_) => true,
            Err(e) => {
                tracing::debug!(action = %self.name, "{}", e);
                false
            }
        }
    }
}
