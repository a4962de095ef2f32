//! Message routing between actions, the log and the control surface.

use std::sync::Arc;
use tokio::sync::mpsc;

use super::surface::ControlSurface;
use super::HostCommand;

pub const TITLE_INFO: &str = "info";
pub const TITLE_WARNING: &str = "warning";
pub const TITLE_ERROR: &str = "error";

/// Severity implied by a message title
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Warning,
    Error,
}

impl Severity {
    pub fn from_title(title: &str) -> Self {
        match title.trim().to_lowercase().as_str() {
            "warning" | "warn" | "警告" => Severity::Warning,
            "error" | "err" | "错误" => Severity::Error,
            _ => Severity::Info,
        }
    }
}

/// The narrow capability an action gets from its host
pub trait MessageSink: Send + Sync {
    /// Surface a message; the title selects the severity
    fn report(&self, title: &str, body: &str);

    /// Ask the host to re-render its control surface
    fn request_refresh(&self);
}

/// Host-side sink: logs every message and toasts it when notifications are on
pub struct HostReporter {
    notify: bool,
    surface: Arc<dyn ControlSurface>,
    commands: mpsc::UnboundedSender<HostCommand>,
}

impl HostReporter {
    pub fn new(
        notify: bool,
        surface: Arc<dyn ControlSurface>,
        commands: mpsc::UnboundedSender<HostCommand>,
    ) -> Self {
        Self {
            notify,
            surface,
            commands,
        }
    }
}

impl MessageSink for HostReporter {
    fn report(&self, title: &str, body: &str) {
        match Severity::from_title(title) {
            Severity::Error => tracing::error!(title, "{}", body),
            Severity::Warning => tracing::warn!(title, "{}", body),
            Severity::Info => tracing::info!(title, "{}", body),
        }

        if self.notify {
            self.surface.toast(title, body);
        }
    }

    fn request_refresh(&self) {
        // Closed channel means the control loop already exited
        let _ = self.commands.send(HostCommand::Refresh);
    }
}
