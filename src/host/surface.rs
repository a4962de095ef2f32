//! Control surfaces
//!
//! A surface is a process-scoped handle owned by whoever renders the host:
//! it is initialized once, handed to the host for rendering and toasts, and
//! torn down after the control loop exits. Actions never see it.

use std::io::Write;
use std::path::Path;
use std::sync::Mutex;

use super::menu::MenuEntry;

pub trait ControlSurface: Send + Sync {
    /// Redraw the menu
    fn render(&self, menu: &[MenuEntry]);

    /// Show a transient notification
    fn toast(&self, title: &str, body: &str);

    /// Release the surface. Called once, after the host stops.
    fn teardown(&self) {}
}

/// Plain terminal surface: prints the menu and toasts to stdout
pub struct TerminalSurface {
    title: String,
    last_menu: Mutex<Vec<MenuEntry>>,
}

impl TerminalSurface {
    /// The terminal has no icon slot; a missing icon file is only noted
    pub fn init(title: &str, icon: &Path) -> Self {
        if !icon.exists() {
            tracing::debug!(icon = %icon.display(), "Icon not found, continuing without it");
        }

        Self {
            title: title.to_string(),
            last_menu: Mutex::new(Vec::new()),
        }
    }
}

impl ControlSurface for TerminalSurface {
    fn render(&self, menu: &[MenuEntry]) {
        let mut last = self
            .last_menu
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        // Refresh requests arrive after every event; only redraw on change
        if last.as_slice() == menu {
            return;
        }
        *last = menu.to_vec();

        let mut out = std::io::stdout().lock();
        let _ = writeln!(out, "[{}]", self.title);
        for entry in menu {
            let _ = match entry {
                MenuEntry::Separator => writeln!(out, "  ---"),
                MenuEntry::Status { label } => writeln!(out, "    {}", label),
                MenuEntry::Toggle { label } | MenuEntry::Exit { label } => {
                    writeln!(out, "  > {}", label)
                }
            };
        }
        let _ = out.flush();
    }

    fn toast(&self, title: &str, body: &str) {
        println!("[{}] {}: {}", self.title, title, body);
    }

    fn teardown(&self) {
        println!("[{}] bye", self.title);
    }
}
