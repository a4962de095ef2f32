//! Display projection of the host state.
//!
//! The menu is recomputed from a status snapshot on demand and holds no state
//! of its own. Labels round-trip through [`parse_command`] so a control
//! surface can send back whatever entry the user picked.

use serde::Serialize;

use super::{HostCommand, StatusEntry};
use crate::actions::status::ActionStatus;

pub const EXIT_LABEL: &str = "exit";
const NO_ACTIONS_LABEL: &str = "no actions";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MenuEntry {
    /// Start or stop one action
    Toggle { label: String },
    /// Read-only status line
    Status { label: String },
    Separator,
    Exit { label: String },
}

impl MenuEntry {
    pub fn label(&self) -> &str {
        match self {
            MenuEntry::Toggle { label }
            | MenuEntry::Status { label }
            | MenuEntry::Exit { label } => label,
            MenuEntry::Separator => "---",
        }
    }
}

/// Build the ordered menu for a status snapshot
pub fn menu_projection(snapshot: &[StatusEntry]) -> Vec<MenuEntry> {
    let mut entries: Vec<MenuEntry> = snapshot
        .iter()
        .map(|entry| {
            let verb = if entry.status == ActionStatus::Stopped {
                "start"
            } else {
                "stop"
            };
            MenuEntry::Toggle {
                label: format!("{} {}", verb, entry.name),
            }
        })
        .collect();

    entries.push(MenuEntry::Separator);

    if snapshot.is_empty() {
        entries.push(MenuEntry::Status {
            label: NO_ACTIONS_LABEL.to_string(),
        });
    } else {
        entries.extend(snapshot.iter().map(|entry| MenuEntry::Status {
            label: format!("{}: {}", entry.name, entry.status),
        }));
    }

    entries.push(MenuEntry::Separator);
    entries.push(MenuEntry::Exit {
        label: EXIT_LABEL.to_string(),
    });

    entries
}

/// Map a menu label (or a typed command) back to a host command
pub fn parse_command(line: &str) -> Option<HostCommand> {
    let line = line.trim();
    let (verb, rest) = match line.split_once(char::is_whitespace) {
        Some((verb, rest)) => (verb, Some(rest.trim()).filter(|r| !r.is_empty())),
        None => (line, None),
    };
    let name = rest.map(str::to_string);

    match verb.to_lowercase().as_str() {
        "start" => Some(HostCommand::Start(name)),
        "stop" => Some(HostCommand::Stop(name)),
        "exit" | "quit" if name.is_none() => Some(HostCommand::Exit),
        "refresh" | "status" if name.is_none() => Some(HostCommand::Refresh),
        _ => None,
    }
}
