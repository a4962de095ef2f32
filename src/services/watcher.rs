use notify::event::ModifyKind;
use notify::{EventKind, RecommendedWatcher, RecursiveMode};
use notify_debouncer_full::{new_debouncer, DebouncedEvent, Debouncer, RecommendedCache};
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::time::Duration;

/// Wait this long for file writes to settle before delivering an event
const DEBOUNCE_TIMEOUT: Duration = Duration::from_millis(500);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchEventKind {
    Created,
    Modified,
}

/// A file that was created or modified under the watched directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchEvent {
    pub path: PathBuf,
    pub kind: WatchEventKind,
}

impl WatchEvent {
    pub fn created(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            kind: WatchEventKind::Created,
        }
    }

    pub fn modified(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            kind: WatchEventKind::Modified,
        }
    }
}

/// What a watching action's loop receives
#[derive(Debug)]
pub enum WatchSignal {
    Event(WatchEvent),
    /// The subscription was closed; the loop should exit
    Shutdown,
}

/// A live recursive watch. Dropping or closing it ends event delivery.
pub struct WatchSubscription {
    debouncer: Debouncer<RecommendedWatcher, RecommendedCache>,
    path: PathBuf,
}

impl WatchSubscription {
    /// Stop watching and wait for the debouncer thread to exit
    pub fn close(self) {
        tracing::debug!(path = %self.path.display(), "Closing watch subscription");
        self.debouncer.stop();
    }
}

/// Watch `path` recursively, forwarding candidate files to `sender`
pub fn subscribe(
    path: &Path,
    sender: mpsc::Sender<WatchSignal>,
) -> Result<WatchSubscription, notify::Error> {
    let watched_folder = path.to_path_buf();

    let mut debouncer = new_debouncer(
        DEBOUNCE_TIMEOUT,
        None,
        move |result: Result<Vec<DebouncedEvent>, Vec<notify::Error>>| match result {
            Ok(events) => {
                for event in events {
                    for watch_event in candidate_events(&event) {
                        // Receiver gone means the action is shutting down
                        if sender.send(WatchSignal::Event(watch_event)).is_err() {
                            return;
                        }
                    }
                }
            }
            Err(errors) => {
                for error in errors {
                    tracing::warn!(folder = %watched_folder.display(), "Watcher error: {:?}", error);
                }
            }
        },
    )?;

    debouncer.watch(path, RecursiveMode::Recursive)?;

    tracing::info!(path = %path.display(), "Watching folder");

    Ok(WatchSubscription {
        debouncer,
        path: path.to_path_buf(),
    })
}

/// Turn one debounced notification into the file events worth processing
fn candidate_events(event: &DebouncedEvent) -> Vec<WatchEvent> {
    let kind = match event.kind {
        EventKind::Create(_) => WatchEventKind::Created,
        // Metadata-only changes (permissions, timestamps) carry no new content
        EventKind::Modify(ModifyKind::Metadata(_)) => return Vec::new(),
        EventKind::Modify(_) => WatchEventKind::Modified,
        _ => return Vec::new(),
    };

    event
        .paths
        .iter()
        .filter(|path| is_candidate_file(path))
        .map(|path| WatchEvent {
            path: path.clone(),
            kind,
        })
        .collect()
}

/// Skip directories, vanished paths, and hidden or temporary files
fn is_candidate_file(path: &Path) -> bool {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();

    // Skip hidden files, temp files, and partial downloads
    if file_name.is_empty()
        || file_name.starts_with('.')
        || file_name.ends_with(".tmp")
        || file_name.ends_with(".crdownload")
        || file_name.ends_with(".part")
        || file_name.ends_with(".download")
    {
        return false;
    }

    // Renamed-away sources and directories fall out here. Empty files pass:
    // an empty archive is rejected downstream like any other corrupt one.
    std::fs::symlink_metadata(path)
        .map(|metadata| metadata.is_file())
        .unwrap_or(false)
}
