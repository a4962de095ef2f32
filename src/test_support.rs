//! Shared fixtures for unit tests

use std::fs::File;
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use zip::write::SimpleFileOptions;
use zip::ZipWriter;

use crate::host::menu::MenuEntry;
use crate::host::messages::{MessageSink, Severity};
use crate::host::surface::ControlSurface;

/// Sink that keeps every report and counts refresh requests
#[derive(Default)]
pub struct RecordingSink {
    messages: Mutex<Vec<(Severity, String)>>,
    refreshes: Mutex<usize>,
}

impl RecordingSink {
    pub fn messages(&self) -> Vec<(Severity, String)> {
        self.messages.lock().unwrap().clone()
    }

    pub fn count(&self, severity: Severity) -> usize {
        self.messages
            .lock()
            .unwrap()
            .iter()
            .filter(|(s, _)| *s == severity)
            .count()
    }

    pub fn refreshes(&self) -> usize {
        *self.refreshes.lock().unwrap()
    }
}

impl MessageSink for RecordingSink {
    fn report(&self, title: &str, body: &str) {
        self.messages
            .lock()
            .unwrap()
            .push((Severity::from_title(title), body.to_string()));
    }

    fn request_refresh(&self) {
        *self.refreshes.lock().unwrap() += 1;
    }
}

/// Surface that records toasts and rendered menus
#[derive(Default)]
pub struct RecordingSurface {
    toasts: Mutex<Vec<(String, String)>>,
    menus: Mutex<Vec<Vec<MenuEntry>>>,
}

impl RecordingSurface {
    pub fn toasts(&self) -> Vec<(String, String)> {
        self.toasts.lock().unwrap().clone()
    }

    pub fn last_menu(&self) -> Option<Vec<MenuEntry>> {
        self.menus.lock().unwrap().last().cloned()
    }
}

impl ControlSurface for RecordingSurface {
    fn render(&self, menu: &[MenuEntry]) {
        self.menus.lock().unwrap().push(menu.to_vec());
    }

    fn toast(&self, title: &str, body: &str) {
        self.toasts
            .lock()
            .unwrap()
            .push((title.to_string(), body.to_string()));
    }
}

/// Write a stored (uncompressed) zip with the given entries
pub fn write_zip(path: &Path, entries: &[(&str, &str)]) {
    let file = File::create(path).unwrap();
    let mut zip = ZipWriter::new(file);
    let options = SimpleFileOptions::default().compression_method(zip::CompressionMethod::Stored);

    for (name, body) in entries {
        zip.start_file(*name, options).unwrap();
        zip.write_all(body.as_bytes()).unwrap();
    }
    zip.finish().unwrap();
}

/// Poll `condition` until it holds or `timeout` elapses
pub fn wait_until(timeout: Duration, condition: impl Fn() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(20));
    }
    condition()
}
