//! Action host
//!
//! Owns the registered actions and drives their lifecycle from a single
//! serial control loop. Every running action gets its own blocking execution
//! context; the host only ever writes the Stopped/Idle edges of an action's
//! status, the action context writes the rest.

pub mod menu;
pub mod messages;
pub mod surface;

use serde::Serialize;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::actions::status::{ActionStatus, StatusCell};
use crate::actions::{Action, ActionContext};
use crate::config::HostConfig;
use crate::error::ConfigurationError;
use menu::MenuEntry;
use messages::{HostReporter, MessageSink, TITLE_ERROR, TITLE_INFO};
use surface::ControlSurface;

/// Commands consumed by the control loop
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostCommand {
    /// Start one action by name, or all of them
    Start(Option<String>),
    /// Stop one action by name, or all of them
    Stop(Option<String>),
    /// Re-render the control surface
    Refresh,
    Exit,
}

/// One line of a status snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusEntry {
    pub name: String,
    pub status: ActionStatus,
}

/// Cloneable sender for control commands
#[derive(Clone)]
pub struct HostHandle {
    commands: mpsc::UnboundedSender<HostCommand>,
}

impl HostHandle {
    /// Queue a command. Returns false once the control loop is gone.
    pub fn send(&self, command: HostCommand) -> bool {
        self.commands.send(command).is_ok()
    }
}

struct ActionSlot {
    action: Arc<dyn Action>,
    status: StatusCell,
    task: Option<JoinHandle<()>>,
}

impl ActionSlot {
    fn matches(&self, name: Option<&str>) -> bool {
        name.map_or(true, |n| self.action.name() == n)
    }
}

pub struct ActionHost {
    config: HostConfig,
    slots: Vec<ActionSlot>,
    reporter: Arc<HostReporter>,
    surface: Arc<dyn ControlSurface>,
    commands_tx: mpsc::UnboundedSender<HostCommand>,
    commands_rx: mpsc::UnboundedReceiver<HostCommand>,
}

impl ActionHost {
    pub fn new(config: HostConfig, surface: Arc<dyn ControlSurface>) -> Self {
        let (commands_tx, commands_rx) = mpsc::unbounded_channel();
        let reporter = Arc::new(HostReporter::new(
            config.notify,
            surface.clone(),
            commands_tx.clone(),
        ));

        let host = Self {
            config,
            slots: Vec::new(),
            reporter,
            surface,
            commands_tx,
            commands_rx,
        };
        host.report(
            TITLE_INFO,
            &format!("host {} started: {}", host.config.name, host.config.description),
        );
        host
    }

    pub fn handle(&self) -> HostHandle {
        HostHandle {
            commands: self.commands_tx.clone(),
        }
    }

    /// Attach an action. Names must be unique within the host.
    pub fn register(&mut self, action: Arc<dyn Action>) -> Result<(), ConfigurationError> {
        if self.slots.iter().any(|slot| slot.action.name() == action.name()) {
            return Err(ConfigurationError::DuplicateName(action.name().to_string()));
        }

        tracing::debug!(action = action.name(), description = action.description(), "Registered action");
        self.slots.push(ActionSlot {
            action,
            status: StatusCell::new(),
            task: None,
        });
        Ok(())
    }

    /// Start every matching Stopped action. Returns the names started.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(&mut self, name: Option<&str>) -> Vec<String> {
        let mut started = Vec::new();

        for slot in self.slots.iter_mut().filter(|slot| slot.matches(name)) {
            if slot.status.transition(ActionStatus::Idle).is_err() {
                continue;
            }

            let action = slot.action.clone();
            let status = slot.status.clone();
            let sink: Arc<dyn MessageSink> = self.reporter.clone();

            slot.task = Some(tokio::task::spawn_blocking(move || {
                let ctx = ActionContext::new(action.name(), status.clone(), sink.clone());
                if let Err(e) = action.activate(&ctx) {
                    sink.report(TITLE_ERROR, &format!("action {} failed: {}", action.name(), e));
                }
                // Covers activation failures and loops that end on their own
                status.stop();
                sink.request_refresh();
            }));

            started.push(slot.action.name().to_string());
        }

        if started.is_empty() {
            self.report(TITLE_INFO, &not_found_message("start", name));
        } else {
            self.report(TITLE_INFO, &format!("started {}", started.join(", ")));
        }

        started
    }

    /// Stop every matching running action and wait until its execution
    /// context has exited. An action is only reported Stopped after that.
    /// Returns the names stopped.
    pub async fn stop(&mut self, name: Option<&str>) -> Vec<String> {
        let mut stopped = Vec::new();

        for slot in self.slots.iter_mut().filter(|slot| slot.matches(name)) {
            if slot.status.get() == ActionStatus::Stopped {
                continue;
            }

            let action_name = slot.action.name().to_string();
            let task = slot.task.take();
            let running = task.as_ref().is_some_and(|t| !t.is_finished());

            if running {
                if let Err(e) = slot.action.deactivate() {
                    self.reporter
                        .report(TITLE_ERROR, &format!("failed to stop {}: {}", action_name, e));
                }
            }

            if let Some(task) = task {
                // Waits for the in-flight unit of work, however long it takes
                if let Err(e) = task.await {
                    tracing::error!(action = %action_name, "Execution context panicked: {}", e);
                }
            }

            slot.status.stop();
            stopped.push(action_name);
        }

        if stopped.is_empty() {
            self.report(TITLE_INFO, &not_found_message("stop", name));
        } else {
            self.report(TITLE_INFO, &format!("stopped {}", stopped.join(", ")));
        }

        stopped
    }

    /// Current status of every action, in registration order
    pub fn status_snapshot(&self) -> Vec<StatusEntry> {
        self.slots
            .iter()
            .map(|slot| StatusEntry {
                name: slot.action.name().to_string(),
                status: slot.status.get(),
            })
            .collect()
    }

    pub fn menu_projection(&self) -> Vec<MenuEntry> {
        menu::menu_projection(&self.status_snapshot())
    }

    /// Serial control loop. Returns after `Exit`, with every action stopped.
    pub async fn run(mut self) {
        if self.config.auto_start {
            self.start(None);
        }
        self.render();

        while let Some(command) = self.commands_rx.recv().await {
            tracing::debug!(?command, "Host command");
            match command {
                HostCommand::Start(name) => {
                    self.start(name.as_deref());
                }
                HostCommand::Stop(name) => {
                    self.stop(name.as_deref()).await;
                }
                HostCommand::Refresh => {}
                HostCommand::Exit => break,
            }
            self.render();
        }

        if self.has_running() {
            self.stop(None).await;
        }
        tracing::info!(host = %self.config.name, "Control loop exited");
    }

    fn has_running(&self) -> bool {
        self.slots
            .iter()
            .any(|slot| slot.status.get() != ActionStatus::Stopped)
    }

    fn render(&self) {
        self.surface.render(&self.menu_projection());
    }

    fn report(&self, title: &str, body: &str) {
        self.reporter.report(title, body);
    }
}

fn not_found_message(verb: &str, name: Option<&str>) -> String {
    match name {
        Some(name) => format!("nothing to {} for {}", verb, name),
        None => format!("nothing to {}", verb),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ActionError;
    use crate::test_support::{wait_until, RecordingSurface};
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::time::{Duration, Instant};

    /// Blocks in activate until deactivated, optionally running one unit of work
    #[derive(Default)]
    struct FakeAction {
        name: String,
        stop: AtomicBool,
        activations: AtomicUsize,
        deactivations: AtomicUsize,
        fail: bool,
        work_once: bool,
        /// Time spent finishing up after a stop request
        linger: Duration,
        exited: AtomicBool,
    }

    impl FakeAction {
        fn named(name: &str) -> Self {
            Self {
                name: name.to_string(),
                ..Default::default()
            }
        }
    }

    impl Action for FakeAction {
        fn name(&self) -> &str {
            &self.name
        }

        fn description(&self) -> &str {
            "fake"
        }

        fn activate(&self, ctx: &ActionContext) -> Result<(), ActionError> {
            self.activations.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(ActionError::MissingSource("/nowhere".into()));
            }
            if self.work_once {
                ctx.begin_work();
                ctx.finish_work(ActionStatus::Success);
            }
            while !self.stop.load(Ordering::SeqCst) {
                std::thread::sleep(Duration::from_millis(5));
            }
            std::thread::sleep(self.linger);
            self.stop.store(false, Ordering::SeqCst);
            self.exited.store(true, Ordering::SeqCst);
            Ok(())
        }

        fn deactivate(&self) -> Result<(), ActionError> {
            self.deactivations.fetch_add(1, Ordering::SeqCst);
            self.stop.store(true, Ordering::SeqCst);
            Ok(())
        }
    }

    fn host() -> (ActionHost, Arc<RecordingSurface>) {
        let surface = Arc::new(RecordingSurface::default());
        let mut config = HostConfig::new("TestHost");
        config.notify = true;
        (ActionHost::new(config, surface.clone()), surface)
    }

    fn status_of(host: &ActionHost, name: &str) -> ActionStatus {
        host.status_snapshot()
            .into_iter()
            .find(|e| e.name == name)
            .map(|e| e.status)
            .unwrap()
    }

    #[test]
    fn test_duplicate_name_rejected() {
        let (mut host, _) = host();
        host.register(Arc::new(FakeAction::named("a"))).unwrap();
        let err = host.register(Arc::new(FakeAction::named("a"))).unwrap_err();
        assert!(matches!(err, ConfigurationError::DuplicateName(ref n) if n == "a"));
        assert_eq!(host.status_snapshot().len(), 1);
    }

    #[test]
    fn test_host_reports_on_construction() {
        let (_host, surface) = host();
        assert!(surface.toasts()[0].1.contains("TestHost"));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_start_stop_cycle() {
        let (mut host, surface) = host();
        let action = Arc::new(FakeAction::named("a"));
        host.register(action.clone()).unwrap();
        host.register(Arc::new(FakeAction::named("b"))).unwrap();

        assert_eq!(host.start(Some("a")), vec!["a"]);
        assert_eq!(status_of(&host, "a"), ActionStatus::Idle);
        assert_eq!(status_of(&host, "b"), ActionStatus::Stopped);
        assert!(wait_until(Duration::from_secs(5), || {
            action.activations.load(Ordering::SeqCst) == 1
        }));

        assert_eq!(host.stop(Some("a")).await, vec!["a"]);
        assert_eq!(status_of(&host, "a"), ActionStatus::Stopped);
        assert_eq!(action.deactivations.load(Ordering::SeqCst), 1);

        let toasts = surface.toasts();
        assert!(toasts.iter().any(|(_, body)| body == "started a"));
        assert!(toasts.iter().any(|(_, body)| body == "stopped a"));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_start_running_action_is_reported_noop() {
        let (mut host, surface) = host();
        let action = Arc::new(FakeAction::named("a"));
        host.register(action.clone()).unwrap();

        host.start(None);
        let before = surface.toasts().len();

        assert!(host.start(Some("a")).is_empty());
        assert!(host.start(Some("missing")).is_empty());

        let toasts = surface.toasts();
        assert_eq!(toasts.len(), before + 2);
        assert_eq!(toasts[before].1, "nothing to start for a");
        assert_eq!(toasts[before + 1].1, "nothing to start for missing");
        assert_eq!(status_of(&host, "a"), ActionStatus::Idle);

        host.stop(None).await;
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_stop_waits_for_execution_context_to_exit() {
        let (mut host, _) = host();
        let action = Arc::new(FakeAction {
            linger: Duration::from_millis(300),
            ..FakeAction::named("slow")
        });
        host.register(action.clone()).unwrap();

        host.start(None);
        assert!(wait_until(Duration::from_secs(5), || {
            action.activations.load(Ordering::SeqCst) == 1
        }));

        let began = Instant::now();
        assert_eq!(host.stop(Some("slow")).await, vec!["slow"]);

        assert!(began.elapsed() >= Duration::from_millis(300));
        assert!(action.exited.load(Ordering::SeqCst));
        assert_eq!(status_of(&host, "slow"), ActionStatus::Stopped);

        // Restart after a clean stop runs a fresh context
        assert_eq!(host.start(Some("slow")), vec!["slow"]);
        assert!(wait_until(Duration::from_secs(5), || {
            action.activations.load(Ordering::SeqCst) == 2
        }));
        host.stop(None).await;
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_stop_when_nothing_running_is_reported() {
        let (mut host, surface) = host();
        host.register(Arc::new(FakeAction::named("a"))).unwrap();

        assert!(host.stop(None).await.is_empty());
        assert_eq!(surface.toasts().last().unwrap().1, "nothing to stop");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_stop_from_outcome_state() {
        let (mut host, _) = host();
        let action = Arc::new(FakeAction {
            work_once: true,
            ..FakeAction::named("worker")
        });
        host.register(action.clone()).unwrap();

        host.start(Some("worker"));
        assert!(wait_until(Duration::from_secs(5), || {
            action.activations.load(Ordering::SeqCst) == 1
        }));
        assert!(wait_until(Duration::from_secs(5), || {
            status_of(&host, "worker") == ActionStatus::Idle
        }));

        host.stop(Some("worker")).await;
        assert_eq!(status_of(&host, "worker"), ActionStatus::Stopped);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_failed_activation_returns_to_stopped() {
        let (mut host, surface) = host();
        host.register(Arc::new(FakeAction {
            fail: true,
            ..FakeAction::named("broken")
        }))
        .unwrap();

        assert_eq!(host.start(None), vec!["broken"]);
        assert!(wait_until(Duration::from_secs(5), || {
            status_of(&host, "broken") == ActionStatus::Stopped
        }));
        assert!(surface
            .toasts()
            .iter()
            .any(|(title, body)| title == TITLE_ERROR && body.contains("broken failed")));

        // Can be started again after failing
        assert_eq!(host.start(Some("broken")), vec!["broken"]);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_run_loop_processes_commands_until_exit() {
        let surface = Arc::new(RecordingSurface::default());
        let mut host = ActionHost::new(HostConfig::new("Loop"), surface.clone());
        let action = Arc::new(FakeAction::named("a"));
        host.register(action.clone()).unwrap();
        let handle = host.handle();

        let runner = tokio::spawn(host.run());

        assert!(handle.send(HostCommand::Stop(Some("a".to_string()))));
        assert!(handle.send(HostCommand::Start(Some("a".to_string()))));
        assert!(handle.send(HostCommand::Exit));
        runner.await.unwrap();

        // auto-start, then the explicit restart
        assert_eq!(action.activations.load(Ordering::SeqCst), 2);
        assert_eq!(action.deactivations.load(Ordering::SeqCst), 2);

        let menu = surface.last_menu().unwrap();
        assert_eq!(menu[0].label(), "stop a");
        assert!(!handle.send(HostCommand::Refresh));
    }
}
