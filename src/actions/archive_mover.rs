//! Archive mover action
//!
//! Watches the source directory and hands every event to an [`ArchiveMover`].
//! The mover (and with it the set of processed paths) lives as long as the
//! action, so restarting the action does not re-process old downloads.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Mutex, MutexGuard, TryLockError};

use super::{Action, ActionContext};
use crate::config::ArchiveMoverConfig;
use crate::error::{ActionError, ConfigurationError};
use crate::services::pipeline::ArchiveMover;
use crate::services::watcher::{self, WatchSignal, WatchSubscription};

pub const DEFAULT_NAME: &str = "ArchiveMover";

/// Subscription plus the sender used to wake the loop on shutdown
struct ActiveWatch {
    subscription: WatchSubscription,
    shutdown: mpsc::Sender<WatchSignal>,
}

pub struct ArchiveMoverAction {
    name: String,
    description: String,
    mover: Mutex<ArchiveMover>,
    active: Mutex<Option<ActiveWatch>>,
    /// Set by `deactivate`, cleared when the loop exits
    cancelled: AtomicBool,
}

impl ArchiveMoverAction {
    pub fn new(config: ArchiveMoverConfig) -> Result<Self, ConfigurationError> {
        Self::with_name(DEFAULT_NAME, config)
    }

    pub fn with_name(name: &str, config: ArchiveMoverConfig) -> Result<Self, ConfigurationError> {
        let config = config.validated()?;
        let description = format!(
            "Moves image archives from {} to {}",
            config.source_dir.display(),
            config.destination_dir.display()
        );

        Ok(Self {
            name: name.to_string(),
            description,
            mover: Mutex::new(ArchiveMover::new(config)),
            active: Mutex::new(None),
            cancelled: AtomicBool::new(false),
        })
    }

    fn active(&self) -> MutexGuard<'_, Option<ActiveWatch>> {
        self.active.lock().unwrap_or_else(|poisoned| {
            tracing::warn!(action = %self.name, "Watch state mutex was poisoned, recovering...");
            poisoned.into_inner()
        })
    }

    fn watch_loop(&self, ctx: &ActionContext) -> Result<(), ActionError> {
        let mut mover = match self.mover.try_lock() {
            Ok(guard) => guard,
            Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner(),
            Err(TryLockError::WouldBlock) => return Err(ActionError::AlreadyRunning),
        };
        let config = mover.config().clone();

        if !config.source_dir.is_dir() {
            return Err(ActionError::MissingSource(config.source_dir.clone()));
        }

        let (sender, receiver) = mpsc::channel();
        let subscription =
            watcher::subscribe(&config.source_dir, sender.clone()).map_err(|e| ActionError::Watch {
                path: config.source_dir.clone(),
                source: e,
            })?;

        {
            let mut active = self.active();
            // deactivate() may have run before the subscription existed
            if self.cancelled.load(Ordering::SeqCst) {
                drop(active);
                subscription.close();
                return Ok(());
            }
            *active = Some(ActiveWatch {
                subscription,
                shutdown: sender,
            });
        }

        ctx.info(&format!(
            "watching {}, moving image archives to {}",
            config.source_dir.display(),
            config.destination_dir.display()
        ));

        while let Ok(signal) = receiver.recv() {
            if self.cancelled.load(Ordering::SeqCst) {
                break;
            }
            match signal {
                WatchSignal::Event(event) => {
                    mover.handle_event(&event, ctx);
                }
                WatchSignal::Shutdown => break,
            }
        }

        // Subscription may still be live if the loop ended on its own
        if let Some(active) = self.active().take() {
            active.subscription.close();
        }

        tracing::info!(action = %self.name, processed = mover.processed().len(), "Watch loop exited");
        Ok(())
    }
}

impl Action for ArchiveMoverAction {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn activate(&self, ctx: &ActionContext) -> Result<(), ActionError> {
        let result = self.watch_loop(ctx);
        // A rejected second activation must not clear a pending stop for
        // the loop that is still running
        if !matches!(result, Err(ActionError::AlreadyRunning)) {
            self.cancelled.store(false, Ordering::SeqCst);
        }
        result
    }

    fn deactivate(&self) -> Result<(), ActionError> {
        self.cancelled.store(true, Ordering::SeqCst);

        let active = self.active().take();
        if let Some(active) = active {
            // Wake the loop even if no filesystem event is pending
            let _ = active.shutdown.send(WatchSignal::Shutdown);
            active.subscription.close();
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actions::status::{ActionStatus, StatusCell};
    use crate::host::messages::Severity;
    use crate::test_support::{wait_until, write_zip, RecordingSink};
    use std::sync::Arc;
    use std::time::Duration;
    use tempfile::TempDir;

    fn context(sink: Arc<RecordingSink>) -> (ActionContext, StatusCell) {
        let status = StatusCell::new();
        status.transition(ActionStatus::Idle).unwrap();
        (ActionContext::new(DEFAULT_NAME, status.clone(), sink), status)
    }

    #[test]
    fn test_invalid_config_rejected_at_construction() {
        let mut config = ArchiveMoverConfig::new("/in", "/out");
        config.image_ratio_threshold = 2.0;
        assert!(matches!(
            ArchiveMoverAction::new(config),
            Err(ConfigurationError::InvalidThreshold(_))
        ));
    }

    #[test]
    fn test_missing_source_fails_activation() {
        let temp_dir = TempDir::new().unwrap();
        let config = ArchiveMoverConfig::new(temp_dir.path().join("nope"), temp_dir.path().join("out"));
        let action = ArchiveMoverAction::new(config).unwrap();
        let (ctx, _) = context(Arc::new(RecordingSink::default()));

        assert!(matches!(
            action.activate(&ctx),
            Err(ActionError::MissingSource(_))
        ));
    }

    #[test]
    fn test_deactivate_before_activate_returns_promptly() {
        let temp_dir = TempDir::new().unwrap();
        let src = temp_dir.path().join("downloads");
        std::fs::create_dir_all(&src).unwrap();
        let config = ArchiveMoverConfig::new(&src, temp_dir.path().join("out"));
        let action = ArchiveMoverAction::new(config).unwrap();
        let (ctx, _) = context(Arc::new(RecordingSink::default()));

        action.deactivate().unwrap();
        action.activate(&ctx).unwrap();
    }

    #[test]
    fn test_second_activation_keeps_pending_stop() {
        let temp_dir = TempDir::new().unwrap();
        let src = temp_dir.path().join("downloads");
        std::fs::create_dir_all(&src).unwrap();
        let config = ArchiveMoverConfig::new(&src, temp_dir.path().join("galleries"));
        let action = Arc::new(ArchiveMoverAction::new(config).unwrap());
        let sink = Arc::new(RecordingSink::default());
        let (ctx, _) = context(sink.clone());

        let runner = {
            let action = action.clone();
            let ctx = ctx.clone();
            std::thread::spawn(move || action.activate(&ctx))
        };
        assert!(wait_until(Duration::from_secs(5), || sink.count(Severity::Info) >= 1));

        action.cancelled.store(true, Ordering::SeqCst);
        assert!(matches!(
            action.activate(&ctx),
            Err(ActionError::AlreadyRunning)
        ));
        assert!(action.cancelled.load(Ordering::SeqCst));

        action.deactivate().unwrap();
        runner.join().unwrap().unwrap();
        assert!(!action.cancelled.load(Ordering::SeqCst));
    }

    #[test]
    fn test_watches_and_moves_until_deactivated() {
        let temp_dir = TempDir::new().unwrap();
        let src = temp_dir.path().join("downloads");
        let dst = temp_dir.path().join("galleries");
        std::fs::create_dir_all(&src).unwrap();

        let action = Arc::new(ArchiveMoverAction::new(ArchiveMoverConfig::new(&src, &dst)).unwrap());
        let sink = Arc::new(RecordingSink::default());
        let (ctx, status) = context(sink.clone());

        let runner = {
            let action = action.clone();
            std::thread::spawn(move || action.activate(&ctx))
        };
        assert!(wait_until(Duration::from_secs(5), || sink.count(Severity::Info) >= 1));

        // Build the archive elsewhere and move it in, so it appears complete
        let staging = temp_dir.path().join("staging.zip");
        write_zip(&staging, &[("a.jpg", "img"), ("b.jpg", "img")]);
        std::fs::rename(&staging, src.join("new.zip")).unwrap();

        assert!(wait_until(Duration::from_secs(10), || dst.join("new.zip").exists()));

        action.deactivate().unwrap();
        runner.join().unwrap().unwrap();
        assert_eq!(status.get(), ActionStatus::Idle);
    }
}
