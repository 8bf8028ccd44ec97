//! Background notification polling
//!
//! Polls a [`NotificationSource`] at a fixed interval while the consumer is
//! visible. Polling pauses while hidden, runs immediately when the consumer
//! becomes visible again, and stops on [`PollerHandle::stop`] or when the
//! handle is dropped.
//!
//! The interval can be set with `JARS_POLL_INTERVAL` (seconds, clamped to
//! 3..=60, default 10).

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::models::Notification;

pub const DEFAULT_INTERVAL_SECS: u64 = 10;
pub const MIN_INTERVAL_SECS: u64 = 3;
pub const MAX_INTERVAL_SECS: u64 = 60;

/// Anything that can list the current user's notifications
#[async_trait]
pub trait NotificationSource: Send + Sync {
    async fn fetch_notifications(&self) -> Result<Vec<Notification>>;
}

/// Configuration for the poller
#[derive(Debug, Clone)]
pub struct PollerConfig {
    /// Time between polls
    pub interval: Duration,
    /// Whether polling starts in the visible state
    pub start_visible: bool,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self::from_secs(DEFAULT_INTERVAL_SECS)
    }
}

impl PollerConfig {
    /// Exact interval, not clamped
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            start_visible: true,
        }
    }

    /// Interval in seconds, clamped to the supported range
    pub fn from_secs(secs: u64) -> Self {
        Self::new(Duration::from_secs(
            secs.clamp(MIN_INTERVAL_SECS, MAX_INTERVAL_SECS),
        ))
    }

    /// Parse configuration from `JARS_POLL_INTERVAL`
    pub fn from_env() -> Self {
        match std::env::var("JARS_POLL_INTERVAL") {
            Ok(raw) => match raw.trim().parse::<u64>() {
                Ok(secs) => Self::from_secs(secs),
                Err(_) => {
                    warn!("Invalid JARS_POLL_INTERVAL {:?}, using default", raw);
                    Self::default()
                }
            },
            Err(_) => Self::default(),
        }
    }

    pub fn hidden(mut self) -> Self {
        self.start_visible = false;
        self
    }
}

/// Control handle for a running poller
pub struct PollerHandle {
    visible: watch::Sender<bool>,
    cancel: watch::Sender<bool>,
    task: Option<JoinHandle<()>>,
}

impl PollerHandle {
    /// Report visibility; becoming visible triggers an immediate poll
    pub fn set_visible(&self, visible: bool) {
        self.visible.send_if_modified(|current| {
            if *current == visible {
                false
            } else {
                *current = visible;
                true
            }
        });
    }

    pub fn is_visible(&self) -> bool {
        *self.visible.borrow()
    }

    /// Ask the task to stop after the current poll
    pub fn stop(&self) {
        let _ = self.cancel.send(true);
    }

    /// Stop and wait for the task to finish
    pub async fn shutdown(mut self) {
        self.stop();
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }

    pub fn is_finished(&self) -> bool {
        self.task.as_ref().map_or(true, |t| t.is_finished())
    }
}

impl Drop for PollerHandle {
    fn drop(&mut self) {
        let _ = self.cancel.send(true);
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

/// Start polling as a background task
///
/// `on_update` receives every successful fetch. Fetch errors are logged and
/// polling continues at the normal interval.
pub fn start_notification_poller<S, F>(
    source: Arc<S>,
    config: PollerConfig,
    on_update: F,
) -> PollerHandle
where
    S: NotificationSource + ?Sized + 'static,
    F: Fn(Vec<Notification>) + Send + Sync + 'static,
{
    info!(
        "Starting notification poller: every {}s",
        config.interval.as_secs_f64()
    );

    let (visible_tx, mut visible_rx) = watch::channel(config.start_visible);
    let (cancel_tx, mut cancel_rx) = watch::channel(false);

    let task = tokio::spawn(async move {
        loop {
            if *cancel_rx.borrow() {
                break;
            }

            if !*visible_rx.borrow_and_update() {
                debug!("Poller paused while hidden");
                tokio::select! {
                    changed = visible_rx.changed() => {
                        if changed.is_err() {
                            break;
                        }
                        continue;
                    }
                    _ = cancel_rx.changed() => break,
                }
            }

            match source.fetch_notifications().await {
                Ok(notifications) => {
                    debug!("Polled {} notifications", notifications.len());
                    on_update(notifications);
                }
                Err(e) => warn!("Notification poll failed: {}", e),
            }

            tokio::select! {
                _ = tokio::time::sleep(config.interval) => {}
                changed = visible_rx.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
                _ = cancel_rx.changed() => break,
            }
        }
        debug!("Notification poller stopped");
    });

    PollerHandle {
        visible: visible_tx,
        cancel: cancel_tx,
        task: Some(task),
    }
}
