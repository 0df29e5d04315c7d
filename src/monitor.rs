//! Background polling thread.
//!
//! One thread owns the device source, rescans on a fixed interval, feeds
//! every scan through the activity log and publishes the result to
//! [`AppState`]. The presentation thread hears about it over a channel.

use crate::activity::{ActivityLog, ActivityType};
use crate::diff::{snapshot, DeviceDiff};
use crate::error::Result;
use crate::source::DeviceSource;
use crate::state::AppState;
use chrono::Local;
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, PartialEq)]
pub enum MonitorEvent {
    /// A scan finished. `initial` is set for the first scan after startup.
    Updated { changes: DeviceDiff, initial: bool },
    Error(String),
}

enum Command {
    Refresh,
    Stop,
}

pub struct Monitor {
    commands: Sender<Command>,
    handle: Option<JoinHandle<()>>,
}

impl Monitor {
    /// Starts the polling thread. `connect` runs on that thread, so the
    /// source it returns does not need to be `Send`.
    pub fn spawn<F, S>(
        connect: F,
        log: Arc<Mutex<ActivityLog>>,
        state: Arc<AppState>,
        interval: Duration,
    ) -> (Self, Receiver<MonitorEvent>)
    where
        F: FnOnce() -> Result<S> + Send + 'static,
        S: DeviceSource,
    {
        let (cmd_tx, cmd_rx) = mpsc::channel();
        let (event_tx, event_rx) = mpsc::channel();
        let handle = thread::spawn(move || {
            let source = match connect() {
                Ok(s) => s,
                Err(e) => {
                    tracing::error!(error = %e, "device source unavailable");
                    state.set_error(e.to_string());
                    let _ = event_tx.send(MonitorEvent::Error(e.to_string()));
                    return;
                }
            };
            monitor_loop(&source, &log, &state, &event_tx, &cmd_rx, interval);
        });
        (
            Self {
                commands: cmd_tx,
                handle: Some(handle),
            },
            event_rx,
        )
    }

    /// Asks for an immediate rescan.
    pub fn refresh(&self) {
        let _ = self.commands.send(Command::Refresh);
    }

    /// Stops the thread and waits for it to finish.
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        let _ = self.commands.send(Command::Stop);
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                tracing::error!("monitor thread panicked");
            }
        }
    }
}

impl Drop for Monitor {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn log_system(log: &Mutex<ActivityLog>, kind: ActivityType, message: &str) {
    if let Err(e) = log.lock().log(kind, message, "System", BTreeMap::new()) {
        tracing::error!(error = %e, "failed to write activity log");
    }
}

fn monitor_loop<S: DeviceSource>(
    source: &S,
    log: &Mutex<ActivityLog>,
    state: &AppState,
    events: &Sender<MonitorEvent>,
    commands: &Receiver<Command>,
    interval: Duration,
) {
    log_system(log, ActivityType::SystemStartup, "System Monitor Started");

    let mut initial = true;
    let mut failing = false;

    loop {
        let event = match source.devices() {
            Ok(devices) => {
                failing = false;
                let current = snapshot(devices);
                let changes = {
                    let mut log = log.lock();
                    let changes = log.apply_changes(&current);
                    if let Err(e) = log.flush() {
                        tracing::error!(error = %e, "failed to write activity log, will retry");
                    }
                    changes
                };
                for d in &changes.added {
                    tracing::info!(name = %d.name, path = %d.path, "CONNECT");
                }
                for d in &changes.removed {
                    tracing::info!(name = %d.name, path = %d.path, "DISCONNECT");
                }
                state.update(
                    current.into_values().collect(),
                    changes.clone(),
                    Local::now().naive_local(),
                );
                MonitorEvent::Updated { changes, initial }
            }
            Err(e) => {
                let msg = format!("Error scanning devices: {}", e);
                tracing::error!("{}", msg);
                state.set_error(msg.clone());
                // Only the first failure after a good scan goes into the activity log.
                if !failing {
                    let details = BTreeMap::from([("error".to_string(), e.to_string())]);
                    if let Err(e) = log
                        .lock()
                        .log(ActivityType::DeviceError, "Device scan failed", "System", details)
                    {
                        tracing::error!(error = %e, "failed to write activity log");
                    }
                }
                failing = true;
                MonitorEvent::Error(msg)
            }
        };
        initial = false;

        if events.send(event).is_err() {
            tracing::debug!("monitor receiver gone");
            break;
        }

        match commands.recv_timeout(interval) {
            Ok(Command::Refresh) => {
                log_system(log, ActivityType::RefreshTriggered, "Manual refresh");
            }
            Ok(Command::Stop) | Err(RecvTimeoutError::Disconnected) => break,
            Err(RecvTimeoutError::Timeout) => {}
        }
    }

    log_system(log, ActivityType::SystemShutdown, "System Monitor Stopped");
}
