use crate::diff::DeviceDiff;
use crate::types::Device;
use chrono::NaiveDateTime;
use parking_lot::RwLock;

/// What the presentation side needs to draw a frame.
#[derive(Clone, Debug, Default)]
pub struct AppSnapshot {
    pub devices: Vec<Device>,
    pub last_changes: DeviceDiff,
    pub last_update: Option<NaiveDateTime>,
    pub error: Option<String>,
}

#[derive(Default)]
pub struct AppState {
    pub devices: RwLock<Vec<Device>>,
    pub last_changes: RwLock<DeviceDiff>,
    pub last_update: RwLock<Option<NaiveDateTime>>,
    pub error: RwLock<Option<String>>,
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a fresh scan, sorted by name, and clears any previous error.
    pub fn update(&self, mut devices: Vec<Device>, changes: DeviceDiff, at: NaiveDateTime) {
        devices.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));
        *self.devices.write() = devices;
        *self.last_changes.write() = changes;
        *self.last_update.write() = Some(at);
        *self.error.write() = None;
    }

    pub fn set_error(&self, message: impl Into<String>) {
        *self.error.write() = Some(message.into());
    }

    pub fn snapshot(&self) -> AppSnapshot {
        AppSnapshot {
            devices: self.devices.read().clone(),
            last_changes: self.last_changes.read().clone(),
            last_update: *self.last_update.read(),
            error: self.error.read().clone(),
        }
    }
}
