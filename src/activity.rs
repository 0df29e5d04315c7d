//! Persistent activity log.
//!
//! The whole file is read on open and rewritten after every entry. Only the
//! newest [`MAX_LOG_ENTRIES`] entries are kept.

use crate::diff::{diff, DeviceDiff, Snapshot};
use crate::error::{Error, Result};
use chrono::{Local, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

pub const MAX_LOG_ENTRIES: usize = 1000;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityType {
    DeviceConnected,
    DeviceDisconnected,
    DeviceError,
    SystemStartup,
    SystemShutdown,
    ProfileUpdated,
    SettingsChanged,
    RefreshTriggered,
}

impl ActivityType {
    pub const ALL: [ActivityType; 8] = [
        ActivityType::DeviceConnected,
        ActivityType::DeviceDisconnected,
        ActivityType::DeviceError,
        ActivityType::SystemStartup,
        ActivityType::SystemShutdown,
        ActivityType::ProfileUpdated,
        ActivityType::SettingsChanged,
        ActivityType::RefreshTriggered,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ActivityType::DeviceConnected => "device_connected",
            ActivityType::DeviceDisconnected => "device_disconnected",
            ActivityType::DeviceError => "device_error",
            ActivityType::SystemStartup => "system_startup",
            ActivityType::SystemShutdown => "system_shutdown",
            ActivityType::ProfileUpdated => "profile_updated",
            ActivityType::SettingsChanged => "settings_changed",
            ActivityType::RefreshTriggered => "refresh_triggered",
        }
    }

    pub fn severity(self) -> Severity {
        match self {
            ActivityType::DeviceError => Severity::Error,
            ActivityType::DeviceDisconnected => Severity::Warning,
            ActivityType::DeviceConnected => Severity::Success,
            _ => Severity::Info,
        }
    }
}

impl fmt::Display for ActivityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActivityType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        ActivityType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| format!("unknown activity type '{}'", s))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
    Success,
    Info,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Activity {
    pub id: u64,
    pub timestamp: NaiveDateTime,
    #[serde(rename = "type")]
    pub kind: ActivityType,
    pub message: String,
    pub device_name: String,
    #[serde(default)]
    pub details: BTreeMap<String, String>,
    pub severity: Severity,
}

#[derive(Serialize, Deserialize, Default)]
struct LogFile {
    #[serde(default)]
    last_updated: Option<NaiveDateTime>,
    #[serde(default)]
    total_entries: usize,
    #[serde(default)]
    activities: Vec<Activity>,
    #[serde(default)]
    current_devices: Snapshot,
}

#[derive(Serialize)]
struct ExportFile<'a> {
    exported_at: NaiveDateTime,
    total_entries: usize,
    activities: Vec<&'a Activity>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Statistics {
    pub total_activities: usize,
    pub today_activities: usize,
    pub devices_connected_today: usize,
    pub devices_disconnected_today: usize,
    pub by_type: BTreeMap<ActivityType, usize>,
    pub by_severity: BTreeMap<Severity, usize>,
    pub oldest_entry: Option<NaiveDateTime>,
    pub newest_entry: Option<NaiveDateTime>,
}

pub struct ActivityLog {
    path: PathBuf,
    activities: Vec<Activity>,
    current_devices: Snapshot,
    next_id: u64,
    /// Set while memory holds entries or devices the file does not.
    dirty: bool,
}

fn now() -> NaiveDateTime {
    Local::now().naive_local()
}

fn newest_first<'a>(items: impl DoubleEndedIterator<Item = &'a Activity>, limit: usize) -> Vec<&'a Activity> {
    items.rev().take(limit).collect()
}

impl ActivityLog {
    /// Loads the log at `path`. A missing or unreadable file starts an empty
    /// log; the problem is reported through tracing.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let file = match std::fs::read_to_string(&path) {
            Ok(content) => match serde_json::from_str::<LogFile>(&content) {
                Ok(f) => {
                    tracing::info!(entries = f.activities.len(), "activity log loaded");
                    f
                }
                Err(e) => {
                    tracing::error!(path = %path.display(), error = %e, "invalid JSON in activity log");
                    LogFile::default()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!("activity log not found, starting fresh");
                LogFile::default()
            }
            Err(e) => {
                tracing::error!(path = %path.display(), error = %e, "failed to read activity log");
                LogFile::default()
            }
        };

        let next_id = file.activities.iter().map(|a| a.id).max().unwrap_or(0) + 1;
        Self {
            path,
            activities: file.activities,
            current_devices: file.current_devices,
            next_id,
            dirty: false,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.activities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.activities.is_empty()
    }

    /// All entries, oldest first.
    pub fn activities(&self) -> &[Activity] {
        &self.activities
    }

    pub fn current_devices(&self) -> &Snapshot {
        &self.current_devices
    }

    /// Appends an entry, trims to the cap and writes the file.
    pub fn log(
        &mut self,
        kind: ActivityType,
        message: impl Into<String>,
        device_name: impl Into<String>,
        details: BTreeMap<String, String>,
    ) -> Result<()> {
        self.push(kind, message.into(), device_name.into(), details);
        self.flush()
    }

    fn push(&mut self, kind: ActivityType, message: String, device_name: String, details: BTreeMap<String, String>) {
        let activity = Activity {
            id: self.next_id,
            timestamp: now(),
            kind,
            message,
            device_name,
            details,
            severity: kind.severity(),
        };
        self.next_id += 1;
        tracing::info!(kind = %kind, device = %activity.device_name, "{}", activity.message);
        self.activities.push(activity);

        if self.activities.len() > MAX_LOG_ENTRIES {
            let excess = self.activities.len() - MAX_LOG_ENTRIES;
            self.activities.drain(..excess);
        }
        self.dirty = true;
    }

    /// Diffs `current` against the last recorded device set, appends a
    /// connected/disconnected entry per change and stores the new set.
    /// Only memory is touched; [`flush`](Self::flush) writes it out.
    pub fn apply_changes(&mut self, current: &Snapshot) -> DeviceDiff {
        let changes = diff(&self.current_devices, current);
        if self.current_devices == *current {
            return changes;
        }

        for dev in &changes.added {
            let details = BTreeMap::from([
                ("category".to_string(), dev.category.to_string()),
                ("manufacturer".to_string(), dev.manufacturer.clone()),
                ("vid".to_string(), dev.vid.clone()),
                ("pid".to_string(), dev.pid.clone()),
            ]);
            self.push(ActivityType::DeviceConnected, "Device connected".into(), dev.name.clone(), details);
        }
        for dev in &changes.removed {
            let details = BTreeMap::from([
                ("category".to_string(), dev.category.to_string()),
                ("last_seen".to_string(), now().format("%Y-%m-%dT%H:%M:%S%.f").to_string()),
            ]);
            self.push(ActivityType::DeviceDisconnected, "Device disconnected".into(), dev.name.clone(), details);
        }

        // Present devices whose fields changed still need the stored set rewritten.
        self.current_devices = current.clone();
        self.dirty = true;
        changes
    }

    /// [`apply_changes`](Self::apply_changes) followed by a write. When the
    /// write fails the entries stay in memory and go out with the next one.
    pub fn record_changes(&mut self, current: &Snapshot) -> Result<DeviceDiff> {
        let changes = self.apply_changes(current);
        self.flush()?;
        Ok(changes)
    }

    /// Writes the file if memory has anything it lacks.
    pub fn flush(&mut self) -> Result<()> {
        if self.dirty {
            self.save()?;
            self.dirty = false;
        }
        Ok(())
    }

    pub fn has_unsaved(&self) -> bool {
        self.dirty
    }

    pub fn recent(&self, limit: usize) -> Vec<&Activity> {
        newest_first(self.activities.iter(), limit)
    }

    pub fn by_type(&self, kind: ActivityType, limit: usize) -> Vec<&Activity> {
        newest_first(self.activities.iter().filter(|a| a.kind == kind), limit)
    }

    pub fn by_device(&self, device_name: &str, limit: usize) -> Vec<&Activity> {
        newest_first(self.activities.iter().filter(|a| a.device_name == device_name), limit)
    }

    pub fn statistics(&self) -> Statistics {
        self.statistics_on(Local::now().date_naive())
    }

    pub fn statistics_on(&self, today: NaiveDate) -> Statistics {
        let mut by_type = BTreeMap::new();
        let mut by_severity: BTreeMap<Severity, usize> = [
            Severity::Error,
            Severity::Warning,
            Severity::Success,
            Severity::Info,
        ]
        .into_iter()
        .map(|s| (s, 0))
        .collect();

        for a in &self.activities {
            *by_type.entry(a.kind).or_insert(0) += 1;
            *by_severity.entry(a.severity).or_insert(0) += 1;
        }

        let todays: Vec<&Activity> = self
            .activities
            .iter()
            .filter(|a| a.timestamp.date() == today)
            .collect();
        let count_today = |kind: ActivityType| todays.iter().filter(|a| a.kind == kind).count();

        Statistics {
            total_activities: self.activities.len(),
            today_activities: todays.len(),
            devices_connected_today: count_today(ActivityType::DeviceConnected),
            devices_disconnected_today: count_today(ActivityType::DeviceDisconnected),
            by_type,
            by_severity,
            oldest_entry: self.activities.first().map(|a| a.timestamp),
            newest_entry: self.activities.last().map(|a| a.timestamp),
        }
    }

    /// Drops every entry and the remembered device set.
    pub fn clear(&mut self) -> Result<()> {
        self.activities.clear();
        self.current_devices.clear();
        self.dirty = true;
        tracing::info!("activity log cleared");
        self.flush()
    }

    /// Writes entries (optionally only those on or after `since`) to `dest`
    /// and returns how many were exported.
    pub fn export(&self, dest: &Path, since: Option<NaiveDate>) -> Result<usize> {
        let activities: Vec<&Activity> = self
            .activities
            .iter()
            .filter(|a| since.map_or(true, |d| a.timestamp.date() >= d))
            .collect();
        let export = ExportFile {
            exported_at: now(),
            total_entries: activities.len(),
            activities,
        };
        let json = serde_json::to_string_pretty(&export)?;
        std::fs::write(dest, json).map_err(|e| Error::io(dest, e))?;
        tracing::info!(dest = %dest.display(), entries = export.total_entries, "activity log exported");
        Ok(export.total_entries)
    }

    pub fn save(&self) -> Result<()> {
        let file = LogFile {
            last_updated: Some(now()),
            total_entries: self.activities.len(),
            activities: self.activities.clone(),
            current_devices: self.current_devices.clone(),
        };
        let json = serde_json::to_string_pretty(&file)?;
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir).map_err(|e| Error::io(dir, e))?;
        }
        std::fs::write(&self.path, json).map_err(|e| Error::io(&self.path, e))
    }
}
