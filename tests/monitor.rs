use device_monitor::activity::{ActivityLog, ActivityType};
use device_monitor::error::{Error, Result};
use device_monitor::monitor::{Monitor, MonitorEvent};
use device_monitor::source::DeviceSource;
use device_monitor::state::AppState;
use device_monitor::types::{Category, Device, PortType};
use parking_lot::Mutex;
use std::path::Path;
use std::sync::mpsc::Receiver;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

const WAIT: Duration = Duration::from_secs(5);
const NEVER: Duration = Duration::from_secs(3600);

fn device(path: &str, name: &str) -> Device {
    Device {
        name: name.to_string(),
        category: Category::Usb,
        kind: "USB Device".to_string(),
        port_type: PortType::Physical,
        vid: "0x0781".to_string(),
        pid: "0x5581".to_string(),
        manufacturer: "SanDisk".to_string(),
        status: "OK".to_string(),
        path: path.to_string(),
        driver: "USBSTOR".to_string(),
        mount_point: None,
        size_bytes: None,
    }
}

/// Scriptable source: tests swap the device list or make scans fail.
#[derive(Clone, Default)]
struct FakeSource {
    devices: Arc<Mutex<Option<Vec<Device>>>>,
    failures: Arc<AtomicUsize>,
}

impl FakeSource {
    fn with(devices: Vec<Device>) -> Self {
        Self {
            devices: Arc::new(Mutex::new(Some(devices))),
            ..Default::default()
        }
    }

    fn set(&self, devices: Option<Vec<Device>>) {
        *self.devices.lock() = devices;
    }
}

impl DeviceSource for FakeSource {
    fn devices(&self) -> Result<Vec<Device>> {
        self.devices.lock().clone().ok_or_else(|| {
            let n = self.failures.fetch_add(1, Ordering::SeqCst);
            Error::Wmi(format!("query failed (attempt {})", n + 1))
        })
    }
}

fn start(source: FakeSource, log_path: &Path) -> (Monitor, Receiver<MonitorEvent>, Arc<AppState>) {
    let log = Arc::new(Mutex::new(ActivityLog::open(log_path)));
    let state = Arc::new(AppState::new());
    let (monitor, events) = Monitor::spawn(move || Ok(source), log, state.clone(), NEVER);
    (monitor, events, state)
}

#[test]
fn connects_disconnects_and_errors_are_logged() {
    let dir = tempfile::tempdir().unwrap();
    let log_path = dir.path().join("system_activity.json");
    let source = FakeSource::with(vec![device("USB\\A", "Cruzer")]);
    let (monitor, events, state) = start(source.clone(), &log_path);

    match events.recv_timeout(WAIT).unwrap() {
        MonitorEvent::Updated { changes, initial } => {
            assert!(initial);
            assert_eq!(changes.added.len(), 1);
            assert!(changes.removed.is_empty());
        }
        other => panic!("unexpected {:?}", other),
    }

    source.set(Some(vec![device("USB\\B", "Ultra Fit")]));
    monitor.refresh();
    match events.recv_timeout(WAIT).unwrap() {
        MonitorEvent::Updated { changes, initial } => {
            assert!(!initial);
            assert_eq!(changes.added[0].name, "Ultra Fit");
            assert_eq!(changes.removed[0].name, "Cruzer");
        }
        other => panic!("unexpected {:?}", other),
    }
    let snap = state.snapshot();
    assert_eq!(snap.devices.len(), 1);
    assert_eq!(snap.devices[0].name, "Ultra Fit");
    assert!(snap.error.is_none());

    source.set(None);
    for _ in 0..2 {
        monitor.refresh();
        assert!(matches!(events.recv_timeout(WAIT).unwrap(), MonitorEvent::Error(_)));
    }
    assert!(state.snapshot().error.is_some());

    source.set(Some(vec![device("USB\\B", "Ultra Fit")]));
    monitor.refresh();
    assert!(matches!(events.recv_timeout(WAIT).unwrap(), MonitorEvent::Updated { .. }));
    assert!(state.snapshot().error.is_none());

    source.set(None);
    monitor.refresh();
    assert!(matches!(events.recv_timeout(WAIT).unwrap(), MonitorEvent::Error(_)));
    monitor.stop();

    let log = ActivityLog::open(&log_path);
    let kinds: Vec<ActivityType> = log.activities().iter().map(|a| a.kind).collect();
    assert_eq!(kinds.first(), Some(&ActivityType::SystemStartup));
    assert_eq!(kinds.last(), Some(&ActivityType::SystemShutdown));
    let count = |k: ActivityType| kinds.iter().filter(|x| **x == k).count();
    assert_eq!(count(ActivityType::DeviceConnected), 2);
    assert_eq!(count(ActivityType::DeviceDisconnected), 1);
    assert_eq!(count(ActivityType::RefreshTriggered), 5);
    // One entry per failure streak, even though every message differed.
    assert_eq!(count(ActivityType::DeviceError), 2);

    let cruzer = log.by_device("Cruzer", 10);
    assert_eq!(cruzer.len(), 2);
    assert_eq!(cruzer[0].kind, ActivityType::DeviceDisconnected);
}

#[test]
fn restart_does_not_replay_known_devices() {
    let dir = tempfile::tempdir().unwrap();
    let log_path = dir.path().join("system_activity.json");
    let devices = vec![device("USB\\A", "Cruzer"), device("USB\\B", "Ultra Fit")];

    let (monitor, events, _) = start(FakeSource::with(devices.clone()), &log_path);
    assert!(matches!(events.recv_timeout(WAIT).unwrap(), MonitorEvent::Updated { .. }));
    monitor.stop();

    let (monitor, events, state) = start(FakeSource::with(devices), &log_path);
    match events.recv_timeout(WAIT).unwrap() {
        MonitorEvent::Updated { changes, initial } => {
            assert!(initial);
            assert!(changes.is_empty());
        }
        other => panic!("unexpected {:?}", other),
    }
    assert_eq!(state.snapshot().devices.len(), 2);
    monitor.stop();

    let log = ActivityLog::open(&log_path);
    assert_eq!(log.by_type(ActivityType::DeviceConnected, 10).len(), 2);
    assert_eq!(log.by_type(ActivityType::SystemStartup, 10).len(), 2);
}

#[test]
fn connect_failure_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let log = Arc::new(Mutex::new(ActivityLog::open(dir.path().join("log.json"))));
    let state = Arc::new(AppState::new());
    let (monitor, events) = Monitor::spawn(
        || -> Result<FakeSource> { Err(Error::Unsupported) },
        log,
        state.clone(),
        NEVER,
    );

    assert!(matches!(events.recv_timeout(WAIT).unwrap(), MonitorEvent::Error(_)));
    assert!(events.recv_timeout(WAIT).is_err());
    assert!(state.snapshot().error.is_some());
    monitor.stop();
}
