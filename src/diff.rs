use crate::types::Device;
use std::collections::BTreeMap;

/// Devices keyed by their PnP path.
pub type Snapshot = BTreeMap<String, Device>;

/// Builds a snapshot from a scan. If two categories report the same path,
/// the first one wins.
pub fn snapshot(devices: impl IntoIterator<Item = Device>) -> Snapshot {
    let mut map = Snapshot::new();
    for dev in devices {
        map.entry(dev.path.clone()).or_insert(dev);
    }
    map
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct DeviceDiff {
    pub added: Vec<Device>,
    pub removed: Vec<Device>,
}

impl DeviceDiff {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}

/// Set difference on paths. Both lists come out ordered by path.
pub fn diff(previous: &Snapshot, current: &Snapshot) -> DeviceDiff {
    let added = current
        .iter()
        .filter(|(path, _)| !previous.contains_key(*path))
        .map(|(_, d)| d.clone())
        .collect();
    let removed = previous
        .iter()
        .filter(|(path, _)| !current.contains_key(*path))
        .map(|(_, d)| d.clone())
        .collect();
    DeviceDiff { added, removed }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::types::{Category, PortType};

    pub(crate) fn device(path: &str, name: &str) -> Device {
        Device {
            name: name.to_string(),
            category: Category::Usb,
            kind: "USB Device".to_string(),
            port_type: PortType::Physical,
            vid: "0x046D".to_string(),
            pid: "0xC52B".to_string(),
            manufacturer: "Logitech".to_string(),
            status: "OK".to_string(),
            path: path.to_string(),
            driver: "usbccgp".to_string(),
            mount_point: None,
            size_bytes: None,
        }
    }

    #[test]
    fn added_and_removed() {
        let prev = snapshot(vec![device("A", "a"), device("B", "b")]);
        let cur = snapshot(vec![device("B", "b"), device("C", "c"), device("D", "d")]);
        let d = diff(&prev, &cur);
        let added: Vec<_> = d.added.iter().map(|d| d.path.as_str()).collect();
        let removed: Vec<_> = d.removed.iter().map(|d| d.path.as_str()).collect();
        assert_eq!(added, vec!["C", "D"]);
        assert_eq!(removed, vec!["A"]);
    }

    #[test]
    fn unchanged_paths_are_ignored_even_if_fields_differ() {
        let prev = snapshot(vec![device("A", "old name")]);
        let mut renamed = device("A", "new name");
        renamed.status = "Error".to_string();
        let cur = snapshot(vec![renamed]);
        assert!(diff(&prev, &cur).is_empty());
    }

    #[test]
    fn from_empty() {
        let cur = snapshot(vec![device("A", "a")]);
        let d = diff(&Snapshot::new(), &cur);
        assert_eq!(d.added.len(), 1);
        assert!(d.removed.is_empty());
    }

    #[test]
    fn duplicate_paths_keep_first() {
        let mut bt = device("A", "bt");
        bt.category = Category::Bluetooth;
        let snap = snapshot(vec![device("A", "usb"), bt]);
        assert_eq!(snap.len(), 1);
        assert_eq!(snap["A"].name, "usb");
    }
}
