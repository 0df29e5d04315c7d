//! Read-side helpers shared by the list and watch screens.

use crate::types::{Category, Device, NOT_AVAILABLE};
use serde::Serialize;
use std::collections::BTreeMap;

/// Case-insensitive match on name, manufacturer or category. An empty query
/// keeps everything.
pub fn filter<'a>(devices: &'a [Device], query: &str) -> Vec<&'a Device> {
    let q = query.trim().to_lowercase();
    devices
        .iter()
        .filter(|d| {
            q.is_empty()
                || d.name.to_lowercase().contains(&q)
                || d.manufacturer.to_lowercase().contains(&q)
                || d.category.label().to_lowercase().contains(&q)
        })
        .collect()
}

/// Groups devices by category label, labels in alphabetical order and
/// devices by name within a group.
pub fn group_by_category<'a>(devices: &[&'a Device]) -> BTreeMap<&'static str, Vec<&'a Device>> {
    let mut groups: BTreeMap<&'static str, Vec<&'a Device>> = BTreeMap::new();
    for d in devices {
        groups.entry(d.category.label()).or_default().push(*d);
    }
    for list in groups.values_mut() {
        list.sort_by_key(|d| d.name.to_lowercase());
    }
    groups
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DeviceStats {
    pub total: usize,
    pub usb: usize,
    pub hid: usize,
    pub network: usize,
}

pub fn stats<'a>(devices: impl IntoIterator<Item = &'a Device>) -> DeviceStats {
    let mut s = DeviceStats::default();
    for d in devices {
        s.total += 1;
        if d.category == Category::Usb {
            s.usb += 1;
        }
        if d.category.is_hid() {
            s.hid += 1;
        }
        if d.category.is_network() {
            s.network += 1;
        }
    }
    s
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusLevel {
    Good,
    Bad,
    Unknown,
}

pub fn status_level(status: &str) -> StatusLevel {
    let s = status.to_lowercase();
    // "disconnected" contains "connected", so check the bad words first.
    if s.contains("disconnected") || s.contains("error") {
        StatusLevel::Bad
    } else if s.contains("ok") || s.contains("connected") {
        StatusLevel::Good
    } else {
        StatusLevel::Unknown
    }
}

/// `Key: value` lines describing a device, skipping unknown values.
pub fn detail_lines(d: &Device) -> Vec<String> {
    let category = d.category.to_string();
    let port = d.port_type.to_string();
    let size = d.size_bytes.map(crate::storage::format_bytes);
    let fields: [(&str, Option<&str>); 12] = [
        ("Name", Some(&d.name)),
        ("Category", Some(&category)),
        ("Type", Some(&d.kind)),
        ("Port", Some(&port)),
        ("Status", Some(&d.status)),
        ("Manufacturer", Some(&d.manufacturer)),
        ("VID", Some(&d.vid)),
        ("PID", Some(&d.pid)),
        ("Driver", Some(&d.driver)),
        ("Path", Some(&d.path)),
        ("Mount", d.mount_point.as_deref()),
        ("Size", size.as_deref()),
    ];
    fields
        .into_iter()
        .filter_map(|(k, v)| {
            let v = v?.trim();
            (!v.is_empty() && v != NOT_AVAILABLE).then(|| format!("{}: {}", k, v))
        })
        .collect()
}

pub fn find_by_path<'a>(devices: &'a [Device], path: &str) -> Option<&'a Device> {
    devices
        .iter()
        .find(|d| d.path == path)
        .or_else(|| devices.iter().find(|d| d.path.eq_ignore_ascii_case(path)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diff::tests::device;

    fn with_category(path: &str, name: &str, category: Category) -> Device {
        let mut d = device(path, name);
        d.category = category;
        d
    }

    #[test]
    fn filter_matches_name_manufacturer_category() {
        let mut other = with_category("2", "Intel Wi-Fi", Category::WiFi);
        other.manufacturer = "Intel".into();
        let devices = vec![device("1", "Unifying Receiver"), other];

        assert_eq!(filter(&devices, "").len(), 2);
        assert_eq!(filter(&devices, "RECEIVER")[0].path, "1");
        assert_eq!(filter(&devices, "logitech")[0].path, "1");
        assert_eq!(filter(&devices, "wi-fi")[0].path, "2");
        assert!(filter(&devices, "bluetooth").is_empty());
    }

    #[test]
    fn grouping_sorts_categories_and_names() {
        let devices = vec![
            with_category("1", "zeta", Category::Usb),
            with_category("2", "Alpha", Category::Usb),
            with_category("3", "Monitor", Category::Display),
        ];
        let refs: Vec<&Device> = devices.iter().collect();
        let groups = group_by_category(&refs);
        let keys: Vec<_> = groups.keys().copied().collect();
        assert_eq!(keys, vec!["Display", "USB"]);
        assert_eq!(groups["USB"][0].name, "Alpha");
    }

    #[test]
    fn stats_counts_families() {
        let devices = vec![
            with_category("1", "a", Category::Usb),
            with_category("2", "b", Category::UsbPort),
            with_category("3", "c", Category::Keyboard),
            with_category("4", "d", Category::Hid),
            with_category("5", "e", Category::Ethernet),
        ];
        assert_eq!(
            stats(&devices),
            DeviceStats {
                total: 5,
                usb: 1,
                hid: 2,
                network: 1
            }
        );
    }

    #[test]
    fn status_levels() {
        assert_eq!(status_level("OK"), StatusLevel::Good);
        assert_eq!(status_level("Connected"), StatusLevel::Good);
        assert_eq!(status_level("Disconnected"), StatusLevel::Bad);
        assert_eq!(status_level("Error"), StatusLevel::Bad);
        assert_eq!(status_level("Degraded"), StatusLevel::Unknown);
    }

    #[test]
    fn detail_lines_skip_unknowns() {
        let mut d = device(r"USB\VID_046D&PID_C52B\1", "Receiver");
        d.vid = "N/A".into();
        let lines = detail_lines(&d);
        assert_eq!(lines[0], "Name: Receiver");
        assert!(lines.iter().any(|l| l == "Category: USB"));
        assert!(!lines.iter().any(|l| l.starts_with("VID")));
        assert!(!lines.iter().any(|l| l.starts_with("Mount")));
    }

    #[test]
    fn find_by_path_is_case_tolerant() {
        let devices = vec![device(r"USB\VID_046D&PID_C52B\1", "Receiver")];
        assert!(find_by_path(&devices, r"usb\vid_046d&pid_c52b\1").is_some());
        assert!(find_by_path(&devices, "missing").is_none());
    }
}
