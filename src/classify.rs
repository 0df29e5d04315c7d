//! Turns raw WMI rows into [`Device`] records.
//!
//! Everything here is pure string work so it can be tested off Windows.

use crate::types::{Category, Device, DiskDrive, NetworkAdapter, PnpEntity, PortType, NOT_AVAILABLE};

const VIRTUAL_KEYWORDS: &[&str] = &[
    "virtual",
    "vmware",
    "virtualbox",
    "hyper-v",
    "hyperv",
    "tap-windows",
    "loopback",
    "pseudo",
    "vethernet",
    "vbox",
    "qemu",
    "kvm",
    "parallels",
    "vpn",
    "tunnel",
    "bridge",
    "vnic",
    "ramdisk",
    "ram disk",
];

/// Finds the first `<prefix>XXXX` with four hex digits and returns `0xXXXX`.
fn hex_after(id: &str, prefixes: &[&str]) -> Option<String> {
    let bytes = id.as_bytes();
    for start in 0..bytes.len() {
        let rest = &bytes[start..];
        for prefix in prefixes {
            if !rest.starts_with(prefix.as_bytes()) {
                continue;
            }
            let digits = rest.get(prefix.len()..prefix.len() + 4)?;
            if digits.iter().all(u8::is_ascii_hexdigit) {
                let hex: String = digits.iter().map(|b| b.to_ascii_uppercase() as char).collect();
                return Some(format!("0x{}", hex));
            }
        }
    }
    None
}

/// Extracts vendor and product ids from a PnP id such as
/// `USB\VID_046D&PID_C52B\5&2A1C` or `PCI\VEN_8086&DEV_15F3`.
pub fn parse_vid_pid(device_id: Option<&str>) -> (String, String) {
    let Some(id) = device_id.filter(|s| !s.is_empty()) else {
        return (NOT_AVAILABLE.to_string(), NOT_AVAILABLE.to_string());
    };
    let vid = hex_after(id, &["VID_", "VEN_"]).unwrap_or_else(|| NOT_AVAILABLE.to_string());
    let pid = hex_after(id, &["PID_", "DEV_"]).unwrap_or_else(|| NOT_AVAILABLE.to_string());
    (vid, pid)
}

pub fn port_type(name: &str, path: &str, manufacturer: &str) -> PortType {
    if name.is_empty() {
        return PortType::Physical;
    }
    let haystack = format!("{} {} {}", name, path, manufacturer).to_lowercase();
    if VIRTUAL_KEYWORDS.iter().any(|k| haystack.contains(k)) {
        return PortType::Virtual;
    }
    if path.to_uppercase().starts_with("ROOT\\") {
        return PortType::Virtual;
    }
    PortType::Physical
}

fn or_unknown(value: &Option<String>) -> String {
    value
        .as_deref()
        .filter(|s| !s.is_empty())
        .unwrap_or("Unknown")
        .to_string()
}

fn display_name(entity: &PnpEntity, fallback: &str) -> String {
    entity
        .Name
        .as_deref()
        .filter(|s| !s.is_empty())
        .or(entity.Description.as_deref().filter(|s| !s.is_empty()))
        .unwrap_or(fallback)
        .to_string()
}

fn pnp_device(entity: &PnpEntity, name: String, category: Category, kind: &str, with_ids: bool) -> Device {
    let path = or_unknown(&entity.DeviceID);
    let manufacturer = or_unknown(&entity.Manufacturer);
    let (vid, pid) = if with_ids {
        parse_vid_pid(entity.DeviceID.as_deref())
    } else {
        (NOT_AVAILABLE.to_string(), NOT_AVAILABLE.to_string())
    };
    Device {
        port_type: port_type(&name, &path, &manufacturer),
        name,
        category,
        kind: kind.to_string(),
        vid,
        pid,
        manufacturer,
        status: or_unknown(&entity.Status),
        path,
        driver: or_unknown(&entity.Service),
        mount_point: None,
        size_bytes: None,
    }
}

pub fn usb_device(entity: &PnpEntity) -> Device {
    let name = display_name(entity, "Unknown USB Device");
    let name_lower = name.to_lowercase();
    let desc_lower = entity.Description.as_deref().unwrap_or("").to_lowercase();

    let (kind, category) = if name_lower.contains("hub") || desc_lower.contains("hub") {
        ("USB Hub", Category::UsbPort)
    } else if name_lower.contains("controller") || desc_lower.contains("controller") {
        ("USB Controller", Category::UsbPort)
    } else if desc_lower.contains("composite") {
        ("USB Composite Device", Category::Usb)
    } else {
        ("USB Device", Category::Usb)
    };
    pnp_device(entity, name, category, kind, true)
}

pub fn hid_device(entity: &PnpEntity) -> Device {
    let name = display_name(entity, "Unknown HID Device");
    let lower = name.to_lowercase();
    let category = if lower.contains("keyboard") {
        Category::Keyboard
    } else if lower.contains("mouse") {
        Category::Mouse
    } else {
        Category::Hid
    };
    pnp_device(entity, name, category, "Human Interface Device", true)
}

pub fn bluetooth_device(entity: &PnpEntity) -> Device {
    let name = entity
        .Name
        .clone()
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "Bluetooth Device".to_string());
    pnp_device(entity, name, Category::Bluetooth, "Bluetooth", false)
}

pub fn display_device(entity: &PnpEntity) -> Device {
    let name = display_name(entity, "Generic Monitor");
    let desc = entity.Description.as_deref().unwrap_or("").to_lowercase();
    let category = if name.to_lowercase().contains("hdmi") || desc.contains("hdmi") {
        Category::Hdmi
    } else {
        Category::Display
    };
    pnp_device(entity, name, category, "Display Monitor", false)
}

/// Adapters without a name are not reported.
pub fn network_device(adapter: &NetworkAdapter) -> Option<Device> {
    let name = adapter.Name.clone().filter(|s| !s.is_empty())?;
    let manufacturer = or_unknown(&adapter.Manufacturer);
    let path = adapter
        .PNPDeviceID
        .clone()
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| NOT_AVAILABLE.to_string());

    let lower = name.to_lowercase();
    let category = if lower.contains("ethernet") || lower.contains("gbe") || lower.contains("gigabit") {
        Category::Ethernet
    } else if lower.contains("wi-fi") || lower.contains("wireless") || lower.contains("802.11") {
        Category::WiFi
    } else {
        Category::Network
    };
    let status = if adapter.NetConnectionStatus == Some(2) {
        "Connected"
    } else {
        "Disconnected"
    };

    Some(Device {
        port_type: port_type(&name, &path, &manufacturer),
        category,
        kind: adapter
            .AdapterType
            .clone()
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| "Network Adapter".to_string()),
        vid: NOT_AVAILABLE.to_string(),
        pid: NOT_AVAILABLE.to_string(),
        manufacturer,
        status: status.to_string(),
        path,
        driver: or_unknown(&adapter.ServiceName),
        mount_point: None,
        size_bytes: None,
        name,
    })
}

pub fn storage_device(drive: &DiskDrive, mount_point: Option<String>) -> Device {
    let name = drive
        .Model
        .as_deref()
        .filter(|s| !s.is_empty())
        .or(drive.Caption.as_deref().filter(|s| !s.is_empty()))
        .unwrap_or("Unknown Storage")
        .to_string();
    let manufacturer = drive
        .Manufacturer
        .clone()
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "Generic".to_string());
    let path = or_unknown(&drive.DeviceID);

    Device {
        port_type: port_type(&name, &path, &manufacturer),
        name,
        category: Category::Storage,
        kind: drive
            .MediaType
            .clone()
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| "Disk Drive".to_string()),
        vid: NOT_AVAILABLE.to_string(),
        pid: NOT_AVAILABLE.to_string(),
        manufacturer,
        status: or_unknown(&drive.Status),
        path,
        driver: "disk".to_string(),
        mount_point,
        size_bytes: drive.Size,
    }
}
