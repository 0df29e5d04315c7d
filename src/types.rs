use serde::{Deserialize, Serialize};
use std::fmt;

pub const NOT_AVAILABLE: &str = "N/A";

// ── WMI rows ───────────────────────────────────────────────────

#[derive(Deserialize, Debug, Clone, Default)]
#[allow(non_snake_case)]
pub struct PnpEntity {
    pub Name: Option<String>,
    pub DeviceID: Option<String>,
    pub Description: Option<String>,
    pub Manufacturer: Option<String>,
    pub Status: Option<String>,
    pub Service: Option<String>,
}

#[derive(Deserialize, Debug, Clone, Default)]
#[allow(non_snake_case)]
pub struct NetworkAdapter {
    pub Name: Option<String>,
    pub Manufacturer: Option<String>,
    pub PNPDeviceID: Option<String>,
    pub AdapterType: Option<String>,
    pub NetConnectionStatus: Option<u16>,
    pub ServiceName: Option<String>,
}

#[derive(Deserialize, Debug, Clone, Default)]
#[allow(non_snake_case)]
pub struct DiskDrive {
    pub DeviceID: Option<String>,
    pub Model: Option<String>,
    pub Caption: Option<String>,
    pub Manufacturer: Option<String>,
    pub MediaType: Option<String>,
    pub Status: Option<String>,
    pub Size: Option<u64>,
}

// ── Normalized device ──────────────────────────────────────────

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Category {
    #[serde(rename = "USB")]
    Usb,
    #[serde(rename = "USB Port")]
    UsbPort,
    #[serde(rename = "HID")]
    Hid,
    Keyboard,
    Mouse,
    Network,
    Ethernet,
    #[serde(rename = "Wi-Fi")]
    WiFi,
    Storage,
    Bluetooth,
    Display,
    #[serde(rename = "HDMI")]
    Hdmi,
}

impl Category {
    pub fn label(self) -> &'static str {
        match self {
            Category::Usb => "USB",
            Category::UsbPort => "USB Port",
            Category::Hid => "HID",
            Category::Keyboard => "Keyboard",
            Category::Mouse => "Mouse",
            Category::Network => "Network",
            Category::Ethernet => "Ethernet",
            Category::WiFi => "Wi-Fi",
            Category::Storage => "Storage",
            Category::Bluetooth => "Bluetooth",
            Category::Display => "Display",
            Category::Hdmi => "HDMI",
        }
    }

    pub fn is_hid(self) -> bool {
        matches!(self, Category::Hid | Category::Keyboard | Category::Mouse)
    }

    pub fn is_network(self) -> bool {
        matches!(self, Category::Network | Category::Ethernet | Category::WiFi)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PortType {
    Physical,
    Virtual,
}

impl fmt::Display for PortType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PortType::Physical => f.write_str("Physical"),
            PortType::Virtual => f.write_str("Virtual"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Device {
    pub name: String,
    pub category: Category,
    #[serde(rename = "type")]
    pub kind: String,
    pub port_type: PortType,
    pub vid: String,
    pub pid: String,
    pub manufacturer: String,
    pub status: String,
    /// PnP device path; identifies the device across snapshots.
    pub path: String,
    pub driver: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mount_point: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size_bytes: Option<u64>,
}

impl Device {
    pub fn vid_pid(&self) -> Option<String> {
        if self.vid == NOT_AVAILABLE || self.pid == NOT_AVAILABLE {
            return None;
        }
        Some(format!("{}:{}", self.vid, self.pid))
    }
}
