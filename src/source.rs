//! Device enumeration backends.

use crate::error::Result;
use crate::types::Device;

/// Something that can list the devices currently attached to the machine.
///
/// Implementations are not required to be `Send`: a WMI connection is bound
/// to the COM apartment of the thread that opened it, so the monitor builds
/// its source on the polling thread itself.
pub trait DeviceSource {
    fn devices(&self) -> Result<Vec<Device>>;
}

impl<S: DeviceSource + ?Sized> DeviceSource for Box<S> {
    fn devices(&self) -> Result<Vec<Device>> {
        (**self).devices()
    }
}

/// Opens the platform's device source.
#[cfg(windows)]
pub fn connect() -> Result<Box<dyn DeviceSource>> {
    Ok(Box::new(wmi_source::WmiSource::new()?))
}

#[cfg(not(windows))]
pub fn connect() -> Result<Box<dyn DeviceSource>> {
    Err(crate::error::Error::Unsupported)
}

#[cfg(windows)]
pub mod wmi_source {
    use super::DeviceSource;
    use crate::classify;
    use crate::error::{Error, Result};
    use crate::storage;
    use crate::types::{Device, DiskDrive, NetworkAdapter, PnpEntity};
    use serde::de::DeserializeOwned;
    use wmi::{COMLibrary, WMIConnection};

    const PNP_FIELDS: &str = "Name, DeviceID, Description, Manufacturer, Status, Service";

    pub struct WmiSource {
        wmi: WMIConnection,
    }

    impl WmiSource {
        pub fn new() -> Result<Self> {
            let com = COMLibrary::new().map_err(|e| Error::Wmi(format!("COM init failed: {}", e)))?;
            let wmi =
                WMIConnection::new(com).map_err(|e| Error::Wmi(format!("WMI connect failed: {}", e)))?;
            Ok(Self { wmi })
        }

        /// A failing category is logged and contributes nothing.
        fn query<T: DeserializeOwned>(&self, label: &str, query: &str) -> Vec<T> {
            match self.wmi.raw_query(query) {
                Ok(rows) => rows,
                Err(e) => {
                    tracing::error!(category = label, error = %e, "WMI query failed");
                    vec![]
                }
            }
        }

        fn pnp(&self, label: &str, filter: &str) -> Vec<PnpEntity> {
            self.query(
                label,
                &format!("SELECT {} FROM Win32_PnPEntity WHERE {}", PNP_FIELDS, filter),
            )
        }
    }

    impl DeviceSource for WmiSource {
        fn devices(&self) -> Result<Vec<Device>> {
            let mut devices = Vec::new();

            for e in self.pnp("usb", "DeviceID LIKE 'USB%'") {
                devices.push(classify::usb_device(&e));
            }
            for e in self.pnp("hid", "DeviceID LIKE 'HID%'") {
                devices.push(classify::hid_device(&e));
            }

            let adapters: Vec<NetworkAdapter> = self.query(
                "network",
                "SELECT Name, Manufacturer, PNPDeviceID, AdapterType, NetConnectionStatus, ServiceName \
                 FROM Win32_NetworkAdapter WHERE PhysicalAdapter = TRUE",
            );
            devices.extend(adapters.iter().filter_map(classify::network_device));

            let drives: Vec<DiskDrive> = self.query(
                "storage",
                "SELECT DeviceID, Model, Caption, Manufacturer, MediaType, Status, Size \
                 FROM Win32_DiskDrive",
            );
            for d in &drives {
                let mount = d.DeviceID.as_deref().and_then(storage::mount_point);
                devices.push(classify::storage_device(d, mount));
            }

            for e in self.pnp("bluetooth", "DeviceID LIKE 'BTH%' OR Service = 'BTHUSB'") {
                devices.push(classify::bluetooth_device(&e));
            }
            for e in self.pnp("display", "Service = 'monitor' OR DeviceID LIKE 'DISPLAY%'") {
                devices.push(classify::display_device(&e));
            }

            tracing::debug!(count = devices.len(), "device scan complete");
            Ok(devices)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(not(windows))]
    #[test]
    fn connect_reports_unsupported_off_windows() {
        assert!(matches!(connect(), Err(crate::error::Error::Unsupported)));
    }
}
