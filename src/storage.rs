use serde::Deserialize;
use std::process::Command;

pub fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = 1024 * KB;
    const GB: u64 = 1024 * MB;
    const TB: u64 = 1024 * GB;
    if bytes >= TB {
        format!("{:.2} TB", bytes as f64 / TB as f64)
    } else if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.0} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

/// Disk index from a DeviceID like `\\.\PHYSICALDRIVE2`.
pub fn disk_index(device_id: &str) -> Option<u32> {
    let upper = device_id.to_uppercase();
    let (_, tail) = upper.rsplit_once("PHYSICALDRIVE")?;
    tail.parse().ok()
}

#[derive(Deserialize)]
#[allow(non_snake_case)]
struct PsVolume {
    DriveLetter: Option<String>,
}

/// Drive letters (`E:`) out of `ConvertTo-Json` output. PowerShell emits a
/// bare object instead of an array when there is exactly one result.
pub fn parse_drive_letters(stdout: &str) -> Vec<String> {
    let trimmed = stdout.trim();
    if trimmed.is_empty() {
        return vec![];
    }
    let volumes: Vec<PsVolume> = match serde_json::from_str::<Vec<PsVolume>>(trimmed) {
        Ok(v) => v,
        Err(_) => match serde_json::from_str::<PsVolume>(trimmed) {
            Ok(v) => vec![v],
            Err(e) => {
                tracing::warn!(error = %e, raw = trimmed, "volume JSON parse failed");
                return vec![];
            }
        },
    };
    volumes
        .into_iter()
        .filter_map(|v| v.DriveLetter.filter(|l| !l.is_empty()))
        .map(|l| format!("{}:", l))
        .collect()
}

/// Looks up the first lettered volume on a physical disk.
pub fn mount_point(device_id: &str) -> Option<String> {
    let Some(index) = disk_index(device_id) else {
        tracing::debug!(device_id, "can't extract disk index");
        return None;
    };

    let ps_script = format!(
        "$ErrorActionPreference='SilentlyContinue'; \
         Get-Partition -DiskNumber {} | Where-Object {{ $_.DriveLetter }} | ForEach-Object {{ \
           [PSCustomObject]@{{ DriveLetter=[string]$_.DriveLetter }} \
         }} | ConvertTo-Json -Compress",
        index
    );

    let output = match Command::new("powershell")
        .args(["-NoProfile", "-Command", &ps_script])
        .output()
    {
        Ok(o) => o,
        Err(e) => {
            tracing::warn!(error = %e, "PowerShell volume lookup failed");
            return None;
        }
    };

    let letters = parse_drive_letters(&String::from_utf8_lossy(&output.stdout));
    tracing::debug!(index, volumes = letters.len(), "volume lookup");
    letters.into_iter().next()
}
