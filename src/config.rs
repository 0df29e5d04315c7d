//! Configuration merged from defaults, `device-monitor.toml`, the
//! environment and command-line flags (in rising precedence).

use crate::cli::CliArgs;
use crate::error::Result;
use crate::monitor::DEFAULT_POLL_INTERVAL;
use crate::theme::Theme;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const CONFIG_FILE: &str = "device-monitor.toml";
pub const ENV_PREFIX: &str = "DEVICE_MONITOR_";

/// Settings as they appear in the config file or environment. Unset
/// fields are left out when layered so they never mask a lower layer.
#[derive(Deserialize, Serialize, Debug, Default, Clone, PartialEq)]
pub struct FileConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub poll_interval_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub theme: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_level: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile_file: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub activity_file: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_file: Option<PathBuf>,
}

impl FileConfig {
    fn defaults() -> Self {
        Self {
            data_dir: Some(PathBuf::from(".")),
            poll_interval_ms: Some(DEFAULT_POLL_INTERVAL.as_millis() as u64),
            theme: Some(Theme::default().label().to_string()),
            log_level: Some("info".to_string()),
            profile_file: Some(PathBuf::from("user_profile.json")),
            activity_file: Some(PathBuf::from("system_activity.json")),
            log_file: Some(PathBuf::from("device-monitor.log")),
        }
    }
}

/// Final configuration with every path resolved against `data_dir`.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub data_dir: PathBuf,
    pub poll_interval: Duration,
    pub theme: Theme,
    pub log_level: String,
    pub profile_file: PathBuf,
    pub activity_file: PathBuf,
    pub log_file: PathBuf,
}

fn resolve(dir: &Path, file: PathBuf) -> PathBuf {
    if file.is_absolute() {
        file
    } else {
        dir.join(file)
    }
}

impl AppConfig {
    pub fn load(args: &CliArgs) -> Result<Self> {
        let config_path = args
            .config
            .clone()
            .unwrap_or_else(|| PathBuf::from(CONFIG_FILE));
        let figment = Figment::new()
            .merge(Serialized::defaults(FileConfig::defaults()))
            .merge(Toml::file(config_path))
            .merge(Env::prefixed(ENV_PREFIX));
        Self::from_figment(figment, args)
    }

    /// Applies CLI overrides on top of an already-layered figment.
    pub fn from_figment(figment: Figment, args: &CliArgs) -> Result<Self> {
        let mut merged: FileConfig = figment.extract()?;

        if let Some(dir) = &args.data_dir {
            merged.data_dir = Some(dir.clone());
        }
        if let Some(theme) = &args.theme {
            merged.theme = Some(theme.clone());
        }
        if let Some(level) = &args.log_level {
            merged.log_level = Some(level.clone());
        }
        if let Some(ms) = args.interval_ms {
            merged.poll_interval_ms = Some(ms);
        }

        let defaults = FileConfig::defaults();
        let data_dir = merged.data_dir.unwrap_or_else(|| PathBuf::from("."));
        let file = |v: Option<PathBuf>, d: Option<PathBuf>| resolve(&data_dir, v.or(d).unwrap_or_default());

        Ok(AppConfig {
            poll_interval: Duration::from_millis(
                merged
                    .poll_interval_ms
                    .filter(|ms| *ms > 0)
                    .unwrap_or(DEFAULT_POLL_INTERVAL.as_millis() as u64),
            ),
            theme: Theme::from_label(merged.theme.as_deref().unwrap_or_default()),
            log_level: merged.log_level.unwrap_or_else(|| "info".to_string()),
            profile_file: file(merged.profile_file, defaults.profile_file),
            activity_file: file(merged.activity_file, defaults.activity_file),
            log_file: file(merged.log_file, defaults.log_file),
            data_dir,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    fn base() -> Figment {
        Figment::new().merge(Serialized::defaults(FileConfig::defaults()))
    }

    #[test]
    fn defaults_resolve_under_data_dir() {
        let args = CliArgs::parse_from(["device-monitor", "list"]);
        let cfg = AppConfig::from_figment(base(), &args).unwrap();
        assert_eq!(cfg.poll_interval, Duration::from_secs(5));
        assert_eq!(cfg.theme, Theme::Neon);
        assert_eq!(cfg.activity_file, PathBuf::from("./system_activity.json"));
        assert_eq!(cfg.profile_file, PathBuf::from("./user_profile.json"));
    }

    #[test]
    fn file_values_then_cli_overrides() {
        let file = FileConfig {
            data_dir: Some(PathBuf::from("/var/lib/devmon")),
            poll_interval_ms: Some(2000),
            theme: Some("light".into()),
            ..Default::default()
        };
        let fig = base().merge(Serialized::defaults(file));

        let args = CliArgs::parse_from(["device-monitor", "list"]);
        let cfg = AppConfig::from_figment(fig.clone(), &args).unwrap();
        assert_eq!(cfg.poll_interval, Duration::from_millis(2000));
        assert_eq!(cfg.theme, Theme::Light);
        assert_eq!(cfg.log_file, PathBuf::from("/var/lib/devmon/device-monitor.log"));

        let args = CliArgs::parse_from([
            "device-monitor",
            "--theme",
            "mono",
            "--interval-ms",
            "250",
            "--data-dir",
            "/tmp/dm",
            "list",
        ]);
        let cfg = AppConfig::from_figment(fig, &args).unwrap();
        assert_eq!(cfg.theme, Theme::Mono);
        assert_eq!(cfg.poll_interval, Duration::from_millis(250));
        assert_eq!(cfg.data_dir, PathBuf::from("/tmp/dm"));
    }

    #[test]
    fn zero_interval_falls_back() {
        let fig = base().merge(Serialized::defaults(FileConfig {
            poll_interval_ms: Some(0),
            ..Default::default()
        }));
        let args = CliArgs::parse_from(["device-monitor", "list"]);
        let cfg = AppConfig::from_figment(fig, &args).unwrap();
        assert_eq!(cfg.poll_interval, DEFAULT_POLL_INTERVAL);
    }
}
