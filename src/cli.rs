use crate::activity::{Activity, ActivityLog, ActivityType, Severity, Statistics};
use crate::analytics::{analyze_path, AnalysisReport};
use crate::config::AppConfig;
use crate::diff::{snapshot, DeviceDiff};
use crate::monitor::{Monitor, MonitorEvent};
use crate::profile::UserProfile;
use crate::source;
use crate::state::AppState;
use crate::storage::format_bytes;
use crate::theme::ThemeColors;
use crate::types::Device;
use crate::view::{self, DeviceStats};
use anyhow::{bail, Context};
use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand};
use colored::*;
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::io::BufRead;
use std::path::PathBuf;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// Lists connected hardware, watches for connect/disconnect events and keeps
/// an activity log.
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct CliArgs {
    /// Path to a configuration file (default: device-monitor.toml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Directory holding the profile, activity log and side log
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    /// Color theme: neon, light or mono
    #[arg(long, global = true)]
    pub theme: Option<String>,

    /// Log level (e.g. trace, debug, info, warn, error)
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Polling interval for `watch`, in milliseconds
    #[arg(long, global = true)]
    pub interval_ms: Option<u64>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// List connected devices grouped by category
    List {
        /// Only show devices whose name, manufacturer or category match
        #[arg(short, long)]
        search: Option<String>,
        #[arg(long)]
        json: bool,
    },
    /// Show every known field of one device
    Show {
        /// Device path as printed by `list`
        path: String,
    },
    /// Watch for connects and disconnects (the default)
    Watch,
    /// Print activity log entries, newest first
    Log {
        #[arg(short = 'n', long, default_value_t = 50)]
        limit: usize,
        /// Only entries of this type (e.g. device_connected)
        #[arg(short = 't', long = "type")]
        kind: Option<ActivityType>,
        /// Only entries for this device name
        #[arg(short, long)]
        device: Option<String>,
    },
    /// Summarize the activity log
    Stats {
        #[arg(long)]
        json: bool,
    },
    /// Write the activity log to a JSON file
    Export {
        file: PathBuf,
        /// Only entries on or after this date (YYYY-MM-DD)
        #[arg(long)]
        since: Option<NaiveDate>,
    },
    /// Delete every activity log entry
    ClearLog,
    /// Show or edit the operator profile
    Profile {
        #[command(subcommand)]
        action: ProfileCommand,
    },
    /// Break down the files on a drive or directory by type
    Analyze {
        path: PathBuf,
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand, Debug, Clone)]
pub enum ProfileCommand {
    Show,
    Set {
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        role: Option<String>,
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        department: Option<String>,
        #[arg(long)]
        password: Option<String>,
    },
    /// Check a password against the stored hash
    Verify { password: String },
}

pub fn run(args: CliArgs, config: &AppConfig) -> anyhow::Result<()> {
    let tc = config.theme.colors();
    match args.command.unwrap_or(Command::Watch) {
        Command::List { search, json } => list(&tc, search.as_deref().unwrap_or(""), json),
        Command::Show { path } => show(&path),
        Command::Watch => watch(config, &tc),
        Command::Log { limit, kind, device } => {
            let log = ActivityLog::open(&config.activity_file);
            let entries: Vec<&Activity> = match (kind, device.as_deref()) {
                (None, None) => log.recent(limit),
                (Some(k), None) => log.by_type(k, limit),
                (None, Some(d)) => log.by_device(d, limit),
                (Some(k), Some(d)) => log
                    .by_device(d, usize::MAX)
                    .into_iter()
                    .filter(|a| a.kind == k)
                    .take(limit)
                    .collect(),
            };
            if entries.is_empty() {
                println!("{}", tc.dim("No activity recorded"));
            }
            for a in entries {
                println!("{}", render_activity(a, &tc));
            }
            Ok(())
        }
        Command::Stats { json } => {
            let stats = ActivityLog::open(&config.activity_file).statistics();
            if json {
                println!("{}", serde_json::to_string_pretty(&stats)?);
            } else {
                print!("{}", render_statistics(&stats, &tc));
            }
            Ok(())
        }
        Command::Export { file, since } => {
            let log = ActivityLog::open(&config.activity_file);
            let n = log.export(&file, since)?;
            println!("{} Exported {} entries to {}", "*".green(), n, file.display());
            Ok(())
        }
        Command::ClearLog => {
            ActivityLog::open(&config.activity_file).clear()?;
            println!("{} Activity log cleared", "*".green());
            Ok(())
        }
        Command::Profile { action } => profile(config, action, &tc),
        Command::Analyze { path, json } => {
            let report = analyze_path(&path)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print!("{}", render_analysis(&report, &tc));
            }
            Ok(())
        }
    }
}

// ── Device screens ─────────────────────────────────────────────

fn scan() -> anyhow::Result<Vec<Device>> {
    let source = source::connect()?;
    let devices = source.devices()?;
    Ok(snapshot(devices).into_values().collect())
}

fn list(tc: &ThemeColors, search: &str, json: bool) -> anyhow::Result<()> {
    let devices = scan()?;
    let filtered = view::filter(&devices, search);
    if json {
        println!("{}", serde_json::to_string_pretty(&filtered)?);
        return Ok(());
    }
    print!("{}", render_devices(&filtered, tc));
    Ok(())
}

fn show(path: &str) -> anyhow::Result<()> {
    let devices = scan()?;
    let Some(dev) = view::find_by_path(&devices, path) else {
        bail!("no connected device with path {}", path);
    };
    for line in view::detail_lines(dev) {
        println!("{}", line);
    }
    Ok(())
}

pub fn banner(tc: &ThemeColors) -> String {
    let ver = env!("CARGO_PKG_VERSION");
    let title = format!("Device Monitor v{}", ver);
    let tagline = "What's plugged in?";
    let width = 39;
    let mut out = String::new();
    let _ = writeln!(out, "{}", tc.paint(&format!("\u{2554}{}\u{2557}", "\u{2550}".repeat(width)), tc.accent));
    let _ = writeln!(out, "{}", tc.paint(&format!("\u{2551}{:^w$}\u{2551}", title, w = width), tc.accent));
    let _ = writeln!(out, "{}", tc.paint(&format!("\u{2551}{:^w$}\u{2551}", tagline, w = width), tc.accent));
    let _ = writeln!(out, "{}", tc.paint(&format!("\u{255a}{}\u{255d}", "\u{2550}".repeat(width)), tc.accent));
    out
}

fn render_stats_line(s: &DeviceStats, tc: &ThemeColors) -> String {
    format!(
        "{} {}  {} {}  {} {}  {} {}",
        tc.dim("Total"),
        s.total.to_string().bold(),
        tc.dim("USB"),
        s.usb.to_string().bold(),
        tc.dim("HID"),
        s.hid.to_string().bold(),
        tc.dim("Network"),
        s.network.to_string().bold(),
    )
}

fn device_line(d: &Device, tc: &ThemeColors) -> String {
    let dot = tc.paint("\u{25CF}", tc.status(view::status_level(&d.status)));
    let ids = d.vid_pid().map(|vp| format!(" [{}]", vp)).unwrap_or_default();
    let mount = d
        .mount_point
        .as_deref()
        .map(|m| format!(" {}", m))
        .unwrap_or_default();
    let size = d.size_bytes.map(|b| format!(" {}", format_bytes(b))).unwrap_or_default();
    format!(
        "  {} {}{}{}{} {} {}",
        dot,
        d.name,
        tc.paint(&ids, tc.yellow),
        tc.paint(&mount, tc.teal),
        tc.dim(&size),
        tc.dim(&format!("({})", d.manufacturer)),
        tc.dim(&d.port_type.to_string()),
    )
}

pub fn render_devices(devices: &[&Device], tc: &ThemeColors) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}\n", render_stats_line(&view::stats(devices.iter().copied()), tc));
    if devices.is_empty() {
        let _ = writeln!(out, "{}", tc.paint("No devices found", tc.yellow));
        return out;
    }
    for (category, group) in view::group_by_category(devices) {
        let _ = writeln!(out, "{}", tc.paint(&format!("{} ({})", category, group.len()), tc.accent).bold());
        for d in group {
            let _ = writeln!(out, "{}", device_line(d, tc));
        }
        out.push('\n');
    }
    out
}

fn change_lines(changes: &DeviceDiff, tc: &ThemeColors) -> Vec<String> {
    let ts = Local::now().format("%H:%M:%S").to_string();
    let mut lines = Vec::new();
    for d in &changes.removed {
        let vp = d.vid_pid().map(|v| format!(" [{}]", v)).unwrap_or_default();
        lines.push(format!(
            "{} {} {}{}",
            tc.dim(&format!("[{}]", ts)),
            tc.paint("\u{25BC} DISCONNECT", tc.red).bold(),
            tc.paint(&d.name, tc.red),
            tc.paint(&vp, tc.yellow)
        ));
    }
    for d in &changes.added {
        let vp = d.vid_pid().map(|v| format!(" [{}]", v)).unwrap_or_default();
        lines.push(format!(
            "{} {} {}{}",
            tc.dim(&format!("[{}]", ts)),
            tc.paint("\u{25B2} CONNECT   ", tc.green).bold(),
            tc.paint(&d.name, tc.green),
            tc.paint(&vp, tc.yellow)
        ));
    }
    lines
}

fn watch(config: &AppConfig, tc: &ThemeColors) -> anyhow::Result<()> {
    print!("{}", banner(tc));
    println!();

    let log = Arc::new(Mutex::new(ActivityLog::open(&config.activity_file)));
    let state = Arc::new(AppState::new());
    let (monitor, events) = Monitor::spawn(source::connect, log, state.clone(), config.poll_interval);

    let (input_tx, input_rx) = mpsc::channel::<String>();
    thread::spawn(move || {
        for line in std::io::stdin().lock().lines() {
            let Ok(line) = line else { break };
            if input_tx.send(line.trim().to_lowercase()).is_err() {
                break;
            }
        }
    });

    loop {
        match events.recv_timeout(Duration::from_millis(200)) {
            Ok(MonitorEvent::Updated { initial: true, .. }) => {
                let snap = state.snapshot();
                let devices: Vec<&Device> = snap.devices.iter().collect();
                print!("{}", render_devices(&devices, tc));
                println!(
                    "{}",
                    tc.dim("Watching for changes... (Enter to refresh, q to quit)")
                );
                println!("{}\n", tc.dim(&"\u{2500}".repeat(60)));
            }
            Ok(MonitorEvent::Updated { changes, .. }) => {
                for line in change_lines(&changes, tc) {
                    println!("{}", line);
                }
            }
            Ok(MonitorEvent::Error(msg)) => {
                println!("{} {}", tc.paint("\u{2716} Scan failed:", tc.red).bold(), msg);
            }
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => {
                let snap = state.snapshot();
                if let Some(err) = snap.error {
                    bail!(err);
                }
                return Ok(());
            }
        }

        while let Ok(input) = input_rx.try_recv() {
            match input.as_str() {
                "q" | "quit" | "exit" => {
                    monitor.stop();
                    return Ok(());
                }
                "" | "r" | "refresh" => monitor.refresh(),
                _ => println!("{}", tc.dim("Enter: refresh   q: quit")),
            }
        }
    }
}

// ── Activity screens ───────────────────────────────────────────

fn severity_glyph(severity: Severity) -> &'static str {
    match severity {
        Severity::Error => "\u{2716}",
        Severity::Warning => "\u{25BC}",
        Severity::Success => "\u{25B2}",
        Severity::Info => "\u{2022}",
    }
}

pub fn render_activity(a: &Activity, tc: &ThemeColors) -> String {
    let color = tc.severity(a.severity);
    let details = if a.details.is_empty() {
        String::new()
    } else {
        let joined = a
            .details
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join(" ");
        format!(" {}", tc.dim(&joined))
    };
    format!(
        "{} {} {} {} {}{}",
        tc.dim(&format!("[{}]", a.timestamp.format("%Y-%m-%d %H:%M:%S"))),
        tc.paint(severity_glyph(a.severity), color),
        tc.paint(&format!("{:<19}", a.kind.as_str()), color),
        a.device_name.bold(),
        a.message,
        details
    )
}

pub fn render_statistics(s: &Statistics, tc: &ThemeColors) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", tc.paint("Activity statistics", tc.accent).bold());
    let _ = writeln!(out, "  {:<28}{}", "Total entries", s.total_activities);
    let _ = writeln!(out, "  {:<28}{}", "Today", s.today_activities);
    let _ = writeln!(out, "  {:<28}{}", "Connected today", s.devices_connected_today);
    let _ = writeln!(out, "  {:<28}{}", "Disconnected today", s.devices_disconnected_today);
    let fmt_ts = |t: Option<chrono::NaiveDateTime>| {
        t.map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_else(|| "-".to_string())
    };
    let _ = writeln!(out, "  {:<28}{}", "Oldest entry", fmt_ts(s.oldest_entry));
    let _ = writeln!(out, "  {:<28}{}", "Newest entry", fmt_ts(s.newest_entry));

    let _ = writeln!(out, "\n{}", tc.paint("By severity", tc.accent).bold());
    for (sev, n) in &s.by_severity {
        let label = format!("{:?}", sev).to_lowercase();
        let _ = writeln!(out, "  {} {}", tc.paint(&format!("{:<27}", label), tc.severity(*sev)), n);
    }
    if !s.by_type.is_empty() {
        let _ = writeln!(out, "\n{}", tc.paint("By type", tc.accent).bold());
        for (kind, n) in &s.by_type {
            let _ = writeln!(out, "  {:<28}{}", kind.as_str(), n);
        }
    }
    out
}

// ── Profile ────────────────────────────────────────────────────

pub fn render_profile(p: &UserProfile, tc: &ThemeColors) -> String {
    let hash = match p.password_hash.as_deref() {
        Some(h) if h.len() > 30 => format!("{}...", &h[..30]),
        Some(h) => h.to_string(),
        None => "(no password set)".to_string(),
    };
    let mut out = String::new();
    let _ = writeln!(out, "{}", tc.paint(&p.name, tc.accent).bold());
    let _ = writeln!(out, "{}\n", tc.paint(&p.role, tc.teal));
    for (k, v) in [
        ("Email", p.email.as_str()),
        ("Department", p.department.as_str()),
        ("Unique ID", p.unique_id.as_str()),
        ("Security key", p.security_key.as_str()),
        ("Password hash", hash.as_str()),
    ] {
        let _ = writeln!(out, "  {} {}", tc.dim(&format!("{:<14}", k)), v);
    }
    out
}

fn profile(config: &AppConfig, action: ProfileCommand, tc: &ThemeColors) -> anyhow::Result<()> {
    let path = &config.profile_file;
    let mut p = UserProfile::load(path);
    match action {
        ProfileCommand::Show => {
            print!("{}", render_profile(&p, tc));
            Ok(())
        }
        ProfileCommand::Set {
            name,
            role,
            email,
            department,
            password,
        } => {
            let mut changed = Vec::new();
            for (field, value, slot) in [
                ("name", name, &mut p.name),
                ("role", role, &mut p.role),
                ("email", email, &mut p.email),
                ("department", department, &mut p.department),
            ] {
                if let Some(v) = value {
                    *slot = v;
                    changed.push(field);
                }
            }
            if let Some(pw) = password {
                p.set_password(&pw);
                changed.push("password");
            }
            if changed.is_empty() {
                bail!("nothing to update; pass at least one of --name, --role, --email, --department, --password");
            }
            p.save(path)
                .with_context(|| format!("failed to save profile to {}", path.display()))?;

            let mut log = ActivityLog::open(&config.activity_file);
            let details = BTreeMap::from([("fields".to_string(), changed.join(","))]);
            log.log(ActivityType::ProfileUpdated, "Profile updated", p.name.clone(), details)?;

            println!("{} Profile updated", "*".green());
            print!("{}", render_profile(&p, tc));
            Ok(())
        }
        ProfileCommand::Verify { password } => {
            if p.verify_password(&password) {
                println!("{} Password matches", "*".green());
                Ok(())
            } else {
                bail!("password does not match");
            }
        }
    }
}

// ── Analytics ──────────────────────────────────────────────────

pub fn render_analysis(r: &AnalysisReport, tc: &ThemeColors) -> String {
    let mut out = String::new();
    let rule = "=".repeat(50);
    let _ = writeln!(out, "{}", tc.dim(&rule));
    let _ = writeln!(out, " {}", tc.paint("DRIVE ANALYSIS REPORT", tc.accent).bold());
    let _ = writeln!(out, "{}", tc.dim(&rule));
    let _ = writeln!(out, " Total Files: {}", r.total_files);
    let _ = writeln!(out, " Total Size:  {} GB", r.total_size_gb);
    let _ = writeln!(out, "{}", tc.dim(&"-".repeat(50)));
    for c in &r.details {
        let _ = writeln!(
            out,
            "\n {} ({} files, {} MB)",
            tc.paint(&c.category.to_uppercase(), tc.teal).bold(),
            c.total_count,
            c.total_size_mb
        );
        for e in &c.file_types {
            let ext = e.extension.trim_start_matches('.');
            let ext = if ext.is_empty() { "no-ext" } else { ext };
            let _ = writeln!(out, "   \u{2022} {:<8} : {}", ext, e.count);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diff::tests::device;
    use crate::theme::Theme;

    fn plain() -> ThemeColors {
        colored::control::set_override(false);
        Theme::Mono.colors()
    }

    #[test]
    fn device_list_groups_and_counts() {
        let tc = plain();
        let mut hub = device("USB\\HUB", "Generic USB Hub");
        hub.category = crate::types::Category::UsbPort;
        let rx = device("USB\\RX", "Unifying Receiver");
        let out = render_devices(&[&rx, &hub], &tc);
        assert!(out.contains("Total 2"));
        assert!(out.contains("USB 1"));
        assert!(out.contains("USB (1)"));
        assert!(out.contains("USB Port (1)"));
        assert!(out.contains("Unifying Receiver [0x046D:0xC52B]"));
    }

    #[test]
    fn empty_device_list() {
        let out = render_devices(&[], &plain());
        assert!(out.contains("No devices found"));
    }

    #[test]
    fn profile_hash_is_truncated() {
        let mut p = UserProfile::default();
        p.set_password("secret");
        let out = render_profile(&p, &plain());
        let hash = p.password_hash.clone().unwrap();
        assert!(out.contains(&format!("{}...", &hash[..30])));
        assert!(!out.contains(&hash));
    }

    #[test]
    fn args_parse_log_filters() {
        let args = CliArgs::parse_from(["device-monitor", "log", "-n", "5", "--type", "device_connected"]);
        match args.command {
            Some(Command::Log { limit, kind, device }) => {
                assert_eq!(limit, 5);
                assert_eq!(kind, Some(ActivityType::DeviceConnected));
                assert!(device.is_none());
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn args_parse_export_since() {
        let args = CliArgs::parse_from(["device-monitor", "export", "out.json", "--since", "2025-01-31"]);
        match args.command {
            Some(Command::Export { since, .. }) => {
                assert_eq!(since, NaiveDate::from_ymd_opt(2025, 1, 31));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn no_subcommand_means_watch() {
        let args = CliArgs::parse_from(["device-monitor"]);
        assert!(args.command.is_none());
    }
}
