//! Hardware inventory and connect/disconnect monitor.
//!
//! Devices come from a [`source::DeviceSource`] (WMI on Windows). The
//! [`monitor`] thread diffs successive scans and records every change in the
//! persistent [`activity`] log. The [`cli`] module renders all of it.

pub mod activity;
pub mod analytics;
pub mod classify;
pub mod cli;
pub mod config;
pub mod diff;
pub mod error;
pub mod logging;
pub mod monitor;
pub mod profile;
pub mod source;
pub mod state;
pub mod storage;
pub mod theme;
pub mod types;
pub mod view;

pub use error::{Error, Result};
