//! Read-only view of the upstream update checker's files.
//!
//! The checker itself runs elsewhere. It keeps two files:
//!
//! - a state file with a single line `lastCheckedTimestamp:lastNotifiedVersion`
//!   (Unix seconds, version may be empty);
//! - a config file of `KEY=value` lines with `REPO`, `CHANNEL` and
//!   `INTERVAL_HOURS`.
//!
//! Nothing here writes to either file or touches the network.

use crate::error::UpdateStatusError;
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};

pub const DEFAULT_CHANNEL: &str = "stable";
pub const DEFAULT_INTERVAL_HOURS: u64 = 24;

/// Settings of the update checker
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateCheckConfig {
    pub repository: Option<String>,
    pub channel: String,
    pub interval_hours: u64,
}

impl Default for UpdateCheckConfig {
    fn default() -> Self {
        Self {
            repository: None,
            channel: DEFAULT_CHANNEL.to_string(),
            interval_hours: DEFAULT_INTERVAL_HOURS,
        }
    }
}

/// Last persisted result of the update checker
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateCheckState {
    pub last_checked: DateTime<Utc>,
    pub last_notified_version: Option<String>,
}

/// Combined status as reported to the agent
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateStatus {
    pub config: UpdateCheckConfig,
    pub config_found: bool,
    pub state: Option<UpdateCheckState>,
}

impl UpdateStatus {
    pub fn next_check_due(&self) -> Option<DateTime<Utc>> {
        let state = self.state.as_ref()?;
        let hours = i64::try_from(self.config.interval_hours).ok()?;
        state
            .last_checked
            .checked_add_signed(chrono::Duration::try_hours(hours)?)
    }

    pub fn render(&self, now: DateTime<Utc>) -> String {
        let mut out = String::from("Update status\n");

        let repository = self
            .config
            .repository
            .as_deref()
            .unwrap_or("(not configured)");
        out.push_str(&format!("  Repository: {}\n", repository));
        out.push_str(&format!("  Channel: {}\n", self.config.channel));
        out.push_str(&format!(
            "  Check interval: {}h\n",
            self.config.interval_hours
        ));
        if !self.config_found {
            out.push_str("  (config file not found, showing defaults)\n");
        }

        match &self.state {
            None => out.push_str("  Last checked: never\n"),
            Some(state) => {
                out.push_str(&format!(
                    "  Last checked: {}\n",
                    format_time(state.last_checked)
                ));
                out.push_str(&format!(
                    "  Last notified version: {}\n",
                    state.last_notified_version.as_deref().unwrap_or("none")
                ));
            }
        }

        if let Some(due) = self.next_check_due() {
            let when = if due <= now { " (overdue)" } else { "" };
            out.push_str(&format!("  Next check due: {}{}\n", format_time(due), when));
        }

        out
    }
}

fn format_time(time: DateTime<Utc>) -> String {
    time.format("%Y-%m-%d %H:%M:%S UTC").to_string()
}

/// Locations of the checker's files
#[derive(Debug, Clone)]
pub struct UpdateStatusReader {
    state_file: PathBuf,
    config_file: PathBuf,
}

impl UpdateStatusReader {
    pub fn new(state_file: impl Into<PathBuf>, config_file: impl Into<PathBuf>) -> Self {
        Self {
            state_file: state_file.into(),
            config_file: config_file.into(),
        }
    }

    pub fn read(&self) -> Result<UpdateStatus, UpdateStatusError> {
        let (config, config_found) = match read_optional(&self.config_file)? {
            Some(content) => (parse_config(&content, &self.config_file)?, true),
            None => (UpdateCheckConfig::default(), false),
        };

        let state = match read_optional(&self.state_file)? {
            Some(content) if !content.trim().is_empty() => {
                Some(parse_state(&content, &self.state_file)?)
            }
            _ => None,
        };

        Ok(UpdateStatus {
            config,
            config_found,
            state,
        })
    }
}

fn read_optional(path: &Path) -> Result<Option<String>, UpdateStatusError> {
    match std::fs::read_to_string(path) {
        Ok(content) => Ok(Some(content)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(source) => Err(UpdateStatusError::Io {
            path: path.to_path_buf(),
            source,
        }),
    }
}

fn parse_state(content: &str, path: &Path) -> Result<UpdateCheckState, UpdateStatusError> {
    let malformed = |reason: String| UpdateStatusError::MalformedState {
        path: path.to_path_buf(),
        reason,
    };

    let line = content.lines().next().unwrap_or("").trim();
    let (timestamp, version) = line
        .split_once(':')
        .ok_or_else(|| malformed(format!("expected 'timestamp:version', got '{}'", line)))?;

    let seconds: i64 = timestamp
        .trim()
        .parse()
        .map_err(|_| malformed(format!("invalid timestamp '{}'", timestamp)))?;
    let last_checked = DateTime::from_timestamp(seconds, 0)
        .ok_or_else(|| malformed(format!("timestamp out of range: {}", seconds)))?;

    let version = version.trim();
    Ok(UpdateCheckState {
        last_checked,
        last_notified_version: (!version.is_empty()).then(|| version.to_string()),
    })
}

fn parse_config(content: &str, path: &Path) -> Result<UpdateCheckConfig, UpdateStatusError> {
    let mut config = UpdateCheckConfig::default();

    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let Some((key, value)) = line.split_once('=') else {
            continue;
        };
        let key = key.trim().trim_start_matches("export ").trim();
        let value = unquote(value.trim());

        match key.to_ascii_uppercase().as_str() {
            "REPO" => config.repository = (!value.is_empty()).then(|| value.to_string()),
            "CHANNEL" if !value.is_empty() => config.channel = value.to_string(),
            "INTERVAL_HOURS" => {
                config.interval_hours =
                    value
                        .parse()
                        .map_err(|_| UpdateStatusError::MalformedConfig {
                            path: path.to_path_buf(),
                            reason: format!("INTERVAL_HOURS must be a whole number, got '{}'", value),
                        })?;
            }
            _ => {}
        }
    }

    Ok(config)
}

fn unquote(value: &str) -> &str {
    for quote in ['"', '\''] {
        if let Some(inner) = value
            .strip_prefix(quote)
            .and_then(|v| v.strip_suffix(quote))
        {
            return inner;
        }
    }
    value
}
