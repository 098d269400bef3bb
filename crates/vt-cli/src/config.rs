//! Configuration loading and management.
//!
//! The config file is JSON for compatibility with existing
//! `config.json` deployments; the key names below are the file's
//! schema and must stay stable.

use std::fmt;
use std::path::{Path, PathBuf};

use figment::Figment;
use figment::providers::{Env, Format, Json, Serialized};
use serde::{Deserialize, Serialize};

/// Application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Schedule portal URL. Empty means "parse whatever page the
    /// driver is already on".
    pub verint_url: String,

    /// Reminder lead time before an activity change.
    pub notification_minutes_before: u32,

    /// Automatic schedule refresh interval.
    pub check_interval_seconds: u64,

    /// Which browser the embedding driver should launch.
    pub browser_type: BrowserKind,

    /// Launch the browser without a visible window.
    pub headless: bool,

    /// Read the schedule from `manual_schedule_path` instead of the
    /// portal.
    pub use_manual_file: bool,

    /// Manual schedule override file.
    pub manual_schedule_path: PathBuf,

    /// Ticket/activity stats file.
    pub stats_path: PathBuf,

    /// Pacing target, tickets per hour.
    pub target_cph: f64,
}

/// Supported browser channels for the automation driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BrowserKind {
    #[default]
    Msedge,
    Chrome,
}

impl BrowserKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Msedge => "msedge",
            Self::Chrome => "chrome",
        }
    }
}

impl fmt::Display for BrowserKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = dirs_data_path().unwrap_or_else(|| PathBuf::from("."));
        Self {
            verint_url: "https://wfo.mt7.verintcloudservices.com/wfo/control/signin".to_string(),
            notification_minutes_before: 5,
            check_interval_seconds: 60,
            browser_type: BrowserKind::default(),
            headless: false,
            use_manual_file: false,
            manual_schedule_path: PathBuf::from("manual_schedule.txt"),
            stats_path: data_dir.join(vt_store::STATS_FILE_NAME),
            target_cph: 7.5,
        }
    }
}

impl Config {
    /// Loads configuration from default locations.
    #[expect(
        clippy::result_large_err,
        reason = "figment::Error is large but only returned at startup"
    )]
    pub fn load() -> Result<Self, figment::Error> {
        Self::load_from(None)
    }

    /// Loads configuration, optionally from a specific file.
    #[expect(
        clippy::result_large_err,
        reason = "figment::Error is large but only returned at startup"
    )]
    pub fn load_from(config_path: Option<&Path>) -> Result<Self, figment::Error> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        // Load from default config location
        if let Some(config_dir) = dirs_config_path() {
            figment = figment.merge(Json::file(config_dir.join("config.json")));
        }

        // Load from specified config file
        if let Some(path) = config_path {
            figment = figment.merge(Json::file(path));
        }

        // Load from environment variables (VT_*)
        figment = figment.merge(Env::prefixed("VT_"));

        figment.extract()
    }
}

/// Returns the platform-specific config directory for vt.
fn dirs_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("vt"))
}

/// Returns the platform-specific data directory for vt.
///
/// On Linux: `~/.local/share/vt`
pub fn dirs_data_path() -> Option<PathBuf> {
    dirs::data_dir().map(|p| p.join("vt"))
}
