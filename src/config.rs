//! Configuration types for the EventKit MCP server.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{EventKitError, Result};

/// Top-level server configuration, loaded from `config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Server identity and attribution.
    pub server: ServerSection,
    /// Item store timeouts, windows and limits.
    pub store: StoreConfig,
    /// Authorization handshake and TCC repair.
    pub permissions: PermissionsConfig,
    /// Which tools are exposed.
    pub tools: ToolsConfig,
    /// Log level and optional file logging.
    pub logging: LoggingConfig,
}

/// Server identity reported during the MCP handshake.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSection {
    /// Name advertised in `serverInfo`.
    pub name: String,
    /// First line written into the notes of every item this server creates.
    pub attribution: String,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            name: "apple-eventkit".to_owned(),
            attribution: "Created by Claude Desktop".to_owned(),
        }
    }
}

/// Item store settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Upper bound on the asynchronous reminder fetch.
    pub reminder_fetch_timeout_secs: u64,
    /// Days either side of today scanned when an event id must be matched
    /// against external identifiers.
    pub lookup_window_days: i64,
    /// Default search window start, in days before now.
    pub search_past_days: i64,
    /// Default search window end, in days after now.
    pub search_future_days: i64,
    /// Maximum candidates fetched before text and tag filtering.
    pub search_candidate_limit: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            reminder_fetch_timeout_secs: 30,
            lookup_window_days: 365,
            search_past_days: 30,
            search_future_days: 90,
            search_candidate_limit: 1000,
        }
    }
}

impl StoreConfig {
    /// Reminder fetch timeout as a [`Duration`].
    pub fn reminder_fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.reminder_fetch_timeout_secs)
    }
}

/// Authorization settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PermissionsConfig {
    /// Fire consent requests for undetermined categories at startup.
    pub request_on_startup: bool,
    /// How long `eventkit-setup request` waits for the consent dialog.
    pub request_timeout_secs: u64,
    /// Attempt the Reminders → Calendar grant copy at startup.
    pub tcc_repair: bool,
    /// Client bundle id or binary path whose grant is copied.
    pub tcc_client: Option<String>,
    /// Override for the TCC database location.
    pub tcc_database: Option<PathBuf>,
}

impl Default for PermissionsConfig {
    fn default() -> Self {
        Self {
            request_on_startup: true,
            request_timeout_secs: 60,
            tcc_repair: false,
            tcc_client: None,
            tcc_database: None,
        }
    }
}

impl PermissionsConfig {
    /// Consent wait as a [`Duration`].
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Tool execution mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolMode {
    /// Read-only mode (create/edit/delete/complete hidden)
    ReadOnly,
    /// Full mode (all tools enabled)
    #[default]
    Full,
}

/// Tool exposure settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    /// Active tool mode.
    pub mode: ToolMode,
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive when `RUST_LOG` is unset.
    pub level: String,
    /// Also write a daily rolling log under the logs directory.
    pub file: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_owned(),
            file: false,
        }
    }
}

impl ServerConfig {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| EventKitError::Config(e.to_string()))
    }

    /// Load configuration from `path`, falling back to defaults when the
    /// file does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.is_file() {
            Self::from_file(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to a TOML file, creating parent directories as needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written or the config cannot be serialized.
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| EventKitError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Returns the default config file path.
    pub fn default_config_path() -> PathBuf {
        crate::app_dirs::config_file()
    }
}
