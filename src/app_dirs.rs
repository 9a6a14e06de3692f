//! Application directory paths for the EventKit MCP server.
//!
//! Uses the [`dirs`] crate for platform-appropriate directory resolution.
//!
//! | Purpose | macOS | Linux |
//! |---------|-------|-------|
//! | Config | `~/Library/Application Support/eventkit-mcp/` | `~/.config/eventkit-mcp/` |
//! | Data / logs | `~/Library/Application Support/eventkit-mcp/` | `~/.local/share/eventkit-mcp/` |
//!
//! # Environment Overrides
//!
//! - `EVENTKIT_MCP_CONFIG_DIR`: overrides [`config_dir`]
//! - `EVENTKIT_MCP_DATA_DIR`: overrides [`data_dir`]

use std::path::PathBuf;

const APP_DIR_NAME: &str = "eventkit-mcp";

/// Application config directory.
#[must_use]
pub fn config_dir() -> PathBuf {
    if let Some(override_dir) = std::env::var_os("EVENTKIT_MCP_CONFIG_DIR") {
        return PathBuf::from(override_dir);
    }
    dirs::config_dir()
        .map(|d| d.join(APP_DIR_NAME))
        .unwrap_or_else(|| PathBuf::from("/tmp/eventkit-mcp-config"))
}

/// Application data root directory.
#[must_use]
pub fn data_dir() -> PathBuf {
    if let Some(override_dir) = std::env::var_os("EVENTKIT_MCP_DATA_DIR") {
        return PathBuf::from(override_dir);
    }
    dirs::data_dir()
        .map(|d| d.join(APP_DIR_NAME))
        .unwrap_or_else(|| PathBuf::from("/tmp/eventkit-mcp-data"))
}

/// Log file directory (`data_dir()/logs/`).
#[must_use]
pub fn logs_dir() -> PathBuf {
    data_dir().join("logs")
}

/// Main config file path (`config_dir()/config.toml`).
#[must_use]
pub fn config_file() -> PathBuf {
    config_dir().join("config.toml")
}

/// Per-user TCC database (`~/Library/Application Support/com.apple.TCC/TCC.db`).
///
/// Returns `None` when the home directory cannot be resolved.
#[must_use]
pub fn user_tcc_database() -> Option<PathBuf> {
    dirs::home_dir().map(|home| {
        home.join("Library")
            .join("Application Support")
            .join("com.apple.TCC")
            .join("TCC.db")
    })
}
