//! eventkit-mcp: Apple Calendar and Reminders as MCP tools.
//!
//! The crate exposes EventKit through a small set of tool calls served over
//! newline-delimited JSON-RPC on stdio:
//!
//! - **Tag codec** (`tags`): structured tags stored as a trailing hashtag
//!   block inside free-text notes
//! - **Permission gate** (`permissions`): per-category authorization checks,
//!   consent requests, and the optional TCC ledger repair
//! - **Item store** (`store`): serialized access to the native store, notes
//!   decoding and encoding, lookups and search
//! - **Tools** (`tools`): argument parsing and the success/error envelope
//! - **MCP** (`mcp`): JSON-RPC framing and the stdio loop
//!
//! Native bindings live in `platform`; on platforms without EventKit a stub
//! reports `restricted` and fails every store call.

pub mod app_dirs;
pub mod config;
pub mod error;
pub mod logging;
pub mod mcp;
pub mod permissions;
pub mod platform;
pub mod store;
pub mod tags;
pub mod tools;

pub use config::{ServerConfig, ToolMode};
pub use error::{EventKitError, Result};
pub use mcp::McpServer;
pub use permissions::{AuthorizationStatus, EntityCategory, PermissionGate};
pub use store::ItemStore;
pub use tools::{ToolRegistry, build_registry};
