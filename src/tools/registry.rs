//! Name-keyed tool table behind `tools/list` and `tools/call`.
//!
//! The [`ToolMode`] is fixed when the registry is built; tools it excludes
//! behave as if they were never registered, except that
//! [`ToolRegistry::is_blocked_by_mode`] can still tell them apart from
//! unknown names.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use crate::config::ToolMode;

use super::types::{Tool, ToolResult};

/// Tools exposed by the server, filtered by the configured mode.
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
    mode: ToolMode,
}

impl ToolRegistry {
    /// Empty registry serving `mode`.
    pub fn new(mode: ToolMode) -> Self {
        Self {
            tools: HashMap::new(),
            mode,
        }
    }

    /// Add `tool` under its own name; a later tool with the same name wins.
    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        self.tools.insert(tool.name().to_owned(), tool);
    }

    fn visible(&self) -> impl Iterator<Item = &Arc<dyn Tool>> {
        self.tools.values().filter(|t| t.allowed_in_mode(self.mode))
    }

    /// Tool called `name`, if registered and allowed in this mode.
    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools
            .get(name)
            .filter(|t| t.allowed_in_mode(self.mode))
            .cloned()
    }

    /// Sorted names of the visible tools.
    pub fn list_available(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.visible().map(|t| t.name()).collect();
        names.sort_unstable();
        names
    }

    /// MCP tool descriptors (`name`, `description`, `inputSchema`) for every
    /// available tool, sorted by name.
    pub fn descriptors(&self) -> Vec<serde_json::Value> {
        let mut entries: Vec<(String, serde_json::Value)> = self
            .visible()
            .map(|t| {
                let entry = serde_json::json!({
                    "name": t.name(),
                    "description": t.description(),
                    "inputSchema": t.schema(),
                });
                (t.name().to_string(), entry)
            })
            .collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        entries.into_iter().map(|(_, v)| v).collect()
    }

    /// Run `name` with `args`. Returns `None` when the tool is unknown or
    /// hidden by the current mode.
    pub fn call(&self, name: &str, args: serde_json::Value) -> Option<ToolResult> {
        let tool = self.get(name)?;
        let started = Instant::now();
        let result = ToolResult::from(tool.execute(args));
        let elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        match &result.error {
            None => tracing::debug!(tool = name, elapsed_ms, "tool call succeeded"),
            Some(error) => tracing::info!(
                tool = name,
                elapsed_ms,
                error = error.kind.as_str(),
                message = %error.message,
                "tool call failed"
            ),
        }
        Some(result)
    }

    /// Whether `name` is registered but hidden by the current mode.
    pub fn is_blocked_by_mode(&self, name: &str) -> bool {
        self.tools
            .get(name)
            .is_some_and(|t| !t.allowed_in_mode(self.mode))
    }
}
