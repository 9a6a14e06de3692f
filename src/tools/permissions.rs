//! `check_permissions`: reports both authorization categories.

use std::sync::Arc;

use serde_json::{Value, json};

use super::types::{Tool, ToolError, to_value};
use crate::config::ToolMode;
use crate::permissions::PermissionGate;

/// Reports calendar and reminders authorization with remediation steps.
///
/// Never fails on an unauthorized category; the report is the payload.
pub struct CheckPermissionsTool {
    gate: Arc<PermissionGate>,
}

impl CheckPermissionsTool {
    pub fn new(gate: Arc<PermissionGate>) -> Self {
        Self { gate }
    }
}

impl Tool for CheckPermissionsTool {
    fn name(&self) -> &str {
        "check_permissions"
    }

    fn description(&self) -> &str {
        "Check Calendar and Reminders access. Returns each category's status \
         and, when something is missing, the steps to grant it."
    }

    fn schema(&self) -> Value {
        json!({ "type": "object", "properties": {} })
    }

    fn execute(&self, _args: Value) -> Result<Value, ToolError> {
        to_value(&self.gate.report())
    }

    fn allowed_in_mode(&self, _mode: ToolMode) -> bool {
        true // read-only
    }
}
