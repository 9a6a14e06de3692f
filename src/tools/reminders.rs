//! Reminder tools.
//!
//! Read-only: [`ListReminderListsTool`], [`ListRemindersTool`],
//! [`GetReminderTool`], [`SearchRemindersTool`]. Full mode only:
//! [`CreateReminderTool`], [`EditReminderTool`], [`CompleteReminderTool`],
//! [`DeleteReminderTool`].

use std::sync::Arc;

use serde_json::{Value, json};

use super::args::{
    limit, optional_bool, optional_date, optional_priority, optional_str, optional_tags,
    required_str,
};
use super::types::{Tool, ToolError, to_value};
use crate::config::ToolMode;
use crate::store::{ItemStore, NewReminder, ReminderPatch, ReminderQuery, ReminderSearch};

fn priority_property(description: &str) -> Value {
    json!({
        "type": "string",
        "enum": ["none", "low", "medium", "high"],
        "description": description
    })
}

fn id_schema() -> Value {
    json!({
        "type": "object",
        "required": ["id"],
        "properties": {
            "id": { "type": "string", "description": "Reminder id or external_id" }
        }
    })
}

// ─── ListReminderListsTool ────────────────────────────────────────────────────

/// Lists every reminder list.
pub struct ListReminderListsTool {
    store: Arc<ItemStore>,
}

impl ListReminderListsTool {
    pub fn new(store: Arc<ItemStore>) -> Self {
        Self { store }
    }
}

impl Tool for ListReminderListsTool {
    fn name(&self) -> &str {
        "list_reminder_lists"
    }

    fn description(&self) -> &str {
        "List all reminder lists. Use a list's title with list_reminders or \
         create_reminder to target it."
    }

    fn schema(&self) -> Value {
        json!({ "type": "object", "properties": {} })
    }

    fn execute(&self, _args: Value) -> Result<Value, ToolError> {
        let lists = self.store.list_reminder_lists()?;
        Ok(json!({
            "count": lists.len(),
            "lists": to_value(&lists)?,
        }))
    }

    fn allowed_in_mode(&self, _mode: ToolMode) -> bool {
        true // read-only
    }
}

// ─── ListRemindersTool ────────────────────────────────────────────────────────

/// Lists reminders, soonest due first and undated last.
///
/// # Arguments (JSON)
///
/// - `list` (string, optional): list title
/// - `include_completed` (boolean, optional, default false)
/// - `due_before` (string, optional): ISO-8601
/// - `limit` (integer, optional, default 100)
pub struct ListRemindersTool {
    store: Arc<ItemStore>,
}

impl ListRemindersTool {
    pub fn new(store: Arc<ItemStore>) -> Self {
        Self { store }
    }
}

impl Tool for ListRemindersTool {
    fn name(&self) -> &str {
        "list_reminders"
    }

    fn description(&self) -> &str {
        "List reminders, optionally from one list and due before a date. \
         Completed reminders are excluded unless include_completed is true."
    }

    fn schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "list": { "type": "string", "description": "Only reminders from this list (title)" },
                "include_completed": { "type": "boolean", "description": "Include completed reminders (default false)" },
                "due_before": { "type": "string", "description": "Only reminders due before this ISO 8601 date" },
                "limit": { "type": "integer", "minimum": 0, "description": "Maximum reminders to return (default 100)" }
            }
        })
    }

    fn execute(&self, args: Value) -> Result<Value, ToolError> {
        let query = ReminderQuery {
            list: optional_str(&args, "list")?,
            include_completed: optional_bool(&args, "include_completed")?.unwrap_or(false),
            due_before: optional_date(&args, "due_before")?,
            limit: limit(&args, "limit", 100)?,
        };
        let reminders = self.store.get_reminders(&query)?;
        Ok(json!({
            "count": reminders.len(),
            "reminders": to_value(&reminders)?,
        }))
    }

    fn allowed_in_mode(&self, _mode: ToolMode) -> bool {
        true // read-only
    }
}

// ─── GetReminderTool ──────────────────────────────────────────────────────────

/// Fetches one reminder by identifier.
pub struct GetReminderTool {
    store: Arc<ItemStore>,
}

impl GetReminderTool {
    pub fn new(store: Arc<ItemStore>) -> Self {
        Self { store }
    }
}

impl Tool for GetReminderTool {
    fn name(&self) -> &str {
        "get_reminder"
    }

    fn description(&self) -> &str {
        "Get full details of one reminder by its id or external_id."
    }

    fn schema(&self) -> Value {
        id_schema()
    }

    fn execute(&self, args: Value) -> Result<Value, ToolError> {
        let id = required_str(&args, "id")?;
        let reminder = self.store.get_reminder(&id)?;
        Ok(json!({ "reminder": to_value(&reminder)? }))
    }

    fn allowed_in_mode(&self, _mode: ToolMode) -> bool {
        true // read-only
    }
}

// ─── SearchRemindersTool ──────────────────────────────────────────────────────

/// Case-insensitive search over title and notes, with an AND tag filter.
pub struct SearchRemindersTool {
    store: Arc<ItemStore>,
}

impl SearchRemindersTool {
    pub fn new(store: Arc<ItemStore>) -> Self {
        Self { store }
    }
}

impl Tool for SearchRemindersTool {
    fn name(&self) -> &str {
        "search_reminders"
    }

    fn description(&self) -> &str {
        "Search reminders by text in title or notes. Optionally restrict to \
         reminders carrying all of the given tags."
    }

    fn schema(&self) -> Value {
        json!({
            "type": "object",
            "required": ["query"],
            "properties": {
                "query": { "type": "string", "description": "Text to match (case-insensitive)" },
                "tags": { "type": "array", "items": { "type": "string" }, "description": "Only reminders with all of these tags" },
                "include_completed": { "type": "boolean", "description": "Include completed reminders (default false)" },
                "limit": { "type": "integer", "minimum": 0, "description": "Maximum reminders to return (default 50)" }
            }
        })
    }

    fn execute(&self, args: Value) -> Result<Value, ToolError> {
        let search = ReminderSearch {
            query: required_str(&args, "query")?,
            tags: optional_tags(&args, "tags")?.unwrap_or_default(),
            include_completed: optional_bool(&args, "include_completed")?.unwrap_or(false),
            limit: limit(&args, "limit", 50)?,
        };
        let reminders = self.store.search_reminders(&search)?;
        Ok(json!({
            "count": reminders.len(),
            "reminders": to_value(&reminders)?,
            "query": search.query,
        }))
    }

    fn allowed_in_mode(&self, _mode: ToolMode) -> bool {
        true // read-only
    }
}

// ─── CreateReminderTool ───────────────────────────────────────────────────────

/// Creates a reminder in the named list, or the default one.
///
/// # Arguments (JSON)
///
/// - `title` (string, required)
/// - `list`, `notes` (string, optional)
/// - `due_date` (string, optional): ISO-8601
/// - `priority` (string, optional): none, low, medium, high
/// - `tags` (array of strings, optional)
pub struct CreateReminderTool {
    store: Arc<ItemStore>,
}

impl CreateReminderTool {
    pub fn new(store: Arc<ItemStore>) -> Self {
        Self { store }
    }
}

impl Tool for CreateReminderTool {
    fn name(&self) -> &str {
        "create_reminder"
    }

    fn description(&self) -> &str {
        "Create a new reminder. Uses the default list unless one is named."
    }

    fn schema(&self) -> Value {
        json!({
            "type": "object",
            "required": ["title"],
            "properties": {
                "title": { "type": "string", "description": "Reminder title" },
                "list": { "type": "string", "description": "Target list title (default list if omitted)" },
                "notes": { "type": "string", "description": "Reminder notes" },
                "due_date": { "type": "string", "description": "Due date, ISO 8601" },
                "priority": priority_property("Priority (default none)"),
                "tags": { "type": "array", "items": { "type": "string" }, "description": "Tags to apply" }
            }
        })
    }

    fn execute(&self, args: Value) -> Result<Value, ToolError> {
        let title = required_str(&args, "title")?;
        if title.trim().is_empty() {
            return Err(ToolError::invalid_input("title cannot be empty"));
        }
        let priority = optional_priority(&args, "priority")?;
        let new = NewReminder {
            title: title.clone(),
            list: optional_str(&args, "list")?,
            notes: optional_str(&args, "notes")?,
            due_date: optional_date(&args, "due_date")?,
            priority,
            tags: optional_tags(&args, "tags")?,
        };
        let reminder = self.store.create_reminder(new)?;
        Ok(json!({
            "reminder": to_value(&reminder)?,
            "message": format!("Reminder '{title}' created successfully"),
        }))
    }

    fn allowed_in_mode(&self, mode: ToolMode) -> bool {
        matches!(mode, ToolMode::Full)
    }
}

// ─── EditReminderTool ─────────────────────────────────────────────────────────

/// Partially updates a reminder.
pub struct EditReminderTool {
    store: Arc<ItemStore>,
}

impl EditReminderTool {
    pub fn new(store: Arc<ItemStore>) -> Self {
        Self { store }
    }
}

impl Tool for EditReminderTool {
    fn name(&self) -> &str {
        "edit_reminder"
    }

    fn description(&self) -> &str {
        "Edit an existing reminder. Only the fields you provide change. tags \
         replaces the existing tag set; an empty list removes all tags. \
         add_tags and remove_tags change individual tags."
    }

    fn schema(&self) -> Value {
        json!({
            "type": "object",
            "required": ["id"],
            "properties": {
                "id": { "type": "string", "description": "Reminder id or external_id" },
                "title": { "type": "string", "description": "New title" },
                "notes": { "type": "string", "description": "New notes; existing tags are kept" },
                "due_date": { "type": "string", "description": "New due date, ISO 8601" },
                "priority": priority_property("New priority"),
                "completed": { "type": "boolean", "description": "Completion state" },
                "tags": { "type": "array", "items": { "type": "string" }, "description": "Replacement tag set" },
                "add_tags": { "type": "array", "items": { "type": "string" }, "description": "Tags to add, keeping the rest" },
                "remove_tags": { "type": "array", "items": { "type": "string" }, "description": "Tags to remove, keeping the rest" }
            }
        })
    }

    fn execute(&self, args: Value) -> Result<Value, ToolError> {
        let id = required_str(&args, "id")?;
        let patch = ReminderPatch {
            title: optional_str(&args, "title")?,
            notes: optional_str(&args, "notes")?,
            due_date: optional_date(&args, "due_date")?,
            priority: optional_priority(&args, "priority")?,
            completed: optional_bool(&args, "completed")?,
            tags: optional_tags(&args, "tags")?,
            add_tags: optional_tags(&args, "add_tags")?.unwrap_or_default(),
            remove_tags: optional_tags(&args, "remove_tags")?.unwrap_or_default(),
        };
        let reminder = self.store.edit_reminder(&id, patch)?;
        Ok(json!({
            "reminder": to_value(&reminder)?,
            "message": "Reminder updated successfully",
        }))
    }

    fn allowed_in_mode(&self, mode: ToolMode) -> bool {
        matches!(mode, ToolMode::Full)
    }
}

// ─── CompleteReminderTool ─────────────────────────────────────────────────────

/// Marks a reminder completed.
pub struct CompleteReminderTool {
    store: Arc<ItemStore>,
}

impl CompleteReminderTool {
    pub fn new(store: Arc<ItemStore>) -> Self {
        Self { store }
    }
}

impl Tool for CompleteReminderTool {
    fn name(&self) -> &str {
        "complete_reminder"
    }

    fn description(&self) -> &str {
        "Mark a reminder as completed."
    }

    fn schema(&self) -> Value {
        id_schema()
    }

    fn execute(&self, args: Value) -> Result<Value, ToolError> {
        let id = required_str(&args, "id")?;
        let reminder = self.store.complete_reminder(&id)?;
        Ok(json!({
            "reminder": to_value(&reminder)?,
            "message": "Reminder marked as completed",
        }))
    }

    fn allowed_in_mode(&self, mode: ToolMode) -> bool {
        matches!(mode, ToolMode::Full)
    }
}

// ─── DeleteReminderTool ───────────────────────────────────────────────────────

/// Deletes a reminder.
pub struct DeleteReminderTool {
    store: Arc<ItemStore>,
}

impl DeleteReminderTool {
    pub fn new(store: Arc<ItemStore>) -> Self {
        Self { store }
    }
}

impl Tool for DeleteReminderTool {
    fn name(&self) -> &str {
        "delete_reminder"
    }

    fn description(&self) -> &str {
        "Delete a reminder."
    }

    fn schema(&self) -> Value {
        id_schema()
    }

    fn execute(&self, args: Value) -> Result<Value, ToolError> {
        let id = required_str(&args, "id")?;
        self.store.delete_reminder(&id)?;
        Ok(json!({ "message": "Reminder deleted successfully" }))
    }

    fn allowed_in_mode(&self, mode: ToolMode) -> bool {
        matches!(mode, ToolMode::Full)
    }
}
