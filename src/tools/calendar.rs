//! Calendar tools.
//!
//! Seven tools backed by the shared [`ItemStore`]:
//!
//! - [`ListCalendarsTool`]: every calendar (read-only)
//! - [`ListEventsTool`]: events in a date range (read-only)
//! - [`GetEventTool`]: one event by id or external id (read-only)
//! - [`SearchEventsTool`]: text and tag search (read-only)
//! - [`CreateEventTool`]: new event (write, Full mode)
//! - [`EditEventTool`]: partial update (write, Full mode)
//! - [`DeleteEventTool`]: delete (write, Full mode)

use std::sync::Arc;

use serde_json::{Value, json};

use super::args::{
    limit, optional_bool, optional_date, optional_str, optional_tags, required_date,
    required_span, required_str,
};
use super::context::datetime_context;
use super::types::{Tool, ToolError, to_value};
use crate::config::ToolMode;
use crate::store::{EventPatch, EventQuery, EventSearch, ItemStore, NewEvent};

fn date_property(description: &str) -> Value {
    json!({ "type": "string", "description": description })
}

fn span_property() -> Value {
    json!({
        "type": "string",
        "enum": ["this_event", "future_events"],
        "description": "For recurring events: 'this_event' or 'future_events' (required)"
    })
}

fn tags_property(description: &str) -> Value {
    json!({ "type": "array", "items": { "type": "string" }, "description": description })
}

// ─── ListCalendarsTool ────────────────────────────────────────────────────────

/// Lists every calendar.
pub struct ListCalendarsTool {
    store: Arc<ItemStore>,
}

impl ListCalendarsTool {
    pub fn new(store: Arc<ItemStore>) -> Self {
        Self { store }
    }
}

impl Tool for ListCalendarsTool {
    fn name(&self) -> &str {
        "list_calendars"
    }

    fn description(&self) -> &str {
        "List all available calendars. Use a calendar's title with list_events \
         or create_event to target it."
    }

    fn schema(&self) -> Value {
        json!({ "type": "object", "properties": {} })
    }

    fn execute(&self, _args: Value) -> Result<Value, ToolError> {
        let calendars = self.store.list_calendars()?;
        Ok(json!({
            "count": calendars.len(),
            "calendars": to_value(&calendars)?,
        }))
    }

    fn allowed_in_mode(&self, _mode: ToolMode) -> bool {
        true // read-only
    }
}

// ─── ListEventsTool ───────────────────────────────────────────────────────────

/// Lists events in a date range, with the current date context attached.
///
/// # Arguments (JSON)
///
/// - `start`, `end` (string, required): ISO-8601
/// - `calendar` (string, optional): calendar title
/// - `limit` (integer, optional, default 50)
pub struct ListEventsTool {
    store: Arc<ItemStore>,
}

impl ListEventsTool {
    pub fn new(store: Arc<ItemStore>) -> Self {
        Self { store }
    }
}

impl Tool for ListEventsTool {
    fn name(&self) -> &str {
        "list_events"
    }

    fn description(&self) -> &str {
        "List calendar events within a date range, sorted by start time. The \
         response includes today's date and the dates of the coming week."
    }

    fn schema(&self) -> Value {
        json!({
            "type": "object",
            "required": ["start", "end"],
            "properties": {
                "start": date_property("Range start, ISO 8601 (YYYY-MM-DD or YYYY-MM-DDTHH:MM:SS)"),
                "end": date_property("Range end, ISO 8601"),
                "calendar": { "type": "string", "description": "Only events from this calendar (title)" },
                "limit": { "type": "integer", "minimum": 0, "description": "Maximum events to return (default 50)" }
            }
        })
    }

    fn execute(&self, args: Value) -> Result<Value, ToolError> {
        let query = EventQuery {
            start: required_date(&args, "start")?,
            end: required_date(&args, "end")?,
            calendar: optional_str(&args, "calendar")?,
            limit: limit(&args, "limit", 50)?,
        };
        let events = self.store.get_events(&query)?;
        Ok(json!({
            "today": to_value(&datetime_context())?,
            "count": events.len(),
            "events": to_value(&events)?,
        }))
    }

    fn allowed_in_mode(&self, _mode: ToolMode) -> bool {
        true // read-only
    }
}

// ─── GetEventTool ─────────────────────────────────────────────────────────────

/// Fetches one event by identifier.
pub struct GetEventTool {
    store: Arc<ItemStore>,
}

impl GetEventTool {
    pub fn new(store: Arc<ItemStore>) -> Self {
        Self { store }
    }
}

impl Tool for GetEventTool {
    fn name(&self) -> &str {
        "get_event"
    }

    fn description(&self) -> &str {
        "Get full details of one calendar event by its id or external_id."
    }

    fn schema(&self) -> Value {
        json!({
            "type": "object",
            "required": ["id"],
            "properties": {
                "id": { "type": "string", "description": "Event id or external_id from list results" }
            }
        })
    }

    fn execute(&self, args: Value) -> Result<Value, ToolError> {
        let id = required_str(&args, "id")?;
        let event = self.store.get_event(&id)?;
        Ok(json!({ "event": to_value(&event)? }))
    }

    fn allowed_in_mode(&self, _mode: ToolMode) -> bool {
        true // read-only
    }
}

// ─── SearchEventsTool ─────────────────────────────────────────────────────────

/// Case-insensitive search over title, location and notes, with an AND tag
/// filter.
///
/// # Arguments (JSON)
///
/// - `query` (string, required)
/// - `start`, `end` (string, optional): default 30 days back to 90 days ahead
/// - `tags` (array of strings, optional)
/// - `limit` (integer, optional, default 50)
pub struct SearchEventsTool {
    store: Arc<ItemStore>,
}

impl SearchEventsTool {
    pub fn new(store: Arc<ItemStore>) -> Self {
        Self { store }
    }
}

impl Tool for SearchEventsTool {
    fn name(&self) -> &str {
        "search_events"
    }

    fn description(&self) -> &str {
        "Search events by text in title, location, or notes. Optionally restrict \
         to events carrying all of the given tags. Searches 30 days back to 90 \
         days ahead unless a range is given."
    }

    fn schema(&self) -> Value {
        json!({
            "type": "object",
            "required": ["query"],
            "properties": {
                "query": { "type": "string", "description": "Text to match (case-insensitive)" },
                "start": date_property("Range start, ISO 8601 (default: 30 days ago)"),
                "end": date_property("Range end, ISO 8601 (default: 90 days from now)"),
                "tags": tags_property("Only events with all of these tags"),
                "limit": { "type": "integer", "minimum": 0, "description": "Maximum events to return (default 50)" }
            }
        })
    }

    fn execute(&self, args: Value) -> Result<Value, ToolError> {
        let search = EventSearch {
            query: required_str(&args, "query")?,
            start: optional_date(&args, "start")?,
            end: optional_date(&args, "end")?,
            tags: optional_tags(&args, "tags")?.unwrap_or_default(),
            limit: limit(&args, "limit", 50)?,
        };
        let events = self.store.search_events(&search)?;
        Ok(json!({
            "count": events.len(),
            "events": to_value(&events)?,
            "query": search.query,
        }))
    }

    fn allowed_in_mode(&self, _mode: ToolMode) -> bool {
        true // read-only
    }
}

// ─── CreateEventTool ──────────────────────────────────────────────────────────

/// Creates an event in the named calendar, or the default one.
///
/// # Arguments (JSON)
///
/// - `title`, `start`, `end` (required)
/// - `calendar`, `location`, `notes`, `url` (string, optional)
/// - `is_all_day` (boolean, optional, default false)
/// - `tags` (array of strings, optional)
pub struct CreateEventTool {
    store: Arc<ItemStore>,
}

impl CreateEventTool {
    pub fn new(store: Arc<ItemStore>) -> Self {
        Self { store }
    }
}

impl Tool for CreateEventTool {
    fn name(&self) -> &str {
        "create_event"
    }

    fn description(&self) -> &str {
        "Create a new calendar event. Dates are ISO 8601. Uses the default \
         calendar unless one is named."
    }

    fn schema(&self) -> Value {
        json!({
            "type": "object",
            "required": ["title", "start", "end"],
            "properties": {
                "title": { "type": "string", "description": "Event title" },
                "start": date_property("Start, ISO 8601"),
                "end": date_property("End, ISO 8601"),
                "calendar": { "type": "string", "description": "Target calendar title (default calendar if omitted)" },
                "location": { "type": "string", "description": "Event location" },
                "notes": { "type": "string", "description": "Event notes" },
                "url": { "type": "string", "description": "Associated URL" },
                "is_all_day": { "type": "boolean", "description": "All-day event (default false)" },
                "tags": tags_property("Tags to apply")
            }
        })
    }

    fn execute(&self, args: Value) -> Result<Value, ToolError> {
        let title = required_str(&args, "title")?;
        if title.trim().is_empty() {
            return Err(ToolError::invalid_input("title cannot be empty"));
        }
        let new = NewEvent {
            title: title.clone(),
            start: required_date(&args, "start")?,
            end: required_date(&args, "end")?,
            calendar: optional_str(&args, "calendar")?,
            location: optional_str(&args, "location")?,
            notes: optional_str(&args, "notes")?,
            url: optional_str(&args, "url")?,
            is_all_day: optional_bool(&args, "is_all_day")?.unwrap_or(false),
            tags: optional_tags(&args, "tags")?,
        };
        let event = self.store.create_event(new)?;
        Ok(json!({
            "event": to_value(&event)?,
            "message": format!("Event '{title}' created successfully"),
        }))
    }

    fn allowed_in_mode(&self, mode: ToolMode) -> bool {
        matches!(mode, ToolMode::Full)
    }
}

// ─── EditEventTool ────────────────────────────────────────────────────────────

/// Partially updates an event. `tags` replaces the tag set; omitting it
/// keeps the existing tags.
pub struct EditEventTool {
    store: Arc<ItemStore>,
}

impl EditEventTool {
    pub fn new(store: Arc<ItemStore>) -> Self {
        Self { store }
    }
}

impl Tool for EditEventTool {
    fn name(&self) -> &str {
        "edit_event"
    }

    fn description(&self) -> &str {
        "Edit an existing calendar event. Only the fields you provide change. \
         tags replaces the existing tag set; an empty list removes all tags. \
         add_tags and remove_tags change individual tags. \
         span is required and selects how much of a recurring series changes."
    }

    fn schema(&self) -> Value {
        json!({
            "type": "object",
            "required": ["id", "span"],
            "properties": {
                "id": { "type": "string", "description": "Event id or external_id" },
                "span": span_property(),
                "title": { "type": "string", "description": "New title" },
                "start": date_property("New start, ISO 8601"),
                "end": date_property("New end, ISO 8601"),
                "location": { "type": "string", "description": "New location (empty string clears it)" },
                "notes": { "type": "string", "description": "New notes; existing tags are kept" },
                "url": { "type": "string", "description": "New URL (empty string clears it)" },
                "tags": tags_property("Replacement tag set"),
                "add_tags": tags_property("Tags to add, keeping the rest"),
                "remove_tags": tags_property("Tags to remove, keeping the rest")
            }
        })
    }

    fn execute(&self, args: Value) -> Result<Value, ToolError> {
        let span = required_span(&args)?;
        let id = required_str(&args, "id")?;
        let patch = EventPatch {
            title: optional_str(&args, "title")?,
            start: optional_date(&args, "start")?,
            end: optional_date(&args, "end")?,
            location: optional_str(&args, "location")?,
            notes: optional_str(&args, "notes")?,
            url: optional_str(&args, "url")?,
            tags: optional_tags(&args, "tags")?,
            add_tags: optional_tags(&args, "add_tags")?.unwrap_or_default(),
            remove_tags: optional_tags(&args, "remove_tags")?.unwrap_or_default(),
        };
        let event = self.store.edit_event(&id, span, patch)?;
        Ok(json!({
            "event": to_value(&event)?,
            "message": "Event updated successfully",
        }))
    }

    fn allowed_in_mode(&self, mode: ToolMode) -> bool {
        matches!(mode, ToolMode::Full)
    }
}

// ─── DeleteEventTool ──────────────────────────────────────────────────────────

/// Deletes an event, or it and its future occurrences.
pub struct DeleteEventTool {
    store: Arc<ItemStore>,
}

impl DeleteEventTool {
    pub fn new(store: Arc<ItemStore>) -> Self {
        Self { store }
    }
}

impl Tool for DeleteEventTool {
    fn name(&self) -> &str {
        "delete_event"
    }

    fn description(&self) -> &str {
        "Delete a calendar event. span is required: 'this_event' removes one \
         occurrence, 'future_events' also removes later ones."
    }

    fn schema(&self) -> Value {
        json!({
            "type": "object",
            "required": ["id", "span"],
            "properties": {
                "id": { "type": "string", "description": "Event id or external_id" },
                "span": span_property()
            }
        })
    }

    fn execute(&self, args: Value) -> Result<Value, ToolError> {
        let span = required_span(&args)?;
        let id = required_str(&args, "id")?;
        self.store.delete_event(&id, span)?;
        Ok(json!({ "message": "Event deleted successfully" }))
    }

    fn allowed_in_mode(&self, mode: ToolMode) -> bool {
        matches!(mode, ToolMode::Full)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;
    use crate::permissions::AuthorizationStatus;
    use crate::store::{EventRecord, Span};
    use crate::tools::test_support::{authorized_store, envelope, shared_store, store_with};
    use chrono::NaiveDate;
    use crate::tools::types::ToolResult;

    fn run(tool: &dyn Tool, args: Value) -> Value {
        ToolResult::from(tool.execute(args)).to_envelope()
    }

    fn create(store: &Arc<ItemStore>, args: Value) -> Value {
        run(&CreateEventTool::new(Arc::clone(store)), args)
    }

    #[test]
    fn create_then_get_round_trips_tags_and_notes() {
        let store = authorized_store();
        let created = create(
            &store,
            json!({
                "title": "Standup",
                "start": "2025-03-03T09:00:00",
                "end": "2025-03-03T09:15:00",
                "notes": "Daily sync",
                "tags": ["Work", "team-sync"]
            }),
        );
        assert_eq!(created["success"], true);
        assert_eq!(created["message"], "Event 'Standup' created successfully");
        assert_eq!(created["event"]["tags"], json!(["team_sync", "work"]));
        assert_eq!(
            created["event"]["notes"],
            "Created by Claude Desktop\n\nDaily sync"
        );

        let id = created["event"]["id"].as_str().unwrap();
        let fetched = run(&GetEventTool::new(Arc::clone(&store)), json!({"id": id}));
        assert_eq!(fetched["event"]["title"], "Standup");
        assert_eq!(fetched["event"]["start_date"], "2025-03-03T09:00:00");
        assert_eq!(fetched["event"]["calendar"], "Calendar");
    }

    #[test]
    fn list_events_includes_today_and_sorted_events() {
        let store = authorized_store();
        for (title, start, end) in [
            ("late", "2025-03-03T15:00:00", "2025-03-03T16:00:00"),
            ("early", "2025-03-03T08:00:00", "2025-03-03T09:00:00"),
        ] {
            create(&store, json!({"title": title, "start": start, "end": end}));
        }
        let listed = run(
            &ListEventsTool::new(store),
            json!({"start": "2025-03-03", "end": "2025-03-04"}),
        );
        assert_eq!(listed["success"], true);
        assert_eq!(listed["count"], 2);
        assert_eq!(listed["events"][0]["title"], "early");
        assert_eq!(listed["events"][1]["title"], "late");
        assert!(listed["today"]["upcoming_days"].is_object());
    }

    #[test]
    fn list_events_rejects_bad_dates() {
        let listed = run(
            &ListEventsTool::new(authorized_store()),
            json!({"start": "next week", "end": "2025-03-04"}),
        );
        assert_eq!(listed["success"], false);
        assert_eq!(listed["error"], "invalid_date");
    }

    #[test]
    fn edit_with_only_tags_keeps_other_fields() {
        let store = authorized_store();
        let created = create(
            &store,
            json!({
                "title": "Review",
                "start": "2025-03-03T10:00:00",
                "end": "2025-03-03T11:00:00",
                "location": "Room 4",
                "notes": "Bring slides",
                "tags": ["work"]
            }),
        );
        let id = created["event"]["id"].as_str().unwrap();

        let edited = run(
            &EditEventTool::new(Arc::clone(&store)),
            json!({"id": id, "span": "this_event", "tags": ["urgent"]}),
        );
        assert_eq!(edited["success"], true);
        assert_eq!(edited["message"], "Event updated successfully");
        assert_eq!(edited["event"]["tags"], json!(["urgent"]));
        assert_eq!(edited["event"]["title"], "Review");
        assert_eq!(edited["event"]["location"], "Room 4");
        assert_eq!(
            edited["event"]["notes"],
            created["event"]["notes"],
            "clean notes untouched"
        );
    }

    #[test]
    fn edit_with_empty_tags_clears_block_and_keeps_text() {
        let (store, native) = shared_store();
        let created = create(
            &store,
            json!({
                "title": "Lunch",
                "start": "2025-03-03T12:00:00",
                "end": "2025-03-03T13:00:00",
                "notes": "Try the new place",
                "tags": ["food"]
            }),
        );
        let id = created["event"]["id"].as_str().unwrap();
        let edited = run(
            &EditEventTool::new(Arc::clone(&store)),
            json!({"id": id, "span": "this_event", "tags": []}),
        );
        assert_eq!(edited["event"]["tags"], json!([]));
        assert!(
            edited["event"]["notes"]
                .as_str()
                .unwrap()
                .ends_with("Try the new place")
        );
        assert_eq!(
            native.raw_notes(id).as_deref(),
            Some("Created by Claude Desktop\n\nTry the new place")
        );
    }

    #[test]
    fn edit_and_delete_validate_span_first() {
        let store = authorized_store();
        for tool in [
            Box::new(EditEventTool::new(Arc::clone(&store))) as Box<dyn Tool>,
            Box::new(DeleteEventTool::new(Arc::clone(&store))),
        ] {
            let out = run(tool.as_ref(), json!({"id": "missing", "span": "all"}));
            assert_eq!(out["error"], "invalid_span");
            assert_eq!(
                out["message"],
                "span must be 'this_event' or 'future_events'"
            );
        }
    }

    #[test]
    fn edit_and_delete_missing_ids_are_not_found() {
        let store = authorized_store();
        let edited = run(
            &EditEventTool::new(Arc::clone(&store)),
            json!({"id": "nope", "span": "this_event", "title": "x"}),
        );
        assert_eq!(edited["error"], "not_found");
        let deleted = run(
            &DeleteEventTool::new(store),
            json!({"id": "nope", "span": "future_events"}),
        );
        assert_eq!(deleted["error"], "not_found");
    }

    #[test]
    fn delete_removes_event() {
        let store = authorized_store();
        let created = create(
            &store,
            json!({"title": "Gone", "start": "2025-03-03", "end": "2025-03-04", "is_all_day": true}),
        );
        let id = created["event"]["id"].as_str().unwrap();
        let deleted = run(
            &DeleteEventTool::new(Arc::clone(&store)),
            json!({"id": id, "span": "this_event"}),
        );
        assert_eq!(deleted, json!({"success": true, "message": "Event deleted successfully"}));
        let fetched = run(&GetEventTool::new(store), json!({"id": id}));
        assert_eq!(fetched["error"], "not_found");
    }

    fn weekly_sync() -> EventRecord {
        let start = NaiveDate::from_ymd_opt(2025, 3, 3)
            .unwrap()
            .and_hms_opt(10, 0, 0)
            .unwrap();
        EventRecord {
            id: "series-1".into(),
            external_id: Some("ext-series-1".into()),
            title: "Weekly sync".into(),
            start,
            end: start + chrono::Duration::minutes(30),
            location: None,
            notes: Some("Agenda in the doc\n\n#team".into()),
            url: None,
            is_all_day: false,
            has_recurrence: true,
            calendar_id: None,
            calendar_title: None,
        }
    }

    #[test]
    fn future_events_span_reaches_native_store() {
        let (store, native) = shared_store();
        native.insert_event(weekly_sync());

        let edited = run(
            &EditEventTool::new(Arc::clone(&store)),
            json!({
                "id": "series-1",
                "span": "future_events",
                "title": "Weekly sync (moved)",
                "add_tags": ["urgent"]
            }),
        );
        assert_eq!(edited["success"], true);
        assert_eq!(edited["event"]["has_recurrence"], true);
        assert_eq!(edited["event"]["tags"], json!(["team", "urgent"]));
        assert_eq!(
            native.raw_notes("series-1").as_deref(),
            Some("Agenda in the doc\n\n#team #urgent")
        );

        let deleted = run(
            &DeleteEventTool::new(Arc::clone(&store)),
            json!({"id": "series-1", "span": "future_events"}),
        );
        assert_eq!(deleted["success"], true);
        assert_eq!(
            native.spans(),
            vec![
                ("series-1".to_owned(), Span::FutureEvents),
                ("series-1".to_owned(), Span::FutureEvents),
            ]
        );
    }

    #[test]
    fn this_event_span_is_passed_through() {
        let (store, native) = shared_store();
        native.insert_event(weekly_sync());

        let edited = run(
            &EditEventTool::new(Arc::clone(&store)),
            json!({"id": "series-1", "span": "this_event", "remove_tags": ["team"]}),
        );
        assert_eq!(edited["event"]["tags"], json!([]));
        assert_eq!(edited["event"]["notes"], "Agenda in the doc");
        assert_eq!(
            native.spans(),
            vec![("series-1".to_owned(), Span::ThisEvent)]
        );
    }

    #[test]
    fn search_filters_by_text_and_all_tags() {
        let store = authorized_store();
        for (title, tags) in [
            ("Planning work", json!(["work", "urgent"])),
            ("Planning party", json!(["home"])),
            ("Planning sprint", json!(["work"])),
        ] {
            create(
                &store,
                json!({
                    "title": title,
                    "start": "2025-03-05T10:00:00",
                    "end": "2025-03-05T11:00:00",
                    "tags": tags
                }),
            );
        }
        let found = run(
            &SearchEventsTool::new(store),
            json!({
                "query": "PLANNING",
                "start": "2025-03-01",
                "end": "2025-03-10",
                "tags": ["work", "urgent"]
            }),
        );
        assert_eq!(found["count"], 1);
        assert_eq!(found["query"], "PLANNING");
        assert_eq!(found["events"][0]["title"], "Planning work");
    }

    #[test]
    fn denied_calendar_reports_permission_denied() {
        let store = store_with(AuthorizationStatus::Denied, AuthorizationStatus::Authorized);
        let out = run(&ListCalendarsTool::new(store), json!({}));
        assert_eq!(out["success"], false);
        assert_eq!(out["error"], "permission_denied");
        assert!(out["message"].as_str().unwrap().contains("System Settings"));
    }

    #[test]
    fn list_calendars_reports_count() {
        let out = run(&ListCalendarsTool::new(authorized_store()), json!({}));
        assert_eq!(out["count"], 1);
        assert_eq!(out["calendars"][0]["title"], "Calendar");
        assert_eq!(out["calendars"][0]["type"], "local");
    }

    #[test]
    fn write_tools_hidden_in_read_only_mode() {
        let store = authorized_store();
        assert!(!CreateEventTool::new(Arc::clone(&store)).allowed_in_mode(ToolMode::ReadOnly));
        assert!(!DeleteEventTool::new(Arc::clone(&store)).allowed_in_mode(ToolMode::ReadOnly));
        assert!(SearchEventsTool::new(store).allowed_in_mode(ToolMode::ReadOnly));
    }

    #[test]
    fn envelope_helper_matches_registry_output() {
        let store = authorized_store();
        let direct = run(&ListCalendarsTool::new(Arc::clone(&store)), json!({}));
        assert_eq!(envelope(&store, "list_calendars", json!({})), direct);
    }
}
