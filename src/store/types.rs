//! Domain types shared by the item store, native backends and tools.
//!
//! Two layers live here:
//!
//! - **Native records** (`*Record`, `*Draft`) mirror what EventKit stores:
//!   raw notes including the tag block, collection identifiers, integer
//!   priorities. Only [`super::NativeStore`] implementations and
//!   [`super::ItemStore`] see them.
//! - **Exposed items** ([`CalendarEvent`], [`Reminder`], [`CollectionInfo`])
//!   are what tools serialize: clean notes, decoded tags, collection titles,
//!   ISO-8601 timestamps.

use std::fmt;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize, Serializer};

use crate::permissions::PermissionError;

/// Wire format of every timestamp: local wall-clock time, second precision.
pub const ISO_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

fn serialize_iso<S: Serializer>(value: &NaiveDateTime, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(&value.format(ISO_FORMAT).to_string())
}

fn serialize_opt_iso<S: Serializer>(
    value: &Option<NaiveDateTime>,
    s: S,
) -> Result<S::Ok, S::Error> {
    match value {
        Some(v) => serialize_iso(v, s),
        None => s.serialize_none(),
    }
}

// ─── Native records ──────────────────────────────────────────────────────────

/// Which kind of collection or item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ItemKind {
    /// Calendar events.
    Event,
    /// Reminders.
    Reminder,
}

/// A calendar or reminder list as the native store reports it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionRecord {
    /// Native calendar identifier.
    pub id: String,
    /// Display title.
    pub title: String,
    /// Source type label (`local`, `caldav`, `exchange`, ...).
    pub source_type: String,
    /// Whether items can be added or changed.
    pub allows_modifications: bool,
}

/// An event as stored natively.
#[derive(Debug, Clone, PartialEq)]
pub struct EventRecord {
    /// Internal identifier (`calendarItemIdentifier`).
    pub id: String,
    /// Cross-device identifier.
    pub external_id: Option<String>,
    pub title: String,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub location: Option<String>,
    /// Raw notes, tag block included.
    pub notes: Option<String>,
    pub url: Option<String>,
    pub is_all_day: bool,
    pub has_recurrence: bool,
    /// Owning calendar identifier.
    pub calendar_id: Option<String>,
    /// Owning calendar title.
    pub calendar_title: Option<String>,
}

/// Field values to write for a new or existing event.
#[derive(Debug, Clone, PartialEq)]
pub struct EventDraft {
    /// `None` creates a new event.
    pub id: Option<String>,
    pub title: String,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub location: Option<String>,
    pub notes: Option<String>,
    pub url: Option<String>,
    pub is_all_day: bool,
    pub calendar_id: Option<String>,
}

impl From<&EventRecord> for EventDraft {
    fn from(record: &EventRecord) -> Self {
        Self {
            id: Some(record.id.clone()),
            title: record.title.clone(),
            start: record.start,
            end: record.end,
            location: record.location.clone(),
            notes: record.notes.clone(),
            url: record.url.clone(),
            is_all_day: record.is_all_day,
            calendar_id: record.calendar_id.clone(),
        }
    }
}

/// A reminder as stored natively.
#[derive(Debug, Clone, PartialEq)]
pub struct ReminderRecord {
    pub id: String,
    pub external_id: Option<String>,
    pub title: String,
    /// Raw notes, tag block included.
    pub notes: Option<String>,
    pub list_id: Option<String>,
    pub list_title: Option<String>,
    /// Due date components resolved to local wall-clock time.
    pub due: Option<NaiveDateTime>,
    /// EventKit priority: 0 none, 1–4 high, 5 medium, 6–9 low.
    pub priority: u8,
    pub completed: bool,
    pub completion_date: Option<NaiveDateTime>,
}

/// Field values to write for a new or existing reminder.
#[derive(Debug, Clone, PartialEq)]
pub struct ReminderDraft {
    /// `None` creates a new reminder.
    pub id: Option<String>,
    pub title: String,
    pub notes: Option<String>,
    pub list_id: Option<String>,
    pub due: Option<NaiveDateTime>,
    pub priority: u8,
    pub completed: bool,
}

impl From<&ReminderRecord> for ReminderDraft {
    fn from(record: &ReminderRecord) -> Self {
        Self {
            id: Some(record.id.clone()),
            title: record.title.clone(),
            notes: record.notes.clone(),
            list_id: record.list_id.clone(),
            due: record.due,
            priority: record.priority,
            completed: record.completed,
        }
    }
}

/// Reminder fetch predicate.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReminderPredicate {
    /// Restrict to these list identifiers (`None` = every list).
    pub list_ids: Option<Vec<String>>,
    /// Skip completed reminders.
    pub incomplete_only: bool,
    /// Only reminders due strictly before this instant.
    pub due_before: Option<NaiveDateTime>,
}

impl ReminderPredicate {
    /// Whether `record` satisfies the predicate.
    pub fn matches(&self, record: &ReminderRecord) -> bool {
        if let Some(ids) = &self.list_ids
            && !record
                .list_id
                .as_ref()
                .is_some_and(|id| ids.iter().any(|wanted| wanted == id))
        {
            return false;
        }
        if self.incomplete_only && record.completed {
            return false;
        }
        if let Some(limit) = self.due_before {
            return record.due.is_some_and(|due| due < limit);
        }
        true
    }
}

// ─── Span and priority ───────────────────────────────────────────────────────

/// How far an edit or delete reaches in a recurring series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Span {
    /// Only the selected occurrence.
    #[default]
    ThisEvent,
    /// The selected occurrence and all later ones.
    FutureEvents,
}

impl Span {
    /// Parse `this_event` / `future_events`.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "this_event" => Some(Span::ThisEvent),
            "future_events" => Some(Span::FutureEvents),
            _ => None,
        }
    }
}

/// Reminder priority on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    #[default]
    None,
    Low,
    Medium,
    High,
}

impl Priority {
    /// Parse a case-insensitive priority name.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" => Some(Priority::None),
            "low" => Some(Priority::Low),
            "medium" => Some(Priority::Medium),
            "high" => Some(Priority::High),
            _ => None,
        }
    }

    /// EventKit integer written for this priority.
    pub fn to_native(self) -> u8 {
        match self {
            Priority::None => 0,
            Priority::High => 1,
            Priority::Medium => 5,
            Priority::Low => 9,
        }
    }

    /// Bucket an EventKit integer (1–4 high, 5 medium, 6–9 low).
    pub fn from_native(value: u8) -> Self {
        match value {
            1..=4 => Priority::High,
            5 => Priority::Medium,
            6..=9 => Priority::Low,
            _ => Priority::None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Priority::None => "none",
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ─── Exposed items ───────────────────────────────────────────────────────────

/// A calendar or reminder list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CollectionInfo {
    pub id: String,
    pub title: String,
    #[serde(rename = "type")]
    pub source_type: String,
    pub allows_modifications: bool,
}

impl From<CollectionRecord> for CollectionInfo {
    fn from(record: CollectionRecord) -> Self {
        Self {
            id: record.id,
            title: record.title,
            source_type: record.source_type,
            allows_modifications: record.allows_modifications,
        }
    }
}

/// A calendar event with decoded notes and tags.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CalendarEvent {
    pub id: String,
    pub external_id: Option<String>,
    pub title: String,
    #[serde(serialize_with = "serialize_iso")]
    pub start_date: NaiveDateTime,
    #[serde(serialize_with = "serialize_iso")]
    pub end_date: NaiveDateTime,
    pub location: Option<String>,
    /// Notes without the tag block.
    pub notes: String,
    pub tags: Vec<String>,
    /// Owning calendar title.
    pub calendar: Option<String>,
    pub is_all_day: bool,
    pub url: Option<String>,
    pub has_recurrence: bool,
}

/// A reminder with decoded notes and tags.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Reminder {
    pub id: String,
    pub external_id: Option<String>,
    pub title: String,
    /// Notes without the tag block.
    pub notes: String,
    pub tags: Vec<String>,
    /// Owning list title.
    pub list: Option<String>,
    #[serde(serialize_with = "serialize_opt_iso")]
    pub due_date: Option<NaiveDateTime>,
    pub priority: Priority,
    pub completed: bool,
    #[serde(serialize_with = "serialize_opt_iso")]
    pub completion_date: Option<NaiveDateTime>,
}

// ─── Requests ────────────────────────────────────────────────────────────────

/// Events in a window.
#[derive(Debug, Clone)]
pub struct EventQuery {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    /// Calendar title; unknown titles yield nothing.
    pub calendar: Option<String>,
    pub limit: usize,
}

/// Text and tag search over events.
#[derive(Debug, Clone)]
pub struct EventSearch {
    pub query: String,
    pub start: Option<NaiveDateTime>,
    pub end: Option<NaiveDateTime>,
    pub tags: Vec<String>,
    pub limit: usize,
}

/// A new event.
#[derive(Debug, Clone, Default)]
pub struct NewEvent {
    pub title: String,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    /// Calendar title; falls back to the default calendar.
    pub calendar: Option<String>,
    pub location: Option<String>,
    pub notes: Option<String>,
    pub url: Option<String>,
    pub is_all_day: bool,
    pub tags: Option<Vec<String>>,
}

/// Partial event update; `None` leaves a field untouched.
#[derive(Debug, Clone, Default)]
pub struct EventPatch {
    pub title: Option<String>,
    pub start: Option<NaiveDateTime>,
    pub end: Option<NaiveDateTime>,
    /// `Some("")` clears the location.
    pub location: Option<String>,
    /// Replaces the clean notes, keeping tags unless `tags` is also set.
    pub notes: Option<String>,
    /// `Some("")` clears the URL.
    pub url: Option<String>,
    /// Replaces the tag set; `Some(vec![])` removes every tag.
    pub tags: Option<Vec<String>>,
    /// Tags added on top of the (possibly replaced) set.
    pub add_tags: Vec<String>,
    /// Tags removed from the (possibly replaced) set.
    pub remove_tags: Vec<String>,
}

/// Reminders in one or every list.
#[derive(Debug, Clone)]
pub struct ReminderQuery {
    /// List title; unknown titles yield nothing.
    pub list: Option<String>,
    pub include_completed: bool,
    pub due_before: Option<NaiveDateTime>,
    pub limit: usize,
}

/// Text and tag search over reminders.
#[derive(Debug, Clone)]
pub struct ReminderSearch {
    pub query: String,
    pub tags: Vec<String>,
    pub include_completed: bool,
    pub limit: usize,
}

/// A new reminder.
#[derive(Debug, Clone, Default)]
pub struct NewReminder {
    pub title: String,
    /// List title; falls back to the default list.
    pub list: Option<String>,
    pub notes: Option<String>,
    pub due_date: Option<NaiveDateTime>,
    pub priority: Option<Priority>,
    pub tags: Option<Vec<String>>,
}

/// Partial reminder update; `None` leaves a field untouched.
#[derive(Debug, Clone, Default)]
pub struct ReminderPatch {
    pub title: Option<String>,
    pub notes: Option<String>,
    pub due_date: Option<NaiveDateTime>,
    pub priority: Option<Priority>,
    pub completed: Option<bool>,
    pub tags: Option<Vec<String>>,
    pub add_tags: Vec<String>,
    pub remove_tags: Vec<String>,
}

// ─── Errors ──────────────────────────────────────────────────────────────────

/// Error type for item store operations.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum StoreError {
    /// The category is not authorized.
    #[error(transparent)]
    PermissionDenied(#[from] PermissionError),

    /// No item with the given id.
    #[error("{0}")]
    NotFound(String),

    /// Caller supplied something the store cannot accept.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The native store failed or is unavailable.
    #[error("store error: {0}")]
    Backend(String),
}
