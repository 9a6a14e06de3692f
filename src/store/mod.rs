//! Serialized access to the native calendar store.
//!
//! [`NativeStore`] is the narrow interface to EventKit (or a stand-in);
//! [`ItemStore`] wraps one instance behind a mutex, checks permissions,
//! applies the tag codec and attribution, and hands plain data to tools.
//!
//! Implementations of [`NativeStore`]:
//! - `platform::macos::EventKitStore` for production on macOS
//! - `platform::stub::UnsupportedStore` on every other platform
//! - [`MemoryNativeStore`] for tests and offline runs

pub mod item_store;
pub mod memory;
pub mod types;

use std::time::Duration;

use chrono::NaiveDateTime;

pub use item_store::ItemStore;
pub use memory::MemoryNativeStore;
pub use types::{
    CalendarEvent, CollectionInfo, CollectionRecord, EventDraft, EventPatch, EventQuery,
    EventRecord, EventSearch, ItemKind, NewEvent, NewReminder, Priority, Reminder, ReminderDraft,
    ReminderPatch, ReminderPredicate, ReminderQuery, ReminderRecord, ReminderSearch, Span,
    StoreError,
};

/// Abstraction over `EKEventStore`.
///
/// Implementations need not be thread-safe beyond `Send`: [`ItemStore`]
/// holds the only instance behind a mutex and never calls two methods
/// concurrently.
pub trait NativeStore: Send {
    /// Every calendar (events) or list (reminders).
    fn collections(&self, kind: ItemKind) -> Result<Vec<CollectionRecord>, StoreError>;

    /// Default target for new items of `kind`, if the user has one.
    fn default_collection(&self, kind: ItemKind) -> Result<Option<CollectionRecord>, StoreError>;

    /// Event with the given internal identifier.
    fn event_with_identifier(&self, id: &str) -> Result<Option<EventRecord>, StoreError>;

    /// Reminder with the given internal identifier.
    fn reminder_with_identifier(&self, id: &str) -> Result<Option<ReminderRecord>, StoreError>;

    /// Events overlapping `[start, end)`; `calendar_ids = None` means every
    /// calendar. Order is unspecified.
    fn events_between(
        &self,
        start: NaiveDateTime,
        end: NaiveDateTime,
        calendar_ids: Option<&[String]>,
    ) -> Result<Vec<EventRecord>, StoreError>;

    /// Reminders matching `predicate`, waiting at most `timeout` for the
    /// asynchronous native fetch. A timeout yields an empty list.
    fn fetch_reminders(
        &self,
        predicate: &ReminderPredicate,
        timeout: Duration,
    ) -> Result<Vec<ReminderRecord>, StoreError>;

    /// Create (`draft.id == None`) or update an event and read it back.
    fn save_event(&mut self, draft: &EventDraft, span: Span) -> Result<EventRecord, StoreError>;

    /// Delete an event. A missing id is [`StoreError::NotFound`].
    fn remove_event(&mut self, id: &str, span: Span) -> Result<(), StoreError>;

    /// Create (`draft.id == None`) or update a reminder and read it back.
    fn save_reminder(&mut self, draft: &ReminderDraft) -> Result<ReminderRecord, StoreError>;

    /// Delete a reminder. A missing id is [`StoreError::NotFound`].
    fn remove_reminder(&mut self, id: &str) -> Result<(), StoreError>;
}
