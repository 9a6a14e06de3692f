//! In-memory [`NativeStore`].
//!
//! Used by tests and by the server when `EVENTKIT_MCP_BACKEND=memory`, so the
//! tool layer can be exercised without a macOS runtime. Identifiers are
//! random UUIDs; external identifiers are prefixed `ext-`.

use std::collections::HashMap;
use std::time::Duration;

use chrono::{Local, NaiveDateTime};

use super::NativeStore;
use super::types::{
    CollectionRecord, EventDraft, EventRecord, ItemKind, ReminderDraft, ReminderPredicate,
    ReminderRecord, Span, StoreError,
};

/// In-memory calendars, lists, events and reminders.
#[derive(Debug, Default)]
pub struct MemoryNativeStore {
    calendars: Vec<CollectionRecord>,
    lists: Vec<CollectionRecord>,
    default_calendar: Option<String>,
    default_list: Option<String>,
    events: HashMap<String, EventRecord>,
    reminders: HashMap<String, ReminderRecord>,
}

impl MemoryNativeStore {
    /// An empty store with no collections.
    pub fn new() -> Self {
        Self::default()
    }

    /// A store with one `Calendar` calendar and one `Reminders` list, both
    /// set as defaults.
    pub fn with_defaults() -> Self {
        let mut store = Self::new();
        let calendar = store.add_collection(ItemKind::Event, "Calendar");
        let list = store.add_collection(ItemKind::Reminder, "Reminders");
        store.default_calendar = Some(calendar);
        store.default_list = Some(list);
        store
    }

    /// Add a calendar or list titled `title`, returning its identifier.
    pub fn add_collection(&mut self, kind: ItemKind, title: &str) -> String {
        let id = uuid::Uuid::new_v4().to_string();
        let record = CollectionRecord {
            id: id.clone(),
            title: title.to_owned(),
            source_type: "local".to_owned(),
            allows_modifications: true,
        };
        match kind {
            ItemKind::Event => self.calendars.push(record),
            ItemKind::Reminder => self.lists.push(record),
        }
        id
    }

    /// Insert a fully formed event, e.g. a recurring one.
    pub fn insert_event(&mut self, record: EventRecord) {
        self.events.insert(record.id.clone(), record);
    }

    /// Insert a fully formed reminder.
    pub fn insert_reminder(&mut self, record: ReminderRecord) {
        self.reminders.insert(record.id.clone(), record);
    }

    /// Raw native notes of an item, tag block included.
    pub fn raw_notes(&self, id: &str) -> Option<String> {
        self.events
            .get(id)
            .and_then(|e| e.notes.clone())
            .or_else(|| self.reminders.get(id).and_then(|r| r.notes.clone()))
    }

    fn collection(&self, kind: ItemKind, id: Option<&str>) -> Option<&CollectionRecord> {
        let id = id?;
        let pool = match kind {
            ItemKind::Event => &self.calendars,
            ItemKind::Reminder => &self.lists,
        };
        pool.iter().find(|c| c.id == id)
    }

    fn new_ids() -> (String, Option<String>) {
        let id = uuid::Uuid::new_v4().to_string();
        let external = format!("ext-{id}");
        (id, Some(external))
    }
}

impl NativeStore for MemoryNativeStore {
    fn collections(&self, kind: ItemKind) -> Result<Vec<CollectionRecord>, StoreError> {
        Ok(match kind {
            ItemKind::Event => self.calendars.clone(),
            ItemKind::Reminder => self.lists.clone(),
        })
    }

    fn default_collection(&self, kind: ItemKind) -> Result<Option<CollectionRecord>, StoreError> {
        let id = match kind {
            ItemKind::Event => self.default_calendar.as_deref(),
            ItemKind::Reminder => self.default_list.as_deref(),
        };
        Ok(self.collection(kind, id).cloned())
    }

    fn event_with_identifier(&self, id: &str) -> Result<Option<EventRecord>, StoreError> {
        Ok(self.events.get(id).cloned())
    }

    fn reminder_with_identifier(&self, id: &str) -> Result<Option<ReminderRecord>, StoreError> {
        Ok(self.reminders.get(id).cloned())
    }

    fn events_between(
        &self,
        start: NaiveDateTime,
        end: NaiveDateTime,
        calendar_ids: Option<&[String]>,
    ) -> Result<Vec<EventRecord>, StoreError> {
        Ok(self
            .events
            .values()
            .filter(|e| e.start < end && e.end > start)
            .filter(|e| match calendar_ids {
                Some(ids) => e
                    .calendar_id
                    .as_ref()
                    .is_some_and(|id| ids.contains(id)),
                None => true,
            })
            .cloned()
            .collect())
    }

    fn fetch_reminders(
        &self,
        predicate: &ReminderPredicate,
        _timeout: Duration,
    ) -> Result<Vec<ReminderRecord>, StoreError> {
        Ok(self
            .reminders
            .values()
            .filter(|r| predicate.matches(r))
            .cloned()
            .collect())
    }

    fn save_event(&mut self, draft: &EventDraft, _span: Span) -> Result<EventRecord, StoreError> {
        let calendar = self
            .collection(ItemKind::Event, draft.calendar_id.as_deref())
            .cloned();
        let (id, external_id, has_recurrence) = match &draft.id {
            Some(id) => {
                let existing = self
                    .events
                    .get(id)
                    .ok_or_else(|| StoreError::NotFound(format!("Event not found: {id}")))?;
                (id.clone(), existing.external_id.clone(), existing.has_recurrence)
            }
            None => {
                let (id, external) = Self::new_ids();
                (id, external, false)
            }
        };
        let record = EventRecord {
            id: id.clone(),
            external_id,
            title: draft.title.clone(),
            start: draft.start,
            end: draft.end,
            location: draft.location.clone(),
            notes: draft.notes.clone(),
            url: draft.url.clone(),
            is_all_day: draft.is_all_day,
            has_recurrence,
            calendar_id: calendar.as_ref().map(|c| c.id.clone()),
            calendar_title: calendar.map(|c| c.title),
        };
        self.events.insert(id, record.clone());
        Ok(record)
    }

    fn remove_event(&mut self, id: &str, _span: Span) -> Result<(), StoreError> {
        self.events
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| StoreError::NotFound(format!("Event not found: {id}")))
    }

    fn save_reminder(&mut self, draft: &ReminderDraft) -> Result<ReminderRecord, StoreError> {
        let list = self
            .collection(ItemKind::Reminder, draft.list_id.as_deref())
            .cloned();
        let (id, external_id, previous) = match &draft.id {
            Some(id) => {
                let existing = self
                    .reminders
                    .get(id)
                    .ok_or_else(|| StoreError::NotFound(format!("Reminder not found: {id}")))?;
                (id.clone(), existing.external_id.clone(), Some(existing.clone()))
            }
            None => {
                let (id, external) = Self::new_ids();
                (id, external, None)
            }
        };
        // EventKit stamps the completion date on the incomplete → complete edge.
        let completion_date = match (draft.completed, previous.as_ref()) {
            (false, _) => None,
            (true, Some(prev)) if prev.completed => prev.completion_date,
            (true, _) => Some(Local::now().naive_local()),
        };
        let record = ReminderRecord {
            id: id.clone(),
            external_id,
            title: draft.title.clone(),
            notes: draft.notes.clone(),
            list_id: list.as_ref().map(|l| l.id.clone()),
            list_title: list.map(|l| l.title),
            due: draft.due,
            priority: draft.priority,
            completed: draft.completed,
            completion_date,
        };
        self.reminders.insert(id, record.clone());
        Ok(record)
    }

    fn remove_reminder(&mut self, id: &str) -> Result<(), StoreError> {
        self.reminders
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| StoreError::NotFound(format!("Reminder not found: {id}")))
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;
    use chrono::NaiveDate;

    fn at(day: u32, h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 3, day)
            .unwrap()
            .and_hms_opt(h, 0, 0)
            .unwrap()
    }

    fn draft(title: &str, calendar_id: Option<String>) -> EventDraft {
        EventDraft {
            id: None,
            title: title.into(),
            start: at(1, 9),
            end: at(1, 10),
            location: None,
            notes: None,
            url: None,
            is_all_day: false,
            calendar_id,
        }
    }

    #[test]
    fn with_defaults_has_default_collections() {
        let store = MemoryNativeStore::with_defaults();
        let cal = store.default_collection(ItemKind::Event).unwrap().unwrap();
        assert_eq!(cal.title, "Calendar");
        let list = store.default_collection(ItemKind::Reminder).unwrap().unwrap();
        assert_eq!(list.title, "Reminders");
    }

    #[test]
    fn save_event_assigns_ids_and_calendar_title() {
        let mut store = MemoryNativeStore::with_defaults();
        let cal = store.default_collection(ItemKind::Event).unwrap().unwrap();
        let saved = store
            .save_event(&draft("Standup", Some(cal.id)), Span::ThisEvent)
            .unwrap();
        assert!(!saved.id.is_empty());
        assert!(saved.external_id.as_deref().unwrap().starts_with("ext-"));
        assert_eq!(saved.calendar_title.as_deref(), Some("Calendar"));
    }

    #[test]
    fn events_between_filters_by_overlap_and_calendar() {
        let mut store = MemoryNativeStore::with_defaults();
        let other = store.add_collection(ItemKind::Event, "Work");
        store
            .save_event(&draft("a", Some(other.clone())), Span::ThisEvent)
            .unwrap();

        let all = store.events_between(at(1, 0), at(2, 0), None).unwrap();
        assert_eq!(all.len(), 1);
        let none = store.events_between(at(2, 0), at(3, 0), None).unwrap();
        assert!(none.is_empty());
        let wrong_cal = store
            .events_between(at(1, 0), at(2, 0), Some(&["nope".to_owned()][..]))
            .unwrap();
        assert!(wrong_cal.is_empty());
        let right_cal = store
            .events_between(at(1, 0), at(2, 0), Some(&[other][..]))
            .unwrap();
        assert_eq!(right_cal.len(), 1);
    }

    #[test]
    fn remove_missing_is_not_found() {
        let mut store = MemoryNativeStore::new();
        assert!(matches!(
            store.remove_event("x", Span::ThisEvent),
            Err(StoreError::NotFound(_))
        ));
        assert!(matches!(
            store.remove_reminder("x"),
            Err(StoreError::NotFound(_))
        ));
    }

    #[test]
    fn completing_reminder_stamps_completion_date() {
        let mut store = MemoryNativeStore::with_defaults();
        let created = store
            .save_reminder(&ReminderDraft {
                id: None,
                title: "Buy milk".into(),
                notes: None,
                list_id: None,
                due: None,
                priority: 0,
                completed: false,
            })
            .unwrap();
        assert!(created.completion_date.is_none());

        let mut done = ReminderDraft::from(&created);
        done.completed = true;
        let saved = store.save_reminder(&done).unwrap();
        assert!(saved.completed);
        assert!(saved.completion_date.is_some());
    }
}
