//! The single serialized access point to the native store.

use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{Duration as ChronoDuration, Local, NaiveDateTime};

use super::NativeStore;
use super::types::{
    CalendarEvent, CollectionInfo, CollectionRecord, EventDraft, EventPatch, EventQuery,
    EventRecord, EventSearch, ItemKind, NewEvent, NewReminder, Priority, Reminder, ReminderDraft,
    ReminderPatch, ReminderPredicate, ReminderQuery, ReminderRecord, ReminderSearch, Span,
    StoreError,
};
use crate::config::StoreConfig;
use crate::permissions::{EntityCategory, PermissionGate};
use crate::tags::{decode_tags, has_all_tags, merge_notes_with_tags, update_tags};

type NativeGuard<'a> = MutexGuard<'a, Box<dyn NativeStore>>;

/// Calendar and reminder operations over one native store.
///
/// Every method checks the relevant permission category first, then takes
/// the store lock for the whole native interaction. Notes are decoded into
/// clean text plus tags on the way out and re-encoded on the way in.
pub struct ItemStore {
    native: Mutex<Box<dyn NativeStore>>,
    gate: Arc<PermissionGate>,
    config: StoreConfig,
    attribution: String,
}

impl ItemStore {
    /// Wrap `native`, stamping `attribution` into the notes of created items.
    pub fn new(
        native: Box<dyn NativeStore>,
        gate: Arc<PermissionGate>,
        config: StoreConfig,
        attribution: impl Into<String>,
    ) -> Self {
        Self {
            native: Mutex::new(native),
            gate,
            config,
            attribution: attribution.into(),
        }
    }

    /// The permission gate consulted before each operation.
    pub fn gate(&self) -> &Arc<PermissionGate> {
        &self.gate
    }

    fn lock(&self) -> Result<NativeGuard<'_>, StoreError> {
        self.native
            .lock()
            .map_err(|_| StoreError::Backend("item store lock poisoned".to_owned()))
    }

    // ── Calendars and events ─────────────────────────────────────────────

    /// Every calendar.
    pub fn list_calendars(&self) -> Result<Vec<CollectionInfo>, StoreError> {
        self.gate.require(EntityCategory::Events)?;
        let native = self.lock()?;
        let calendars = native.collections(ItemKind::Event)?;
        Ok(calendars.into_iter().map(CollectionInfo::from).collect())
    }

    /// Events in a window, ascending by start.
    pub fn get_events(&self, query: &EventQuery) -> Result<Vec<CalendarEvent>, StoreError> {
        self.gate.require(EntityCategory::Events)?;
        let native = self.lock()?;
        let mut records = match &query.calendar {
            Some(title) => match find_collection(&native, ItemKind::Event, title)? {
                Some(cal) => native.events_between(
                    query.start,
                    query.end,
                    Some(std::slice::from_ref(&cal.id)),
                )?,
                None => {
                    tracing::debug!(calendar = %title, "unknown calendar; no events");
                    return Ok(Vec::new());
                }
            },
            None => native.events_between(query.start, query.end, None)?,
        };
        drop(native);

        records.sort_by_key(|r| r.start);
        records.truncate(query.limit);
        tracing::debug!(count = records.len(), "fetched events");
        Ok(records.into_iter().map(event_from_record).collect())
    }

    /// One event by internal or external identifier.
    pub fn get_event(&self, id: &str) -> Result<CalendarEvent, StoreError> {
        self.gate.require(EntityCategory::Events)?;
        let native = self.lock()?;
        let record = self.find_event(&native, id)?;
        Ok(event_from_record(record))
    }

    /// Create an event in the named (or default) calendar.
    pub fn create_event(&self, new: NewEvent) -> Result<CalendarEvent, StoreError> {
        self.gate.require(EntityCategory::Events)?;
        check_range(new.start, new.end)?;
        let mut native = self.lock()?;
        let calendar = resolve_target(&native, ItemKind::Event, new.calendar.as_deref())?;

        let notes = self.attributed_notes(new.notes.as_deref(), new.tags.as_deref());
        let draft = EventDraft {
            id: None,
            title: new.title,
            start: new.start,
            end: new.end,
            location: new.location.filter(|s| !s.is_empty()),
            notes: Some(notes),
            url: new.url.filter(|s| !s.is_empty()),
            is_all_day: new.is_all_day,
            calendar_id: calendar.map(|c| c.id),
        };
        let saved = native.save_event(&draft, Span::ThisEvent)?;
        tracing::info!(id = %saved.id, "event created");
        Ok(event_from_record(saved))
    }

    /// Apply a partial update to an event.
    pub fn edit_event(
        &self,
        id: &str,
        span: Span,
        patch: EventPatch,
    ) -> Result<CalendarEvent, StoreError> {
        self.gate.require(EntityCategory::Events)?;
        let mut native = self.lock()?;
        let record = self.find_event(&native, id)?;
        let mut draft = EventDraft::from(&record);

        if let Some(title) = patch.title {
            draft.title = title;
        }
        if let Some(start) = patch.start {
            draft.start = start;
        }
        if let Some(end) = patch.end {
            draft.end = end;
        }
        check_range(draft.start, draft.end)?;
        if let Some(location) = patch.location {
            draft.location = Some(location).filter(|s| !s.is_empty());
        }
        if let Some(url) = patch.url {
            draft.url = Some(url).filter(|s| !s.is_empty());
        }
        if patch.notes.is_some()
            || patch.tags.is_some()
            || !patch.add_tags.is_empty()
            || !patch.remove_tags.is_empty()
        {
            draft.notes = rewrite_notes(
                draft.notes.as_deref(),
                patch.notes,
                patch.tags,
                &patch.add_tags,
                &patch.remove_tags,
            );
        }

        let saved = native.save_event(&draft, span)?;
        tracing::info!(id = %saved.id, ?span, "event updated");
        Ok(event_from_record(saved))
    }

    /// Delete an event (and, for `FutureEvents`, later occurrences).
    pub fn delete_event(&self, id: &str, span: Span) -> Result<(), StoreError> {
        self.gate.require(EntityCategory::Events)?;
        let mut native = self.lock()?;
        let record = self.find_event(&native, id)?;
        native.remove_event(&record.id, span)?;
        tracing::info!(id = %record.id, ?span, "event deleted");
        Ok(())
    }

    /// Case-insensitive text search plus AND tag filter over events.
    pub fn search_events(&self, search: &EventSearch) -> Result<Vec<CalendarEvent>, StoreError> {
        let now = Local::now().naive_local();
        let query = EventQuery {
            start: search
                .start
                .unwrap_or(now - ChronoDuration::days(self.config.search_past_days)),
            end: search
                .end
                .unwrap_or(now + ChronoDuration::days(self.config.search_future_days)),
            calendar: None,
            limit: self.config.search_candidate_limit,
        };
        let needle = search.query.to_lowercase();
        let results: Vec<CalendarEvent> = self
            .get_events(&query)?
            .into_iter()
            .filter(|e| {
                let haystack = format!(
                    "{} {} {}",
                    e.title,
                    e.location.as_deref().unwrap_or_default(),
                    e.notes
                );
                haystack.to_lowercase().contains(&needle)
            })
            .filter(|e| has_all_tags(&e.tags, &search.tags))
            .take(search.limit)
            .collect();
        Ok(results)
    }

    // ── Reminder lists and reminders ─────────────────────────────────────

    /// Every reminder list.
    pub fn list_reminder_lists(&self) -> Result<Vec<CollectionInfo>, StoreError> {
        self.gate.require(EntityCategory::Reminders)?;
        let native = self.lock()?;
        let lists = native.collections(ItemKind::Reminder)?;
        Ok(lists.into_iter().map(CollectionInfo::from).collect())
    }

    /// Reminders ascending by due date, undated last.
    pub fn get_reminders(&self, query: &ReminderQuery) -> Result<Vec<Reminder>, StoreError> {
        self.gate.require(EntityCategory::Reminders)?;
        let native = self.lock()?;
        let list_ids = match &query.list {
            Some(title) => match find_collection(&native, ItemKind::Reminder, title)? {
                Some(list) => Some(vec![list.id]),
                None => {
                    tracing::debug!(list = %title, "unknown reminder list; no reminders");
                    return Ok(Vec::new());
                }
            },
            None => None,
        };
        let predicate = ReminderPredicate {
            list_ids,
            incomplete_only: !query.include_completed,
            due_before: query.due_before,
        };
        let mut records =
            native.fetch_reminders(&predicate, self.config.reminder_fetch_timeout())?;
        drop(native);

        records.sort_by_key(|r| (r.due.is_none(), r.due));
        records.truncate(query.limit);
        tracing::debug!(count = records.len(), "fetched reminders");
        Ok(records.into_iter().map(reminder_from_record).collect())
    }

    /// One reminder by internal or external identifier.
    pub fn get_reminder(&self, id: &str) -> Result<Reminder, StoreError> {
        self.gate.require(EntityCategory::Reminders)?;
        let native = self.lock()?;
        let record = self.find_reminder(&native, id)?;
        Ok(reminder_from_record(record))
    }

    /// Create a reminder in the named (or default) list.
    pub fn create_reminder(&self, new: NewReminder) -> Result<Reminder, StoreError> {
        self.gate.require(EntityCategory::Reminders)?;
        let mut native = self.lock()?;
        let list = resolve_target(&native, ItemKind::Reminder, new.list.as_deref())?;

        let notes = self.attributed_notes(new.notes.as_deref(), new.tags.as_deref());
        let draft = ReminderDraft {
            id: None,
            title: new.title,
            notes: Some(notes),
            list_id: list.map(|l| l.id),
            due: new.due_date,
            priority: new.priority.unwrap_or_default().to_native(),
            completed: false,
        };
        let saved = native.save_reminder(&draft)?;
        tracing::info!(id = %saved.id, "reminder created");
        Ok(reminder_from_record(saved))
    }

    /// Apply a partial update to a reminder.
    pub fn edit_reminder(&self, id: &str, patch: ReminderPatch) -> Result<Reminder, StoreError> {
        self.gate.require(EntityCategory::Reminders)?;
        let mut native = self.lock()?;
        let record = self.find_reminder(&native, id)?;
        let mut draft = ReminderDraft::from(&record);

        if let Some(title) = patch.title {
            draft.title = title;
        }
        if let Some(due) = patch.due_date {
            draft.due = Some(due);
        }
        if let Some(priority) = patch.priority {
            draft.priority = priority.to_native();
        }
        if let Some(completed) = patch.completed {
            draft.completed = completed;
        }
        if patch.notes.is_some()
            || patch.tags.is_some()
            || !patch.add_tags.is_empty()
            || !patch.remove_tags.is_empty()
        {
            draft.notes = rewrite_notes(
                draft.notes.as_deref(),
                patch.notes,
                patch.tags,
                &patch.add_tags,
                &patch.remove_tags,
            );
        }

        let saved = native.save_reminder(&draft)?;
        tracing::info!(id = %saved.id, "reminder updated");
        Ok(reminder_from_record(saved))
    }

    /// Mark a reminder completed.
    pub fn complete_reminder(&self, id: &str) -> Result<Reminder, StoreError> {
        self.edit_reminder(
            id,
            ReminderPatch {
                completed: Some(true),
                ..ReminderPatch::default()
            },
        )
    }

    /// Delete a reminder.
    pub fn delete_reminder(&self, id: &str) -> Result<(), StoreError> {
        self.gate.require(EntityCategory::Reminders)?;
        let mut native = self.lock()?;
        let record = self.find_reminder(&native, id)?;
        native.remove_reminder(&record.id)?;
        tracing::info!(id = %record.id, "reminder deleted");
        Ok(())
    }

    /// Case-insensitive text search plus AND tag filter over reminders.
    pub fn search_reminders(&self, search: &ReminderSearch) -> Result<Vec<Reminder>, StoreError> {
        let query = ReminderQuery {
            list: None,
            include_completed: search.include_completed,
            due_before: None,
            limit: self.config.search_candidate_limit,
        };
        let needle = search.query.to_lowercase();
        let results: Vec<Reminder> = self
            .get_reminders(&query)?
            .into_iter()
            .filter(|r| format!("{} {}", r.title, r.notes).to_lowercase().contains(&needle))
            .filter(|r| has_all_tags(&r.tags, &search.tags))
            .take(search.limit)
            .collect();
        Ok(results)
    }

    // ── Helpers ──────────────────────────────────────────────────────────

    /// Attribution line, then user notes, then the tag block.
    fn attributed_notes(&self, notes: Option<&str>, tags: Option<&[String]>) -> String {
        let with_attribution = match notes.filter(|n| !n.is_empty()) {
            Some(notes) => format!("{}\n\n{notes}", self.attribution),
            None => self.attribution.clone(),
        };
        merge_notes_with_tags(&with_attribution, tags)
    }

    fn find_event(&self, native: &NativeGuard<'_>, id: &str) -> Result<EventRecord, StoreError> {
        if let Some(record) = native.event_with_identifier(id)? {
            return Ok(record);
        }
        let now = Local::now().naive_local();
        let window = ChronoDuration::days(self.config.lookup_window_days);
        native
            .events_between(now - window, now + window, None)?
            .into_iter()
            .find(|e| e.external_id.as_deref() == Some(id))
            .ok_or_else(|| StoreError::NotFound(format!("Event not found: {id}")))
    }

    fn find_reminder(
        &self,
        native: &NativeGuard<'_>,
        id: &str,
    ) -> Result<ReminderRecord, StoreError> {
        if let Some(record) = native.reminder_with_identifier(id)? {
            return Ok(record);
        }
        native
            .fetch_reminders(
                &ReminderPredicate::default(),
                self.config.reminder_fetch_timeout(),
            )?
            .into_iter()
            .find(|r| r.external_id.as_deref() == Some(id))
            .ok_or_else(|| StoreError::NotFound(format!("Reminder not found: {id}")))
    }
}

fn check_range(start: NaiveDateTime, end: NaiveDateTime) -> Result<(), StoreError> {
    if end < start {
        return Err(StoreError::InvalidInput(
            "end must not be before start".to_owned(),
        ));
    }
    Ok(())
}

fn find_collection(
    native: &NativeGuard<'_>,
    kind: ItemKind,
    title: &str,
) -> Result<Option<CollectionRecord>, StoreError> {
    let wanted = title.to_lowercase();
    Ok(native
        .collections(kind)?
        .into_iter()
        .find(|c| c.title.to_lowercase() == wanted))
}

/// Named collection if it exists, otherwise the platform default.
fn resolve_target(
    native: &NativeGuard<'_>,
    kind: ItemKind,
    title: Option<&str>,
) -> Result<Option<CollectionRecord>, StoreError> {
    if let Some(title) = title
        && let Some(found) = find_collection(native, kind, title)?
    {
        return Ok(Some(found));
    }
    native.default_collection(kind)
}

/// Decode `current`, override whichever half was supplied, re-encode.
/// Replace notes and/or the tag set, then apply incremental tag edits.
fn rewrite_notes(
    current: Option<&str>,
    notes: Option<String>,
    tags: Option<Vec<String>>,
    add: &[String],
    remove: &[String],
) -> Option<String> {
    let (clean, existing_tags) = decode_tags(current.unwrap_or_default());
    let clean = notes.unwrap_or(clean);
    let tags = tags.unwrap_or(existing_tags);
    let merged = merge_notes_with_tags(&clean, Some(tags.as_slice()));
    let updated = if add.is_empty() && remove.is_empty() {
        merged
    } else {
        update_tags(&merged, add, remove)
    };
    (!updated.is_empty()).then_some(updated)
}

fn event_from_record(record: EventRecord) -> CalendarEvent {
    let (notes, tags) = decode_tags(record.notes.as_deref().unwrap_or_default());
    CalendarEvent {
        id: record.id,
        external_id: record.external_id,
        title: record.title,
        start_date: record.start,
        end_date: record.end,
        location: record.location,
        notes,
        tags,
        calendar: record.calendar_title,
        is_all_day: record.is_all_day,
        url: record.url,
        has_recurrence: record.has_recurrence,
    }
}

fn reminder_from_record(record: ReminderRecord) -> Reminder {
    let (notes, tags) = decode_tags(record.notes.as_deref().unwrap_or_default());
    Reminder {
        id: record.id,
        external_id: record.external_id,
        title: record.title,
        notes,
        tags,
        list: record.list_title,
        due_date: record.due,
        priority: Priority::from_native(record.priority),
        completed: record.completed,
        completion_date: record.completion_date,
    }
}
