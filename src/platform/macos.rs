//! EventKit bindings via `objc2-event-kit`.
//!
//! [`EventKitStore`] owns one `EKEventStore` and converts between EventKit
//! objects and the plain records in [`crate::store::types`]. Timestamps are
//! exchanged as local wall-clock [`NaiveDateTime`]s; reminder due dates go
//! through `NSDateComponents` resolved against the current calendar.

use std::sync::Mutex;
use std::time::Duration;

use block2::RcBlock;
use chrono::{DateTime, Datelike, Local, NaiveDateTime, TimeZone, Timelike};
use objc2::rc::Retained;
use objc2::runtime::Bool;
use objc2_event_kit::{
    EKCalendar, EKCalendarItem, EKEntityType, EKEvent, EKEventStore, EKReminder, EKSpan,
};
use objc2_foundation::{NSArray, NSCalendar, NSDate, NSDateComponents, NSError, NSString, NSURL};

use crate::permissions::{
    AccessCompletion, AuthorizationBackend, AuthorizationStatus, EntityCategory,
};
use crate::store::{
    CollectionRecord, EventDraft, EventRecord, ItemKind, NativeStore, ReminderDraft,
    ReminderPredicate, ReminderRecord, Span, StoreError,
};

/// `NSDateComponentUndefined`.
const COMPONENT_UNDEFINED: isize = isize::MAX;

fn entity_type(category: EntityCategory) -> EKEntityType {
    match category {
        EntityCategory::Events => EKEntityType::Event,
        EntityCategory::Reminders => EKEntityType::Reminder,
    }
}

fn kind_entity_type(kind: ItemKind) -> EKEntityType {
    match kind {
        ItemKind::Event => EKEntityType::Event,
        ItemKind::Reminder => EKEntityType::Reminder,
    }
}

fn ek_span(span: Span) -> EKSpan {
    match span {
        Span::ThisEvent => EKSpan::ThisEvent,
        Span::FutureEvents => EKSpan::FutureEvents,
    }
}

fn ns_error_message(error: &NSError) -> String {
    error.localizedDescription().to_string()
}

// ─── Date conversion ─────────────────────────────────────────────────────────

fn to_ns_date(value: NaiveDateTime) -> Retained<NSDate> {
    let local = Local
        .from_local_datetime(&value)
        .earliest()
        .unwrap_or_else(|| Local.from_utc_datetime(&value));
    let secs = local.timestamp_millis() as f64 / 1000.0;
    NSDate::dateWithTimeIntervalSince1970(secs)
}

fn from_ns_date(date: &NSDate) -> Option<NaiveDateTime> {
    let interval = date.timeIntervalSince1970();
    let secs = interval.floor() as i64;
    let nanos = ((interval - interval.floor()) * 1e9) as u32;
    DateTime::from_timestamp(secs, nanos).map(|utc| utc.with_timezone(&Local).naive_local())
}

fn to_components(value: NaiveDateTime) -> Retained<NSDateComponents> {
    let components = NSDateComponents::new();
    components.setYear(value.year() as isize);
    components.setMonth(value.month() as isize);
    components.setDay(value.day() as isize);
    components.setHour(value.hour() as isize);
    components.setMinute(value.minute() as isize);
    components.setSecond(value.second() as isize);
    components
}

fn from_components(components: &NSDateComponents) -> Option<NaiveDateTime> {
    let calendar = NSCalendar::currentCalendar();
    if let Some(date) = calendar.dateFromComponents(components) {
        return from_ns_date(&date);
    }
    let or = |value: isize, fallback: isize| {
        if value == COMPONENT_UNDEFINED { fallback } else { value }
    };
    chrono::NaiveDate::from_ymd_opt(
        or(components.year(), 2000) as i32,
        or(components.month(), 1) as u32,
        or(components.day(), 1) as u32,
    )?
    .and_hms_opt(
        or(components.hour(), 0) as u32,
        or(components.minute(), 0) as u32,
        or(components.second(), 0) as u32,
    )
}

fn opt_string(value: Option<Retained<NSString>>) -> Option<String> {
    value.map(|s| s.to_string())
}

fn opt_ns_string(value: Option<&str>) -> Option<Retained<NSString>> {
    value.map(NSString::from_str)
}

// ─── Record conversion ───────────────────────────────────────────────────────

fn source_type_label(calendar: &EKCalendar) -> String {
    // SAFETY: plain property read on a live calendar.
    let raw = unsafe { calendar.r#type() }.0;
    match raw {
        0 => "local",
        1 => "caldav",
        2 => "exchange",
        3 => "subscription",
        4 => "birthday",
        _ => "unknown",
    }
    .to_owned()
}

fn collection_record(calendar: &EKCalendar) -> CollectionRecord {
    // SAFETY: property reads on a calendar owned by our store.
    unsafe {
        CollectionRecord {
            id: calendar.calendarIdentifier().to_string(),
            title: calendar.title().to_string(),
            source_type: source_type_label(calendar),
            allows_modifications: calendar.allowsContentModifications(),
        }
    }
}

struct ItemCommon {
    id: String,
    external_id: Option<String>,
    title: String,
    notes: Option<String>,
    calendar_id: Option<String>,
    calendar_title: Option<String>,
}

fn item_common(item: &EKCalendarItem) -> ItemCommon {
    // SAFETY: property reads on an item owned by our store.
    unsafe {
        let calendar = item.calendar();
        ItemCommon {
            id: item.calendarItemIdentifier().to_string(),
            external_id: opt_string(item.calendarItemExternalIdentifier()),
            title: item.title().to_string(),
            notes: opt_string(item.notes()),
            calendar_id: calendar.as_ref().map(|c| c.calendarIdentifier().to_string()),
            calendar_title: calendar.as_ref().map(|c| c.title().to_string()),
        }
    }
}

fn event_record(event: &EKEvent) -> Option<EventRecord> {
    let common = item_common(event);
    // SAFETY: property reads on an event owned by our store.
    unsafe {
        let start = from_ns_date(&event.startDate())?;
        let end = from_ns_date(&event.endDate())?;
        Some(EventRecord {
            id: common.id,
            external_id: common.external_id,
            title: common.title,
            start,
            end,
            location: opt_string(event.location()),
            notes: common.notes,
            url: event
                .URL()
                .and_then(|u| u.absoluteString())
                .map(|s| s.to_string()),
            is_all_day: event.isAllDay(),
            has_recurrence: event.hasRecurrenceRules(),
            calendar_id: common.calendar_id,
            calendar_title: common.calendar_title,
        })
    }
}

fn reminder_record(reminder: &EKReminder) -> ReminderRecord {
    let common = item_common(reminder);
    // SAFETY: property reads on a reminder owned by our store.
    unsafe {
        ReminderRecord {
            id: common.id,
            external_id: common.external_id,
            title: common.title,
            notes: common.notes,
            list_id: common.calendar_id,
            list_title: common.calendar_title,
            due: reminder
                .dueDateComponents()
                .and_then(|c| from_components(&c)),
            priority: reminder.priority().min(255) as u8,
            completed: reminder.isCompleted(),
            completion_date: reminder.completionDate().and_then(|d| from_ns_date(&d)),
        }
    }
}

// ─── EventKitStore ───────────────────────────────────────────────────────────

/// [`NativeStore`] backed by a single `EKEventStore`.
pub struct EventKitStore {
    store: Retained<EKEventStore>,
}

// SAFETY: EventKitStore is only reachable through the ItemStore mutex, so
// the EKEventStore and every object fetched from it are used by one thread
// at a time. The reminder fetch callback touches only objects EventKit
// hands it and a crossbeam sender.
unsafe impl Send for EventKitStore {}

impl EventKitStore {
    /// Open the user's event store.
    pub fn new() -> Self {
        // SAFETY: `new` is the designated initializer for EKEventStore.
        let store = unsafe { EKEventStore::new() };
        Self { store }
    }

    fn calendars(&self, kind: ItemKind) -> Vec<Retained<EKCalendar>> {
        // SAFETY: read-only query on our store.
        unsafe { self.store.calendarsForEntityType(kind_entity_type(kind)) }.to_vec()
    }

    fn calendar_by_id(&self, id: &str) -> Option<Retained<EKCalendar>> {
        // SAFETY: read-only query on our store.
        unsafe {
            self.store
                .calendarWithIdentifier(&NSString::from_str(id))
        }
    }

    fn calendar_array(
        &self,
        kind: ItemKind,
        ids: Option<&[String]>,
    ) -> Option<Retained<NSArray<EKCalendar>>> {
        let ids = ids?;
        let selected: Vec<Retained<EKCalendar>> = self
            .calendars(kind)
            .into_iter()
            .filter(|c| {
                // SAFETY: property read.
                let id = unsafe { c.calendarIdentifier() }.to_string();
                ids.contains(&id)
            })
            .collect();
        Some(NSArray::from_retained_slice(&selected))
    }

    fn item(&self, id: &str) -> Option<Retained<EKCalendarItem>> {
        // SAFETY: read-only query on our store.
        unsafe { self.store.calendarItemWithIdentifier(&NSString::from_str(id)) }
    }

    fn event_object(&self, id: &str) -> Option<Retained<EKEvent>> {
        self.item(id)?.downcast::<EKEvent>().ok()
    }

    fn reminder_object(&self, id: &str) -> Option<Retained<EKReminder>> {
        self.item(id)?.downcast::<EKReminder>().ok()
    }
}

impl NativeStore for EventKitStore {
    fn collections(&self, kind: ItemKind) -> Result<Vec<CollectionRecord>, StoreError> {
        Ok(self
            .calendars(kind)
            .iter()
            .map(|c| collection_record(c))
            .collect())
    }

    fn default_collection(&self, kind: ItemKind) -> Result<Option<CollectionRecord>, StoreError> {
        // SAFETY: read-only queries on our store.
        let calendar = unsafe {
            match kind {
                ItemKind::Event => self.store.defaultCalendarForNewEvents(),
                ItemKind::Reminder => self.store.defaultCalendarForNewReminders(),
            }
        };
        Ok(calendar.map(|c| collection_record(&c)))
    }

    fn event_with_identifier(&self, id: &str) -> Result<Option<EventRecord>, StoreError> {
        Ok(self.event_object(id).and_then(|e| event_record(&e)))
    }

    fn reminder_with_identifier(&self, id: &str) -> Result<Option<ReminderRecord>, StoreError> {
        Ok(self.reminder_object(id).map(|r| reminder_record(&r)))
    }

    fn events_between(
        &self,
        start: NaiveDateTime,
        end: NaiveDateTime,
        calendar_ids: Option<&[String]>,
    ) -> Result<Vec<EventRecord>, StoreError> {
        let calendars = self.calendar_array(ItemKind::Event, calendar_ids);
        // SAFETY: predicate construction and a synchronous fetch on our store.
        let events = unsafe {
            let predicate = self.store.predicateForEventsWithStartDate_endDate_calendars(
                &to_ns_date(start),
                &to_ns_date(end),
                calendars.as_deref(),
            );
            self.store.eventsMatchingPredicate(&predicate)
        };
        Ok(events.iter().filter_map(|e| event_record(&e)).collect())
    }

    fn fetch_reminders(
        &self,
        predicate: &ReminderPredicate,
        timeout: Duration,
    ) -> Result<Vec<ReminderRecord>, StoreError> {
        let calendars = self.calendar_array(ItemKind::Reminder, predicate.list_ids.as_deref());
        // SAFETY: predicate construction on our store.
        let native_predicate = unsafe {
            if predicate.incomplete_only {
                let due_end = predicate.due_before.map(to_ns_date);
                self.store
                    .predicateForIncompleteRemindersWithDueDateStarting_ending_calendars(
                        None,
                        due_end.as_deref(),
                        calendars.as_deref(),
                    )
            } else {
                self.store
                    .predicateForRemindersInCalendars(calendars.as_deref())
            }
        };

        let (tx, rx) = crossbeam_channel::bounded::<Vec<ReminderRecord>>(1);
        let block = RcBlock::new(move |reminders: *mut NSArray<EKReminder>| {
            // SAFETY: EventKit passes either null or a valid array for the
            // duration of the callback.
            let records = unsafe { reminders.as_ref() }
                .map(|array| array.iter().map(|r| reminder_record(&r)).collect())
                .unwrap_or_default();
            let _ = tx.send(records);
        });
        // SAFETY: the block is retained by EventKit until it has run.
        unsafe {
            self.store
                .fetchRemindersMatchingPredicate_completion(&native_predicate, &block);
        }

        match rx.recv_timeout(timeout) {
            Ok(records) => Ok(records.into_iter().filter(|r| predicate.matches(r)).collect()),
            Err(_) => {
                tracing::warn!(
                    timeout_secs = timeout.as_secs(),
                    "reminder fetch timed out; returning no reminders"
                );
                Ok(Vec::new())
            }
        }
    }

    fn save_event(&mut self, draft: &EventDraft, span: Span) -> Result<EventRecord, StoreError> {
        let event = match &draft.id {
            Some(id) => self
                .event_object(id)
                .ok_or_else(|| StoreError::NotFound(format!("Event not found: {id}")))?,
            // SAFETY: factory method on our store.
            None => unsafe { EKEvent::eventWithEventStore(&self.store) },
        };
        let calendar = draft.calendar_id.as_deref().and_then(|id| self.calendar_by_id(id));
        let url = draft
            .url
            .as_deref()
            .and_then(|u| NSURL::URLWithString(&NSString::from_str(u)));

        // SAFETY: property writes on an event owned by our store, then a
        // committed save.
        unsafe {
            event.setTitle(Some(&NSString::from_str(&draft.title)));
            event.setStartDate(Some(&to_ns_date(draft.start)));
            event.setEndDate(Some(&to_ns_date(draft.end)));
            event.setAllDay(draft.is_all_day);
            event.setLocation(opt_ns_string(draft.location.as_deref()).as_deref());
            event.setNotes(opt_ns_string(draft.notes.as_deref()).as_deref());
            event.setURL(url.as_deref());
            if let Some(calendar) = &calendar {
                event.setCalendar(Some(calendar));
            }
            self.store
                .saveEvent_span_commit_error(&event, ek_span(span), true)
                .map_err(|e| {
                    StoreError::Backend(format!("Failed to save event: {}", ns_error_message(&e)))
                })?;
        }
        event_record(&event)
            .ok_or_else(|| StoreError::Backend("saved event has no dates".to_owned()))
    }

    fn remove_event(&mut self, id: &str, span: Span) -> Result<(), StoreError> {
        let event = self
            .event_object(id)
            .ok_or_else(|| StoreError::NotFound(format!("Event not found: {id}")))?;
        // SAFETY: committed removal of an event owned by our store.
        unsafe {
            self.store
                .removeEvent_span_commit_error(&event, ek_span(span), true)
                .map_err(|e| {
                    StoreError::Backend(format!(
                        "Failed to delete event: {}",
                        ns_error_message(&e)
                    ))
                })
        }
    }

    fn save_reminder(&mut self, draft: &ReminderDraft) -> Result<ReminderRecord, StoreError> {
        let reminder = match &draft.id {
            Some(id) => self
                .reminder_object(id)
                .ok_or_else(|| StoreError::NotFound(format!("Reminder not found: {id}")))?,
            // SAFETY: factory method on our store.
            None => unsafe { EKReminder::reminderWithEventStore(&self.store) },
        };
        let list = draft.list_id.as_deref().and_then(|id| self.calendar_by_id(id));

        // SAFETY: property writes on a reminder owned by our store, then a
        // committed save.
        unsafe {
            reminder.setTitle(Some(&NSString::from_str(&draft.title)));
            reminder.setNotes(opt_ns_string(draft.notes.as_deref()).as_deref());
            reminder.setDueDateComponents(draft.due.map(to_components).as_deref());
            reminder.setPriority(draft.priority as usize);
            reminder.setCompleted(draft.completed);
            if let Some(list) = &list {
                reminder.setCalendar(Some(list));
            }
            self.store
                .saveReminder_commit_error(&reminder, true)
                .map_err(|e| {
                    StoreError::Backend(format!(
                        "Failed to save reminder: {}",
                        ns_error_message(&e)
                    ))
                })?;
        }
        Ok(reminder_record(&reminder))
    }

    fn remove_reminder(&mut self, id: &str) -> Result<(), StoreError> {
        let reminder = self
            .reminder_object(id)
            .ok_or_else(|| StoreError::NotFound(format!("Reminder not found: {id}")))?;
        // SAFETY: committed removal of a reminder owned by our store.
        unsafe {
            self.store
                .removeReminder_commit_error(&reminder, true)
                .map_err(|e| {
                    StoreError::Backend(format!(
                        "Failed to delete reminder: {}",
                        ns_error_message(&e)
                    ))
                })
        }
    }
}

// ─── Authorization ───────────────────────────────────────────────────────────

/// [`AuthorizationBackend`] over `EKEventStore` class and instance methods.
pub struct MacOsAuthorization {
    store: Retained<EKEventStore>,
}

// SAFETY: the only instance method used is
// requestAccessToEntityType:completion:, which EventKit documents as
// callable from any thread; status reads are class methods.
unsafe impl Send for MacOsAuthorization {}
unsafe impl Sync for MacOsAuthorization {}

impl MacOsAuthorization {
    /// Create a backend with its own event store for access requests.
    pub fn new() -> Self {
        // SAFETY: `new` is the designated initializer for EKEventStore.
        let store = unsafe { EKEventStore::new() };
        Self { store }
    }
}

impl AuthorizationBackend for MacOsAuthorization {
    fn status(&self, category: EntityCategory) -> AuthorizationStatus {
        // SAFETY: class method with no preconditions.
        let raw = unsafe { EKEventStore::authorizationStatusForEntityType(entity_type(category)) };
        AuthorizationStatus::from_raw(raw.0 as i64)
    }

    fn request_access(&self, category: EntityCategory, completion: AccessCompletion) {
        let completion = Mutex::new(Some(completion));
        let block = RcBlock::new(move |granted: Bool, _error: *mut NSError| {
            if let Ok(mut slot) = completion.lock()
                && let Some(done) = slot.take()
            {
                done(granted.as_bool());
            }
        });
        tracing::debug!(%category, "requesting EventKit access");
        // SAFETY: EventKit copies the block and invokes it at most once.
        unsafe {
            self.store
                .requestAccessToEntityType_completion(entity_type(category), RcBlock::as_ptr(&block));
        }
    }
}
