//! EventKit stand-ins for non-macOS platforms.

use std::time::Duration;

use chrono::NaiveDateTime;

use crate::permissions::{
    AccessCompletion, AuthorizationBackend, AuthorizationStatus, EntityCategory,
};
use crate::store::{
    CollectionRecord, EventDraft, EventRecord, ItemKind, NativeStore, ReminderDraft,
    ReminderPredicate, ReminderRecord, Span, StoreError,
};

const UNSUPPORTED: &str = "EventKit is only available on macOS";

fn unsupported<T>() -> Result<T, StoreError> {
    Err(StoreError::Backend(UNSUPPORTED.to_owned()))
}

/// Authorization backend that reports every category as restricted.
pub struct UnsupportedAuthorization;

impl AuthorizationBackend for UnsupportedAuthorization {
    fn status(&self, _category: EntityCategory) -> AuthorizationStatus {
        AuthorizationStatus::Restricted
    }

    fn request_access(&self, _category: EntityCategory, completion: AccessCompletion) {
        completion(false);
    }
}

/// Native store whose every call fails.
pub struct UnsupportedStore;

impl NativeStore for UnsupportedStore {
    fn collections(&self, _kind: ItemKind) -> Result<Vec<CollectionRecord>, StoreError> {
        unsupported()
    }

    fn default_collection(&self, _kind: ItemKind) -> Result<Option<CollectionRecord>, StoreError> {
        unsupported()
    }

    fn event_with_identifier(&self, _id: &str) -> Result<Option<EventRecord>, StoreError> {
        unsupported()
    }

    fn reminder_with_identifier(&self, _id: &str) -> Result<Option<ReminderRecord>, StoreError> {
        unsupported()
    }

    fn events_between(
        &self,
        _start: NaiveDateTime,
        _end: NaiveDateTime,
        _calendar_ids: Option<&[String]>,
    ) -> Result<Vec<EventRecord>, StoreError> {
        unsupported()
    }

    fn fetch_reminders(
        &self,
        _predicate: &ReminderPredicate,
        _timeout: Duration,
    ) -> Result<Vec<ReminderRecord>, StoreError> {
        unsupported()
    }

    fn save_event(&mut self, _draft: &EventDraft, _span: Span) -> Result<EventRecord, StoreError> {
        unsupported()
    }

    fn remove_event(&mut self, _id: &str, _span: Span) -> Result<(), StoreError> {
        unsupported()
    }

    fn save_reminder(&mut self, _draft: &ReminderDraft) -> Result<ReminderRecord, StoreError> {
        unsupported()
    }

    fn remove_reminder(&mut self, _id: &str) -> Result<(), StoreError> {
        unsupported()
    }
}
