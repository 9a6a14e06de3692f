//! Tool layer: argument parsing, envelopes, and the registry exposed over MCP.
//!
//! Every tool parses its JSON arguments, calls the [`ItemStore`] (or the
//! [`PermissionGate`] for `check_permissions`), and returns a payload that
//! [`ToolResult`] wraps as `{ "success": true, ... }` or
//! `{ "success": false, "error": kind, "message": text }`.

pub mod args;
pub mod calendar;
pub mod context;
pub mod permissions;
pub mod registry;
pub mod reminders;
pub mod types;

use std::sync::Arc;

pub use context::{DatetimeContext, datetime_context, datetime_context_at};
pub use registry::ToolRegistry;
pub use types::{ErrorKind, Tool, ToolError, ToolResult};

use crate::config::ToolMode;
use crate::permissions::PermissionGate;
use crate::store::ItemStore;

/// Register every calendar, reminder and permission tool.
pub fn build_registry(store: Arc<ItemStore>, mode: ToolMode) -> ToolRegistry {
    let gate: Arc<PermissionGate> = Arc::clone(store.gate());
    let mut registry = ToolRegistry::new(mode);

    registry.register(Arc::new(permissions::CheckPermissionsTool::new(gate)));

    registry.register(Arc::new(calendar::ListCalendarsTool::new(Arc::clone(&store))));
    registry.register(Arc::new(calendar::ListEventsTool::new(Arc::clone(&store))));
    registry.register(Arc::new(calendar::GetEventTool::new(Arc::clone(&store))));
    registry.register(Arc::new(calendar::SearchEventsTool::new(Arc::clone(&store))));
    registry.register(Arc::new(calendar::CreateEventTool::new(Arc::clone(&store))));
    registry.register(Arc::new(calendar::EditEventTool::new(Arc::clone(&store))));
    registry.register(Arc::new(calendar::DeleteEventTool::new(Arc::clone(&store))));

    registry.register(Arc::new(reminders::ListReminderListsTool::new(Arc::clone(&store))));
    registry.register(Arc::new(reminders::ListRemindersTool::new(Arc::clone(&store))));
    registry.register(Arc::new(reminders::GetReminderTool::new(Arc::clone(&store))));
    registry.register(Arc::new(reminders::SearchRemindersTool::new(Arc::clone(&store))));
    registry.register(Arc::new(reminders::CreateReminderTool::new(Arc::clone(&store))));
    registry.register(Arc::new(reminders::EditReminderTool::new(Arc::clone(&store))));
    registry.register(Arc::new(reminders::CompleteReminderTool::new(Arc::clone(&store))));
    registry.register(Arc::new(reminders::DeleteReminderTool::new(store)));

    tracing::debug!(
        ?mode,
        available = registry.list_available().len(),
        "tool registry built"
    );
    registry
}

#[cfg(test)]
pub(crate) mod test_support {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use chrono::NaiveDateTime;
    use serde_json::Value;

    use crate::config::{StoreConfig, ToolMode};
    use crate::permissions::{AuthorizationStatus, PermissionGate, StaticAuthorization};
    use crate::store::{
        CollectionRecord, EventDraft, EventRecord, ItemKind, ItemStore, MemoryNativeStore,
        NativeStore, ReminderDraft, ReminderPredicate, ReminderRecord, Span, StoreError,
    };

    pub const ATTRIBUTION: &str = "Created by Claude Desktop";

    pub fn store_with(events: AuthorizationStatus, reminders: AuthorizationStatus) -> Arc<ItemStore> {
        let gate = PermissionGate::new(Arc::new(StaticAuthorization::new(events, reminders)));
        Arc::new(ItemStore::new(
            Box::new(MemoryNativeStore::with_defaults()),
            Arc::new(gate),
            StoreConfig::default(),
            ATTRIBUTION,
        ))
    }

    pub fn authorized_store() -> Arc<ItemStore> {
        store_with(AuthorizationStatus::Authorized, AuthorizationStatus::Authorized)
    }

    /// Envelope produced by the full registry for `name`.
    pub fn envelope(store: &Arc<ItemStore>, name: &str, args: Value) -> Value {
        super::build_registry(Arc::clone(store), ToolMode::Full)
            .call(name, args)
            .unwrap()
            .to_envelope()
    }

    /// Memory store that stays reachable after being handed to an
    /// [`ItemStore`], logging the span of every event write.
    #[derive(Clone)]
    pub struct SharedNative {
        pub memory: Arc<Mutex<MemoryNativeStore>>,
        pub spans: Arc<Mutex<Vec<(String, Span)>>>,
    }

    impl SharedNative {
        pub fn raw_notes(&self, id: &str) -> Option<String> {
            self.memory.lock().unwrap().raw_notes(id)
        }

        pub fn insert_event(&self, record: EventRecord) {
            self.memory.lock().unwrap().insert_event(record);
        }

        pub fn insert_reminder(&self, record: ReminderRecord) {
            self.memory.lock().unwrap().insert_reminder(record);
        }

        pub fn spans(&self) -> Vec<(String, Span)> {
            self.spans.lock().unwrap().clone()
        }
    }

    impl NativeStore for SharedNative {
        fn collections(&self, kind: ItemKind) -> Result<Vec<CollectionRecord>, StoreError> {
            self.memory.lock().unwrap().collections(kind)
        }

        fn default_collection(
            &self,
            kind: ItemKind,
        ) -> Result<Option<CollectionRecord>, StoreError> {
            self.memory.lock().unwrap().default_collection(kind)
        }

        fn event_with_identifier(&self, id: &str) -> Result<Option<EventRecord>, StoreError> {
            self.memory.lock().unwrap().event_with_identifier(id)
        }

        fn reminder_with_identifier(
            &self,
            id: &str,
        ) -> Result<Option<ReminderRecord>, StoreError> {
            self.memory.lock().unwrap().reminder_with_identifier(id)
        }

        fn events_between(
            &self,
            start: NaiveDateTime,
            end: NaiveDateTime,
            calendar_ids: Option<&[String]>,
        ) -> Result<Vec<EventRecord>, StoreError> {
            self.memory
                .lock()
                .unwrap()
                .events_between(start, end, calendar_ids)
        }

        fn fetch_reminders(
            &self,
            predicate: &ReminderPredicate,
            timeout: Duration,
        ) -> Result<Vec<ReminderRecord>, StoreError> {
            self.memory.lock().unwrap().fetch_reminders(predicate, timeout)
        }

        fn save_event(&mut self, draft: &EventDraft, span: Span) -> Result<EventRecord, StoreError> {
            let saved = self.memory.lock().unwrap().save_event(draft, span)?;
            self.spans.lock().unwrap().push((saved.id.clone(), span));
            Ok(saved)
        }

        fn remove_event(&mut self, id: &str, span: Span) -> Result<(), StoreError> {
            self.memory.lock().unwrap().remove_event(id, span)?;
            self.spans.lock().unwrap().push((id.to_owned(), span));
            Ok(())
        }

        fn save_reminder(&mut self, draft: &ReminderDraft) -> Result<ReminderRecord, StoreError> {
            self.memory.lock().unwrap().save_reminder(draft)
        }

        fn remove_reminder(&mut self, id: &str) -> Result<(), StoreError> {
            self.memory.lock().unwrap().remove_reminder(id)
        }
    }

    /// Authorized store over a [`SharedNative`] with default collections.
    pub fn shared_store() -> (Arc<ItemStore>, SharedNative) {
        let native = SharedNative {
            memory: Arc::new(Mutex::new(MemoryNativeStore::with_defaults())),
            spans: Arc::default(),
        };
        let gate = PermissionGate::new(Arc::new(StaticAuthorization::authorized()));
        let store = Arc::new(ItemStore::new(
            Box::new(native.clone()),
            Arc::new(gate),
            StoreConfig::default(),
            ATTRIBUTION,
        ));
        (store, native)
    }
}
