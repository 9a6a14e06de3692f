//! Authorization handshake for the Calendar and Reminders categories.
//!
//! The OS privacy subsystem tracks events and reminders independently, so
//! every operation names the [`EntityCategory`] it touches and the
//! [`PermissionGate`] refuses to proceed unless that category is fully
//! authorized. `write_only` grants are treated as unauthorized.
//!
//! The gate talks to the OS through the narrow [`AuthorizationBackend`]
//! trait: `platform::MacOsAuthorization` on macOS, an always-restricted
//! stub elsewhere, and [`StaticAuthorization`] in tests.

#[cfg(feature = "tcc-repair")]
pub mod tcc;

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// A category of calendar data with its own OS authorization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityCategory {
    /// Calendar events.
    Events,
    /// Reminders.
    Reminders,
}

impl EntityCategory {
    /// Both categories, events first.
    pub fn all() -> &'static [EntityCategory] {
        &[EntityCategory::Events, EntityCategory::Reminders]
    }

    /// User-facing name of the privacy pane ("Calendar" / "Reminders").
    pub fn display_name(self) -> &'static str {
        match self {
            EntityCategory::Events => "Calendar",
            EntityCategory::Reminders => "Reminders",
        }
    }
}

impl fmt::Display for EntityCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Authorization state reported by the OS for one category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthorizationStatus {
    /// The user has not been asked yet.
    NotDetermined,
    /// Blocked by device policy; the user cannot change it.
    Restricted,
    /// The user declined access.
    Denied,
    /// Full read/write access.
    Authorized,
    /// Events may be added but not read.
    WriteOnly,
}

impl AuthorizationStatus {
    /// Map the raw `EKAuthorizationStatus` integer (0..=4).
    ///
    /// Unknown values are treated as `Restricted`.
    pub fn from_raw(raw: i64) -> Self {
        match raw {
            0 => AuthorizationStatus::NotDetermined,
            1 => AuthorizationStatus::Restricted,
            2 => AuthorizationStatus::Denied,
            3 => AuthorizationStatus::Authorized,
            4 => AuthorizationStatus::WriteOnly,
            _ => AuthorizationStatus::Restricted,
        }
    }

    /// Wire name (`not_determined`, `write_only`, ...).
    pub fn as_str(self) -> &'static str {
        match self {
            AuthorizationStatus::NotDetermined => "not_determined",
            AuthorizationStatus::Restricted => "restricted",
            AuthorizationStatus::Denied => "denied",
            AuthorizationStatus::Authorized => "authorized",
            AuthorizationStatus::WriteOnly => "write_only",
        }
    }

    /// Only a full grant counts.
    pub fn is_authorized(self) -> bool {
        self == AuthorizationStatus::Authorized
    }
}

impl fmt::Display for AuthorizationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Completion callback invoked with `true` when access was granted.
pub type AccessCompletion = Box<dyn FnOnce(bool) + Send + 'static>;

/// Narrow interface to the OS authorization API.
pub trait AuthorizationBackend: Send + Sync {
    /// Current status for `category`.
    fn status(&self, category: EntityCategory) -> AuthorizationStatus;

    /// Ask the OS to prompt for `category`.
    ///
    /// Returns immediately; `completion` runs on an arbitrary thread once the
    /// user (or policy) decides, possibly never.
    fn request_access(&self, category: EntityCategory, completion: AccessCompletion);
}

/// Result of checking a single category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionCheck {
    /// Raw status.
    pub status: AuthorizationStatus,
    /// Whether operations may proceed.
    pub authorized: bool,
    /// Whether a consent request can still change the outcome.
    pub can_request: bool,
}

/// Both categories plus remediation text for anything not authorized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionReport {
    /// Events category.
    pub calendar: PermissionCheck,
    /// Reminders category.
    pub reminders: PermissionCheck,
    /// Both categories authorized.
    pub all_authorized: bool,
    /// One line per unauthorized category.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instructions: Option<Vec<String>>,
}

/// Returned by [`PermissionGate::require`] when a category is not authorized.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{category} access {status}. {instructions}")]
pub struct PermissionError {
    /// Category that was refused.
    pub category: EntityCategory,
    /// Status at the time of the check.
    pub status: AuthorizationStatus,
    /// How the user can fix it.
    pub instructions: String,
}

/// Remediation text for `category` in `status`.
pub fn instructions_for(category: EntityCategory, status: AuthorizationStatus) -> String {
    let name = category.display_name();
    match status {
        AuthorizationStatus::Denied => format!(
            "{name} access denied. Please enable in: System Settings > Privacy & Security > \
             {name} > Enable access for Terminal or Claude Desktop."
        ),
        AuthorizationStatus::Restricted => {
            format!("{name} access is restricted by device policy.")
        }
        AuthorizationStatus::WriteOnly => format!(
            "{name} access is write-only. Full access is required: System Settings > \
             Privacy & Security > {name} > Full Access."
        ),
        AuthorizationStatus::NotDetermined | AuthorizationStatus::Authorized => format!(
            "{name} access not yet requested. Run `eventkit-setup request` from Terminal."
        ),
    }
}

/// Permission checks shared by every tool.
pub struct PermissionGate {
    backend: Arc<dyn AuthorizationBackend>,
}

impl PermissionGate {
    /// Create a gate over `backend`.
    pub fn new(backend: Arc<dyn AuthorizationBackend>) -> Self {
        Self { backend }
    }

    /// Check one category.
    pub fn check(&self, category: EntityCategory) -> PermissionCheck {
        let status = self.backend.status(category);
        let can_request = match status {
            AuthorizationStatus::NotDetermined => true,
            AuthorizationStatus::WriteOnly => category == EntityCategory::Events,
            _ => false,
        };
        PermissionCheck {
            status,
            authorized: status.is_authorized(),
            can_request,
        }
    }

    /// Check both categories and collect remediation text.
    pub fn report(&self) -> PermissionReport {
        let calendar = self.check(EntityCategory::Events);
        let reminders = self.check(EntityCategory::Reminders);
        let all_authorized = calendar.authorized && reminders.authorized;

        let mut instructions = Vec::new();
        if !calendar.authorized {
            instructions.push(instructions_for(EntityCategory::Events, calendar.status));
        }
        if !reminders.authorized {
            instructions.push(instructions_for(EntityCategory::Reminders, reminders.status));
        }

        PermissionReport {
            calendar,
            reminders,
            all_authorized,
            instructions: (!instructions.is_empty()).then_some(instructions),
        }
    }

    /// Fail with remediation text unless `category` is authorized.
    ///
    /// # Errors
    ///
    /// Returns [`PermissionError`] for every status except `authorized`.
    pub fn require(&self, category: EntityCategory) -> Result<(), PermissionError> {
        let status = self.backend.status(category);
        if status.is_authorized() {
            return Ok(());
        }
        tracing::debug!(%category, %status, "operation refused by permission gate");
        Err(PermissionError {
            category,
            status,
            instructions: instructions_for(category, status),
        })
    }

    /// Fire a consent request without waiting for the answer.
    pub fn request(&self, category: EntityCategory) {
        self.backend.request_access(
            category,
            Box::new(move |granted| {
                tracing::info!(%category, granted, "access request completed");
            }),
        );
    }

    /// Fire a consent request and block up to `timeout` for the answer.
    ///
    /// A timeout is not an error: the freshly read status is returned,
    /// normally still `not_determined`.
    pub fn request_and_wait(
        &self,
        category: EntityCategory,
        timeout: Duration,
    ) -> AuthorizationStatus {
        let (tx, rx) = crossbeam_channel::bounded::<bool>(1);
        self.backend.request_access(
            category,
            Box::new(move |granted| {
                let _ = tx.send(granted);
            }),
        );
        match rx.recv_timeout(timeout) {
            Ok(granted) => tracing::info!(%category, granted, "access request answered"),
            Err(_) => tracing::warn!(
                %category,
                timeout_secs = timeout.as_secs(),
                "no answer to access request before timeout"
            ),
        }
        self.backend.status(category)
    }

    /// Startup pre-warm: request every category that can still be asked.
    ///
    /// Outcomes are discarded.
    pub fn prewarm(&self) {
        for &category in EntityCategory::all() {
            if self.check(category).can_request {
                tracing::debug!(%category, "pre-warming access request");
                self.request(category);
            }
        }
    }
}

/// In-memory [`AuthorizationBackend`] with fixed statuses.
///
/// `request_access` applies the configured answer for categories that are
/// still `not_determined` and invokes the completion synchronously.
pub struct StaticAuthorization {
    statuses: Mutex<HashMap<EntityCategory, AuthorizationStatus>>,
    grant_on_request: bool,
    requests: Mutex<Vec<EntityCategory>>,
}

impl StaticAuthorization {
    /// Backend reporting `events` and `reminders`.
    pub fn new(events: AuthorizationStatus, reminders: AuthorizationStatus) -> Self {
        let mut statuses = HashMap::new();
        statuses.insert(EntityCategory::Events, events);
        statuses.insert(EntityCategory::Reminders, reminders);
        Self {
            statuses: Mutex::new(statuses),
            grant_on_request: false,
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Both categories authorized.
    pub fn authorized() -> Self {
        Self::new(
            AuthorizationStatus::Authorized,
            AuthorizationStatus::Authorized,
        )
    }

    /// Grant access when a consent request is made.
    #[must_use]
    pub fn granting_requests(mut self) -> Self {
        self.grant_on_request = true;
        self
    }

    /// Overwrite the status of `category`.
    pub fn set_status(&self, category: EntityCategory, status: AuthorizationStatus) {
        if let Ok(mut statuses) = self.statuses.lock() {
            statuses.insert(category, status);
        }
    }

    /// Categories passed to `request_access`, in call order.
    pub fn requests(&self) -> Vec<EntityCategory> {
        self.requests
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }
}

impl AuthorizationBackend for StaticAuthorization {
    fn status(&self, category: EntityCategory) -> AuthorizationStatus {
        self.statuses
            .lock()
            .ok()
            .and_then(|s| s.get(&category).copied())
            .unwrap_or(AuthorizationStatus::NotDetermined)
    }

    fn request_access(&self, category: EntityCategory, completion: AccessCompletion) {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(category);
        }
        let current = self.status(category);
        let granted = if current == AuthorizationStatus::NotDetermined {
            let next = if self.grant_on_request {
                AuthorizationStatus::Authorized
            } else {
                AuthorizationStatus::Denied
            };
            self.set_status(category, next);
            self.grant_on_request
        } else {
            current.is_authorized()
        };
        completion(granted);
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;

    fn gate(events: AuthorizationStatus, reminders: AuthorizationStatus) -> PermissionGate {
        PermissionGate::new(Arc::new(StaticAuthorization::new(events, reminders)))
    }

    #[test]
    fn status_from_raw_maps_all_values() {
        assert_eq!(
            AuthorizationStatus::from_raw(0),
            AuthorizationStatus::NotDetermined
        );
        assert_eq!(AuthorizationStatus::from_raw(3), AuthorizationStatus::Authorized);
        assert_eq!(AuthorizationStatus::from_raw(4), AuthorizationStatus::WriteOnly);
        assert_eq!(AuthorizationStatus::from_raw(42), AuthorizationStatus::Restricted);
    }

    #[test]
    fn status_serializes_snake_case() {
        let json = serde_json::to_string(&AuthorizationStatus::NotDetermined).unwrap();
        assert_eq!(json, "\"not_determined\"");
    }

    #[test]
    fn write_only_is_not_authorized() {
        let g = gate(AuthorizationStatus::WriteOnly, AuthorizationStatus::Authorized);
        let check = g.check(EntityCategory::Events);
        assert!(!check.authorized);
        assert!(check.can_request);
        assert!(g.require(EntityCategory::Events).is_err());
        assert!(g.require(EntityCategory::Reminders).is_ok());
    }

    #[test]
    fn reminders_write_only_cannot_request() {
        let g = gate(AuthorizationStatus::Authorized, AuthorizationStatus::WriteOnly);
        assert!(!g.check(EntityCategory::Reminders).can_request);
    }

    #[test]
    fn denied_error_message_has_remediation() {
        let g = gate(AuthorizationStatus::Denied, AuthorizationStatus::Authorized);
        let err = g.require(EntityCategory::Events).unwrap_err();
        let message = err.to_string();
        assert!(message.starts_with("Calendar access denied."));
        assert!(message.contains("System Settings > Privacy & Security > Calendar"));
    }

    #[test]
    fn report_collects_instructions_per_category() {
        let g = gate(
            AuthorizationStatus::Restricted,
            AuthorizationStatus::NotDetermined,
        );
        let report = g.report();
        assert!(!report.all_authorized);
        let instructions = report.instructions.unwrap();
        assert_eq!(instructions.len(), 2);
        assert!(instructions[0].contains("restricted by device policy"));
        assert!(instructions[1].starts_with("Reminders access not yet requested"));
    }

    #[test]
    fn report_all_authorized_has_no_instructions() {
        let report = gate(
            AuthorizationStatus::Authorized,
            AuthorizationStatus::Authorized,
        )
        .report();
        assert!(report.all_authorized);
        assert!(report.instructions.is_none());
        let json = serde_json::to_value(&report).unwrap();
        assert!(json.get("instructions").is_none());
    }

    #[test]
    fn request_and_wait_returns_fresh_status() {
        let backend = Arc::new(
            StaticAuthorization::new(
                AuthorizationStatus::NotDetermined,
                AuthorizationStatus::Authorized,
            )
            .granting_requests(),
        );
        let g = PermissionGate::new(backend);
        let status = g.request_and_wait(EntityCategory::Events, Duration::from_millis(50));
        assert_eq!(status, AuthorizationStatus::Authorized);
    }

    struct SilentBackend;

    impl AuthorizationBackend for SilentBackend {
        fn status(&self, _category: EntityCategory) -> AuthorizationStatus {
            AuthorizationStatus::NotDetermined
        }
        fn request_access(&self, _category: EntityCategory, completion: AccessCompletion) {
            // Never answers; keep the sender alive past the wait.
            std::mem::forget(completion);
        }
    }

    #[test]
    fn request_timeout_is_not_an_error() {
        let g = PermissionGate::new(Arc::new(SilentBackend));
        let status = g.request_and_wait(EntityCategory::Reminders, Duration::from_millis(20));
        assert_eq!(status, AuthorizationStatus::NotDetermined);
    }

    #[test]
    fn prewarm_only_requests_askable_categories() {
        let backend = Arc::new(StaticAuthorization::new(
            AuthorizationStatus::Denied,
            AuthorizationStatus::NotDetermined,
        ));
        let g = PermissionGate::new(Arc::clone(&backend) as Arc<dyn AuthorizationBackend>);
        g.prewarm();
        assert_eq!(backend.requests(), vec![EntityCategory::Reminders]);
    }
}
