//! Platform-specific EventKit bindings.
//!
//! On macOS the native store and authorization backend wrap `EKEventStore`
//! through `objc2-event-kit`. On other platforms a stub reports
//! `restricted` for both categories and fails every store call, so the
//! server still starts and answers `check_permissions`.

use std::sync::Arc;

use crate::permissions::AuthorizationBackend;
use crate::store::NativeStore;

#[cfg(target_os = "macos")]
mod macos;
#[cfg(not(target_os = "macos"))]
mod stub;
// Re-export stub for tests on all platforms.
#[cfg(test)]
#[cfg(target_os = "macos")]
#[path = "stub.rs"]
mod stub;

/// Create the platform-appropriate native store.
pub fn create_native_store() -> Box<dyn NativeStore> {
    #[cfg(target_os = "macos")]
    {
        Box::new(macos::EventKitStore::new())
    }
    #[cfg(not(target_os = "macos"))]
    {
        Box::new(stub::UnsupportedStore)
    }
}

/// Create the platform-appropriate authorization backend.
pub fn create_authorization_backend() -> Arc<dyn AuthorizationBackend> {
    #[cfg(target_os = "macos")]
    {
        Arc::new(macos::MacOsAuthorization::new())
    }
    #[cfg(not(target_os = "macos"))]
    {
        Arc::new(stub::UnsupportedAuthorization)
    }
}
