//! GCM Push Dispatch
//!
//! Sends notifications to Android devices through the FCM v1 API and keeps
//! the device table in step with what the gateway reports.

mod canonical;
mod fcm;
mod service;
mod traits;

pub use canonical::apply_canonical_id;
pub use fcm::*;
pub use service::*;
pub use traits::*;

// Re-export for convenience
pub use gcm_auth;
pub use gcm_core;
pub use gcm_storage;
