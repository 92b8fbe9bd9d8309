//! Storage traits.

use gcm_core::{CanonicalOutcome, Device, DeviceRegistration};

/// Device table operations.
pub trait DeviceStore: Send + Sync {
    /// Register a device, reactivating an existing record with the same
    /// registration id instead of inserting a duplicate.
    fn register(&self, registration: &DeviceRegistration) -> color_eyre::eyre::Result<Device>;

    /// Get the device carrying a registration id.
    fn get_by_registration_id(
        &self,
        registration_id: &str,
    ) -> color_eyre::eyre::Result<Option<Device>>;

    /// List devices, optionally only the active ones.
    fn list(&self, active_only: bool) -> color_eyre::eyre::Result<Vec<Device>>;

    /// Registration ids of all active devices, in registration order.
    fn active_registration_ids(&self) -> color_eyre::eyre::Result<Vec<String>>;

    /// Check whether an active device carries a registration id.
    fn has_active(&self, registration_id: &str) -> color_eyre::eyre::Result<bool>;

    /// Mark every device with a registration id inactive. Returns rows touched.
    fn deactivate(&self, registration_id: &str) -> color_eyre::eyre::Result<usize>;

    /// Apply a canonical id returned by the gateway for `current_id`.
    ///
    /// If an active device already carries `canonical_id`, the `current_id`
    /// record is deactivated. Otherwise it is rewritten to `canonical_id`.
    fn reconcile_canonical_id(
        &self,
        canonical_id: &str,
        current_id: &str,
    ) -> color_eyre::eyre::Result<CanonicalOutcome>;
}
