//! Device registration types.

/// A registered Android device.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Device {
    /// Database row id.
    pub id: i32,
    /// Optional human-readable name.
    pub name: Option<String>,
    /// Optional hardware identifier reported by the app.
    pub device_id: Option<String>,
    /// Gateway registration token; the addressing key for the device.
    pub registration_id: String,
    /// Inactive devices are skipped by bulk sends.
    pub active: bool,
    /// When the device was first registered.
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// Data needed to register a device.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceRegistration {
    pub registration_id: String,
    pub name: Option<String>,
    pub device_id: Option<String>,
}

impl DeviceRegistration {
    /// Create a registration for a bare registration id.
    pub fn new(registration_id: impl Into<String>) -> Self {
        Self {
            registration_id: registration_id.into(),
            ..Default::default()
        }
    }

    /// Set the display name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set the hardware identifier.
    pub fn with_device_id(mut self, device_id: impl Into<String>) -> Self {
        self.device_id = Some(device_id.into());
        self
    }
}

/// What canonical-id reconciliation did to the device table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CanonicalOutcome {
    /// An active device already carries the canonical id, so the record for
    /// the old id was deactivated.
    DeactivatedDuplicate,
    /// The old id's record was rewritten to carry the canonical id.
    Rewritten,
    /// The canonical id is the id already in use.
    Unchanged,
}
