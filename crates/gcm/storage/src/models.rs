//! Database models.

use diesel::prelude::*;

use crate::schema::gcm_devices;

/// Device record.
#[derive(Debug, Clone, Queryable, Selectable, Identifiable)]
#[diesel(table_name = gcm_devices)]
pub struct DeviceRow {
    pub id: i32,
    pub name: Option<String>,
    pub device_id: Option<String>,
    pub registration_id: String,
    pub active: bool,
    pub created_at: chrono::NaiveDateTime,
}

impl From<DeviceRow> for gcm_core::Device {
    fn from(row: DeviceRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            device_id: row.device_id,
            registration_id: row.registration_id,
            active: row.active,
            created_at: chrono::DateTime::from_naive_utc_and_offset(row.created_at, chrono::Utc),
        }
    }
}

/// New device for insertion.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = gcm_devices)]
pub struct NewDevice<'a> {
    pub name: Option<&'a str>,
    pub device_id: Option<&'a str>,
    pub registration_id: &'a str,
    pub active: bool,
    pub created_at: chrono::NaiveDateTime,
}
