//! Diesel schema definitions.

diesel::table! {
    gcm_devices (id) {
        id -> Integer,
        name -> Nullable<Text>,
        device_id -> Nullable<Text>,
        registration_id -> Text,
        active -> Bool,
        created_at -> Timestamp,
    }
}
