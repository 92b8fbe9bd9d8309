//! SQLite storage implementation.

use color_eyre::eyre::WrapErr as _;
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, Pool};
use diesel::sqlite::SqliteConnection;

use crate::models::*;
use crate::schema::*;
use crate::traits::*;
use gcm_core::{CanonicalOutcome, Device, DeviceRegistration};

type SqlitePool = Pool<ConnectionManager<SqliteConnection>>;

/// SQLite-based storage.
#[derive(Clone)]
pub struct SqliteStorage {
    pool: SqlitePool,
}

impl SqliteStorage {
    /// Create a new SQLite storage from a database URL.
    pub fn new(database_url: &str) -> color_eyre::eyre::Result<Self> {
        let manager = ConnectionManager::<SqliteConnection>::new(database_url);
        let pool = Pool::builder()
            .max_size(10)
            .build(manager)
            .wrap_err("failed to create connection pool")?;

        Ok(Self { pool })
    }

    /// Run migrations.
    pub fn run_migrations(&self) -> color_eyre::eyre::Result<()> {
        use diesel_migrations::MigrationHarness as _;

        let mut conn = self
            .pool
            .get()
            .wrap_err("failed to get connection for migrations")?;

        conn.run_pending_migrations(crate::MIGRATIONS)
            .map_err(|e| color_eyre::eyre::eyre!("migration failed: {}", e))?;

        Ok(())
    }

    fn conn(
        &self,
    ) -> color_eyre::eyre::Result<diesel::r2d2::PooledConnection<ConnectionManager<SqliteConnection>>>
    {
        self.pool
            .get()
            .wrap_err("failed to get database connection")
    }
}

fn latest_by_registration_id(
    conn: &mut SqliteConnection,
    registration_id: &str,
) -> QueryResult<Option<DeviceRow>> {
    gcm_devices::table
        .filter(gcm_devices::registration_id.eq(registration_id))
        .order(gcm_devices::id.desc())
        .select(DeviceRow::as_select())
        .first(conn)
        .optional()
}

impl DeviceStore for SqliteStorage {
    fn register(&self, registration: &DeviceRegistration) -> color_eyre::eyre::Result<Device> {
        let mut conn = self.conn()?;
        let now = chrono::Utc::now().naive_utc();

        let row = conn
            .transaction::<_, diesel::result::Error, _>(|conn| {
                let existing = latest_by_registration_id(conn, &registration.registration_id)?;

                match existing {
                    Some(row) => {
                        diesel::update(gcm_devices::table.find(row.id))
                            .set((
                                gcm_devices::active.eq(true),
                                gcm_devices::name
                                    .eq(registration.name.as_deref().or(row.name.as_deref())),
                                gcm_devices::device_id.eq(registration
                                    .device_id
                                    .as_deref()
                                    .or(row.device_id.as_deref())),
                            ))
                            .execute(conn)?;
                    }
                    None => {
                        let new_device = NewDevice {
                            name: registration.name.as_deref(),
                            device_id: registration.device_id.as_deref(),
                            registration_id: &registration.registration_id,
                            active: true,
                            created_at: now,
                        };

                        diesel::insert_into(gcm_devices::table)
                            .values(&new_device)
                            .execute(conn)?;
                    }
                }

                latest_by_registration_id(conn, &registration.registration_id)?
                    .ok_or(diesel::result::Error::NotFound)
            })
            .wrap_err("failed to register device")?;

        tracing::info!(
            device = row.id,
            registration_id = %row.registration_id,
            "registered device"
        );

        Ok(row.into())
    }

    fn get_by_registration_id(
        &self,
        registration_id: &str,
    ) -> color_eyre::eyre::Result<Option<Device>> {
        let mut conn = self.conn()?;

        let row = latest_by_registration_id(&mut conn, registration_id)
            .wrap_err("failed to get device")?;

        Ok(row.map(Into::into))
    }

    fn list(&self, active_only: bool) -> color_eyre::eyre::Result<Vec<Device>> {
        let mut conn = self.conn()?;

        let mut query = gcm_devices::table
            .order(gcm_devices::id.asc())
            .select(DeviceRow::as_select())
            .into_boxed();

        if active_only {
            query = query.filter(gcm_devices::active.eq(true));
        }

        let rows: Vec<DeviceRow> = query.load(&mut conn).wrap_err("failed to list devices")?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    fn active_registration_ids(&self) -> color_eyre::eyre::Result<Vec<String>> {
        let mut conn = self.conn()?;

        let ids: Vec<String> = gcm_devices::table
            .filter(gcm_devices::active.eq(true))
            .order(gcm_devices::id.asc())
            .select(gcm_devices::registration_id)
            .load(&mut conn)
            .wrap_err("failed to load active registration ids")?;

        Ok(ids)
    }

    fn has_active(&self, registration_id: &str) -> color_eyre::eyre::Result<bool> {
        let mut conn = self.conn()?;

        let exists: bool = diesel::select(diesel::dsl::exists(
            gcm_devices::table
                .filter(gcm_devices::registration_id.eq(registration_id))
                .filter(gcm_devices::active.eq(true)),
        ))
        .get_result(&mut conn)
        .wrap_err("failed to check active device")?;

        Ok(exists)
    }

    fn deactivate(&self, registration_id: &str) -> color_eyre::eyre::Result<usize> {
        let mut conn = self.conn()?;

        let updated = diesel::update(
            gcm_devices::table.filter(gcm_devices::registration_id.eq(registration_id)),
        )
        .set(gcm_devices::active.eq(false))
        .execute(&mut conn)
        .wrap_err("failed to deactivate device")?;

        Ok(updated)
    }

    fn reconcile_canonical_id(
        &self,
        canonical_id: &str,
        current_id: &str,
    ) -> color_eyre::eyre::Result<CanonicalOutcome> {
        let mut conn = self.conn()?;

        conn.transaction::<_, diesel::result::Error, _>(|conn| {
            let canonical_active: bool = diesel::select(diesel::dsl::exists(
                gcm_devices::table
                    .filter(gcm_devices::registration_id.eq(canonical_id))
                    .filter(gcm_devices::active.eq(true)),
            ))
            .get_result(conn)?;

            let current = gcm_devices::table.filter(gcm_devices::registration_id.eq(current_id));

            if canonical_active {
                diesel::update(current)
                    .set(gcm_devices::active.eq(false))
                    .execute(conn)?;
                Ok(CanonicalOutcome::DeactivatedDuplicate)
            } else {
                diesel::update(current)
                    .set(gcm_devices::registration_id.eq(canonical_id))
                    .execute(conn)?;
                Ok(CanonicalOutcome::Rewritten)
            }
        })
        .wrap_err("failed to apply canonical id")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn storage() -> (tempfile::TempDir, SqliteStorage) {
        let dir = tempfile::tempdir().unwrap();
        let url = dir.path().join("devices.db");
        let storage = SqliteStorage::new(url.to_str().unwrap()).unwrap();
        storage.run_migrations().unwrap();
        (dir, storage)
    }

    #[test]
    fn test_register_and_get() {
        let (_dir, store) = storage();

        let device = store
            .register(&DeviceRegistration::new("reg-1").with_name("Pixel"))
            .unwrap();
        assert_eq!(device.registration_id, "reg-1");
        assert_eq!(device.name.as_deref(), Some("Pixel"));
        assert!(device.active);

        let fetched = store.get_by_registration_id("reg-1").unwrap().unwrap();
        assert_eq!(fetched, device);
        assert!(store.get_by_registration_id("nope").unwrap().is_none());
    }

    #[test]
    fn test_register_twice_reactivates() {
        let (_dir, store) = storage();

        let first = store
            .register(&DeviceRegistration::new("reg-1").with_device_id("abc"))
            .unwrap();
        store.deactivate("reg-1").unwrap();

        let second = store.register(&DeviceRegistration::new("reg-1")).unwrap();
        assert_eq!(second.id, first.id);
        assert!(second.active);
        assert_eq!(second.device_id.as_deref(), Some("abc"));
        assert_eq!(store.list(false).unwrap().len(), 1);
    }

    #[test]
    fn test_deactivate_and_active_ids() {
        let (_dir, store) = storage();
        for id in ["a", "b", "c"] {
            store.register(&DeviceRegistration::new(id)).unwrap();
        }

        assert_eq!(store.deactivate("b").unwrap(), 1);
        assert_eq!(store.deactivate("missing").unwrap(), 0);

        assert_eq!(store.active_registration_ids().unwrap(), vec!["a", "c"]);
        assert!(!store.has_active("b").unwrap());
        assert_eq!(store.list(true).unwrap().len(), 2);
        assert_eq!(store.list(false).unwrap().len(), 3);
    }

    #[test]
    fn test_canonical_id_rewrites_when_new_id_unknown() {
        let (_dir, store) = storage();
        let old = store.register(&DeviceRegistration::new("old")).unwrap();

        let outcome = store.reconcile_canonical_id("new", "old").unwrap();
        assert_eq!(outcome, CanonicalOutcome::Rewritten);

        assert!(store.get_by_registration_id("old").unwrap().is_none());
        let rewritten = store.get_by_registration_id("new").unwrap().unwrap();
        assert_eq!(rewritten.id, old.id);
        assert!(rewritten.active);
    }

    #[test]
    fn test_canonical_id_deactivates_duplicate() {
        let (_dir, store) = storage();
        store.register(&DeviceRegistration::new("old")).unwrap();
        store.register(&DeviceRegistration::new("new")).unwrap();

        let outcome = store.reconcile_canonical_id("new", "old").unwrap();
        assert_eq!(outcome, CanonicalOutcome::DeactivatedDuplicate);

        let old = store.get_by_registration_id("old").unwrap().unwrap();
        assert!(!old.active);
        assert!(store.has_active("new").unwrap());
        assert_eq!(store.list(false).unwrap().len(), 2);
    }

    #[test]
    fn test_canonical_id_ignores_inactive_target() {
        let (_dir, store) = storage();
        store.register(&DeviceRegistration::new("old")).unwrap();
        store.register(&DeviceRegistration::new("new")).unwrap();
        store.deactivate("new").unwrap();

        let outcome = store.reconcile_canonical_id("new", "old").unwrap();
        assert_eq!(outcome, CanonicalOutcome::Rewritten);
        assert!(store.has_active("new").unwrap());
    }
}
