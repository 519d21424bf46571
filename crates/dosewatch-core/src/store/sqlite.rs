//! SQLite-backed dose record store.
//!
//! Holds the roster (caregivers, individuals, dose schedules) plus the
//! per-dose cycle history used for miss counting. The connection sits
//! behind a mutex so the store is `Sync` and every read is a single
//! consistent snapshot.

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use super::{data_dir, DoseStore};
use crate::error::StoreError;
use crate::model::{Caregiver, CaregiverId, Dose, DoseId, Individual, IndividualId};

/// SQLite dose record store.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open the database at `~/.config/dosewatch/dosewatch.db`.
    ///
    /// Creates the database file and schema if they don't exist.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open() -> Result<Self, StoreError> {
        let path = data_dir()
            .map_err(|e| StoreError::OpenFailed {
                path: "~/.config/dosewatch".into(),
                source: rusqlite::Error::InvalidPath(e.to_string().into()),
            })?
            .join("dosewatch.db");
        Self::open_at(&path)
    }

    /// Open the database at an explicit path.
    pub fn open_at(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open(path).map_err(|source| StoreError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.migrate()?;
        Ok(store)
    }

    /// Open an in-memory database (for tests and ephemeral use).
    pub fn open_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory().map_err(|source| StoreError::OpenFailed {
            path: ":memory:".into(),
            source,
        })?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.migrate()?;
        Ok(store)
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn.lock().map_err(|_| StoreError::Locked)
    }

    fn migrate(&self) -> Result<(), StoreError> {
        self.lock()?
            .execute_batch(
                "CREATE TABLE IF NOT EXISTS caregivers (
                    id    INTEGER PRIMARY KEY AUTOINCREMENT,
                    name  TEXT NOT NULL,
                    email TEXT NOT NULL UNIQUE,
                    phone TEXT NOT NULL DEFAULT ''
                );

                CREATE TABLE IF NOT EXISTS individuals (
                    id           INTEGER PRIMARY KEY AUTOINCREMENT,
                    name         TEXT NOT NULL,
                    caregiver_id INTEGER NOT NULL REFERENCES caregivers(id)
                );

                CREATE TABLE IF NOT EXISTS doses (
                    id              INTEGER PRIMARY KEY AUTOINCREMENT,
                    medication      TEXT NOT NULL,
                    time_of_day     TEXT NOT NULL,
                    doses_remaining INTEGER NOT NULL,
                    confirmed       INTEGER NOT NULL DEFAULT 0,
                    individual_id   INTEGER NOT NULL REFERENCES individuals(id)
                );

                CREATE TABLE IF NOT EXISTS dose_cycles (
                    id         INTEGER PRIMARY KEY AUTOINCREMENT,
                    dose_id    INTEGER NOT NULL REFERENCES doses(id),
                    started_at TEXT NOT NULL,
                    confirmed  INTEGER NOT NULL DEFAULT 0
                );

                -- Miss counting scans cycles per dose
                CREATE INDEX IF NOT EXISTS idx_dose_cycles_dose
                    ON dose_cycles(dose_id, confirmed);",
            )
            .map_err(|e| StoreError::MigrationFailed(e.to_string()))
    }

    // ── Roster CRUD ──────────────────────────────────────────────────

    /// Register a caregiver; returns the new id.
    pub fn add_caregiver(
        &self,
        name: &str,
        email: &str,
        phone: &str,
    ) -> Result<CaregiverId, StoreError> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO caregivers (name, email, phone) VALUES (?1, ?2, ?3)",
            params![name, email, phone],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// All registered caregivers.
    pub fn caregivers(&self) -> Result<Vec<Caregiver>, StoreError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare("SELECT id, name, email, phone FROM caregivers ORDER BY id")?;
        let rows = stmt.query_map([], |row| {
            Ok(Caregiver {
                id: row.get(0)?,
                name: row.get(1)?,
                email: row.get(2)?,
                phone: row.get(3)?,
            })
        })?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// Add a care recipient under a caregiver; returns the new id.
    pub fn add_individual(
        &self,
        name: &str,
        caregiver_id: CaregiverId,
    ) -> Result<IndividualId, StoreError> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO individuals (name, caregiver_id) VALUES (?1, ?2)",
            params![name, caregiver_id],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// Add a dose schedule for an individual; returns the new id.
    pub fn add_dose(
        &self,
        medication: &str,
        time_of_day: &str,
        doses_remaining: u32,
        individual_id: IndividualId,
    ) -> Result<DoseId, StoreError> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO doses (medication, time_of_day, doses_remaining, individual_id)
             VALUES (?1, ?2, ?3, ?4)",
            params![medication, time_of_day, doses_remaining, individual_id],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// Update a dose schedule's time and remaining count.
    pub fn update_dose(
        &self,
        id: DoseId,
        time_of_day: &str,
        doses_remaining: u32,
    ) -> Result<(), StoreError> {
        let changed = self.lock()?.execute(
            "UPDATE doses SET time_of_day = ?1, doses_remaining = ?2 WHERE id = ?3",
            params![time_of_day, doses_remaining, id],
        )?;
        if changed == 0 {
            return Err(StoreError::QueryFailed(format!("no such dose: {id}")));
        }
        Ok(())
    }

    /// All dose schedules.
    pub fn doses(&self) -> Result<Vec<Dose>, StoreError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT id, medication, time_of_day, doses_remaining, confirmed, individual_id
             FROM doses ORDER BY id",
        )?;
        let rows = stmt.query_map([], row_to_dose)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// Delete a dose schedule and its cycle history.
    pub fn remove_dose(&self, id: DoseId) -> Result<(), StoreError> {
        let conn = self.lock()?;
        conn.execute("DELETE FROM dose_cycles WHERE dose_id = ?1", params![id])?;
        conn.execute("DELETE FROM doses WHERE id = ?1", params![id])?;
        Ok(())
    }
}

fn row_to_dose(row: &rusqlite::Row<'_>) -> rusqlite::Result<Dose> {
    Ok(Dose {
        id: row.get(0)?,
        medication: row.get(1)?,
        time_of_day: row.get(2)?,
        doses_remaining: row.get(3)?,
        confirmed: row.get::<_, i64>(4)? != 0,
        individual_id: row.get(5)?,
    })
}

impl DoseStore for SqliteStore {
    fn dose(&self, id: DoseId) -> Result<Option<Dose>, StoreError> {
        let conn = self.lock()?;
        let dose = conn
            .query_row(
                "SELECT id, medication, time_of_day, doses_remaining, confirmed, individual_id
                 FROM doses WHERE id = ?1",
                params![id],
                row_to_dose,
            )
            .optional()?;
        Ok(dose)
    }

    fn individual(&self, id: IndividualId) -> Result<Option<Individual>, StoreError> {
        let conn = self.lock()?;
        let individual = conn
            .query_row(
                "SELECT id, name, caregiver_id FROM individuals WHERE id = ?1",
                params![id],
                |row| {
                    Ok(Individual {
                        id: row.get(0)?,
                        name: row.get(1)?,
                        caregiver_id: row.get(2)?,
                    })
                },
            )
            .optional()?;
        Ok(individual)
    }

    fn caregiver(&self, id: CaregiverId) -> Result<Option<Caregiver>, StoreError> {
        let conn = self.lock()?;
        let caregiver = conn
            .query_row(
                "SELECT id, name, email, phone FROM caregivers WHERE id = ?1",
                params![id],
                |row| {
                    Ok(Caregiver {
                        id: row.get(0)?,
                        name: row.get(1)?,
                        email: row.get(2)?,
                        phone: row.get(3)?,
                    })
                },
            )
            .optional()?;
        Ok(caregiver)
    }

    fn update_confirmation(&self, dose_id: DoseId, confirmed: bool) -> Result<(), StoreError> {
        let conn = self.lock()?;
        if confirmed {
            // Guarded transition: decrement fires only once per cycle.
            let changed = conn.execute(
                "UPDATE doses
                 SET confirmed = 1,
                     doses_remaining = CASE WHEN doses_remaining > 0
                                            THEN doses_remaining - 1 ELSE 0 END
                 WHERE id = ?1 AND confirmed = 0",
                params![dose_id],
            )?;
            if changed > 0 {
                conn.execute(
                    "UPDATE dose_cycles SET confirmed = 1
                     WHERE id = (SELECT id FROM dose_cycles
                                 WHERE dose_id = ?1 AND confirmed = 0
                                 ORDER BY id DESC LIMIT 1)",
                    params![dose_id],
                )?;
            }
        } else {
            conn.execute(
                "UPDATE doses SET confirmed = 0 WHERE id = ?1",
                params![dose_id],
            )?;
        }
        Ok(())
    }

    fn count_unconfirmed(&self, dose_id: DoseId) -> Result<u32, StoreError> {
        let conn = self.lock()?;
        let count: u32 = conn.query_row(
            "SELECT COUNT(*) FROM dose_cycles WHERE dose_id = ?1 AND confirmed = 0",
            params![dose_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    fn open_cycle(&self, dose_id: DoseId) -> Result<(), StoreError> {
        let conn = self.lock()?;
        conn.execute(
            "UPDATE doses SET confirmed = 0 WHERE id = ?1",
            params![dose_id],
        )?;
        conn.execute(
            "INSERT INTO dose_cycles (dose_id, started_at, confirmed) VALUES (?1, ?2, 0)",
            params![dose_id, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }
}
