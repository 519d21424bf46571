//! Dose record storage.
//!
//! The scheduler consumes storage through the [`DoseStore`] trait so tests
//! and embedders can substitute their own backend; [`SqliteStore`] is the
//! shipped adapter.

pub mod sqlite;

pub use sqlite::SqliteStore;

use std::path::PathBuf;

use crate::error::StoreError;
use crate::model::{Caregiver, CaregiverId, Dose, DoseId, Individual, IndividualId};

/// Storage operations the reminder workflow depends on.
///
/// Methods are synchronous: the shipped backend is local SQLite and point
/// lookups are cheap enough to run inline from async tasks. Implementations
/// must be `Sync`; a lookup must observe every update committed before it
/// (the scheduler's grace-period read relies on this).
pub trait DoseStore: Send + Sync {
    /// Look up a dose schedule by id.
    fn dose(&self, id: DoseId) -> Result<Option<Dose>, StoreError>;

    /// Look up an individual by id.
    fn individual(&self, id: IndividualId) -> Result<Option<Individual>, StoreError>;

    /// Look up a caregiver by id.
    fn caregiver(&self, id: CaregiverId) -> Result<Option<Caregiver>, StoreError>;

    /// Set the dose's confirmation flag.
    ///
    /// Confirming is idempotent: the remaining-dose counter decrements only
    /// on the unconfirmed-to-confirmed transition, and the open cycle row
    /// (if any) is marked confirmed at the same time.
    fn update_confirmation(&self, dose_id: DoseId, confirmed: bool) -> Result<(), StoreError>;

    /// Number of reminder cycles for this dose that ended (or are pending)
    /// without confirmation. Cumulative over the dose's lifetime.
    fn count_unconfirmed(&self, dose_id: DoseId) -> Result<u32, StoreError>;

    /// Start a new reminder cycle: clear the confirmation flag and append a
    /// pending cycle record. Called by the scheduler when a cycle is armed.
    fn open_cycle(&self, dose_id: DoseId) -> Result<(), StoreError>;
}

/// Returns `~/.config/dosewatch[-dev]/` based on DOSEWATCH_ENV.
///
/// Set DOSEWATCH_ENV=dev to use the development data directory.
///
/// # Errors
/// Returns an error if creating the directory fails.
pub fn data_dir() -> std::io::Result<PathBuf> {
    let base_dir = dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config");

    let env = std::env::var("DOSEWATCH_ENV").unwrap_or_else(|_| "production".to_string());

    let dir = if env == "dev" {
        base_dir.join("dosewatch-dev")
    } else {
        base_dir.join("dosewatch")
    };

    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}
