//! Domain records: caregivers, individuals, and dose schedules.
//!
//! Ownership runs caregiver -> individual -> dose: the caregiver is the
//! authority for the notification phone number, an individual belongs to
//! exactly one caregiver, and a dose schedule belongs to exactly one
//! individual.

use serde::{Deserialize, Serialize};

pub type CaregiverId = i64;
pub type IndividualId = i64;
pub type DoseId = i64;

/// A registered caregiver. `phone` is the target for every reminder call
/// and alert text sent on behalf of the caregiver's individuals.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Caregiver {
    pub id: CaregiverId,
    pub name: String,
    pub email: String,
    pub phone: String,
}

/// A care recipient, owned by one caregiver.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Individual {
    pub id: IndividualId,
    pub name: String,
    pub caregiver_id: CaregiverId,
}

/// A scheduled medication dose.
///
/// `confirmed` is the current cycle's flag only; it is reset every time a
/// new reminder cycle is opened. `doses_remaining` only ever decreases, and
/// only when an unconfirmed dose transitions to confirmed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dose {
    pub id: DoseId,
    pub medication: String,
    /// Scheduled time of day, e.g. "08:00".
    pub time_of_day: String,
    pub doses_remaining: u32,
    pub confirmed: bool,
    pub individual_id: IndividualId,
}
