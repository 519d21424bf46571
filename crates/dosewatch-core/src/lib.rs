//! # DoseWatch Core Library
//!
//! Core business logic for DoseWatch, a medication dose reminder service
//! for caregivers. All operations are available to embedders (the CLI
//! binary, a service layer) through this library; nothing here owns an API
//! surface or a UI.
//!
//! ## Architecture
//!
//! - **Reminder Scheduler**: per-dose reminder cycles -- initial voice call,
//!   deferred grace-period evaluation on an independent tokio timer,
//!   cancellation, one-live-cycle-per-dose deduplication
//! - **Escalation Policy**: pure decision function from confirmation state
//!   and miss count to retry/alert actions
//! - **Storage**: SQLite-backed roster and dose-cycle history behind the
//!   [`DoseStore`] trait
//! - **Gateway**: Twilio REST adapter behind the [`NotificationGateway`]
//!   trait
//!
//! ## Key Components
//!
//! - [`ReminderScheduler`]: owns the trigger/evaluate/escalate workflow
//! - [`EscalationPolicy`]: deterministic escalation decisions
//! - [`SqliteStore`]: dose record persistence
//! - [`TwilioGateway`]: outbound calls and texts
//! - [`Config`]: TOML application configuration

pub mod config;
pub mod error;
pub mod gateway;
pub mod message;
pub mod model;
pub mod policy;
pub mod scheduler;
pub mod store;

pub use config::{Config, TwilioConfig};
pub use error::{ConfigError, CoreError, GatewayError, ReminderError, StoreError};
pub use gateway::{DeliveryId, NotificationGateway, TwilioGateway};
pub use model::{Caregiver, CaregiverId, Dose, DoseId, Individual, IndividualId};
pub use policy::{Action, EscalationPolicy};
pub use scheduler::{ReminderConfig, ReminderScheduler, TriggeredReminder};
pub use store::{DoseStore, SqliteStore};
