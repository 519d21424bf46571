//! Reminder scheduling and escalation.
//!
//! One reminder cycle per due dose: the scheduler places the initial voice
//! reminder synchronously, then arms a single deferred evaluation on its own
//! tokio timer. When the grace period elapses it re-reads the dose, asks the
//! escalation policy for an action, and executes it through the gateway.
//!
//! ## Cycle lifetime
//!
//! ```text
//! trigger -> initial call -> [grace period] -> evaluate -> none | retry | retry+alert
//!                 \-> cancel_cycle() skips the evaluation entirely
//! ```
//!
//! Cycles for different doses run independently; a dose has at most one
//! active cycle, and a duplicate trigger fails with `CycleAlreadyActive`.
//! Triggering callers are never blocked on the deferred step.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use log::{debug, info, warn};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::config::Config;
use crate::error::ReminderError;
use crate::gateway::{DeliveryId, NotificationGateway};
use crate::message;
use crate::model::DoseId;
use crate::policy::{Action, EscalationPolicy};
use crate::store::DoseStore;

/// Scheduler tuning, resolved from [`Config`] or built directly in tests.
#[derive(Debug, Clone, Copy)]
pub struct ReminderConfig {
    /// Wait between the initial call and the deferred evaluation.
    pub grace_period: Duration,
    pub policy: EscalationPolicy,
}

impl Default for ReminderConfig {
    fn default() -> Self {
        Self {
            grace_period: Duration::from_secs(300),
            policy: EscalationPolicy::default(),
        }
    }
}

impl From<&Config> for ReminderConfig {
    fn from(config: &Config) -> Self {
        Self {
            grace_period: Duration::from_secs(config.reminder.grace_period_secs),
            policy: EscalationPolicy::new(config.reminder.miss_threshold),
        }
    }
}

/// Outcome of a successful trigger, returned before the grace period runs.
#[derive(Debug, Clone)]
pub struct TriggeredReminder {
    pub cycle_id: Uuid,
    /// Gateway delivery id of the initial reminder call.
    pub call_id: DeliveryId,
}

enum CycleSlot {
    /// Trigger in flight: validated, initial call not yet placed.
    Reserved,
    /// Deferred evaluation armed.
    Armed(CycleHandle),
}

struct CycleHandle {
    cycle_id: Uuid,
    cancel: Option<oneshot::Sender<()>>,
    task: JoinHandle<()>,
}

impl CycleSlot {
    fn is_live(&self) -> bool {
        match self {
            CycleSlot::Reserved => true,
            CycleSlot::Armed(handle) => !handle.task.is_finished(),
        }
    }
}

/// Owns the dose reminder workflow.
///
/// Store and gateway are injected; the scheduler holds no ambient globals
/// and can be instantiated per embedding (service, CLI, tests).
pub struct ReminderScheduler {
    store: Arc<dyn DoseStore>,
    gateway: Arc<dyn NotificationGateway>,
    config: ReminderConfig,
    active: Mutex<HashMap<DoseId, CycleSlot>>,
}

impl ReminderScheduler {
    pub fn new(
        store: Arc<dyn DoseStore>,
        gateway: Arc<dyn NotificationGateway>,
        config: ReminderConfig,
    ) -> Self {
        Self {
            store,
            gateway,
            config,
            active: Mutex::new(HashMap::new()),
        }
    }

    /// Start a reminder cycle for a due dose.
    ///
    /// Places the initial reminder call and arms the deferred evaluation.
    /// Returns as soon as the call is placed; escalation happens later on
    /// the cycle's own timer.
    ///
    /// # Errors
    /// - [`ReminderError::NotFound`] if the dose chain doesn't resolve
    /// - [`ReminderError::MissingContact`] if the caregiver has no phone
    /// - [`ReminderError::CycleAlreadyActive`] on a duplicate trigger
    /// - [`ReminderError::GatewayFailure`] if the initial call is refused;
    ///   no evaluation is armed in that case
    pub async fn trigger_reminder(
        &self,
        dose_id: DoseId,
    ) -> Result<TriggeredReminder, ReminderError> {
        let dose = self
            .store
            .dose(dose_id)?
            .ok_or(ReminderError::NotFound { entity: "dose", id: dose_id })?;
        let individual =
            self.store
                .individual(dose.individual_id)?
                .ok_or(ReminderError::NotFound {
                    entity: "individual",
                    id: dose.individual_id,
                })?;
        let caregiver =
            self.store
                .caregiver(individual.caregiver_id)?
                .ok_or(ReminderError::NotFound {
                    entity: "caregiver",
                    id: individual.caregiver_id,
                })?;
        if caregiver.phone.is_empty() {
            return Err(ReminderError::MissingContact {
                caregiver_id: caregiver.id,
            });
        }

        self.reserve(dose_id)?;

        let call_id = match self
            .gateway
            .place_voice_call(&caregiver.phone, &message::reminder_script(&dose.medication))
            .await
        {
            Ok(id) => id,
            Err(e) => {
                self.release(dose_id);
                warn!("initial reminder call for dose {dose_id} failed: {e}");
                return Err(ReminderError::GatewayFailure(e));
            }
        };
        info!("placed reminder call {call_id} for dose {dose_id} to {}", caregiver.phone);

        // New cycle: reset the confirmation flag before the timer is armed.
        if let Err(e) = self.store.open_cycle(dose_id) {
            self.release(dose_id);
            return Err(ReminderError::StoreFailure(e));
        }

        let cycle_id = Uuid::new_v4();
        let (cancel_tx, cancel_rx) = oneshot::channel();
        let task = tokio::spawn(run_deferred_evaluation(
            Arc::clone(&self.store),
            Arc::clone(&self.gateway),
            self.config,
            cycle_id,
            dose_id,
            caregiver.phone.clone(),
            individual.name.clone(),
            cancel_rx,
        ));
        debug!(
            "armed evaluation for cycle {cycle_id} (dose {dose_id}) in {:?}",
            self.config.grace_period
        );

        if let Ok(mut active) = self.active.lock() {
            active.insert(
                dose_id,
                CycleSlot::Armed(CycleHandle {
                    cycle_id,
                    cancel: Some(cancel_tx),
                    task,
                }),
            );
        }

        Ok(TriggeredReminder { cycle_id, call_id })
    }

    /// Cancel a pending cycle before its evaluation fires.
    ///
    /// Returns `true` if a live cycle was cancelled. A cycle whose
    /// evaluation already started cannot be recalled.
    pub fn cancel_cycle(&self, dose_id: DoseId) -> bool {
        let slot = match self.active.lock() {
            Ok(mut active) => active.remove(&dose_id),
            Err(_) => None,
        };
        match slot {
            Some(CycleSlot::Armed(mut handle)) if !handle.task.is_finished() => {
                if let Some(cancel) = handle.cancel.take() {
                    let _ = cancel.send(());
                }
                info!("cancelled cycle {} (dose {dose_id})", handle.cycle_id);
                true
            }
            _ => false,
        }
    }

    /// Await the completion of a dose's cycle, including its deferred
    /// evaluation. Used by embedders that must not exit with a timer
    /// pending (the CLI) and by tests.
    pub async fn wait_for_cycle(&self, dose_id: DoseId) {
        let slot = match self.active.lock() {
            Ok(mut active) => active.remove(&dose_id),
            Err(_) => None,
        };
        if let Some(CycleSlot::Armed(handle)) = slot {
            let _ = handle.task.await;
        }
    }

    /// Number of cycles currently pending evaluation.
    pub fn active_cycles(&self) -> usize {
        match self.active.lock() {
            Ok(active) => active.values().filter(|slot| slot.is_live()).count(),
            Err(_) => 0,
        }
    }

    /// Claim the dose's cycle slot, enforcing one live cycle per dose.
    fn reserve(&self, dose_id: DoseId) -> Result<(), ReminderError> {
        let mut active = self
            .active
            .lock()
            .map_err(|_| ReminderError::CycleAlreadyActive { dose_id })?;
        if active.get(&dose_id).is_some_and(CycleSlot::is_live) {
            return Err(ReminderError::CycleAlreadyActive { dose_id });
        }
        active.insert(dose_id, CycleSlot::Reserved);
        Ok(())
    }

    fn release(&self, dose_id: DoseId) {
        if let Ok(mut active) = self.active.lock() {
            active.remove(&dose_id);
        }
    }
}

/// The deferred half of a cycle: sleep out the grace period, then read one
/// snapshot of the dose and execute the policy's action.
#[allow(clippy::too_many_arguments)]
async fn run_deferred_evaluation(
    store: Arc<dyn DoseStore>,
    gateway: Arc<dyn NotificationGateway>,
    config: ReminderConfig,
    cycle_id: Uuid,
    dose_id: DoseId,
    phone: String,
    individual_name: String,
    cancel_rx: oneshot::Receiver<()>,
) {
    let sleep = tokio::time::sleep(config.grace_period);
    tokio::pin!(sleep);
    tokio::select! {
        res = cancel_rx => {
            if res.is_ok() {
                debug!("cycle {cycle_id} cancelled before evaluation");
                return;
            }
            // Sender dropped without an explicit cancel (e.g. the handle
            // was claimed by a waiter); the timer still stands.
            sleep.as_mut().await;
        }
        _ = &mut sleep => {}
    }

    let dose = match store.dose(dose_id) {
        Ok(Some(dose)) => dose,
        Ok(None) => {
            debug!("cycle {cycle_id}: dose {dose_id} no longer exists, skipping");
            return;
        }
        Err(e) => {
            warn!("cycle {cycle_id}: dose read failed, skipping evaluation: {e}");
            return;
        }
    };

    if dose.confirmed {
        info!("cycle {cycle_id}: dose {dose_id} confirmed within grace period");
        return;
    }

    let missed_count = match store.count_unconfirmed(dose_id) {
        Ok(count) => count,
        Err(e) => {
            warn!("cycle {cycle_id}: miss count unavailable: {e}");
            return;
        }
    };

    match config.policy.decide(dose.confirmed, missed_count) {
        Action::None => {}
        Action::RetryCall => {
            place_retry_call(&*gateway, &phone, &dose.medication, cycle_id).await;
        }
        Action::AlertMessage => {
            place_retry_call(&*gateway, &phone, &dose.medication, cycle_id).await;
            match gateway
                .send_text(
                    &phone,
                    &message::alert_body(&individual_name, missed_count, &dose.medication),
                )
                .await
            {
                Ok(msg_id) => {
                    info!("cycle {cycle_id}: sent missed-dose alert {msg_id} ({missed_count} misses)")
                }
                Err(e) => warn!("cycle {cycle_id}: missed-dose alert failed: {e}"),
            }
        }
    }
}

async fn place_retry_call(
    gateway: &dyn NotificationGateway,
    phone: &str,
    medication: &str,
    cycle_id: Uuid,
) {
    match gateway
        .place_voice_call(phone, &message::missed_script(medication))
        .await
    {
        Ok(call_id) => info!("cycle {cycle_id}: placed retry call {call_id}"),
        // No further attempts within this cycle.
        Err(e) => warn!("cycle {cycle_id}: retry call failed: {e}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GatewayError;
    use crate::store::SqliteStore;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

    #[derive(Default)]
    struct MockGateway {
        calls: Mutex<Vec<(String, String)>>,
        texts: Mutex<Vec<(String, String)>>,
        fail_calls: AtomicBool,
        next_id: AtomicU64,
    }

    impl MockGateway {
        fn calls(&self) -> Vec<(String, String)> {
            self.calls.lock().unwrap().clone()
        }

        fn texts(&self) -> Vec<(String, String)> {
            self.texts.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl NotificationGateway for MockGateway {
        async fn place_voice_call(
            &self,
            to: &str,
            script: &str,
        ) -> Result<DeliveryId, GatewayError> {
            if self.fail_calls.load(Ordering::SeqCst) {
                return Err(GatewayError::Rejected {
                    reason: "unreachable destination".to_string(),
                });
            }
            self.calls
                .lock()
                .unwrap()
                .push((to.to_string(), script.to_string()));
            Ok(format!("CA{}", self.next_id.fetch_add(1, Ordering::SeqCst)))
        }

        async fn send_text(&self, to: &str, body: &str) -> Result<DeliveryId, GatewayError> {
            self.texts
                .lock()
                .unwrap()
                .push((to.to_string(), body.to_string()));
            Ok(format!("SM{}", self.next_id.fetch_add(1, Ordering::SeqCst)))
        }
    }

    struct Fixture {
        store: Arc<SqliteStore>,
        gateway: Arc<MockGateway>,
        scheduler: ReminderScheduler,
        dose_id: DoseId,
    }

    fn fixture_with_phone(phone: &str) -> Fixture {
        let store = Arc::new(SqliteStore::open_memory().unwrap());
        let cg = store.add_caregiver("Dana", "dana@example.com", phone).unwrap();
        let ind = store.add_individual("Margaret", cg).unwrap();
        let dose_id = store.add_dose("Metformin", "08:00", 30, ind).unwrap();

        let gateway = Arc::new(MockGateway::default());
        let scheduler = ReminderScheduler::new(
            Arc::clone(&store) as Arc<dyn DoseStore>,
            Arc::clone(&gateway) as Arc<dyn NotificationGateway>,
            ReminderConfig::default(),
        );
        Fixture {
            store,
            gateway,
            scheduler,
            dose_id,
        }
    }

    fn fixture() -> Fixture {
        fixture_with_phone("+15550001")
    }

    #[tokio::test(start_paused = true)]
    async fn test_confirmed_within_grace_period_ends_cycle() {
        let f = fixture();
        let triggered = f.scheduler.trigger_reminder(f.dose_id).await.unwrap();
        assert!(triggered.call_id.starts_with("CA"));

        // Confirmation arrives before the grace period elapses.
        f.store.update_confirmation(f.dose_id, true).unwrap();
        f.scheduler.wait_for_cycle(f.dose_id).await;

        assert_eq!(f.gateway.calls().len(), 1);
        assert!(f.gateway.texts().is_empty());
        assert_eq!(f.store.dose(f.dose_id).unwrap().unwrap().doses_remaining, 29);
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_miss_retries_without_alert() {
        let f = fixture();
        f.scheduler.trigger_reminder(f.dose_id).await.unwrap();
        f.scheduler.wait_for_cycle(f.dose_id).await;

        let calls = f.gateway.calls();
        assert_eq!(calls.len(), 2);
        assert!(calls[0].1.contains("time to take your Metformin"));
        assert!(calls[1].1.contains("missed your Metformin dose"));
        assert!(f.gateway.texts().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_third_miss_sends_alert_naming_individual() {
        let f = fixture();
        // Two earlier cycles ended unconfirmed.
        f.store.open_cycle(f.dose_id).unwrap();
        f.store.open_cycle(f.dose_id).unwrap();

        f.scheduler.trigger_reminder(f.dose_id).await.unwrap();
        f.scheduler.wait_for_cycle(f.dose_id).await;

        assert_eq!(f.gateway.calls().len(), 2);
        let texts = f.gateway.texts();
        assert_eq!(texts.len(), 1);
        assert!(texts[0].1.contains("Margaret"));
        assert!(texts[0].1.contains("missed 3 doses"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_missing_contact_makes_no_gateway_calls() {
        let f = fixture_with_phone("");
        let err = f.scheduler.trigger_reminder(f.dose_id).await.unwrap_err();
        assert!(matches!(err, ReminderError::MissingContact { .. }));
        assert!(f.gateway.calls().is_empty());
        assert!(f.gateway.texts().is_empty());
        assert_eq!(f.scheduler.active_cycles(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unknown_dose_is_not_found() {
        let f = fixture();
        let err = f.scheduler.trigger_reminder(999).await.unwrap_err();
        assert!(matches!(err, ReminderError::NotFound { entity: "dose", .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_duplicate_trigger_fails_and_first_cycle_survives() {
        let f = fixture();
        f.scheduler.trigger_reminder(f.dose_id).await.unwrap();

        let err = f.scheduler.trigger_reminder(f.dose_id).await.unwrap_err();
        assert!(matches!(err, ReminderError::CycleAlreadyActive { .. }));
        assert_eq!(f.scheduler.active_cycles(), 1);

        // The first cycle still runs to completion.
        f.scheduler.wait_for_cycle(f.dose_id).await;
        assert_eq!(f.gateway.calls().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_trigger_allowed_again_after_cycle_completes() {
        let f = fixture();
        f.scheduler.trigger_reminder(f.dose_id).await.unwrap();
        f.scheduler.wait_for_cycle(f.dose_id).await;

        // Slot is free once the previous evaluation finished.
        f.scheduler.trigger_reminder(f.dose_id).await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_cycle_skips_evaluation() {
        let f = fixture();
        f.scheduler.trigger_reminder(f.dose_id).await.unwrap();
        assert!(f.scheduler.cancel_cycle(f.dose_id));

        // Well past the grace period: no retry, no alert.
        tokio::time::sleep(Duration::from_secs(900)).await;
        assert_eq!(f.gateway.calls().len(), 1);
        assert!(f.gateway.texts().is_empty());
        assert_eq!(f.scheduler.active_cycles(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_without_cycle_is_false() {
        let f = fixture();
        assert!(!f.scheduler.cancel_cycle(f.dose_id));
    }

    #[tokio::test(start_paused = true)]
    async fn test_deleted_dose_skips_evaluation() {
        let f = fixture();
        f.scheduler.trigger_reminder(f.dose_id).await.unwrap();
        f.store.remove_dose(f.dose_id).unwrap();

        f.scheduler.wait_for_cycle(f.dose_id).await;
        assert_eq!(f.gateway.calls().len(), 1);
        assert!(f.gateway.texts().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_initial_gateway_failure_arms_nothing() {
        let f = fixture();
        f.gateway.fail_calls.store(true, Ordering::SeqCst);

        let err = f.scheduler.trigger_reminder(f.dose_id).await.unwrap_err();
        assert!(matches!(err, ReminderError::GatewayFailure(_)));
        assert_eq!(f.scheduler.active_cycles(), 0);
        // No cycle was opened either: a fresh trigger starts clean.
        assert_eq!(f.store.count_unconfirmed(f.dose_id).unwrap(), 0);

        f.gateway.fail_calls.store(false, Ordering::SeqCst);
        f.scheduler.trigger_reminder(f.dose_id).await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_failure_terminates_cycle_without_loop() {
        let f = fixture();
        f.scheduler.trigger_reminder(f.dose_id).await.unwrap();
        // Initial call went out; the retry will be rejected.
        f.gateway.fail_calls.store(true, Ordering::SeqCst);

        f.scheduler.wait_for_cycle(f.dose_id).await;
        assert_eq!(f.gateway.calls().len(), 1);
        assert_eq!(f.scheduler.active_cycles(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_cycles_for_different_doses() {
        let f = fixture();
        let ind = f.store.individual(1).unwrap().unwrap();
        let second = f.store.add_dose("Lisinopril", "20:00", 10, ind.id).unwrap();

        f.scheduler.trigger_reminder(f.dose_id).await.unwrap();
        f.scheduler.trigger_reminder(second).await.unwrap();
        assert_eq!(f.scheduler.active_cycles(), 2);

        f.store.update_confirmation(f.dose_id, true).unwrap();
        f.scheduler.wait_for_cycle(f.dose_id).await;
        f.scheduler.wait_for_cycle(second).await;

        // First dose confirmed (1 call); second missed (2 calls).
        assert_eq!(f.gateway.calls().len(), 3);
        assert!(f.gateway.texts().is_empty());
    }
}
