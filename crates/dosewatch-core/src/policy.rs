//! Escalation policy for missed doses.
//!
//! A pure decision function: given the dose's confirmation state and the
//! medication's unconfirmed-cycle count, produce the action the scheduler
//! should execute at the end of the grace period.
//!
//! ## Escalation ladder
//!
//! - Confirmed in time: no further contact.
//! - Missed, below the alert threshold: re-issue the voice reminder.
//! - Missed, at or past the threshold: re-issue the voice reminder *and*
//!   send the caregiver a summary alert text.

use serde::{Deserialize, Serialize};

/// Action to take when a cycle's deferred evaluation fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    /// Dose was confirmed; end the cycle silently.
    None,
    /// Place a missed-dose voice call for the current dose.
    RetryCall,
    /// Place the retry call and additionally text the caregiver a
    /// missed-dose summary.
    AlertMessage,
}

/// Escalation thresholds. Carried as state so the threshold is tunable
/// from configuration rather than baked into call sites.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EscalationPolicy {
    /// Unconfirmed-cycle count at which a missed dose escalates from a
    /// retry call to a caregiver alert.
    pub miss_threshold: u32,
}

impl Default for EscalationPolicy {
    fn default() -> Self {
        Self { miss_threshold: 3 }
    }
}

impl EscalationPolicy {
    pub fn new(miss_threshold: u32) -> Self {
        Self { miss_threshold }
    }

    /// Decide the escalation action for one dose cycle.
    ///
    /// Deterministic: no clock, no randomness, no hidden state.
    pub fn decide(&self, confirmed: bool, missed_count: u32) -> Action {
        if confirmed {
            Action::None
        } else if missed_count < self.miss_threshold {
            Action::RetryCall
        } else {
            Action::AlertMessage
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_confirmed_is_always_none() {
        let policy = EscalationPolicy::default();
        assert_eq!(policy.decide(true, 0), Action::None);
        assert_eq!(policy.decide(true, 5), Action::None);
    }

    #[test]
    fn test_below_threshold_retries() {
        let policy = EscalationPolicy::default();
        assert_eq!(policy.decide(false, 0), Action::RetryCall);
        assert_eq!(policy.decide(false, 1), Action::RetryCall);
        assert_eq!(policy.decide(false, 2), Action::RetryCall);
    }

    #[test]
    fn test_at_threshold_alerts() {
        let policy = EscalationPolicy::default();
        assert_eq!(policy.decide(false, 3), Action::AlertMessage);
        assert_eq!(policy.decide(false, 10), Action::AlertMessage);
    }

    #[test]
    fn test_threshold_is_tunable() {
        let policy = EscalationPolicy::new(1);
        assert_eq!(policy.decide(false, 0), Action::RetryCall);
        assert_eq!(policy.decide(false, 1), Action::AlertMessage);
    }

    proptest! {
        /// Same inputs, same action.
        #[test]
        fn prop_decide_is_deterministic(confirmed: bool, missed in 0u32..100, threshold in 1u32..10) {
            let policy = EscalationPolicy::new(threshold);
            prop_assert_eq!(policy.decide(confirmed, missed), policy.decide(confirmed, missed));
        }

        /// A confirmed dose never produces gateway traffic.
        #[test]
        fn prop_confirmed_never_escalates(missed in 0u32..100, threshold in 1u32..10) {
            prop_assert_eq!(EscalationPolicy::new(threshold).decide(true, missed), Action::None);
        }

        /// An unconfirmed dose is never silently dropped, and the alert
        /// fires exactly when the threshold is reached.
        #[test]
        fn prop_missed_action_matches_threshold(missed in 0u32..100, threshold in 1u32..10) {
            let action = EscalationPolicy::new(threshold).decide(false, missed);
            if missed < threshold {
                prop_assert_eq!(action, Action::RetryCall);
            } else {
                prop_assert_eq!(action, Action::AlertMessage);
            }
        }
    }
}
