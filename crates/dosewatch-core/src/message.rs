//! Notification payload builders.
//!
//! Voice payloads are TwiML `<Say>` documents; the alert is a plain text
//! body. Kept in one place so wording changes never touch the scheduler.

/// Voice script for the initial "dose is due" reminder call.
pub fn reminder_script(medication: &str) -> String {
    format!(
        "<Response><Say>It's time to take your {medication} medication. \
         Please confirm by pressing 1.</Say></Response>"
    )
}

/// Voice script for the retry call after an unconfirmed grace period.
pub fn missed_script(medication: &str) -> String {
    format!(
        "<Response><Say>You missed your {medication} dose. \
         Please take it as soon as possible.</Say></Response>"
    )
}

/// Text body alerting the caregiver to repeated misses.
pub fn alert_body(individual: &str, missed_count: u32, medication: &str) -> String {
    format!("Alert: {individual} has missed {missed_count} doses of {medication}.")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reminder_script_names_medication() {
        let script = reminder_script("Metformin");
        assert!(script.contains("Metformin"));
        assert!(script.starts_with("<Response><Say>"));
        assert!(script.ends_with("</Say></Response>"));
    }

    #[test]
    fn test_missed_script_names_medication() {
        assert!(missed_script("Lisinopril").contains("missed your Lisinopril dose"));
    }

    #[test]
    fn test_alert_body_names_individual_and_count() {
        let body = alert_body("Margaret", 3, "Metformin");
        assert!(body.contains("Margaret"));
        assert!(body.contains("missed 3 doses"));
        assert!(body.contains("Metformin"));
    }
}
