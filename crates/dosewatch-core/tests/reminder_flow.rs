//! End-to-end reminder workflow: SQLite store + scheduler + Twilio adapter
//! against a mock HTTP server. Uses a short real-time grace period since
//! mockito serves over real sockets.

use std::sync::Arc;
use std::time::Duration;

use dosewatch_core::{
    DoseStore, EscalationPolicy, ReminderConfig, ReminderScheduler, SqliteStore, TwilioGateway,
};

const CALLS_PATH: &str = "/2010-04-01/Accounts/AC123/Calls.json";
const MESSAGES_PATH: &str = "/2010-04-01/Accounts/AC123/Messages.json";

fn seeded_store() -> (Arc<SqliteStore>, i64) {
    let store = Arc::new(SqliteStore::open_memory().unwrap());
    let cg = store
        .add_caregiver("Dana", "dana@example.com", "+15550001")
        .unwrap();
    let ind = store.add_individual("Margaret", cg).unwrap();
    let dose_id = store.add_dose("Metformin", "08:00", 30, ind).unwrap();
    (store, dose_id)
}

fn scheduler_for(server: &mockito::ServerGuard, store: Arc<SqliteStore>) -> ReminderScheduler {
    let gateway = Arc::new(TwilioGateway::new(
        &server.url(),
        "AC123",
        "token",
        "+15550000",
    ));
    ReminderScheduler::new(
        store,
        gateway,
        ReminderConfig {
            grace_period: Duration::from_millis(100),
            policy: EscalationPolicy::default(),
        },
    )
}

#[tokio::test(flavor = "multi_thread")]
async fn test_confirmed_dose_places_single_call() {
    let mut server = mockito::Server::new_async().await;
    let calls = server
        .mock("POST", CALLS_PATH)
        .with_status(201)
        .with_body(r#"{"sid": "CA1"}"#)
        .expect(1)
        .create_async()
        .await;
    let texts = server
        .mock("POST", MESSAGES_PATH)
        .expect(0)
        .create_async()
        .await;

    let (store, dose_id) = seeded_store();
    let scheduler = scheduler_for(&server, Arc::clone(&store));

    let triggered = scheduler.trigger_reminder(dose_id).await.unwrap();
    assert_eq!(triggered.call_id, "CA1");

    store.update_confirmation(dose_id, true).unwrap();
    scheduler.wait_for_cycle(dose_id).await;

    calls.assert_async().await;
    texts.assert_async().await;
    assert_eq!(store.dose(dose_id).unwrap().unwrap().doses_remaining, 29);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_third_miss_escalates_to_alert_text() {
    let mut server = mockito::Server::new_async().await;
    let calls = server
        .mock("POST", CALLS_PATH)
        .with_status(201)
        .with_body(r#"{"sid": "CA2"}"#)
        .expect(2)
        .create_async()
        .await;
    let texts = server
        .mock("POST", MESSAGES_PATH)
        .match_body(mockito::Matcher::UrlEncoded(
            "Body".into(),
            "Alert: Margaret has missed 3 doses of Metformin.".into(),
        ))
        .with_status(201)
        .with_body(r#"{"sid": "SM1"}"#)
        .expect(1)
        .create_async()
        .await;

    let (store, dose_id) = seeded_store();
    // Two earlier cycles went unconfirmed.
    store.open_cycle(dose_id).unwrap();
    store.open_cycle(dose_id).unwrap();

    let scheduler = scheduler_for(&server, Arc::clone(&store));
    scheduler.trigger_reminder(dose_id).await.unwrap();
    scheduler.wait_for_cycle(dose_id).await;

    calls.assert_async().await;
    texts.assert_async().await;
}
