#![cfg(feature = "runtime")]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{extract::State, routing::post, Json, Router};
use msiconf_core::db;
use msiconf_core::metadata::MetadataError;
use msiconf_core::notify::SlackNotifier;
use msiconf_core::pubsub::{topics, PubSub};
use msiconf_core::services::Services;
use msiconf_core::settings::{Settings, SlackSettings};
use serde_json::{json, Value};
use tokio::net::TcpListener;

type Received = Arc<Mutex<Vec<Value>>>;

fn services() -> Services {
    services_with(SlackNotifier::disabled())
}

fn services_with(notifier: SlackNotifier) -> Services {
    let settings = Settings::default();
    let pool = db::connect_lazy(&settings.db);
    Services::new(settings, pool, PubSub::new(16).expect("bus"), notifier)
}

async fn record(State(received): State<Received>, Json(body): Json<Value>) {
    received.lock().unwrap().push(body);
}

async fn webhook_services() -> (Services, Received) {
    let received: Received = Arc::new(Mutex::new(Vec::new()));
    let app = Router::new()
        .route("/hook", post(record))
        .with_state(received.clone());
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    let notifier = SlackNotifier::from_settings(&SlackSettings {
        webhook_url: Some(format!("http://{addr}/hook")),
        channel: None,
    })
    .expect("notifier");
    (services_with(notifier), received)
}

/// Notifications are dispatched in the background; wait for `count` deliveries.
async fn wait_for(received: &Received, count: usize) -> Vec<Value> {
    for _ in 0..100 {
        let bodies = received.lock().unwrap().clone();
        if bodies.len() >= count {
            return bodies;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("expected {count} webhook deliveries");
}

fn metadata(polarity: &str) -> Value {
    json!({
        "MS_Analysis": {
            "Polarity": polarity,
            "Analyzer": "Orbitrap",
            "Detector_Resolving_Power": {"mz": 200, "Resolving_Power": 140000}
        },
        "metaspace_options": {"Metabolite_Database": ["HMDB"]}
    })
}

#[tokio::test]
async fn generated_configs_are_published() {
    let services = services();
    let mut subscription = services.bus.subscribe(topics::PROCESSING_CONFIG_GENERATED);

    let config = services
        .generate_and_publish(&metadata("Positive"))
        .expect("config");

    let event = subscription.recv().await.expect("event");
    assert_eq!(event.payload, serde_json::to_value(&config).unwrap());
    assert_eq!(event.payload["isotope_generation"]["isocalc_pts_per_mz"], 4039);
}

#[tokio::test]
async fn accepted_update_announces_dataset() {
    let services = services();
    let mut subscription = services.bus.subscribe(topics::DATASET_METADATA_UPDATED);

    services
        .update_dataset_metadata("alice", "ds1", &metadata("Positive"), &metadata("Negative"))
        .expect("update accepted");

    let event = subscription.recv().await.expect("event");
    assert_eq!(event.payload["dataset_id"], "ds1");
    assert_eq!(event.payload["user"], "alice");
    assert_eq!(event.payload["config"]["isotope_generation"]["charge"]["polarity"], "-");
}

#[tokio::test]
async fn rejected_update_publishes_nothing() {
    let services = services();
    let mut subscription = services.bus.subscribe(topics::DATASET_METADATA_UPDATED);

    let err = services
        .update_dataset_metadata("alice", "ds1", &metadata("Positive"), &metadata("Neutral"))
        .unwrap_err();

    assert_eq!(err, MetadataError::InvalidPolarity("Neutral".into()));
    assert!(subscription.try_recv().is_none());
}

#[tokio::test]
async fn accepted_update_sends_change_notification() {
    let (services, received) = webhook_services().await;

    services
        .update_dataset_metadata("alice", "ds1", &metadata("Positive"), &metadata("Negative"))
        .expect("update accepted");

    let bodies = wait_for(&received, 1).await;
    assert_eq!(bodies.len(), 1);
    let text = bodies[0]["text"].as_str().expect("text");
    assert!(text.starts_with("alice edited metadata of  (id: ds1)"), "{text}");
    assert!(text.contains("/MS_Analysis/Polarity"), "{text}");
}

#[tokio::test]
async fn rejected_update_sends_failure_notification() {
    let (services, received) = webhook_services().await;

    services
        .update_dataset_metadata("alice", "ds1", &metadata("Positive"), &metadata("Neutral"))
        .unwrap_err();

    let bodies = wait_for(&received, 1).await;
    assert_eq!(bodies.len(), 1);
    let text = bodies[0]["text"].as_str().expect("text");
    assert!(text.starts_with("alice tried to edit metadata (ds_id=ds1)\nError: "), "{text}");
    assert!(text.contains("Neutral"), "{text}");
}
