#![cfg(feature = "runtime")]

use std::sync::Arc;

use serde_json::{json, Value};
use tracing::{info, warn};

use crate::db::{self, DbPool};
use crate::error::Result;
use crate::metadata::MetadataError;
use crate::notify::SlackNotifier;
use crate::processing_config::{generate_processing_config, ProcessingConfig};
use crate::pubsub::{topics, PubSub};
use crate::settings::Settings;

/// Long-lived collaborators, built once at startup and shared by handle.
#[derive(Clone)]
pub struct Services {
    pub settings: Arc<Settings>,
    pub pool: DbPool,
    pub bus: Arc<PubSub>,
    pub notifier: SlackNotifier,
}

impl Services {
    /// Connects the pool and builds the bus and notifier. Any failure is fatal
    /// to startup.
    pub async fn init(settings: Settings) -> Result<Self> {
        let pool = db::connect(&settings.db).await?;
        let bus = PubSub::new(settings.bus.capacity)?;
        info!(capacity = bus.capacity(), "event bus ready");
        let notifier = SlackNotifier::from_settings(&settings.slack)?;
        if !notifier.is_enabled() {
            info!("slack webhook not configured; notifications disabled");
        }
        Ok(Self::new(settings, pool, bus, notifier))
    }

    pub fn new(settings: Settings, pool: DbPool, bus: PubSub, notifier: SlackNotifier) -> Self {
        Self {
            settings: Arc::new(settings),
            pool,
            bus: Arc::new(bus),
            notifier,
        }
    }

    pub fn generate(&self, metadata: &Value) -> std::result::Result<ProcessingConfig, MetadataError> {
        generate_processing_config(metadata, &self.settings.default_adducts)
    }

    /// Generates a config and announces it on the bus.
    pub fn generate_and_publish(
        &self,
        metadata: &Value,
    ) -> std::result::Result<ProcessingConfig, MetadataError> {
        let config = self.generate(metadata)?;
        self.publish(topics::PROCESSING_CONFIG_GENERATED, json!(config));
        Ok(config)
    }

    /// Accepts an edit of a dataset's metadata. The new metadata must yield a
    /// valid processing config; the outcome is reported to Slack either way.
    pub fn update_dataset_metadata(
        &self,
        user: &str,
        dataset_id: &str,
        old_metadata: &Value,
        new_metadata: &Value,
    ) -> std::result::Result<ProcessingConfig, MetadataError> {
        match self.generate(new_metadata) {
            Ok(config) => {
                self.notifier
                    .notify_metadata_change(user, dataset_id, old_metadata, new_metadata);
                self.publish(
                    topics::DATASET_METADATA_UPDATED,
                    json!({ "dataset_id": dataset_id, "user": user, "config": config }),
                );
                info!(dataset_id, user, "dataset metadata updated");
                Ok(config)
            }
            Err(err) => {
                warn!(dataset_id, user, error = %err, "rejected metadata update");
                self.notifier
                    .notify_update_failed(user, dataset_id, &err.to_string());
                Err(err)
            }
        }
    }

    fn publish(&self, topic: &str, payload: Value) {
        let delivered = self.bus.publish(topic, payload);
        tracing::debug!(topic, delivered, "event published");
    }
}
