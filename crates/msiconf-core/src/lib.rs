pub mod db;
pub mod diff;
pub mod error;
pub mod logging;
pub mod metadata;
pub mod notify;
pub mod processing_config;
pub mod pubsub;
pub mod resolution;
pub mod services;
pub mod settings;

pub use error::{Error, Result};
pub use processing_config::{generate_processing_config, ProcessingConfig};
