// crates/msiconf-core/src/error.rs

use thiserror::Error;

use crate::pubsub::PubSubError;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Database query failed: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Pub/sub bus error: {0}")]
    PubSub(#[from] PubSubError),

    #[cfg(feature = "runtime")]
    #[error("Notification failed: {0}")]
    Notify(#[from] crate::notify::NotifyError),

    #[error("Logging setup failed: {0}")]
    Logging(String),
}

pub type Result<T> = std::result::Result<T, Error>;
