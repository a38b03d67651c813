//! Process-wide settings, read once at startup from an optional TOML file and
//! then overridden from the environment.

use std::env;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::metadata::Polarity;

pub const CONFIG_PATH_ENV: &str = "MSICONF_CONFIG";

const DB_HOST_ENV: &str = "MSICONF_DB_HOST";
const DB_PORT_ENV: &str = "MSICONF_DB_PORT";
const DB_DATABASE_ENV: &str = "MSICONF_DB_DATABASE";
const DB_USER_ENV: &str = "MSICONF_DB_USER";
const DB_PASSWORD_ENV: &str = "MSICONF_DB_PASSWORD";
const SLACK_WEBHOOK_ENV: &str = "MSICONF_SLACK_WEBHOOK_URL";
const SLACK_CHANNEL_ENV: &str = "MSICONF_SLACK_CHANNEL";
const LOG_LEVEL_ENV: &str = "MSICONF_LOG_LEVEL";
const SERVER_BIND_ENV: &str = "MSICONF_SERVER_BIND";

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to read settings file {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse settings: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid value for {var}: {value:?}")]
    InvalidEnv { var: &'static str, value: String },
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct Settings {
    pub default_adducts: DefaultAdducts,
    pub slack: SlackSettings,
    pub log: LogSettings,
    pub db: DbSettings,
    pub server: ServerSettings,
    pub bus: BusSettings,
}

/// Adducts assumed when a submission does not list its own, keyed by charge symbol.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct DefaultAdducts {
    #[serde(rename = "+")]
    pub positive: Vec<String>,
    #[serde(rename = "-")]
    pub negative: Vec<String>,
}

impl DefaultAdducts {
    pub fn for_polarity(&self, polarity: Polarity) -> &[String] {
        match polarity {
            Polarity::Positive => &self.positive,
            Polarity::Negative => &self.negative,
        }
    }
}

impl Default for DefaultAdducts {
    fn default() -> Self {
        Self {
            positive: vec!["+H".into(), "+Na".into(), "+K".into()],
            negative: vec!["-H".into(), "+Cl".into()],
        }
    }
}

/// Slack webhook target. Notifications are off unless `webhook_url` is set.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct SlackSettings {
    pub webhook_url: Option<String>,
    pub channel: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct LogSettings {
    pub level: String,
    pub format: LogFormat,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Text,
        }
    }
}

#[derive(Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct DbSettings {
    pub host: String,
    pub port: u16,
    pub database: String,
    pub user: String,
    pub password: String,
    pub search_path: String,
}

impl Default for DbSettings {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 5432,
            database: "sm".to_string(),
            user: "sm".to_string(),
            password: String::new(),
            search_path: "knex,public".to_string(),
        }
    }
}

impl fmt::Debug for DbSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DbSettings")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("search_path", &self.search_path)
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerSettings {
    pub bind: String,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:3000".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct BusSettings {
    pub capacity: usize,
}

impl Default for BusSettings {
    fn default() -> Self {
        Self { capacity: 1024 }
    }
}

impl Settings {
    pub fn from_toml_str(contents: &str) -> Result<Self, SettingsError> {
        Ok(toml::from_str(contents)?)
    }

    pub fn from_file(path: &Path) -> Result<Self, SettingsError> {
        let contents = std::fs::read_to_string(path).map_err(|source| SettingsError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&contents)
    }

    /// Loads settings for a process: `.env`, then the file named by `path` or
    /// `MSICONF_CONFIG` (defaults when neither is given), then env overrides.
    pub fn load(path: Option<&Path>) -> Result<Self, SettingsError> {
        dotenvy::dotenv().ok();

        let path = path
            .map(Path::to_path_buf)
            .or_else(|| env::var_os(CONFIG_PATH_ENV).map(PathBuf::from));

        let mut settings = match path {
            Some(path) => Self::from_file(&path)?,
            None => Self::default(),
        };
        settings.apply_env_overrides(|var| env::var(var).ok())?;
        Ok(settings)
    }

    /// Applies `MSICONF_*` overrides obtained through `lookup`. An empty value
    /// clears an optional setting.
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<(), SettingsError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = lookup(DB_HOST_ENV) {
            self.db.host = host;
        }
        if let Some(port) = lookup(DB_PORT_ENV) {
            self.db.port = port.trim().parse().map_err(|_| SettingsError::InvalidEnv {
                var: DB_PORT_ENV,
                value: port.clone(),
            })?;
        }
        if let Some(database) = lookup(DB_DATABASE_ENV) {
            self.db.database = database;
        }
        if let Some(user) = lookup(DB_USER_ENV) {
            self.db.user = user;
        }
        if let Some(password) = lookup(DB_PASSWORD_ENV) {
            self.db.password = password;
        }
        if let Some(url) = lookup(SLACK_WEBHOOK_ENV) {
            self.slack.webhook_url = non_empty(url);
        }
        if let Some(channel) = lookup(SLACK_CHANNEL_ENV) {
            self.slack.channel = non_empty(channel);
        }
        if let Some(level) = lookup(LOG_LEVEL_ENV) {
            self.log.level = level;
        }
        if let Some(bind) = lookup(SERVER_BIND_ENV) {
            self.server.bind = bind;
        }
        Ok(())
    }
}

fn non_empty(value: String) -> Option<String> {
    if value.trim().is_empty() {
        None
    } else {
        Some(value)
    }
}
