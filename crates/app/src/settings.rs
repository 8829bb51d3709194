//! Handles settings for the application. Configuration is read from an
//! optional `settings.toml` in the working directory and from `DOMPET__`
//! prefixed environment variables, e.g. `DOMPET__SERVER__PORT=8080`.
//!
//! See `settings.toml` for an example.

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct App {
    /// `tracing` level for the workspace crates.
    pub level: String,
}

#[derive(Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Database {
    Memory,
    /// Path of the sqlite file, created if missing.
    Sqlite(String),
}

#[derive(Debug, Deserialize)]
pub struct Server {
    pub bind: Option<String>,
    pub port: u16,
    pub database: Database,
}

#[derive(Debug, Deserialize)]
pub struct Settings {
    pub app: App,
    pub server: Option<Server>,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        Self::from_file("settings")
    }

    pub fn from_file(name: &str) -> Result<Self, ConfigError> {
        Config::builder()
            .set_default("app.level", "info")?
            .add_source(File::with_name(name).required(false))
            .add_source(Environment::with_prefix("DOMPET").separator("__"))
            .build()?
            .try_deserialize()
    }
}
