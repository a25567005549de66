//! Runtime settings, read from `config.toml`, `CLASSROLL__*` environment variables, and `.env`.

use config::{Config, Environment, File};
use serde::Deserialize;
use std::env;

use crate::error::Result;

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub database: DatabaseSettings,
    pub log: LogSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseSettings {
    /// Path of the `sqlite3` database file.
    pub url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LogSettings {
    /// A `tracing_subscriber::EnvFilter` directive, used when `RUST_LOG` is not set.
    pub filter: String,
}

impl Settings {
    /// Loads settings from the optional `config.toml` in the working directory, then from the
    /// environment. A `DATABASE_URL` variable (possibly from `.env`) wins over both.
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();

        let mut builder = Config::builder()
            .set_default("database.url", "classroll.sqlite3")?
            .set_default("log.filter", "classroll=info")?
            .add_source(File::with_name("config").required(false))
            .add_source(Environment::with_prefix("CLASSROLL").separator("__"));

        if let Ok(database_url) = env::var("DATABASE_URL") {
            builder = builder.set_override("database.url", database_url)?;
        }

        Ok(builder.build()?.try_deserialize()?)
    }
}
