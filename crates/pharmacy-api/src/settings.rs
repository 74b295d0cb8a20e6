//! Runtime server configuration.
//!
//! Layered lowest to highest: built-in defaults, an optional TOML file,
//! `PHARMACY_*` environment variables, then `DB_NAME`.

use std::path::{Path, PathBuf};

use chrono::TimeDelta;
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
  pub host:              String,
  pub port:              u16,
  /// Directory holding the database file.
  pub data_dir:          PathBuf,
  /// Database name; the file is `<data_dir>/<db_name>.sqlite3`.
  pub db_name:           String,
  pub session_ttl_hours: i64,
}

impl ServerConfig {
  pub fn load(file: &Path) -> Result<Self, ConfigError> {
    let cfg: Self = Config::builder()
      .set_default("host", "127.0.0.1")?
      .set_default("port", 8080_i64)?
      .set_default("data_dir", ".")?
      .set_default("db_name", "pharmacy_system")?
      .set_default("session_ttl_hours", 24_i64)?
      .add_source(File::from(file).required(false))
      .add_source(Environment::with_prefix("PHARMACY"))
      .add_source(Environment::with_prefix("DB").keep_prefix(true))
      .build()?
      .try_deserialize()?;

    if cfg.session_ttl_hours <= 0
      || TimeDelta::try_hours(cfg.session_ttl_hours).is_none()
    {
      return Err(ConfigError::Message(format!(
        "session_ttl_hours must be a positive number of hours, got {}",
        cfg.session_ttl_hours
      )));
    }
    Ok(cfg)
  }

  pub fn database_path(&self) -> PathBuf {
    self.data_dir.join(format!("{}.sqlite3", self.db_name))
  }

  /// Lifetime of a session token. Saturates rather than overflowing.
  pub fn session_ttl(&self) -> TimeDelta {
    TimeDelta::try_hours(self.session_ttl_hours).unwrap_or(TimeDelta::MAX)
  }

  pub fn address(&self) -> String { format!("{}:{}", self.host, self.port) }
}
