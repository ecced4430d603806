//! Runtime configuration.
//!
//! Values are layered with figment, later sources overriding earlier ones:
//! 1. Built-in defaults
//! 2. `attendanced.toml` in the working directory (if present)
//! 3. Environment variables (`DB_URL`, `JWT_SECRET`, `PORT`, `UPLOAD_DIR`,
//!    `TOKEN_TTL_SECS`, `BCRYPT_COST`)

use anyhow::{bail, Context};
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Default configuration file name.
pub const CONFIG_FILE_NAME: &str = "attendanced.toml";

const ENV_KEYS: &[&str] = &[
    "DB_URL",
    "JWT_SECRET",
    "PORT",
    "UPLOAD_DIR",
    "TOKEN_TTL_SECS",
    "BCRYPT_COST",
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// SQLite file path, optionally prefixed with `sqlite://`, or `:memory:`.
    pub db_url: String,
    /// HMAC secret used to sign login tokens.
    pub jwt_secret: String,
    pub port: u16,
    /// Transient directory for uploaded CSV files.
    pub upload_dir: PathBuf,
    pub token_ttl_secs: u64,
    pub bcrypt_cost: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            db_url: "attendance.sqlite3".to_string(),
            jwt_secret: String::new(),
            port: 5000,
            upload_dir: PathBuf::from("uploads"),
            token_ttl_secs: 60 * 60,
            bcrypt_cost: bcrypt::DEFAULT_COST,
        }
    }
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        let config: Config = Self::figment()
            .extract()
            .context("failed to load configuration")?;
        config.validate()?;
        Ok(config)
    }

    pub fn figment() -> Figment {
        Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(CONFIG_FILE_NAME))
            .merge(Env::raw().only(ENV_KEYS))
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.jwt_secret.trim().is_empty() {
            bail!("JWT_SECRET must be set");
        }
        if self.db_path().is_empty() {
            bail!("DB_URL must not be empty");
        }
        if !(4..=31).contains(&self.bcrypt_cost) {
            bail!("BCRYPT_COST must be between 4 and 31");
        }
        Ok(())
    }

    pub fn db_path(&self) -> &str {
        let url = self.db_url.trim();
        url.strip_prefix("sqlite://")
            .or_else(|| url.strip_prefix("sqlite:"))
            .unwrap_or(url)
    }
}
