use std::sync::{Arc, Mutex, MutexGuard};

use anyhow::anyhow;
use rusqlite::Connection;

use super::error::ApiError;
use crate::config::Config;
use crate::db;

#[derive(Clone)]
pub struct AppState {
    db: Arc<Mutex<Connection>>,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(conn: Connection, config: Config) -> Self {
        Self {
            db: Arc::new(Mutex::new(conn)),
            config: Arc::new(config),
        }
    }

    pub fn open(config: Config) -> anyhow::Result<Self> {
        let conn = db::open_db(config.db_path())?;
        Ok(Self::new(conn, config))
    }

    /// Locks the shared connection. Never hold the guard across an `.await`.
    pub fn db(&self) -> Result<MutexGuard<'_, Connection>, ApiError> {
        self.db
            .lock()
            .map_err(|_| ApiError::Internal(anyhow!("database lock poisoned")))
    }
}
