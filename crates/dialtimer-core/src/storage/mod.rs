mod config;
pub mod database;
mod timer_store;

pub use config::{Config, DialConfig, TimerConfig};
pub use database::Database;
pub use timer_store::{ArchivedTimer, TimerStore, HISTORY_KEY, TIMER_KEY};

use std::cell::RefCell;
use std::collections::HashMap;
use std::path::PathBuf;

use crate::error::{ConfigError, Result};

/// Minimal key-value persistence the session needs.
///
/// Implementations are used from a single thread; `&self` receivers let a
/// SQLite connection and an in-memory map share the same shape.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&self, key: &str, value: &str) -> Result<()>;
    fn remove(&self, key: &str) -> Result<()>;
}

/// In-process store, mostly for tests and throwaway sessions.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RefCell<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.borrow().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.entries
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.entries.borrow_mut().remove(key);
        Ok(())
    }
}

/// Returns `~/.config/dialtimer[-dev]/` based on DIALTIMER_ENV.
///
/// Set DIALTIMER_ENV=dev to use development data directory.
///
/// # Errors
/// Returns an error if creating the config directory fails.
pub fn data_dir() -> Result<PathBuf> {
    let base_dir = dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config");

    let env = std::env::var("DIALTIMER_ENV").unwrap_or_else(|_| "production".to_string());

    let dir = if env == "dev" {
        base_dir.join("dialtimer-dev")
    } else {
        base_dir.join("dialtimer")
    };

    std::fs::create_dir_all(&dir).map_err(|source| ConfigError::DataDir {
        path: dir.clone(),
        source,
    })?;
    Ok(dir)
}
