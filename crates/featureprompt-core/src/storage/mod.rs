//! Durable storage: the engagement counter store and the TOML configuration.

mod config;
pub mod memory;
pub mod migrations;
pub mod sqlite;

pub use config::{Config, CopyConfig, StoreConfig};
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::StoreResult;

/// Namespace used when the host does not pick one.
pub const DEFAULT_NAMESPACE: &str = "com.featureportal.engagement";

/// Persisted key names. The set is fixed; nothing else is written.
pub mod keys {
    pub const FIRST_LAUNCH_DATE: &str = "firstLaunchDate";
    pub const APP_LAUNCH_COUNT: &str = "appLaunchCount";
    pub const SIGNIFICANT_EVENT_COUNT: &str = "significantEventCount";
    pub const SESSION_TIMESTAMPS: &str = "sessionTimestamps";
    pub const LAST_PROMPT_DATE: &str = "lastPromptDate";
    pub const PROMPT_DATES_THIS_YEAR: &str = "promptDatesThisYear";
    pub const TOTAL_PROMPTS_SHOWN: &str = "totalPromptsShown";
    pub const USER_OPTED_OUT: &str = "userOptedOut";

    pub const ALL: [&str; 8] = [
        FIRST_LAUNCH_DATE,
        APP_LAUNCH_COUNT,
        SIGNIFICANT_EVENT_COUNT,
        SESSION_TIMESTAMPS,
        LAST_PROMPT_DATE,
        PROMPT_DATES_THIS_YEAR,
        TOTAL_PROMPTS_SHOWN,
        USER_OPTED_OUT,
    ];
}

/// A primitive value held under one store key.
///
/// Timestamps are epoch seconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum StoredValue {
    Integer(i64),
    Timestamp(f64),
    Flag(bool),
    Timestamps(Vec<f64>),
}

impl StoredValue {
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            StoredValue::Integer(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_timestamp(&self) -> Option<f64> {
        match self {
            StoredValue::Timestamp(t) => Some(*t),
            // Integral timestamps written by older hosts.
            StoredValue::Integer(n) => Some(*n as f64),
            _ => None,
        }
    }

    pub fn as_flag(&self) -> Option<bool> {
        match self {
            StoredValue::Flag(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_timestamps(&self) -> Option<&[f64]> {
        match self {
            StoredValue::Timestamps(list) => Some(list),
            _ => None,
        }
    }
}

/// Durable key/value map behind the engagement counters.
///
/// Each `set`/`remove` must be durable on its own; nothing is atomic across
/// keys. Failures propagate to the caller.
pub trait CounterStore {
    fn get(&self, key: &str) -> StoreResult<Option<StoredValue>>;

    fn set(&mut self, key: &str, value: StoredValue) -> StoreResult<()>;

    fn remove(&mut self, key: &str) -> StoreResult<()>;

    /// Remove several keys, one write per key.
    fn remove_all(&mut self, keys: &[&str]) -> StoreResult<()> {
        for key in keys {
            self.remove(key)?;
        }
        Ok(())
    }
}

/// Returns the featureprompt data directory, creating it if needed.
///
/// `FEATUREPROMPT_HOME` overrides the location. Otherwise this is
/// `~/.config/featureprompt`, or `~/.config/featureprompt-dev` when
/// `FEATUREPROMPT_ENV=dev`.
///
/// # Errors
/// Returns an error if creating the directory fails.
pub fn data_dir() -> std::io::Result<PathBuf> {
    let dir = match std::env::var_os("FEATUREPROMPT_HOME") {
        Some(home) if !home.is_empty() => PathBuf::from(home),
        _ => {
            let base_dir = dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".config");
            let env =
                std::env::var("FEATUREPROMPT_ENV").unwrap_or_else(|_| "production".to_string());
            if env == "dev" {
                base_dir.join("featureprompt-dev")
            } else {
                base_dir.join("featureprompt")
            }
        }
    };

    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}
