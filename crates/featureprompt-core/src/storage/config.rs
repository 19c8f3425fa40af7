//! TOML-based engine configuration.
//!
//! Stores:
//! - Whether prompting is enabled at all
//! - The engagement thresholds
//! - The prompt copy
//! - The store namespace
//!
//! Configuration is stored at `<data_dir>/config.toml`.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::{data_dir, DEFAULT_NAMESPACE};
use crate::error::{ConfigError, CoreError, Result};
use crate::prompt::{PromptConfiguration, PromptCopy};

/// Counter store settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "default_namespace")]
    pub namespace: String,
}

/// Prompt copy settings.
pub type CopyConfig = PromptCopy;

/// Engine configuration.
///
/// Serialized to/from TOML at `<data_dir>/config.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// When false no trigger is built and the prompt never shows.
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub prompt: PromptConfiguration,
    #[serde(default)]
    pub copy: CopyConfig,
    #[serde(default)]
    pub store: StoreConfig,
}

fn default_true() -> bool {
    true
}
fn default_namespace() -> String {
    DEFAULT_NAMESPACE.into()
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            namespace: default_namespace(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            enabled: true,
            prompt: PromptConfiguration::default(),
            copy: CopyConfig::default(),
            store: StoreConfig::default(),
        }
    }
}

impl Config {
    fn get_json_value_by_path<'a>(
        root: &'a serde_json::Value,
        key: &str,
    ) -> Option<&'a serde_json::Value> {
        if key.is_empty() {
            return None;
        }

        let mut current = root;
        for part in key.split('.') {
            current = current.get(part)?;
        }
        Some(current)
    }

    fn invalid(key: &str, message: impl Into<String>) -> ConfigError {
        ConfigError::InvalidValue {
            key: key.to_string(),
            message: message.into(),
        }
    }

    fn set_json_value_by_path(
        root: &mut serde_json::Value,
        key: &str,
        value: &str,
    ) -> Result<(), ConfigError> {
        if key.is_empty() {
            return Err(ConfigError::UnknownKey(key.to_string()));
        }

        let mut parts = key.split('.').peekable();
        let mut current = root;
        while let Some(part) = parts.next() {
            if parts.peek().is_some() {
                current = current
                    .get_mut(part)
                    .ok_or_else(|| ConfigError::UnknownKey(key.to_string()))?;
                continue;
            }

            let obj = current
                .as_object_mut()
                .ok_or_else(|| ConfigError::UnknownKey(key.to_string()))?;
            let existing = obj
                .get(part)
                .ok_or_else(|| ConfigError::UnknownKey(key.to_string()))?;

            let new_value = match existing {
                serde_json::Value::Bool(_) => serde_json::Value::Bool(
                    value
                        .parse::<bool>()
                        .map_err(|e| Self::invalid(key, e.to_string()))?,
                ),
                serde_json::Value::Number(_) => {
                    let n = value.parse::<u64>().map_err(|_| {
                        Self::invalid(
                            key,
                            format!("cannot parse '{value}' as a non-negative integer"),
                        )
                    })?;
                    serde_json::Value::Number(n.into())
                }
                serde_json::Value::Object(_) | serde_json::Value::Array(_) => {
                    serde_json::from_str(value).map_err(|e| Self::invalid(key, e.to_string()))?
                }
                _ => serde_json::Value::String(value.into()),
            };

            obj.insert(part.to_string(), new_value);
            return Ok(());
        }

        Err(ConfigError::UnknownKey(key.to_string()))
    }

    fn path() -> Result<PathBuf> {
        Ok(data_dir()?.join("config.toml"))
    }

    /// Load from disk, writing defaults if the file does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed,
    /// or if the default config cannot be written to disk.
    pub fn load() -> Result<Self> {
        let path = Self::path()?;
        match std::fs::read_to_string(&path) {
            Ok(content) => Self::from_toml(&content).map_err(|e| {
                CoreError::Config(ConfigError::LoadFailed {
                    path: path.clone(),
                    message: e.to_string(),
                })
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let cfg = Self::default();
                cfg.save()?;
                Ok(cfg)
            }
            Err(e) => Err(ConfigError::LoadFailed {
                path,
                message: e.to_string(),
            }
            .into()),
        }
    }

    /// Parse and validate TOML text.
    ///
    /// # Errors
    /// Returns an error if the text is not valid TOML for this schema or the
    /// thresholds fail validation.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let cfg: Config =
            toml::from_str(content).map_err(|e| ConfigError::ParseFailed(e.to_string()))?;
        cfg.prompt.validate()?;
        Ok(cfg)
    }

    /// Persist to disk.
    ///
    /// # Errors
    ///
    /// Returns an error if the config cannot be serialized or written to disk.
    pub fn save(&self) -> Result<()> {
        let path = Self::path()?;
        let content = toml::to_string_pretty(self).map_err(|e| ConfigError::SaveFailed {
            path: path.clone(),
            message: e.to_string(),
        })?;
        std::fs::write(&path, content).map_err(|e| ConfigError::SaveFailed {
            path,
            message: e.to_string(),
        })?;
        Ok(())
    }

    /// Get a config value as string by dot-separated key.
    pub fn get(&self, key: &str) -> Option<String> {
        let json = serde_json::to_value(self).ok()?;
        let val = Self::get_json_value_by_path(&json, key)?;
        match val {
            serde_json::Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Update a value by dot-separated key without saving.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown, the value cannot be parsed, or
    /// the result fails validation. `self` is unchanged on error.
    pub fn update(&mut self, key: &str, value: &str) -> Result<()> {
        let mut json = serde_json::to_value(&*self)?;
        Self::set_json_value_by_path(&mut json, key, value)?;
        let updated: Config =
            serde_json::from_value(json).map_err(|e| Self::invalid(key, e.to_string()))?;
        updated.prompt.validate()?;
        *self = updated;
        Ok(())
    }

    /// Set a config value by key and save.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown, the value cannot be parsed,
    /// or the config cannot be saved.
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.update(key, value)?;
        self.save()
    }

    /// Thresholds for building a trigger, or `None` when prompting is disabled.
    pub fn prompt_configuration(&self) -> Option<PromptConfiguration> {
        self.enabled.then(|| self.prompt.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prompt::SessionRecency;

    #[test]
    fn default_config_roundtrip() {
        let cfg = Config::default();
        let toml_str = toml::to_string_pretty(&cfg).unwrap();
        let parsed = Config::from_toml(&toml_str).unwrap();
        assert_eq!(parsed, cfg);
    }

    #[test]
    fn empty_file_uses_defaults() {
        let cfg = Config::from_toml("").unwrap();
        assert!(cfg.enabled);
        assert_eq!(cfg.prompt, PromptConfiguration::default());
        assert_eq!(cfg.store.namespace, DEFAULT_NAMESPACE);
    }

    #[test]
    fn from_toml_reads_sections() {
        let cfg = Config::from_toml(
            r#"
            enabled = false

            [prompt]
            cooldown_days = 14
            session_recency = "live"

            [copy]
            message = "Got an idea?"
            "#,
        )
        .unwrap();
        assert!(!cfg.enabled);
        assert_eq!(cfg.prompt.cooldown_days, 14);
        assert_eq!(cfg.prompt.session_recency, SessionRecency::Live);
        assert_eq!(cfg.copy.message, "Got an idea?");
        assert_eq!(cfg.copy.cta_text, "Share a Feature Request");
        assert!(cfg.prompt_configuration().is_none());
    }

    #[test]
    fn from_toml_rejects_invalid_thresholds() {
        let err = Config::from_toml("[prompt]\nrecent_session_window_days = 0").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));

        let err = Config::from_toml("[prompt]\ncooldown_days = -1").unwrap_err();
        assert!(matches!(err, ConfigError::ParseFailed(_)));
    }

    #[test]
    fn get_supports_dot_path_keys() {
        let cfg = Config::default();
        assert_eq!(cfg.get("enabled").as_deref(), Some("true"));
        assert_eq!(cfg.get("prompt.cooldown_days").as_deref(), Some("30"));
        assert_eq!(cfg.get("prompt.session_recency").as_deref(), Some("at_launch"));
        assert_eq!(cfg.get("store.namespace").as_deref(), Some(DEFAULT_NAMESPACE));
        assert!(cfg.get("prompt.missing_key").is_none());
        assert!(cfg.get("").is_none());
    }

    #[test]
    fn update_changes_typed_values() {
        let mut cfg = Config::default();
        cfg.update("prompt.max_prompts_per_year", "4").unwrap();
        cfg.update("enabled", "false").unwrap();
        cfg.update("copy.cta_text", "Suggest something").unwrap();
        cfg.update("prompt.session_recency", "live").unwrap();

        assert_eq!(cfg.prompt.max_prompts_per_year, 4);
        assert!(!cfg.enabled);
        assert_eq!(cfg.copy.cta_text, "Suggest something");
        assert_eq!(cfg.prompt.session_recency, SessionRecency::Live);
    }

    #[test]
    fn update_rejects_unknown_key() {
        let mut cfg = Config::default();
        let err = cfg.update("prompt.nonexistent", "1").unwrap_err();
        assert!(matches!(err, CoreError::Config(ConfigError::UnknownKey(_))));
    }

    #[test]
    fn update_rejects_bad_values_and_keeps_state() {
        let mut cfg = Config::default();
        assert!(cfg.update("enabled", "not_a_bool").is_err());
        assert!(cfg.update("prompt.cooldown_days", "-3").is_err());
        assert!(cfg.update("prompt.session_recency", "sometimes").is_err());
        assert!(cfg.update("prompt.recent_session_window_days", "0").is_err());
        assert_eq!(cfg, Config::default());
    }
}
