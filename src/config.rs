use crate::filter::FilterDef;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::sync::LazyLock;
use std::time::Duration;
use thiserror::Error;

/// Global switch for chat filtering
pub const FILTERED_CHAT_KEY: &str = "chat.filtered_chat";
/// Blocklist when true, allowlist when false
pub const FILTER_IS_BLOCKLIST_KEY: &str = "chat.filter_is_blocklist";
/// Persisted rules, keyed by rule id
pub const CUSTOM_FILTER_KEY: &str = "chat.custom_filter";

/// How long persistence writes are held back to coalesce bursts of edits
pub const DEFAULT_SAVE_DEBOUNCE: Duration = Duration::from_millis(250);

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read settings file '{path}': {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse settings file '{path}': {message}")]
    Parse { path: String, message: String },
    #[error("Failed to write settings file '{path}': {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to serialize settings: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("Unknown settings flag '{0}'. Known flags are: chat.filtered_chat, chat.filter_is_blocklist")]
    UnknownKey(String),
}

/// The settings keys chat filtering reads and writes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatSettings {
    #[serde(rename = "chat.filtered_chat")]
    pub filtered_chat: bool,
    #[serde(rename = "chat.filter_is_blocklist")]
    pub filter_is_blocklist: bool,
    #[serde(rename = "chat.custom_filter")]
    pub custom_filter: BTreeMap<String, FilterDef>,
}

impl Default for ChatSettings {
    fn default() -> Self {
        Self {
            filtered_chat: true,
            filter_is_blocklist: true,
            custom_filter: BTreeMap::new(),
        }
    }
}

impl ChatSettings {
    /// Read a boolean flag by its settings key
    pub fn flag(&self, key: &str) -> Option<bool> {
        match key {
            FILTERED_CHAT_KEY => Some(self.filtered_chat),
            FILTER_IS_BLOCKLIST_KEY => Some(self.filter_is_blocklist),
            _ => None,
        }
    }

    /// Set a boolean flag by its settings key
    pub fn set_flag(&mut self, key: &str, value: bool) -> Result<(), ConfigError> {
        match key {
            FILTERED_CHAT_KEY => self.filtered_chat = value,
            FILTER_IS_BLOCKLIST_KEY => self.filter_is_blocklist = value,
            _ => return Err(ConfigError::UnknownKey(key.to_string())),
        }
        Ok(())
    }

    /// Force every stored rule's id to match its key and mark it persisted
    pub fn normalize(&mut self) {
        for (id, rule) in self.custom_filter.iter_mut() {
            rule.id.clone_from(id);
            rule.persist = true;
        }
    }
}

pub fn load_settings(path: Option<&Path>) -> Result<ChatSettings, ConfigError> {
    if let Some(path) = path {
        load_settings_from_path(path)
    } else {
        Ok(default_settings().clone())
    }
}

/// Read settings leniently: comments and trailing commas are accepted
pub fn load_settings_from_path(path: &Path) -> Result<ChatSettings, ConfigError> {
    let path_display = path.display().to_string();
    let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path_display.clone(),
        source,
    })?;

    parse_settings(&raw).map_err(|message| ConfigError::Parse {
        path: path_display,
        message,
    })
}

pub fn parse_settings(raw: &str) -> Result<ChatSettings, String> {
    if raw.trim().is_empty() {
        return Ok(ChatSettings::default());
    }

    let mut settings = json5::from_str::<ChatSettings>(raw).map_err(|e| e.to_string())?;
    settings.normalize();
    Ok(settings)
}

pub fn save_settings(path: &Path, settings: &ChatSettings) -> Result<(), ConfigError> {
    let raw = serde_json::to_string_pretty(settings)?;
    fs::write(path, raw + "\n").map_err(|source| ConfigError::Write {
        path: path.display().to_string(),
        source,
    })
}

pub fn default_settings() -> &'static ChatSettings {
    static DEFAULT_SETTINGS: LazyLock<ChatSettings> = LazyLock::new(ChatSettings::default);
    &DEFAULT_SETTINGS
}
