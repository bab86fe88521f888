//! Settings backends for chat filtering.
//!
//! The filter code only needs two boolean flags and the persisted rule map,
//! plus a way to hear about changes to that map. [`SettingsStore`] is the seam;
//! [`MemorySettings`] keeps everything in memory and publishes revisions over
//! a `watch` channel.

use crate::config::{CUSTOM_FILTER_KEY, ChatSettings, ConfigError};
use crate::filter::FilterDef;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::debug;

/// Identity of one rule store, used to tag its own writes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StoreId(pub u64);

impl fmt::Display for StoreId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "store-{}", self.0)
    }
}

/// Who wrote a `chat.custom_filter` revision
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOrigin {
    /// Anything other than a rule store (user settings UI, sync, file reload)
    External,
    /// Write-through from a rule store
    Store(StoreId),
}

/// Change notification for the persisted rule map
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CustomFilterRevision {
    pub seq: u64,
    pub origin: WriteOrigin,
}

/// Key-value settings as seen by chat filtering.
///
/// Implement this trait to back filters with another settings source.
pub trait SettingsStore: Send + Sync {
    /// Read a boolean flag. Unknown keys read as false.
    fn flag(&self, key: &str) -> bool;

    /// Current value of `chat.custom_filter`.
    fn custom_filters(&self) -> BTreeMap<String, FilterDef>;

    /// Replace `chat.custom_filter` and notify watchers.
    fn write_custom_filters(&self, filters: BTreeMap<String, FilterDef>, origin: WriteOrigin);

    /// Watch for changes of `chat.custom_filter`.
    ///
    /// Returns `None` if the backend doesn't support watching.
    fn watch_custom_filters(&self) -> Option<watch::Receiver<CustomFilterRevision>>;

    /// Backend name for logging.
    fn name(&self) -> &'static str;
}

/// A shared settings store.
pub type SharedSettings = Arc<dyn SettingsStore>;

/// In-memory settings store.
///
/// Useful for tests and for the CLI, which loads a settings file into memory,
/// runs one command and saves the snapshot back.
pub struct MemorySettings {
    settings: RwLock<ChatSettings>,
    revisions: watch::Sender<CustomFilterRevision>,
}

impl MemorySettings {
    pub fn new(settings: ChatSettings) -> Self {
        let (revisions, _) = watch::channel(CustomFilterRevision {
            seq: 0,
            origin: WriteOrigin::External,
        });

        Self {
            settings: RwLock::new(settings),
            revisions,
        }
    }

    pub fn set_flag(&self, key: &str, value: bool) -> Result<(), ConfigError> {
        self.settings.write().set_flag(key, value)
    }

    /// Replace the persisted rules from outside any rule store
    pub fn replace_custom_filters(&self, filters: BTreeMap<String, FilterDef>) {
        self.write_custom_filters(filters, WriteOrigin::External);
    }

    pub fn snapshot(&self) -> ChatSettings {
        self.settings.read().clone()
    }

    pub fn revision(&self) -> CustomFilterRevision {
        *self.revisions.borrow()
    }
}

impl Default for MemorySettings {
    fn default() -> Self {
        Self::new(ChatSettings::default())
    }
}

impl SettingsStore for MemorySettings {
    fn flag(&self, key: &str) -> bool {
        self.settings.read().flag(key).unwrap_or(false)
    }

    fn custom_filters(&self) -> BTreeMap<String, FilterDef> {
        self.settings.read().custom_filter.clone()
    }

    fn write_custom_filters(&self, filters: BTreeMap<String, FilterDef>, origin: WriteOrigin) {
        let count = filters.len();
        {
            let mut settings = self.settings.write();
            settings.custom_filter = filters;
            settings.normalize();
        }

        self.revisions.send_modify(|revision| {
            revision.seq += 1;
            revision.origin = origin;
        });

        debug!(key = CUSTOM_FILTER_KEY, rules = count, ?origin, "custom filters written");
    }

    fn watch_custom_filters(&self) -> Option<watch::Receiver<CustomFilterRevision>> {
        Some(self.revisions.subscribe())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}
