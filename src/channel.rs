use crate::config::{DEFAULT_SAVE_DEBOUNCE, FILTER_IS_BLOCKLIST_KEY, FILTERED_CHAT_KEY};
use crate::debounce::Debouncer;
use crate::filter::{
    FilterDef, FilterError, FilterMode, FilterTarget, RuleBody, RuleStore, evaluate,
    evaluate_with,
};
use crate::settings::{SettingsStore, SharedSettings, StoreId, WriteOrigin};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, info};

static NEXT_STORE_ID: AtomicU64 = AtomicU64::new(1);

/// Opaque identity of a chat channel or session
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChannelContext(String);

impl ChannelContext {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ChannelContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Rule stores per channel context
///
/// Stores are created on first access and live until [`FilterRegistry::release`].
pub struct FilterRegistry {
    settings: SharedSettings,
    runtime: Handle,
    debounce: Duration,
    filters: Mutex<HashMap<ChannelContext, ChatFilter>>,
}

impl FilterRegistry {
    /// Create a registry bound to the current tokio runtime
    pub fn new(settings: SharedSettings) -> Result<Self, FilterError> {
        Ok(Self::with_runtime(settings, Handle::try_current()?))
    }

    pub fn with_runtime(settings: SharedSettings, runtime: Handle) -> Self {
        Self {
            settings,
            runtime,
            debounce: DEFAULT_SAVE_DEBOUNCE,
            filters: Mutex::new(HashMap::new()),
        }
    }

    /// Override the persistence debounce for stores created afterwards
    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    /// Get the filter handle for a context, creating its store on first use
    pub fn handle(&self, ctx: &ChannelContext) -> ChatFilter {
        let mut filters = self.filters.lock();
        if let Some(filter) = filters.get(ctx) {
            return filter.clone();
        }

        let filter = ChatFilter::spawn(
            ctx.clone(),
            Arc::clone(&self.settings),
            self.runtime.clone(),
            self.debounce,
        );
        filters.insert(ctx.clone(), filter.clone());
        filter
    }

    /// Tear down a context's store: flush any pending save and stop watching settings
    pub fn release(&self, ctx: &ChannelContext) -> bool {
        let Some(filter) = self.filters.lock().remove(ctx) else {
            return false;
        };

        filter.flush();
        filter.stop_watching();
        debug!(channel = %ctx, "released chat filters");
        true
    }

    pub fn contexts(&self) -> Vec<ChannelContext> {
        let mut contexts: Vec<_> = self.filters.lock().keys().cloned().collect();
        contexts.sort();
        contexts
    }

    pub fn len(&self) -> usize {
        self.filters.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.filters.lock().is_empty()
    }
}

/// Handle to the rules of one channel context
///
/// Cloning is cheap; all clones share the same store.
#[derive(Clone)]
pub struct ChatFilter {
    inner: Arc<ChatFilterInner>,
}

struct ChatFilterInner {
    id: StoreId,
    context: ChannelContext,
    rules: Arc<Mutex<RuleStore>>,
    settings: SharedSettings,
    save: Debouncer,
    watcher: Mutex<Option<JoinHandle<()>>>,
}

impl Drop for ChatFilterInner {
    fn drop(&mut self) {
        if let Some(task) = self.watcher.get_mut().take() {
            task.abort();
        }
    }
}

impl ChatFilter {
    fn spawn(
        context: ChannelContext,
        settings: SharedSettings,
        runtime: Handle,
        debounce: Duration,
    ) -> Self {
        let id = StoreId(NEXT_STORE_ID.fetch_add(1, Ordering::Relaxed));
        let rules = Arc::new(Mutex::new(RuleStore::new()));

        // Subscribe before the initial load so no write slips in between
        let revisions = settings.watch_custom_filters();
        let loaded = sync_persisted(&rules, settings.as_ref());
        info!(channel = %context, store = %id, settings = settings.name(), persisted = loaded, "chat filters ready");

        let watcher = revisions.map(|mut rx| {
            let rules = Arc::clone(&rules);
            let settings = Arc::clone(&settings);
            let context = context.clone();
            runtime.spawn(async move {
                while rx.changed().await.is_ok() {
                    let revision = *rx.borrow_and_update();
                    if revision.origin == WriteOrigin::Store(id) {
                        continue;
                    }

                    let reloaded = sync_persisted(&rules, settings.as_ref());
                    debug!(
                        channel = %context,
                        seq = revision.seq,
                        reloaded,
                        "custom filters changed, persisted rules reloaded"
                    );
                }
            })
        });

        Self {
            inner: Arc::new(ChatFilterInner {
                id,
                context,
                rules,
                settings,
                save: Debouncer::new(debounce, runtime),
                watcher: Mutex::new(watcher),
            }),
        }
    }

    pub fn id(&self) -> StoreId {
        self.inner.id
    }

    pub fn context(&self) -> &ChannelContext {
        &self.inner.context
    }

    /// Insert or overwrite the rule at `id`; persisted rules are written through
    pub fn define(&self, id: impl Into<String>, body: RuleBody, persist: bool) -> FilterDef {
        let rule = self.inner.rules.lock().define(id, body, persist).clone();
        debug!(channel = %self.inner.context, rule = %rule.id, persist, "chat filter defined");

        if persist {
            self.save();
        }

        rule
    }

    /// Delete a rule; the persisted set is rewritten either way
    pub fn remove(&self, id: &str) {
        if self.inner.rules.lock().remove(id).is_some() {
            debug!(channel = %self.inner.context, rule = id, "chat filter removed");
        }
        self.save();
    }

    /// Rename a rule; unknown `old_id` is a no-op
    pub fn update_id(&self, old_id: &str, new_id: &str) {
        if !self.inner.rules.lock().update_id(old_id, new_id) {
            return;
        }

        debug!(channel = %self.inner.context, from = old_id, to = new_id, "chat filter renamed");
        self.save();
    }

    pub fn get(&self, id: &str) -> Option<FilterDef> {
        self.inner.rules.lock().get(id).cloned()
    }

    /// Snapshot of every rule of this context
    pub fn get_all(&self) -> HashMap<String, FilterDef> {
        self.inner.rules.lock().all().clone()
    }

    /// Schedule a debounced write of the persisted rules
    pub fn save(&self) {
        let rules = Arc::clone(&self.inner.rules);
        let settings = Arc::clone(&self.inner.settings);
        let id = self.inner.id;
        self.inner
            .save
            .call(move || write_persisted(&rules, settings.as_ref(), id));
    }

    /// Write the persisted rules now, superseding any pending save
    pub fn flush(&self) {
        self.inner.save.cancel();
        write_persisted(&self.inner.rules, self.inner.settings.as_ref(), self.inner.id);
    }

    pub fn has_pending_save(&self) -> bool {
        self.inner.save.is_pending()
    }

    /// Whether rule `key` filters `message` under the current settings
    ///
    /// In allowlist mode a positive result also flags the message as filtered.
    pub fn check_match<M: FilterTarget + ?Sized>(&self, key: &str, message: &mut M) -> bool {
        let Some(mode) = self.active_mode() else {
            return false;
        };

        self.check_match_with_mode(key, message, mode)
    }

    /// Evaluate one rule under an explicit mode, ignoring the global switch
    pub fn check_match_with_mode<M: FilterTarget + ?Sized>(
        &self,
        key: &str,
        message: &mut M,
        mode: FilterMode,
    ) -> bool {
        evaluate(&mut self.inner.rules.lock(), key, message, mode)
    }

    /// Ids of every rule that filters `message`, sorted
    pub fn check_all<M: FilterTarget + ?Sized>(&self, message: &mut M) -> Vec<String> {
        let Some(mode) = self.active_mode() else {
            return Vec::new();
        };

        self.check_all_with_mode(message, mode)
    }

    /// Like [`ChatFilter::check_all`] but with an explicit mode, ignoring the global switch
    ///
    /// In allowlist mode the rules act together: a message matched by any of
    /// them is shown, otherwise it is flagged and every rule it missed is
    /// reported.
    pub fn check_all_with_mode<M: FilterTarget + ?Sized>(
        &self,
        message: &mut M,
        mode: FilterMode,
    ) -> Vec<String> {
        let mut rules = self.inner.rules.lock();
        let mut keys: Vec<String> = rules
            .all()
            .values()
            .filter(|rule| rule.has_scope())
            .map(|rule| rule.id.clone())
            .collect();
        keys.sort();

        match mode {
            FilterMode::Blocklist => {
                keys.retain(|key| evaluate(&mut rules, key, &mut *message, mode));
            }
            FilterMode::Allowlist => {
                let allowed = keys
                    .iter()
                    .any(|key| evaluate_with(&mut rules, key, &mut *message, false, false));
                if allowed {
                    return Vec::new();
                }

                // Invalid regexps neither allow nor hide
                keys.retain(|key| evaluate_with(&mut rules, key, &mut *message, true, false));
                if !keys.is_empty() {
                    message.mark_filtered();
                }
            }
        }

        keys
    }

    /// Current mode, or `None` when chat filtering is switched off
    pub fn active_mode(&self) -> Option<FilterMode> {
        let settings = self.inner.settings.as_ref();
        if !settings.flag(FILTERED_CHAT_KEY) {
            return None;
        }

        Some(FilterMode::from_blocklist_flag(
            settings.flag(FILTER_IS_BLOCKLIST_KEY),
        ))
    }

    fn stop_watching(&self) {
        if let Some(task) = self.inner.watcher.lock().take() {
            task.abort();
        }
    }
}

impl fmt::Debug for ChatFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChatFilter")
            .field("id", &self.inner.id)
            .field("context", &self.inner.context)
            .finish_non_exhaustive()
    }
}

fn write_persisted(rules: &Mutex<RuleStore>, settings: &dyn SettingsStore, id: StoreId) {
    let snapshot = rules.lock().persisted();
    settings.write_custom_filters(snapshot, WriteOrigin::Store(id));
}

/// Purge persisted rules and reload the full set from settings
fn sync_persisted(rules: &Mutex<RuleStore>, settings: &dyn SettingsStore) -> usize {
    let loaded = settings.custom_filters();
    rules.lock().reload_persisted(loaded)
}
