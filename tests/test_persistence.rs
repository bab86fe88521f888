use chat_filter::config::ChatSettings;
use chat_filter::filter::{FilterDef, FilterError, RuleBody};
use chat_filter::settings::{CustomFilterRevision, SettingsStore, WriteOrigin};
use chat_filter::{ChannelContext, FilterRegistry, MemorySettings};
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::watch;

/// Memory settings that remember every write made through the trait
#[derive(Default)]
struct RecordingSettings {
    inner: MemorySettings,
    writes: AtomicUsize,
    last_write: Mutex<Option<BTreeMap<String, FilterDef>>>,
}

impl RecordingSettings {
    fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    fn last_write_ids(&self) -> Vec<String> {
        self.last_write
            .lock()
            .as_ref()
            .map(|filters| filters.keys().cloned().collect())
            .unwrap_or_default()
    }
}

impl SettingsStore for RecordingSettings {
    fn flag(&self, key: &str) -> bool {
        self.inner.flag(key)
    }

    fn custom_filters(&self) -> BTreeMap<String, FilterDef> {
        self.inner.custom_filters()
    }

    fn write_custom_filters(&self, filters: BTreeMap<String, FilterDef>, origin: WriteOrigin) {
        self.writes.fetch_add(1, Ordering::SeqCst);
        *self.last_write.lock() = Some(filters.clone());
        self.inner.write_custom_filters(filters, origin);
    }

    fn watch_custom_filters(&self) -> Option<watch::Receiver<CustomFilterRevision>> {
        self.inner.watch_custom_filters()
    }

    fn name(&self) -> &'static str {
        "recording"
    }
}

fn persisted(id: &str, pattern: &str) -> (String, FilterDef) {
    (id.to_string(), FilterDef::new(id, RuleBody::new(pattern), true))
}

async fn settle() {
    tokio::time::sleep(Duration::from_millis(1)).await;
}

#[tokio::test(start_paused = true)]
async fn test_burst_of_removes_writes_once_with_final_state() {
    let settings = Arc::new(RecordingSettings::default());
    let registry = FilterRegistry::new(settings.clone()).expect("inside a tokio runtime");
    let filter = registry.handle(&ChannelContext::new("chan"));

    filter.define("keep", RuleBody::new("keep"), true);
    for id in ["a", "b", "c"] {
        filter.define(id, RuleBody::new(id), true);
    }
    filter.remove("a");
    filter.remove("b");
    filter.remove("c");

    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(settings.writes(), 0, "nothing is written inside the debounce window");

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(settings.writes(), 1);
    assert_eq!(settings.last_write_ids(), vec!["keep"]);
}

#[tokio::test(start_paused = true)]
async fn test_volatile_define_does_not_write() {
    let settings = Arc::new(RecordingSettings::default());
    let registry = FilterRegistry::new(settings.clone()).expect("inside a tokio runtime");
    let filter = registry.handle(&ChannelContext::new("chan"));

    filter.define("temp", RuleBody::new("x"), false);
    assert!(!filter.has_pending_save());

    tokio::time::sleep(Duration::from_millis(500)).await;
    assert_eq!(settings.writes(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_remove_writes_even_for_volatile_rule() {
    let settings = Arc::new(RecordingSettings::default());
    let registry = FilterRegistry::new(settings.clone()).expect("inside a tokio runtime");
    let filter = registry.handle(&ChannelContext::new("chan"));

    filter.define("temp", RuleBody::new("x"), false);
    filter.remove("temp");
    assert!(filter.has_pending_save());

    tokio::time::sleep(Duration::from_millis(300)).await;
    assert_eq!(settings.writes(), 1);
    assert!(settings.last_write_ids().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_update_id_writes_renamed_rule() {
    let settings = Arc::new(RecordingSettings::default());
    let registry = FilterRegistry::new(settings.clone()).expect("inside a tokio runtime");
    let filter = registry.handle(&ChannelContext::new("chan"));

    filter.define("a", RuleBody::new("x"), true);
    filter.flush();
    assert_eq!(settings.writes(), 1);

    filter.update_id("missing", "other");
    assert!(!filter.has_pending_save());

    filter.update_id("a", "b");
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert_eq!(settings.writes(), 2);
    assert_eq!(settings.last_write_ids(), vec!["b"]);
    assert_eq!(settings.custom_filters()["b"].id, "b");
}

#[tokio::test(start_paused = true)]
async fn test_external_change_purges_persisted_rules() {
    let settings = Arc::new(MemorySettings::default());
    let registry = FilterRegistry::new(settings.clone()).expect("inside a tokio runtime");
    let filter = registry.handle(&ChannelContext::new("chan"));

    filter.define("x", RuleBody::new("spam"), true);
    filter.define("volatile", RuleBody::new("eggs"), false);
    filter.flush();
    settle().await;
    assert!(filter.get("x").is_some());

    settings.replace_custom_filters(BTreeMap::from([persisted("unrelated", "zzz")]));
    settle().await;

    let all = filter.get_all();
    assert!(!all.contains_key("x"), "persisted rules are purged on any external change");
    assert!(all.contains_key("volatile"));
    assert!(all.get("unrelated").is_some_and(|rule| rule.persist));
}

#[tokio::test(start_paused = true)]
async fn test_own_write_through_keeps_rules() {
    let settings = Arc::new(MemorySettings::default());
    let registry = FilterRegistry::new(settings.clone()).expect("inside a tokio runtime");
    let filter = registry.handle(&ChannelContext::new("chan"));

    filter.define("x", RuleBody::new("spam"), true);
    tokio::time::sleep(Duration::from_millis(300)).await;
    settle().await;

    assert_eq!(settings.revision().origin, WriteOrigin::Store(filter.id()));
    assert!(filter.get("x").is_some());
    assert!(settings.custom_filters().contains_key("x"));
}

#[tokio::test]
async fn test_new_store_loads_persisted_rules() {
    let mut initial = ChatSettings::default();
    initial.custom_filter = BTreeMap::from([persisted("saved", "hello")]);
    let settings = Arc::new(MemorySettings::new(initial));
    let registry = FilterRegistry::new(settings).expect("inside a tokio runtime");

    let filter = registry.handle(&ChannelContext::new("chan"));
    let rule = filter.get("saved").expect("persisted rule loaded on creation");
    assert!(rule.persist);
    assert_eq!(rule.pattern, "hello");
}

#[tokio::test]
async fn test_handles_are_shared_per_context_and_isolated_across_contexts() {
    let settings = Arc::new(MemorySettings::default());
    let registry = FilterRegistry::new(settings).expect("inside a tokio runtime");
    let one = ChannelContext::new("one");
    let two = ChannelContext::new("two");

    registry.handle(&one).define("r", RuleBody::new("x"), false);

    assert!(registry.handle(&one).get("r").is_some());
    assert!(registry.handle(&two).get("r").is_none());
    assert_eq!(registry.contexts(), vec![one, two]);
}

#[tokio::test(start_paused = true)]
async fn test_release_flushes_pending_save_and_drops_store() {
    let settings = Arc::new(RecordingSettings::default());
    let registry = FilterRegistry::new(settings.clone()).expect("inside a tokio runtime");
    let ctx = ChannelContext::new("chan");

    let filter = registry.handle(&ctx);
    filter.define("x", RuleBody::new("spam"), true);
    filter.define("temp", RuleBody::new("eggs"), false);
    assert!(registry.release(&ctx));
    assert!(!registry.release(&ctx));
    assert_eq!(settings.writes(), 1, "release writes pending changes immediately");

    tokio::time::sleep(Duration::from_millis(500)).await;
    assert_eq!(settings.writes(), 1);
    assert!(registry.is_empty());

    let fresh = registry.handle(&ctx);
    assert!(fresh.get("x").is_some());
    assert!(fresh.get("temp").is_none(), "volatile rules do not outlive their store");
}

#[test]
fn test_registry_requires_runtime() {
    let settings = Arc::new(MemorySettings::default());
    let result = FilterRegistry::new(settings);
    assert!(matches!(result, Err(FilterError::NoRuntime(_))));
}
