use super::error::FilterError;
use super::matcher::PatternMatcher;
use super::rule::{FilterDef, RuleBody};
use std::collections::{BTreeMap, HashMap};

/// Rules of one channel context, keyed by rule id
#[derive(Debug, Default)]
pub struct RuleStore {
    rules: HashMap<String, FilterDef>,
    matcher: PatternMatcher,
}

impl RuleStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite the rule stored at `id`
    pub fn define(&mut self, id: impl Into<String>, body: RuleBody, persist: bool) -> &FilterDef {
        let id = id.into();
        let rule = FilterDef::new(id.clone(), body, persist);

        let stale = self
            .rules
            .get(&id)
            .is_none_or(|old| old.pattern != rule.pattern || old.regexp != rule.regexp);
        if stale {
            self.matcher.invalidate(&id);
        }

        self.rules.insert(id.clone(), rule);
        &self.rules[&id]
    }

    pub fn remove(&mut self, id: &str) -> Option<FilterDef> {
        self.matcher.invalidate(id);
        self.rules.remove(id)
    }

    /// Move the rule at `old_id` to `new_id`, returning false when `old_id` is unknown
    ///
    /// A rule already stored at `new_id` is replaced.
    pub fn update_id(&mut self, old_id: &str, new_id: &str) -> bool {
        if old_id == new_id {
            return self.rules.contains_key(old_id);
        }

        let Some(mut rule) = self.rules.remove(old_id) else {
            return false;
        };

        rule.id = new_id.to_string();
        self.matcher.rename(old_id, new_id);
        self.rules.insert(new_id.to_string(), rule);
        true
    }

    pub fn get(&self, id: &str) -> Option<&FilterDef> {
        self.rules.get(id)
    }

    pub fn all(&self) -> &HashMap<String, FilterDef> {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Snapshot of the rules flagged for persistence
    pub fn persisted(&self) -> BTreeMap<String, FilterDef> {
        self.rules
            .values()
            .filter(|rule| rule.persist)
            .map(|rule| (rule.id.clone(), rule.clone()))
            .collect()
    }

    /// Drop every persisted rule, returning how many were removed
    pub fn purge_persisted(&mut self) -> usize {
        let ids: Vec<String> = self
            .rules
            .values()
            .filter(|rule| rule.persist)
            .map(|rule| rule.id.clone())
            .collect();

        for id in &ids {
            self.remove(id);
        }

        ids.len()
    }

    /// Replace the persisted rules with the ones read from settings
    ///
    /// Volatile rules survive unless a loaded rule takes their id.
    pub fn reload_persisted(&mut self, loaded: BTreeMap<String, FilterDef>) -> usize {
        self.purge_persisted();

        let count = loaded.len();
        for (id, rule) in loaded {
            self.define(id, rule.to_body(), true);
        }

        count
    }

    /// Match one rule's pattern against a candidate string
    pub fn try_matches(&mut self, id: &str, candidate: &str) -> Result<bool, FilterError> {
        match self.rules.get(id) {
            Some(rule) => self.matcher.try_matches(rule, candidate),
            None => Ok(false),
        }
    }

    pub(crate) fn rule_and_matcher(&mut self, id: &str) -> Option<(&FilterDef, &mut PatternMatcher)> {
        let rule = self.rules.get(id)?;
        Some((rule, &mut self.matcher))
    }

    pub fn is_compiled(&self, id: &str) -> bool {
        self.matcher.is_cached(id)
    }
}
