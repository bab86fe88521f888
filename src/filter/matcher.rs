use super::error::FilterError;
use super::rule::FilterDef;
use fancy_regex::Regex;
use std::collections::HashMap;
use tracing::warn;

/// Matches rules against candidate strings and caches compiled regexps by rule id
#[derive(Debug, Default)]
pub struct PatternMatcher {
    compiled: HashMap<String, Regex>,
}

impl PatternMatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Match a rule against a candidate, logging and rejecting invalid regexps
    pub fn matches(&mut self, rule: &FilterDef, candidate: &str) -> bool {
        match self.try_matches(rule, candidate) {
            Ok(matched) => matched,
            Err(err) => {
                warn!(rule = %rule.id, pattern = %rule.pattern, error = %err, "chat filter regexp failed");
                false
            }
        }
    }

    /// Match a rule against a candidate, surfacing regexp compilation failures
    ///
    /// Regexps are always compiled case-insensitively, whatever the rule's
    /// `case_sensitive` flag says. Failed compilations are not cached.
    pub fn try_matches(&mut self, rule: &FilterDef, candidate: &str) -> Result<bool, FilterError> {
        if rule.regexp {
            return self
                .compiled_for(rule)?
                .is_match(candidate)
                .map_err(|source| FilterError::MatchAborted {
                    pattern: rule.pattern.clone(),
                    source: Box::new(source),
                });
        }

        if rule.pattern.is_empty() {
            return Ok(false);
        }

        if rule.case_sensitive {
            Ok(candidate.contains(&rule.pattern))
        } else {
            Ok(candidate
                .to_lowercase()
                .contains(&rule.pattern.to_lowercase()))
        }
    }

    fn compiled_for(&mut self, rule: &FilterDef) -> Result<&Regex, FilterError> {
        if !self.compiled.contains_key(&rule.id) {
            let regex = compile_pattern(&rule.pattern)?;
            self.compiled.insert(rule.id.clone(), regex);
        }

        // Inserted above when missing
        Ok(&self.compiled[&rule.id])
    }

    /// Drop the cached regexp for a rule
    pub fn invalidate(&mut self, id: &str) {
        self.compiled.remove(id);
    }

    /// Move a cached regexp along with a renamed rule
    pub fn rename(&mut self, old_id: &str, new_id: &str) {
        self.compiled.remove(new_id);
        if let Some(regex) = self.compiled.remove(old_id) {
            self.compiled.insert(new_id.to_string(), regex);
        }
    }

    pub fn is_cached(&self, id: &str) -> bool {
        self.compiled.contains_key(id)
    }
}

/// Compile a filter pattern the way rules use it
///
/// Look-around and backreferences are supported; matching is always
/// case-insensitive.
pub fn compile_pattern(pattern: &str) -> Result<Regex, FilterError> {
    Regex::new(&format!("(?i){pattern}")).map_err(|source| FilterError::InvalidPattern {
        pattern: pattern.to_string(),
        source: Box::new(source),
    })
}
