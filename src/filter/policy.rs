use super::error::FilterError;
use super::matcher::PatternMatcher;
use super::rule::{FilterDef, FilterTarget};
use super::store::RuleStore;
use tracing::warn;

/// How a rule match translates into hiding a message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterMode {
    /// A match hides the message
    Blocklist,
    /// Failing to match hides the message
    Allowlist,
}

impl FilterMode {
    pub fn from_blocklist_flag(is_blocklist: bool) -> Self {
        if is_blocklist {
            FilterMode::Blocklist
        } else {
            FilterMode::Allowlist
        }
    }

    /// Whether the raw match result is inverted
    pub fn negates(self) -> bool {
        matches!(self, FilterMode::Allowlist)
    }

    /// Whether a positive result flags the message as filtered
    pub fn marks_filtered(self) -> bool {
        matches!(self, FilterMode::Allowlist)
    }
}

/// Evaluate one rule of `store` against a message under `mode`
///
/// Returns true when the rule filters the message out. Unknown rules,
/// rules without a field to check and invalid regexps all yield false.
pub fn evaluate<M: FilterTarget + ?Sized>(
    store: &mut RuleStore,
    key: &str,
    message: &mut M,
    mode: FilterMode,
) -> bool {
    evaluate_with(store, key, message, mode.negates(), mode.marks_filtered())
}

pub fn evaluate_with<M: FilterTarget + ?Sized>(
    store: &mut RuleStore,
    key: &str,
    message: &mut M,
    negate: bool,
    mark_filtered: bool,
) -> bool {
    let Some((rule, matcher)) = store.rule_and_matcher(key) else {
        return false;
    };

    if !rule.has_scope() {
        return false;
    }

    let matched = match scoped_match(rule, matcher, &*message) {
        Ok(matched) => matched,
        Err(err) => {
            warn!(rule = %rule.id, pattern = %rule.pattern, error = %err, "chat filter regexp failed");
            return false;
        }
    };

    let hit = matched != negate;
    if hit && mark_filtered {
        message.mark_filtered();
    }

    hit
}

/// Body first, then username whenever the body did not match
fn scoped_match<M: FilterTarget + ?Sized>(
    rule: &FilterDef,
    matcher: &mut PatternMatcher,
    message: &M,
) -> Result<bool, FilterError> {
    if rule.in_message && matcher.try_matches(rule, message.body())? {
        return Ok(true);
    }

    if rule.in_username && matcher.try_matches(rule, message.username())? {
        return Ok(true);
    }

    Ok(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_from_flag() {
        assert_eq!(FilterMode::from_blocklist_flag(true), FilterMode::Blocklist);
        assert_eq!(FilterMode::from_blocklist_flag(false), FilterMode::Allowlist);
    }

    #[test]
    fn test_only_allowlist_negates_and_marks() {
        assert!(!FilterMode::Blocklist.negates());
        assert!(!FilterMode::Blocklist.marks_filtered());
        assert!(FilterMode::Allowlist.negates());
        assert!(FilterMode::Allowlist.marks_filtered());
    }
}
