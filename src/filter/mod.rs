//! Chat filter rules, matching and evaluation
//!
//! A rule pairs a pattern with matching options and the fields it applies to:
//!
//! ```text
//! pattern        literal substring, or a regexp when `regexp` is set
//! caseSensitive  substring comparison only; regexps always ignore case
//! inMessage      check the message body
//! inUsername     check the author name when the body did not match
//! persist        write the rule through to `chat.custom_filter`
//! ```
//!
//! # Modes
//!
//! - Blocklist: a matching rule hides the message
//! - Allowlist: a message that fails to match the rule is hidden and flagged
//!
//! # Examples
//!
//! ```
//! use chat_filter::filter::{ChatMessage, FilterMode, RuleBody, RuleStore, evaluate};
//!
//! let mut store = RuleStore::new();
//! store.define("spam", RuleBody::new("spam"), false);
//!
//! let mut msg = ChatMessage::new("viewer", "buy spam now");
//! assert!(evaluate(&mut store, "spam", &mut msg, FilterMode::Blocklist));
//! assert!(!msg.filtered);
//! ```

pub mod error;
pub mod matcher;
pub mod policy;
pub mod rule;
pub mod store;

pub use error::FilterError;
pub use matcher::{PatternMatcher, compile_pattern};
pub use policy::{FilterMode, evaluate, evaluate_with};
pub use rule::{ChatMessage, FilterDef, FilterTarget, RuleBody};
pub use store::RuleStore;
