use serde::{Deserialize, Serialize};

/// A stored chat filter rule
///
/// The `id` always mirrors the key the rule is stored under; renaming goes
/// through [`RuleStore::update_id`](super::RuleStore::update_id).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterDef {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub pattern: String,
    #[serde(default)]
    pub regexp: bool,
    #[serde(default)]
    pub case_sensitive: bool,
    #[serde(default)]
    pub in_message: bool,
    #[serde(default)]
    pub in_username: bool,
    #[serde(default)]
    pub persist: bool,
}

impl FilterDef {
    /// Build a rule from its body, the key it is stored under and its persist flag
    pub fn new(id: impl Into<String>, body: RuleBody, persist: bool) -> Self {
        Self {
            id: id.into(),
            pattern: body.pattern,
            regexp: body.regexp,
            case_sensitive: body.case_sensitive,
            in_message: body.in_message,
            in_username: body.in_username,
            persist,
        }
    }

    /// The rule body without its id and persist flag
    pub fn to_body(&self) -> RuleBody {
        RuleBody {
            pattern: self.pattern.clone(),
            regexp: self.regexp,
            case_sensitive: self.case_sensitive,
            in_message: self.in_message,
            in_username: self.in_username,
        }
    }

    /// Whether the rule checks any field at all
    pub fn has_scope(&self) -> bool {
        self.in_message || self.in_username
    }
}

/// Rule body as supplied by the caller of `define`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleBody {
    pub pattern: String,
    pub regexp: bool,
    pub case_sensitive: bool,
    pub in_message: bool,
    pub in_username: bool,
}

impl RuleBody {
    /// Case-insensitive substring rule checked against the message body
    pub fn new(pattern: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            regexp: false,
            case_sensitive: false,
            in_message: true,
            in_username: false,
        }
    }

    pub fn regexp(mut self, regexp: bool) -> Self {
        self.regexp = regexp;
        self
    }

    pub fn case_sensitive(mut self, case_sensitive: bool) -> Self {
        self.case_sensitive = case_sensitive;
        self
    }

    pub fn in_message(mut self, in_message: bool) -> Self {
        self.in_message = in_message;
        self
    }

    pub fn in_username(mut self, in_username: bool) -> Self {
        self.in_username = in_username;
        self
    }
}

/// Anything the evaluation policy can inspect and flag
pub trait FilterTarget {
    fn body(&self) -> &str;
    fn username(&self) -> &str;
    /// Flag the message as hidden. Filters never clear the flag.
    fn mark_filtered(&mut self);
}

/// A single incoming chat line
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChatMessage {
    pub body: String,
    pub username: String,
    pub filtered: bool,
}

impl ChatMessage {
    pub fn new(username: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            body: body.into(),
            username: username.into(),
            filtered: false,
        }
    }
}

impl FilterTarget for ChatMessage {
    fn body(&self) -> &str {
        &self.body
    }

    fn username(&self) -> &str {
        &self.username
    }

    fn mark_filtered(&mut self) {
        self.filtered = true;
    }
}
