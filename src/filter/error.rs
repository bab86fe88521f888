use thiserror::Error;

/// Errors raised while compiling or scheduling chat filters
#[derive(Debug, Error)]
pub enum FilterError {
    #[error("Invalid filter regexp '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: Box<fancy_regex::Error>,
    },

    #[error("Filter regexp '{pattern}' gave up while matching: {source}")]
    MatchAborted {
        pattern: String,
        #[source]
        source: Box<fancy_regex::Error>,
    },

    #[error("Chat filters need a tokio runtime: {0}")]
    NoRuntime(#[from] tokio::runtime::TryCurrentError),
}
