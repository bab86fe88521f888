mod mode;

use clap::{ArgAction, Parser, Subcommand};
pub use mode::ModeArg;
use std::path::PathBuf;

/// Manage and test per-channel chat filter rules stored in a settings file
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Settings file holding chat.custom_filter and the filter flags
    #[arg(short, long, env = "CHAT_FILTER_SETTINGS", default_value = "chat-settings.json")]
    pub settings: PathBuf,

    /// Channel whose rules are edited or checked
    #[arg(short, long, default_value = "default")]
    pub channel: String,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List the persisted rules
    List,
    /// Add or overwrite a persisted rule
    Add {
        /// Rule id
        id: String,

        /// Substring, or regular expression with --regexp
        pattern: String,

        /// Treat the pattern as a regular expression (always case-insensitive)
        #[arg(short, long)]
        regexp: bool,

        /// Compare substrings case-sensitively
        #[arg(long)]
        case_sensitive: bool,

        /// Also match against the author name
        #[arg(short, long)]
        username: bool,

        /// Do not match against the message body
        #[arg(long = "no-message", action = ArgAction::SetFalse)]
        in_message: bool,
    },
    /// Remove a rule
    Remove {
        /// Rule id
        id: String,
    },
    /// Rename a rule
    Rename {
        /// Current rule id
        old: String,

        /// New rule id
        new: String,
    },
    /// Set chat.filtered_chat or chat.filter_is_blocklist
    Set {
        /// Settings key
        key: String,

        /// New value
        #[arg(action = ArgAction::Set)]
        value: bool,
    },
    /// Check which rules would filter a message
    Check {
        /// Message body
        #[arg(short, long)]
        body: String,

        /// Author name
        #[arg(short, long, default_value = "")]
        user: String,

        /// Only evaluate this rule
        #[arg(short, long)]
        rule: Option<String>,

        /// Override the configured mode; also bypasses chat.filtered_chat
        #[arg(short, long)]
        mode: Option<ModeArg>,
    },
}

pub fn cli_parse() -> Cli {
    Cli::parse()
}
