use crate::filter::FilterMode;
use clap::ValueEnum;

/// Filtering mode as chosen on the command line
#[derive(Debug, Clone, Copy, PartialEq, ValueEnum)]
pub enum ModeArg {
    Blocklist, // A match hides the message
    Allowlist, // A miss hides the message
}

impl From<ModeArg> for FilterMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Blocklist => FilterMode::Blocklist,
            ModeArg::Allowlist => FilterMode::Allowlist,
        }
    }
}

impl From<FilterMode> for ModeArg {
    fn from(mode: FilterMode) -> Self {
        match mode {
            FilterMode::Blocklist => ModeArg::Blocklist,
            FilterMode::Allowlist => ModeArg::Allowlist,
        }
    }
}
