pub mod channel;
pub mod cli;
pub mod config;
pub mod debounce;
pub mod display;
pub mod filter;
pub mod settings;

use crate::display::{display_rules, format_verdict};
pub use channel::{ChannelContext, ChatFilter, FilterRegistry};
pub use cli::{Cli, Commands, ModeArg, cli_parse};
pub use config::{ChatSettings, ConfigError, load_settings, save_settings};
pub use filter::{ChatMessage, FilterDef, FilterError, FilterMode, FilterTarget, RuleBody};
pub use settings::{MemorySettings, SettingsStore, WriteOrigin};
use std::sync::Arc;

/// Load settings for the CLI; a missing file starts from defaults
fn load_cli_settings(path: &std::path::Path) -> Result<ChatSettings, ConfigError> {
    if path.exists() {
        config::load_settings(Some(path))
    } else {
        tracing::info!(path = %path.display(), "settings file not found, using defaults");
        config::load_settings(None)
    }
}

pub async fn run() -> anyhow::Result<()> {
    let cli = cli_parse();
    run_with(cli).await
}

/// Execute one parsed command against its settings file
pub async fn run_with(cli: Cli) -> anyhow::Result<()> {
    let settings = Arc::new(MemorySettings::new(load_cli_settings(&cli.settings)?));
    let registry = FilterRegistry::new(settings.clone())?;
    let ctx = ChannelContext::new(cli.channel.clone());
    let filter = registry.handle(&ctx);

    let mutated = match cli.command {
        Commands::List => {
            let rules = filter.get_all();
            display_rules(ctx.as_str(), rules.values());
            false
        }
        Commands::Add {
            id,
            pattern,
            regexp,
            case_sensitive,
            username,
            in_message,
        } => {
            if regexp {
                crate::filter::compile_pattern(&pattern)?;
            }
            if !in_message && !username {
                anyhow::bail!("rule '{id}' checks neither the message nor the username");
            }

            let body = RuleBody::new(pattern)
                .regexp(regexp)
                .case_sensitive(case_sensitive)
                .in_message(in_message)
                .in_username(username);
            let rule = filter.define(id, body, true);
            println!("Saved rule '{}'", rule.id);
            true
        }
        Commands::Remove { id } => {
            if filter.get(&id).is_none() {
                anyhow::bail!("no rule named '{id}'");
            }
            filter.remove(&id);
            println!("Removed rule '{id}'");
            true
        }
        Commands::Rename { old, new } => {
            if filter.get(&old).is_none() {
                anyhow::bail!("no rule named '{old}'");
            }
            filter.update_id(&old, &new);
            println!("Renamed rule '{old}' to '{new}'");
            true
        }
        Commands::Set { key, value } => {
            settings.set_flag(&key, value)?;
            println!("{key} = {value}");
            true
        }
        Commands::Check {
            body,
            user,
            rule,
            mode,
        } => {
            let mode = match mode {
                Some(mode) => FilterMode::from(mode),
                None => match filter.active_mode() {
                    Some(mode) => mode,
                    None => {
                        println!("chat filtering is disabled (chat.filtered_chat = false)");
                        return Ok(());
                    }
                },
            };

            let mut message = ChatMessage::new(user, body);
            let filtered_by = match rule {
                Some(rule) => {
                    if filter.get(&rule).is_none() {
                        anyhow::bail!("no rule named '{rule}'");
                    }
                    if filter.check_match_with_mode(&rule, &mut message, mode) {
                        vec![rule]
                    } else {
                        Vec::new()
                    }
                }
                None => filter.check_all_with_mode(&mut message, mode),
            };

            print!("{}", format_verdict(mode, &filtered_by, message.filtered));
            false
        }
    };

    if mutated {
        registry.release(&ctx);
        save_settings(&cli.settings, &settings.snapshot())?;
    }

    Ok(())
}
