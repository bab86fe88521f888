use crate::filter::{FilterDef, FilterMode};
use colored::Colorize;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Cell, ContentArrangement, Table};
use std::fmt::Write as _;

/// Build a table with the shared look of all CLI output
pub fn create_styled_table(headers: &[&str]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(headers.iter().map(|h| Cell::new(h)).collect::<Vec<_>>());
    table
}

fn yes_no(value: bool) -> &'static str {
    if value { "yes" } else { "-" }
}

/// Rules as a table, sorted by id
pub fn rules_table<'a>(rules: impl IntoIterator<Item = &'a FilterDef>) -> Table {
    let mut rules: Vec<&FilterDef> = rules.into_iter().collect();
    rules.sort_by(|a, b| a.id.cmp(&b.id));

    let mut table = create_styled_table(&[
        "Id", "Pattern", "Kind", "Case", "Message", "Username", "Persist",
    ]);

    for rule in rules {
        let kind = if rule.regexp { "regexp" } else { "substring" };
        let case = if rule.regexp || !rule.case_sensitive {
            "ignore"
        } else {
            "exact"
        };

        table.add_row(vec![
            Cell::new(&rule.id),
            Cell::new(&rule.pattern),
            Cell::new(kind),
            Cell::new(case),
            Cell::new(yes_no(rule.in_message)),
            Cell::new(yes_no(rule.in_username)),
            Cell::new(yes_no(rule.persist)),
        ]);
    }

    table
}

/// Print the rule table, or a notice when there is nothing to show
pub fn display_rules<'a>(channel: &str, rules: impl IntoIterator<Item = &'a FilterDef>) {
    let rules: Vec<&FilterDef> = rules.into_iter().collect();
    println!("{}", format!("Chat filters for '{channel}'").bold());
    if rules.is_empty() {
        println!("{}", "no rules defined".bright_black());
    } else {
        println!("{}", rules_table(rules));
    }
}

/// Human-readable outcome of checking a message
pub fn format_verdict(mode: FilterMode, filtered_by: &[String], flagged: bool) -> String {
    let mut out = String::new();
    let mode_name = match mode {
        FilterMode::Blocklist => "blocklist",
        FilterMode::Allowlist => "allowlist",
    };

    if filtered_by.is_empty() {
        let _ = writeln!(out, "{} ({mode_name})", "shown".green().bold());
        return out;
    }

    let _ = writeln!(out, "{} ({mode_name})", "hidden".red().bold());
    for id in filtered_by {
        let _ = writeln!(out, "  filtered by {}", id.yellow());
    }
    if flagged {
        let _ = writeln!(out, "  message flagged as filtered");
    }

    out
}
