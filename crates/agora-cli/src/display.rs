//! Terminal output for discussions

use agora_common::AgentMessage;
use agora_core::{PersonaCatalog, parse_actions};
use colored::*;

fn speaker_color(catalog: &PersonaCatalog, agent_id: &str) -> Color {
    const PALETTE: [Color; 6] = [
        Color::BrightGreen,
        Color::BrightYellow,
        Color::BrightMagenta,
        Color::BrightBlue,
        Color::BrightCyan,
        Color::BrightRed,
    ];
    let index = catalog
        .list()
        .iter()
        .position(|p| p.id == agent_id)
        .unwrap_or(0);
    PALETTE[index % PALETTE.len()]
}

pub fn print_personas(catalog: &PersonaCatalog) {
    println!("{}", "🤖 Available personas:".bright_cyan().bold());
    println!();
    for persona in catalog.list() {
        let tag = if persona.is_moderator { " [moderator]" } else { "" };
        println!(
            "• {} ({}){} - {}",
            persona.name.bright_green().bold(),
            persona.id.bright_blue(),
            tag.yellow(),
            persona.personality.white()
        );
    }
}

pub fn print_header(topic: &str, catalog: &PersonaCatalog, agent_ids: &[String]) {
    println!("{} {}", "💬 Topic:".bright_cyan().bold(), topic.bold());
    let names: Vec<String> = agent_ids
        .iter()
        .map(|id| {
            catalog
                .get(id)
                .map(|p| p.name.clone())
                .unwrap_or_else(|| id.clone())
        })
        .collect();
    println!("{} {}", "👥 Panel:".bright_cyan().bold(), names.join(", "));
    println!();
}

pub fn print_message(catalog: &PersonaCatalog, index: u64, message: &AgentMessage) {
    let name = catalog
        .get(&message.agent_id)
        .map(|p| p.name.as_str())
        .unwrap_or(message.agent_id.as_str());
    let parsed = parse_actions(&message.content);

    println!(
        "{} {}",
        format!("[{}]", index).dimmed(),
        format!("{}:", name)
            .color(speaker_color(catalog, &message.agent_id))
            .bold()
    );
    for line in parsed.text.lines() {
        println!("    {}", line);
    }
    for action in &parsed.actions {
        let params = serde_json::to_string(&action.params).unwrap_or_default();
        println!("    {} {} {}", "⚑".yellow(), action.kind.yellow().bold(), params.dimmed());
    }
    println!();
}

pub fn print_failure(agent_id: &str, error: &str) {
    println!(
        "{} {} {}",
        "✗".red().bold(),
        format!("{} could not reply:", agent_id).red(),
        error
    );
}

pub fn print_summary(messages: u64, rounds: u32) {
    println!(
        "{} {} message(s) across {} completed round(s)",
        "✓".bright_green().bold(),
        messages,
        rounds
    );
}
