//! Format agents, tools, and graph statistics as text.

use crate::agent::{AgentDefinition, AgentRuntimeInfo, AgentStatus};
use crate::catalog::ToolCatalog;
use crate::graph::GraphStatistics;
use comfy_table::presets::UTF8_BORDERS_ONLY;
use comfy_table::Table;
use owo_colors::OwoColorize;

/// Format a section heading with bold/underline.
pub fn format_section_heading(title: &str) -> String {
    format!("{}", title.bold().underline())
}

fn status_cell(status: AgentStatus) -> String {
    match status {
        AgentStatus::Online => format!("{}", "online".green()),
        AgentStatus::Exited => format!("{}", "exited".red()),
    }
}

fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        text.to_string()
    } else {
        let cut: String = text.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", cut)
    }
}

pub fn format_agents_text(agents: &[AgentRuntimeInfo]) -> String {
    let mut out = format!("{}\n\n", format_section_heading("Agents"));
    if agents.is_empty() {
        out.push_str("  No agents have completed a handshake.\n");
        return out;
    }
    let mut table = Table::new();
    table.load_preset(UTF8_BORDERS_ONLY);
    table.set_header(vec!["Name", "Status", "PID", "Version", "Protocol", "Tools"]);
    for agent in agents {
        let tools = agent
            .tools
            .iter()
            .map(|t| t.name.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        table.add_row(vec![
            agent.name.clone(),
            status_cell(agent.status),
            agent
                .pid
                .map(|p| p.to_string())
                .unwrap_or_else(|| "-".to_string()),
            agent.version.clone(),
            agent.protocol.clone(),
            if tools.is_empty() { "-".to_string() } else { tools },
        ]);
    }
    out.push_str(&format!("{}\n", table));
    out
}

pub fn format_definitions_text(definitions: &[AgentDefinition]) -> String {
    let mut out = format!("{}\n\n", format_section_heading("Registered definitions"));
    if definitions.is_empty() {
        out.push_str("  Registry is empty.\n");
        return out;
    }
    let mut table = Table::new();
    table.load_preset(UTF8_BORDERS_ONLY);
    table.set_header(vec!["Name", "Command", "Auto start", "Description"]);
    for def in definitions {
        let command = std::iter::once(def.command.as_str())
            .chain(def.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ");
        table.add_row(vec![
            def.name.clone(),
            command,
            if def.auto_start { "yes" } else { "no" }.to_string(),
            def.description.clone().unwrap_or_default(),
        ]);
    }
    out.push_str(&format!("{}\n", table));
    out
}

pub fn format_tools_text(catalog: &ToolCatalog) -> String {
    let mut out = format!("{}\n\n", format_section_heading("Available tools"));
    let mut table = Table::new();
    table.load_preset(UTF8_BORDERS_ONLY);
    table.set_header(vec!["Priority", "Name", "Source", "Description"]);
    for entry in catalog.entries() {
        let source = match &entry.agent {
            Some(agent) => format!("{} ({})", entry.source, agent),
            None => entry.source.to_string(),
        };
        table.add_row(vec![
            entry.priority.to_string(),
            entry.name.clone(),
            source,
            truncate(&entry.description, 60),
        ]);
    }
    out.push_str(&format!("{}\n", table));
    out
}

pub fn format_statistics_text(stats: &GraphStatistics) -> String {
    let mut out = format!("{}\n\n", format_section_heading("Knowledge graph"));
    out.push_str(&format!("  Entities:     {}\n", stats.entities));
    out.push_str(&format!("  Relations:    {}\n", stats.relations));
    out.push_str(&format!("  Observations: {}\n", stats.observations));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::CatalogSettings;

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("abcdefghijkl", 8), "abcde...");
    }

    #[test]
    fn test_tools_table_lists_every_entry() {
        let catalog = ToolCatalog::build(&[], &CatalogSettings::default());
        let text = format_tools_text(&catalog);
        for name in catalog.names() {
            assert!(text.contains(name), "missing {}", name);
        }
    }

    #[test]
    fn test_empty_agent_list_message() {
        assert!(format_agents_text(&[]).contains("No agents"));
    }

    #[test]
    fn test_statistics_text() {
        let text = format_statistics_text(&GraphStatistics {
            entities: 3,
            relations: 1,
            observations: 0,
        });
        assert!(text.contains("Entities:     3"));
    }
}
