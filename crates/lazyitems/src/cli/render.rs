//! Rendering evaluated items for the terminal.

use anyhow::{Context, Result};
use clap::ValueEnum;
use serde::Serialize;

use crate::app::evaluator::EvaluatedItems;
use crate::domain::model::{Item, ProjectItem};

/// Supported output formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
#[value(rename_all = "kebab-case")]
pub enum OutputFormat {
    /// One `Type: include` line per item.
    Plain,
    /// Pretty-printed JSON array of item lists.
    Json,
}

#[derive(Serialize)]
struct ItemListView<'a> {
    item_type: &'a str,
    items: &'a [ProjectItem],
}

pub fn render(evaluated: &EvaluatedItems<ProjectItem>, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Plain => Ok(render_plain(evaluated)),
        OutputFormat::Json => render_json(evaluated),
    }
}

fn render_plain(evaluated: &EvaluatedItems<ProjectItem>) -> String {
    let mut lines = Vec::new();
    for (item_type, items) in evaluated {
        for item in items.iter() {
            let mut line = format!("{item_type}: {}", item.evaluated_include());
            if !item.metadata().is_empty() {
                let metadata: Vec<String> = item
                    .metadata()
                    .iter()
                    .map(|(name, value)| format!("{name}={value}"))
                    .collect();
                line.push_str(&format!(" [{}]", metadata.join(", ")));
            }
            lines.push(line);
        }
    }
    lines.join("\n")
}

fn render_json(evaluated: &EvaluatedItems<ProjectItem>) -> Result<String> {
    let views: Vec<ItemListView<'_>> = evaluated
        .iter()
        .map(|(item_type, items)| ItemListView {
            item_type,
            items: items.as_slice(),
        })
        .collect();
    serde_json::to_string_pretty(&views).context("failed to serialize evaluated items")
}
