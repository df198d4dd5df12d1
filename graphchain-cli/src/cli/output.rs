// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Output formatting for chain results

use comfy_table::{Cell, Color, ContentArrangement, Table};
use graphchain::{Element, Item};

use super::commands::OutputFormat;

pub struct ResultFormatter;

impl ResultFormatter {
    pub fn format(items: &[Item], format: OutputFormat) -> Result<String, serde_json::Error> {
        match format {
            OutputFormat::Table => Ok(Self::table(items).to_string()),
            OutputFormat::Json => serde_json::to_string_pretty(items),
            OutputFormat::Csv => Ok(items.iter().map(|i| i.to_string()).collect::<Vec<_>>().join("\n")),
        }
    }

    fn table(items: &[Item]) -> Table {
        let mut table = create_table();
        if !items.is_empty() && items.iter().all(|i| i.as_element().is_some()) {
            add_header(&mut table, &["Group", "Id", "Properties"]);
            for element in items.iter().filter_map(Item::as_element) {
                table.add_row(vec![
                    Cell::new(element.group()).fg(Color::Green),
                    Cell::new(element_id(element)),
                    Cell::new(properties(element)),
                ]);
            }
        } else {
            add_header(&mut table, &["Result"]);
            for item in items {
                table.add_row(vec![Cell::new(item.to_string())]);
            }
        }
        table
    }
}

fn element_id(element: &Element) -> String {
    match element {
        Element::Entity(entity) => entity.vertex.to_string(),
        Element::Edge(edge) => {
            let arrow = if edge.directed { "->" } else { "--" };
            format!("{} {} {}", edge.source, arrow, edge.destination)
        }
    }
}

fn properties(element: &Element) -> String {
    element
        .properties()
        .iter()
        .map(|(name, value)| format!("{}={}", name, value))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Create a styled table with consistent formatting.
pub fn create_table() -> Table {
    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.load_preset(comfy_table::presets::UTF8_FULL_CONDENSED);
    table
}

/// Add a header row to a table.
pub fn add_header(table: &mut Table, headers: &[&str]) {
    table.set_header(headers.iter().map(|h| Cell::new(h).fg(Color::Cyan)).collect::<Vec<_>>());
}
