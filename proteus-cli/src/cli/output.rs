//! Standard output utilities for consistent command formatting
use colored::*;
use comfy_table::modifiers::UTF8_ROUND_CORNERS;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Attribute, Cell, CellAlignment, Color as TableColor, ContentArrangement, Table};
use proteus_core::ClusterSummary;

/// Display a section header
pub fn section_header(title: &str) {
    println!("\n{}", title.bold().cyan());
    println!("{}", "─".repeat(title.len()).dimmed());
}

pub fn success(message: &str) {
    println!("{} {}", "✓".green(), message);
}

pub fn info(message: &str) {
    println!("{} {}", "●".blue(), message);
}

pub fn warning(message: &str) {
    println!("{} {}", "⚠".yellow(), message);
}

/// Tree structure item
pub fn tree_item(is_last: bool, label: &str, value: &str) {
    let prefix = if is_last { "└─" } else { "├─" };
    println!("{} {}: {}", prefix.dimmed(), label, value);
}

/// Create a standard table with our preferred styling
pub fn create_standard_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table
}

pub fn header_cell(text: &str) -> Cell {
    Cell::new(text)
        .add_attribute(Attribute::Bold)
        .fg(TableColor::Cyan)
}

/// Format a number with thousands separator
pub fn format_number(n: usize) -> String {
    let s = n.to_string();
    let mut result = String::new();
    for (i, c) in s.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            result.insert(0, ',');
        }
        result.insert(0, c);
    }
    result
}

/// One row per cluster label plus a trailing noise row
pub fn cluster_table(summary: &ClusterSummary) -> Table {
    let total = summary.total().max(1) as f64;
    let mut table = create_standard_table();
    table.set_header(vec![
        header_cell("Cluster"),
        header_cell("Reads"),
        header_cell("Share"),
    ]);

    let share = |n: usize| format!("{:.1}%", 100.0 * n as f64 / total);
    for (label, &count) in &summary.sizes {
        table.add_row(vec![
            Cell::new(label),
            Cell::new(format_number(count)).set_alignment(CellAlignment::Right),
            Cell::new(share(count)).set_alignment(CellAlignment::Right),
        ]);
    }
    table.add_row(vec![
        Cell::new("noise").fg(TableColor::DarkGrey),
        Cell::new(format_number(summary.noise)).set_alignment(CellAlignment::Right),
        Cell::new(share(summary.noise)).set_alignment(CellAlignment::Right),
    ]);
    table
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(0), "0");
        assert_eq!(format_number(999), "999");
        assert_eq!(format_number(1000), "1,000");
        assert_eq!(format_number(1234567), "1,234,567");
    }

    #[test]
    fn test_cluster_table_lists_noise_last() {
        let summary = ClusterSummary::from_labels(&[0, 0, 1, -1, 1, 1]);
        let rendered = cluster_table(&summary).to_string();
        let zero = rendered.find("50.0%").unwrap();
        let noise = rendered.find("noise").unwrap();
        assert!(zero < noise);
        assert!(rendered.contains("16.7%"));
    }
}
