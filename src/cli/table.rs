//! Table builder wrapper around comfy-table for consistent list display.

use comfy_table::{presets, Cell, CellAlignment, ContentArrangement, Table};

/// Create a standard list table with the given headers.
///
/// Uses the NOTHING preset (no borders) for a clean CLI aesthetic.
pub fn list_table(headers: &[&str]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(presets::NOTHING)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(headers.iter().map(|h| {
            Cell::new(h.to_uppercase())
                .set_alignment(CellAlignment::Left)
        }));
    table
}

/// Render the table under a count line. `shown` rows out of `total`.
pub fn render_list(entity_name: &str, table: &Table, shown: usize, total: u64) -> String {
    if total == 0 {
        return format!("No {entity_name}s found.");
    }
    let noun = if total == 1 {
        entity_name.to_string()
    } else {
        format!("{entity_name}s")
    };
    let count_line = if shown as u64 == total {
        format!("{total} {noun}:")
    } else {
        format!("{total} {noun} (showing {shown}):")
    };
    format!("{count_line}\n{table}")
}

/// Money column formatting.
pub fn money(value: f64) -> String {
    format!("{value:.2}")
}
