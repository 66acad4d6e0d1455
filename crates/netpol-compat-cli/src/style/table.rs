//! Table formatting using comfy-table.

use comfy_table::modifiers::UTF8_ROUND_CORNERS;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Attribute, Cell, Color, ContentArrangement, Table};
use netpol_compat::{PairOutcome, PairReport};

fn styled_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table
}

fn colored(text: &str, color: Color) -> Cell {
    if super::no_color() {
        Cell::new(text)
    } else {
        Cell::new(text).fg(color)
    }
}

/// Creates a table with one row per checked pair.
pub fn batch_table(reports: &[PairReport]) -> Table {
    let mut table = styled_table();

    let header_cells: Vec<Cell> = ["Ingress", "Egress", "Result", "Stage", "Detail"]
        .iter()
        .map(|col| {
            if super::no_color() {
                Cell::new(col)
            } else {
                Cell::new(col)
                    .add_attribute(Attribute::Bold)
                    .fg(Color::Cyan)
            }
        })
        .collect();
    table.set_header(header_cells);

    for report in reports {
        let (result, stage, detail) = match &report.outcome {
            PairOutcome::Verdict(verdict) if verdict.compatible => (
                colored("compatible", Color::Green),
                verdict.stage.to_string(),
                verdict
                    .witness_label
                    .as_ref()
                    .map(ToString::to_string)
                    .unwrap_or_default(),
            ),
            PairOutcome::Verdict(verdict) => (
                colored("breaks", Color::Red),
                verdict.stage.to_string(),
                format!("missing {}", crate::commands::format_ports(&verdict.missing_ports)),
            ),
            PairOutcome::Error { reason } => {
                (colored("error", Color::Yellow), "-".to_string(), reason.clone())
            }
        };

        table.add_row(vec![
            Cell::new(&report.pair.ingress),
            Cell::new(&report.pair.egress),
            result,
            Cell::new(stage),
            Cell::new(detail),
        ]);
    }

    table
}

/// Prints the batch report table.
pub fn print_batch_table(reports: &[PairReport]) {
    println!("{}", batch_table(reports));
}

/// Creates a key-value info table (two columns: key and value).
pub fn info_table(entries: &[(String, String)]) -> Table {
    let mut table = styled_table();

    for (key, value) in entries {
        table.add_row(vec![colored(key, Color::DarkGrey), Cell::new(value)]);
    }

    table
}

/// Prints a key-value info table.
pub fn print_info_table(entries: &[(String, String)]) {
    println!("{}", info_table(entries));
}
