use cbapi::data::data_exporter::label_header;
use cbapi::data::datatable::{DataTable, DataValue};
use comfy_table::{Attribute, Cell, ContentArrangement, Table};
use crossterm::style::Stylize;

/// Print up to `limit` rows of `table`, label first
pub fn display_results(table: &DataTable, limit: usize) {
    if table.is_empty() {
        println!("{}", "No results found.".yellow());
        return;
    }

    let mut display = Table::new();
    display.set_content_arrangement(ContentArrangement::Dynamic);

    let headers: Vec<Cell> = std::iter::once(label_header(table))
        .chain(table.column_names())
        .map(|name| Cell::new(name).add_attribute(Attribute::Bold))
        .collect();
    display.set_header(headers);

    for row in table.rows.iter().take(limit) {
        let cells: Vec<String> = std::iter::once(row.label.clone())
            .chain(row.values.iter().map(|value| match value {
                DataValue::Null => "NULL".to_string(),
                other => other.to_string(),
            }))
            .collect();
        display.add_row(cells);
    }

    println!("{display}");

    let shown = limit.min(table.row_count());
    if shown < table.row_count() {
        println!(
            "\n{}",
            format!("{} of {} rows shown", shown, table.row_count()).green()
        );
    } else {
        println!("\n{}", format!("{} rows returned", table.row_count()).green());
    }
}
