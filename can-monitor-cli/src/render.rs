//! Terminal rendering of the row table

use can_monitor::display::{format_data, format_flags, format_id, format_time};
use can_monitor::{ConnectionStatus, Row, RowTable, SortOrder, TimeFormat};
use comfy_table::{CellAlignment, ContentArrangement, Table};

/// Render options taken from the display config
#[derive(Debug, Clone, Copy)]
pub struct Renderer {
    pub time_format: TimeFormat,
    pub sort: SortOrder,
}

impl Renderer {
    pub fn new(time_format: TimeFormat, sort: SortOrder) -> Self {
        Self { time_format, sort }
    }

    /// Build the table for the current rows in display order
    pub fn table(&self, rows: &RowTable) -> Table {
        build_table(&rows.snapshot(self.sort), self.time_format)
    }

    /// Print the table to stdout
    pub fn print(&self, rows: &RowTable) {
        println!("{}", self.table(rows));
    }
}

fn build_table(rows: &[&Row], time_format: TimeFormat) -> Table {
    let time_header = match time_format {
        TimeFormat::Delta => "Δt (s)",
        TimeFormat::Absolute => "Time (UTC)",
    };

    let mut table = Table::new();
    table
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![time_header, "ID", "Flags", "DLC", "Data"]);

    for row in rows {
        table.add_row(vec![
            format_time(row, time_format),
            format_id(&row.frame),
            format_flags(&row.frame),
            row.frame.effective_dlc().to_string(),
            format_data(&row.frame.data),
        ]);
    }

    for index in [0, 3] {
        if let Some(column) = table.column_mut(index) {
            column.set_cell_alignment(CellAlignment::Right);
        }
    }
    table
}

/// One-line status shown above the table
pub fn status_line(status: &ConnectionStatus, rows: usize, pending: usize) -> String {
    let marker = match status {
        ConnectionStatus::Connected { .. } => "●",
        ConnectionStatus::Disconnected => "○",
        ConnectionStatus::Failed { .. } => "✗",
    };
    format!("{} {} | {} rows, {} pending", marker, status, rows, pending)
}
