//! Ticket table for the console.

use comfy_table::{presets, ColumnConstraint, ContentArrangement, Row, Table, Width};
use repairdesk_core::{Ticket, TicketStatus};

const HEADERS: [&str; 9] = [
    "",
    "ID",
    "Device Name",
    "Serial Number",
    "Issue Description",
    "Submitted By",
    "Contact Info",
    "Status",
    "Date Repaired",
];

/// Widest a text column may grow; longer values are cut with `...`.
const MAX_TEXT_WIDTH: u16 = 30;

/// Columns holding free text entered on the form.
const TEXT_COLUMNS: std::ops::Range<usize> = 2..7;

fn row_marker(status: TicketStatus) -> &'static str {
    match status {
        TicketStatus::Pending => "",
        TicketStatus::Repaired => "+",
        TicketStatus::Canceled => "x",
    }
}

fn ticket_row(ticket: &Ticket) -> Row {
    let mut row = Row::from(vec![
        row_marker(ticket.status).to_string(),
        ticket.id.to_string(),
        ticket.device.clone(),
        ticket.serial.clone(),
        ticket.issue.clone(),
        ticket.submitted_by.clone(),
        ticket.contact.clone(),
        ticket.status.to_string(),
        ticket.date_repaired_str(),
    ]);
    row.max_height(1);
    row
}

/// Render tickets as a table. Repaired rows are marked `+`, canceled rows `x`.
pub fn render_table(tickets: &[Ticket]) -> String {
    if tickets.is_empty() {
        return "No devices in the repair queue.".to_string();
    }

    let mut table = Table::new();
    table
        .load_preset(presets::ASCII_FULL_CONDENSED)
        .set_content_arrangement(ContentArrangement::Disabled)
        .set_header(HEADERS);

    for index in TEXT_COLUMNS {
        if let Some(column) = table.column_mut(index) {
            column.set_constraint(ColumnConstraint::UpperBoundary(Width::Fixed(
                MAX_TEXT_WIDTH,
            )));
        }
    }

    for ticket in tickets {
        table.add_row(ticket_row(ticket));
    }

    table.to_string()
}
