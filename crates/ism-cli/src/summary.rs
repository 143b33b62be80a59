//! Terminal tables for command output.

use comfy_table::modifiers::{UTF8_ROUND_CORNERS, UTF8_SOLID_INNER_BORDERS};
use comfy_table::presets::{UTF8_FULL, UTF8_FULL_CONDENSED};
use comfy_table::{
    Attribute, Cell, CellAlignment, Color, ColumnConstraint, ContentArrangement, Table, Width,
};
use ism_form::{DirtyDiff, EntryChange};
use ism_mapping::SchemaIssue;
use ism_model::PlainLronConfig;
use ism_service::{Toast, ToastKind};

use crate::inspect::FieldRow;

/// Default notification settings, one row per action.
pub fn notification_table(rows: &[PlainLronConfig]) -> Table {
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Operation"),
        header_cell("Action"),
        header_cell("Success"),
        header_cell("Failure"),
        header_cell("Channels"),
    ]);
    apply_table_style(&mut table);
    align_column(&mut table, 2, CellAlignment::Center);
    align_column(&mut table, 3, CellAlignment::Center);
    for row in rows {
        let channels = if row.channels.is_empty() {
            dim_cell("-")
        } else {
            Cell::new(row.channels.join(", "))
        };
        table.add_row(vec![
            Cell::new(&row.title).add_attribute(Attribute::Bold),
            dim_cell(&row.action_name),
            flag_cell(row.success),
            flag_cell(row.failure),
            channels,
        ]);
    }
    table
}

/// Fields of a mapping in tree order.
pub fn field_table(fields: &[FieldRow]) -> Table {
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Field"),
        header_cell("Type"),
        header_cell("Status"),
    ]);
    apply_table_style(&mut table);
    align_column(&mut table, 2, CellAlignment::Center);
    for field in fields {
        let depth = field.path.matches('.').count();
        let name = field.path.rsplit('.').next().unwrap_or(&field.path);
        let status = if field.locked {
            dim_cell("saved")
        } else {
            Cell::new("new").fg(Color::Green)
        };
        table.add_row(vec![
            Cell::new(format!("{}{name}", "  ".repeat(depth))),
            Cell::new(&field.field_type).fg(Color::Blue),
            status,
        ]);
    }
    table
}

/// Schema violations of a mapping.
pub fn issue_table(issues: &[SchemaIssue]) -> Table {
    let mut table = Table::new();
    table.set_header(vec![header_cell("Path"), header_cell("Problem")]);
    apply_issue_table_style(&mut table);
    for issue in issues {
        table.add_row(vec![
            Cell::new(&issue.path).fg(Color::Red),
            Cell::new(&issue.message),
        ]);
    }
    table
}

/// Changed entries of a diff.
pub fn diff_table(diff: &DirtyDiff) -> Table {
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Entry"),
        header_cell("Change"),
        header_cell("Fields"),
    ]);
    apply_issue_table_style(&mut table);
    align_column(&mut table, 1, CellAlignment::Center);
    for (identity, change) in diff.iter() {
        let (kind, fields) = match change {
            EntryChange::Added => (Cell::new("added").fg(Color::Green), dim_cell("-")),
            EntryChange::Removed => (Cell::new("removed").fg(Color::Red), dim_cell("-")),
            EntryChange::Modified(paths) => (
                Cell::new("modified").fg(Color::Yellow),
                Cell::new(paths.join(", ")),
            ),
        };
        table.add_row(vec![Cell::new(identity), kind, fields]);
    }
    table
}

/// "N unsaved changes" line of the save bar.
pub fn unsaved_line(count: usize) -> String {
    match count {
        0 => "No unsaved changes".to_string(),
        1 => "1 unsaved change".to_string(),
        n => format!("{n} unsaved changes"),
    }
}

/// Print toasts: successes to stdout, dangers to stderr.
pub fn print_toasts(toasts: &[(ToastKind, Toast)]) {
    for (kind, toast) in toasts {
        match kind {
            ToastKind::Success => println!("{}", toast.title),
            ToastKind::Danger => match &toast.text {
                Some(text) => eprintln!("error: {} {text}", toast.title),
                None => eprintln!("error: {}", toast.title),
            },
        }
    }
}

fn apply_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_width(120);
}

fn apply_issue_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .apply_modifier(UTF8_SOLID_INNER_BORDERS)
        .set_content_arrangement(ContentArrangement::DynamicFullWidth)
        .set_width(160);
    if table.column_count() >= 3 {
        table.set_constraints(vec![
            ColumnConstraint::UpperBoundary(Width::Percentage(40)),
            ColumnConstraint::LowerBoundary(Width::Fixed(10)),
            ColumnConstraint::UpperBoundary(Width::Percentage(50)),
        ]);
    }
}

fn align_column(table: &mut Table, index: usize, alignment: CellAlignment) {
    if let Some(column) = table.column_mut(index) {
        column.set_cell_alignment(alignment);
    }
}

fn header_cell(label: &str) -> Cell {
    Cell::new(label)
        .fg(Color::Cyan)
        .add_attribute(Attribute::Bold)
}

fn flag_cell(enabled: bool) -> Cell {
    if enabled {
        Cell::new("✓")
            .fg(Color::Green)
            .add_attribute(Attribute::Bold)
    } else {
        dim_cell("-")
    }
}

fn dim_cell<T: ToString>(value: T) -> Cell {
    Cell::new(value).fg(Color::DarkGrey)
}
