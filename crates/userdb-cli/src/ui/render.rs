//! Line and table rendering.

use comfy_table::{presets, Attribute, Cell, ContentArrangement, Table};

use super::terminal::Terminal;
use super::theme::{paint, palette, Status};

/// `[OK] message`, colored when the terminal allows it.
pub fn status(term: &Terminal, kind: Status, message: &str) -> String {
    let marker = paint(kind.marker(term.unicode), kind.ansi(), term.color);
    if message.is_empty() {
        return marker;
    }
    format!("{} {}", marker, message)
}

/// One labelled value: `Label: value` when pretty, `label=value` otherwise.
pub fn field(term: &Terminal, label: &str, value: &str) -> String {
    if term.pretty() {
        return format!("{} {}", paint(&format!("{}:", label), palette::DIM, term.color), value);
    }
    let key = label.to_lowercase().replace(' ', "_");
    format!("{}={}", key, value)
}

/// Borderless table with a header row, or tab-separated rows without one.
pub fn table(term: &Terminal, headers: &[&str], rows: &[Vec<String>]) -> String {
    if !term.pretty() {
        return rows
            .iter()
            .map(|row| row.join("\t"))
            .collect::<Vec<_>>()
            .join("\n");
    }

    let header = headers.iter().map(|title| {
        let cell = Cell::new(title);
        if term.color {
            cell.add_attribute(Attribute::Dim)
        } else {
            cell
        }
    });

    let mut out = Table::new();
    out.load_preset(presets::NOTHING)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(header);
    for column in out.column_iter_mut() {
        column.set_padding((0, 2));
    }
    for row in rows {
        out.add_row(row);
    }
    out.to_string()
}

/// Write a line to stdout. JSON mode keeps stdout for the document.
pub fn emit(term: &Terminal, line: &str) {
    if !term.json() {
        println!("{}", line);
    }
}

pub fn error_text(term: &Terminal, message: &str, hint: Option<&str>) -> String {
    if term.pretty() {
        let mut text = status(term, Status::Failed, message);
        if let Some(hint) = hint {
            text.push('\n');
            text.push_str(&paint(hint, palette::DIM, term.color));
        }
        return text;
    }
    match hint {
        Some(hint) => format!("error={}\nhint={}", message, hint),
        None => format!("error={}", message),
    }
}

pub fn emit_error(term: &Terminal, message: &str, hint: Option<&str>) {
    eprintln!("{}", error_text(term, message, hint));
}
