//! Metadata table written alongside the class directories.

use indexmap::{IndexMap, IndexSet};

/// File name of the metadata table inside the archive.
pub const METADATA_FILE_NAME: &str = "picture_data.csv";

/// One flattened metadata row, keyed by column name in insertion order.
pub type MetadataRow = IndexMap<String, serde_json::Value>;

/// Escape a value for CSV: wrap in quotes if it contains comma, quote, or newline.
fn csv_escape(value: &str) -> String {
    if value.contains(',') || value.contains('"') || value.contains('\n') || value.contains('\r')
    {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

/// Convert a JSON value to a CSV cell.
fn json_value_to_csv(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::Null => String::new(),
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Number(n) => n.to_string(),
        serde_json::Value::Bool(b) => b.to_string(),
        serde_json::Value::Array(_) | serde_json::Value::Object(_) => value.to_string(),
    }
}

/// Column order: union of all row keys, first-seen order.
pub fn metadata_columns(rows: &[MetadataRow]) -> Vec<&str> {
    let columns: IndexSet<&str> = rows
        .iter()
        .flat_map(|row| row.keys().map(String::as_str))
        .collect();
    columns.into_iter().collect()
}

/// Build the CSV text for a set of rows.
///
/// The header is the union of keys (see [`metadata_columns`]); a row lacking
/// a column gets an empty cell. Every line, header included, ends in `\n`.
pub fn build_metadata_csv(rows: &[MetadataRow]) -> String {
    let columns = metadata_columns(rows);
    let mut lines = Vec::with_capacity(rows.len() + 1);

    lines.push(
        columns
            .iter()
            .map(|c| csv_escape(c))
            .collect::<Vec<_>>()
            .join(","),
    );

    for row in rows {
        let cells: Vec<String> = columns
            .iter()
            .map(|column| {
                row.get(*column)
                    .map(|value| csv_escape(&json_value_to_csv(value)))
                    .unwrap_or_default()
            })
            .collect();
        lines.push(cells.join(","));
    }

    let mut csv = lines.join("\n");
    csv.push('\n');
    csv
}
