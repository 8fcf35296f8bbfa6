use std::fs;
use std::path::{Path, PathBuf};

use serde_json::Value;
use thiserror::Error;
use tracing::info;

use crate::models::Row;

pub const CSV_FILE_NAME: &str = "query_results.csv";
pub const JSON_FILE_NAME: &str = "query_results.json";

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("JSON export failed: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Failed to write export file: {0}")]
    Io(#[from] std::io::Error),
}

/// Header line from the first row's keys, then one line per row with every
/// field wrapped in double quotes. Embedded quotes and commas are written as
/// is. Null, `false`, `0` and missing cells are empty. Lines are joined with
/// `\n` and there is no trailing newline. `None` when there are no rows.
pub fn to_csv(rows: &[Row]) -> Option<String> {
    let first = rows.first()?;
    let headers: Vec<&str> = first.keys().map(String::as_str).collect();

    let mut lines = Vec::with_capacity(rows.len() + 1);
    lines.push(headers.join(","));
    for row in rows {
        let fields: Vec<String> = headers
            .iter()
            .map(|h| format!("\"{}\"", cell_text(row.get(*h))))
            .collect();
        lines.push(fields.join(","));
    }
    Some(lines.join("\n"))
}

fn cell_text(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) | Some(Value::Bool(false)) => String::new(),
        Some(Value::Number(n)) if n.as_f64() == Some(0.0) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

/// Pretty-printed with two-space indentation. `None` when there are no rows.
pub fn to_json(rows: &[Row]) -> Result<Option<String>, ExportError> {
    if rows.is_empty() {
        return Ok(None);
    }
    Ok(Some(serde_json::to_string_pretty(rows)?))
}

pub fn write_csv(dir: &Path, rows: &[Row]) -> Result<Option<PathBuf>, ExportError> {
    match to_csv(rows) {
        Some(content) => write_export(dir, CSV_FILE_NAME, &content, rows.len()).map(Some),
        None => Ok(None),
    }
}

pub fn write_json(dir: &Path, rows: &[Row]) -> Result<Option<PathBuf>, ExportError> {
    match to_json(rows)? {
        Some(content) => write_export(dir, JSON_FILE_NAME, &content, rows.len()).map(Some),
        None => Ok(None),
    }
}

fn write_export(
    dir: &Path,
    file_name: &str,
    content: &str,
    row_count: usize,
) -> Result<PathBuf, ExportError> {
    let path = dir.join(file_name);
    fs::write(&path, content)?;
    info!("Exported {} rows to {}", row_count, path.display());
    Ok(path)
}
