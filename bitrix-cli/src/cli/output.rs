//! Output formatting for command results

use anyhow::{Context, Result};
use clap::ValueEnum;
use serde_json::Value;
use std::collections::HashSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Pretty-printed JSON
    #[default]
    Json,
    /// Single-line JSON
    JsonCompact,
    /// One row per item; columns are the union of item keys, each item
    /// contributing its new keys in sorted order
    Csv,
}

/// Format result items according to the specified output format
pub fn format_output(data: &Value, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => serde_json::to_string_pretty(data).context("Failed to format JSON output"),
        OutputFormat::JsonCompact => serde_json::to_string(data).context("Failed to format JSON output"),
        OutputFormat::Csv => json_to_csv(data),
    }
}

fn json_to_csv(data: &Value) -> Result<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());

    match data {
        Value::Array(items) => {
            let headers = collect_headers(items);
            if headers.is_empty() {
                writer.write_record(["value"])?;
                for item in items {
                    writer.write_record([cell(item)])?;
                }
            } else {
                writer.write_record(&headers)?;
                for item in items {
                    let row: Vec<String> = match item {
                        Value::Object(obj) => headers
                            .iter()
                            .map(|h| obj.get(h).map(cell).unwrap_or_default())
                            .collect(),
                        other => {
                            let mut row = vec![String::new(); headers.len()];
                            row[0] = cell(other);
                            row
                        }
                    };
                    writer.write_record(&row)?;
                }
            }
        }
        Value::Object(obj) => {
            writer.write_record(["key", "value"])?;
            for (key, value) in obj {
                writer.write_record([key.as_str(), cell(value).as_str()])?;
            }
        }
        other => {
            writer.write_record(["value"])?;
            writer.write_record([cell(other)])?;
        }
    }

    let bytes = writer.into_inner().context("Failed to flush CSV output")?;
    String::from_utf8(bytes).context("CSV output is not valid UTF-8")
}

fn collect_headers(items: &[Value]) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut headers = Vec::new();
    for item in items {
        if let Value::Object(obj) = item {
            for key in obj.keys() {
                if seen.insert(key.as_str()) {
                    headers.push(key.clone());
                }
            }
        }
    }
    headers
}

/// Nested values are written as compact JSON; null is an empty cell
fn cell(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.clone(),
        Value::Array(_) | Value::Object(_) => value.to_string(),
    }
}
