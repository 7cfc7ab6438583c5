//! Text rendering of composite records.

use htb_core::aggregate::field_names;
use htb_core::{AuxiliaryData, CompositeRecord, ResourceKind};
use serde_json::Value;

/// One aligned table per kind, in the order kinds first appear.
pub fn render_records(records: &[CompositeRecord]) -> String {
    let mut kinds: Vec<ResourceKind> = Vec::new();
    for record in records {
        if !kinds.contains(&record.subject.kind) {
            kinds.push(record.subject.kind);
        }
    }

    let mut sections = Vec::new();
    for kind in kinds {
        let group: Vec<&CompositeRecord> = records
            .iter()
            .filter(|r| r.subject.kind == kind)
            .collect();
        let rows: Vec<Vec<String>> = group
            .iter()
            .map(|r| r.fields().into_iter().map(|(_, value)| value).collect())
            .collect();
        let mut section = render_table(field_names(kind), &rows);
        for record in group {
            let extra = render_auxiliary(record);
            if !extra.is_empty() {
                section.push('\n');
                section.push_str(&extra);
            }
        }
        sections.push(section);
    }
    sections.join("\n\n")
}

/// Left-aligned columns separated by two spaces.
pub fn render_table(headers: &[&str], rows: &[Vec<String>]) -> String {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in rows {
        for (i, cell) in row.iter().enumerate() {
            if let Some(width) = widths.get_mut(i) {
                *width = (*width).max(cell.chars().count());
            }
        }
    }

    let line = |cells: Vec<&str>| -> String {
        cells
            .iter()
            .zip(&widths)
            .map(|(cell, &width)| format!("{cell:<width$}"))
            .collect::<Vec<_>>()
            .join("  ")
            .trim_end()
            .to_string()
    };

    let mut out = vec![line(headers.to_vec())];
    for row in rows {
        out.push(line(row.iter().map(String::as_str).collect()));
    }
    out.join("\n")
}

fn render_auxiliary(record: &CompositeRecord) -> String {
    record
        .auxiliary
        .iter()
        .map(|(source, data)| match data {
            AuxiliaryData::Available(value) => {
                format!("{} {source}: {}", record.subject.name, summarize(value))
            }
            AuxiliaryData::Unavailable(_) => {
                format!("{} {source}: unavailable", record.subject.name)
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Entry count of the first list found in an auxiliary payload.
fn summarize(value: &Value) -> String {
    match value {
        Value::Array(items) => format!("{} entries", items.len()),
        Value::Object(map) => map
            .values()
            .find_map(|v| v.as_array())
            .map(|items| format!("{} entries", items.len()))
            .unwrap_or_else(|| "available".to_string()),
        _ => "available".to_string(),
    }
}

/// JSON array of the records, in the order they were requested.
pub fn records_json(records: &[CompositeRecord]) -> serde_json::Result<String> {
    serde_json::to_string_pretty(records)
}
