// Column-aligned table, TSV and JSON rendering for resource listings

use serde_json::json;

/// A listing ready for rendering: a header row plus data rows
#[derive(Debug, Clone, Default)]
pub struct Listing {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Listing {
    pub fn new(headers: &[&str]) -> Self {
        Listing {
            headers: headers.iter().map(|h| h.to_string()).collect(),
            rows: Vec::new(),
        }
    }

    pub fn push(&mut self, row: Vec<String>) {
        self.rows.push(row);
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Render with columns padded to the widest cell
    pub fn to_table(&self) -> String {
        let mut widths: Vec<usize> = self.headers.iter().map(|h| h.len()).collect();
        for row in &self.rows {
            for (i, cell) in row.iter().enumerate() {
                if i < widths.len() && cell.len() > widths[i] {
                    widths[i] = cell.len();
                }
            }
        }

        let mut out = String::new();
        render_row(&mut out, &self.headers, &widths);
        let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
        render_row(&mut out, &rule, &widths);
        for row in &self.rows {
            render_row(&mut out, row, &widths);
        }
        out
    }

    /// Tab-separated values, one row per line
    pub fn to_tsv(&self) -> String {
        let mut lines = vec![self.headers.join("\t")];
        for row in &self.rows {
            lines.push(row.join("\t"));
        }
        lines.join("\n")
    }

    /// JSON array of objects keyed by header name
    pub fn to_json(&self) -> String {
        let objects: Vec<serde_json::Value> = self
            .rows
            .iter()
            .map(|row| {
                let mut map = serde_json::Map::new();
                for (header, cell) in self.headers.iter().zip(row.iter()) {
                    map.insert(header.clone(), json!(cell));
                }
                serde_json::Value::Object(map)
            })
            .collect();
        serde_json::to_string_pretty(&objects).unwrap_or_else(|_| "[]".to_string())
    }
}

fn render_row(out: &mut String, cells: &[String], widths: &[usize]) {
    let mut parts = Vec::with_capacity(cells.len());
    for (i, cell) in cells.iter().enumerate() {
        let width = widths.get(i).copied().unwrap_or(cell.len());
        parts.push(format!("{:<width$}", cell, width = width));
    }
    out.push_str(parts.join("  ").trim_end());
    out.push('\n');
}

/// Format a byte count using binary units, the way capacity columns are shown
pub fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 7] = ["B", "KiB", "MiB", "GiB", "TiB", "PiB", "EiB"];

    if bytes < 1024 {
        return format!("{} B", bytes);
    }

    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }

    if (value - value.round()).abs() < 0.05 {
        format!("{:.0} {}", value.round(), UNITS[unit])
    } else {
        format!("{:.2} {}", value, UNITS[unit])
    }
}
