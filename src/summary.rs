//! Textual summaries of a [`CellResult`].
//!
//! `CellResult` implements `Display`: response metadata, then the structural
//! summary, then a short preview of the first rows for tables.

use crate::models::{CellResult, Content};
use num_format::{Locale, ToFormattedString};
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::io::Cursor;

/// Rows shown in the preview of a table.
pub const PREVIEW_ROWS: usize = 5;

/// Per-column statistics of a table result.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ColumnSummary {
    pub name: String,
    /// Numeric cells.
    pub count: usize,
    /// Null or absent cells.
    pub missing: usize,
    /// Non-numeric, non-null cells (labels, class names).
    pub text: usize,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub mean: Option<f64>,
    pub median: Option<f64>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Summary {
    /// Array of records.
    Table {
        rows: usize,
        columns: Vec<ColumnSummary>,
    },
    /// JSON that is not an array of records.
    Value { shape: String },
    Image { bytes: usize, media_type: String },
    /// Zip bundle; `entries` is `None` when the bytes are not a readable zip.
    Archive {
        bytes: usize,
        entries: Option<Vec<String>>,
    },
}

/// Summarize a table: one [`ColumnSummary`] per key seen in any record.
pub fn summarize_records(rows: &[Value]) -> Vec<ColumnSummary> {
    let mut order: Vec<String> = Vec::new();
    let mut numbers: BTreeMap<&str, Vec<f64>> = BTreeMap::new();
    let mut text: BTreeMap<&str, usize> = BTreeMap::new();
    let mut nulls: BTreeMap<&str, usize> = BTreeMap::new();

    for row in rows {
        let Some(obj) = row.as_object() else { continue };
        for (k, v) in obj {
            if !numbers.contains_key(k.as_str()) {
                order.push(k.clone());
                numbers.insert(k.as_str(), Vec::new());
            }
            match v {
                Value::Number(n) => match n.as_f64() {
                    Some(x) if x.is_finite() => numbers.entry(k.as_str()).or_default().push(x),
                    _ => *nulls.entry(k.as_str()).or_default() += 1,
                },
                Value::Null => *nulls.entry(k.as_str()).or_default() += 1,
                _ => *text.entry(k.as_str()).or_default() += 1,
            }
        }
    }

    let records = rows.iter().filter(|r| r.is_object()).count();
    let mut out = Vec::with_capacity(order.len());
    for name in &order {
        let mut vals = numbers.remove(name.as_str()).unwrap_or_default();
        vals.sort_by(|a, b| a.total_cmp(b));
        let count = vals.len();
        let text_cells = text.get(name.as_str()).copied().unwrap_or(0);
        let present = count + text_cells + nulls.get(name.as_str()).copied().unwrap_or(0);
        let mean = if count > 0 {
            Some(vals.iter().sum::<f64>() / count as f64)
        } else {
            None
        };
        let median = if count == 0 {
            None
        } else if count % 2 == 1 {
            Some(vals[count / 2])
        } else {
            Some((vals[count / 2 - 1] + vals[count / 2]) / 2.0)
        };
        out.push(ColumnSummary {
            name: name.clone(),
            count,
            // absent keys count as missing as well
            missing: records - present + nulls.get(name.as_str()).copied().unwrap_or(0),
            text: text_cells,
            min: vals.first().copied(),
            max: vals.last().copied(),
            mean,
            median,
        });
    }
    out
}

/// Media type from magic bytes.
pub fn sniff_media_type(bytes: &[u8]) -> &'static str {
    match bytes {
        [0x89, b'P', b'N', b'G', ..] => "image/png",
        [0xFF, 0xD8, 0xFF, ..] => "image/jpeg",
        [b'G', b'I', b'F', b'8', ..] => "image/gif",
        [b'P', b'K', 0x03, 0x04, ..] | [b'P', b'K', 0x05, 0x06, ..] => "application/zip",
        _ => "application/octet-stream",
    }
}

/// Entry names of a zip bundle.
pub fn archive_entries(bytes: &[u8]) -> crate::Result<Vec<String>> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes))?;
    let mut names = Vec::with_capacity(archive.len());
    for i in 0..archive.len() {
        names.push(archive.by_index(i)?.name().to_string());
    }
    Ok(names)
}

fn describe_shape(v: &Value) -> String {
    match v {
        Value::Null => "null".into(),
        Value::Bool(_) => "boolean".into(),
        Value::Number(_) => "number".into(),
        Value::String(_) => "string".into(),
        Value::Array(a) => format!("array of {} non-record item(s)", a.len()),
        Value::Object(o) => format!("object with {} key(s)", o.len()),
    }
}

impl Summary {
    pub fn of(content: &Content) -> Self {
        match content {
            Content::Table(Value::Array(rows)) if rows.iter().all(Value::is_object) => {
                Summary::Table {
                    rows: rows.len(),
                    columns: summarize_records(rows),
                }
            }
            Content::Table(v) => Summary::Value {
                shape: describe_shape(v),
            },
            Content::Image(b) => Summary::Image {
                bytes: b.len(),
                media_type: sniff_media_type(b).to_string(),
            },
            Content::Archive(b) => Summary::Archive {
                bytes: b.len(),
                entries: match archive_entries(b) {
                    Ok(names) => Some(names),
                    Err(e) => {
                        log::warn!("could not read zip bundle: {e}");
                        None
                    }
                },
            },
        }
    }
}

fn fmt_opt(v: Option<f64>) -> String {
    match v {
        Some(x) if x.is_finite() => {
            // Up to 4 decimals, trailing zeros and dot trimmed.
            let s = format!("{:.4}", x);
            s.trim_end_matches('0').trim_end_matches('.').to_string()
        }
        _ => "NA".to_string(),
    }
}

fn fmt_count(n: usize) -> String {
    n.to_formatted_string(&Locale::en)
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Summary::Table { rows, columns } => {
                writeln!(f, "table: {} rows x {} columns", fmt_count(*rows), columns.len())?;
                for c in columns {
                    if c.count == 0 && c.text > 0 {
                        writeln!(f, "  {}  text={} missing={}", c.name, c.text, c.missing)?;
                    } else {
                        writeln!(
                            f,
                            "  {}  count={} missing={}  min={} max={} mean={} median={}",
                            c.name,
                            c.count,
                            c.missing,
                            fmt_opt(c.min),
                            fmt_opt(c.max),
                            fmt_opt(c.mean),
                            fmt_opt(c.median)
                        )?;
                    }
                }
                Ok(())
            }
            Summary::Value { shape } => writeln!(f, "value: {shape}"),
            Summary::Image { bytes, media_type } => {
                writeln!(f, "image: {media_type}, {} bytes", fmt_count(*bytes))
            }
            Summary::Archive { bytes, entries } => {
                writeln!(f, "archive: {} bytes", fmt_count(*bytes))?;
                match entries {
                    Some(names) => {
                        for n in names {
                            writeln!(f, "  {n}")?;
                        }
                        Ok(())
                    }
                    None => writeln!(f, "  (unreadable zip)"),
                }
            }
        }
    }
}

impl CellResult {
    pub fn summary(&self) -> Summary {
        Summary::of(self.content())
    }
}

impl fmt::Display for CellResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let m = self.meta();
        writeln!(f, "HTTP {} GET {}", m.status, m.url)?;
        writeln!(
            f,
            "session={} kind={} content-type={} length={} fetched={}",
            m.session,
            m.kind,
            m.content_type.as_deref().unwrap_or("-"),
            fmt_count(m.content_length),
            m.fetched_at.format("%Y-%m-%d %H:%M:%S UTC")
        )?;
        write!(f, "{}", self.summary())?;
        if let Some(rows) = self.content().records() {
            if !rows.is_empty() {
                writeln!(f, "preview:")?;
            }
            for row in rows.iter().take(PREVIEW_ROWS) {
                writeln!(f, "  {row}")?;
            }
            if rows.len() > PREVIEW_ROWS {
                writeln!(f, "  … {} more", fmt_count(rows.len() - PREVIEW_ROWS))?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn columns_keep_numeric_text_and_missing_apart() {
        let rows = vec![
            json!({"ADM1_NAME_ALT": "Lagunes", "cass_y": 1.0}),
            json!({"ADM1_NAME_ALT": "Savanes", "cass_y": 2.0}),
            json!({"ADM1_NAME_ALT": "Vallee", "cass_y": null}),
            json!({"ADM1_NAME_ALT": "Bas", "cass_y": 4.0}),
            json!({"ADM1_NAME_ALT": "Zanzan"}),
        ];
        let cols = summarize_records(&rows);
        let name = cols.iter().find(|c| c.name == "ADM1_NAME_ALT").unwrap();
        assert_eq!((name.count, name.text, name.missing), (0, 5, 0));

        let y = cols.iter().find(|c| c.name == "cass_y").unwrap();
        assert_eq!(y.count, 3);
        assert_eq!(y.missing, 2);
        assert_eq!(y.min, Some(1.0));
        assert_eq!(y.max, Some(4.0));
        assert_eq!(y.median, Some(2.0));
        assert!((y.mean.unwrap() - 7.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn even_count_median_is_midpoint() {
        let rows: Vec<Value> = [4.0, 1.0, 3.0, 2.0]
            .iter()
            .map(|v| json!({ "v": v }))
            .collect();
        let cols = summarize_records(&rows);
        assert_eq!(cols[0].median, Some(2.5));
    }

    #[test]
    fn sniffing_and_non_record_shapes() {
        assert_eq!(sniff_media_type(b"\x89PNG\r\n\x1a\n"), "image/png");
        assert_eq!(sniff_media_type(b"PK\x03\x04rest"), "application/zip");
        assert_eq!(sniff_media_type(b"??"), "application/octet-stream");
        assert_eq!(
            Summary::of(&Content::Table(json!([1, 2, 3]))),
            Summary::Value {
                shape: "array of 3 non-record item(s)".into()
            }
        );
    }

    #[test]
    fn broken_archive_has_no_entries() {
        let s = Summary::of(&Content::Archive(b"not a zip".to_vec()));
        assert_eq!(
            s,
            Summary::Archive {
                bytes: 9,
                entries: None
            }
        );
        assert!(s.to_string().contains("unreadable"));
    }

    #[test]
    fn format_helpers() {
        assert_eq!(fmt_opt(Some(2.5)), "2.5");
        assert_eq!(fmt_opt(Some(3.0)), "3");
        assert_eq!(fmt_opt(None), "NA");
        assert_eq!(fmt_count(12345), "12,345");
    }
}
