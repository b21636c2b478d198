use crate::error::{Error, Result};
use crate::models::{CellResult, Content};
use csv::WriterBuilder;
use serde_json::Value;
use std::fs::{self, File};
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};

/// Prefix cells that a spreadsheet would evaluate as a formula.
fn guard_cell(s: &str) -> String {
    if s.starts_with(['=', '+', '-', '@']) {
        format!("'{s}")
    } else {
        s.to_string()
    }
}

fn cell_text(v: Option<&Value>) -> String {
    match v {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => guard_cell(s),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Bool(b)) => b.to_string(),
        Some(other) => guard_cell(&other.to_string()),
    }
}

/// Save a JSON array of records as CSV with header.
///
/// The header is the union of record keys in first-seen order; absent and
/// null cells are written empty.
pub fn save_table_csv<P: AsRef<Path>>(table: &Value, path: P) -> Result<()> {
    let rows = table
        .as_array()
        .filter(|rows| rows.iter().all(Value::is_object))
        .ok_or_else(|| Error::invalid("CSV export needs a JSON array of records"))?;

    let mut header: Vec<&str> = Vec::new();
    for row in rows.iter().filter_map(Value::as_object) {
        for k in row.keys() {
            if !header.contains(&k.as_str()) {
                header.push(k);
            }
        }
    }

    let mut wtr = WriterBuilder::new().from_path(path)?;
    wtr.write_record(header.iter().map(|h| guard_cell(h)))?;
    for row in rows.iter().filter_map(Value::as_object) {
        wtr.write_record(header.iter().map(|h| cell_text(row.get(*h))))?;
    }
    wtr.flush()?;
    Ok(())
}

/// Save any JSON value pretty-printed.
pub fn save_json<P: AsRef<Path>>(value: &Value, path: P) -> Result<()> {
    let mut f = File::create(path)?;
    let s = serde_json::to_string_pretty(value)?;
    f.write_all(s.as_bytes())?;
    Ok(())
}

/// Save raw image or archive bytes.
pub fn save_bytes<P: AsRef<Path>>(bytes: &[u8], path: P) -> Result<()> {
    fs::write(path, bytes)?;
    Ok(())
}

/// Save a result in the shape it came in. Tables go to CSV unless the path ends in `.json`.
pub fn save_result<P: AsRef<Path>>(result: &CellResult, path: P) -> Result<()> {
    let path = path.as_ref();
    match result.content() {
        Content::Table(v) => {
            let is_json = path
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| e.eq_ignore_ascii_case("json"));
            if is_json || !v.is_array() {
                save_json(v, path)
            } else {
                save_table_csv(v, path)
            }
        }
        Content::Image(b) | Content::Archive(b) => save_bytes(b, path),
    }
}

/// Unpack a zip bundle below `dir`. Entries that would escape `dir` are skipped.
pub fn extract_archive<P: AsRef<Path>>(bytes: &[u8], dir: P) -> Result<Vec<PathBuf>> {
    let dir = dir.as_ref();
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes))?;
    let mut written = Vec::new();
    for i in 0..archive.len() {
        let mut entry = archive.by_index(i)?;
        let Some(rel) = entry.enclosed_name() else {
            log::warn!("skipping unsafe zip entry {:?}", entry.name());
            continue;
        };
        let out = dir.join(rel);
        if entry.is_dir() {
            fs::create_dir_all(&out)?;
            continue;
        }
        if let Some(parent) = out.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut f = File::create(&out)?;
        std::io::copy(&mut entry, &mut f)?;
        written.push(out);
    }
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    #[test]
    fn write_csv_and_json() {
        let dir = tempdir().unwrap();
        let csvp = dir.path().join("x.csv");
        let jsonp = dir.path().join("x.json");
        let table = json!([{"ISO3": "CIV", "cass_y": 7123.5}]);
        save_table_csv(&table, &csvp).unwrap();
        save_json(&table, &jsonp).unwrap();
        assert!(csvp.exists());
        assert!(jsonp.exists());
    }

    #[test]
    fn csv_needs_records() {
        let dir = tempdir().unwrap();
        let err = save_table_csv(&json!({"a": 1}), dir.path().join("x.csv")).unwrap_err();
        assert!(err.is_invalid_argument());
    }

    #[test]
    fn guard_prefixes_formula_starters() {
        assert_eq!(guard_cell("=1+1"), "'=1+1");
        assert_eq!(guard_cell("-3"), "'-3");
        assert_eq!(guard_cell("Lagunes"), "Lagunes");
        // numbers are not strings and are left alone
        assert_eq!(cell_text(Some(&json!(-3.5))), "-3.5");
    }
}
