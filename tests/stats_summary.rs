use chrono::Utc;
use hcapi_rs::summary::ColumnSummary;
use hcapi_rs::{CellResult, Content, OutputKind, ResponseMeta, Summary};
use serde_json::{Value, json};

fn wrap(content: Content, kind: OutputKind) -> CellResult {
    CellResult::new(
        content,
        ResponseMeta {
            url: "http://localhost/ocpu/tmp/abc123/R/.val/json".into(),
            status: 200,
            content_type: Some("application/json".into()),
            session: "abc123".into(),
            kind,
            content_length: 42,
            headers: vec![],
            fetched_at: Utc::now(),
        },
    )
}

fn rows(n: usize) -> Value {
    Value::Array(
        (0..n)
            .map(|i| json!({"ADM1_NAME_ALT": format!("R{i}"), "cass_y": 100.0 + i as f64}))
            .collect(),
    )
}

#[test]
fn table_summary_has_per_column_stats() {
    let res = wrap(Content::Table(rows(4)), OutputKind::Json);
    let Summary::Table { rows, columns } = res.summary() else {
        panic!("expected table summary");
    };
    assert_eq!(rows, 4);
    let y: &ColumnSummary = columns.iter().find(|c| c.name == "cass_y").unwrap();
    assert_eq!(y.count, 4);
    assert_eq!(y.missing, 0);
    assert_eq!(y.min, Some(100.0));
    assert_eq!(y.max, Some(103.0));
    assert!((y.mean.unwrap() - 101.5).abs() < 1e-9);
    assert!((y.median.unwrap() - 101.5).abs() < 1e-9);
}

#[test]
fn display_shows_metadata_and_a_bounded_preview() {
    let res = wrap(Content::Table(rows(8)), OutputKind::Json);
    let text = res.to_string();
    assert!(text.starts_with("HTTP 200 GET http://localhost/ocpu/tmp/abc123/R/.val/json"));
    assert!(text.contains("session=abc123 kind=json"));
    assert!(text.contains("table: 8 rows x 2 columns"));
    assert!(text.contains("\"R4\""));
    assert!(!text.contains("\"R5\""));
    assert!(text.contains("3 more"));
}

#[test]
fn archive_summary_lists_entries() {
    use std::io::Write;
    let mut buf = std::io::Cursor::new(Vec::new());
    {
        let mut zw = zip::ZipWriter::new(&mut buf);
        let opts = zip::write::SimpleFileOptions::default();
        zw.start_file("cass_y.tif", opts).unwrap();
        zw.write_all(b"raster").unwrap();
        zw.start_file("README.txt", opts).unwrap();
        zw.write_all(b"about").unwrap();
        zw.finish().unwrap();
    }
    let res = wrap(Content::Archive(buf.into_inner()), OutputKind::Zip);
    match res.summary() {
        Summary::Archive { entries, .. } => {
            assert_eq!(entries.unwrap(), vec!["cass_y.tif", "README.txt"])
        }
        other => panic!("unexpected {other:?}"),
    }
}
