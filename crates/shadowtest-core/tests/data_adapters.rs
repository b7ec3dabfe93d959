//! Input adapters against real files.

use std::io::Write;

use serde_json::{json, Value};
use shadowtest_core::{LogLoader, ShadowError, SyntheticGenerator};

fn write_file(dir: &tempfile::TempDir, name: &str, content: &str) -> std::path::PathBuf {
    let path = dir.path().join(name);
    let mut f = std::fs::File::create(&path).expect("create");
    f.write_all(content.as_bytes()).expect("write");
    path
}

#[test]
fn loads_csv_with_inferred_cells() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = write_file(
        &dir,
        "traffic.csv",
        "value,score,metadata,flag,missing\n10,0.5,test,true,\n90,1.25,prod,false,x\n",
    );

    let records = LogLoader::new(&path).load().expect("load csv");
    assert_eq!(records.len(), 2);
    assert_eq!(records[0]["value"], json!(10));
    assert_eq!(records[0]["score"], json!(0.5));
    assert_eq!(records[0]["metadata"], json!("test"));
    assert_eq!(records[0]["flag"], json!(true));
    assert_eq!(records[0]["missing"], Value::Null);
    assert_eq!(records[1]["missing"], json!("x"));
}

#[test]
fn csv_types_are_inferred_per_cell_not_per_column() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = write_file(&dir, "mixed.csv", "metadata
test
123
");

    let records = LogLoader::new(&path).load().expect("load csv");
    assert_eq!(records[0]["metadata"], json!("test"));
    assert_eq!(records[1]["metadata"], json!(123));
}

#[test]
fn loads_json_array_of_objects() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = write_file(
        &dir,
        "traffic.json",
        r#"[{"value": 10, "metadata": "a"}, {"value": 90.5, "tags": ["x"]}]"#,
    );

    let records = LogLoader::new(&path).load().expect("load json");
    assert_eq!(records.len(), 2);
    assert_eq!(records[1]["value"], json!(90.5));
    assert_eq!(records[1]["tags"], json!(["x"]));
}

#[test]
fn uppercase_extension_is_accepted() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = write_file(&dir, "TRAFFIC.JSON", "[]");
    assert!(LogLoader::new(&path).load().expect("load").is_empty());
}

#[test]
fn json_object_document_is_rejected() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = write_file(&dir, "traffic.json", r#"{"value": 10}"#);

    let err = LogLoader::new(&path).load().unwrap_err();
    assert!(matches!(err, ShadowError::UnsupportedInputFormat(_)));
    assert!(err.to_string().contains("array"));
}

#[test]
fn json_array_of_scalars_is_rejected() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = write_file(&dir, "traffic.json", "[1, 2]");

    let err = LogLoader::new(&path).load().unwrap_err();
    assert!(matches!(err, ShadowError::UnsupportedInputFormat(_)));
}

#[test]
fn malformed_json_is_a_serialization_error() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = write_file(&dir, "traffic.json", "[{");

    let err = LogLoader::new(&path).load().unwrap_err();
    assert!(matches!(err, ShadowError::Serialization(_)));
}

#[test]
fn missing_file_is_an_io_error() {
    let err = LogLoader::new("/nonexistent/traffic.json").load().unwrap_err();
    assert!(matches!(err, ShadowError::Io(_)));
}

#[test]
fn other_extensions_are_unsupported() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = write_file(&dir, "traffic.txt", "value\n1\n");

    let err = LogLoader::new(&path).load().unwrap_err();
    assert!(matches!(err, ShadowError::UnsupportedInputFormat(_)));
}

#[test]
fn generator_feeds_mock_sized_batches() {
    let template = json!({"value": 50, "metadata": "test"})
        .as_object()
        .cloned()
        .expect("object");
    let mut gen = SyntheticGenerator::with_seed(template.clone(), 1);
    let records = gen.generate(50);

    assert_eq!(records.len(), 50);
    assert_eq!(gen.template(), &template);
    for r in &records {
        assert_eq!(r.len(), 2);
        assert!(r["value"].is_i64());
    }
}
