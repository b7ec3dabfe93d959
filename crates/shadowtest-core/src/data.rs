//! Input adapters: recorded traffic from files and synthetic traffic.
//!
//! - [`LogLoader`] reads `.csv` or `.json` request logs into input records.
//! - [`SyntheticGenerator`] fuzzes a template record into many variants.

use std::path::{Path, PathBuf};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde_json::{Number, Value};
use tracing::debug;

use crate::domain::{InputData, Result, ShadowError};

/// Loads request inputs from a CSV or JSON file.
#[derive(Debug, Clone)]
pub struct LogLoader {
    path: PathBuf,
}

impl LogLoader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Load every record in the file.
    ///
    /// CSV: the header row names the fields; each cell becomes an integer,
    /// float, boolean or string, and an empty cell becomes `null`. Types are
    /// inferred per cell, not per column, so `123` in an otherwise textual
    /// column still loads as a number.
    /// JSON: the document must be an array of objects.
    pub fn load(&self) -> Result<Vec<InputData>> {
        let ext = self
            .path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());

        let records = match ext.as_deref() {
            Some("csv") => load_csv(&self.path)?,
            Some("json") => load_json(&self.path)?,
            _ => {
                return Err(ShadowError::UnsupportedInputFormat(format!(
                    "{}: use .csv or .json",
                    self.path.display()
                )))
            }
        };

        debug!(path = %self.path.display(), records = records.len(), "loaded input records");
        Ok(records)
    }
}

fn load_csv(path: &Path) -> Result<Vec<InputData>> {
    let mut reader = csv::ReaderBuilder::new().has_headers(true).from_path(path)?;
    let headers = reader.headers()?.clone();

    let mut records = Vec::new();
    for row in reader.records() {
        let row = row?;
        let record: InputData = headers
            .iter()
            .zip(row.iter())
            .map(|(name, cell)| (name.to_string(), infer_cell(cell)))
            .collect();
        records.push(record);
    }
    Ok(records)
}

fn infer_cell(cell: &str) -> Value {
    let cell = cell.trim();
    if cell.is_empty() {
        return Value::Null;
    }
    if let Ok(i) = cell.parse::<i64>() {
        return Value::Number(i.into());
    }
    if let Ok(f) = cell.parse::<f64>() {
        // NaN / inf have no JSON form; pandas would null them out too.
        return Number::from_f64(f).map(Value::Number).unwrap_or(Value::Null);
    }
    match cell {
        "true" | "True" | "TRUE" => Value::Bool(true),
        "false" | "False" | "FALSE" => Value::Bool(false),
        _ => Value::String(cell.to_string()),
    }
}

fn load_json(path: &Path) -> Result<Vec<InputData>> {
    let raw = std::fs::read_to_string(path)?;
    let doc: Value = serde_json::from_str(&raw)?;

    let items = match doc {
        Value::Array(items) => items,
        other => {
            return Err(ShadowError::UnsupportedInputFormat(format!(
                "{}: expected a JSON array of objects, found {}",
                path.display(),
                json_kind(&other)
            )))
        }
    };

    items
        .into_iter()
        .enumerate()
        .map(|(i, item)| match item {
            Value::Object(map) => Ok(map),
            other => Err(ShadowError::UnsupportedInputFormat(format!(
                "{}: record {i} is {}, expected an object",
                path.display(),
                json_kind(&other)
            ))),
        })
        .collect()
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Generates synthetic inputs by perturbing a template record.
///
/// Per field: integers move by a uniform step in `[-5, 5]`, floats are
/// scaled by a uniform factor in `[0.9, 1.1]` and rounded to 4 decimals,
/// strings get a `_NNN` suffix, anything else is copied.
#[derive(Debug, Clone)]
pub struct SyntheticGenerator {
    template: InputData,
    rng: StdRng,
}

impl SyntheticGenerator {
    pub fn new(template: InputData) -> Self {
        Self {
            template,
            rng: StdRng::from_entropy(),
        }
    }

    /// Reproducible generator.
    pub fn with_seed(template: InputData, seed: u64) -> Self {
        Self {
            template,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn template(&self) -> &InputData {
        &self.template
    }

    pub fn generate(&mut self, count: usize) -> Vec<InputData> {
        (0..count).map(|_| self.next_record()).collect()
    }

    fn next_record(&mut self) -> InputData {
        let template = self.template.clone();
        template
            .into_iter()
            .map(|(k, v)| {
                let fuzzed = self.fuzz(v);
                (k, fuzzed)
            })
            .collect()
    }

    fn fuzz(&mut self, value: Value) -> Value {
        match value {
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    let step: i64 = self.rng.gen_range(-5..=5);
                    Value::Number(i.saturating_add(step).into())
                } else {
                    let x = n.as_f64().unwrap_or(0.0);
                    let factor: f64 = self.rng.gen_range(0.9..=1.1);
                    let scaled = (x * factor * 10_000.0).round() / 10_000.0;
                    Number::from_f64(scaled)
                        .map(Value::Number)
                        .unwrap_or(Value::Number(n))
                }
            }
            Value::String(s) => {
                let suffix: u32 = self.rng.gen_range(100..=999);
                Value::String(format!("{s}_{suffix}"))
            }
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn template() -> InputData {
        json!({"value": 50, "ratio": 2.0, "metadata": "test", "flag": true})
            .as_object()
            .cloned()
            .expect("object")
    }

    #[test]
    fn test_infer_cell() {
        assert_eq!(infer_cell(""), Value::Null);
        assert_eq!(infer_cell("42"), json!(42));
        assert_eq!(infer_cell("-1.5"), json!(-1.5));
        assert_eq!(infer_cell("True"), json!(true));
        assert_eq!(infer_cell("abc"), json!("abc"));
        assert_eq!(infer_cell("NaN"), Value::Null);
    }

    #[test]
    fn test_generate_respects_ranges() {
        let mut gen = SyntheticGenerator::with_seed(template(), 7);
        let records = gen.generate(200);
        assert_eq!(records.len(), 200);

        for r in &records {
            let v = r["value"].as_i64().expect("integer stays integer");
            assert!((45..=55).contains(&v), "value {v} out of range");

            let ratio = r["ratio"].as_f64().expect("float");
            assert!((1.8..=2.2).contains(&ratio), "ratio {ratio} out of range");

            let meta = r["metadata"].as_str().expect("string");
            let suffix: u32 = meta
                .strip_prefix("test_")
                .expect("prefix kept")
                .parse()
                .expect("numeric suffix");
            assert!((100..=999).contains(&suffix));

            assert_eq!(r["flag"], json!(true));
        }
    }

    #[test]
    fn test_same_seed_same_records() {
        let a = SyntheticGenerator::with_seed(template(), 42).generate(10);
        let b = SyntheticGenerator::with_seed(template(), 42).generate(10);
        assert_eq!(a, b);
    }

    #[test]
    fn test_unsupported_extension() {
        let err = LogLoader::new("traffic.parquet").load().unwrap_err();
        assert!(matches!(err, ShadowError::UnsupportedInputFormat(_)));
    }
}
