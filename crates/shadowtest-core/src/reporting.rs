//! Report artifacts for a finished batch.
//!
//! Two artifacts are written for each simulation:
//! - `report.html`: summary cards plus one row per verdict
//! - `regression_suite.json`: every mismatched request with its original
//!   input, the seed of the regression corpus
//!
//! The corpus can be folded across runs with [`merge_regression_corpus`],
//! which deduplicates on a SHA-256 digest of the canonical input.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::domain::{InputData, Verdict};
use crate::obs::emit_report_written;

pub const HTML_REPORT_FILE: &str = "report.html";
pub const REGRESSION_SUITE_FILE: &str = "regression_suite.json";

// ── summary ────────────────────────────────────────────────────────────────

/// Aggregate figures over a verdict list.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SimulationSummary {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    /// Mean `latency_delta_ms`; zero for an empty batch.
    pub avg_latency_delta_ms: f64,
}

impl SimulationSummary {
    pub fn from_verdicts(verdicts: &[Verdict]) -> Self {
        let total = verdicts.len();
        let passed = verdicts.iter().filter(|v| v.is_match).count();
        let avg_latency_delta_ms = if total == 0 {
            0.0
        } else {
            verdicts.iter().map(|v| v.latency_delta_ms).sum::<f64>() / total as f64
        };

        Self {
            total,
            passed,
            failed: total - passed,
            avg_latency_delta_ms,
        }
    }

    /// Share of matching verdicts (0.0–1.0); zero for an empty batch.
    pub fn match_rate(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.passed as f64 / self.total as f64
        }
    }
}

// ── report.html ────────────────────────────────────────────────────────────

const HTML_HEAD: &str = r#"<!DOCTYPE html>
<html>
<head>
    <title>Shadow Deployment Report</title>
    <style>
        body { font-family: sans-serif; padding: 20px; }
        .summary { display: flex; gap: 20px; margin-bottom: 20px; }
        .card { border: 1px solid #ddd; padding: 15px; border-radius: 5px; }
        table { width: 100%; border-collapse: collapse; }
        th, td { border: 1px solid #ddd; padding: 8px; text-align: left; }
        th { background-color: #f2f2f2; }
        .fail { background-color: #ffdddd; color: red; }
        .pass { background-color: #ddffdd; color: green; }
    </style>
</head>
<body>
    <h1>Shadow Test Results</h1>
"#;

/// Render the HTML report for `verdicts`.
pub fn render_html_report(verdicts: &[Verdict]) -> String {
    let summary = SimulationSummary::from_verdicts(verdicts);
    let mut html = String::from(HTML_HEAD);

    html.push_str("    <div class=\"summary\">\n");
    html.push_str(&format!(
        "        <div class=\"card\"><strong>Total Requests:</strong> {}</div>\n",
        summary.total
    ));
    html.push_str(&format!(
        "        <div class=\"card\"><strong>Passed:</strong> {}</div>\n",
        summary.passed
    ));
    html.push_str(&format!(
        "        <div class=\"card\"><strong>Failed:</strong> {}</div>\n",
        summary.failed
    ));
    html.push_str(&format!(
        "        <div class=\"card\"><strong>Avg Latency Impact:</strong> {:.2} ms</div>\n",
        summary.avg_latency_delta_ms
    ));
    html.push_str("    </div>\n\n");

    html.push_str("    <h2>Detailed Logs</h2>\n    <table>\n        <thead>\n            <tr>\n");
    for header in ["ID", "Status", "Primary Out", "Shadow Out", "Latency Delta"] {
        html.push_str(&format!("                <th>{header}</th>\n"));
    }
    html.push_str("            </tr>\n        </thead>\n        <tbody>\n");

    for v in verdicts {
        let (class, status) = if v.is_match {
            ("pass", "MATCH")
        } else {
            ("fail", "MISMATCH")
        };
        html.push_str(&format!("            <tr class=\"{class}\">\n"));
        html.push_str(&format!("                <td>{}</td>\n", escape_html(&v.request_id)));
        html.push_str(&format!("                <td>{status}</td>\n"));
        html.push_str(&format!(
            "                <td>{}</td>\n",
            escape_html(&display_value(&v.primary_out))
        ));
        html.push_str(&format!(
            "                <td>{}</td>\n",
            escape_html(&display_value(&v.shadow_out))
        ));
        html.push_str(&format!(
            "                <td>{:.2} ms</td>\n",
            v.latency_delta_ms
        ));
        html.push_str("            </tr>\n");
    }

    html.push_str("        </tbody>\n    </table>\n</body>\n</html>\n");
    html
}

/// Write `report.html` into `dir`, creating the directory if needed.
pub fn write_html_report(dir: &Path, verdicts: &[Verdict]) -> Result<PathBuf> {
    std::fs::create_dir_all(dir).with_context(|| format!("create {:?}", dir))?;
    let path = dir.join(HTML_REPORT_FILE);
    std::fs::write(&path, render_html_report(verdicts))
        .with_context(|| format!("write {:?}", path))?;
    emit_report_written("html", &path, verdicts.len());
    Ok(path)
}

fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

// ── regression_suite.json ──────────────────────────────────────────────────

/// One mismatched request, kept for future validation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RegressionCase {
    pub request_id: String,
    /// Original input; `None` when the id was not found in the input lookup.
    pub input: Option<InputData>,
    pub primary_out: Value,
    pub shadow_out: Value,
    /// Shadow error if any, else primary error.
    pub error: Option<String>,
}

/// Keep only mismatched verdicts, joined with their original inputs.
pub fn extract_regressions(
    verdicts: &[Verdict],
    inputs: &HashMap<String, InputData>,
) -> Vec<RegressionCase> {
    verdicts
        .iter()
        .filter(|v| !v.is_match)
        .map(|v| RegressionCase {
            request_id: v.request_id.clone(),
            input: inputs.get(&v.request_id).cloned(),
            primary_out: v.primary_out.clone(),
            shadow_out: v.shadow_out.clone(),
            error: v.first_error().map(str::to_string),
        })
        .collect()
}

/// Write `regression_suite.json` (pretty JSON array) into `dir`.
pub fn write_regression_suite(dir: &Path, cases: &[RegressionCase]) -> Result<PathBuf> {
    std::fs::create_dir_all(dir).with_context(|| format!("create {:?}", dir))?;
    let path = dir.join(REGRESSION_SUITE_FILE);
    let content = serde_json::to_string_pretty(cases).context("serialize regression suite")?;
    std::fs::write(&path, content).with_context(|| format!("write {:?}", path))?;
    emit_report_written("regression_suite", &path, cases.len());
    Ok(path)
}

/// Read a previously written regression suite.
pub fn load_regression_suite(path: &Path) -> Result<Vec<RegressionCase>> {
    let raw = std::fs::read_to_string(path).with_context(|| format!("read {:?}", path))?;
    serde_json::from_str(&raw).with_context(|| format!("parse {:?}", path))
}

/// SHA-256 hex digest of the canonical (key-sorted) JSON form of `input`.
pub fn input_digest(input: &InputData) -> String {
    // serde_json::Map is key-ordered, so serialization is canonical.
    let bytes = serde_json::to_vec(input).unwrap_or_default();
    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    hex::encode(hasher.finalize())
}

fn corpus_key(case: &RegressionCase) -> String {
    match &case.input {
        Some(input) => input_digest(input),
        None => format!("request:{}", case.request_id),
    }
}

/// Fold `incoming` into `existing`.
///
/// Cases with the same input collapse to one record; the incoming record
/// wins but keeps the position of the first occurrence. New inputs are
/// appended in order.
pub fn merge_regression_corpus(
    existing: Vec<RegressionCase>,
    incoming: Vec<RegressionCase>,
) -> Vec<RegressionCase> {
    let mut merged: Vec<RegressionCase> = Vec::with_capacity(existing.len() + incoming.len());
    let mut index: HashMap<String, usize> = HashMap::new();

    for case in existing.into_iter().chain(incoming) {
        let key = corpus_key(&case);
        match index.get(&key) {
            Some(&pos) => merged[pos] = case,
            None => {
                index.insert(key, merged.len());
                merged.push(case);
            }
        }
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn input(value: i64) -> InputData {
        json!({"value": value}).as_object().cloned().expect("object")
    }

    fn case(request_id: &str, value: i64, shadow_out: i64) -> RegressionCase {
        RegressionCase {
            request_id: request_id.to_string(),
            input: Some(input(value)),
            primary_out: json!(value * 2),
            shadow_out: json!(shadow_out),
            error: None,
        }
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(
            escape_html(r#"<a href="x">'&'</a>"#),
            "&lt;a href=&quot;x&quot;&gt;&#39;&amp;&#39;&lt;/a&gt;"
        );
    }

    #[test]
    fn test_display_value_unquotes_strings() {
        assert_eq!(display_value(&json!("a")), "a");
        assert_eq!(display_value(&json!(20)), "20");
        assert_eq!(display_value(&Value::Null), "null");
    }

    #[test]
    fn test_input_digest_ignores_key_order() {
        let a: InputData = serde_json::from_str(r#"{"a": 1, "b": 2}"#).expect("parse");
        let b: InputData = serde_json::from_str(r#"{"b": 2, "a": 1}"#).expect("parse");
        assert_eq!(input_digest(&a), input_digest(&b));
        assert_eq!(input_digest(&a).len(), 64);
    }

    #[test]
    fn test_merge_dedups_on_input_and_keeps_newest() {
        let existing = vec![case("req_1", 90, 181), case("req_2", 95, 191)];
        let incoming = vec![case("req_7", 90, 182), case("req_8", 99, 199)];

        let merged = merge_regression_corpus(existing, incoming);
        assert_eq!(merged.len(), 3);
        assert_eq!(merged[0].request_id, "req_7");
        assert_eq!(merged[0].shadow_out, json!(182));
        assert_eq!(merged[1].request_id, "req_2");
        assert_eq!(merged[2].request_id, "req_8");
    }

    #[test]
    fn test_merge_keeps_cases_without_input_apart() {
        let mut a = case("req_1", 1, 3);
        a.input = None;
        let mut b = case("req_2", 1, 3);
        b.input = None;
        let merged = merge_regression_corpus(vec![a], vec![b]);
        assert_eq!(merged.len(), 2);
    }
}
