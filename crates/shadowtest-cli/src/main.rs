//! Shadowtest CLI
//!
//! The `shadowtest` command drives shadow tests from the terminal.
//!
//! ## Commands
//!
//! - `simulate`: Run a batch of synthetic or recorded traffic and write reports
//! - `replay`: Re-run a stored regression suite against the current models
//! - `serve`: Start the HTTP service

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn, Level};

use shadowtest_core::{
    load_regression_suite, merge_regression_corpus, write_html_report, write_regression_suite,
    BatchItem, InputData, LogLoader, ShadowConfig, ShadowDispatcher,
    ShadowSimulation, SimulationSummary, SyntheticGenerator,
};

const DEFAULT_TEMPLATE: &str = r#"{"value": 50, "metadata": "test"}"#;
const DEFAULT_COUNT: usize = 100;

#[derive(Parser)]
#[command(name = "shadowtest")]
#[command(author = "Stevedores Org")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Shadow testing for model deployments", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    /// Path to a TOML config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Production model endpoint (overrides config; default is the mock model)
    #[arg(long, global = true)]
    primary_url: Option<String>,

    /// Candidate model endpoint (overrides config; default is the mock model)
    #[arg(long, global = true)]
    shadow_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a batch through both models and write report artifacts
    Simulate {
        /// Number of requests (synthetic) or maximum records read (--input)
        #[arg(short = 'n', long)]
        count: Option<usize>,

        /// Template record for synthetic traffic (JSON object)
        #[arg(long, default_value = DEFAULT_TEMPLATE)]
        template: String,

        /// Recorded traffic to replay instead of synthetic data (.csv or .json)
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Seed for reproducible synthetic traffic
        #[arg(long)]
        seed: Option<u64>,

        /// Requests in flight at once (overrides config)
        #[arg(long)]
        concurrency: Option<usize>,

        /// Directory for report.html and regression_suite.json (overrides config)
        #[arg(short, long)]
        output_dir: Option<PathBuf>,

        /// Fold new regressions into an existing regression_suite.json
        #[arg(long)]
        merge: bool,
    },

    /// Re-run every input of a regression suite
    Replay {
        /// Path to regression_suite.json
        #[arg(long)]
        suite: PathBuf,
    },

    /// Start the HTTP service
    Serve {
        /// Address to listen on (overrides config)
        #[arg(long)]
        bind: Option<String>,
    },
}

/// Options of one `simulate` invocation.
struct SimulateArgs {
    count: Option<usize>,
    template: String,
    input: Option<PathBuf>,
    seed: Option<u64>,
    merge: bool,
}

/// What a `simulate` run produced.
#[derive(Debug)]
struct SimulateReport {
    summary: SimulationSummary,
    regressions: usize,
    report_path: PathBuf,
    suite_path: PathBuf,
}

/// What a `replay` run produced.
#[derive(Debug, PartialEq)]
struct ReplayReport {
    replayed: usize,
    skipped: usize,
    still_failing: usize,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    shadowtest_core::init_tracing(cli.json, level);

    let mut config =
        ShadowConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;
    if cli.primary_url.is_some() {
        config.backends.primary_url = cli.primary_url;
    }
    if cli.shadow_url.is_some() {
        config.backends.shadow_url = cli.shadow_url;
    }
    config.validate().context("Invalid configuration")?;

    match cli.command {
        Commands::Simulate {
            count,
            template,
            input,
            seed,
            concurrency,
            output_dir,
            merge,
        } => {
            if let Some(c) = concurrency {
                config.simulation.concurrency = c.max(1);
            }
            if let Some(dir) = output_dir {
                config.simulation.output_dir = dir;
            }
            let args = SimulateArgs {
                count,
                template,
                input,
                seed,
                merge,
            };
            let report = cmd_simulate(&config, &args).await?;
            print_simulate_report(&report);
            Ok(())
        }
        Commands::Replay { suite } => {
            let report = cmd_replay(&config, &suite).await?;
            println!(
                "Replayed {} regression(s): {} still failing, {} fixed, {} skipped (no input)",
                report.replayed,
                report.still_failing,
                report.replayed - report.still_failing,
                report.skipped
            );
            Ok(())
        }
        Commands::Serve { bind } => {
            if let Some(bind) = bind {
                config.server.bind = bind;
            }
            cmd_serve(&config).await
        }
    }
}

/// Configured production and candidate models wired with the dispatch policy.
fn build_dispatcher(config: &ShadowConfig) -> ShadowDispatcher {
    ShadowDispatcher::from_config(
        config.backends.primary_backend(),
        config.backends.shadow_backend(),
        &config.dispatch,
    )
}

fn build_simulation(config: &ShadowConfig) -> ShadowSimulation {
    ShadowSimulation::new(
        Arc::new(build_dispatcher(config)),
        config.comparator.comparator(),
    )
    .with_concurrency(config.simulation.concurrency)
}

fn parse_template(raw: &str) -> Result<InputData> {
    let value: serde_json::Value =
        serde_json::from_str(raw).context("Template is not valid JSON")?;
    match value {
        serde_json::Value::Object(map) => Ok(map),
        other => anyhow::bail!("Template must be a JSON object, got {}", other),
    }
}

fn load_records(args: &SimulateArgs) -> Result<Vec<InputData>> {
    match &args.input {
        Some(path) => {
            let mut records = LogLoader::new(path)
                .load()
                .with_context(|| format!("Failed to load traffic from {:?}", path))?;
            if let Some(limit) = args.count {
                records.truncate(limit);
            }
            Ok(records)
        }
        None => {
            let template = parse_template(&args.template)?;
            let count = args.count.unwrap_or(DEFAULT_COUNT);
            let mut generator = match args.seed {
                Some(seed) => SyntheticGenerator::with_seed(template, seed),
                None => SyntheticGenerator::new(template),
            };
            Ok(generator.generate(count))
        }
    }
}

/// Run a batch and write its artifacts.
async fn cmd_simulate(config: &ShadowConfig, args: &SimulateArgs) -> Result<SimulateReport> {
    let records = load_records(args)?;
    info!(records = records.len(), "dispatching batch");

    let outcome = build_simulation(config).run_records(records).await;
    let output_dir = &config.simulation.output_dir;

    let report_path = write_html_report(output_dir, &outcome.verdicts)?;

    let mut regressions = outcome.regressions();
    let suite_file = output_dir.join(shadowtest_core::reporting::REGRESSION_SUITE_FILE);
    if args.merge && suite_file.exists() {
        let existing = load_regression_suite(&suite_file)?;
        let before = existing.len();
        regressions = merge_regression_corpus(existing, regressions);
        info!(before, after = regressions.len(), "merged regression corpus");
    }
    let suite_path = write_regression_suite(output_dir, &regressions)?;

    Ok(SimulateReport {
        summary: outcome.summary(),
        regressions: regressions.len(),
        report_path,
        suite_path,
    })
}

fn print_simulate_report(report: &SimulateReport) {
    let s = &report.summary;
    println!("Simulation complete. Failures: {}/{}", s.failed, s.total);
    println!("  Match rate:        {:.1}%", s.match_rate() * 100.0);
    println!("  Avg latency delta: {:.2} ms", s.avg_latency_delta_ms);
    println!("  Report:            {}", report.report_path.display());
    println!(
        "  Regression suite:  {} ({} case(s))",
        report.suite_path.display(),
        report.regressions
    );
}

/// Re-run stored regression inputs and count the ones that still mismatch.
async fn cmd_replay(config: &ShadowConfig, suite: &Path) -> Result<ReplayReport> {
    let cases = load_regression_suite(suite)?;

    let mut items = Vec::with_capacity(cases.len());
    let mut skipped = 0;
    for case in cases {
        match case.input {
            Some(input) => items.push(BatchItem::new(case.request_id, input)),
            None => {
                warn!(request_id = %case.request_id, "regression case has no input, skipping");
                skipped += 1;
            }
        }
    }

    let outcome = build_simulation(config).run(items).await;
    let summary = outcome.summary();

    Ok(ReplayReport {
        replayed: summary.total,
        skipped,
        still_failing: summary.failed,
    })
}

async fn cmd_serve(config: &ShadowConfig) -> Result<()> {
    let addr = config.bind_addr().context("Invalid bind address")?;
    let state = shadowtestd::AppState::new(
        build_dispatcher(config),
        config.comparator.comparator(),
    );
    shadowtestd::serve(addr, state).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn config_in(dir: &Path) -> ShadowConfig {
        let mut config = ShadowConfig::default();
        config.simulation.output_dir = dir.to_path_buf();
        config.simulation.concurrency = 4;
        config
    }

    fn synthetic(template: &str, count: usize, merge: bool) -> SimulateArgs {
        SimulateArgs {
            count: Some(count),
            template: template.to_string(),
            input: None,
            seed: Some(7),
            merge,
        }
    }

    #[test]
    fn test_cli_parses_simulate_flags() {
        let cli = Cli::try_parse_from([
            "shadowtest",
            "--json",
            "simulate",
            "-n",
            "20",
            "--seed",
            "3",
            "--merge",
        ])
        .unwrap();
        assert!(cli.json);
        match cli.command {
            Commands::Simulate {
                count,
                seed,
                merge,
                template,
                ..
            } => {
                assert_eq!(count, Some(20));
                assert_eq!(seed, Some(3));
                assert!(merge);
                assert_eq!(template, DEFAULT_TEMPLATE);
            }
            _ => panic!("expected simulate"),
        }
    }

    #[test]
    fn test_parse_template_requires_object() {
        assert_eq!(
            parse_template(r#"{"value": 1}"#).unwrap()["value"],
            json!(1)
        );
        assert!(parse_template("[1, 2]").is_err());
        assert!(parse_template("{nope").is_err());
    }

    #[test]
    fn test_synthetic_count_defaults_to_one_hundred() {
        let args = SimulateArgs {
            count: None,
            template: DEFAULT_TEMPLATE.to_string(),
            input: None,
            seed: Some(1),
            merge: false,
        };
        assert_eq!(load_records(&args).unwrap().len(), 100);
    }

    #[test]
    fn test_cli_backend_urls_select_remote_models() {
        let cli = Cli::try_parse_from([
            "shadowtest",
            "--shadow-url",
            "http://127.0.0.1:9001/predict",
            "serve",
        ])
        .unwrap();
        assert_eq!(cli.primary_url, None);

        let mut config = ShadowConfig::default();
        config.backends.shadow_url = cli.shadow_url;
        let dispatcher = build_dispatcher(&config);
        assert_eq!(dispatcher.primary_name(), "production_v1");
        assert_eq!(dispatcher.shadow_name(), "remote_shadow");
    }

    #[tokio::test(start_paused = true)]
    async fn test_simulate_below_threshold_writes_empty_suite() {
        let tmp = tempfile::tempdir().unwrap();
        let config = config_in(tmp.path());

        let report = cmd_simulate(&config, &synthetic(r#"{"value": 10}"#, 12, false))
            .await
            .unwrap();

        assert_eq!(report.summary.total, 12);
        assert_eq!(report.summary.failed, 0);
        assert_eq!(report.regressions, 0);
        assert!(report.report_path.exists());
        assert_eq!(load_regression_suite(&report.suite_path).unwrap().len(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_simulate_above_threshold_records_every_request() {
        let tmp = tempfile::tempdir().unwrap();
        let config = config_in(tmp.path());

        let report = cmd_simulate(&config, &synthetic(r#"{"value": 90}"#, 8, false))
            .await
            .unwrap();

        assert_eq!(report.summary.failed, 8);
        let suite = load_regression_suite(&report.suite_path).unwrap();
        assert_eq!(suite.len(), 8);
        assert!(suite.iter().all(|c| c.input.is_some()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_simulate_merge_dedups_identical_inputs() {
        let tmp = tempfile::tempdir().unwrap();
        let config = config_in(tmp.path());
        // Same seed, same inputs: the second run adds nothing new.
        let template = r#"{"value": 90, "metadata": "test"}"#;
        let first = cmd_simulate(&config, &synthetic(template, 5, true))
            .await
            .unwrap();
        let distinct: std::collections::HashSet<String> = load_regression_suite(&first.suite_path)
            .unwrap()
            .iter()
            .filter_map(|c| c.input.as_ref().map(shadowtest_core::input_digest))
            .collect();

        let second = cmd_simulate(&config, &synthetic(template, 5, true))
            .await
            .unwrap();

        assert_eq!(
            second.regressions,
            distinct.len(),
            "merging identical runs must not grow the corpus"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_simulate_from_recorded_traffic() {
        let tmp = tempfile::tempdir().unwrap();
        let traffic = tmp.path().join("traffic.csv");
        std::fs::write(&traffic, "value,metadata\n10,a\n90,b\n100,c\n").unwrap();
        let config = config_in(&tmp.path().join("out"));

        let args = SimulateArgs {
            count: None,
            template: DEFAULT_TEMPLATE.to_string(),
            input: Some(traffic),
            seed: None,
            merge: false,
        };
        let report = cmd_simulate(&config, &args).await.unwrap();
        assert_eq!(report.summary.total, 3);
        assert_eq!(report.summary.failed, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_replay_counts_still_failing_cases() {
        let tmp = tempfile::tempdir().unwrap();
        let suite_path = tmp.path().join("regression_suite.json");
        let suite = json!([
            {"request_id": "req_1", "input": {"value": 90}, "primary_out": 180, "shadow_out": 181, "error": null},
            {"request_id": "req_2", "input": {"value": 5}, "primary_out": 10, "shadow_out": 11, "error": null},
            {"request_id": "req_3", "input": null, "primary_out": 1, "shadow_out": 2, "error": null},
        ]);
        std::fs::write(&suite_path, serde_json::to_string(&suite).unwrap()).unwrap();

        let report = cmd_replay(&config_in(tmp.path()), &suite_path).await.unwrap();
        assert_eq!(
            report,
            ReplayReport {
                replayed: 2,
                skipped: 1,
                still_failing: 1,
            }
        );
    }
}
