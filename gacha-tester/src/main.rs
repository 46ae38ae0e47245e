mod common;
mod headless;
mod logic;
mod redeem;

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use std::fs::File;
use std::io::{BufWriter, Write, stdout};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Instant;
use thiserror::Error;

use common::scenario::catalog::catalog_keys;
use common::scenario::{get_scenario, list_scenarios};
use common::split_csv;
use gacha_engine::{ConfigError, ConfigLoader, GachaConfig, GachaEngine};
use logic::distribution::DEFAULT_TOLERANCE;
use logic::{
    DistributionReport, LogicTester, resolve_seed_inputs, run_distribution, validate_distribution,
};

#[derive(Debug, Parser)]
#[command(name = "gacha-tester", version = "0.1.0")]
#[command(
    about = "Headless QA for the gacha reveal engine: scripted sessions, roll distribution, and the redemption endpoint"
)]
struct Args {
    /// Scenarios to run (comma-separated, or "all")
    #[arg(long, default_value = "smoke")]
    scenarios: String,

    /// List all available scenarios and exit
    #[arg(long)]
    list_scenarios: bool,

    /// Seeds to run (comma-separated, decimal or 0x-hex)
    #[arg(long, default_value = "1337")]
    seeds: String,

    /// Number of iterations per scenario and seed
    #[arg(long, default_value_t = 3)]
    iterations: usize,

    /// Rolls sampled for the distribution check (0 skips it)
    #[arg(long, default_value_t = 100_000)]
    rolls: usize,

    /// Allowed absolute deviation from each tier's configured rate
    #[arg(long, default_value_t = DEFAULT_TOLERANCE)]
    tolerance: f64,

    /// Output report format
    #[arg(long, default_value = "console")]
    #[arg(value_parser = ["json", "markdown", "console"])]
    report: String,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Optional path to write the report output instead of stdout
    #[arg(long)]
    output: Option<PathBuf>,

    /// JSON configuration overriding the built-in defaults
    #[arg(long)]
    config: Option<PathBuf>,

    /// Run the redemption endpoint on this address instead of testing
    #[arg(long)]
    serve: Option<SocketAddr>,
}

#[derive(Debug, Error)]
enum FileConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Loads configuration from an optional JSON file, falling back to defaults.
#[derive(Debug, Clone, Default)]
struct FileConfig {
    path: Option<PathBuf>,
}

impl ConfigLoader for FileConfig {
    type Error = FileConfigError;

    fn load_config(&self) -> Result<GachaConfig, Self::Error> {
        let Some(path) = self.path.as_ref() else {
            return Ok(GachaConfig::default());
        };
        let raw = std::fs::read_to_string(path).map_err(|source| FileConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Ok(GachaConfig::from_json(&raw)?)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    if maybe_list_scenarios(&args)? {
        return Ok(());
    }

    if let Some(addr) = args.serve {
        return redeem::server::serve(addr).await;
    }

    announce_banner();

    let start_time = Instant::now();
    let engine = GachaEngine::new(FileConfig {
        path: args.config.clone(),
    });
    let config = engine.config().context("invalid configuration")?;
    let scenarios = expand_scenarios(&args.scenarios);
    let seeds = resolve_seed_inputs(&split_csv(&args.seeds))?;

    let results = run_logic_scenarios(&args, &config, &scenarios, &seeds).await;
    let distribution = gather_distribution(&args, &config, &seeds);

    write_reports(&args, &results, distribution.as_ref(), start_time)?;

    if let Some(report) = distribution.as_ref() {
        validate_distribution(report, args.tolerance)?;
    }

    if results.iter().any(|r| !r.passed) {
        std::process::exit(1);
    }

    Ok(())
}

fn maybe_list_scenarios(args: &Args) -> Result<bool> {
    if !args.list_scenarios {
        return Ok(false);
    }
    let mut output_target = OutputTarget::new(args.output.clone())?;
    writeln!(output_target.writer(), "Available scenarios:")?;
    for (key, description) in list_scenarios() {
        writeln!(output_target.writer(), "  {key:16} - {description}")?;
    }
    output_target.flush_inner()?;
    Ok(true)
}

fn announce_banner() {
    println!("{}", "🎰 Gacha Automated Tester".bright_cyan().bold());
    println!("{}", "=========================".cyan());
}

fn expand_scenarios(scenarios_arg: &str) -> Vec<String> {
    let mut scenarios = split_csv(scenarios_arg);
    if scenarios.iter().any(|s| s == "all") {
        scenarios.retain(|s| s != "all");
        for key in catalog_keys() {
            if !scenarios.iter().any(|s| s == key) {
                scenarios.push(key.to_string());
            }
        }
    }
    scenarios
}

async fn run_logic_scenarios(
    args: &Args,
    config: &GachaConfig,
    scenarios: &[String],
    seeds: &[u64],
) -> Vec<logic::ScenarioResult> {
    println!("{}", "🧠 Running Session Scenarios".bright_yellow().bold());
    println!("{}", "-".repeat(30).yellow());

    let tester = LogicTester::new(config.clone(), args.verbose);
    let mut results = Vec::new();

    for scenario_name in scenarios {
        if let Some(scenario) = get_scenario(scenario_name) {
            results.extend(tester.run_scenario(&scenario, seeds, args.iterations).await);
        } else {
            eprintln!("⚠️  Unknown scenario: {}", scenario_name.yellow());
        }
    }

    results
}

fn gather_distribution(
    args: &Args,
    config: &GachaConfig,
    seeds: &[u64],
) -> Option<DistributionReport> {
    if args.rolls == 0 {
        return None;
    }
    let seed = seeds.first().copied().unwrap_or_default();
    println!(
        "{}",
        format!("🎲 Sampling {} rolls (seed {seed})", args.rolls).bright_blue()
    );
    Some(run_distribution(&config.rolls, args.rolls, seed))
}

fn write_reports(
    args: &Args,
    results: &[logic::ScenarioResult],
    distribution: Option<&DistributionReport>,
    start_time: Instant,
) -> Result<()> {
    let mut output_target = OutputTarget::new(args.output.clone())?;

    match args.report.as_str() {
        "json" => {
            logic::reports::generate_json_report(&mut output_target, results, distribution)?;
        }
        "markdown" => {
            if results.is_empty() && distribution.is_none() {
                writeln!(
                    &mut output_target,
                    "# Gacha Logic Test Results\n\n_No scenarios executed._"
                )?;
            } else {
                logic::reports::generate_markdown_report(&mut output_target, results, distribution)?;
            }
        }
        _ => {
            let duration = start_time.elapsed();
            if results.is_empty() && distribution.is_none() {
                writeln!(&mut output_target, "No logic scenarios executed.")?;
            } else {
                logic::reports::generate_console_report(
                    &mut output_target,
                    results,
                    distribution,
                    duration,
                )?;
            }
            writeln!(&mut output_target)?;
            writeln!(&mut output_target, "🏁 Total time: {duration:?}")?;
        }
    }

    output_target.flush_inner()?;
    Ok(())
}

enum OutputTarget {
    Stdout(BufWriter<std::io::Stdout>),
    File(BufWriter<File>),
}

impl OutputTarget {
    fn new(path: Option<PathBuf>) -> Result<Self> {
        if let Some(path) = path {
            let file = File::create(&path)
                .with_context(|| format!("failed to create {}", path.display()))?;
            Ok(Self::File(BufWriter::new(file)))
        } else {
            Ok(Self::Stdout(BufWriter::new(stdout())))
        }
    }

    fn writer(&mut self) -> &mut dyn Write {
        match self {
            Self::Stdout(w) => w,
            Self::File(w) => w,
        }
    }

    fn flush_inner(&mut self) -> std::io::Result<()> {
        match self {
            Self::Stdout(w) => w.flush(),
            Self::File(w) => w.flush(),
        }
    }
}

impl Write for OutputTarget {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.writer().write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.flush_inner()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::ScenarioResult;
    use std::time::Duration;

    fn base_args() -> Args {
        Args {
            scenarios: "smoke".to_string(),
            list_scenarios: false,
            seeds: "1337".to_string(),
            iterations: 1,
            rolls: 0,
            tolerance: DEFAULT_TOLERANCE,
            report: "json".to_string(),
            verbose: false,
            output: None,
            config: None,
            serve: None,
        }
    }

    fn temp_path(label: &str) -> PathBuf {
        std::env::temp_dir().join(format!("gacha-main-{label}-{}", std::process::id()))
    }

    fn sample_result(passed: bool) -> ScenarioResult {
        ScenarioResult {
            scenario_name: "Smoke Test".to_string(),
            seed: 1337,
            passed,
            iterations_run: 3,
            successful_iterations: if passed { 3 } else { 2 },
            failures: if passed {
                Vec::new()
            } else {
                vec!["failure".to_string()]
            },
            average_duration: Duration::from_millis(10),
            performance_data: vec![Duration::from_millis(10)],
        }
    }

    #[test]
    fn expands_all_scenarios_keyword() {
        let expanded = expand_scenarios("smoke,all");
        assert_eq!(expanded.first().map(String::as_str), Some("smoke"));
        assert_eq!(expanded.iter().filter(|s| *s == "smoke").count(), 1);
        assert!(expanded.contains(&"clamp-guard".to_string()));
        assert_eq!(expanded.len(), catalog_keys().len());
    }

    #[test]
    fn expand_scenarios_without_all_preserves_order() {
        let expanded = expand_scenarios("replay,smoke");
        assert_eq!(expanded, vec!["replay".to_string(), "smoke".to_string()]);
    }

    #[test]
    fn file_config_defaults_without_path() {
        let engine = GachaEngine::new(FileConfig::default());
        assert_eq!(engine.config().unwrap(), GachaConfig::default());
    }

    #[test]
    fn file_config_reads_overrides() {
        let path = temp_path("config.json");
        std::fs::write(&path, r#"{"timing":{"preload_warmup_ms":250}}"#).unwrap();
        let engine = GachaEngine::new(FileConfig { path: Some(path) });
        assert_eq!(engine.config().unwrap().timing.preload_warmup_ms, 250);
    }

    #[test]
    fn file_config_reports_missing_file() {
        let engine = GachaEngine::new(FileConfig {
            path: Some(temp_path("missing.json")),
        });
        let err = engine.config().unwrap_err();
        assert!(matches!(err, FileConfigError::Io { .. }));
    }

    #[test]
    fn file_config_rejects_invalid_values() {
        let path = temp_path("bad.json");
        std::fs::write(&path, r#"{"audio":{"action_volume":-1.0}}"#).unwrap();
        let engine = GachaEngine::new(FileConfig { path: Some(path) });
        let err = engine.config().unwrap_err();
        assert!(matches!(err, FileConfigError::Config(ConfigError::Volume { .. })));
    }

    #[test]
    fn gather_distribution_skips_when_rolls_is_zero() {
        let args = base_args();
        assert!(gather_distribution(&args, &GachaConfig::default(), &[1]).is_none());
    }

    #[test]
    fn gather_distribution_uses_first_seed() {
        let args = Args {
            rolls: 2_000,
            ..base_args()
        };
        let report = gather_distribution(&args, &GachaConfig::default(), &[42, 7]).unwrap();
        assert_eq!(report.seed, 42);
        assert_eq!(report.rolls, 2_000);
    }

    #[test]
    fn run_logic_scenarios_skips_unknown_names() {
        let args = base_args();
        let results = tokio_test::block_on(run_logic_scenarios(
            &args,
            &GachaConfig::default(),
            &["definitely-not-a-scenario".to_string()],
            &[1],
        ));
        assert!(results.is_empty());
    }

    #[test]
    fn maybe_list_scenarios_writes_output() {
        let temp = temp_path("scenarios.txt");
        let args = Args {
            list_scenarios: true,
            output: Some(temp.clone()),
            ..base_args()
        };
        assert!(maybe_list_scenarios(&args).unwrap());
        let content = std::fs::read_to_string(temp).unwrap();
        assert!(content.contains("Available scenarios"));
        assert!(content.contains("redeem-offline"));
    }

    #[test]
    fn maybe_list_scenarios_returns_false_when_disabled() {
        let args = base_args();
        assert!(!maybe_list_scenarios(&args).unwrap());
    }

    #[test]
    fn write_reports_emits_json_for_results() {
        let temp = temp_path("report.json");
        let args = Args {
            output: Some(temp.clone()),
            ..base_args()
        };
        write_reports(&args, &[sample_result(true)], None, Instant::now()).unwrap();
        let content = std::fs::read_to_string(temp).unwrap();
        let value: serde_json::Value = serde_json::from_str(&content).unwrap();
        assert_eq!(value["scenarios"][0]["scenario_name"], "Smoke Test");
    }

    #[test]
    fn write_reports_markdown_empty_results() {
        let temp = temp_path("empty.md");
        let args = Args {
            report: "markdown".to_string(),
            output: Some(temp.clone()),
            ..base_args()
        };
        write_reports(&args, &[], None, Instant::now()).unwrap();
        let content = std::fs::read_to_string(temp).unwrap();
        assert!(content.contains("No scenarios executed"));
    }

    #[test]
    fn write_reports_console_includes_total_time() {
        let temp = temp_path("console.txt");
        let args = Args {
            report: "console".to_string(),
            output: Some(temp.clone()),
            ..base_args()
        };
        write_reports(&args, &[sample_result(false)], None, Instant::now()).unwrap();
        let content = std::fs::read_to_string(temp).unwrap();
        assert!(content.contains("Total time"));
    }

    #[test]
    fn output_target_stdout_writes() {
        let mut target = OutputTarget::new(None).unwrap();
        target.write_all(b"ok").unwrap();
        target.flush().unwrap();
    }
}
