use anyhow::Result;
use colored::Colorize;
use serde::Serialize;
use std::io::Write;
use std::time::Duration;

use gacha_engine::numbers::ratio;

use super::ScenarioResult;
use super::distribution::DistributionReport;

#[derive(Serialize)]
struct JsonReport<'a> {
    scenarios: &'a [ScenarioResult],
    #[serde(skip_serializing_if = "Option::is_none")]
    distribution: Option<&'a DistributionReport>,
}

fn success_rate(results: &[ScenarioResult]) -> f64 {
    let passed = results.iter().filter(|r| r.passed).count();
    ratio(passed, results.len()) * 100.0
}

pub fn generate_console_report(
    writer: &mut dyn Write,
    results: &[ScenarioResult],
    distribution: Option<&DistributionReport>,
    total_duration: Duration,
) -> Result<()> {
    writeln!(writer)?;
    writeln!(writer, "{}", "📊 Logic Test Results Summary".bright_cyan().bold())?;
    writeln!(writer, "{}", "==============================".cyan())?;

    let total_tests = results.len();
    let passed_tests = results.iter().filter(|r| r.passed).count();
    let failed_tests = total_tests - passed_tests;

    writeln!(writer, "Total scenarios: {total_tests}")?;
    writeln!(writer, "Passed: {}", passed_tests.to_string().green())?;
    writeln!(writer, "Failed: {}", failed_tests.to_string().red())?;
    writeln!(writer, "Success rate: {:.1}%", success_rate(results))?;
    writeln!(writer, "Total time: {total_duration:?}")?;
    writeln!(writer)?;

    for result in results {
        let status = if result.passed {
            "✅ PASS".green()
        } else {
            "❌ FAIL".red()
        };

        writeln!(
            writer,
            "{} {} (seed {})",
            status,
            result.scenario_name.bold(),
            result.seed
        )?;
        writeln!(
            writer,
            "   Iterations: {}/{} successful",
            result.successful_iterations, result.iterations_run
        )?;
        writeln!(writer, "   Average time: {:?}", result.average_duration)?;

        if !result.failures.is_empty() {
            writeln!(writer, "   Failures:")?;
            for failure in &result.failures {
                writeln!(writer, "     • {}", failure.red())?;
            }
        }
        writeln!(writer)?;
    }

    if let Some(report) = distribution {
        write_distribution_console(writer, report)?;
    }

    let fastest = results.iter().min_by_key(|r| r.average_duration);
    let slowest = results.iter().max_by_key(|r| r.average_duration);
    if let (Some(fastest), Some(slowest)) = (fastest, slowest) {
        writeln!(writer, "{}", "⚡ Performance Summary".bright_yellow().bold())?;
        writeln!(writer, "{}", "=====================".yellow())?;
        writeln!(
            writer,
            "Fastest: {} ({:?})",
            fastest.scenario_name.green(),
            fastest.average_duration
        )?;
        writeln!(
            writer,
            "Slowest: {} ({:?})",
            slowest.scenario_name.yellow(),
            slowest.average_duration
        )?;
    }
    Ok(())
}

fn write_distribution_console(writer: &mut dyn Write, report: &DistributionReport) -> Result<()> {
    writeln!(writer, "{}", "🎰 Roll Distribution".bright_magenta().bold())?;
    writeln!(writer, "{}", "====================".magenta())?;
    writeln!(writer, "Rolls: {} (seed {})", report.rolls, report.seed)?;
    for stats in &report.tiers {
        writeln!(
            writer,
            "  {:>3}  {:>7} rolls  observed {:>6.2}%  expected {:>6.2}%  payouts {}..={} (range {}..={})",
            stats.tier.to_string(),
            stats.count,
            stats.observed * 100.0,
            stats.expected * 100.0,
            stats.min_payout.unwrap_or(0),
            stats.max_payout.unwrap_or(0),
            stats.range.min,
            stats.range.max
        )?;
    }
    writeln!(writer, "Mean payout: {:.3}", report.mean_payout)?;
    writeln!(writer)?;
    Ok(())
}

pub fn generate_json_report(
    writer: &mut dyn Write,
    results: &[ScenarioResult],
    distribution: Option<&DistributionReport>,
) -> Result<()> {
    let report = JsonReport {
        scenarios: results,
        distribution,
    };
    let json_output = serde_json::to_string_pretty(&report)?;
    writeln!(writer, "{json_output}")?;
    Ok(())
}

pub fn generate_markdown_report(
    writer: &mut dyn Write,
    results: &[ScenarioResult],
    distribution: Option<&DistributionReport>,
) -> Result<()> {
    writeln!(writer, "# Gacha Logic Test Results\n")?;

    let total_tests = results.len();
    let passed_tests = results.iter().filter(|r| r.passed).count();
    let failed_tests = total_tests - passed_tests;

    writeln!(writer, "## Summary\n")?;
    writeln!(writer, "- **Total scenarios**: {total_tests}")?;
    writeln!(writer, "- **Passed**: {passed_tests}")?;
    writeln!(writer, "- **Failed**: {failed_tests}")?;
    writeln!(writer, "- **Success rate**: {:.1}%\n", success_rate(results))?;

    writeln!(writer, "## Detailed Results\n")?;
    for result in results {
        let status = if result.passed { "✅" } else { "❌" };

        writeln!(writer, "### {} {} (seed {})\n", status, result.scenario_name, result.seed)?;
        writeln!(
            writer,
            "- **Iterations**: {}/{} successful",
            result.successful_iterations, result.iterations_run
        )?;
        writeln!(writer, "- **Average time**: {:?}", result.average_duration)?;

        if !result.failures.is_empty() {
            writeln!(writer, "- **Failures**:")?;
            for failure in &result.failures {
                writeln!(writer, "  - {failure}")?;
            }
        }
        writeln!(writer)?;
    }

    if let Some(report) = distribution {
        writeln!(writer, "## Roll Distribution\n")?;
        writeln!(writer, "{} rolls, seed {}\n", report.rolls, report.seed)?;
        writeln!(writer, "| Tier | Count | Observed | Expected | Payouts |")?;
        writeln!(writer, "|------|-------|----------|----------|---------|")?;
        for stats in &report.tiers {
            writeln!(
                writer,
                "| {} | {} | {:.2}% | {:.2}% | {}..={} |",
                stats.tier,
                stats.count,
                stats.observed * 100.0,
                stats.expected * 100.0,
                stats.min_payout.unwrap_or(0),
                stats.max_payout.unwrap_or(0)
            )?;
        }
        writeln!(writer)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::distribution::run_distribution;
    use gacha_engine::RollTable;

    fn result(passed: bool) -> ScenarioResult {
        ScenarioResult {
            scenario_name: "Full Reveal".to_string(),
            seed: 9,
            passed,
            iterations_run: 2,
            successful_iterations: if passed { 2 } else { 1 },
            failures: if passed {
                Vec::new()
            } else {
                vec!["cursor stuck".to_string()]
            },
            average_duration: Duration::from_millis(4),
            performance_data: vec![Duration::from_millis(4)],
        }
    }

    fn render(f: impl FnOnce(&mut Vec<u8>) -> Result<()>) -> String {
        let mut buffer = Vec::new();
        f(&mut buffer).unwrap();
        String::from_utf8(buffer).unwrap()
    }

    #[test]
    fn console_report_lists_failures_and_distribution() {
        let report = run_distribution(&RollTable::default(), 500, 1);
        let text = render(|out| {
            generate_console_report(out, &[result(false)], Some(&report), Duration::ZERO)
        });
        assert!(text.contains("cursor stuck"));
        assert!(text.contains("Roll Distribution"));
        assert!(text.contains("Success rate: 0.0%"));
    }

    #[test]
    fn json_report_nests_scenarios() {
        let text = render(|out| generate_json_report(out, &[result(true)], None));
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["scenarios"][0]["scenario_name"], "Full Reveal");
        assert!(value.get("distribution").is_none());
    }

    #[test]
    fn markdown_report_has_table() {
        let report = run_distribution(&RollTable::default(), 100, 2);
        let text =
            render(|out| generate_markdown_report(out, &[result(true)], Some(&report)));
        assert!(text.starts_with("# Gacha Logic Test Results"));
        assert!(text.contains("| Tier | Count |"));
    }
}
