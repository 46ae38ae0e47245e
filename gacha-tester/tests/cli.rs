use std::process::Command;

fn temp_path(label: &str) -> std::path::PathBuf {
    std::env::temp_dir().join(format!(
        "gacha-cli-{label}-{}",
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos()
    ))
}

#[test]
fn cli_list_scenarios_writes_output() {
    let exe = env!("CARGO_BIN_EXE_gacha-tester");
    let output_path = temp_path("list");
    let status = Command::new(exe)
        .args(["--list-scenarios", "--output"])
        .arg(&output_path)
        .status()
        .expect("run cli");
    assert!(status.success());
    let content = std::fs::read_to_string(output_path).expect("read output");
    assert!(content.contains("Available scenarios"));
    assert!(content.contains("full-reveal"));
}

#[test]
fn cli_runs_smoke_with_json_report() {
    let exe = env!("CARGO_BIN_EXE_gacha-tester");
    let output_path = temp_path("run");
    let output = Command::new(exe)
        .args([
            "--report",
            "json",
            "--scenarios",
            "smoke,full-reveal",
            "--iterations",
            "1",
            "--seeds",
            "1",
            "--rolls",
            "20000",
            "--tolerance",
            "0.03",
            "--output",
        ])
        .arg(&output_path)
        .output()
        .expect("run cli");
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(output.status.success(), "cli failed: {stdout}");
    assert!(stdout.contains("Gacha Automated Tester"));

    let content = std::fs::read_to_string(output_path).expect("read output");
    let report: serde_json::Value = serde_json::from_str(&content).expect("json report");
    let scenarios = report["scenarios"].as_array().expect("scenario list");
    assert_eq!(scenarios.len(), 2);
    assert!(scenarios.iter().all(|s| s["passed"] == true));
    assert_eq!(report["distribution"]["rolls"], 20000);
}

#[test]
fn cli_rejects_invalid_config_file() {
    let exe = env!("CARGO_BIN_EXE_gacha-tester");
    let config_path = temp_path("config.json");
    std::fs::write(&config_path, r#"{"rolls":{"rare_below":5.0}}"#).expect("write config");
    let output = Command::new(exe)
        .args(["--rolls", "0", "--config"])
        .arg(&config_path)
        .output()
        .expect("run cli");
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("invalid configuration"), "stderr: {stderr}");
}
