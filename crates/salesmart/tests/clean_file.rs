use std::path::{Path, PathBuf};
use std::process::Command;

fn fixture(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("../salesmart-sources/tests/data")
        .join(name)
}

fn scratch_path(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("salesmart-cli-{}", std::process::id()));
    std::fs::create_dir_all(&dir).expect("create scratch dir");
    dir.join(name)
}

#[test]
fn clean_file_writes_csv_and_prints_report() {
    let output = scratch_path("cards.csv");
    let result = Command::new(env!("CARGO_BIN_EXE_salesmart"))
        .env_remove("RUST_LOG")
        .args(["clean-file", "--entity", "cards", "--skip-rows", "1", "--drop-leading-index"])
        .arg("--input")
        .arg(fixture("card_details.csv"))
        .arg("--output")
        .arg(&output)
        .output()
        .expect("run salesmart");

    assert!(
        result.status.success(),
        "clean-file failed: {}",
        String::from_utf8_lossy(&result.stderr)
    );

    let report: serde_json::Value =
        serde_json::from_slice(&result.stdout).expect("report is JSON");
    assert_eq!(report["entity"], "cards");
    assert_eq!(report["rows_out"], 10);

    let written = std::fs::read_to_string(&output).expect("output written");
    let mut lines = written.lines();
    assert_eq!(
        lines.next(),
        Some("card_number,expiry_date,card_provider,date_payment_confirmed")
    );
    assert_eq!(lines.count(), 10);
}

#[test]
fn clean_file_rejects_unknown_entity() {
    let result = Command::new(env!("CARGO_BIN_EXE_salesmart"))
        .env_remove("RUST_LOG")
        .args(["clean-file", "--entity", "customers"])
        .arg("--input")
        .arg(fixture("products.csv"))
        .arg("--output")
        .arg(scratch_path("customers.csv"))
        .output()
        .expect("run salesmart");

    assert!(!result.status.success());
    assert!(String::from_utf8_lossy(&result.stderr).contains("unknown entity"));
}
