//! Command-line behaviour that needs no cloud access.

use std::process::{Command, Output};

fn shipyard(args: &[&str], env: &[(&str, &str)]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_shipyard"))
        .env_clear()
        .envs(env.iter().copied())
        .args(args)
        .output()
        .expect("run shipyard")
}

#[test]
fn oversized_zip_fails_before_any_call() {
    let dir = tempfile::tempdir().unwrap();
    let zip = dir.path().join("big.zip");
    let file = std::fs::File::create(&zip).unwrap();
    file.set_len(20 * 1024 * 1024 + 1).unwrap();

    let output = shipyard(&["publish", "zip", zip.to_str().unwrap()], &[]);

    assert_eq!(output.status.code(), Some(1));
    assert!(output.stdout.is_empty());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("exceeding"), "stderr={stderr}");
}

#[test]
fn config_merges_file_and_environment() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("shipyard.toml");
    std::fs::write(
        &path,
        "[function]\nregion = \"ap-guangzhou\"\nname = \"from-file\"\n\n[poll]\ninterval = \"2s\"\n",
    )
    .unwrap();

    let output = shipyard(
        &["--config", path.to_str().unwrap(), "config"],
        &[("SCF_FUNCTION", "from-env")],
    );

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("name = \"from-env\""), "stdout={stdout}");
    assert!(stdout.contains("region = \"ap-guangzhou\""), "stdout={stdout}");
    assert!(stdout.contains("interval = \"2s\""), "stdout={stdout}");
}

#[test]
fn deploy_without_revision_fails() {
    let output = shipyard(
        &["deploy"],
        &[("SCF_REGION", "ap-guangzhou"), ("SCF_FUNCTION", "api")],
    );
    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("SCF_DEPLOY_VERSION"), "stderr={stderr}");
}

#[test]
fn missing_credentials_are_reported() {
    let output = shipyard(
        &["cleanup", "3"],
        &[("SCF_REGION", "ap-guangzhou"), ("SCF_FUNCTION", "api")],
    );
    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("TENCENT_CLOUD_SECRET_ID"), "stderr={stderr}");
}

#[test]
fn missing_function_is_reported() {
    let output = shipyard(&["cleanup", "3"], &[]);
    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("SCF_REGION"), "stderr={stderr}");
}

#[test]
fn unsupported_upstream_type_is_rejected_by_parser() {
    let output = shipyard(
        &["gateway", "tse", "--name", "web", "--type", "Mesh"],
        &[],
    );
    assert_eq!(output.status.code(), Some(2));
}
