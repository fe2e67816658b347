//! Integration tests for the regcache binary
//!
//! Runs the built binary against a mock registry and checks argument
//! handling, output, and the persisted cache between runs.

use mockito::{Matcher, Server};
use std::process::Command;
use tempfile::TempDir;

/// Helper to run the CLI with given args and capture output
fn run_cli(args: &[&str]) -> std::process::Output {
    Command::new(env!("CARGO_BIN_EXE_regcache"))
        .args(args)
        .env_remove("RUST_LOG")
        .output()
        .expect("Failed to execute regcache")
}

fn stdout_json(output: &std::process::Output) -> serde_json::Value {
    let stdout = String::from_utf8_lossy(&output.stdout);
    serde_json::from_str(&stdout).expect("stdout should be a JSON document")
}

#[test]
fn test_help_flag_exits_successfully() {
    let output = run_cli(&["--help"]);
    assert!(
        output.status.success(),
        "Expected --help to exit successfully"
    );
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("regcache"), "Help should mention regcache");
    assert!(stdout.contains("--fields"), "Help should mention --fields flag");
    assert!(stdout.contains("--ttl-secs"), "Help should mention --ttl-secs flag");
}

#[test]
fn test_invalid_fields_prints_error_and_exits() {
    let output = run_cli(&["--fields", "name,,version"]);
    assert!(!output.status.success(), "Expected blank field to fail");
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("Invalid field list"),
        "Should print error message about the field list: {}",
        stderr
    );
}

#[test]
fn test_unknown_flag_is_rejected() {
    let output = run_cli(&["--bogus"]);
    assert!(!output.status.success());
}

#[test]
fn test_prints_package_names_then_revalidates_with_etag() {
    let mut server = Server::new();
    let cache_dir = TempDir::new().unwrap();
    let url = format!("{}/-/all", server.url());
    let cache_dir_arg = cache_dir.path().to_str().unwrap();

    let fetch = server
        .mock("GET", "/-/all")
        .match_header("if-none-match", Matcher::Missing)
        .with_status(200)
        .with_header("etag", "myEtag")
        .with_body(r#"{"a": {}, "b": {}, "c": {}}"#)
        .create();

    let output = run_cli(&["--registry-url", &url, "--cache-dir", cache_dir_arg]);
    assert!(output.status.success(), "first run failed: {:?}", output);
    assert_eq!(stdout_json(&output), serde_json::json!(["a", "b", "c"]));
    fetch.assert();

    // A forced second run sends the stored etag and is served from disk
    let revalidate = server
        .mock("GET", "/-/all")
        .match_header("if-none-match", "myEtag")
        .with_status(304)
        .create();

    let output = run_cli(&[
        "--registry-url",
        &url,
        "--cache-dir",
        cache_dir_arg,
        "--force",
    ]);
    assert!(output.status.success(), "second run failed: {:?}", output);
    assert_eq!(stdout_json(&output), serde_json::json!(["a", "b", "c"]));
    revalidate.assert();
}

#[test]
fn test_fresh_cache_skips_the_registry() {
    let mut server = Server::new();
    let cache_dir = TempDir::new().unwrap();
    let url = format!("{}/-/all", server.url());
    let cache_dir_arg = cache_dir.path().to_str().unwrap();

    let listing = server
        .mock("GET", "/-/all")
        .with_status(200)
        .with_body(r#"{"q": {"name": "q", "version": "1.4.1", "license": "MIT"}}"#)
        .expect(1)
        .create();

    for _ in 0..2 {
        let output = run_cli(&[
            "--registry-url",
            &url,
            "--cache-dir",
            cache_dir_arg,
            "--fields",
            "name,version",
        ]);
        assert!(output.status.success(), "run failed: {:?}", output);
        assert_eq!(
            stdout_json(&output),
            serde_json::json!([{"name": "q", "version": "1.4.1"}])
        );
    }

    listing.assert();
}

#[test]
fn test_unreachable_registry_prints_empty_list() {
    let cache_dir = TempDir::new().unwrap();
    let output = run_cli(&[
        "--registry-url",
        "http://127.0.0.1:1/-/all",
        "--cache-dir",
        cache_dir.path().to_str().unwrap(),
    ]);
    assert!(output.status.success(), "cold start must not fail: {:?}", output);
    assert_eq!(stdout_json(&output), serde_json::json!([]));
}
