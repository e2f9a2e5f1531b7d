//! Integration tests for CLI commands.

use std::fs;
use std::process::Command;

use tempfile::TempDir;

fn run_cli(args: &[&str]) -> (bool, String, String) {
    let output = Command::new("cargo")
        .args(["run", "--bin", "strata", "--"])
        .args(args)
        .output()
        .expect("Failed to execute CLI");

    let stdout = String::from_utf8(output.stdout).unwrap();
    let stderr = String::from_utf8(output.stderr).unwrap();
    let success = output.status.success();

    (success, stdout, stderr)
}

fn write_file(dir: &TempDir, name: &str, contents: &str) -> String {
    let path = dir.path().join(name);
    fs::write(&path, contents).unwrap();
    path.to_string_lossy().to_string()
}

#[test]
fn test_canonicalize_sorts_keys() {
    let temp = TempDir::new().unwrap();
    let input = write_file(&temp, "doc.json", r#"{"b": 1, "a": {"z": 2, "y": 3}}"#);

    let (success, stdout, _) = run_cli(&["canonicalize", &input]);
    assert!(success);
    assert_eq!(stdout.trim(), r#"{"a":{"y":3,"z":2},"b":1}"#);
}

#[test]
fn test_canonicalize_with_spill_dir() {
    let temp = TempDir::new().unwrap();
    let input = write_file(&temp, "doc.json", r#"{"b":1,"a":2}"#);
    let spill = temp.path().join("spill");

    let (success, stdout, _) = run_cli(&[
        "canonicalize",
        &input,
        "--temp-dir",
        &spill.to_string_lossy(),
        "--max-in-memory",
        "0",
    ]);
    assert!(success);
    assert_eq!(stdout.trim(), r#"{"a":2,"b":1}"#);
}

#[test]
fn test_canonicalize_rejects_malformed_input() {
    let temp = TempDir::new().unwrap();
    let input = write_file(&temp, "doc.json", "{ not json }");

    let (success, _, stderr) = run_cli(&["canonicalize", &input]);
    assert!(!success);
    assert!(stderr.contains("Error"));
}

#[test]
fn test_check_reports_canonical_state() {
    let temp = TempDir::new().unwrap();
    let sorted = write_file(&temp, "sorted.json", r#"{"a":1,"b":2}"#);
    let unsorted = write_file(&temp, "unsorted.json", r#"{"b":2,"a":1}"#);

    let (success, stdout, _) = run_cli(&["check", &sorted, "--json"]);
    assert!(success);
    let parsed: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(parsed["already_canonical"], true);

    let (success, stdout, _) = run_cli(&["check", &unsorted, "--json"]);
    assert!(success);
    let parsed: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(parsed["already_canonical"], false);
}

#[test]
fn test_digest_is_stable_across_formatting() {
    let temp = TempDir::new().unwrap();
    let a = write_file(&temp, "a.json", r#"{"x": 1, "y": 2}"#);
    let b = write_file(&temp, "b.json", "{\"y\":2,\n  \"x\":1}");

    let (success, out_a, _) = run_cli(&["digest", &a]);
    assert!(success);
    let (success, out_b, _) = run_cli(&["digest", &b]);
    assert!(success);
    assert_eq!(out_a, out_b);

    let parsed: serde_json::Value = serde_json::from_str(&out_a).unwrap();
    assert_eq!(parsed["alg"], "sha-256");
}

#[test]
fn test_extract_command() {
    let temp = TempDir::new().unwrap();
    let input = write_file(
        &temp,
        "doc.json",
        r#"{"name":"g1","big":{"x":[1,2,3]},"stats":{"gc":0.5}}"#,
    );
    let selection = write_file(&temp, "sel.json", r#"{"fields":{"name":{}}}"#);
    let metadata = write_file(&temp, "meta.json", r#"{"GC":"stats.gc"}"#);

    let (success, stdout, _) = run_cli(&[
        "extract",
        &input,
        "--selection",
        &selection,
        "--metadata",
        &metadata,
    ]);
    assert!(success);
    let parsed: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(parsed["subset"], serde_json::json!({"name":"g1"}));
    assert_eq!(parsed["metadata"]["GC"], "0.5");
}

#[test]
fn test_extract_enforces_max_bytes() {
    let temp = TempDir::new().unwrap();
    let input = write_file(&temp, "doc.json", r#"{"a":"0123456789012345678901234567890"}"#);
    let selection = write_file(&temp, "sel.json", r#"{"fields":{"a":{}}}"#);

    let (success, _, stderr) = run_cli(&[
        "extract",
        &input,
        "--selection",
        &selection,
        "--max-bytes",
        "10",
    ]);
    assert!(!success);
    assert!(stderr.contains("byte limit"));
}

#[test]
fn test_relabel_command() {
    let temp = TempDir::new().unwrap();
    let input = write_file(&temp, "doc.json", r#"{"ref":"rec-1"}"#);
    let refs = write_file(&temp, "refs.json", r#"[{"path":["ref"],"id":"rec-1"}]"#);
    let mapping = write_file(&temp, "map.json", r#"{"rec-1":"ws/42/3"}"#);

    let (success, stdout, _) = run_cli(&[
        "relabel",
        &input,
        "--refs",
        &refs,
        "--mapping",
        &mapping,
    ]);
    assert!(success);
    let parsed: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(parsed["ref"], "ws/42/3");
}
