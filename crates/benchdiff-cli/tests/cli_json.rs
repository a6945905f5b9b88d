//! Integration tests for the `benchdiff` binary.

use serial_test::serial;
use std::fs;
use std::path::Path;
use std::process::{Command, Output};
use tempfile::tempdir;

fn benchdiff(cwd: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_benchdiff"))
        .arg("--cwd")
        .arg(cwd)
        .args(args)
        .env_remove("RUST_LOG")
        .env_remove("BENCHDIFF_CONFIG")
        .output()
        .expect("Failed to run benchdiff")
}

fn stdout_json(output: &Output) -> serde_json::Value {
    let stdout = String::from_utf8_lossy(&output.stdout);
    serde_json::from_str(&stdout).unwrap_or_else(|e| {
        panic!(
            "stdout should be valid JSON ({e}): {stdout}\nstderr: {}",
            String::from_utf8_lossy(&output.stderr)
        )
    })
}

fn write_codebase(root: &Path) {
    fs::create_dir_all(root.join("calc")).unwrap();
    fs::write(
        root.join("calc/calc_test.go"),
        r#"package calc

import "testing"

// BenchmarkAdd measures Add.
func BenchmarkAdd(b *testing.B) {
	for i := 0; i < b.N; i++ {
		Add(1, 2)
	}
}

func TestAdd(t *testing.T) {}
"#,
    )
    .unwrap();
}

fn write_report(path: &Path, results: &serde_json::Value) {
    write_grouped_report(path, "package", results);
}

fn write_grouped_report(path: &Path, grouping: &str, results: &serde_json::Value) {
    let report = serde_json::json!({
        "schema_version": 1,
        "runtime": {"benchdiff_version": "0.0.0", "os": "linux", "arch": "x86_64"},
        "params": {"tool": "go", "trials": 3, "benchmem": false, "profile": false, "grouping": grouping},
        "results": results,
        "failures": [],
        "profiles": [],
        "generated_at": "2024-05-01T10:00:00Z"
    });
    fs::write(path, serde_json::to_string_pretty(&report).unwrap()).unwrap();
}

#[test]
#[serial]
fn test_version() {
    let dir = tempdir().unwrap();
    let output = benchdiff(dir.path(), &["version"]);
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).starts_with("benchdiff "));
}

#[test]
#[serial]
fn test_discover_json() {
    let dir = tempdir().unwrap();
    write_codebase(dir.path());

    let output = benchdiff(dir.path(), &["--json", "discover", "--in", "."]);
    assert!(output.status.success());

    let json = stdout_json(&output);
    let list = json.as_array().expect("array of descriptors");
    assert_eq!(list.len(), 1);
    assert_eq!(list[0]["name"], "BenchmarkAdd");
    assert_eq!(list[0]["package"], "calc");
    assert_eq!(list[0]["package_path"], "calc");
}

#[test]
#[serial]
fn test_discover_keeps_same_named_packages_apart() {
    let dir = tempdir().unwrap();
    for sub in ["a/util", "b/util"] {
        fs::create_dir_all(dir.path().join(sub)).unwrap();
        fs::write(
            dir.path().join(sub).join("x_test.go"),
            "package util\n\nfunc BenchmarkParse(b *testing.B) {}\n",
        )
        .unwrap();
    }

    let output = benchdiff(dir.path(), &["--json", "discover", "--in", "."]);
    assert!(output.status.success());

    let json = stdout_json(&output);
    let paths: Vec<_> = json
        .as_array()
        .unwrap()
        .iter()
        .map(|d| d["package_path"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(paths, ["a/util", "b/util"]);
}

#[test]
#[serial]
fn test_discover_missing_root_fails() {
    let dir = tempdir().unwrap();
    let output = benchdiff(dir.path(), &["discover", "--in", "does-not-exist"]);
    assert!(!output.status.success());
}

#[test]
#[serial]
fn test_compare_json() {
    let dir = tempdir().unwrap();
    write_report(
        &dir.path().join("base.json"),
        &serde_json::json!([
            {"name": "BenchmarkA", "package": "p", "samples": 3, "median_ns_per_op": 100.0}
        ]),
    );
    write_report(
        &dir.path().join("head.json"),
        &serde_json::json!([
            {"name": "BenchmarkA", "package": "p", "samples": 3, "median_ns_per_op": 90.0},
            {"name": "BenchmarkB", "package": "p", "samples": 3, "median_ns_per_op": 50.0}
        ]),
    );

    let output = benchdiff(dir.path(), &["--json", "compare", "base.json", "head.json"]);
    assert!(output.status.success());

    let json = stdout_json(&output);
    assert_eq!(json["metric"], "ns");
    let entries = json["entries"].as_array().unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0]["name"], "BenchmarkA");
    assert_eq!(entries[0]["left"], 100.0);
    assert_eq!(entries[0]["right"], 90.0);
    assert!(entries[1]["left"].is_null());
    assert_eq!(entries[1]["right"], 50.0);
}

#[test]
#[serial]
fn test_compare_rejects_mixed_grouping() {
    let dir = tempdir().unwrap();
    write_report(
        &dir.path().join("base.json"),
        &serde_json::json!([
            {"name": "BenchmarkA", "package": "p", "samples": 3, "median_ns_per_op": 100.0}
        ]),
    );
    write_grouped_report(
        &dir.path().join("head.json"),
        "name",
        &serde_json::json!([
            {"name": "BenchmarkA", "samples": 3, "median_ns_per_op": 90.0}
        ]),
    );

    let output = benchdiff(dir.path(), &["--json", "compare", "base.json", "head.json"]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("grouped by name"),
        "stderr: {stderr}"
    );
}

#[test]
#[serial]
fn test_compare_rejects_bad_metric() {
    let dir = tempdir().unwrap();
    let output = benchdiff(
        dir.path(),
        &["compare", "a.json", "b.json", "--metric", "bogus"],
    );
    assert!(!output.status.success());
}

#[cfg(unix)]
mod fake_tool {
    use super::*;
    use std::os::unix::fs::PermissionsExt;

    const FAKE_GO: &str = r#"#!/bin/sh
for arg in "$@"; do
  case "$arg" in
    version) echo "go version go1.22.0 fake/amd64"; exit 0 ;;
    -cpuprofile=*) : > "${arg#-cpuprofile=}"; exit 0 ;;
  esac
done
cat <<'EOF'
{"Action":"start","Package":"calc"}
{"Action":"output","Package":"calc","Test":"BenchmarkAdd","Output":"BenchmarkAdd-8   \t"}
{"Action":"output","Package":"calc","Test":"BenchmarkAdd","Output":"  1000\t   250.5 ns/op\n"}
{"Action":"pass","Package":"calc","Elapsed":0.1}
EOF
"#;

    const FAILING_GO: &str = r#"#!/bin/sh
for arg in "$@"; do
  case "$arg" in
    version) echo "go version go1.22.0 fake/amd64"; exit 0 ;;
  esac
done
echo "calc_test.go:3:1: undefined: Add" >&2
exit 2
"#;

    fn setup(root: &Path) {
        setup_with(root, FAKE_GO);
    }

    fn setup_with(root: &Path, script: &str) {
        write_codebase(root);
        let tool = root.join("fake-go.sh");
        fs::write(&tool, script).unwrap();
        fs::set_permissions(&tool, fs::Permissions::from_mode(0o755)).unwrap();

        let config = serde_json::json!({
            "tool": tool,
            "trials": 1,
            "artifact_dir": root.join("profiles"),
        });
        fs::write(root.join("benchdiff.json"), config.to_string()).unwrap();
    }

    #[test]
    #[serial]
    fn test_run_writes_summary_lines() {
        let dir = tempdir().unwrap();
        setup(dir.path());

        let output = benchdiff(dir.path(), &["run", "--in", "calc"]);
        assert!(
            output.status.success(),
            "stderr: {}",
            String::from_utf8_lossy(&output.stderr)
        );

        let stdout = String::from_utf8_lossy(&output.stdout);
        let artifact = dir.path().join("profiles/cpuprof_calc.BenchmarkAdd.out");
        assert_eq!(
            stdout,
            format!(
                "BenchmarkAdd 250.5 ns/op\nCPU profile generated {}\n",
                artifact.display()
            )
        );
        assert!(artifact.exists());
    }

    #[test]
    #[serial]
    fn test_fake_tool_emits_literal_escapes() {
        let dir = tempdir().unwrap();
        setup(dir.path());

        let output = Command::new("sh")
            .arg(dir.path().join("fake-go.sh"))
            .args(["test", "-json"])
            .output()
            .unwrap();
        let stdout = String::from_utf8_lossy(&output.stdout);
        assert_eq!(stdout.lines().count(), 4);
        for line in stdout.lines() {
            serde_json::from_str::<serde_json::Value>(line)
                .unwrap_or_else(|e| panic!("line should be JSON ({e}): {line:?}"));
        }
        assert!(stdout.contains(r"250.5 ns/op\n"));
    }

    #[test]
    #[serial]
    fn test_run_reports_tool_stderr_on_failure() {
        let dir = tempdir().unwrap();
        setup_with(dir.path(), FAILING_GO);

        let output = benchdiff(
            dir.path(),
            &["--json", "run", "--in", ".", "--no-profile"],
        );
        assert!(output.status.success());

        let json = stdout_json(&output);
        assert!(json["results"].as_array().unwrap().is_empty());
        let failure = &json["failures"][0];
        assert_eq!(failure["name"], "BenchmarkAdd");
        assert_eq!(failure["package"], "calc");
        assert_eq!(failure["stderr"], "calc_test.go:3:1: undefined: Add");

        let stderr = String::from_utf8_lossy(&output.stderr);
        assert!(stderr.contains("undefined: Add"), "stderr: {stderr}");

        let output = benchdiff(dir.path(), &["run", "--in", ".", "--no-profile"]);
        let stderr = String::from_utf8_lossy(&output.stderr);
        assert!(
            stderr.contains("FAIL calc.BenchmarkAdd: ")
                && stderr.contains("\n    calc_test.go:3:1: undefined: Add\n"),
            "stderr: {stderr}"
        );
    }

    #[test]
    #[serial]
    fn test_run_json_report() {
        let dir = tempdir().unwrap();
        setup(dir.path());

        let output = benchdiff(
            dir.path(),
            &[
                "--json",
                "run",
                "--in",
                ".",
                "--no-profile",
                "--out",
                "summary.txt",
                "--report",
                "report.json",
            ],
        );
        assert!(output.status.success());

        let json = stdout_json(&output);
        assert_eq!(json["schema_version"], 1);
        assert_eq!(json["runtime"]["tool_version"], "go version go1.22.0 fake/amd64");
        assert_eq!(json["results"][0]["name"], "BenchmarkAdd");
        assert_eq!(json["results"][0]["median_ns_per_op"], 250.5);
        assert!(json["profiles"].as_array().unwrap().is_empty());

        let summary = fs::read_to_string(dir.path().join("summary.txt")).unwrap();
        assert_eq!(summary, "BenchmarkAdd 250.5 ns/op\n");

        let saved: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(dir.path().join("report.json")).unwrap())
                .unwrap();
        assert_eq!(saved["results"], json["results"]);
    }

    #[test]
    #[serial]
    fn test_queue_executes_and_rejects_duplicates() {
        let dir = tempdir().unwrap();
        setup(dir.path());
        let requests = serde_json::json!([
            {"source": "custom_run", "git_ref": "abc", "benchmark_type": "micro"},
            {"source": "custom_run", "git_ref": "abc", "benchmark_type": "micro"},
            {"source": "custom_run", "git_ref": "abc", "benchmark_type": "oltp"}
        ]);
        fs::write(dir.path().join("requests.json"), requests.to_string()).unwrap();

        let output = benchdiff(
            dir.path(),
            &["--json", "queue", "--requests", "requests.json", "--in", "."],
        );
        assert!(output.status.success());

        let json = stdout_json(&output);
        let rejected = json["rejected"].as_array().unwrap();
        assert_eq!(rejected.len(), 2);
        assert_eq!(rejected[0]["code"], "QUEUE_DUPLICATE");
        assert_eq!(rejected[1]["error"], "unknown benchmark type: OLTP");

        let executions = json["executions"].as_array().unwrap();
        assert_eq!(executions.len(), 1);
        assert_eq!(executions[0]["git_ref"], "abc");
        assert_eq!(executions[0]["status"], "finished");
    }
}
