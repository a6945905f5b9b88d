//! Integration test: discover benchmarks in a Go tree, run them through a
//! scripted tool, then compare two revisions.

use benchdiff_core::{
    compare, compare_refs, discover, BenchTool, BenchmarkDescriptor, Config, GoSourceLoader,
    MemoryStore, ResultStore, RunError, Runner, Side,
};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tempfile::tempdir;

/// Emits `go test -json` style output for fixed ns/op values.
struct ScriptedTool {
    timings: HashMap<&'static str, Vec<f64>>,
}

impl BenchTool for ScriptedTool {
    fn measure(
        &self,
        target: &BenchmarkDescriptor,
        trials: u32,
        _benchmem: bool,
    ) -> Result<String, RunError> {
        let Some(timings) = self.timings.get(target.name.as_str()) else {
            return Err(RunError::Exit {
                command: format!("go test -bench=^{}$", target.name),
                code: 1,
                stderr: "FAIL".to_string(),
            });
        };
        assert_eq!(timings.len(), trials as usize);

        let mut out = Vec::new();
        for ns in timings {
            // Name and columns arrive as separate fragments.
            out.push(serde_json::json!({
                "Action": "output",
                "Package": target.package,
                "Test": target.name,
                "Output": format!("{}-8   \t", target.name),
            }));
            out.push(serde_json::json!({
                "Action": "output",
                "Package": target.package,
                "Test": target.name,
                "Output": format!("    1000\t{ns} ns/op\t  16 B/op\t  1 allocs/op\n"),
            }));
        }
        out.push(serde_json::json!({"Action": "pass", "Package": target.package}));
        Ok(out
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("\n"))
    }

    fn profile(&self, _target: &BenchmarkDescriptor, artifact: &Path) -> Result<(), RunError> {
        fs::write(artifact, b"profile").map_err(|source| RunError::Spawn {
            command: "profile".to_string(),
            source,
        })
    }
}

fn write_tree(root: &Path) {
    fs::create_dir_all(root.join("codec")).unwrap();
    fs::create_dir_all(root.join("vendor/dep")).unwrap();
    fs::write(
        root.join("codec/codec_test.go"),
        r#"package codec

import "testing"

func BenchmarkDecode(b *testing.B) {
	for i := 0; i < b.N; i++ {
		_ = decode("}")
	}
}

func BenchmarkEncode(b *testing.B) {}

func TestEncode(t *testing.T) {}
"#,
    )
    .unwrap();
    fs::write(
        root.join("vendor/dep/dep_test.go"),
        "package dep\n\nimport \"testing\"\n\nfunc BenchmarkVendored(b *testing.B) {}\n",
    )
    .unwrap();
}

fn tool(decode: [f64; 3], encode: Option<[f64; 3]>) -> Arc<ScriptedTool> {
    let mut timings = HashMap::new();
    timings.insert("BenchmarkDecode", decode.to_vec());
    if let Some(encode) = encode {
        timings.insert("BenchmarkEncode", encode.to_vec());
    }
    Arc::new(ScriptedTool { timings })
}

#[test]
fn test_discover_run_compare() {
    let src = tempdir().unwrap();
    let artifacts = tempdir().unwrap();
    write_tree(src.path());

    let descriptors = discover(&GoSourceLoader::new(), src.path()).unwrap();
    let names: Vec<_> = descriptors.iter().map(|d| d.name.as_str()).collect();
    assert_eq!(names, ["BenchmarkDecode", "BenchmarkEncode"]);

    let config = Config::default()
        .with_trials(3)
        .with_artifact_dir(artifacts.path());

    let mut base_out = Vec::new();
    let base = Runner::new(tool([100.0, 120.0, 110.0], None), &config)
        .run(&descriptors, &mut base_out)
        .unwrap();
    assert_eq!(base.results.len(), 1);
    assert_eq!(base.results[0].median_ns_per_op, 110.0);
    assert_eq!(base.results[0].median_allocs_per_op, Some(1.0));
    assert_eq!(base.failures.len(), 1);
    assert_eq!(base.failures[0].name, "BenchmarkEncode");

    let base_out = String::from_utf8(base_out).unwrap();
    assert!(base_out.starts_with("BenchmarkDecode 100 ns/op\nBenchmarkDecode 120 ns/op\n"));
    assert!(base_out.contains("CPU profile generated "));
    assert!(artifacts
        .path()
        .join("cpuprof_codec.BenchmarkDecode.out")
        .exists());

    let head = Runner::new(tool([90.0, 80.0, 95.0], Some([50.0, 50.0, 60.0])), &config)
        .run(&descriptors, &mut std::io::sink())
        .unwrap();
    assert!(head.failures.is_empty());
    assert_eq!(head.profiles.len(), 2);

    let entries = compare(&base.results, &head.results);
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].name, "BenchmarkDecode");
    assert_eq!((entries[0].left, entries[0].right), (Some(110.0), Some(90.0)));
    assert_eq!(entries[1].side(), Some(Side::RightOnly));
    assert_eq!(entries[1].right, Some(50.0));

    let store = MemoryStore::new();
    store.save_results("base", &base.results).unwrap();
    store.save_results("head", &head.results).unwrap();
    assert_eq!(compare_refs(&store, "base", "head").unwrap(), entries);
}

/// Reports one ns/op value per package path.
struct PerPackageTool {
    ns: HashMap<&'static str, f64>,
}

impl BenchTool for PerPackageTool {
    fn measure(
        &self,
        target: &BenchmarkDescriptor,
        _trials: u32,
        _benchmem: bool,
    ) -> Result<String, RunError> {
        let ns = self.ns[target.package_path.as_str()];
        Ok(serde_json::json!({
            "Action": "output",
            "Package": target.package,
            "Output": format!("{}-8 1000 {ns} ns/op\n", target.name),
        })
        .to_string())
    }

    fn profile(&self, _target: &BenchmarkDescriptor, artifact: &Path) -> Result<(), RunError> {
        fs::write(artifact, b"profile").map_err(|source| RunError::Spawn {
            command: "profile".to_string(),
            source,
        })
    }
}

#[test]
fn test_same_named_packages_stay_separate() {
    let src = tempdir().unwrap();
    let artifacts = tempdir().unwrap();
    for sub in ["a/util", "b/util"] {
        fs::create_dir_all(src.path().join(sub)).unwrap();
        fs::write(
            src.path().join(sub).join("x_test.go"),
            "package util\n\nimport \"testing\"\n\nfunc BenchmarkParse(b *testing.B) {}\n",
        )
        .unwrap();
    }

    let descriptors = discover(&GoSourceLoader::new(), src.path()).unwrap();
    assert_eq!(descriptors.len(), 2);

    let tool = Arc::new(PerPackageTool {
        ns: HashMap::from([("a/util", 10.0), ("b/util", 1000.0)]),
    });
    let config = Config::default()
        .with_trials(1)
        .with_artifact_dir(artifacts.path());
    let report = Runner::new(tool, &config)
        .run(&descriptors, &mut std::io::sink())
        .unwrap();

    assert_eq!(report.results.len(), 2);
    assert_eq!(report.results[0].package.as_deref(), Some("a/util"));
    assert_eq!(report.results[0].median_ns_per_op, 10.0);
    assert_eq!(report.results[1].package.as_deref(), Some("b/util"));
    assert_eq!(report.results[1].median_ns_per_op, 1000.0);

    assert_eq!(report.profiles.len(), 2);
    assert!(artifacts.path().join("cpuprof_a.util.BenchmarkParse.out").exists());
    assert!(artifacts.path().join("cpuprof_b.util.BenchmarkParse.out").exists());
}

#[test]
fn test_broken_tree_yields_nothing() {
    let src = tempdir().unwrap();
    write_tree(src.path());
    fs::write(src.path().join("codec/broken.go"), "func main() {\n").unwrap();

    assert!(discover(&GoSourceLoader::new(), src.path()).is_err());
}
