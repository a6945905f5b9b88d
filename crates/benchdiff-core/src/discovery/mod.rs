//! Benchmark discovery.
//!
//! Discovery is split in two: a [`DeclarationSource`] turns a codebase into
//! per-package top-level function declarations, and [`discover`] filters those
//! down to benchmark entry points. Only the source is coupled to the subject
//! codebase's toolchain; swap it to support another loader.

mod go;

pub use go::GoSourceLoader;

use crate::error::DiscoveryError;
use serde::{Deserialize, Serialize};
use std::path::{Component, Path, PathBuf};

/// Name prefix the subject test framework requires for benchmarks.
pub const BENCHMARK_PREFIX: &str = "Benchmark";

/// Parameter type of the benchmark context argument.
pub const BENCHMARK_CONTEXT_TYPE: &str = "*testing.B";

/// A callable benchmark entry point.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BenchmarkDescriptor {
    /// Function name, e.g. `BenchmarkParse`.
    pub name: String,
    /// Name of the owning package, as declared by its package clause.
    pub package: String,
    /// `/`-separated directory of the package relative to the discovery
    /// root, or the package name for a package at the root itself. Unique
    /// per package where the bare name is not.
    #[serde(default)]
    pub package_path: String,
    /// File declaring the benchmark.
    pub source_path: PathBuf,
}

impl BenchmarkDescriptor {
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        package: impl Into<String>,
        source_path: impl Into<PathBuf>,
    ) -> Self {
        let package = package.into();
        Self {
            name: name.into(),
            package_path: package.clone(),
            package,
            source_path: source_path.into(),
        }
    }

    #[must_use]
    pub fn with_package_path(mut self, package_path: impl Into<String>) -> Self {
        self.package_path = package_path.into();
        self
    }

    /// Directory targeted by the benchmark tool for this benchmark.
    #[must_use]
    pub fn target_dir(&self) -> &Path {
        self.source_path.parent().unwrap_or(Path::new("."))
    }
}

/// A top-level function declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FuncDecl {
    pub name: String,
    /// Receiver list for methods, `None` for plain functions.
    pub receiver: Option<String>,
    /// Raw parameter list, without the surrounding parentheses.
    pub params: String,
    /// Raw result list; empty when the function returns nothing.
    pub results: String,
}

/// One source file and the functions it declares, in declaration order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    pub path: PathBuf,
    pub functions: Vec<FuncDecl>,
}

/// All files of one package (test files included).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageDecls {
    pub name: String,
    pub dir: PathBuf,
    pub files: Vec<SourceFile>,
}

/// Loads a codebase into package declarations.
///
/// Implementations must fail as a whole: a codebase that cannot be loaded
/// yields an error, never a partial package list.
pub trait DeclarationSource {
    fn load(&self, root: &Path) -> Result<Vec<PackageDecls>, DiscoveryError>;
}

/// Whether `decl` has the shape of a benchmark: prefixed name, no receiver,
/// a single `*testing.B` parameter and no results.
#[must_use]
pub fn is_benchmark(decl: &FuncDecl) -> bool {
    if !decl.name.starts_with(BENCHMARK_PREFIX)
        || decl.receiver.is_some()
        || !decl.results.trim().is_empty()
    {
        return false;
    }

    let params = decl.params.trim();
    if params.contains(',') {
        return false;
    }
    // Either `name *testing.B` or an unnamed `*testing.B`.
    let ty = match params.split_whitespace().collect::<Vec<_>>().as_slice() {
        [ty] => *ty,
        [_, ty] => *ty,
        _ => return false,
    };
    ty == BENCHMARK_CONTEXT_TYPE
}

/// Discover benchmark entry points under `root`.
///
/// Results follow package order, then file order, then declaration order, as
/// reported by the source.
pub fn discover(
    source: &dyn DeclarationSource,
    root: &Path,
) -> Result<Vec<BenchmarkDescriptor>, DiscoveryError> {
    let packages = source.load(root)?;

    let mut benchmarks = Vec::new();
    for package in &packages {
        let package_path = relative_package_path(root, &package.dir, &package.name);
        for file in &package.files {
            for decl in file.functions.iter().filter(|f| is_benchmark(f)) {
                benchmarks.push(
                    BenchmarkDescriptor::new(&decl.name, &package.name, &file.path)
                        .with_package_path(&package_path),
                );
            }
        }
    }

    tracing::debug!(
        root = %root.display(),
        packages = packages.len(),
        benchmarks = benchmarks.len(),
        "discovery complete"
    );
    Ok(benchmarks)
}

/// Path of `dir` below `root`, joined with `/`. Falls back to `name` for the
/// root directory itself.
fn relative_package_path(root: &Path, dir: &Path, name: &str) -> String {
    let parts: Vec<_> = dir
        .strip_prefix(root)
        .unwrap_or(dir)
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect();
    if parts.is_empty() {
        name.to_string()
    } else {
        parts.join("/")
    }
}
