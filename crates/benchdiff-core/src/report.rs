//! Machine-readable run reports.

use crate::compare::{compare_by, ComparisonEntry, Metric};
use crate::error::Error;
use crate::reduce::{reduce, Grouping, ReducedResult};
use crate::runner::BenchmarkOutcome;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Run report schema version. Bump when changing JSON structure.
pub const RUN_REPORT_SCHEMA_VERSION: u32 = 1;

/// Environment the run happened in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuntimeInfo {
    pub benchdiff_version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_version: Option<String>,
    pub os: String,
    pub arch: String,
}

impl RuntimeInfo {
    #[must_use]
    pub fn detect(tool_version: Option<String>) -> Self {
        Self {
            benchdiff_version: crate::VERSION.to_string(),
            tool_version,
            os: std::env::consts::OS.to_string(),
            arch: std::env::consts::ARCH.to_string(),
        }
    }
}

/// Settings the run used.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunParams {
    pub tool: String,
    pub trials: u32,
    pub benchmem: bool,
    pub profile: bool,
    pub grouping: Grouping,
}

/// A benchmark whose measurement pass failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunFailure {
    pub name: String,
    /// Package path of the benchmark.
    pub package: String,
    pub error: String,
    /// Tail of what the tool wrote to stderr.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stderr: Option<String>,
}

/// Complete result of one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    pub schema_version: u32,
    pub runtime: RuntimeInfo,
    pub params: RunParams,
    /// Reduced results, sorted by name then package.
    pub results: Vec<ReducedResult>,
    pub failures: Vec<RunFailure>,
    /// Profile artifacts written during the run.
    pub profiles: Vec<PathBuf>,
    pub generated_at: DateTime<Utc>,
}

impl RunReport {
    /// Build a report, reducing every successfully measured sample.
    #[must_use]
    pub fn from_outcomes(
        runtime: RuntimeInfo,
        params: RunParams,
        outcomes: &[BenchmarkOutcome],
    ) -> Self {
        let samples: Vec<_> = outcomes
            .iter()
            .flat_map(|o| o.samples().iter().cloned())
            .collect();

        let failures = outcomes
            .iter()
            .filter_map(|o| {
                let err = o.measurement.as_ref().err()?;
                Some(RunFailure {
                    name: o.descriptor.name.clone(),
                    package: o.descriptor.package_path.clone(),
                    error: err.to_string(),
                    stderr: err.stderr().map(str::to_string),
                })
            })
            .collect();

        Self {
            schema_version: RUN_REPORT_SCHEMA_VERSION,
            results: reduce(&samples, params.grouping),
            runtime,
            params,
            failures,
            profiles: outcomes.iter().filter_map(|o| o.profile.clone()).collect(),
            generated_at: Utc::now(),
        }
    }

    /// Compare this report's results (left) with `other`'s (right).
    ///
    /// # Errors
    /// `Error::GroupingMismatch` if the reports were reduced with different
    /// groupings, since their keys do not line up.
    pub fn compare_with(
        &self,
        other: &Self,
        metric: Metric,
    ) -> Result<Vec<ComparisonEntry>, Error> {
        let (left, right) = (self.params.grouping, other.params.grouping);
        if left != right {
            return Err(Error::GroupingMismatch { left, right });
        }
        Ok(compare_by(&self.results, &other.results, metric))
    }

    /// Pretty JSON rendering.
    ///
    /// # Errors
    /// Propagates serialization failures.
    pub fn to_json(&self) -> Result<String, Error> {
        serde_json::to_string_pretty(self).map_err(|e| Error::other(e.to_string()))
    }

    /// Write the report atomically to `path`.
    ///
    /// # Errors
    /// Returns an error if serialization or any filesystem step fails.
    pub fn write(&self, path: &Path) -> Result<(), Error> {
        let mut json = self.to_json()?;
        json.push('\n');
        atomic_write(path, json.as_bytes())?;
        Ok(())
    }
}

/// Read a report previously written by [`RunReport::write`].
///
/// # Errors
/// `Error::Io` if the file cannot be read, `Error::Other` if it is not a
/// report of a known schema version.
pub fn read_report(path: &Path) -> Result<RunReport, Error> {
    let content = fs::read_to_string(path)?;
    let report: RunReport = serde_json::from_str(&content)
        .map_err(|e| Error::other(format!("Invalid report {}: {e}", path.display())))?;
    if report.schema_version != RUN_REPORT_SCHEMA_VERSION {
        return Err(Error::other(format!(
            "Unsupported report schema version {} in {}",
            report.schema_version,
            path.display()
        )));
    }
    Ok(report)
}

/// Write via a temp file in the target directory and rename over `path`.
///
/// # Errors
/// Returns an error if any filesystem operation fails.
pub fn atomic_write(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };

    let temp_path = parent.join(format!(
        ".{}.tmp.{}",
        path.file_name().and_then(|n| n.to_str()).unwrap_or("report"),
        std::process::id()
    ));

    {
        let mut file = File::create(&temp_path)?;
        file.write_all(bytes)?;
        file.sync_all()?;
    }

    if let Err(e) = fs::rename(&temp_path, path) {
        let _ = fs::remove_file(&temp_path);
        return Err(e);
    }
    Ok(())
}
