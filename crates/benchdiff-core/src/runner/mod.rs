//! Benchmark runner.
//!
//! Each descriptor gets a measurement pass and, when enabled, a profiling
//! pass. Descriptors are independent: a failing benchmark is recorded in its
//! [`BenchmarkOutcome`] and the batch moves on.

mod events;
mod tool;

pub use events::{output_lines, LineAssembler, TestEvent, ACTION_OUTPUT};
pub use tool::{capture, stderr_tail, BenchTool, Captured, GoTestTool, STDERR_TAIL_LINES};

use crate::config::Config;
use crate::discovery::BenchmarkDescriptor;
use crate::error::{Error, RunError};
use crate::parser::{LineParser, TrialSample};
use crate::reduce::Grouping;
use crate::report::{RunParams, RunReport, RuntimeInfo};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Deterministic naming of profile artifacts:
/// `<dir>/<prefix>_<package path>.<benchmark>.<ext>`, with the `/` of the
/// package path written as `.`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactNaming {
    pub dir: PathBuf,
    pub prefix: String,
    pub ext: String,
}

impl ArtifactNaming {
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self {
            dir: config.artifact_dir.clone(),
            prefix: config.artifact_prefix.clone(),
            ext: config.artifact_ext.clone(),
        }
    }

    #[must_use]
    pub fn path_for(&self, descriptor: &BenchmarkDescriptor) -> PathBuf {
        self.dir.join(format!(
            "{}_{}.{}.{}",
            self.prefix,
            descriptor.package_path.replace('/', "."),
            descriptor.name,
            self.ext
        ))
    }
}

/// What happened to one benchmark.
#[derive(Debug)]
pub struct BenchmarkOutcome {
    pub descriptor: BenchmarkDescriptor,
    /// Samples parsed from the measurement pass, or why it failed.
    pub measurement: Result<Vec<TrialSample>, RunError>,
    /// Artifact written by the profiling pass.
    pub profile: Option<PathBuf>,
}

impl BenchmarkOutcome {
    #[must_use]
    pub fn samples(&self) -> &[TrialSample] {
        self.measurement.as_deref().unwrap_or_default()
    }

    #[must_use]
    pub fn is_failure(&self) -> bool {
        self.measurement.is_err()
    }
}

/// Drives a [`BenchTool`] over discovered benchmarks.
pub struct Runner {
    tool: Arc<dyn BenchTool>,
    parser: LineParser,
    trials: u32,
    benchmem: bool,
    profile: bool,
    grouping: Grouping,
    tool_name: String,
    artifacts: ArtifactNaming,
}

impl Runner {
    #[must_use]
    pub fn new(tool: Arc<dyn BenchTool>, config: &Config) -> Self {
        Self {
            tool,
            parser: LineParser::standard(),
            trials: config.trials,
            benchmem: config.benchmem,
            profile: config.profile,
            grouping: config.grouping,
            tool_name: config.tool.clone(),
            artifacts: ArtifactNaming::from_config(config),
        }
    }

    /// Runner using `go test` through the configured program.
    #[must_use]
    pub fn go(config: &Config) -> Self {
        Self::new(Arc::new(GoTestTool::new(&config.tool)), config)
    }

    /// Replace the line parser.
    #[must_use]
    pub fn with_parser(mut self, parser: LineParser) -> Self {
        self.parser = parser;
        self
    }

    #[must_use]
    pub fn artifacts(&self) -> &ArtifactNaming {
        &self.artifacts
    }

    /// Run every descriptor and reduce what was measured.
    ///
    /// Summary lines go to `sink` as they are produced.
    ///
    /// # Errors
    /// Only a failing `sink` aborts the batch. Per-benchmark failures are
    /// recorded in the report.
    pub fn run(
        &self,
        descriptors: &[BenchmarkDescriptor],
        sink: &mut dyn Write,
    ) -> Result<RunReport, Error> {
        let runtime = RuntimeInfo::detect(self.tool.version());
        let params = RunParams {
            tool: self.tool_name.clone(),
            trials: self.trials,
            benchmem: self.benchmem,
            profile: self.profile,
            grouping: self.grouping,
        };

        let mut outcomes = Vec::with_capacity(descriptors.len());
        for descriptor in descriptors {
            outcomes.push(self.run_one(descriptor, sink)?);
        }

        let report = RunReport::from_outcomes(runtime, params, &outcomes);
        tracing::info!(
            benchmarks = descriptors.len(),
            results = report.results.len(),
            failures = report.failures.len(),
            "run complete"
        );
        Ok(report)
    }

    /// Run a single benchmark.
    ///
    /// # Errors
    /// Returns an error only if writing to `sink` fails.
    pub fn run_one(
        &self,
        descriptor: &BenchmarkDescriptor,
        sink: &mut dyn Write,
    ) -> Result<BenchmarkOutcome, Error> {
        let measurement = self.measure(descriptor);
        let samples = match measurement {
            Ok(samples) => samples,
            Err(err) => {
                tracing::warn!(
                    benchmark = %descriptor.name,
                    package = %descriptor.package_path,
                    error = %err,
                    stderr = err.stderr().unwrap_or_default(),
                    "measurement failed"
                );
                return Ok(BenchmarkOutcome {
                    descriptor: descriptor.clone(),
                    measurement: Err(err),
                    profile: None,
                });
            }
        };

        for sample in &samples {
            writeln!(sink, "{} {} ns/op", sample.name, sample.ns_per_op_text())?;
        }

        let profile = if self.profile {
            self.profile_pass(descriptor)
        } else {
            None
        };
        if let Some(artifact) = &profile {
            writeln!(sink, "CPU profile generated {}", artifact.display())?;
        }

        Ok(BenchmarkOutcome {
            descriptor: descriptor.clone(),
            measurement: Ok(samples),
            profile,
        })
    }

    fn measure(&self, descriptor: &BenchmarkDescriptor) -> Result<Vec<TrialSample>, RunError> {
        let stdout = self.tool.measure(descriptor, self.trials, self.benchmem)?;

        let samples: Vec<TrialSample> = output_lines(&stdout)
            .iter()
            .filter_map(|line| self.parser.parse(line))
            .map(|parsed| TrialSample::from_parsed(descriptor, parsed))
            .collect();

        tracing::debug!(
            benchmark = %descriptor.name,
            samples = samples.len(),
            "measurement pass done"
        );
        Ok(samples)
    }

    fn profile_pass(&self, descriptor: &BenchmarkDescriptor) -> Option<PathBuf> {
        let artifact = self.artifacts.path_for(descriptor);
        if let Err(err) = ensure_dir(&self.artifacts.dir) {
            tracing::warn!(dir = %self.artifacts.dir.display(), error = %err, "cannot create artifact dir");
            return None;
        }

        match self.tool.profile(descriptor, &artifact) {
            Ok(()) => Some(artifact),
            Err(err) => {
                tracing::warn!(
                    benchmark = %descriptor.name,
                    package = %descriptor.package_path,
                    error = %err,
                    "profiling failed"
                );
                None
            }
        }
    }
}

fn ensure_dir(dir: &Path) -> std::io::Result<()> {
    if dir.as_os_str().is_empty() {
        return Ok(());
    }
    std::fs::create_dir_all(dir)
}
