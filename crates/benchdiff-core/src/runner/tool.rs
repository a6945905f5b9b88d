//! External benchmark tool invocation.

use crate::discovery::BenchmarkDescriptor;
use crate::error::RunError;
use std::path::Path;
use std::process::{Command, Stdio};

/// Number of stderr lines kept on a failed invocation.
pub const STDERR_TAIL_LINES: usize = 20;

/// Runs a single benchmark through an external tool.
///
/// Implementations block until the subprocess exits. Each call stands alone;
/// the runner decides what a failure means for the batch.
pub trait BenchTool: Send + Sync {
    /// Measurement pass: run `target` `trials` times, returning the raw
    /// structured stdout.
    fn measure(
        &self,
        target: &BenchmarkDescriptor,
        trials: u32,
        benchmem: bool,
    ) -> Result<String, RunError>;

    /// Profiling pass: run `target` once, writing a CPU profile to `artifact`.
    fn profile(&self, target: &BenchmarkDescriptor, artifact: &Path) -> Result<(), RunError>;

    /// Tool version, if it can be queried.
    fn version(&self) -> Option<String> {
        None
    }
}

/// `go test` driver.
#[derive(Debug, Clone)]
pub struct GoTestTool {
    program: String,
}

impl GoTestTool {
    #[must_use]
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    #[must_use]
    pub fn program(&self) -> &str {
        &self.program
    }

    /// Arguments of the measurement pass.
    #[must_use]
    pub fn measure_args(target: &BenchmarkDescriptor, trials: u32, benchmem: bool) -> Vec<String> {
        let mut args = vec![
            "test".to_string(),
            "-run=^$".to_string(),
            bench_filter(target),
            "-json".to_string(),
            format!("-count={trials}"),
        ];
        if benchmem {
            args.push("-benchmem".to_string());
        }
        args.push(target.target_dir().display().to_string());
        args
    }

    /// Arguments of the profiling pass.
    #[must_use]
    pub fn profile_args(target: &BenchmarkDescriptor, artifact: &Path) -> Vec<String> {
        vec![
            "test".to_string(),
            "-run=^$".to_string(),
            bench_filter(target),
            "-count=1".to_string(),
            format!("-cpuprofile={}", artifact.display()),
            target.target_dir().display().to_string(),
        ]
    }
}

impl Default for GoTestTool {
    fn default() -> Self {
        Self::new("go")
    }
}

impl BenchTool for GoTestTool {
    fn measure(
        &self,
        target: &BenchmarkDescriptor,
        trials: u32,
        benchmem: bool,
    ) -> Result<String, RunError> {
        let output = capture(&self.program, &Self::measure_args(target, trials, benchmem))?;
        Ok(output.stdout)
    }

    fn profile(&self, target: &BenchmarkDescriptor, artifact: &Path) -> Result<(), RunError> {
        capture(&self.program, &Self::profile_args(target, artifact))?;
        Ok(())
    }

    fn version(&self) -> Option<String> {
        let output = capture(&self.program, &["version".to_string()]).ok()?;
        let version = output.stdout.trim();
        (!version.is_empty()).then(|| version.to_string())
    }
}

fn bench_filter(target: &BenchmarkDescriptor) -> String {
    format!("-bench=^{}$", target.name)
}

/// Captured output of a successful invocation.
#[derive(Debug, Default)]
pub struct Captured {
    pub stdout: String,
    pub stderr: String,
}

/// Run `program` to completion, capturing both streams.
///
/// # Errors
/// `RunError::Spawn` if the process cannot start, `RunError::Exit` if it exits
/// unsuccessfully.
pub fn capture(program: &str, args: &[String]) -> Result<Captured, RunError> {
    let command = format!("{program} {}", args.join(" "));
    tracing::debug!(command = %command, "spawning");

    let output = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .map_err(|source| RunError::Spawn {
            command: command.clone(),
            source,
        })?;

    let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
    let stderr = String::from_utf8_lossy(&output.stderr).into_owned();

    if !output.status.success() {
        return Err(RunError::Exit {
            command,
            code: output.status.code().unwrap_or(-1),
            stderr: stderr_tail(&stderr, STDERR_TAIL_LINES),
        });
    }

    Ok(Captured { stdout, stderr })
}

/// Last `n` lines of `stderr`.
#[must_use]
pub fn stderr_tail(stderr: &str, n: usize) -> String {
    let lines: Vec<&str> = stderr.lines().collect();
    lines[lines.len().saturating_sub(n)..].join("\n")
}
