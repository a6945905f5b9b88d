use crate::error::Error;
use crate::reduce::Grouping;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default number of measurement trials per benchmark.
pub const DEFAULT_TRIALS: u32 = 10;

/// File name looked up in the working directory when no config path is given.
pub const CONFIG_FILE_NAME: &str = "benchdiff.json";

/// Runtime configuration for a benchdiff harness.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Program used to run benchmarks.
    pub tool: String,

    /// Number of measurement trials per benchmark.
    pub trials: u32,

    /// Ask the tool for allocation statistics.
    pub benchmem: bool,

    /// Run the CPU profiling pass after measurement.
    pub profile: bool,

    /// Directory profile artifacts are written to.
    pub artifact_dir: PathBuf,

    /// Leading component of profile artifact names.
    pub artifact_prefix: String,

    /// Extension of profile artifact names.
    pub artifact_ext: String,

    /// How trial samples are keyed during reduction.
    pub grouping: Grouping,

    /// Run types accepted by the execution queue.
    pub benchmark_types: Vec<String>,

    /// Verbosity level (0 = INFO, 1 = DEBUG, 2+ = TRACE).
    pub verbosity: u8,

    /// Whether to emit JSON logs.
    pub json_logs: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            tool: "go".to_string(),
            trials: DEFAULT_TRIALS,
            benchmem: false,
            profile: true,
            artifact_dir: PathBuf::from("."),
            artifact_prefix: "cpuprof".to_string(),
            artifact_ext: "out".to_string(),
            grouping: Grouping::default(),
            benchmark_types: vec!["micro".to_string()],
            verbosity: 0,
            json_logs: false,
        }
    }
}

impl Config {
    /// Load a config from a JSON file. Missing keys take their defaults.
    pub fn load(path: &Path) -> Result<Self, Error> {
        let content = std::fs::read_to_string(path).map_err(|source| Error::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = serde_json::from_str(&content).map_err(|source| Error::ConfigParse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Load `path` if given, else `benchdiff.json` under `cwd` if it exists, else defaults.
    pub fn discover(path: Option<&Path>, cwd: &Path) -> Result<Self, Error> {
        if let Some(path) = path {
            return Self::load(path);
        }
        let candidate = cwd.join(CONFIG_FILE_NAME);
        if candidate.is_file() {
            Self::load(&candidate)
        } else {
            Ok(Self::default())
        }
    }

    pub fn validate(&self) -> Result<(), Error> {
        if self.trials == 0 {
            return Err(Error::ConfigInvalid("trials must be at least 1".to_string()));
        }
        if self.tool.trim().is_empty() {
            return Err(Error::ConfigInvalid("tool must not be empty".to_string()));
        }
        Ok(())
    }

    /// Whether `benchmark_type` is one of the accepted run types (case-insensitive).
    #[must_use]
    pub fn accepts_type(&self, benchmark_type: &str) -> bool {
        self.benchmark_types
            .iter()
            .any(|t| t.eq_ignore_ascii_case(benchmark_type))
    }

    #[must_use]
    pub fn with_trials(mut self, trials: u32) -> Self {
        self.trials = trials;
        self
    }

    #[must_use]
    pub fn with_tool(mut self, tool: impl Into<String>) -> Self {
        self.tool = tool.into();
        self
    }

    #[must_use]
    pub fn with_benchmem(mut self, benchmem: bool) -> Self {
        self.benchmem = benchmem;
        self
    }

    #[must_use]
    pub fn with_profile(mut self, profile: bool) -> Self {
        self.profile = profile;
        self
    }

    #[must_use]
    pub fn with_artifact_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.artifact_dir = dir.into();
        self
    }

    #[must_use]
    pub fn with_grouping(mut self, grouping: Grouping) -> Self {
        self.grouping = grouping;
        self
    }

    /// Set verbosity level.
    #[must_use]
    pub fn with_verbosity(mut self, verbosity: u8) -> Self {
        self.verbosity = verbosity;
        self
    }

    /// Set JSON log output.
    #[must_use]
    pub fn with_json_logs(mut self, json: bool) -> Self {
        self.json_logs = json;
        self
    }
}
