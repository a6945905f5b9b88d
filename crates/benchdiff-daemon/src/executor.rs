//! Executor running the microbenchmark pipeline on the local checkout.

use crate::queue::RunIdentifier;
use crate::worker::{ExecutionSummary, Executor};
use benchdiff_core::{
    discover, BenchTool, Config, DeclarationSource, ExecutionRecord, ExecutionStatus,
    GoSourceLoader, GoTestTool, ResultStore, RunReport, Runner,
};
use std::path::PathBuf;
use std::sync::Arc;

/// Runs discovery, measurement and reduction over one checkout and stores
/// the reduced results under the run's git ref.
///
/// The checkout is used as is; selecting the revision is up to whoever
/// prepares `root`.
pub struct LocalExecutor {
    root: PathBuf,
    config: Config,
    source: Arc<dyn DeclarationSource + Send + Sync>,
    tool: Arc<dyn BenchTool>,
    store: Arc<dyn ResultStore>,
}

impl std::fmt::Debug for LocalExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalExecutor")
            .field("root", &self.root)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl LocalExecutor {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>, config: Config, store: Arc<dyn ResultStore>) -> Self {
        let tool = Arc::new(GoTestTool::new(&config.tool));
        Self {
            root: root.into(),
            config,
            source: Arc::new(GoSourceLoader::new()),
            tool,
            store,
        }
    }

    #[must_use]
    pub fn with_tool(mut self, tool: Arc<dyn BenchTool>) -> Self {
        self.tool = tool;
        self
    }

    #[must_use]
    pub fn with_source(mut self, source: Arc<dyn DeclarationSource + Send + Sync>) -> Self {
        self.source = source;
        self
    }

    fn run_pipeline(&self) -> Result<RunReport, String> {
        let descriptors = discover(self.source.as_ref(), &self.root).map_err(|e| e.to_string())?;
        Runner::new(self.tool.clone(), &self.config)
            .run(&descriptors, &mut std::io::sink())
            .map_err(|e| e.to_string())
    }
}

impl Executor for LocalExecutor {
    fn execute(&self, identifier: &RunIdentifier) -> Result<ExecutionSummary, String> {
        let record = ExecutionRecord::started(
            &identifier.source,
            &identifier.git_ref,
            &identifier.benchmark_type,
            identifier.pull_nb,
        );
        let uuid = record.uuid;
        self.store
            .record_execution(record.clone())
            .map_err(|e| e.to_string())?;

        let outcome = self.run_pipeline().and_then(|report| {
            self.store
                .save_results(&identifier.git_ref, &report.results)
                .map_err(|e| e.to_string())?;
            Ok(report)
        });

        let status = if outcome.is_ok() {
            ExecutionStatus::Finished
        } else {
            ExecutionStatus::Failed
        };
        self.store
            .record_execution(record.finish(status))
            .map_err(|e| e.to_string())?;

        let report = outcome?;
        Ok(ExecutionSummary {
            uuid,
            results: report.results.len(),
            failures: report.failures.len(),
        })
    }
}
