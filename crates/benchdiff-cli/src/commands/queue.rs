use benchdiff_core::{Config, ExecutionRecord, MemoryStore, ResultStore, StaticRevisions};
use benchdiff_daemon::{drain, submit, ExecutionQueue, LocalExecutor, RequestError, RunRequest};
use miette::{IntoDiagnostic, Result};
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;

#[derive(Serialize)]
struct Rejection {
    request: RunRequest,
    #[serde(skip_serializing_if = "Option::is_none")]
    code: Option<&'static str>,
    error: String,
}

#[derive(Serialize)]
struct QueueOutput {
    rejected: Vec<Rejection>,
    executions: Vec<ExecutionRecord>,
}

/// Enqueue the requests in `requests`, then execute them one by one
/// against the checkout at `checkout`.
pub fn run(config: &Config, requests: &Path, checkout: &Path, json: bool) -> Result<()> {
    let content = std::fs::read_to_string(requests).into_diagnostic()?;
    let requests: Vec<RunRequest> = serde_json::from_str(&content).into_diagnostic()?;

    let queue = Arc::new(ExecutionQueue::new());
    let provider = StaticRevisions::new();

    let mut rejected = Vec::new();
    for request in requests {
        if let Err(err) = submit(&queue, config, &provider, &request) {
            let code = match &err {
                RequestError::Queue(e) => Some(e.code()),
                _ => None,
            };
            rejected.push(Rejection {
                request,
                code,
                error: err.to_string(),
            });
        }
    }

    let store = Arc::new(MemoryStore::new());
    let executor = Arc::new(LocalExecutor::new(checkout, config.clone(), store.clone()));

    let runtime = tokio::runtime::Runtime::new().into_diagnostic()?;
    let processed = runtime.block_on(drain(queue, executor));
    tracing::info!(processed = processed.len(), rejected = rejected.len(), "queue drained");

    let output = QueueOutput {
        rejected,
        executions: store.list_executions().into_diagnostic()?,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&output).into_diagnostic()?);
    } else {
        print_human(&output);
    }
    Ok(())
}

fn print_human(output: &QueueOutput) {
    for r in &output.rejected {
        println!("rejected  {}: {}", r.request.source, r.error);
    }
    for e in &output.executions {
        let pull = e.pull_nb.map(|n| format!(" #{n}")).unwrap_or_default();
        println!(
            "{}  {:<8}  {}:{}@{}{}",
            e.uuid, e.status, e.benchmark_type, e.source, e.git_ref, pull
        );
    }
}
