use benchdiff_core::{discover, Config, GoSourceLoader, RunReport, Runner};
use miette::{IntoDiagnostic, Result};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;

/// Where a run reads from and writes to.
#[derive(Debug)]
pub struct RunAction {
    pub input: PathBuf,
    /// Summary lines file; stdout when absent.
    pub output: Option<PathBuf>,
    /// JSON report file.
    pub report: Option<PathBuf>,
}

/// Discover and measure every benchmark under `action.input`.
///
/// Summary lines go to `--out` or stdout. With `json` and no `--out`, stdout
/// carries the JSON report and the summary lines go to stderr.
pub fn run(config: &Config, action: RunAction, json: bool) -> Result<()> {
    let descriptors = discover(&GoSourceLoader::new(), &action.input).into_diagnostic()?;
    tracing::info!(
        benchmarks = descriptors.len(),
        trials = config.trials,
        "starting run"
    );

    let runner = Runner::go(config);
    let report = match &action.output {
        Some(path) => {
            let mut sink = BufWriter::new(File::create(path).into_diagnostic()?);
            let report = runner.run(&descriptors, &mut sink).into_diagnostic()?;
            sink.flush().into_diagnostic()?;
            report
        }
        None if json => runner
            .run(&descriptors, &mut io::stderr().lock())
            .into_diagnostic()?,
        None => runner
            .run(&descriptors, &mut io::stdout().lock())
            .into_diagnostic()?,
    };

    if let Some(path) = &action.report {
        report.write(path).into_diagnostic()?;
        tracing::info!(path = %path.display(), "report written");
    }

    if json {
        println!("{}", report.to_json().into_diagnostic()?);
    } else {
        print_failures(&report);
    }

    if !report.failures.is_empty() {
        tracing::warn!(failures = report.failures.len(), "some benchmarks failed");
    }
    Ok(())
}

fn print_failures(report: &RunReport) {
    for failure in &report.failures {
        eprintln!(
            "FAIL {}.{}: {}",
            failure.package, failure.name, failure.error
        );
        for line in failure.stderr.iter().flat_map(|s| s.lines()) {
            eprintln!("    {line}");
        }
    }
}
