#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::doc_markdown)]

mod commands;
mod logging;

use benchdiff_core::{Config, Metric};
use clap::Parser;
use miette::{IntoDiagnostic, Result};
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(name = "benchdiff")]
#[command(author, version, about = "Run, reduce and compare Go microbenchmarks", long_about = None)]
struct Cli {
    /// Increase logging verbosity (-v for DEBUG, -vv for TRACE)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Emit JSON formatted output (stable, machine-readable)
    #[arg(long, global = true)]
    json: bool,

    /// Override the working directory
    #[arg(long, global = true, value_name = "PATH")]
    cwd: Option<PathBuf>,

    /// Config file (defaults to benchdiff.json in the working directory)
    #[arg(long, global = true, value_name = "FILE", env = "BENCHDIFF_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Print version information
    Version,

    /// List the benchmarks found in a Go codebase
    Discover {
        /// Root of the codebase
        #[arg(long = "in", value_name = "DIR", default_value = ".")]
        input: PathBuf,
    },

    /// Measure every benchmark in a Go codebase
    Run {
        /// Root of the codebase
        #[arg(long = "in", value_name = "DIR", default_value = ".")]
        input: PathBuf,

        /// Write the summary lines to this file instead of stdout
        #[arg(long = "out", value_name = "FILE")]
        output: Option<PathBuf>,

        /// Write the JSON run report to this file
        #[arg(long, value_name = "FILE")]
        report: Option<PathBuf>,

        /// Measurement trials per benchmark
        #[arg(long)]
        trials: Option<u32>,

        /// Collect allocation statistics
        #[arg(long)]
        benchmem: bool,

        /// Skip the CPU profiling pass
        #[arg(long)]
        no_profile: bool,
    },

    /// Compare two run reports
    Compare {
        /// Base report
        left: PathBuf,

        /// Candidate report
        right: PathBuf,

        /// Statistic to compare: ns, allocs or secondary
        #[arg(long, default_value = "ns")]
        metric: Metric,
    },

    /// Queue run requests and execute them against a local checkout
    Queue {
        /// JSON file holding an array of run requests
        #[arg(long, value_name = "FILE")]
        requests: PathBuf,

        /// Checkout the runs execute against
        #[arg(long = "in", value_name = "DIR", default_value = ".")]
        input: PathBuf,
    },
}

fn absolute(cwd: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        cwd.join(path)
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let cwd = cli
        .cwd
        .or_else(|| std::env::current_dir().ok())
        .unwrap_or_else(|| PathBuf::from("."));

    let config_path = cli.config.as_deref().map(|p| absolute(&cwd, p));
    let mut config = Config::discover(config_path.as_deref(), &cwd)
        .into_diagnostic()?
        .with_verbosity(cli.verbose)
        .with_json_logs(cli.json);
    if config.artifact_dir.is_relative() {
        config.artifact_dir = cwd.join(&config.artifact_dir);
    }

    logging::init(config.verbosity, config.json_logs);

    match cli.command {
        Some(Commands::Version) | None => commands::version::run(),
        Some(Commands::Discover { input }) => {
            commands::discover::run(&absolute(&cwd, &input), cli.json)
        }
        Some(Commands::Run {
            input,
            output,
            report,
            trials,
            benchmem,
            no_profile,
        }) => {
            if let Some(trials) = trials {
                config = config.with_trials(trials);
            }
            if benchmem {
                config = config.with_benchmem(true);
            }
            if no_profile {
                config = config.with_profile(false);
            }
            config.validate().into_diagnostic()?;

            let action = commands::run::RunAction {
                input: absolute(&cwd, &input),
                output: output.map(|p| absolute(&cwd, &p)),
                report: report.map(|p| absolute(&cwd, &p)),
            };
            commands::run::run(&config, action, cli.json)
        }
        Some(Commands::Compare {
            left,
            right,
            metric,
        }) => commands::compare::run(
            &absolute(&cwd, &left),
            &absolute(&cwd, &right),
            metric,
            cli.json,
        ),
        Some(Commands::Queue { requests, input }) => commands::queue::run(
            &config,
            &absolute(&cwd, &requests),
            &absolute(&cwd, &input),
            cli.json,
        ),
    }
}
