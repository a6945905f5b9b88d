#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::return_self_not_must_use)]

pub mod compare;
pub mod config;
pub mod discovery;
pub mod error;
pub mod parser;
pub mod reduce;
pub mod report;
pub mod runner;
pub mod scm;
pub mod stats;
pub mod store;
pub mod version;

pub use compare::{compare, compare_by, ComparisonEntry, Metric, Side};
pub use config::Config;
pub use discovery::{discover, BenchmarkDescriptor, DeclarationSource, GoSourceLoader};
pub use error::{DiscoveryError, Error, RunError, StoreError};
pub use parser::{parse_line, LineParser, Matcher, ParsedLine, Secondary, TrialSample};
pub use reduce::{reduce, Grouping, ReducedResult, ResultKey};
pub use report::{read_report, RunReport, RUN_REPORT_SCHEMA_VERSION};
pub use runner::{BenchTool, BenchmarkOutcome, GoTestTool, Runner};
pub use scm::{PullRequestInfo, RevisionProvider, StaticRevisions};
pub use store::{compare_refs, ExecutionRecord, ExecutionStatus, MemoryStore, ResultStore};
pub use version::VERSION;
