#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::len_without_is_empty)]

//! Execution queue for benchdiff.
//!
//! Producers submit [`RunRequest`]s, which are validated, resolved to a
//! [`RunIdentifier`] and queued. A single consumer ([`run_consumer`]) claims
//! runs in FIFO order and hands each one to an [`Executor`] on the blocking
//! pool. A given identifier is never queued or executing twice.

pub mod executor;
pub mod queue;
pub mod request;
pub mod worker;

pub use executor::LocalExecutor;
pub use queue::{codes, ElementState, ExecutionQueue, QueueElement, QueueError, RunIdentifier};
pub use request::{submit, RequestError, RunRequest};
pub use worker::{drain, run_consumer, ExecutionSummary, Executor, Processed};
