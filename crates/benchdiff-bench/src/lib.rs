#![deny(clippy::all)]
#![warn(clippy::pedantic)]

//! Benchmark harness for benchdiff.
//!
//! Run benchmarks with: `cargo bench -p benchdiff-bench`
