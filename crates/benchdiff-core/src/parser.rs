//! Benchmark result line parsing.
//!
//! A [`LineParser`] holds an ordered list of [`Matcher`]s. The first matcher
//! whose pattern matches and whose extractor succeeds wins; a line nothing
//! matches is skipped silently, since most tool output carries no result.

use crate::discovery::BenchmarkDescriptor;
use regex_lite::{Captures, Regex};
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

/// A secondary per-op or per-second measurement, e.g. `12 B/op` or `80.5 MB/s`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Secondary {
    pub value: f64,
    pub unit: String,
    /// Rate is per second rather than per op.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub per_second: bool,
}

impl Secondary {
    #[must_use]
    pub fn per_op(value: f64, unit: impl Into<String>) -> Self {
        Self {
            value,
            unit: unit.into(),
            per_second: false,
        }
    }

    #[must_use]
    pub fn per_second(value: f64, unit: impl Into<String>) -> Self {
        Self {
            value,
            unit: unit.into(),
            per_second: true,
        }
    }

    /// Unit with its rate suffix, e.g. `B/op`.
    #[must_use]
    pub fn rate_unit(&self) -> String {
        let per = if self.per_second { "s" } else { "op" };
        format!("{}/{per}", self.unit)
    }
}

/// Numbers extracted from one result line.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedLine {
    pub iterations: u64,
    pub ns_per_op: f64,
    /// The ns/op field exactly as the tool printed it.
    pub raw_ns_per_op: String,
    pub secondary: Option<Secondary>,
    pub allocs_per_op: Option<f64>,
}

/// One measured trial of one benchmark.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrialSample {
    pub name: String,
    pub package: String,
    /// See [`BenchmarkDescriptor::package_path`].
    pub package_path: String,
    pub iterations: u64,
    pub ns_per_op: f64,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub raw_ns_per_op: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secondary: Option<Secondary>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allocs_per_op: Option<f64>,
}

impl TrialSample {
    #[must_use]
    pub fn from_parsed(descriptor: &BenchmarkDescriptor, parsed: ParsedLine) -> Self {
        Self {
            name: descriptor.name.clone(),
            package: descriptor.package.clone(),
            package_path: descriptor.package_path.clone(),
            iterations: parsed.iterations,
            ns_per_op: parsed.ns_per_op,
            raw_ns_per_op: parsed.raw_ns_per_op,
            secondary: parsed.secondary,
            allocs_per_op: parsed.allocs_per_op,
        }
    }

    /// ns/op as the tool printed it, falling back to the parsed value.
    #[must_use]
    pub fn ns_per_op_text(&self) -> String {
        if self.raw_ns_per_op.is_empty() {
            self.ns_per_op.to_string()
        } else {
            self.raw_ns_per_op.clone()
        }
    }
}

/// Extracts a [`ParsedLine`] from the captures of its pattern.
pub type Extractor = fn(&Captures<'_>) -> Option<ParsedLine>;

/// A pattern paired with the extractor that reads its captures.
#[derive(Debug, Clone)]
pub struct Matcher {
    name: &'static str,
    re: Regex,
    extract: Extractor,
}

impl Matcher {
    /// Build a matcher.
    ///
    /// # Errors
    /// Returns the regex error if `pattern` does not compile.
    pub fn new(
        name: &'static str,
        pattern: &str,
        extract: Extractor,
    ) -> Result<Self, regex_lite::Error> {
        Ok(Self {
            name,
            re: Regex::new(pattern)?,
            extract,
        })
    }

    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    #[must_use]
    pub fn apply(&self, line: &str) -> Option<ParsedLine> {
        let caps = self.re.captures(line)?;
        (self.extract)(&caps)
    }
}

/// Richest shape: ns/op, a named `/op` value and allocs/op. The `/op` value
/// is the column right before allocs/op; any throughput or custom metric
/// columns between it and ns/op are skipped.
pub const MEM_PATTERN: &str = r"Benchmark\S*\s+(\d+)\s+([\d.]+)\s+ns/op(?:\s+[\d.]+\s+\S+)*?\s+([\d.]+)\s+(\S+)/op\s+([\d.]+)\s+allocs/op";

/// Throughput shape: ns/op plus a named `/s` value.
pub const THROUGHPUT_PATTERN: &str =
    r"Benchmark\S*\s+(\d+)\s+([\d.]+)\s+ns/op\s+([\d.]+)\s+(\S+)/s";

/// Minimal shape: iterations and ns/op only.
pub const MINIMAL_PATTERN: &str = r"Benchmark\S*\s+(\d+)\s+([\d.]+)\s+ns/op";

fn number(caps: &Captures<'_>, i: usize) -> Option<f64> {
    caps.get(i)?.as_str().parse().ok()
}

fn base(caps: &Captures<'_>) -> Option<ParsedLine> {
    Some(ParsedLine {
        iterations: caps.get(1)?.as_str().parse().ok()?,
        ns_per_op: number(caps, 2)?,
        raw_ns_per_op: caps.get(2)?.as_str().to_string(),
        secondary: None,
        allocs_per_op: None,
    })
}

fn secondary(caps: &Captures<'_>, per_second: bool) -> Option<Secondary> {
    Some(Secondary {
        value: number(caps, 3)?,
        unit: caps.get(4)?.as_str().to_string(),
        per_second,
    })
}

fn extract_mem(caps: &Captures<'_>) -> Option<ParsedLine> {
    Some(ParsedLine {
        secondary: Some(secondary(caps, false)?),
        allocs_per_op: Some(number(caps, 5)?),
        ..base(caps)?
    })
}

fn extract_throughput(caps: &Captures<'_>) -> Option<ParsedLine> {
    Some(ParsedLine {
        secondary: Some(secondary(caps, true)?),
        ..base(caps)?
    })
}

/// Ordered, first-match-wins line parser.
#[derive(Debug, Clone)]
pub struct LineParser {
    matchers: Vec<Matcher>,
}

impl LineParser {
    /// A parser with no matchers; every line is skipped.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            matchers: Vec::new(),
        }
    }

    /// The built-in shapes, richest first.
    #[must_use]
    pub fn standard() -> Self {
        let matchers = [
            Matcher::new("mem", MEM_PATTERN, extract_mem),
            Matcher::new("throughput", THROUGHPUT_PATTERN, extract_throughput),
            Matcher::new("minimal", MINIMAL_PATTERN, base),
        ]
        .into_iter()
        .map(|m| m.expect("built-in patterns are valid"))
        .collect();
        Self { matchers }
    }

    /// Append a matcher. It is tried after every existing one.
    pub fn push(&mut self, matcher: Matcher) {
        self.matchers.push(matcher);
    }

    #[must_use]
    pub fn matchers(&self) -> &[Matcher] {
        &self.matchers
    }

    /// Parse one line, returning the winning matcher's name with its values.
    #[must_use]
    pub fn parse_named(&self, line: &str) -> Option<(&'static str, ParsedLine)> {
        self.matchers
            .iter()
            .find_map(|m| m.apply(line).map(|parsed| (m.name, parsed)))
    }

    #[must_use]
    pub fn parse(&self, line: &str) -> Option<ParsedLine> {
        self.parse_named(line).map(|(_, parsed)| parsed)
    }
}

impl Default for LineParser {
    fn default() -> Self {
        Self::standard()
    }
}

/// Parse a line with the standard matchers.
#[must_use]
pub fn parse_line(line: &str) -> Option<ParsedLine> {
    static PARSER: OnceLock<LineParser> = OnceLock::new();
    PARSER.get_or_init(LineParser::standard).parse(line)
}
