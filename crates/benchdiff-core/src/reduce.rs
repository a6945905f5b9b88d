//! Reduction of trial samples into one representative value per benchmark.

use crate::parser::{Secondary, TrialSample};
use crate::stats::compute_median;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// How samples are keyed during reduction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Grouping {
    /// Key by `(package path, name)`. Packages sharing a name in different
    /// directories stay apart.
    #[default]
    Package,
    /// Key by name only. Same-named benchmarks from different packages are
    /// merged into one result; kept for compatibility with name-keyed stores.
    Name,
}

impl Grouping {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Package => "package",
            Self::Name => "name",
        }
    }

    /// Grouping that produced `results`, or `None` when there are none to tell.
    #[must_use]
    pub fn of_results(results: &[ReducedResult]) -> Option<Self> {
        results.first().map(|r| {
            if r.package.is_some() {
                Self::Package
            } else {
                Self::Name
            }
        })
    }
}

impl fmt::Display for Grouping {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identity of a reduced result. Orders by name, then package.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ResultKey {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub package: Option<String>,
}

impl ResultKey {
    #[must_use]
    pub fn new(name: impl Into<String>, package: Option<String>) -> Self {
        Self {
            name: name.into(),
            package,
        }
    }

    fn for_sample(sample: &TrialSample, grouping: Grouping) -> Self {
        let package = match grouping {
            Grouping::Package => Some(sample.package_path.clone()),
            Grouping::Name => None,
        };
        Self::new(&sample.name, package)
    }
}

impl fmt::Display for ResultKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.package {
            Some(package) => write!(f, "{package}.{}", self.name),
            None => f.write_str(&self.name),
        }
    }
}

/// Median statistics of one benchmark across all of its trials.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReducedResult {
    pub name: String,
    /// Package path; absent under name grouping.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub package: Option<String>,
    /// Number of trial samples reduced.
    pub samples: usize,
    pub median_ns_per_op: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub median_secondary: Option<Secondary>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub median_allocs_per_op: Option<f64>,
}

impl ReducedResult {
    #[must_use]
    pub fn key(&self) -> ResultKey {
        ResultKey::new(&self.name, self.package.clone())
    }
}

/// Reduce samples to one result per key, sorted by key.
///
/// A pure function of its input: reducing the same samples twice yields the
/// same results.
#[must_use]
pub fn reduce(samples: &[TrialSample], grouping: Grouping) -> Vec<ReducedResult> {
    let mut groups: BTreeMap<ResultKey, Vec<&TrialSample>> = BTreeMap::new();
    for sample in samples {
        groups
            .entry(ResultKey::for_sample(sample, grouping))
            .or_default()
            .push(sample);
    }

    groups
        .into_iter()
        .map(|(key, group)| reduce_group(key, &group))
        .collect()
}

fn reduce_group(key: ResultKey, group: &[&TrialSample]) -> ReducedResult {
    let ns: Vec<f64> = group.iter().map(|s| s.ns_per_op).collect();

    // Only values sharing the first-seen unit and rate are comparable.
    let median_secondary = group
        .iter()
        .find_map(|s| s.secondary.as_ref())
        .map(|first| {
            let values: Vec<f64> = group
                .iter()
                .filter_map(|s| s.secondary.as_ref())
                .filter(|sec| sec.unit == first.unit && sec.per_second == first.per_second)
                .map(|sec| sec.value)
                .collect();
            Secondary {
                value: compute_median(&values),
                ..first.clone()
            }
        });

    let allocs: Vec<f64> = group.iter().filter_map(|s| s.allocs_per_op).collect();
    let median_allocs_per_op = (!allocs.is_empty()).then(|| compute_median(&allocs));

    ReducedResult {
        name: key.name,
        package: key.package,
        samples: group.len(),
        median_ns_per_op: compute_median(&ns),
        median_secondary,
        median_allocs_per_op,
    }
}
