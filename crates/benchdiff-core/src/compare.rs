//! Pairing of reduced results from two revisions.

use crate::parser::Secondary;
use crate::reduce::{ReducedResult, ResultKey};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Which reduced statistic a comparison reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Metric {
    #[default]
    #[serde(rename = "ns")]
    NsPerOp,
    #[serde(rename = "allocs")]
    AllocsPerOp,
    Secondary,
}

impl Metric {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NsPerOp => "ns",
            Self::AllocsPerOp => "allocs",
            Self::Secondary => "secondary",
        }
    }

    fn read(self, result: &ReducedResult) -> Option<f64> {
        match self {
            Self::NsPerOp => Some(result.median_ns_per_op),
            Self::AllocsPerOp => result.median_allocs_per_op,
            Self::Secondary => result.median_secondary.as_ref().map(|s| s.value),
        }
    }

    /// Unit of the value [`Metric::read`] returns, when it varies per result.
    fn unit(self, result: &ReducedResult) -> Option<String> {
        match self {
            Self::Secondary => result.median_secondary.as_ref().map(Secondary::rate_unit),
            Self::NsPerOp | Self::AllocsPerOp => None,
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Metric {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "ns" | "ns/op" => Ok(Self::NsPerOp),
            "allocs" | "allocs/op" => Ok(Self::AllocsPerOp),
            "secondary" => Ok(Self::Secondary),
            other => Err(format!(
                "unknown metric '{other}' (expected ns, allocs or secondary)"
            )),
        }
    }
}

/// Which sides of a comparison carry a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Both,
    LeftOnly,
    RightOnly,
}

/// One benchmark's value on each side. `None` means the side has no value,
/// which is distinct from a measured zero.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ComparisonEntry {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub package: Option<String>,
    pub left: Option<f64>,
    pub right: Option<f64>,
    /// Unit of `left`, set for secondary comparisons only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub left_unit: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub right_unit: Option<String>,
}

impl ComparisonEntry {
    #[must_use]
    pub fn key(&self) -> ResultKey {
        ResultKey::new(&self.name, self.package.clone())
    }

    /// `None` only for an entry with neither value, which [`compare_by`]
    /// never produces for the ns/op metric.
    #[must_use]
    pub fn side(&self) -> Option<Side> {
        match (self.left, self.right) {
            (Some(_), Some(_)) => Some(Side::Both),
            (Some(_), None) => Some(Side::LeftOnly),
            (None, Some(_)) => Some(Side::RightOnly),
            (None, None) => None,
        }
    }

    /// Whether both sides are measured in the same unit.
    #[must_use]
    pub fn units_match(&self) -> bool {
        match (&self.left_unit, &self.right_unit) {
            (Some(left), Some(right)) => left == right,
            _ => true,
        }
    }

    /// Relative change from left to right, in percent. `None` when a side is
    /// missing, the base is zero, or the units differ.
    #[must_use]
    pub fn delta_pct(&self) -> Option<f64> {
        if !self.units_match() {
            return None;
        }
        let (left, right) = (self.left?, self.right?);
        if left == 0.0 {
            return None;
        }
        Some((right - left) / left * 100.0)
    }
}

/// Compare two result sets by median ns/op.
#[must_use]
pub fn compare(left: &[ReducedResult], right: &[ReducedResult]) -> Vec<ComparisonEntry> {
    compare_by(left, right, Metric::NsPerOp)
}

/// Compare two result sets on `metric`.
///
/// Yields one entry per key present on either side, sorted by name then
/// package.
#[must_use]
pub fn compare_by(
    left: &[ReducedResult],
    right: &[ReducedResult],
    metric: Metric,
) -> Vec<ComparisonEntry> {
    let mut merged: BTreeMap<ResultKey, ComparisonEntry> = BTreeMap::new();
    for result in left {
        let entry = merged.entry(result.key()).or_default();
        entry.left = metric.read(result);
        entry.left_unit = metric.unit(result);
    }
    for result in right {
        let entry = merged.entry(result.key()).or_default();
        entry.right = metric.read(result);
        entry.right_unit = metric.unit(result);
    }

    merged
        .into_iter()
        .map(|(key, entry)| ComparisonEntry {
            name: key.name,
            package: key.package,
            ..entry
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(name: &str, ns: f64) -> ReducedResult {
        ReducedResult {
            name: name.to_string(),
            package: None,
            samples: 10,
            median_ns_per_op: ns,
            median_secondary: None,
            median_allocs_per_op: None,
        }
    }

    #[test]
    fn test_compare_marks_absent_side() {
        let left = vec![result("A", 100.0)];
        let right = vec![result("B", 50.0), result("A", 90.0)];

        let entries = compare(&left, &right);
        assert_eq!(
            entries,
            vec![
                ComparisonEntry {
                    name: "A".to_string(),
                    package: None,
                    left: Some(100.0),
                    right: Some(90.0),
                    ..ComparisonEntry::default()
                },
                ComparisonEntry {
                    name: "B".to_string(),
                    package: None,
                    left: None,
                    right: Some(50.0),
                    ..ComparisonEntry::default()
                },
            ]
        );
        assert_eq!(entries[0].side(), Some(Side::Both));
        assert_eq!(entries[1].side(), Some(Side::RightOnly));
    }

    #[test]
    fn test_compare_covers_key_union() {
        let left = vec![result("A", 1.0), result("C", 3.0), result("D", 4.0)];
        let right = vec![result("B", 2.0), result("C", 6.0)];

        let forward: Vec<_> = compare(&left, &right).into_iter().map(|e| e.name).collect();
        let backward: Vec<_> = compare(&right, &left).into_iter().map(|e| e.name).collect();
        assert_eq!(forward, ["A", "B", "C", "D"]);
        assert_eq!(forward, backward);

        let both = compare(&left, &right);
        let c = both.iter().find(|e| e.name == "C").unwrap();
        assert_eq!((c.left, c.right), (Some(3.0), Some(6.0)));
        assert_eq!(both[0].side(), Some(Side::LeftOnly));
    }

    #[test]
    fn test_zero_is_not_absence() {
        let entries = compare(&[result("A", 0.0)], &[]);
        assert_eq!(entries[0].left, Some(0.0));
        assert_eq!(entries[0].right, None);
        assert_eq!(entries[0].delta_pct(), None);

        let json = serde_json::to_string(&entries[0]).unwrap();
        assert_eq!(json, r#"{"name":"A","left":0.0,"right":null}"#);
    }

    #[test]
    fn test_delta_pct() {
        let entries = compare(&[result("A", 200.0)], &[result("A", 150.0)]);
        assert_eq!(entries[0].delta_pct(), Some(-25.0));
    }

    #[test]
    fn test_packages_are_distinct_keys() {
        let mut a = result("BenchmarkRead", 10.0);
        a.package = Some("alpha".to_string());
        let mut b = result("BenchmarkRead", 20.0);
        b.package = Some("beta".to_string());

        let entries = compare(&[a.clone(), b], &[a]);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].key().to_string(), "alpha.BenchmarkRead");
        assert_eq!(entries[1].side(), Some(Side::LeftOnly));
    }

    #[test]
    fn test_compare_by_alternate_metrics() {
        let mut left = result("A", 10.0);
        left.median_allocs_per_op = Some(4.0);
        left.median_secondary = Some(Secondary::per_op(128.0, "B"));
        let right = result("A", 12.0);

        let allocs = compare_by(&[left.clone()], &[right.clone()], Metric::AllocsPerOp);
        assert_eq!((allocs[0].left, allocs[0].right), (Some(4.0), None));
        assert_eq!(allocs[0].left_unit, None);

        let secondary = compare_by(&[left], &[right], Metric::Secondary);
        assert_eq!(secondary[0].left, Some(128.0));
        assert_eq!(secondary[0].left_unit.as_deref(), Some("B/op"));
        assert_eq!(secondary[0].right_unit, None);
    }

    #[test]
    fn test_secondary_delta_requires_same_unit() {
        let with_secondary = |secondary: Secondary| {
            let mut r = result("A", 10.0);
            r.median_secondary = Some(secondary);
            r
        };

        let mixed = compare_by(
            &[with_secondary(Secondary::per_op(100.0, "B"))],
            &[with_secondary(Secondary::per_second(50.0, "MB"))],
            Metric::Secondary,
        );
        assert_eq!((mixed[0].left, mixed[0].right), (Some(100.0), Some(50.0)));
        assert!(!mixed[0].units_match());
        assert_eq!(mixed[0].delta_pct(), None);

        let json = serde_json::to_value(&mixed[0]).unwrap();
        assert_eq!(json["left_unit"], "B/op");
        assert_eq!(json["right_unit"], "MB/s");

        let same_unit_other_rate = compare_by(
            &[with_secondary(Secondary::per_op(100.0, "B"))],
            &[with_secondary(Secondary::per_second(50.0, "B"))],
            Metric::Secondary,
        );
        assert_eq!(same_unit_other_rate[0].delta_pct(), None);

        let same = compare_by(
            &[with_secondary(Secondary::per_op(100.0, "B"))],
            &[with_secondary(Secondary::per_op(50.0, "B"))],
            Metric::Secondary,
        );
        assert_eq!(same[0].delta_pct(), Some(-50.0));
    }

    #[test]
    fn test_metric_from_str() {
        assert_eq!("ns".parse::<Metric>().unwrap(), Metric::NsPerOp);
        assert_eq!("ALLOCS".parse::<Metric>().unwrap(), Metric::AllocsPerOp);
        assert_eq!("secondary".parse::<Metric>().unwrap(), Metric::Secondary);
        assert!("bytes".parse::<Metric>().is_err());
    }
}
