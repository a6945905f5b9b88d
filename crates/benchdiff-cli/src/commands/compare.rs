use benchdiff_core::{read_report, ComparisonEntry, Metric};
use miette::{IntoDiagnostic, Result};
use serde::Serialize;
use std::path::Path;

#[derive(Serialize)]
struct CompareOutput<'a> {
    metric: Metric,
    left: &'a Path,
    right: &'a Path,
    entries: Vec<ComparisonEntry>,
}

/// Compare two run reports on `metric`.
pub fn run(left: &Path, right: &Path, metric: Metric, json: bool) -> Result<()> {
    let left_report = read_report(left).into_diagnostic()?;
    let right_report = read_report(right).into_diagnostic()?;

    let entries = left_report
        .compare_with(&right_report, metric)
        .into_diagnostic()?;

    if json {
        let out = CompareOutput {
            metric,
            left,
            right,
            entries,
        };
        println!("{}", serde_json::to_string_pretty(&out).into_diagnostic()?);
    } else {
        print_table(metric, &entries);
    }
    Ok(())
}

fn cell(value: Option<f64>, unit: Option<&str>) -> String {
    match (value, unit) {
        (None, _) => "-".to_string(),
        (Some(v), None) => format!("{v:.2}"),
        (Some(v), Some(unit)) => format!("{v:.2} {unit}"),
    }
}

fn print_table(metric: Metric, entries: &[ComparisonEntry]) {
    if entries.is_empty() {
        println!("Nothing to compare");
        return;
    }

    let width = entries
        .iter()
        .map(|e| e.key().to_string().len())
        .max()
        .unwrap_or(0)
        .max("benchmark".len());

    println!(
        "{:<width$}  {:>14}  {:>14}  {:>9}",
        "benchmark",
        format!("old {metric}"),
        format!("new {metric}"),
        "delta",
        width = width
    );
    for entry in entries {
        let delta = entry
            .delta_pct()
            .map_or_else(|| "~".to_string(), |d| format!("{d:+.2}%"));
        println!(
            "{:<width$}  {:>14}  {:>14}  {:>9}",
            entry.key().to_string(),
            cell(entry.left, entry.left_unit.as_deref()),
            cell(entry.right, entry.right_unit.as_deref()),
            delta,
            width = width
        );
    }
}
