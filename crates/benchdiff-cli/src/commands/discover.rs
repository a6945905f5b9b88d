use benchdiff_core::{discover, BenchmarkDescriptor, GoSourceLoader};
use miette::{IntoDiagnostic, Result};
use std::path::Path;

/// List benchmarks under `root`.
///
/// With `json`, prints the descriptors as a JSON array on stdout.
pub fn run(root: &Path, json: bool) -> Result<()> {
    let descriptors = discover(&GoSourceLoader::new(), root).into_diagnostic()?;

    if json {
        let out = serde_json::to_string_pretty(&descriptors).into_diagnostic()?;
        println!("{out}");
    } else {
        print_table(root, &descriptors);
    }
    Ok(())
}

fn print_table(root: &Path, descriptors: &[BenchmarkDescriptor]) {
    if descriptors.is_empty() {
        println!("No benchmarks found in {}", root.display());
        return;
    }

    let width = descriptors
        .iter()
        .map(|d| d.package_path.len())
        .max()
        .unwrap_or(0);
    for d in descriptors {
        let path = d.source_path.strip_prefix(root).unwrap_or(&d.source_path);
        println!(
            "{:<width$}  {}  ({})",
            d.package_path,
            d.name,
            path.display(),
            width = width
        );
    }
    println!("\n{} benchmark(s)", descriptors.len());
}
