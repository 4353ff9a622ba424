//! `sigil snapshot`: fingerprint classpath entries.
//!
//! Entries are snapshotted in parallel with one shared snapshotter, so the
//! signature cache and path interner are shared between workers. A directory
//! is walked recursively; a single file is snapshotted as a one-leaf entry.
//! Results are printed in argument order.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use rayon::prelude::*;
use sigil_config::OutputFormat;
use sigil_diagnostics::{Diagnostic, DiagnosticCode, DiagnosticSink};
use sigil_snapshot::{
    AggregateFingerprint, ClasspathEntrySnapshotter, LeafResource, Resource, SnapshotError,
    SnapshotterConfig,
};

use crate::context;
use crate::{GlobalArgs, SnapshotArgs};

/// Outcome of snapshotting one command-line entry.
struct EntryReport {
    path: PathBuf,
    result: Result<AggregateFingerprint, SnapshotError>,
}

/// Runs the `sigil snapshot` command.
///
/// Returns exit code 0 when every entry was fingerprinted, 1 otherwise.
pub fn run(args: &SnapshotArgs, global: &GlobalArgs) -> Result<i32, Box<dyn std::error::Error>> {
    let config = context::load_config(global)?;
    let format = args
        .format
        .map(OutputFormat::from)
        .unwrap_or(config.output.format);

    let sink = Arc::new(DiagnosticSink::new());
    let cache = context::open_cache(&config, args.cache_dir.as_deref(), args.no_cache, &sink);
    let snapshotter =
        ClasspathEntrySnapshotter::new(cache, SnapshotterConfig::from(&config), Arc::clone(&sink));

    let reports = snapshot_entries(&snapshotter, &args.entries);

    for report in &reports {
        if let Err(err) = &report.result {
            sink.emit(
                Diagnostic::error(
                    DiagnosticCode::SNAPSHOT_FAILED,
                    format!("failed to snapshot classpath entry: {err}"),
                )
                .with_resource(report.path.display().to_string()),
            );
        }
    }

    match format {
        OutputFormat::Text => print_text(&reports, global),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&to_json(&reports))?),
    }

    let failed = sink.has_errors();
    context::render_diagnostics(&sink, global);
    Ok(if failed { 1 } else { 0 })
}

fn snapshot_entries(
    snapshotter: &ClasspathEntrySnapshotter,
    entries: &[PathBuf],
) -> Vec<EntryReport> {
    entries
        .par_iter()
        .map(|path| EntryReport {
            path: path.clone(),
            result: snapshot_path(snapshotter, path),
        })
        .collect()
}

fn snapshot_path(
    snapshotter: &ClasspathEntrySnapshotter,
    path: &Path,
) -> Result<AggregateFingerprint, SnapshotError> {
    let metadata = std::fs::metadata(path).map_err(|source| SnapshotError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    if metadata.is_dir() {
        return snapshotter.snapshot_directory(path);
    }
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let leaf = LeafResource::from_file(name, path)?;
    snapshotter.snapshot_entry(&Resource::Leaf(leaf))
}

fn print_text(reports: &[EntryReport], global: &GlobalArgs) {
    for report in reports {
        let Ok(aggregate) = &report.result else {
            continue;
        };
        println!("{}  {}", aggregate.hash, report.path.display());
        if global.verbose {
            for entry in &aggregate.entries {
                println!("    {}  {}", entry.hash, entry.path);
            }
        }
    }
    if !global.quiet {
        let classes: usize = reports
            .iter()
            .filter_map(|r| r.result.as_ref().ok())
            .map(AggregateFingerprint::len)
            .sum();
        eprintln!(
            "   Snapshotted {} entr{} ({} API class{})",
            reports.len(),
            if reports.len() == 1 { "y" } else { "ies" },
            classes,
            if classes == 1 { "" } else { "es" }
        );
    }
}

fn to_json(reports: &[EntryReport]) -> serde_json::Value {
    let entries: Vec<serde_json::Value> = reports
        .iter()
        .map(|report| match &report.result {
            Ok(aggregate) => serde_json::json!({
                "entry": report.path.display().to_string(),
                "hash": aggregate.hash.to_string(),
                "classes": aggregate
                    .entries
                    .iter()
                    .map(|e| serde_json::json!({ "path": e.path, "hash": e.hash.to_string() }))
                    .collect::<Vec<_>>(),
            }),
            Err(err) => serde_json::json!({
                "entry": report.path.display().to_string(),
                "error": err.to_string(),
            }),
        })
        .collect();
    serde_json::Value::Array(entries)
}
