//! CLI output formatting.
//!
//! # Information-First Display
//!
//! Every job is shown by its positional index and source name, with the
//! outcome as indented context lines. Queue events print as they arrive;
//! the run ends with a summary block.
//!
//! # Output Format
//!
//! ## Progress
//!
//! ```text
//! 001 beach.jpg → beach.webp
//!     800×450, 2.4 MB → 96.1 KB (saved 96%)
//!     Exported: beach.webp
//! 002 notes.gif
//!     Error: Decode failed: unexpected end of file
//! ```
//!
//! ## Summary
//!
//! ```text
//! Processed 3 images: 2 done, 1 failed
//!     Total: 4.1 MB → 301.7 KB (saved 93%)
//!     Exported 2 files to out/
//! ```
//!
//! # Architecture
//!
//! Each view has a `format_*` function (returns `Vec<String>`) for testability
//! and a `print_*` wrapper that writes to stdout. Format functions are pure:
//! no I/O, no side effects.

use crate::imaging::TransformConfig;
use crate::job::{JobId, JobRecord, JobStatus};
use crate::queue::{ExportSummary, QueueEvent, QueueSummary};
use std::path::Path;

// ============================================================================
// Shared helpers
// ============================================================================

/// Format a job id as a zero-padded positional index.
fn format_index(id: JobId) -> String {
    format!("{:0>3}", id.0)
}

/// Human-readable byte count.
pub fn format_size(bytes: u64) -> String {
    const KB: f64 = 1024.0;
    const MB: f64 = KB * 1024.0;
    let b = bytes as f64;
    if b >= MB {
        format!("{:.1} MB", b / MB)
    } else if b >= KB {
        format!("{:.1} KB", b / KB)
    } else {
        format!("{bytes} B")
    }
}

/// `saved 42%` for a positive ratio, `grew 12%` for a negative one.
pub fn format_savings(ratio: f64) -> String {
    let percent = (ratio.abs() * 100.0).round();
    if ratio < 0.0 {
        format!("grew {percent}%")
    } else {
        format!("saved {percent}%")
    }
}

// ============================================================================
// Progress
// ============================================================================

/// Format one finished job.
pub fn format_record(record: &JobRecord) -> Vec<String> {
    let index = format_index(record.id);
    match record.status {
        JobStatus::Done => {
            let mut lines = vec![format!(
                "{} {} \u{2192} {}",
                index,
                record.file_name,
                record.output_file_name.as_deref().unwrap_or("?")
            )];
            let dims = match (record.output_width, record.output_height) {
                (Some(w), Some(h)) => format!("{w}×{h}, "),
                _ => String::new(),
            };
            lines.push(format!(
                "    {}{} \u{2192} {} ({})",
                dims,
                format_size(record.original_size),
                format_size(record.output_size.unwrap_or_default()),
                format_savings(record.savings_ratio.unwrap_or_default())
            ));
            lines
        }
        JobStatus::Error => vec![
            format!("{} {}", index, record.file_name),
            format!(
                "    Error: {}",
                record.error.as_deref().unwrap_or("unknown error")
            ),
        ],
        JobStatus::Pending | JobStatus::Processing => {
            vec![format!("{} {} ({})", index, record.file_name, record.status)]
        }
    }
}

/// Format a single queue event as display lines.
///
/// `Started` is silent; the job shows up once it has an outcome.
pub fn format_queue_event(event: &QueueEvent) -> Vec<String> {
    match event {
        QueueEvent::Enqueued { .. } | QueueEvent::Started { .. } => Vec::new(),
        QueueEvent::Finished(record) => format_record(record),
        QueueEvent::Discarded { id } => {
            vec![format!("{} discarded (queue was cleared)", format_index(*id))]
        }
        QueueEvent::Exported { file_name, .. } => {
            vec![format!("    Exported: {file_name}")]
        }
        QueueEvent::ExportFailed {
            file_name, reason, ..
        } => vec![format!("    Export failed: {file_name}: {reason}")],
        QueueEvent::Cleared { removed } => vec![format!("Cleared {removed} job(s)")],
    }
}

/// Notes about settings that will be silently ignored.
///
/// With `original`, only sources that end up as PNG drop the quality, so the
/// note is a hint rather than a certainty.
pub fn format_config_notes(config: &TransformConfig) -> Vec<String> {
    let quality = config.quality.value();
    match config.format.fixed() {
        Some(format) if !format.honors_quality() => vec![format!(
            "Note: {format} is lossless; quality {quality:.2} is ignored"
        )],
        Some(_) => Vec::new(),
        None => vec![format!(
            "Note: sources written as PNG ignore quality {quality:.2}"
        )],
    }
}

pub fn print_config_notes(config: &TransformConfig) {
    for line in format_config_notes(config) {
        println!("{}", line);
    }
}

// ============================================================================
// Summary
// ============================================================================

/// Format the end-of-run summary.
///
/// `export` is the result of the final export pass and `None` when
/// auto-export already handled it.
pub fn format_summary(
    summary: &QueueSummary,
    export: Option<&ExportSummary>,
    output_dir: &Path,
) -> Vec<String> {
    let mut lines = vec![format!(
        "Processed {} image{}: {} done, {} failed",
        summary.total(),
        if summary.total() == 1 { "" } else { "s" },
        summary.done,
        summary.error
    )];

    if summary.done > 0 {
        let ratio = crate::imaging::savings_ratio(summary.bytes_in, summary.bytes_out);
        lines.push(format!(
            "    Total: {} \u{2192} {} ({})",
            format_size(summary.bytes_in),
            format_size(summary.bytes_out),
            format_savings(ratio)
        ));
    }

    if let Some(export) = export {
        lines.push(format!(
            "    Exported {} file{} to {}",
            export.exported.len(),
            if export.exported.len() == 1 { "" } else { "s" },
            output_dir.display()
        ));
        for (file_name, reason) in &export.failed {
            lines.push(format!("    Export failed: {file_name}: {reason}"));
        }
    }
    lines
}

pub fn print_summary(summary: &QueueSummary, export: Option<&ExportSummary>, output_dir: &Path) {
    for line in format_summary(summary, export, output_dir) {
        println!("{}", line);
    }
}

/// All records as pretty JSON, for `--json`.
pub fn format_records_json(records: &[JobRecord]) -> serde_json::Result<String> {
    serde_json::to_string_pretty(records)
}
