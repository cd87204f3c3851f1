//! CLI output formatting.
//!
//! Everything the user reads on stdout goes through here; diagnostics go to
//! stderr via `tracing`. Paths are shown relative to the input and output
//! roots so lines stay short.
//!
//! ```text
//! Input:      photos
//! Output:     output/20240612_093000
//! Size:       1080x1080
//! Aspect:     1:1 (center)
//! Max size:   none
//! Crop:       none
//! Formats:    same as source
//! Quality:    90
//! DPI:        unchanged
//! Metadata:   stripped
//!
//! a.jpg → a.jpg (1080x1080)
//! trips/beach.png → trips/beach.webp, trips/beach.jpg (1080x1080, original deleted)
//! trips/broken.jpg ✗ Image processing failed: Decode failed: ...
//!
//! 2 succeeded, 1 failed
//! ```
//!
//! # Architecture
//!
//! Each `format_*` function returns `Vec<String>` (or a `String`) for
//! testability and has a `print_*` wrapper that writes to stdout. Format
//! functions are pure.

use crate::config::TransformConfig;
use crate::process::{BatchSummary, FileOutcome, ProcessEvent};
use std::path::Path;

/// `path` relative to `root` when possible, with forward slashes.
fn relative(path: &Path, root: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .to_string_lossy()
        .replace('\\', "/")
}

fn or_none(value: Option<impl ToString>, none: &str) -> String {
    value.map(|v| v.to_string()).unwrap_or_else(|| none.to_string())
}

/// Effective parameters, printed once before the batch starts.
pub fn format_run_parameters(
    input: &Path,
    destination: &Path,
    config: &TransformConfig,
) -> Vec<String> {
    let aspect = match config.aspect_ratio {
        Some(ratio) => format!("{ratio} ({})", config.crop_position),
        None => "none".to_string(),
    };
    let formats = if config.output_formats.is_empty() {
        "same as source".to_string()
    } else {
        config
            .output_formats
            .iter()
            .map(|f| f.to_string())
            .collect::<Vec<_>>()
            .join(", ")
    };
    let mut lines = vec![
        format!("Input:      {}", input.display()),
        format!("Output:     {}", destination.display()),
        format!("Size:       {}", or_none(config.target_size, "none")),
        format!("Aspect:     {aspect}"),
        format!("Max size:   {}", or_none(config.max_size, "none")),
        format!("Crop:       {}", or_none(config.crop_pixels, "none")),
        format!("Formats:    {formats}"),
        format!("Quality:    {}", config.quality.value()),
        format!("DPI:        {}", or_none(config.dpi, "unchanged")),
        format!(
            "Metadata:   {}",
            if config.keep_metadata { "kept" } else { "stripped" }
        ),
    ];
    if config.group_by_format {
        lines.push("Grouping:   by format".to_string());
    }
    if config.delete_original {
        lines.push("Originals:  deleted after success".to_string());
    }
    lines
}

pub fn print_run_parameters(input: &Path, destination: &Path, config: &TransformConfig) {
    for line in format_run_parameters(input, destination, config) {
        println!("{line}");
    }
    println!();
}

/// One line per finished file.
pub fn format_process_event(event: &ProcessEvent, input: &Path, destination: &Path) -> Vec<String> {
    match event {
        ProcessEvent::FileProcessed { source, outcome } => {
            let source = relative(source, input);
            match outcome {
                FileOutcome::Done(report) => {
                    let outputs = report
                        .outputs
                        .iter()
                        .map(|o| relative(o, destination))
                        .collect::<Vec<_>>()
                        .join(", ");
                    let dims = format!(
                        "{}x{}",
                        report.dimensions.width, report.dimensions.height
                    );
                    let detail = if report.deleted_original {
                        format!("{dims}, original deleted")
                    } else {
                        dims
                    };
                    vec![format!("{source} \u{2192} {outputs} ({detail})")]
                }
                FileOutcome::Failed(reason) => vec![format!("{source} \u{2717} {reason}")],
            }
        }
    }
}

/// Closing tally. An empty batch gets a warning instead.
pub fn format_summary(summary: &BatchSummary, input: &Path) -> Vec<String> {
    if summary.attempted() == 0 {
        return vec![format!(
            "No supported images found in {}",
            input.display()
        )];
    }
    let mut lines = vec![format!(
        "{} succeeded, {} failed",
        summary.succeeded.len(),
        summary.failed.len()
    )];
    let deleted = summary
        .succeeded
        .iter()
        .filter(|r| r.deleted_original)
        .count();
    if deleted > 0 {
        lines.push(format!("{deleted} originals deleted"));
    }
    lines
}

pub fn print_summary(summary: &BatchSummary, input: &Path) {
    println!();
    for line in format_summary(summary, input) {
        println!("{line}");
    }
}

/// Result line for the `reset` command.
pub fn format_reset(path: &Path, existed: bool) -> String {
    if existed {
        format!("Removed {}", path.display())
    } else {
        format!("Nothing to remove: {} does not exist", path.display())
    }
}
