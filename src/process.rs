//! Batch processing.
//!
//! Takes the discovered sources and runs each one through the pipeline:
//!
//! ```text
//! decode → aspect crop → resize → max-size → edge crop → encode × N → (delete original)
//! ```
//!
//! Any failure stops that file only; the batch carries on and the failure is
//! reported in the [`BatchSummary`]. The only fatal error is failing to
//! create the destination root before any work starts.
//!
//! Every output path belongs to exactly one source. When two sources would
//! write the same file (`a.jpg` and `a.png` both becoming `a.webp`), the one
//! discovered first keeps it and the other fails without writing anything.
//!
//! ## Output Structure
//!
//! ```text
//! output/20240612_093000/
//! ├── a.webp
//! └── trips/
//!     └── beach.webp
//! ```
//!
//! With `group_by_format`, each format gets its own tree:
//!
//! ```text
//! output/20240612_093000/
//! ├── jpg/trips/beach.jpg
//! └── webp/trips/beach.webp
//! ```
//!
//! ## Parallel Processing
//!
//! Files are processed in parallel using [rayon](https://docs.rs/rayon), one
//! file per worker. Progress events are sent over an `mpsc` channel so a
//! single printer thread owns stdout.

use crate::config::TransformConfig;
use crate::imaging::{
    BackendError, Dimensions, GeometryError, ImageBackend, OutputTarget, RustBackend,
    SourceImage, apply_transforms, plan_encodes, resolve_formats,
};
use crate::scan::SourceFile;
use image::ImageFormat;
use rayon::prelude::*;
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::mpsc::Sender;
use std::sync::{Mutex, PoisonError};
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Error, Debug)]
pub enum ProcessError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Image processing failed: {0}")]
    Imaging(#[from] BackendError),
    #[error("Transform failed: {0}")]
    Geometry(#[from] GeometryError),
    #[error("Output {} is already written from {}", .output.display(), .owner.display())]
    OutputClaimed { output: PathBuf, owner: PathBuf },
    #[error("Cannot create destination {}: {source}", .path.display())]
    DestinationRoot {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// What was produced from one source file.
#[derive(Debug, Clone, PartialEq)]
pub struct FileReport {
    pub source: PathBuf,
    /// Every written output, in format order.
    pub outputs: Vec<PathBuf>,
    /// Dimensions after all transforms.
    pub dimensions: Dimensions,
    pub deleted_original: bool,
}

/// Outcome of one file, as reported to the progress sink.
#[derive(Debug, Clone, PartialEq)]
pub enum FileOutcome {
    Done(FileReport),
    Failed(String),
}

/// Progress events emitted while the batch runs.
#[derive(Debug, Clone, PartialEq)]
pub enum ProcessEvent {
    FileProcessed { source: PathBuf, outcome: FileOutcome },
}

/// A file that could not be processed.
#[derive(Debug, Clone, PartialEq)]
pub struct FailedFile {
    pub source: PathBuf,
    pub reason: String,
}

/// Result of a whole batch, in discovery order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchSummary {
    pub succeeded: Vec<FileReport>,
    pub failed: Vec<FailedFile>,
}

impl BatchSummary {
    pub fn attempted(&self) -> usize {
        self.succeeded.len() + self.failed.len()
    }

    /// A batch fails only when files were attempted and none succeeded.
    pub fn is_failure(&self) -> bool {
        self.attempted() > 0 && self.succeeded.is_empty()
    }
}

fn same_file(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

fn output_target(source: &SourceFile, config: &TransformConfig, dest_root: &Path) -> OutputTarget {
    OutputTarget {
        root: dest_root.to_path_buf(),
        relative_dir: source.relative_dir.clone(),
        stem: source.stem(),
        group_by_format: config.group_by_format,
    }
}

/// Which source owns each output path.
///
/// Seeded in discovery order from the formats each source is expected to
/// produce, judging by its extension. Paths that only show up after
/// decoding are claimed first come, first served.
struct OutputClaims {
    owners: Mutex<HashMap<PathBuf, usize>>,
}

impl OutputClaims {
    fn seed(sources: &[SourceFile], config: &TransformConfig, dest_root: &Path) -> Self {
        let mut owners = HashMap::new();
        for (index, source) in sources.iter().enumerate() {
            let target = output_target(source, config, dest_root);
            let expected = ImageFormat::from_path(&source.path).ok();
            for format in resolve_formats(config, expected) {
                owners.entry(target.path_for(format)).or_insert(index);
            }
        }
        Self {
            owners: Mutex::new(owners),
        }
    }

    /// Claim `output` for source `index`, or return the index of its owner.
    fn claim(&self, output: &Path, index: usize) -> Result<(), usize> {
        let mut owners = self.owners.lock().unwrap_or_else(PoisonError::into_inner);
        match owners.entry(output.to_path_buf()) {
            Entry::Occupied(owner) if *owner.get() != index => Err(*owner.get()),
            Entry::Occupied(_) => Ok(()),
            Entry::Vacant(slot) => {
                slot.insert(index);
                Ok(())
            }
        }
    }
}

/// Run one source through the pipeline and write every requested format.
///
/// The original is removed only after every output was written, and never
/// when one of the outputs overwrote it in place.
pub fn process_file(
    backend: &impl ImageBackend,
    source: &SourceFile,
    config: &TransformConfig,
    dest_root: &Path,
) -> Result<FileReport, ProcessError> {
    process_claimed(backend, source, config, dest_root, |_| Ok(()))
}

/// [`process_file`], with every output path checked through `claim` before
/// anything is written.
fn process_claimed(
    backend: &impl ImageBackend,
    source: &SourceFile,
    config: &TransformConfig,
    dest_root: &Path,
    claim: impl Fn(&Path) -> Result<(), ProcessError>,
) -> Result<FileReport, ProcessError> {
    let SourceImage {
        pixels,
        format,
        exif,
    } = backend.decode(&source.path)?;
    debug!(
        path = %source.path.display(),
        width = pixels.width(),
        height = pixels.height(),
        ?format,
        "decoded"
    );

    let image = apply_transforms(pixels, config)?;

    let target = output_target(source, config, dest_root);
    let requests = plan_encodes(config, format, exif.as_deref(), &target);
    for request in &requests {
        claim(&request.output)?;
    }

    let mut outputs = Vec::with_capacity(requests.len());
    for request in &requests {
        if let Some(dir) = request.output.parent() {
            fs::create_dir_all(dir)?;
        }
        backend.encode(&image, request)?;
        debug!(output = %request.output.display(), format = %request.format, "encoded");
        outputs.push(request.output.clone());
    }

    let deleted_original = if !config.delete_original {
        false
    } else if outputs.iter().any(|o| same_file(o, &source.path)) {
        warn!(path = %source.path.display(), "output replaced the source in place, not deleting");
        false
    } else {
        fs::remove_file(&source.path)?;
        true
    };

    Ok(FileReport {
        source: source.path.clone(),
        outputs,
        dimensions: Dimensions {
            width: image.width(),
            height: image.height(),
        },
        deleted_original,
    })
}

/// Process a batch with the production backend.
pub fn process(
    sources: &[SourceFile],
    config: &TransformConfig,
    dest_root: &Path,
    progress: Option<Sender<ProcessEvent>>,
) -> Result<BatchSummary, ProcessError> {
    process_with_backend(&RustBackend::new(), sources, config, dest_root, progress)
}

/// Process a batch using a specific backend (allows testing with mock).
pub fn process_with_backend(
    backend: &impl ImageBackend,
    sources: &[SourceFile],
    config: &TransformConfig,
    dest_root: &Path,
    progress: Option<Sender<ProcessEvent>>,
) -> Result<BatchSummary, ProcessError> {
    fs::create_dir_all(dest_root).map_err(|source| ProcessError::DestinationRoot {
        path: dest_root.to_path_buf(),
        source,
    })?;

    let claims = OutputClaims::seed(sources, config, dest_root);
    let outcomes: Vec<FileOutcome> = sources
        .par_iter()
        .enumerate()
        .map(|(index, source)| {
            let claim = |output: &Path| {
                claims
                    .claim(output, index)
                    .map_err(|owner| ProcessError::OutputClaimed {
                        output: output.to_path_buf(),
                        owner: sources[owner].path.clone(),
                    })
            };
            let outcome = match process_claimed(backend, source, config, dest_root, claim) {
                Ok(report) => FileOutcome::Done(report),
                Err(e) => {
                    warn!(path = %source.path.display(), error = %e, "failed");
                    FileOutcome::Failed(e.to_string())
                }
            };
            if let Some(tx) = &progress {
                // A closed receiver only means nobody is watching.
                tx.send(ProcessEvent::FileProcessed {
                    source: source.path.clone(),
                    outcome: outcome.clone(),
                })
                .ok();
            }
            outcome
        })
        .collect();

    let mut summary = BatchSummary::default();
    for (source, outcome) in sources.iter().zip(outcomes) {
        match outcome {
            FileOutcome::Done(report) => summary.succeeded.push(report),
            FileOutcome::Failed(reason) => summary.failed.push(FailedFile {
                source: source.path.clone(),
                reason,
            }),
        }
    }
    Ok(summary)
}
