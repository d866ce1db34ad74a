//! Render phase: serialized parts → artifacts via one shared external renderer.

pub mod backends;
pub mod error;
pub mod pool;
pub mod resource;

pub use backends::{CalibreBackend, ChromeBackend, WkhtmltopdfBackend, run_process};
pub use error::RenderError;
pub use pool::{JobOutcome, RenderOptions, RenderReport, effective_concurrency, render_all};
pub use resource::{RenderBackend, SharedResource, Session};

use std::path::PathBuf;
use std::sync::atomic::AtomicBool;

use crate::{OutputFormat, RenderJob, RendererKind};

fn run<B: RenderBackend>(
    backend: B,
    jobs: &[RenderJob],
    options: &RenderOptions,
    cancel: Option<&AtomicBool>,
    on_outcome: Option<&(dyn Fn(&JobOutcome) + Sync)>,
) -> Result<RenderReport, RenderError> {
    let shared = SharedResource::new(backend);
    render_all(&shared, jobs, options, cancel, on_outcome)
}

/// Build the backend for `kind` and render every job through it.
pub fn render_jobs(
    kind: RendererKind,
    binary: Option<PathBuf>,
    format: OutputFormat,
    jobs: &[RenderJob],
    options: &RenderOptions,
    cancel: Option<&AtomicBool>,
    on_outcome: Option<&(dyn Fn(&JobOutcome) + Sync)>,
) -> Result<RenderReport, RenderError> {
    if !kind.supports(format) {
        return Err(RenderError::Unsupported {
            backend: match kind {
                RendererKind::Chrome => "chrome",
                RendererKind::Calibre => "calibre",
                RendererKind::Wkhtmltopdf => "wkhtmltopdf",
            },
            format: format.to_string(),
        });
    }
    match kind {
        RendererKind::Chrome => run(
            ChromeBackend::new(binary).with_outline(options.outline),
            jobs,
            options,
            cancel,
            on_outcome,
        ),
        RendererKind::Calibre => run(
            CalibreBackend::new(binary, format),
            jobs,
            options,
            cancel,
            on_outcome,
        ),
        RendererKind::Wkhtmltopdf => run(
            WkhtmltopdfBackend::new(binary),
            jobs,
            options,
            cancel,
            on_outcome,
        ),
    }
}
