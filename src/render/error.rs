use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Failures of the render phase. Job-level variants are isolated; `Launch` aborts the phase.
#[derive(Debug, Error)]
pub enum RenderError {
    /// The shared renderer could not be created (binary missing, profile dir not writable, ...).
    #[error("cannot start {backend}: {message}")]
    Launch {
        backend: &'static str,
        message: String,
    },

    #[error("{backend} could not be spawned for {}: {source}", .source_path.display())]
    Spawn {
        backend: &'static str,
        source_path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{} timed out after {:.1}s", .source_path.display(), .timeout.as_secs_f64())]
    Timeout {
        source_path: PathBuf,
        timeout: Duration,
    },

    #[error("{backend} exited with {status} for {}{}", .source_path.display(), stderr_suffix(.stderr))]
    Exit {
        backend: &'static str,
        source_path: PathBuf,
        status: String,
        stderr: String,
    },

    #[error("{} was not rendered (no {})", .source_path.display(), .target_path.display())]
    MissingOutput {
        source_path: PathBuf,
        target_path: PathBuf,
    },

    #[error("{} cannot be expressed as a file URL", .source_path.display())]
    InvalidSource { source_path: PathBuf },

    #[error("{backend} does not produce {format}")]
    Unsupported {
        backend: &'static str,
        format: String,
    },

    #[error("{backend} teardown failed: {source}")]
    Teardown {
        backend: &'static str,
        #[source]
        source: std::io::Error,
    },

    #[error("render worker panicked")]
    WorkerPanic,

    /// Summary returned by the pool after cleanup when some jobs failed.
    #[error("{failed} of {total} render jobs failed: {}", .first.display())]
    JobsFailed {
        failed: usize,
        total: usize,
        first: PathBuf,
    },
}

fn stderr_suffix(stderr: &str) -> String {
    let last = stderr.lines().rev().find(|l| !l.trim().is_empty());
    match last {
        Some(line) => format!(": {}", line.trim()),
        None => String::new(),
    }
}
