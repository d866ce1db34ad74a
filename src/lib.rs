//! Repobook: turn a source tree into paginated, syntax-highlighted books

pub mod book;
pub mod engine;
pub mod language;
pub mod pipeline;
pub mod render;
pub mod types;
pub mod utils;

/// Re-export types for API
pub use types::*;

use log::debug;
use std::path::Path;

/// Result alias used by public repobook API
pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, Error>;

/// Single entry point for lib callers: paginate `root` and write one HTML page per part.
///
/// Pages land at `output` (one part) or `output-1.html`, `output-2.html`, ... when the book is split.
/// No external renderer runs; feed the pages to [`render::render_jobs`] to get PDF/EPUB/MOBI.
///
/// ```ignore
/// let outcome = repobook::build_book(Path::new("."), &BookOpts::default(), Path::new("book.html"))?;
/// for page in &outcome.artifacts { println!("{}", page.display()); }
/// ```
pub fn build_book(root: &Path, opts: &BookOpts, output: &Path) -> Result<BookOutcome> {
    let mut opts = Opts::from(opts);
    opts.output = Some(output.to_path_buf());
    debug!(
        "{} CONFIG:{:#?}",
        env!("CARGO_PKG_NAME").to_string().to_uppercase(),
        opts
    );
    book::run_book(root, &opts, None)
}
