//! End-to-end book build: walk → paginate → one HTML page per part → render → clean up.

use anyhow::{Context, Result};
use log::{debug, info, warn};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Instant;

use crate::engine::progress::{ProgressBar, create_progress_bar, update_progress_bar};
use crate::engine::tools::{
    check_root_and_canonicalize, default_output_for, default_title_for, numbered_path,
};
use crate::language::LanguageRegistry;
use crate::pipeline::{
    Highlighter, PageTemplate, PaginationConfig, PaginationEngine, part_to_markdown, walk_tree,
};
use crate::render::{JobOutcome, RenderOptions, render_jobs};
use crate::utils::config::RenderTimeouts;
use crate::utils::report_artifact;
use crate::{BookOutcome, OutputFormat, Opts, RenderJob};

/// One part written to disk as a standalone page.
#[derive(Clone, Debug)]
pub struct WrittenPart {
    pub part_number: usize,
    pub title: String,
    pub html_path: PathBuf,
}

/// Artifact base for `opts`: the explicit output or `<root name>.<ext>`.
pub fn output_base(root: &Path, opts: &Opts) -> PathBuf {
    let ext = opts.format.extension();
    opts.output
        .clone()
        .unwrap_or_else(|| default_output_for(root, ext))
}

/// Pagination engine over `root` configured from `opts`.
pub fn paginate(root: &Path, opts: &Opts) -> Result<PaginationEngine> {
    let files = walk_tree(root, &opts.exclude)?;
    let registry = LanguageRegistry::new(opts.allow_list.as_deref());
    let title = opts
        .title
        .clone()
        .unwrap_or_else(|| default_title_for(root));
    debug!(
        "{} entries walked, {} extensions registered, ceiling {} bytes",
        files.len(),
        registry.len(),
        opts.ceiling_bytes()
    );
    Ok(PaginationEngine::new(
        root,
        files,
        registry,
        PaginationConfig::new(title, opts.ceiling_bytes()),
    ))
}

/// Pull every part out of `engine` and write it as `<base>[-n].html`.
///
/// With `report` set each page gets a summary line (used when HTML is the final format).
pub fn write_parts(
    engine: PaginationEngine,
    base: &Path,
    opts: &Opts,
    cancel: Option<&AtomicBool>,
    report: bool,
) -> Result<Vec<WrittenPart>> {
    let highlighter = Highlighter::new();
    let template = PageTemplate::new(opts.device, highlighter.class_style())?;
    let mut written = Vec::new();

    for part in engine {
        if cancel.is_some_and(|c| c.load(Ordering::Relaxed)) {
            anyhow::bail!("Build cancelled by user after {} part(s)", written.len());
        }
        let part = part?;
        let started = Instant::now();
        let body = highlighter.markdown_to_html(&part_to_markdown(&part))?;
        let page = template.render(&part.title, &body);
        let html_path = numbered_path(base, part.part_number, OutputFormat::Html.extension());
        if let Some(dir) = html_path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir).with_context(|| format!("create {}", dir.display()))?;
        }
        std::fs::write(&html_path, page)
            .with_context(|| format!("write {}", html_path.display()))?;
        debug!(
            "part {}: {} sections → {}",
            part.part_number,
            part.sections.len(),
            html_path.display()
        );
        if report {
            report_artifact(&html_path, started.elapsed().as_secs_f64());
        }
        written.push(WrittenPart {
            part_number: part.part_number,
            title: part.title,
            html_path,
        });
    }
    Ok(written)
}

/// One render job per written part; targets follow the same numbering as the pages.
pub fn build_jobs(parts: &[WrittenPart], base: &Path, format: OutputFormat) -> Vec<RenderJob> {
    parts
        .iter()
        .map(|p| RenderJob {
            source_document_path: p.html_path.clone(),
            target_artifact_path: numbered_path(base, p.part_number, format.extension()),
        })
        .collect()
}

fn remove_intermediate(path: &Path) {
    if let Err(e) = std::fs::remove_file(path) {
        warn!("could not remove {}: {}", path.display(), e);
    }
}

/// Render `jobs`, reporting each artifact as it lands and removing its page unless kept.
fn render_parts(
    jobs: &[RenderJob],
    opts: &Opts,
    cancel: Option<&AtomicBool>,
) -> Result<Vec<PathBuf>> {
    let bar: Option<ProgressBar> =
        (opts.verbose && jobs.len() > 1).then(|| create_progress_bar(jobs.len(), "Rendering"));
    let produced: Mutex<Vec<(usize, PathBuf)>> = Mutex::new(Vec::new());
    let keep_html = opts.keep_html;

    let options = RenderOptions {
        concurrency: opts.concurrency,
        fail_fast: opts.fail_fast,
        timeouts: RenderTimeouts::default(),
        outline: opts.outline,
    };
    let result = {
        let on_outcome = |outcome: &JobOutcome| {
            if let Some(bar) = &bar {
                update_progress_bar(bar, 1);
            }
            if outcome.is_ok() {
                report_artifact(
                    &outcome.job.target_artifact_path,
                    outcome.elapsed.as_secs_f64(),
                );
                if !keep_html {
                    remove_intermediate(&outcome.job.source_document_path);
                }
                produced
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .push((outcome.index, outcome.job.target_artifact_path.clone()));
            }
        };
        let on_outcome: &(dyn Fn(&JobOutcome) + Sync) = &on_outcome;
        render_jobs(
            opts.renderer,
            opts.renderer_path.clone(),
            opts.format,
            jobs,
            &options,
            cancel,
            Some(on_outcome),
        )
    };

    let mut produced = produced.into_inner().unwrap_or_else(PoisonError::into_inner);
    produced.sort_by_key(|(i, _)| *i);
    let report = result.context("render")?;
    debug!(
        "{} of {} artifacts rendered with {} worker(s)",
        report.succeeded(),
        jobs.len(),
        report.concurrency
    );
    if produced.len() < jobs.len() {
        warn!(
            "{} of {} parts were not rendered (cancelled)",
            jobs.len() - produced.len(),
            jobs.len()
        );
    }
    Ok(produced.into_iter().map(|(_, p)| p).collect())
}

/// Build the book for `root` with fully resolved `opts`.
///
/// Returns an empty outcome (no files written) when nothing under `root` qualifies.
pub fn run_book(root: &Path, opts: &Opts, cancel: Option<&AtomicBool>) -> Result<BookOutcome> {
    let root = check_root_and_canonicalize(root)?;
    if !opts.renderer.supports(opts.format) && opts.format != OutputFormat::Html {
        anyhow::bail!("{} cannot produce {}", opts.renderer, opts.format);
    }
    let base = output_base(&root, opts);
    let engine = paginate(&root, opts)?;

    let is_html = opts.format == OutputFormat::Html;
    let parts = write_parts(engine, &base, opts, cancel, is_html)?;
    if parts.is_empty() {
        info!("Nothing to render under {}", root.display());
        return Ok(BookOutcome::default());
    }
    if is_html {
        return Ok(BookOutcome {
            artifacts: parts.iter().map(|p| p.html_path.clone()).collect(),
            parts: parts.len(),
        });
    }

    let jobs = build_jobs(&parts, &base, opts.format);
    let artifacts = render_parts(&jobs, opts, cancel)?;
    if cancel.is_some_and(|c| c.load(Ordering::Relaxed)) {
        anyhow::bail!(
            "Build cancelled by user; {} of {} parts rendered",
            artifacts.len(),
            jobs.len()
        );
    }
    Ok(BookOutcome {
        artifacts,
        parts: parts.len(),
    })
}
