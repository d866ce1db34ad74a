//! Bounded worker pool over render jobs.
//!
//! Workers claim job indices from one atomic cursor until the list is exhausted, so uneven job
//! durations balance out without pre-partitioning. Outcomes come back over a channel. The shared
//! resource is shut down on every exit path.

use crossbeam_channel::{Sender, unbounded};
use log::{debug, error};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use super::error::RenderError;
use super::resource::{RenderBackend, SharedResource, ShutdownGuard};
use crate::RenderJob;
use crate::utils::config::{RenderLimits, RenderTimeouts};

/// Pool settings.
#[derive(Clone, Debug)]
pub struct RenderOptions {
    /// Requested worker count. `None` or `Some(0)` → default policy.
    pub concurrency: Option<usize>,
    /// Stop claiming new jobs after the first failure (in-flight jobs still finish).
    pub fail_fast: bool,
    pub timeouts: RenderTimeouts,
    /// Ask the renderer for a PDF document outline (chrome only).
    pub outline: bool,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            concurrency: None,
            fail_fast: false,
            timeouts: RenderTimeouts::default(),
            outline: true,
        }
    }
}

/// What happened to one job.
#[derive(Debug)]
pub struct JobOutcome {
    /// Index into the job list.
    pub index: usize,
    pub job: RenderJob,
    pub elapsed: Duration,
    pub result: Result<(), RenderError>,
}

impl JobOutcome {
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }
}

/// All outcomes of a run, in job order. Jobs never claimed (cancel, fail-fast, launch failure) are absent.
#[derive(Debug, Default)]
pub struct RenderReport {
    pub outcomes: Vec<JobOutcome>,
    pub concurrency: usize,
}

impl RenderReport {
    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_ok()).count()
    }

    pub fn failed(&self) -> impl Iterator<Item = &JobOutcome> {
        self.outcomes.iter().filter(|o| !o.is_ok())
    }
}

/// Worker count for `jobs` jobs: 1 for a single job, the hint (capped) when positive, else
/// `min(default_max, available threads, jobs)`.
pub fn effective_concurrency(jobs: usize, hint: Option<usize>, limits: RenderLimits) -> usize {
    if jobs <= 1 {
        return 1;
    }
    match hint {
        Some(n) if n > 0 => n.min(jobs),
        _ => limits
            .default_max
            .min(limits.all_threads.max(1))
            .min(jobs)
            .max(1),
    }
}

/// Shared state of one run, borrowed by every worker.
struct PoolState<'a, B: RenderBackend> {
    resource: &'a SharedResource<B>,
    jobs: &'a [RenderJob],
    options: &'a RenderOptions,
    cursor: AtomicUsize,
    stop: AtomicBool,
    cancel: Option<&'a AtomicBool>,
    on_outcome: Option<&'a (dyn Fn(&JobOutcome) + Sync)>,
}

impl<B: RenderBackend> PoolState<'_, B> {
    fn should_stop(&self) -> bool {
        self.stop.load(Ordering::SeqCst)
            || self.cancel.is_some_and(|c| c.load(Ordering::SeqCst))
    }

    /// Next unclaimed job index, or None when exhausted or stopping.
    fn claim(&self) -> Option<usize> {
        if self.should_stop() {
            return None;
        }
        let index = self.cursor.fetch_add(1, Ordering::SeqCst);
        (index < self.jobs.len()).then_some(index)
    }

    fn run_job(&self, index: usize) -> JobOutcome {
        let job = &self.jobs[index];
        let started = Instant::now();
        let result = self
            .resource
            .acquire()
            .and_then(|session| session.render(job, &self.options.timeouts));
        let elapsed = started.elapsed();

        match &result {
            Ok(()) => debug!(
                "rendered {} in {:.2}s",
                job.target_artifact_path.display(),
                elapsed.as_secs_f64()
            ),
            Err(e @ RenderError::Launch { .. }) => {
                error!("{}", e);
                self.stop.store(true, Ordering::SeqCst);
            }
            Err(e) => {
                error!("{}: {}", job.source_document_path.display(), e);
                if self.options.fail_fast {
                    self.stop.store(true, Ordering::SeqCst);
                }
            }
        }
        JobOutcome {
            index,
            job: job.clone(),
            elapsed,
            result,
        }
    }

    fn worker_loop(&self, tx: &Sender<JobOutcome>) {
        while let Some(index) = self.claim() {
            let outcome = self.run_job(index);
            if let Some(cb) = self.on_outcome {
                cb(&outcome);
            }
            if tx.send(outcome).is_err() {
                break;
            }
        }
    }
}

/// Render every job through `resource`, then shut it down.
///
/// - A failed job is logged and recorded; siblings keep going unless `fail_fast`.
/// - A launch failure stops the pool and is returned as-is.
/// - Otherwise any failed job turns the run into [`RenderError::JobsFailed`].
///
/// `on_outcome` is called from worker threads as each job finishes. `cancel` stops new claims.
pub fn render_all<B: RenderBackend>(
    resource: &SharedResource<B>,
    jobs: &[RenderJob],
    options: &RenderOptions,
    cancel: Option<&AtomicBool>,
    on_outcome: Option<&(dyn Fn(&JobOutcome) + Sync)>,
) -> Result<RenderReport, RenderError> {
    let guard = ShutdownGuard::new(resource);
    let concurrency = effective_concurrency(jobs.len(), options.concurrency, RenderLimits::current());
    debug!(
        "rendering {} jobs with {} worker(s) via {}",
        jobs.len(),
        concurrency,
        resource.backend().name()
    );

    let state = PoolState {
        resource,
        jobs,
        options,
        cursor: AtomicUsize::new(0),
        stop: AtomicBool::new(false),
        cancel,
        on_outcome,
    };
    let (tx, rx) = unbounded::<JobOutcome>();
    let mut panicked = 0_usize;

    if concurrency <= 1 {
        state.worker_loop(&tx);
    } else {
        thread::scope(|s| {
            let handles: Vec<_> = (0..concurrency)
                .map(|_| {
                    let tx = tx.clone();
                    let state = &state;
                    s.spawn(move || state.worker_loop(&tx))
                })
                .collect();
            for h in handles {
                if h.join().is_err() {
                    panicked += 1;
                }
            }
        });
    }
    drop(tx);

    let mut outcomes: Vec<JobOutcome> = rx.iter().collect();
    outcomes.sort_by_key(|o| o.index);

    let shutdown = guard.finish();

    if panicked > 0 {
        error!("{} render worker(s) panicked", panicked);
        return Err(RenderError::WorkerPanic);
    }
    if let Some(pos) = outcomes
        .iter()
        .position(|o| matches!(o.result, Err(RenderError::Launch { .. })))
    {
        let outcome = outcomes.swap_remove(pos);
        if let Err(e) = outcome.result {
            return Err(e);
        }
    }
    shutdown?;

    let failed: Vec<&JobOutcome> = outcomes.iter().filter(|o| !o.is_ok()).collect();
    if let Some(first) = failed.first() {
        return Err(RenderError::JobsFailed {
            failed: failed.len(),
            total: jobs.len(),
            first: first.job.source_document_path.clone(),
        });
    }
    Ok(RenderReport {
        outcomes,
        concurrency,
    })
}
