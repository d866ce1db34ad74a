use repobook::RenderJob;
use repobook::render::{
    JobOutcome, RenderBackend, RenderError, RenderOptions, SharedResource, effective_concurrency,
    render_all,
};
use repobook::utils::config::{RenderLimits, RenderTimeouts};
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

/// Instrumented backend: counts launches, teardowns, attempts and concurrent renders.
#[derive(Default)]
struct FakeBackend {
    launches: AtomicUsize,
    teardowns: AtomicUsize,
    attempts: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    rendered: Mutex<Vec<PathBuf>>,
    fail_sources: HashSet<PathBuf>,
    launch_fails: bool,
    launch_delay: Duration,
    render_delay: Duration,
}

impl RenderBackend for FakeBackend {
    type Resource = usize;

    fn name(&self) -> &'static str {
        "fake"
    }

    fn launch(&self) -> Result<usize, RenderError> {
        thread::sleep(self.launch_delay);
        let n = self.launches.fetch_add(1, Ordering::SeqCst);
        if self.launch_fails {
            return Err(RenderError::Launch {
                backend: "fake",
                message: "no runtime".to_string(),
            });
        }
        Ok(n)
    }

    fn render(
        &self,
        _resource: &usize,
        job: &RenderJob,
        timeouts: &RenderTimeouts,
    ) -> Result<(), RenderError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        thread::sleep(self.render_delay);
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.fail_sources.contains(&job.source_document_path) {
            return Err(RenderError::Timeout {
                source_path: job.source_document_path.clone(),
                timeout: timeouts.artifact,
            });
        }
        self.rendered
            .lock()
            .unwrap()
            .push(job.target_artifact_path.clone());
        Ok(())
    }

    fn teardown(&self, _resource: &usize) -> Result<(), RenderError> {
        self.teardowns.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

fn jobs(n: usize) -> Vec<RenderJob> {
    (0..n)
        .map(|i| RenderJob {
            source_document_path: PathBuf::from(format!("book-{i}.html")),
            target_artifact_path: PathBuf::from(format!("book-{i}.pdf")),
        })
        .collect()
}

fn options(concurrency: Option<usize>) -> RenderOptions {
    RenderOptions {
        concurrency,
        ..Default::default()
    }
}

// --- concurrency policy ---

#[test]
fn single_job_always_gets_one_worker() {
    let limits = RenderLimits {
        all_threads: 16,
        default_max: 4,
    };
    assert_eq!(effective_concurrency(1, Some(8), limits), 1);
    assert_eq!(effective_concurrency(1, None, limits), 1);
}

#[test]
fn positive_hint_is_capped_at_job_count() {
    let limits = RenderLimits {
        all_threads: 2,
        default_max: 4,
    };
    assert_eq!(effective_concurrency(10, Some(6), limits), 6);
    assert_eq!(effective_concurrency(3, Some(6), limits), 3);
}

#[test]
fn default_policy_is_min_of_four_threads_and_jobs() {
    let many = RenderLimits {
        all_threads: 32,
        default_max: 4,
    };
    let few = RenderLimits {
        all_threads: 2,
        default_max: 4,
    };
    assert_eq!(effective_concurrency(10, None, many), 4);
    assert_eq!(effective_concurrency(10, Some(0), many), 4);
    assert_eq!(effective_concurrency(10, None, few), 2);
    assert_eq!(effective_concurrency(3, None, many), 3);
}

// --- pool ---

#[test]
fn in_flight_never_exceeds_concurrency_and_every_job_runs_once() {
    let shared = SharedResource::new(FakeBackend {
        render_delay: Duration::from_millis(20),
        ..Default::default()
    });
    let jobs = jobs(12);

    let report = render_all(&shared, &jobs, &options(Some(3)), None, None).unwrap();

    let backend = shared.backend();
    assert_eq!(report.concurrency, 3);
    assert!(backend.max_in_flight.load(Ordering::SeqCst) <= 3);
    assert_eq!(backend.attempts.load(Ordering::SeqCst), 12);
    let rendered: HashSet<PathBuf> = backend.rendered.lock().unwrap().iter().cloned().collect();
    assert_eq!(rendered.len(), 12);
    assert_eq!(report.outcomes.len(), 12);
    assert!(report.outcomes.windows(2).all(|w| w[0].index < w[1].index));
}

#[test]
fn resource_is_launched_once_and_torn_down_once() {
    let shared = SharedResource::new(FakeBackend {
        launch_delay: Duration::from_millis(30),
        ..Default::default()
    });
    render_all(&shared, &jobs(8), &options(Some(4)), None, None).unwrap();

    assert_eq!(shared.backend().launches.load(Ordering::SeqCst), 1);
    assert_eq!(shared.backend().teardowns.load(Ordering::SeqCst), 1);
    assert!(!shared.is_launched());
}

#[test]
fn single_job_runs_inline() {
    let shared = SharedResource::new(FakeBackend::default());
    let report = render_all(&shared, &jobs(1), &options(Some(8)), None, None).unwrap();
    assert_eq!(report.concurrency, 1);
    assert_eq!(report.succeeded(), 1);
}

#[test]
fn empty_job_list_never_launches() {
    let shared = SharedResource::new(FakeBackend::default());
    let report = render_all(&shared, &[], &options(None), None, None).unwrap();
    assert!(report.outcomes.is_empty());
    assert_eq!(shared.backend().launches.load(Ordering::SeqCst), 0);
    assert_eq!(shared.backend().teardowns.load(Ordering::SeqCst), 0);
}

#[test]
fn failed_job_does_not_stop_siblings() {
    let jobs = jobs(6);
    let shared = SharedResource::new(FakeBackend {
        fail_sources: [jobs[2].source_document_path.clone()].into_iter().collect(),
        ..Default::default()
    });

    let err = render_all(&shared, &jobs, &options(Some(2)), None, None).unwrap_err();

    match err {
        RenderError::JobsFailed {
            failed,
            total,
            first,
        } => {
            assert_eq!(failed, 1);
            assert_eq!(total, 6);
            assert_eq!(first, PathBuf::from("book-2.html"));
        }
        other => panic!("unexpected error: {other}"),
    }
    let backend = shared.backend();
    assert_eq!(backend.attempts.load(Ordering::SeqCst), 6);
    assert_eq!(backend.rendered.lock().unwrap().len(), 5);
    assert_eq!(backend.teardowns.load(Ordering::SeqCst), 1);
}

#[test]
fn fail_fast_stops_claiming_new_jobs() {
    let jobs = jobs(5);
    let shared = SharedResource::new(FakeBackend {
        fail_sources: [jobs[0].source_document_path.clone()].into_iter().collect(),
        ..Default::default()
    });
    let opts = RenderOptions {
        concurrency: Some(1),
        fail_fast: true,
        ..Default::default()
    };

    let err = render_all(&shared, &jobs, &opts, None, None).unwrap_err();

    assert!(matches!(err, RenderError::JobsFailed { failed: 1, .. }));
    assert_eq!(shared.backend().attempts.load(Ordering::SeqCst), 1);
    assert_eq!(shared.backend().teardowns.load(Ordering::SeqCst), 1);
}

#[test]
fn launch_failure_is_fatal_and_renders_nothing() {
    let shared = SharedResource::new(FakeBackend {
        launch_fails: true,
        ..Default::default()
    });

    let err = render_all(&shared, &jobs(4), &options(Some(1)), None, None).unwrap_err();

    assert!(matches!(err, RenderError::Launch { .. }));
    let backend = shared.backend();
    assert_eq!(backend.launches.load(Ordering::SeqCst), 1);
    assert_eq!(backend.attempts.load(Ordering::SeqCst), 0);
    assert_eq!(backend.teardowns.load(Ordering::SeqCst), 0);
}

#[test]
fn cancel_before_start_claims_nothing() {
    let shared = SharedResource::new(FakeBackend::default());
    let cancel = AtomicBool::new(true);
    let report = render_all(&shared, &jobs(3), &options(Some(2)), Some(&cancel), None).unwrap();
    assert!(report.outcomes.is_empty());
    assert_eq!(shared.backend().launches.load(Ordering::SeqCst), 0);
}

#[test]
fn on_outcome_sees_every_job() {
    let shared = SharedResource::new(FakeBackend::default());
    let seen = Mutex::new(Vec::new());
    {
        let on_outcome = |o: &JobOutcome| seen.lock().unwrap().push(o.index);
        let on_outcome: &(dyn Fn(&JobOutcome) + Sync) = &on_outcome;
        render_all(&shared, &jobs(7), &options(Some(3)), None, Some(on_outcome)).unwrap();
    }

    let mut seen = seen.into_inner().unwrap();
    seen.sort_unstable();
    assert_eq!(seen, (0..7).collect::<Vec<_>>());
}

// --- shared resource ---

#[test]
fn concurrent_first_use_launches_once() {
    let shared = Arc::new(SharedResource::new(FakeBackend {
        launch_delay: Duration::from_millis(50),
        ..Default::default()
    }));
    let handles: Vec<_> = (0..8)
        .map(|_| {
            let shared = Arc::clone(&shared);
            thread::spawn(move || {
                let session = shared.acquire().unwrap();
                shared.release(session);
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }
    assert_eq!(shared.backend().launches.load(Ordering::SeqCst), 1);
    assert!(shared.is_launched());
}

#[test]
fn shutdown_is_idempotent() {
    let shared = SharedResource::new(FakeBackend::default());
    let session = shared.acquire().unwrap();
    drop(session);
    shared.shutdown().unwrap();
    shared.shutdown().unwrap();
    assert_eq!(shared.backend().teardowns.load(Ordering::SeqCst), 1);
}

#[test]
fn failed_launch_is_not_cached() {
    let shared = SharedResource::new(FakeBackend {
        launch_fails: true,
        ..Default::default()
    });
    assert!(shared.acquire().is_err());
    assert!(shared.acquire().is_err());
    assert_eq!(shared.backend().launches.load(Ordering::SeqCst), 2);
    assert!(!shared.is_launched());
}
