//! The shared renderer: one expensive resource per run, launched lazily and torn down once.
//!
//! [`SharedResource`] is the handle injected into the pool. The first [`acquire`](SharedResource::acquire)
//! launches the backend while holding the slot lock, so concurrent first use sees one launch. Every
//! job gets its own [`Session`]; [`shutdown`](SharedResource::shutdown) tears the resource down and
//! leaves the slot empty.

use log::{debug, warn};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use super::error::RenderError;
use crate::RenderJob;
use crate::utils::config::RenderTimeouts;

/// An external renderer. Implementations must be cheap to share across worker threads.
pub trait RenderBackend: Send + Sync {
    /// Long-lived handle (located binary, browser profile, ...).
    type Resource: Send + Sync;

    fn name(&self) -> &'static str;

    /// Create the shared resource. Called at most once per launch cycle.
    fn launch(&self) -> Result<Self::Resource, RenderError>;

    /// Convert `job.source_document_path` into `job.target_artifact_path` using a fresh session.
    fn render(
        &self,
        resource: &Self::Resource,
        job: &RenderJob,
        timeouts: &RenderTimeouts,
    ) -> Result<(), RenderError>;

    /// Release what `launch` created. Called exactly once per successful launch.
    fn teardown(&self, resource: &Self::Resource) -> Result<(), RenderError>;
}

enum Slot<R> {
    Empty,
    Ready(Arc<R>),
}

/// Lazily launched, single-flight, teardown-once wrapper around a [`RenderBackend`].
pub struct SharedResource<B: RenderBackend> {
    backend: B,
    slot: Mutex<Slot<B::Resource>>,
}

impl<B: RenderBackend> SharedResource<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            slot: Mutex::new(Slot::Empty),
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    fn lock(&self) -> MutexGuard<'_, Slot<B::Resource>> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn is_launched(&self) -> bool {
        matches!(*self.lock(), Slot::Ready(_))
    }

    /// Open a session, launching the resource on first use. A failed launch is not cached.
    pub fn acquire(&self) -> Result<Session<'_, B>, RenderError> {
        let mut slot = self.lock();
        if let Slot::Ready(resource) = &*slot {
            return Ok(Session {
                backend: &self.backend,
                resource: Arc::clone(resource),
            });
        }
        debug!("launching {}", self.backend.name());
        let resource = Arc::new(self.backend.launch()?);
        *slot = Slot::Ready(Arc::clone(&resource));
        Ok(Session {
            backend: &self.backend,
            resource,
        })
    }

    /// End a session explicitly. Dropping it does the same.
    pub fn release(&self, session: Session<'_, B>) {
        drop(session);
    }

    /// Tear the resource down if it was launched. Safe to call repeatedly; only the first call after a
    /// launch reaches the backend.
    pub fn shutdown(&self) -> Result<(), RenderError> {
        let taken = std::mem::replace(&mut *self.lock(), Slot::Empty);
        match taken {
            Slot::Empty => Ok(()),
            Slot::Ready(resource) => {
                if Arc::strong_count(&resource) > 1 {
                    warn!(
                        "{}: shutting down with {} sessions still open",
                        self.backend.name(),
                        Arc::strong_count(&resource) - 1
                    );
                }
                debug!("tearing down {}", self.backend.name());
                self.backend.teardown(&resource)
            }
        }
    }
}

/// One job's view of the shared resource.
pub struct Session<'a, B: RenderBackend> {
    backend: &'a B,
    resource: Arc<B::Resource>,
}

impl<B: RenderBackend> Session<'_, B> {
    pub fn render(&self, job: &RenderJob, timeouts: &RenderTimeouts) -> Result<(), RenderError> {
        self.backend.render(&self.resource, job, timeouts)
    }
}

/// Calls [`SharedResource::shutdown`] on drop, so teardown also runs on early return and unwinding.
pub(crate) struct ShutdownGuard<'a, B: RenderBackend> {
    resource: &'a SharedResource<B>,
}

impl<'a, B: RenderBackend> ShutdownGuard<'a, B> {
    pub(crate) fn new(resource: &'a SharedResource<B>) -> Self {
        Self { resource }
    }

    /// Shut down now and report the result. The drop that follows is a no-op.
    pub(crate) fn finish(self) -> Result<(), RenderError> {
        self.resource.shutdown()
    }
}

impl<B: RenderBackend> Drop for ShutdownGuard<'_, B> {
    fn drop(&mut self) {
        if let Err(e) = self.resource.shutdown() {
            warn!("{}: teardown failed: {}", self.resource.backend.name(), e);
        }
    }
}
