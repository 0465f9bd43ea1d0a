use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, OnceLock};

use crate::assets::PixelBuffer;

type Job = Box<dyn Fn() -> PixelBuffer + Send + Sync>;

struct Inner {
    buffer: OnceLock<Arc<PixelBuffer>>,
    job: Job,
    runs: AtomicU32,
}

/// Deferred, memoized pixel computation handed to the host's texture registrar.
///
/// The job runs on the first [`LazyPixelProducer::produce`] call; every later call (from any
/// clone, on any thread) returns the same buffer.
#[derive(Clone)]
pub struct LazyPixelProducer(Arc<Inner>);

impl LazyPixelProducer {
    pub fn new(job: impl Fn() -> PixelBuffer + Send + Sync + 'static) -> Self {
        Self(Arc::new(Inner {
            buffer: OnceLock::new(),
            job: Box::new(job),
            runs: AtomicU32::new(0),
        }))
    }

    pub fn produce(&self) -> Arc<PixelBuffer> {
        let inner = &self.0;
        Arc::clone(inner.buffer.get_or_init(|| {
            inner.runs.fetch_add(1, Ordering::Relaxed);
            Arc::new((inner.job)())
        }))
    }

    pub fn is_resolved(&self) -> bool {
        self.0.buffer.get().is_some()
    }

    /// How many times the job actually ran (0 or 1).
    pub fn run_count(&self) -> u32 {
        self.0.runs.load(Ordering::Relaxed)
    }

    pub fn same_producer(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for LazyPixelProducer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LazyPixelProducer")
            .field("ptr", &Arc::as_ptr(&self.0))
            .field("resolved", &self.is_resolved())
            .finish()
    }
}
