use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};

use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::trace;

use crate::error::GateClosed;

/// Counting admission gate bounding the number of in-flight tasks.
///
/// Wraps a tokio [`Semaphore`] and mirrors its usage in an atomic counter so
/// observers can read the active count without touching the semaphore. The
/// mirror is decremented before the semaphore unit is returned, therefore
/// `in_use() <= capacity()` holds at every instant.
#[derive(Clone)]
pub struct AdmissionGate {
    inner: Arc<GateInner>,
}

struct GateInner {
    semaphore: Arc<Semaphore>,
    capacity: usize,
    in_use: AtomicUsize,
    peak: AtomicUsize,
}

impl AdmissionGate {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Arc::new(GateInner {
                semaphore: Arc::new(Semaphore::new(capacity)),
                capacity,
                in_use: AtomicUsize::new(0),
                peak: AtomicUsize::new(0),
            }),
        }
    }

    /// Wait for a free unit. Waiters are served in FIFO order.
    pub async fn acquire(&self) -> Result<AdmissionPermit, GateClosed> {
        let permit = Arc::clone(&self.inner.semaphore)
            .acquire_owned()
            .await
            .map_err(|_| GateClosed)?;
        Ok(self.admit(permit))
    }

    /// Take a unit only if one is free right now.
    pub fn try_acquire(&self) -> Option<AdmissionPermit> {
        Arc::clone(&self.inner.semaphore)
            .try_acquire_owned()
            .ok()
            .map(|permit| self.admit(permit))
    }

    /// Refuse all pending and future acquisitions. Held permits stay valid.
    pub fn close(&self) {
        self.inner.semaphore.close();
    }

    #[inline]
    pub fn is_closed(&self) -> bool {
        self.inner.semaphore.is_closed()
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.inner.capacity
    }

    /// Units currently held.
    #[inline]
    pub fn in_use(&self) -> usize {
        self.inner.in_use.load(Ordering::Acquire)
    }

    /// Units free to take without waiting.
    #[inline]
    pub fn available(&self) -> usize {
        self.inner.semaphore.available_permits()
    }

    /// Highest `in_use` value since the gate was created.
    #[inline]
    pub fn peak(&self) -> usize {
        self.inner.peak.load(Ordering::Acquire)
    }

    fn admit(&self, permit: OwnedSemaphorePermit) -> AdmissionPermit {
        let now = self.inner.in_use.fetch_add(1, Ordering::AcqRel) + 1;
        debug_assert!(now <= self.inner.capacity, "gate over-admitted: {now}");
        self.inner.peak.fetch_max(now, Ordering::AcqRel);
        trace!(in_use = now, capacity = self.inner.capacity, "admitted");

        AdmissionPermit {
            gate: Arc::clone(&self.inner),
            _permit: permit,
        }
    }
}

/// One admission unit. Returned to the gate on drop, including on panic unwind.
pub struct AdmissionPermit {
    gate: Arc<GateInner>,
    _permit: OwnedSemaphorePermit,
}

impl Drop for AdmissionPermit {
    fn drop(&mut self) {
        // Runs before `_permit` is dropped, i.e. before the unit is handed on.
        let prev = self.gate.in_use.fetch_sub(1, Ordering::AcqRel);
        debug_assert!(prev > 0, "gate released more than admitted");
    }
}
