//! Host-side device memory shared by the simulated backends.
//!
//! Each native resource owns an [`Allocation`]. Allocations are accounted
//! against a [`MemoryTracker`] budget and return their bytes when the last
//! reference drops, so reference-counted backends release memory only after
//! pending commands are done with it.

use std::ops::Range;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, MutexGuard};

use crate::error::{GraphicsError, GraphicsResult, NativeStatus};

/// Byte-budget accounting for one device.
#[derive(Debug)]
pub struct MemoryTracker {
    budget: Option<u64>,
    used: AtomicU64,
    peak: AtomicU64,
}

impl MemoryTracker {
    pub fn new(budget: Option<u64>) -> Arc<Self> {
        Arc::new(Self {
            budget,
            used: AtomicU64::new(0),
            peak: AtomicU64::new(0),
        })
    }

    pub fn used(&self) -> u64 {
        self.used.load(Ordering::Acquire)
    }

    pub fn peak(&self) -> u64 {
        self.peak.load(Ordering::Acquire)
    }

    pub fn budget(&self) -> Option<u64> {
        self.budget
    }

    /// Fail with `OutOfMemory` if `size` more bytes would exceed the budget.
    ///
    /// Nothing is reserved; a later [`allocate`](Self::allocate) checks again.
    pub fn ensure_available(&self, size: u64, operation: &'static str) -> GraphicsResult<()> {
        let Some(budget) = self.budget else {
            return Ok(());
        };
        let used = self.used();
        if used.saturating_add(size) > budget {
            log::trace!("{operation}: {size} bytes exceeds budget ({used}/{budget} used)");
            return Err(GraphicsError::device(operation, NativeStatus::OutOfMemory));
        }
        Ok(())
    }

    /// Reserve `size` zeroed bytes, failing with `OutOfMemory` above budget.
    pub fn allocate(
        self: &Arc<Self>,
        size: u64,
        operation: &'static str,
    ) -> GraphicsResult<Arc<Allocation>> {
        let mut current = self.used.load(Ordering::Acquire);
        loop {
            let next = current.saturating_add(size);
            if let Some(budget) = self.budget {
                if next > budget {
                    log::trace!("{operation}: {size} bytes exceeds budget ({current}/{budget} used)");
                    return Err(GraphicsError::device(operation, NativeStatus::OutOfMemory));
                }
            }
            match self
                .used
                .compare_exchange_weak(current, next, Ordering::AcqRel, Ordering::Acquire)
            {
                Ok(_) => {
                    self.peak.fetch_max(next, Ordering::AcqRel);
                    break;
                }
                Err(actual) => current = actual,
            }
        }

        let bytes = match zeroed(size) {
            Some(bytes) => bytes,
            None => {
                self.free(size);
                log::trace!("{operation}: host cannot back {size} bytes");
                return Err(GraphicsError::device(operation, NativeStatus::OutOfMemory));
            }
        };
        Ok(Arc::new(Allocation {
            bytes: Mutex::new(bytes),
            size,
            tracker: Arc::clone(self),
        }))
    }

    fn free(&self, size: u64) {
        self.used.fetch_sub(size, Ordering::AcqRel);
    }
}

fn zeroed(size: u64) -> Option<Vec<u8>> {
    let len = usize::try_from(size).ok()?;
    let mut bytes = Vec::new();
    bytes.try_reserve_exact(len).ok()?;
    bytes.resize(len, 0);
    Some(bytes)
}

/// Contiguous copy from a packed source into an allocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CopySpan {
    pub dst: usize,
    pub src: usize,
    pub len: usize,
}

/// Native memory block of one resource.
#[derive(Debug)]
pub struct Allocation {
    bytes: Mutex<Vec<u8>>,
    size: u64,
    tracker: Arc<MemoryTracker>,
}

impl Allocation {
    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn lock(&self) -> MutexGuard<'_, Vec<u8>> {
        self.bytes.lock()
    }

    pub fn write(&self, offset: usize, data: &[u8]) {
        self.lock()[offset..offset + data.len()].copy_from_slice(data);
    }

    pub fn read(&self, range: Range<usize>) -> Vec<u8> {
        self.lock()[range].to_vec()
    }

    pub fn copy_spans(&self, spans: &[CopySpan], data: &[u8]) {
        let mut bytes = self.lock();
        for span in spans {
            bytes[span.dst..span.dst + span.len].copy_from_slice(&data[span.src..span.src + span.len]);
        }
    }

    pub fn fill(&self, range: Range<usize>, pattern: &[u8]) {
        if pattern.is_empty() {
            return;
        }
        let mut bytes = self.lock();
        for chunk in bytes[range].chunks_mut(pattern.len()) {
            chunk.copy_from_slice(&pattern[..chunk.len()]);
        }
    }
}

impl Drop for Allocation {
    fn drop(&mut self) {
        self.tracker.free(self.size);
    }
}
