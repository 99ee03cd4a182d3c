//! CPU-GPU synchronization primitives.
//!
//! A [`CommandQueue`] accepts recorded command lists and orders them with
//! monotonically increasing fence values. The CPU waits on a value with
//! [`CommandQueue::wait_for`] before reusing resources the GPU may still read.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use super::commands::CommandList;
use crate::error::GraphicsResult;

/// Monotonically increasing marker of submitted work. `0` means "nothing".
pub type FenceValue = u64;

/// Submission endpoint of a device.
pub trait CommandQueue: Send + Sync {
    /// Queue a command list for execution.
    fn submit(&self, commands: CommandList) -> GraphicsResult<()>;

    /// Enqueue a fence signal after all previously submitted work.
    fn signal(&self) -> GraphicsResult<FenceValue>;

    /// Highest fence value the device has completed.
    fn completed_value(&self) -> FenceValue;

    /// Block until `value` is completed, or the timeout elapses.
    fn wait_for(&self, value: FenceValue, timeout: Option<Duration>) -> GraphicsResult<()>;

    /// Block until every submitted batch is complete.
    fn wait_idle(&self) -> GraphicsResult<()>;
}

/// Timeline fence: a completed value that only moves forward.
#[derive(Debug, Default)]
pub struct TimelineFence {
    completed: Arc<AtomicU64>,
}

impl TimelineFence {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn completed_value(&self) -> FenceValue {
        self.completed.load(Ordering::Acquire)
    }

    pub fn is_reached(&self, value: FenceValue) -> bool {
        self.completed_value() >= value
    }

    /// Advance to `value`. Lower values are ignored.
    pub fn signal(&self, value: FenceValue) {
        self.completed.fetch_max(value, Ordering::AcqRel);
    }

    /// Spin until `value` is reached.
    ///
    /// Returns `true` if the value was reached, `false` if the timeout elapsed.
    pub fn wait_timeout(&self, value: FenceValue, timeout: Option<Duration>) -> bool {
        let start = Instant::now();
        while !self.is_reached(value) {
            if let Some(timeout) = timeout {
                if start.elapsed() >= timeout {
                    return false;
                }
            }
            std::hint::spin_loop();
        }
        true
    }
}

impl Clone for TimelineFence {
    fn clone(&self) -> Self {
        Self {
            completed: Arc::clone(&self.completed),
        }
    }
}
