//! Presentation ring with fence-bounded pipelining.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use super::commands::CommandList;
use super::sync::{CommandQueue, FenceValue};
use crate::error::{GraphicsError, GraphicsResult};

/// Ring sizes a scheduler accepts.
pub const BUFFER_COUNTS: std::ops::RangeInclusive<usize> = 2..=3;

/// What happened during one [`FrameScheduler::present`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameReport {
    /// 1-based count of presents since creation or the last reconfigure.
    pub frame: u64,
    /// Ring slot used by this present.
    pub slot: usize,
    /// Fence value recorded by the previous use of `slot`, if any.
    pub waited_on: Option<FenceValue>,
    /// Whether the wait actually had to block.
    pub blocked: bool,
    /// Fence value recorded for `slot` by this present.
    pub fence_value: FenceValue,
}

/// Outcome of waiting for the current slot, consumed by
/// [`FrameScheduler::submit`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotWait {
    slot: usize,
    waited_on: Option<FenceValue>,
    blocked: bool,
}

/// Cycles a ring of N presentation buffers.
///
/// Each slot remembers the fence value signaled after its last submission.
/// Before a slot is reused, N presents later, the CPU waits for that value,
/// so at most N - 1 frames are queued ahead of the device.
///
/// ```text
/// buffer_count = 3
///
/// Slot 0: [present 1] ──────────────► [wait F1, present 4] ──►
/// Slot 1:      [present 2] ──────────────► [wait F2, present 5] ──►
/// Slot 2:           [present 3] ──────────────► [wait F3, present 6] ──►
/// ```
///
/// # Thread Safety
///
/// Owned by one render context and driven by its caller. No internal
/// locking.
pub struct FrameScheduler {
    queue: Arc<dyn CommandQueue>,
    /// Last fence value per slot; `0` for a slot that was never submitted.
    fence_values: Vec<FenceValue>,
    current: usize,
    frame_count: u64,
    timeout: Option<Duration>,
}

impl FrameScheduler {
    /// Create a scheduler over `buffer_count` slots (2 or 3).
    pub fn new(queue: Arc<dyn CommandQueue>, buffer_count: usize) -> GraphicsResult<Self> {
        check_buffer_count(buffer_count)?;
        Ok(Self {
            queue,
            fence_values: vec![0; buffer_count],
            current: 0,
            frame_count: 0,
            timeout: None,
        })
    }

    /// Bound every fence wait; an elapsed wait fails with a timeout status.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn buffer_count(&self) -> usize {
        self.fence_values.len()
    }

    /// Slot the next present will use.
    pub fn current_index(&self) -> usize {
        self.current
    }

    pub fn fence_value(&self, slot: usize) -> Option<FenceValue> {
        self.fence_values.get(slot).copied().filter(|value| *value != 0)
    }

    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// Submit one frame and advance the ring.
    ///
    /// Blocks while the device has not completed the work last submitted
    /// from the current slot.
    pub fn present(&mut self, commands: CommandList) -> GraphicsResult<FrameReport> {
        let wait = self.wait_for_slot()?;
        self.submit(wait, commands)
    }

    /// Wait until the current slot may be reused. The ring does not move.
    pub fn wait_for_slot(&self) -> GraphicsResult<SlotWait> {
        let slot = self.current;
        let waited_on = self.fence_value(slot);
        let mut blocked = false;
        if let Some(value) = waited_on {
            blocked = self.queue.completed_value() < value;
            if blocked {
                log::trace!("FrameScheduler: slot {slot} waits for fence {value}");
            }
            self.queue.wait_for(value, self.timeout)?;
        }
        Ok(SlotWait {
            slot,
            waited_on,
            blocked,
        })
    }

    /// Submit a frame into the slot `wait` cleared and advance the ring.
    pub fn submit(&mut self, wait: SlotWait, commands: CommandList) -> GraphicsResult<FrameReport> {
        let SlotWait {
            slot,
            waited_on,
            blocked,
        } = wait;
        if slot != self.current {
            return Err(GraphicsError::invalid(format!(
                "slot {slot} was waited for, the ring is at {}",
                self.current
            )));
        }

        self.queue.submit(commands)?;
        let fence_value = self.queue.signal()?;
        self.fence_values[slot] = fence_value;
        self.current = (slot + 1) % self.fence_values.len();
        self.frame_count += 1;

        log::trace!(
            "FrameScheduler: presented frame {} (slot {slot}, fence {fence_value})",
            self.frame_count
        );
        Ok(FrameReport {
            frame: self.frame_count,
            slot,
            waited_on,
            blocked,
            fence_value,
        })
    }

    /// Wait until every submitted frame has completed.
    pub fn wait_idle(&self) -> GraphicsResult<()> {
        self.queue.wait_idle()
    }

    /// Drain the queue and restart the ring with `buffer_count` slots.
    pub fn reconfigure(&mut self, buffer_count: usize) -> GraphicsResult<()> {
        check_buffer_count(buffer_count)?;
        self.wait_idle()?;
        log::debug!(
            "FrameScheduler: reconfigured from {} to {buffer_count} buffers",
            self.fence_values.len()
        );
        self.fence_values = vec![0; buffer_count];
        self.current = 0;
        self.frame_count = 0;
        Ok(())
    }
}

impl fmt::Debug for FrameScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FrameScheduler")
            .field("fence_values", &self.fence_values)
            .field("current", &self.current)
            .field("frame_count", &self.frame_count)
            .field("timeout", &self.timeout)
            .finish()
    }
}

fn check_buffer_count(buffer_count: usize) -> GraphicsResult<()> {
    if !BUFFER_COUNTS.contains(&buffer_count) {
        return Err(GraphicsError::invalid(format!(
            "presentation ring needs 2 or 3 buffers, got {buffer_count}"
        )));
    }
    Ok(())
}
