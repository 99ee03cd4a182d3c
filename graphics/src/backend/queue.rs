//! Command queues of the simulated backends.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use parking_lot::Mutex;

use crate::error::{GraphicsError, GraphicsResult, NativeStatus};
use crate::scheduler::{CommandList, CommandQueue, FenceValue, TimelineFence};

/// Queue of an implicitly synchronized device: work completes on submission.
#[derive(Debug, Default)]
pub struct ImplicitQueue {
    fence: TimelineFence,
    signaled: AtomicU64,
    submissions: AtomicU64,
}

impl ImplicitQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn submissions(&self) -> u64 {
        self.submissions.load(Ordering::Acquire)
    }
}

impl CommandQueue for ImplicitQueue {
    fn submit(&self, commands: CommandList) -> GraphicsResult<()> {
        self.submissions.fetch_add(1, Ordering::AcqRel);
        commands.execute();
        Ok(())
    }

    fn signal(&self) -> GraphicsResult<FenceValue> {
        let value = self.signaled.fetch_add(1, Ordering::AcqRel) + 1;
        self.fence.signal(value);
        Ok(value)
    }

    fn completed_value(&self) -> FenceValue {
        self.fence.completed_value()
    }

    fn wait_for(&self, value: FenceValue, timeout: Option<Duration>) -> GraphicsResult<()> {
        if value > self.signaled.load(Ordering::Acquire) {
            return Err(GraphicsError::device("WaitForFence", NativeStatus::InvalidCall));
        }
        if self.fence.wait_timeout(value, timeout) {
            Ok(())
        } else {
            Err(GraphicsError::device("WaitForFence", NativeStatus::Timeout))
        }
    }

    fn wait_idle(&self) -> GraphicsResult<()> {
        Ok(())
    }
}

struct Batch {
    value: FenceValue,
    lists: Vec<CommandList>,
}

#[derive(Default)]
struct QueueState {
    unfenced: Vec<CommandList>,
    in_flight: VecDeque<Batch>,
    signaled: FenceValue,
    submissions: u64,
}

/// Queue of an explicitly synchronized device.
///
/// Submitted lists run only once a fence signal closes their batch. At most
/// `latency` closed batches stay in flight; older ones retire when a new
/// batch closes, and waiting on a value retires every batch up to it.
pub struct SubmissionQueue {
    state: Mutex<QueueState>,
    fence: TimelineFence,
    latency: usize,
}

impl SubmissionQueue {
    pub fn new(latency: u32) -> Self {
        Self {
            state: Mutex::new(QueueState::default()),
            fence: TimelineFence::new(),
            latency: latency as usize,
        }
    }

    pub fn submissions(&self) -> u64 {
        self.state.lock().submissions
    }

    pub fn in_flight(&self) -> usize {
        self.state.lock().in_flight.len()
    }

    fn retire(&self, state: &mut QueueState, until: impl Fn(&Batch, usize) -> bool) {
        while let Some(batch) = state.in_flight.front() {
            if !until(batch, state.in_flight.len()) {
                break;
            }
            if let Some(batch) = state.in_flight.pop_front() {
                for list in batch.lists {
                    list.execute();
                }
                self.fence.signal(batch.value);
            }
        }
    }
}

impl CommandQueue for SubmissionQueue {
    fn submit(&self, commands: CommandList) -> GraphicsResult<()> {
        let mut state = self.state.lock();
        state.submissions += 1;
        state.unfenced.push(commands);
        Ok(())
    }

    fn signal(&self) -> GraphicsResult<FenceValue> {
        let mut state = self.state.lock();
        state.signaled += 1;
        let value = state.signaled;
        let lists = std::mem::take(&mut state.unfenced);
        state.in_flight.push_back(Batch { value, lists });

        let latency = self.latency;
        self.retire(&mut state, |_, in_flight| in_flight > latency);
        Ok(value)
    }

    fn completed_value(&self) -> FenceValue {
        self.fence.completed_value()
    }

    fn wait_for(&self, value: FenceValue, timeout: Option<Duration>) -> GraphicsResult<()> {
        {
            let mut state = self.state.lock();
            if value > state.signaled {
                return Err(GraphicsError::device("WaitForFence", NativeStatus::InvalidCall));
            }
            self.retire(&mut state, |batch, _| batch.value <= value);
        }
        if self.fence.wait_timeout(value, timeout) {
            Ok(())
        } else {
            Err(GraphicsError::device("WaitForFence", NativeStatus::Timeout))
        }
    }

    fn wait_idle(&self) -> GraphicsResult<()> {
        let value = self.signal()?;
        self.wait_for(value, None)
    }
}

impl std::fmt::Debug for SubmissionQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("SubmissionQueue")
            .field("signaled", &state.signaled)
            .field("completed", &self.fence.completed_value())
            .field("in_flight", &state.in_flight.len())
            .finish()
    }
}
