//! Command submission and frame scheduling.
//!
//! | Type | Purpose |
//! |------|---------|
//! | [`CommandList`] | Recorded device operations |
//! | [`CommandQueue`] | Submission endpoint with timeline fences |
//! | [`FrameScheduler`] | Presentation ring, one fence value per slot |
//!
//! Backends provide the queue. A render context owns one
//! [`FrameScheduler`] over its backend's queue and drives it once per
//! presented frame.

mod commands;
mod frame;
mod sync;

pub use commands::{Command, CommandList};
pub use frame::{FrameReport, FrameScheduler, SlotWait, BUFFER_COUNTS};
pub use sync::{CommandQueue, FenceValue, TimelineFence};
