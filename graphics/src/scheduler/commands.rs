//! Recorded device commands.

use std::fmt;
use std::ops::Range;
use std::sync::Arc;

use crate::backend::{Allocation, CopySpan};

/// One recorded device operation.
pub enum Command {
    /// Scatter `data` into `target` along `spans`.
    Copy {
        target: Arc<Allocation>,
        spans: Vec<CopySpan>,
        data: Vec<u8>,
    },
    /// Repeat `pattern` over `range` of `target`.
    Fill {
        target: Arc<Allocation>,
        range: Range<usize>,
        pattern: Vec<u8>,
    },
    /// Hand a presentation buffer to the display.
    Present { buffer: u64, swap_interval: u32 },
}

impl Command {
    pub fn execute(self) {
        match self {
            Self::Copy {
                target,
                spans,
                data,
            } => target.copy_spans(&spans, &data),
            Self::Fill {
                target,
                range,
                pattern,
            } => target.fill(range, &pattern),
            Self::Present {
                buffer,
                swap_interval,
            } => {
                log::trace!("Present buffer {buffer} (swap interval {swap_interval})");
            }
        }
    }
}

impl fmt::Debug for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Copy { spans, data, .. } => f
                .debug_struct("Command::Copy")
                .field("spans", &spans.len())
                .field("bytes", &data.len())
                .finish_non_exhaustive(),
            Self::Fill { range, pattern, .. } => f
                .debug_struct("Command::Fill")
                .field("range", range)
                .field("pattern", pattern)
                .finish_non_exhaustive(),
            Self::Present {
                buffer,
                swap_interval,
            } => f
                .debug_struct("Command::Present")
                .field("buffer", buffer)
                .field("swap_interval", swap_interval)
                .finish(),
        }
    }
}

/// Ordered batch of commands submitted as a unit.
#[derive(Debug, Default)]
pub struct CommandList {
    commands: Vec<Command>,
}

impl CommandList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, command: Command) {
        self.commands.push(command);
    }

    pub fn append(&mut self, other: &mut CommandList) {
        self.commands.append(&mut other.commands);
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    /// Run every command in recording order.
    pub fn execute(self) {
        for command in self.commands {
            command.execute();
        }
    }
}
