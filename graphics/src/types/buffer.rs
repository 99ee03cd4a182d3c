//! Buffer descriptors and buffer array roles.

use bitflags::bitflags;

bitflags! {
    /// Roles a buffer may be bound in.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct BufferUsage: u32 {
        const VERTEX = 1 << 0;
        const INDEX = 1 << 1;
        /// Constant (uniform) block; limited by `max_constant_buffer_size`.
        const CONSTANT = 1 << 2;
        const STORAGE = 1 << 3;
        const STREAM_OUTPUT = 1 << 4;
        const INDIRECT = 1 << 5;
        const COPY_SRC = 1 << 6;
        const COPY_DST = 1 << 7;
        /// Content is rewritten from the CPU every frame.
        const DYNAMIC = 1 << 8;
    }
}

/// Descriptor of a device buffer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct BufferDescriptor {
    pub label: Option<String>,
    /// Size in bytes; never zero.
    pub size: u64,
    pub usage: BufferUsage,
}

impl BufferDescriptor {
    pub fn new(size: u64, usage: BufferUsage) -> Self {
        Self {
            label: None,
            size,
            usage,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }
}

/// Role shared by every buffer of a buffer array.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BufferArrayKind {
    Vertex,
    Constant,
    Storage,
    StreamOutput,
}

impl BufferArrayKind {
    pub fn required_usage(&self) -> BufferUsage {
        match self {
            Self::Vertex => BufferUsage::VERTEX,
            Self::Constant => BufferUsage::CONSTANT,
            Self::Storage => BufferUsage::STORAGE,
            Self::StreamOutput => BufferUsage::STREAM_OUTPUT,
        }
    }
}
