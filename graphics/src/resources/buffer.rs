//! Buffers and buffer arrays.

use crate::backend::NativeBuffer;
use crate::capabilities::{CapabilityGate, Feature};
use crate::error::{GraphicsError, GraphicsResult};
use crate::registry::{Handle, ObjectStore};
use crate::types::{BufferArrayKind, BufferDescriptor};

/// A device memory buffer.
///
/// Buffers are created by [`GraphicsDevice::create_buffer`](crate::GraphicsDevice::create_buffer).
///
/// # Example
///
/// ```ignore
/// let buffer = device.create_buffer(&BufferDescriptor::new(1024, BufferUsage::VERTEX), None)?;
/// println!("Buffer size: {}", device.buffer(buffer)?.size());
/// ```
pub struct Buffer {
    descriptor: BufferDescriptor,
    native: NativeBuffer,
}

impl Buffer {
    pub(crate) fn new(descriptor: BufferDescriptor, native: NativeBuffer) -> Self {
        Self { descriptor, native }
    }

    pub fn descriptor(&self) -> &BufferDescriptor {
        &self.descriptor
    }

    /// Get the buffer size in bytes.
    pub fn size(&self) -> u64 {
        self.descriptor.size
    }

    pub fn label(&self) -> Option<&str> {
        self.descriptor.label.as_deref()
    }

    pub(crate) fn native(&self) -> &NativeBuffer {
        &self.native
    }

    pub(crate) fn into_native(self) -> NativeBuffer {
        self.native
    }
}

impl std::fmt::Debug for Buffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Buffer")
            .field("size", &self.descriptor.size)
            .field("usage", &self.descriptor.usage)
            .field("label", &self.descriptor.label)
            .finish()
    }
}

static_assertions::assert_impl_all!(Buffer: Send, Sync);

/// Buffers of one role bound as a group.
///
/// The array holds handles only; releasing a member buffer is detected the
/// next time the array is resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BufferArray {
    kind: BufferArrayKind,
    buffers: Vec<Handle<Buffer>>,
}

impl BufferArray {
    /// Validate `buffers` against `store` and group them.
    pub(crate) fn new(
        kind: BufferArrayKind,
        buffers: &[Handle<Buffer>],
        store: &ObjectStore<Buffer>,
        gate: &CapabilityGate,
    ) -> GraphicsResult<Self> {
        if kind == BufferArrayKind::StreamOutput {
            gate.assert(Feature::StreamOutput, "CreateBufferArray")?;
        }
        if buffers.is_empty() {
            return Err(GraphicsError::invalid("buffer array needs at least one buffer"));
        }
        let required = kind.required_usage();
        for handle in buffers {
            let buffer = store.get(*handle)?;
            if !buffer.descriptor.usage.contains(required) {
                return Err(GraphicsError::invalid(format!(
                    "buffer {handle} lacks {required:?} usage for a {kind:?} buffer array"
                )));
            }
        }
        Ok(Self {
            kind,
            buffers: buffers.to_vec(),
        })
    }

    pub fn kind(&self) -> BufferArrayKind {
        self.kind
    }

    pub fn buffers(&self) -> &[Handle<Buffer>] {
        &self.buffers
    }

    pub fn len(&self) -> usize {
        self.buffers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffers.is_empty()
    }
}
