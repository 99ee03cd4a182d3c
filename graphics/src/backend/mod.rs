//! Device backend abstraction layer.
//!
//! Each backend implements the [`Backend`] trait over its own execution
//! model:
//!
//! - `immediate`: global binding state, held in an explicit [`StateManager`]
//! - `deferred`: reference-counted objects, writes recorded on a deferred
//!   context and flushed before any read
//! - `explicit`: command lists, upload staging and timeline fences on a
//!   [`SubmissionQueue`]
//!
//! The backends keep native object memory in host RAM so the device layer
//! above can run without GPU hardware. Everything the device layer can
//! validate from host-side state is checked before a backend is called.

mod compiler;
mod formats;
mod image;
mod memory;
mod queue;

#[cfg(feature = "deferred")]
pub mod deferred;
#[cfg(feature = "explicit")]
pub mod explicit;
#[cfg(feature = "immediate")]
pub mod immediate;

use std::fmt;
use std::sync::Arc;

pub use compiler::CompileOutput;
pub use formats::{attribute_pointer_format, dxgi_format, NativeVertexFormat};
pub use image::{storage_size, NativeImage, NativeTexture, NativeTextureInfo};
#[cfg(feature = "immediate")]
pub use immediate::StateManager;
pub use memory::{Allocation, CopySpan, MemoryTracker};
pub use queue::{ImplicitQueue, SubmissionQueue};

use crate::capabilities::CapabilitySnapshot;
use crate::config::GraphicsConfig;
use crate::error::{GraphicsError, GraphicsResult};
use crate::scheduler::CommandQueue;
use crate::shader::InputElement;
use crate::types::{
    BufferDescriptor, Extent3d, Offset3d, QueryDescriptor, QueryKind, SamplerDescriptor,
    ShaderSource, ShaderStage, TextureDescriptor, TextureRegion, VertexAttribute,
};

/// Backend family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendKind {
    Immediate,
    Deferred,
    Explicit,
}

impl BackendKind {
    pub const ALL: [BackendKind; 3] = [
        BackendKind::Immediate,
        BackendKind::Deferred,
        BackendKind::Explicit,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Immediate => "immediate",
            Self::Deferred => "deferred",
            Self::Explicit => "explicit",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.name().eq_ignore_ascii_case(name.trim()))
    }

    /// Whether this backend was compiled in.
    pub fn is_available(&self) -> bool {
        match self {
            Self::Immediate => cfg!(feature = "immediate"),
            Self::Deferred => cfg!(feature = "deferred"),
            Self::Explicit => cfg!(feature = "explicit"),
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Native buffer object.
#[derive(Debug, Clone)]
pub struct NativeBuffer {
    pub id: u64,
    pub size: u64,
    memory: Arc<Allocation>,
}

impl NativeBuffer {
    pub fn new(id: u64, memory: Arc<Allocation>) -> Self {
        Self {
            id,
            size: memory.size(),
            memory,
        }
    }

    pub fn memory(&self) -> &Arc<Allocation> {
        &self.memory
    }
}

/// Native sampler state object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NativeSampler {
    pub id: u64,
}

impl NativeSampler {
    pub fn new(id: u64) -> Self {
        Self { id }
    }
}

/// Native query object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NativeQuery {
    pub id: u64,
    pub kind: QueryKind,
}

/// Native vertex input layout object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NativeInputLayout {
    pub id: u64,
    pub element_count: usize,
}

/// Initial content for consecutive mip-0 layers (or volume slices).
#[derive(Debug, Clone, Copy)]
pub struct SubresourceData<'a> {
    pub first_layer: u32,
    pub layers: u32,
    pub data: &'a [u8],
}

impl SubresourceData<'_> {
    /// Mip-0 region covered by this data.
    pub fn region(&self, extent: Extent3d) -> TextureRegion {
        TextureRegion::new(
            Offset3d::new(0, 0, self.first_layer),
            Extent3d::new_3d(extent.width, extent.height, self.layers),
        )
    }
}

/// Native call counters, for diagnostics and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BackendStats {
    /// Texture and buffer content transfers issued to the device.
    pub uploads: u64,
    /// Binding changes made through the state manager.
    pub state_binds: u64,
    /// Deferred command lists executed.
    pub flushes: u64,
}

/// Device backend interface.
pub trait Backend: Send + 'static {
    fn name(&self) -> &'static str;

    fn kind(&self) -> BackendKind;

    /// Features and limits of the native device.
    fn capabilities(&self) -> CapabilitySnapshot;

    fn memory(&self) -> &Arc<MemoryTracker>;

    fn stats(&self) -> BackendStats;

    /// Create a buffer, optionally with initial content of exactly `size` bytes.
    fn create_buffer(
        &mut self,
        descriptor: &BufferDescriptor,
        initial: Option<&[u8]>,
    ) -> GraphicsResult<NativeBuffer>;

    fn write_buffer(&mut self, buffer: &NativeBuffer, offset: u64, data: &[u8]) -> GraphicsResult<()>;

    /// Read the whole buffer after all prior writes.
    fn read_buffer(&mut self, buffer: &NativeBuffer) -> GraphicsResult<Vec<u8>>;

    fn release_buffer(&mut self, buffer: NativeBuffer) {
        drop(buffer);
    }

    /// Allocate a texture and upload `initial` into mip 0.
    ///
    /// An empty `initial` allocates storage without any upload.
    fn create_texture(
        &mut self,
        descriptor: &TextureDescriptor,
        initial: &[SubresourceData<'_>],
    ) -> GraphicsResult<NativeTexture>;

    /// Upload packed native texels into a raw region (`z` counts raw layers).
    fn write_texture(
        &mut self,
        texture: &NativeTexture,
        region: &TextureRegion,
        data: &[u8],
    ) -> GraphicsResult<()>;

    /// Read back one mip level after all prior writes.
    fn read_texture(&mut self, texture: &NativeTexture, mip_level: u32) -> GraphicsResult<Vec<u8>>;

    /// Query the live native object.
    fn describe_texture(&mut self, texture: &NativeTexture) -> NativeTextureInfo;

    fn release_texture(&mut self, texture: NativeTexture) {
        drop(texture);
    }

    fn create_sampler(&mut self, descriptor: &SamplerDescriptor) -> GraphicsResult<NativeSampler>;

    fn create_query(&mut self, descriptor: &QueryDescriptor) -> GraphicsResult<NativeQuery>;

    fn compile_shader(&mut self, stage: ShaderStage, source: &ShaderSource) -> CompileOutput;

    /// Native format for a vertex attribute, if the device has one.
    fn vertex_format(&self, attribute: &VertexAttribute) -> Option<NativeVertexFormat>;

    fn create_input_layout(
        &mut self,
        vertex_bytecode: &[u8],
        elements: &[InputElement],
    ) -> GraphicsResult<NativeInputLayout>;

    fn command_queue(&self) -> Arc<dyn CommandQueue>;

    /// Make every recorded write visible to the device.
    fn flush(&mut self) -> GraphicsResult<()> {
        Ok(())
    }
}

/// Create the backend of the given kind.
pub fn create_backend(kind: BackendKind, config: &GraphicsConfig) -> GraphicsResult<Box<dyn Backend>> {
    match kind {
        #[cfg(feature = "immediate")]
        BackendKind::Immediate => Ok(Box::new(immediate::ImmediateBackend::new(config))),
        #[cfg(feature = "deferred")]
        BackendKind::Deferred => Ok(Box::new(deferred::DeferredBackend::new(config))),
        #[cfg(feature = "explicit")]
        BackendKind::Explicit => Ok(Box::new(explicit::ExplicitBackend::new(config))),
        #[allow(unreachable_patterns)]
        _ => {
            let _ = config;
            Err(GraphicsError::BackendUnavailable(kind.name().to_string()))
        }
    }
}

/// Shared argument checks done by every backend before touching memory.
pub(crate) fn check_buffer_range(buffer: &NativeBuffer, offset: u64, len: usize) -> GraphicsResult<()> {
    if offset + len as u64 > buffer.size {
        return Err(GraphicsError::device(
            "UpdateBuffer",
            crate::error::NativeStatus::InvalidCall,
        ));
    }
    Ok(())
}
