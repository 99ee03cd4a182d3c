//! Deferred-context backend.
//!
//! Native objects are reference counted: buffers and textures share their
//! [`Allocation`](super::Allocation) with every command that references them.
//! Content updates are recorded on a deferred context and only executed when
//! the context is flushed. Reads flush first, so a write is always visible to
//! the next read in program order. Once the recorded copies hold
//! [`FLUSH_THRESHOLD`] bytes the context is flushed without waiting for a
//! read.

use std::sync::Arc;

use super::{
    check_buffer_range, compiler, dxgi_format, Backend, BackendKind, BackendStats, CompileOutput,
    CopySpan, ImplicitQueue, MemoryTracker, NativeBuffer, NativeImage, NativeInputLayout,
    NativeQuery, NativeSampler, NativeTexture, NativeTextureInfo, NativeVertexFormat,
    SubresourceData,
};
use crate::capabilities::{CapabilitySnapshot, DeviceLimits, Feature};
use crate::config::GraphicsConfig;
use crate::error::{GraphicsError, GraphicsResult, NativeStatus};
use crate::scheduler::{Command, CommandList, CommandQueue};
use crate::shader::InputElement;
use crate::types::{
    BufferDescriptor, QueryDescriptor, SamplerDescriptor, MAX_ANISOTROPY, ShaderSource, ShaderStage,
    TextureDescriptor, TextureRegion, VertexAttribute,
};

const BYTECODE_MAGIC: [u8; 4] = *b"DXBC";

/// Staged bytes on the deferred context that trigger a flush.
pub const FLUSH_THRESHOLD: usize = 4 * 1024 * 1024;

/// Deferred-context backend.
pub struct DeferredBackend {
    memory: Arc<MemoryTracker>,
    queue: Arc<ImplicitQueue>,
    deferred: CommandList,
    pending_bytes: usize,
    next_id: u64,
    uploads: u64,
    flushes: u64,
}

impl DeferredBackend {
    pub fn new(config: &GraphicsConfig) -> Self {
        log::trace!("DeferredBackend: creating device and deferred context");
        Self {
            memory: MemoryTracker::new(config.memory_budget),
            queue: Arc::new(ImplicitQueue::new()),
            deferred: CommandList::new(),
            pending_bytes: 0,
            next_id: 1,
            uploads: 0,
            flushes: 0,
        }
    }

    /// Commands recorded since the last flush.
    pub fn pending_commands(&self) -> usize {
        self.deferred.len()
    }

    /// Record an upload, flushing once enough staged data piled up.
    fn record_copy(&mut self, command: Command, len: usize) -> GraphicsResult<()> {
        self.deferred.push(command);
        self.pending_bytes += len;
        self.uploads += 1;
        if self.pending_bytes >= FLUSH_THRESHOLD {
            log::trace!("DeferredBackend: {} staged bytes, flushing", self.pending_bytes);
            self.flush()?;
        }
        Ok(())
    }

    fn next_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }
}

impl Backend for DeferredBackend {
    fn name(&self) -> &'static str {
        "Deferred Backend"
    }

    fn kind(&self) -> BackendKind {
        BackendKind::Deferred
    }

    fn capabilities(&self) -> CapabilitySnapshot {
        CapabilitySnapshot::new(Feature::ALL, DeviceLimits::default())
    }

    fn memory(&self) -> &Arc<MemoryTracker> {
        &self.memory
    }

    fn stats(&self) -> BackendStats {
        BackendStats {
            uploads: self.uploads,
            state_binds: 0,
            flushes: self.flushes,
        }
    }

    fn create_buffer(
        &mut self,
        descriptor: &BufferDescriptor,
        initial: Option<&[u8]>,
    ) -> GraphicsResult<NativeBuffer> {
        log::trace!(
            "DeferredBackend: creating buffer {:?} (size: {})",
            descriptor.label,
            descriptor.size
        );
        let memory = self.memory.allocate(descriptor.size, "CreateBuffer")?;
        let buffer = NativeBuffer::new(self.next_id(), memory);
        if let Some(data) = initial {
            check_buffer_range(&buffer, 0, data.len())?;
            buffer.memory().write(0, data);
            self.uploads += 1;
        }
        Ok(buffer)
    }

    fn write_buffer(&mut self, buffer: &NativeBuffer, offset: u64, data: &[u8]) -> GraphicsResult<()> {
        check_buffer_range(buffer, offset, data.len())?;
        let command = Command::Copy {
            target: Arc::clone(buffer.memory()),
            spans: vec![CopySpan {
                dst: offset as usize,
                src: 0,
                len: data.len(),
            }],
            data: data.to_vec(),
        };
        self.record_copy(command, data.len())
    }

    fn read_buffer(&mut self, buffer: &NativeBuffer) -> GraphicsResult<Vec<u8>> {
        self.flush()?;
        Ok(buffer.memory().read(0..buffer.size as usize))
    }

    fn create_texture(
        &mut self,
        descriptor: &TextureDescriptor,
        initial: &[SubresourceData<'_>],
    ) -> GraphicsResult<NativeTexture> {
        log::trace!(
            "DeferredBackend: creating {} texture {:?} ({})",
            descriptor.kind,
            descriptor.label,
            descriptor.size
        );
        let image = NativeImage::allocate(self.next_id(), descriptor, &self.memory, "CreateTexture")?;

        // Initial data is part of the creation call.
        for sub in initial {
            let spans = image.checked_spans(&sub.region(image.extent), sub.data.len())?;
            image.memory().copy_spans(&spans, sub.data);
            self.uploads += 1;
        }
        Ok(NativeTexture::new(descriptor.kind, image))
    }

    fn write_texture(
        &mut self,
        texture: &NativeTexture,
        region: &TextureRegion,
        data: &[u8],
    ) -> GraphicsResult<()> {
        let image = texture.image();
        let spans = image.checked_spans(region, data.len())?;
        let command = Command::Copy {
            target: Arc::clone(image.memory()),
            spans,
            data: data.to_vec(),
        };
        self.record_copy(command, data.len())
    }

    fn read_texture(&mut self, texture: &NativeTexture, mip_level: u32) -> GraphicsResult<Vec<u8>> {
        if mip_level >= texture.image().mip_levels {
            return Err(GraphicsError::device("Map", NativeStatus::InvalidCall));
        }
        self.flush()?;
        Ok(texture.image().read_level(mip_level))
    }

    fn describe_texture(&mut self, texture: &NativeTexture) -> NativeTextureInfo {
        texture.info()
    }

    fn create_sampler(&mut self, descriptor: &SamplerDescriptor) -> GraphicsResult<NativeSampler> {
        log::trace!("DeferredBackend: creating sampler {:?}", descriptor.label);
        if descriptor.max_anisotropy > MAX_ANISOTROPY {
            return Err(GraphicsError::device("CreateSamplerState", NativeStatus::InvalidCall));
        }
        Ok(NativeSampler::new(self.next_id()))
    }

    fn create_query(&mut self, descriptor: &QueryDescriptor) -> GraphicsResult<NativeQuery> {
        log::trace!("DeferredBackend: creating {:?} query", descriptor.kind);
        Ok(NativeQuery {
            id: self.next_id(),
            kind: descriptor.kind,
        })
    }

    fn compile_shader(&mut self, stage: ShaderStage, source: &ShaderSource) -> CompileOutput {
        compiler::compile(BYTECODE_MAGIC, stage, source, true)
    }

    fn vertex_format(&self, attribute: &VertexAttribute) -> Option<NativeVertexFormat> {
        dxgi_format(attribute)
    }

    fn create_input_layout(
        &mut self,
        vertex_bytecode: &[u8],
        elements: &[InputElement],
    ) -> GraphicsResult<NativeInputLayout> {
        if !vertex_bytecode.starts_with(&BYTECODE_MAGIC) {
            return Err(GraphicsError::device("CreateInputLayout", NativeStatus::InvalidCall));
        }
        Ok(NativeInputLayout {
            id: self.next_id(),
            element_count: elements.len(),
        })
    }

    fn command_queue(&self) -> Arc<dyn CommandQueue> {
        self.queue.clone()
    }

    fn flush(&mut self) -> GraphicsResult<()> {
        if self.deferred.is_empty() {
            return Ok(());
        }
        let commands = std::mem::take(&mut self.deferred);
        self.pending_bytes = 0;
        log::trace!("DeferredBackend: executing {} deferred commands", commands.len());
        self.queue.submit(commands)?;
        self.flushes += 1;
        Ok(())
    }
}
