//! Explicit-submission backend.
//!
//! Nothing executes until a command list is submitted to the
//! [`SubmissionQueue`] and a fence signal closes the batch. Content uploads go
//! through a staging allocation and a copy command; the CPU waits on the
//! copy's fence before the staging memory is released. Readback waits for
//! the queue to go idle.

use std::sync::Arc;
use std::time::Duration;

use super::{
    check_buffer_range, compiler, dxgi_format, Allocation, Backend, BackendKind, BackendStats,
    CompileOutput, CopySpan, MemoryTracker, NativeBuffer, NativeImage, NativeInputLayout,
    NativeQuery, NativeSampler, NativeTexture, NativeTextureInfo, NativeVertexFormat,
    SubmissionQueue, SubresourceData,
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

const BYTECODE_MAGIC: [u8; 4] = *b"DXIL";

/// Explicit-submission backend.
pub struct ExplicitBackend {
    memory: Arc<MemoryTracker>,
    queue: Arc<SubmissionQueue>,
    fence_timeout: Option<Duration>,
    next_id: u64,
    uploads: u64,
}

impl ExplicitBackend {
    pub fn new(config: &GraphicsConfig) -> Self {
        log::trace!(
            "ExplicitBackend: creating device (gpu latency: {} batches)",
            config.gpu_latency_frames
        );
        Self {
            memory: MemoryTracker::new(config.memory_budget),
            queue: Arc::new(SubmissionQueue::new(config.gpu_latency_frames)),
            fence_timeout: config.fence_timeout(),
            next_id: 1,
            uploads: 0,
        }
    }

    pub fn queue(&self) -> &Arc<SubmissionQueue> {
        &self.queue
    }

    fn next_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Stage `data`, copy it into `target` on the queue and wait for the copy.
    fn upload(&mut self, target: &Arc<Allocation>, spans: Vec<CopySpan>, data: &[u8]) -> GraphicsResult<()> {
        let staging = self.memory.allocate(data.len() as u64, "CreateUploadBuffer")?;
        staging.write(0, data);

        let mut list = CommandList::new();
        list.push(Command::Copy {
            target: Arc::clone(target),
            spans,
            data: staging.read(0..data.len()),
        });
        self.queue.submit(list)?;
        let value = self.queue.signal()?;
        self.queue.wait_for(value, self.fence_timeout)?;
        self.uploads += 1;
        Ok(())
    }
}

impl Backend for ExplicitBackend {
    fn name(&self) -> &'static str {
        "Explicit Backend"
    }

    fn kind(&self) -> BackendKind {
        BackendKind::Explicit
    }

    fn capabilities(&self) -> CapabilitySnapshot {
        CapabilitySnapshot::new(
            Feature::ALL,
            DeviceLimits {
                max_texture_2d: 16384,
                max_samples: 8,
                ..DeviceLimits::default()
            },
        )
    }

    fn memory(&self) -> &Arc<MemoryTracker> {
        &self.memory
    }

    fn stats(&self) -> BackendStats {
        BackendStats {
            uploads: self.uploads,
            state_binds: 0,
            flushes: 0,
        }
    }

    fn create_buffer(
        &mut self,
        descriptor: &BufferDescriptor,
        initial: Option<&[u8]>,
    ) -> GraphicsResult<NativeBuffer> {
        log::trace!(
            "ExplicitBackend: creating buffer {:?} (size: {})",
            descriptor.label,
            descriptor.size
        );
        let memory = self.memory.allocate(descriptor.size, "CreateCommittedResource")?;
        let buffer = NativeBuffer::new(self.next_id(), memory);
        if let Some(data) = initial {
            check_buffer_range(&buffer, 0, data.len())?;
            let span = CopySpan {
                dst: 0,
                src: 0,
                len: data.len(),
            };
            self.upload(buffer.memory(), vec![span], data)?;
        }
        Ok(buffer)
    }

    fn write_buffer(&mut self, buffer: &NativeBuffer, offset: u64, data: &[u8]) -> GraphicsResult<()> {
        check_buffer_range(buffer, offset, data.len())?;
        let span = CopySpan {
            dst: offset as usize,
            src: 0,
            len: data.len(),
        };
        self.upload(buffer.memory(), vec![span], data)
    }

    fn read_buffer(&mut self, buffer: &NativeBuffer) -> GraphicsResult<Vec<u8>> {
        self.queue.wait_idle()?;
        Ok(buffer.memory().read(0..buffer.size as usize))
    }

    fn create_texture(
        &mut self,
        descriptor: &TextureDescriptor,
        initial: &[SubresourceData<'_>],
    ) -> GraphicsResult<NativeTexture> {
        log::trace!(
            "ExplicitBackend: creating {} texture {:?} ({})",
            descriptor.kind,
            descriptor.label,
            descriptor.size
        );
        let image = NativeImage::allocate(
            self.next_id(),
            descriptor,
            &self.memory,
            "CreateCommittedResource",
        )?;
        for sub in initial {
            let spans = image.checked_spans(&sub.region(image.extent), sub.data.len())?;
            self.upload(image.memory(), spans, sub.data)?;
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
        self.upload(image.memory(), spans, data)
    }

    fn read_texture(&mut self, texture: &NativeTexture, mip_level: u32) -> GraphicsResult<Vec<u8>> {
        if mip_level >= texture.image().mip_levels {
            return Err(GraphicsError::device("ReadFromSubresource", NativeStatus::InvalidCall));
        }
        self.queue.wait_idle()?;
        Ok(texture.image().read_level(mip_level))
    }

    fn describe_texture(&mut self, texture: &NativeTexture) -> NativeTextureInfo {
        texture.info()
    }

    fn create_sampler(&mut self, descriptor: &SamplerDescriptor) -> GraphicsResult<NativeSampler> {
        log::trace!("ExplicitBackend: creating sampler {:?}", descriptor.label);
        if descriptor.max_anisotropy > MAX_ANISOTROPY {
            return Err(GraphicsError::device("CreateSampler", NativeStatus::InvalidCall));
        }
        Ok(NativeSampler::new(self.next_id()))
    }

    fn create_query(&mut self, descriptor: &QueryDescriptor) -> GraphicsResult<NativeQuery> {
        log::trace!("ExplicitBackend: creating {:?} query heap", descriptor.kind);
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
            return Err(GraphicsError::device("CreateGraphicsPipelineState", NativeStatus::InvalidCall));
        }
        Ok(NativeInputLayout {
            id: self.next_id(),
            element_count: elements.len(),
        })
    }

    fn command_queue(&self) -> Arc<dyn CommandQueue> {
        self.queue.clone()
    }
}
