//! Immediate backend.
//!
//! Models an API where every call acts on the object currently bound to a
//! target. The binding state lives in a [`StateManager`] owned by the
//! backend instance rather than in process-wide globals.

mod state;

use std::sync::Arc;

pub use state::{BindTarget, StateManager};

use super::{
    attribute_pointer_format, check_buffer_range, compiler, Backend, BackendKind, BackendStats,
    CompileOutput, ImplicitQueue, MemoryTracker, NativeBuffer, NativeImage, NativeInputLayout,
    NativeQuery, NativeSampler, NativeTexture, NativeTextureInfo, NativeVertexFormat,
    SubresourceData,
};
use crate::capabilities::{CapabilitySnapshot, DeviceLimits, Feature};
use crate::config::GraphicsConfig;
use crate::error::{GraphicsError, GraphicsResult, NativeStatus};
use crate::scheduler::CommandQueue;
use crate::shader::InputElement;
use crate::types::{
    BufferDescriptor, QueryDescriptor, SamplerDescriptor, ShaderSource, ShaderStage,
    TextureDescriptor, TextureRegion, VertexAttribute,
};

const BYTECODE_MAGIC: [u8; 4] = *b"IMM0";

/// Immediate-mode backend.
pub struct ImmediateBackend {
    state: StateManager,
    memory: Arc<MemoryTracker>,
    queue: Arc<ImplicitQueue>,
    next_name: u64,
    uploads: u64,
}

impl ImmediateBackend {
    pub fn new(config: &GraphicsConfig) -> Self {
        log::trace!("ImmediateBackend: creating context");
        Self {
            state: StateManager::new(),
            memory: MemoryTracker::new(config.memory_budget),
            queue: Arc::new(ImplicitQueue::new()),
            next_name: 1,
            uploads: 0,
        }
    }

    pub fn state(&self) -> &StateManager {
        &self.state
    }

    fn gen_name(&mut self) -> u64 {
        let name = self.next_name;
        self.next_name += 1;
        name
    }

    fn bind_texture(&mut self, texture: &NativeTexture) -> GraphicsResult<()> {
        let target = BindTarget::Texture(texture.kind());
        let name = texture.image().id;
        self.state.bind(target, name);
        if self.state.bound(target) != Some(name) {
            return Err(GraphicsError::device("BindTexture", NativeStatus::InvalidCall));
        }
        Ok(())
    }

    /// Upload into the texture bound to its target.
    fn tex_sub_image(
        &mut self,
        texture: &NativeTexture,
        region: &TextureRegion,
        data: &[u8],
    ) -> GraphicsResult<()> {
        self.bind_texture(texture)?;
        let image = texture.image();
        let spans = image.checked_spans(region, data.len())?;
        image.memory().copy_spans(&spans, data);
        self.uploads += 1;
        Ok(())
    }
}

impl Backend for ImmediateBackend {
    fn name(&self) -> &'static str {
        "Immediate Backend"
    }

    fn kind(&self) -> BackendKind {
        BackendKind::Immediate
    }

    fn capabilities(&self) -> CapabilitySnapshot {
        CapabilitySnapshot::new(
            Feature::ALL,
            DeviceLimits {
                max_constant_buffer_size: 16 * 1024,
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
            state_binds: self.state.bind_calls(),
            flushes: 0,
        }
    }

    fn create_buffer(
        &mut self,
        descriptor: &BufferDescriptor,
        initial: Option<&[u8]>,
    ) -> GraphicsResult<NativeBuffer> {
        log::trace!(
            "ImmediateBackend: creating buffer {:?} (size: {})",
            descriptor.label,
            descriptor.size
        );
        let memory = self.memory.allocate(descriptor.size, "CreateBuffer")?;
        let buffer = NativeBuffer::new(self.gen_name(), memory);
        self.state.bind(BindTarget::Buffer, buffer.id);
        if let Some(data) = initial {
            check_buffer_range(&buffer, 0, data.len())?;
            buffer.memory().write(0, data);
            self.uploads += 1;
        }
        Ok(buffer)
    }

    fn write_buffer(&mut self, buffer: &NativeBuffer, offset: u64, data: &[u8]) -> GraphicsResult<()> {
        check_buffer_range(buffer, offset, data.len())?;
        self.state.bind(BindTarget::Buffer, buffer.id);
        buffer.memory().write(offset as usize, data);
        self.uploads += 1;
        Ok(())
    }

    fn read_buffer(&mut self, buffer: &NativeBuffer) -> GraphicsResult<Vec<u8>> {
        self.state.bind(BindTarget::Buffer, buffer.id);
        Ok(buffer.memory().read(0..buffer.size as usize))
    }

    fn release_buffer(&mut self, buffer: NativeBuffer) {
        self.state.unbind_object(buffer.id);
    }

    fn create_texture(
        &mut self,
        descriptor: &TextureDescriptor,
        initial: &[SubresourceData<'_>],
    ) -> GraphicsResult<NativeTexture> {
        log::trace!(
            "ImmediateBackend: creating {} texture {:?} ({})",
            descriptor.kind,
            descriptor.label,
            descriptor.size
        );
        let image = NativeImage::allocate(self.gen_name(), descriptor, &self.memory, "CreateTexture")?;
        let texture = NativeTexture::new(descriptor.kind, image);
        self.bind_texture(&texture)?;

        let extent = texture.image().extent;
        for sub in initial {
            if descriptor.kind.is_cube() {
                // One image call per face target.
                let face_len = sub.data.len() / sub.layers.max(1) as usize;
                for (i, face) in sub.data.chunks(face_len.max(1)).enumerate() {
                    let face_data = SubresourceData {
                        first_layer: sub.first_layer + i as u32,
                        layers: 1,
                        data: face,
                    };
                    self.tex_sub_image(&texture, &face_data.region(extent), face)?;
                }
            } else {
                self.tex_sub_image(&texture, &sub.region(extent), sub.data)?;
            }
        }
        Ok(texture)
    }

    fn write_texture(
        &mut self,
        texture: &NativeTexture,
        region: &TextureRegion,
        data: &[u8],
    ) -> GraphicsResult<()> {
        self.tex_sub_image(texture, region, data)
    }

    fn read_texture(&mut self, texture: &NativeTexture, mip_level: u32) -> GraphicsResult<Vec<u8>> {
        self.bind_texture(texture)?;
        if mip_level >= texture.image().mip_levels {
            return Err(GraphicsError::device("GetTexImage", NativeStatus::InvalidCall));
        }
        Ok(texture.image().read_level(mip_level))
    }

    fn describe_texture(&mut self, texture: &NativeTexture) -> NativeTextureInfo {
        self.state
            .bind(BindTarget::Texture(texture.kind()), texture.image().id);
        texture.info()
    }

    fn release_texture(&mut self, texture: NativeTexture) {
        self.state.unbind_object(texture.image().id);
    }

    fn create_sampler(&mut self, descriptor: &SamplerDescriptor) -> GraphicsResult<NativeSampler> {
        log::trace!("ImmediateBackend: creating sampler {:?}", descriptor.label);
        Ok(NativeSampler::new(self.gen_name()))
    }

    fn create_query(&mut self, descriptor: &QueryDescriptor) -> GraphicsResult<NativeQuery> {
        log::trace!("ImmediateBackend: creating {:?} query", descriptor.kind);
        Ok(NativeQuery {
            id: self.gen_name(),
            kind: descriptor.kind,
        })
    }

    fn compile_shader(&mut self, stage: ShaderStage, source: &ShaderSource) -> CompileOutput {
        compiler::compile(BYTECODE_MAGIC, stage, source, false)
    }

    fn vertex_format(&self, attribute: &VertexAttribute) -> Option<NativeVertexFormat> {
        attribute_pointer_format(attribute)
    }

    fn create_input_layout(
        &mut self,
        vertex_bytecode: &[u8],
        elements: &[InputElement],
    ) -> GraphicsResult<NativeInputLayout> {
        if vertex_bytecode.is_empty() {
            return Err(GraphicsError::device("CreateVertexArray", NativeStatus::InvalidCall));
        }
        let id = self.gen_name();
        self.state.bind(BindTarget::InputLayout, id);
        Ok(NativeInputLayout {
            id,
            element_count: elements.len(),
        })
    }

    fn command_queue(&self) -> Arc<dyn CommandQueue> {
        self.queue.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{TextureFormat, TextureUsage};

    #[test]
    fn test_cube_upload_is_one_call_per_face() {
        let mut backend = ImmediateBackend::new(&GraphicsConfig::default());
        let desc = TextureDescriptor::new_cube(2, TextureFormat::R8Unorm, TextureUsage::empty());
        let data: Vec<u8> = (0..24).collect();
        let texture = backend
            .create_texture(
                &desc,
                &[SubresourceData {
                    first_layer: 0,
                    layers: 6,
                    data: &data,
                }],
            )
            .unwrap();

        assert_eq!(backend.stats().uploads, 6);
        assert_eq!(backend.read_texture(&texture, 0).unwrap(), data);
    }

    #[test]
    fn test_devices_do_not_share_bindings() {
        let mut first = ImmediateBackend::new(&GraphicsConfig::default());
        let second = ImmediateBackend::new(&GraphicsConfig::default());
        let buffer = first
            .create_buffer(&BufferDescriptor::new(16, Default::default()), None)
            .unwrap();

        assert_eq!(first.state().bound(BindTarget::Buffer), Some(buffer.id));
        assert_eq!(second.state().bound(BindTarget::Buffer), None);

        first.release_buffer(buffer);
        assert_eq!(first.state().bound(BindTarget::Buffer), None);
    }
}
