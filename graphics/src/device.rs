//! Graphics device.
//!
//! The [`GraphicsDevice`] is the main interface for creating and using
//! hardware objects. It is created by [`GraphicsInstance::create_device`]
//! and owns exactly one backend, one capability gate and one resource
//! registry. Every host-side check runs before the backend is called, so a
//! rejected request never allocates and never changes the registry.
//!
//! [`GraphicsInstance::create_device`]: crate::GraphicsInstance::create_device

use crate::backend::{Backend, BackendKind, BackendStats};
use crate::capabilities::{CapabilityGate, CapabilitySnapshot};
use crate::config::GraphicsConfig;
use crate::context::{self, RenderContext};
use crate::error::{GraphicsError, GraphicsResult};
use crate::registry::{Handle, HardwareObject, ResourceRegistry};
use crate::resources::{Buffer, BufferArray, Pipeline, PipelineKind, Query, Sampler, Texture};
use crate::scheduler::{FrameReport, FrameScheduler};
use crate::shader::{Shader, ShaderProgram};
use crate::texture::{TextureBuilder, TextureDescription};
use crate::types::{
    BufferArrayKind, BufferDescriptor, BufferUsage, ClearColor, ImageData, QueryDescriptor,
    RenderContextDescriptor, SamplerDescriptor, ShaderDescriptor, ShaderSource,
    TextureDescriptor, TextureRegion, VertexFormat, VideoMode, Vsync,
};

/// A graphics device over one backend.
///
/// # Thread Safety
///
/// `GraphicsDevice` is `Send` but every method takes `&mut self`: one
/// caller drives a device at a time, and sharing one across threads needs
/// an outer lock.
///
/// # Example
///
/// ```ignore
/// let instance = GraphicsInstance::new(GraphicsConfig::default());
/// let mut device = instance.create_device("explicit")?;
///
/// let buffer = device.create_buffer(&BufferDescriptor::new(1024, BufferUsage::VERTEX), None)?;
/// let texture = device.create_texture(
///     &TextureDescriptor::new_2d(1920, 1080, TextureFormat::Rgba8Unorm, TextureUsage::RENDER_ATTACHMENT),
///     None,
/// )?;
/// ```
pub struct GraphicsDevice {
    backend: Box<dyn Backend>,
    gate: CapabilityGate,
    registry: ResourceRegistry,
    config: GraphicsConfig,
}

impl GraphicsDevice {
    /// Wrap `backend`; the capability snapshot is taken here, once.
    pub(crate) fn new(backend: Box<dyn Backend>, config: GraphicsConfig) -> Self {
        let snapshot = backend.capabilities().without(&config.disabled_features);
        log::info!(
            "Created {} device ({} features, {} disabled)",
            backend.name(),
            snapshot.features().len(),
            config.disabled_features.len()
        );
        Self {
            backend,
            gate: CapabilityGate::new(snapshot),
            registry: ResourceRegistry::new(),
            config,
        }
    }

    pub fn name(&self) -> &'static str {
        self.backend.name()
    }

    pub fn backend_kind(&self) -> BackendKind {
        self.backend.kind()
    }

    pub fn capabilities(&self) -> &CapabilitySnapshot {
        self.gate.snapshot()
    }

    pub fn gate(&self) -> &CapabilityGate {
        &self.gate
    }

    pub fn config(&self) -> &GraphicsConfig {
        &self.config
    }

    pub fn registry(&self) -> &ResourceRegistry {
        &self.registry
    }

    pub fn stats(&self) -> BackendStats {
        self.backend.stats()
    }

    /// Device memory currently allocated, in bytes.
    pub fn memory_used(&self) -> u64 {
        self.backend.memory().used()
    }

    /// Whether `handle` still refers to a live object.
    pub fn is_alive<T: HardwareObject>(&self, handle: Handle<T>) -> bool {
        self.registry.is_alive(handle)
    }

    /// Block until the device completed every submitted command.
    pub fn wait_idle(&mut self) -> GraphicsResult<()> {
        self.backend.flush()?;
        self.backend.command_queue().wait_idle()
    }

    fn texture_builder(&mut self) -> TextureBuilder<'_> {
        TextureBuilder::new(self.backend.as_mut(), &self.gate, self.config.default_texel)
    }

    // ------------------------------------------------------------------
    // Buffers
    // ------------------------------------------------------------------

    /// Create a buffer, optionally with initial content of exactly `size` bytes.
    pub fn create_buffer(
        &mut self,
        descriptor: &BufferDescriptor,
        initial: Option<&[u8]>,
    ) -> GraphicsResult<Handle<Buffer>> {
        if descriptor.size == 0 {
            return Err(GraphicsError::invalid("buffer size cannot be zero"));
        }
        let max_constant = self.gate.snapshot().limits.max_constant_buffer_size;
        if descriptor.usage.contains(BufferUsage::CONSTANT) && descriptor.size > max_constant {
            return Err(GraphicsError::invalid(format!(
                "constant buffer size {} exceeds device limit {max_constant}",
                descriptor.size
            )));
        }
        if let Some(data) = initial {
            if data.len() as u64 != descriptor.size {
                return Err(GraphicsError::invalid(format!(
                    "initial data holds {} bytes, buffer size is {}",
                    data.len(),
                    descriptor.size
                )));
            }
        }
        let native = self.backend.create_buffer(descriptor, initial)?;
        Ok(self.registry.insert(Buffer::new(descriptor.clone(), native)))
    }

    pub fn write_buffer(&mut self, handle: Handle<Buffer>, offset: u64, data: &[u8]) -> GraphicsResult<()> {
        let buffer = self.registry.get(handle)?;
        let in_range = offset
            .checked_add(data.len() as u64)
            .is_some_and(|end| end <= buffer.size());
        if !in_range {
            return Err(GraphicsError::invalid(format!(
                "write of {} bytes at offset {offset} exceeds buffer size {}",
                data.len(),
                buffer.size()
            )));
        }
        self.backend.write_buffer(buffer.native(), offset, data)
    }

    /// Read the whole buffer after every prior write.
    pub fn read_buffer(&mut self, handle: Handle<Buffer>) -> GraphicsResult<Vec<u8>> {
        let buffer = self.registry.get(handle)?;
        self.backend.read_buffer(buffer.native())
    }

    pub fn buffer(&self, handle: Handle<Buffer>) -> GraphicsResult<&Buffer> {
        self.registry.get(handle)
    }

    pub fn release_buffer(&mut self, handle: Handle<Buffer>) -> GraphicsResult<()> {
        let buffer = self.registry.release(handle)?;
        self.backend.release_buffer(buffer.into_native());
        Ok(())
    }

    /// Group buffers of one role; every member must be live and carry the role's usage.
    pub fn create_buffer_array(
        &mut self,
        kind: BufferArrayKind,
        buffers: &[Handle<Buffer>],
    ) -> GraphicsResult<Handle<BufferArray>> {
        let array = BufferArray::new(kind, buffers, self.registry.store(), &self.gate)?;
        Ok(self.registry.insert(array))
    }

    pub fn buffer_array(&self, handle: Handle<BufferArray>) -> GraphicsResult<&BufferArray> {
        self.registry.get(handle)
    }

    pub fn release_buffer_array(&mut self, handle: Handle<BufferArray>) -> GraphicsResult<()> {
        self.registry.release(handle).map(drop)
    }

    // ------------------------------------------------------------------
    // Textures
    // ------------------------------------------------------------------

    /// Create a texture.
    ///
    /// Without `image`, uncompressed single-sampled textures are filled
    /// with the configured default texel.
    pub fn create_texture(
        &mut self,
        descriptor: &TextureDescriptor,
        image: Option<&ImageData<'_>>,
    ) -> GraphicsResult<Handle<Texture>> {
        let native = self.texture_builder().build(descriptor, image)?;
        Ok(self.registry.insert(Texture::new(descriptor.clone(), native)))
    }

    /// Update a region of one mip level.
    pub fn write_texture(
        &mut self,
        handle: Handle<Texture>,
        region: &TextureRegion,
        image: &ImageData<'_>,
    ) -> GraphicsResult<()> {
        let texture = self.registry.get(handle)?;
        TextureBuilder::new(self.backend.as_mut(), &self.gate, self.config.default_texel)
            .write(texture, region, image)
    }

    /// Read one mip level back in the native encoding.
    pub fn read_texture(&mut self, handle: Handle<Texture>, mip_level: u32) -> GraphicsResult<Vec<u8>> {
        let texture = self.registry.get(handle)?;
        TextureBuilder::new(self.backend.as_mut(), &self.gate, self.config.default_texel)
            .read(texture, mip_level)
    }

    /// Describe the texture as allocated by the device.
    pub fn describe_texture(&mut self, handle: Handle<Texture>) -> GraphicsResult<TextureDescription> {
        let texture = self.registry.get(handle)?;
        Ok(TextureBuilder::new(self.backend.as_mut(), &self.gate, self.config.default_texel)
            .describe(texture))
    }

    pub fn texture(&self, handle: Handle<Texture>) -> GraphicsResult<&Texture> {
        self.registry.get(handle)
    }

    pub fn release_texture(&mut self, handle: Handle<Texture>) -> GraphicsResult<()> {
        let texture = self.registry.release(handle)?;
        self.backend.release_texture(texture.into_native());
        Ok(())
    }

    // ------------------------------------------------------------------
    // Samplers and queries
    // ------------------------------------------------------------------

    pub fn create_sampler(&mut self, descriptor: &SamplerDescriptor) -> GraphicsResult<Handle<Sampler>> {
        if descriptor.lod_min_clamp > descriptor.lod_max_clamp {
            return Err(GraphicsError::invalid(format!(
                "sampler LOD range {}..{} is inverted",
                descriptor.lod_min_clamp, descriptor.lod_max_clamp
            )));
        }
        if descriptor.max_anisotropy == 0 {
            return Err(GraphicsError::invalid("sampler anisotropy must be at least 1"));
        }
        let native = self.backend.create_sampler(descriptor)?;
        Ok(self.registry.insert(Sampler::new(descriptor.clone(), native)))
    }

    pub fn sampler(&self, handle: Handle<Sampler>) -> GraphicsResult<&Sampler> {
        self.registry.get(handle)
    }

    pub fn release_sampler(&mut self, handle: Handle<Sampler>) -> GraphicsResult<()> {
        self.registry.release(handle).map(drop)
    }

    pub fn create_query(&mut self, descriptor: &QueryDescriptor) -> GraphicsResult<Handle<Query>> {
        if let Some(feature) = descriptor.kind.required_feature() {
            self.gate.assert(feature, "CreateQuery")?;
        }
        let native = self.backend.create_query(descriptor)?;
        Ok(self.registry.insert(Query::new(descriptor.clone(), native)))
    }

    pub fn query(&self, handle: Handle<Query>) -> GraphicsResult<&Query> {
        self.registry.get(handle)
    }

    pub fn release_query(&mut self, handle: Handle<Query>) -> GraphicsResult<()> {
        self.registry.release(handle).map(drop)
    }

    // ------------------------------------------------------------------
    // Shaders and programs
    // ------------------------------------------------------------------

    /// Create and compile a shader.
    ///
    /// A failed compile still creates the shader, without byte code; its
    /// info log holds the diagnostics and linking a program with it fails.
    pub fn create_shader(&mut self, descriptor: &ShaderDescriptor) -> GraphicsResult<Handle<Shader>> {
        let output = self.backend.compile_shader(descriptor.stage, &descriptor.source);
        if !output.success {
            log::warn!(
                "Shader {:?} ({} stage) failed to compile: {}",
                descriptor.label,
                descriptor.stage,
                output.log
            );
        }
        Ok(self.registry.insert(Shader::new(descriptor.clone(), output)))
    }

    /// Recompile a shader from new source; returns whether compilation succeeded.
    pub fn compile_shader(&mut self, handle: Handle<Shader>, source: ShaderSource) -> GraphicsResult<bool> {
        let stage = self.registry.get(handle)?.stage();
        let output = self.backend.compile_shader(stage, &source);
        let shader = self.registry.get_mut(handle)?;
        let success = shader.recompiled(source, output);
        if !success {
            log::warn!("Shader {handle} ({stage} stage) failed to compile: {}", shader.info_log());
        }
        Ok(success)
    }

    pub fn shader(&self, handle: Handle<Shader>) -> GraphicsResult<&Shader> {
        self.registry.get(handle)
    }

    pub fn release_shader(&mut self, handle: Handle<Shader>) -> GraphicsResult<()> {
        self.registry.release(handle).map(drop)
    }

    pub fn create_program(&mut self, label: Option<&str>) -> Handle<ShaderProgram> {
        self.registry.insert(ShaderProgram::new(label.map(str::to_owned)))
    }

    pub fn attach_shader(&mut self, program: Handle<ShaderProgram>, shader: Handle<Shader>) -> GraphicsResult<()> {
        let (program, shaders) = self.registry.program_and_shaders(program)?;
        program.attach(shader, shaders, &self.gate)
    }

    pub fn detach_all(&mut self, program: Handle<ShaderProgram>) -> GraphicsResult<()> {
        self.registry.get_mut(program)?.detach_all();
        Ok(())
    }

    pub fn link_program(&mut self, program: Handle<ShaderProgram>) -> GraphicsResult<()> {
        let (program, shaders) = self.registry.program_and_shaders(program)?;
        program.link(shaders)
    }

    pub fn build_input_layout(
        &mut self,
        program: Handle<ShaderProgram>,
        format: &VertexFormat,
    ) -> GraphicsResult<()> {
        let (program, shaders) = self.registry.program_and_shaders(program)?;
        program.build_input_layout(format, shaders, self.backend.as_mut())
    }

    pub fn program(&self, handle: Handle<ShaderProgram>) -> GraphicsResult<&ShaderProgram> {
        self.registry.get(handle)
    }

    pub fn release_program(&mut self, handle: Handle<ShaderProgram>) -> GraphicsResult<()> {
        self.registry.release(handle).map(drop)
    }

    // ------------------------------------------------------------------
    // Pipelines
    // ------------------------------------------------------------------

    pub fn create_pipeline(
        &mut self,
        label: Option<&str>,
        kind: PipelineKind,
        program: Handle<ShaderProgram>,
    ) -> GraphicsResult<Handle<Pipeline>> {
        let pipeline = Pipeline::new(label.map(str::to_owned), kind, program, self.registry.store())?;
        Ok(self.registry.insert(pipeline))
    }

    pub fn pipeline(&self, handle: Handle<Pipeline>) -> GraphicsResult<&Pipeline> {
        self.registry.get(handle)
    }

    pub fn release_pipeline(&mut self, handle: Handle<Pipeline>) -> GraphicsResult<()> {
        self.registry.release(handle).map(drop)
    }

    // ------------------------------------------------------------------
    // Render contexts
    // ------------------------------------------------------------------

    /// Create a render context and its ring of back buffers.
    pub fn create_context(&mut self, descriptor: &RenderContextDescriptor) -> GraphicsResult<Handle<RenderContext>> {
        let mode = descriptor.video_mode;
        let count = context::ring_size(mode, self.config.frames_in_flight)?;
        let scheduler = FrameScheduler::new(self.backend.command_queue(), count)?
            .with_timeout(self.config.fence_timeout());
        let buffers = self.create_buffers(count, |index| context::buffer_descriptor(descriptor, mode, index))?;
        log::debug!(
            "Created render context {:?} ({}x{}, {count} buffers)",
            descriptor.label,
            mode.width,
            mode.height
        );
        Ok(self
            .registry
            .insert(RenderContext::new(descriptor.clone(), scheduler, buffers)))
    }

    /// Switch to `mode`, rebuilding the buffer ring after the device went idle.
    ///
    /// An unchanged mode is a no-op. If the new buffers cannot be allocated
    /// the context keeps its current ring.
    pub fn set_video_mode(&mut self, handle: Handle<RenderContext>, mode: VideoMode) -> GraphicsResult<()> {
        let current = self.registry.get(handle)?;
        if current.video_mode() == mode {
            return Ok(());
        }
        let count = context::ring_size(mode, self.config.frames_in_flight)?;
        let descriptors: Vec<TextureDescriptor> =
            (0..count).map(|index| current.buffer_descriptor(mode, index)).collect();

        self.wait_idle()?;
        let buffers = self.create_buffers(count, |index| descriptors[index].clone())?;
        let replaced = match self.registry.get_mut(handle)?.replace_buffers(mode, buffers.clone()) {
            Ok(replaced) => replaced,
            Err(err) => {
                self.release_buffers(&buffers);
                return Err(err);
            }
        };
        self.release_buffers(&replaced);
        log::debug!(
            "Render context {handle}: video mode {}x{}, {count} buffers",
            mode.width,
            mode.height
        );
        Ok(())
    }

    /// Change the swap interval; the buffer ring is kept.
    pub fn set_vsync(&mut self, handle: Handle<RenderContext>, vsync: Vsync) -> GraphicsResult<()> {
        self.registry.get_mut(handle)?.set_vsync(vsync);
        Ok(())
    }

    /// Record a clear of the current back buffer for the next present.
    pub fn clear(&mut self, handle: Handle<RenderContext>, color: ClearColor) -> GraphicsResult<()> {
        let (context, textures) = self.registry.context_and_textures(handle)?;
        context.record_clear(color, textures)
    }

    /// Present the current back buffer. May block on the frame fence.
    pub fn present(&mut self, handle: Handle<RenderContext>) -> GraphicsResult<FrameReport> {
        self.backend.flush()?;
        let (context, textures) = self.registry.context_and_textures(handle)?;
        context.present(textures)
    }

    pub fn context(&self, handle: Handle<RenderContext>) -> GraphicsResult<&RenderContext> {
        self.registry.get(handle)
    }

    /// Release a context after its frames completed, with its back buffers.
    pub fn release_context(&mut self, handle: Handle<RenderContext>) -> GraphicsResult<()> {
        self.registry.get(handle)?;
        self.wait_idle()?;
        let buffers = self.registry.release(handle)?.into_buffers();
        self.release_buffers(&buffers);
        Ok(())
    }

    /// Create `count` back buffers; on failure the ones already made are released.
    fn create_buffers(
        &mut self,
        count: usize,
        descriptor: impl Fn(usize) -> TextureDescriptor,
    ) -> GraphicsResult<Vec<Handle<Texture>>> {
        let mut buffers = Vec::with_capacity(count);
        for index in 0..count {
            match self.create_texture(&descriptor(index), None) {
                Ok(handle) => buffers.push(handle),
                Err(err) => {
                    self.release_buffers(&buffers);
                    return Err(err);
                }
            }
        }
        Ok(buffers)
    }

    fn release_buffers(&mut self, buffers: &[Handle<Texture>]) {
        for handle in buffers {
            if let Err(err) = self.release_texture(*handle) {
                log::warn!("Back buffer {handle} was already released: {err}");
            }
        }
    }
}

impl std::fmt::Debug for GraphicsDevice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GraphicsDevice")
            .field("backend", &self.backend.name())
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}

static_assertions::assert_impl_all!(GraphicsDevice: Send);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::create_backend;
    use crate::capabilities::Feature;
    use crate::error::ErrorKind;
    use crate::types::{QueryKind, TextureFormat, TextureUsage};

    fn device(config: GraphicsConfig) -> GraphicsDevice {
        let backend = create_backend(BackendKind::Deferred, &config).unwrap();
        GraphicsDevice::new(backend, config)
    }

    #[test]
    fn test_disabled_feature_hides_capability() {
        let mut device = device(GraphicsConfig::default().with_disabled_feature(Feature::StreamOutput));
        assert!(!device.capabilities().supports(Feature::StreamOutput));

        let err = device
            .create_query(&QueryDescriptor::new(QueryKind::StreamOutPrimitivesWritten))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotSupported);
        assert!(device.create_query(&QueryDescriptor::new(QueryKind::SamplesPassed)).is_ok());
        assert_eq!(device.registry().count::<Query>(), 1);
    }

    #[test]
    fn test_buffer_write_bounds() {
        let mut device = device(GraphicsConfig::default());
        let buffer = device
            .create_buffer(&BufferDescriptor::new(8, BufferUsage::VERTEX), Some(&[0; 8]))
            .unwrap();

        let err = device.write_buffer(buffer, 6, &[1, 2, 3]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
        device.write_buffer(buffer, 6, &[1, 2]).unwrap();
        assert_eq!(device.read_buffer(buffer).unwrap(), vec![0, 0, 0, 0, 0, 0, 1, 2]);
    }

    #[test]
    fn test_constant_buffer_limit() {
        let mut device = device(GraphicsConfig::default());
        let limit = device.capabilities().limits.max_constant_buffer_size;
        let err = device
            .create_buffer(&BufferDescriptor::new(limit + 16, BufferUsage::CONSTANT), None)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
        assert_eq!(device.memory_used(), 0);
    }

    #[test]
    fn test_sampler_validation() {
        let mut device = device(GraphicsConfig::default());
        let inverted = SamplerDescriptor::linear().with_lod_range(4.0, 1.0);
        assert_eq!(
            device.create_sampler(&inverted).unwrap_err().kind(),
            ErrorKind::InvalidArgument
        );
        let err = device
            .create_sampler(&SamplerDescriptor::linear().with_anisotropy(32))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DeviceFailure);
        assert!(device.create_sampler(&SamplerDescriptor::nearest()).is_ok());
        assert_eq!(device.registry().count::<Sampler>(), 1);
    }

    #[test]
    fn test_release_texture_frees_memory() {
        let mut device = device(GraphicsConfig::default());
        let texture = device
            .create_texture(
                &TextureDescriptor::new_2d(4, 4, TextureFormat::Rgba8Unorm, TextureUsage::empty()),
                None,
            )
            .unwrap();
        assert_eq!(device.memory_used(), 64);

        device.release_texture(texture).unwrap();
        assert_eq!(device.memory_used(), 0);
        assert_eq!(
            device.release_texture(texture).unwrap_err().kind(),
            ErrorKind::UseAfterRelease
        );
    }

    #[test]
    fn test_release_context_releases_buffers() {
        let mut device = device(GraphicsConfig::default());
        let context = device
            .create_context(&RenderContextDescriptor::new(VideoMode::new(4, 4)))
            .unwrap();
        assert_eq!(device.registry().count::<Texture>(), 2);

        device.release_context(context).unwrap();
        assert_eq!(device.registry().live_objects(), 0);
        assert_eq!(device.memory_used(), 0);
    }
}
