//! Common utilities for device integration tests.
//!
//! This module provides shared test infrastructure that is reused across
//! the three backend implementations.

#![allow(dead_code)]

use tessera_graphics::{
    BackendKind, Buffer, BufferDescriptor, BufferUsage, GraphicsConfig, GraphicsDevice,
    GraphicsInstance, Handle, ImageData, Shader, ShaderDescriptor, ShaderProgram, ShaderSource,
    ShaderStage, Texture, TextureDescriptor, TextureFormat, TextureUsage,
};

// ============================================================================
// Test Context
// ============================================================================

/// Test context owning one device.
pub struct TestContext {
    pub backend: BackendKind,
    pub device: GraphicsDevice,
}

impl TestContext {
    /// Create a context for `backend` with the default configuration.
    ///
    /// Returns `None` if the backend is not compiled in.
    pub fn new(backend: BackendKind) -> Option<Self> {
        Self::with_config(backend, GraphicsConfig::default())
    }

    pub fn with_config(backend: BackendKind, config: GraphicsConfig) -> Option<Self> {
        let _ = env_logger::builder().is_test(true).try_init();
        if !backend.is_available() {
            return None;
        }
        let instance = GraphicsInstance::new(GraphicsConfig {
            backend: backend.name().to_string(),
            ..config
        });
        let device = instance.create_default_device().ok()?;
        Some(Self { backend, device })
    }

    pub fn create_buffer(&mut self, size: u64, usage: BufferUsage) -> Handle<Buffer> {
        self.device
            .create_buffer(&BufferDescriptor::new(size, usage), None)
            .expect("Failed to create buffer")
    }

    /// Create an RGBA8 2D texture, filled with `data` when given.
    pub fn create_texture_2d(&mut self, width: u32, height: u32, data: Option<&[u8]>) -> Handle<Texture> {
        let desc = TextureDescriptor::new_2d(width, height, TextureFormat::Rgba8Unorm, TextureUsage::COPY_DST);
        let image = data.map(ImageData::rgba8);
        self.device
            .create_texture(&desc, image.as_ref())
            .expect("Failed to create texture")
    }

    /// Create and compile a shader for `stage`.
    pub fn create_shader(&mut self, stage: ShaderStage) -> Handle<Shader> {
        self.create_shader_with(shader_descriptor(stage))
    }

    pub fn create_shader_with(&mut self, descriptor: ShaderDescriptor) -> Handle<Shader> {
        let shader = self
            .device
            .create_shader(&descriptor)
            .expect("Failed to create shader");
        assert!(
            self.device.shader(shader).unwrap().has_bytecode(),
            "{:?}: {stage} shader did not compile",
            self.backend,
            stage = descriptor.stage
        );
        shader
    }

    /// Create a program with one compiled shader per stage in `stages`.
    pub fn create_program(&mut self, stages: &[ShaderStage]) -> Handle<ShaderProgram> {
        let program = self.device.create_program(Some("test program"));
        for stage in stages {
            let shader = self.create_shader(*stage);
            self.device
                .attach_shader(program, shader)
                .expect("Failed to attach shader");
        }
        program
    }
}

/// Descriptor of a trivially compiling shader for `stage`.
pub fn shader_descriptor(stage: ShaderStage) -> ShaderDescriptor {
    ShaderDescriptor::new(stage, ShaderSource::code(format!("void main() {{}} // {stage} stage\n"), "main"))
}

/// Generate a test pattern of `size` bytes.
pub fn generate_test_pattern(size: usize) -> Vec<u8> {
    (0..size).map(|i| (i % 256) as u8).collect()
}
