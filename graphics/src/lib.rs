//! # Tessera Graphics
//!
//! Hardware abstraction core over three structurally different device
//! backends: immediate (global binding state), deferred (deferred context,
//! reference-counted objects) and explicit (command lists with timeline
//! fences).
//!
//! ## Overview
//!
//! This crate provides:
//! - [`GraphicsInstance`] - Backend module table and device factory
//! - [`GraphicsDevice`] - One backend, one [`CapabilityGate`], one [`ResourceRegistry`]
//! - [`ShaderProgram`] - Stage composition, declaration merge and link validation
//! - [`FrameScheduler`] - Presentation ring with fence-bounded pipelining
//!
//! ## Example
//!
//! ```ignore
//! use tessera_graphics::*;
//!
//! let instance = GraphicsInstance::new(GraphicsConfig::default().with_env_overrides()?);
//! let mut device = instance.create_default_device()?;
//!
//! let context = device.create_context(&RenderContextDescriptor::new(VideoMode::new(1280, 720)))?;
//! loop {
//!     device.clear(context, ClearColor::new(0.1, 0.1, 0.1, 1.0))?;
//!     device.present(context)?;
//! }
//! ```

pub mod backend;
pub mod capabilities;
pub mod config;
pub mod context;
pub mod device;
pub mod error;
pub mod instance;
pub mod registry;
pub mod resources;
pub mod scheduler;
pub mod shader;
pub mod texture;
pub mod types;

// Re-export main types for convenience
pub use backend::{Backend, BackendKind, BackendStats};
pub use capabilities::{CapabilityGate, CapabilitySnapshot, DeviceLimits, Feature};
pub use config::{ConfigError, GraphicsConfig};
pub use context::RenderContext;
pub use device::GraphicsDevice;
pub use error::{ErrorKind, GraphicsError, GraphicsResult, NativeStatus};
pub use instance::{BackendModule, GraphicsInstance, BUILD_ID};
pub use registry::{Handle, ResourceRegistry};
pub use resources::{Buffer, BufferArray, Pipeline, PipelineKind, Query, Sampler, Texture};
pub use scheduler::{FrameReport, FrameScheduler};
pub use shader::{LinkError, LinkStatus, Shader, ShaderProgram};
pub use texture::TextureDescription;
pub use types::{
    BufferArrayKind, BufferDescriptor, BufferUsage, ClearColor, CompareOp, CubeFace, DataType,
    Extent3d, ImageData, ImageFormat, Offset3d, QueryDescriptor, QueryKind,
    RenderContextDescriptor, SamplerDescriptor, ShaderDescriptor, ShaderSource, ShaderStage,
    ShaderStages, TextureDescriptor, TextureFilter, TextureFormat, TextureKind, TextureRegion,
    TextureUsage, TextureWrap, VertexAttribute, VertexFormat, VideoMode, Vsync,
};

/// Graphics library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
