//! Common types and descriptors for graphics resources.
//!
//! This module contains format enums, usage flags, and descriptor structs
//! used throughout the graphics system.

mod buffer;
mod common;
mod context;
mod query;
mod sampler;
mod shader;
mod texture;

pub use buffer::{BufferArrayKind, BufferDescriptor, BufferUsage};
pub use common::{ClearColor, DataType, Extent3d, ImageFormat, Offset3d};
pub use context::{RenderContextDescriptor, VideoMode, Vsync};
pub use query::{QueryDescriptor, QueryKind};
pub use sampler::{CompareOp, SamplerDescriptor, TextureFilter, TextureWrap, MAX_ANISOTROPY};
pub use shader::{
    ConstantBufferViewDescriptor, ShaderDescriptor, ShaderSource, ShaderStage, ShaderStages,
    StorageBufferViewDescriptor, StreamOutputAttribute, VertexAttribute, VertexFormat,
};
pub use texture::{
    CubeFace, ImageData, TextureDescriptor, TextureFormat, TextureKind, TextureRegion,
    TextureUsage,
};
