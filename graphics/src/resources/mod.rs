//! Hardware objects owned by the resource registry.
//!
//! This module contains the object types stored by a device's
//! [`ResourceRegistry`](crate::registry::ResourceRegistry):
//! - [`Buffer`] - device memory buffer
//! - [`BufferArray`] - non-owning group of buffers bound together
//! - [`Texture`] - texture with its native object
//! - [`Sampler`] - texture sampler state
//! - [`Query`] - occlusion, timing or stream-output query
//! - [`Pipeline`] - graphics or compute pipeline over a linked program
//!
//! Each object keeps a copy of its creation descriptor and the backend's
//! native object. Objects refer to each other through
//! [`Handle`](crate::registry::Handle)s and never own one another.

mod buffer;
mod pipeline;
mod query;
mod sampler;
mod texture;

pub use buffer::{Buffer, BufferArray};
pub use pipeline::{Pipeline, PipelineKind};
pub use query::Query;
pub use sampler::Sampler;
pub use texture::Texture;
