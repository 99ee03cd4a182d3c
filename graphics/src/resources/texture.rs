//! Texture resource.

use crate::backend::NativeTexture;
use crate::types::{Extent3d, TextureDescriptor, TextureFormat, TextureKind};

/// A texture and its native object.
///
/// Textures are built by [`GraphicsDevice::create_texture`](crate::GraphicsDevice::create_texture),
/// which routes through the texture builder.
///
/// # Example
///
/// ```ignore
/// let handle = device.create_texture(
///     &TextureDescriptor::new_2d(1920, 1080, TextureFormat::Rgba8Unorm, TextureUsage::SAMPLED),
///     None,
/// )?;
/// let texture = device.texture(handle)?;
/// println!("Texture size: {}x{}", texture.width(), texture.height());
/// ```
pub struct Texture {
    descriptor: TextureDescriptor,
    native: NativeTexture,
}

impl Texture {
    pub(crate) fn new(descriptor: TextureDescriptor, native: NativeTexture) -> Self {
        Self { descriptor, native }
    }

    /// The descriptor the texture was requested with.
    pub fn descriptor(&self) -> &TextureDescriptor {
        &self.descriptor
    }

    pub fn kind(&self) -> TextureKind {
        self.descriptor.kind
    }

    pub fn format(&self) -> TextureFormat {
        self.descriptor.format
    }

    pub fn size(&self) -> Extent3d {
        self.descriptor.size
    }

    pub fn width(&self) -> u32 {
        self.descriptor.size.width
    }

    pub fn height(&self) -> u32 {
        self.descriptor.size.height
    }

    /// Slices, layers or cubes, depending on the kind.
    pub fn depth(&self) -> u32 {
        self.descriptor.size.depth
    }

    pub fn mip_level_count(&self) -> u32 {
        self.descriptor.mip_level_count
    }

    pub fn label(&self) -> Option<&str> {
        self.descriptor.label.as_deref()
    }

    pub(crate) fn native(&self) -> &NativeTexture {
        &self.native
    }

    pub(crate) fn into_native(self) -> NativeTexture {
        self.native
    }
}

impl std::fmt::Debug for Texture {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Texture")
            .field("kind", &self.descriptor.kind)
            .field("size", &self.descriptor.size)
            .field("format", &self.descriptor.format)
            .field("label", &self.descriptor.label)
            .finish()
    }
}

static_assertions::assert_impl_all!(Texture: Send, Sync);
