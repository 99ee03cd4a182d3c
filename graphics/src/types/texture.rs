//! Texture types and descriptors.

use std::fmt;

use bitflags::bitflags;

use super::{DataType, Extent3d, ImageFormat, Offset3d};
use crate::capabilities::Feature;

/// Texture dimensionality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureKind {
    Texture1D,
    Texture2D,
    Texture3D,
    TextureCube,
    Texture1DArray,
    Texture2DArray,
    TextureCubeArray,
    Texture2DMS,
    Texture2DMSArray,
}

impl TextureKind {
    pub fn is_array(&self) -> bool {
        matches!(
            self,
            Self::Texture1DArray | Self::Texture2DArray | Self::TextureCubeArray | Self::Texture2DMSArray
        )
    }

    pub fn is_cube(&self) -> bool {
        matches!(self, Self::TextureCube | Self::TextureCubeArray)
    }

    pub fn is_multisample(&self) -> bool {
        matches!(self, Self::Texture2DMS | Self::Texture2DMSArray)
    }

    pub fn is_1d(&self) -> bool {
        matches!(self, Self::Texture1D | Self::Texture1DArray)
    }

    /// Features the device must expose before this kind can be created.
    pub fn required_features(&self) -> &'static [Feature] {
        match self {
            Self::Texture1D | Self::Texture2D => &[],
            Self::Texture3D => &[Feature::Textures3D],
            Self::TextureCube => &[Feature::CubeTextures],
            Self::Texture1DArray | Self::Texture2DArray => &[Feature::TextureArrays],
            Self::TextureCubeArray => &[Feature::CubeTextureArrays],
            Self::Texture2DMS => &[Feature::MultisampleTextures],
            Self::Texture2DMSArray => &[Feature::MultisampleTextures, Feature::TextureArrays],
        }
    }
}

impl fmt::Display for TextureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Cube map face, in upload order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CubeFace {
    PositiveX,
    NegativeX,
    PositiveY,
    NegativeY,
    PositiveZ,
    NegativeZ,
}

impl CubeFace {
    pub const ALL: [CubeFace; 6] = [
        CubeFace::PositiveX,
        CubeFace::NegativeX,
        CubeFace::PositiveY,
        CubeFace::NegativeY,
        CubeFace::PositiveZ,
        CubeFace::NegativeZ,
    ];

    pub fn index(&self) -> u32 {
        *self as u32
    }
}

/// Native texel encodings.
///
/// Names list channels in memory order and their numeric interpretation.
/// The `Bc*` formats store 4x4 texel blocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[non_exhaustive]
pub enum TextureFormat {
    R8Unorm,
    R8Snorm,
    R8Uint,
    R8Sint,
    R16Unorm,
    R16Float,
    Rg8Unorm,
    R32Float,
    R32Uint,
    Rg16Float,
    #[default]
    Rgba8Unorm,
    Rgba8UnormSrgb,
    Bgra8Unorm,
    Bgra8UnormSrgb,
    Rgba16Float,
    Rg32Float,
    Rgba32Float,
    Depth16Unorm,
    /// At least 24 bits of depth, stored in 32.
    Depth24Plus,
    Depth24PlusStencil8,
    Depth32Float,
    /// 32-bit float depth, 8-bit stencil, 24 bits padding.
    Depth32FloatStencil8,
    /// 8 bytes per block, 1-bit alpha.
    Bc1RgbaUnorm,
    /// 16 bytes per block, explicit 4-bit alpha.
    Bc2RgbaUnorm,
    /// 16 bytes per block, interpolated alpha.
    Bc3RgbaUnorm,
}

impl TextureFormat {
    pub fn is_depth_stencil(&self) -> bool {
        matches!(
            self,
            Self::Depth16Unorm
                | Self::Depth24Plus
                | Self::Depth24PlusStencil8
                | Self::Depth32Float
                | Self::Depth32FloatStencil8
        )
    }

    pub fn has_stencil(&self) -> bool {
        matches!(self, Self::Depth24PlusStencil8 | Self::Depth32FloatStencil8)
    }

    pub fn is_compressed(&self) -> bool {
        matches!(
            self,
            Self::Bc1RgbaUnorm | Self::Bc2RgbaUnorm | Self::Bc3RgbaUnorm
        )
    }

    /// Edge length of one block in texels (1 for uncompressed formats).
    pub fn block_dimension(&self) -> u32 {
        if self.is_compressed() {
            4
        } else {
            1
        }
    }

    /// Bytes per texel, or per block for compressed formats.
    pub fn block_size(&self) -> u32 {
        match self {
            Self::R8Unorm | Self::R8Snorm | Self::R8Uint | Self::R8Sint => 1,
            Self::R16Unorm | Self::R16Float | Self::Rg8Unorm | Self::Depth16Unorm => 2,
            Self::R32Float
            | Self::R32Uint
            | Self::Rg16Float
            | Self::Rgba8Unorm
            | Self::Rgba8UnormSrgb
            | Self::Bgra8Unorm
            | Self::Bgra8UnormSrgb
            | Self::Depth24Plus
            | Self::Depth24PlusStencil8
            | Self::Depth32Float => 4,
            Self::Rgba16Float
            | Self::Rg32Float
            | Self::Depth32FloatStencil8
            | Self::Bc1RgbaUnorm => 8,
            Self::Rgba32Float | Self::Bc2RgbaUnorm | Self::Bc3RgbaUnorm => 16,
        }
    }

    /// Bytes needed to store `extent` (depth counts raw layers or slices).
    pub fn storage_size(&self, extent: Extent3d) -> u64 {
        let block = self.block_dimension();
        let blocks_x = extent.width.div_ceil(block) as u64;
        let blocks_y = extent.height.div_ceil(block) as u64;
        blocks_x * blocks_y * extent.depth as u64 * self.block_size() as u64
    }
}

bitflags! {
    /// Ways a texture may be bound or transferred.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct TextureUsage: u32 {
        const COPY_SRC = 1 << 0;
        const COPY_DST = 1 << 1;
        const SAMPLED = 1 << 2;
        const STORAGE = 1 << 3;
        const RENDER_ATTACHMENT = 1 << 4;
        /// Presentation buffer of a render context.
        const PRESENT = 1 << 5;
    }
}

/// Descriptor of a texture as requested by the caller.
///
/// `size.depth` holds slices for 3D textures, layers for 1D/2D arrays and
/// cube counts for cube arrays; it is 1 for every other kind.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TextureDescriptor {
    pub label: Option<String>,
    pub kind: TextureKind,
    pub size: Extent3d,
    pub mip_level_count: u32,
    /// Greater than 1 only for multisample kinds.
    pub sample_count: u32,
    /// Multisample kinds only: use the standard sample pattern.
    pub fixed_sample_locations: bool,
    pub format: TextureFormat,
    pub usage: TextureUsage,
}

impl TextureDescriptor {
    fn with_kind(kind: TextureKind, size: Extent3d, format: TextureFormat, usage: TextureUsage) -> Self {
        Self {
            label: None,
            kind,
            size,
            mip_level_count: 1,
            sample_count: 1,
            fixed_sample_locations: true,
            format,
            usage,
        }
    }

    pub fn new_1d(width: u32, format: TextureFormat, usage: TextureUsage) -> Self {
        Self::with_kind(TextureKind::Texture1D, Extent3d::new_1d(width), format, usage)
    }

    pub fn new_2d(width: u32, height: u32, format: TextureFormat, usage: TextureUsage) -> Self {
        Self::with_kind(TextureKind::Texture2D, Extent3d::new_2d(width, height), format, usage)
    }

    pub fn new_3d(
        width: u32,
        height: u32,
        depth: u32,
        format: TextureFormat,
        usage: TextureUsage,
    ) -> Self {
        Self::with_kind(
            TextureKind::Texture3D,
            Extent3d::new_3d(width, height, depth),
            format,
            usage,
        )
    }

    /// Create a cube texture with square faces of `size` texels.
    pub fn new_cube(size: u32, format: TextureFormat, usage: TextureUsage) -> Self {
        Self::with_kind(TextureKind::TextureCube, Extent3d::new_2d(size, size), format, usage)
    }

    pub fn new_1d_array(width: u32, layers: u32, format: TextureFormat, usage: TextureUsage) -> Self {
        Self::with_kind(
            TextureKind::Texture1DArray,
            Extent3d::new_3d(width, 1, layers),
            format,
            usage,
        )
    }

    pub fn new_2d_array(
        width: u32,
        height: u32,
        layers: u32,
        format: TextureFormat,
        usage: TextureUsage,
    ) -> Self {
        Self::with_kind(
            TextureKind::Texture2DArray,
            Extent3d::new_3d(width, height, layers),
            format,
            usage,
        )
    }

    pub fn new_cube_array(
        size: u32,
        cubes: u32,
        format: TextureFormat,
        usage: TextureUsage,
    ) -> Self {
        Self::with_kind(
            TextureKind::TextureCubeArray,
            Extent3d::new_3d(size, size, cubes),
            format,
            usage,
        )
    }

    pub fn new_2d_multisample(
        width: u32,
        height: u32,
        samples: u32,
        format: TextureFormat,
        usage: TextureUsage,
    ) -> Self {
        Self::with_kind(
            TextureKind::Texture2DMS,
            Extent3d::new_2d(width, height),
            format,
            usage,
        )
        .with_sample_count(samples)
    }

    pub fn new_2d_multisample_array(
        width: u32,
        height: u32,
        layers: u32,
        samples: u32,
        format: TextureFormat,
        usage: TextureUsage,
    ) -> Self {
        Self::with_kind(
            TextureKind::Texture2DMSArray,
            Extent3d::new_3d(width, height, layers),
            format,
            usage,
        )
        .with_sample_count(samples)
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_mip_levels(mut self, count: u32) -> Self {
        self.mip_level_count = count;
        self
    }

    pub fn with_sample_count(mut self, count: u32) -> Self {
        self.sample_count = count;
        self
    }

    pub fn with_fixed_sample_locations(mut self, fixed: bool) -> Self {
        self.fixed_sample_locations = fixed;
        self
    }

    /// Native layer count: cube faces are counted individually.
    pub fn raw_layers(&self) -> u32 {
        match self.kind {
            TextureKind::Texture1D | TextureKind::Texture2D | TextureKind::Texture3D => 1,
            TextureKind::Texture2DMS => 1,
            TextureKind::TextureCube => 6,
            TextureKind::TextureCubeArray => self.size.depth * 6,
            TextureKind::Texture1DArray
            | TextureKind::Texture2DArray
            | TextureKind::Texture2DMSArray => self.size.depth,
        }
    }

    /// Native extent where `depth` is the 3D depth or the raw layer count.
    pub fn raw_extent(&self) -> Extent3d {
        let depth = match self.kind {
            TextureKind::Texture3D => self.size.depth,
            _ => self.raw_layers(),
        };
        Extent3d::new_3d(self.size.width, self.size.height, depth)
    }
}

/// Sub-resource region of a texture.
///
/// For arrays `offset.z`/`extent.depth` address layers; for cube kinds they
/// address faces, with cube-array face `layer * 6 + face`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureRegion {
    pub mip_level: u32,
    pub offset: Offset3d,
    pub extent: Extent3d,
}

impl TextureRegion {
    pub fn new(offset: Offset3d, extent: Extent3d) -> Self {
        Self {
            mip_level: 0,
            offset,
            extent,
        }
    }

    /// Region covering one face of a cube or cube-array layer.
    pub fn cube_face(layer: u32, face: CubeFace, size: u32) -> Self {
        Self::new(
            Offset3d::new(0, 0, layer * 6 + face.index()),
            Extent3d::new_2d(size, size),
        )
    }

    pub fn with_mip_level(mut self, level: u32) -> Self {
        self.mip_level = level;
        self
    }
}

/// Caller-supplied texel data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageData<'a> {
    pub format: ImageFormat,
    pub data_type: DataType,
    pub data: &'a [u8],
    /// Byte size of the compressed blocks, per cube face for cube kinds.
    pub compressed_size: u64,
}

impl<'a> ImageData<'a> {
    pub fn new(format: ImageFormat, data_type: DataType, data: &'a [u8]) -> Self {
        Self {
            format,
            data_type,
            data,
            compressed_size: 0,
        }
    }

    /// Tightly packed RGBA8 texels.
    pub fn rgba8(data: &'a [u8]) -> Self {
        Self::new(ImageFormat::Rgba, DataType::UInt8, data)
    }

    pub fn compressed(data: &'a [u8], compressed_size: u64) -> Self {
        Self {
            format: ImageFormat::Compressed,
            data_type: DataType::UInt8,
            data,
            compressed_size,
        }
    }

    pub fn is_compressed(&self) -> bool {
        self.format == ImageFormat::Compressed
    }

    /// Bytes per texel of the source layout.
    pub fn texel_size(&self) -> u32 {
        self.format.components() * self.data_type.size()
    }
}
