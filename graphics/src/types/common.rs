//! Common types shared across the graphics system.

use std::fmt;

// ============================================================================
// Extent / Offset
// ============================================================================

/// 3D extent for textures and copy regions.
///
/// `depth` counts slices for 3D textures, layers for arrays, cubes for cube
/// arrays, and is 1 otherwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Extent3d {
    pub width: u32,
    pub height: u32,
    pub depth: u32,
}

impl Default for Extent3d {
    fn default() -> Self {
        Self::new_3d(1, 1, 1)
    }
}

impl Extent3d {
    pub fn new_1d(width: u32) -> Self {
        Self::new_3d(width, 1, 1)
    }

    pub fn new_2d(width: u32, height: u32) -> Self {
        Self::new_3d(width, height, 1)
    }

    pub fn new_3d(width: u32, height: u32, depth: u32) -> Self {
        Self {
            width,
            height,
            depth,
        }
    }

    pub fn texel_count(&self) -> u64 {
        self.width as u64 * self.height as u64 * self.depth as u64
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0 || self.depth == 0
    }

    /// Extent of mip level `level`, clamped to one texel per edge.
    pub fn mip_level(&self, level: u32) -> Self {
        Self {
            width: (self.width >> level).max(1),
            height: (self.height >> level).max(1),
            depth: self.depth,
        }
    }
}

impl fmt::Display for Extent3d {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}x{}", self.width, self.height, self.depth)
    }
}

/// 3D texel offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Offset3d {
    pub x: u32,
    pub y: u32,
    pub z: u32,
}

impl Offset3d {
    pub fn new(x: u32, y: u32, z: u32) -> Self {
        Self { x, y, z }
    }
}

/// RGBA clear color.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ClearColor {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl ClearColor {
    pub fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    pub fn to_array(self) -> [f32; 4] {
        [self.r, self.g, self.b, self.a]
    }
}

// ============================================================================
// Host image layout
// ============================================================================

/// Channel layout of caller-supplied image data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImageFormat {
    R,
    Rg,
    Rgb,
    Rgba,
    Bgr,
    Bgra,
    Depth,
    DepthStencil,
    /// Pre-compressed blocks; the data type is ignored.
    Compressed,
}

impl ImageFormat {
    pub fn components(&self) -> u32 {
        match self {
            Self::R | Self::Depth => 1,
            Self::Rg | Self::DepthStencil => 2,
            Self::Rgb | Self::Bgr => 3,
            Self::Rgba | Self::Bgra => 4,
            Self::Compressed => 0,
        }
    }
}

/// Scalar component type of image data and vertex attributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataType {
    Int8,
    UInt8,
    Int16,
    UInt16,
    Int32,
    UInt32,
    Float16,
    Float32,
    Float64,
}

impl DataType {
    pub fn size(&self) -> u32 {
        match self {
            Self::Int8 | Self::UInt8 => 1,
            Self::Int16 | Self::UInt16 | Self::Float16 => 2,
            Self::Int32 | Self::UInt32 | Self::Float32 => 4,
            Self::Float64 => 8,
        }
    }

    pub fn is_float(&self) -> bool {
        matches!(self, Self::Float16 | Self::Float32 | Self::Float64)
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}
