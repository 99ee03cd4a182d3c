//! Native texture storage.

use std::ops::Range;
use std::sync::Arc;

use super::memory::{Allocation, CopySpan, MemoryTracker};
use crate::error::{GraphicsError, GraphicsResult, NativeStatus};
use crate::types::{Extent3d, TextureDescriptor, TextureFormat, TextureKind, TextureRegion};

/// Storage of one native texture object: every mip level, packed.
///
/// `extent.depth` is the slice count for volumes and the raw layer count
/// (cube faces included) for everything else.
#[derive(Debug)]
pub struct NativeImage {
    pub id: u64,
    pub format: TextureFormat,
    pub extent: Extent3d,
    pub mip_levels: u32,
    pub samples: u32,
    pub fixed_sample_locations: bool,
    volume: bool,
    level_offsets: Vec<usize>,
    memory: Arc<Allocation>,
}

impl NativeImage {
    pub fn allocate(
        id: u64,
        desc: &TextureDescriptor,
        tracker: &Arc<MemoryTracker>,
        operation: &'static str,
    ) -> GraphicsResult<Self> {
        let volume = desc.kind == TextureKind::Texture3D;
        let extent = desc.raw_extent();
        let samples = if desc.kind.is_multisample() {
            desc.sample_count
        } else {
            1
        };

        let mut level_offsets = Vec::with_capacity(desc.mip_level_count as usize + 1);
        let mut total = 0u64;
        for level in 0..desc.mip_level_count {
            level_offsets.push(total as usize);
            total += level_size(desc, level);
        }
        level_offsets.push(total as usize);

        let memory = tracker.allocate(total, operation)?;
        Ok(Self {
            id,
            format: desc.format,
            extent,
            mip_levels: desc.mip_level_count,
            samples,
            fixed_sample_locations: desc.fixed_sample_locations,
            volume,
            level_offsets,
            memory,
        })
    }

    pub fn memory(&self) -> &Arc<Allocation> {
        &self.memory
    }

    pub fn level_extent(&self, level: u32) -> Extent3d {
        level_extent(self.extent, level, self.volume)
    }

    pub fn level_range(&self, level: u32) -> Range<usize> {
        let level = level as usize;
        self.level_offsets[level]..self.level_offsets[level + 1]
    }

    pub fn read_level(&self, level: u32) -> Vec<u8> {
        self.memory.read(self.level_range(level))
    }

    /// Destination spans for a packed upload of `region`.
    ///
    /// The native layer validates alignment and bounds again. A rejected
    /// region is reported as an invalid native call.
    pub fn region_spans(&self, region: &TextureRegion) -> GraphicsResult<Vec<CopySpan>> {
        const OPERATION: &str = "UpdateSubresource";
        if region.mip_level >= self.mip_levels || self.samples > 1 {
            return Err(GraphicsError::device(OPERATION, NativeStatus::InvalidCall));
        }

        let level = self.level_extent(region.mip_level);
        let (offset, extent) = (region.offset, region.extent);
        if offset.x + extent.width > level.width
            || offset.y + extent.height > level.height
            || offset.z + extent.depth > level.depth
        {
            return Err(GraphicsError::device(OPERATION, NativeStatus::InvalidCall));
        }

        let block = self.format.block_dimension();
        let aligned = |start: u32, len: u32, edge: u32| {
            start % block == 0 && (len % block == 0 || start + len == edge)
        };
        if !aligned(offset.x, extent.width, level.width) || !aligned(offset.y, extent.height, level.height) {
            return Err(GraphicsError::device(OPERATION, NativeStatus::InvalidCall));
        }

        let block_size = self.format.block_size() as usize;
        let row_pitch = level.width.div_ceil(block) as usize * block_size;
        let slice_pitch = row_pitch * level.height.div_ceil(block) as usize;
        let rows = extent.height.div_ceil(block) as usize;
        let row_len = extent.width.div_ceil(block) as usize * block_size;
        let base = self.level_offsets[region.mip_level as usize];
        let x0 = (offset.x / block) as usize * block_size;
        let y0 = (offset.y / block) as usize;

        let mut spans = Vec::with_capacity(rows * extent.depth as usize);
        let mut src = 0;
        for z in 0..extent.depth as usize {
            let slice = base + (offset.z as usize + z) * slice_pitch;
            for y in 0..rows {
                spans.push(CopySpan {
                    dst: slice + (y0 + y) * row_pitch + x0,
                    src,
                    len: row_len,
                });
                src += row_len;
            }
        }
        Ok(spans)
    }

    /// Spans for `region`, rejecting data that does not fill it exactly.
    pub fn checked_spans(&self, region: &TextureRegion, len: usize) -> GraphicsResult<Vec<CopySpan>> {
        let spans = self.region_spans(region)?;
        let expected: usize = spans.iter().map(|span| span.len).sum();
        if expected != len {
            return Err(GraphicsError::device("UpdateSubresource", NativeStatus::InvalidCall));
        }
        Ok(spans)
    }
}

/// Bytes of native storage a texture with `desc` occupies, every mip included.
pub fn storage_size(desc: &TextureDescriptor) -> u64 {
    (0..desc.mip_level_count)
        .map(|level| level_size(desc, level))
        .fold(0u64, u64::saturating_add)
}

fn level_size(desc: &TextureDescriptor, level: u32) -> u64 {
    let volume = desc.kind == TextureKind::Texture3D;
    let samples = if desc.kind.is_multisample() {
        desc.sample_count
    } else {
        1
    };
    let extent = level_extent(desc.raw_extent(), level, volume);
    desc.format.storage_size(extent).saturating_mul(samples as u64)
}

fn level_extent(extent: Extent3d, level: u32, volume: bool) -> Extent3d {
    Extent3d {
        width: (extent.width >> level).max(1),
        height: (extent.height >> level).max(1),
        depth: if volume {
            (extent.depth >> level).max(1)
        } else {
            extent.depth
        },
    }
}

/// Native texture object, tagged by dimensionality.
///
/// Exactly one variant is live per texture; consumers match exhaustively.
#[derive(Debug)]
pub enum NativeTexture {
    Texture1D(NativeImage),
    Texture2D(NativeImage),
    Texture3D(NativeImage),
    TextureCube(NativeImage),
    Texture1DArray(NativeImage),
    Texture2DArray(NativeImage),
    TextureCubeArray(NativeImage),
    Texture2DMS(NativeImage),
    Texture2DMSArray(NativeImage),
}

impl NativeTexture {
    pub fn new(kind: TextureKind, image: NativeImage) -> Self {
        match kind {
            TextureKind::Texture1D => Self::Texture1D(image),
            TextureKind::Texture2D => Self::Texture2D(image),
            TextureKind::Texture3D => Self::Texture3D(image),
            TextureKind::TextureCube => Self::TextureCube(image),
            TextureKind::Texture1DArray => Self::Texture1DArray(image),
            TextureKind::Texture2DArray => Self::Texture2DArray(image),
            TextureKind::TextureCubeArray => Self::TextureCubeArray(image),
            TextureKind::Texture2DMS => Self::Texture2DMS(image),
            TextureKind::Texture2DMSArray => Self::Texture2DMSArray(image),
        }
    }

    pub fn kind(&self) -> TextureKind {
        match self {
            Self::Texture1D(_) => TextureKind::Texture1D,
            Self::Texture2D(_) => TextureKind::Texture2D,
            Self::Texture3D(_) => TextureKind::Texture3D,
            Self::TextureCube(_) => TextureKind::TextureCube,
            Self::Texture1DArray(_) => TextureKind::Texture1DArray,
            Self::Texture2DArray(_) => TextureKind::Texture2DArray,
            Self::TextureCubeArray(_) => TextureKind::TextureCubeArray,
            Self::Texture2DMS(_) => TextureKind::Texture2DMS,
            Self::Texture2DMSArray(_) => TextureKind::Texture2DMSArray,
        }
    }

    pub fn image(&self) -> &NativeImage {
        match self {
            Self::Texture1D(image)
            | Self::Texture2D(image)
            | Self::Texture3D(image)
            | Self::TextureCube(image)
            | Self::Texture1DArray(image)
            | Self::Texture2DArray(image)
            | Self::TextureCubeArray(image)
            | Self::Texture2DMS(image)
            | Self::Texture2DMSArray(image) => image,
        }
    }

    pub fn info(&self) -> NativeTextureInfo {
        let image = self.image();
        NativeTextureInfo {
            kind: self.kind(),
            format: image.format,
            extent: image.extent,
            mip_levels: image.mip_levels,
            samples: image.samples,
        }
    }
}

/// Properties read back from a live native texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NativeTextureInfo {
    pub kind: TextureKind,
    pub format: TextureFormat,
    /// Raw extent: cube faces counted individually in `depth`.
    pub extent: Extent3d,
    pub mip_levels: u32,
    pub samples: u32,
}
