//! Texture construction, update and description.
//!
//! [`TextureBuilder`] sits between the device and the backend for every
//! texture operation. It gates optional shapes, validates descriptors and
//! regions against the device limits, converts image payloads to the native
//! texel encoding, and decides how a new texture gets its first content:
//!
//! 1. a caller payload is uploaded with the allocation;
//! 2. compressed formats without a payload are allocated empty;
//! 3. everything else is filled with the default texel, except multisample
//!    kinds, which are never uploaded to.
//!
//! Cube kinds consume the payload face by face in `+X, -X, +Y, -Y, +Z, -Z`
//! order, layer after layer for cube arrays.

mod texels;

use crate::backend::{storage_size, Backend, NativeTexture, SubresourceData};
use crate::capabilities::CapabilityGate;
use crate::error::{GraphicsError, GraphicsResult};
use crate::resources::Texture;
use crate::types::{
    DataType, Extent3d, ImageData, ImageFormat, TextureDescriptor, TextureFormat, TextureKind,
    TextureRegion,
};

/// Texture properties read back from the live native object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextureDescription {
    pub kind: TextureKind,
    pub format: TextureFormat,
    /// Logical extent: `depth` counts slices, layers or cubes.
    pub size: Extent3d,
    pub mip_level_count: u32,
    pub sample_count: u32,
}

/// Dispatches texture operations for one device.
pub(crate) struct TextureBuilder<'a> {
    backend: &'a mut dyn Backend,
    gate: &'a CapabilityGate,
    default_texel: [u8; 4],
}

impl<'a> TextureBuilder<'a> {
    pub fn new(backend: &'a mut dyn Backend, gate: &'a CapabilityGate, default_texel: [u8; 4]) -> Self {
        Self {
            backend,
            gate,
            default_texel,
        }
    }

    /// Allocate a texture and give it its first content.
    pub fn build(&mut self, desc: &TextureDescriptor, image: Option<&ImageData<'_>>) -> GraphicsResult<NativeTexture> {
        for feature in desc.kind.required_features() {
            self.gate.assert(*feature, "CreateTexture")?;
        }
        self.validate(desc)?;
        // Over-budget textures fail before any payload is converted or filled.
        self.backend
            .memory()
            .ensure_available(storage_size(desc), "CreateTexture")?;

        let raw = desc.raw_extent();
        let content = match image {
            Some(_) if desc.kind.is_multisample() => {
                return Err(GraphicsError::invalid(
                    "multisample textures cannot be created with image data",
                ))
            }
            Some(image) if desc.format.is_compressed() => Some(compressed_payload(desc, image)?),
            Some(image) => {
                let expected = raw.texel_count() * image.texel_size() as u64;
                if image.data.len() as u64 != expected {
                    return Err(GraphicsError::invalid(format!(
                        "image data holds {} bytes, a {} {} texture needs {expected}",
                        image.data.len(),
                        desc.size,
                        desc.kind
                    )));
                }
                Some(texels::convert(image, desc.format)?)
            }
            None if desc.format.is_compressed() || desc.kind.is_multisample() => None,
            None => Some(texels::fill(self.default_texel, raw.texel_count(), desc.format)?),
        };

        let initial = match &content {
            Some(data) => subresources(desc.kind, raw, data),
            None => Vec::new(),
        };
        log::trace!(
            "TextureBuilder: {} {} texture {:?} with {} initial uploads",
            desc.size,
            desc.kind,
            desc.format,
            initial.len()
        );
        self.backend.create_texture(desc, &initial)
    }

    /// Update a region of an existing texture.
    ///
    /// For cube kinds `region.offset.z` and `region.extent.depth` count faces.
    pub fn write(&mut self, texture: &Texture, region: &TextureRegion, image: &ImageData<'_>) -> GraphicsResult<()> {
        let desc = texture.descriptor();
        for feature in desc.kind.required_features() {
            self.gate.assert(*feature, "WriteTexture")?;
        }
        if desc.kind.is_multisample() {
            return Err(GraphicsError::invalid("multisample textures cannot be written"));
        }
        check_region(desc, region)?;

        let data = if desc.format.is_compressed() {
            if !image.is_compressed() {
                return Err(GraphicsError::invalid(format!(
                    "{:?} textures take pre-compressed image data",
                    desc.format
                )));
            }
            let expected = desc.format.storage_size(region.extent);
            if image.compressed_size != expected || (image.data.len() as u64) < expected {
                return Err(GraphicsError::invalid(format!(
                    "region {} of {:?} needs {expected} compressed bytes",
                    region.extent, desc.format
                )));
            }
            image.data[..expected as usize].to_vec()
        } else {
            let expected = region.extent.texel_count() * image.texel_size() as u64;
            if image.data.len() as u64 != expected {
                return Err(GraphicsError::invalid(format!(
                    "image data holds {} bytes, region {} needs {expected}",
                    image.data.len(),
                    region.extent
                )));
            }
            texels::convert(image, desc.format)?
        };
        self.backend.write_texture(texture.native(), region, &data)
    }

    /// Read the extents and format the device actually allocated.
    pub fn describe(&mut self, texture: &Texture) -> TextureDescription {
        let info = self.backend.describe_texture(texture.native());
        let mut size = info.extent;
        if info.kind.is_cube() {
            size.depth /= 6;
        }
        TextureDescription {
            kind: info.kind,
            format: info.format,
            size,
            mip_level_count: info.mip_levels,
            sample_count: info.samples,
        }
    }

    /// Read one mip level in the native encoding.
    pub fn read(&mut self, texture: &Texture, mip_level: u32) -> GraphicsResult<Vec<u8>> {
        if mip_level >= texture.mip_level_count() {
            return Err(GraphicsError::invalid(format!(
                "mip level {mip_level} out of range (texture has {})",
                texture.mip_level_count()
            )));
        }
        if texture.kind().is_multisample() {
            return Err(GraphicsError::invalid("multisample textures cannot be read back"));
        }
        self.backend.read_texture(texture.native(), mip_level)
    }

    fn validate(&self, desc: &TextureDescriptor) -> GraphicsResult<()> {
        let size = desc.size;
        if size.is_empty() {
            return Err(GraphicsError::invalid(format!("texture extent {size} is empty")));
        }
        if desc.kind.is_1d() && size.height != 1 {
            return Err(GraphicsError::invalid(format!("1D texture height must be 1, got {}", size.height)));
        }
        let layered = desc.kind.is_array() || desc.kind == TextureKind::Texture3D;
        if !layered && size.depth != 1 {
            return Err(GraphicsError::invalid(format!(
                "{} texture depth must be 1, got {}",
                desc.kind, size.depth
            )));
        }
        if desc.kind.is_cube() && size.width != size.height {
            return Err(GraphicsError::invalid(format!("cube faces must be square, got {size}")));
        }

        let limits = &self.gate.snapshot().limits;
        let (max_edge, max_layers) = match desc.kind {
            TextureKind::Texture1D | TextureKind::Texture1DArray => (limits.max_texture_1d, limits.max_array_layers),
            TextureKind::Texture3D => (limits.max_texture_3d, limits.max_texture_3d),
            TextureKind::TextureCube | TextureKind::TextureCubeArray => {
                (limits.max_texture_cube, limits.max_array_layers / 6)
            }
            TextureKind::Texture2D
            | TextureKind::Texture2DArray
            | TextureKind::Texture2DMS
            | TextureKind::Texture2DMSArray => (limits.max_texture_2d, limits.max_array_layers),
        };
        self.gate.check_extent(size, max_edge, max_layers, "CreateTexture")?;

        let largest = match desc.kind {
            TextureKind::Texture3D => size.width.max(size.height).max(size.depth),
            _ => size.width.max(size.height),
        };
        let max_mips = u32::BITS - largest.leading_zeros();
        if desc.mip_level_count == 0 || desc.mip_level_count > max_mips {
            return Err(GraphicsError::invalid(format!(
                "mip level count {} out of range 1..={max_mips} for {size}",
                desc.mip_level_count
            )));
        }

        if desc.kind.is_multisample() {
            self.gate.check_samples(desc.sample_count, "CreateTexture")?;
            if desc.mip_level_count != 1 || desc.format.is_compressed() {
                return Err(GraphicsError::invalid(
                    "multisample textures need one mip level and an uncompressed format",
                ));
            }
        } else if desc.sample_count != 1 {
            return Err(GraphicsError::invalid(format!(
                "{} textures are single-sampled, got {} samples",
                desc.kind, desc.sample_count
            )));
        }
        Ok(())
    }
}

/// One texel of `color` in the native encoding of `format`.
pub(crate) fn encode_color(color: [f32; 4], format: TextureFormat) -> GraphicsResult<Vec<u8>> {
    let image = ImageData::new(ImageFormat::Rgba, DataType::Float32, bytemuck::cast_slice(&color));
    texels::convert(&image, format)
}

/// Check `region` against the bounds of its mip level.
fn check_region(desc: &TextureDescriptor, region: &TextureRegion) -> GraphicsResult<()> {
    if region.mip_level >= desc.mip_level_count {
        return Err(GraphicsError::invalid(format!(
            "mip level {} out of range (texture has {})",
            region.mip_level, desc.mip_level_count
        )));
    }
    if region.extent.is_empty() {
        return Err(GraphicsError::invalid("texture region is empty"));
    }
    let raw = desc.raw_extent();
    let mut level = raw.mip_level(region.mip_level);
    if desc.kind == TextureKind::Texture3D {
        level.depth = (raw.depth >> region.mip_level).max(1);
    }
    let (offset, extent) = (region.offset, region.extent);
    let outside = |start: u32, len: u32, edge: u32| start.checked_add(len).map_or(true, |end| end > edge);
    if outside(offset.x, extent.width, level.width)
        || outside(offset.y, extent.height, level.height)
        || outside(offset.z, extent.depth, level.depth)
    {
        return Err(GraphicsError::invalid(format!(
            "region at ({}, {}, {}) of size {extent} exceeds mip {} bounds {level}",
            offset.x, offset.y, offset.z, region.mip_level
        )));
    }
    Ok(())
}

/// Validate a pre-compressed payload and return the bytes to upload.
fn compressed_payload(desc: &TextureDescriptor, image: &ImageData<'_>) -> GraphicsResult<Vec<u8>> {
    if !image.is_compressed() {
        return Err(GraphicsError::invalid(format!(
            "{:?} textures take pre-compressed image data",
            desc.format
        )));
    }
    let raw = desc.raw_extent();
    // Cube payloads declare the size of one face.
    let (units, unit_extent) = if desc.kind.is_cube() {
        (raw.depth as u64, Extent3d::new_2d(raw.width, raw.height))
    } else {
        (1, raw)
    };
    let unit_size = desc.format.storage_size(unit_extent);
    if image.compressed_size != unit_size {
        return Err(GraphicsError::invalid(format!(
            "compressed size {} does not match the {unit_size} bytes of {:?} at {unit_extent}",
            image.compressed_size, desc.format
        )));
    }
    let total = unit_size * units;
    if (image.data.len() as u64) < total {
        return Err(GraphicsError::invalid(format!(
            "compressed data holds {} bytes, {total} needed",
            image.data.len()
        )));
    }
    Ok(image.data[..total as usize].to_vec())
}

/// Split native mip-0 content into the uploads the backend performs.
fn subresources(kind: TextureKind, raw: Extent3d, data: &[u8]) -> Vec<SubresourceData<'_>> {
    if kind.is_cube() {
        let face_len = data.len() / raw.depth as usize;
        data.chunks_exact(face_len)
            .enumerate()
            .map(|(face, chunk)| SubresourceData {
                first_layer: face as u32,
                layers: 1,
                data: chunk,
            })
            .collect()
    } else {
        vec![SubresourceData {
            first_layer: 0,
            layers: raw.depth,
            data,
        }]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{create_backend, BackendKind};
    use crate::capabilities::{CapabilitySnapshot, Feature};
    use crate::config::GraphicsConfig;
    use crate::error::ErrorKind;
    use crate::types::{CubeFace, Offset3d, TextureUsage};

    fn backend() -> Box<dyn Backend> {
        create_backend(BackendKind::Deferred, &GraphicsConfig::default()).unwrap()
    }

    fn build(desc: &TextureDescriptor, image: Option<&ImageData<'_>>) -> GraphicsResult<(Box<dyn Backend>, Texture)> {
        let mut backend = backend();
        let gate = CapabilityGate::new(CapabilitySnapshot::full());
        let native = TextureBuilder::new(backend.as_mut(), &gate, [255; 4]).build(desc, image)?;
        Ok((backend, Texture::new(desc.clone(), native)))
    }

    #[test]
    fn test_cube_faces_in_order() {
        let desc = TextureDescriptor::new_cube(1, TextureFormat::Rgba8Unorm, TextureUsage::empty());
        let data: Vec<u8> = (0..6).flat_map(|face| [face; 4]).collect();
        let Ok((mut backend, texture)) = build(&desc, Some(&ImageData::rgba8(&data))) else {
            panic!("cube texture creation failed");
        };
        let gate = CapabilityGate::new(CapabilitySnapshot::full());
        let mut builder = TextureBuilder::new(backend.as_mut(), &gate, [255; 4]);

        let content = builder.read(&texture, 0).unwrap();
        for face in CubeFace::ALL {
            let at = face.index() as usize * 4;
            assert_eq!(content[at..at + 4], [face.index() as u8; 4]);
        }
    }

    #[test]
    fn test_compressed_cube_without_payload() {
        let desc = TextureDescriptor::new_cube(8, TextureFormat::Bc1RgbaUnorm, TextureUsage::empty());
        let Ok((mut backend, texture)) = build(&desc, None) else {
            panic!("compressed cube creation failed");
        };
        assert_eq!(backend.stats().uploads, 0);

        let gate = CapabilityGate::new(CapabilitySnapshot::full());
        let description = TextureBuilder::new(backend.as_mut(), &gate, [0; 4]).describe(&texture);
        assert_eq!(description.format, TextureFormat::Bc1RgbaUnorm);
        assert_eq!(description.size, Extent3d::new_3d(8, 8, 1));
    }

    #[test]
    fn test_over_budget_texture_fails_before_fill() {
        let config = GraphicsConfig::default().with_memory_budget(1024);
        let mut backend = create_backend(BackendKind::Deferred, &config).unwrap();
        let gate = CapabilityGate::new(CapabilitySnapshot::full());
        let mut builder = TextureBuilder::new(backend.as_mut(), &gate, [255; 4]);

        // 2^40 bytes of default fill if it were ever staged.
        let desc = TextureDescriptor::new_2d_array(16384, 16384, 1024, TextureFormat::Rgba8Unorm, TextureUsage::empty());
        let err = builder.build(&desc, None).unwrap_err();
        assert_eq!(
            err,
            GraphicsError::device("CreateTexture", crate::error::NativeStatus::OutOfMemory)
        );

        let small = TextureDescriptor::new_2d(16, 16, TextureFormat::Rgba8Unorm, TextureUsage::empty());
        assert!(builder.build(&small, None).is_ok());
        assert_eq!(backend.memory().used(), 1024);
        assert_eq!(backend.stats().uploads, 1);
    }

    #[test]
    fn test_compressed_cube_payload_per_face() {
        let desc = TextureDescriptor::new_cube(4, TextureFormat::Bc1RgbaUnorm, TextureUsage::empty());
        let data = vec![9u8; 48];
        assert!(build(&desc, Some(&ImageData::compressed(&data, 8))).is_ok());

        let err = build(&desc, Some(&ImageData::compressed(&data, 48))).err().map(|e| e.kind());
        assert_eq!(err, Some(ErrorKind::InvalidArgument));
    }

    #[test]
    fn test_payload_size_mismatch() {
        let desc = TextureDescriptor::new_2d(2, 2, TextureFormat::Rgba8Unorm, TextureUsage::empty());
        let err = build(&desc, Some(&ImageData::rgba8(&[0; 12]))).err().map(|e| e.kind());
        assert_eq!(err, Some(ErrorKind::InvalidArgument));
    }

    #[test]
    fn test_gate_runs_before_allocation() {
        let mut backend = backend();
        let gate = CapabilityGate::new(CapabilitySnapshot::full().without(&[Feature::Textures3D]));
        let desc = TextureDescriptor::new_3d(4, 4, 4, TextureFormat::R8Unorm, TextureUsage::empty());

        let err = TextureBuilder::new(backend.as_mut(), &gate, [255; 4])
            .build(&desc, None)
            .err()
            .map(|e| e.kind());
        assert_eq!(err, Some(ErrorKind::NotSupported));
        assert_eq!(backend.memory().used(), 0);
    }

    #[test]
    fn test_region_checks() {
        let desc = TextureDescriptor::new_cube(4, TextureFormat::R8Unorm, TextureUsage::empty());
        assert!(check_region(&desc, &TextureRegion::cube_face(0, CubeFace::NegativeZ, 4)).is_ok());
        assert!(check_region(&desc, &TextureRegion::cube_face(1, CubeFace::PositiveX, 4)).is_err());

        let region = TextureRegion::new(Offset3d::new(2, 0, 0), Extent3d::new_2d(2, 2)).with_mip_level(1);
        assert!(check_region(&desc, &region).is_err());
        assert!(check_region(&desc, &region.with_mip_level(3)).is_err());
    }

    #[test]
    fn test_descriptor_validation() {
        let mut backend = backend();
        let gate = CapabilityGate::new(CapabilitySnapshot::full());
        let mut builder = TextureBuilder::new(backend.as_mut(), &gate, [255; 4]);

        let too_many_mips = TextureDescriptor::new_2d(4, 4, TextureFormat::R8Unorm, TextureUsage::empty()).with_mip_levels(4);
        assert!(builder.build(&too_many_mips, None).is_err());

        let odd_samples = TextureDescriptor::new_2d_multisample(4, 4, 3, TextureFormat::Rgba8Unorm, TextureUsage::empty());
        assert!(builder.build(&odd_samples, None).is_err());

        let not_square = TextureDescriptor::new_2d(4, 2, TextureFormat::R8Unorm, TextureUsage::empty());
        assert!(builder.build(&not_square, None).is_ok());
    }
}
