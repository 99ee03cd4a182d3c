//! Texel conversion from host image layouts to native texture formats.

use half::f16;

use crate::error::{GraphicsError, GraphicsResult, NativeStatus};
use crate::types::{DataType, ImageData, ImageFormat, TextureFormat};

/// One decoded source texel.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Texel {
    /// Floats as stored, integers scaled to `[0, 1]` or `[-1, 1]`.
    norm: [f32; 4],
    /// Integers as stored, for integer formats.
    raw: [f64; 4],
    stencil: u8,
}

impl Default for Texel {
    fn default() -> Self {
        Self {
            norm: [0.0, 0.0, 0.0, 1.0],
            raw: [0.0, 0.0, 0.0, 1.0],
            stencil: 0,
        }
    }
}

/// Host layout whose bytes already match `format`.
fn native_layout(format: TextureFormat) -> Option<(ImageFormat, DataType)> {
    use TextureFormat as F;
    let layout = match format {
        F::R8Unorm | F::R8Uint => (ImageFormat::R, DataType::UInt8),
        F::R8Sint => (ImageFormat::R, DataType::Int8),
        F::R16Unorm => (ImageFormat::R, DataType::UInt16),
        F::R16Float => (ImageFormat::R, DataType::Float16),
        F::Rg8Unorm => (ImageFormat::Rg, DataType::UInt8),
        F::R32Float => (ImageFormat::R, DataType::Float32),
        F::R32Uint => (ImageFormat::R, DataType::UInt32),
        F::Rg16Float => (ImageFormat::Rg, DataType::Float16),
        F::Rgba8Unorm | F::Rgba8UnormSrgb => (ImageFormat::Rgba, DataType::UInt8),
        F::Bgra8Unorm | F::Bgra8UnormSrgb => (ImageFormat::Bgra, DataType::UInt8),
        F::Rgba16Float => (ImageFormat::Rgba, DataType::Float16),
        F::Rg32Float => (ImageFormat::Rg, DataType::Float32),
        F::Rgba32Float => (ImageFormat::Rgba, DataType::Float32),
        F::Depth16Unorm => (ImageFormat::Depth, DataType::UInt16),
        F::Depth32Float => (ImageFormat::Depth, DataType::Float32),
        _ => return None,
    };
    Some(layout)
}

/// Convert uncompressed image data into the native encoding of `format`.
pub(crate) fn convert(image: &ImageData<'_>, format: TextureFormat) -> GraphicsResult<Vec<u8>> {
    if format.is_compressed() {
        return Err(GraphicsError::invalid(format!(
            "{format:?} textures take pre-compressed image data"
        )));
    }
    if image.is_compressed() {
        return Err(GraphicsError::invalid(format!(
            "pre-compressed image data cannot be uploaded to {format:?}"
        )));
    }
    let texel_size = image.texel_size() as usize;
    if image.data.len() % texel_size != 0 {
        return Err(GraphicsError::invalid(format!(
            "image data length {} is not a multiple of the {texel_size}-byte texel",
            image.data.len()
        )));
    }
    if native_layout(format) == Some((image.format, image.data_type)) {
        return Ok(image.data.to_vec());
    }

    let texels = image.data.len() / texel_size;
    let mut out = Vec::with_capacity(texels * format.block_size() as usize);
    for chunk in image.data.chunks_exact(texel_size) {
        encode(decode(chunk, image.format, image.data_type), format, &mut out)?;
    }
    Ok(out)
}

/// `texel_count` copies of an RGBA8 texel, in the native encoding of `format`.
pub(crate) fn fill(texel: [u8; 4], texel_count: u64, format: TextureFormat) -> GraphicsResult<Vec<u8>> {
    let encoded = convert(&ImageData::rgba8(&texel), format)?;
    let out_of_memory = || GraphicsError::device("CreateTexture", NativeStatus::OutOfMemory);
    let len = usize::try_from(texel_count)
        .ok()
        .and_then(|count| count.checked_mul(encoded.len()))
        .ok_or_else(out_of_memory)?;
    let mut out = Vec::new();
    out.try_reserve_exact(len).map_err(|_| out_of_memory())?;
    for _ in 0..texel_count {
        out.extend_from_slice(&encoded);
    }
    Ok(out)
}

fn read_component(bytes: &[u8], data_type: DataType) -> (f32, f64) {
    match data_type {
        DataType::Int8 => {
            let v = bytes[0] as i8;
            ((v as f32 / 127.0).max(-1.0), v as f64)
        }
        DataType::UInt8 => (bytes[0] as f32 / 255.0, bytes[0] as f64),
        DataType::Int16 => {
            let v: i16 = bytemuck::pod_read_unaligned(&bytes[..2]);
            ((v as f32 / 32767.0).max(-1.0), v as f64)
        }
        DataType::UInt16 => {
            let v: u16 = bytemuck::pod_read_unaligned(&bytes[..2]);
            (v as f32 / 65535.0, v as f64)
        }
        DataType::Int32 => {
            let v: i32 = bytemuck::pod_read_unaligned(&bytes[..4]);
            ((v as f64 / i32::MAX as f64).max(-1.0) as f32, v as f64)
        }
        DataType::UInt32 => {
            let v: u32 = bytemuck::pod_read_unaligned(&bytes[..4]);
            ((v as f64 / u32::MAX as f64) as f32, v as f64)
        }
        DataType::Float16 => {
            let v: f16 = bytemuck::pod_read_unaligned(&bytes[..2]);
            (v.to_f32(), v.to_f64())
        }
        DataType::Float32 => {
            let v: f32 = bytemuck::pod_read_unaligned(&bytes[..4]);
            (v, v as f64)
        }
        DataType::Float64 => {
            let v: f64 = bytemuck::pod_read_unaligned(&bytes[..8]);
            (v as f32, v)
        }
    }
}

fn decode(bytes: &[u8], layout: ImageFormat, data_type: DataType) -> Texel {
    let size = data_type.size() as usize;
    let component = |i: usize| read_component(&bytes[i * size..], data_type);
    // Destination channel of each source component.
    let channels: &[usize] = match layout {
        ImageFormat::R | ImageFormat::Depth | ImageFormat::DepthStencil => &[0],
        ImageFormat::Rg => &[0, 1],
        ImageFormat::Rgb => &[0, 1, 2],
        ImageFormat::Rgba => &[0, 1, 2, 3],
        ImageFormat::Bgr => &[2, 1, 0],
        ImageFormat::Bgra => &[2, 1, 0, 3],
        ImageFormat::Compressed => &[],
    };

    let mut texel = Texel::default();
    for (i, &channel) in channels.iter().enumerate() {
        let (norm, raw) = component(i);
        texel.norm[channel] = norm;
        texel.raw[channel] = raw;
    }
    if layout == ImageFormat::DepthStencil {
        texel.stencil = component(1).1.clamp(0.0, 255.0) as u8;
    }
    texel
}

fn unorm8(v: f32) -> u8 {
    (v.clamp(0.0, 1.0) * 255.0).round() as u8
}

fn snorm8(v: f32) -> i8 {
    (v.clamp(-1.0, 1.0) * 127.0).round() as i8
}

fn unorm16(v: f32) -> u16 {
    (v.clamp(0.0, 1.0) * 65535.0).round() as u16
}

fn unorm24(v: f32) -> u32 {
    (v.clamp(0.0, 1.0) as f64 * 16_777_215.0).round() as u32
}

fn push<T: bytemuck::Pod>(out: &mut Vec<u8>, value: T) {
    out.extend_from_slice(bytemuck::bytes_of(&value));
}

fn encode(texel: Texel, format: TextureFormat, out: &mut Vec<u8>) -> GraphicsResult<()> {
    use TextureFormat as F;
    let [r, g, b, a] = texel.norm;
    match format {
        F::R8Unorm => out.push(unorm8(r)),
        F::R8Snorm => out.push(snorm8(r) as u8),
        F::R8Uint => out.push(texel.raw[0].clamp(0.0, 255.0) as u8),
        F::R8Sint => out.push(texel.raw[0].clamp(-128.0, 127.0) as i8 as u8),
        F::R16Unorm | F::Depth16Unorm => push(out, unorm16(r)),
        F::R16Float => push(out, f16::from_f32(r)),
        F::Rg8Unorm => out.extend_from_slice(&[unorm8(r), unorm8(g)]),
        F::R32Float | F::Depth32Float => push(out, r),
        F::R32Uint => push(out, texel.raw[0].clamp(0.0, u32::MAX as f64) as u32),
        F::Rg16Float => push(out, [f16::from_f32(r), f16::from_f32(g)]),
        F::Rgba8Unorm | F::Rgba8UnormSrgb => {
            out.extend_from_slice(&[unorm8(r), unorm8(g), unorm8(b), unorm8(a)])
        }
        F::Bgra8Unorm | F::Bgra8UnormSrgb => {
            out.extend_from_slice(&[unorm8(b), unorm8(g), unorm8(r), unorm8(a)])
        }
        F::Rgba16Float => push(out, texel.norm.map(f16::from_f32)),
        F::Rg32Float => push(out, [r, g]),
        F::Rgba32Float => push(out, texel.norm),
        F::Depth24Plus => push(out, unorm24(r)),
        F::Depth24PlusStencil8 => push(out, unorm24(r) | (texel.stencil as u32) << 24),
        F::Depth32FloatStencil8 => {
            push(out, r);
            out.extend_from_slice(&[texel.stencil, 0, 0, 0]);
        }
        F::Bc1RgbaUnorm | F::Bc2RgbaUnorm | F::Bc3RgbaUnorm => {
            return Err(GraphicsError::invalid(format!(
                "{format:?} has no per-texel encoding"
            )))
        }
    }
    Ok(())
}
