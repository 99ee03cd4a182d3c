//! Sampler state descriptors.

/// How texture coordinates outside `[0, 1]` resolve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TextureWrap {
    #[default]
    Repeat,
    Mirror,
    Clamp,
    /// Coordinates outside the texture read the border color.
    Border,
    /// Mirror once around zero, then clamp.
    MirrorOnce,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TextureFilter {
    Nearest,
    #[default]
    Linear,
}

/// Depth comparison of shadow samplers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompareOp {
    Never,
    Less,
    Equal,
    LessEqual,
    Greater,
    NotEqual,
    GreaterEqual,
    Always,
}

/// Largest anisotropy any backend accepts.
pub const MAX_ANISOTROPY: u32 = 16;

/// Descriptor of an immutable sampler state object.
///
/// Wrap modes are indexed `[u, v, w]`. With `mip_mapping` off the
/// `mip_filter` and LOD fields are ignored by the device.
#[derive(Debug, Clone, PartialEq)]
pub struct SamplerDescriptor {
    pub label: Option<String>,
    pub wrap: [TextureWrap; 3],
    pub min_filter: TextureFilter,
    pub mag_filter: TextureFilter,
    pub mip_filter: TextureFilter,
    pub mip_mapping: bool,
    pub mip_lod_bias: f32,
    pub lod_min_clamp: f32,
    pub lod_max_clamp: f32,
    /// 1 disables anisotropic filtering.
    pub max_anisotropy: u32,
    pub compare: Option<CompareOp>,
    pub border_color: [f32; 4],
}

impl SamplerDescriptor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Trilinear filtering with repeat wrapping.
    pub fn linear() -> Self {
        Self::default()
    }

    /// Point sampling without mip maps, e.g. for post-process lookups.
    pub fn nearest() -> Self {
        Self {
            min_filter: TextureFilter::Nearest,
            mag_filter: TextureFilter::Nearest,
            mip_filter: TextureFilter::Nearest,
            mip_mapping: false,
            ..Self::default()
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Use `wrap` on every axis.
    pub fn with_wrap(mut self, wrap: TextureWrap) -> Self {
        self.wrap = [wrap; 3];
        self
    }

    pub fn with_border_color(mut self, color: [f32; 4]) -> Self {
        self.wrap = [TextureWrap::Border; 3];
        self.border_color = color;
        self
    }

    pub fn with_lod_range(mut self, min: f32, max: f32) -> Self {
        self.lod_min_clamp = min;
        self.lod_max_clamp = max;
        self
    }

    pub fn with_compare(mut self, compare: CompareOp) -> Self {
        self.compare = Some(compare);
        self
    }

    pub fn with_anisotropy(mut self, max_anisotropy: u32) -> Self {
        self.max_anisotropy = max_anisotropy;
        self
    }
}

impl Default for SamplerDescriptor {
    fn default() -> Self {
        Self {
            label: None,
            wrap: [TextureWrap::Repeat; 3],
            min_filter: TextureFilter::Linear,
            mag_filter: TextureFilter::Linear,
            mip_filter: TextureFilter::Linear,
            mip_mapping: true,
            mip_lod_bias: 0.0,
            lod_min_clamp: 0.0,
            lod_max_clamp: 1000.0,
            max_anisotropy: 1,
            compare: None,
            border_color: [0.0; 4],
        }
    }
}
