//! Shader types, reflection declarations and vertex formats.

use std::fmt;

use bitflags::bitflags;

use super::DataType;

/// Pipeline role a shader is attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    Vertex,
    TessControl,
    TessEvaluation,
    Geometry,
    Fragment,
    Compute,
}

impl ShaderStage {
    /// Every stage, in pipeline order.
    pub const ALL: [ShaderStage; 6] = [
        ShaderStage::Vertex,
        ShaderStage::TessControl,
        ShaderStage::TessEvaluation,
        ShaderStage::Geometry,
        ShaderStage::Fragment,
        ShaderStage::Compute,
    ];

    /// Slot index inside a program, equal to the pipeline order.
    pub fn slot(&self) -> usize {
        *self as usize
    }

    pub fn flag(&self) -> ShaderStages {
        match self {
            Self::Vertex => ShaderStages::VERTEX,
            Self::TessControl => ShaderStages::TESS_CONTROL,
            Self::TessEvaluation => ShaderStages::TESS_EVALUATION,
            Self::Geometry => ShaderStages::GEOMETRY,
            Self::Fragment => ShaderStages::FRAGMENT,
            Self::Compute => ShaderStages::COMPUTE,
        }
    }

    /// Prefix of D3D-style compile profiles, e.g. `vs_5_0`.
    pub fn profile_prefix(&self) -> &'static str {
        match self {
            Self::Vertex => "vs_",
            Self::TessControl => "hs_",
            Self::TessEvaluation => "ds_",
            Self::Geometry => "gs_",
            Self::Fragment => "ps_",
            Self::Compute => "cs_",
        }
    }
}

impl fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

bitflags! {
    /// Set of shader stages.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ShaderStages: u32 {
        const VERTEX = 1 << 0;
        const TESS_CONTROL = 1 << 1;
        const TESS_EVALUATION = 1 << 2;
        const GEOMETRY = 1 << 3;
        const FRAGMENT = 1 << 4;
        const COMPUTE = 1 << 5;
    }
}

/// Shader source handed to the backend compiler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShaderSource {
    /// High-level source text.
    Code {
        code: String,
        entry_point: String,
        /// Compile profile such as `vs_5_0`; empty selects the backend default.
        profile: String,
    },
    /// Precompiled binary, accepted as is.
    Binary(Vec<u8>),
}

impl ShaderSource {
    pub fn code(code: impl Into<String>, entry_point: impl Into<String>) -> Self {
        Self::Code {
            code: code.into(),
            entry_point: entry_point.into(),
            profile: String::new(),
        }
    }

    pub fn with_profile(self, profile: impl Into<String>) -> Self {
        match self {
            Self::Code {
                code, entry_point, ..
            } => Self::Code {
                code,
                entry_point,
                profile: profile.into(),
            },
            binary => binary,
        }
    }
}

/// Vertex attribute declared by a vertex shader.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VertexAttribute {
    pub name: String,
    pub data_type: DataType,
    /// Component count, 1 to 4.
    pub components: u32,
    /// Integer types are read as normalized floats.
    pub normalized: bool,
    /// Byte offset inside the vertex.
    pub offset: u32,
    pub semantic_index: u32,
    pub input_slot: u32,
    /// 0 steps per vertex; N > 0 steps once every N instances.
    pub instance_divisor: u32,
}

impl VertexAttribute {
    pub fn new(name: impl Into<String>, data_type: DataType, components: u32) -> Self {
        Self {
            name: name.into(),
            data_type,
            components,
            normalized: false,
            offset: 0,
            semantic_index: 0,
            input_slot: 0,
            instance_divisor: 0,
        }
    }

    pub fn with_offset(mut self, offset: u32) -> Self {
        self.offset = offset;
        self
    }

    pub fn with_input_slot(mut self, slot: u32) -> Self {
        self.input_slot = slot;
        self
    }

    pub fn with_semantic_index(mut self, index: u32) -> Self {
        self.semantic_index = index;
        self
    }

    pub fn with_instance_divisor(mut self, divisor: u32) -> Self {
        self.instance_divisor = divisor;
        self
    }

    pub fn normalized(mut self) -> Self {
        self.normalized = true;
        self
    }

    pub fn size(&self) -> u32 {
        self.data_type.size() * self.components
    }
}

/// Vertex layout bound to a program's input layout.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct VertexFormat {
    pub attributes: Vec<VertexAttribute>,
    pub stride: u32,
}

impl VertexFormat {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an attribute at the current end of the vertex.
    pub fn append(mut self, attribute: VertexAttribute) -> Self {
        let attribute = attribute.with_offset(self.stride);
        self.stride += attribute.size();
        self.attributes.push(attribute);
        self
    }
}

/// Constant-buffer binding declared by a shader.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ConstantBufferViewDescriptor {
    pub name: String,
    /// Sequential index inside the program, assigned on merge.
    pub index: u32,
    pub size: u64,
}

impl ConstantBufferViewDescriptor {
    pub fn new(name: impl Into<String>, size: u64) -> Self {
        Self {
            name: name.into(),
            index: 0,
            size,
        }
    }
}

/// Storage-buffer binding declared by a shader.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StorageBufferViewDescriptor {
    pub name: String,
    pub index: u32,
    /// Element stride in bytes, 0 for raw buffers.
    pub stride: u32,
    pub read_write: bool,
}

impl StorageBufferViewDescriptor {
    pub fn new(name: impl Into<String>, stride: u32, read_write: bool) -> Self {
        Self {
            name: name.into(),
            index: 0,
            stride,
            read_write,
        }
    }
}

/// One component of a stream-output declaration.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StreamOutputAttribute {
    pub name: String,
    pub components: u32,
    pub output_slot: u32,
}

/// Descriptor for creating a shader.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaderDescriptor {
    /// Debug label for the shader.
    pub label: Option<String>,
    pub stage: ShaderStage,
    pub source: ShaderSource,
    /// Vertex stage only.
    pub vertex_attributes: Vec<VertexAttribute>,
    pub constant_buffers: Vec<ConstantBufferViewDescriptor>,
    pub storage_buffers: Vec<StorageBufferViewDescriptor>,
    pub stream_output: Vec<StreamOutputAttribute>,
}

impl ShaderDescriptor {
    pub fn new(stage: ShaderStage, source: ShaderSource) -> Self {
        Self {
            label: None,
            stage,
            source,
            vertex_attributes: Vec::new(),
            constant_buffers: Vec::new(),
            storage_buffers: Vec::new(),
            stream_output: Vec::new(),
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_vertex_attribute(mut self, attribute: VertexAttribute) -> Self {
        self.vertex_attributes.push(attribute);
        self
    }

    pub fn with_constant_buffer(mut self, name: impl Into<String>, size: u64) -> Self {
        self.constant_buffers
            .push(ConstantBufferViewDescriptor::new(name, size));
        self
    }

    pub fn with_storage_buffer(mut self, name: impl Into<String>, stride: u32, read_write: bool) -> Self {
        self.storage_buffers
            .push(StorageBufferViewDescriptor::new(name, stride, read_write));
        self
    }

    pub fn with_stream_output(mut self, name: impl Into<String>, components: u32, output_slot: u32) -> Self {
        self.stream_output.push(StreamOutputAttribute {
            name: name.into(),
            components,
            output_slot,
        });
        self
    }
}
