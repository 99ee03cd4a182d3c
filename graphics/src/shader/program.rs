//! Shader program composition and linking.
//!
//! A program moves through `Empty -> Composing -> Linked`. A failed link
//! leaves it in `Error` with the attachments intact, so the caller can fix
//! the offending slot and link again.

use std::collections::HashSet;

use super::input_layout::{build_elements, InputLayout};
use super::Shader;
use crate::backend::Backend;
use crate::capabilities::{CapabilityGate, Feature};
use crate::error::{GraphicsError, GraphicsResult};
use crate::registry::{Handle, ObjectStore};
use crate::types::{
    ConstantBufferViewDescriptor, ShaderStage, ShaderStages, StorageBufferViewDescriptor,
    StreamOutputAttribute, VertexAttribute, VertexFormat,
};

/// Stage combinations accepted by [`ShaderProgram::link`].
pub const LEGAL_STAGE_SETS: [ShaderStages; 9] = [
    ShaderStages::VERTEX,
    ShaderStages::VERTEX.union(ShaderStages::GEOMETRY),
    ShaderStages::VERTEX
        .union(ShaderStages::TESS_CONTROL)
        .union(ShaderStages::TESS_EVALUATION),
    ShaderStages::VERTEX
        .union(ShaderStages::TESS_CONTROL)
        .union(ShaderStages::TESS_EVALUATION)
        .union(ShaderStages::GEOMETRY),
    ShaderStages::VERTEX.union(ShaderStages::FRAGMENT),
    ShaderStages::VERTEX
        .union(ShaderStages::GEOMETRY)
        .union(ShaderStages::FRAGMENT),
    ShaderStages::VERTEX
        .union(ShaderStages::TESS_CONTROL)
        .union(ShaderStages::TESS_EVALUATION)
        .union(ShaderStages::FRAGMENT),
    ShaderStages::VERTEX
        .union(ShaderStages::TESS_CONTROL)
        .union(ShaderStages::TESS_EVALUATION)
        .union(ShaderStages::GEOMETRY)
        .union(ShaderStages::FRAGMENT),
    ShaderStages::COMPUTE,
];

pub fn is_legal_composition(stages: ShaderStages) -> bool {
    LEGAL_STAGE_SETS.contains(&stages)
}

/// Why the last link failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LinkError {
    Composition,
    ByteCode,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LinkStatus {
    Empty,
    Composing,
    Linked,
    Error(LinkError),
}

/// Declarations merged across every attached stage.
#[derive(Debug, Default)]
struct MergedBindings {
    constant_buffers: Vec<ConstantBufferViewDescriptor>,
    storage_buffers: Vec<StorageBufferViewDescriptor>,
    stream_output: Vec<StreamOutputAttribute>,
}

/// Composition of up to one shader per stage.
#[derive(Debug)]
pub struct ShaderProgram {
    label: Option<String>,
    slots: [Option<Handle<Shader>>; 6],
    /// Occupied stages, oldest attachment first.
    attach_order: Vec<ShaderStage>,
    vertex_attributes: Vec<VertexAttribute>,
    merged: MergedBindings,
    input_layout: Option<InputLayout>,
    status: LinkStatus,
}

impl ShaderProgram {
    pub fn new(label: Option<String>) -> Self {
        Self {
            label,
            slots: [None; 6],
            attach_order: Vec::new(),
            vertex_attributes: Vec::new(),
            merged: MergedBindings::default(),
            input_layout: None,
            status: LinkStatus::Empty,
        }
    }

    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    pub fn status(&self) -> LinkStatus {
        self.status
    }

    pub fn is_linked(&self) -> bool {
        self.status == LinkStatus::Linked
    }

    /// Occupant of a stage slot.
    pub fn attached(&self, stage: ShaderStage) -> Option<Handle<Shader>> {
        self.slots[stage.slot()]
    }

    pub fn attached_stages(&self) -> ShaderStages {
        ShaderStage::ALL
            .into_iter()
            .filter(|stage| self.slots[stage.slot()].is_some())
            .fold(ShaderStages::empty(), |stages, stage| stages | stage.flag())
    }

    /// Put `handle` into its stage's slot, replacing the previous occupant.
    ///
    /// Gated stages and declarations are checked before the program changes.
    pub fn attach(
        &mut self,
        handle: Handle<Shader>,
        shaders: &ObjectStore<Shader>,
        gate: &CapabilityGate,
    ) -> GraphicsResult<()> {
        let shader = shaders.get(handle)?;
        let stage = shader.stage();
        match stage {
            ShaderStage::Geometry => gate.assert(Feature::GeometryShaders, "AttachShader")?,
            ShaderStage::TessControl | ShaderStage::TessEvaluation => {
                gate.assert(Feature::TessellationShaders, "AttachShader")?
            }
            ShaderStage::Compute => gate.assert(Feature::ComputeShaders, "AttachShader")?,
            ShaderStage::Vertex | ShaderStage::Fragment => {}
        }
        let descriptor = shader.descriptor();
        if !descriptor.storage_buffers.is_empty() {
            gate.assert(Feature::StorageBuffers, "AttachShader")?;
        }
        if !descriptor.stream_output.is_empty() {
            gate.assert(Feature::StreamOutput, "AttachShader")?;
        }

        let mut slots = self.slots;
        slots[stage.slot()] = Some(handle);
        let mut attach_order = self.attach_order.clone();
        attach_order.retain(|attached| *attached != stage);
        attach_order.push(stage);
        let merged = merge(&slots, &attach_order, shaders)?;

        if stage == ShaderStage::Vertex {
            self.vertex_attributes = descriptor.vertex_attributes.clone();
        }
        self.slots = slots;
        self.attach_order = attach_order;
        self.merged = merged;
        self.input_layout = None;
        self.status = LinkStatus::Composing;
        log::trace!(
            "ShaderProgram {:?}: attached {stage} shader {handle}",
            self.label
        );
        Ok(())
    }

    /// Clear every slot and everything derived from them.
    pub fn detach_all(&mut self) {
        self.slots = [None; 6];
        self.attach_order.clear();
        self.vertex_attributes.clear();
        self.merged = MergedBindings::default();
        self.input_layout = None;
        self.status = LinkStatus::Empty;
    }

    /// Validate the attached stages.
    pub fn link(&mut self, shaders: &ObjectStore<Shader>) -> GraphicsResult<()> {
        let mut stages = ShaderStages::empty();
        let mut missing_bytecode = None;
        for stage in ShaderStage::ALL {
            let Some(handle) = self.slots[stage.slot()] else {
                continue;
            };
            let shader = shaders.get(handle)?;
            if !shader.has_bytecode() && missing_bytecode.is_none() {
                missing_bytecode = Some(stage);
            }
            stages |= stage.flag();
        }

        if let Some(stage) = missing_bytecode {
            self.status = LinkStatus::Error(LinkError::ByteCode);
            log::warn!("ShaderProgram {:?}: {stage} shader has no byte code", self.label);
            return Err(GraphicsError::ByteCode { stage });
        }
        if !is_legal_composition(stages) {
            self.status = LinkStatus::Error(LinkError::Composition);
            log::warn!(
                "ShaderProgram {:?}: invalid stage composition {stages:?}",
                self.label
            );
            return Err(GraphicsError::Composition { stages });
        }

        self.status = LinkStatus::Linked;
        log::debug!("ShaderProgram {:?}: linked {stages:?}", self.label);
        Ok(())
    }

    /// Diagnostic text for the current state.
    pub fn info_log(&self) -> &'static str {
        match self.status {
            LinkStatus::Error(LinkError::Composition) => "invalid composition of attached shaders",
            LinkStatus::Error(LinkError::ByteCode) => "invalid shader byte code",
            LinkStatus::Empty | LinkStatus::Composing | LinkStatus::Linked => "",
        }
    }

    /// Build the vertex input layout for `format`, replacing any previous one.
    pub fn build_input_layout(
        &mut self,
        format: &VertexFormat,
        shaders: &ObjectStore<Shader>,
        backend: &mut dyn Backend,
    ) -> GraphicsResult<()> {
        if !self.is_linked() {
            return Err(GraphicsError::invalid(
                "cannot build an input layout for a program that is not linked",
            ));
        }
        let vertex = match self.slots[ShaderStage::Vertex.slot()] {
            Some(handle) => shaders.get(handle)?,
            None => {
                return Err(GraphicsError::invalid(
                    "cannot build an input layout without a vertex shader",
                ))
            }
        };
        if !vertex.has_bytecode() {
            return Err(GraphicsError::invalid(
                "cannot build an input layout from a vertex shader without byte code",
            ));
        }

        let elements = build_elements(format, |attribute| backend.vertex_format(attribute))?;
        let native = backend.create_input_layout(vertex.bytecode(), &elements)?;
        log::trace!(
            "ShaderProgram {:?}: built input layout with {} elements",
            self.label,
            elements.len()
        );
        self.input_layout = Some(InputLayout {
            elements,
            stride: format.stride,
            native,
        });
        Ok(())
    }

    pub fn input_layout(&self) -> Option<&InputLayout> {
        self.input_layout.as_ref()
    }

    /// Attributes declared by the vertex shader.
    pub fn vertex_attributes(&self) -> &[VertexAttribute] {
        &self.vertex_attributes
    }

    pub fn constant_buffers(&self) -> &[ConstantBufferViewDescriptor] {
        &self.merged.constant_buffers
    }

    pub fn storage_buffers(&self) -> &[StorageBufferViewDescriptor] {
        &self.merged.storage_buffers
    }

    pub fn stream_output_attributes(&self, gate: &CapabilityGate) -> GraphicsResult<&[StreamOutputAttribute]> {
        gate.assert(Feature::StreamOutput, "QueryStreamOutputAttributes")?;
        Ok(&self.merged.stream_output)
    }
}

/// Re-derive the merged declarations of `slots`, walking stages in the
/// order they were attached. A replaced occupant gives up its position.
fn merge(
    slots: &[Option<Handle<Shader>>; 6],
    attach_order: &[ShaderStage],
    shaders: &ObjectStore<Shader>,
) -> GraphicsResult<MergedBindings> {
    let mut merged = MergedBindings::default();
    let mut constant_names = HashSet::new();
    let mut storage_names = HashSet::new();
    let mut stream_names = HashSet::new();

    for handle in attach_order.iter().filter_map(|stage| slots[stage.slot()]) {
        let descriptor = shaders.get(handle)?.descriptor();
        for cbv in &descriptor.constant_buffers {
            if constant_names.insert(cbv.name.as_str()) {
                merged.constant_buffers.push(cbv.clone());
            }
        }
        for sbv in &descriptor.storage_buffers {
            if storage_names.insert(sbv.name.as_str()) {
                merged.storage_buffers.push(sbv.clone());
            }
        }
        for attribute in &descriptor.stream_output {
            if stream_names.insert(attribute.name.as_str()) {
                merged.stream_output.push(attribute.clone());
            }
        }
    }

    for (index, cbv) in merged.constant_buffers.iter_mut().enumerate() {
        cbv.index = index as u32;
    }
    for (index, sbv) in merged.storage_buffers.iter_mut().enumerate() {
        sbv.index = index as u32;
    }
    Ok(merged)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::CompileOutput;
    use crate::capabilities::CapabilitySnapshot;
    use crate::registry::ResourceRegistry;
    use crate::types::{ShaderDescriptor, ShaderSource};
    use rstest::rstest;

    fn compiled(descriptor: ShaderDescriptor) -> Shader {
        let output = CompileOutput {
            success: true,
            bytecode: vec![1, 2, 3],
            log: String::new(),
        };
        Shader::new(descriptor, output)
    }

    fn shader(stage: ShaderStage) -> ShaderDescriptor {
        ShaderDescriptor::new(stage, ShaderSource::code("void main() {}", "main"))
    }

    fn full_gate() -> CapabilityGate {
        CapabilityGate::new(CapabilitySnapshot::full())
    }

    fn program_with(registry: &mut ResourceRegistry, stages: ShaderStages) -> ShaderProgram {
        let gate = full_gate();
        let mut program = ShaderProgram::new(None);
        for stage in ShaderStage::ALL {
            if stages.contains(stage.flag()) {
                let handle = registry.insert(compiled(shader(stage)));
                program.attach(handle, registry.store(), &gate).unwrap();
            }
        }
        program
    }

    #[test]
    fn test_every_legal_set_links() {
        for stages in LEGAL_STAGE_SETS {
            let mut registry = ResourceRegistry::new();
            let mut program = program_with(&mut registry, stages);
            assert!(program.link(registry.store()).is_ok(), "{stages:?}");
            assert_eq!(program.status(), LinkStatus::Linked);
            assert_eq!(program.info_log(), "");
        }
    }

    #[test]
    fn test_every_other_set_fails_composition() {
        for bits in 0..64u32 {
            let stages = ShaderStages::from_bits_truncate(bits);
            if is_legal_composition(stages) {
                continue;
            }
            let mut registry = ResourceRegistry::new();
            let mut program = program_with(&mut registry, stages);
            let err = program.link(registry.store()).unwrap_err();
            assert_eq!(err, GraphicsError::Composition { stages });
            assert_eq!(program.info_log(), "invalid composition of attached shaders");
        }
    }

    #[rstest]
    #[case::geometry(ShaderStage::Geometry, Feature::GeometryShaders)]
    #[case::hull(ShaderStage::TessControl, Feature::TessellationShaders)]
    #[case::domain(ShaderStage::TessEvaluation, Feature::TessellationShaders)]
    #[case::compute(ShaderStage::Compute, Feature::ComputeShaders)]
    fn test_gated_stage(#[case] stage: ShaderStage, #[case] feature: Feature) {
        let mut registry = ResourceRegistry::new();
        let handle = registry.insert(compiled(shader(stage)));
        let gate = CapabilityGate::new(CapabilitySnapshot::full().without(&[feature]));
        let mut program = ShaderProgram::new(None);

        let err = program.attach(handle, registry.store(), &gate).unwrap_err();
        assert_eq!(
            err,
            GraphicsError::NotSupported {
                feature,
                operation: "AttachShader"
            }
        );
        assert_eq!(program.status(), LinkStatus::Empty);
        assert_eq!(program.attached(stage), None);
    }

    #[test]
    fn test_storage_buffer_declaration_is_gated() {
        let mut registry = ResourceRegistry::new();
        let handle = registry.insert(compiled(
            shader(ShaderStage::Fragment).with_storage_buffer("Particles", 16, true),
        ));
        let gate = CapabilityGate::new(CapabilitySnapshot::full().without(&[Feature::StorageBuffers]));

        let err = ShaderProgram::new(None)
            .attach(handle, registry.store(), &gate)
            .unwrap_err();
        assert!(matches!(
            err,
            GraphicsError::NotSupported {
                feature: Feature::StorageBuffers,
                ..
            }
        ));
    }

    #[test]
    fn test_reattach_replaces_declarations() {
        let mut registry = ResourceRegistry::new();
        let gate = full_gate();
        let first = registry.insert(compiled(
            shader(ShaderStage::Vertex)
                .with_constant_buffer("Matrices", 64)
                .with_constant_buffer("Skinning", 256),
        ));
        let second = registry.insert(compiled(
            shader(ShaderStage::Vertex).with_constant_buffer("Matrices", 64),
        ));

        let mut program = ShaderProgram::new(None);
        program.attach(first, registry.store(), &gate).unwrap();
        program.attach(second, registry.store(), &gate).unwrap();

        assert_eq!(program.attached(ShaderStage::Vertex), Some(second));
        let names: Vec<_> = program.constant_buffers().iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Matrices"]);
    }

    #[test]
    fn test_shared_name_merges_to_index_zero() {
        let mut registry = ResourceRegistry::new();
        let gate = full_gate();
        let fragment = registry.insert(compiled(
            shader(ShaderStage::Fragment)
                .with_constant_buffer("Matrices", 64)
                .with_constant_buffer("Material", 32),
        ));
        let vertex = registry.insert(compiled(
            shader(ShaderStage::Vertex).with_constant_buffer("Matrices", 64),
        ));

        let mut program = ShaderProgram::new(None);
        program.attach(fragment, registry.store(), &gate).unwrap();
        program.attach(vertex, registry.store(), &gate).unwrap();

        let buffers = program.constant_buffers();
        assert_eq!(buffers.len(), 2);
        assert_eq!((buffers[0].name.as_str(), buffers[0].index), ("Matrices", 0));
        assert_eq!((buffers[1].name.as_str(), buffers[1].index), ("Material", 1));
    }

    #[test]
    fn test_first_attached_stage_owns_shared_name() {
        let mut registry = ResourceRegistry::new();
        let gate = full_gate();
        let fragment = registry.insert(compiled(
            shader(ShaderStage::Fragment)
                .with_constant_buffer("Material", 32)
                .with_constant_buffer("Matrices", 64),
        ));
        let vertex = registry.insert(compiled(
            shader(ShaderStage::Vertex).with_constant_buffer("Matrices", 128),
        ));

        let mut program = ShaderProgram::new(None);
        program.attach(fragment, registry.store(), &gate).unwrap();
        let summary = |program: &ShaderProgram| -> Vec<(String, u32, u64)> {
            program
                .constant_buffers()
                .iter()
                .map(|cbv| (cbv.name.clone(), cbv.index, cbv.size))
                .collect()
        };
        let before = summary(&program);
        assert_eq!(
            before,
            vec![("Material".to_string(), 0, 32), ("Matrices".to_string(), 1, 64)]
        );

        program.attach(vertex, registry.store(), &gate).unwrap();
        assert_eq!(summary(&program), before);
    }

    #[test]
    fn test_replaced_occupant_moves_to_the_back() {
        let mut registry = ResourceRegistry::new();
        let gate = full_gate();
        let vertex = registry.insert(compiled(
            shader(ShaderStage::Vertex).with_constant_buffer("Matrices", 64),
        ));
        let fragment = registry.insert(compiled(
            shader(ShaderStage::Fragment).with_constant_buffer("Material", 32),
        ));
        let vertex_again = registry.insert(compiled(
            shader(ShaderStage::Vertex).with_constant_buffer("Matrices", 64),
        ));

        let mut program = ShaderProgram::new(None);
        program.attach(vertex, registry.store(), &gate).unwrap();
        program.attach(fragment, registry.store(), &gate).unwrap();
        program.attach(vertex_again, registry.store(), &gate).unwrap();

        let names: Vec<_> = program.constant_buffers().iter().map(|c| (c.name.as_str(), c.index)).collect();
        assert_eq!(names, vec![("Material", 0), ("Matrices", 1)]);
    }

    #[test]
    fn test_bytecode_checked_before_composition() {
        let mut registry = ResourceRegistry::new();
        let gate = full_gate();
        let failed = CompileOutput {
            success: false,
            bytecode: Vec::new(),
            log: "error".to_string(),
        };
        // Compute with Vertex is also an illegal composition.
        let vertex = registry.insert(Shader::new(shader(ShaderStage::Vertex), failed));
        let compute = registry.insert(compiled(shader(ShaderStage::Compute)));

        let mut program = ShaderProgram::new(None);
        program.attach(vertex, registry.store(), &gate).unwrap();
        program.attach(compute, registry.store(), &gate).unwrap();

        let err = program.link(registry.store()).unwrap_err();
        assert_eq!(
            err,
            GraphicsError::ByteCode {
                stage: ShaderStage::Vertex
            }
        );
        assert_eq!(program.info_log(), "invalid shader byte code");
    }

    #[test]
    fn test_detach_all_resets() {
        let mut registry = ResourceRegistry::new();
        let mut program = program_with(&mut registry, ShaderStages::VERTEX | ShaderStages::FRAGMENT);
        program.link(registry.store()).unwrap();

        program.detach_all();
        assert_eq!(program.status(), LinkStatus::Empty);
        assert_eq!(program.info_log(), "");
        assert!(program.constant_buffers().is_empty());

        let err = program.link(registry.store()).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Composition);
    }

    #[test]
    fn test_stream_output_query_is_gated() {
        let mut registry = ResourceRegistry::new();
        let program = program_with(&mut registry, ShaderStages::VERTEX);
        let gate = CapabilityGate::new(CapabilitySnapshot::full().without(&[Feature::StreamOutput]));

        assert!(program.stream_output_attributes(&full_gate()).unwrap().is_empty());
        assert!(program.stream_output_attributes(&gate).is_err());
    }
}
