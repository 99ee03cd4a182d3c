//! Pipelines over linked shader programs.

use crate::error::{GraphicsError, GraphicsResult};
use crate::registry::{Handle, ObjectStore};
use crate::shader::ShaderProgram;
use crate::types::ShaderStages;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PipelineKind {
    Graphics,
    Compute,
}

/// A pipeline state object bound to one linked program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pipeline {
    label: Option<String>,
    kind: PipelineKind,
    program: Handle<ShaderProgram>,
    stages: ShaderStages,
}

impl Pipeline {
    pub(crate) fn new(
        label: Option<String>,
        kind: PipelineKind,
        program: Handle<ShaderProgram>,
        programs: &ObjectStore<ShaderProgram>,
    ) -> GraphicsResult<Self> {
        let linked = programs.get(program)?;
        if !linked.is_linked() {
            return Err(GraphicsError::invalid(format!(
                "shader program {program} is not linked"
            )));
        }
        let stages = linked.attached_stages();
        let is_compute = stages == ShaderStages::COMPUTE;
        if is_compute != (kind == PipelineKind::Compute) {
            return Err(GraphicsError::invalid(format!(
                "{kind:?} pipeline cannot use a program with stages {stages:?}"
            )));
        }
        Ok(Self {
            label,
            kind,
            program,
            stages,
        })
    }

    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    pub fn kind(&self) -> PipelineKind {
        self.kind
    }

    pub fn program(&self) -> Handle<ShaderProgram> {
        self.program
    }

    /// Stages the program had when the pipeline was created.
    pub fn stages(&self) -> ShaderStages {
        self.stages
    }
}
