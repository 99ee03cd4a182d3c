//! Shaders and shader programs.
//!
//! A [`Shader`] holds the compiled binary of one stage together with the
//! resources it declares. A [`ShaderProgram`] composes shaders into a
//! pipeline: it merges their declarations, validates the stage combination
//! on link and builds the vertex input layout.

mod input_layout;
mod program;

pub use input_layout::{InputElement, InputLayout, InputStep};
pub use program::{is_legal_composition, LinkError, LinkStatus, ShaderProgram, LEGAL_STAGE_SETS};

use crate::backend::CompileOutput;
use crate::types::{ShaderDescriptor, ShaderSource, ShaderStage};

/// Compiled shader of one stage.
#[derive(Debug)]
pub struct Shader {
    descriptor: ShaderDescriptor,
    bytecode: Vec<u8>,
    info_log: String,
}

impl Shader {
    pub(crate) fn new(descriptor: ShaderDescriptor, output: CompileOutput) -> Self {
        Self {
            descriptor,
            bytecode: output.bytecode,
            info_log: output.log,
        }
    }

    pub fn stage(&self) -> ShaderStage {
        self.descriptor.stage
    }

    pub fn descriptor(&self) -> &ShaderDescriptor {
        &self.descriptor
    }

    pub fn bytecode(&self) -> &[u8] {
        &self.bytecode
    }

    /// Whether the last compile produced a binary.
    pub fn has_bytecode(&self) -> bool {
        !self.bytecode.is_empty()
    }

    /// Compiler diagnostics of the last compile.
    pub fn info_log(&self) -> &str {
        &self.info_log
    }

    /// Replace source and binary with a new compile result.
    pub(crate) fn recompiled(&mut self, source: ShaderSource, output: CompileOutput) -> bool {
        self.descriptor.source = source;
        self.bytecode = output.bytecode;
        self.info_log = output.log;
        output.success
    }
}
