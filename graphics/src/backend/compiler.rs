//! Shader front end shared by the simulated backends.

use crate::types::{ShaderSource, ShaderStage};

/// Result of a native compile call.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CompileOutput {
    pub success: bool,
    /// Empty when compilation failed.
    pub bytecode: Vec<u8>,
    pub log: String,
}

impl CompileOutput {
    fn failed(log: String) -> Self {
        Self {
            success: false,
            bytecode: Vec::new(),
            log,
        }
    }
}

/// Compile `source` into a container tagged with `magic` and the stage.
///
/// With `profiles` set, a non-empty profile must carry the stage's prefix.
pub fn compile(magic: [u8; 4], stage: ShaderStage, source: &ShaderSource, profiles: bool) -> CompileOutput {
    match source {
        ShaderSource::Binary(bytes) if bytes.is_empty() => {
            CompileOutput::failed("error: empty shader binary".to_string())
        }
        ShaderSource::Binary(bytes) => CompileOutput {
            success: true,
            bytecode: bytes.clone(),
            log: String::new(),
        },
        ShaderSource::Code {
            code,
            entry_point,
            profile,
        } => {
            if code.trim().is_empty() {
                return CompileOutput::failed("error: empty shader source".to_string());
            }
            if !entry_point.is_empty() && !code.contains(entry_point.as_str()) {
                return CompileOutput::failed(format!("error: entry point '{entry_point}' not found"));
            }
            if profiles && !profile.is_empty() && !profile.starts_with(stage.profile_prefix()) {
                return CompileOutput::failed(format!(
                    "error: profile '{profile}' does not match {stage} stage"
                ));
            }

            let mut bytecode = Vec::with_capacity(code.len() + 5);
            bytecode.extend_from_slice(&magic);
            bytecode.push(stage.slot() as u8);
            bytecode.extend_from_slice(code.as_bytes());
            CompileOutput {
                success: true,
                bytecode,
                log: String::new(),
            }
        }
    }
}
