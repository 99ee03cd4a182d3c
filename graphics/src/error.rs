//! Graphics error types.

use std::fmt;

use thiserror::Error;

use crate::capabilities::Feature;
use crate::types::ShaderStages;

/// Status code reported by a native device call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NativeStatus {
    /// The device could not satisfy an allocation.
    OutOfMemory,
    /// The device was removed or reset.
    DeviceLost,
    /// The native API rejected the call's arguments.
    InvalidCall,
    /// A bounded wait expired before the device reached the requested point.
    Timeout,
}

impl fmt::Display for NativeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OutOfMemory => write!(f, "out of memory"),
            Self::DeviceLost => write!(f, "device lost"),
            Self::InvalidCall => write!(f, "invalid call"),
            Self::Timeout => write!(f, "timeout"),
        }
    }
}

/// Discriminant of [`GraphicsError`], for callers that branch on the failure class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NotSupported,
    Composition,
    ByteCode,
    InvalidArgument,
    UseAfterRelease,
    DeviceFailure,
    BackendUnavailable,
    BuildMismatch,
    Config,
}

/// Errors that can occur in the graphics system.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GraphicsError {
    /// The capability gate rejected an operation.
    #[error("{operation} requires unsupported feature: {feature}")]
    NotSupported {
        feature: Feature,
        operation: &'static str,
    },
    /// The set of attached shader stages is not a legal pipeline.
    #[error("invalid composition of attached shaders: {stages:?}")]
    Composition { stages: ShaderStages },
    /// An attached shader has no compiled binary.
    #[error("invalid shader byte code for stage {stage}")]
    ByteCode { stage: crate::types::ShaderStage },
    /// A caller-supplied argument is out of range or unmappable.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    /// A handle was used after its object was released.
    #[error("{kind} handle used after release: {handle}")]
    UseAfterRelease { kind: &'static str, handle: String },
    /// A native device call reported failure.
    #[error("{operation} failed: {status}")]
    DeviceFailure {
        operation: &'static str,
        status: NativeStatus,
    },
    /// No backend module with the requested name is available.
    #[error("backend not available: {0}")]
    BackendUnavailable(String),
    /// The backend module was built against a different interface revision.
    #[error("backend {backend} build id {module:#010x} does not match caller build id {caller:#010x}")]
    BuildMismatch {
        backend: &'static str,
        module: u32,
        caller: u32,
    },
    /// Configuration could not be loaded or is inconsistent.
    #[error("configuration error: {0}")]
    Config(String),
}

impl GraphicsError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotSupported { .. } => ErrorKind::NotSupported,
            Self::Composition { .. } => ErrorKind::Composition,
            Self::ByteCode { .. } => ErrorKind::ByteCode,
            Self::InvalidArgument(_) => ErrorKind::InvalidArgument,
            Self::UseAfterRelease { .. } => ErrorKind::UseAfterRelease,
            Self::DeviceFailure { .. } => ErrorKind::DeviceFailure,
            Self::BackendUnavailable(_) => ErrorKind::BackendUnavailable,
            Self::BuildMismatch { .. } => ErrorKind::BuildMismatch,
            Self::Config(_) => ErrorKind::Config,
        }
    }

    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    pub(crate) fn device(operation: &'static str, status: NativeStatus) -> Self {
        Self::DeviceFailure { operation, status }
    }
}

pub type GraphicsResult<T> = Result<T, GraphicsError>;
