//! Device capability snapshot and gate.
//!
//! A [`CapabilitySnapshot`] is captured once when a device is created and
//! never changes afterwards. Every capability-dependent path calls
//! [`CapabilityGate::assert`] before touching the backend, so unsupported
//! requests fail with [`GraphicsError::NotSupported`] without allocating.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{GraphicsError, GraphicsResult};
use crate::types::Extent3d;

/// Optional device features.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Feature {
    Textures3D,
    CubeTextures,
    TextureArrays,
    CubeTextureArrays,
    MultisampleTextures,
    ComputeShaders,
    GeometryShaders,
    TessellationShaders,
    StreamOutput,
    StorageBuffers,
}

impl Feature {
    pub const ALL: [Feature; 10] = [
        Feature::Textures3D,
        Feature::CubeTextures,
        Feature::TextureArrays,
        Feature::CubeTextureArrays,
        Feature::MultisampleTextures,
        Feature::ComputeShaders,
        Feature::GeometryShaders,
        Feature::TessellationShaders,
        Feature::StreamOutput,
        Feature::StorageBuffers,
    ];
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Textures3D => "3D textures",
            Self::CubeTextures => "cube textures",
            Self::TextureArrays => "texture arrays",
            Self::CubeTextureArrays => "cube texture arrays",
            Self::MultisampleTextures => "multisample textures",
            Self::ComputeShaders => "compute shaders",
            Self::GeometryShaders => "geometry shaders",
            Self::TessellationShaders => "tessellation shaders",
            Self::StreamOutput => "stream output",
            Self::StorageBuffers => "storage buffers",
        };
        f.write_str(name)
    }
}

/// Numeric device limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceLimits {
    pub max_texture_1d: u32,
    pub max_texture_2d: u32,
    pub max_texture_3d: u32,
    pub max_texture_cube: u32,
    pub max_array_layers: u32,
    pub max_samples: u32,
    pub max_constant_buffer_size: u64,
}

impl Default for DeviceLimits {
    fn default() -> Self {
        Self {
            max_texture_1d: 16384,
            max_texture_2d: 16384,
            max_texture_3d: 2048,
            max_texture_cube: 16384,
            max_array_layers: 2048,
            max_samples: 8,
            max_constant_buffer_size: 64 * 1024,
        }
    }
}

/// Immutable record of supported features and limits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapabilitySnapshot {
    features: Vec<Feature>,
    pub limits: DeviceLimits,
}

impl CapabilitySnapshot {
    pub fn new(features: impl IntoIterator<Item = Feature>, limits: DeviceLimits) -> Self {
        let mut features: Vec<Feature> = features.into_iter().collect();
        features.sort_by_key(|f| *f as u8);
        features.dedup();
        Self { features, limits }
    }

    /// Snapshot with every optional feature present.
    pub fn full() -> Self {
        Self::new(Feature::ALL, DeviceLimits::default())
    }

    pub fn supports(&self, feature: Feature) -> bool {
        self.features.contains(&feature)
    }

    pub fn features(&self) -> &[Feature] {
        &self.features
    }

    /// Copy of this snapshot without the given features.
    pub fn without(&self, disabled: &[Feature]) -> Self {
        Self::new(
            self.features
                .iter()
                .copied()
                .filter(|f| !disabled.contains(f)),
            self.limits,
        )
    }
}

/// Gate checked at the start of every capability-dependent operation.
#[derive(Debug, Clone)]
pub struct CapabilityGate {
    snapshot: CapabilitySnapshot,
}

impl CapabilityGate {
    pub fn new(snapshot: CapabilitySnapshot) -> Self {
        Self { snapshot }
    }

    pub fn snapshot(&self) -> &CapabilitySnapshot {
        &self.snapshot
    }

    pub fn supports(&self, feature: Feature) -> bool {
        self.snapshot.supports(feature)
    }

    /// Fail with `NotSupported` when `feature` is absent.
    pub fn assert(&self, feature: Feature, operation: &'static str) -> GraphicsResult<()> {
        if self.snapshot.supports(feature) {
            Ok(())
        } else {
            log::trace!("Capability gate rejected {operation}: missing {feature}");
            Err(GraphicsError::NotSupported { feature, operation })
        }
    }

    /// Reject extents above the device limit for the given dimension class.
    pub fn check_extent(
        &self,
        extent: Extent3d,
        max_edge: u32,
        max_layers: u32,
        operation: &'static str,
    ) -> GraphicsResult<()> {
        if extent.width > max_edge || extent.height > max_edge {
            return Err(GraphicsError::invalid(format!(
                "{operation}: extent {}x{} exceeds device limit {max_edge}",
                extent.width, extent.height
            )));
        }
        if extent.depth > max_layers {
            return Err(GraphicsError::invalid(format!(
                "{operation}: depth/layers {} exceeds device limit {max_layers}",
                extent.depth
            )));
        }
        Ok(())
    }

    pub fn check_samples(&self, samples: u32, operation: &'static str) -> GraphicsResult<()> {
        if samples == 0 || samples > self.snapshot.limits.max_samples || !samples.is_power_of_two()
        {
            return Err(GraphicsError::invalid(format!(
                "{operation}: sample count {samples} is not supported (max {})",
                self.snapshot.limits.max_samples
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_gate_rejects_missing_feature() {
        let gate = CapabilityGate::new(CapabilitySnapshot::full().without(&[Feature::Textures3D]));

        let err = gate.assert(Feature::Textures3D, "CreateTexture").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotSupported);
        assert!(gate.assert(Feature::CubeTextures, "CreateTexture").is_ok());
    }

    #[test]
    fn test_snapshot_dedups_features() {
        let snapshot = CapabilitySnapshot::new(
            [Feature::ComputeShaders, Feature::ComputeShaders],
            DeviceLimits::default(),
        );
        assert_eq!(snapshot.features(), &[Feature::ComputeShaders]);
        assert!(!snapshot.supports(Feature::StreamOutput));
    }

    #[test]
    fn test_check_extent() {
        let gate = CapabilityGate::new(CapabilitySnapshot::full());
        assert!(gate
            .check_extent(Extent3d::new_2d(1024, 1024), 16384, 1, "CreateTexture")
            .is_ok());
        assert!(gate
            .check_extent(Extent3d::new_2d(20000, 4), 16384, 1, "CreateTexture")
            .is_err());
        assert!(gate.check_samples(3, "CreateTexture").is_err());
        assert!(gate.check_samples(4, "CreateTexture").is_ok());
    }
}
