//! Device configuration.
//!
//! [`GraphicsConfig`] is plain data with serde derives. It can be built in
//! code with the `with_*` methods, parsed from RON, or loaded from a `.ron`
//! file, and environment variables can override the backend choice, the
//! presentation ring size and the memory budget.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::capabilities::Feature;
use crate::error::GraphicsError;

/// Environment variable selecting the backend by name.
pub const BACKEND_ENV: &str = "TESSERA_BACKEND";
/// Environment variable overriding the presentation ring size.
pub const FRAMES_IN_FLIGHT_ENV: &str = "TESSERA_FRAMES_IN_FLIGHT";
/// Environment variable overriding the memory budget in bytes.
pub const MEMORY_BUDGET_ENV: &str = "TESSERA_MEMORY_BUDGET";

/// Configuration errors.
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Serialization error: {0}")]
    Serialize(String),

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("Invalid value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

impl From<ConfigError> for GraphicsError {
    fn from(err: ConfigError) -> Self {
        GraphicsError::Config(err.to_string())
    }
}

/// Device creation settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphicsConfig {
    /// Backend module name: `immediate`, `deferred` or `explicit`.
    pub backend: String,
    /// Presentation buffers per render context, 2 or 3.
    pub frames_in_flight: u32,
    /// Device memory budget in bytes; `None` is unlimited.
    pub memory_budget: Option<u64>,
    /// Upper bound for a single fence wait; `None` waits indefinitely.
    pub fence_timeout_ms: Option<u64>,
    /// Features hidden from the capability snapshot.
    pub disabled_features: Vec<Feature>,
    /// RGBA8 texel used to fill textures created without content.
    pub default_texel: [u8; 4],
    /// Closed batches the explicit backend keeps in flight before retiring.
    pub gpu_latency_frames: u32,
}

impl Default for GraphicsConfig {
    fn default() -> Self {
        Self {
            backend: "explicit".to_string(),
            frames_in_flight: 2,
            memory_budget: None,
            fence_timeout_ms: None,
            disabled_features: Vec::new(),
            default_texel: [255, 255, 255, 255],
            gpu_latency_frames: 2,
        }
    }
}

impl GraphicsConfig {
    pub fn new(backend: impl Into<String>) -> Self {
        Self {
            backend: backend.into(),
            ..Default::default()
        }
    }

    pub fn with_frames_in_flight(mut self, frames: u32) -> Self {
        self.frames_in_flight = frames;
        self
    }

    pub fn with_memory_budget(mut self, bytes: u64) -> Self {
        self.memory_budget = Some(bytes);
        self
    }

    pub fn with_fence_timeout(mut self, timeout: Duration) -> Self {
        self.fence_timeout_ms = Some(timeout.as_millis() as u64);
        self
    }

    pub fn with_disabled_feature(mut self, feature: Feature) -> Self {
        self.disabled_features.push(feature);
        self
    }

    pub fn with_default_texel(mut self, texel: [u8; 4]) -> Self {
        self.default_texel = texel;
        self
    }

    pub fn with_gpu_latency(mut self, frames: u32) -> Self {
        self.gpu_latency_frames = frames;
        self
    }

    pub fn fence_timeout(&self) -> Option<Duration> {
        self.fence_timeout_ms.map(Duration::from_millis)
    }

    pub fn from_ron_str(contents: &str) -> Result<Self, ConfigError> {
        let config: Self = ron::from_str(contents).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_ron_string(&self) -> Result<String, ConfigError> {
        ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
            .map_err(|e| ConfigError::Serialize(e.to_string()))
    }

    /// Load configuration from a `.ron` file.
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if path.extension().and_then(|ext| ext.to_str()) != Some("ron") {
            return Err(ConfigError::UnsupportedFormat(path.display().to_string()));
        }
        let contents = std::fs::read_to_string(path)?;
        Self::from_ron_str(&contents)
    }

    /// Apply the `TESSERA_*` environment overrides that are set.
    pub fn with_env_overrides(self) -> Result<Self, ConfigError> {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        if let Some(backend) = lookup(BACKEND_ENV) {
            log::debug!("{BACKEND_ENV} overrides backend: {backend}");
            self.backend = backend;
        }
        if let Some(frames) = lookup(FRAMES_IN_FLIGHT_ENV) {
            self.frames_in_flight = frames.trim().parse::<u32>().map_err(|e| ConfigError::Invalid {
                field: "frames_in_flight",
                reason: format!("{frames:?}: {e}"),
            })?;
        }
        if let Some(budget) = lookup(MEMORY_BUDGET_ENV) {
            let bytes = budget.trim().parse::<u64>().map_err(|e| ConfigError::Invalid {
                field: "memory_budget",
                reason: format!("{budget:?}: {e}"),
            })?;
            self.memory_budget = Some(bytes);
        }
        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.backend.trim().is_empty() {
            return Err(ConfigError::Invalid {
                field: "backend",
                reason: "backend name is empty".to_string(),
            });
        }
        if !(2..=3).contains(&self.frames_in_flight) {
            return Err(ConfigError::Invalid {
                field: "frames_in_flight",
                reason: format!("{} is not 2 or 3", self.frames_in_flight),
            });
        }
        if self.gpu_latency_frames > 8 {
            return Err(ConfigError::Invalid {
                field: "gpu_latency_frames",
                reason: format!("{} exceeds the maximum of 8", self.gpu_latency_frames),
            });
        }
        if self.fence_timeout_ms == Some(0) {
            return Err(ConfigError::Invalid {
                field: "fence_timeout_ms",
                reason: "timeout must be positive".to_string(),
            });
        }
        Ok(())
    }
}
