//! Render context configuration.

use super::TextureFormat;

/// Presentation resolution and swap-chain shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VideoMode {
    pub width: u32,
    pub height: u32,
    pub color_bits: u32,
    pub fullscreen: bool,
    /// Buffer ring size, 2 or 3. `0` uses the device's configured
    /// `frames_in_flight`.
    pub swap_chain_size: u32,
}

impl Default for VideoMode {
    fn default() -> Self {
        Self {
            width: 800,
            height: 600,
            color_bits: 32,
            fullscreen: false,
            swap_chain_size: 0,
        }
    }
}

impl VideoMode {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            ..Default::default()
        }
    }

    pub fn with_swap_chain_size(mut self, size: u32) -> Self {
        self.swap_chain_size = size;
        self
    }

    pub fn with_fullscreen(mut self, fullscreen: bool) -> Self {
        self.fullscreen = fullscreen;
        self
    }
}

/// Vertical synchronization settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Vsync {
    pub enabled: bool,
    pub refresh_rate: u32,
    /// Number of vertical blanks per present when enabled.
    pub interval: u32,
}

impl Default for Vsync {
    fn default() -> Self {
        Self {
            enabled: false,
            refresh_rate: 60,
            interval: 1,
        }
    }
}

impl Vsync {
    pub fn enabled(interval: u32) -> Self {
        Self {
            enabled: true,
            interval,
            ..Default::default()
        }
    }

    /// Swap interval passed to the present call.
    pub fn swap_interval(&self) -> u32 {
        if self.enabled {
            self.interval.max(1)
        } else {
            0
        }
    }
}

/// Descriptor for creating a render context.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RenderContextDescriptor {
    pub label: Option<String>,
    pub video_mode: VideoMode,
    pub vsync: Vsync,
    pub color_format: TextureFormat,
}

impl RenderContextDescriptor {
    pub fn new(video_mode: VideoMode) -> Self {
        Self {
            label: None,
            video_mode,
            vsync: Vsync::default(),
            color_format: TextureFormat::Bgra8Unorm,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_vsync(mut self, vsync: Vsync) -> Self {
        self.vsync = vsync;
        self
    }

    pub fn with_color_format(mut self, format: TextureFormat) -> Self {
        self.color_format = format;
        self
    }
}
