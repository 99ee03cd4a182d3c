//! Render contexts: a presentation buffer ring driven by a [`FrameScheduler`].

use std::sync::Arc;

use crate::error::{GraphicsError, GraphicsResult};
use crate::registry::{Handle, ObjectStore};
use crate::resources::Texture;
use crate::scheduler::{Command, CommandList, FrameReport, FrameScheduler};
use crate::texture::encode_color;
use crate::types::{
    ClearColor, RenderContextDescriptor, TextureDescriptor, TextureUsage, VideoMode, Vsync,
};

/// A presentation target with its ring of back-buffer textures.
///
/// Back buffers are ordinary registry [`Texture`]s. They are replaced as a
/// set when the video mode changes, after every frame in flight completed.
pub struct RenderContext {
    descriptor: RenderContextDescriptor,
    scheduler: FrameScheduler,
    buffers: Vec<Handle<Texture>>,
    clear_color: ClearColor,
    pending: CommandList,
}

impl RenderContext {
    pub(crate) fn new(
        descriptor: RenderContextDescriptor,
        scheduler: FrameScheduler,
        buffers: Vec<Handle<Texture>>,
    ) -> Self {
        Self {
            descriptor,
            scheduler,
            buffers,
            clear_color: ClearColor::default(),
            pending: CommandList::new(),
        }
    }

    pub fn descriptor(&self) -> &RenderContextDescriptor {
        &self.descriptor
    }

    pub fn label(&self) -> Option<&str> {
        self.descriptor.label.as_deref()
    }

    pub fn video_mode(&self) -> VideoMode {
        self.descriptor.video_mode
    }

    pub fn vsync(&self) -> Vsync {
        self.descriptor.vsync
    }

    pub fn buffer_count(&self) -> usize {
        self.buffers.len()
    }

    /// Back-buffer textures in ring order.
    pub fn buffers(&self) -> &[Handle<Texture>] {
        &self.buffers
    }

    /// Index of the buffer the next frame renders into.
    pub fn current_index(&self) -> usize {
        self.scheduler.current_index()
    }

    pub fn back_buffer(&self) -> Handle<Texture> {
        self.buffers[self.scheduler.current_index()]
    }

    pub fn scheduler(&self) -> &FrameScheduler {
        &self.scheduler
    }

    pub fn clear_color(&self) -> ClearColor {
        self.clear_color
    }

    /// Commands recorded for the next present.
    pub fn pending_commands(&self) -> usize {
        self.pending.len()
    }

    /// Back-buffer descriptor for `mode`.
    pub(crate) fn buffer_descriptor(&self, mode: VideoMode, index: usize) -> TextureDescriptor {
        buffer_descriptor(&self.descriptor, mode, index)
    }

    pub(crate) fn set_vsync(&mut self, vsync: Vsync) {
        log::debug!(
            "RenderContext {:?}: swap interval {} -> {}",
            self.descriptor.label,
            self.descriptor.vsync.swap_interval(),
            vsync.swap_interval()
        );
        self.descriptor.vsync = vsync;
    }

    /// Record a clear of the current back buffer.
    pub(crate) fn record_clear(&mut self, color: ClearColor, textures: &ObjectStore<Texture>) -> GraphicsResult<()> {
        let texture = textures.get(self.back_buffer())?;
        let image = texture.native().image();
        let pattern = encode_color(color.to_array(), texture.format())?;
        self.pending.push(Command::Fill {
            target: Arc::clone(image.memory()),
            range: image.level_range(0),
            pattern,
        });
        self.clear_color = color;
        Ok(())
    }

    /// Submit the recorded commands and hand the back buffer to the display.
    pub(crate) fn present(&mut self, textures: &ObjectStore<Texture>) -> GraphicsResult<FrameReport> {
        let buffer = textures.get(self.back_buffer())?.native().image().id;
        // Recorded commands stay pending until the slot is free.
        let wait = self.scheduler.wait_for_slot()?;
        let mut commands = std::mem::take(&mut self.pending);
        commands.push(Command::Present {
            buffer,
            swap_interval: self.descriptor.vsync.swap_interval(),
        });
        self.scheduler.submit(wait, commands)
    }

    /// Drain the device and swap in a new buffer set for `mode`.
    ///
    /// Returns the buffers that were replaced.
    pub(crate) fn replace_buffers(
        &mut self,
        mode: VideoMode,
        buffers: Vec<Handle<Texture>>,
    ) -> GraphicsResult<Vec<Handle<Texture>>> {
        self.scheduler.reconfigure(buffers.len())?;
        self.pending = CommandList::new();
        self.descriptor.video_mode = mode;
        Ok(std::mem::replace(&mut self.buffers, buffers))
    }

    pub(crate) fn into_buffers(self) -> Vec<Handle<Texture>> {
        self.buffers
    }
}

/// Descriptor of back buffer `index` of a context.
pub(crate) fn buffer_descriptor(
    descriptor: &RenderContextDescriptor,
    mode: VideoMode,
    index: usize,
) -> TextureDescriptor {
    let label = match &descriptor.label {
        Some(label) => format!("{label} back buffer {index}"),
        None => format!("back buffer {index}"),
    };
    TextureDescriptor::new_2d(
        mode.width,
        mode.height,
        descriptor.color_format,
        TextureUsage::RENDER_ATTACHMENT | TextureUsage::PRESENT | TextureUsage::COPY_SRC,
    )
    .with_label(label)
}

/// Ring size for `mode`, falling back to `frames_in_flight`.
pub(crate) fn ring_size(mode: VideoMode, frames_in_flight: u32) -> GraphicsResult<usize> {
    let size = match mode.swap_chain_size {
        0 => frames_in_flight,
        size => size,
    } as usize;
    if !crate::scheduler::BUFFER_COUNTS.contains(&size) {
        return Err(GraphicsError::invalid(format!(
            "swap chain size {size} is not 2 or 3"
        )));
    }
    if mode.width == 0 || mode.height == 0 {
        return Err(GraphicsError::invalid(format!(
            "video mode {}x{} is empty",
            mode.width, mode.height
        )));
    }
    Ok(size)
}

impl std::fmt::Debug for RenderContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderContext")
            .field("label", &self.descriptor.label)
            .field("video_mode", &self.descriptor.video_mode)
            .field("buffers", &self.buffers.len())
            .field("current", &self.scheduler.current_index())
            .finish()
    }
}

static_assertions::assert_impl_all!(RenderContext: Send);
