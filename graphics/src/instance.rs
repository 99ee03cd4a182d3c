//! Graphics instance.
//!
//! The [`GraphicsInstance`] is the top-level entry point for the graphics
//! system. It holds the table of backend modules and creates
//! [`GraphicsDevice`]s from them by name.

use crate::backend::{self, Backend, BackendKind};
use crate::config::GraphicsConfig;
use crate::device::GraphicsDevice;
use crate::error::{GraphicsError, GraphicsResult};

/// Build identifier of this crate's backend interface.
///
/// Debug and release builds lay out backend objects differently, so their
/// identifiers differ and never load each other's modules.
pub const BUILD_ID: u32 = if cfg!(debug_assertions) {
    0x0100_0001
} else {
    0x0100_0000
};

/// Constructor of one backend module.
pub type BackendFactory = fn(&GraphicsConfig) -> GraphicsResult<Box<dyn Backend>>;

/// A named backend module and the interface revision it was built for.
#[derive(Clone, Copy)]
pub struct BackendModule {
    pub name: &'static str,
    pub build_id: u32,
    pub create: BackendFactory,
}

impl BackendModule {
    /// Module of a backend compiled into this crate.
    pub fn builtin(kind: BackendKind) -> Self {
        let create: BackendFactory = match kind {
            BackendKind::Immediate => create_immediate,
            BackendKind::Deferred => create_deferred,
            BackendKind::Explicit => create_explicit,
        };
        Self {
            name: kind.name(),
            build_id: BUILD_ID,
            create,
        }
    }
}

impl std::fmt::Debug for BackendModule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendModule")
            .field("name", &self.name)
            .field("build_id", &format_args!("{:#010x}", self.build_id))
            .finish_non_exhaustive()
    }
}

fn create_immediate(config: &GraphicsConfig) -> GraphicsResult<Box<dyn Backend>> {
    backend::create_backend(BackendKind::Immediate, config)
}

fn create_deferred(config: &GraphicsConfig) -> GraphicsResult<Box<dyn Backend>> {
    backend::create_backend(BackendKind::Deferred, config)
}

fn create_explicit(config: &GraphicsConfig) -> GraphicsResult<Box<dyn Backend>> {
    backend::create_backend(BackendKind::Explicit, config)
}

/// Backend module table and device factory.
///
/// # Example
///
/// ```ignore
/// let instance = GraphicsInstance::new(GraphicsConfig::from_ron_str(r#"(backend: "deferred")"#)?);
/// let device = instance.create_default_device()?;
/// ```
#[derive(Debug)]
pub struct GraphicsInstance {
    config: GraphicsConfig,
    modules: Vec<BackendModule>,
}

impl GraphicsInstance {
    /// Create an instance with every compiled-in backend registered.
    pub fn new(config: GraphicsConfig) -> Self {
        let modules: Vec<BackendModule> = BackendKind::ALL
            .into_iter()
            .filter(BackendKind::is_available)
            .map(BackendModule::builtin)
            .collect();
        log::info!(
            "Creating GraphicsInstance with backends: {}",
            modules.iter().map(|m| m.name).collect::<Vec<_>>().join(", ")
        );
        Self { config, modules }
    }

    pub fn config(&self) -> &GraphicsConfig {
        &self.config
    }

    /// Add a module, replacing any module of the same name.
    pub fn register_module(&mut self, module: BackendModule) {
        log::debug!("Registering backend module {} ({:#010x})", module.name, module.build_id);
        self.modules.retain(|m| !m.name.eq_ignore_ascii_case(module.name));
        self.modules.push(module);
    }

    /// Names of the registered backend modules.
    pub fn backends(&self) -> Vec<&'static str> {
        self.modules.iter().map(|m| m.name).collect()
    }

    /// Create a device from the backend named in the configuration.
    pub fn create_default_device(&self) -> GraphicsResult<GraphicsDevice> {
        self.create_device(&self.config.backend)
    }

    /// Create a device from the named backend module.
    pub fn create_device(&self, name: &str) -> GraphicsResult<GraphicsDevice> {
        self.create_device_with_build_id(name, BUILD_ID)
    }

    /// Create a device, requiring the module to match `build_id`.
    pub fn create_device_with_build_id(&self, name: &str, build_id: u32) -> GraphicsResult<GraphicsDevice> {
        let module = self
            .modules
            .iter()
            .find(|m| m.name.eq_ignore_ascii_case(name.trim()))
            .ok_or_else(|| GraphicsError::BackendUnavailable(name.to_string()))?;

        if module.build_id != build_id {
            log::warn!(
                "Backend {} was built for {:#010x}, caller expects {build_id:#010x}",
                module.name,
                module.build_id
            );
            return Err(GraphicsError::BuildMismatch {
                backend: module.name,
                module: module.build_id,
                caller: build_id,
            });
        }

        log::info!("Using backend: {}", module.name);
        let backend = (module.create)(&self.config)?;
        Ok(GraphicsDevice::new(backend, self.config.clone()))
    }
}

impl Default for GraphicsInstance {
    fn default() -> Self {
        Self::new(GraphicsConfig::default())
    }
}

static_assertions::assert_impl_all!(GraphicsInstance: Send, Sync);
