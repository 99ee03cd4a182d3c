//! Resource ownership registry.
//!
//! Every hardware object created by a [`GraphicsDevice`](crate::GraphicsDevice)
//! lives in that device's [`ResourceRegistry`]. Storage is a generational
//! slot map per object kind, so inserting or releasing one object never
//! invalidates another object's [`Handle`], and a stale handle is detected
//! instead of aliasing a newer object in the same slot.
//!
//! The registry does no locking of its own. Mutation needs `&mut`, which
//! leaves serialization to the owner.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;
use std::sync::atomic::{AtomicU32, Ordering};

use slotmap::{DefaultKey, Key, SlotMap};

use crate::context::RenderContext;
use crate::error::{GraphicsError, GraphicsResult};
use crate::resources::{Buffer, BufferArray, Pipeline, Query, Sampler, Texture};
use crate::shader::{Shader, ShaderProgram};

static NEXT_REGISTRY_ID: AtomicU32 = AtomicU32::new(1);

/// Identity of one registry; handles remember which registry issued them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RegistryId(u32);

impl RegistryId {
    fn next() -> Self {
        Self(NEXT_REGISTRY_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// Non-owning, copyable reference to a registry entry.
pub struct Handle<T> {
    key: DefaultKey,
    registry: RegistryId,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Handle<T> {
    fn new(key: DefaultKey, registry: RegistryId) -> Self {
        Self {
            key,
            registry,
            _marker: PhantomData,
        }
    }

    pub fn registry(&self) -> RegistryId {
        self.registry
    }
}

impl<T> Clone for Handle<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Handle<T> {}

impl<T> PartialEq for Handle<T> {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key && self.registry == other.registry
    }
}

impl<T> Eq for Handle<T> {}

impl<T> Hash for Handle<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key.hash(state);
        self.registry.hash(state);
    }
}

impl<T: HardwareObject> fmt::Debug for Handle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Handle<{}>({self})", T::KIND)
    }
}

impl<T> fmt::Display for Handle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}@r{}", self.key.data(), self.registry.0)
    }
}

/// Generational storage for one object kind.
pub struct ObjectStore<T> {
    objects: SlotMap<DefaultKey, T>,
    registry: RegistryId,
}

impl<T: HardwareObject> ObjectStore<T> {
    fn new(registry: RegistryId) -> Self {
        Self {
            objects: SlotMap::new(),
            registry,
        }
    }

    pub fn insert(&mut self, object: T) -> Handle<T> {
        Handle::new(self.objects.insert(object), self.registry)
    }

    fn check_owner(&self, handle: Handle<T>) -> GraphicsResult<()> {
        if handle.registry != self.registry {
            return Err(GraphicsError::invalid(format!(
                "{} handle {handle} belongs to a different registry",
                T::KIND
            )));
        }
        Ok(())
    }

    fn released(handle: Handle<T>) -> GraphicsError {
        GraphicsError::UseAfterRelease {
            kind: T::KIND,
            handle: handle.to_string(),
        }
    }

    pub fn get(&self, handle: Handle<T>) -> GraphicsResult<&T> {
        self.check_owner(handle)?;
        self.objects
            .get(handle.key)
            .ok_or_else(|| Self::released(handle))
    }

    pub fn get_mut(&mut self, handle: Handle<T>) -> GraphicsResult<&mut T> {
        self.check_owner(handle)?;
        self.objects
            .get_mut(handle.key)
            .ok_or_else(|| Self::released(handle))
    }

    pub fn remove(&mut self, handle: Handle<T>) -> GraphicsResult<T> {
        self.check_owner(handle)?;
        self.objects
            .remove(handle.key)
            .ok_or_else(|| Self::released(handle))
    }

    pub fn contains(&self, handle: Handle<T>) -> bool {
        handle.registry == self.registry && self.objects.contains_key(handle.key)
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn handles(&self) -> impl Iterator<Item = Handle<T>> + '_ {
        self.objects
            .keys()
            .map(move |key| Handle::new(key, self.registry))
    }
}

/// Object kinds owned by a [`ResourceRegistry`].
pub trait HardwareObject: Sized + 'static {
    const KIND: &'static str;

    fn store(registry: &ResourceRegistry) -> &ObjectStore<Self>;
    fn store_mut(registry: &mut ResourceRegistry) -> &mut ObjectStore<Self>;
}

macro_rules! hardware_objects {
    ($($ty:ty => $field:ident, $kind:literal;)*) => {
        /// Owner of every hardware object of one device.
        pub struct ResourceRegistry {
            id: RegistryId,
            $($field: ObjectStore<$ty>,)*
        }

        impl ResourceRegistry {
            pub fn new() -> Self {
                let id = RegistryId::next();
                Self {
                    id,
                    $($field: ObjectStore::new(id),)*
                }
            }

            /// Total number of live objects of every kind.
            pub fn live_objects(&self) -> usize {
                0 $(+ self.$field.len())*
            }
        }

        $(
            impl HardwareObject for $ty {
                const KIND: &'static str = $kind;

                fn store(registry: &ResourceRegistry) -> &ObjectStore<Self> {
                    &registry.$field
                }

                fn store_mut(registry: &mut ResourceRegistry) -> &mut ObjectStore<Self> {
                    &mut registry.$field
                }
            }
        )*
    };
}

hardware_objects! {
    Buffer => buffers, "Buffer";
    BufferArray => buffer_arrays, "BufferArray";
    Texture => textures, "Texture";
    Sampler => samplers, "Sampler";
    Query => queries, "Query";
    Shader => shaders, "Shader";
    ShaderProgram => programs, "ShaderProgram";
    Pipeline => pipelines, "Pipeline";
    RenderContext => contexts, "RenderContext";
}

impl Default for ResourceRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ResourceRegistry {
    pub fn id(&self) -> RegistryId {
        self.id
    }

    pub fn insert<T: HardwareObject>(&mut self, object: T) -> Handle<T> {
        let handle = T::store_mut(self).insert(object);
        log::trace!("Registered {} {handle}", T::KIND);
        handle
    }

    pub fn get<T: HardwareObject>(&self, handle: Handle<T>) -> GraphicsResult<&T> {
        T::store(self).get(handle)
    }

    pub fn get_mut<T: HardwareObject>(&mut self, handle: Handle<T>) -> GraphicsResult<&mut T> {
        T::store_mut(self).get_mut(handle)
    }

    /// Remove an object and hand it back for native teardown.
    pub fn release<T: HardwareObject>(&mut self, handle: Handle<T>) -> GraphicsResult<T> {
        let object = T::store_mut(self).remove(handle)?;
        log::trace!("Released {} {handle}", T::KIND);
        Ok(object)
    }

    pub fn is_alive<T: HardwareObject>(&self, handle: Handle<T>) -> bool {
        T::store(self).contains(handle)
    }

    pub fn count<T: HardwareObject>(&self) -> usize {
        T::store(self).len()
    }

    pub fn store<T: HardwareObject>(&self) -> &ObjectStore<T> {
        T::store(self)
    }

    /// A program together with the shaders its slots refer to.
    pub(crate) fn program_and_shaders(
        &mut self,
        handle: Handle<ShaderProgram>,
    ) -> GraphicsResult<(&mut ShaderProgram, &ObjectStore<Shader>)> {
        let program = self.programs.get_mut(handle)?;
        Ok((program, &self.shaders))
    }

    /// A render context together with the texture store owning its buffers.
    pub(crate) fn context_and_textures(
        &mut self,
        handle: Handle<RenderContext>,
    ) -> GraphicsResult<(&mut RenderContext, &mut ObjectStore<Texture>)> {
        let context = self.contexts.get_mut(handle)?;
        Ok((context, &mut self.textures))
    }
}

impl fmt::Debug for ResourceRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceRegistry")
            .field("id", &self.id)
            .field("live_objects", &self.live_objects())
            .finish()
    }
}
