//! Sampler state objects.

use crate::backend::NativeSampler;
use crate::types::SamplerDescriptor;

pub struct Sampler {
    descriptor: SamplerDescriptor,
    native: NativeSampler,
}

impl Sampler {
    pub(crate) fn new(descriptor: SamplerDescriptor, native: NativeSampler) -> Self {
        Self { descriptor, native }
    }

    pub fn descriptor(&self) -> &SamplerDescriptor {
        &self.descriptor
    }

    pub fn label(&self) -> Option<&str> {
        self.descriptor.label.as_deref()
    }

    /// Name of the state object inside its backend.
    pub fn native_id(&self) -> u64 {
        self.native.id
    }
}

impl std::fmt::Debug for Sampler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Sampler")
            .field("label", &self.descriptor.label)
            .field("native", &self.native.id)
            .field("wrap", &self.descriptor.wrap)
            .field("compare", &self.descriptor.compare)
            .finish()
    }
}

static_assertions::assert_impl_all!(Sampler: Send, Sync);
