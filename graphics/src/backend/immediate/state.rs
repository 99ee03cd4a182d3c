//! Binding state of the immediate backend.

use std::collections::HashMap;

use crate::types::TextureKind;

/// Binding targets that exist once per context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BindTarget {
    Buffer,
    Texture(TextureKind),
    InputLayout,
}

/// Currently bound object per target.
///
/// Every native call of the immediate backend operates on the bound object,
/// so each call binds through this manager first. One manager is owned by
/// each backend instance; two devices never share binding state.
#[derive(Debug, Default)]
pub struct StateManager {
    bound: HashMap<BindTarget, u64>,
    bind_calls: u64,
}

impl StateManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `name` to `target`, skipping redundant binds.
    pub fn bind(&mut self, target: BindTarget, name: u64) {
        if self.bound.get(&target) != Some(&name) {
            self.bound.insert(target, name);
            self.bind_calls += 1;
        }
    }

    pub fn bound(&self, target: BindTarget) -> Option<u64> {
        self.bound.get(&target).copied()
    }

    /// Forget `name` wherever it is bound, as deleting an object does.
    pub fn unbind_object(&mut self, name: u64) {
        self.bound.retain(|_, bound| *bound != name);
    }

    pub fn bind_calls(&self) -> u64 {
        self.bind_calls
    }
}
