//! Query objects.

use crate::backend::NativeQuery;
use crate::types::{QueryDescriptor, QueryKind};

#[derive(Debug)]
pub struct Query {
    descriptor: QueryDescriptor,
    native: NativeQuery,
}

impl Query {
    pub(crate) fn new(descriptor: QueryDescriptor, native: NativeQuery) -> Self {
        Self { descriptor, native }
    }

    pub fn descriptor(&self) -> &QueryDescriptor {
        &self.descriptor
    }

    pub fn kind(&self) -> QueryKind {
        self.native.kind
    }

    pub fn native_id(&self) -> u64 {
        self.native.id
    }
}
