//! Query types and descriptors.

use crate::capabilities::Feature;

/// What a query object measures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryKind {
    SamplesPassed,
    AnySamplesPassed,
    TimeElapsed,
    Timestamp,
    PipelineStatistics,
    StreamOutPrimitivesWritten,
    StreamOutOverflow,
}

impl QueryKind {
    pub fn required_feature(&self) -> Option<Feature> {
        match self {
            Self::StreamOutPrimitivesWritten | Self::StreamOutOverflow => {
                Some(Feature::StreamOutput)
            }
            _ => None,
        }
    }
}

/// Descriptor for creating a query.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QueryDescriptor {
    pub label: Option<String>,
    pub kind: QueryKind,
    /// The query can drive conditional rendering.
    pub render_condition: bool,
}

impl QueryDescriptor {
    pub fn new(kind: QueryKind) -> Self {
        Self {
            label: None,
            kind,
            render_condition: false,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_render_condition(mut self) -> Self {
        self.render_condition = true;
        self
    }
}
