//! Vertex input layouts.

use crate::backend::{NativeInputLayout, NativeVertexFormat};
use crate::error::{GraphicsError, GraphicsResult};
use crate::types::{VertexAttribute, VertexFormat};

/// How an element advances between draws.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InputStep {
    PerVertex,
    /// Advance once every N instances.
    PerInstance(u32),
}

/// One native input element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputElement {
    pub semantic_name: String,
    pub semantic_index: u32,
    pub format: NativeVertexFormat,
    pub input_slot: u32,
    pub byte_offset: u32,
    pub step: InputStep,
}

/// Input layout built for a linked program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputLayout {
    pub elements: Vec<InputElement>,
    pub stride: u32,
    pub native: NativeInputLayout,
}

/// Map every attribute of `format` to a native element.
pub(crate) fn build_elements(
    format: &VertexFormat,
    map: impl Fn(&VertexAttribute) -> Option<NativeVertexFormat>,
) -> GraphicsResult<Vec<InputElement>> {
    format
        .attributes
        .iter()
        .map(|attribute| {
            let native = map(attribute).ok_or_else(|| {
                GraphicsError::invalid(format!(
                    "no native format for {}x{} (for vertex attribute \"{}\")",
                    attribute.data_type, attribute.components, attribute.name
                ))
            })?;
            let step = match attribute.instance_divisor {
                0 => InputStep::PerVertex,
                divisor => InputStep::PerInstance(divisor),
            };
            Ok(InputElement {
                semantic_name: attribute.name.clone(),
                semantic_index: attribute.semantic_index,
                format: native,
                input_slot: attribute.input_slot,
                byte_offset: attribute.offset,
                step,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::dxgi_format;
    use crate::error::ErrorKind;
    use crate::types::DataType;

    #[test]
    fn test_instance_step_rate() {
        let format = VertexFormat::new()
            .append(VertexAttribute::new("position", DataType::Float32, 3))
            .append(
                VertexAttribute::new("offset", DataType::Float32, 2)
                    .with_input_slot(1)
                    .with_instance_divisor(2),
            );
        let elements = build_elements(&format, dxgi_format).unwrap();

        assert_eq!(elements[0].step, InputStep::PerVertex);
        assert_eq!(elements[1].step, InputStep::PerInstance(2));
        assert_eq!(elements[1].byte_offset, 12);
        assert_eq!(elements[1].input_slot, 1);
    }

    #[test]
    fn test_unmappable_attribute_is_named() {
        let format = VertexFormat::new().append(VertexAttribute::new("color", DataType::UInt8, 3));
        let err = build_elements(&format, dxgi_format).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
        assert!(err.to_string().contains("\"color\""));
    }
}
