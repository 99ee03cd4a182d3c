//! Native vertex format tables.

use crate::types::{DataType, VertexAttribute};

/// Native vertex element format selected for an attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NativeVertexFormat {
    pub data_type: DataType,
    pub components: u32,
    pub normalized: bool,
}

impl NativeVertexFormat {
    pub fn size(&self) -> u32 {
        self.data_type.size() * self.components
    }
}

/// Attribute-pointer style mapping: any scalar type with 1 to 4 components.
pub fn attribute_pointer_format(attribute: &VertexAttribute) -> Option<NativeVertexFormat> {
    if !(1..=4).contains(&attribute.components) {
        return None;
    }
    if attribute.normalized && attribute.data_type.is_float() {
        return None;
    }
    Some(NativeVertexFormat {
        data_type: attribute.data_type,
        components: attribute.components,
        normalized: attribute.normalized,
    })
}

/// DXGI style mapping: no 64-bit floats, no 3-component 8/16-bit formats,
/// no normalized 32-bit integers.
pub fn dxgi_format(attribute: &VertexAttribute) -> Option<NativeVertexFormat> {
    let components = attribute.components;
    let supported = match attribute.data_type {
        DataType::Float32 => (1..=4).contains(&components) && !attribute.normalized,
        DataType::Float16 => matches!(components, 1 | 2 | 4) && !attribute.normalized,
        DataType::Int8 | DataType::UInt8 | DataType::Int16 | DataType::UInt16 => {
            matches!(components, 1 | 2 | 4)
        }
        DataType::Int32 | DataType::UInt32 => (1..=4).contains(&components) && !attribute.normalized,
        DataType::Float64 => false,
    };
    supported.then_some(NativeVertexFormat {
        data_type: attribute.data_type,
        components,
        normalized: attribute.normalized,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dxgi_rejects_rgb8() {
        let rgb8 = VertexAttribute::new("color", DataType::UInt8, 3).normalized();
        assert!(dxgi_format(&rgb8).is_none());
        assert!(attribute_pointer_format(&rgb8).is_some());
    }

    #[test]
    fn test_float64_only_on_attribute_pointers() {
        let attr = VertexAttribute::new("weights", DataType::Float64, 2);
        assert!(dxgi_format(&attr).is_none());
        assert_eq!(attribute_pointer_format(&attr).map(|f| f.size()), Some(16));
    }

    #[test]
    fn test_component_count_bounds() {
        let attr = VertexAttribute::new("position", DataType::Float32, 5);
        assert!(dxgi_format(&attr).is_none());
        assert!(attribute_pointer_format(&attr).is_none());
    }
}
