//! Material constant-buffer layout.
//!
//! Scalars and vectors are packed in declaration order with the native
//! constant-buffer rule: a value never straddles a 16-byte register. Texture
//! properties follow all scalar data as 4-byte bindless indices.

use crate::material::value::ParameterValue;
use crate::shader::definition::{PropertyDefinition, PropertyType};

/// Size of one constant-buffer register.
pub const REGISTER_SIZE: u32 = 16;

/// Constant buffers are allocated in multiples of this size.
pub const CONSTANT_BUFFER_ALIGNMENT: u32 = 256;

/// A property with its assigned location in the material constant buffer.
#[derive(Debug, Clone, PartialEq)]
pub struct ShaderParameter {
    pub name: String,
    pub ty: PropertyType,
    /// Nominal register for generated source: the `c` register row for
    /// values, the texture ordinal for textures.
    pub register: u32,
    pub byte_offset: u32,
    pub byte_size: u32,
    /// Resolved default for values. `None` for textures.
    pub default: Option<ParameterValue>,
    /// Raw `default(...)` text of a texture property, e.g. `white`.
    pub texture_default: Option<String>,
}

impl ShaderParameter {
    pub fn is_texture(&self) -> bool {
        self.ty.is_texture()
    }

    pub fn end(&self) -> u32 {
        self.byte_offset + self.byte_size
    }

    /// Name of the constant-buffer field holding the value or bindless index.
    pub fn field_name(&self) -> String {
        if self.is_texture() {
            format!("{}_Index", self.name)
        } else {
            self.name.clone()
        }
    }

    /// Value written when a material has not set this parameter.
    pub fn default_value(&self) -> Option<ParameterValue> {
        self.default.or_else(|| ParameterValue::zero(self.ty))
    }
}

/// Parameter list plus total constant-buffer size.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ParameterLayout {
    pub parameters: Vec<ShaderParameter>,
    /// Rounded up to [`CONSTANT_BUFFER_ALIGNMENT`]. Zero when there are no parameters.
    pub size: u32,
}

/// Round `value` up to a multiple of `alignment` (a power of two).
pub fn align_up(value: u32, alignment: u32) -> u32 {
    (value + alignment - 1) & !(alignment - 1)
}

/// Assign offsets to every property of a shader.
pub fn generate_parameters(properties: &[PropertyDefinition]) -> ParameterLayout {
    let mut parameters = Vec::with_capacity(properties.len());
    let mut offset = 0u32;

    for property in properties.iter().filter(|p| !p.ty.is_texture()) {
        let size = property.ty.byte_size();
        if offset % REGISTER_SIZE + size > REGISTER_SIZE {
            offset = align_up(offset, REGISTER_SIZE);
        }
        parameters.push(ShaderParameter {
            name: property.name.clone(),
            ty: property.ty,
            register: offset / REGISTER_SIZE,
            byte_offset: offset,
            byte_size: size,
            default: Some(resolve_default(property)),
            texture_default: None,
        });
        offset += size;
    }

    offset = align_up(offset, 4);
    for (ordinal, property) in properties.iter().filter(|p| p.ty.is_texture()).enumerate() {
        let size = property.ty.byte_size();
        parameters.push(ShaderParameter {
            name: property.name.clone(),
            ty: property.ty,
            register: ordinal as u32,
            byte_offset: offset,
            byte_size: size,
            default: None,
            texture_default: property.default.clone(),
        });
        offset += size;
    }

    ParameterLayout {
        parameters,
        size: align_up(offset, CONSTANT_BUFFER_ALIGNMENT),
    }
}

fn resolve_default(property: &PropertyDefinition) -> ParameterValue {
    let zero = ParameterValue::zero(property.ty).unwrap_or(ParameterValue::Float(0.0));
    let Some(text) = property.default.as_deref() else {
        return zero;
    };
    match ParameterValue::parse(property.ty, text) {
        Ok(value) => value,
        Err(e) => {
            log::warn!(
                "property {:?}: invalid default ({e}), using zero",
                property.name
            );
            zero
        }
    }
}
