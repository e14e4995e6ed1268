//! Parsed shader definitions.

use std::fmt;
use std::str::FromStr;

use crate::backend::TextureDimension;

/// Render queue a shader or pass is drawn in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum RenderQueue {
    #[default]
    Forward,
    /// GBuffer geometry pass followed by a shared fullscreen lighting pass
    Deferred,
}

impl RenderQueue {
    pub fn as_str(&self) -> &'static str {
        match self {
            RenderQueue::Forward => "Forward",
            RenderQueue::Deferred => "Deferred",
        }
    }
}

impl FromStr for RenderQueue {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Forward" => Ok(RenderQueue::Forward),
            "Deferred" => Ok(RenderQueue::Deferred),
            other => Err(format!("unknown render queue {other:?}")),
        }
    }
}

impl fmt::Display for RenderQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Declared type of a material property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PropertyType {
    Float,
    Vector2,
    Vector3,
    Vector4,
    Int,
    Bool,
    Texture2D,
    TextureCube,
}

impl PropertyType {
    pub fn is_texture(&self) -> bool {
        matches!(self, PropertyType::Texture2D | PropertyType::TextureCube)
    }

    /// View dimension of a texture parameter.
    pub fn texture_dimension(&self) -> Option<TextureDimension> {
        match self {
            PropertyType::Texture2D => Some(TextureDimension::D2),
            PropertyType::TextureCube => Some(TextureDimension::Cube),
            _ => None,
        }
    }

    /// Size in the material constant buffer. Textures occupy a 4-byte bindless index.
    pub fn byte_size(&self) -> u32 {
        match self {
            PropertyType::Float | PropertyType::Int | PropertyType::Bool => 4,
            PropertyType::Vector2 => 8,
            PropertyType::Vector3 => 12,
            PropertyType::Vector4 => 16,
            PropertyType::Texture2D | PropertyType::TextureCube => 4,
        }
    }

    /// Native declaration type inside the constant buffer.
    pub fn hlsl_type(&self) -> &'static str {
        match self {
            PropertyType::Float => "float",
            PropertyType::Vector2 => "float2",
            PropertyType::Vector3 => "float3",
            PropertyType::Vector4 => "float4",
            PropertyType::Int => "int",
            PropertyType::Bool => "bool",
            PropertyType::Texture2D | PropertyType::TextureCube => "uint",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PropertyType::Float => "Float",
            PropertyType::Vector2 => "Vector2",
            PropertyType::Vector3 => "Vector3",
            PropertyType::Vector4 => "Vector4",
            PropertyType::Int => "Int",
            PropertyType::Bool => "Bool",
            PropertyType::Texture2D => "Texture2D",
            PropertyType::TextureCube => "TextureCube",
        }
    }
}

impl FromStr for PropertyType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "Float" => PropertyType::Float,
            "Vector2" => PropertyType::Vector2,
            "Vector3" => PropertyType::Vector3,
            "Vector4" => PropertyType::Vector4,
            "Int" => PropertyType::Int,
            "Bool" => PropertyType::Bool,
            "Texture2D" => PropertyType::Texture2D,
            "TextureCube" => PropertyType::TextureCube,
            other => return Err(format!("unknown property type {other:?}")),
        })
    }
}

/// One `//# <type> <name> { ... }` line of a `Properties` block.
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyDefinition {
    pub name: String,
    pub ty: PropertyType,
    /// Raw text inside `default(...)`
    pub default: Option<String>,
    pub min: Option<String>,
    pub max: Option<String>,
    /// Editor widget hint from `ui(...)`
    pub ui: Option<String>,
}

impl PropertyDefinition {
    pub fn new(name: impl Into<String>, ty: PropertyType) -> Self {
        Self {
            name: name.into(),
            ty,
            default: None,
            min: None,
            max: None,
            ui: None,
        }
    }
}

/// One vertex+pixel program unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PassDefinition {
    pub name: String,
    pub render_queue: RenderQueue,
    pub vertex_entry: String,
    pub fragment_entry: String,
    /// Native code with the entry-point pragmas removed
    pub body: String,
}

/// A BRDF contribution injected into the shared lighting shader.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShadingModelDefinition {
    pub id: u32,
    /// Expression returned from the dispatch switch, e.g. `MyBRDF(input)`
    pub call: String,
    /// Function definitions the expression depends on
    pub body: String,
}

/// Structured result of parsing one shader source.
#[derive(Debug, Clone, PartialEq)]
pub struct ShaderDefinition {
    pub name: String,
    pub render_queue: RenderQueue,
    pub properties: Vec<PropertyDefinition>,
    pub passes: Vec<PassDefinition>,
    pub shading_model: Option<ShadingModelDefinition>,
}

impl ShaderDefinition {
    pub fn property(&self, name: &str) -> Option<&PropertyDefinition> {
        self.properties.iter().find(|p| p.name == name)
    }
}
