//! Typed material parameter values.

use glam::{Vec2, Vec3, Vec4};
use serde::{Deserialize, Serialize};

use crate::shader::definition::PropertyType;

/// Value of a non-texture material parameter.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum ParameterValue {
    Float(f32),
    Vector2(Vec2),
    Vector3(Vec3),
    Vector4(Vec4),
    Int(i32),
    Bool(bool),
}

impl ParameterValue {
    /// Zero value of a declared type. Textures have no inline value.
    pub fn zero(ty: PropertyType) -> Option<Self> {
        Some(match ty {
            PropertyType::Float => ParameterValue::Float(0.0),
            PropertyType::Vector2 => ParameterValue::Vector2(Vec2::ZERO),
            PropertyType::Vector3 => ParameterValue::Vector3(Vec3::ZERO),
            PropertyType::Vector4 => ParameterValue::Vector4(Vec4::ZERO),
            PropertyType::Int => ParameterValue::Int(0),
            PropertyType::Bool => ParameterValue::Bool(false),
            PropertyType::Texture2D | PropertyType::TextureCube => return None,
        })
    }

    /// Parse the text of a `default(...)` attribute for a declared type.
    ///
    /// Accepts `0.7`, `0.7f`, `1, 0, 0, 1`, `(1, 0, 0, 1)`, `float4(1, 0, 0, 1)`,
    /// `true`/`false`/`1`/`0`. A single vector component is splatted.
    pub fn parse(ty: PropertyType, text: &str) -> Result<Self, String> {
        let text = text.trim();
        match ty {
            PropertyType::Float => parse_float(text).map(ParameterValue::Float),
            PropertyType::Vector2 => {
                parse_components::<2>(text).map(|c| ParameterValue::Vector2(Vec2::from_array(c)))
            }
            PropertyType::Vector3 => {
                parse_components::<3>(text).map(|c| ParameterValue::Vector3(Vec3::from_array(c)))
            }
            PropertyType::Vector4 => {
                parse_components::<4>(text).map(|c| ParameterValue::Vector4(Vec4::from_array(c)))
            }
            PropertyType::Int => text
                .parse::<i32>()
                .map(ParameterValue::Int)
                .map_err(|_| format!("{text:?} is not an integer")),
            PropertyType::Bool => match text.to_ascii_lowercase().as_str() {
                "true" | "1" => Ok(ParameterValue::Bool(true)),
                "false" | "0" => Ok(ParameterValue::Bool(false)),
                _ => Err(format!("{text:?} is not a boolean")),
            },
            PropertyType::Texture2D | PropertyType::TextureCube => {
                Err("texture parameters have no inline value".into())
            }
        }
    }

    pub fn property_type(&self) -> PropertyType {
        match self {
            ParameterValue::Float(_) => PropertyType::Float,
            ParameterValue::Vector2(_) => PropertyType::Vector2,
            ParameterValue::Vector3(_) => PropertyType::Vector3,
            ParameterValue::Vector4(_) => PropertyType::Vector4,
            ParameterValue::Int(_) => PropertyType::Int,
            ParameterValue::Bool(_) => PropertyType::Bool,
        }
    }

    pub fn type_name(&self) -> &'static str {
        self.property_type().as_str()
    }

    /// `false` if any float component is NaN or infinite. Material files
    /// cannot represent those.
    pub fn is_finite(&self) -> bool {
        match self {
            ParameterValue::Float(v) => v.is_finite(),
            ParameterValue::Vector2(v) => v.is_finite(),
            ParameterValue::Vector3(v) => v.is_finite(),
            ParameterValue::Vector4(v) => v.is_finite(),
            ParameterValue::Int(_) | ParameterValue::Bool(_) => true,
        }
    }

    /// Write the constant-buffer representation at `offset`.
    ///
    /// Booleans occupy a full 32-bit word, as in the native `bool` type.
    pub fn write_to(&self, buffer: &mut [u8], offset: usize) {
        let bool_word;
        let bytes: &[u8] = match self {
            ParameterValue::Float(v) => bytemuck::bytes_of(v),
            ParameterValue::Vector2(v) => bytemuck::bytes_of(v),
            ParameterValue::Vector3(v) => bytemuck::bytes_of(v),
            ParameterValue::Vector4(v) => bytemuck::bytes_of(v),
            ParameterValue::Int(v) => bytemuck::bytes_of(v),
            ParameterValue::Bool(v) => {
                bool_word = u32::from(*v);
                bytemuck::bytes_of(&bool_word)
            }
        };
        let end = (offset + bytes.len()).min(buffer.len());
        if end > offset {
            buffer[offset..end].copy_from_slice(&bytes[..end - offset]);
        }
    }
}

fn parse_float(text: &str) -> Result<f32, String> {
    let trimmed = text.strip_suffix(['f', 'F']).unwrap_or(text);
    trimmed
        .trim()
        .parse::<f32>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| format!("{text:?} is not a finite number"))
}

fn parse_components<const N: usize>(text: &str) -> Result<[f32; N], String> {
    // Drop a leading constructor name such as `float4`.
    let inner = match text.find('(') {
        Some(open) if text[..open].chars().all(|c| c.is_ascii_alphanumeric()) => &text[open..],
        _ => text,
    };
    let inner = inner
        .strip_prefix('(')
        .and_then(|s| s.strip_suffix(')'))
        .unwrap_or(inner);

    let parts: Vec<&str> = inner
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect();
    let values = parts
        .iter()
        .map(|p| parse_float(p))
        .collect::<Result<Vec<f32>, String>>()?;

    match values.len() {
        1 => Ok([values[0]; N]),
        n if n == N => {
            let mut out = [0.0; N];
            out.copy_from_slice(&values);
            Ok(out)
        }
        n => Err(format!("expected {N} components, found {n} in {text:?}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_scalars() {
        assert_eq!(
            ParameterValue::parse(PropertyType::Float, "0.7"),
            Ok(ParameterValue::Float(0.7))
        );
        assert_eq!(
            ParameterValue::parse(PropertyType::Float, "2.5f"),
            Ok(ParameterValue::Float(2.5))
        );
        assert_eq!(
            ParameterValue::parse(PropertyType::Int, "-3"),
            Ok(ParameterValue::Int(-3))
        );
        assert_eq!(
            ParameterValue::parse(PropertyType::Bool, "TRUE"),
            Ok(ParameterValue::Bool(true))
        );
        assert!(ParameterValue::parse(PropertyType::Bool, "yes").is_err());
        assert!(ParameterValue::parse(PropertyType::Float, "inf").is_err());
        assert!(ParameterValue::parse(PropertyType::Vector2, "1, NaN").is_err());
    }

    #[test]
    fn test_is_finite() {
        assert!(ParameterValue::Float(1.0).is_finite());
        assert!(ParameterValue::Int(i32::MAX).is_finite());
        assert!(!ParameterValue::Float(f32::INFINITY).is_finite());
        assert!(!ParameterValue::Vector3(Vec3::new(0.0, f32::NAN, 0.0)).is_finite());
    }

    #[test]
    fn test_parse_vectors() {
        assert_eq!(
            ParameterValue::parse(PropertyType::Vector4, "1, 0, 0, 1"),
            Ok(ParameterValue::Vector4(Vec4::new(1.0, 0.0, 0.0, 1.0)))
        );
        assert_eq!(
            ParameterValue::parse(PropertyType::Vector3, "float3(0.5, -1, 2)"),
            Ok(ParameterValue::Vector3(Vec3::new(0.5, -1.0, 2.0)))
        );
        assert_eq!(
            ParameterValue::parse(PropertyType::Vector2, "(0.25)"),
            Ok(ParameterValue::Vector2(Vec2::splat(0.25)))
        );
        assert!(ParameterValue::parse(PropertyType::Vector3, "1, 2").is_err());
    }

    #[test]
    fn test_write_bool_as_word() {
        let mut buffer = [0xAAu8; 8];
        ParameterValue::Bool(true).write_to(&mut buffer, 4);
        assert_eq!(buffer, [0xAA, 0xAA, 0xAA, 0xAA, 1, 0, 0, 0]);
    }

    #[test]
    fn test_write_vector() {
        let mut buffer = [0u8; 16];
        ParameterValue::Vector3(Vec3::new(1.0, 2.0, 3.0)).write_to(&mut buffer, 4);
        assert_eq!(&buffer[4..8], &1.0f32.to_le_bytes());
        assert_eq!(&buffer[12..16], &3.0f32.to_le_bytes());
    }

    #[test]
    fn test_serde_form() {
        let json = serde_json::to_string(&ParameterValue::Float(0.5)).unwrap();
        assert_eq!(json, r#"{"type":"Float","value":0.5}"#);
        let back: ParameterValue = serde_json::from_str(&json).unwrap();
        assert_eq!(back, ParameterValue::Float(0.5));
    }
}
