//! Pipeline error types.

use std::path::PathBuf;

use thiserror::Error;

use crate::backend::{BackendError, ShaderStage};
use crate::shader::parser::ParseError;

/// Errors produced while loading, compiling or binding shaders and materials.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Shader source is malformed.
    #[error("failed to parse shader {shader:?}: {source}")]
    Parse {
        shader: String,
        #[source]
        source: ParseError,
    },
    /// The native compiler rejected generated source.
    #[error("failed to compile {stage:?} stage of pass {pass} in shader {shader:?}: {diagnostic}")]
    Compile {
        shader: String,
        pass: usize,
        stage: ShaderStage,
        diagnostic: String,
        /// Source plus diagnostic written for inspection, if a cache directory is configured.
        artifact: Option<PathBuf>,
    },
    /// The material constant buffer does not fit the device limit.
    #[error("constant buffer of shader {shader:?} needs {size} bytes, limit is {limit}")]
    Layout { shader: String, size: u32, limit: u32 },
    /// No fixed-function state is defined for this render queue / pass index pair.
    #[error("shader {shader:?} has no pipeline state for pass {pass}")]
    UnsupportedPass { shader: String, pass: usize },
    /// The pass has not been compiled yet.
    #[error("pass {pass} of shader {shader:?} is not compiled")]
    NotCompiled { shader: String, pass: usize },
    #[error("shader not found: {0}")]
    ShaderNotFound(String),
    #[error("material not found: {0}")]
    MaterialNotFound(String),
    #[error("shader {shader:?} has no parameter named {parameter:?}")]
    UnknownParameter { shader: String, parameter: String },
    #[error("parameter {parameter:?} expects {expected}, got {actual}")]
    TypeMismatch {
        parameter: String,
        expected: &'static str,
        actual: &'static str,
    },
    /// NaN and infinities cannot be saved to a material file.
    #[error("parameter {parameter:?} must be finite, got {value}")]
    NonFiniteValue { parameter: String, value: String },
    #[error("invalid material file {path:?}: {message}")]
    InvalidMaterialFile { path: PathBuf, message: String },
    /// The shading-model registry was used out of order.
    #[error("shading model registry is busy: {0}")]
    RegistryBusy(&'static str),
    #[error(transparent)]
    Backend(#[from] BackendError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl PipelineError {
    /// Errors that must abort a bulk asset-load sequence.
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            PipelineError::UnknownParameter { .. }
                | PipelineError::TypeMismatch { .. }
                | PipelineError::NonFiniteValue { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = PipelineError::ShaderNotFound("Standard".into());
        assert_eq!(err.to_string(), "shader not found: Standard");

        let err = PipelineError::Layout {
            shader: "Big".into(),
            size: 70000,
            limit: 65536,
        };
        assert_eq!(
            err.to_string(),
            "constant buffer of shader \"Big\" needs 70000 bytes, limit is 65536"
        );
    }

    #[test]
    fn test_fatal_classification() {
        assert!(PipelineError::ShaderNotFound("x".into()).is_fatal());
        assert!(!PipelineError::UnknownParameter {
            shader: "s".into(),
            parameter: "p".into()
        }
        .is_fatal());
        assert!(!PipelineError::NonFiniteValue {
            parameter: "p".into(),
            value: "inf".into()
        }
        .is_fatal());
    }
}
