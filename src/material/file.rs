//! On-disk material description (JSON).
//!
//! ```json
//! {
//!   "name": "Brick",
//!   "shader": "Standard",
//!   "parameters": { "Roughness": { "type": "Float", "value": 0.7 } },
//!   "textures": { "BaseColor": "textures/brick.png" }
//! }
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, Result};
use crate::material::value::ParameterValue;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaterialFile {
    pub name: String,
    pub shader: String,
    #[serde(default)]
    pub parameters: BTreeMap<String, ParameterValue>,
    /// Texture parameter name to texture path
    #[serde(default)]
    pub textures: BTreeMap<String, PathBuf>,
}

/// Just the identifying fields of a material file.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct MaterialHeader {
    pub name: String,
    pub shader: String,
}

impl MaterialFile {
    pub fn new(name: impl Into<String>, shader: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            shader: shader.into(),
            parameters: BTreeMap::new(),
            textures: BTreeMap::new(),
        }
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        serde_json::from_str(&text).map_err(|e| invalid(path, e))
    }

    /// Read only the name and shader of a material file.
    pub fn read_header(path: &Path) -> Result<MaterialHeader> {
        let text = std::fs::read_to_string(path)?;
        serde_json::from_str(&text).map_err(|e| invalid(path, e))
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }
}

fn invalid(path: &Path, e: serde_json::Error) -> PipelineError {
    PipelineError::InvalidMaterialFile {
        path: path.to_path_buf(),
        message: e.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_ignores_body() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("brick.json");
        std::fs::write(
            &path,
            r#"{"name":"Brick","shader":"Standard","parameters":{"Roughness":{"type":"Float","value":0.5}}}"#,
        )
        .unwrap();

        let header = MaterialFile::read_header(&path).unwrap();
        assert_eq!(header.name, "Brick");
        assert_eq!(header.shader, "Standard");

        let file = MaterialFile::load(&path).unwrap();
        assert_eq!(file.parameters["Roughness"], ParameterValue::Float(0.5));
        assert!(file.textures.is_empty());
    }

    #[test]
    fn test_invalid_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        std::fs::write(&path, "{\"name\": 3}").unwrap();
        assert!(matches!(
            MaterialFile::load(&path),
            Err(PipelineError::InvalidMaterialFile { .. })
        ));
    }

    #[test]
    fn test_save_creates_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("materials/brick.json");
        let mut file = MaterialFile::new("Brick", "Standard");
        file.textures.insert("BaseColor".into(), "brick.png".into());
        file.save(&path).unwrap();
        assert_eq!(MaterialFile::load(&path).unwrap(), file);
    }
}
