//! Shader source lookup.
//!
//! Sources are resolved by shader name: registered in-memory sources win,
//! then `<shader_dir>/<name>.shader` on disk.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use crate::error::{PipelineError, Result};

/// File extension of shader DSL sources.
pub const SHADER_EXTENSION: &str = "shader";

/// Registry of shader DSL sources by name.
#[derive(Debug, Default, Clone)]
pub struct ShaderSources {
    registered: BTreeMap<String, String>,
    directory: Option<PathBuf>,
}

impl ShaderSources {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sources backed by a directory of `.shader` files.
    pub fn with_directory(directory: impl Into<PathBuf>) -> Self {
        Self {
            registered: BTreeMap::new(),
            directory: Some(directory.into()),
        }
    }

    /// Register a source by name, replacing any previous one.
    pub fn register(&mut self, name: impl Into<String>, source: impl Into<String>) {
        self.registered.insert(name.into(), source.into());
    }

    pub fn directory(&self) -> Option<&Path> {
        self.directory.as_deref()
    }

    /// Read the source of a named shader.
    pub fn read(&self, name: &str) -> Result<String> {
        if let Some(source) = self.registered.get(name) {
            return Ok(source.clone());
        }
        let path = self
            .path_for(name)
            .ok_or_else(|| PipelineError::ShaderNotFound(name.to_string()))?;
        std::fs::read_to_string(&path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => PipelineError::ShaderNotFound(name.to_string()),
            _ => PipelineError::Io(e),
        })
    }

    /// On-disk location of a named shader, if a directory is configured.
    pub fn path_for(&self, name: &str) -> Option<PathBuf> {
        self.directory
            .as_ref()
            .map(|dir| dir.join(format!("{name}.{SHADER_EXTENSION}")))
    }

    /// All known shader names, sorted.
    pub fn names(&self) -> Result<Vec<String>> {
        let mut names: BTreeSet<String> = self.registered.keys().cloned().collect();
        if let Some(dir) = &self.directory {
            if dir.is_dir() {
                for entry in std::fs::read_dir(dir)? {
                    let path = entry?.path();
                    let is_shader = path
                        .extension()
                        .and_then(|e| e.to_str())
                        .is_some_and(|e| e.eq_ignore_ascii_case(SHADER_EXTENSION));
                    if !is_shader {
                        continue;
                    }
                    if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                        names.insert(stem.to_string());
                    }
                }
            }
        }
        Ok(names.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registered_source_wins() {
        let mut sources = ShaderSources::new();
        sources.register("Screen", "Shader \"Screen\" {}");
        assert_eq!(sources.read("Screen").unwrap(), "Shader \"Screen\" {}");
    }

    #[test]
    fn test_missing_source() {
        let sources = ShaderSources::new();
        assert!(matches!(
            sources.read("Nope"),
            Err(PipelineError::ShaderNotFound(name)) if name == "Nope"
        ));
    }

    #[test]
    fn test_directory_listing() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("Standard.shader"), "x").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "x").unwrap();

        let mut sources = ShaderSources::with_directory(dir.path());
        sources.register("Screen", "y");
        assert_eq!(sources.names().unwrap(), vec!["Screen", "Standard"]);
        assert_eq!(sources.read("Standard").unwrap(), "x");
    }
}
