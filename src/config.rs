//! Pipeline configuration

use std::path::PathBuf;

use crate::shader::CodegenOptions;

/// Configuration for the shader and material pipeline
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Directory holding `<Name>.shader` sources
    pub shader_dir: Option<PathBuf>,
    /// Directory for generated sources and compile diagnostics
    pub cache_dir: Option<PathBuf>,
    /// Shared deferred lighting shader, also the lighting pass template
    pub screen_shader: String,
    /// Shaders excluded from default-material creation
    pub infrastructure_shaders: Vec<String>,
    /// Number of slots in the bindless texture table
    pub bindless_capacity: u32,
    /// First descriptor index of the bindless table
    pub bindless_base_register: u32,
    /// Largest material constant buffer accepted
    pub max_constant_buffer_size: u32,
    /// Root parameter slot material constant buffers bind to
    pub material_root_slot: u32,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            shader_dir: None,
            cache_dir: None,
            screen_shader: "Screen".to_string(),
            infrastructure_shaders: vec!["Screen".to_string(), "Sky".to_string()],
            bindless_capacity: 1024,
            bindless_base_register: 16,
            max_constant_buffer_size: 65536,
            material_root_slot: 1,
        }
    }
}

impl PipelineConfig {
    pub fn with_shader_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.shader_dir = Some(dir.into());
        self
    }

    pub fn with_cache_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cache_dir = Some(dir.into());
        self
    }

    pub fn with_screen_shader(mut self, name: impl Into<String>) -> Self {
        self.screen_shader = name.into();
        self
    }

    pub fn with_bindless(mut self, capacity: u32, base_register: u32) -> Self {
        self.bindless_capacity = capacity;
        self.bindless_base_register = base_register;
        self
    }

    pub fn is_infrastructure(&self, shader: &str) -> bool {
        self.infrastructure_shaders.iter().any(|s| s == shader)
    }

    pub fn codegen_options(&self) -> CodegenOptions {
        CodegenOptions {
            bindless_capacity: self.bindless_capacity,
            bindless_base_register: self.bindless_base_register,
        }
    }
}
