//! # Material Pipeline
//!
//! Shader and material runtime for a bindless deferred renderer.
//!
//! ## Overview
//!
//! This crate provides:
//! - [`shader`] - Shader DSL parser, constant-buffer layout, HLSL code generation
//!   and per-pass compilation into pipeline state objects
//! - [`ShadingModelRegistry`] - Custom BRDFs contributed by individual shaders
//!   to the shared deferred lighting shader
//! - [`MaterialInstance`] - Typed parameters packed into a persistently mapped
//!   constant buffer
//! - [`MaterialManager`] - Shader and material caches with two-phase loading
//! - [`bindless`] - Bindless texture slot allocation
//! - [`backend`] - Traits the host device implements, and a recording dummy
//!
//! ## Example
//!
//! ```ignore
//! use material_pipeline::{MaterialManager, PipelineConfig};
//!
//! let config = PipelineConfig::default().with_shader_dir("assets/shaders");
//! let mut manager = MaterialManager::new(config, heap, loader);
//! manager.load_all_shaders(&mut device)?;
//! let brick = manager.load_material("assets/brick.json".as_ref(), &mut device, Some(&mut ctx))?;
//! manager.bind_material(&brick, &mut device, &mut ctx)?;
//! ```

pub mod backend;
pub mod bindless;
pub mod config;
pub mod error;
pub mod logging;
pub mod material;
pub mod resources;
pub mod shader;

pub use backend::{
    BackendError, CommandContext, DescriptorHeap, DummyDevice, GraphicsDevice, TextureDimension,
    TextureLoader,
};
pub use bindless::{
    default_index, BindlessAllocator, BindlessTextureTable, DEFAULT_CUBE_TEXTURE_INDEX,
    DEFAULT_TEXTURE_INDEX,
};
pub use config::PipelineConfig;
pub use error::{PipelineError, Result};
pub use logging::{init_logging, LoggingConfig};
pub use material::{MaterialFile, MaterialInstance, MaterialManager, ParameterValue, SharedMaterial};
pub use resources::{ImageTextureLoader, TextureData};
pub use shader::{
    PassKind, RenderQueue, SceneConstants, Shader, ShaderDefinition, ShaderParameter,
    ShadingModelRegistry,
};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize the material pipeline.
pub fn init() {
    log::info!("Material Pipeline v{} initialized", VERSION);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }

    #[test]
    fn test_init() {
        init_logging(LoggingConfig::test());
        init();
    }
}
