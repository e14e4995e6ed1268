//! Collaborator traits
//!
//! The material pipeline never talks to a GPU API directly. Hosts implement
//! these traits on top of their device, command list and descriptor heap.

use std::path::Path;

use thiserror::Error;

use crate::backend::types::*;

/// Backend error type
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    #[error("Failed to compile shader: {0}")]
    ShaderCompilationFailed(String),
    #[error("Failed to create pipeline: {0}")]
    PipelineCreationFailed(String),
    #[error("Failed to create buffer: {0}")]
    BufferCreationFailed(String),
    #[error("Failed to create texture: {0}")]
    TextureCreationFailed(String),
    #[error("Failed to load texture {path}: {reason}")]
    TextureLoadFailed { path: String, reason: String },
    #[error("Unknown resource handle: {0}")]
    InvalidHandle(u64),
    #[error("Out of memory")]
    OutOfMemory,
    #[error("Device lost")]
    DeviceLost,
}

pub type BackendResult<T> = Result<T, BackendError>;

/// Device services consumed by the pipeline
pub trait GraphicsDevice {
    /// Compile native shader source at one entry point.
    ///
    /// On rejection the error carries the compiler diagnostic.
    fn compile_shader(
        &mut self,
        source: &str,
        entry_point: &str,
        stage: ShaderStage,
    ) -> BackendResult<ShaderBytecode>;

    /// Build a pipeline state object
    fn create_pipeline_state(
        &mut self,
        desc: &PipelineStateDescriptor,
    ) -> BackendResult<PipelineHandle>;

    /// Create a buffer. Upload-heap buffers stay mapped until destroyed
    fn create_buffer(&mut self, desc: &BufferDescriptor) -> BackendResult<BufferHandle>;

    /// Write into the mapped memory of a buffer
    fn write_buffer(&mut self, buffer: BufferHandle, offset: u64, data: &[u8]);

    /// GPU virtual address of a buffer
    fn buffer_gpu_address(&self, buffer: BufferHandle) -> u64;

    /// Create a texture
    fn create_texture(&mut self, desc: &TextureDescriptor) -> BackendResult<TextureHandle>;

    /// Destroy a buffer
    fn destroy_buffer(&mut self, buffer: BufferHandle);
}

/// Command recording context for the current frame
pub trait CommandContext {
    /// Bind a constant buffer address at a root parameter slot
    fn set_constant_buffer(&mut self, root_slot: u32, gpu_address: u64);

    /// Record a texture upload. Cube data holds every face back to back.
    fn upload_texture(&mut self, texture: TextureHandle, data: &[u8], width: u32, height: u32);
}

/// Shader-visible descriptor heap region used for bindless textures
pub trait DescriptorHeap {
    /// Write a texture view at an absolute heap index, replacing any previous view.
    ///
    /// 2D and cube tables alias the same heap range, so `dimension` decides
    /// which table may read the slot.
    fn write_texture_view(
        &mut self,
        absolute_index: u32,
        texture: TextureHandle,
        dimension: TextureDimension,
    );
}

/// Resolves a texture path to a GPU-resident resource
pub trait TextureLoader {
    fn load(
        &mut self,
        path: &Path,
        dimension: TextureDimension,
        device: &mut dyn GraphicsDevice,
        ctx: &mut dyn CommandContext,
    ) -> BackendResult<TextureHandle>;
}
