//! Dummy collaborators for testing and headless tooling.
//!
//! These implementations don't perform GPU work. They record every call so
//! tests can inspect what the pipeline asked of the device.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use super::traits::*;
use super::types::*;

/// Dummy device. Buffers are plain byte vectors standing in for mapped memory.
#[derive(Debug, Default)]
pub struct DummyDevice {
    next_handle: u64,
    buffers: HashMap<u64, Vec<u8>>,
    /// Every `(entry_point, stage)` compiled, in call order.
    pub compiled: Vec<(String, ShaderStage)>,
    /// Every pipeline descriptor received, in call order.
    pub pipelines: Vec<PipelineStateDescriptor>,
    /// Every texture descriptor received, in call order.
    pub textures: Vec<TextureDescriptor>,
    /// Number of `write_buffer` calls.
    pub buffer_writes: usize,
    reject_marker: Option<String>,
}

impl DummyDevice {
    /// Create a new dummy device.
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject compilation of any source containing `marker`.
    pub fn reject_sources_containing(&mut self, marker: impl Into<String>) {
        self.reject_marker = Some(marker.into());
    }

    /// Contents of a live buffer.
    pub fn buffer_contents(&self, buffer: BufferHandle) -> Option<&[u8]> {
        self.buffers.get(&buffer.0).map(Vec::as_slice)
    }

    /// Number of live buffers.
    pub fn live_buffers(&self) -> usize {
        self.buffers.len()
    }

    fn allocate_handle(&mut self) -> u64 {
        self.next_handle += 1;
        self.next_handle
    }
}

impl GraphicsDevice for DummyDevice {
    fn compile_shader(
        &mut self,
        source: &str,
        entry_point: &str,
        stage: ShaderStage,
    ) -> BackendResult<ShaderBytecode> {
        log::trace!("DummyDevice: compiling {entry_point} ({})", stage.target_profile());
        if let Some(marker) = &self.reject_marker {
            if source.contains(marker.as_str()) {
                return Err(BackendError::ShaderCompilationFailed(format!(
                    "error X3000: syntax error near '{marker}'"
                )));
            }
        }
        if !source.contains(entry_point) {
            return Err(BackendError::ShaderCompilationFailed(format!(
                "error X3501: '{entry_point}': entrypoint not found"
            )));
        }
        self.compiled.push((entry_point.to_string(), stage));
        Ok(ShaderBytecode {
            stage,
            entry_point: entry_point.to_string(),
            bytes: source.as_bytes().to_vec(),
        })
    }

    fn create_pipeline_state(
        &mut self,
        desc: &PipelineStateDescriptor,
    ) -> BackendResult<PipelineHandle> {
        log::trace!("DummyDevice: creating pipeline {:?}", desc.label);
        self.pipelines.push(desc.clone());
        Ok(PipelineHandle(self.allocate_handle()))
    }

    fn create_buffer(&mut self, desc: &BufferDescriptor) -> BackendResult<BufferHandle> {
        log::trace!(
            "DummyDevice: creating buffer {:?} (size: {})",
            desc.label,
            desc.size
        );
        let handle = self.allocate_handle();
        self.buffers.insert(handle, vec![0; desc.size as usize]);
        Ok(BufferHandle(handle))
    }

    fn write_buffer(&mut self, buffer: BufferHandle, offset: u64, data: &[u8]) {
        let Some(contents) = self.buffers.get_mut(&buffer.0) else {
            log::warn!("DummyDevice: write to unknown buffer {}", buffer.0);
            return;
        };
        let start = offset as usize;
        let end = (start + data.len()).min(contents.len());
        contents[start..end].copy_from_slice(&data[..end - start]);
        self.buffer_writes += 1;
    }

    fn buffer_gpu_address(&self, buffer: BufferHandle) -> u64 {
        0x1_0000_0000 + buffer.0 * 0x1_0000
    }

    fn create_texture(&mut self, desc: &TextureDescriptor) -> BackendResult<TextureHandle> {
        log::trace!(
            "DummyDevice: creating texture {:?} ({}x{}, {:?})",
            desc.label,
            desc.width,
            desc.height,
            desc.dimension
        );
        self.textures.push(desc.clone());
        Ok(TextureHandle(self.allocate_handle()))
    }

    fn destroy_buffer(&mut self, buffer: BufferHandle) {
        self.buffers.remove(&buffer.0);
    }
}

/// Dummy command context.
#[derive(Debug, Default)]
pub struct DummyCommandContext {
    /// `(root_slot, gpu_address)` per bind call.
    pub bound_constant_buffers: Vec<(u32, u64)>,
    /// Textures that received an upload.
    pub uploads: Vec<TextureHandle>,
}

impl DummyCommandContext {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CommandContext for DummyCommandContext {
    fn set_constant_buffer(&mut self, root_slot: u32, gpu_address: u64) {
        self.bound_constant_buffers.push((root_slot, gpu_address));
    }

    fn upload_texture(&mut self, texture: TextureHandle, _data: &[u8], _width: u32, _height: u32) {
        self.uploads.push(texture);
    }
}

/// View written into the dummy descriptor heap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DummyView {
    pub texture: TextureHandle,
    pub dimension: TextureDimension,
}

/// Dummy descriptor heap keeping the latest view per index.
#[derive(Debug, Default)]
pub struct DummyDescriptorHeap {
    pub views: HashMap<u32, DummyView>,
    pub writes: usize,
}

impl DummyDescriptorHeap {
    pub fn new() -> Self {
        Self::default()
    }
}

impl DescriptorHeap for DummyDescriptorHeap {
    fn write_texture_view(
        &mut self,
        absolute_index: u32,
        texture: TextureHandle,
        dimension: TextureDimension,
    ) {
        self.views
            .insert(absolute_index, DummyView { texture, dimension });
        self.writes += 1;
    }
}

/// Texture loader that creates a white 1x1 texture (or cube) per path
/// without touching disk.
#[derive(Debug, Default)]
pub struct DummyTextureLoader {
    missing: HashSet<PathBuf>,
    /// Every path requested, in call order.
    pub requests: Vec<PathBuf>,
}

impl DummyTextureLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make loads of `path` fail.
    pub fn mark_missing(&mut self, path: impl Into<PathBuf>) {
        self.missing.insert(path.into());
    }
}

impl TextureLoader for DummyTextureLoader {
    fn load(
        &mut self,
        path: &Path,
        dimension: TextureDimension,
        device: &mut dyn GraphicsDevice,
        ctx: &mut dyn CommandContext,
    ) -> BackendResult<TextureHandle> {
        self.requests.push(path.to_path_buf());
        if self.missing.contains(path) {
            return Err(BackendError::TextureLoadFailed {
                path: path.display().to_string(),
                reason: "file not found".into(),
            });
        }
        let texture = device.create_texture(&TextureDescriptor {
            label: Some(path.display().to_string()),
            dimension,
            ..Default::default()
        })?;
        let texels = vec![255u8; 4 * dimension.array_layers() as usize];
        ctx.upload_texture(texture, &texels, 1, 1);
        Ok(texture)
    }
}
