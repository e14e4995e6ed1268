//! Material instances.
//!
//! Setters only touch CPU state and mark the instance dirty. The constant
//! buffer is repacked and written to the persistently mapped GPU buffer on
//! `update_constant_buffer`, or lazily on `bind`.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use glam::{Vec2, Vec3, Vec4};

use crate::backend::{
    BufferDescriptor, BufferHandle, CommandContext, DescriptorHeap, GraphicsDevice,
    TextureDimension, TextureLoader,
};
use crate::bindless::{self, BindlessTextureTable, DEFAULT_TEXTURE_INDEX};
use crate::error::{PipelineError, Result};
use crate::material::file::MaterialFile;
use crate::material::value::ParameterValue;
use crate::shader::{PropertyType, Shader, ShaderParameter};

/// Per-material parameter values and GPU constant buffer.
#[derive(Debug)]
pub struct MaterialInstance {
    name: String,
    shader: Arc<Shader>,
    values: BTreeMap<String, ParameterValue>,
    texture_paths: BTreeMap<String, PathBuf>,
    /// Relative bindless index per resolved texture parameter
    texture_indices: HashMap<String, u32>,
    staging: Vec<u8>,
    buffer: Option<BufferHandle>,
    gpu_address: u64,
    dirty: bool,
    pending_textures: bool,
}

impl MaterialInstance {
    pub fn new(name: impl Into<String>, shader: Arc<Shader>) -> Self {
        let size = shader.constant_buffer_size() as usize;
        Self {
            name: name.into(),
            shader,
            values: BTreeMap::new(),
            texture_paths: BTreeMap::new(),
            texture_indices: HashMap::new(),
            staging: vec![0; size],
            buffer: None,
            gpu_address: 0,
            dirty: true,
            pending_textures: false,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn shader(&self) -> &Arc<Shader> {
        &self.shader
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Texture paths are recorded but not yet resolved to bindless slots.
    pub fn has_pending_textures(&self) -> bool {
        self.pending_textures
    }

    pub fn buffer(&self) -> Option<BufferHandle> {
        self.buffer
    }

    pub fn gpu_address(&self) -> u64 {
        self.gpu_address
    }

    /// CPU copy of the constant buffer as of the last pack.
    pub fn staging(&self) -> &[u8] {
        &self.staging
    }

    pub fn set_float(&mut self, name: &str, value: f32) -> Result<()> {
        self.set_value(name, ParameterValue::Float(value))
    }

    pub fn set_vector2(&mut self, name: &str, value: Vec2) -> Result<()> {
        self.set_value(name, ParameterValue::Vector2(value))
    }

    pub fn set_vector3(&mut self, name: &str, value: Vec3) -> Result<()> {
        self.set_value(name, ParameterValue::Vector3(value))
    }

    pub fn set_vector4(&mut self, name: &str, value: Vec4) -> Result<()> {
        self.set_value(name, ParameterValue::Vector4(value))
    }

    pub fn set_int(&mut self, name: &str, value: i32) -> Result<()> {
        self.set_value(name, ParameterValue::Int(value))
    }

    pub fn set_bool(&mut self, name: &str, value: bool) -> Result<()> {
        self.set_value(name, ParameterValue::Bool(value))
    }

    /// Set a value, checked against the declared parameter type.
    pub fn set_value(&mut self, name: &str, value: ParameterValue) -> Result<()> {
        let parameter = self.lookup(name)?;
        if parameter.ty != value.property_type() {
            return Err(PipelineError::TypeMismatch {
                parameter: name.to_string(),
                expected: parameter.ty.as_str(),
                actual: value.type_name(),
            });
        }
        if !value.is_finite() {
            return Err(PipelineError::NonFiniteValue {
                parameter: name.to_string(),
                value: format!("{value:?}"),
            });
        }
        self.values.insert(name.to_string(), value);
        self.dirty = true;
        Ok(())
    }

    /// Current value, falling back to the declared default.
    pub fn value(&self, name: &str) -> Option<ParameterValue> {
        self.values
            .get(name)
            .copied()
            .or_else(|| self.shader.parameter(name)?.default_value())
    }

    /// Bind a texture parameter to a path. The path is resolved to a slot by
    /// the next `load_textures_from_paths`.
    pub fn set_texture_path(&mut self, name: &str, path: impl Into<PathBuf>) -> Result<()> {
        let parameter = self.lookup(name)?;
        if !parameter.is_texture() {
            return Err(PipelineError::TypeMismatch {
                parameter: name.to_string(),
                expected: parameter.ty.as_str(),
                actual: PropertyType::Texture2D.as_str(),
            });
        }
        self.texture_paths.insert(name.to_string(), path.into());
        self.texture_indices.remove(name);
        self.pending_textures = true;
        self.dirty = true;
        Ok(())
    }

    pub fn texture_path(&self, name: &str) -> Option<&Path> {
        self.texture_paths.get(name).map(PathBuf::as_path)
    }

    /// Relative bindless index written for a texture parameter. Unresolved
    /// parameters sample the default texture of their dimension.
    pub fn texture_index(&self, name: &str) -> u32 {
        if let Some(index) = self.texture_indices.get(name) {
            return *index;
        }
        self.shader
            .parameter(name)
            .and_then(|p| p.ty.texture_dimension())
            .map_or(DEFAULT_TEXTURE_INDEX, bindless::default_index)
    }

    /// Copy every parameter's current or default value into the staging buffer.
    pub fn pack_constant_buffer(&mut self) -> &[u8] {
        self.staging.clear();
        self.staging
            .resize(self.shader.constant_buffer_size() as usize, 0);

        for parameter in self.shader.parameters() {
            let offset = parameter.byte_offset as usize;
            if parameter.is_texture() {
                let index = self.texture_index(&parameter.name);
                self.staging[offset..offset + 4].copy_from_slice(&index.to_le_bytes());
                continue;
            }
            let value = self
                .values
                .get(&parameter.name)
                .copied()
                .or_else(|| parameter.default_value());
            if let Some(value) = value {
                value.write_to(&mut self.staging, offset);
            }
        }
        &self.staging
    }

    /// Create the persistently mapped constant buffer if it does not exist.
    pub fn create_gpu_buffer(&mut self, device: &mut dyn GraphicsDevice) -> Result<()> {
        if self.buffer.is_some() || self.shader.constant_buffer_size() == 0 {
            return Ok(());
        }
        let desc = BufferDescriptor::persistent_constants(
            format!("{}_constants", self.name),
            u64::from(self.shader.constant_buffer_size()),
        );
        let buffer = device.create_buffer(&desc)?;
        self.gpu_address = device.buffer_gpu_address(buffer);
        self.buffer = Some(buffer);
        Ok(())
    }

    /// Pack and write the constant buffer, then clear the dirty flag.
    pub fn update_constant_buffer(&mut self, device: &mut dyn GraphicsDevice) -> Result<()> {
        self.create_gpu_buffer(device)?;
        self.pack_constant_buffer();
        if let Some(buffer) = self.buffer {
            device.write_buffer(buffer, 0, &self.staging);
        }
        self.dirty = false;
        Ok(())
    }

    /// Bind the constant buffer at `root_slot`, updating it first if dirty.
    pub fn bind(
        &mut self,
        device: &mut dyn GraphicsDevice,
        ctx: &mut dyn CommandContext,
        root_slot: u32,
    ) -> Result<()> {
        if self.dirty || self.buffer.is_none() {
            self.update_constant_buffer(device)?;
        }
        if self.buffer.is_some() {
            ctx.set_constant_buffer(root_slot, self.gpu_address);
        }
        Ok(())
    }

    /// Resolve every texture parameter that has a path but no slot yet.
    pub fn load_textures_from_paths<H: DescriptorHeap>(
        &mut self,
        device: &mut dyn GraphicsDevice,
        ctx: &mut dyn CommandContext,
        textures: &mut BindlessTextureTable<H>,
        loader: &mut dyn TextureLoader,
    ) -> Result<()> {
        let unresolved: Vec<(String, PathBuf, TextureDimension)> = self
            .texture_paths
            .iter()
            .filter(|(name, _)| !self.texture_indices.contains_key(*name))
            .filter_map(|(name, path)| {
                let dimension = self.shader.parameter(name)?.ty.texture_dimension()?;
                Some((name.clone(), path.clone(), dimension))
            })
            .collect();

        for (name, path, dimension) in unresolved {
            let index = textures.acquire(&path, dimension, device, ctx, loader);
            self.texture_indices.insert(name, index);
        }
        self.pending_textures = false;
        self.update_constant_buffer(device)
    }

    /// Apply the values and texture paths of a material file.
    ///
    /// Entries the shader does not declare, or whose type does not match, are
    /// skipped with a warning.
    pub fn apply_file(&mut self, file: &MaterialFile) {
        for (name, value) in &file.parameters {
            if let Err(e) = self.set_value(name, *value) {
                log::warn!("material {:?}: {e}", self.name);
            }
        }
        for (name, path) in &file.textures {
            if let Err(e) = self.set_texture_path(name, path.clone()) {
                log::warn!("material {:?}: {e}", self.name);
            }
        }
    }

    /// Explicitly set values and texture paths as a material file.
    pub fn to_file(&self) -> MaterialFile {
        MaterialFile {
            name: self.name.clone(),
            shader: self.shader.name().to_string(),
            parameters: self.values.clone(),
            textures: self.texture_paths.clone(),
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        self.to_file().save(path)?;
        log::info!("saved material {:?} to {}", self.name, path.display());
        Ok(())
    }

    /// Destroy the GPU buffer.
    pub fn release(&mut self, device: &mut dyn GraphicsDevice) {
        if let Some(buffer) = self.buffer.take() {
            device.destroy_buffer(buffer);
            self.gpu_address = 0;
            self.dirty = true;
        }
    }

    fn lookup(&self, name: &str) -> Result<&ShaderParameter> {
        self.shader
            .parameter(name)
            .ok_or_else(|| PipelineError::UnknownParameter {
                shader: self.shader.name().to_string(),
                parameter: name.to_string(),
            })
    }
}
