//! Shader and material registry.
//!
//! Loading runs in two phases. `register_shaders` parses shaders and
//! registers their shading models without compiling anything;
//! `compile_pending` then compiles every parsed shader against the complete
//! model set. A shader loaded later that brings a new shading model triggers
//! regeneration of every compiled lighting pass.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::backend::{CommandContext, DescriptorHeap, GraphicsDevice, TextureLoader};
use crate::bindless::BindlessTextureTable;
use crate::config::PipelineConfig;
use crate::error::{PipelineError, Result};
use crate::material::file::MaterialFile;
use crate::material::instance::MaterialInstance;
use crate::shader::{
    CompileTarget, ShadingModelDefinition, ShadingModelRegistry, Shader, ShaderParser,
    ShaderSources,
};

/// Material instance shared between the registry and renderers.
pub type SharedMaterial = Arc<RwLock<MaterialInstance>>;

/// Owns every shader and material for the lifetime of the pipeline.
pub struct MaterialManager<H: DescriptorHeap, L: TextureLoader> {
    config: PipelineConfig,
    sources: ShaderSources,
    registry: ShadingModelRegistry,
    shaders: BTreeMap<String, Arc<Shader>>,
    /// Parsed and registered, waiting for `compile_pending`
    pending: Vec<String>,
    compiled: BTreeSet<String>,
    materials: BTreeMap<String, SharedMaterial>,
    textures: BindlessTextureTable<H>,
    loader: L,
}

impl<H: DescriptorHeap, L: TextureLoader> MaterialManager<H, L> {
    pub fn new(config: PipelineConfig, heap: H, loader: L) -> Self {
        let sources = match &config.shader_dir {
            Some(dir) => ShaderSources::with_directory(dir),
            None => ShaderSources::new(),
        };
        let textures = BindlessTextureTable::new(
            heap,
            config.bindless_capacity,
            config.bindless_base_register,
        );
        Self {
            config,
            sources,
            registry: ShadingModelRegistry::new(),
            shaders: BTreeMap::new(),
            pending: Vec::new(),
            compiled: BTreeSet::new(),
            materials: BTreeMap::new(),
            textures,
            loader,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn sources(&self) -> &ShaderSources {
        &self.sources
    }

    pub fn sources_mut(&mut self) -> &mut ShaderSources {
        &mut self.sources
    }

    pub fn registry(&self) -> &ShadingModelRegistry {
        &self.registry
    }

    pub fn textures(&self) -> &BindlessTextureTable<H> {
        &self.textures
    }

    pub fn loader(&self) -> &L {
        &self.loader
    }

    pub fn loader_mut(&mut self) -> &mut L {
        &mut self.loader
    }

    pub fn shader(&self, name: &str) -> Option<Arc<Shader>> {
        self.shaders.get(name).cloned()
    }

    pub fn shader_count(&self) -> usize {
        self.shaders.len()
    }

    pub fn is_compiled(&self, shader: &str) -> bool {
        self.compiled.contains(shader)
    }

    /// Shaders parsed but not compiled yet.
    pub fn pending_shaders(&self) -> &[String] {
        &self.pending
    }

    pub fn material(&self, name: &str) -> Option<SharedMaterial> {
        self.materials.get(name).cloned()
    }

    pub fn material_count(&self) -> usize {
        self.materials.len()
    }

    /// Phase 1: parse shaders and register their shading models.
    ///
    /// Stops at the first failure; shaders parsed before it stay registered.
    pub fn register_shaders<I, S>(&mut self, names: I) -> Result<usize>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.registry.begin_registration()?;
        let mut result = Ok(0);
        for name in names {
            match self.parse_and_register(name.as_ref()) {
                Ok(_) => result = result.map(|n| n + 1),
                Err(e) => {
                    result = Err(e);
                    break;
                }
            }
        }
        self.registry.end_registration();
        result
    }

    /// Phase 1 over every shader known to the sources.
    pub fn register_all_shaders(&mut self) -> Result<usize> {
        let names = self.sources.names()?;
        self.register_shaders(names)
    }

    /// Phase 2: compile every registered shader and build its pipelines.
    ///
    /// The shared lighting shader compiles last. Aborts on the first failure;
    /// shaders after the failing one stay pending.
    pub fn compile_pending(&mut self, device: &mut dyn GraphicsDevice) -> Result<()> {
        let mut pending = std::mem::take(&mut self.pending);
        let screen = self.config.screen_shader.clone();
        pending.sort_by_key(|name| *name == screen);

        let mut compiled_now = BTreeSet::new();
        for (i, name) in pending.iter().enumerate() {
            let Some(shader) = self.shaders.get(name).cloned() else {
                continue;
            };
            if let Err(e) = self.compile_and_build(&shader, device) {
                self.pending = pending[i + 1..].to_vec();
                return Err(e);
            }
            self.compiled.insert(name.clone());
            compiled_now.insert(name.clone());
        }

        if self.registry.is_dirty() {
            self.regenerate_lighting_except(device, &compiled_now)?;
        }
        Ok(())
    }

    /// Phase 1 and 2 over every shader known to the sources.
    pub fn load_all_shaders(&mut self, device: &mut dyn GraphicsDevice) -> Result<()> {
        let count = self.register_all_shaders()?;
        log::info!("registered {count} shaders");
        self.compile_pending(device)
    }

    /// Load and compile one shader, returning the cached instance if present.
    pub fn load_shader(
        &mut self,
        name: &str,
        device: &mut dyn GraphicsDevice,
    ) -> Result<Arc<Shader>> {
        if self.compiled.contains(name) {
            if let Some(shader) = self.shaders.get(name) {
                log::debug!("shader cache hit: {name}");
                return Ok(shader.clone());
            }
        }

        let shader = self.parse_and_register(name)?;
        self.pending.retain(|n| n != name);
        let built = self.compile_and_build(&shader, device);
        if built.is_ok() {
            self.compiled.insert(name.to_string());
        }

        // A model registered by a shader that failed to compile still counts
        if self.registry.is_dirty() {
            let skip = BTreeSet::from([name.to_string()]);
            match (&built, self.regenerate_lighting_except(device, &skip)) {
                (Ok(()), Err(e)) => return Err(e),
                (Err(_), Err(e)) => log::error!("lighting regeneration failed: {e}"),
                _ => {}
            }
        }
        built.map(|()| shader)
    }

    /// Regenerate and recompile every compiled lighting pass against the
    /// current shading models. Returns the number of passes rebuilt.
    pub fn regenerate_lighting_shaders(&mut self, device: &mut dyn GraphicsDevice) -> Result<usize> {
        self.regenerate_lighting_except(device, &BTreeSet::new())
    }

    fn regenerate_lighting_except(
        &mut self,
        device: &mut dyn GraphicsDevice,
        skip: &BTreeSet<String>,
    ) -> Result<usize> {
        self.registry.begin_regeneration()?;
        let models = self.registry.models();
        let shaders: Vec<Arc<Shader>> = self
            .shaders
            .iter()
            .filter(|(name, _)| self.compiled.contains(*name) && !skip.contains(*name))
            .map(|(_, shader)| shader.clone())
            .collect();

        match self.rebuild_lighting_passes(device, &shaders, &models) {
            Ok(count) => {
                self.registry.finish_regeneration();
                if count > 0 {
                    log::info!(
                        "regenerated {count} lighting passes for {} shading models",
                        models.len()
                    );
                }
                Ok(count)
            }
            Err(e) => {
                self.registry.abort_regeneration();
                Err(e)
            }
        }
    }

    fn rebuild_lighting_passes(
        &self,
        device: &mut dyn GraphicsDevice,
        shaders: &[Arc<Shader>],
        models: &[ShadingModelDefinition],
    ) -> Result<usize> {
        let target = self.compile_target();
        let mut count = 0;
        for shader in shaders {
            for pass_index in shader.lighting_passes() {
                shader.compile_pass(device, pass_index, models, target)?;
                shader.create_pso(device, pass_index)?;
                count += 1;
            }
        }
        Ok(count)
    }

    fn compile_and_build(&self, shader: &Shader, device: &mut dyn GraphicsDevice) -> Result<()> {
        let models = self.registry.models();
        shader.compile(device, &models, self.compile_target())?;
        shader.create_pipelines(device)
    }

    fn compile_target(&self) -> CompileTarget<'_> {
        CompileTarget {
            options: self.config.codegen_options(),
            cache_dir: self.config.cache_dir.as_deref(),
        }
    }

    fn parse_and_register(&mut self, name: &str) -> Result<Arc<Shader>> {
        if let Some(shader) = self.shaders.get(name) {
            return Ok(shader.clone());
        }

        let source = self.sources.read(name)?;
        let definition = ShaderParser::new(&self.sources, &self.config.screen_shader)
            .parse(&source)
            .map_err(|source| {
                log::error!("failed to parse shader {name:?}: {source}");
                PipelineError::Parse {
                    shader: name.to_string(),
                    source,
                }
            })?;
        if definition.name != name {
            log::warn!(
                "shader file {name:?} declares name {:?}; caching it as {name:?}",
                definition.name
            );
        }

        let shared = name == self.config.screen_shader;
        let shader = Arc::new(Shader::new(
            definition,
            shared,
            self.config.max_constant_buffer_size,
        )?);

        if let Some(model) = shader.shading_model() {
            if self.registry.register(model.clone())? {
                self.remove_lighting_artifacts();
            }
        }

        log::info!(
            "loaded shader {name:?} ({}, {} passes)",
            shader.render_queue(),
            shader.pass_count()
        );
        self.shaders.insert(name.to_string(), shader.clone());
        self.pending.push(name.to_string());
        Ok(shader)
    }

    /// Remove generated lighting sources written before the latest
    /// registration. Compiled pipelines stay bound until regeneration
    /// replaces them.
    fn remove_lighting_artifacts(&self) {
        let Some(cache_dir) = self.config.cache_dir.as_deref() else {
            return;
        };
        for name in &self.compiled {
            if let Some(shader) = self.shaders.get(name) {
                for pass_index in shader.lighting_passes() {
                    shader.remove_artifact(pass_index, cache_dir);
                }
            }
        }
    }

    /// Create a material with default values for a shader.
    pub fn create_material(
        &mut self,
        name: &str,
        shader_name: &str,
        device: &mut dyn GraphicsDevice,
    ) -> Result<SharedMaterial> {
        if let Some(material) = self.materials.get(name) {
            return Ok(material.clone());
        }
        let shader = self.load_shader(shader_name, device)?;
        let mut instance = MaterialInstance::new(name, shader);
        instance.update_constant_buffer(device)?;
        let material = Arc::new(RwLock::new(instance));
        self.materials.insert(name.to_string(), material.clone());
        Ok(material)
    }

    /// Load a material file, returning the cached instance for a known name.
    ///
    /// Without a command context, texture paths stay pending until
    /// `resolve_pending_textures`.
    pub fn load_material(
        &mut self,
        path: &Path,
        device: &mut dyn GraphicsDevice,
        ctx: Option<&mut dyn CommandContext>,
    ) -> Result<SharedMaterial> {
        let header = MaterialFile::read_header(path)?;
        if let Some(material) = self.materials.get(&header.name) {
            log::debug!("material cache hit: {}", header.name);
            return Ok(material.clone());
        }

        let file = MaterialFile::load(path)?;
        let shader = self.load_shader(&file.shader, device)?;
        let mut instance = MaterialInstance::new(file.name.clone(), shader);
        instance.apply_file(&file);
        instance.create_gpu_buffer(device)?;

        match ctx {
            Some(ctx) => {
                self.textures.ensure_default_texture(device, ctx)?;
                instance.load_textures_from_paths(
                    device,
                    ctx,
                    &mut self.textures,
                    &mut self.loader,
                )?;
            }
            None => instance.update_constant_buffer(device)?,
        }

        log::info!(
            "loaded material {:?} ({}){}",
            file.name,
            file.shader,
            if instance.has_pending_textures() {
                ", textures pending"
            } else {
                ""
            }
        );
        let material = Arc::new(RwLock::new(instance));
        self.materials.insert(file.name, material.clone());
        Ok(material)
    }

    /// Resolve texture paths of every material loaded without a command
    /// context. Returns the number of materials updated.
    pub fn resolve_pending_textures(
        &mut self,
        device: &mut dyn GraphicsDevice,
        ctx: &mut dyn CommandContext,
    ) -> Result<usize> {
        self.textures.ensure_default_texture(device, ctx)?;
        let mut resolved = 0;
        for material in self.materials.values() {
            let mut material = material.write();
            if material.has_pending_textures() {
                material.load_textures_from_paths(
                    device,
                    ctx,
                    &mut self.textures,
                    &mut self.loader,
                )?;
                resolved += 1;
            }
        }
        Ok(resolved)
    }

    /// Create `<Shader>_Default` for every compiled non-infrastructure shader.
    /// Returns the names created.
    pub fn create_default_materials(
        &mut self,
        device: &mut dyn GraphicsDevice,
    ) -> Result<Vec<String>> {
        let shaders: Vec<String> = self
            .compiled
            .iter()
            .filter(|name| !self.config.is_infrastructure(name))
            .cloned()
            .collect();

        let mut created = Vec::new();
        for shader in shaders {
            let name = format!("{shader}_Default");
            if self.materials.contains_key(&name) {
                continue;
            }
            self.create_material(&name, &shader, device)?;
            created.push(name);
        }
        Ok(created)
    }

    /// Bind a material at the configured root slot.
    pub fn bind_material(
        &self,
        material: &SharedMaterial,
        device: &mut dyn GraphicsDevice,
        ctx: &mut dyn CommandContext,
    ) -> Result<()> {
        material
            .write()
            .bind(device, ctx, self.config.material_root_slot)
    }

    pub fn save_material(&self, name: &str, path: &Path) -> Result<()> {
        let material = self
            .material(name)
            .ok_or_else(|| PipelineError::MaterialNotFound(name.to_string()))?;
        let material = material.read();
        material.save(path)
    }

    /// Free the bindless slot of a texture path. Materials still holding
    /// its index must be updated by the caller, and the GPU must be idle.
    pub fn release_texture(&mut self, path: &Path) -> bool {
        self.textures.release(path)
    }

    /// Destroy every material buffer and free every bindless slot.
    pub fn shutdown(&mut self, device: &mut dyn GraphicsDevice) {
        for material in self.materials.values() {
            material.write().release(device);
        }
        log::info!(
            "material pipeline shut down ({} materials, {} shaders)",
            self.materials.len(),
            self.shaders.len()
        );
        self.materials.clear();
        self.textures.clear();
        self.shaders.clear();
        self.compiled.clear();
        self.pending.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{DummyDescriptorHeap, DummyDevice, DummyTextureLoader};

    const SCREEN: &str = "Shader \"Screen\" { Pass { Name \"Lighting\" HLSLPROGRAM\n#pragma vertex FullscreenVS\n#pragma fragment LightingPS\nvoid FullscreenVS() {}\nvoid LightingPS() {}\nENDHLSL } }";
    const UNLIT: &str = "Shader \"Unlit\" { Properties {\n//# Float Alpha { default(1) }\n} Pass { HLSLPROGRAM\n#pragma vertex VSMain\n#pragma fragment PSMain\nvoid VSMain() {}\nvoid PSMain() {}\nENDHLSL } }";

    fn manager() -> MaterialManager<DummyDescriptorHeap, DummyTextureLoader> {
        let mut manager = MaterialManager::new(
            PipelineConfig::default(),
            DummyDescriptorHeap::new(),
            DummyTextureLoader::new(),
        );
        manager.sources_mut().register("Screen", SCREEN);
        manager.sources_mut().register("Unlit", UNLIT);
        manager
    }

    #[test]
    fn test_load_shader_is_cached() {
        let mut manager = manager();
        let mut device = DummyDevice::new();
        let a = manager.load_shader("Unlit", &mut device).unwrap();
        let b = manager.load_shader("Unlit", &mut device).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(device.pipelines.len(), 1);
    }

    #[test]
    fn test_register_does_not_compile() {
        let mut manager = manager();
        let mut device = DummyDevice::new();
        assert_eq!(manager.register_all_shaders().unwrap(), 2);
        assert!(device.compiled.is_empty());
        assert_eq!(manager.pending_shaders().len(), 2);

        manager.compile_pending(&mut device).unwrap();
        assert!(manager.pending_shaders().is_empty());
        assert!(manager.is_compiled("Screen"));
        assert!(manager.shader("Unlit").unwrap().pipeline(0).is_some());
    }

    #[test]
    fn test_unknown_shader() {
        let mut manager = manager();
        let mut device = DummyDevice::new();
        assert!(matches!(
            manager.load_shader("Missing", &mut device),
            Err(PipelineError::ShaderNotFound(_))
        ));
    }

    #[test]
    fn test_default_materials_skip_infrastructure() {
        let mut manager = manager();
        let mut device = DummyDevice::new();
        manager.load_all_shaders(&mut device).unwrap();
        let created = manager.create_default_materials(&mut device).unwrap();
        assert_eq!(created, vec!["Unlit_Default".to_string()]);
        assert!(manager.create_default_materials(&mut device).unwrap().is_empty());
    }

    #[test]
    fn test_shutdown_releases_buffers() {
        let mut manager = manager();
        let mut device = DummyDevice::new();
        manager.create_material("A", "Unlit", &mut device).unwrap();
        assert_eq!(device.live_buffers(), 1);
        manager.shutdown(&mut device);
        assert_eq!(device.live_buffers(), 0);
        assert_eq!(manager.material_count(), 0);
        assert_eq!(manager.textures().allocator().allocated_count(), 0);
    }
}
