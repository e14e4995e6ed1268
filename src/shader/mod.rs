//! Shaders: parsing, layout, code generation and compilation
//!
//! A [`Shader`] owns the parsed definition, the material parameter layout and
//! the compiled state of every pass. Compiled state sits behind a lock so a
//! shared `Arc<Shader>` can have its lighting passes regenerated when new
//! shading models register.

pub mod codegen;
pub mod definition;
pub mod layout;
pub mod parser;
pub mod pipeline_state;
pub mod scene_constants;
pub mod shading_model;
pub mod sources;

use std::fmt::Write;
use std::path::{Path, PathBuf};

use parking_lot::RwLock;

use crate::backend::{GraphicsDevice, PipelineHandle, ShaderBytecode, ShaderStage};
use crate::error::{PipelineError, Result};

pub use codegen::{BrdfDispatch, CodegenOptions};
pub use definition::*;
pub use layout::{generate_parameters, ParameterLayout, ShaderParameter};
pub use parser::{parse_shader, ParseError, ShaderParser};
pub use pipeline_state::PassKind;
pub use scene_constants::{SceneConstants, ShadowMode};
pub use shading_model::{RegistryState, ShadingModelRegistry};
pub use sources::ShaderSources;

/// Generated source and compiled stages of one pass.
#[derive(Debug, Clone)]
pub struct CompiledPass {
    pub source: String,
    pub vertex: ShaderBytecode,
    pub fragment: ShaderBytecode,
    pub pipeline: Option<PipelineHandle>,
}

/// Where compiled artifacts for a shader are written.
#[derive(Debug, Clone, Copy, Default)]
pub struct CompileTarget<'a> {
    pub options: CodegenOptions,
    /// Directory for generated sources and diagnostics
    pub cache_dir: Option<&'a Path>,
}

/// A parsed shader with its parameter layout and compiled passes.
#[derive(Debug)]
pub struct Shader {
    definition: ShaderDefinition,
    layout: ParameterLayout,
    shared_lighting: bool,
    passes: RwLock<Vec<Option<CompiledPass>>>,
}

impl Shader {
    /// Build the parameter layout of a parsed shader.
    ///
    /// `shared_lighting` marks the shader whose every pass is a lighting pass.
    pub fn new(
        definition: ShaderDefinition,
        shared_lighting: bool,
        max_constant_buffer_size: u32,
    ) -> Result<Self> {
        let layout = generate_parameters(&definition.properties);
        if layout.size > max_constant_buffer_size {
            return Err(PipelineError::Layout {
                shader: definition.name.clone(),
                size: layout.size,
                limit: max_constant_buffer_size,
            });
        }
        let pass_count = definition.passes.len();
        Ok(Self {
            definition,
            layout,
            shared_lighting,
            passes: RwLock::new(vec![None; pass_count]),
        })
    }

    pub fn name(&self) -> &str {
        &self.definition.name
    }

    pub fn definition(&self) -> &ShaderDefinition {
        &self.definition
    }

    pub fn render_queue(&self) -> RenderQueue {
        self.definition.render_queue
    }

    pub fn shading_model(&self) -> Option<&ShadingModelDefinition> {
        self.definition.shading_model.as_ref()
    }

    pub fn parameters(&self) -> &[ShaderParameter] {
        &self.layout.parameters
    }

    pub fn parameter(&self, name: &str) -> Option<&ShaderParameter> {
        self.layout.parameters.iter().find(|p| p.name == name)
    }

    /// Material constant-buffer size, a multiple of 256.
    pub fn constant_buffer_size(&self) -> u32 {
        self.layout.size
    }

    pub fn pass_count(&self) -> usize {
        self.definition.passes.len()
    }

    pub fn is_shared_lighting(&self) -> bool {
        self.shared_lighting
    }

    pub fn pass_kind(&self, pass_index: usize) -> Option<PassKind> {
        if pass_index >= self.pass_count() {
            return None;
        }
        PassKind::resolve(self.render_queue(), pass_index, self.shared_lighting)
    }

    /// Indices of passes whose source embeds the shading-model dispatch.
    pub fn lighting_passes(&self) -> Vec<usize> {
        (0..self.pass_count())
            .filter(|&i| self.pass_kind(i).is_some_and(|k| k.uses_shading_models()))
            .collect()
    }

    /// Whether every pass has compiled stages.
    pub fn is_compiled(&self) -> bool {
        self.passes.read().iter().all(Option::is_some)
    }

    pub fn pipeline(&self, pass_index: usize) -> Option<PipelineHandle> {
        self.passes
            .read()
            .get(pass_index)
            .and_then(|p| p.as_ref())
            .and_then(|p| p.pipeline)
    }

    /// Generated source of a compiled pass.
    pub fn generated_source(&self, pass_index: usize) -> Option<String> {
        self.passes
            .read()
            .get(pass_index)
            .and_then(|p| p.as_ref())
            .map(|p| p.source.clone())
    }

    /// Generate source for one pass without compiling it.
    pub fn generate_source(
        &self,
        pass_index: usize,
        models: &[ShadingModelDefinition],
        options: &CodegenOptions,
    ) -> Result<String> {
        let kind = self.kind_or_unsupported(pass_index)?;
        Ok(codegen::generate_pass_source(
            &self.definition,
            pass_index,
            kind,
            &self.layout.parameters,
            models,
            options,
        ))
    }

    /// Compile every pass. On failure the shader keeps its metadata and the
    /// passes compiled so far.
    pub fn compile(
        &self,
        device: &mut dyn GraphicsDevice,
        models: &[ShadingModelDefinition],
        target: CompileTarget<'_>,
    ) -> Result<()> {
        for pass_index in 0..self.pass_count() {
            self.compile_pass(device, pass_index, models, target)?;
        }
        log::info!(
            "compiled shader {:?} ({} passes, {} byte constant buffer)",
            self.name(),
            self.pass_count(),
            self.constant_buffer_size()
        );
        Ok(())
    }

    /// Generate, write and compile one pass.
    pub fn compile_pass(
        &self,
        device: &mut dyn GraphicsDevice,
        pass_index: usize,
        models: &[ShadingModelDefinition],
        target: CompileTarget<'_>,
    ) -> Result<()> {
        let source = self.generate_source(pass_index, models, &target.options)?;
        let pass = &self.definition.passes[pass_index];

        if let Some(dir) = target.cache_dir {
            let path = dir.join(self.artifact_name(pass_index));
            write_artifact(&path, &source)?;
            log::debug!("wrote generated source {}", path.display());
        }

        let vertex = self.compile_stage(
            device,
            &source,
            pass_index,
            &pass.vertex_entry,
            ShaderStage::Vertex,
            target,
        )?;
        let fragment = self.compile_stage(
            device,
            &source,
            pass_index,
            &pass.fragment_entry,
            ShaderStage::Fragment,
            target,
        )?;

        self.passes.write()[pass_index] = Some(CompiledPass {
            source,
            vertex,
            fragment,
            pipeline: None,
        });
        Ok(())
    }

    fn compile_stage(
        &self,
        device: &mut dyn GraphicsDevice,
        source: &str,
        pass_index: usize,
        entry_point: &str,
        stage: ShaderStage,
        target: CompileTarget<'_>,
    ) -> Result<ShaderBytecode> {
        device
            .compile_shader(source, entry_point, stage)
            .map_err(|e| {
                let diagnostic = e.to_string();
                let artifact = target.cache_dir.and_then(|dir| {
                    let path = dir.join(self.error_artifact_name(pass_index));
                    let report = format!("{diagnostic}\n\n{source}");
                    match write_artifact(&path, &report) {
                        Ok(()) => Some(path),
                        Err(err) => {
                            log::warn!("could not write {}: {err}", path.display());
                            None
                        }
                    }
                });
                log::error!(
                    "shader {:?} pass {pass_index} ({:?}) failed to compile: {diagnostic}",
                    self.name(),
                    stage
                );
                PipelineError::Compile {
                    shader: self.name().to_string(),
                    pass: pass_index,
                    stage,
                    diagnostic,
                    artifact,
                }
            })
    }

    /// Build the pipeline state object of a compiled pass.
    pub fn create_pso(
        &self,
        device: &mut dyn GraphicsDevice,
        pass_index: usize,
    ) -> Result<PipelineHandle> {
        let kind = self.kind_or_unsupported(pass_index)?;
        let mut passes = self.passes.write();
        let compiled = passes
            .get_mut(pass_index)
            .and_then(|p| p.as_mut())
            .ok_or_else(|| PipelineError::NotCompiled {
                shader: self.name().to_string(),
                pass: pass_index,
            })?;

        let label = format!(
            "{}/{}",
            self.name(),
            self.definition.passes[pass_index].name
        );
        let desc =
            kind.pipeline_descriptor(label, compiled.vertex.clone(), compiled.fragment.clone());
        let handle = device.create_pipeline_state(&desc)?;
        compiled.pipeline = Some(handle);
        Ok(handle)
    }

    /// Build pipeline state objects for every pass.
    pub fn create_pipelines(&self, device: &mut dyn GraphicsDevice) -> Result<()> {
        for pass_index in 0..self.pass_count() {
            self.create_pso(device, pass_index)?;
        }
        Ok(())
    }

    /// Remove the generated source file of a pass. The compiled pass stays
    /// usable until it is compiled again.
    pub fn remove_artifact(&self, pass_index: usize, cache_dir: &Path) {
        let path = cache_dir.join(self.artifact_name(pass_index));
        match std::fs::remove_file(&path) {
            Ok(()) => log::debug!("removed stale source {}", path.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => log::warn!("could not remove {}: {e}", path.display()),
        }
    }

    /// Path of the generated source of a pass, relative to the cache
    /// directory. Each `/` in the shader name becomes a subdirectory.
    pub fn artifact_name(&self, pass_index: usize) -> String {
        let pass = self
            .definition
            .passes
            .get(pass_index)
            .map_or("", |p| p.name.as_str());
        format!(
            "{}_{pass_index}_{}.hlsl",
            artifact_stem(self.name()),
            escape_component(pass)
        )
    }

    fn error_artifact_name(&self, pass_index: usize) -> String {
        format!("{}_{pass_index}_error.txt", artifact_stem(self.name()))
    }

    fn kind_or_unsupported(&self, pass_index: usize) -> Result<PassKind> {
        self.pass_kind(pass_index)
            .ok_or_else(|| PipelineError::UnsupportedPass {
                shader: self.name().to_string(),
                pass: pass_index,
            })
    }
}

fn write_artifact(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, contents)?;
    Ok(())
}

fn artifact_stem(name: &str) -> String {
    name.split('/')
        .filter(|part| !part.is_empty())
        .map(escape_component)
        .collect::<Vec<_>>()
        .join("/")
}

/// Keeps `[A-Za-z0-9_-]` and percent-encodes every other byte, so two
/// different names never land in the same file.
fn escape_component(part: &str) -> String {
    let mut out = String::with_capacity(part.len());
    for byte in part.bytes() {
        if byte.is_ascii_alphanumeric() || byte == b'-' || byte == b'_' {
            out.push(char::from(byte));
        } else {
            let _ = write!(out, "%{byte:02X}");
        }
    }
    out
}

/// Path of the generated source of a pass inside a cache directory.
pub fn artifact_path(cache_dir: &Path, shader: &Shader, pass_index: usize) -> PathBuf {
    cache_dir.join(shader.artifact_name(pass_index))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::DummyDevice;

    const FORWARD: &str = "Shader \"Custom/Unlit\" { Properties { \n//# Vector4 Tint { default(1,1,1,1) }\n } Pass { Name \"Main\" HLSLPROGRAM\n#pragma vertex VSMain\n#pragma fragment PSMain\nvoid VSMain() {}\nfloat4 PSMain() : SV_Target { return Tint; }\nENDHLSL } }";

    fn shader(src: &str) -> Shader {
        Shader::new(parse_shader(src).unwrap(), false, 65536).unwrap()
    }

    #[test]
    fn test_compile_and_create_pso() {
        let shader = shader(FORWARD);
        let mut device = DummyDevice::new();
        assert!(!shader.is_compiled());

        shader
            .compile(&mut device, &[], CompileTarget::default())
            .unwrap();
        assert!(shader.is_compiled());
        assert_eq!(device.compiled.len(), 2);

        let handle = shader.create_pso(&mut device, 0).unwrap();
        assert_eq!(shader.pipeline(0), Some(handle));
        assert_eq!(device.pipelines[0].label.as_deref(), Some("Custom/Unlit/Main"));
    }

    #[test]
    fn test_pso_requires_compile() {
        let shader = shader(FORWARD);
        let mut device = DummyDevice::new();
        assert!(matches!(
            shader.create_pso(&mut device, 0),
            Err(PipelineError::NotCompiled { .. })
        ));
        assert!(matches!(
            shader.create_pso(&mut device, 5),
            Err(PipelineError::UnsupportedPass { pass: 5, .. })
        ));
    }

    #[test]
    fn test_compile_failure_writes_diagnostic() {
        let dir = tempfile::tempdir().unwrap();
        let shader = shader(FORWARD);
        let mut device = DummyDevice::new();
        device.reject_sources_containing("return Tint");

        let target = CompileTarget {
            options: CodegenOptions::default(),
            cache_dir: Some(dir.path()),
        };
        let err = shader.compile(&mut device, &[], target).unwrap_err();
        let PipelineError::Compile { artifact, pass, .. } = err else {
            panic!("expected compile error");
        };
        assert_eq!(pass, 0);
        let report = std::fs::read_to_string(artifact.unwrap()).unwrap();
        assert!(report.contains("syntax error"));
        assert!(report.contains("return Tint"));

        // metadata stays usable
        assert_eq!(shader.parameters().len(), 1);
        assert!(!shader.is_compiled());
    }

    #[test]
    fn test_artifact_written_and_removed() {
        let dir = tempfile::tempdir().unwrap();
        let shader = shader(FORWARD);
        let mut device = DummyDevice::new();
        let target = CompileTarget {
            options: CodegenOptions::default(),
            cache_dir: Some(dir.path()),
        };
        shader.compile(&mut device, &[], target).unwrap();

        let path = artifact_path(dir.path(), &shader, 0);
        assert!(path.ends_with("Custom/Unlit_0_Main.hlsl"));
        assert!(path.exists());

        shader.remove_artifact(0, dir.path());
        assert!(!path.exists());
        assert!(shader.generated_source(0).is_some());
    }

    #[test]
    fn test_artifact_names_do_not_collide() {
        let nested = shader(FORWARD);
        let flat = shader(&FORWARD.replace("Custom/Unlit", "Custom_Unlit"));
        let spaced = shader(&FORWARD.replace("Custom/Unlit", "Custom Unlit"));

        assert_eq!(nested.artifact_name(0), "Custom/Unlit_0_Main.hlsl");
        assert_eq!(flat.artifact_name(0), "Custom_Unlit_0_Main.hlsl");
        assert_eq!(spaced.artifact_name(0), "Custom%20Unlit_0_Main.hlsl");
        assert_eq!(nested.error_artifact_name(0), "Custom/Unlit_0_error.txt");
    }

    #[test]
    fn test_constant_buffer_limit() {
        let definition = parse_shader(FORWARD).unwrap();
        let err = Shader::new(definition, false, 128).unwrap_err();
        assert!(matches!(err, PipelineError::Layout { size: 256, limit: 128, .. }));
    }
}
