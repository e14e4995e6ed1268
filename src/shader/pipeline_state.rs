//! Fixed-function state per pass kind.

use crate::backend::types::*;
use crate::shader::definition::RenderQueue;

/// GBuffer render target formats: albedo, normal, ORM, motion vectors.
pub const GBUFFER_FORMATS: [TextureFormat; 4] = [
    TextureFormat::Rgba8UnormSrgb,
    TextureFormat::Rgba16Float,
    TextureFormat::Rgba8Unorm,
    TextureFormat::Rg16Float,
];

/// Lit color target.
pub const HDR_FORMAT: TextureFormat = TextureFormat::Rgba16Float;

pub const DEPTH_FORMAT: TextureFormat = TextureFormat::Depth32Float;

/// What a pass renders, which decides its generated inputs and pipeline state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PassKind {
    /// Deferred geometry pass writing the GBuffer
    GBuffer,
    /// Fullscreen deferred lighting pass
    Lighting,
    /// Forward-lit geometry
    Forward,
}

impl PassKind {
    /// Classify a pass by its shader's render queue and pass index.
    ///
    /// Every pass of the shared lighting shader is a lighting pass. Returns
    /// `None` for pass indices a Deferred shader never has.
    pub fn resolve(queue: RenderQueue, pass_index: usize, shared_lighting: bool) -> Option<Self> {
        if shared_lighting {
            return Some(PassKind::Lighting);
        }
        match (queue, pass_index) {
            (RenderQueue::Deferred, 0) => Some(PassKind::GBuffer),
            (RenderQueue::Deferred, 1) => Some(PassKind::Lighting),
            (RenderQueue::Deferred, _) => None,
            (RenderQueue::Forward, _) => Some(PassKind::Forward),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PassKind::GBuffer => "GBuffer",
            PassKind::Lighting => "Lighting",
            PassKind::Forward => "Forward",
        }
    }

    /// Whether generated source for this pass contains the BRDF dispatch.
    pub fn uses_shading_models(&self) -> bool {
        matches!(self, PassKind::Lighting)
    }

    /// Build the pipeline descriptor for compiled stages of this pass.
    pub fn pipeline_descriptor(
        &self,
        label: String,
        vertex_shader: ShaderBytecode,
        fragment_shader: ShaderBytecode,
    ) -> PipelineStateDescriptor {
        let desc = PipelineStateDescriptor {
            label: Some(label),
            vertex_shader,
            fragment_shader,
            input_layout: MeshVertex::input_layout(),
            cull_mode: CullMode::Back,
            front_counter_clockwise: true,
            depth_stencil: opaque_depth(),
            render_targets: Vec::new(),
        };
        match self {
            PassKind::GBuffer => gbuffer_state(desc),
            PassKind::Lighting => lighting_state(desc),
            PassKind::Forward => forward_state(desc),
        }
    }
}

fn opaque_depth() -> DepthStencilDesc {
    DepthStencilDesc {
        format: DEPTH_FORMAT,
        depth_enable: true,
        depth_write: true,
        depth_func: ComparisonFunc::LessEqual,
    }
}

fn gbuffer_state(desc: PipelineStateDescriptor) -> PipelineStateDescriptor {
    PipelineStateDescriptor {
        render_targets: GBUFFER_FORMATS
            .iter()
            .map(|&format| RenderTargetDesc {
                format,
                blend: None,
            })
            .collect(),
        ..desc
    }
}

fn lighting_state(desc: PipelineStateDescriptor) -> PipelineStateDescriptor {
    PipelineStateDescriptor {
        input_layout: ScreenVertex::input_layout(),
        cull_mode: CullMode::None,
        depth_stencil: DepthStencilDesc {
            format: DEPTH_FORMAT,
            depth_enable: false,
            depth_write: false,
            depth_func: ComparisonFunc::Always,
        },
        render_targets: vec![RenderTargetDesc {
            format: HDR_FORMAT,
            blend: Some(BlendDesc::alpha()),
        }],
        ..desc
    }
}

fn forward_state(desc: PipelineStateDescriptor) -> PipelineStateDescriptor {
    PipelineStateDescriptor {
        render_targets: vec![RenderTargetDesc {
            format: HDR_FORMAT,
            blend: None,
        }],
        ..desc
    }
}
