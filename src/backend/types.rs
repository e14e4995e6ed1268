//! Handles and descriptors exchanged with the host device

use bytemuck::{Pod, Zeroable};
use glam::{Vec2, Vec3, Vec4};

/// Handle to a GPU buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BufferHandle(pub u64);

/// Handle to a GPU-resident texture
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureHandle(pub u64);

/// Handle to a compiled pipeline state object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PipelineHandle(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

impl ShaderStage {
    /// Native compile target profile.
    pub fn target_profile(&self) -> &'static str {
        match self {
            ShaderStage::Vertex => "vs_6_6",
            ShaderStage::Fragment => "ps_6_6",
        }
    }
}

/// Compiled blob for one stage
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaderBytecode {
    pub stage: ShaderStage,
    pub entry_point: String,
    pub bytes: Vec<u8>,
}

/// Formats of sampled textures and render targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureFormat {
    Rgba8Unorm,
    Rgba8UnormSrgb,
    Rgba16Float,
    Rg16Float,
    Depth32Float,
}

/// Shape of a sampled texture and of the views written for it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TextureDimension {
    #[default]
    D2,
    /// Six square faces in +X, -X, +Y, -Y, +Z, -Z order
    Cube,
}

impl TextureDimension {
    pub fn array_layers(&self) -> u32 {
        match self {
            TextureDimension::D2 => 1,
            TextureDimension::Cube => 6,
        }
    }
}

/// Sampled texture. Bindless textures are always shader resources.
///
/// For cube textures `width` and `height` describe one face.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextureDescriptor {
    pub label: Option<String>,
    pub width: u32,
    pub height: u32,
    pub format: TextureFormat,
    pub dimension: TextureDimension,
}

impl Default for TextureDescriptor {
    fn default() -> Self {
        Self {
            label: None,
            width: 1,
            height: 1,
            format: TextureFormat::Rgba8Unorm,
            dimension: TextureDimension::D2,
        }
    }
}

/// Memory heap a buffer lives in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HeapType {
    /// GPU-local, written through copies
    #[default]
    Default,
    /// CPU-visible, mapped for the buffer's whole lifetime
    Upload,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BufferDescriptor {
    pub label: Option<String>,
    pub size: u64,
    pub heap: HeapType,
}

impl BufferDescriptor {
    /// Upload-heap constant buffer that stays mapped.
    pub fn persistent_constants(label: impl Into<String>, size: u64) -> Self {
        Self {
            label: Some(label.into()),
            size,
            heap: HeapType::Upload,
        }
    }
}

/// Format of one input-layout element
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementFormat {
    Float2,
    Float3,
    Float4,
}

impl ElementFormat {
    pub fn size(&self) -> u32 {
        match self {
            ElementFormat::Float2 => 8,
            ElementFormat::Float3 => 12,
            ElementFormat::Float4 => 16,
        }
    }
}

/// One vertex attribute, matched by semantic against the vertex stage inputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputElement {
    pub semantic: &'static str,
    pub semantic_index: u32,
    pub format: ElementFormat,
    pub offset: u32,
}

impl InputElement {
    const fn new(semantic: &'static str, format: ElementFormat, offset: u32) -> Self {
        Self {
            semantic,
            semantic_index: 0,
            format,
            offset,
        }
    }
}

/// Single-stream vertex input layout
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputLayout {
    pub stride: u32,
    pub elements: Vec<InputElement>,
}

/// Vertex consumed by GBuffer and Forward passes
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct MeshVertex {
    pub position: Vec3,
    pub normal: Vec3,
    pub uv: Vec2,
    pub tangent: Vec4,
}

impl MeshVertex {
    pub fn input_layout() -> InputLayout {
        InputLayout {
            stride: std::mem::size_of::<Self>() as u32,
            elements: vec![
                InputElement::new("POSITION", ElementFormat::Float3, 0),
                InputElement::new("NORMAL", ElementFormat::Float3, 12),
                InputElement::new("TEXCOORD", ElementFormat::Float2, 24),
                InputElement::new("TANGENT", ElementFormat::Float4, 32),
            ],
        }
    }
}

/// Fullscreen quad vertex consumed by lighting passes
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct ScreenVertex {
    pub position: Vec3,
    pub uv: Vec2,
}

impl ScreenVertex {
    pub fn input_layout() -> InputLayout {
        InputLayout {
            stride: std::mem::size_of::<Self>() as u32,
            elements: vec![
                InputElement::new("POSITION", ElementFormat::Float3, 0),
                InputElement::new("TEXCOORD", ElementFormat::Float2, 12),
            ],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CullMode {
    None,
    Back,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComparisonFunc {
    Less,
    LessEqual,
    Always,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Blend {
    Zero,
    One,
    SrcAlpha,
    InvSrcAlpha,
}

/// Additive blend equation per render target
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlendDesc {
    pub src_color: Blend,
    pub dst_color: Blend,
    pub src_alpha: Blend,
    pub dst_alpha: Blend,
}

impl BlendDesc {
    /// `src * a + dst * (1 - a)`
    pub fn alpha() -> Self {
        Self {
            src_color: Blend::SrcAlpha,
            dst_color: Blend::InvSrcAlpha,
            src_alpha: Blend::One,
            dst_alpha: Blend::InvSrcAlpha,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DepthStencilDesc {
    pub format: TextureFormat,
    pub depth_enable: bool,
    pub depth_write: bool,
    pub depth_func: ComparisonFunc,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderTargetDesc {
    pub format: TextureFormat,
    /// `None` writes the source unmodified
    pub blend: Option<BlendDesc>,
}

/// Graphics pipeline state. Topology is always a triangle list.
#[derive(Debug, Clone)]
pub struct PipelineStateDescriptor {
    pub label: Option<String>,
    pub vertex_shader: ShaderBytecode,
    pub fragment_shader: ShaderBytecode,
    pub input_layout: InputLayout,
    pub cull_mode: CullMode,
    pub front_counter_clockwise: bool,
    pub depth_stencil: DepthStencilDesc,
    pub render_targets: Vec<RenderTargetDesc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_input_layout_strides() {
        assert_eq!(MeshVertex::input_layout().stride, 48);
        assert_eq!(ScreenVertex::input_layout().stride, 20);

        for layout in [MeshVertex::input_layout(), ScreenVertex::input_layout()] {
            let last = layout.elements.last().unwrap();
            assert_eq!(last.offset + last.format.size(), layout.stride);
        }
    }

    #[test]
    fn test_persistent_constants_live_in_upload_heap() {
        let desc = BufferDescriptor::persistent_constants("cb", 256);
        assert_eq!(desc.heap, HeapType::Upload);
        assert_eq!(desc.label.as_deref(), Some("cb"));
    }
}
