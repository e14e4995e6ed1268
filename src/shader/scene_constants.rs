//! Per-frame scene constants shared by every generated shader.
//!
//! The CPU struct and the generated `cbuffer` are produced from the same field
//! table, and both sides use explicit byte offsets.

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec2, Vec3, Vec4};

/// Register the scene constant buffer is bound to.
pub const SCENE_CONSTANTS_REGISTER: u32 = 0;

/// Bumped whenever a field is added, removed or moved.
pub const SCENE_CONSTANTS_VERSION: u32 = 3;

/// Shadow technique selected for the frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u32)]
pub enum ShadowMode {
    #[default]
    Disabled = 0,
    Hard = 1,
    Pcf = 2,
}

/// CPU mirror of the `SceneConstants` constant buffer.
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct SceneConstants {
    pub view: Mat4,
    pub projection: Mat4,
    pub model: Mat4,
    pub light_direction: Vec3,
    pub light_intensity: f32,
    pub camera_position: Vec3,
    pub sky_light_intensity: f32,
    pub sky_light_color: Vec4,
    pub inv_view: Mat4,
    pub inv_projection: Mat4,
    pub inv_view_projection: Mat4,
    pub light_view_projection: Mat4,
    pub prev_view_projection: Mat4,
    pub curr_view_projection: Mat4,
    /// TAA sub-pixel jitter in NDC units
    pub jitter: Vec2,
    pub screen_size: Vec2,
    pub near_plane: f32,
    pub far_plane: f32,
    pub shadow_mode: u32,
    pub _padding: f32,
}

impl Default for SceneConstants {
    fn default() -> Self {
        Self {
            view: Mat4::IDENTITY,
            projection: Mat4::IDENTITY,
            model: Mat4::IDENTITY,
            light_direction: Vec3::new(0.0, -1.0, 0.0),
            light_intensity: 1.0,
            camera_position: Vec3::ZERO,
            sky_light_intensity: 1.0,
            sky_light_color: Vec4::ONE,
            inv_view: Mat4::IDENTITY,
            inv_projection: Mat4::IDENTITY,
            inv_view_projection: Mat4::IDENTITY,
            light_view_projection: Mat4::IDENTITY,
            prev_view_projection: Mat4::IDENTITY,
            curr_view_projection: Mat4::IDENTITY,
            jitter: Vec2::ZERO,
            screen_size: Vec2::ONE,
            near_plane: 0.1,
            far_plane: 1000.0,
            shadow_mode: ShadowMode::Disabled as u32,
            _padding: 0.0,
        }
    }
}

impl SceneConstants {
    /// Fill the camera matrices for a frame. The previous frame's
    /// view-projection is taken from the current value before it is replaced.
    pub fn set_camera(&mut self, view: Mat4, projection: Mat4, position: Vec3) {
        self.prev_view_projection = self.curr_view_projection;
        let view_projection = projection * view;
        self.view = view;
        self.projection = projection;
        self.inv_view = view.inverse();
        self.inv_projection = projection.inverse();
        self.inv_view_projection = view_projection.inverse();
        self.curr_view_projection = view_projection;
        self.camera_position = position;
    }

    pub fn set_shadow_mode(&mut self, mode: ShadowMode) {
        self.shadow_mode = mode as u32;
    }

    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::bytes_of(self)
    }
}

/// One field of the scene constant buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SceneField {
    pub hlsl_type: &'static str,
    pub name: &'static str,
    pub offset: u32,
}

const fn field(hlsl_type: &'static str, name: &'static str, offset: u32) -> SceneField {
    SceneField {
        hlsl_type,
        name,
        offset,
    }
}

/// Every field in declaration order with its byte offset.
pub const SCENE_FIELDS: &[SceneField] = &[
    field("float4x4", "View", 0),
    field("float4x4", "Projection", 64),
    field("float4x4", "Model", 128),
    field("float3", "LightDirection", 192),
    field("float", "LightIntensity", 204),
    field("float3", "CameraPosition", 208),
    field("float", "SkyLightIntensity", 220),
    field("float4", "SkyLightColor", 224),
    field("float4x4", "InvView", 240),
    field("float4x4", "InvProjection", 304),
    field("float4x4", "InvViewProjection", 368),
    field("float4x4", "LightViewProjection", 432),
    field("float4x4", "PrevViewProjection", 496),
    field("float4x4", "CurrViewProjection", 560),
    field("float2", "Jitter", 624),
    field("float2", "ScreenSize", 632),
    field("float", "NearPlane", 640),
    field("float", "FarPlane", 644),
    field("uint", "ShadowMode", 648),
    field("float", "ScenePadding", 652),
];

/// Generated declaration of the scene constant buffer.
pub fn scene_constants_hlsl() -> String {
    let mut out = format!(
        "// SceneConstants v{SCENE_CONSTANTS_VERSION}\ncbuffer SceneConstants : register(b{SCENE_CONSTANTS_REGISTER})\n{{\n"
    );
    for f in SCENE_FIELDS {
        let component = ["x", "y", "z", "w"][((f.offset % 16) / 4) as usize];
        let major = if f.hlsl_type == "float4x4" {
            "column_major "
        } else {
            ""
        };
        out.push_str(&format!(
            "    {major}{} {} : packoffset(c{}.{component});\n",
            f.hlsl_type,
            f.name,
            f.offset / 16
        ));
    }
    out.push_str("};\n");
    out
}
