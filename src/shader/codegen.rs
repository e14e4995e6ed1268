//! Native source generation for one pass.
//!
//! Output order: scene constants, material constants, bindless texture table
//! and sampling macros, samplers, pass inputs, then the authored pass body.

use std::fmt::Write as _;

use crate::shader::definition::{PropertyType, ShaderDefinition, ShadingModelDefinition};
use crate::shader::layout::ShaderParameter;
use crate::shader::pipeline_state::PassKind;
use crate::shader::scene_constants::scene_constants_hlsl;

/// Register of the material constant buffer.
pub const MATERIAL_CONSTANTS_REGISTER: u32 = 1;

/// Signature of the generated shading-model dispatch function.
pub const DISPATCH_SIGNATURE: &str =
    "float3 EvaluateShadingModel(uint shadingModel, BRDFInput input)";

/// Codegen settings shared by every shader.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CodegenOptions {
    pub bindless_capacity: u32,
    /// First `t` register of the bindless table
    pub bindless_base_register: u32,
}

impl Default for CodegenOptions {
    fn default() -> Self {
        Self {
            bindless_capacity: 1024,
            bindless_base_register: 16,
        }
    }
}

pub const SAMPLERS: &str = r#"SamplerState LinearWrapSampler : register(s0);
SamplerState LinearClampSampler : register(s1);
SamplerState PointClampSampler : register(s2);
SamplerComparisonState ShadowSampler : register(s3);
"#;

/// Geometry pass outputs. ORM alpha carries the shading model ID.
pub const GBUFFER_OUTPUT: &str = r#"struct GBufferOutput
{
    float4 Albedo : SV_Target0;
    float4 Normal : SV_Target1;
    float4 ORM : SV_Target2;
    float2 Motion : SV_Target3;
};

float3 EncodeNormal(float3 n)
{
    return normalize(n) * 0.5 + 0.5;
}

float EncodeShadingModel(uint id)
{
    return id / 255.0;
}
"#;

pub const GBUFFER_INPUTS: &str = r#"Texture2D GBufferAlbedo : register(t0);
Texture2D GBufferNormal : register(t1);
Texture2D GBufferORM : register(t2);
Texture2D GBufferMotion : register(t3);
Texture2D<float> SceneDepth : register(t4);
"#;

pub const ENVIRONMENT_INPUTS: &str = r#"TextureCube SkyTexture : register(t5);
Texture2D<float> ShadowMap : register(t6);
"#;

pub const LIGHTING_HELPERS: &str = r#"float3 DecodeNormal(float3 encoded)
{
    return normalize(encoded * 2.0 - 1.0);
}

uint DecodeShadingModel(float encoded)
{
    return (uint)round(encoded * 255.0);
}

float3 ReconstructWorldPosition(float2 uv, float depth)
{
    float4 ndc = float4(uv.x * 2.0 - 1.0, 1.0 - uv.y * 2.0, depth, 1.0);
    float4 world = mul(InvViewProjection, ndc);
    return world.xyz / world.w;
}
"#;

/// BRDF input and the standard Cook-Torrance model.
pub const BRDF_PRELUDE: &str = r#"struct BRDFInput
{
    float3 albedo;
    float3 normal;
    float3 viewDir;
    float3 lightDir;
    float3 lightColor;
    float roughness;
    float metallic;
    float ao;
};

static const float PI = 3.14159265;

float DistributionGGX(float NdotH, float roughness)
{
    float a = roughness * roughness;
    float a2 = a * a;
    float d = NdotH * NdotH * (a2 - 1.0) + 1.0;
    return a2 / max(PI * d * d, 1e-6);
}

float GeometrySmith(float NdotV, float NdotL, float roughness)
{
    float k = (roughness + 1.0) * (roughness + 1.0) / 8.0;
    float gv = NdotV / (NdotV * (1.0 - k) + k);
    float gl = NdotL / (NdotL * (1.0 - k) + k);
    return gv * gl;
}

float3 FresnelSchlick(float cosTheta, float3 f0)
{
    return f0 + (1.0 - f0) * pow(saturate(1.0 - cosTheta), 5.0);
}

float3 StandardBRDF(BRDFInput input)
{
    float3 h = normalize(input.viewDir + input.lightDir);
    float NdotL = saturate(dot(input.normal, input.lightDir));
    float NdotV = max(dot(input.normal, input.viewDir), 1e-4);
    float NdotH = saturate(dot(input.normal, h));

    float3 f0 = lerp(float3(0.04, 0.04, 0.04), input.albedo, input.metallic);
    float3 F = FresnelSchlick(saturate(dot(h, input.viewDir)), f0);
    float D = DistributionGGX(NdotH, input.roughness);
    float G = GeometrySmith(NdotV, NdotL, input.roughness);

    float3 specular = D * G * F / max(4.0 * NdotV * NdotL, 1e-4);
    float3 diffuse = (1.0 - F) * (1.0 - input.metallic) * input.albedo / PI;
    return (diffuse + specular) * input.lightColor * NdotL;
}
"#;

/// Shading-model dispatch built from registered `(id, expression)` pairs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BrdfDispatch {
    bodies: Vec<String>,
    cases: Vec<(u32, String)>,
}

impl BrdfDispatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_models(models: &[ShadingModelDefinition]) -> Self {
        let mut dispatch = Self::new();
        for model in models {
            dispatch.add(model);
        }
        dispatch
    }

    pub fn add(&mut self, model: &ShadingModelDefinition) {
        if self.cases.iter().any(|(id, _)| *id == model.id) {
            return;
        }
        self.bodies
            .push(format!("// Shading model {}\n{}\n", model.id, model.body));
        self.cases.push((model.id, model.call.clone()));
    }

    pub fn cases(&self) -> &[(u32, String)] {
        &self.cases
    }

    /// Emit model bodies, then the dispatch function.
    pub fn emit(&self, out: &mut String) {
        for body in &self.bodies {
            out.push_str(body);
            out.push('\n');
        }
        out.push_str(DISPATCH_SIGNATURE);
        out.push_str("\n{\n    switch (shadingModel)\n    {\n");
        for (id, call) in &self.cases {
            let _ = writeln!(out, "    case {id}: return {call};");
        }
        out.push_str("    default:\n        return StandardBRDF(input);\n    }\n}\n");
    }
}

/// Generate complete source for one pass of a shader.
pub fn generate_pass_source(
    definition: &ShaderDefinition,
    pass_index: usize,
    kind: PassKind,
    parameters: &[ShaderParameter],
    models: &[ShadingModelDefinition],
    options: &CodegenOptions,
) -> String {
    let mut out = String::with_capacity(16 * 1024);
    let pass_name = definition
        .passes
        .get(pass_index)
        .map(|p| p.name.as_str())
        .unwrap_or("");
    let _ = writeln!(
        out,
        "// {} pass {pass_index} {pass_name:?} ({})\n// Generated source, rewritten on every build.\n",
        definition.name,
        kind.as_str()
    );

    out.push_str(&scene_constants_hlsl());
    out.push('\n');
    emit_material_constants(&mut out, parameters);
    out.push('\n');
    emit_bindless_table(&mut out, parameters, options);
    out.push('\n');
    out.push_str(SAMPLERS);
    out.push('\n');
    emit_pass_inputs(&mut out, definition, kind, models);

    if let Some(pass) = definition.passes.get(pass_index) {
        out.push('\n');
        out.push_str(&pass.body);
        out.push('\n');
    }
    out
}

fn emit_material_constants(out: &mut String, parameters: &[ShaderParameter]) {
    if parameters.is_empty() {
        out.push_str("// No material constants\n");
        return;
    }
    let _ = writeln!(
        out,
        "cbuffer MaterialConstants : register(b{MATERIAL_CONSTANTS_REGISTER})\n{{"
    );
    for p in parameters {
        let component = ["x", "y", "z", "w"][((p.byte_offset % 16) / 4) as usize];
        let _ = writeln!(
            out,
            "    {} {} : packoffset(c{}.{component});",
            p.ty.hlsl_type(),
            p.field_name(),
            p.byte_offset / 16
        );
    }
    out.push_str("};\n");
}

/// The cube table aliases the 2D table's descriptor range in another space.
/// A slot only holds a view of the dimension it was acquired with.
fn emit_bindless_table(out: &mut String, parameters: &[ShaderParameter], options: &CodegenOptions) {
    let base = options.bindless_base_register;
    let _ = writeln!(out, "#define BINDLESS_CAPACITY {}", options.bindless_capacity);
    let _ = writeln!(
        out,
        "Texture2D BindlessTextures[BINDLESS_CAPACITY] : register(t{base}, space1);"
    );
    let has_cube = parameters.iter().any(|p| p.ty == PropertyType::TextureCube);
    if has_cube {
        let _ = writeln!(
            out,
            "TextureCube BindlessCubeTextures[BINDLESS_CAPACITY] : register(t{base}, space2);"
        );
    }

    for p in parameters.iter().filter(|p| p.is_texture()) {
        let table = match p.ty {
            PropertyType::TextureCube => "BindlessCubeTextures",
            _ => "BindlessTextures",
        };
        let _ = writeln!(
            out,
            "// {} (t{})\n#define TEXTURE_{name} {table}[NonUniformResourceIndex({field})]\n#define SAMPLE_{name}(uv) TEXTURE_{name}.Sample(LinearWrapSampler, uv)",
            p.name,
            p.register,
            name = p.name,
            field = p.field_name(),
        );
    }
}

fn emit_pass_inputs(
    out: &mut String,
    definition: &ShaderDefinition,
    kind: PassKind,
    models: &[ShadingModelDefinition],
) {
    match kind {
        PassKind::GBuffer => {
            let id = definition.shading_model.as_ref().map_or(0, |m| m.id);
            let _ = writeln!(out, "#define SHADING_MODEL_ID {id}\n");
            out.push_str(GBUFFER_OUTPUT);
        }
        PassKind::Lighting => {
            out.push_str(GBUFFER_INPUTS);
            out.push_str(ENVIRONMENT_INPUTS);
            out.push('\n');
            out.push_str(LIGHTING_HELPERS);
            out.push('\n');
            out.push_str(BRDF_PRELUDE);
            out.push('\n');
            BrdfDispatch::from_models(models).emit(out);
        }
        PassKind::Forward => {
            out.push_str(ENVIRONMENT_INPUTS);
            out.push('\n');
            out.push_str(BRDF_PRELUDE);
        }
    }
}
