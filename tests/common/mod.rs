//! Shared shader sources and fixtures for integration tests.

#![allow(dead_code)]

use material_pipeline::backend::{
    DummyCommandContext, DummyDescriptorHeap, DummyDevice, DummyTextureLoader,
};
use material_pipeline::{init_logging, LoggingConfig, MaterialManager, PipelineConfig};

pub const SCREEN_SHADER: &str = r#"
Shader "Screen"
{
    Pass
    {
        Name "DeferredLighting"
        HLSLPROGRAM
        #pragma vertex FullscreenVS
        #pragma fragment LightingPS

        struct VSOut
        {
            float4 position : SV_Position;
            float2 uv : TEXCOORD0;
        };

        VSOut FullscreenVS(float3 position : POSITION, float2 uv : TEXCOORD0)
        {
            VSOut o;
            o.position = float4(position, 1.0);
            o.uv = uv;
            return o;
        }

        float4 LightingPS(VSOut input) : SV_Target
        {
            float4 orm = GBufferORM.Sample(PointClampSampler, input.uv);
            BRDFInput brdf = (BRDFInput)0;
            brdf.albedo = GBufferAlbedo.Sample(PointClampSampler, input.uv).rgb;
            brdf.normal = DecodeNormal(GBufferNormal.Sample(PointClampSampler, input.uv).xyz);
            brdf.lightDir = -LightDirection;
            brdf.lightColor = LightIntensity.xxx;
            brdf.roughness = orm.g;
            brdf.metallic = orm.b;
            float3 color = EvaluateShadingModel(DecodeShadingModel(orm.a), brdf);
            return float4(color, 1.0);
        }
        ENDHLSL
    }
}
"#;

pub const STANDARD_SHADER: &str = r#"
Shader "Standard"
{
    RenderQueue "Deferred"
    Properties
    {
        //# Float Roughness { default(0.7), min(0.0), max(1.0), ui(slider) }
        //# Texture2D BaseColor
    }
    Pass
    {
        Name "GBuffer"
        HLSLPROGRAM
        #pragma vertex VSMain
        #pragma fragment PSMain

        struct VSOut { float4 position : SV_Position; float3 normal : NORMAL; float2 uv : TEXCOORD0; };

        VSOut VSMain(float3 position : POSITION, float3 normal : NORMAL, float2 uv : TEXCOORD0)
        {
            VSOut o;
            o.position = mul(CurrViewProjection, mul(Model, float4(position, 1.0)));
            o.normal = normal;
            o.uv = uv;
            return o;
        }

        GBufferOutput PSMain(VSOut input)
        {
            GBufferOutput o;
            o.Albedo = SAMPLE_BaseColor(input.uv);
            o.Normal = float4(EncodeNormal(input.normal), 0.0);
            o.ORM = float4(1.0, Roughness, 0.0, EncodeShadingModel(SHADING_MODEL_ID));
            o.Motion = float2(0.0, 0.0);
            return o;
        }
        ENDHLSL
    }
}
"#;

pub const TOON_SHADER: &str = r#"
Shader "Toon"
{
    RenderQueue "Deferred"
    Properties
    {
        //# Vector3 ShadeColor { default(0.2, 0.2, 0.4) }
        //# Int Bands { default(3) }
    }
    ShadingModel
    {
        shadingmodel = 7;
        BRDF = MyBRDF(input);
        BRDF
        {
            float3 MyBRDF(BRDFInput input)
            {
                float ndotl = saturate(dot(input.normal, input.lightDir));
                return input.albedo * floor(ndotl * 3.0) / 3.0 * input.lightColor;
            }
        }
    }
    Pass
    {
        Name "GBuffer"
        HLSLPROGRAM
        #pragma vertex VSMain
        #pragma fragment PSMain
        float4 VSMain(float3 position : POSITION) : SV_Position { return mul(CurrViewProjection, float4(position, 1.0)); }
        GBufferOutput PSMain()
        {
            GBufferOutput o = (GBufferOutput)0;
            o.Albedo = float4(ShadeColor, 1.0);
            o.ORM.a = EncodeShadingModel(SHADING_MODEL_ID);
            return o;
        }
        ENDHLSL
    }
}
"#;

pub const SKY_SHADER: &str = r#"
Shader "Sky"
{
    Pass
    {
        Name "Sky"
        HLSLPROGRAM
        #pragma vertex SkyVS
        #pragma fragment SkyPS
        float4 SkyVS(float3 position : POSITION) : SV_Position { return float4(position, 1.0); }
        float4 SkyPS() : SV_Target { return SkyLightColor * SkyLightIntensity; }
        ENDHLSL
    }
}
"#;

pub const UNLIT_SHADER: &str = r#"
Shader "Unlit"
{
    RenderQueue "Forward"
    Properties
    {
        //# Vector4 Tint { default(1, 1, 1, 1) }
        //# Float Exposure { default(1.0) }
        //# Int Mode
        //# Bool Additive { default(false) }
        //# Texture2D MainTex
        //# TextureCube Reflection
    }
    Pass
    {
        Name "Forward"
        HLSLPROGRAM
        #pragma vertex VSMain
        #pragma fragment PSMain
        float4 VSMain(float3 position : POSITION) : SV_Position { return mul(CurrViewProjection, float4(position, 1.0)); }
        float4 PSMain() : SV_Target { return Tint * Exposure; }
        ENDHLSL
    }
}
"#;

pub type TestManager = MaterialManager<DummyDescriptorHeap, DummyTextureLoader>;

/// Manager with every test shader registered in memory, plus dummy collaborators.
pub struct TestContext {
    pub device: DummyDevice,
    pub ctx: DummyCommandContext,
    pub manager: TestManager,
}

impl TestContext {
    pub fn new() -> Self {
        Self::with_config(PipelineConfig::default())
    }

    pub fn with_config(config: PipelineConfig) -> Self {
        init_logging(LoggingConfig::test());

        let mut manager = MaterialManager::new(
            config,
            DummyDescriptorHeap::new(),
            DummyTextureLoader::new(),
        );
        let sources = manager.sources_mut();
        sources.register("Screen", SCREEN_SHADER);
        sources.register("Standard", STANDARD_SHADER);
        sources.register("Toon", TOON_SHADER);
        sources.register("Sky", SKY_SHADER);
        sources.register("Unlit", UNLIT_SHADER);

        Self {
            device: DummyDevice::new(),
            ctx: DummyCommandContext::new(),
            manager,
        }
    }
}
