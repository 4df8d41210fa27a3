use std::borrow::Cow;

use wgpu::naga::ShaderStage;

use crate::types::RenderSetupError;

/// Compiles the static full-screen triangle vertex shader.
pub(crate) fn compile_vertex_shader(device: &wgpu::Device) -> wgpu::ShaderModule {
    device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some("fullscreen triangle vertex"),
        source: wgpu::ShaderSource::Glsl {
            shader: Cow::Borrowed(VERTEX_SHADER_GLSL),
            stage: ShaderStage::Vertex,
            defines: &[],
        },
    })
}

/// Compiles the background program once per mount. Validation failures are
/// caught in an error scope and reported instead of aborting the process.
pub(crate) fn compile_fragment_shader(
    device: &wgpu::Device,
) -> Result<wgpu::ShaderModule, RenderSetupError> {
    device.push_error_scope(wgpu::ErrorFilter::Validation);
    let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some("hero background fragment"),
        source: wgpu::ShaderSource::Glsl {
            shader: Cow::Borrowed(BACKGROUND_FRAGMENT_GLSL),
            stage: ShaderStage::Fragment,
            defines: &[],
        },
    });
    match pollster::block_on(device.pop_error_scope()) {
        Some(err) => Err(RenderSetupError::Shader(err.to_string())),
        None => Ok(module),
    }
}

/// Background fragment program.
///
/// The uniform block layout must match `BackgroundUniforms` in
/// `gpu/uniforms.rs`. Colors are `vec4` so no member relies on vec3 packing.
pub const BACKGROUND_FRAGMENT_GLSL: &str = r"#version 450
layout(location = 0) in vec2 v_uv;
layout(location = 0) out vec4 outColor;

layout(std140, set = 0, binding = 0) uniform BackgroundParams {
    float _uTime;
    float _uFlowTime;
    vec2 _uRes;
    vec2 _uMouse;
    vec2 _padding0;
    vec4 _uColor1;
    vec4 _uColor2;
    vec4 _uColor3;
    vec4 _uColor4;
} ubo;

#define uTime ubo._uTime
#define uFlowTime ubo._uFlowTime
#define uRes ubo._uRes
#define uMouse ubo._uMouse

const float ZOOM = 7.0;
const float POINTER_INFLUENCE = 0.2;
const float PI = 3.14159265;

float rand(vec2 p) {
    return fract(sin(dot(p, vec2(12.9898, 78.233))) * 43758.5453);
}

vec2 bound01(vec2 p) {
    return fract((p + vec2(1.0)) * 0.5) * 2.0 - vec2(1.0);
}

vec2 warpSineFeedback(vec2 p, float t, vec2 mouse01) {
    float scale = 2.5;
    float freq = 2.5;
    float gain = 1.23;

    vec2 phase = (mouse01 - vec2(0.5)) * PI
        + vec2(0.15 * sin(t * 0.4), 0.15 * cos(t * 0.4));

    p = (p + vec2(3.0)) * scale;

    for (int i = 0; i < 3; i++) {
        p += cos(p.yx * freq + vec2(t, 1.57) + phase) / vec2(3.0);
        p += sin(p.yx + vec2(t) + vec2(1.57, 0.0) - phase.yx) / vec2(2.0);
        p *= gain;
    }

    return bound01(p);
}

void main() {
    vec2 p = v_uv - vec2(0.5);
    float aspect = uRes.x / uRes.y;
    p.x *= aspect;
    p /= vec2(ZOOM);

    float t = uFlowTime;
    vec2 mouse01 = vec2(0.5) + (uMouse - vec2(0.5)) * POINTER_INFLUENCE;

    vec2 w = warpSineFeedback(p, t, mouse01);

    float field = length(w) / 1.41421356;
    field = smoothstep(0.12, 0.95, field);

    float s1 = 0.28;
    float s2 = 0.58;
    float s3 = 0.82;
    float blend = 0.15;

    float k1 = smoothstep(s1 - blend, s1 + blend, field);
    float k2 = smoothstep(s2 - blend, s2 + blend, field);
    float k3 = smoothstep(s3 - blend, s3 + blend, field);

    float w1 = 1.0 - k1;
    float w2 = k1 * (1.0 - k2);
    float w3 = k2 * (1.0 - k3);
    float w4 = k3;

    vec3 col = ubo._uColor1.rgb * w1
        + ubo._uColor2.rgb * w2
        + ubo._uColor3.rgb * w3
        + ubo._uColor4.rgb * w4;

    float g = rand(v_uv * uRes);
    col += vec3((g - 0.5) * 0.08);

    outColor = vec4(col, 1.0);
}
";

/// Minimal full-screen triangle vertex shader.
const VERTEX_SHADER_GLSL: &str = r"#version 450
layout(location = 0) out vec2 v_uv;

const vec2 positions[3] = vec2[3](
    vec2(-1.0, -3.0),
    vec2(3.0, 1.0),
    vec2(-1.0, 1.0)
);

void main() {
    uint vertex_index = uint(gl_VertexIndex);
    vec2 pos = positions[vertex_index];
    v_uv = pos * 0.5 + vec2(0.5, 0.5);
    gl_Position = vec4(pos, 0.0, 1.0);
}
";
