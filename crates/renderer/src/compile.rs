use std::borrow::Cow;

use anyhow::{anyhow, Result};
use feedback::ShaderKind;
use wgpu::naga::ShaderStage;

/// Compiles a GLSL 450 stage through naga, returning the validation log on
/// failure instead of letting wgpu's uncaptured-error handler panic.
pub(crate) fn compile_glsl(
    device: &wgpu::Device,
    kind: ShaderKind,
    source: &str,
) -> Result<wgpu::ShaderModule, String> {
    let stage = match kind {
        ShaderKind::Vertex => ShaderStage::Vertex,
        ShaderKind::Fragment => ShaderStage::Fragment,
    };
    let label = format!("acidwall {kind}");
    with_validation_scope(device, || {
        device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(&label),
            source: wgpu::ShaderSource::Glsl {
                shader: Cow::Owned(source.to_owned()),
                stage,
                defines: &[],
            },
        })
    })
}

/// Runs `build` inside a validation error scope and turns a captured error
/// into its diagnostic text.
pub(crate) fn with_validation_scope<T>(
    device: &wgpu::Device,
    build: impl FnOnce() -> T,
) -> Result<T, String> {
    device.push_error_scope(wgpu::ErrorFilter::Validation);
    let value = build();
    match pollster::block_on(device.pop_error_scope()) {
        Some(err) => Err(err.to_string()),
        None => Ok(value),
    }
}

/// Compiles the fullscreen blit used to put the offscreen target on screen.
pub(crate) fn compile_present_shaders(
    device: &wgpu::Device,
) -> Result<(wgpu::ShaderModule, wgpu::ShaderModule)> {
    let vertex = compile_glsl(device, ShaderKind::Vertex, PRESENT_VERTEX_GLSL)
        .map_err(|log| anyhow!("failed to compile present vertex shader: {log}"))?;
    let fragment = compile_glsl(device, ShaderKind::Fragment, PRESENT_FRAGMENT_GLSL)
        .map_err(|log| anyhow!("failed to compile present fragment shader: {log}"))?;
    Ok((vertex, fragment))
}

/// Minimal full-screen triangle vertex shader.
const PRESENT_VERTEX_GLSL: &str = r"#version 450
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

/// Samples the render target. Texture row 0 is the top of the rendered
/// frame while `v_uv.y` grows upwards, hence the flip.
const PRESENT_FRAGMENT_GLSL: &str = r"#version 450
layout(location = 0) in vec2 v_uv;
layout(location = 0) out vec4 outColor;

layout(set = 0, binding = 0) uniform texture2D frame_texture;
layout(set = 0, binding = 1) uniform sampler frame_sampler;

void main() {
    vec2 uv = vec2(v_uv.x, 1.0 - v_uv.y);
    outColor = texture(sampler2D(frame_texture, frame_sampler), uv);
}
";
