//! The two acid effect variants: shader sources plus the policy bits that
//! differ between them.
//!
//! Sources are GLSL 450. Binding contract shared with every host:
//! - `set = 0, binding = 0`: std140 block `{ vec2 resolution; float time; }`
//!   visible to both stages;
//! - `set = 1, binding = 0/1`: the feedback texture and its sampler;
//! - vertex attribute `a_position` (pixel space `vec2`) at location 0.

use crate::host::{FilterMode, Sampling, WrapMode};

/// Frames per scroll cycle unit, shared with the fragment sources.
pub const SCROLL_FPS: f32 = 60.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum EffectVariant {
    /// Full video feedback. Every frame is read back and becomes
    /// the next frame's input; output is thresholded to black and white.
    #[default]
    Feedback,
    /// Samples a scrolling window of the static seed with hashed
    /// per-pixel jitter. No read-back.
    Noise,
}

impl EffectVariant {
    pub fn vertex_source(self) -> &'static str {
        VERTEX_SHADER_GLSL
    }

    pub fn fragment_source(self) -> &'static str {
        match self {
            EffectVariant::Feedback => FEEDBACK_FRAGMENT_GLSL,
            EffectVariant::Noise => NOISE_FRAGMENT_GLSL,
        }
    }

    /// Whether each frame is read back into the texture.
    pub fn uses_feedback(self) -> bool {
        matches!(self, EffectVariant::Feedback)
    }

    /// Sampling applied once the seed image is loaded.
    pub fn seed_sampling(self) -> Sampling {
        let mag_filter = match self {
            EffectVariant::Feedback => FilterMode::Linear,
            EffectVariant::Noise => FilterMode::Nearest,
        };
        Sampling {
            wrap: WrapMode::Repeat,
            min_filter: FilterMode::Nearest,
            mag_filter,
        }
    }

    /// Horizontal texture offset the fragment stage applies at `time`,
    /// i.e. `mod(time / 10, 60) / 60`. Repeats every 600 frames.
    pub fn scroll_offset(time: f32) -> f32 {
        (time / 10.0).rem_euclid(SCROLL_FPS) / SCROLL_FPS
    }

    pub fn name(self) -> &'static str {
        match self {
            EffectVariant::Feedback => "feedback",
            EffectVariant::Noise => "noise",
        }
    }
}

impl std::fmt::Display for EffectVariant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

const VERTEX_SHADER_GLSL: &str = r"#version 450
layout(location = 0) in vec2 a_position;
layout(location = 0) out vec2 v_texcoord;

layout(std140, set = 0, binding = 0) uniform EffectParams {
    vec2 resolution;
    float time;
} params;

void main() {
    vec2 zeroToOne = a_position / params.resolution;
    vec2 zeroToTwo = zeroToOne * 2.0;
    vec2 clipSpace = zeroToTwo - 1.0;

    gl_Position = vec4(clipSpace * vec2(1.0, -1.0), 0.0, 1.0);
    v_texcoord = zeroToOne;
}
";

const FEEDBACK_FRAGMENT_GLSL: &str = r"#version 450
layout(location = 0) in vec2 v_texcoord;
layout(location = 0) out vec4 outColor;

layout(std140, set = 0, binding = 0) uniform EffectParams {
    vec2 resolution;
    float time;
} params;

layout(set = 1, binding = 0) uniform texture2D u_texture;
layout(set = 1, binding = 1) uniform sampler u_sampler;

const float FPS = 60.0;

vec4 getPixel(vec2 position) {
    return texture(sampler2D(u_texture, u_sampler), position);
}

void main() {
    // Framebuffer origin is top-left; the effect is defined bottom-left.
    vec2 fragCoord = vec2(gl_FragCoord.x, params.resolution.y - gl_FragCoord.y);
    vec2 st = fragCoord / params.resolution;

    float aspect = params.resolution.x / params.resolution.y;
    st.x *= aspect;
    st.x += cos(st.x * 10.0) * sin(st.y * 10.0) * sin(st.x * 10.0) * cos(st.y * 10.0);

    float scroll = mod(params.time / 10.0, FPS) / FPS;
    vec4 noise = getPixel(vec2(st.x + scroll, st.y));

    float show = float(noise.b > 0.4);
    outColor = vec4(vec3(show), 1.0);
}
";

const NOISE_FRAGMENT_GLSL: &str = r"#version 450
layout(location = 0) in vec2 v_texcoord;
layout(location = 0) out vec4 outColor;

layout(std140, set = 0, binding = 0) uniform EffectParams {
    vec2 resolution;
    float time;
} params;

layout(set = 1, binding = 0) uniform texture2D u_texture;
layout(set = 1, binding = 1) uniform sampler u_sampler;

const float FPS = 60.0;
const float PHI = 1.61803398874989484820459;

vec4 getPixel(vec2 position) {
    return texture(sampler2D(u_texture, u_sampler), position);
}

float rand(in vec2 xy, in float seed) {
    return fract(tan(distance(xy * PHI, xy) * seed) * xy.x);
}

void main() {
    vec2 fragCoord = vec2(gl_FragCoord.x, params.resolution.y - gl_FragCoord.y);
    vec2 st = fragCoord / params.resolution;
    st.x *= params.resolution.x / params.resolution.y;

    float onx = 1.0 / params.resolution.x;
    float ony = 1.0 / params.resolution.y;
    float seed = fract(params.time * sin(params.resolution.x) * sin(params.resolution.y));

    vec2 jitter = vec2(
        rand(fragCoord + 1.0, seed + 0.31) - 0.5,
        rand(fragCoord.yx + 1.0, seed + 0.73) - 0.5
    ) * vec2(onx, ony) * 6.0;

    float warp = sin(st.y * 12.0 + params.time * 0.05) * 0.01;
    float scroll = mod(params.time / 10.0, FPS) / FPS;
    vec2 uv = vec2(st.x + scroll + warp, st.y);

    float r = getPixel(uv + jitter).r;
    float g = getPixel(uv).g;
    float b = getPixel(uv - jitter).b;
    outColor = vec4(r, g, b, 1.0);
}
";
