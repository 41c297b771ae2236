use bytemuck::{Pod, Zeroable};
use feedback::Uniforms;

/// std140 image of the `EffectParams` block: `vec2 resolution; float time;`
/// padded to a 16-byte boundary.
#[repr(C, align(16))]
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct EffectUniforms {
    pub resolution: [f32; 2],
    pub time: f32,
    pub _padding: f32,
}

unsafe impl Zeroable for EffectUniforms {}
unsafe impl Pod for EffectUniforms {}

impl From<&Uniforms> for EffectUniforms {
    fn from(uniforms: &Uniforms) -> Self {
        Self {
            resolution: uniforms.resolution,
            time: uniforms.time,
            _padding: 0.0,
        }
    }
}

pub(crate) const EFFECT_UNIFORMS_SIZE: u64 = std::mem::size_of::<EffectUniforms>() as u64;

#[cfg(test)]
mod tests {
    use super::*;
    use feedback::SurfaceSize;

    #[test]
    fn layout_matches_std140_block() {
        assert_eq!(EFFECT_UNIFORMS_SIZE, 16);
        assert_eq!(std::mem::align_of::<EffectUniforms>(), 16);
        assert_eq!(std::mem::offset_of!(EffectUniforms, time), 8);
    }

    #[test]
    fn converts_core_uniforms() {
        let core = Uniforms::new(SurfaceSize::new(400, 256)).with_time(12);
        let gpu = EffectUniforms::from(&core);
        let bytes = bytemuck::bytes_of(&gpu);
        assert_eq!(bytes.len(), 16);
        assert_eq!(gpu.resolution, [400.0, 256.0]);
        assert_eq!(gpu.time, 12.0);
    }
}
