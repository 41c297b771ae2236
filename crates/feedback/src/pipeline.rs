use tracing::info;

use crate::effect::EffectVariant;
use crate::error::PipelineError;
use crate::geometry::GeometryBuffer;
use crate::host::{BuildId, GpuHost};
use crate::program::ShaderProgram;
use crate::texture::FeedbackTexture;
use crate::uniforms::Uniforms;
use crate::viewport::SurfaceSize;

/// GPU objects owned by one build. Released together on rebuild or teardown.
pub struct Pipeline<H: GpuHost> {
    build: BuildId,
    size: SurfaceSize,
    variant: EffectVariant,
    program: ShaderProgram<H>,
    geometry: GeometryBuffer<H>,
    texture: FeedbackTexture<H>,
}

impl<H: GpuHost> Pipeline<H> {
    /// Sizes the surface, links the program, uploads the quad and binds the
    /// placeholder texture with `time = 0`.
    pub fn build(
        host: &mut H,
        build: BuildId,
        size: SurfaceSize,
        variant: EffectVariant,
    ) -> Result<Self, PipelineError> {
        host.configure_surface(size);
        let program =
            ShaderProgram::build(host, variant.vertex_source(), variant.fragment_source())?;
        let geometry = GeometryBuffer::upload(host, size);
        let texture = FeedbackTexture::allocate(host);
        host.push_uniforms(program.handle(), &Uniforms::new(size));

        info!(
            %build,
            width = size.width,
            height = size.height,
            %variant,
            "pipeline built"
        );

        Ok(Self {
            build,
            size,
            variant,
            program,
            geometry,
            texture,
        })
    }

    pub fn build_id(&self) -> BuildId {
        self.build
    }

    pub fn size(&self) -> SurfaceSize {
        self.size
    }

    pub fn variant(&self) -> EffectVariant {
        self.variant
    }

    pub fn program(&self) -> &ShaderProgram<H> {
        &self.program
    }

    pub fn geometry(&self) -> &GeometryBuffer<H> {
        &self.geometry
    }

    pub fn texture(&self) -> &FeedbackTexture<H> {
        &self.texture
    }

    pub fn texture_mut(&mut self) -> &mut FeedbackTexture<H> {
        &mut self.texture
    }

    pub fn release(self, host: &mut H) {
        self.program.release(host);
        self.geometry.release(host);
        self.texture.release(host);
    }
}
