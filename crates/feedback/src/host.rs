//! Capability interface between the feedback core and whatever owns the GPU.
//!
//! The core only ever talks to a [`GpuHost`]. Handles are associated types so
//! they can only be minted by the host, and every allocation has a matching
//! `release_*` call: the core releases what it owns explicitly instead of
//! leaning on finalisers.

use std::fmt;

use crate::error::HostError;
use crate::texture::SeedImage;
use crate::uniforms::Uniforms;
use crate::viewport::SurfaceSize;

/// Shader stage of a compiled source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderKind {
    Vertex,
    Fragment,
}

impl fmt::Display for ShaderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShaderKind::Vertex => f.write_str("vertex"),
            ShaderKind::Fragment => f.write_str("fragment"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WrapMode {
    Repeat,
    ClampToEdge,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterMode {
    Nearest,
    Linear,
}

/// Sampling state attached to a texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Sampling {
    pub wrap: WrapMode,
    pub min_filter: FilterMode,
    pub mag_filter: FilterMode,
}

impl Sampling {
    /// Sampling used for the 1x1 placeholder before any seed arrives.
    pub const PLACEHOLDER: Sampling = Sampling {
        wrap: WrapMode::Repeat,
        min_filter: FilterMode::Nearest,
        mag_filter: FilterMode::Nearest,
    };
}

impl Default for Sampling {
    fn default() -> Self {
        Self::PLACEHOLDER
    }
}

/// Token handed out by the host's per-display-refresh scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameToken(pub u64);

/// Narrow view of the drawable surface and GPU the feedback loop needs.
pub trait GpuHost {
    type Shader;
    type Program;
    type VertexBuffer;
    type Texture;

    /// Pixel dimensions of the render target read back each frame.
    fn surface_size(&self) -> SurfaceSize;
    /// Resizes the render target and viewport.
    fn configure_surface(&mut self, size: SurfaceSize);

    fn create_shader(&mut self, kind: ShaderKind) -> Self::Shader;
    /// Compiles `source` into `shader`, returning the diagnostic log on failure.
    fn compile_shader(&mut self, shader: &mut Self::Shader, source: &str) -> Result<(), String>;
    fn release_shader(&mut self, shader: Self::Shader);

    /// Allocates a program object with both stages attached.
    fn create_program(&mut self, vertex: &Self::Shader, fragment: &Self::Shader) -> Self::Program;
    /// Links `program`, returning the diagnostic log on failure.
    fn link_program(&mut self, program: &mut Self::Program) -> Result<(), String>;
    fn release_program(&mut self, program: Self::Program);

    fn create_vertex_buffer(&mut self, vertices: &[f32]) -> Self::VertexBuffer;
    fn release_vertex_buffer(&mut self, buffer: Self::VertexBuffer);

    fn create_texture(&mut self) -> Self::Texture;
    /// Replaces the texture's pixel store; `pixels` is tightly packed RGBA8.
    fn upload_texture(
        &mut self,
        texture: &mut Self::Texture,
        width: u32,
        height: u32,
        pixels: &[u8],
    );
    fn set_sampling(&mut self, texture: &mut Self::Texture, sampling: Sampling);
    fn release_texture(&mut self, texture: Self::Texture);

    /// Makes `program` current and binds `texture` as its sampler input.
    fn bind(&mut self, program: &Self::Program, texture: &Self::Texture) -> Result<(), HostError>;
    fn push_uniforms(&mut self, program: &Self::Program, uniforms: &Uniforms);
    fn draw(&mut self, program: &Self::Program, vertices: &Self::VertexBuffer, vertex_count: u32);
    /// Forces submitted commands to complete before anything is read back.
    fn flush(&mut self);
    /// Copies the render target into `out`, rows ordered bottom to top.
    fn read_pixels(&mut self, size: SurfaceSize, out: &mut [u8]) -> Result<(), HostError>;

    /// Schedules one callback on the next display refresh.
    fn request_frame(&mut self) -> FrameToken;
    /// Cancels a callback that has not run yet. Unknown tokens are ignored.
    fn cancel_frame(&mut self, token: FrameToken);
}

/// Identifies one pipeline build. Every rebuild gets the next value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BuildId(pub u64);

impl BuildId {
    pub fn next(self) -> Self {
        BuildId(self.0.wrapping_add(1))
    }
}

impl fmt::Display for BuildId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Asynchronous provider of the seed image.
///
/// `request_seed` must return immediately; the result is delivered later
/// through `ViewportController::on_seed_loaded` tagged with the same build.
pub trait SeedSource {
    fn request_seed(&mut self, build: BuildId, size: SurfaceSize);
}

/// Completion of a seed load, as posted back to the controller.
#[derive(Debug)]
pub struct SeedDelivery {
    pub build: BuildId,
    pub result: Result<SeedImage, crate::error::ImageDecodeError>,
}
