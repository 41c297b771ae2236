//! Frame feedback core for the acidwall wallpaper.
//!
//! Every frame the effect shader samples a single texture, draws a
//! full-surface quad, and (for the feedback variant) the rendered pixels are
//! read back and written into that same texture for the next frame:
//!
//! ```text
//!   window resize ──▶ ViewportController::on_resize
//!                        │ cancel + release old build, BuildId += 1
//!                        ▼
//!                     Pipeline::build ──▶ ShaderProgram / GeometryBuffer /
//!                        │                FeedbackTexture (1x1 blue)
//!                        ├──▶ SeedSource::request_seed ···▶ on_seed_loaded
//!                        ▼
//!                     RenderLoop::on_frame ─▶ bind ─▶ draw ─▶ flush
//!                        ▲                                   │
//!                        └── request_frame ◀─ time += 1 ◀── read back,
//!                                                           write back
//! ```
//!
//! The crate never touches a GPU API directly. A renderer implements
//! [`GpuHost`] and drives the [`ViewportController`] from its event loop.

mod effect;
mod error;
mod geometry;
mod host;
mod pipeline;
mod program;
mod render_loop;
mod texture;
mod uniforms;
mod viewport;

#[cfg(test)]
mod mock;

pub use effect::{EffectVariant, SCROLL_FPS};
pub use error::{HostError, ImageDecodeError, PipelineError, SizeMismatchError};
pub use geometry::{build_quad, GeometryBuffer, QUAD_VERTEX_COUNT};
pub use host::{
    BuildId, FilterMode, FrameToken, GpuHost, Sampling, SeedDelivery, SeedSource, ShaderKind,
    WrapMode,
};
pub use pipeline::Pipeline;
pub use program::ShaderProgram;
pub use render_loop::{FrameOutcome, LoopState, RenderLoop};
pub use texture::{
    rgba_len, FeedbackTexture, SeedImage, TextureRole, BYTES_PER_PIXEL, PLACEHOLDER_PIXEL,
};
pub use uniforms::Uniforms;
pub use viewport::{
    compute_surface_size, SeedOutcome, SurfaceSize, ViewportController, DEFAULT_LOGICAL_HEIGHT,
};
