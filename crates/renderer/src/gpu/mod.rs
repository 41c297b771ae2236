//! `wgpu` side of the feedback host.
//!
//! - `context` owns the instance, device and swapchain and reconfigures the
//!   swapchain when the window resizes.
//! - `texture` holds the sampled feedback texture and the offscreen render
//!   target the effect draws into.
//! - `readback` copies the render target into CPU memory with padded rows.
//! - `present` blits the render target onto the swapchain image.
//! - `uniforms` mirrors the effect's std140 uniform block.
//! - `host` implements [`feedback::GpuHost`] on top of all of the above.

mod context;
mod host;
mod present;
mod readback;
mod texture;
mod uniforms;

pub use host::{EffectProgram, EffectShader, QuadBuffer, WgpuHost};
pub use texture::EffectTexture;
