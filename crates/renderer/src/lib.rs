//! Renderer crate for acidwall.
//!
//! Glues a `winit` window and a `wgpu` device to the host-agnostic feedback
//! core. The overall flow is:
//!
//! ```text
//!   CLI / acidwall
//!          │ RendererConfig
//!          ▼
//!   Renderer::run ──▶ winit event loop ──▶ ViewportController<WgpuHost, _>
//!                        │    ▲                  │ on_resize / on_frame
//!                        │    │ SeedDelivery     ▼
//!                        │    └──── seed worker ◀─ request_seed
//!                        └─ RedrawRequested ──▶ draw ─▶ flush (present) ─▶ read back
//! ```
//!
//! `WgpuHost` owns every GPU resource (surface, device, offscreen target,
//! read-back staging buffer) and implements [`feedback::GpuHost`]. Effect
//! shaders are GLSL 450 compiled through naga; compile and link failures are
//! captured with validation error scopes and reported as diagnostic logs.

mod compile;
mod gpu;
mod seed;
mod types;
mod window;

use anyhow::Result;

pub use gpu::{EffectProgram, EffectShader, EffectTexture, QuadBuffer, WgpuHost};
pub use seed::{decode_seed, noise_seed};
pub use types::{RendererConfig, SeedInput};

/// High-level entry point that owns the chosen configuration.
pub struct Renderer {
    config: RendererConfig,
}

impl Renderer {
    pub fn new(config: RendererConfig) -> Self {
        Self { config }
    }

    /// Opens the window and renders until it is closed. Returns an error if
    /// no window or GPU device can be created.
    pub fn run(&mut self) -> Result<()> {
        window::run_window(&self.config)
    }
}
