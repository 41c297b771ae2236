use std::sync::Arc;

use feedback::{EffectVariant, DEFAULT_LOGICAL_HEIGHT};

/// Where the first texture contents of every build come from.
#[derive(Clone)]
pub enum SeedInput {
    /// Encoded image bytes (png, jpeg, bmp or gif), decoded once per build.
    Image(Arc<[u8]>),
    /// Deterministic RGBA noise generated at the surface size.
    Noise { seed: u64 },
}

impl SeedInput {
    pub fn describe(&self) -> String {
        match self {
            SeedInput::Image(bytes) => format!("image ({} bytes)", bytes.len()),
            SeedInput::Noise { seed } => format!("noise (seed {seed})"),
        }
    }
}

impl std::fmt::Debug for SeedInput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.describe())
    }
}

impl Default for SeedInput {
    fn default() -> Self {
        SeedInput::Noise { seed: 0 }
    }
}

/// Configuration passed from the CLI into the renderer.
#[derive(Debug, Clone)]
pub struct RendererConfig {
    pub variant: EffectVariant,
    /// Fixed canvas height; width follows the window aspect ratio.
    pub logical_height: u32,
    /// Initial inner size of the window in physical pixels.
    pub window_size: (u32, u32),
    pub seed: SeedInput,
    pub title: String,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            variant: EffectVariant::default(),
            logical_height: DEFAULT_LOGICAL_HEIGHT,
            window_size: (1280, 720),
            seed: SeedInput::default(),
            title: "acidwall".to_string(),
        }
    }
}
