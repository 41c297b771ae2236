//! Seed image production off the event-loop thread.

use std::thread;

use feedback::{BuildId, ImageDecodeError, SeedDelivery, SeedImage, SeedSource, SurfaceSize};
use image::imageops::FilterType;
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use winit::event_loop::EventLoopProxy;

use crate::types::SeedInput;

const SEED_FILTER: FilterType = FilterType::Triangle;

/// Decodes or generates the seed on a worker thread and posts the result
/// back to the event loop as a user event. Seeds never exceed
/// `max_dimension` on either side.
pub(crate) struct ThreadedSeedSource {
    input: SeedInput,
    max_dimension: u32,
    proxy: EventLoopProxy<SeedDelivery>,
}

impl ThreadedSeedSource {
    pub(crate) fn new(
        input: SeedInput,
        max_dimension: u32,
        proxy: EventLoopProxy<SeedDelivery>,
    ) -> Self {
        Self {
            input,
            max_dimension,
            proxy,
        }
    }
}

impl SeedSource for ThreadedSeedSource {
    fn request_seed(&mut self, build: BuildId, size: SurfaceSize) {
        let input = self.input.clone();
        let max_dimension = self.max_dimension;
        let proxy = self.proxy.clone();
        let spawned = thread::Builder::new()
            .name(format!("acidwall-seed-{}", build.0))
            .spawn(move || {
                let result = produce_seed(&input, size, max_dimension);
                if proxy.send_event(SeedDelivery { build, result }).is_err() {
                    tracing::debug!(%build, "event loop closed before seed delivery");
                }
            });

        if let Err(err) = spawned {
            tracing::warn!(%build, error = %err, "failed to spawn seed worker");
            let result = Err(ImageDecodeError(format!("seed worker unavailable: {err}")));
            let _ = self.proxy.send_event(SeedDelivery { build, result });
        }
    }
}

pub(crate) fn produce_seed(
    input: &SeedInput,
    size: SurfaceSize,
    max_dimension: u32,
) -> Result<SeedImage, ImageDecodeError> {
    match input {
        SeedInput::Image(bytes) => decode_seed(bytes, max_dimension),
        SeedInput::Noise { seed } => {
            let width = size.width.min(max_dimension);
            let height = size.height.min(max_dimension);
            noise_seed(SurfaceSize::new(width, height), *seed)
        }
    }
}

/// Decodes an encoded image into tightly packed RGBA8, top row first.
/// Images larger than `max_dimension` on either side are scaled down to fit,
/// keeping their aspect ratio.
pub fn decode_seed(bytes: &[u8], max_dimension: u32) -> Result<SeedImage, ImageDecodeError> {
    let mut decoded = image::load_from_memory(bytes)
        .map_err(|err| ImageDecodeError(err.to_string()))?;
    let (width, height) = (decoded.width(), decoded.height());
    if width > max_dimension || height > max_dimension {
        decoded = decoded.resize(max_dimension, max_dimension, SEED_FILTER);
        tracing::warn!(
            width,
            height,
            max_dimension,
            scaled_width = decoded.width(),
            scaled_height = decoded.height(),
            "seed image exceeds GPU texture limits; downscaling"
        );
    }
    let rgba = decoded.to_rgba8();
    let (width, height) = rgba.dimensions();
    SeedImage::new(width, height, rgba.into_raw())
}

/// Opaque RGB noise at `size`, identical for identical `seed` values.
pub fn noise_seed(size: SurfaceSize, seed: u64) -> Result<SeedImage, ImageDecodeError> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut pixels = vec![0u8; feedback::rgba_len(size.width, size.height)];
    rng.fill_bytes(&mut pixels);
    for pixel in pixels.chunks_exact_mut(4) {
        pixel[3] = u8::MAX;
    }
    SeedImage::new(size.width, size.height, pixels)
}
