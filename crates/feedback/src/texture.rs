//! The single texture that is both sampled by the effect and rewritten with
//! the previous frame's pixels.

use crate::error::{ImageDecodeError, SizeMismatchError};
use crate::host::{GpuHost, Sampling};

/// Opaque blue, shown until the seed image arrives.
pub const PLACEHOLDER_PIXEL: [u8; 4] = [0, 0, 255, 255];

pub const BYTES_PER_PIXEL: usize = 4;

/// Byte length of a tightly packed RGBA8 image.
pub fn rgba_len(width: u32, height: u32) -> usize {
    width as usize * height as usize * BYTES_PER_PIXEL
}

/// Decoded seed image, tightly packed RGBA8.
#[derive(Clone, PartialEq, Eq)]
pub struct SeedImage {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl SeedImage {
    pub fn new(width: u32, height: u32, pixels: Vec<u8>) -> Result<Self, ImageDecodeError> {
        if width == 0 || height == 0 {
            return Err(ImageDecodeError(format!(
                "seed image has empty dimensions {width}x{height}"
            )));
        }
        let expected = rgba_len(width, height);
        if pixels.len() != expected {
            return Err(ImageDecodeError(format!(
                "seed image {width}x{height} carries {} bytes, expected {expected}",
                pixels.len()
            )));
        }
        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }
}

impl std::fmt::Debug for SeedImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SeedImage")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("bytes", &self.pixels.len())
            .finish()
    }
}

/// Which content the texture currently holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextureRole {
    Placeholder,
    Seed,
    Feedback,
}

pub struct FeedbackTexture<H: GpuHost> {
    handle: H::Texture,
    width: u32,
    height: u32,
    role: TextureRole,
}

impl<H: GpuHost> FeedbackTexture<H> {
    /// Creates the 1x1 opaque-blue placeholder so a valid texture is bound
    /// before the seed image finishes loading.
    pub fn allocate(host: &mut H) -> Self {
        let mut handle = host.create_texture();
        host.upload_texture(&mut handle, 1, 1, &PLACEHOLDER_PIXEL);
        host.set_sampling(&mut handle, Sampling::PLACEHOLDER);
        Self {
            handle,
            width: 1,
            height: 1,
            role: TextureRole::Placeholder,
        }
    }

    /// Replaces the placeholder with the decoded seed and applies the
    /// variant's sampling policy.
    pub fn load_seed(&mut self, host: &mut H, seed: &SeedImage, sampling: Sampling) {
        host.upload_texture(&mut self.handle, seed.width, seed.height, &seed.pixels);
        host.set_sampling(&mut self.handle, sampling);
        self.width = seed.width;
        self.height = seed.height;
        self.role = TextureRole::Seed;
    }

    /// Overwrites the pixel store with a frame snapshot. A buffer of the
    /// wrong length is rejected and the previous contents stay untouched.
    pub fn write_back(
        &mut self,
        host: &mut H,
        pixels: &[u8],
        width: u32,
        height: u32,
    ) -> Result<(), SizeMismatchError> {
        let expected = rgba_len(width, height);
        if pixels.len() != expected {
            return Err(SizeMismatchError {
                width,
                height,
                expected,
                actual: pixels.len(),
            });
        }
        host.upload_texture(&mut self.handle, width, height, pixels);
        self.width = width;
        self.height = height;
        self.role = TextureRole::Feedback;
        Ok(())
    }

    pub fn handle(&self) -> &H::Texture {
        &self.handle
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn role(&self) -> TextureRole {
        self.role
    }

    pub fn release(self, host: &mut H) {
        host.release_texture(self.handle);
    }
}
