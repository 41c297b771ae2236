use crate::viewport::SurfaceSize;

/// Values pushed to the program before every draw.
///
/// `time` is a frame counter, not wall-clock seconds: it grows by exactly one
/// per completed frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Uniforms {
    pub resolution: [f32; 2],
    pub time: f32,
}

impl Uniforms {
    pub fn new(size: SurfaceSize) -> Self {
        Self {
            resolution: [size.width as f32, size.height as f32],
            time: 0.0,
        }
    }

    pub fn with_time(mut self, frame: u64) -> Self {
        self.time = frame as f32;
        self
    }
}
