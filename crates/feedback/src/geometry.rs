use crate::host::GpuHost;
use crate::viewport::SurfaceSize;

/// Two triangles, three vertices each.
pub const QUAD_VERTEX_COUNT: u32 = 6;

/// Full-surface quad in pixel space as an interleaved `x, y` list.
///
/// The winding is clockwise once the vertex stage flips Y, which is the
/// orientation the renderer treats as front facing.
pub fn build_quad(width: u32, height: u32) -> [f32; 12] {
    let w = width as f32;
    let h = height as f32;
    [
        0.0, 0.0, //
        w, 0.0, //
        0.0, h, //
        0.0, h, //
        w, 0.0, //
        w, h,
    ]
}

/// Vertex buffer holding the quad for one surface size.
pub struct GeometryBuffer<H: GpuHost> {
    buffer: H::VertexBuffer,
    size: SurfaceSize,
}

impl<H: GpuHost> GeometryBuffer<H> {
    pub fn upload(host: &mut H, size: SurfaceSize) -> Self {
        let vertices = build_quad(size.width, size.height);
        Self {
            buffer: host.create_vertex_buffer(&vertices),
            size,
        }
    }

    pub fn buffer(&self) -> &H::VertexBuffer {
        &self.buffer
    }

    pub fn size(&self) -> SurfaceSize {
        self.size
    }

    pub fn release(self, host: &mut H) {
        host.release_vertex_buffer(self.buffer);
    }
}
