//! Synchronous copy of the render target into CPU memory.

use std::sync::mpsc;

use anyhow::{anyhow, Context, Result};
use feedback::{SurfaceSize, BYTES_PER_PIXEL};

/// Row pitch of a texture-to-buffer copy. wgpu requires every row of the
/// staging buffer to start on a `COPY_BYTES_PER_ROW_ALIGNMENT` boundary.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct RowLayout {
    pub unpadded_bytes_per_row: u32,
    pub padded_bytes_per_row: u32,
    pub height: u32,
}

impl RowLayout {
    pub(crate) fn new(size: SurfaceSize) -> Self {
        let unpadded_bytes_per_row = size.width * BYTES_PER_PIXEL as u32;
        Self {
            unpadded_bytes_per_row,
            padded_bytes_per_row: align_to(
                unpadded_bytes_per_row,
                wgpu::COPY_BYTES_PER_ROW_ALIGNMENT,
            ),
            height: size.height,
        }
    }

    pub(crate) fn buffer_size(&self) -> u64 {
        u64::from(self.padded_bytes_per_row) * u64::from(self.height)
    }

    pub(crate) fn unpadded_len(&self) -> usize {
        self.unpadded_bytes_per_row as usize * self.height as usize
    }

    /// Strips the row padding and reverses row order, so the first row of
    /// `out` is the bottom row of the frame.
    pub(crate) fn unpad_bottom_up(&self, padded: &[u8], out: &mut [u8]) {
        let row = self.unpadded_bytes_per_row as usize;
        for (index, chunk) in padded
            .chunks(self.padded_bytes_per_row as usize)
            .take(self.height as usize)
            .enumerate()
        {
            let dst_row = self.height as usize - 1 - index;
            let dst_start = dst_row * row;
            out[dst_start..dst_start + row].copy_from_slice(&chunk[..row]);
        }
    }
}

fn align_to(value: u32, alignment: u32) -> u32 {
    value.div_ceil(alignment) * alignment
}

/// Staging buffer reused across frames of the same size.
pub(crate) struct ReadbackBuffer {
    buffer: wgpu::Buffer,
    layout: RowLayout,
    size: SurfaceSize,
}

impl ReadbackBuffer {
    pub(crate) fn new(device: &wgpu::Device, size: SurfaceSize) -> Self {
        let layout = RowLayout::new(size);
        let buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("acidwall readback buffer"),
            size: layout.buffer_size(),
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });
        Self {
            buffer,
            layout,
            size,
        }
    }

    pub(crate) fn size(&self) -> SurfaceSize {
        self.size
    }

    /// Copies `source` into the staging buffer, waits for the GPU and writes
    /// tightly packed bottom-up rows into `out`.
    pub(crate) fn read(
        &self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        source: &wgpu::Texture,
        out: &mut [u8],
    ) -> Result<()> {
        if out.len() != self.layout.unpadded_len() {
            return Err(anyhow!(
                "read-back destination holds {} bytes, {} needs {}",
                out.len(),
                self.size,
                self.layout.unpadded_len()
            ));
        }

        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("acidwall readback encoder"),
        });
        encoder.copy_texture_to_buffer(
            wgpu::TexelCopyTextureInfo {
                texture: source,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::TexelCopyBufferInfo {
                buffer: &self.buffer,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(self.layout.padded_bytes_per_row),
                    rows_per_image: Some(self.layout.height),
                },
            },
            wgpu::Extent3d {
                width: self.size.width,
                height: self.size.height,
                depth_or_array_layers: 1,
            },
        );
        queue.submit(Some(encoder.finish()));

        let slice = self.buffer.slice(..);
        let (sender, receiver) = mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = sender.send(result);
        });
        device
            .poll(wgpu::PollType::Wait)
            .map_err(|err| anyhow!("device poll failed: {err}"))?;
        receiver
            .recv()
            .map_err(|_| anyhow!("failed receiving GPU map callback"))?
            .context("GPU buffer mapping failed")?;

        {
            let mapped = slice.get_mapped_range();
            self.layout.unpad_bottom_up(&mapped, out);
        }
        self.buffer.unmap();
        Ok(())
    }

    pub(crate) fn destroy(&self) {
        self.buffer.destroy();
    }
}
