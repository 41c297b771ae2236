use feedback::{FilterMode, Sampling, SurfaceSize, WrapMode};

pub(crate) const TEXTURE_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;

/// Host-side texture handle handed to the feedback core. The GPU texture is
/// recreated whenever an upload changes its dimensions.
pub struct EffectTexture {
    pub(crate) texture: wgpu::Texture,
    pub(crate) view: wgpu::TextureView,
    pub(crate) sampler: wgpu::Sampler,
    pub(crate) sampling: Sampling,
    pub(crate) width: u32,
    pub(crate) height: u32,
}

impl EffectTexture {
    pub(crate) fn new(device: &wgpu::Device, sampling: Sampling) -> Self {
        let texture = create_sampled_texture(device, 1, 1);
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Self {
            texture,
            view,
            sampler: create_sampler(device, sampling),
            sampling,
            width: 1,
            height: 1,
        }
    }

    pub(crate) fn upload(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        width: u32,
        height: u32,
        pixels: &[u8],
    ) {
        if (width, height) != (self.width, self.height) {
            self.texture.destroy();
            self.texture = create_sampled_texture(device, width, height);
            self.view = self
                .texture
                .create_view(&wgpu::TextureViewDescriptor::default());
            self.width = width;
            self.height = height;
        }

        queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &self.texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            pixels,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(width * 4),
                rows_per_image: Some(height),
            },
            wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
        );
    }

    pub(crate) fn set_sampling(&mut self, device: &wgpu::Device, sampling: Sampling) {
        if sampling != self.sampling {
            self.sampler = create_sampler(device, sampling);
            self.sampling = sampling;
        }
    }

    pub(crate) fn destroy(self) {
        self.texture.destroy();
    }
}

/// Offscreen colour target the effect draws into and the read-back copies from.
pub(crate) struct RenderTarget {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub size: SurfaceSize,
}

impl RenderTarget {
    pub(crate) fn new(device: &wgpu::Device, size: SurfaceSize) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("acidwall render target"),
            size: wgpu::Extent3d {
                width: size.width.max(1),
                height: size.height.max(1),
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: TEXTURE_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT
                | wgpu::TextureUsages::COPY_SRC
                | wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Self {
            texture,
            view,
            size,
        }
    }

    pub(crate) fn destroy(&self) {
        self.texture.destroy();
    }
}

fn create_sampled_texture(device: &wgpu::Device, width: u32, height: u32) -> wgpu::Texture {
    device.create_texture(&wgpu::TextureDescriptor {
        label: Some("acidwall feedback texture"),
        size: wgpu::Extent3d {
            width: width.max(1),
            height: height.max(1),
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: TEXTURE_FORMAT,
        usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
        view_formats: &[],
    })
}

pub(crate) fn create_sampler(device: &wgpu::Device, sampling: Sampling) -> wgpu::Sampler {
    let descriptor = sampler_descriptor(sampling);
    device.create_sampler(&descriptor)
}

fn sampler_descriptor(sampling: Sampling) -> wgpu::SamplerDescriptor<'static> {
    let address_mode = address_mode(sampling.wrap);
    wgpu::SamplerDescriptor {
        label: Some("acidwall feedback sampler"),
        address_mode_u: address_mode,
        address_mode_v: address_mode,
        address_mode_w: address_mode,
        mag_filter: filter_mode(sampling.mag_filter),
        min_filter: filter_mode(sampling.min_filter),
        mipmap_filter: wgpu::FilterMode::Nearest,
        ..Default::default()
    }
}

fn address_mode(wrap: WrapMode) -> wgpu::AddressMode {
    match wrap {
        WrapMode::Repeat => wgpu::AddressMode::Repeat,
        WrapMode::ClampToEdge => wgpu::AddressMode::ClampToEdge,
    }
}

fn filter_mode(filter: FilterMode) -> wgpu::FilterMode {
    match filter {
        FilterMode::Nearest => wgpu::FilterMode::Nearest,
        FilterMode::Linear => wgpu::FilterMode::Linear,
    }
}
