use std::sync::Arc;

use anyhow::{Context, Result};
use feedback::{FrameToken, GpuHost, HostError, Sampling, ShaderKind, SurfaceSize, Uniforms};
use wgpu::util::DeviceExt;
use winit::dpi::PhysicalSize;
use winit::window::Window;

use crate::compile::{compile_glsl, with_validation_scope};

use super::context::GpuContext;
use super::present::Presenter;
use super::readback::ReadbackBuffer;
use super::texture::{EffectTexture, RenderTarget, TEXTURE_FORMAT};
use super::uniforms::{EffectUniforms, EFFECT_UNIFORMS_SIZE};

pub struct EffectShader {
    kind: ShaderKind,
    module: Option<wgpu::ShaderModule>,
}

pub struct EffectProgram {
    vertex: Option<wgpu::ShaderModule>,
    fragment: Option<wgpu::ShaderModule>,
    uniform_buffer: wgpu::Buffer,
    uniform_group: wgpu::BindGroup,
    pipeline: Option<wgpu::RenderPipeline>,
}

pub struct QuadBuffer {
    buffer: wgpu::Buffer,
}

/// Bindings captured by `bind` and consumed by the next `draw`.
struct BoundFrame {
    pipeline: wgpu::RenderPipeline,
    texture_group: wgpu::BindGroup,
}

/// `wgpu` implementation of the feedback host.
///
/// The effect renders into an offscreen target sized by the core; `flush`
/// submits the frame and blits that target onto the window's swapchain.
pub struct WgpuHost {
    window: Arc<Window>,
    context: GpuContext,
    presenter: Presenter,
    uniform_layout: wgpu::BindGroupLayout,
    texture_layout: wgpu::BindGroupLayout,
    pipeline_layout: wgpu::PipelineLayout,
    target: RenderTarget,
    readback: Option<ReadbackBuffer>,
    encoder: Option<wgpu::CommandEncoder>,
    bound: Option<BoundFrame>,
    next_token: u64,
    pending: Option<FrameToken>,
}

impl WgpuHost {
    pub fn new(window: Arc<Window>) -> Result<Self> {
        let size = window.inner_size();
        let context = GpuContext::new(window.as_ref(), size)?;
        let presenter = Presenter::new(&context.device, context.surface_format)
            .context("failed to build presentation pipeline")?;

        let device = &context.device;
        let uniform_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("effect uniform layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: wgpu::BufferSize::new(EFFECT_UNIFORMS_SIZE),
                },
                count: None,
            }],
        });
        let texture_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("effect texture layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });
        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("effect pipeline layout"),
            bind_group_layouts: &[&uniform_layout, &texture_layout],
            push_constant_ranges: &[],
        });
        let target = RenderTarget::new(device, SurfaceSize::new(1, 1));

        Ok(Self {
            window,
            context,
            presenter,
            uniform_layout,
            texture_layout,
            pipeline_layout,
            target,
            readback: None,
            encoder: None,
            bound: None,
            next_token: 0,
            pending: None,
        })
    }

    pub fn window(&self) -> &Window {
        self.window.as_ref()
    }

    /// Current swapchain size in physical pixels.
    pub fn window_size(&self) -> PhysicalSize<u32> {
        self.context.size
    }

    /// Resizes the swapchain to the window. The render target keeps the size
    /// the core configured.
    pub fn resize_window(&mut self, size: PhysicalSize<u32>) {
        self.context.resize(size);
    }

    /// Largest texture side the device accepts.
    pub fn max_texture_dimension(&self) -> u32 {
        self.context.max_texture_dimension
    }

    /// Hands out the pending frame callback once the display asks for a redraw.
    pub fn take_due_frame(&mut self) -> Option<FrameToken> {
        self.pending.take()
    }

    fn encoder(&mut self) -> &mut wgpu::CommandEncoder {
        let device = &self.context.device;
        self.encoder.get_or_insert_with(|| {
            device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("acidwall frame encoder"),
            })
        })
    }

    fn build_pipeline(
        &self,
        vertex: &wgpu::ShaderModule,
        fragment: &wgpu::ShaderModule,
    ) -> wgpu::RenderPipeline {
        self.context
            .device
            .create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some("effect pipeline"),
                layout: Some(&self.pipeline_layout),
                vertex: wgpu::VertexState {
                    module: vertex,
                    entry_point: Some("main"),
                    buffers: &[wgpu::VertexBufferLayout {
                        array_stride: 2 * std::mem::size_of::<f32>() as u64,
                        step_mode: wgpu::VertexStepMode::Vertex,
                        attributes: &wgpu::vertex_attr_array![0 => Float32x2],
                    }],
                    compilation_options: wgpu::PipelineCompilationOptions::default(),
                },
                primitive: wgpu::PrimitiveState {
                    topology: wgpu::PrimitiveTopology::TriangleList,
                    strip_index_format: None,
                    front_face: wgpu::FrontFace::Cw,
                    cull_mode: None,
                    polygon_mode: wgpu::PolygonMode::Fill,
                    unclipped_depth: false,
                    conservative: false,
                },
                depth_stencil: None,
                multisample: wgpu::MultisampleState::default(),
                fragment: Some(wgpu::FragmentState {
                    module: fragment,
                    entry_point: Some("main"),
                    targets: &[Some(wgpu::ColorTargetState {
                        format: TEXTURE_FORMAT,
                        blend: None,
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                    compilation_options: wgpu::PipelineCompilationOptions::default(),
                }),
                multiview: None,
                cache: None,
            })
    }
}

impl GpuHost for WgpuHost {
    type Shader = EffectShader;
    type Program = EffectProgram;
    type VertexBuffer = QuadBuffer;
    type Texture = EffectTexture;

    fn surface_size(&self) -> SurfaceSize {
        self.target.size
    }

    fn configure_surface(&mut self, size: SurfaceSize) {
        let max = self.context.max_texture_dimension;
        let clamped = SurfaceSize::new(size.width.clamp(1, max), size.height.clamp(1, max));
        if clamped != size {
            tracing::warn!(
                requested = %size,
                clamped = %clamped,
                max,
                "render target exceeds GPU texture limits; clamping"
            );
        }
        if clamped == self.target.size {
            return;
        }

        self.target.destroy();
        self.target = RenderTarget::new(&self.context.device, clamped);
        if let Some(readback) = self.readback.take() {
            readback.destroy();
        }
        tracing::debug!(
            width = clamped.width,
            height = clamped.height,
            "render target configured"
        );
    }

    fn create_shader(&mut self, kind: ShaderKind) -> EffectShader {
        EffectShader { kind, module: None }
    }

    fn compile_shader(&mut self, shader: &mut EffectShader, source: &str) -> Result<(), String> {
        let module = compile_glsl(&self.context.device, shader.kind, source)?;
        shader.module = Some(module);
        Ok(())
    }

    fn release_shader(&mut self, shader: EffectShader) {
        drop(shader);
    }

    fn create_program(&mut self, vertex: &EffectShader, fragment: &EffectShader) -> EffectProgram {
        let device = &self.context.device;
        let uniform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("effect uniforms"),
            size: EFFECT_UNIFORMS_SIZE,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let uniform_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("effect uniform bind group"),
            layout: &self.uniform_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            }],
        });
        EffectProgram {
            vertex: vertex.module.clone(),
            fragment: fragment.module.clone(),
            uniform_buffer,
            uniform_group,
            pipeline: None,
        }
    }

    fn link_program(&mut self, program: &mut EffectProgram) -> Result<(), String> {
        let (Some(vertex), Some(fragment)) = (program.vertex.as_ref(), program.fragment.as_ref())
        else {
            return Err("program has a stage that was never compiled".to_string());
        };
        let pipeline = with_validation_scope(&self.context.device, || {
            self.build_pipeline(vertex, fragment)
        })?;
        program.pipeline = Some(pipeline);
        Ok(())
    }

    fn release_program(&mut self, program: EffectProgram) {
        program.uniform_buffer.destroy();
    }

    fn create_vertex_buffer(&mut self, vertices: &[f32]) -> QuadBuffer {
        let buffer = self
            .context
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("effect quad"),
                contents: bytemuck::cast_slice(vertices),
                usage: wgpu::BufferUsages::VERTEX,
            });
        QuadBuffer { buffer }
    }

    fn release_vertex_buffer(&mut self, buffer: QuadBuffer) {
        buffer.buffer.destroy();
    }

    fn create_texture(&mut self) -> EffectTexture {
        EffectTexture::new(&self.context.device, Sampling::PLACEHOLDER)
    }

    fn upload_texture(
        &mut self,
        texture: &mut EffectTexture,
        width: u32,
        height: u32,
        pixels: &[u8],
    ) {
        let (device, queue) = (&self.context.device, &self.context.queue);
        texture.upload(device, queue, width, height, pixels);
    }

    fn set_sampling(&mut self, texture: &mut EffectTexture, sampling: Sampling) {
        texture.set_sampling(&self.context.device, sampling);
    }

    fn release_texture(&mut self, texture: EffectTexture) {
        texture.destroy();
    }

    fn bind(&mut self, program: &EffectProgram, texture: &EffectTexture) -> Result<(), HostError> {
        let Some(pipeline) = program.pipeline.as_ref() else {
            return Err(HostError::ProgramNotLinked);
        };
        let texture_group = self
            .context
            .device
            .create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("effect texture bind group"),
                layout: &self.texture_layout,
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: 0,
                        resource: wgpu::BindingResource::TextureView(&texture.view),
                    },
                    wgpu::BindGroupEntry {
                        binding: 1,
                        resource: wgpu::BindingResource::Sampler(&texture.sampler),
                    },
                ],
            });
        self.bound = Some(BoundFrame {
            pipeline: pipeline.clone(),
            texture_group,
        });
        Ok(())
    }

    fn push_uniforms(&mut self, program: &EffectProgram, uniforms: &Uniforms) {
        let data = EffectUniforms::from(uniforms);
        self.context
            .queue
            .write_buffer(&program.uniform_buffer, 0, bytemuck::bytes_of(&data));
    }

    fn draw(&mut self, program: &EffectProgram, vertices: &QuadBuffer, vertex_count: u32) {
        let Some(bound) = self.bound.take() else {
            tracing::warn!("draw issued without a bound program; skipping");
            return;
        };
        let target_view = self.target.view.clone();
        let encoder = self.encoder();
        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("effect pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: &target_view,
                depth_slice: None,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
        });
        pass.set_pipeline(&bound.pipeline);
        pass.set_bind_group(0, &program.uniform_group, &[]);
        pass.set_bind_group(1, &bound.texture_group, &[]);
        pass.set_vertex_buffer(0, vertices.buffer.slice(..));
        pass.draw(0..vertex_count, 0..1);
    }

    fn flush(&mut self) {
        let frame = match self.context.surface.get_current_texture() {
            Ok(frame) => Some(frame),
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                tracing::debug!("surface lost or outdated; reconfiguring");
                self.context.reconfigure();
                None
            }
            Err(err) => {
                tracing::warn!(error = %err, "failed to acquire swapchain image; skipping present");
                None
            }
        };

        let source_view = self.target.view.clone();
        let mut encoder = self.encoder.take().unwrap_or_else(|| {
            self.context
                .device
                .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                    label: Some("acidwall frame encoder"),
                })
        });
        let frame_view = frame.as_ref().map(|frame| {
            frame
                .texture
                .create_view(&wgpu::TextureViewDescriptor::default())
        });
        if let Some(view) = frame_view.as_ref() {
            self.presenter
                .blit(&self.context.device, &mut encoder, &source_view, view);
        }

        self.context.queue.submit(Some(encoder.finish()));
        if let Some(frame) = frame {
            self.window.pre_present_notify();
            frame.present();
        }
    }

    fn read_pixels(&mut self, size: SurfaceSize, out: &mut [u8]) -> Result<(), HostError> {
        if size != self.target.size {
            return Err(HostError::ReadBack(format!(
                "requested {size} but render target is {}",
                self.target.size
            )));
        }
        let stale = self
            .readback
            .as_ref()
            .is_some_and(|readback| readback.size() != size);
        if stale {
            if let Some(readback) = self.readback.take() {
                readback.destroy();
            }
        }
        let device = &self.context.device;
        let readback = self
            .readback
            .get_or_insert_with(|| ReadbackBuffer::new(device, size));
        readback
            .read(device, &self.context.queue, &self.target.texture, out)
            .map_err(|err| HostError::ReadBack(format!("{err:#}")))
    }

    fn request_frame(&mut self) -> FrameToken {
        self.next_token += 1;
        let token = FrameToken(self.next_token);
        self.pending = Some(token);
        self.window.request_redraw();
        tracing::trace!(?token, "frame requested");
        token
    }

    fn cancel_frame(&mut self, token: FrameToken) {
        if self.pending == Some(token) {
            self.pending = None;
        }
    }
}
