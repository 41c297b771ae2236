//! In-memory [`GpuHost`] that records every call, for unit tests.

use std::collections::{HashMap, HashSet, VecDeque};

use crate::error::HostError;
use crate::host::{BuildId, FrameToken, GpuHost, Sampling, SeedSource, ShaderKind};
use crate::texture::rgba_len;
use crate::uniforms::Uniforms;
use crate::viewport::SurfaceSize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Failure {
    Compile(ShaderKind),
    Link,
    Bind,
    ReadBack,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Configure(SurfaceSize),
    CreateShader(ShaderKind),
    CompileShader(ShaderKind),
    ReleaseShader,
    CreateProgram,
    LinkProgram,
    ReleaseProgram,
    CreateVertexBuffer,
    ReleaseVertexBuffer,
    CreateTexture,
    Upload { width: u32, height: u32 },
    Sampling(Sampling),
    ReleaseTexture,
    Bind,
    Uniforms(Uniforms),
    Draw(u32),
    Flush,
    ReadPixels(SurfaceSize),
    RequestFrame(FrameToken),
    CancelFrame(FrameToken),
}

impl Call {
    pub fn name(&self) -> &'static str {
        match self {
            Call::Configure(_) => "configure",
            Call::CreateShader(_) => "create_shader",
            Call::CompileShader(_) => "compile_shader",
            Call::ReleaseShader => "release_shader",
            Call::CreateProgram => "create_program",
            Call::LinkProgram => "link_program",
            Call::ReleaseProgram => "release_program",
            Call::CreateVertexBuffer => "create_vertex_buffer",
            Call::ReleaseVertexBuffer => "release_vertex_buffer",
            Call::CreateTexture => "create_texture",
            Call::Upload { .. } => "upload",
            Call::Sampling(_) => "sampling",
            Call::ReleaseTexture => "release_texture",
            Call::Bind => "bind",
            Call::Uniforms(_) => "uniforms",
            Call::Draw(_) => "draw",
            Call::Flush => "flush",
            Call::ReadPixels(_) => "read_pixels",
            Call::RequestFrame(_) => "request_frame",
            Call::CancelFrame(_) => "cancel_frame",
        }
    }
}

#[derive(Debug)]
pub struct MockShader {
    id: u32,
    kind: ShaderKind,
}

#[derive(Debug)]
pub struct MockProgram {
    id: u32,
    linked: bool,
}

#[derive(Debug)]
pub struct MockBuffer(u32);

#[derive(Debug)]
pub struct MockTexture(u32);

#[derive(Debug, Default)]
struct TextureStore {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
    sampling: Sampling,
}

pub struct RecordingHost {
    surface: SurfaceSize,
    framebuffer: Vec<u8>,
    next_id: u32,
    next_token: u64,
    failures: HashSet<Failure>,
    calls: Vec<Call>,
    shaders: HashSet<u32>,
    programs: HashSet<u32>,
    buffers: HashSet<u32>,
    textures: HashMap<u32, TextureStore>,
    shaders_created: usize,
    bound_texture: Option<u32>,
    last_draw_source: Option<(u32, u32, Vec<u8>)>,
    last_vertices: Vec<f32>,
    last_uniforms: Option<Uniforms>,
    pending: VecDeque<FrameToken>,
}

impl RecordingHost {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            surface: SurfaceSize::new(width, height),
            framebuffer: vec![0; rgba_len(width, height)],
            next_id: 0,
            next_token: 0,
            failures: HashSet::new(),
            calls: Vec::new(),
            shaders: HashSet::new(),
            programs: HashSet::new(),
            buffers: HashSet::new(),
            textures: HashMap::new(),
            shaders_created: 0,
            bound_texture: None,
            last_draw_source: None,
            last_vertices: Vec::new(),
            last_uniforms: None,
            pending: VecDeque::new(),
        }
    }

    pub fn fail(&mut self, failure: Failure) {
        self.failures.insert(failure);
    }

    pub fn clear_failures(&mut self) {
        self.failures.clear();
    }

    pub fn calls(&self) -> &[Call] {
        &self.calls
    }

    pub fn clear_calls(&mut self) {
        self.calls.clear();
    }

    pub fn live_shaders(&self) -> usize {
        self.shaders.len()
    }

    pub fn live_programs(&self) -> usize {
        self.programs.len()
    }

    pub fn live_vertex_buffers(&self) -> usize {
        self.buffers.len()
    }

    pub fn live_textures(&self) -> usize {
        self.textures.len()
    }

    pub fn live_objects(&self) -> usize {
        self.live_shaders()
            + self.live_programs()
            + self.live_vertex_buffers()
            + self.live_textures()
    }

    pub fn shaders_created(&self) -> usize {
        self.shaders_created
    }

    pub fn last_vertices(&self) -> Vec<f32> {
        self.last_vertices.clone()
    }

    pub fn last_uniforms(&self) -> Option<Uniforms> {
        self.last_uniforms
    }

    /// Dimensions and pixels of the texture bound at the most recent draw.
    pub fn last_draw_source(&self) -> Option<(u32, u32, Vec<u8>)> {
        self.last_draw_source.clone()
    }

    pub fn texture_pixels(&self, texture: &MockTexture) -> (u32, u32, Vec<u8>) {
        let store = &self.textures[&texture.0];
        (store.width, store.height, store.pixels.clone())
    }

    pub fn texture_sampling(&self, texture: &MockTexture) -> Sampling {
        self.textures[&texture.0].sampling
    }

    pub fn framebuffer(&self) -> &[u8] {
        &self.framebuffer
    }

    pub fn pending_frames(&self) -> usize {
        self.pending.len()
    }

    pub fn pending_tokens(&self) -> Vec<FrameToken> {
        self.pending.iter().copied().collect()
    }

    /// Simulates the display refresh: hands out the oldest pending callback.
    pub fn take_due_frame(&mut self) -> Option<FrameToken> {
        self.pending.pop_front()
    }

    fn mint(&mut self) -> u32 {
        self.next_id += 1;
        self.next_id
    }
}

impl GpuHost for RecordingHost {
    type Shader = MockShader;
    type Program = MockProgram;
    type VertexBuffer = MockBuffer;
    type Texture = MockTexture;

    fn surface_size(&self) -> SurfaceSize {
        self.surface
    }

    fn configure_surface(&mut self, size: SurfaceSize) {
        self.calls.push(Call::Configure(size));
        self.surface = size;
        self.framebuffer = vec![0; rgba_len(size.width, size.height)];
    }

    fn create_shader(&mut self, kind: ShaderKind) -> MockShader {
        self.calls.push(Call::CreateShader(kind));
        let id = self.mint();
        self.shaders.insert(id);
        self.shaders_created += 1;
        MockShader { id, kind }
    }

    fn compile_shader(&mut self, shader: &mut MockShader, _source: &str) -> Result<(), String> {
        self.calls.push(Call::CompileShader(shader.kind));
        if self.failures.contains(&Failure::Compile(shader.kind)) {
            return Err(format!("{}: syntax error", shader.kind));
        }
        Ok(())
    }

    fn release_shader(&mut self, shader: MockShader) {
        self.calls.push(Call::ReleaseShader);
        self.shaders.remove(&shader.id);
    }

    fn create_program(&mut self, _vertex: &MockShader, _fragment: &MockShader) -> MockProgram {
        self.calls.push(Call::CreateProgram);
        let id = self.mint();
        self.programs.insert(id);
        MockProgram { id, linked: false }
    }

    fn link_program(&mut self, program: &mut MockProgram) -> Result<(), String> {
        self.calls.push(Call::LinkProgram);
        if self.failures.contains(&Failure::Link) {
            return Err("varying v_texcoord is not written by the vertex stage".to_string());
        }
        program.linked = true;
        Ok(())
    }

    fn release_program(&mut self, program: MockProgram) {
        self.calls.push(Call::ReleaseProgram);
        self.programs.remove(&program.id);
    }

    fn create_vertex_buffer(&mut self, vertices: &[f32]) -> MockBuffer {
        self.calls.push(Call::CreateVertexBuffer);
        let id = self.mint();
        self.buffers.insert(id);
        self.last_vertices = vertices.to_vec();
        MockBuffer(id)
    }

    fn release_vertex_buffer(&mut self, buffer: MockBuffer) {
        self.calls.push(Call::ReleaseVertexBuffer);
        self.buffers.remove(&buffer.0);
    }

    fn create_texture(&mut self) -> MockTexture {
        self.calls.push(Call::CreateTexture);
        let id = self.mint();
        self.textures.insert(id, TextureStore::default());
        MockTexture(id)
    }

    fn upload_texture(
        &mut self,
        texture: &mut MockTexture,
        width: u32,
        height: u32,
        pixels: &[u8],
    ) {
        self.calls.push(Call::Upload { width, height });
        if let Some(store) = self.textures.get_mut(&texture.0) {
            store.width = width;
            store.height = height;
            store.pixels = pixels.to_vec();
        }
    }

    fn set_sampling(&mut self, texture: &mut MockTexture, sampling: Sampling) {
        self.calls.push(Call::Sampling(sampling));
        if let Some(store) = self.textures.get_mut(&texture.0) {
            store.sampling = sampling;
        }
    }

    fn release_texture(&mut self, texture: MockTexture) {
        self.calls.push(Call::ReleaseTexture);
        self.textures.remove(&texture.0);
        if self.bound_texture == Some(texture.0) {
            self.bound_texture = None;
        }
    }

    fn bind(&mut self, program: &MockProgram, texture: &MockTexture) -> Result<(), HostError> {
        self.calls.push(Call::Bind);
        if self.failures.contains(&Failure::Bind) || !program.linked {
            return Err(HostError::ProgramNotLinked);
        }
        self.bound_texture = Some(texture.0);
        Ok(())
    }

    fn push_uniforms(&mut self, _program: &MockProgram, uniforms: &Uniforms) {
        self.calls.push(Call::Uniforms(*uniforms));
        self.last_uniforms = Some(*uniforms);
    }

    /// Fills the framebuffer with the first texel of the bound texture.
    fn draw(&mut self, _program: &MockProgram, _vertices: &MockBuffer, vertex_count: u32) {
        self.calls.push(Call::Draw(vertex_count));
        let Some(store) = self.bound_texture.and_then(|id| self.textures.get(&id)) else {
            return;
        };
        self.last_draw_source = Some((store.width, store.height, store.pixels.clone()));
        if let Some(texel) = store.pixels.get(..4) {
            let texel = [texel[0], texel[1], texel[2], texel[3]];
            for pixel in self.framebuffer.chunks_exact_mut(4) {
                pixel.copy_from_slice(&texel);
            }
        }
    }

    fn flush(&mut self) {
        self.calls.push(Call::Flush);
    }

    fn read_pixels(&mut self, size: SurfaceSize, out: &mut [u8]) -> Result<(), HostError> {
        self.calls.push(Call::ReadPixels(size));
        if self.failures.contains(&Failure::ReadBack) {
            return Err(HostError::ReadBack("device lost".to_string()));
        }
        if size != self.surface || out.len() != self.framebuffer.len() {
            return Err(HostError::ReadBack(format!(
                "requested {size} but surface is {}",
                self.surface
            )));
        }
        out.copy_from_slice(&self.framebuffer);
        Ok(())
    }

    fn request_frame(&mut self) -> FrameToken {
        self.next_token += 1;
        let token = FrameToken(self.next_token);
        self.calls.push(Call::RequestFrame(token));
        self.pending.push_back(token);
        token
    }

    fn cancel_frame(&mut self, token: FrameToken) {
        self.calls.push(Call::CancelFrame(token));
        self.pending.retain(|pending| *pending != token);
    }
}

/// Seed source that only remembers what was asked of it.
#[derive(Debug, Default)]
pub struct RecordingSeeds {
    pub requests: Vec<(BuildId, SurfaceSize)>,
}

impl SeedSource for RecordingSeeds {
    fn request_seed(&mut self, build: BuildId, size: SurfaceSize) {
        self.requests.push((build, size));
    }
}
