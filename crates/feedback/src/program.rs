//! Compilation and linking of the effect's vertex/fragment pair.

use tracing::error;

use crate::error::PipelineError;
use crate::host::{GpuHost, ShaderKind};

/// A linked, usable GPU program.
///
/// Only [`ShaderProgram::build`] creates one, so holding a `ShaderProgram`
/// means linking succeeded. Partially built objects never escape.
pub struct ShaderProgram<H: GpuHost> {
    handle: H::Program,
}

impl<H: GpuHost> ShaderProgram<H> {
    /// Compiles both stages and links them. Intermediate shader objects are
    /// released whether or not linking succeeds.
    pub fn build(
        host: &mut H,
        vertex_source: &str,
        fragment_source: &str,
    ) -> Result<Self, PipelineError> {
        let vertex = compile(host, ShaderKind::Vertex, vertex_source)?;
        let fragment = match compile(host, ShaderKind::Fragment, fragment_source) {
            Ok(fragment) => fragment,
            Err(err) => {
                host.release_shader(vertex);
                return Err(err);
            }
        };

        let linked = link(host, &vertex, &fragment);
        host.release_shader(vertex);
        host.release_shader(fragment);
        linked.map(|handle| Self { handle })
    }

    pub fn handle(&self) -> &H::Program {
        &self.handle
    }

    pub fn release(self, host: &mut H) {
        host.release_program(self.handle);
    }
}

/// Compiles a single stage. A failed shader object is released before the
/// error is returned, so callers never hold an uncompiled handle.
pub fn compile<H: GpuHost>(
    host: &mut H,
    kind: ShaderKind,
    source: &str,
) -> Result<H::Shader, PipelineError> {
    let mut shader = host.create_shader(kind);
    match host.compile_shader(&mut shader, source) {
        Ok(()) => Ok(shader),
        Err(log) => {
            host.release_shader(shader);
            error!(%kind, log = %log, "shader compilation failed");
            Err(PipelineError::Compilation { kind, log })
        }
    }
}

/// Links two compiled stages into a program. On failure the program object
/// is released before returning.
pub fn link<H: GpuHost>(
    host: &mut H,
    vertex: &H::Shader,
    fragment: &H::Shader,
) -> Result<H::Program, PipelineError> {
    let mut program = host.create_program(vertex, fragment);
    match host.link_program(&mut program) {
        Ok(()) => Ok(program),
        Err(log) => {
            host.release_program(program);
            error!(log = %log, "shader program link failed");
            Err(PipelineError::Link { log })
        }
    }
}
