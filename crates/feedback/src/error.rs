use crate::host::ShaderKind;

/// Failures that abort a pipeline build. Rendering does not start for the
/// build that produced them; the next resize gets a fresh attempt.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PipelineError {
    #[error("failed to compile {kind} shader: {log}")]
    Compilation { kind: ShaderKind, log: String },
    #[error("failed to link shader program: {log}")]
    Link { log: String },
}

/// A write-back buffer whose length does not match `width * height * 4`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("write-back buffer holds {actual} bytes but {width}x{height} RGBA needs {expected}")]
pub struct SizeMismatchError {
    pub width: u32,
    pub height: u32,
    pub expected: usize,
    pub actual: usize,
}

/// Reported by the seed source when the image bytes cannot be turned into RGBA.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("failed to decode seed image: {0}")]
pub struct ImageDecodeError(pub String);

/// Errors surfaced by the host surface API itself.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HostError {
    #[error("shader program is not linked")]
    ProgramNotLinked,
    #[error("pixel read-back failed: {0}")]
    ReadBack(String),
}
