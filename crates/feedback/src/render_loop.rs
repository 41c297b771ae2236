//! Per-frame draw / read-back / write-back cycle.
//!
//! ```text
//!   Uninitialized ──start()──▶ Running ──cancel() or bind failure──▶ Cancelled
//!                               │   ▲
//!                               └───┘ on_frame(token): bind, draw, flush,
//!                                     read back, write back, time += 1,
//!                                     push uniforms, request next frame
//! ```
//!
//! A loop never leaves `Cancelled`; the controller builds a new one instead.

use tracing::{debug, error, trace, warn};

use crate::error::{HostError, SizeMismatchError};
use crate::geometry::QUAD_VERTEX_COUNT;
use crate::host::{BuildId, FrameToken, GpuHost};
use crate::pipeline::Pipeline;
use crate::texture::rgba_len;
use crate::uniforms::Uniforms;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Uninitialized,
    Running,
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameOutcome {
    /// The frame ran and the next one is scheduled.
    Rendered,
    /// The token does not belong to this loop's pending callback.
    Stale,
    /// The loop is not running; nothing happened.
    Stopped,
}

/// State threaded through every frame invocation.
#[derive(Debug, Default)]
struct FrameState {
    time: u64,
    snapshot: Vec<u8>,
    skipped_write_backs: u64,
}

pub struct RenderLoop {
    build: BuildId,
    state: LoopState,
    /// The one scheduled-but-not-yet-run frame callback.
    pending: Option<FrameToken>,
    frame: FrameState,
}

impl RenderLoop {
    pub fn new(build: BuildId) -> Self {
        Self {
            build,
            state: LoopState::Uninitialized,
            pending: None,
            frame: FrameState::default(),
        }
    }

    /// Verifies the program can be bound and schedules frame 0.
    pub fn start<H: GpuHost>(
        &mut self,
        host: &mut H,
        pipeline: &Pipeline<H>,
    ) -> Result<(), HostError> {
        if self.state != LoopState::Uninitialized {
            warn!(build = %self.build, state = ?self.state, "render loop already started");
            return Ok(());
        }
        if let Err(err) = host.bind(pipeline.program().handle(), pipeline.texture().handle()) {
            error!(build = %self.build, error = %err, "render loop failed to start");
            self.state = LoopState::Cancelled;
            return Err(err);
        }
        self.state = LoopState::Running;
        self.schedule(host);
        Ok(())
    }

    /// Runs one frame if `token` is this loop's pending callback.
    pub fn on_frame<H: GpuHost>(
        &mut self,
        host: &mut H,
        pipeline: &mut Pipeline<H>,
        token: FrameToken,
    ) -> FrameOutcome {
        if self.state != LoopState::Running {
            return FrameOutcome::Stopped;
        }
        match self.pending {
            Some(pending) if pending == token => self.pending = None,
            _ => {
                trace!(build = %self.build, ?token, "ignoring stale frame callback");
                return FrameOutcome::Stale;
            }
        }
        self.render_frame(host, pipeline)
    }

    /// Cancels the pending callback. Takes effect before that callback can
    /// run: a later `on_frame` with its token is a no-op.
    pub fn cancel<H: GpuHost>(&mut self, host: &mut H) {
        if let Some(token) = self.pending.take() {
            host.cancel_frame(token);
        }
        if self.state != LoopState::Cancelled {
            trace!(build = %self.build, frames = self.frame.time, "render loop cancelled");
        }
        self.state = LoopState::Cancelled;
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    pub fn build_id(&self) -> BuildId {
        self.build
    }

    /// Frames completed so far; equal to the `time` uniform.
    pub fn time(&self) -> u64 {
        self.frame.time
    }

    pub fn pending(&self) -> Option<FrameToken> {
        self.pending
    }

    /// Frames whose snapshot did not fit the texture and were not written back.
    pub fn skipped_write_backs(&self) -> u64 {
        self.frame.skipped_write_backs
    }

    fn render_frame<H: GpuHost>(
        &mut self,
        host: &mut H,
        pipeline: &mut Pipeline<H>,
    ) -> FrameOutcome {
        if let Err(err) = host.bind(pipeline.program().handle(), pipeline.texture().handle()) {
            error!(
                build = %self.build,
                error = %err,
                "failed to bind program; stopping render loop"
            );
            self.state = LoopState::Cancelled;
            return FrameOutcome::Stopped;
        }

        host.draw(
            pipeline.program().handle(),
            pipeline.geometry().buffer(),
            QUAD_VERTEX_COUNT,
        );
        host.flush();

        if pipeline.variant().uses_feedback() {
            self.feed_back(host, pipeline);
        }

        self.frame.time += 1;
        let uniforms = Uniforms::new(pipeline.size()).with_time(self.frame.time);
        host.push_uniforms(pipeline.program().handle(), &uniforms);

        self.schedule(host);
        FrameOutcome::Rendered
    }

    /// Reads the render target back and writes it into the texture so the
    /// next draw samples this frame's output.
    fn feed_back<H: GpuHost>(&mut self, host: &mut H, pipeline: &mut Pipeline<H>) {
        let target = host.surface_size();
        self.frame
            .snapshot
            .resize(rgba_len(target.width, target.height), 0);

        if let Err(err) = host.read_pixels(target, &mut self.frame.snapshot) {
            warn!(
                build = %self.build,
                error = %err,
                "read-back failed; keeping previous texture"
            );
            return;
        }

        let size = pipeline.geometry().size();
        let texture = pipeline.texture_mut();
        if let Err(err) = texture.write_back(host, &self.frame.snapshot, size.width, size.height) {
            self.skip_write_back(&err);
        }
    }

    /// A clamped or resized target mismatches on every frame until the next
    /// build, so only the first skip is a warning.
    fn skip_write_back(&mut self, err: &SizeMismatchError) {
        self.frame.skipped_write_backs += 1;
        if self.frame.skipped_write_backs == 1 {
            warn!(
                build = %self.build,
                frame = self.frame.time,
                error = %err,
                "skipping write-back of mismatched frame"
            );
        } else {
            debug!(
                build = %self.build,
                frame = self.frame.time,
                skipped = self.frame.skipped_write_backs,
                "skipping write-back of mismatched frame"
            );
        }
    }

    fn schedule<H: GpuHost>(&mut self, host: &mut H) {
        self.pending = Some(host.request_frame());
    }
}
