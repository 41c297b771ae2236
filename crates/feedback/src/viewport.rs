//! Surface sizing and the resize/cancel protocol.
//!
//! The controller owns the host, the seed source and at most one active
//! build. Every resize supersedes whatever came before it: the running loop
//! is cancelled, its GPU objects are released, and a new build with a fresh
//! [`BuildId`] is started. Seed completions carry the id of the build that
//! requested them and are dropped unless that build is still current.

use std::fmt;

use tracing::{debug, info, warn};

use crate::effect::EffectVariant;
use crate::error::{ImageDecodeError, PipelineError};
use crate::host::{BuildId, FrameToken, GpuHost, SeedSource};
use crate::pipeline::Pipeline;
use crate::render_loop::{FrameOutcome, LoopState, RenderLoop};
use crate::texture::SeedImage;

/// Logical canvas height used when none is configured.
pub const DEFAULT_LOGICAL_HEIGHT: u32 = 1920;

/// Pixel dimensions of the render surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SurfaceSize {
    pub width: u32,
    pub height: u32,
}

impl SurfaceSize {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

impl fmt::Display for SurfaceSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Canvas size for a window: height is fixed to `logical_height`, width
/// follows the window's aspect ratio, rounded down.
///
/// Callers must ensure `window_height > 0`.
pub fn compute_surface_size(
    window_width: u32,
    window_height: u32,
    logical_height: u32,
) -> SurfaceSize {
    let aspect = f64::from(window_width) / f64::from(window_height);
    let width = (aspect * f64::from(logical_height)).floor() as u32;
    SurfaceSize::new(width, logical_height)
}

/// What happened to a delivered seed image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeedOutcome {
    Applied,
    /// The requesting build has been superseded; nothing was touched.
    Stale,
    /// Decoding failed; rendering continues against the placeholder.
    Failed,
}

struct ActiveBuild<H: GpuHost> {
    pipeline: Pipeline<H>,
    render_loop: RenderLoop,
}

pub struct ViewportController<H: GpuHost, S: SeedSource> {
    host: H,
    seeds: S,
    variant: EffectVariant,
    logical_height: u32,
    last_build: BuildId,
    active: Option<ActiveBuild<H>>,
}

impl<H: GpuHost, S: SeedSource> ViewportController<H, S> {
    pub fn new(host: H, seeds: S, variant: EffectVariant, logical_height: u32) -> Self {
        Self {
            host,
            seeds,
            variant,
            logical_height: logical_height.max(1),
            last_build: BuildId(0),
            active: None,
        }
    }

    /// Tears down the current build and starts a new one sized for the
    /// window. Compilation and link failures are returned after being
    /// logged; nothing renders until the next resize.
    pub fn on_resize(
        &mut self,
        window_width: u32,
        window_height: u32,
    ) -> Result<(), PipelineError> {
        if window_width == 0 || window_height == 0 {
            warn!(
                window_width,
                window_height,
                "ignoring resize to an empty window"
            );
            return Ok(());
        }
        let size = compute_surface_size(window_width, window_height, self.logical_height);
        if size.width == 0 {
            warn!(
                window_width,
                window_height,
                "window too narrow for a non-empty surface"
            );
            return Ok(());
        }

        self.stop();

        let build = self.last_build.next();
        self.last_build = build;
        debug!(%build, window_width, window_height, surface = %size, "rebuilding pipeline");

        let pipeline = Pipeline::build(&mut self.host, build, size, self.variant)?;
        self.seeds.request_seed(build, size);

        let mut render_loop = RenderLoop::new(build);
        if render_loop.start(&mut self.host, &pipeline).is_err() {
            pipeline.release(&mut self.host);
            return Ok(());
        }

        self.active = Some(ActiveBuild {
            pipeline,
            render_loop,
        });
        Ok(())
    }

    /// Display-refresh callback. Tokens that do not belong to the live loop
    /// are ignored.
    pub fn on_frame(&mut self, token: FrameToken) -> FrameOutcome {
        match self.active.as_mut() {
            Some(active) => active
                .render_loop
                .on_frame(&mut self.host, &mut active.pipeline, token),
            None => FrameOutcome::Stopped,
        }
    }

    /// Completion of the seed load started by `build`.
    pub fn on_seed_loaded(
        &mut self,
        build: BuildId,
        result: Result<SeedImage, ImageDecodeError>,
    ) -> SeedOutcome {
        let Some(active) = self
            .active
            .as_mut()
            .filter(|active| active.pipeline.build_id() == build)
        else {
            debug!(%build, current = %self.last_build, "discarding seed from superseded build");
            return SeedOutcome::Stale;
        };

        match result {
            Ok(seed) => {
                let sampling = self.variant.seed_sampling();
                active
                    .pipeline
                    .texture_mut()
                    .load_seed(&mut self.host, &seed, sampling);
                info!(%build, width = seed.width(), height = seed.height(), "seed image loaded");
                SeedOutcome::Applied
            }
            Err(err) => {
                warn!(%build, error = %err, "seed image unavailable; rendering placeholder");
                SeedOutcome::Failed
            }
        }
    }

    /// Cancels the loop and releases every GPU object. Safe to call twice.
    pub fn teardown(&mut self) {
        if self.active.is_some() {
            info!(build = %self.last_build, "tearing down render pipeline");
        }
        self.stop();
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    pub fn seeds(&self) -> &S {
        &self.seeds
    }

    pub fn variant(&self) -> EffectVariant {
        self.variant
    }

    /// Id of the build currently holding GPU resources.
    pub fn build_id(&self) -> Option<BuildId> {
        self.active
            .as_ref()
            .map(|active| active.pipeline.build_id())
    }

    pub fn surface_size(&self) -> Option<SurfaceSize> {
        self.active.as_ref().map(|active| active.pipeline.size())
    }

    pub fn is_running(&self) -> bool {
        self.active
            .as_ref()
            .is_some_and(|active| active.render_loop.state() == LoopState::Running)
    }

    /// Frame counter of the live loop.
    pub fn frame_time(&self) -> Option<u64> {
        self.active.as_ref().map(|active| active.render_loop.time())
    }

    fn stop(&mut self) {
        if let Some(mut active) = self.active.take() {
            active.render_loop.cancel(&mut self.host);
            active.pipeline.release(&mut self.host);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::ShaderKind;
    use crate::mock::{Failure, RecordingHost, RecordingSeeds};
    use crate::texture::{TextureRole, PLACEHOLDER_PIXEL};

    type Controller = ViewportController<RecordingHost, RecordingSeeds>;

    fn controller(variant: EffectVariant) -> Controller {
        ViewportController::new(
            RecordingHost::new(1, 1),
            RecordingSeeds::default(),
            variant,
            256,
        )
    }

    fn fire(controller: &mut Controller) -> FrameOutcome {
        let token = controller
            .host_mut()
            .take_due_frame()
            .expect("a frame should be pending");
        controller.on_frame(token)
    }

    fn seed(width: u32, height: u32, value: u8) -> SeedImage {
        SeedImage::new(width, height, vec![value; (width * height * 4) as usize]).unwrap()
    }

    #[test]
    fn surface_size_follows_window_aspect() {
        assert_eq!(
            compute_surface_size(1600, 1024, 256),
            SurfaceSize::new(400, 256)
        );
        assert_eq!(
            compute_surface_size(1920, 1080, 1920),
            SurfaceSize::new(3413, 1920)
        );
        assert_eq!(
            compute_surface_size(1080, 1920, 1920),
            SurfaceSize::new(1080, 1920)
        );
    }

    #[test]
    fn surface_size_is_pure_and_floors() {
        for &(w, h, logical) in &[(1, 3, 256), (1366, 768, 1920), (7, 5, 11), (800, 600, 1)] {
            let first = compute_surface_size(w, h, logical);
            let second = compute_surface_size(w, h, logical);
            assert_eq!(first, second);
            assert_eq!(first.height, logical);
            let expected = (w as f64 / h as f64 * logical as f64).floor() as u32;
            assert_eq!(first.width, expected);
        }
    }

    #[test]
    fn resize_builds_and_starts_one_loop() {
        let mut controller = controller(EffectVariant::Feedback);
        controller.on_resize(1600, 1024).unwrap();

        assert!(controller.is_running());
        assert_eq!(controller.build_id(), Some(BuildId(1)));
        assert_eq!(controller.surface_size(), Some(SurfaceSize::new(400, 256)));
        assert_eq!(controller.host().surface_size(), SurfaceSize::new(400, 256));
        assert_eq!(controller.host().pending_frames(), 1);
        assert_eq!(
            controller.seeds().requests,
            vec![(BuildId(1), SurfaceSize::new(400, 256))]
        );
    }

    #[test]
    fn first_frame_before_seed_samples_blue_placeholder() {
        let mut controller = controller(EffectVariant::Feedback);
        controller.on_resize(1600, 1024).unwrap();

        assert_eq!(fire(&mut controller), FrameOutcome::Rendered);

        assert_eq!(
            controller.host().last_draw_source(),
            Some((1, 1, PLACEHOLDER_PIXEL.to_vec()))
        );
        assert!(controller
            .host()
            .framebuffer()
            .chunks_exact(4)
            .all(|pixel| pixel == PLACEHOLDER_PIXEL));
    }

    #[test]
    fn stale_seed_never_touches_current_texture() {
        let mut controller = controller(EffectVariant::Feedback);
        controller.on_resize(1600, 1024).unwrap();
        controller.on_resize(1200, 1024).unwrap();
        controller.on_resize(800, 1024).unwrap();
        controller.host_mut().clear_calls();

        let outcome = controller.on_seed_loaded(BuildId(1), Ok(seed(2, 2, 7)));

        assert_eq!(outcome, SeedOutcome::Stale);
        assert!(controller.host().calls().is_empty());

        let outcome = controller.on_seed_loaded(BuildId(3), Ok(seed(2, 2, 9)));
        assert_eq!(outcome, SeedOutcome::Applied);
        assert_eq!(
            controller.host().last_draw_source(),
            None,
            "seed delivery must not draw"
        );
    }

    #[test]
    fn rapid_resizes_leave_a_single_running_loop() {
        let mut controller = controller(EffectVariant::Feedback);
        let mut superseded = Vec::new();
        for width in [800, 900, 1000, 1100, 1200] {
            superseded.extend(controller.host().pending_tokens());
            controller.on_resize(width, 1024).unwrap();
            assert_eq!(controller.host().pending_frames(), 1);
        }

        for token in superseded {
            assert_ne!(controller.on_frame(token), FrameOutcome::Rendered);
        }
        assert_eq!(controller.frame_time(), Some(0));
        assert_eq!(fire(&mut controller), FrameOutcome::Rendered);
        assert_eq!(controller.frame_time(), Some(1));

        assert_eq!(controller.host().live_programs(), 1);
        assert_eq!(controller.host().live_vertex_buffers(), 1);
        assert_eq!(controller.host().live_textures(), 1);
        assert_eq!(controller.host().live_shaders(), 0);
    }

    #[test]
    fn rebuild_regenerates_geometry_for_new_size() {
        let mut controller = controller(EffectVariant::Noise);
        controller.on_resize(1600, 1024).unwrap();
        controller.on_resize(3200, 1024).unwrap();

        assert_eq!(
            controller.host().last_vertices(),
            crate::geometry::build_quad(800, 256).to_vec()
        );
    }

    #[test]
    fn seed_then_feedback_cycle() {
        let mut controller = controller(EffectVariant::Feedback);
        controller.on_resize(1600, 1024).unwrap();
        let build = controller.build_id().unwrap();

        assert_eq!(
            controller.on_seed_loaded(build, Ok(seed(4, 4, 200))),
            SeedOutcome::Applied
        );
        fire(&mut controller);
        assert_eq!(
            controller.host().last_draw_source(),
            Some((4, 4, vec![200; 64]))
        );

        fire(&mut controller);
        let (width, height, _) = controller.host().last_draw_source().unwrap();
        assert_eq!((width, height), (400, 256));
    }

    #[test]
    fn decode_failure_keeps_placeholder_and_loop() {
        let mut controller = controller(EffectVariant::Noise);
        controller.on_resize(1600, 1024).unwrap();
        let build = controller.build_id().unwrap();

        let outcome =
            controller.on_seed_loaded(build, Err(ImageDecodeError("truncated jpeg".into())));

        assert_eq!(outcome, SeedOutcome::Failed);
        for _ in 0..3 {
            assert_eq!(fire(&mut controller), FrameOutcome::Rendered);
        }
        assert_eq!(
            controller.host().last_draw_source(),
            Some((1, 1, PLACEHOLDER_PIXEL.to_vec()))
        );
    }

    #[test]
    fn compile_failure_stops_rendering_until_next_resize() {
        let mut controller = controller(EffectVariant::Feedback);
        controller.on_resize(1600, 1024).unwrap();
        controller
            .host_mut()
            .fail(Failure::Compile(ShaderKind::Fragment));

        let err = controller.on_resize(1200, 1024).unwrap_err();

        assert!(matches!(err, PipelineError::Compilation { .. }));
        assert!(!controller.is_running());
        assert_eq!(controller.host().pending_frames(), 0);
        assert_eq!(controller.host().live_objects(), 0);

        controller.host_mut().clear_failures();
        controller.on_resize(1200, 1024).unwrap();
        assert!(controller.is_running());
        assert_eq!(controller.build_id(), Some(BuildId(3)));
    }

    #[test]
    fn seed_for_failed_build_is_dropped() {
        let mut controller = controller(EffectVariant::Feedback);
        controller.host_mut().fail(Failure::Link);
        assert!(controller.on_resize(1600, 1024).is_err());

        assert_eq!(
            controller.on_seed_loaded(BuildId(1), Ok(seed(1, 1, 0))),
            SeedOutcome::Stale
        );
    }

    #[test]
    fn empty_window_keeps_previous_build() {
        let mut controller = controller(EffectVariant::Feedback);
        controller.on_resize(1600, 1024).unwrap();

        controller.on_resize(1600, 0).unwrap();
        controller.on_resize(0, 1024).unwrap();

        assert_eq!(controller.build_id(), Some(BuildId(1)));
        assert!(controller.is_running());
    }

    #[test]
    fn teardown_releases_everything_and_is_idempotent() {
        let mut controller = controller(EffectVariant::Feedback);
        controller.on_resize(1600, 1024).unwrap();
        let token = controller.host().pending_tokens()[0];

        controller.teardown();
        controller.teardown();

        assert_eq!(controller.host().live_objects(), 0);
        assert_eq!(controller.host().pending_frames(), 0);
        assert_eq!(controller.on_frame(token), FrameOutcome::Stopped);
        assert_eq!(controller.build_id(), None);
    }

    #[test]
    fn texture_role_progresses_through_seed_and_feedback() {
        let mut controller = controller(EffectVariant::Feedback);
        controller.on_resize(1600, 1024).unwrap();
        let build = controller.build_id().unwrap();
        let role = |c: &Controller| c.active.as_ref().unwrap().pipeline.texture().role();

        assert_eq!(role(&controller), TextureRole::Placeholder);
        controller.on_seed_loaded(build, Ok(seed(2, 2, 1)));
        assert_eq!(role(&controller), TextureRole::Seed);
        fire(&mut controller);
        assert_eq!(role(&controller), TextureRole::Feedback);
    }
}
