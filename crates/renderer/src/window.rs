use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{anyhow, Context, Result};
use feedback::{EffectVariant, FrameOutcome, SeedDelivery, ViewportController};
use winit::dpi::PhysicalSize;
use winit::event::{Event, WindowEvent};
use winit::event_loop::{ControlFlow, EventLoopBuilder};
use winit::window::WindowBuilder;

use crate::gpu::WgpuHost;
use crate::seed::ThreadedSeedSource;
use crate::types::RendererConfig;

type Controller = ViewportController<WgpuHost, ThreadedSeedSource>;

const STATS_INTERVAL: Duration = Duration::from_secs(1);

/// Opens the window and drives the feedback loop until it is closed.
pub(crate) fn run_window(config: &RendererConfig) -> Result<()> {
    let event_loop = EventLoopBuilder::<SeedDelivery>::with_user_event()
        .build()
        .map_err(|err| anyhow!("failed to create event loop: {err}"))?;
    let proxy = event_loop.create_proxy();

    let (width, height) = config.window_size;
    let window = WindowBuilder::new()
        .with_title(config.title.as_str())
        .with_inner_size(PhysicalSize::new(width, height))
        .build(&event_loop)
        .context("failed to create window")?;
    let window = Arc::new(window);

    let host = WgpuHost::new(window.clone()).context("failed to initialise GPU host")?;
    let seeds = ThreadedSeedSource::new(config.seed.clone(), host.max_texture_dimension(), proxy);
    let mut controller =
        ViewportController::new(host, seeds, config.variant, config.logical_height);
    tracing::info!(
        variant = %config.variant,
        logical_height = config.logical_height,
        seed = %config.seed.describe(),
        "starting acidwall"
    );

    let initial = controller.host().window_size();
    rebuild(&mut controller, initial);

    let mut stats = FrameStats::new(Instant::now());
    event_loop
        .run(move |event, elwt| {
            elwt.set_control_flow(ControlFlow::Wait);
            match event {
                Event::UserEvent(SeedDelivery { build, result }) => {
                    controller.on_seed_loaded(build, result);
                }
                Event::WindowEvent { window_id, event } if window_id == window.id() => match event {
                    WindowEvent::CloseRequested | WindowEvent::Destroyed => {
                        controller.teardown();
                        elwt.exit();
                    }
                    WindowEvent::Resized(new_size) => {
                        controller.host_mut().resize_window(new_size);
                        rebuild(&mut controller, new_size);
                    }
                    WindowEvent::RedrawRequested => {
                        let Some(token) = controller.host_mut().take_due_frame() else {
                            return;
                        };
                        if controller.on_frame(token) == FrameOutcome::Rendered {
                            let frame = controller.frame_time();
                            stats.record(Instant::now(), frame, controller.variant());
                        }
                    }
                    _ => {}
                },
                Event::LoopExiting => {
                    controller.teardown();
                }
                _ => {}
            }
        })
        .map_err(|err| anyhow!("window event loop error: {err}"))
}

fn rebuild(controller: &mut Controller, size: PhysicalSize<u32>) {
    if let Err(err) = controller.on_resize(size.width, size.height) {
        tracing::debug!(error = %err, "pipeline unavailable until the next resize");
    }
}

/// Once-per-second frame rate log.
struct FrameStats {
    window_start: Instant,
    frames: u32,
}

impl FrameStats {
    fn new(now: Instant) -> Self {
        Self {
            window_start: now,
            frames: 0,
        }
    }

    fn record(&mut self, now: Instant, frame: Option<u64>, variant: EffectVariant) {
        self.frames += 1;
        let elapsed = now.saturating_duration_since(self.window_start);
        if elapsed < STATS_INTERVAL {
            return;
        }
        let fps = f64::from(self.frames) / elapsed.as_secs_f64();
        let frame = frame.unwrap_or_default();
        tracing::debug!(
            fps,
            frame,
            scroll_offset = EffectVariant::scroll_offset(frame as f32),
            %variant,
            "render stats"
        );
        self.window_start = now;
        self.frames = 0;
    }
}
