//! Frame loop
//!
//! Simulation state lives here, outside the presenter, so it survives any
//! number of device losses. Each frame advances it, copies the positions into
//! the current ring slot and draws.

use std::sync::Arc;
use std::time::{Duration, Instant};

use bunny_core::time::FrameClock;
use bunny_core::{SimulationState, StaticSprite};
use bunny_metrics::{FrameTimer, PhaseProfiler};
use bunny_render::wgpu;
use bunny_render::window::{window_attributes, WindowConfig};
use bunny_render::winit::{
    application::ApplicationHandler,
    event::{ElementState, KeyEvent, WindowEvent},
    event_loop::ActiveEventLoop,
    keyboard::{Key, NamedKey},
    window::{Window, WindowId},
};
use bunny_render::{AtlasImage, Presenter, RendererDescriptor};
use bunny_services::Settings;

use crate::recovery::RebuildSchedule;

const REPORT_INTERVAL: Duration = Duration::from_secs(2);

/// Decoded atlas pixels kept on the CPU for rebuilds.
pub struct AtlasPixels {
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
}

impl AtlasPixels {
    fn image(&self) -> AtlasImage<'_> {
        AtlasImage {
            width: self.width,
            height: self.height,
            rgba: &self.rgba,
        }
    }
}

enum FrameOutcome {
    Presented,
    Skipped,
    Fatal(anyhow::Error),
}

pub struct App {
    settings: Settings,
    atlas: AtlasPixels,
    static_data: Vec<StaticSprite>,
    state: SimulationState,
    window: Option<Arc<Window>>,
    presenter: Presenter,
    rebuild: RebuildSchedule,
    clock: FrameClock,
    frame_timer: FrameTimer,
    phases: PhaseProfiler,
    last_report: Instant,
    error: Option<anyhow::Error>,
}

impl App {
    pub fn new(
        settings: Settings,
        atlas: AtlasPixels,
        static_data: Vec<StaticSprite>,
        state: SimulationState,
    ) -> Self {
        let backoff = Duration::from_millis(settings.device_loss_backoff_ms);
        Self {
            settings,
            atlas,
            static_data,
            state,
            window: None,
            presenter: Presenter::new(),
            rebuild: RebuildSchedule::new(backoff),
            clock: FrameClock::new(),
            frame_timer: FrameTimer::new(120),
            phases: PhaseProfiler::new(),
            last_report: Instant::now(),
            error: None,
        }
    }

    /// The error that ended the loop, if any.
    pub fn take_error(&mut self) -> Option<anyhow::Error> {
        self.error.take()
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, err: anyhow::Error) {
        tracing::error!("{err:#}");
        self.presenter.shutdown();
        self.error = Some(err);
        event_loop.exit();
    }

    fn setup_renderer(&mut self, window: Arc<Window>) -> Result<(), bunny_render::RenderError> {
        self.presenter.setup(
            window,
            RendererDescriptor {
                atlas: self.atlas.image(),
                static_data: &self.static_data,
                positions: self.state.positions(),
                vsync: self.settings.vsync,
            },
        )?;
        // Time spent building the device is not simulated.
        self.clock.reset();
        Ok(())
    }

    fn rebuild_renderer(&mut self) {
        let Some(window) = self.window.clone() else {
            return;
        };
        match self.setup_renderer(Arc::clone(&window)) {
            Ok(()) => {
                tracing::info!(
                    attempts = self.rebuild.attempts(),
                    generation = self.presenter.generation(),
                    "GPU resources rebuilt"
                );
                self.rebuild.succeeded();
                // The new surface may not match a size change made while lost.
                let size = window.inner_size();
                if let Some(renderer) = self.presenter.renderer_mut() {
                    renderer.resize(size.width, size.height);
                }
            }
            Err(err) => {
                tracing::error!(%err, attempts = self.rebuild.attempts(), "GPU rebuild failed, retrying");
                self.rebuild.schedule(Instant::now());
            }
        }
    }

    fn frame(&mut self) -> FrameOutcome {
        self.frame_timer.begin();

        let delta_ms = self.clock.tick();
        let parallel = self.settings.parallel_physics;
        let state = &mut self.state;
        self.phases.time("simulate", || {
            if parallel {
                state.advance_parallel(delta_ms)
            } else {
                state.advance(delta_ms)
            }
        });

        let outcome = match self.presenter.renderer_mut() {
            None => FrameOutcome::Skipped,
            Some(renderer) => {
                let positions = self.state.positions();
                match self.phases.time("upload", || renderer.upload_positions(positions)) {
                    Err(err) => FrameOutcome::Fatal(err.into()),
                    Ok(()) => match self.phases.time("render", || renderer.render()) {
                        Ok(()) => FrameOutcome::Presented,
                        Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                            renderer.reconfigure();
                            FrameOutcome::Skipped
                        }
                        Err(wgpu::SurfaceError::OutOfMemory) => {
                            FrameOutcome::Fatal(anyhow::anyhow!("GPU out of memory"))
                        }
                        Err(err) => {
                            tracing::warn!(%err, "skipping frame");
                            FrameOutcome::Skipped
                        }
                    },
                }
            }
        };

        self.frame_timer.end();
        self.report();
        outcome
    }

    fn report(&mut self) {
        if self.last_report.elapsed() < REPORT_INTERVAL {
            return;
        }
        self.last_report = Instant::now();

        let (min_ms, max_ms) = self.frame_timer.frame_time_range_ms();
        tracing::info!(
            fps = format_args!("{:.1}", self.frame_timer.fps()),
            frame_ms = format_args!("{:.2}", self.frame_timer.frame_time_ms()),
            min_ms = format_args!("{min_ms:.2}"),
            max_ms = format_args!("{max_ms:.2}"),
            work_ms = format_args!("{:.2}", self.frame_timer.work_time_ms()),
            bunnies = self.state.len(),
            phases = %self.phases.summary(),
            "frame stats"
        );
        self.phases.reset();
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }

        let config = WindowConfig {
            title: self.settings.window.title.clone(),
            width: self.settings.window.width,
            height: self.settings.window.height,
        };
        let window = match event_loop.create_window(window_attributes(&config)) {
            Ok(window) => Arc::new(window),
            Err(err) => {
                self.fail(event_loop, anyhow::Error::new(err).context("failed to create window"));
                return;
            }
        };
        self.window = Some(Arc::clone(&window));

        if let Err(err) = self.setup_renderer(window) {
            self.fail(event_loop, anyhow::Error::new(err).context("GPU setup failed"));
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        match event {
            WindowEvent::CloseRequested
            | WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        logical_key: Key::Named(NamedKey::Escape),
                        state: ElementState::Pressed,
                        ..
                    },
                ..
            } => {
                self.presenter.shutdown();
                event_loop.exit();
            }
            WindowEvent::Resized(size) => {
                if let Some(renderer) = self.presenter.renderer_mut() {
                    renderer.resize(size.width, size.height);
                }
            }
            WindowEvent::RedrawRequested => {
                if let FrameOutcome::Fatal(err) = self.frame() {
                    self.fail(event_loop, err);
                    return;
                }
                if let Some(window) = &self.window {
                    window.request_redraw();
                }
            }
            _ => {}
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if self.presenter.poll_device_loss().is_some() {
            tracing::warn!(
                backoff_ms = self.settings.device_loss_backoff_ms,
                "scheduling GPU rebuild"
            );
            self.rebuild.schedule(Instant::now());
        }
        if self.rebuild.take_due(Instant::now()) {
            self.rebuild_renderer();
        }

        if let Some(window) = &self.window {
            window.request_redraw();
        }
    }

    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        self.presenter.shutdown();
    }
}
