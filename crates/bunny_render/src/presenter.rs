//! Owner of one renderer at a time
//!
//! Ties the renderer to its [`GpuLifecycle`] and [`DeviceLossSignal`]. When a
//! loss is polled the renderer is torn down here; deciding when to rebuild is
//! left to the caller.

use std::sync::Arc;

use winit::window::Window;

use crate::device_loss::{DeviceLossEvent, DeviceLossSignal};
use crate::error::RenderError;
use crate::lifecycle::{GpuLifecycle, GpuState};
use crate::renderer::{BunnyRenderer, RendererDescriptor};

#[derive(Default)]
pub struct Presenter {
    lifecycle: GpuLifecycle,
    signal: DeviceLossSignal,
    renderer: Option<BunnyRenderer>,
}

impl Presenter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> GpuState {
        self.lifecycle.state()
    }

    pub fn generation(&self) -> u64 {
        self.lifecycle.generation()
    }

    /// Build a renderer from scratch. Valid from `Uninitialized` or
    /// `TornDown`; a failed setup leaves the state unchanged.
    pub fn setup(
        &mut self,
        window: Arc<Window>,
        desc: RendererDescriptor<'_>,
    ) -> Result<(), RenderError> {
        self.lifecycle.begin_setup()?;
        let notifier = self.signal.arm();

        match pollster::block_on(BunnyRenderer::new(window, desc, notifier)) {
            Ok(renderer) => {
                self.renderer = Some(renderer);
                self.lifecycle.finish_setup()?;
                tracing::info!(generation = self.lifecycle.generation(), "GPU setup complete");
                Ok(())
            }
            Err(err) => {
                self.signal.disarm();
                self.lifecycle.abort_setup();
                Err(err)
            }
        }
    }

    /// Check for a reported loss. On an event the renderer is released and
    /// the lifecycle ends in `TornDown`, ready for a rebuild.
    pub fn poll_device_loss(&mut self) -> Option<DeviceLossEvent> {
        let event = self.signal.poll()?;

        if let Err(err) = self.lifecycle.mark_lost() {
            tracing::debug!(%err, episode = event.episode, "ignoring stale device loss");
            return None;
        }
        tracing::warn!(
            episode = event.episode,
            reason = %event.reason,
            message = %event.message,
            "device lost, releasing GPU resources"
        );

        if let Some(mut renderer) = self.renderer.take() {
            renderer.teardown();
        }
        if let Err(err) = self.lifecycle.mark_torn_down() {
            tracing::error!(%err, "lifecycle out of sync after device loss");
        }
        Some(event)
    }

    /// `None` unless the lifecycle is `Ready`.
    pub fn renderer_mut(&mut self) -> Option<&mut BunnyRenderer> {
        if !self.lifecycle.is_ready() {
            return None;
        }
        self.renderer.as_mut()
    }

    /// Orderly release. The device callback is disarmed first so destroying
    /// the device is not reported as a loss.
    pub fn shutdown(&mut self) {
        self.signal.disarm();
        if let Some(mut renderer) = self.renderer.take() {
            renderer.teardown();
        }
        if self.lifecycle.is_ready() {
            if let Err(err) = self.lifecycle.mark_torn_down() {
                tracing::error!(%err, "lifecycle out of sync at shutdown");
            }
        }
    }
}

impl Drop for Presenter {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ready_presenter() -> Presenter {
        let mut presenter = Presenter::new();
        presenter.lifecycle.begin_setup().unwrap();
        presenter.lifecycle.finish_setup().unwrap();
        presenter
    }

    #[test]
    fn nothing_to_poll_by_default() {
        let mut presenter = Presenter::new();
        assert!(presenter.poll_device_loss().is_none());
        assert_eq!(presenter.state(), GpuState::Uninitialized);
        assert!(presenter.renderer_mut().is_none());
    }

    #[test]
    fn loss_moves_ready_to_torn_down() {
        let mut presenter = ready_presenter();
        let notifier = presenter.signal.arm();
        assert!(notifier.notify("Unknown", "driver reset"));

        let event = presenter.poll_device_loss().unwrap();
        assert_eq!(event.message, "driver reset");
        assert_eq!(presenter.state(), GpuState::TornDown);
        assert!(presenter.poll_device_loss().is_none());
    }

    #[test]
    fn loss_before_ready_is_ignored() {
        let mut presenter = Presenter::new();
        let notifier = presenter.signal.arm();
        notifier.notify("Unknown", "early");
        assert!(presenter.poll_device_loss().is_none());
        assert_eq!(presenter.state(), GpuState::Uninitialized);
    }

    #[test]
    fn shutdown_is_not_a_loss() {
        let mut presenter = ready_presenter();
        let notifier = presenter.signal.arm();
        presenter.shutdown();

        assert!(!notifier.notify("Destroyed", "device destroyed"));
        assert!(presenter.poll_device_loss().is_none());
        assert_eq!(presenter.state(), GpuState::TornDown);

        presenter.shutdown();
        assert_eq!(presenter.state(), GpuState::TornDown);
    }
}
