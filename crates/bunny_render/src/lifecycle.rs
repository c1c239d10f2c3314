//! GPU resource lifecycle
//!
//! ```text
//! Uninitialized --setup--> Ready --loss--> Lost --teardown--> TornDown
//!                            ^                                   |
//!                            +-------------- setup --------------+
//! ```
//!
//! `Ready -> TornDown` is also allowed for orderly shutdown. Setup is
//! bracketed by [`GpuLifecycle::begin_setup`] / [`GpuLifecycle::finish_setup`]
//! and only one may be in flight.

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GpuState {
    Uninitialized,
    Ready,
    Lost,
    TornDown,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum LifecycleError {
    #[error("invalid GPU lifecycle transition {from:?} -> {to:?}")]
    InvalidTransition { from: GpuState, to: GpuState },

    #[error("a GPU rebuild is already in progress")]
    RebuildInFlight,
}

#[derive(Debug)]
pub struct GpuLifecycle {
    state: GpuState,
    setup_in_flight: bool,
    generation: u64,
}

impl GpuLifecycle {
    pub fn new() -> Self {
        Self {
            state: GpuState::Uninitialized,
            setup_in_flight: false,
            generation: 0,
        }
    }

    pub fn state(&self) -> GpuState {
        self.state
    }

    /// Number of completed setups; bumps on every rebuild.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_ready(&self) -> bool {
        self.state == GpuState::Ready
    }

    pub fn setup_in_flight(&self) -> bool {
        self.setup_in_flight
    }

    pub fn begin_setup(&mut self) -> Result<(), LifecycleError> {
        if self.setup_in_flight {
            return Err(LifecycleError::RebuildInFlight);
        }
        match self.state {
            GpuState::Uninitialized | GpuState::TornDown => {
                self.setup_in_flight = true;
                Ok(())
            }
            from => Err(LifecycleError::InvalidTransition {
                from,
                to: GpuState::Ready,
            }),
        }
    }

    pub fn finish_setup(&mut self) -> Result<(), LifecycleError> {
        if !self.setup_in_flight {
            return Err(LifecycleError::InvalidTransition {
                from: self.state,
                to: GpuState::Ready,
            });
        }
        self.setup_in_flight = false;
        self.state = GpuState::Ready;
        self.generation += 1;
        Ok(())
    }

    /// Setup failed; the state is left where it was.
    pub fn abort_setup(&mut self) {
        self.setup_in_flight = false;
    }

    pub fn mark_lost(&mut self) -> Result<(), LifecycleError> {
        self.transition(GpuState::Lost, |from| from == GpuState::Ready)
    }

    pub fn mark_torn_down(&mut self) -> Result<(), LifecycleError> {
        self.transition(GpuState::TornDown, |from| {
            matches!(from, GpuState::Ready | GpuState::Lost)
        })
    }

    fn transition(
        &mut self,
        to: GpuState,
        allowed: impl FnOnce(GpuState) -> bool,
    ) -> Result<(), LifecycleError> {
        let from = self.state;
        if !allowed(from) {
            return Err(LifecycleError::InvalidTransition { from, to });
        }
        tracing::debug!(?from, ?to, "gpu lifecycle transition");
        self.state = to;
        Ok(())
    }
}

impl Default for GpuLifecycle {
    fn default() -> Self {
        Self::new()
    }
}
