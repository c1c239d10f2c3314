//! Bunny Core
//!
//! Contains the Simulation Engine:
//! - Numeric constants shared with the renderer
//! - Structure-of-arrays physics state and static render attributes
//! - Per-frame integration and boundary response
//! - Fast deterministic jitter generator and frame clock

pub mod constants;
pub mod rng;
pub mod sim;
pub mod time;

pub use sim::{create_static_data, SimulationState, StaticSprite};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_is_set() {
        assert!(!VERSION.is_empty());
    }
}
