//! Bunny Services Layer
//!
//! Host-facing configuration: where the body count, window and asset
//! settings come from before anything else starts.

pub mod settings;

pub use settings::{BunnyCount, Settings, SettingsError, WindowSettings};
