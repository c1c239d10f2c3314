//! Bunny Render
//!
//! wgpu presentation of the simulation: one instanced draw per frame over a
//! static attribute buffer and a ring of position buffers, with explicit
//! teardown and out-of-band device-loss reporting.

pub mod backend;
pub mod device_loss;
pub mod error;
pub mod lifecycle;
pub mod presenter;
pub mod renderer;
pub mod ring;
pub mod window;

pub use wgpu;
pub use winit;

pub use device_loss::{DeviceLossEvent, DeviceLossNotifier, DeviceLossSignal};
pub use error::RenderError;
pub use lifecycle::{GpuLifecycle, GpuState, LifecycleError};
pub use presenter::Presenter;
pub use renderer::{AtlasImage, BunnyRenderer, RendererDescriptor, ScreenUniform, CLEAR_COLOR};
pub use ring::{Ring, POSITION_RING_SIZE};
pub use window::WindowConfig;

/// WGSL source for the sprite pipeline.
pub const SHADER_SOURCE: &str = include_str!("../shaders/bunny.wgsl");
