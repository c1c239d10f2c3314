use thiserror::Error;

use crate::lifecycle::LifecycleError;

/// Failures of the presentation pipeline. Everything except
/// [`RenderError::PositionCountMismatch`] is fatal to setup.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("failed to create surface: {0}")]
    CreateSurface(#[from] wgpu::CreateSurfaceError),

    #[error("no compatible GPU adapter found")]
    NoAdapter,

    #[error("failed to acquire GPU device: {0}")]
    RequestDevice(#[from] wgpu::RequestDeviceError),

    #[error("surface reports no supported {0}")]
    UnsupportedSurface(&'static str),

    #[error("{label} needs {requested} bytes, device limit is {limit}")]
    BufferTooLarge {
        label: &'static str,
        requested: u64,
        limit: u64,
    },

    #[error("expected {expected} position floats, got {actual}")]
    PositionCountMismatch { expected: usize, actual: usize },

    #[error("atlas data is {actual} bytes, expected {expected} for {width}x{height} RGBA8")]
    AtlasSize {
        width: u32,
        height: u32,
        expected: usize,
        actual: usize,
    },

    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),
}
