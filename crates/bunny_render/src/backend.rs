//! Adapter and surface capability selection
//!
//! No software fallback: a surface without a usable format is a setup error.

use crate::error::RenderError;

/// What setup learned about the adapter, for logging.
#[derive(Debug, Clone)]
pub struct DeviceCapabilities {
    pub backend: wgpu::Backend,
    pub adapter_name: String,
    pub max_buffer_size: u64,
    pub max_texture_size: u32,
}

impl DeviceCapabilities {
    pub fn probe(adapter: &wgpu::Adapter) -> Self {
        let info = adapter.get_info();
        let limits = adapter.limits();
        Self {
            backend: info.backend,
            adapter_name: info.name,
            max_buffer_size: limits.max_buffer_size,
            max_texture_size: limits.max_texture_dimension_2d,
        }
    }
}

/// Prefer a linear (non-sRGB) format to match the `Rgba8Unorm` atlas.
pub fn select_surface_format(
    formats: &[wgpu::TextureFormat],
) -> Result<wgpu::TextureFormat, RenderError> {
    formats
        .iter()
        .copied()
        .find(|f| !f.is_srgb())
        .or_else(|| formats.first().copied())
        .ok_or(RenderError::UnsupportedSurface("texture format"))
}

/// Pre-multiplied compositing when the platform offers it.
pub fn select_alpha_mode(
    modes: &[wgpu::CompositeAlphaMode],
) -> Result<wgpu::CompositeAlphaMode, RenderError> {
    if modes.contains(&wgpu::CompositeAlphaMode::PreMultiplied) {
        return Ok(wgpu::CompositeAlphaMode::PreMultiplied);
    }
    modes
        .first()
        .copied()
        .ok_or(RenderError::UnsupportedSurface("alpha mode"))
}

/// Fifo is always available; without vsync take the lowest latency mode
/// the surface has.
pub fn select_present_mode(vsync: bool, modes: &[wgpu::PresentMode]) -> wgpu::PresentMode {
    if vsync {
        return wgpu::PresentMode::Fifo;
    }
    [wgpu::PresentMode::Immediate, wgpu::PresentMode::Mailbox]
        .into_iter()
        .find(|mode| modes.contains(mode))
        .unwrap_or(wgpu::PresentMode::Fifo)
}
