//! Window creation via winit
//!
//! Windows must be created inside `ApplicationHandler::resumed` (winit 0.30);
//! this module only builds the attributes and the event loop.

use winit::{
    event_loop::{ControlFlow, EventLoop},
    window::Window,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: "Bunnymark".to_string(),
            width: 1280,
            height: 720,
        }
    }
}

pub fn window_attributes(config: &WindowConfig) -> winit::window::WindowAttributes {
    Window::default_attributes()
        .with_title(config.title.clone())
        .with_inner_size(winit::dpi::LogicalSize::new(
            config.width.max(1),
            config.height.max(1),
        ))
}

/// Event loop that redraws continuously.
pub fn create_event_loop() -> Result<EventLoop<()>, winit::error::EventLoopError> {
    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Poll);
    Ok(event_loop)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_720p() {
        let config = WindowConfig::default();
        assert_eq!((config.width, config.height), (1280, 720));
        assert_eq!(config.title, "Bunnymark");
    }

    #[test]
    fn attributes_carry_title() {
        let attrs = window_attributes(&WindowConfig {
            title: "bunnies".into(),
            width: 0,
            height: 10,
        });
        assert_eq!(attrs.title, "bunnies");
        assert!(attrs.inner_size.is_some());
    }
}
