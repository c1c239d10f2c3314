//! Bunnymark
//!
//! Boots logging and settings, builds the sprite atlas, then hands a fresh
//! simulation to the winit event loop.

mod app;
mod recovery;

use anyhow::{Context, Result};
use bunny_asset::build_atlas;
use bunny_core::constants::{BUNNY_NAMES, TEXTURE_HEIGHT, TEXTURE_WIDTH};
use bunny_core::{create_static_data, SimulationState};
use bunny_services::Settings;
use tracing_subscriber::EnvFilter;

use crate::app::{App, AtlasPixels};

const SETTINGS_FILE: &str = "bunnymark.json";

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    tracing::info!("Bunnymark v{}", bunny_core::VERSION);

    let mut settings = Settings::load(SETTINGS_FILE)?;
    settings.apply_env();
    settings.apply_args(std::env::args().skip(1));
    tracing::debug!(?settings, "resolved settings");

    // Assets first: a missing sprite aborts before any simulation exists.
    let sheet = build_atlas(&settings.asset_dir, &BUNNY_NAMES[..])
        .with_context(|| format!("loading sprites from {}", settings.asset_dir.display()))?;
    let atlas = sheet.resized(TEXTURE_WIDTH, TEXTURE_HEIGHT);
    let atlas = AtlasPixels {
        width: atlas.width(),
        height: atlas.height(),
        rgba: atlas.into_raw(),
    };

    let count = settings.bunny_count.get();
    let mut rng = rand::thread_rng();
    let state = SimulationState::new(count, &mut rng);
    let static_data = create_static_data(count, &mut rng);
    tracing::info!("{count} bunnies bouncing!");

    let event_loop = bunny_render::window::create_event_loop()?;
    let mut app = App::new(settings, atlas, static_data, state);
    event_loop.run_app(&mut app)?;

    match app.take_error() {
        Some(err) => Err(err),
        None => Ok(()),
    }
}
