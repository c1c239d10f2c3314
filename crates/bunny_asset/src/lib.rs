//! Bunny Asset Pipeline
//!
//! Builds the sprite atlas from individual images before the simulation
//! starts. The result is immutable input to the renderer.

pub mod spritesheet;

pub use spritesheet::{build_atlas, AssetError, SpriteFrame, Spritesheet};
