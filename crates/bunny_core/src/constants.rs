//! Numeric constants
//!
//! These values must stay bit-for-bit identical across implementations so
//! that recorded runs can be compared.

/// Constant downward acceleration, applied per reference frame.
pub const GRAVITY: f32 = -0.00075;
/// Fraction of vertical speed kept after a floor contact.
pub const BOUNCE_DAMPING: f32 = 0.85;

pub const BOUNDS_LEFT: f32 = -1.0;
pub const BOUNDS_RIGHT: f32 = 1.0;
pub const BOUNDS_BOTTOM: f32 = -1.0;
pub const BOUNDS_TOP: f32 = 1.0;

/// Render scale of every sprite in normalized device units.
pub const SCALE_X: f32 = 0.015;
pub const SCALE_Y: f32 = 0.02;

/// Upper bound of the random upward impulse added on a floor bounce.
pub const FLOOR_JITTER_MAX: f32 = 0.006;
/// Initial state of the per-frame jitter generator.
pub const JITTER_SEED: u32 = 0xdead_beef;

/// Physics reference rate (60 Hz = 16.666ms per frame)
pub const TARGET_FPS: f32 = 60.0;
pub const TARGET_FRAME_TIME_MS: f32 = 1000.0 / TARGET_FPS;
/// Elapsed time above this is treated as a stall and clamped.
pub const MAX_FRAME_DELTA_MS: f32 = 100.0;

/// Spritesheet grid (4 columns x 3 rows = 12 variants)
pub const SPRITE_COLUMNS: u32 = 4;
pub const SPRITE_ROWS: u32 = 3;
pub const SPRITE_TYPES: u32 = 12;

/// Pixel footprint of the atlas texture uploaded to the GPU.
pub const TEXTURE_WIDTH: u32 = 104;
pub const TEXTURE_HEIGHT: u32 = 111;

/// Floats per body in the physics buffer: x, y, vx, vy
pub const PHYSICS_STRIDE: usize = 4;
/// Floats per body in the position buffer: x, y
pub const POSITION_STRIDE: usize = 2;

/// Sprite variants, in atlas order.
pub const BUNNY_NAMES: [&str; SPRITE_TYPES as usize] = [
    "rabbitv3_ash",
    "rabbitv3_batman",
    "rabbitv3_bb8",
    "rabbitv3_frankenstein",
    "rabbitv3_neo",
    "rabbitv3_sonic",
    "rabbitv3_spidey",
    "rabbitv3_stormtrooper",
    "rabbitv3_superman",
    "rabbitv3_tron",
    "rabbitv3_wolverine",
    "rabbitv3",
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn atlas_grid_covers_all_variants() {
        assert_eq!(SPRITE_COLUMNS * SPRITE_ROWS, SPRITE_TYPES);
        assert_eq!(BUNNY_NAMES.len() as u32, SPRITE_TYPES);
    }

    #[test]
    fn reference_frame_is_60hz() {
        assert!((TARGET_FRAME_TIME_MS - 16.666_666).abs() < 1e-4);
    }
}
