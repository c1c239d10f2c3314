//! Simulation Engine
//!
//! Bodies live in a flat structure-of-arrays buffer indexed by
//! `body * PHYSICS_STRIDE + field`. A second buffer carries positions only and
//! is the exact slice handed to the renderer each frame. Both are sized once
//! at creation and never reallocated.

use rand::Rng;
use rayon::prelude::*;

use crate::constants::{
    BOUNCE_DAMPING, BOUNDS_BOTTOM, BOUNDS_LEFT, BOUNDS_RIGHT, BOUNDS_TOP, FLOOR_JITTER_MAX,
    GRAVITY, PHYSICS_STRIDE, POSITION_STRIDE, SCALE_X, SCALE_Y, SPRITE_COLUMNS, SPRITE_ROWS,
    SPRITE_TYPES,
};
use crate::rng::XorShift32;
use crate::time::step_scale;

/// Bodies per rayon task in [`SimulationState::advance_parallel`].
pub const PARALLEL_CHUNK_BODIES: usize = 16 * 1024;

const SPAWN_RANGE: f32 = 0.95;
const SPAWN_SPEED_X: f32 = 0.015;
const SPAWN_SPEED_Y: f32 = 0.01;

/// Kinematic view of a single body.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Body {
    pub position: [f32; 2],
    pub velocity: [f32; 2],
}

/// Per-body render attributes, uploaded once.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct StaticSprite {
    pub scale: [f32; 2],
    pub uv_offset: [f32; 2],
}

impl StaticSprite {
    /// Attributes for atlas cell `sprite_index` (row-major, 4 columns).
    pub fn for_variant(sprite_index: u32) -> Self {
        let col = sprite_index % SPRITE_COLUMNS;
        let row = sprite_index / SPRITE_COLUMNS;
        Self {
            scale: [SCALE_X, SCALE_Y],
            uv_offset: [
                col as f32 / SPRITE_COLUMNS as f32,
                row as f32 / SPRITE_ROWS as f32,
            ],
        }
    }
}

/// Pick a sprite variant for each of `count` bodies.
pub fn create_static_data<R: Rng + ?Sized>(count: usize, rng: &mut R) -> Vec<StaticSprite> {
    (0..count)
        .map(|_| StaticSprite::for_variant(rng.gen_range(0..SPRITE_TYPES)))
        .collect()
}

pub struct SimulationState {
    physics: Vec<f32>,
    positions: Vec<f32>,
    jitter: XorShift32,
}

impl SimulationState {
    /// Spawn `count` bodies inside the visible bounds with small random
    /// velocities drawn from `rng`.
    pub fn new<R: Rng + ?Sized>(count: usize, rng: &mut R) -> Self {
        let mut physics = Vec::with_capacity(count * PHYSICS_STRIDE);
        for _ in 0..count {
            physics.push(rng.gen_range(-SPAWN_RANGE..SPAWN_RANGE));
            physics.push(rng.gen_range(-SPAWN_RANGE..SPAWN_RANGE));
            physics.push(rng.gen_range(-SPAWN_SPEED_X..SPAWN_SPEED_X));
            physics.push(rng.gen_range(-SPAWN_SPEED_Y..SPAWN_SPEED_Y));
        }
        tracing::debug!(count, "spawned bodies");
        Self::from_physics(physics)
    }

    /// Build a state from explicit bodies.
    pub fn from_bodies(bodies: &[Body]) -> Self {
        let physics = bodies
            .iter()
            .flat_map(|b| [b.position[0], b.position[1], b.velocity[0], b.velocity[1]])
            .collect();
        Self::from_physics(physics)
    }

    fn from_physics(physics: Vec<f32>) -> Self {
        let positions = physics
            .chunks_exact(PHYSICS_STRIDE)
            .flat_map(|body| [body[0], body[1]])
            .collect();
        Self {
            physics,
            positions,
            jitter: XorShift32::default(),
        }
    }

    /// Replace the floor-jitter generator seed.
    pub fn with_jitter_seed(mut self, seed: u32) -> Self {
        self.jitter = XorShift32::new(seed);
        self
    }

    pub fn len(&self) -> usize {
        self.physics.len() / PHYSICS_STRIDE
    }

    pub fn is_empty(&self) -> bool {
        self.physics.is_empty()
    }

    /// `x, y, vx, vy` per body.
    pub fn physics(&self) -> &[f32] {
        &self.physics
    }

    /// `x, y` per body; this is what gets uploaded.
    pub fn positions(&self) -> &[f32] {
        &self.positions
    }

    pub fn jitter(&self) -> &XorShift32 {
        &self.jitter
    }

    pub fn body(&self, index: usize) -> Option<Body> {
        self.physics
            .chunks_exact(PHYSICS_STRIDE)
            .nth(index)
            .map(|b| Body {
                position: [b[0], b[1]],
                velocity: [b[2], b[3]],
            })
    }

    /// Advance every body by `delta_ms` of wall-clock time.
    ///
    /// The delta is clamped first, so a stall of any length moves bodies by
    /// at most `MAX_FRAME_DELTA_MS` worth of motion.
    pub fn advance(&mut self, delta_ms: f32) {
        let dt = step_scale(delta_ms);
        step_bodies(&mut self.physics, &mut self.positions, dt, &mut self.jitter);
    }

    /// Same integration as [`advance`](Self::advance), split across rayon
    /// tasks.
    ///
    /// Each chunk of [`PARALLEL_CHUNK_BODIES`] draws jitter from its own
    /// stream derived from one draw of the owned generator, so the outcome is
    /// independent of thread scheduling. The jitter sequence differs from the
    /// sequential pass.
    pub fn advance_parallel(&mut self, delta_ms: f32) {
        let dt = step_scale(delta_ms);
        let frame_seed = self.jitter.next_u32();

        self.physics
            .par_chunks_mut(PARALLEL_CHUNK_BODIES * PHYSICS_STRIDE)
            .zip(self.positions.par_chunks_mut(PARALLEL_CHUNK_BODIES * POSITION_STRIDE))
            .enumerate()
            .for_each(|(chunk, (physics, positions))| {
                let mut jitter = XorShift32::derive(frame_seed, chunk as u64);
                step_bodies(physics, positions, dt, &mut jitter);
            });
    }
}

fn step_bodies(physics: &mut [f32], positions: &mut [f32], dt: f32, jitter: &mut XorShift32) {
    let gravity_dt = GRAVITY * dt;
    let right_bound = BOUNDS_RIGHT - SCALE_X;
    let top_bound = BOUNDS_TOP - SCALE_Y;

    for (body, position) in physics
        .chunks_exact_mut(PHYSICS_STRIDE)
        .zip(positions.chunks_exact_mut(POSITION_STRIDE))
    {
        let mut vel_x = body[2];
        let mut vel_y = body[3] + gravity_dt;
        let mut pos_x = body[0] + vel_x * dt;
        let mut pos_y = body[1] + vel_y * dt;

        if pos_x > right_bound {
            vel_x = -vel_x;
            pos_x = right_bound;
        } else if pos_x < BOUNDS_LEFT {
            vel_x = -vel_x;
            pos_x = BOUNDS_LEFT;
        }

        if pos_y < BOUNDS_BOTTOM {
            vel_y = -vel_y * BOUNCE_DAMPING;
            pos_y = BOUNDS_BOTTOM;
            // Magnitude first, then the coin flip that gates it.
            let magnitude = jitter.next_f32() * FLOOR_JITTER_MAX;
            if jitter.next_f32() > 0.5 {
                vel_y += magnitude;
            }
        } else if pos_y > top_bound {
            vel_y = -vel_y;
            pos_y = top_bound;
        }

        body[0] = pos_x;
        body[1] = pos_y;
        body[2] = vel_x;
        body[3] = vel_y;
        position[0] = pos_x;
        position[1] = pos_y;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::{JITTER_SEED, MAX_FRAME_DELTA_MS, TARGET_FRAME_TIME_MS};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    const EPS: f32 = 1e-6;

    fn seeded_state(count: usize, seed: u64) -> SimulationState {
        let mut rng = StdRng::seed_from_u64(seed);
        SimulationState::new(count, &mut rng)
    }

    fn assert_in_bounds(state: &SimulationState) {
        for (i, body) in state.physics().chunks_exact(PHYSICS_STRIDE).enumerate() {
            assert!(
                (BOUNDS_LEFT..=BOUNDS_RIGHT - SCALE_X).contains(&body[0]),
                "body {i} x={} out of bounds",
                body[0]
            );
            assert!(
                (BOUNDS_BOTTOM..=BOUNDS_TOP - SCALE_Y).contains(&body[1]),
                "body {i} y={} out of bounds",
                body[1]
            );
        }
    }

    fn assert_positions_mirror_physics(state: &SimulationState) {
        for (body, pos) in state
            .physics()
            .chunks_exact(PHYSICS_STRIDE)
            .zip(state.positions().chunks_exact(POSITION_STRIDE))
        {
            assert_eq!(body[0].to_bits(), pos[0].to_bits());
            assert_eq!(body[1].to_bits(), pos[1].to_bits());
        }
    }

    #[test]
    fn initial_state_is_inside_spawn_ranges() {
        let state = seeded_state(5_000, 7);
        assert_eq!(state.len(), 5_000);
        for body in state.physics().chunks_exact(PHYSICS_STRIDE) {
            assert!(body[0].abs() <= SPAWN_RANGE && body[1].abs() <= SPAWN_RANGE);
            assert!(body[2].abs() <= SPAWN_SPEED_X && body[3].abs() <= SPAWN_SPEED_Y);
        }
        assert_positions_mirror_physics(&state);
    }

    #[test]
    fn buffer_sizes_match_body_count() {
        let mut rng = StdRng::seed_from_u64(3);
        for count in [1_000, 4_321, 100_000] {
            let state = SimulationState::new(count, &mut rng);
            let static_data = create_static_data(count, &mut rng);
            assert_eq!(state.positions().len(), 2 * count);
            assert_eq!(state.physics().len(), 4 * count);
            assert_eq!(bytemuck::cast_slice::<StaticSprite, f32>(&static_data).len(), 4 * count);
        }
    }

    #[test]
    fn static_data_selects_atlas_cells() {
        let mut rng = StdRng::seed_from_u64(11);
        let data = create_static_data(2_000, &mut rng);
        for sprite in &data {
            assert_eq!(sprite.scale, [SCALE_X, SCALE_Y]);
            let col = sprite.uv_offset[0] * SPRITE_COLUMNS as f32;
            let row = sprite.uv_offset[1] * SPRITE_ROWS as f32;
            assert!((col - col.round()).abs() < EPS && col.round() < SPRITE_COLUMNS as f32);
            assert!((row - row.round()).abs() < EPS && row.round() < SPRITE_ROWS as f32);
        }
        assert_eq!(StaticSprite::for_variant(11).uv_offset, [0.75, 2.0 / 3.0]);
        assert_eq!(StaticSprite::for_variant(0).uv_offset, [0.0, 0.0]);
    }

    #[test]
    fn single_reference_frame_from_rest() {
        let mut state = SimulationState::from_bodies(&[Body {
            position: [0.0, 0.0],
            velocity: [0.0, 0.0],
        }]);
        state.advance(TARGET_FRAME_TIME_MS);

        let body = state.body(0).unwrap();
        assert_eq!(body.velocity, [0.0, GRAVITY]);
        assert_eq!(body.position, [0.0, GRAVITY]);
        assert_eq!(state.positions(), &[0.0, GRAVITY]);
    }

    #[test]
    fn floor_bounce_damps_and_jitters() {
        let mut state = SimulationState::from_bodies(&[Body {
            position: [0.0, BOUNDS_BOTTOM],
            velocity: [0.0, -0.02],
        }]);
        let mut expected_rng = state.jitter().clone();
        state.advance(TARGET_FRAME_TIME_MS);

        let magnitude = expected_rng.next_f32() * FLOOR_JITTER_MAX;
        let jitter = if expected_rng.next_f32() > 0.5 { magnitude } else { 0.0 };
        let damped = (0.02 - GRAVITY) * BOUNCE_DAMPING;

        let body = state.body(0).unwrap();
        assert_eq!(body.position[1], BOUNDS_BOTTOM);
        assert!((body.velocity[1] - (damped + jitter)).abs() < EPS);
        let added = body.velocity[1] - damped;
        assert!((-EPS..=FLOOR_JITTER_MAX + EPS).contains(&added));
    }

    #[test]
    fn horizontal_bounce_preserves_speed() {
        let mut state = SimulationState::from_bodies(&[
            Body {
                position: [0.98, 0.0],
                velocity: [0.01, 0.0],
            },
            Body {
                position: [-0.995, 0.0],
                velocity: [-0.01, 0.0],
            },
        ]);
        state.advance(TARGET_FRAME_TIME_MS);

        let right = state.body(0).unwrap();
        assert_eq!(right.position[0], BOUNDS_RIGHT - SCALE_X);
        assert_eq!(right.velocity[0], -0.01);

        let left = state.body(1).unwrap();
        assert_eq!(left.position[0], BOUNDS_LEFT);
        assert_eq!(left.velocity[0], 0.01);
    }

    #[test]
    fn top_bounce_preserves_speed() {
        let mut state = SimulationState::from_bodies(&[Body {
            position: [0.0, 0.97],
            velocity: [0.0, 0.02],
        }]);
        state.advance(TARGET_FRAME_TIME_MS);

        let body = state.body(0).unwrap();
        assert_eq!(body.position[1], BOUNDS_TOP - SCALE_Y);
        assert_eq!(body.velocity[1], -(0.02 + GRAVITY));
    }

    #[test]
    fn zero_step_is_a_no_op() {
        let mut state = seeded_state(10_000, 21);
        let before = state.physics().to_vec();
        let jitter = state.jitter().clone();

        state.advance(0.0);

        assert_eq!(state.physics(), before.as_slice());
        assert_eq!(state.jitter(), &jitter);
        assert_positions_mirror_physics(&state);
    }

    #[test]
    fn bodies_stay_in_bounds_under_adversarial_deltas() {
        let mut state = seeded_state(10_000, 99);
        let deltas = [16.6, 1.0e9, 0.0, 250.0, f32::MAX, 33.3, MAX_FRAME_DELTA_MS, 0.001];
        for frame in 0..600 {
            state.advance(deltas[frame % deltas.len()]);
            assert_in_bounds(&state);
        }
        assert_positions_mirror_physics(&state);
    }

    #[test]
    fn huge_delta_matches_clamped_delta() {
        let mut a = seeded_state(2_000, 5);
        let mut b = seeded_state(2_000, 5);
        a.advance(1.0e6);
        b.advance(MAX_FRAME_DELTA_MS);
        assert_eq!(a.physics(), b.physics());
    }

    #[test]
    fn fixed_jitter_seed_is_deterministic() {
        let run = || {
            let mut state = seeded_state(20_000, 42).with_jitter_seed(JITTER_SEED);
            for frame in 0..300 {
                state.advance(8.0 + (frame % 5) as f32 * 4.0);
            }
            state.physics().iter().map(|v| v.to_bits()).collect::<Vec<_>>()
        };
        assert_eq!(run(), run());
    }

    #[test]
    fn bodies_do_not_influence_each_other() {
        // Away from the floor no jitter is drawn, so each body must evolve
        // exactly as it would alone.
        let bodies = [
            Body { position: [0.1, 0.5], velocity: [0.01, 0.004] },
            Body { position: [-0.7, 0.2], velocity: [-0.012, 0.008] },
            Body { position: [0.9, 0.9], velocity: [0.015, 0.01] },
        ];
        let mut together = SimulationState::from_bodies(&bodies);
        for _ in 0..10 {
            together.advance(TARGET_FRAME_TIME_MS);
        }

        for (i, body) in bodies.iter().enumerate() {
            let mut alone = SimulationState::from_bodies(std::slice::from_ref(body));
            for _ in 0..10 {
                alone.advance(TARGET_FRAME_TIME_MS);
            }
            assert_eq!(alone.body(0), together.body(i));
        }
    }

    #[test]
    fn parallel_pass_is_deterministic_and_bounded() {
        let count = PARALLEL_CHUNK_BODIES * 3 + 17;
        let run = || {
            let mut state = seeded_state(count, 8);
            for _ in 0..200 {
                state.advance_parallel(TARGET_FRAME_TIME_MS * 2.0);
            }
            assert_in_bounds(&state);
            assert_positions_mirror_physics(&state);
            state.physics().to_vec()
        };
        assert_eq!(run(), run());
    }

    #[test]
    fn parallel_matches_sequential_without_floor_contacts() {
        let mut a = seeded_state(PARALLEL_CHUNK_BODIES + 100, 13);
        let mut b = seeded_state(PARALLEL_CHUNK_BODIES + 100, 13);
        // Bodies start at y >= -0.95; one frame cannot reach the floor.
        a.advance(TARGET_FRAME_TIME_MS);
        b.advance_parallel(TARGET_FRAME_TIME_MS);
        assert_eq!(a.physics(), b.physics());
        assert_eq!(a.positions(), b.positions());
    }
}
