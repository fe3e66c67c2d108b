//! Snow Groomer - terrain and grooming simulation core
//!
//! Core modules:
//! - `sim`: Deterministic simulation (geometry, grid, hazards, session state)
//! - `level`: Declarative level parameters and their validation
//! - `contract`: Seed codes, daily runs and rank-based procedural levels
//! - `tuning`: Data-driven game balance
//!
//! Rendering, input polling, audio and persistence belong to the host; this
//! crate only consumes poses/inputs and emits events and telemetry.

pub mod contract;
pub mod error;
pub mod level;
pub mod sim;
pub mod tuning;

pub use contract::{Rank, decode_seed_code, encode_seed_code, generate_contract_level};
pub use error::{LevelError, TuningError};
pub use level::LevelSpec;
pub use tuning::Tuning;

use glam::Vec2;

/// World configuration constants
pub mod consts {
    /// Fixed simulation timestep (60 Hz)
    pub const SIM_DT: f32 = 1.0 / 60.0;
    /// Maximum substeps per frame to prevent spiral of death
    pub const MAX_SUBSTEPS: u32 = 8;
    /// Largest frame delta accepted by the clock (seconds)
    pub const MAX_FRAME_DT: f32 = 0.1;

    /// World pixels per tile
    pub const TILE_SIZE: f32 = 16.0;

    /// Rows at the top of every level kept for the resort buffer
    pub const TOP_BUFFER_ROWS: u32 = 3;
    /// Rows at the bottom of every level kept as margin
    pub const BOTTOM_BUFFER_ROWS: u32 = 2;
    /// Horizontal margin the piste never enters (tiles, each side)
    pub const PISTE_MARGIN: f32 = 3.0;
    /// Narrowest piste row (tiles)
    pub const MIN_PISTE_WIDTH: f32 = 6.0;

    /// Service road width (tiles)
    pub const ACCESS_ROAD_WIDTH: f32 = 4.0;
    /// How far the switchback swings out from the piste edge (tiles)
    pub const ACCESS_ROAD_OUTER_OFFSET: f32 = 6.0;
    /// Polyline segments per road curve
    pub const ACCESS_ROAD_SEGMENTS: usize = 16;
    /// Fraction of the road spent leaving / rejoining the piste
    pub const ACCESS_ROAD_RAMP: f32 = 0.3;

    /// Cliff band offset from the piste edge (tiles)
    pub const CLIFF_OFFSET_MIN: f32 = 1.5;
    pub const CLIFF_OFFSET_MAX: f32 = 3.0;
    /// Cliff band extent (tiles)
    pub const CLIFF_EXTENT_MIN: f32 = 3.0;
    pub const CLIFF_EXTENT_MAX: f32 = 5.0;
    /// Minimum free space between piste edge and world edge for a cliff row
    pub const CLIFF_MIN_CLEARANCE: f32 = 2.0;
    /// Shortest run of rows that becomes a cliff segment
    pub const CLIFF_MIN_RUN_ROWS: u32 = 3;

    /// Avalanche zones placed on levels declaring the hazard
    pub const AVALANCHE_ZONE_COUNT: u32 = 2;
    pub const AVALANCHE_ZONE_MIN_SIZE: f32 = 6.0;
    pub const AVALANCHE_ZONE_MAX_SIZE: f32 = 10.0;

    /// Rows between a winch hook and the base the groomer connects at
    pub const WINCH_BASE_OFFSET_ROWS: f32 = 2.0;

    /// Default grooming blade reach (tiles, square radius)
    pub const GROOM_RADIUS: u32 = 2;
    /// Default grooming pass quality
    pub const GROOM_QUALITY: f32 = 0.75;
    /// Slower than this (px/s) counts as standing still
    pub const MOVING_SPEED_EPSILON: f32 = 1.0;

    /// Resource gauges are percentages
    pub const RESOURCE_MAX: f32 = 100.0;
}

/// Smooth Hermite step on [0, 1]
#[inline]
pub fn smoothstep(t: f32) -> f32 {
    let t = t.clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

/// Convert a world-space position to (possibly out-of-range) tile coordinates
#[inline]
pub fn world_to_tile(pos: Vec2, tile_size: f32) -> (i64, i64) {
    (
        (pos.x / tile_size).floor() as i64,
        (pos.y / tile_size).floor() as i64,
    )
}

/// Unit forward and right vectors for a heading (radians, 0 = +x, y grows downhill)
#[inline]
pub fn heading_axes(rotation: f32) -> (Vec2, Vec2) {
    let forward = Vec2::new(rotation.cos(), rotation.sin());
    let right = Vec2::new(-forward.y, forward.x);
    (forward, right)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_smoothstep_endpoints() {
        assert_eq!(smoothstep(-1.0), 0.0);
        assert_eq!(smoothstep(0.0), 0.0);
        assert!((smoothstep(0.5) - 0.5).abs() < 1e-6);
        assert_eq!(smoothstep(1.0), 1.0);
        assert_eq!(smoothstep(3.0), 1.0);
    }

    #[test]
    fn test_world_to_tile_floors_negative() {
        assert_eq!(world_to_tile(Vec2::new(17.0, 31.9), 16.0), (1, 1));
        assert_eq!(world_to_tile(Vec2::new(-0.5, 0.0), 16.0), (-1, 0));
    }

    #[test]
    fn test_heading_axes_perpendicular() {
        let (f, r) = heading_axes(0.7);
        assert!(f.dot(r).abs() < 1e-6);
        assert!((f.length() - 1.0).abs() < 1e-6);
        let (f, r) = heading_axes(0.0);
        assert!((f - Vec2::X).length() < 1e-6);
        assert!((r - Vec2::Y).length() < 1e-6);
    }
}
