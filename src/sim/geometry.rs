//! Procedural piste geometry
//!
//! Builds, once per level load, the per-row piste path, the switchback
//! service roads, the cliff bands lining dangerous runs, steep bands, winch
//! anchors and avalanche zones. Everything here is immutable after
//! [`LevelGeometry::generate`] returns.

use std::f32::consts::{PI, TAU};

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::rect::TileRect;
use super::rng::{RandomSource, SeededRng};
use crate::consts::*;
use crate::error::LevelError;
use crate::level::{AccessPathSpec, Hazard, LevelSpec, PisteShape, Side};
use crate::smoothstep;

/// One row of the piste (tile units)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PisteRow {
    pub center_x: f32,
    pub width: f32,
}

impl PisteRow {
    #[inline]
    pub fn left(&self) -> f32 {
        self.center_x - self.width / 2.0
    }

    #[inline]
    pub fn right(&self) -> f32 {
        self.center_x + self.width / 2.0
    }

    #[inline]
    pub fn edge(&self, side: Side) -> f32 {
        match side {
            Side::Left => self.left(),
            Side::Right => self.right(),
        }
    }
}

/// Centerline offset (fraction of world width) and width scale for a shape
fn shape_profile(shape: PisteShape, t: f32, phase: f32) -> (f32, f32) {
    match shape {
        PisteShape::Straight => (0.0, 1.0),
        PisteShape::GentleCurve => (0.12 * (PI * t + phase).sin(), 1.0),
        PisteShape::Winding => (
            0.16 * (2.5 * PI * t + phase).sin(),
            1.0 + 0.1 * (2.0 * PI * t + phase).cos(),
        ),
        PisteShape::Serpentine => (
            0.2 * (3.0 * PI * t + phase).sin(),
            0.85 + 0.15 * (6.0 * PI * t + phase).cos().abs(),
        ),
        PisteShape::Wide => (0.04 * (2.0 * PI * t + phase).sin(), 1.3),
    }
}

/// Per-row centerline and width, one entry per grid row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PistePath {
    rows: Vec<PisteRow>,
    world_width: f32,
}

impl PistePath {
    /// Build the path for a level. Draws the curve phase from `rng`.
    pub fn generate(level: &LevelSpec, rng: &mut impl RandomSource) -> Self {
        let world_w = level.width as f32;
        let height = level.height;
        let phase = rng.range(0.0, TAU);
        let max_width = world_w - 2.0 * PISTE_MARGIN;

        let rows = (0..height)
            .map(|r| {
                let t = r as f32 / height as f32;
                let (offset, scale) = shape_profile(level.piste_shape, t, phase);
                let width = (world_w * level.piste_width * scale)
                    .min(max_width)
                    .max(MIN_PISTE_WIDTH);
                let half = width / 2.0;
                let center_x = (world_w / 2.0 + offset * world_w)
                    .min(world_w - PISTE_MARGIN - half)
                    .max(PISTE_MARGIN + half);
                PisteRow { center_x, width }
            })
            .collect();

        Self {
            rows,
            world_width: world_w,
        }
    }

    /// Build a path from explicit rows (tests and hand-made levels)
    pub fn from_rows(rows: Vec<PisteRow>, world_width: f32) -> Self {
        Self { rows, world_width }
    }

    pub fn rows(&self) -> &[PisteRow] {
        &self.rows
    }

    pub fn row(&self, r: usize) -> Option<&PisteRow> {
        self.rows.get(r)
    }

    pub fn height(&self) -> u32 {
        self.rows.len() as u32
    }

    pub fn world_width(&self) -> f32 {
        self.world_width
    }

    /// Piste edge x for a continuous row position (clamped to the path)
    pub fn edge_at(&self, side: Side, y: f32) -> f32 {
        let last = self.rows.len().saturating_sub(1);
        let r = (y.max(0.0).floor() as usize).min(last);
        self.rows.get(r).map(|row| row.edge(side)).unwrap_or(0.0)
    }

    /// Rows outside the resort/margin buffer can hold groomable snow
    pub fn is_groomable_row(&self, y: i64) -> bool {
        y >= TOP_BUFFER_ROWS as i64 && y < self.height() as i64 - BOTTOM_BUFFER_ROWS as i64
    }

    /// Whether tile (x, y) is on the piste; out-of-range tiles are not
    pub fn is_in_piste(&self, x: i64, y: i64) -> bool {
        if !self.is_groomable_row(y) || x < 0 || x as f32 >= self.world_width {
            return false;
        }
        let Some(row) = self.rows.get(y as usize) else {
            return false;
        };
        let cx = x as f32 + 0.5;
        cx >= row.left() && cx < row.right()
    }
}

/// A hazardous band beside the piste where the groomer can fall
///
/// Rows `start_row..=end_row`. The band sits `offset` tiles outside the
/// piste edge and reaches `extent` tiles further out (clipped at the world
/// edge).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CliffSegment {
    pub side: Side,
    pub start_row: u32,
    pub end_row: u32,
    pub offset: f32,
    pub extent: f32,
    world_width: f32,
    /// Piste edge samples (x = edge, y = row center), sorted by y
    edge_samples: Vec<Vec2>,
}

impl CliffSegment {
    pub fn new(
        side: Side,
        start_row: u32,
        end_row: u32,
        offset: f32,
        extent: f32,
        world_width: f32,
        mut edge_samples: Vec<Vec2>,
    ) -> Self {
        edge_samples.sort_by(|a, b| a.y.total_cmp(&b.y));
        Self {
            side,
            start_row,
            end_row,
            offset,
            extent,
            world_width,
            edge_samples,
        }
    }

    pub fn edge_samples(&self) -> &[Vec2] {
        &self.edge_samples
    }

    /// Whether continuous row position `y` falls in this segment
    #[inline]
    pub fn covers(&self, y: f32) -> bool {
        y >= self.start_row as f32 && y < (self.end_row + 1) as f32
    }

    /// Piste edge at `y`, interpolated between the two nearest samples
    pub fn edge_at(&self, y: f32) -> Option<f32> {
        let samples = &self.edge_samples;
        let i = samples.partition_point(|s| s.y < y);
        if i == 0 {
            return samples.first().map(|s| s.x);
        }
        if i == samples.len() {
            return samples.last().map(|s| s.x);
        }
        let (a, b) = (samples[i - 1], samples[i]);
        let span = b.y - a.y;
        if span <= f32::EPSILON {
            return Some(b.x);
        }
        let t = (y - a.y) / span;
        Some(a.x + (b.x - a.x) * t)
    }

    /// Hazard band [lo, hi] in tile x at row position `y`
    pub fn band_at(&self, y: f32) -> Option<(f32, f32)> {
        let edge = self.edge_at(y)?;
        match self.side {
            Side::Left => {
                let inner = edge - self.offset;
                if inner <= 0.0 {
                    return None;
                }
                Some(((inner - self.extent).max(0.0), inner))
            }
            Side::Right => {
                let inner = edge + self.offset;
                if inner >= self.world_width {
                    return None;
                }
                Some((inner, (inner + self.extent).min(self.world_width)))
            }
        }
    }

    /// Whether tile-space point (x, y) is on the cliff
    pub fn contains(&self, x: f32, y: f32) -> bool {
        if !self.covers(y) {
            return false;
        }
        self.band_at(y)
            .is_some_and(|(lo, hi)| x >= lo && x <= hi)
    }
}

/// Switchback road polyline (tile units)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccessPathCurve {
    pub side: Side,
    pub path_index: usize,
    pub center: Vec<Vec2>,
    pub left_edge: Vec<Vec2>,
    pub right_edge: Vec<Vec2>,
}

/// Bounding rectangle of one road segment
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AccessPathRect {
    pub side: Side,
    pub path_index: usize,
    pub bounds: TileRect,
}

/// A band of rows with a slope
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SteepZone {
    pub index: usize,
    pub start_row: u32,
    /// Exclusive
    pub end_row: u32,
    pub slope: f32,
}

impl SteepZone {
    #[inline]
    pub fn covers(&self, y: f32) -> bool {
        y >= self.start_row as f32 && y < self.end_row as f32
    }
}

/// Winch anchor (world pixels)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WinchAnchor {
    pub index: usize,
    /// Where the cable is hooked
    pub hook: Vec2,
    /// Where the groomer connects; attachment is measured from here
    pub base: Vec2,
}

/// Everything generated for a level
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelGeometry {
    pub width: u32,
    pub height: u32,
    pub tile_size: f32,
    pub piste: PistePath,
    pub cliffs: Vec<CliffSegment>,
    pub access_curves: Vec<AccessPathCurve>,
    pub access_rects: Vec<AccessPathRect>,
    pub steep_zones: Vec<SteepZone>,
    pub winch_anchors: Vec<WinchAnchor>,
    pub avalanche_zones: Vec<TileRect>,
}

/// Generate a level from its own seed at the default tile size
pub fn generate_level(level: &LevelSpec) -> Result<LevelGeometry, LevelError> {
    let mut rng = SeededRng::new(level.seed);
    LevelGeometry::generate(level, TILE_SIZE, &mut rng)
}

impl LevelGeometry {
    /// Validate `level` and build all geometry, drawing from `rng` only
    pub fn generate(
        level: &LevelSpec,
        tile_size: f32,
        rng: &mut impl RandomSource,
    ) -> Result<Self, LevelError> {
        level.validate()?;

        let piste = PistePath::generate(level, rng);

        let mut access_curves = Vec::with_capacity(level.access_paths.len());
        let mut access_rects = Vec::new();
        for (index, spec) in level.access_paths.iter().enumerate() {
            let curve = build_access_curve(level, &piste, spec, index);
            access_rects.extend(curve_rects(&curve));
            access_curves.push(curve);
        }

        let cliffs = if level.has_dangerous_boundaries {
            build_cliffs(level, &piste, &access_rects, rng)
        } else {
            Vec::new()
        };

        let steep_zones = level
            .steep_zones
            .iter()
            .enumerate()
            .map(|(index, z)| SteepZone {
                index,
                start_row: level.row_at(z.start_y),
                end_row: level.row_at(z.end_y),
                slope: z.slope,
            })
            .collect();

        let winch_anchors = level
            .winch_anchors
            .iter()
            .enumerate()
            .map(|(index, a)| {
                let row = level.row_at(a.y).min(level.height - 1);
                let cx = piste
                    .row(row as usize)
                    .map_or(level.width as f32 / 2.0, |p| p.center_x);
                let hook = Vec2::new(cx * tile_size, (row as f32 + 0.5) * tile_size);
                let base = hook + Vec2::new(0.0, WINCH_BASE_OFFSET_ROWS * tile_size);
                WinchAnchor { index, hook, base }
            })
            .collect();

        let avalanche_zones = if level.has_hazard(Hazard::Avalanche) {
            build_avalanche_zones(level, &piste, rng)
        } else {
            Vec::new()
        };

        let geometry = Self {
            width: level.width,
            height: level.height,
            tile_size,
            piste,
            cliffs,
            access_curves,
            access_rects,
            steep_zones,
            winch_anchors,
            avalanche_zones,
        };
        geometry.debug_check_invariants();

        log::info!(
            "Generated {}x{} {} piste (seed {}): {} cliffs, {} roads ({} rects), {} steep zones, {} avalanche zones",
            level.width,
            level.height,
            level.piste_shape.as_str(),
            level.seed,
            geometry.cliffs.len(),
            geometry.access_curves.len(),
            geometry.access_rects.len(),
            geometry.steep_zones.len(),
            geometry.avalanche_zones.len()
        );

        Ok(geometry)
    }

    /// World pixels to continuous tile coordinates
    #[inline]
    pub fn to_tile(&self, world: Vec2) -> Vec2 {
        world / self.tile_size
    }

    /// Service road rectangle under a world position
    pub fn access_rect_at(&self, world: Vec2) -> Option<&AccessPathRect> {
        let p = self.to_tile(world);
        self.access_rects.iter().find(|r| r.bounds.contains(p))
    }

    /// Steep band under a world position (steepest wins on overlap)
    pub fn steep_zone_at(&self, world: Vec2) -> Option<&SteepZone> {
        let p = self.to_tile(world);
        if p.x < 0.0 || p.x >= self.width as f32 {
            return None;
        }
        self.steep_zones
            .iter()
            .filter(|z| z.covers(p.y))
            .max_by(|a, b| a.slope.total_cmp(&b.slope))
    }

    /// Number of distinct service roads
    pub fn access_path_count(&self) -> usize {
        self.access_curves.len()
    }

    /// Generator bugs surface here in debug builds
    fn debug_check_invariants(&self) {
        if !cfg!(debug_assertions) {
            return;
        }
        let w = self.width as f32;
        for (r, row) in self.piste.rows().iter().enumerate() {
            debug_assert!(
                row.left() >= PISTE_MARGIN - 1e-3 && row.right() <= w - PISTE_MARGIN + 1e-3,
                "piste row {r} leaves the margin: {row:?}"
            );
            debug_assert!(row.width >= MIN_PISTE_WIDTH - 1e-3, "piste row {r} too narrow");
        }
        for cliff in &self.cliffs {
            for r in cliff.start_row..=cliff.end_row {
                let y = r as f32 + 0.5;
                let Some(row) = self.piste.row(r as usize) else {
                    continue;
                };
                if let Some((lo, hi)) = cliff.band_at(y) {
                    debug_assert!(
                        hi < row.left() || lo > row.right(),
                        "cliff band [{lo}, {hi}] overlaps piste row {r}"
                    );
                }
                debug_assert!(
                    !self
                        .access_rects
                        .iter()
                        .any(|a| a.side == cliff.side && a.bounds.covers_row(r)),
                    "cliff row {r} overlaps an access road"
                );
            }
        }
    }
}

/// Switchback from the piste edge out to the road's outer swing and back
fn build_access_curve(
    level: &LevelSpec,
    piste: &PistePath,
    spec: &AccessPathSpec,
    path_index: usize,
) -> AccessPathCurve {
    let world_w = level.width as f32;
    let half_road = ACCESS_ROAD_WIDTH / 2.0;
    let y0 = level.row_at(spec.start_y) as f32;
    let y1 = (level.row_at(spec.end_y) as f32)
        .max(y0 + 1.0)
        .min(level.height as f32);
    let sign = spec.side.sign();

    let mut center = Vec::with_capacity(ACCESS_ROAD_SEGMENTS + 1);
    let mut left_edge = Vec::with_capacity(ACCESS_ROAD_SEGMENTS + 1);
    let mut right_edge = Vec::with_capacity(ACCESS_ROAD_SEGMENTS + 1);

    for i in 0..=ACCESS_ROAD_SEGMENTS {
        let s = i as f32 / ACCESS_ROAD_SEGMENTS as f32;
        let y = y0 + (y1 - y0) * s;
        let swing = smoothstep(s / ACCESS_ROAD_RAMP) * smoothstep((1.0 - s) / ACCESS_ROAD_RAMP);
        let edge = piste.edge_at(spec.side, y);
        let x = (edge + sign * swing * ACCESS_ROAD_OUTER_OFFSET).clamp(half_road, world_w - half_road);

        center.push(Vec2::new(x, y));
        left_edge.push(Vec2::new(x - half_road, y));
        right_edge.push(Vec2::new(x + half_road, y));
    }

    AccessPathCurve {
        side: spec.side,
        path_index,
        center,
        left_edge,
        right_edge,
    }
}

/// One bounding rectangle per curve segment
fn curve_rects(curve: &AccessPathCurve) -> Vec<AccessPathRect> {
    (0..curve.center.len().saturating_sub(1))
        .filter_map(|i| {
            let corners = [
                curve.left_edge[i],
                curve.left_edge[i + 1],
                curve.right_edge[i],
                curve.right_edge[i + 1],
            ];
            TileRect::bounding(&corners).map(|bounds| AccessPathRect {
                side: curve.side,
                path_index: curve.path_index,
                bounds,
            })
        })
        .collect()
}

/// Free space between the piste and the world edge on `side`
fn clearance(piste: &PistePath, side: Side, row: &PisteRow) -> f32 {
    match side {
        Side::Left => row.left(),
        Side::Right => piste.world_width() - row.right(),
    }
}

fn build_cliffs(
    level: &LevelSpec,
    piste: &PistePath,
    access_rects: &[AccessPathRect],
    rng: &mut impl RandomSource,
) -> Vec<CliffSegment> {
    let first = TOP_BUFFER_ROWS;
    let last = level.height - BOTTOM_BUFFER_ROWS;
    let mut cliffs = Vec::new();

    for side in [Side::Left, Side::Right] {
        let qualifies = |r: u32| -> bool {
            let Some(row) = piste.row(r as usize) else {
                return false;
            };
            clearance(piste, side, row) >= CLIFF_MIN_CLEARANCE
                && !access_rects
                    .iter()
                    .any(|a| a.side == side && a.bounds.covers_row(r))
        };

        let mut r = first;
        while r < last {
            if !qualifies(r) {
                r += 1;
                continue;
            }
            let start = r;
            while r < last && qualifies(r) {
                r += 1;
            }
            let end = r - 1;
            if end + 1 - start < CLIFF_MIN_RUN_ROWS {
                continue;
            }

            let offset = rng.range(CLIFF_OFFSET_MIN, CLIFF_OFFSET_MAX);
            let extent = rng.range(CLIFF_EXTENT_MIN, CLIFF_EXTENT_MAX);
            let samples = (start..=end)
                .filter_map(|row| {
                    piste
                        .row(row as usize)
                        .map(|p| Vec2::new(p.edge(side), row as f32 + 0.5))
                })
                .collect();
            cliffs.push(CliffSegment::new(
                side,
                start,
                end,
                offset,
                extent,
                piste.world_width(),
                samples,
            ));
        }
    }

    cliffs
}

fn build_avalanche_zones(
    level: &LevelSpec,
    piste: &PistePath,
    rng: &mut impl RandomSource,
) -> Vec<TileRect> {
    let (w, h) = (level.width as f32, level.height as f32);
    (0..AVALANCHE_ZONE_COUNT)
        .map(|_| {
            let cy = rng.range(0.25, 0.75) * h;
            let side = if rng.chance(0.5) { Side::Left } else { Side::Right };
            let zw = rng.range(AVALANCHE_ZONE_MIN_SIZE, AVALANCHE_ZONE_MAX_SIZE);
            let zh = rng.range(AVALANCHE_ZONE_MIN_SIZE, AVALANCHE_ZONE_MAX_SIZE);
            let cx = piste.edge_at(side, cy);
            TileRect::new(cx - zw / 2.0, cy - zh / 2.0, cx + zw / 2.0, cy + zh / 2.0).clamped(w, h)
        })
        .collect()
}
