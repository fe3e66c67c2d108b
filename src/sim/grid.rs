//! Snow grid
//!
//! One cell per tile. Off-piste cells are resolved up front (groomed,
//! quality 0) and never count toward coverage. Piste cells only ever move
//! forward: ungroomed -> groomed, and a groomed cell keeps the best quality
//! any pass has given it.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::geometry::PistePath;
use crate::world_to_tile;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SnowCell {
    pub groomable: bool,
    pub groomed: bool,
    /// Best quality achieved (0-1)
    pub quality: f32,
}

impl SnowCell {
    fn off_piste() -> Self {
        Self {
            groomable: false,
            groomed: true,
            quality: 0.0,
        }
    }

    fn fresh() -> Self {
        Self {
            groomable: true,
            groomed: false,
            quality: 0.0,
        }
    }
}

/// Incrementally maintained totals
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CoverageCounters {
    pub groomable: u32,
    pub groomed: u32,
    pub quality_sum: f64,
}

impl CoverageCounters {
    /// Groomed share of groomable tiles, rounded percent
    pub fn coverage_pct(&self) -> u32 {
        if self.groomable == 0 {
            return 0;
        }
        ((self.groomed as f64 / self.groomable as f64) * 100.0).round() as u32
    }

    /// Mean quality of groomed tiles as a percentage
    pub fn average_quality_pct(&self) -> f32 {
        if self.groomed == 0 {
            return 0.0;
        }
        (self.quality_sum / self.groomed as f64 * 100.0) as f32
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TerrainGrid {
    width: u32,
    height: u32,
    tile_size: f32,
    cells: Vec<SnowCell>,
    counters: CoverageCounters,
}

impl TerrainGrid {
    /// Initialize every cell from the piste path
    pub fn build(piste: &PistePath, width: u32, tile_size: f32) -> Self {
        let height = piste.height();
        let mut cells = Vec::with_capacity((width * height) as usize);
        let mut groomable = 0;
        for y in 0..height as i64 {
            for x in 0..width as i64 {
                if piste.is_in_piste(x, y) {
                    groomable += 1;
                    cells.push(SnowCell::fresh());
                } else {
                    cells.push(SnowCell::off_piste());
                }
            }
        }

        Self {
            width,
            height,
            tile_size,
            cells,
            counters: CoverageCounters {
                groomable,
                ..Default::default()
            },
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn counters(&self) -> CoverageCounters {
        self.counters
    }

    pub fn coverage_pct(&self) -> u32 {
        self.counters.coverage_pct()
    }

    pub fn average_quality_pct(&self) -> f32 {
        self.counters.average_quality_pct()
    }

    #[inline]
    fn index(&self, x: i64, y: i64) -> Option<usize> {
        if x < 0 || y < 0 || x >= self.width as i64 || y >= self.height as i64 {
            return None;
        }
        Some(y as usize * self.width as usize + x as usize)
    }

    /// Cell at tile (x, y); None outside the grid
    pub fn cell(&self, x: i64, y: i64) -> Option<&SnowCell> {
        self.index(x, y).map(|i| &self.cells[i])
    }

    /// Groom every cell within `radius` tiles (square) of the tile under
    /// `world`. Returns each cell that became groomed or improved, once.
    /// Cells past the grid edge are skipped.
    pub fn groom_at(&mut self, world: Vec2, radius: u32, quality: f32) -> Vec<(u32, u32)> {
        if !quality.is_finite() {
            return Vec::new();
        }
        let quality = quality.clamp(0.0, 1.0);
        let (tx, ty) = world_to_tile(world, self.tile_size);
        let r = radius as i64;
        let mut changed = Vec::new();

        // Clip the window to the grid before walking it
        let x0 = tx.saturating_sub(r).max(0);
        let x1 = tx.saturating_add(r).min(self.width as i64 - 1);
        let y0 = ty.saturating_sub(r).max(0);
        let y1 = ty.saturating_add(r).min(self.height as i64 - 1);
        if x0 > x1 || y0 > y1 {
            return changed;
        }

        for y in y0..=y1 {
            for x in x0..=x1 {
                let Some(i) = self.index(x, y) else {
                    continue;
                };
                let cell = &mut self.cells[i];
                if !cell.groomable {
                    continue;
                }
                if !cell.groomed {
                    cell.groomed = true;
                    cell.quality = quality;
                    self.counters.groomed += 1;
                    self.counters.quality_sum += quality as f64;
                    changed.push((x as u32, y as u32));
                } else if quality > cell.quality {
                    self.counters.quality_sum += (quality - cell.quality) as f64;
                    cell.quality = quality;
                    changed.push((x as u32, y as u32));
                }
            }
        }

        changed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::level::LevelSpec;
    use crate::sim::geometry::generate_level;

    fn grid() -> TerrainGrid {
        let geo = generate_level(&LevelSpec::default()).unwrap();
        TerrainGrid::build(&geo.piste, geo.width, geo.tile_size)
    }

    fn at(x: f32, y: f32) -> Vec2 {
        Vec2::new((x + 0.5) * 16.0, (y + 0.5) * 16.0)
    }

    #[test]
    fn test_groomable_count() {
        let g = grid();
        // 20 columns x (60 - 3 - 2) rows
        assert_eq!(g.counters().groomable, 20 * 55);
        assert_eq!(g.coverage_pct(), 0);
        assert_eq!(g.average_quality_pct(), 0.0);
    }

    #[test]
    fn test_off_piste_cells_resolved() {
        let g = grid();
        let cell = g.cell(0, 30).unwrap();
        assert!(!cell.groomable && cell.groomed && cell.quality == 0.0);
        let cell = g.cell(20, 1).unwrap();
        assert!(!cell.groomable && cell.groomed);
        assert!(g.cell(-1, 0).is_none());
        assert!(g.cell(40, 0).is_none());
    }

    #[test]
    fn test_groom_square_radius() {
        let mut g = grid();
        let changed = g.groom_at(at(20.0, 30.0), 2, 0.8);
        assert_eq!(changed.len(), 25);
        assert_eq!(g.counters().groomed, 25);
        assert!((g.counters().quality_sum - 25.0 * 0.8).abs() < 1e-4);
        assert!((g.average_quality_pct() - 80.0).abs() < 1e-3);
    }

    #[test]
    fn test_regroom_best_of_n() {
        let mut g = grid();
        g.groom_at(at(20.0, 30.0), 0, 0.6);
        assert!(g.groom_at(at(20.0, 30.0), 0, 0.4).is_empty());
        assert_eq!(g.cell(20, 30).unwrap().quality, 0.6);

        let changed = g.groom_at(at(20.0, 30.0), 0, 0.9);
        assert_eq!(changed, vec![(20, 30)]);
        assert_eq!(g.cell(20, 30).unwrap().quality, 0.9);
        assert_eq!(g.counters().groomed, 1);
        assert!((g.counters().quality_sum - 0.9).abs() < 1e-6);
    }

    #[test]
    fn test_groom_far_away_is_noop() {
        let mut g = grid();
        assert!(g.groom_at(Vec2::new(1.0e30, 100.0), 2, 1.0).is_empty());
        assert!(g.groom_at(Vec2::new(-1.0e30, 50.0), 2, 1.0).is_empty());
        assert!(g.groom_at(Vec2::new(100.0, f32::INFINITY), 2, 1.0).is_empty());
        // NaN saturates to tile 0, which is off piste
        assert!(g.groom_at(Vec2::new(f32::NAN, 100.0), 2, 1.0).is_empty());
        assert_eq!(g.counters().groomed, 0);
    }

    #[test]
    fn test_groom_huge_radius_covers_grid() {
        let mut g = grid();
        let changed = g.groom_at(at(20.0, 30.0), u32::MAX, 0.5);
        assert_eq!(changed.len(), 20 * 55);
        assert_eq!(g.coverage_pct(), 100);
        // Saturated coordinates stay out of reach even with a huge radius
        let mut g = grid();
        assert!(g.groom_at(Vec2::new(1.0e30, 1.0e30), u32::MAX, 0.5).is_empty());
    }

    #[test]
    fn test_groom_near_edge_clips() {
        let mut g = grid();
        assert!(g.groom_at(Vec2::new(-100.0, -100.0), 3, 1.0).is_empty());
        assert!(g.groom_at(Vec2::new(0.0, 0.0), 5, 1.0).is_empty());
        let changed = g.groom_at(at(10.0, 3.0), 1, 1.0);
        // Only columns 10-11 on row 3-4 are piste
        assert_eq!(changed.len(), 4);
    }

    #[test]
    fn test_groom_ignores_non_finite_quality() {
        let mut g = grid();
        assert!(g.groom_at(at(20.0, 30.0), 1, f32::NAN).is_empty());
        assert_eq!(g.counters().groomed, 0);
    }

    #[test]
    fn test_full_sweep_reaches_full_coverage() {
        let mut g = grid();
        for y in (3..58).step_by(5) {
            for x in (10..30).step_by(5) {
                g.groom_at(at(x as f32 + 2.0, y as f32 + 2.0), 2, 0.75);
            }
        }
        assert_eq!(g.counters().groomed, g.counters().groomable);
        assert_eq!(g.coverage_pct(), 100);
        assert!((g.average_quality_pct() - 75.0).abs() < 1e-3);
    }
}
