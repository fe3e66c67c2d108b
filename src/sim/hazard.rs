//! Steep terrain and avalanche hazards
//!
//! Two independent state machines. Steepness: slopes past the slide
//! threshold push the groomer downhill, slopes past the tumble threshold
//! tumble it for good. Avalanche: dwelling in a zone builds risk until the
//! slope lets go. Both only move forward; a level reload builds a new engine.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::geometry::LevelGeometry;
use super::rect::TileRect;
use crate::tuning::{AvalancheTuning, SteepnessTuning};

/// Downhill direction in world space
pub const DOWNHILL: Vec2 = Vec2::Y;

/// A warning or effect that may fire at most once
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum OneShot {
    #[default]
    Armed,
    Fired,
}

impl OneShot {
    /// True the first time only
    pub fn fire(&mut self) -> bool {
        match self {
            OneShot::Armed => {
                *self = OneShot::Fired;
                true
            }
            OneShot::Fired => false,
        }
    }

    pub fn has_fired(&self) -> bool {
        matches!(self, OneShot::Fired)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SteepState {
    #[default]
    Clear,
    /// Terminal until reload
    Tumbling,
}

/// What steep terrain did to the groomer this tick
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum SteepOutcome {
    /// Flat enough, or held by a taut winch
    None,
    /// On a service road through a steep band
    OnAccessPath(usize),
    Slide { added: Vec2, warn: bool },
    TumbleStarted { velocity: Vec2, spin: f32 },
    Tumbling { velocity: Vec2, spin: f32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AvalancheLevel {
    /// Past the first threshold
    Rumble,
    /// Past the second threshold
    Danger,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AvalancheEvent {
    Warning { zone: usize, level: AvalancheLevel },
    Triggered { zone: usize },
}

/// An avalanche-prone area (tile units)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HazardZone {
    pub bounds: TileRect,
    /// 0-1, only rises
    pub risk: f32,
    pub triggered: bool,
    rumble: OneShot,
    danger: OneShot,
}

impl HazardZone {
    pub fn new(bounds: TileRect) -> Self {
        Self {
            bounds,
            risk: 0.0,
            triggered: false,
            rumble: OneShot::Armed,
            danger: OneShot::Armed,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HazardEngine {
    steep: SteepState,
    slide_warning: OneShot,
    zones: Vec<HazardZone>,
    steepness: SteepnessTuning,
    avalanche: AvalancheTuning,
}

impl HazardEngine {
    pub fn new(geometry: &LevelGeometry, steepness: SteepnessTuning, avalanche: AvalancheTuning) -> Self {
        Self::with_zones(
            geometry.avalanche_zones.iter().copied().map(HazardZone::new).collect(),
            steepness,
            avalanche,
        )
    }

    pub fn with_zones(
        zones: Vec<HazardZone>,
        steepness: SteepnessTuning,
        avalanche: AvalancheTuning,
    ) -> Self {
        Self {
            steep: SteepState::Clear,
            slide_warning: OneShot::Armed,
            zones,
            steepness,
            avalanche,
        }
    }

    pub fn steep_state(&self) -> SteepState {
        self.steep
    }

    pub fn is_tumbling(&self) -> bool {
        self.steep == SteepState::Tumbling
    }

    pub fn zones(&self) -> &[HazardZone] {
        &self.zones
    }

    pub fn avalanche_triggered(&self) -> bool {
        self.zones.iter().any(|z| z.triggered)
    }

    /// Highest risk across zones, for the HUD
    pub fn max_risk(&self) -> f32 {
        self.zones.iter().map(|z| z.risk).fold(0.0, f32::max)
    }

    fn tumble_motion(&self) -> (Vec2, f32) {
        (DOWNHILL * self.steepness.tumble_speed, self.steepness.tumble_spin)
    }

    /// Evaluate steep terrain under `position` (world px)
    pub fn check_steepness(
        &mut self,
        geometry: &LevelGeometry,
        position: Vec2,
        winch_taut: bool,
    ) -> SteepOutcome {
        if self.is_tumbling() {
            let (velocity, spin) = self.tumble_motion();
            return SteepOutcome::Tumbling { velocity, spin };
        }

        let Some(zone) = geometry.steep_zone_at(position) else {
            return SteepOutcome::None;
        };
        if let Some(road) = geometry.access_rect_at(position) {
            return SteepOutcome::OnAccessPath(road.path_index);
        }
        if winch_taut {
            return SteepOutcome::None;
        }

        let t = &self.steepness;
        if zone.slope >= t.tumble_threshold {
            log::info!("Groomer tumbling on {:.0} degree slope (zone {})", zone.slope, zone.index);
            self.steep = SteepState::Tumbling;
            let (velocity, spin) = self.tumble_motion();
            return SteepOutcome::TumbleStarted { velocity, spin };
        }
        if zone.slope >= t.slide_threshold {
            let added = DOWNHILL * (zone.slope - t.slide_offset) * t.slide_gain;
            let warn = self.slide_warning.fire();
            return SteepOutcome::Slide { added, warn };
        }
        SteepOutcome::None
    }

    /// Accumulate risk in every zone the footprint touches. `footprint`
    /// holds world px sample points; one hit per zone per tick.
    pub fn advance_avalanche(
        &mut self,
        footprint: &[Vec2],
        tile_size: f32,
        grooming: bool,
    ) -> Vec<AvalancheEvent> {
        let mut events = Vec::new();
        let a = &self.avalanche;
        let rate = a.risk_per_tick + if grooming { a.grooming_risk_per_tick } else { 0.0 };

        for (index, zone) in self.zones.iter_mut().enumerate() {
            let touched = footprint
                .iter()
                .any(|p| zone.bounds.contains(*p / tile_size));
            if zone.triggered || !touched {
                continue;
            }
            zone.risk = (zone.risk + rate).min(1.0);

            if zone.risk >= a.warning_threshold && zone.rumble.fire() {
                events.push(AvalancheEvent::Warning {
                    zone: index,
                    level: AvalancheLevel::Rumble,
                });
            }
            if zone.risk >= a.danger_threshold && zone.danger.fire() {
                events.push(AvalancheEvent::Warning {
                    zone: index,
                    level: AvalancheLevel::Danger,
                });
            }
            if zone.risk >= 1.0 {
                log::info!("Avalanche triggered in zone {index}");
                zone.triggered = true;
                events.push(AvalancheEvent::Triggered { zone: index });
            }
        }

        events
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::level::{AccessPathSpec, LevelSpec, Side, SteepZoneSpec};
    use crate::sim::geometry::generate_level;

    fn steep_geometry(slope: f32) -> LevelGeometry {
        let level = LevelSpec {
            steep_zones: vec![SteepZoneSpec {
                start_y: 0.3,
                end_y: 0.7,
                slope,
            }],
            access_paths: vec![AccessPathSpec {
                side: Side::Left,
                start_y: 0.3,
                end_y: 0.7,
            }],
            ..Default::default()
        };
        generate_level(&level).unwrap()
    }

    fn engine(geo: &LevelGeometry) -> HazardEngine {
        HazardEngine::new(geo, SteepnessTuning::default(), AvalancheTuning::default())
    }

    /// Piste center at row 30
    fn in_zone() -> Vec2 {
        Vec2::new(20.0 * 16.0, 30.5 * 16.0)
    }

    #[test]
    fn test_one_shot() {
        let mut s = OneShot::default();
        assert!(s.fire());
        assert!(!s.fire());
        assert!(s.has_fired());
    }

    #[test]
    fn test_gentle_slope_no_effect() {
        let geo = steep_geometry(20.0);
        let mut h = engine(&geo);
        assert_eq!(h.check_steepness(&geo, in_zone(), false), SteepOutcome::None);
    }

    #[test]
    fn test_slide_warns_once() {
        let geo = steep_geometry(35.0);
        let mut h = engine(&geo);
        let SteepOutcome::Slide { added, warn } = h.check_steepness(&geo, in_zone(), false) else {
            panic!("expected slide");
        };
        assert!(warn);
        assert!((added - Vec2::new(0.0, 20.0)).length() < 1e-4);
        let SteepOutcome::Slide { warn, .. } = h.check_steepness(&geo, in_zone(), false) else {
            panic!("expected slide");
        };
        assert!(!warn);
        assert!(!h.is_tumbling());
    }

    #[test]
    fn test_tumble_is_terminal() {
        let geo = steep_geometry(45.0);
        let mut h = engine(&geo);
        assert!(matches!(
            h.check_steepness(&geo, in_zone(), false),
            SteepOutcome::TumbleStarted { .. }
        ));
        for _ in 0..10 {
            assert!(matches!(
                h.check_steepness(&geo, in_zone(), false),
                SteepOutcome::Tumbling { .. }
            ));
        }
        // Leaving the zone does not stop a tumble
        assert!(matches!(
            h.check_steepness(&geo, Vec2::new(320.0, 40.0), false),
            SteepOutcome::Tumbling { .. }
        ));
    }

    #[test]
    fn test_taut_winch_holds_on_steep_slope() {
        let geo = steep_geometry(45.0);
        let mut h = engine(&geo);
        assert_eq!(h.check_steepness(&geo, in_zone(), true), SteepOutcome::None);
        assert_eq!(h.steep_state(), SteepState::Clear);
    }

    #[test]
    fn test_access_road_is_safe() {
        let geo = steep_geometry(45.0);
        let mut h = engine(&geo);
        let rect = geo.access_rects[ACCESS_MID];
        let pos = rect.bounds.center() * geo.tile_size;
        assert!(geo.steep_zone_at(pos).is_some());
        assert_eq!(h.check_steepness(&geo, pos, false), SteepOutcome::OnAccessPath(0));
        assert!(!h.is_tumbling());
    }

    const ACCESS_MID: usize = 8;

    fn zone_engine() -> HazardEngine {
        HazardEngine::with_zones(
            vec![HazardZone::new(TileRect::new(10.0, 10.0, 20.0, 20.0))],
            SteepnessTuning::default(),
            AvalancheTuning::default(),
        )
    }

    #[test]
    fn test_avalanche_triggers_at_tick_67() {
        let mut h = zone_engine();
        let pos = Vec2::new(15.0 * 16.0, 15.0 * 16.0);
        let mut triggered_at = None;
        let mut warnings = Vec::new();
        for tick in 1..=100 {
            for e in h.advance_avalanche(&[pos], 16.0, false) {
                match e {
                    AvalancheEvent::Warning { level, .. } => warnings.push((tick, level)),
                    AvalancheEvent::Triggered { .. } => {
                        assert!(triggered_at.is_none());
                        triggered_at = Some(tick);
                    }
                }
            }
        }
        assert_eq!(triggered_at, Some(67));
        assert_eq!(warnings, vec![(34, AvalancheLevel::Rumble), (54, AvalancheLevel::Danger)]);
        assert_eq!(h.zones()[0].risk, 1.0);
        assert!(h.avalanche_triggered());
    }

    #[test]
    fn test_grooming_raises_risk_faster() {
        let mut h = zone_engine();
        let pos = Vec2::new(15.0 * 16.0, 15.0 * 16.0);
        h.advance_avalanche(&[pos], 16.0, true);
        assert!((h.zones()[0].risk - 0.025).abs() < 1e-6);
    }

    #[test]
    fn test_risk_only_inside_zone() {
        let mut h = zone_engine();
        assert!(h.advance_avalanche(&[Vec2::new(5.0, 5.0)], 16.0, true).is_empty());
        assert_eq!(h.max_risk(), 0.0);
    }

    #[test]
    fn test_footprint_edge_touching_zone_counts_once() {
        let mut h = zone_engine();
        // Center outside the zone, one lateral sample just inside its left edge
        let center = Vec2::new(9.8 * 16.0, 15.0 * 16.0);
        let right = center + Vec2::new(8.0, 0.0);
        h.advance_avalanche(&[center, right, right], 16.0, false);
        assert!((h.zones()[0].risk - 0.015).abs() < 1e-6);
    }
}
