//! Cliff stability
//!
//! Tracked vehicles keep their weight along the track length but have no
//! lateral grip at an edge. So the footprint is probed asymmetrically: a
//! front or rear sample hanging over a cliff is fine, a side sample over a
//! cliff tips the groomer, and the center over a cliff is a fall.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::geometry::{CliffSegment, LevelGeometry};
use super::vehicle::{FootprintSamples, VehiclePose};
use crate::tuning::VehicleTuning;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Stability {
    Stable,
    /// A lateral sample is over a cliff
    TipOver,
    /// The center is over a cliff
    Fall,
}

impl Stability {
    pub fn is_stable(&self) -> bool {
        matches!(self, Stability::Stable)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StabilityModel {
    cliffs: Vec<CliffSegment>,
    tile_size: f32,
    /// First instability seen; terminal until the level reloads
    latched: Option<Stability>,
}

impl StabilityModel {
    pub fn new(geometry: &LevelGeometry) -> Self {
        Self::from_cliffs(geometry.cliffs.clone(), geometry.tile_size)
    }

    pub fn from_cliffs(cliffs: Vec<CliffSegment>, tile_size: f32) -> Self {
        Self {
            cliffs,
            tile_size,
            latched: None,
        }
    }

    /// Whether a world-space point lies on any cliff band
    pub fn is_on_cliff(&self, world: Vec2) -> bool {
        let p = world / self.tile_size;
        self.cliffs.iter().any(|c| c.contains(p.x, p.y))
    }

    /// Classify a pose without touching the latch
    pub fn classify_stability(&self, pose: &VehiclePose, vehicle: &VehicleTuning) -> Stability {
        let samples = FootprintSamples::for_pose(pose, vehicle);
        if samples.lateral().iter().any(|p| self.is_on_cliff(*p)) {
            return Stability::TipOver;
        }
        if self.is_on_cliff(samples.center) {
            return Stability::Fall;
        }
        Stability::Stable
    }

    /// Classify and latch the first instability. Once latched the pose is no
    /// longer evaluated.
    pub fn check_vehicle_stability(
        &mut self,
        pose: &VehiclePose,
        vehicle: &VehicleTuning,
    ) -> Stability {
        if let Some(latched) = self.latched {
            return latched;
        }
        let result = self.classify_stability(pose, vehicle);
        if !result.is_stable() {
            log::debug!("Groomer lost stability at {:?}: {:?}", pose.position, result);
            self.latched = Some(result);
        }
        result
    }

    pub fn latched(&self) -> Option<Stability> {
        self.latched
    }

    pub fn cliffs(&self) -> &[CliffSegment] {
        &self.cliffs
    }
}
