//! Groomer pose and footprint
//!
//! The pose is owned by the host's physics/input layer. The simulation only
//! reads it and answers with advisory velocity changes.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::heading_axes;
use crate::tuning::VehicleTuning;

/// Position (world px), heading (radians, 0 = +x) and velocity (px/s)
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct VehiclePose {
    pub position: Vec2,
    pub rotation: f32,
    pub velocity: Vec2,
}

impl VehiclePose {
    pub fn at(position: Vec2) -> Self {
        Self {
            position,
            ..Default::default()
        }
    }

    pub fn with_rotation(mut self, rotation: f32) -> Self {
        self.rotation = rotation;
        self
    }
}

/// Stability sample points around the footprint
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FootprintSamples {
    pub center: Vec2,
    pub front: Vec2,
    pub rear: Vec2,
    pub left: Vec2,
    pub right: Vec2,
}

impl FootprintSamples {
    /// Sample along the local forward/right axes
    pub fn for_pose(pose: &VehiclePose, vehicle: &VehicleTuning) -> Self {
        let (forward, right) = heading_axes(pose.rotation);
        let along = forward * (vehicle.length / 2.0) * vehicle.longitudinal_sample;
        let across = right * (vehicle.width / 2.0) * vehicle.lateral_sample;
        let c = pose.position;
        Self {
            center: c,
            front: c + along,
            rear: c - along,
            left: c - across,
            right: c + across,
        }
    }

    pub fn lateral(&self) -> [Vec2; 2] {
        [self.left, self.right]
    }

    pub fn longitudinal(&self) -> [Vec2; 2] {
        [self.front, self.rear]
    }

    /// Center first, then front, rear, left, right
    pub fn points(&self) -> [Vec2; 5] {
        [self.center, self.front, self.rear, self.left, self.right]
    }
}

/// Velocity advice for the host physics layer this tick
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VelocityAdvice {
    /// Added to the current velocity (px/s)
    pub added: Vec2,
    /// Multiplies the player's drive speed
    pub speed_multiplier: f32,
    /// Replaces velocity entirely when set
    pub override_velocity: Option<Vec2>,
    /// Spin to apply (rad/s)
    pub spin: f32,
}

impl Default for VelocityAdvice {
    fn default() -> Self {
        Self {
            added: Vec2::ZERO,
            speed_multiplier: 1.0,
            override_velocity: None,
            spin: 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_samples_follow_heading() {
        let vehicle = VehicleTuning::default();
        let pose = VehiclePose::at(Vec2::new(100.0, 100.0));
        let s = FootprintSamples::for_pose(&pose, &vehicle);
        // 70% of half-length (24) and 50% of half-width (16)
        assert!((s.front - Vec2::new(116.8, 100.0)).length() < 1e-4);
        assert!((s.rear - Vec2::new(83.2, 100.0)).length() < 1e-4);
        assert!((s.right - Vec2::new(100.0, 108.0)).length() < 1e-4);
        assert!((s.left - Vec2::new(100.0, 92.0)).length() < 1e-4);

        let turned = FootprintSamples::for_pose(
            &pose.with_rotation(std::f32::consts::FRAC_PI_2),
            &vehicle,
        );
        assert!((turned.front - Vec2::new(100.0, 116.8)).length() < 1e-3);
        assert!((turned.right - Vec2::new(92.0, 100.0)).length() < 1e-3);
    }
}
