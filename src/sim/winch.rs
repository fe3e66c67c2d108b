//! Winch cable
//!
//! The groomer hooks onto an anchor by holding the winch key near the
//! anchor's base. The cable only bears load when the groomer is downhill of
//! the hook; then it pulls toward the hook and, near the end of its length,
//! drags. Past full length it snaps.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::geometry::WinchAnchor;
use crate::tuning::WinchTuning;

/// Attachment changes reported by [`WinchController::update`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WinchEvent {
    Attached(usize),
    Released(usize),
    Snapped(usize),
}

/// Per-tick winch result
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct WinchOutput {
    /// Velocity toward the hook (px/s)
    pub assist: Vec2,
    /// 0 below the tension start, rising linearly to 1 at full cable length
    pub tension_drag: f32,
    pub snapped: bool,
    pub taut: bool,
    /// Cable endpoints (groomer, hook) for the renderer while attached
    pub cable: Option<(Vec2, Vec2)>,
    pub event: Option<WinchEvent>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WinchController {
    anchors: Vec<WinchAnchor>,
    attached: Option<WinchAnchor>,
    was_pressed: bool,
    taut: bool,
    tuning: WinchTuning,
}

impl WinchController {
    pub fn new(anchors: Vec<WinchAnchor>, tuning: WinchTuning) -> Self {
        Self {
            anchors,
            attached: None,
            was_pressed: false,
            taut: false,
            tuning,
        }
    }

    pub fn anchors(&self) -> &[WinchAnchor] {
        &self.anchors
    }

    pub fn attached(&self) -> Option<&WinchAnchor> {
        self.attached.as_ref()
    }

    pub fn is_active(&self) -> bool {
        self.attached.is_some()
    }

    /// Taut as of the last update
    pub fn is_taut(&self) -> bool {
        self.taut
    }

    /// Closest anchor whose base is within the attach radius
    pub fn anchor_in_range(&self, position: Vec2) -> Option<&WinchAnchor> {
        let radius = self.tuning.attach_radius;
        self.anchors
            .iter()
            .map(|a| (a, a.base.distance(position)))
            .filter(|(_, d)| *d <= radius)
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(a, _)| a)
    }

    pub fn update(&mut self, pressed: bool, position: Vec2) -> WinchOutput {
        let mut out = WinchOutput::default();
        let press_edge = pressed && !self.was_pressed;
        self.was_pressed = pressed;

        if press_edge && self.attached.is_none() {
            if let Some(anchor) = self.anchor_in_range(position).copied() {
                log::debug!("Winch attached to anchor {}", anchor.index);
                self.attached = Some(anchor);
                out.event = Some(WinchEvent::Attached(anchor.index));
            }
        }

        if !pressed {
            if let Some(anchor) = self.attached.take() {
                log::debug!("Winch released from anchor {}", anchor.index);
                out.event = Some(WinchEvent::Released(anchor.index));
            }
            self.taut = false;
            return out;
        }

        let Some(anchor) = self.attached else {
            self.taut = false;
            return out;
        };

        // Downhill is +y
        self.taut = position.y > anchor.hook.y;
        out.taut = self.taut;
        out.cable = Some((position, anchor.hook));
        if !self.taut {
            return out;
        }

        let to_hook = anchor.hook - position;
        let distance = to_hook.length();
        let ratio = distance / self.tuning.max_cable_length;
        if ratio > 1.0 {
            log::warn!(
                "Winch cable snapped at {:.0}px (max {:.0}px)",
                distance,
                self.tuning.max_cable_length
            );
            self.attached = None;
            self.taut = false;
            return WinchOutput {
                snapped: true,
                event: Some(WinchEvent::Snapped(anchor.index)),
                ..Default::default()
            };
        }

        let pull = (distance * self.tuning.assist_gain).min(self.tuning.assist_max);
        out.assist = to_hook.normalize_or_zero() * pull;
        let start = self.tuning.tension_start;
        if ratio > start {
            out.tension_drag = ((ratio - start) / (1.0 - start)).clamp(0.0, 1.0);
        }
        out
    }

    /// Drop any attachment without an event (level reload)
    pub fn reset(&mut self) {
        self.attached = None;
        self.was_pressed = false;
        self.taut = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn controller() -> WinchController {
        let anchor = WinchAnchor {
            index: 0,
            hook: Vec2::new(320.0, 100.0),
            base: Vec2::new(320.0, 132.0),
        };
        WinchController::new(vec![anchor], WinchTuning::default())
    }

    #[test]
    fn test_attach_requires_press_edge_near_base() {
        let mut w = controller();
        // Out of range: no-op
        let out = w.update(true, Vec2::new(320.0, 400.0));
        assert_eq!(out.event, None);
        assert!(!w.is_active());

        // Holding the key and driving into range does not attach
        let out = w.update(true, Vec2::new(320.0, 140.0));
        assert_eq!(out.event, None);

        w.update(false, Vec2::new(320.0, 140.0));
        let out = w.update(true, Vec2::new(320.0, 140.0));
        assert_eq!(out.event, Some(WinchEvent::Attached(0)));
        assert!(out.taut);
        assert!(out.cable.is_some());
    }

    #[test]
    fn test_nearest_anchor_wins() {
        let anchors = vec![
            WinchAnchor {
                index: 0,
                hook: Vec2::new(100.0, 100.0),
                base: Vec2::new(100.0, 132.0),
            },
            WinchAnchor {
                index: 1,
                hook: Vec2::new(130.0, 100.0),
                base: Vec2::new(130.0, 132.0),
            },
        ];
        let w = WinchController::new(anchors, WinchTuning::default());
        assert_eq!(w.anchor_in_range(Vec2::new(120.0, 132.0)).unwrap().index, 1);
        assert!(w.anchor_in_range(Vec2::new(400.0, 132.0)).is_none());
    }

    #[test]
    fn test_slack_above_hook() {
        let mut w = controller();
        w.update(true, Vec2::new(320.0, 132.0));
        let out = w.update(true, Vec2::new(320.0, 90.0));
        assert!(!out.taut);
        assert_eq!(out.assist, Vec2::ZERO);
        assert_eq!(out.tension_drag, 0.0);
        assert!(w.is_active());
    }

    #[test]
    fn test_assist_and_drag() {
        let mut w = controller();
        w.update(true, Vec2::new(320.0, 132.0));

        // 100 px below the hook: assist 25 px/s up, no drag
        let out = w.update(true, Vec2::new(320.0, 200.0));
        assert!((out.assist - Vec2::new(0.0, -25.0)).length() < 1e-4);
        assert_eq!(out.tension_drag, 0.0);

        // 85% of cable length: assist capped, half drag
        let out = w.update(true, Vec2::new(320.0, 100.0 + 408.0));
        assert!((out.assist.length() - 60.0).abs() < 1e-3);
        assert!((out.tension_drag - 0.5).abs() < 1e-4);
    }

    #[test]
    fn test_snap_past_full_length() {
        let mut w = controller();
        w.update(true, Vec2::new(320.0, 132.0));
        let mut snapped_at = None;
        for step in 0..40 {
            let y = 132.0 + step as f32 * 12.0;
            let out = w.update(true, Vec2::new(320.0, y));
            if out.snapped {
                snapped_at = Some(y);
                assert_eq!(out.event, Some(WinchEvent::Snapped(0)));
                assert!(out.cable.is_none());
                break;
            }
            assert!(y - 100.0 <= 480.0);
        }
        let y = snapped_at.unwrap();
        assert!(y - 100.0 > 480.0 && y - 100.0 <= 492.0);
        assert!(!w.is_active());

        // Still holding: no re-attach without a new press
        let out = w.update(true, Vec2::new(320.0, 132.0));
        assert_eq!(out.event, None);
    }

    #[test]
    fn test_release_on_key_up() {
        let mut w = controller();
        w.update(true, Vec2::new(320.0, 132.0));
        let out = w.update(false, Vec2::new(320.0, 200.0));
        assert_eq!(out.event, Some(WinchEvent::Released(0)));
        assert!(out.cable.is_none());
        assert!(!w.is_active() && !w.is_taut());
    }
}
