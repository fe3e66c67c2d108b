//! Fixed timestep simulation tick
//!
//! Runs every component once, in a fixed order: pending timers, winch,
//! steepness, cliff stability, grooming, avalanche, then resources and the
//! win/fail checks. An instability found early in the tick blocks grooming
//! and the win check later in the same tick.

use glam::Vec2;
use serde::Serialize;

use super::hazard::{AvalancheEvent, AvalancheLevel, SteepOutcome};
use super::session::{FailReason, SessionEvent, SessionFlags, SessionPhase};
use super::stability::Stability;
use super::state::{GameEvent, GameState};
use super::timers::ScheduledEvent;
use super::vehicle::{FootprintSamples, VehiclePose, VelocityAdvice};
use super::winch::{WinchEvent, WinchOutput};
use crate::consts::*;

/// Input for a single tick (deterministic)
#[derive(Debug, Clone, PartialEq)]
pub struct TickInput {
    /// Groomer pose as the host physics left it
    pub pose: VehiclePose,
    /// Winch key held
    pub winch_pressed: bool,
    /// Grooming blade down
    pub grooming: bool,
    pub groom_radius: u32,
    pub groom_quality: f32,
    /// The host reports the groomer wrecked a terrain feature
    pub feature_destroyed: bool,
}

impl Default for TickInput {
    fn default() -> Self {
        Self {
            pose: VehiclePose::default(),
            winch_pressed: false,
            grooming: false,
            groom_radius: GROOM_RADIUS,
            groom_quality: GROOM_QUALITY,
            feature_destroyed: false,
        }
    }
}

impl TickInput {
    pub fn is_moving(&self) -> bool {
        self.pose.velocity.length() > MOVING_SPEED_EPSILON
    }
}

/// Everything the host needs back from a tick
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TickOutput {
    pub events: Vec<GameEvent>,
    pub advice: VelocityAdvice,
    pub winch: WinchOutput,
}

/// Advance the game state by one fixed timestep
pub fn tick(state: &mut GameState, input: &TickInput, dt: f32) -> TickOutput {
    let mut out = TickOutput::default();
    if state.session.phase() == SessionPhase::Terminal {
        return out;
    }

    state.time_ticks += 1;
    state.time_ms += (dt * 1000.0) as f64;
    fire_timers(state, &mut out.events);
    if state.session.is_game_over() {
        return out;
    }

    let pos = input.pose.position;

    // Winch
    let winch = state.winch.update(input.winch_pressed, pos);
    match winch.event {
        Some(WinchEvent::Attached(i)) => {
            state.session.record_winch_use();
            out.events.push(GameEvent::WinchAttached(i));
        }
        Some(WinchEvent::Released(i)) => out.events.push(GameEvent::WinchReleased(i)),
        Some(WinchEvent::Snapped(i)) => {
            state.session.apply_snap_penalty(&state.tuning.winch);
            out.events.push(GameEvent::WinchSnapped(i));
            out.events.push(GameEvent::Dialogue("winch_snapped"));
        }
        None => {}
    }
    out.advice.added += winch.assist;
    out.advice.speed_multiplier *= 1.0 - winch.tension_drag * state.tuning.winch.tension_max_drag;
    out.winch = winch;

    // Steepness
    let mut on_steep = state
        .geometry
        .steep_zone_at(pos)
        .is_some_and(|z| z.slope >= state.tuning.steepness.slide_threshold);
    match state.hazards.check_steepness(&state.geometry, pos, winch.taut) {
        SteepOutcome::None => {}
        SteepOutcome::OnAccessPath(i) => {
            // The service road is flat going
            on_steep = false;
            if state.session.visit_access_path(i) {
                out.events.push(GameEvent::AccessPathVisited(i));
            }
        }
        SteepOutcome::Slide { added, warn } => {
            out.advice.added += added;
            if warn {
                out.events.push(GameEvent::SlideWarning);
                out.events.push(GameEvent::Dialogue("steep_warning"));
            }
        }
        SteepOutcome::TumbleStarted { velocity, spin } => {
            state.session.record_tumble();
            let delay = state.tuning.steepness.tumble_fail_delay_ms;
            state.schedule(delay, ScheduledEvent::Fail(FailReason::Tumble));
            out.events.push(GameEvent::TumbleStarted);
            out.advice.override_velocity = Some(velocity);
            out.advice.spin = spin;
        }
        SteepOutcome::Tumbling { velocity, spin } => {
            out.advice.override_velocity = Some(velocity);
            out.advice.spin = spin;
        }
    }

    // Cliff stability, once per session
    if !state.hazards.is_tumbling() && state.stability.latched().is_none() {
        let event = match state
            .stability
            .check_vehicle_stability(&input.pose, &state.tuning.vehicle)
        {
            Stability::Stable => None,
            Stability::TipOver => Some(GameEvent::CliffTipOver),
            Stability::Fall => Some(GameEvent::CliffFall),
        };
        if let Some(event) = event {
            let delay = state.tuning.vehicle.cliff_fail_delay_ms;
            state.schedule(delay, ScheduledEvent::Fail(FailReason::Cliff));
            out.events.push(event);
        }
    }

    // Grooming
    if input.grooming && !state.is_catastrophic() {
        let quality = state
            .session
            .grooming_quality(input.groom_quality, &state.tuning.resources);
        let changed = state.grid.groom_at(pos, input.groom_radius, quality);
        if !changed.is_empty() {
            out.events.push(GameEvent::Groomed {
                cells: changed.len(),
            });
        }
    }

    // Avalanche
    if !state.is_catastrophic() {
        let tile_size = state.geometry.tile_size;
        let footprint = FootprintSamples::for_pose(&input.pose, &state.tuning.vehicle).points();
        for event in state
            .hazards
            .advance_avalanche(&footprint, tile_size, input.grooming)
        {
            match event {
                AvalancheEvent::Warning { zone, level } => {
                    out.events.push(GameEvent::AvalancheWarning { zone, level });
                    out.events.push(GameEvent::Dialogue(match level {
                        AvalancheLevel::Rumble => "avalanche_rumble",
                        AvalancheLevel::Danger => "avalanche_danger",
                    }));
                }
                AvalancheEvent::Triggered { zone } => {
                    let delay = state.tuning.avalanche.fail_delay_ms;
                    state.schedule(delay, ScheduledEvent::Fail(FailReason::Avalanche));
                    out.events.push(GameEvent::AvalancheTriggered { zone });
                }
            }
        }
    }

    // A catastrophe already under way keeps its own fail reason
    if input.feature_destroyed && !state.is_catastrophic() {
        fail_now(state, FailReason::Feature, &mut out.events);
    }

    // Resources, tutorial, outcome
    if !state.is_catastrophic() && !state.session.is_game_over() {
        let flags = SessionFlags {
            moving: input.is_moving(),
            grooming: input.grooming,
            on_steep,
            winch_taut: winch.taut,
        };
        for event in state.session.advance(dt, &flags, &state.tuning.resources) {
            out.events.push(match event {
                SessionEvent::BuffExpired(buff) => GameEvent::BuffExpired(buff),
                SessionEvent::Dialogue(key) => GameEvent::Dialogue(key),
            });
        }

        let coverage = state.grid.coverage_pct();
        let target = state.level.target_coverage;
        if let Some(key) = state.session.update_tutorial(&flags, coverage, target) {
            out.events.push(GameEvent::Dialogue(key));
        }

        if state.session.check_win(coverage, target) {
            let bonuses = state
                .session
                .evaluate_bonuses(&state.level.bonus_objectives, &state.bonus_context());
            let delay = state.tuning.vehicle.session_end_delay_ms;
            state.schedule(delay, ScheduledEvent::SessionEnd);
            out.events.push(GameEvent::Victory { bonuses });
        } else if let Some(reason) = state.session.check_fail() {
            let delay = state.tuning.vehicle.session_end_delay_ms;
            state.schedule(delay, ScheduledEvent::SessionEnd);
            out.events.push(GameEvent::Failed(reason));
        }
    }

    out.advice.speed_multiplier *= state.session.speed_multiplier(&state.tuning);
    if state.session.is_stunned() {
        out.advice.override_velocity = Some(Vec2::ZERO);
        out.advice.added = Vec2::ZERO;
    }

    out
}

fn fail_now(state: &mut GameState, reason: FailReason, events: &mut Vec<GameEvent>) {
    if state.session.fail(reason) {
        let delay = state.tuning.vehicle.session_end_delay_ms;
        state.schedule(delay, ScheduledEvent::SessionEnd);
        events.push(GameEvent::Failed(reason));
    }
}

fn fire_timers(state: &mut GameState, events: &mut Vec<GameEvent>) {
    for due in state.timers.drain_due(state.time_ms) {
        match due {
            ScheduledEvent::Fail(reason) => fail_now(state, reason, events),
            ScheduledEvent::SessionEnd => {
                if state.session.finish() {
                    log::info!("Session ended after {} ticks", state.time_ticks);
                    events.push(GameEvent::SessionEnded);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::level::{AccessPathSpec, LevelSpec, Side, SteepZoneSpec};
    use crate::tuning::Tuning;

    fn state(level: LevelSpec) -> GameState {
        GameState::new(level, Tuning::default()).unwrap()
    }

    fn driving(state: &GameState) -> TickInput {
        TickInput {
            pose: VehiclePose {
                position: state.spawn_point(),
                rotation: 0.0,
                velocity: Vec2::new(0.0, 40.0),
            },
            ..Default::default()
        }
    }

    #[test]
    fn test_idle_tick_advances_time_only() {
        let mut s = state(LevelSpec::default());
        let out = tick(&mut s, &TickInput::default(), SIM_DT);
        assert_eq!(s.time_ticks, 1);
        assert!((s.time_ms - 1000.0 / 60.0).abs() < 1e-3);
        assert!(out.events.is_empty());
        assert_eq!(out.advice, VelocityAdvice::default());
        assert_eq!(s.session.fuel, 100.0);
    }

    #[test]
    fn test_grooming_emits_event() {
        let mut s = state(LevelSpec::default());
        let input = TickInput {
            grooming: true,
            ..driving(&s)
        };
        let out = tick(&mut s, &input, SIM_DT);
        assert!(out.events.contains(&GameEvent::Groomed { cells: 5 * 3 }));
        assert!(s.session.fuel < 100.0);
        // Same spot again: nothing new
        let out = tick(&mut s, &input, SIM_DT);
        assert!(!out.events.iter().any(|e| matches!(e, GameEvent::Groomed { .. })));
    }

    #[test]
    fn test_feature_destroyed_fails_then_ends() {
        let mut s = state(LevelSpec::default());
        let input = TickInput {
            feature_destroyed: true,
            ..Default::default()
        };
        let out = tick(&mut s, &input, SIM_DT);
        assert_eq!(out.events, vec![GameEvent::Failed(FailReason::Feature)]);
        assert!(s.is_game_over());

        let mut ended = 0;
        for _ in 0..200 {
            let out = tick(&mut s, &input, SIM_DT);
            ended += out.events.iter().filter(|e| **e == GameEvent::SessionEnded).count();
            assert!(!out.events.iter().any(|e| matches!(e, GameEvent::Failed(_))));
        }
        assert_eq!(ended, 1);
        assert_eq!(s.session.phase(), SessionPhase::Terminal);

        let ticks = s.time_ticks;
        let out = tick(&mut s, &input, SIM_DT);
        assert!(out.events.is_empty());
        assert_eq!(s.time_ticks, ticks);
    }

    #[test]
    fn test_tumble_blocks_grooming_and_fails_later() {
        let level = LevelSpec {
            steep_zones: vec![SteepZoneSpec {
                start_y: 0.0,
                end_y: 0.5,
                slope: 45.0,
            }],
            ..Default::default()
        };
        let mut s = state(level);
        let input = TickInput {
            grooming: true,
            ..driving(&s)
        };
        let out = tick(&mut s, &input, SIM_DT);
        assert!(out.events.contains(&GameEvent::TumbleStarted));
        assert!(!out.events.iter().any(|e| matches!(e, GameEvent::Groomed { .. })));
        assert!(out.advice.override_velocity.is_some());
        assert_eq!(s.session.counters.tumble_count, 1);

        // 2000 ms at 60 Hz
        let mut failed_at = None;
        for n in 2..=200u64 {
            let out = tick(&mut s, &input, SIM_DT);
            assert!(!out.events.contains(&GameEvent::TumbleStarted));
            if out.events.contains(&GameEvent::Failed(FailReason::Tumble)) {
                failed_at = Some(n);
                break;
            }
        }
        let n = failed_at.unwrap();
        assert!((120..=122).contains(&n), "failed at tick {n}");
    }

    #[test]
    fn test_stun_zeroes_velocity() {
        let mut s = state(LevelSpec::default());
        let winch = s.tuning.winch.clone();
        s.session.apply_snap_penalty(&winch);
        let input = driving(&s);
        let out = tick(&mut s, &input, SIM_DT);
        assert_eq!(out.advice.override_velocity, Some(Vec2::ZERO));
    }

    #[test]
    fn test_determinism() {
        let level = LevelSpec {
            seed: 99999,
            ..Default::default()
        };
        let mut s1 = state(level.clone());
        let mut s2 = state(level);
        let mut input = TickInput {
            grooming: true,
            ..driving(&s1)
        };
        for i in 0..300 {
            input.pose.position.y += 1.0;
            input.pose.position.x = 320.0 + (i % 40) as f32 * 2.0;
            let a = tick(&mut s1, &input, SIM_DT);
            let b = tick(&mut s2, &input, SIM_DT);
            assert_eq!(a, b);
        }
        assert_eq!(s1, s2);
    }

    #[test]
    fn test_far_off_pose_grooms_nothing() {
        let mut s = state(LevelSpec::default());
        for position in [Vec2::new(-1.0e30, 50.0), Vec2::new(1.0e30, 1.0e30)] {
            let input = TickInput {
                pose: VehiclePose::at(position),
                grooming: true,
                groom_radius: u32::MAX,
                ..Default::default()
            };
            let out = tick(&mut s, &input, SIM_DT);
            assert!(!out.events.iter().any(|e| matches!(e, GameEvent::Groomed { .. })));
        }
        assert_eq!(s.grid.counters().groomed, 0);
    }

    #[test]
    fn test_feature_loss_during_tumble_keeps_tumble_reason() {
        let level = LevelSpec {
            steep_zones: vec![SteepZoneSpec {
                start_y: 0.0,
                end_y: 0.5,
                slope: 45.0,
            }],
            ..Default::default()
        };
        let mut s = state(level);
        let input = driving(&s);
        let out = tick(&mut s, &input, SIM_DT);
        assert!(out.events.contains(&GameEvent::TumbleStarted));

        let crushed = TickInput {
            feature_destroyed: true,
            ..input
        };
        let out = tick(&mut s, &crushed, SIM_DT);
        assert!(!out.events.contains(&GameEvent::Failed(FailReason::Feature)));
        assert!(!s.is_game_over());

        let mut reasons = Vec::new();
        for _ in 0..200 {
            for e in tick(&mut s, &crushed, SIM_DT).events {
                if let GameEvent::Failed(reason) = e {
                    reasons.push(reason);
                }
            }
        }
        assert_eq!(reasons, vec![FailReason::Tumble]);
    }

    #[test]
    fn test_access_road_drains_flat_stamina() {
        let level = LevelSpec {
            width: 60,
            piste_width: 0.4,
            steep_zones: vec![SteepZoneSpec {
                start_y: 0.3,
                end_y: 0.6,
                slope: 35.0,
            }],
            access_paths: vec![AccessPathSpec {
                side: Side::Left,
                start_y: 0.25,
                end_y: 0.65,
            }],
            ..Default::default()
        };
        let mut s = state(level);
        let ts = s.geometry.tile_size;
        let zone = s.geometry.steep_zones[0];
        let road = *s
            .geometry
            .access_rects
            .iter()
            .find(|r| zone.covers(r.bounds.center().y))
            .unwrap();
        let mut input = driving(&s);
        input.pose.position = road.bounds.center() * ts;

        for _ in 0..60 {
            let out = tick(&mut s, &input, SIM_DT);
            assert_eq!(out.advice.added, Vec2::ZERO);
        }
        // One second at the base drain, no steep multiplier
        assert!((s.session.stamina - (100.0 - 0.4)).abs() < 1e-3);
    }
}
