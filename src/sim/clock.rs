//! Frame clock
//!
//! Hosts hand over variable frame deltas; the simulation only ever advances
//! in fixed `SIM_DT` steps. Leftover time carries to the next frame.

use super::state::{GameEvent, GameState};
use super::tick::{TickInput, tick};
use super::vehicle::VelocityAdvice;
use super::winch::WinchOutput;
use crate::consts::*;

/// Source of per-frame elapsed seconds
pub trait Clock {
    fn tick(&mut self) -> f32;
}

/// Constant frame delta (headless runs and tests)
#[derive(Debug, Clone, Copy)]
pub struct FixedClock {
    pub frame_dt: f32,
}

impl Clock for FixedClock {
    fn tick(&mut self) -> f32 {
        self.frame_dt
    }
}

/// Wall clock for native hosts
#[cfg(not(target_arch = "wasm32"))]
#[derive(Debug, Clone, Copy)]
pub struct WallClock {
    last: std::time::Instant,
}

#[cfg(not(target_arch = "wasm32"))]
impl WallClock {
    pub fn new() -> Self {
        Self {
            last: std::time::Instant::now(),
        }
    }
}

#[cfg(not(target_arch = "wasm32"))]
impl Default for WallClock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(not(target_arch = "wasm32"))]
impl Clock for WallClock {
    fn tick(&mut self) -> f32 {
        let now = std::time::Instant::now();
        let dt = now.duration_since(self.last).as_secs_f32();
        self.last = now;
        dt
    }
}

/// Result of one frame's worth of fixed steps
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrameOutput {
    pub events: Vec<GameEvent>,
    /// Advice from the last step run this frame
    pub advice: VelocityAdvice,
    pub winch: WinchOutput,
    pub substeps: u32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SimulationClock {
    accumulator: f32,
}

impl SimulationClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn accumulator(&self) -> f32 {
        self.accumulator
    }

    /// Run as many fixed steps as `frame_dt` covers (bounded)
    pub fn advance(&mut self, state: &mut GameState, frame_dt: f32, input: &TickInput) -> FrameOutput {
        let dt = if frame_dt.is_finite() {
            frame_dt.clamp(0.0, MAX_FRAME_DT)
        } else {
            0.0
        };
        self.accumulator += dt;

        let mut frame = FrameOutput::default();
        while self.accumulator >= SIM_DT && frame.substeps < MAX_SUBSTEPS {
            let out = tick(state, input, SIM_DT);
            frame.events.extend(out.events);
            frame.advice = out.advice;
            frame.winch = out.winch;
            self.accumulator -= SIM_DT;
            frame.substeps += 1;
        }
        frame
    }

    /// Pull the frame delta from `clock` and advance
    pub fn step(
        &mut self,
        clock: &mut impl Clock,
        state: &mut GameState,
        input: &TickInput,
    ) -> FrameOutput {
        let dt = clock.tick();
        self.advance(state, dt, input)
    }

    /// Drop carried time (level reload)
    pub fn reset(&mut self) {
        self.accumulator = 0.0;
    }
}
