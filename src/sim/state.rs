//! Game state and events
//!
//! Everything one grooming session needs, built from a level and a tuning.
//! All of it is serializable so a host can snapshot and replay a session.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::geometry::{LevelGeometry, generate_level};
use super::grid::TerrainGrid;
use super::hazard::{AvalancheLevel, HazardEngine};
use super::session::{Buff, BonusContext, BonusResult, FailReason, SessionPhase, SessionState};
use super::stability::StabilityModel;
use super::timers::{ScheduledEvent, TimerQueue};
use super::winch::WinchController;
use crate::consts::TOP_BUFFER_ROWS;
use crate::error::LevelError;
use crate::level::LevelSpec;
use crate::tuning::Tuning;

/// Things that happened during a tick, in order
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum GameEvent {
    Victory { bonuses: Vec<BonusResult> },
    Failed(FailReason),
    /// The session-end delay after an outcome has elapsed
    SessionEnded,
    WinchAttached(usize),
    WinchReleased(usize),
    WinchSnapped(usize),
    SlideWarning,
    TumbleStarted,
    CliffTipOver,
    CliffFall,
    AvalancheWarning { zone: usize, level: AvalancheLevel },
    AvalancheTriggered { zone: usize },
    AccessPathVisited(usize),
    Groomed { cells: usize },
    BuffExpired(Buff),
    /// Localization key for the dialogue collaborator
    Dialogue(&'static str),
}

/// Read-only HUD snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Telemetry {
    pub fuel: f32,
    pub stamina: f32,
    pub frost: f32,
    pub coverage_pct: u32,
    pub average_quality_pct: f32,
    pub winch_active: bool,
    pub active_buff: Option<Buff>,
    pub tumble_count: u32,
    pub fuel_used: f32,
    pub winch_use_count: u32,
    pub paths_visited: usize,
    pub paths_total: usize,
    pub avalanche_risk: f32,
    pub elapsed_secs: f32,
    pub time_remaining: Option<f32>,
    pub phase: SessionPhase,
}

/// Complete session state (deterministic, serializable)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameState {
    pub level: LevelSpec,
    pub tuning: Tuning,
    pub geometry: LevelGeometry,
    pub grid: TerrainGrid,
    pub stability: StabilityModel,
    pub winch: WinchController,
    pub hazards: HazardEngine,
    pub session: SessionState,
    pub timers: TimerQueue,
    /// Simulated time (ms)
    pub time_ms: f64,
    /// Simulation tick counter
    pub time_ticks: u64,
    /// Reloads of this level, for the flawless bonus
    pub restart_count: u32,
}

impl GameState {
    /// Validate the level and build every component
    pub fn new(level: LevelSpec, tuning: Tuning) -> Result<Self, LevelError> {
        let geometry = generate_level(&level)?;
        let grid = TerrainGrid::build(&geometry.piste, geometry.width, geometry.tile_size);
        let stability = StabilityModel::new(&geometry);
        let winch = WinchController::new(geometry.winch_anchors.clone(), tuning.winch.clone());
        let hazards = HazardEngine::new(
            &geometry,
            tuning.steepness.clone(),
            tuning.avalanche.clone(),
        );
        let session = SessionState::new(&level);

        log::info!(
            "Session ready: {} groomable tiles, target {}%{}",
            grid.counters().groomable,
            level.target_coverage,
            if level.is_timed() {
                format!(", {}s limit", level.time_limit)
            } else {
                String::new()
            }
        );

        Ok(Self {
            level,
            tuning,
            geometry,
            grid,
            stability,
            winch,
            hazards,
            session,
            timers: TimerQueue::new(),
            time_ms: 0.0,
            time_ticks: 0,
            restart_count: 0,
        })
    }

    /// Restart the level: same seed and terrain, fresh snow, no pending
    /// timers
    pub fn reload(&mut self) -> Result<(), LevelError> {
        let restarts = self.restart_count + 1;
        *self = Self::new(self.level.clone(), self.tuning.clone())?;
        self.restart_count = restarts;
        log::info!("Level reloaded (restart {restarts})");
        Ok(())
    }

    /// A tumble, cliff or avalanche is playing out; no grooming or wins
    pub fn is_catastrophic(&self) -> bool {
        self.hazards.is_tumbling()
            || self.stability.latched().is_some()
            || self.hazards.avalanche_triggered()
    }

    pub fn is_game_over(&self) -> bool {
        self.session.is_game_over()
    }

    /// Piste center of the first groomable row (world px)
    pub fn spawn_point(&self) -> Vec2 {
        let ts = self.geometry.tile_size;
        let row = TOP_BUFFER_ROWS as usize;
        let cx = self
            .geometry
            .piste
            .row(row)
            .map_or(self.geometry.width as f32 / 2.0, |r| r.center_x);
        Vec2::new(cx * ts, (row as f32 + 0.5) * ts)
    }

    pub fn bonus_context(&self) -> BonusContext {
        BonusContext {
            average_quality_pct: self.grid.average_quality_pct(),
            access_path_total: self.geometry.access_path_count(),
            restart_count: self.restart_count,
        }
    }

    pub fn telemetry(&self) -> Telemetry {
        let s = &self.session;
        Telemetry {
            fuel: s.fuel,
            stamina: s.stamina,
            frost: s.frost,
            coverage_pct: self.grid.coverage_pct(),
            average_quality_pct: self.grid.average_quality_pct(),
            winch_active: self.winch.is_active(),
            active_buff: s.active_buff(),
            tumble_count: s.counters.tumble_count,
            fuel_used: s.counters.fuel_used,
            winch_use_count: s.counters.winch_use_count,
            paths_visited: s.counters.paths_visited.len(),
            paths_total: self.geometry.access_path_count(),
            avalanche_risk: self.hazards.max_risk(),
            elapsed_secs: s.elapsed_secs(),
            time_remaining: s.time_remaining(),
            phase: s.phase(),
        }
    }

    /// Schedule an event `delay_ms` from now
    pub(crate) fn schedule(&mut self, delay_ms: f64, event: ScheduledEvent) {
        self.timers.schedule(self.time_ms + delay_ms, event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_builds_components() {
        let state = GameState::new(LevelSpec::default(), Tuning::default()).unwrap();
        assert_eq!(state.grid.counters().groomable, 20 * 55);
        assert!(state.stability.cliffs().is_empty());
        assert!(state.hazards.zones().is_empty());
        assert_eq!(state.spawn_point(), Vec2::new(320.0, 56.0));
        assert!(!state.is_catastrophic());
    }

    #[test]
    fn test_new_rejects_bad_level() {
        let level = LevelSpec {
            width: 0,
            ..Default::default()
        };
        assert!(GameState::new(level, Tuning::default()).is_err());
    }

    #[test]
    fn test_reload_resets_and_counts() {
        let mut state = GameState::new(LevelSpec::default(), Tuning::default()).unwrap();
        let geometry = state.geometry.clone();
        state.grid.groom_at(state.spawn_point(), 2, 1.0);
        state.schedule(1000.0, ScheduledEvent::SessionEnd);
        state.time_ms = 500.0;

        state.reload().unwrap();
        assert_eq!(state.geometry, geometry);
        assert_eq!(state.grid.counters().groomed, 0);
        assert!(state.timers.is_empty());
        assert_eq!(state.time_ms, 0.0);
        assert_eq!(state.restart_count, 1);
        assert_eq!(state.bonus_context().restart_count, 1);

        state.reload().unwrap();
        assert_eq!(state.restart_count, 2);
    }

    #[test]
    fn test_telemetry_snapshot() {
        let state = GameState::new(LevelSpec::default(), Tuning::default()).unwrap();
        let t = state.telemetry();
        assert_eq!(t.fuel, 100.0);
        assert_eq!(t.coverage_pct, 0);
        assert!(!t.winch_active);
        assert_eq!(t.phase, SessionPhase::Active);
        assert_eq!(t.time_remaining, None);
        let json = serde_json::to_string(&t).unwrap();
        assert!(json.contains("\"coverage_pct\":0"));
    }
}
