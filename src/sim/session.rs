//! Grooming session state
//!
//! Resource economy, buffs, tutorial progress, bonus tracking and the
//! outcome latch. The session is `Active` until exactly one outcome latches;
//! after that every per-tick method is a no-op.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use super::hazard::OneShot;
use crate::consts::RESOURCE_MAX;
use crate::level::{BonusObjective, LevelSpec};
use crate::tuning::{ResourceTuning, Tuning, WinchTuning};

/// How long the tutorial welcome stays up before asking the player to move
pub const TUTORIAL_WELCOME_MS: f64 = 3000.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Buff {
    /// Halves stamina drain and keeps frost away
    Warmth,
    /// Regenerates stamina
    Energy,
    /// Faster movement
    Speed,
    /// Better grooming quality
    Precision,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailReason {
    Fuel,
    Time,
    Tumble,
    Cliff,
    Avalanche,
    Feature,
}

impl FailReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailReason::Fuel => "fuel",
            FailReason::Time => "time",
            FailReason::Tumble => "tumble",
            FailReason::Cliff => "cliff",
            FailReason::Avalanche => "avalanche",
            FailReason::Feature => "feature",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Outcome {
    Victory,
    Failed(FailReason),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionPhase {
    Active,
    Victory,
    Failed(FailReason),
    /// Session end has fired; nothing leaves this state
    Terminal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TutorialStep {
    Welcome,
    Move,
    Groom,
    Coverage,
    Done,
}

impl TutorialStep {
    pub fn dialogue_key(&self) -> &'static str {
        match self {
            TutorialStep::Welcome => "tutorial_welcome",
            TutorialStep::Move => "tutorial_move",
            TutorialStep::Groom => "tutorial_groom",
            TutorialStep::Coverage => "tutorial_coverage",
            TutorialStep::Done => "tutorial_done",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TutorialProgress {
    enabled: bool,
    step: Option<TutorialStep>,
    triggered: BTreeSet<TutorialStep>,
}

impl TutorialProgress {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            ..Default::default()
        }
    }

    pub fn step(&self) -> Option<TutorialStep> {
        self.step
    }

    pub fn has_triggered(&self, step: TutorialStep) -> bool {
        self.triggered.contains(&step)
    }

    /// Move at most one step forward; returns the step entered
    fn update(
        &mut self,
        elapsed_ms: f64,
        flags: &SessionFlags,
        coverage_pct: u32,
        target: f32,
    ) -> Option<TutorialStep> {
        if !self.enabled {
            return None;
        }
        let next = match self.step {
            None => TutorialStep::Welcome,
            Some(TutorialStep::Welcome) if elapsed_ms >= TUTORIAL_WELCOME_MS => TutorialStep::Move,
            Some(TutorialStep::Move) if flags.moving => TutorialStep::Groom,
            Some(TutorialStep::Groom) if flags.grooming => TutorialStep::Coverage,
            Some(TutorialStep::Coverage) if coverage_pct as f32 * 2.0 >= target => TutorialStep::Done,
            _ => return None,
        };
        self.step = Some(next);
        self.triggered.insert(next).then_some(next)
    }
}

/// What the groomer is doing this tick
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionFlags {
    pub moving: bool,
    pub grooming: bool,
    pub on_steep: bool,
    pub winch_taut: bool,
}

/// Counters behind the bonus objectives
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BonusCounters {
    pub fuel_used: f32,
    pub tumble_count: u32,
    pub winch_use_count: u32,
    pub paths_visited: BTreeSet<usize>,
}

/// Inputs to bonus evaluation the session does not own
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct BonusContext {
    pub average_quality_pct: f32,
    pub access_path_total: usize,
    pub restart_count: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BonusResult {
    pub objective: BonusObjective,
    pub achieved: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum SessionEvent {
    BuffExpired(Buff),
    Dialogue(&'static str),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionState {
    pub fuel: f32,
    pub stamina: f32,
    pub frost: f32,
    /// Remaining milliseconds per active buff
    buffs: BTreeMap<Buff, f32>,
    stun_ms: f32,
    elapsed_ms: f64,
    phase: SessionPhase,
    outcome: Option<Outcome>,
    pub counters: BonusCounters,
    pub tutorial: TutorialProgress,
    low_fuel: OneShot,
    low_stamina: OneShot,
    frost_enabled: bool,
    /// Seconds; 0 means untimed
    time_limit: f32,
}

impl SessionState {
    pub fn new(level: &LevelSpec) -> Self {
        Self {
            fuel: RESOURCE_MAX,
            stamina: RESOURCE_MAX,
            frost: 0.0,
            buffs: BTreeMap::new(),
            stun_ms: 0.0,
            elapsed_ms: 0.0,
            phase: SessionPhase::Active,
            outcome: None,
            counters: BonusCounters::default(),
            tutorial: TutorialProgress::new(level.tutorial),
            low_fuel: OneShot::Armed,
            low_stamina: OneShot::Armed,
            frost_enabled: level.frost,
            time_limit: level.time_limit.max(0.0),
        }
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    /// The outcome that latched, kept through `Terminal`
    pub fn outcome(&self) -> Option<Outcome> {
        self.outcome
    }

    pub fn is_game_over(&self) -> bool {
        self.phase != SessionPhase::Active
    }

    pub fn elapsed_secs(&self) -> f32 {
        (self.elapsed_ms / 1000.0) as f32
    }

    /// Seconds left on a timed level
    pub fn time_remaining(&self) -> Option<f32> {
        (self.time_limit > 0.0).then(|| (self.time_limit - self.elapsed_secs()).max(0.0))
    }

    pub fn buffs(&self) -> &BTreeMap<Buff, f32> {
        &self.buffs
    }

    pub fn has_buff(&self, buff: Buff) -> bool {
        self.buffs.contains_key(&buff)
    }

    /// The buff with the most time left
    pub fn active_buff(&self) -> Option<Buff> {
        self.buffs
            .iter()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(buff, _)| *buff)
    }

    /// Start a buff, replacing the remaining time of the same kind
    pub fn apply_buff(&mut self, buff: Buff, duration_ms: f32) {
        if self.is_game_over() || duration_ms <= 0.0 {
            return;
        }
        self.buffs.insert(buff, duration_ms);
    }

    pub fn refuel(&mut self, amount: f32) {
        if self.is_game_over() {
            return;
        }
        self.fuel = (self.fuel + amount.max(0.0)).min(RESOURCE_MAX);
        if self.fuel > 0.0 {
            log::debug!("Refuelled to {:.1}", self.fuel);
        }
    }

    pub fn is_stunned(&self) -> bool {
        self.stun_ms > 0.0
    }

    /// Cable snap: stamina hit and a stun window
    pub fn apply_snap_penalty(&mut self, winch: &WinchTuning) {
        self.stamina = (self.stamina - winch.snap_stamina_penalty).clamp(0.0, RESOURCE_MAX);
        self.stun_ms = self.stun_ms.max(winch.snap_stun_ms);
    }

    pub fn record_winch_use(&mut self) {
        self.counters.winch_use_count += 1;
    }

    pub fn record_tumble(&mut self) {
        self.counters.tumble_count += 1;
    }

    /// True the first time a path is visited
    pub fn visit_access_path(&mut self, index: usize) -> bool {
        self.counters.paths_visited.insert(index)
    }

    /// Stacked stamina drain multiplier
    pub fn stamina_multiplier(&self, flags: &SessionFlags, t: &ResourceTuning) -> f32 {
        let mut m = 1.0;
        if flags.winch_taut {
            m *= t.winch_stamina_factor;
        } else if flags.on_steep {
            m *= t.steep_stamina_factor;
        }
        if flags.grooming {
            m *= t.grooming_stamina_factor;
        }
        if self.has_buff(Buff::Warmth) {
            m *= t.warmth_stamina_factor;
        }
        m
    }

    /// Drive speed multiplier from frost, buffs and exhaustion
    pub fn speed_multiplier(&self, tuning: &Tuning) -> f32 {
        let mut m = 1.0;
        if self.frost_enabled {
            m *= tuning.frost_speed_factor(self.frost);
        }
        if self.has_buff(Buff::Speed) {
            m *= tuning.resources.speed_buff_factor;
        }
        if self.stamina <= 0.0 {
            m *= tuning.resources.exhausted_speed_factor;
        }
        m
    }

    pub fn grooming_quality(&self, base: f32, t: &ResourceTuning) -> f32 {
        let bonus = if self.has_buff(Buff::Precision) {
            t.precision_quality_bonus
        } else {
            0.0
        };
        (base + bonus).clamp(0.0, 1.0)
    }

    /// One tick of the resource economy
    pub fn advance(&mut self, dt: f32, flags: &SessionFlags, t: &ResourceTuning) -> Vec<SessionEvent> {
        let mut events = Vec::new();
        if self.is_game_over() {
            return events;
        }
        let ms = dt * 1000.0;
        self.elapsed_ms += ms as f64;
        self.stun_ms = (self.stun_ms - ms).max(0.0);

        for remaining in self.buffs.values_mut() {
            *remaining -= ms;
        }
        let expired: Vec<Buff> = self
            .buffs
            .iter()
            .filter(|(_, remaining)| **remaining <= 0.0)
            .map(|(buff, _)| *buff)
            .collect();
        for buff in expired {
            self.buffs.remove(&buff);
            log::debug!("Buff {buff:?} expired");
            events.push(SessionEvent::BuffExpired(buff));
        }

        if flags.moving {
            let mut fuel_rate = t.fuel_drain_per_sec;
            if flags.grooming {
                fuel_rate += t.grooming_fuel_drain_per_sec;
            }
            let before = self.fuel;
            self.fuel = (self.fuel - fuel_rate * dt).clamp(0.0, RESOURCE_MAX);
            self.counters.fuel_used += before - self.fuel;
            self.stamina -= t.stamina_drain_per_sec * self.stamina_multiplier(flags, t) * dt;
        }
        if self.has_buff(Buff::Energy) {
            self.stamina += t.energy_regen_per_sec * dt;
        }
        if self.frost_enabled && !self.has_buff(Buff::Warmth) {
            self.frost += t.frost_per_minute * dt / 60.0;
        }
        self.stamina = self.stamina.clamp(0.0, RESOURCE_MAX);
        self.frost = self.frost.clamp(0.0, RESOURCE_MAX);

        if self.fuel <= t.low_fuel_warning && self.low_fuel.fire() {
            events.push(SessionEvent::Dialogue("low_fuel"));
        }
        if self.stamina <= t.low_stamina_warning && self.low_stamina.fire() {
            events.push(SessionEvent::Dialogue("low_stamina"));
        }

        events
    }

    /// Tutorial dialogue for this tick, if a step was entered
    pub fn update_tutorial(
        &mut self,
        flags: &SessionFlags,
        coverage_pct: u32,
        target: f32,
    ) -> Option<&'static str> {
        if self.is_game_over() {
            return None;
        }
        self.tutorial
            .update(self.elapsed_ms, flags, coverage_pct, target)
            .map(|step| step.dialogue_key())
    }

    /// Latch a failure. False if an outcome already latched.
    pub fn fail(&mut self, reason: FailReason) -> bool {
        if self.is_game_over() {
            return false;
        }
        log::info!("Session failed: {}", reason.as_str());
        self.phase = SessionPhase::Failed(reason);
        self.outcome = Some(Outcome::Failed(reason));
        true
    }

    /// Fuel and clock failures
    pub fn check_fail(&mut self) -> Option<FailReason> {
        let reason = if self.fuel <= 0.0 {
            FailReason::Fuel
        } else if self.time_limit > 0.0 && self.elapsed_secs() >= self.time_limit {
            FailReason::Time
        } else {
            return None;
        };
        self.fail(reason).then_some(reason)
    }

    /// Latch victory once coverage reaches the target
    pub fn check_win(&mut self, coverage_pct: u32, target: f32) -> bool {
        if self.is_game_over() || (coverage_pct as f32) < target {
            return false;
        }
        log::info!(
            "Session won at {}% coverage after {:.1}s",
            coverage_pct,
            self.elapsed_secs()
        );
        self.phase = SessionPhase::Victory;
        self.outcome = Some(Outcome::Victory);
        true
    }

    /// Session end: Victory/Failed move to Terminal. False otherwise.
    pub fn finish(&mut self) -> bool {
        match self.phase {
            SessionPhase::Victory | SessionPhase::Failed(_) => {
                self.phase = SessionPhase::Terminal;
                true
            }
            SessionPhase::Active | SessionPhase::Terminal => false,
        }
    }

    /// Score each objective; tutorial sessions have none
    pub fn evaluate_bonuses(
        &self,
        objectives: &[BonusObjective],
        ctx: &BonusContext,
    ) -> Vec<BonusResult> {
        if self.tutorial.enabled {
            return Vec::new();
        }
        let c = &self.counters;
        objectives
            .iter()
            .map(|objective| {
                let achieved = match *objective {
                    BonusObjective::SpeedRun { max_seconds } => self.elapsed_secs() <= max_seconds,
                    BonusObjective::FuelEfficiency { max_fuel_used } => c.fuel_used <= max_fuel_used,
                    BonusObjective::NoTumble => c.tumble_count == 0,
                    BonusObjective::WinchMastery { max_uses } => c.winch_use_count <= max_uses,
                    BonusObjective::Exploration => c.paths_visited.len() >= ctx.access_path_total,
                    BonusObjective::Flawless => ctx.restart_count == 0,
                    BonusObjective::QualityGroom { min_quality_pct } => {
                        ctx.average_quality_pct >= min_quality_pct
                    }
                };
                BonusResult {
                    objective: *objective,
                    achieved,
                }
            })
            .collect()
    }
}
