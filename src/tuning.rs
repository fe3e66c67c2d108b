//! Game balance
//!
//! Every playtested literal lives here so it can be overridden from a JSON
//! document without touching the simulation. Missing fields keep defaults.

use serde::{Deserialize, Serialize};

use crate::error::TuningError;

/// Steep terrain behaviour
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SteepnessTuning {
    /// Slope (degrees) at which the groomer starts sliding downhill
    pub slide_threshold: f32,
    /// Slope (degrees) at which the groomer tumbles
    pub tumble_threshold: f32,
    /// Slope subtracted before scaling slide velocity
    pub slide_offset: f32,
    /// Downhill velocity added per tick per degree above the offset (px/s)
    pub slide_gain: f32,
    /// Downhill speed while tumbling (px/s)
    pub tumble_speed: f32,
    /// Spin while tumbling (rad/s)
    pub tumble_spin: f32,
    /// Delay between tumble start and the fail event (ms)
    pub tumble_fail_delay_ms: f64,
}

impl Default for SteepnessTuning {
    fn default() -> Self {
        Self {
            slide_threshold: 30.0,
            tumble_threshold: 40.0,
            slide_offset: 25.0,
            slide_gain: 2.0,
            tumble_speed: 240.0,
            tumble_spin: 9.0,
            tumble_fail_delay_ms: 2000.0,
        }
    }
}

/// Avalanche risk model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AvalancheTuning {
    /// Risk gained per tick inside a zone
    pub risk_per_tick: f32,
    /// Extra risk per tick when grooming inside a zone
    pub grooming_risk_per_tick: f32,
    /// First warning (rumble)
    pub warning_threshold: f32,
    /// Second warning (shake + dialogue)
    pub danger_threshold: f32,
    /// Delay between trigger and the fail event (ms)
    pub fail_delay_ms: f64,
}

impl Default for AvalancheTuning {
    fn default() -> Self {
        Self {
            risk_per_tick: 0.015,
            grooming_risk_per_tick: 0.01,
            warning_threshold: 0.5,
            danger_threshold: 0.8,
            fail_delay_ms: 2500.0,
        }
    }
}

/// Winch cable
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WinchTuning {
    /// Maximum distance to an anchor base for attaching (px)
    pub attach_radius: f32,
    /// Maximum cable length (px)
    pub max_cable_length: f32,
    /// Fraction of cable length where tension drag begins
    pub tension_start: f32,
    /// Assist velocity per px of remaining distance (1/s)
    pub assist_gain: f32,
    /// Assist velocity cap (px/s)
    pub assist_max: f32,
    /// Speed lost at full tension drag (fraction)
    pub tension_max_drag: f32,
    /// Stamina lost when the cable snaps
    pub snap_stamina_penalty: f32,
    /// Stun after a snap (ms)
    pub snap_stun_ms: f32,
}

impl Default for WinchTuning {
    fn default() -> Self {
        Self {
            attach_radius: 48.0,
            max_cable_length: 480.0,
            tension_start: 0.7,
            assist_gain: 0.25,
            assist_max: 60.0,
            tension_max_drag: 0.8,
            snap_stamina_penalty: 20.0,
            snap_stun_ms: 1500.0,
        }
    }
}

/// Fuel, stamina, frost and buffs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResourceTuning {
    /// Fuel used per second of movement (percentage points)
    pub fuel_drain_per_sec: f32,
    /// Extra fuel per second while grooming
    pub grooming_fuel_drain_per_sec: f32,
    /// Stamina used per second of movement
    pub stamina_drain_per_sec: f32,
    /// Multiplier while the winch is taut
    pub winch_stamina_factor: f32,
    /// Multiplier on steep terrain without the winch
    pub steep_stamina_factor: f32,
    /// Multiplier while grooming
    pub grooming_stamina_factor: f32,
    /// Multiplier while the warmth buff is active
    pub warmth_stamina_factor: f32,
    /// Stamina regained per second while the energy buff is active
    pub energy_regen_per_sec: f32,
    /// Movement multiplier while the speed buff is active
    pub speed_buff_factor: f32,
    /// Grooming quality added while the precision buff is active
    pub precision_quality_bonus: f32,
    /// Movement multiplier when stamina is exhausted
    pub exhausted_speed_factor: f32,
    /// Frost gained per minute
    pub frost_per_minute: f32,
    /// Frost levels (ascending) and the movement multiplier past each one
    pub frost_speed_steps: Vec<(f32, f32)>,
    /// Low fuel warning (percentage)
    pub low_fuel_warning: f32,
    /// Low stamina warning (percentage)
    pub low_stamina_warning: f32,
}

impl Default for ResourceTuning {
    fn default() -> Self {
        Self {
            fuel_drain_per_sec: 0.5,
            grooming_fuel_drain_per_sec: 0.25,
            stamina_drain_per_sec: 0.4,
            winch_stamina_factor: 0.5,
            steep_stamina_factor: 2.0,
            grooming_stamina_factor: 1.3,
            warmth_stamina_factor: 0.5,
            energy_regen_per_sec: 1.0,
            speed_buff_factor: 1.25,
            precision_quality_bonus: 0.15,
            exhausted_speed_factor: 0.5,
            frost_per_minute: 10.0,
            frost_speed_steps: vec![(40.0, 0.85), (70.0, 0.7), (90.0, 0.55)],
            low_fuel_warning: 20.0,
            low_stamina_warning: 20.0,
        }
    }
}

/// Groomer footprint and outcome timing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VehicleTuning {
    /// Footprint length along the heading (px)
    pub length: f32,
    /// Footprint width across the heading (px)
    pub width: f32,
    /// Fraction of half-length used for front/rear stability samples
    pub longitudinal_sample: f32,
    /// Fraction of half-width used for lateral stability samples
    pub lateral_sample: f32,
    /// Delay between a cliff fall and the fail event (ms)
    pub cliff_fail_delay_ms: f64,
    /// Delay between an outcome and session end (ms)
    pub session_end_delay_ms: f64,
}

impl Default for VehicleTuning {
    fn default() -> Self {
        Self {
            length: 48.0,
            width: 32.0,
            longitudinal_sample: 0.7,
            lateral_sample: 0.5,
            cliff_fail_delay_ms: 1500.0,
            session_end_delay_ms: 2000.0,
        }
    }
}

/// All tunable balance values
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Tuning {
    pub steepness: SteepnessTuning,
    pub avalanche: AvalancheTuning,
    pub winch: WinchTuning,
    pub resources: ResourceTuning,
    pub vehicle: VehicleTuning,
}

impl Tuning {
    /// Overlay a (partial) JSON document on the defaults
    pub fn from_json(json: &str) -> Result<Self, TuningError> {
        let tuning: Tuning = serde_json::from_str(json)?;
        tuning.validate()?;
        Ok(tuning)
    }

    /// Reject values that would break the state machines
    pub fn validate(&self) -> Result<(), TuningError> {
        let s = &self.steepness;
        if s.slide_threshold > s.tumble_threshold {
            return Err(TuningError::OutOfRange {
                field: "steepness.slide_threshold",
                value: s.slide_threshold,
            });
        }
        if self.winch.max_cable_length <= 0.0 {
            return Err(TuningError::OutOfRange {
                field: "winch.max_cable_length",
                value: self.winch.max_cable_length,
            });
        }
        if !(0.0..1.0).contains(&self.winch.tension_start) {
            return Err(TuningError::OutOfRange {
                field: "winch.tension_start",
                value: self.winch.tension_start,
            });
        }
        let a = &self.avalanche;
        if a.risk_per_tick <= 0.0 {
            return Err(TuningError::OutOfRange {
                field: "avalanche.risk_per_tick",
                value: a.risk_per_tick,
            });
        }
        if !(a.warning_threshold < a.danger_threshold && a.danger_threshold < 1.0) {
            return Err(TuningError::OutOfRange {
                field: "avalanche.danger_threshold",
                value: a.danger_threshold,
            });
        }
        Ok(())
    }

    /// Movement multiplier for a frost level (non-increasing in frost)
    pub fn frost_speed_factor(&self, frost: f32) -> f32 {
        self.resources
            .frost_speed_steps
            .iter()
            .filter(|(level, _)| frost >= *level)
            .map(|(_, factor)| *factor)
            .fold(1.0, f32::min)
    }
}
