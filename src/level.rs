//! Declarative level parameters
//!
//! A `LevelSpec` is produced by the host (campaign data, or
//! [`generate_contract_level`](crate::contract::generate_contract_level)) and
//! is immutable for the lifetime of a session.

use serde::{Deserialize, Serialize};

use crate::consts::*;
use crate::error::LevelError;

/// Centerline/width profile family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PisteShape {
    #[default]
    Straight,
    GentleCurve,
    Winding,
    Serpentine,
    Wide,
}

impl PisteShape {
    pub const ALL: [PisteShape; 5] = [
        PisteShape::Straight,
        PisteShape::GentleCurve,
        PisteShape::Winding,
        PisteShape::Serpentine,
        PisteShape::Wide,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PisteShape::Straight => "straight",
            PisteShape::GentleCurve => "gentle_curve",
            PisteShape::Winding => "winding",
            PisteShape::Serpentine => "serpentine",
            PisteShape::Wide => "wide",
        }
    }
}

/// World edge a road or cliff hangs off
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Left,
    Right,
}

impl Side {
    /// -1 for left, +1 for right
    #[inline]
    pub fn sign(&self) -> f32 {
        match self {
            Side::Left => -1.0,
            Side::Right => 1.0,
        }
    }
}

/// A band of rows steeper than the rest of the run
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SteepZoneSpec {
    /// Start row as a fraction of level height
    pub start_y: f32,
    /// End row as a fraction of level height
    pub end_y: f32,
    /// Slope in degrees
    pub slope: f32,
}

/// A service road bypassing part of the piste
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AccessPathSpec {
    pub side: Side,
    pub start_y: f32,
    pub end_y: f32,
}

/// A winch anchor post, placed on the piste centerline
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WinchAnchorSpec {
    /// Hook row as a fraction of level height
    pub y: f32,
}

/// Optional level-wide hazards
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Hazard {
    Avalanche,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Weather {
    #[default]
    Clear,
    LightSnow,
    Storm,
}

/// Extra goals scored on victory
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "type")]
pub enum BonusObjective {
    /// Finish within the given number of seconds
    SpeedRun { max_seconds: f32 },
    /// Use at most this much fuel (percentage points)
    FuelEfficiency { max_fuel_used: f32 },
    /// Never tumble
    NoTumble,
    /// Use the winch at most this many times
    WinchMastery { max_uses: u32 },
    /// Drive through every access path
    Exploration,
    /// Win without restarting the level
    Flawless,
    /// Average grooming quality of at least this percentage
    QualityGroom { min_quality_pct: f32 },
}

/// Immutable level description
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LevelSpec {
    /// Generation seed (same seed, same terrain)
    pub seed: u64,
    /// Width in tiles
    pub width: u32,
    /// Height in tiles
    pub height: u32,
    pub piste_shape: PisteShape,
    /// Piste width as a fraction of the level width
    pub piste_width: f32,
    pub steep_zones: Vec<SteepZoneSpec>,
    pub access_paths: Vec<AccessPathSpec>,
    pub winch_anchors: Vec<WinchAnchorSpec>,
    pub hazards: Vec<Hazard>,
    /// Cliffs line the piste where it leaves room
    pub has_dangerous_boundaries: bool,
    pub weather: Weather,
    pub night: bool,
    /// Frost accumulates during the session
    pub frost: bool,
    /// Tutorial dialogue flow
    pub tutorial: bool,
    /// Coverage percentage needed to win
    pub target_coverage: f32,
    /// Seconds available (0 = untimed)
    pub time_limit: f32,
    pub bonus_objectives: Vec<BonusObjective>,
}

impl Default for LevelSpec {
    fn default() -> Self {
        Self {
            seed: 0,
            width: 40,
            height: 60,
            piste_shape: PisteShape::Straight,
            piste_width: 0.5,
            steep_zones: Vec::new(),
            access_paths: Vec::new(),
            winch_anchors: Vec::new(),
            hazards: Vec::new(),
            has_dangerous_boundaries: false,
            weather: Weather::Clear,
            night: false,
            frost: false,
            tutorial: false,
            target_coverage: 80.0,
            time_limit: 0.0,
            bonus_objectives: Vec::new(),
        }
    }
}

/// Smallest accepted width in tiles (minimum piste plus both margins)
pub fn min_level_width() -> u32 {
    (MIN_PISTE_WIDTH + 2.0 * PISTE_MARGIN).ceil() as u32
}

/// Smallest accepted height in tiles (buffers plus a few groomable rows)
pub fn min_level_height() -> u32 {
    TOP_BUFFER_ROWS + BOTTOM_BUFFER_ROWS + 3
}

fn check_fraction(field: &'static str, value: f32) -> Result<(), LevelError> {
    if !(0.0..=1.0).contains(&value) {
        return Err(LevelError::FractionOutOfRange { field, value });
    }
    Ok(())
}

fn check_range(field: &'static str, start: f32, end: f32) -> Result<(), LevelError> {
    check_fraction(field, start)?;
    check_fraction(field, end)?;
    if start > end {
        return Err(LevelError::InvertedRange { field, start, end });
    }
    Ok(())
}

impl LevelSpec {
    /// Parse a level from JSON and validate it
    pub fn from_json(json: &str) -> Result<Self, LevelError> {
        let spec: LevelSpec =
            serde_json::from_str(json).map_err(|e| LevelError::Parse(e.to_string()))?;
        spec.validate()?;
        Ok(spec)
    }

    /// Check every structural parameter; nothing is silently defaulted
    pub fn validate(&self) -> Result<(), LevelError> {
        if self.width == 0 || self.height == 0 {
            return Err(LevelError::InvalidDimensions {
                width: self.width,
                height: self.height,
            });
        }
        if self.width < min_level_width() || self.height < min_level_height() {
            return Err(LevelError::TooSmall {
                width: self.width,
                height: self.height,
                min_width: min_level_width(),
                min_height: min_level_height(),
            });
        }
        if !(self.target_coverage > 0.0 && self.target_coverage <= 100.0) {
            return Err(LevelError::InvalidTargetCoverage(self.target_coverage));
        }
        if !(self.piste_width > 0.0 && self.piste_width <= 1.0) {
            return Err(LevelError::InvalidPisteWidth(self.piste_width));
        }
        if !self.time_limit.is_finite() || self.time_limit < 0.0 {
            return Err(LevelError::InvalidTimeLimit(self.time_limit));
        }
        for zone in &self.steep_zones {
            check_range("steep zone", zone.start_y, zone.end_y)?;
            if !(zone.slope > 0.0 && zone.slope < 90.0) {
                return Err(LevelError::InvalidSlope(zone.slope));
            }
        }
        for path in &self.access_paths {
            check_range("access path", path.start_y, path.end_y)?;
        }
        for anchor in &self.winch_anchors {
            check_fraction("winch anchor", anchor.y)?;
        }
        Ok(())
    }

    pub fn has_hazard(&self, hazard: Hazard) -> bool {
        self.hazards.contains(&hazard)
    }

    /// Whether the session counts down
    pub fn is_timed(&self) -> bool {
        self.time_limit > 0.0
    }

    /// Row index for a fraction of the level height
    #[inline]
    pub fn row_at(&self, fraction: f32) -> u32 {
        ((fraction * self.height as f32).floor() as u32).min(self.height)
    }
}
