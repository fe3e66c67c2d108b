//! Configuration errors
//!
//! Only structural problems with a level or tuning document are errors.
//! Out-of-range simulation queries are clipped silently by the components.

use thiserror::Error;

/// A malformed [`LevelSpec`](crate::LevelSpec), reported at generation time
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LevelError {
    #[error("level dimensions must be positive (got {width}x{height})")]
    InvalidDimensions { width: u32, height: u32 },
    #[error("level {width}x{height} is too small (need at least {min_width}x{min_height})")]
    TooSmall {
        width: u32,
        height: u32,
        min_width: u32,
        min_height: u32,
    },
    #[error("target coverage must be in (0, 100] (got {0})")]
    InvalidTargetCoverage(f32),
    #[error("piste width ratio must be in (0, 1] (got {0})")]
    InvalidPisteWidth(f32),
    #[error("time limit must be finite and non-negative (got {0})")]
    InvalidTimeLimit(f32),
    #[error("{field} must be within [0, 1] (got {value})")]
    FractionOutOfRange { field: &'static str, value: f32 },
    #[error("{field} ends before it starts ({start} > {end})")]
    InvertedRange {
        field: &'static str,
        start: f32,
        end: f32,
    },
    #[error("steep zone slope must be in (0, 90) degrees (got {0})")]
    InvalidSlope(f32),
    #[error("steep zone {0} has no access path or winch anchor to get past it")]
    Impassable(usize),
    #[error("invalid level JSON: {0}")]
    Parse(String),
}

/// A tuning document that could not be applied
#[derive(Debug, Error)]
pub enum TuningError {
    #[error("invalid tuning JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("tuning value {field} is out of range (got {value})")]
    OutOfRange { field: &'static str, value: f32 },
}
