//! Deterministic simulation module
//!
//! All gameplay logic lives here. This module must be pure and deterministic:
//! - Fixed timestep only
//! - Seeded RNG only
//! - Stable iteration order (Vec, BTreeMap, BTreeSet)
//! - No rendering or platform dependencies

pub mod clock;
pub mod geometry;
pub mod grid;
pub mod hazard;
pub mod rect;
pub mod rng;
pub mod session;
pub mod stability;
pub mod state;
pub mod tick;
pub mod timers;
pub mod vehicle;
pub mod winch;

pub use clock::{Clock, FixedClock, FrameOutput, SimulationClock};
pub use geometry::{
    AccessPathCurve, AccessPathRect, CliffSegment, LevelGeometry, PistePath, PisteRow, SteepZone,
    WinchAnchor, generate_level,
};
pub use grid::{CoverageCounters, SnowCell, TerrainGrid};
pub use hazard::{AvalancheEvent, AvalancheLevel, HazardEngine, HazardZone, OneShot, SteepOutcome, SteepState};
pub use rect::TileRect;
pub use rng::{RandomSource, SeededRng};
pub use session::{
    BonusContext, BonusCounters, BonusResult, Buff, FailReason, Outcome, SessionFlags, SessionPhase,
    SessionState, TutorialStep,
};
pub use stability::{Stability, StabilityModel};
pub use state::{GameEvent, GameState, Telemetry};
pub use tick::{TickInput, TickOutput, tick};
pub use timers::{ScheduledEvent, TimerQueue};
pub use vehicle::{FootprintSamples, VehiclePose, VelocityAdvice};
pub use winch::{WinchController, WinchEvent, WinchOutput};
