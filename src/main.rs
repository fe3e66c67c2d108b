//! Snow Groomer headless runner
//!
//! Generates a contract level and lets the autopilot groom it, the way the
//! idle/demo mode drives the game without a player. Prints the final
//! telemetry as JSON.
//!
//! Usage: `snowgroomer [SEED_CODE] [green|blue|red|black] [--daily YYYY-MM-DD | --today]`

use chrono::{Datelike, NaiveDate};
use clap::{Parser, ValueEnum};
use glam::Vec2;

use snowgroomer::consts::*;
use snowgroomer::contract::{
    Rank, daily_seed, decode_seed_code, encode_seed_code, generate_valid_contract_level,
};
use snowgroomer::sim::{
    FixedClock, GameEvent, GameState, SessionPhase, SimulationClock, TickInput, VehiclePose,
};
use snowgroomer::tuning::Tuning;

/// Autopilot cruising speed (px/s)
const DRIVE_SPEED: f32 = 120.0;
/// Give up after this many frames (ten simulated minutes)
const MAX_FRAMES: u32 = 60 * 60 * 10;
/// Seed used when no code is given
const DEFAULT_SEED_CODE: &str = "SNOW";

/// Sweeps the piste row band by row band, alternating direction
struct Autopilot {
    waypoints: Vec<Vec2>,
    next: usize,
}

impl Autopilot {
    fn new(state: &GameState) -> Self {
        let geo = &state.geometry;
        let ts = geo.tile_size;
        let step = (2 * GROOM_RADIUS + 1) as usize;
        let first = (TOP_BUFFER_ROWS + GROOM_RADIUS) as usize;
        let last = geo.height.saturating_sub(BOTTOM_BUFFER_ROWS) as usize;

        let mut waypoints = Vec::new();
        for (pass, r) in (first..last).step_by(step).enumerate() {
            let Some(row) = geo.piste.row(r) else {
                continue;
            };
            let y = (r as f32 + 0.5) * ts;
            let left = Vec2::new((row.left() + 0.5) * ts, y);
            let right = Vec2::new((row.right() - 0.5) * ts, y);
            if pass % 2 == 0 {
                waypoints.extend([left, right]);
            } else {
                waypoints.extend([right, left]);
            }
        }
        Self { waypoints, next: 0 }
    }

    fn is_done(&self) -> bool {
        self.next >= self.waypoints.len()
    }

    /// Unit direction toward the next waypoint
    fn steer(&mut self, position: Vec2) -> Vec2 {
        while let Some(target) = self.waypoints.get(self.next) {
            let to = *target - position;
            if to.length() > 4.0 {
                return to.normalize_or_zero();
            }
            self.next += 1;
        }
        Vec2::ZERO
    }
}

/// Piste difficulty on the command line
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
enum RankArg {
    #[default]
    Green,
    Blue,
    Red,
    Black,
}

impl From<RankArg> for Rank {
    fn from(arg: RankArg) -> Self {
        match arg {
            RankArg::Green => Rank::Green,
            RankArg::Blue => Rank::Blue,
            RankArg::Red => Rank::Red,
            RankArg::Black => Rank::Black,
        }
    }
}

#[derive(Debug, Parser)]
#[command(name = "snowgroomer", version)]
#[command(about = "Generate a contract level and let the autopilot groom it")]
struct Args {
    /// Base-36 seed code (letters and digits, case-insensitive)
    seed: Option<String>,

    /// Piste rank
    #[arg(value_enum, default_value_t = RankArg::Green)]
    rank: RankArg,

    /// Daily run for a date (YYYY-MM-DD); overrides the seed code
    #[arg(long, conflicts_with_all = ["seed", "today"])]
    daily: Option<NaiveDate>,

    /// Daily run for today's local date
    #[arg(long)]
    today: bool,
}

impl Args {
    fn resolve_seed(&self) -> u32 {
        let date = if self.today {
            Some(chrono::Local::now().date_naive())
        } else {
            self.daily
        };
        if let Some(date) = date {
            log::info!("Daily run for {date}");
            return daily_seed(date.year(), date.month(), date.day());
        }

        let code = self.seed.as_deref().unwrap_or(DEFAULT_SEED_CODE);
        decode_seed_code(code).unwrap_or_else(|| {
            log::warn!("Seed code {code:?} has no base-36 digits, using {DEFAULT_SEED_CODE}");
            decode_seed_code(DEFAULT_SEED_CODE).unwrap_or_default()
        })
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    #[cfg(not(target_arch = "wasm32"))]
    env_logger::init();

    let args = Args::parse();
    let seed = args.resolve_seed();
    let rank = Rank::from(args.rank);

    let (level, used_seed) = generate_valid_contract_level(seed, rank)?;
    log::info!(
        "Contract {} ({}): {}x{} {} piste, target {}%",
        encode_seed_code(used_seed),
        rank.as_str(),
        level.width,
        level.height,
        level.piste_shape.as_str(),
        level.target_coverage
    );

    let mut state = GameState::new(level, Tuning::default())?;
    let mut autopilot = Autopilot::new(&state);
    let mut clock = FixedClock { frame_dt: SIM_DT };
    let mut sim = SimulationClock::new();

    let mut pose = VehiclePose::at(state.spawn_point());
    let mut velocity = Vec2::ZERO;

    for _ in 0..MAX_FRAMES {
        if state.session.phase() == SessionPhase::Terminal {
            break;
        }
        if autopilot.is_done() && !state.is_game_over() {
            log::info!("Autopilot finished its sweep");
            break;
        }

        let direction = autopilot.steer(pose.position);
        pose.velocity = velocity;
        if direction != Vec2::ZERO {
            pose.rotation = direction.y.atan2(direction.x);
        }
        let input = TickInput {
            pose,
            grooming: true,
            ..Default::default()
        };

        let frame = sim.step(&mut clock, &mut state, &input);
        for event in &frame.events {
            match event {
                GameEvent::Groomed { .. } => {}
                GameEvent::Victory { bonuses } => {
                    let achieved = bonuses.iter().filter(|b| b.achieved).count();
                    log::info!("Victory ({achieved}/{} bonuses)", bonuses.len());
                }
                GameEvent::Failed(reason) => log::info!("Failed: {}", reason.as_str()),
                other => log::debug!("{other:?}"),
            }
        }

        let advice = frame.advice;
        velocity = advice.override_velocity.unwrap_or(
            direction * DRIVE_SPEED * advice.speed_multiplier + advice.added,
        );
        pose.position += velocity * SIM_DT * frame.substeps as f32;
        pose.rotation += advice.spin * SIM_DT * frame.substeps as f32;
    }

    println!("{}", serde_json::to_string_pretty(&state.telemetry())?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_seed_and_rank() {
        let args = Args::try_parse_from(["snowgroomer", "abc", "red"]).unwrap();
        assert_eq!(args.resolve_seed(), decode_seed_code("ABC").unwrap());
        assert_eq!(Rank::from(args.rank), Rank::Red);

        let args = Args::try_parse_from(["snowgroomer"]).unwrap();
        assert_eq!(args.resolve_seed(), decode_seed_code(DEFAULT_SEED_CODE).unwrap());
        assert_eq!(Rank::from(args.rank), Rank::Green);
    }

    #[test]
    fn test_args_daily_date() {
        let args = Args::try_parse_from(["snowgroomer", "--daily", "2026-01-15"]).unwrap();
        assert_eq!(args.resolve_seed(), daily_seed(2026, 1, 15));
        assert!(Args::try_parse_from(["snowgroomer", "--daily", "2026-13-01"]).is_err());
        assert!(Args::try_parse_from(["snowgroomer", "SNOW", "--daily", "2026-01-15"]).is_err());
    }

    #[test]
    fn test_args_rejects_unknown_rank() {
        assert!(Args::try_parse_from(["snowgroomer", "SNOW", "purple"]).is_err());
    }

    #[test]
    fn test_code_without_digits_falls_back() {
        let args = Args::try_parse_from(["snowgroomer", "!!"]).unwrap();
        assert_eq!(args.resolve_seed(), decode_seed_code(DEFAULT_SEED_CODE).unwrap());
    }
}
