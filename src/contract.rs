//! Contracts and daily runs
//!
//! A contract is a procedurally generated level identified by a short
//! base-36 seed code and a difficulty rank. Daily runs derive their seed from
//! the calendar date so every player gets the same slopes on the same day.

use serde::{Deserialize, Serialize};

use crate::error::LevelError;
use crate::level::{
    AccessPathSpec, BonusObjective, Hazard, LevelSpec, PisteShape, Side, SteepZoneSpec,
    WinchAnchorSpec, Weather,
};
use crate::sim::geometry::generate_level;
use crate::sim::rng::{RandomSource, SeededRng};
use crate::tuning::SteepnessTuning;

/// Successive seeds tried before giving up on a contract
pub const MAX_CONTRACT_ATTEMPTS: u32 = 64;

fn fnv1a32(bytes: &[u8]) -> u32 {
    const FNV_OFFSET: u32 = 0x811c_9dc5;
    const FNV_PRIME: u32 = 0x0100_0193;
    let mut hash = FNV_OFFSET;
    for b in bytes {
        hash = (hash ^ u32::from(*b)).wrapping_mul(FNV_PRIME);
    }
    hash
}

/// Parse a base-36 seed code. Case-insensitive; other characters are
/// skipped; overflow wraps. None when no digit is present.
#[must_use]
pub fn decode_seed_code(code: &str) -> Option<u32> {
    let mut value: u32 = 0;
    let mut any = false;
    for digit in code.chars().filter_map(|c| c.to_digit(36)) {
        value = value.wrapping_mul(36).wrapping_add(digit);
        any = true;
    }
    any.then_some(value)
}

/// Canonical uppercase base-36 code for a seed
#[must_use]
pub fn encode_seed_code(seed: u32) -> String {
    if seed == 0 {
        return "0".to_string();
    }
    let mut digits = Vec::new();
    let mut n = seed;
    while n > 0 {
        let d = n % 36;
        digits.push(char::from_digit(d, 36).map_or('0', |c| c.to_ascii_uppercase()));
        n /= 36;
    }
    digits.iter().rev().collect()
}

/// Seed shared by everyone playing on a given date
#[must_use]
pub fn daily_seed(year: i32, month: u32, day: u32) -> u32 {
    fnv1a32(format!("{year:04}-{month:02}-{day:02}").as_bytes())
}

/// Contract difficulty
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rank {
    #[default]
    Green,
    Blue,
    Red,
    Black,
}

impl Rank {
    pub const ALL: [Rank; 4] = [Rank::Green, Rank::Blue, Rank::Red, Rank::Black];

    pub fn as_str(&self) -> &'static str {
        match self {
            Rank::Green => "green",
            Rank::Blue => "blue",
            Rank::Red => "red",
            Rank::Black => "black",
        }
    }

    /// Unknown names fall back to green
    pub fn parse(name: &str) -> Rank {
        let name = name.trim();
        Rank::ALL
            .into_iter()
            .find(|r| r.as_str().eq_ignore_ascii_case(name))
            .unwrap_or_default()
    }

    fn index(&self) -> usize {
        *self as usize
    }

    pub fn next(&self) -> Rank {
        Rank::ALL[(self.index() + 1) % Rank::ALL.len()]
    }

    pub fn prev(&self) -> Rank {
        Rank::ALL[(self.index() + Rank::ALL.len() - 1) % Rank::ALL.len()]
    }
}

/// Per-rank generation ranges
struct RankProfile {
    width: (u32, u32),
    height: (u32, u32),
    piste_width: (f32, f32),
    shapes: &'static [PisteShape],
    steep_zones: (u32, u32),
    slope: (f32, f32),
    dangerous_chance: f64,
    avalanche_chance: f64,
    target: (u32, u32),
    /// Chance of a time limit, and its range in seconds
    timed_chance: f64,
    time_limit: (f32, f32),
    storm_chance: f64,
    night_chance: f64,
    bonus_count: (u32, u32),
}

fn profile(rank: Rank) -> RankProfile {
    match rank {
        Rank::Green => RankProfile {
            width: (36, 44),
            height: (60, 80),
            piste_width: (0.55, 0.7),
            shapes: &[PisteShape::Straight, PisteShape::Wide],
            steep_zones: (0, 0),
            slope: (0.0, 0.0),
            dangerous_chance: 0.0,
            avalanche_chance: 0.0,
            target: (70, 80),
            timed_chance: 0.0,
            time_limit: (0.0, 0.0),
            storm_chance: 0.0,
            night_chance: 0.0,
            bonus_count: (1, 1),
        },
        Rank::Blue => RankProfile {
            width: (40, 50),
            height: (70, 90),
            piste_width: (0.45, 0.6),
            shapes: &[PisteShape::GentleCurve, PisteShape::Winding],
            steep_zones: (1, 1),
            slope: (25.0, 35.0),
            dangerous_chance: 0.0,
            avalanche_chance: 0.0,
            target: (75, 85),
            timed_chance: 0.3,
            time_limit: (240.0, 300.0),
            storm_chance: 0.0,
            night_chance: 0.1,
            bonus_count: (1, 2),
        },
        Rank::Red => RankProfile {
            width: (44, 56),
            height: (80, 110),
            piste_width: (0.4, 0.5),
            shapes: &[PisteShape::Serpentine, PisteShape::Winding],
            steep_zones: (1, 2),
            slope: (32.0, 44.0),
            dangerous_chance: 0.5,
            avalanche_chance: 0.3,
            target: (80, 88),
            timed_chance: 0.6,
            time_limit: (200.0, 300.0),
            storm_chance: 0.25,
            night_chance: 0.25,
            bonus_count: (2, 3),
        },
        Rank::Black => RankProfile {
            width: (48, 60),
            height: (90, 120),
            piste_width: (0.35, 0.45),
            shapes: &[PisteShape::Serpentine, PisteShape::Winding],
            steep_zones: (2, 3),
            slope: (38.0, 48.0),
            dangerous_chance: 1.0,
            avalanche_chance: 0.6,
            target: (85, 92),
            timed_chance: 1.0,
            time_limit: (180.0, 260.0),
            storm_chance: 0.4,
            night_chance: 0.4,
            bonus_count: (2, 3),
        },
    }
}

/// Non-overlapping steep bands spread down the run
fn contract_steep_zones(
    rng: &mut impl RandomSource,
    count: u32,
    slope: (f32, f32),
) -> Vec<SteepZoneSpec> {
    if count == 0 {
        return Vec::new();
    }
    let (top, bottom) = (0.15, 0.85);
    let band = (bottom - top) / count as f32;
    (0..count)
        .map(|i| {
            let band_start = top + band * i as f32;
            let len = rng.range(0.08, 0.15).min(band * 0.9);
            let start_y = band_start + rng.range(0.0, band - len);
            SteepZoneSpec {
                start_y,
                end_y: start_y + len,
                slope: rng.range(slope.0, slope.1).round(),
            }
        })
        .collect()
}

fn contract_bonuses(rng: &mut impl RandomSource, rank: Rank, count: u32, time_limit: f32) -> Vec<BonusObjective> {
    let speed = if time_limit > 0.0 { time_limit * 0.7 } else { 240.0 };
    let mut pool = vec![
        BonusObjective::SpeedRun {
            max_seconds: speed.round(),
        },
        BonusObjective::FuelEfficiency {
            max_fuel_used: 60.0,
        },
        BonusObjective::Flawless,
        BonusObjective::QualityGroom {
            min_quality_pct: 70.0,
        },
    ];
    if rank >= Rank::Blue {
        pool.push(BonusObjective::NoTumble);
    }
    if rank >= Rank::Red {
        pool.push(BonusObjective::WinchMastery { max_uses: 3 });
        pool.push(BonusObjective::Exploration);
    }

    let mut chosen = Vec::new();
    for _ in 0..count {
        if pool.is_empty() {
            break;
        }
        let i = rng.int_range(0, pool.len() as u32 - 1) as usize;
        chosen.push(pool.remove(i));
    }
    chosen
}

/// Deterministic procedural level for a seed and rank
#[must_use]
pub fn generate_contract_level(seed: u32, rank: Rank) -> LevelSpec {
    let mut rng = SeededRng::new(u64::from(seed)).fork(rank.index() as u64 + 1);
    let p = profile(rank);

    let width = rng.int_range(p.width.0, p.width.1);
    let height = rng.int_range(p.height.0, p.height.1);
    let piste_shape = rng.pick(p.shapes).copied().unwrap_or_default();
    let piste_width = rng.range(p.piste_width.0, p.piste_width.1);

    let zone_count = rng.int_range(p.steep_zones.0, p.steep_zones.1);
    let steep_zones = contract_steep_zones(&mut rng, zone_count, p.slope);

    // Dangerous slopes usually get a service road, sometimes a winch anchor
    let tumble = SteepnessTuning::default().tumble_threshold;
    let mut access_paths = Vec::new();
    let mut winch_anchors = Vec::new();
    for zone in steep_zones.iter().filter(|z| z.slope >= tumble) {
        if rng.chance(0.8) {
            let side = if rng.chance(0.5) { Side::Left } else { Side::Right };
            access_paths.push(AccessPathSpec {
                side,
                start_y: (zone.start_y - 0.03).max(0.0),
                end_y: (zone.end_y + 0.03).min(1.0),
            });
        }
        if rng.chance(0.5) {
            winch_anchors.push(WinchAnchorSpec {
                y: (zone.start_y - 0.04).max(0.0),
            });
        }
    }

    let has_dangerous_boundaries = rng.chance(p.dangerous_chance);
    let hazards = if rng.chance(p.avalanche_chance) {
        vec![Hazard::Avalanche]
    } else {
        Vec::new()
    };

    let weather = if rng.chance(p.storm_chance) {
        Weather::Storm
    } else if rank >= Rank::Blue && rng.chance(0.3) {
        Weather::LightSnow
    } else {
        Weather::Clear
    };
    let night = rng.chance(p.night_chance);
    let frost = weather == Weather::Storm || night;

    let target_coverage = rng.int_range(p.target.0, p.target.1) as f32;
    let time_limit = if rng.chance(p.timed_chance) {
        rng.range(p.time_limit.0, p.time_limit.1).round()
    } else {
        0.0
    };

    let bonus_count = rng.int_range(p.bonus_count.0, p.bonus_count.1);
    let bonus_objectives = contract_bonuses(&mut rng, rank, bonus_count, time_limit);

    LevelSpec {
        seed: u64::from(seed) | ((rank.index() as u64) << 32),
        width,
        height,
        piste_shape,
        piste_width,
        steep_zones,
        access_paths,
        winch_anchors,
        hazards,
        has_dangerous_boundaries,
        weather,
        night,
        frost,
        tutorial: false,
        target_coverage,
        time_limit,
        bonus_objectives,
    }
}

/// Every tumble-steep zone needs a road through it or an anchor above it
pub fn check_passable(level: &LevelSpec) -> Result<(), LevelError> {
    let tumble = SteepnessTuning::default().tumble_threshold;
    for (index, zone) in level.steep_zones.iter().enumerate() {
        if zone.slope < tumble {
            continue;
        }
        let road = level
            .access_paths
            .iter()
            .any(|a| a.start_y <= zone.start_y && a.end_y >= zone.end_y);
        let anchor = level.winch_anchors.iter().any(|w| w.y <= zone.start_y);
        if !road && !anchor {
            return Err(LevelError::Impassable(index));
        }
    }
    Ok(())
}

/// First playable contract at or after `seed`; returns the level and the
/// seed that produced it
pub fn generate_valid_contract_level(seed: u32, rank: Rank) -> Result<(LevelSpec, u32), LevelError> {
    let mut last_err = LevelError::Impassable(0);
    for attempt in 0..MAX_CONTRACT_ATTEMPTS {
        let candidate = seed.wrapping_add(attempt);
        let level = generate_contract_level(candidate, rank);
        match check_passable(&level).and_then(|_| generate_level(&level).map(|_| ())) {
            Ok(()) => {
                if attempt > 0 {
                    log::debug!("Contract seed {seed} unplayable, using {candidate}");
                }
                return Ok((level, candidate));
            }
            Err(e) => last_err = e,
        }
    }
    log::warn!("No playable {} contract near seed {seed}", rank.as_str());
    Err(last_err)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_seed_code() {
        assert_eq!(decode_seed_code("ABC"), Some(13368));
        assert_eq!(decode_seed_code("abc"), Some(13368));
        assert_eq!(decode_seed_code(" a-b_c "), Some(13368));
        assert_eq!(decode_seed_code("0"), Some(0));
        assert_eq!(decode_seed_code(""), None);
        assert_eq!(decode_seed_code("!!-?"), None);
        // 36^7 - 1 wraps to u32
        assert_eq!(decode_seed_code("ZZZZZZZ"), Some(1_054_752_767));
    }

    #[test]
    fn test_encode_seed_code() {
        assert_eq!(encode_seed_code(13368), "ABC");
        assert_eq!(encode_seed_code(0), "0");
        for seed in [1, 35, 36, 123_456, u32::MAX] {
            assert_eq!(decode_seed_code(&encode_seed_code(seed)), Some(seed));
        }
    }

    #[test]
    fn test_daily_seed() {
        assert_eq!(daily_seed(2026, 1, 15), 2_183_670_930);
        assert_eq!(daily_seed(2026, 1, 15), daily_seed(2026, 1, 15));
        assert_ne!(daily_seed(2026, 1, 15), daily_seed(2026, 1, 16));
    }

    #[test]
    fn test_rank_parse_and_cycle() {
        assert_eq!(Rank::parse("blue"), Rank::Blue);
        assert_eq!(Rank::parse(" BLACK "), Rank::Black);
        assert_eq!(Rank::parse("purple"), Rank::Green);
        assert_eq!(Rank::parse(""), Rank::Green);
        assert_eq!(Rank::Green.next(), Rank::Blue);
        assert_eq!(Rank::Blue.prev(), Rank::Green);
        assert_eq!(Rank::Black.next(), Rank::Green);
        assert_eq!(Rank::Green.prev(), Rank::Black);
    }

    #[test]
    fn test_contract_is_deterministic() {
        for rank in Rank::ALL {
            assert_eq!(generate_contract_level(77, rank), generate_contract_level(77, rank));
        }
        assert_ne!(
            generate_contract_level(77, Rank::Red),
            generate_contract_level(78, Rank::Red)
        );
    }

    #[test]
    fn test_contracts_validate() {
        for rank in Rank::ALL {
            for seed in 0..50 {
                let level = generate_contract_level(seed, rank);
                level.validate().unwrap();
                assert!(!level.tutorial);
                assert!(!level.bonus_objectives.is_empty());
            }
        }
    }

    #[test]
    fn test_rank_shapes_and_difficulty() {
        for seed in 0..30 {
            let green = generate_contract_level(seed, Rank::Green);
            assert!(matches!(green.piste_shape, PisteShape::Straight | PisteShape::Wide));
            assert!(green.steep_zones.is_empty());
            assert!(!green.has_dangerous_boundaries);

            let black = generate_contract_level(seed, Rank::Black);
            assert!(matches!(
                black.piste_shape,
                PisteShape::Serpentine | PisteShape::Winding
            ));
            assert!(black.has_dangerous_boundaries);
            assert!(black.is_timed());
            assert!(black.steep_zones.len() >= 2);
        }
    }

    #[test]
    fn test_steep_zones_do_not_overlap() {
        for seed in 0..50 {
            let level = generate_contract_level(seed, Rank::Black);
            for pair in level.steep_zones.windows(2) {
                assert!(pair[0].end_y <= pair[1].start_y);
            }
        }
    }

    #[test]
    fn test_valid_contract_is_passable() {
        for rank in Rank::ALL {
            for seed in 0..20 {
                let (level, used) = generate_valid_contract_level(seed, rank).unwrap();
                assert!(used >= seed);
                check_passable(&level).unwrap();
                assert_eq!(level, generate_contract_level(used, rank));
            }
        }
    }

    #[test]
    fn test_check_passable() {
        let mut level = LevelSpec {
            steep_zones: vec![SteepZoneSpec {
                start_y: 0.4,
                end_y: 0.5,
                slope: 45.0,
            }],
            ..Default::default()
        };
        assert_eq!(check_passable(&level), Err(LevelError::Impassable(0)));
        level.winch_anchors.push(WinchAnchorSpec { y: 0.35 });
        assert_eq!(check_passable(&level), Ok(()));
    }
}
