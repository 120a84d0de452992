//! Stat generation - skill profiles, traits, odds, and lap modifiers
//!
//! A profile is a pure function of the random source. It is drawn once when
//! an entrant is created and redrawn on every race reset; identity (lane,
//! name, color) lives on the entrant and persists across resets.

use crate::engine::rng::RandomSource;
use serde::{Deserialize, Serialize};

/// Total skill budget distributed across speed, stamina, and acceleration.
const SKILL_BUDGET: f64 = 3.75;
/// Allowed variance of the budget, so some entrants are overall stronger.
const SKILL_VARIANCE: f64 = 0.3;

/// Qualitative labels derived from a profile's strongest stats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SkillTrait {
    Fast,
    Endurance,
    QuickStarter,
    Balanced,
}

impl SkillTrait {
    /// Display label for roster panels.
    pub fn label(self) -> &'static str {
        match self {
            SkillTrait::Fast => "Fast",
            SkillTrait::Endurance => "Endurance",
            SkillTrait::QuickStarter => "Quick Starter",
            SkillTrait::Balanced => "Balanced",
        }
    }
}

/// Per-lap performance perturbation, fixed for the race once generated.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct LapModifier {
    pub speed_boost: f64,
    pub stamina_boost: f64,
}

/// An entrant's skill profile and betting odds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    pub base_speed: f64,
    pub stamina: f64,
    pub acceleration: f64,
    pub luck_factor: f64,
    pub traits: Vec<SkillTrait>,
    /// Odds against, clamped to [2, 15] (displayed as "N-1").
    pub odds: u32,
    /// One entry per lap of the race.
    pub lap_modifiers: Vec<LapModifier>,
}

impl Profile {
    /// Modifier for a 1-indexed lap. Out-of-table laps get a neutral modifier.
    pub fn lap_modifier(&self, lap: u32) -> LapModifier {
        self.lap_modifiers
            .get(lap.saturating_sub(1) as usize)
            .copied()
            .unwrap_or_default()
    }
}

/// Generate a fresh profile for a race of `total_laps` laps.
pub fn generate_profile(rng: &mut dyn RandomSource, total_laps: u32) -> Profile {
    let budget = SKILL_BUDGET + rng.range(-SKILL_VARIANCE, SKILL_VARIANCE);

    // Independent weights, normalized so they sum to 1. Speed draws from a
    // tighter band than the other two.
    let speed_weight = rng.range(0.7, 1.3);
    let stamina_weight = rng.range(0.6, 1.4);
    let accel_weight = rng.range(0.6, 1.4);
    let total_weight = speed_weight + stamina_weight + accel_weight;

    let base_speed = speed_weight / total_weight * budget * 2.5 + 1.0;
    let stamina = stamina_weight / total_weight * budget * 0.8 + 0.4;
    let acceleration = accel_weight / total_weight * budget * 0.4 + 0.2;

    let mut traits = Vec::new();
    if base_speed > 2.8 {
        traits.push(SkillTrait::Fast);
    }
    if stamina > 1.0 {
        traits.push(SkillTrait::Endurance);
    }
    if acceleration > 0.5 {
        traits.push(SkillTrait::QuickStarter);
    }
    if traits.is_empty() {
        traits.push(SkillTrait::Balanced);
    }

    let luck_factor = rng.range(0.05, 0.25);
    let odds = roll_odds(rng, &traits);

    let lap_modifiers = (0..total_laps)
        .map(|_| LapModifier {
            speed_boost: rng.range(-0.1, 0.1),
            stamina_boost: rng.range(-0.08, 0.08),
        })
        .collect();

    Profile {
        base_speed,
        stamina,
        acceleration,
        luck_factor,
        traits,
        odds,
        lap_modifiers,
    }
}

/// Odds from the primary trait, with jitter, clamped to [2, 15].
fn roll_odds(rng: &mut dyn RandomSource, traits: &[SkillTrait]) -> u32 {
    let base = if traits.contains(&SkillTrait::Fast) {
        rng.range_int(3, 5)
    } else if traits.contains(&SkillTrait::Endurance) {
        rng.range_int(4, 6)
    } else if traits.contains(&SkillTrait::QuickStarter) {
        rng.range_int(5, 8)
    } else {
        rng.range_int(6, 10)
    };

    (base + rng.range_int(-3, 3)).clamp(2, 15) as u32
}
