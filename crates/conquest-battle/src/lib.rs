#![deny(warnings)]

//! Battle resolution: attack/defense power and the dice-roll comparison.
//!
//! Both sides add a uniform roll in `[0, 5]` to their power; the attacker
//! conquers only with a strictly higher total, so ties go to the defender.

use conquest_core::TerritoryId;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Power every attacker brings before troop bonuses.
pub const BASE_ATTACK: i64 = 10;

/// Highest value a single roll can produce (lowest is 0).
pub const MAX_ROLL: i64 = 5;

/// Source of battle rolls.
pub trait Dice {
    /// Draw one roll in `0..=MAX_ROLL`.
    fn roll(&mut self) -> i64;
}

impl<D: Dice + ?Sized> Dice for &mut D {
    fn roll(&mut self) -> i64 {
        (**self).roll()
    }
}

/// Uniform dice backed by a ChaCha8 stream.
#[derive(Clone, Debug)]
pub struct SeededDice {
    rng: ChaCha8Rng,
}

impl SeededDice {
    /// Reproducible dice for a given seed.
    pub fn from_seed(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    /// Dice seeded from OS entropy.
    pub fn from_entropy() -> Self {
        Self {
            rng: ChaCha8Rng::from_entropy(),
        }
    }

    /// Seeded when `seed` is set, otherwise from entropy.
    pub fn new(seed: Option<u64>) -> Self {
        seed.map_or_else(Self::from_entropy, Self::from_seed)
    }
}

impl Dice for SeededDice {
    fn roll(&mut self) -> i64 {
        self.rng.gen_range(0..=MAX_ROLL)
    }
}

/// Scripted dice that replay a fixed sequence, cycling when exhausted.
/// Values are clamped into the legal roll range.
#[derive(Clone, Debug, Default)]
pub struct FixedDice {
    rolls: Vec<i64>,
    next: usize,
}

impl FixedDice {
    /// Replay `rolls` in order. An empty script always rolls 0.
    pub fn new(rolls: Vec<i64>) -> Self {
        Self {
            rolls,
            next: 0,
        }
    }
}

impl Dice for FixedDice {
    fn roll(&mut self) -> i64 {
        if self.rolls.is_empty() {
            return 0;
        }
        let r = self.rolls[self.next % self.rolls.len()];
        self.next = self.next.wrapping_add(1);
        r.clamp(0, MAX_ROLL)
    }
}

/// Attacker power: base plus the sum of the attacker's troop bonuses.
pub fn attack_power(troop_bonus_sum: i64) -> i64 {
    BASE_ATTACK.saturating_add(troop_bonus_sum)
}

/// Defender power: the territory's defense rating plus the defending user's
/// troop bonuses. Troops defend with the same bonus they attack with.
pub fn defense_power(defense_rating: i64, troop_bonus_sum: i64) -> i64 {
    defense_rating.saturating_add(troop_bonus_sum)
}

/// Result of one exchange of rolls.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Clash {
    /// Attacker power before the roll.
    pub attack_power: i64,
    /// Defender power before the roll.
    pub defense_power: i64,
    pub attack_roll: i64,
    pub defense_roll: i64,
}

impl Clash {
    /// Attack power plus roll.
    pub fn attack_total(&self) -> i64 {
        self.attack_power.saturating_add(self.attack_roll)
    }

    /// Defense power plus roll.
    pub fn defense_total(&self) -> i64 {
        self.defense_power.saturating_add(self.defense_roll)
    }

    /// Attacker wins only with a strictly higher total.
    pub fn attacker_wins(&self) -> bool {
        self.attack_total() > self.defense_total()
    }
}

/// Roll for both sides (attacker first) and compare.
pub fn resolve<D: Dice + ?Sized>(attack_power: i64, defense_power: i64, dice: &mut D) -> Clash {
    let attack_roll = dice.roll();
    let defense_roll = dice.roll();
    let clash = Clash {
        attack_power,
        defense_power,
        attack_roll,
        defense_roll,
    };
    debug!(
        attack = clash.attack_total(),
        defense = clash.defense_total(),
        "battle rolled"
    );
    clash
}

/// Full account of a battle over a territory.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BattleReport {
    pub attacker: String,
    /// Owner of the territory when the battle started.
    pub defender: String,
    pub territory: TerritoryId,
    pub clash: Clash,
    /// Whether ownership moved to the attacker.
    pub conquered: bool,
}

impl BattleReport {
    /// Build the report; `conquered` follows from the clash.
    pub fn new(attacker: String, defender: String, territory: TerritoryId, clash: Clash) -> Self {
        let conquered = clash.attacker_wins();
        Self {
            attacker,
            defender,
            territory,
            clash,
            conquered,
        }
    }

    /// Human-readable outcome line.
    pub fn message(&self) -> String {
        if self.conquered {
            format!(
                "{} won ({} vs {}) and conquered territory {}!",
                self.attacker,
                self.clash.attack_total(),
                self.clash.defense_total(),
                self.territory
            )
        } else {
            format!(
                "{} held territory {} ({} vs {})!",
                self.defender,
                self.territory,
                self.clash.defense_total(),
                self.clash.attack_total()
            )
        }
    }
}
