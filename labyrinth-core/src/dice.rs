//! Dice rolling for the labyrinth engine.
//!
//! Every check in the game is built on `NdM` rolls; attribute checks use
//! 5d4 rather than a d20. The session RNG is seedable so whole runs can be
//! replayed, and rolls/picks can be queued ahead of time for deterministic
//! tests.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Error type for die-spec parsing.
#[derive(Debug, Error)]
pub enum DiceError {
    #[error("invalid die notation: {0}")]
    InvalidNotation(String),
    #[error("die has no faces: {0}")]
    ZeroSides(String),
}

/// A die specification such as `2d6` or `5d4`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DieSpec {
    pub count: u32,
    pub sides: u32,
}

impl DieSpec {
    pub const fn new(count: u32, sides: u32) -> Self {
        Self { count, sides }
    }

    /// Parse `NdM` notation. `N` may be omitted (`d6` == `1d6`).
    pub fn parse(notation: &str) -> Result<Self, DiceError> {
        let s = notation.trim().to_lowercase();
        let (count_str, sides_str) = s
            .split_once('d')
            .ok_or_else(|| DiceError::InvalidNotation(notation.to_string()))?;
        let count: u32 = if count_str.is_empty() {
            1
        } else {
            count_str
                .parse()
                .map_err(|_| DiceError::InvalidNotation(notation.to_string()))?
        };
        let sides: u32 = sides_str
            .parse()
            .map_err(|_| DiceError::InvalidNotation(notation.to_string()))?;
        if sides == 0 {
            return Err(DiceError::ZeroSides(notation.to_string()));
        }
        Ok(Self { count, sides })
    }

    /// Smallest possible total.
    pub fn min(&self) -> i32 {
        self.count as i32
    }

    /// Largest possible total.
    pub fn max(&self) -> i32 {
        (self.count * self.sides) as i32
    }
}

impl FromStr for DieSpec {
    type Err = DiceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DieSpec::parse(s)
    }
}

impl fmt::Display for DieSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}d{}", self.count, self.sides)
    }
}

/// The die behind every attribute check, attack roll, and save.
pub const CHECK_DIE: DieSpec = DieSpec::new(5, 4);

/// Result of a check roll, keeping the raw die total so callers can branch
/// on the natural minimum (fumble) and maximum (critical).
#[derive(Debug, Clone, Copy)]
pub struct CheckRoll {
    pub raw: i32,
    pub fumble: bool,
    pub critical: bool,
}

/// Per-session random source.
///
/// Wraps a ChaCha stream seeded per session. Tests can queue whole-roll
/// totals and pick indices; queued values are consumed before the stream so
/// scripted scenarios stay deterministic without fighting the seed.
#[derive(Debug, Clone)]
pub struct Dice {
    rng: ChaCha8Rng,
    seed: u64,
    queued_rolls: VecDeque<i32>,
    queued_indices: VecDeque<usize>,
}

// Only the seed survives serialization; a restored session draws a fresh
// stream from it (queued values are a test-only concern).
impl Serialize for Dice {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.seed.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Dice {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(Dice::seeded(u64::deserialize(deserializer)?))
    }
}

impl Dice {
    /// Deterministic source from a fixed seed.
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
            seed,
            queued_rolls: VecDeque::new(),
            queued_indices: VecDeque::new(),
        }
    }

    /// Fresh source for a new session.
    pub fn from_entropy() -> Self {
        Self::seeded(rand::random())
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Queue whole-roll totals returned by subsequent [`Dice::roll`] calls.
    pub fn queue_rolls<I: IntoIterator<Item = i32>>(&mut self, totals: I) {
        self.queued_rolls.extend(totals);
    }

    /// Queue indices returned by subsequent [`Dice::index`] calls.
    pub fn queue_indices<I: IntoIterator<Item = usize>>(&mut self, indices: I) {
        self.queued_indices.extend(indices);
    }

    /// Roll a die spec and return the total.
    pub fn roll(&mut self, spec: DieSpec) -> i32 {
        if let Some(total) = self.queued_rolls.pop_front() {
            return total.clamp(spec.min(), spec.max());
        }
        (0..spec.count)
            .map(|_| self.rng.gen_range(1..=spec.sides) as i32)
            .sum()
    }

    /// Roll a die given in `NdM` notation. A malformed string from a data
    /// table is substituted with `1d4` so a bad row never stops play.
    pub fn roll_str(&mut self, notation: &str) -> i32 {
        match DieSpec::parse(notation) {
            Ok(spec) => self.roll(spec),
            Err(err) => {
                tracing::warn!(notation, %err, "malformed die notation, substituting 1d4");
                self.roll(DieSpec::new(1, 4))
            }
        }
    }

    /// Roll the 5d4 check die, flagging natural minimum and maximum.
    pub fn check(&mut self) -> CheckRoll {
        let raw = self.roll(CHECK_DIE);
        CheckRoll {
            raw,
            fumble: raw == CHECK_DIE.min(),
            critical: raw == CHECK_DIE.max(),
        }
    }

    /// Uniform index in `0..n`. Returns 0 when `n` is 0.
    pub fn index(&mut self, n: usize) -> usize {
        if n == 0 {
            return 0;
        }
        if let Some(i) = self.queued_indices.pop_front() {
            return i.min(n - 1);
        }
        self.rng.gen_range(0..n)
    }

    /// Uniform integer in `lo..=hi`.
    pub fn range_inclusive(&mut self, lo: i32, hi: i32) -> i32 {
        if lo >= hi {
            return lo;
        }
        lo + self.index((hi - lo + 1) as usize) as i32
    }

    /// Bernoulli draw with probability `p`.
    pub fn chance(&mut self, p: f64) -> bool {
        self.rng.gen::<f64>() < p
    }

    /// Uniform float in `lo..hi`.
    pub fn uniform(&mut self, lo: f64, hi: f64) -> f64 {
        lo + self.rng.gen::<f64>() * (hi - lo)
    }

    /// Pick one element of a slice, uniformly.
    pub fn choose<'a, T>(&mut self, items: &'a [T]) -> Option<&'a T> {
        if items.is_empty() {
            None
        } else {
            let i = self.index(items.len());
            Some(&items[i])
        }
    }

    /// Weighted pick: `weight` maps each element to a non-negative weight.
    /// Zero-weight elements are never chosen; returns `None` when every
    /// weight is zero.
    pub fn choose_weighted<'a, T, F>(&mut self, items: &'a [T], weight: F) -> Option<&'a T>
    where
        F: Fn(&T) -> f64,
    {
        let total: f64 = items.iter().map(|it| weight(it).max(0.0)).sum();
        if total <= 0.0 {
            return None;
        }
        let mut target = self.uniform(0.0, total);
        for item in items {
            let w = weight(item).max(0.0);
            if w > 0.0 && target < w {
                return Some(item);
            }
            target -= w;
        }
        items.last()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_simple() {
        let spec = DieSpec::parse("2d6").unwrap();
        assert_eq!(spec.count, 2);
        assert_eq!(spec.sides, 6);
    }

    #[test]
    fn parse_implicit_count() {
        assert_eq!(DieSpec::parse("d8").unwrap(), DieSpec::new(1, 8));
    }

    #[test]
    fn parse_rejects_garbage() {
        assert!(DieSpec::parse("banana").is_err());
        assert!(DieSpec::parse("2x6").is_err());
        assert!(DieSpec::parse("3d0").is_err());
    }

    #[test]
    fn roll_stays_in_range() {
        let mut dice = Dice::seeded(7);
        for _ in 0..200 {
            let total = dice.roll(CHECK_DIE);
            assert!((5..=20).contains(&total));
        }
    }

    #[test]
    fn malformed_notation_falls_back_to_1d4() {
        let mut dice = Dice::seeded(1);
        for _ in 0..50 {
            let total = dice.roll_str("not-a-die");
            assert!((1..=4).contains(&total));
        }
    }

    #[test]
    fn seeded_streams_repeat() {
        let mut a = Dice::seeded(42);
        let mut b = Dice::seeded(42);
        for _ in 0..32 {
            assert_eq!(a.roll(DieSpec::new(3, 6)), b.roll(DieSpec::new(3, 6)));
            assert_eq!(a.index(10), b.index(10));
        }
    }

    #[test]
    fn queued_rolls_take_priority_and_clamp() {
        let mut dice = Dice::seeded(0);
        dice.queue_rolls([12, 99, 1]);
        assert_eq!(dice.roll(CHECK_DIE), 12);
        assert_eq!(dice.roll(CHECK_DIE), 20); // clamped to the die maximum
        assert_eq!(dice.roll(CHECK_DIE), 5); // clamped to the die minimum
    }

    #[test]
    fn check_flags_extremes() {
        let mut dice = Dice::seeded(0);
        dice.queue_rolls([5, 20, 13]);
        assert!(dice.check().fumble);
        assert!(dice.check().critical);
        let mid = dice.check();
        assert!(!mid.fumble && !mid.critical);
    }

    #[test]
    fn weighted_choice_skips_zero_weights() {
        let mut dice = Dice::seeded(3);
        let items = [("never", 0.0), ("always", 1.0)];
        for _ in 0..50 {
            let picked = dice.choose_weighted(&items, |it| it.1).unwrap();
            assert_eq!(picked.0, "always");
        }
        let empty = [("a", 0.0), ("b", 0.0)];
        assert!(dice.choose_weighted(&empty, |it| it.1).is_none());
    }
}
