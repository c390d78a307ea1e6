//! Dice notation parsing and rolling for Gloomhall.
//!
//! Supports the compact `NdM` form with an optional signed modifier
//! (`2d6+3`, `1d20-1`). This is the only randomness primitive the game
//! rules use — combat, respites, events and status damage all funnel
//! through here.

use rand::Rng;

mod error;

pub use error::DiceError;

/// A parsed dice expression: roll `count` dice with `sides` faces each,
/// sum them, add `modifier`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Notation {
    /// Number of dice (N in `NdM`). At least 1.
    pub count: u32,
    /// Faces per die (M in `NdM`). At least 1.
    pub sides: u32,
    /// Flat modifier added to the sum (K in `NdM+K`). May be negative.
    pub modifier: i32,
}

impl Notation {
    /// Parses a `NdM` / `NdM+K` / `NdM-K` string.
    ///
    /// # Errors
    /// Returns [`DiceError::InvalidNotation`] when the input does not
    /// match the pattern or when N or M is zero.
    pub fn parse(input: &str) -> Result<Self, DiceError> {
        let s = input.trim();
        let invalid = || DiceError::InvalidNotation(input.to_string());

        let (count_str, rest) = s.split_once(['d', 'D']).ok_or_else(invalid)?;

        // Locate an optional signed modifier after the sides.
        let (sides_str, modifier) = match rest.find(['+', '-']) {
            Some(pos) => {
                let (sides, sign_and_mod) = rest.split_at(pos);
                let modifier: i32 =
                    sign_and_mod.parse().map_err(|_| invalid())?;
                (sides, modifier)
            }
            None => (rest, 0),
        };

        let count: u32 = count_str.parse().map_err(|_| invalid())?;
        let sides: u32 = sides_str.parse().map_err(|_| invalid())?;
        if count == 0 || sides == 0 {
            return Err(invalid());
        }

        Ok(Self {
            count,
            sides,
            modifier,
        })
    }

    /// Rolls the expression: `count` independent uniform draws in
    /// `[1, sides]`, summed, plus the modifier.
    pub fn roll(&self, rng: &mut impl Rng) -> i32 {
        let sum: i64 = (0..self.count)
            .map(|_| rng.random_range(1..=self.sides) as i64)
            .sum();
        (sum + self.modifier as i64) as i32
    }

    /// Minimum possible result (`N*1 + K`).
    pub fn min(&self) -> i32 {
        self.count as i32 + self.modifier
    }

    /// Maximum possible result (`N*M + K`).
    pub fn max(&self) -> i32 {
        (self.count * self.sides) as i32 + self.modifier
    }
}

impl std::fmt::Display for Notation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.modifier {
            0 => write!(f, "{}d{}", self.count, self.sides),
            m if m > 0 => write!(f, "{}d{}+{}", self.count, self.sides, m),
            m => write!(f, "{}d{}{}", self.count, self.sides, m),
        }
    }
}

/// Rolls a notation string, treating empty or malformed input as 0.
///
/// Catalog data is trusted, so an effect with no dice (pure status
/// infliction) or a typo'd notation contributes nothing rather than
/// failing the whole action.
pub fn roll_or_zero(notation: &str, rng: &mut impl Rng) -> i32 {
    if notation.trim().is_empty() {
        return 0;
    }
    match Notation::parse(notation) {
        Ok(n) => n.roll(rng),
        Err(_) => 0,
    }
}

/// Rolls a single d20. The to-hit and event checks use this directly.
pub fn d20(rng: &mut impl Rng) -> i32 {
    rng.random_range(1..=20)
}
