//! Numeric-or-dice expressions: `3`, `D3`, `D6+1`, `2D6+3`, `2d6 - 1`.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::combat::rng::DiceSource;
use crate::error::DiceError;

/// `count` dice of `sides` faces plus `modifier`. A constant has `count == 0`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(into = "String")]
pub struct DiceExpr {
    pub count: u32,
    pub sides: u32,
    pub modifier: i32,
}

impl DiceExpr {
    pub const fn constant(value: i32) -> Self {
        Self {
            count: 0,
            sides: 0,
            modifier: value,
        }
    }

    pub const fn dice(count: u32, sides: u32, modifier: i32) -> Self {
        Self {
            count,
            sides,
            modifier,
        }
    }

    pub fn parse(input: &str) -> Result<Self, DiceError> {
        let compact: String = input
            .chars()
            .filter(|ch| !ch.is_whitespace())
            .flat_map(char::to_uppercase)
            .collect();
        if compact.is_empty() {
            return Err(DiceError::Empty);
        }
        if compact.matches('D').count() > 1 {
            return Err(DiceError::Unsupported(input.trim().to_string()));
        }

        let Some((count_part, rest)) = compact.split_once('D') else {
            return parse_signed(&compact)
                .map(Self::constant)
                .ok_or_else(|| DiceError::Malformed(input.trim().to_string()));
        };

        let count = if count_part.is_empty() {
            1
        } else {
            count_part
                .parse::<u32>()
                .map_err(|_| DiceError::Malformed(input.trim().to_string()))?
        };

        let (sides_part, modifier) = match rest.find(['+', '-']) {
            Some(idx) => {
                let modifier = parse_signed(&rest[idx..])
                    .ok_or_else(|| DiceError::Malformed(input.trim().to_string()))?;
                (&rest[..idx], modifier)
            }
            None => (rest, 0),
        };
        let sides = sides_part
            .parse::<u32>()
            .map_err(|_| DiceError::Malformed(input.trim().to_string()))?;
        if sides == 0 || count == 0 {
            return Err(DiceError::Malformed(input.trim().to_string()));
        }

        Ok(Self::dice(count, sides, modifier))
    }

    pub fn is_constant(&self) -> bool {
        self.count == 0
    }

    /// Resolve one instance. Never negative.
    pub fn roll(&self, dice: &mut impl DiceSource) -> u32 {
        let mut total = i64::from(self.modifier);
        for _ in 0..self.count {
            total += i64::from(dice.roll(self.sides));
        }
        total.clamp(0, i64::from(u32::MAX)) as u32
    }

    /// Mean of the unclamped expression.
    pub fn expected(&self) -> f64 {
        f64::from(self.count) * (f64::from(self.sides) + 1.0) / 2.0 + f64::from(self.modifier)
    }
}

fn parse_signed(raw: &str) -> Option<i32> {
    let digits = raw.strip_prefix('+').unwrap_or(raw);
    if digits.is_empty() || digits == "-" {
        return None;
    }
    digits.parse::<i32>().ok()
}

impl FromStr for DiceExpr {
    type Err = DiceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for DiceExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_constant() {
            return write!(f, "{}", self.modifier);
        }
        if self.count != 1 {
            write!(f, "{}", self.count)?;
        }
        write!(f, "D{}", self.sides)?;
        match self.modifier {
            0 => Ok(()),
            m if m > 0 => write!(f, "+{m}"),
            m => write!(f, "{m}"),
        }
    }
}

impl From<DiceExpr> for String {
    fn from(value: DiceExpr) -> Self {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combat::rng::{Rng, ScriptedDice};

    #[test]
    fn parses_constants_and_dice_forms() {
        assert_eq!(DiceExpr::parse("1"), Ok(DiceExpr::constant(1)));
        assert_eq!(DiceExpr::parse(" 12 "), Ok(DiceExpr::constant(12)));
        assert_eq!(DiceExpr::parse("D6"), Ok(DiceExpr::dice(1, 6, 0)));
        assert_eq!(DiceExpr::parse("d3"), Ok(DiceExpr::dice(1, 3, 0)));
        assert_eq!(DiceExpr::parse("2D6+3"), Ok(DiceExpr::dice(2, 6, 3)));
        assert_eq!(DiceExpr::parse("D6 - 1"), Ok(DiceExpr::dice(1, 6, -1)));
        assert_eq!(DiceExpr::parse("D3+1"), Ok(DiceExpr::dice(1, 3, 1)));
    }

    #[test]
    fn rejects_malformed_input_instead_of_defaulting_to_zero() {
        assert_eq!(DiceExpr::parse(""), Err(DiceError::Empty));
        assert_eq!(DiceExpr::parse("   "), Err(DiceError::Empty));
        assert!(matches!(DiceExpr::parse("D"), Err(DiceError::Malformed(_))));
        assert!(matches!(DiceExpr::parse("xD6"), Err(DiceError::Malformed(_))));
        assert!(matches!(DiceExpr::parse("D6+"), Err(DiceError::Malformed(_))));
        assert!(matches!(DiceExpr::parse("0D6"), Err(DiceError::Malformed(_))));
        assert!(matches!(DiceExpr::parse("two"), Err(DiceError::Malformed(_))));
    }

    #[test]
    fn compound_expressions_are_reported_as_unsupported() {
        assert_eq!(
            DiceExpr::parse("D6+D3"),
            Err(DiceError::Unsupported("D6+D3".to_string()))
        );
    }

    #[test]
    fn roll_sums_faces_and_modifier() {
        let mut dice = ScriptedDice::new(vec![2, 5]);
        assert_eq!(DiceExpr::dice(2, 6, 3).roll(&mut dice), 10);
    }

    #[test]
    fn roll_clamps_negative_totals_to_zero() {
        let mut dice = ScriptedDice::new(vec![1]);
        assert_eq!(DiceExpr::dice(1, 6, -3).roll(&mut dice), 0);
        assert_eq!(DiceExpr::constant(-2).roll(&mut dice), 0);
    }

    #[test]
    fn constant_consumes_no_dice() {
        let mut dice = ScriptedDice::new(vec![6]);
        assert_eq!(DiceExpr::constant(4).roll(&mut dice), 4);
        assert_eq!(dice.consumed(), 0);
    }

    #[test]
    fn rolled_mean_tracks_expected_value() {
        let expr = DiceExpr::dice(2, 6, 3);
        let mut rng = Rng::new(11);
        let n = 20_000;
        let total: u64 = (0..n).map(|_| u64::from(expr.roll(&mut rng))).sum();
        let mean = total as f64 / f64::from(n);
        assert!((mean - expr.expected()).abs() < 0.1, "mean {mean}");
    }

    #[test]
    fn display_round_trips_through_parse() {
        for raw in ["3", "D3", "2D6+3", "D6-1"] {
            let expr = DiceExpr::parse(raw).unwrap();
            assert_eq!(expr.to_string(), raw);
        }
    }
}
