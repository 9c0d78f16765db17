//! Fixed-point math utilities for deterministic simulation.
//!
//! Positions, speeds and gold all use fixed-point arithmetic so the
//! same inputs produce bit-identical state on every platform. Time is
//! carried separately as integer milliseconds.

use fixed::types::I32F32;
use serde::{Deserialize, Serialize};

/// Fixed-point number type for all simulation math.
///
/// Uses 32 bits for integer part and 32 bits for fractional part.
pub type Fixed = I32F32;

/// Milliseconds in one second.
pub const MS_PER_SECOND: u32 = 1000;

/// Serde support for fixed-point numbers.
///
/// Serializes fixed-point numbers as their raw bit representation (i64)
/// to preserve exact precision across serialization boundaries.
pub mod fixed_serde {
    use super::Fixed;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    /// Serialize a fixed-point number as its raw bit representation.
    pub fn serialize<S>(value: &Fixed, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        value.to_bits().serialize(serializer)
    }

    /// Deserialize a fixed-point number from its raw bit representation.
    pub fn deserialize<'de, D>(deserializer: D) -> Result<Fixed, D::Error>
    where
        D: Deserializer<'de>,
    {
        let bits = i64::deserialize(deserializer)?;
        Ok(Fixed::from_bits(bits))
    }
}

/// A point on the battlefield: `x` runs along the lane, `y` is the
/// baseline the unit is drawn on (before any stacking offset).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct LanePoint {
    /// Lane coordinate.
    #[serde(with = "fixed_serde")]
    pub x: Fixed,
    /// Baseline coordinate.
    #[serde(with = "fixed_serde")]
    pub y: Fixed,
}

impl LanePoint {
    /// Create a new lane point.
    #[must_use]
    pub const fn new(x: Fixed, y: Fixed) -> Self {
        Self { x, y }
    }
}

/// Scale a per-second rate by a millisecond delta.
#[must_use]
pub fn per_second(rate: Fixed, delta_ms: u32) -> Fixed {
    rate.saturating_mul(Fixed::saturating_from_num(delta_ms)) / Fixed::from_num(MS_PER_SECOND)
}

/// Multiply by a ratio expressed in hundredths, rounding half up.
///
/// `scale_percent_round(100, 135) == 135`, `scale_percent_round(3, 50) == 2`.
#[must_use]
pub const fn scale_percent_round(value: u32, percent: u32) -> u32 {
    let scaled = value as u64 * percent as u64;
    ((scaled + 50) / 100) as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_per_second_exact_for_binary_fractions() {
        let gained = per_second(Fixed::from_num(5), 50);
        assert_eq!(gained, Fixed::from_num(0.25));

        let mut total = Fixed::ZERO;
        for _ in 0..40 {
            total += per_second(Fixed::from_num(5), 50);
        }
        assert_eq!(total, Fixed::from_num(10));
    }

    #[test]
    fn test_scale_percent_round() {
        assert_eq!(scale_percent_round(100, 135), 135);
        assert_eq!(scale_percent_round(3, 50), 2);
        assert_eq!(scale_percent_round(1, 49), 0);
        assert_eq!(scale_percent_round(0, 135), 0);
    }

    #[test]
    fn test_fixed_determinism() {
        let a = Fixed::from_num(1) / Fixed::from_num(3);
        let b = Fixed::from_num(1) / Fixed::from_num(3);
        assert_eq!(a, b);
        assert_eq!(a * Fixed::from_num(7), b * Fixed::from_num(7));
    }
}
