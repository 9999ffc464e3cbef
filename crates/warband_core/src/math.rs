//! Fixed-point math utilities for the combat model.
//!
//! Strengths, health fractions and odds are computed in fixed point so the
//! closed-form combat model yields bit-identical figures on every platform.
//! Only the uniform draws in the battle simulator are random.

use fixed::types::I32F32;
use rand::Rng;

/// Fixed-point number type for all combat math.
///
/// Uses 32 bits for integer part and 32 bits for fractional part.
pub type Fixed = I32F32;

/// Number of fractional bits in [`Fixed`].
const FRAC_BITS: u32 = 32;

/// Build a fixed-point fraction from a whole percentage at compile time.
///
/// `const_percent(75)` is exactly `0.75`.
#[must_use]
pub const fn const_percent(percent: i64) -> Fixed {
    Fixed::from_bits((percent << FRAC_BITS) / 100)
}

/// Convert a whole percentage into a fraction (`25` -> `0.25`).
#[must_use]
pub fn percent(value: i32) -> Fixed {
    Fixed::from_num(value) / Fixed::from_num(100)
}

/// Draw a uniform fixed-point number in `[0, 1)`.
///
/// The draw fills exactly the fractional bits, so every representable
/// value in the interval is equally likely.
pub fn unit_draw<R: Rng + ?Sized>(rng: &mut R) -> Fixed {
    Fixed::from_bits(i64::from(rng.gen::<u32>()))
}

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

/// Serde support for presenting fixed-point numbers as decimals.
///
/// Used for human-facing reports (JSON output) where readability matters
/// more than bit-exact round trips.
pub mod fixed_decimal {
    use super::Fixed;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    /// Serialize as an `f64`.
    pub fn serialize<S>(value: &Fixed, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        value.to_num::<f64>().serialize(serializer)
    }

    /// Deserialize from an `f64`.
    pub fn deserialize<'de, D>(deserializer: D) -> Result<Fixed, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = f64::deserialize(deserializer)?;
        Ok(Fixed::saturating_from_num(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_const_percent_is_exact() {
        assert_eq!(const_percent(75), Fixed::from_num(0.75));
        assert_eq!(const_percent(25), Fixed::from_num(0.25));
        assert_eq!(const_percent(50), Fixed::from_num(0.5));
        assert_eq!(const_percent(100), Fixed::ONE);
    }

    #[test]
    fn test_percent() {
        assert_eq!(percent(50), Fixed::from_num(0.5));
        assert_eq!(percent(-25), Fixed::from_num(-0.25));
    }

    #[test]
    fn test_unit_draw_range() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        for _ in 0..1000 {
            let x = unit_draw(&mut rng);
            assert!(x >= Fixed::ZERO && x < Fixed::ONE);
        }
    }

    #[test]
    fn test_fixed_determinism() {
        let a = Fixed::from_num(1) / Fixed::from_num(3);
        let b = Fixed::from_num(1) / Fixed::from_num(3);
        assert_eq!(a, b);
        assert_eq!(a * Fixed::from_num(7), b * Fixed::from_num(7));
    }
}
