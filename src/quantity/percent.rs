use std::fmt::{Debug, Display, Formatter};

/// State of charge or an SOC delta, `0..=100` for absolute values.
#[derive(
    Copy,
    Clone,
    derive_more::Add,
    derive_more::FromStr,
    derive_more::Neg,
    derive_more::Sub,
    serde::Serialize,
    serde::Deserialize,
)]
pub struct Percent(pub f64);

ordered_float!(Percent);

impl Percent {
    pub const ZERO: Self = Self(0.0);
    pub const HUNDRED: Self = Self(100.0);

    #[must_use]
    pub const fn abs(mut self) -> Self {
        self.0 = self.0.abs();
        self
    }

    /// Rounded to 1 decimal for event payloads.
    #[must_use]
    pub fn round_to_tenth(self) -> Self {
        Self((self.0 * 10.0).round() / 10.0)
    }

    pub fn is_valid_fraction(self) -> bool {
        self.0.is_finite() && (Self::ZERO..=Self::HUNDRED).contains(&self)
    }
}

impl Display for Percent {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}%", self.0)
    }
}

impl Debug for Percent {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}%", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_to_tenth() {
        assert_eq!((Percent(18.0) - Percent(50.0)).abs().round_to_tenth(), Percent(32.0));
        assert_eq!(Percent(4.25).round_to_tenth(), Percent(4.3));
    }

    #[test]
    fn valid_fraction() {
        assert!(Percent(0.0).is_valid_fraction());
        assert!(Percent(100.0).is_valid_fraction());
        assert!(!Percent(-0.1).is_valid_fraction());
        assert!(!Percent(f64::NAN).is_valid_fraction());
    }
}
