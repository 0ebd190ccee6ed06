use std::{
    fmt::{Debug, Display, Formatter},
    ops::Mul,
};

use chrono::TimeDelta;

use crate::quantity::energy::KilowattHours;

/// Instantaneous power as reported by an MPPT input channel.
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
pub struct Watts(pub f64);

ordered_float!(Watts);

impl Watts {
    pub const ZERO: Self = Self(0.0);

    /// Trapezoidal average of two consecutive readings.
    #[must_use]
    pub fn midpoint(self, other: Self) -> Self {
        Self((self.0 + other.0) / 2.0)
    }
}

impl Display for Watts {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.0} W", self.0)
    }
}

impl Debug for Watts {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.0}W", self.0)
    }
}

impl Mul<TimeDelta> for Watts {
    type Output = KilowattHours;

    fn mul(self, rhs: TimeDelta) -> Self::Output {
        let hours = rhs.as_seconds_f64() / 3600.0;
        KilowattHours(self.0 * hours / 1000.0)
    }
}
