use std::fmt::{Debug, Display, Formatter};

/// Accumulated energy.
#[derive(
    Copy,
    Clone,
    derive_more::Add,
    derive_more::AddAssign,
    derive_more::FromStr,
    derive_more::Sub,
    derive_more::Sum,
    serde::Serialize,
    serde::Deserialize,
)]
pub struct KilowattHours(pub f64);

ordered_float!(KilowattHours);

impl KilowattHours {
    pub const ZERO: Self = Self(0.0);

    /// Rounded to the 3 decimals published on the read path.
    #[must_use]
    pub fn rounded(self) -> Self {
        Self((self.0 * 1000.0).round() / 1000.0)
    }
}

impl Display for KilowattHours {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.3} kWh", self.0)
    }
}

impl Debug for KilowattHours {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.3}kWh", self.0)
    }
}
