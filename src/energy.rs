use std::{
    collections::HashMap,
    fmt::{Display, Formatter},
};

use chrono::{DateTime, TimeDelta, Utc};

use crate::{
    prelude::*,
    quantity::{energy::KilowattHours, power::Watts},
};

/// Identifies one power-input channel, for example a main-unit MPPT input
/// or a battery-module MPPT input.
#[derive(Clone, Debug, Eq, Hash, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct SeriesKey {
    pub device: String,
    pub channel: String,
}

impl SeriesKey {
    pub fn new(device: impl Into<String>, channel: impl Into<String>) -> Self {
        Self { device: device.into(), channel: channel.into() }
    }
}

impl Display for SeriesKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.device, self.channel)
    }
}

/// Running state of one integrated series.
#[derive(Copy, Clone, Debug)]
struct EnergySeries {
    cumulative: KilowattHours,
    last_power: Watts,
    last_sampled_at: DateTime<Utc>,
}

/// Converts repeated instantaneous power readings into accumulated energy.
///
/// The vendor API exposes no native energy counter for solar input channels,
/// so the totals are estimated by trapezoidal integration of consecutive
/// power samples. Totals live in memory only and restart from zero with the
/// process.
#[must_use]
#[derive(Default)]
pub struct EnergyLedger {
    series: HashMap<SeriesKey, EnergySeries>,
}

impl EnergyLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one power sample and return the series total so far.
    ///
    /// A `None` reading leaves the series untouched: the missed interval is
    /// never backfilled. The first sample of a series only establishes the
    /// starting endpoint and yields zero. A sample that does not advance the
    /// clock is absorbed without integrating, but still replaces the stored
    /// endpoint so that the next interval is measured from it.
    pub fn observe(
        &mut self,
        key: &SeriesKey,
        power: Option<Watts>,
        sampled_at: DateTime<Utc>,
    ) -> KilowattHours {
        let Some(power) = power else {
            return self.cumulative(key);
        };
        let Some(series) = self.series.get_mut(key) else {
            self.series.insert(
                key.clone(),
                EnergySeries {
                    cumulative: KilowattHours::ZERO,
                    last_power: power,
                    last_sampled_at: sampled_at,
                },
            );
            return KilowattHours::ZERO;
        };
        let elapsed = sampled_at - series.last_sampled_at;
        if elapsed > TimeDelta::zero() {
            // The increment never goes below zero, so the total is
            // non-decreasing even on a negative power reading.
            let increment = power.midpoint(series.last_power) * elapsed;
            series.cumulative += increment.max(KilowattHours::ZERO);
        } else {
            debug!(series = %key, ?elapsed, "the clock did not advance, skipping the interval");
        }
        series.last_power = power;
        series.last_sampled_at = sampled_at;
        series.cumulative.rounded()
    }

    /// Accumulated energy of one series, zero when the series is unseen.
    pub fn cumulative(&self, key: &SeriesKey) -> KilowattHours {
        self.series.get(key).map_or(KilowattHours::ZERO, |series| series.cumulative.rounded())
    }

    /// Grand total over every tracked series.
    pub fn total(&self) -> KilowattHours {
        self.series.values().map(|series| series.cumulative).sum::<KilowattHours>().rounded()
    }

    /// Per-series totals for the presentation layer.
    pub fn iter(&self) -> impl Iterator<Item = (&SeriesKey, KilowattHours)> {
        self.series.iter().map(|(key, series)| (key, series.cumulative.rounded()))
    }
}
