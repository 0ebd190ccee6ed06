use std::fmt::{Display, Formatter};

use bon::bon;
use chrono::TimeDelta;
use serde_with::{DurationSeconds, serde_as};

use crate::{prelude::*, quantity::percent::Percent};

/// Fixed SOC boundaries checked on every sample, in reporting order.
#[derive(Copy, Clone, Debug, serde::Deserialize)]
#[serde(default)]
pub struct Thresholds {
    pub critical_low: Percent,
    pub low: Percent,
    pub high: Percent,
    pub critical_high: Percent,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            critical_low: Percent(10.0),
            low: Percent(20.0),
            high: Percent(90.0),
            critical_high: Percent(95.0),
        }
    }
}

impl Thresholds {
    /// The boundaries in the order their events are reported.
    pub fn iter(self) -> impl Iterator<Item = (ThresholdName, Percent)> {
        [
            (ThresholdName::CriticalLow, self.critical_low),
            (ThresholdName::Low, self.low),
            (ThresholdName::High, self.high),
            (ThresholdName::CriticalHigh, self.critical_high),
        ]
        .into_iter()
    }
}

#[derive(Copy, Clone, Debug, Eq, Hash, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThresholdName {
    CriticalLow,
    Low,
    High,
    CriticalHigh,
}

impl Display for ThresholdName {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::CriticalLow => "critical_low",
            Self::Low => "low",
            Self::High => "high",
            Self::CriticalHigh => "critical_high",
        })
    }
}

/// Tuning of the SOC event detection.
#[serde_as]
#[derive(Copy, Clone, Debug, serde::Deserialize)]
#[serde(default)]
pub struct SocEventConfig {
    pub thresholds: Thresholds,

    /// Minimal SOC move against the change baseline that is worth an event.
    pub change_threshold: Percent,

    /// Minimal spacing between two events of the same kind for one device.
    #[serde(rename = "min_event_interval_seconds")]
    #[serde_as(as = "DurationSeconds<i64>")]
    pub min_event_interval: TimeDelta,
}

impl Default for SocEventConfig {
    fn default() -> Self {
        Self {
            thresholds: Thresholds::default(),
            change_threshold: Percent(5.0),
            min_event_interval: TimeDelta::seconds(60),
        }
    }
}

#[bon]
impl SocEventConfig {
    #[builder]
    pub fn new(
        #[builder(default)] thresholds: Thresholds,
        #[builder(default = Percent(5.0))] change_threshold: Percent,
        #[builder(default = TimeDelta::seconds(60))] min_event_interval: TimeDelta,
    ) -> Result<Self> {
        for (name, value) in thresholds.iter() {
            if !value.is_valid_fraction() {
                bail!("invalid `{name}` threshold: {value}");
            }
        }
        if !change_threshold.is_valid_fraction() {
            bail!("invalid change threshold: {change_threshold}");
        }
        if min_event_interval < TimeDelta::zero() {
            bail!("negative minimal event interval: {min_event_interval}");
        }
        Ok(Self { thresholds, change_threshold, min_event_interval })
    }
}
