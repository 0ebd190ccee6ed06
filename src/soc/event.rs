use std::fmt::{Display, Formatter};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::{
    quantity::percent::Percent,
    soc::{DeviceKey, config::ThresholdName},
};

/// A discrete notification derived from the SOC sample stream.
///
/// Events are ephemeral: the detector returns them to the caller and keeps
/// no copy. The `timestamp` serializes to ISO-8601.
#[derive(Clone, Debug, Serialize)]
pub struct Event {
    pub device_key: DeviceKey,
    pub family_id: String,
    #[serde(flatten)]
    pub kind: EventKind,
    pub timestamp: DateTime<Utc>,
}

#[derive(Clone, Debug, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EventKind {
    /// The SOC crossed one of the configured boundaries.
    Threshold {
        #[serde(rename = "threshold_name")]
        name: ThresholdName,
        #[serde(rename = "threshold_value")]
        value: Percent,
        previous_soc: Percent,
        current_soc: Percent,
        direction: Crossing,
    },

    /// The SOC moved significantly against the change baseline.
    Change {
        #[serde(rename = "change_amount")]
        amount: Percent,
        #[serde(rename = "change_threshold")]
        threshold: Percent,
        baseline_soc: Percent,
        current_soc: Percent,
        direction: Trend,
    },

    /// The SOC came within tolerance of an externally supplied limit.
    Limit {
        limit_type: String,
        limit_value: Percent,
        current_soc: Percent,
        tolerance: Percent,
    },
}

/// Which way a boundary was crossed.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Crossing {
    Above,
    Below,
}

impl Display for Crossing {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Above => "above",
            Self::Below => "below",
        })
    }
}

/// Which way the SOC moved against the change baseline.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Trend {
    Increase,
    Decrease,
}

impl Display for Trend {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Increase => "increase",
            Self::Decrease => "decrease",
        })
    }
}
