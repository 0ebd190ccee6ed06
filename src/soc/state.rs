use chrono::{DateTime, Utc};

use crate::quantity::percent::Percent;

/// Tracking state of one device.
///
/// A device without an entry has not reported yet: its first sample only
/// establishes the state and can never fire an event.
#[derive(Copy, Clone, Debug)]
pub struct SocState {
    /// The most recent sample.
    pub value: Percent,
    pub updated_at: DateTime<Utc>,
    pub(crate) baseline: Option<Baseline>,
}

impl SocState {
    pub(crate) const fn new(value: Percent, updated_at: DateTime<Utc>) -> Self {
        Self { value, updated_at, baseline: None }
    }
}

/// Reference point of the significant-change detection, set each time a
/// change event fires. Until the first event, consecutive samples are
/// compared pairwise instead.
#[derive(Copy, Clone, Debug)]
pub(crate) struct Baseline {
    pub value: Percent,
    pub fired_at: DateTime<Utc>,
}
