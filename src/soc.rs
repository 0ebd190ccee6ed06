pub mod config;
pub mod event;
pub mod state;

use std::collections::{HashMap, hash_map::Entry};

use chrono::{DateTime, Utc};

pub use self::{
    config::{SocEventConfig, ThresholdName, Thresholds},
    event::{Crossing, Event, EventKind, Trend},
    state::SocState,
};
use self::state::Baseline;
use crate::{prelude::*, quantity::percent::Percent};

/// How close the SOC must come to a supplied limit to count as "at" it.
const LIMIT_TOLERANCE: Percent = Percent(1.0);

/// Identifies one battery, module or the whole system within a family.
#[derive(
    Clone,
    Debug,
    Eq,
    Hash,
    PartialEq,
    derive_more::Display,
    serde::Serialize,
    serde::Deserialize,
)]
pub struct DeviceKey(pub String);

impl DeviceKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }
}

/// Rate-limit ledger key: one entry per condition per device, shared by both
/// crossing directions of a boundary.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
enum Discriminator {
    Threshold(ThresholdName),
    Limit(String),
}

/// Turns per-device SOC sample streams into de-duplicated events.
///
/// One monitor covers one family of devices. Per sample it checks, in order:
/// crossings of the configured thresholds, a significant move against the
/// change baseline, and proximity to the externally supplied limits. Repeats
/// of the same condition within the minimal event interval are suppressed.
#[must_use]
pub struct SocMonitor {
    family_id: String,
    config: SocEventConfig,
    states: HashMap<DeviceKey, SocState>,
    last_fired: HashMap<(DeviceKey, Discriminator), DateTime<Utc>>,
}

impl SocMonitor {
    pub fn new(family_id: impl Into<String>, config: SocEventConfig) -> Self {
        Self {
            family_id: family_id.into(),
            config,
            states: HashMap::new(),
            last_fired: HashMap::new(),
        }
    }

    /// Replace the tuning in one go.
    ///
    /// The next [`Self::update`] already uses the new values. Tracked devices
    /// and the rate-limit ledger are kept as they are.
    pub fn configure(&mut self, config: SocEventConfig) {
        self.config = config;
        info!(family_id = %self.family_id, "reconfigured");
    }

    /// Tracking state of a device, or `None` when it has not reported yet.
    pub fn state(&self, device_key: &DeviceKey) -> Option<&SocState> {
        self.states.get(device_key)
    }

    /// Feed one SOC sample and collect the events it triggers.
    ///
    /// `limits` carries the externally computed SOC limits to check proximity
    /// against; the caller assembles them per call and their names are opaque
    /// here. Returned events are ordered: threshold crossings in configured
    /// order, then the change event, then limit events in supplied order.
    pub fn update(
        &mut self,
        device_key: &DeviceKey,
        soc: Option<Percent>,
        limits: &[(String, Percent)],
        now: DateTime<Utc>,
    ) -> Vec<Event> {
        let Some(current) = soc else {
            return Vec::new();
        };
        let Some(&state) = self.states.get(device_key) else {
            self.states.insert(device_key.clone(), SocState::new(current, now));
            return Vec::new();
        };
        let mut events = Vec::new();
        self.check_thresholds(device_key, state.value, current, now, &mut events);
        let baseline = self.check_change(device_key, state, current, now, &mut events);
        self.check_limits(device_key, current, limits, now, &mut events);

        let mut state = SocState::new(current, now);
        state.baseline = baseline;
        self.states.insert(device_key.clone(), state);
        events
    }

    fn check_thresholds(
        &mut self,
        device_key: &DeviceKey,
        previous: Percent,
        current: Percent,
        now: DateTime<Utc>,
        events: &mut Vec<Event>,
    ) {
        for (name, value) in self.config.thresholds.iter() {
            let direction = if previous < value && value <= current {
                Crossing::Above
            } else if previous > value && value >= current {
                Crossing::Below
            } else {
                continue;
            };
            if !self.try_fire(device_key, Discriminator::Threshold(name), now) {
                debug!(
                    device_key = %device_key,
                    threshold = %name,
                    "crossing suppressed by the rate limit",
                );
                continue;
            }
            info!(
                device_key = %device_key,
                threshold = %name,
                %value,
                %previous,
                %current,
                %direction,
                "SOC crossed a threshold",
            );
            events.push(Event {
                device_key: device_key.clone(),
                family_id: self.family_id.clone(),
                kind: EventKind::Threshold {
                    name,
                    value,
                    previous_soc: previous,
                    current_soc: current,
                    direction,
                },
                timestamp: now,
            });
        }
    }

    /// Returns the baseline to store back, updated when a change event fired.
    fn check_change(
        &mut self,
        device_key: &DeviceKey,
        state: SocState,
        current: Percent,
        now: DateTime<Utc>,
        events: &mut Vec<Event>,
    ) -> Option<Baseline> {
        // Until the first change event the baseline is simply the previous
        // sample, so a slow drift in sub-threshold steps never fires.
        let baseline = state.baseline.map_or(state.value, |baseline| baseline.value);
        let amount = (current - baseline).abs();
        if amount < self.config.change_threshold {
            return state.baseline;
        }
        // Change events rate-limit on the device's own baseline timestamp
        // rather than the shared ledger.
        let suppressed = state
            .baseline
            .is_some_and(|baseline| now - baseline.fired_at < self.config.min_event_interval);
        if suppressed {
            debug!(device_key = %device_key, "change suppressed by the rate limit");
            return state.baseline;
        }
        let direction = if current > baseline { Trend::Increase } else { Trend::Decrease };
        info!(
            device_key = %device_key,
            %baseline,
            %current,
            amount = %amount.round_to_tenth(),
            %direction,
            "SOC changed significantly",
        );
        events.push(Event {
            device_key: device_key.clone(),
            family_id: self.family_id.clone(),
            kind: EventKind::Change {
                amount: amount.round_to_tenth(),
                threshold: self.config.change_threshold,
                baseline_soc: baseline,
                current_soc: current,
                direction,
            },
            timestamp: now,
        });
        Some(Baseline { value: current, fired_at: now })
    }

    fn check_limits(
        &mut self,
        device_key: &DeviceKey,
        current: Percent,
        limits: &[(String, Percent)],
        now: DateTime<Utc>,
        events: &mut Vec<Event>,
    ) {
        for (limit_type, limit_value) in limits {
            if (current - *limit_value).abs() > LIMIT_TOLERANCE {
                continue;
            }
            if !self.try_fire(device_key, Discriminator::Limit(limit_type.clone()), now) {
                debug!(
                    device_key = %device_key,
                    %limit_type,
                    "limit proximity suppressed by the rate limit",
                );
                continue;
            }
            info!(
                device_key = %device_key,
                %limit_type,
                limit_value = %limit_value,
                %current,
                "SOC reached a limit",
            );
            events.push(Event {
                device_key: device_key.clone(),
                family_id: self.family_id.clone(),
                kind: EventKind::Limit {
                    limit_type: limit_type.clone(),
                    limit_value: *limit_value,
                    current_soc: current,
                    tolerance: LIMIT_TOLERANCE,
                },
                timestamp: now,
            });
        }
    }

    /// Check the shared ledger and claim the slot when the window has passed.
    fn try_fire(
        &mut self,
        device_key: &DeviceKey,
        discriminator: Discriminator,
        now: DateTime<Utc>,
    ) -> bool {
        match self.last_fired.entry((device_key.clone(), discriminator)) {
            Entry::Occupied(mut entry) => {
                if now - *entry.get() < self.config.min_event_interval {
                    return false;
                }
                entry.insert(now);
                true
            }
            Entry::Vacant(entry) => {
                entry.insert(now);
                true
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeDelta, TimeZone};

    use super::*;

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()
    }

    fn battery() -> DeviceKey {
        DeviceKey::new("battery_123")
    }

    fn monitor() -> SocMonitor {
        SocMonitor::new("42", SocEventConfig::default())
    }

    #[test]
    fn missing_sample_is_a_no_op() {
        let mut monitor = monitor();
        monitor.update(&battery(), Some(Percent(50.0)), &[], start());
        let events = monitor.update(&battery(), None, &[], start() + TimeDelta::minutes(5));
        assert!(events.is_empty());
        // The stored sample is still the first one.
        assert_eq!(monitor.state(&battery()).unwrap().updated_at, start());
    }

    #[test]
    fn first_sample_never_fires() {
        let mut monitor = monitor();
        // Even an extreme value has no previous endpoint to compare against.
        let events = monitor.update(&battery(), Some(Percent(0.0)), &[], start());
        assert!(events.is_empty());
        assert_eq!(monitor.state(&battery()).unwrap().value, Percent(0.0));
    }

    #[test]
    fn drop_below_low_fires_threshold_and_change() {
        let mut monitor = monitor();
        monitor.update(&battery(), Some(Percent(50.0)), &[], start());
        let now = start() + TimeDelta::minutes(5);
        let events = monitor.update(&battery(), Some(Percent(18.0)), &[], now);
        assert_eq!(events.len(), 2);
        assert!(matches!(
            events[0].kind,
            EventKind::Threshold {
                name: ThresholdName::Low,
                direction: Crossing::Below,
                previous_soc: Percent(50.0),
                current_soc: Percent(18.0),
                ..
            }
        ));
        assert!(matches!(
            events[1].kind,
            EventKind::Change {
                amount: Percent(32.0),
                direction: Trend::Decrease,
                ..
            }
        ));
        assert_eq!(events[0].family_id, "42");
        assert_eq!(events[0].timestamp, now);
    }

    #[test]
    fn oscillation_across_a_boundary_fires_once_per_interval() {
        let mut monitor = monitor();
        monitor.update(&battery(), Some(Percent(50.0)), &[], start());
        let events =
            monitor.update(&battery(), Some(Percent(18.0)), &[], start() + TimeDelta::seconds(10));
        assert_eq!(events.len(), 2);
        // Back above `low` 10 seconds later: the same discriminator covers
        // both directions, so the crossing is suppressed. The change baseline
        // moved to 18, so no change event either.
        let events =
            monitor.update(&battery(), Some(Percent(22.0)), &[], start() + TimeDelta::seconds(20));
        assert!(events.is_empty());
        // Past the interval the crossing fires again.
        let events =
            monitor.update(&battery(), Some(Percent(18.0)), &[], start() + TimeDelta::seconds(80));
        assert_eq!(events.len(), 1);
        assert!(matches!(
            events[0].kind,
            EventKind::Threshold { name: ThresholdName::Low, direction: Crossing::Below, .. }
        ));
    }

    #[test]
    fn landing_on_a_threshold_counts_as_crossing() {
        let mut monitor = monitor();
        monitor.update(&battery(), Some(Percent(50.0)), &[], start());
        let events =
            monitor.update(&battery(), Some(Percent(90.0)), &[], start() + TimeDelta::minutes(5));
        assert!(events.iter().any(|event| matches!(
            event.kind,
            EventKind::Threshold { name: ThresholdName::High, direction: Crossing::Above, .. }
        )));
    }

    #[test]
    fn limit_proximity_fires_within_tolerance() {
        let mut monitor = monitor();
        monitor.update(&battery(), Some(Percent(50.0)), &[], start());
        let limits = vec![("strategy_min".to_string(), Percent(51.5))];
        let events = monitor.update(
            &battery(),
            Some(Percent(51.0)),
            &limits,
            start() + TimeDelta::minutes(5),
        );
        assert_eq!(events.len(), 1);
        assert!(matches!(
            &events[0].kind,
            EventKind::Limit { limit_type, limit_value: Percent(51.5), .. }
                if limit_type == "strategy_min"
        ));
    }

    #[test]
    fn limit_event_is_rate_limited() {
        let mut monitor = monitor();
        monitor.update(&battery(), Some(Percent(50.0)), &[], start());
        let limits = vec![("strategy_min".to_string(), Percent(50.5))];
        let events = monitor.update(
            &battery(),
            Some(Percent(50.2)),
            &limits,
            start() + TimeDelta::seconds(10),
        );
        assert_eq!(events.len(), 1);
        let events = monitor.update(
            &battery(),
            Some(Percent(50.4)),
            &limits,
            start() + TimeDelta::seconds(30),
        );
        assert!(events.is_empty());
    }

    #[test]
    fn events_are_ordered_thresholds_then_change_then_limits() {
        let mut monitor = monitor();
        monitor.update(&battery(), Some(Percent(50.0)), &[], start());
        let limits = vec![("strategy_min".to_string(), Percent(20.0))];
        let events = monitor.update(
            &battery(),
            Some(Percent(20.0)),
            &limits,
            start() + TimeDelta::minutes(5),
        );
        assert_eq!(events.len(), 3);
        assert!(matches!(
            events[0].kind,
            EventKind::Threshold { name: ThresholdName::Low, direction: Crossing::Below, .. }
        ));
        assert!(matches!(events[1].kind, EventKind::Change { .. }));
        assert!(matches!(
            &events[2].kind,
            EventKind::Limit { limit_type, .. } if limit_type == "strategy_min"
        ));
    }

    #[test]
    fn small_steps_walk_without_firing() {
        let mut monitor = monitor();
        let mut now = start();
        monitor.update(&battery(), Some(Percent(50.0)), &[], now);
        // Every step stays under the 5% threshold against the previous
        // sample, so 12% of total drift never fires.
        for value in [54.0, 58.0, 62.0] {
            now += TimeDelta::minutes(5);
            let events = monitor.update(&battery(), Some(Percent(value)), &[], now);
            assert!(events.is_empty(), "unexpected events at {value}");
        }
    }

    #[test]
    fn change_baseline_holds_after_the_first_event() {
        let mut monitor = monitor();
        monitor.update(&battery(), Some(Percent(50.0)), &[], start());
        let events =
            monitor.update(&battery(), Some(Percent(56.0)), &[], start() + TimeDelta::minutes(5));
        assert_eq!(events.len(), 1);
        // 56 -> 60 is 4% against the fixed baseline of 56: nothing fires,
        // and the baseline stays at 56.
        let events =
            monitor.update(&battery(), Some(Percent(60.0)), &[], start() + TimeDelta::minutes(10));
        assert!(events.is_empty());
        // 60 -> 61.5 is only 1.5% against the previous sample but 5.5%
        // against the baseline.
        let events =
            monitor.update(&battery(), Some(Percent(61.5)), &[], start() + TimeDelta::minutes(15));
        assert_eq!(events.len(), 1);
        assert!(matches!(
            events[0].kind,
            EventKind::Change { amount: Percent(5.5), direction: Trend::Increase, .. }
        ));
    }

    #[test]
    fn reconfiguration_applies_to_the_next_update() {
        let mut monitor = monitor();
        monitor.update(&battery(), Some(Percent(50.0)), &[], start());
        let events =
            monitor.update(&battery(), Some(Percent(51.0)), &[], start() + TimeDelta::minutes(5));
        assert!(events.is_empty());
        monitor.configure(
            SocEventConfig::builder().change_threshold(Percent(1.0)).build().unwrap(),
        );
        let events =
            monitor.update(&battery(), Some(Percent(52.5)), &[], start() + TimeDelta::minutes(10));
        assert_eq!(events.len(), 1);
        assert!(matches!(
            events[0].kind,
            EventKind::Change { amount: Percent(1.5), direction: Trend::Increase, .. }
        ));
    }

    #[test]
    fn reconfiguration_keeps_the_rate_limit_ledger() {
        let mut monitor = monitor();
        monitor.update(&battery(), Some(Percent(50.0)), &[], start());
        let events =
            monitor.update(&battery(), Some(Percent(18.0)), &[], start() + TimeDelta::seconds(10));
        assert_eq!(events.len(), 2);
        monitor.configure(SocEventConfig::default());
        // Crossing `low` again 30 seconds after it fired stays suppressed.
        let events =
            monitor.update(&battery(), Some(Percent(22.0)), &[], start() + TimeDelta::seconds(40));
        assert!(events.is_empty());
    }

    #[test]
    fn devices_are_tracked_independently() {
        let other = DeviceKey::new("battery_456");
        let mut monitor = monitor();
        monitor.update(&battery(), Some(Percent(50.0)), &[], start());
        monitor.update(&battery(), Some(Percent(18.0)), &[], start() + TimeDelta::seconds(10));
        // The sibling device has its own ledger entries and baseline.
        monitor.update(&other, Some(Percent(50.0)), &[], start() + TimeDelta::seconds(10));
        let events =
            monitor.update(&other, Some(Percent(18.0)), &[], start() + TimeDelta::seconds(20));
        assert_eq!(events.len(), 2);
    }
}
