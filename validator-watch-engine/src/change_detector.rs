use std::fmt;

use crate::format::{format_number, format_thousands, jail_label};
use crate::source::RawValidatorRecord;
use validator_watch_datastore::ValidatorSnapshot;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WatchedField {
    Rank,
    Jailed,
    BondStatus,
    Tokens,
    Commission,
}

impl WatchedField {
    pub fn name(&self) -> &'static str {
        match self {
            WatchedField::Rank => "rank",
            WatchedField::Jailed => "jailed",
            WatchedField::BondStatus => "bond_status",
            WatchedField::Tokens => "tokens",
            WatchedField::Commission => "commission",
        }
    }
}

/// One watched attribute that moved between two consecutive polls.
/// Values are already formatted for display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEvent {
    pub field: WatchedField,
    pub previous: String,
    pub current: String,
}

impl ChangeEvent {
    fn new(field: WatchedField, previous: String, current: String) -> Self {
        Self { field, previous, current }
    }
}

impl fmt::Display for ChangeEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.field {
            WatchedField::Rank => write!(f, "Old Rank: {}, New rank: {}", self.previous, self.current),
            WatchedField::Jailed => write!(f, "Current Jail Status: {}", self.current),
            WatchedField::BondStatus => write!(f, "Bond Status: from {} to {}", self.previous, self.current),
            WatchedField::Tokens => write!(f, "Tokens: from {} to {}", self.previous, self.current),
            WatchedField::Commission => {
                write!(f, "Commission changed: from {}% to {}%", self.previous, self.current)
            }
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ChangeDetector {
    rank_watch_threshold: u32,
}

impl ChangeDetector {
    pub fn new(rank_watch_threshold: u32) -> Self {
        Self { rank_watch_threshold }
    }

    pub fn rank_watch_threshold(&self) -> u32 {
        self.rank_watch_threshold
    }

    /// Compares a fresh record with the stored snapshot. A first observation
    /// (`previous == None`) never produces events.
    pub fn diff(&self, previous: Option<&ValidatorSnapshot>, current: &RawValidatorRecord) -> Vec<ChangeEvent> {
        let Some(previous) = previous else {
            return Vec::new();
        };

        let mut events = Vec::new();

        // only ranks inside the watched band are reported
        if previous.rank < self.rank_watch_threshold && previous.rank != current.rank {
            events.push(ChangeEvent::new(
                WatchedField::Rank,
                previous.rank.to_string(),
                current.rank.to_string(),
            ));
        }
        if previous.jailed != current.jailed {
            events.push(ChangeEvent::new(
                WatchedField::Jailed,
                jail_label(previous.jailed).to_string(),
                jail_label(current.jailed).to_string(),
            ));
        }
        if previous.bond_status != current.bond_status {
            events.push(ChangeEvent::new(
                WatchedField::BondStatus,
                previous.bond_status.to_string(),
                current.bond_status.to_string(),
            ));
        }
        if previous.tokens != current.tokens {
            events.push(ChangeEvent::new(
                WatchedField::Tokens,
                format_thousands(previous.tokens),
                format_thousands(current.tokens),
            ));
        }
        if previous.commission != current.commission {
            events.push(ChangeEvent::new(
                WatchedField::Commission,
                format_number(previous.commission),
                format_number(current.commission),
            ));
        }

        events
    }
}

impl Default for ChangeDetector {
    fn default() -> Self {
        Self::new(crate::config::DEFAULT_RANK_WATCH_THRESHOLD)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use validator_watch_datastore::BondStatus;

    fn record(rank: u32) -> RawValidatorRecord {
        RawValidatorRecord {
            operator_address: "storyvaloper1test".to_string(),
            rank,
            hex_address: "AA".to_string(),
            jailed: false,
            bond_status: BondStatus::Bonded,
            uptime: 99.0,
            commission: 5.0,
            moniker: "test".to_string(),
            voting_power_percent: 1.0,
            avatar: None,
            tokens: 1_000,
            cumulative_share: 2.0,
            validator_id: 1,
        }
    }

    fn snapshot_of(rank: u32) -> ValidatorSnapshot {
        record(rank).into_snapshot(0)
    }

    #[test]
    fn test_first_observation_has_no_events() {
        let detector = ChangeDetector::default();
        let mut current = record(1);
        current.jailed = true;
        current.tokens = 0;
        assert!(detector.diff(None, &current).is_empty());
    }

    #[test]
    fn test_identical_record_has_no_events() {
        let detector = ChangeDetector::default();
        assert!(detector.diff(Some(&snapshot_of(10)), &record(10)).is_empty());
    }

    #[test]
    fn test_rank_change_inside_watched_band() {
        let detector = ChangeDetector::default();
        for (old, new) in [(1, 2), (50, 55), (199, 250), (150, 1)] {
            let events = detector.diff(Some(&snapshot_of(old)), &record(new));
            assert_eq!(events.len(), 1, "{old} -> {new}");
            assert_eq!(events[0].field, WatchedField::Rank);
            assert_eq!(events[0].previous, old.to_string());
            assert_eq!(events[0].current, new.to_string());
        }
    }

    #[test]
    fn test_rank_change_outside_watched_band_is_ignored() {
        let detector = ChangeDetector::default();
        for (old, new) in [(200, 150), (300, 310), (201, 1), (1000, 200)] {
            assert!(detector.diff(Some(&snapshot_of(old)), &record(new)).is_empty(), "{old} -> {new}");
        }
    }

    #[test]
    fn test_threshold_is_configurable() {
        let detector = ChangeDetector::new(10);
        assert!(detector.diff(Some(&snapshot_of(50)), &record(55)).is_empty());
        assert_eq!(detector.diff(Some(&snapshot_of(9)), &record(12)).len(), 1);
    }

    #[test]
    fn test_every_watched_field_fires_independently() {
        let detector = ChangeDetector::default();
        let previous = snapshot_of(300);
        let mut current = record(300);
        current.jailed = true;
        current.bond_status = BondStatus::Unbonding;
        current.tokens = 2_500;
        current.commission = 7.5;
        current.uptime = 10.0;
        current.moniker = "renamed".to_string();

        let events = detector.diff(Some(&previous), &current);
        let fields: Vec<WatchedField> = events.iter().map(|e| e.field).collect();
        assert_eq!(
            fields,
            vec![WatchedField::Jailed, WatchedField::BondStatus, WatchedField::Tokens, WatchedField::Commission]
        );
        assert_eq!(events[0].to_string(), "Current Jail Status: JAILED");
        assert_eq!(events[1].to_string(), "Bond Status: from bonded to unbonding");
        assert_eq!(events[2].to_string(), "Tokens: from 1,000 to 2,500");
        assert_eq!(events[3].to_string(), "Commission changed: from 5% to 7.5%");
    }
}
