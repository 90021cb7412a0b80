//! Online-status derivation.
//!
//! Three independent signal sources feed the same derived fields: the
//! presence channel (membership heartbeat), the change feed (new sample
//! inserts), and a one-shot freshness read against the location store.
//! They are reconciled by folding tagged events in arrival order with
//! last-writer-wins semantics on `is_online` and `last_seen`. A false
//! "online" reading for up to one freshness window after a surveyor goes
//! silent is acceptable; a false "offline" reading is not, and the
//! freshness fallback exists to suppress it.

use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::models::presence::PresenceView;

/// Default freshness window: a sample newer than this proves activity.
pub const DEFAULT_FRESHNESS_WINDOW_SECS: u64 = 300;

/// Tuning for the presence reducer.
#[derive(Debug, Clone, Copy)]
pub struct PresenceConfig {
    /// Samples newer than this count as proof of current activity.
    pub freshness_window: Duration,
}

impl Default for PresenceConfig {
    fn default() -> Self {
        Self {
            freshness_window: Duration::from_secs(DEFAULT_FRESHNESS_WINDOW_SECS),
        }
    }
}

/// One event from any of the three signal sources, tagged with its own
/// observation time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PresenceEvent {
    /// Full membership snapshot from the presence channel.
    Sync {
        members: usize,
        at: DateTime<Utc>,
    },
    /// A member joined the presence channel.
    Join {
        members: usize,
        at: DateTime<Utc>,
    },
    /// A member left the presence channel.
    Leave {
        members: usize,
        at: DateTime<Utc>,
    },
    /// The change feed delivered a newly inserted sample.
    SampleInserted { recorded_at: DateTime<Utc> },
    /// Result of the one-shot most-recent-sample read.
    FreshnessChecked {
        recorded_at: Option<DateTime<Utc>>,
        at: DateTime<Utc>,
    },
}

/// Folds presence events into a [`PresenceView`].
#[derive(Debug, Clone)]
pub struct PresenceState {
    config: PresenceConfig,
    view: PresenceView,
}

impl PresenceState {
    /// Creates a reducer seeded with a badge's cached `last_location_at`,
    /// if known, so "last seen" renders before any live signal arrives.
    pub fn new(config: PresenceConfig, seed_last_seen: Option<DateTime<Utc>>) -> Self {
        Self {
            config,
            view: PresenceView::seeded(seed_last_seen),
        }
    }

    pub fn view(&self) -> PresenceView {
        self.view
    }

    /// Applies one event and returns the recomputed view.
    pub fn apply(&mut self, event: PresenceEvent) -> PresenceView {
        match event {
            PresenceEvent::Sync { members, .. } => {
                self.view.presence_count = members;
                self.view.is_online = members > 0;
            }
            PresenceEvent::Join { members, at } => {
                self.view.presence_count = members;
                self.view.is_online = members > 0;
                self.view.last_seen = Some(at);
            }
            PresenceEvent::Leave { members, at } => {
                self.view.presence_count = members;
                self.view.is_online = members > 0;
                // The moment of leaving counts as a last-seen event, not a
                // reset to unknown.
                if members == 0 {
                    self.view.last_seen = Some(at);
                }
            }
            PresenceEvent::SampleInserted { recorded_at } => {
                self.view.is_online = true;
                self.view.last_seen = Some(recorded_at);
            }
            PresenceEvent::FreshnessChecked { recorded_at, at } => {
                if let Some(recorded_at) = recorded_at {
                    self.view.last_seen = Some(recorded_at);
                    let age = at.signed_duration_since(recorded_at);
                    let window = chrono::Duration::from_std(self.config.freshness_window)
                        .unwrap_or_else(|_| chrono::Duration::seconds(0));
                    if age <= window {
                        self.view.is_online = true;
                    }
                }
            }
        }
        self.view
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state() -> PresenceState {
        PresenceState::new(PresenceConfig::default(), None)
    }

    #[test]
    fn test_fresh_sample_forces_online() {
        let now = Utc::now();
        let mut s = state();
        let view = s.apply(PresenceEvent::FreshnessChecked {
            recorded_at: Some(now - chrono::Duration::minutes(4)),
            at: now,
        });
        assert!(view.is_online);
        assert_eq!(view.last_seen, Some(now - chrono::Duration::minutes(4)));
    }

    #[test]
    fn test_stale_sample_stays_offline() {
        let now = Utc::now();
        let mut s = state();
        let view = s.apply(PresenceEvent::FreshnessChecked {
            recorded_at: Some(now - chrono::Duration::minutes(6)),
            at: now,
        });
        assert!(!view.is_online);
        assert_eq!(view.last_seen, Some(now - chrono::Duration::minutes(6)));
    }

    #[test]
    fn test_freshness_without_rows_leaves_state_untouched() {
        let seed = Utc::now() - chrono::Duration::hours(1);
        let mut s = PresenceState::new(PresenceConfig::default(), Some(seed));
        let view = s.apply(PresenceEvent::FreshnessChecked {
            recorded_at: None,
            at: Utc::now(),
        });
        assert!(!view.is_online);
        assert_eq!(view.last_seen, Some(seed));
    }

    #[test]
    fn test_join_overrides_stale_freshness() {
        let now = Utc::now();
        let mut s = state();
        s.apply(PresenceEvent::FreshnessChecked {
            recorded_at: Some(now - chrono::Duration::minutes(30)),
            at: now,
        });
        let view = s.apply(PresenceEvent::Join { members: 1, at: now });
        assert!(view.is_online);
        assert_eq!(view.last_seen, Some(now));
        assert_eq!(view.presence_count, 1);
    }

    #[test]
    fn test_leave_to_zero_still_timestamps() {
        let now = Utc::now();
        let mut s = state();
        s.apply(PresenceEvent::Join {
            members: 1,
            at: now - chrono::Duration::minutes(10),
        });
        let view = s.apply(PresenceEvent::Leave { members: 0, at: now });
        assert!(!view.is_online);
        assert_eq!(view.last_seen, Some(now));
        assert_eq!(view.presence_count, 0);
    }

    #[test]
    fn test_leave_with_remaining_members_stays_online() {
        let now = Utc::now();
        let joined = now - chrono::Duration::minutes(2);
        let mut s = state();
        s.apply(PresenceEvent::Join {
            members: 2,
            at: joined,
        });
        let view = s.apply(PresenceEvent::Leave { members: 1, at: now });
        assert!(view.is_online);
        assert_eq!(view.presence_count, 1);
        // last_seen keeps the join timestamp; only the drop to zero stamps.
        assert_eq!(view.last_seen, Some(joined));
    }

    #[test]
    fn test_sync_snapshot_sets_membership() {
        let now = Utc::now();
        let mut s = state();
        let view = s.apply(PresenceEvent::Sync { members: 3, at: now });
        assert!(view.is_online);
        assert_eq!(view.presence_count, 3);
        assert!(view.last_seen.is_none());

        let view = s.apply(PresenceEvent::Sync { members: 0, at: now });
        assert!(!view.is_online);
    }

    #[test]
    fn test_sample_insert_forces_online() {
        let now = Utc::now();
        let mut s = state();
        s.apply(PresenceEvent::Sync { members: 0, at: now });
        let view = s.apply(PresenceEvent::SampleInserted { recorded_at: now });
        assert!(view.is_online);
        assert_eq!(view.last_seen, Some(now));
    }

    #[test]
    fn test_last_writer_wins_across_sources() {
        let now = Utc::now();
        let mut s = state();
        s.apply(PresenceEvent::SampleInserted {
            recorded_at: now - chrono::Duration::minutes(1),
        });
        // A later presence sync with zero members flips online off again.
        let view = s.apply(PresenceEvent::Sync { members: 0, at: now });
        assert!(!view.is_online);
        // But the sample-derived last_seen survives; sync carries no stamp.
        assert_eq!(view.last_seen, Some(now - chrono::Duration::minutes(1)));
    }

    #[test]
    fn test_custom_freshness_window() {
        let now = Utc::now();
        let config = PresenceConfig {
            freshness_window: Duration::from_secs(60),
        };
        let mut s = PresenceState::new(config, None);
        let view = s.apply(PresenceEvent::FreshnessChecked {
            recorded_at: Some(now - chrono::Duration::minutes(4)),
            at: now,
        });
        assert!(!view.is_online);
    }
}
