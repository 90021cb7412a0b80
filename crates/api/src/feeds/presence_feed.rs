//! Presence feed: per-surveyor channel membership.
//!
//! A client joined to a surveyor's channel is that surveyor's heartbeat
//! proxy. Membership is held through an RAII guard so a dropped connection
//! always emits the matching leave event.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use serde::Serialize;
use tokio::sync::broadcast;
use tracing::debug;

use crate::middleware::metrics::record_presence_event;

/// One membership event on a surveyor channel.
///
/// `members` is the channel membership after the event, so subscribers
/// never have to reconstruct counts from deltas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum PresenceFeedEvent {
    /// Full membership snapshot, sent to newly attached subscribers.
    Sync { members: usize },
    /// A member joined the channel.
    Join { members: usize },
    /// A member left the channel.
    Leave { members: usize },
}

struct Channel {
    members: usize,
    tx: broadcast::Sender<PresenceFeedEvent>,
}

/// Hub of per-surveyor presence channels.
#[derive(Clone)]
pub struct PresenceFeedHub {
    channels: Arc<Mutex<HashMap<String, Channel>>>,
    capacity: usize,
}

impl PresenceFeedHub {
    pub fn new(capacity: usize) -> Self {
        Self {
            channels: Arc::new(Mutex::new(HashMap::new())),
            capacity,
        }
    }

    /// Attach as an observer. Returns the current membership snapshot and
    /// the live event stream; the observer itself is not a member.
    pub fn subscribe(
        &self,
        surveyor_id: &str,
    ) -> (usize, broadcast::Receiver<PresenceFeedEvent>) {
        let mut channels = self.channels.lock().expect("channels lock");
        let channel = channels
            .entry(surveyor_id.to_string())
            .or_insert_with(|| Channel {
                members: 0,
                tx: broadcast::channel(self.capacity).0,
            });
        (channel.members, channel.tx.subscribe())
    }

    /// Join the channel as a live member. The returned guard holds the
    /// membership; dropping it leaves the channel.
    pub fn join(&self, surveyor_id: &str) -> PresenceMembership {
        {
            let mut channels = self.channels.lock().expect("channels lock");
            let channel = channels
                .entry(surveyor_id.to_string())
                .or_insert_with(|| Channel {
                    members: 0,
                    tx: broadcast::channel(self.capacity).0,
                });
            channel.members += 1;
            let _ = channel.tx.send(PresenceFeedEvent::Join {
                members: channel.members,
            });
            debug!(surveyor_id, members = channel.members, "Presence join");
        }
        record_presence_event("join");
        PresenceMembership {
            hub: self.clone(),
            surveyor_id: surveyor_id.to_string(),
        }
    }

    /// Current membership of a surveyor channel.
    pub fn member_count(&self, surveyor_id: &str) -> usize {
        self.channels
            .lock()
            .expect("channels lock")
            .get(surveyor_id)
            .map(|c| c.members)
            .unwrap_or(0)
    }

    /// Drops channels with no members and no subscribers. Returns the
    /// number of channels removed.
    pub fn prune(&self) -> usize {
        let mut channels = self.channels.lock().expect("channels lock");
        let before = channels.len();
        channels.retain(|_, c| c.members > 0 || c.tx.receiver_count() > 0);
        before - channels.len()
    }

    fn leave(&self, surveyor_id: &str) {
        {
            let mut channels = self.channels.lock().expect("channels lock");
            if let Some(channel) = channels.get_mut(surveyor_id) {
                channel.members = channel.members.saturating_sub(1);
                let _ = channel.tx.send(PresenceFeedEvent::Leave {
                    members: channel.members,
                });
                debug!(surveyor_id, members = channel.members, "Presence leave");
            }
        }
        record_presence_event("leave");
    }
}

/// Live channel membership; leaving happens on drop.
pub struct PresenceMembership {
    hub: PresenceFeedHub,
    surveyor_id: String,
}

impl PresenceMembership {
    pub fn surveyor_id(&self) -> &str {
        &self.surveyor_id
    }
}

impl Drop for PresenceMembership {
    fn drop(&mut self) {
        self.hub.leave(&self.surveyor_id);
    }
}
