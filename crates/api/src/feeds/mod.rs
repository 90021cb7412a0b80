//! In-process realtime feeds.
//!
//! Two publish/subscribe hubs back the live badge indicators: the change
//! feed fans out newly inserted location samples per badge, and the
//! presence feed tracks per-surveyor channel membership.

pub mod change_feed;
pub mod presence_feed;

pub use change_feed::ChangeFeedHub;
pub use presence_feed::{PresenceFeedEvent, PresenceFeedHub, PresenceMembership};
