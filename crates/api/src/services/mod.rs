//! Application services wiring domain components to feeds and stores.

pub mod device_feed;
pub mod presence_monitor;
pub mod tracking_sessions;

pub use device_feed::DeviceFeedGeolocation;
pub use presence_monitor::{PresenceMonitor, PresenceMonitorRegistry};
pub use tracking_sessions::{FixOutcome, TrackingSessionManager};
