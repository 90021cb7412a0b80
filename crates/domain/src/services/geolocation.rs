//! Host geolocation service contract.
//!
//! The device position source is external to this system; the controller
//! only ever sees it through this trait.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use tokio::sync::mpsc;

/// One device position reading.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionFix {
    pub latitude: f64,
    pub longitude: f64,
    pub recorded_at: DateTime<Utc>,
}

/// Reasons a position query or watch can fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum GeolocationError {
    #[error("geolocation is not supported on this host")]
    Unsupported,
    #[error("permission to read device location was denied")]
    PermissionDenied,
    #[error("position unavailable")]
    PositionUnavailable,
    #[error("timed out acquiring a position fix")]
    Timeout,
}

/// Options for position queries and continuous watches.
#[derive(Debug, Clone, Copy)]
pub struct WatchOptions {
    /// Request the most accurate fix the host can provide.
    pub high_accuracy: bool,
    /// Acquisition timeout per fix.
    pub timeout: Duration,
    /// Tolerance for cached fixes.
    pub maximum_age: Duration,
}

impl Default for WatchOptions {
    fn default() -> Self {
        Self {
            high_accuracy: true,
            timeout: Duration::from_secs(10),
            maximum_age: Duration::from_secs(30),
        }
    }
}

/// An owned continuous position subscription.
///
/// The holder has exclusive use of the stream; dropping the watch releases
/// the underlying subscription.
pub struct PositionWatch {
    rx: mpsc::Receiver<Result<PositionFix, GeolocationError>>,
}

impl PositionWatch {
    pub fn new(rx: mpsc::Receiver<Result<PositionFix, GeolocationError>>) -> Self {
        Self { rx }
    }

    /// Next event from the host. `None` means the source closed.
    pub async fn next(&mut self) -> Option<Result<PositionFix, GeolocationError>> {
        self.rx.recv().await
    }
}

impl std::fmt::Debug for PositionWatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PositionWatch").finish_non_exhaustive()
    }
}

/// Host geolocation capability.
#[async_trait]
pub trait GeolocationService: Send + Sync {
    /// One-shot position query.
    async fn current_position(
        &self,
        options: WatchOptions,
    ) -> Result<PositionFix, GeolocationError>;

    /// Starts a continuous watch. The returned handle is exclusively owned
    /// by the caller for the lifetime of the subscription.
    async fn watch(&self, options: WatchOptions) -> Result<PositionWatch, GeolocationError>;
}
