//! Device-fed geolocation source.
//!
//! Surveyor devices push raw fixes over HTTP; this bridges them into the
//! geolocation contract the tracking controller consumes. Opening a watch
//! hands the session an exclusively owned stream; fixes pushed while no
//! watch is open are remembered only as the latest known position.

use std::sync::Mutex;

use async_trait::async_trait;
use tokio::sync::mpsc;

use domain::services::geolocation::{
    GeolocationError, GeolocationService, PositionFix, PositionWatch, WatchOptions,
};

pub struct DeviceFeedGeolocation {
    capacity: usize,
    fix_tx: Mutex<Option<mpsc::Sender<Result<PositionFix, GeolocationError>>>>,
    latest: Mutex<Option<PositionFix>>,
}

impl DeviceFeedGeolocation {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            fix_tx: Mutex::new(None),
            latest: Mutex::new(None),
        }
    }

    /// Forwards one device fix into the open watch. Returns false when no
    /// watch is open (the fix is still kept as the latest known position).
    pub async fn push_fix(&self, fix: PositionFix) -> bool {
        *self.latest.lock().expect("latest lock") = Some(fix);

        let tx = self.fix_tx.lock().expect("fix_tx lock").clone();
        match tx {
            Some(tx) => {
                if tx.send(Ok(fix)).await.is_ok() {
                    true
                } else {
                    // The watch was dropped; forget the stale sender.
                    *self.fix_tx.lock().expect("fix_tx lock") = None;
                    false
                }
            }
            None => false,
        }
    }

    /// Whether a watch is currently open.
    pub fn has_watch(&self) -> bool {
        self.fix_tx.lock().expect("fix_tx lock").is_some()
    }
}

#[async_trait]
impl GeolocationService for DeviceFeedGeolocation {
    async fn current_position(
        &self,
        _options: WatchOptions,
    ) -> Result<PositionFix, GeolocationError> {
        self.latest
            .lock()
            .expect("latest lock")
            .ok_or(GeolocationError::PositionUnavailable)
    }

    async fn watch(&self, _options: WatchOptions) -> Result<PositionWatch, GeolocationError> {
        let (tx, rx) = mpsc::channel(self.capacity);
        *self.fix_tx.lock().expect("fix_tx lock") = Some(tx);
        Ok(PositionWatch::new(rx))
    }
}
