//! Debounced place-name resolution for the location filter.
//!
//! Each `set_query` takes a fresh request token and restarts the debounce
//! timer, so only the query that stays put for the whole window reaches the
//! geocoder. Lookups already in flight are not cancelled; their result is
//! dropped on arrival unless their token is still the latest.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use civic_common::GeoPoint;

use crate::traits::Geocoder;

pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(500);

/// The last published outcome of a location query.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResolvedLocation {
    pub token: u64,
    pub query: String,
    /// `None` when the query is empty, unresolved, or the lookup failed.
    pub center: Option<GeoPoint>,
}

pub struct LocationSearch {
    geocoder: Arc<dyn Geocoder>,
    debounce: Duration,
    latest: Arc<AtomicU64>,
    timer: Mutex<Option<JoinHandle<()>>>,
    tx: Arc<watch::Sender<ResolvedLocation>>,
}

impl LocationSearch {
    pub fn new(geocoder: Arc<dyn Geocoder>, debounce: Duration) -> Self {
        let (tx, _rx) = watch::channel(ResolvedLocation::default());
        Self {
            geocoder,
            debounce,
            latest: Arc::new(AtomicU64::new(0)),
            timer: Mutex::new(None),
            tx: Arc::new(tx),
        }
    }

    /// Replace the query. Must be called from within a tokio runtime.
    /// Returns the request token assigned to this query.
    pub fn set_query(&self, query: &str) -> u64 {
        let token = self.latest.fetch_add(1, Ordering::SeqCst) + 1;
        self.cancel_timer();

        let query = query.trim().to_string();
        if query.is_empty() {
            self.tx.send_replace(ResolvedLocation {
                token,
                query,
                center: None,
            });
            return token;
        }

        let geocoder = self.geocoder.clone();
        let latest = self.latest.clone();
        let tx = self.tx.clone();
        let debounce = self.debounce;

        let timer = tokio::spawn(async move {
            tokio::time::sleep(debounce).await;
            // Past the window: the lookup runs detached so a later query can
            // only cancel timers, never an in-flight request.
            tokio::spawn(resolve_and_publish(geocoder, latest, tx, token, query));
        });

        *self.timer_slot() = Some(timer);
        token
    }

    /// Drop any pending (not yet fired) lookup without publishing anything.
    pub fn cancel(&self) {
        self.latest.fetch_add(1, Ordering::SeqCst);
        self.cancel_timer();
    }

    /// Centre from the latest published result.
    pub fn current(&self) -> Option<GeoPoint> {
        self.tx.borrow().center
    }

    pub fn latest(&self) -> ResolvedLocation {
        self.tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<ResolvedLocation> {
        self.tx.subscribe()
    }

    fn cancel_timer(&self) {
        if let Some(handle) = self.timer_slot().take() {
            handle.abort();
        }
    }

    /// The pending timer slot. A panic while holding the lock cannot leave
    /// the slot half-written, so a poisoned lock is taken over.
    fn timer_slot(&self) -> MutexGuard<'_, Option<JoinHandle<()>>> {
        self.timer.lock().unwrap_or_else(PoisonError::into_inner)
    }

    #[cfg(test)]
    fn has_pending_timer(&self) -> bool {
        self.timer_slot().is_some()
    }
}

impl Drop for LocationSearch {
    fn drop(&mut self) {
        self.cancel_timer();
    }
}

async fn resolve_and_publish(
    geocoder: Arc<dyn Geocoder>,
    latest: Arc<AtomicU64>,
    tx: Arc<watch::Sender<ResolvedLocation>>,
    token: u64,
    query: String,
) {
    debug!(token, query = query.as_str(), "Resolving location");
    let center = match geocoder.resolve(&query).await {
        Ok(Some(point)) => Some(point),
        Ok(None) => {
            info!(query = query.as_str(), "No location found, location filter inactive");
            None
        }
        Err(e) => {
            warn!(query = query.as_str(), error = %e, "Location lookup failed, location filter inactive");
            None
        }
    };

    if latest.load(Ordering::SeqCst) != token {
        debug!(token, query = query.as_str(), "Discarding superseded location result");
        return;
    }
    tx.send_replace(ResolvedLocation {
        token,
        query,
        center,
    });
}
