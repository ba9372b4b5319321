// Test mocks for the engine.
//
// Two mocks matching the two trait boundaries:
// - MockStore (IssueStore): stateful in-memory `posts` table
// - MockGeocoder (Geocoder): HashMap-based place→coordinates, with per-place
//   latency so debounce and stale-response races can be exercised
//
// Plus helpers for constructing Issues and raw records.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use anyhow::{bail, Result};
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};

use civic_common::{GeoPoint, Issue, IssueStatus};

use crate::store::{IssuePatch, RawIssueRecord};
use crate::traits::{Geocoder, IssueStore};

// ---------------------------------------------------------------------------
// Test constants
// ---------------------------------------------------------------------------

/// Bangalore city centre.
pub const BANGALORE: GeoPoint = GeoPoint { lat: 12.9716, lng: 77.5946 };
/// Chennai city centre.
pub const CHENNAI: GeoPoint = GeoPoint { lat: 13.0827, lng: 80.2707 };
/// Mumbai city centre.
pub const MUMBAI: GeoPoint = GeoPoint { lat: 19.0760, lng: 72.8777 };

/// Report time used by the helpers: 2025-01-01T00:00:00Z.
pub fn reported_epoch() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap()
}

// ---------------------------------------------------------------------------
// Builders
// ---------------------------------------------------------------------------

/// A submitted issue in Bangalore with no upvotes.
pub fn test_issue(id: i64, department: &str) -> Issue {
    Issue {
        id,
        title: format!("Issue {id}"),
        description: format!("Test issue {id}"),
        department: department.to_string(),
        status: IssueStatus::Submitted,
        location: Some(BANGALORE),
        upvotes: 0,
        comment_count: 0,
        image_url: None,
        reported_at: reported_epoch(),
        acknowledged_at: None,
        in_progress_at: None,
        resolved_at: None,
    }
}

/// A completed issue resolved `minutes` after it was reported.
pub fn resolved_issue(id: i64, department: &str, minutes: i64) -> Issue {
    let mut issue = test_issue(id, department);
    issue.status = IssueStatus::Completed;
    issue.resolved_at = Some(issue.reported_at + chrono::Duration::minutes(minutes));
    issue
}

pub fn issue_at(id: i64, department: &str, location: GeoPoint, upvotes: u32) -> Issue {
    Issue {
        location: Some(location),
        upvotes,
        ..test_issue(id, department)
    }
}

/// A raw `posts` row in Bangalore.
pub fn raw_record(id: i64, department: &str) -> RawIssueRecord {
    RawIssueRecord {
        id,
        content: Some(format!("Test issue {id}")),
        status: Some(IssueStatus::Submitted.as_str().to_string()),
        department: Some(department.to_string()),
        created_at: reported_epoch(),
        completed_at: None,
        acknowledged_at: None,
        in_progress_at: None,
        image_url: None,
        latitude: Some(BANGALORE.lat),
        longitude: Some(BANGALORE.lng),
        likes: Vec::new(),
        comments: Vec::new(),
    }
}

// ---------------------------------------------------------------------------
// MockStore
// ---------------------------------------------------------------------------

/// In-memory `posts` table. Updates apply to the stored rows, so a refetch
/// sees them. Failures can be switched on per operation.
pub struct MockStore {
    records: Mutex<Vec<RawIssueRecord>>,
    updates: Mutex<Vec<(i64, IssuePatch)>>,
    fail_fetch: AtomicBool,
    fail_update: AtomicBool,
}

impl MockStore {
    pub fn new(records: Vec<RawIssueRecord>) -> Self {
        Self {
            records: Mutex::new(records),
            updates: Mutex::new(Vec::new()),
            fail_fetch: AtomicBool::new(false),
            fail_update: AtomicBool::new(false),
        }
    }

    pub fn fail_fetches(&self, fail: bool) {
        self.fail_fetch.store(fail, Ordering::SeqCst);
    }

    pub fn fail_updates(&self, fail: bool) {
        self.fail_update.store(fail, Ordering::SeqCst);
    }

    /// Every accepted update, in order.
    pub fn updates(&self) -> Vec<(i64, IssuePatch)> {
        self.updates.lock().unwrap().clone()
    }

    pub fn record(&self, id: i64) -> Option<RawIssueRecord> {
        self.records.lock().unwrap().iter().find(|r| r.id == id).cloned()
    }
}

#[async_trait]
impl IssueStore for MockStore {
    async fn fetch_all(&self) -> Result<Vec<RawIssueRecord>> {
        if self.fail_fetch.load(Ordering::SeqCst) {
            bail!("mock store: fetch unavailable");
        }
        Ok(self.records.lock().unwrap().clone())
    }

    async fn update(&self, id: i64, patch: &IssuePatch) -> Result<()> {
        if self.fail_update.load(Ordering::SeqCst) {
            bail!("mock store: update rejected");
        }

        let mut records = self.records.lock().unwrap();
        let Some(record) = records.iter_mut().find(|r| r.id == id) else {
            bail!("mock store: no post with id {id}");
        };

        if let Some(status) = patch.status {
            record.status = Some(status.as_str().to_string());
        }
        if patch.acknowledged_at.is_some() {
            record.acknowledged_at = patch.acknowledged_at;
        }
        if patch.in_progress_at.is_some() {
            record.in_progress_at = patch.in_progress_at;
        }
        if patch.completed_at.is_some() {
            record.completed_at = patch.completed_at;
        }

        self.updates.lock().unwrap().push((id, patch.clone()));
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// MockGeocoder
// ---------------------------------------------------------------------------

/// Case-insensitive place lookup. Unregistered places resolve to `None`;
/// places marked failing return `Err`. Every call is recorded.
#[derive(Default)]
pub struct MockGeocoder {
    places: HashMap<String, GeoPoint>,
    latencies: HashMap<String, Duration>,
    failing: HashSet<String>,
    calls: Mutex<Vec<String>>,
}

impl MockGeocoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_place(mut self, name: &str, point: GeoPoint) -> Self {
        self.places.insert(name.to_lowercase(), point);
        self
    }

    /// Delay the response for `name` by `latency`.
    pub fn with_latency(mut self, name: &str, latency: Duration) -> Self {
        self.latencies.insert(name.to_lowercase(), latency);
        self
    }

    pub fn failing(mut self, name: &str) -> Self {
        self.failing.insert(name.to_lowercase());
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Geocoder for MockGeocoder {
    async fn resolve(&self, place: &str) -> Result<Option<GeoPoint>> {
        self.calls.lock().unwrap().push(place.to_string());

        let key = place.trim().to_lowercase();
        if let Some(latency) = self.latencies.get(&key) {
            tokio::time::sleep(*latency).await;
        }
        if self.failing.contains(&key) {
            bail!("mock geocoder: lookup for {place:?} failed");
        }
        Ok(self.places.get(&key).copied())
    }
}
