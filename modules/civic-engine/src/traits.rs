// Trait abstractions for the engine's two external collaborators.
//
// IssueStore: the persisted `posts` table (fetch-all + per-id partial update).
// Geocoder: free-text place name to coordinates.
//
// Both are mocked in `testing` so the engine runs with no network.

use anyhow::Result;
use async_trait::async_trait;

use civic_common::GeoPoint;
use locationiq_client::LocationIqClient;

use crate::store::{IssuePatch, RawIssueRecord};

// ---------------------------------------------------------------------------
// IssueStore
// ---------------------------------------------------------------------------

#[async_trait]
pub trait IssueStore: Send + Sync {
    /// Every persisted issue record, in store order.
    async fn fetch_all(&self) -> Result<Vec<RawIssueRecord>>;

    /// Apply a partial update to the record with `id`. Fails when the store
    /// rejects the write or no such record exists.
    async fn update(&self, id: i64, patch: &IssuePatch) -> Result<()>;
}

// ---------------------------------------------------------------------------
// Geocoder
// ---------------------------------------------------------------------------

#[async_trait]
pub trait Geocoder: Send + Sync {
    /// Resolve a place name. `Ok(None)` means the service had no match.
    async fn resolve(&self, place: &str) -> Result<Option<GeoPoint>>;
}

#[async_trait]
impl Geocoder for LocationIqClient {
    async fn resolve(&self, place: &str) -> Result<Option<GeoPoint>> {
        let found = self.first_match(place).await?;
        Ok(found.map(|(lat, lon)| GeoPoint::new(lat, lon)))
    }
}

/// Stand-in when no geocoding key is configured: every lookup misses, so
/// location filters stay inactive.
pub struct NoopGeocoder;

#[async_trait]
impl Geocoder for NoopGeocoder {
    async fn resolve(&self, _place: &str) -> Result<Option<GeoPoint>> {
        Ok(None)
    }
}
