//! Issue store adapter.
//!
//! Turns raw `posts` rows into canonical [`Issue`]s and wraps the store's
//! fetch/update calls so the rest of the engine never sees a half-valid
//! record. Fetch failures degrade to an empty collection; update failures are
//! returned so the status manager can leave local state untouched.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Result};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use tracing::{debug, info, warn};

use civic_common::{GeoPoint, Issue, IssueStatus, TimestampField};

use crate::traits::IssueStore;

/// Department used when a record has none.
pub const UNASSIGNED_DEPARTMENT: &str = "Unassigned";

/// Titles derived from the description are cut to this many characters.
const MAX_TITLE_CHARS: usize = 80;

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

/// A row of the `posts` table as PostgREST returns it, with the `likes` and
/// `comments` relations embedded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawIssueRecord {
    pub id: i64,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub department: Option<String>,
    #[serde(deserialize_with = "timestamp::required")]
    pub created_at: DateTime<Utc>,
    #[serde(default, deserialize_with = "timestamp::optional")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "timestamp::optional")]
    pub acknowledged_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "timestamp::optional")]
    pub in_progress_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub likes: Vec<serde_json::Value>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub comments: Vec<serde_json::Value>,
}

/// Partial update for one `posts` row. Only set fields are sent.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct IssuePatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<IssueStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub acknowledged_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub in_progress_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl IssuePatch {
    /// Patch that moves an issue into `status`, stamping the status's
    /// timestamp column with `at`.
    pub fn transition(status: IssueStatus, at: DateTime<Utc>) -> Self {
        let mut patch = Self {
            status: Some(status),
            ..Default::default()
        };
        match status.timestamp_field() {
            Some(TimestampField::AcknowledgedAt) => patch.acknowledged_at = Some(at),
            Some(TimestampField::InProgressAt) => patch.in_progress_at = Some(at),
            Some(TimestampField::ResolvedAt) => patch.completed_at = Some(at),
            None => {}
        }
        patch
    }
}

mod timestamp {
    //! Supabase returns `timestamptz` as RFC 3339, but `timestamp` columns
    //! come back without an offset. Both are read as UTC.

    use super::*;

    pub fn parse(raw: &str) -> Option<DateTime<Utc>> {
        if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
            return Some(dt.with_timezone(&Utc));
        }
        NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
            .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f"))
            .ok()
            .map(|naive| naive.and_utc())
    }

    pub fn required<'de, D>(deserializer: D) -> std::result::Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        parse(&raw).ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp {raw:?}")))
    }

    pub fn optional<'de, D>(deserializer: D) -> std::result::Result<Option<DateTime<Utc>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Option::<String>::deserialize(deserializer)? {
            None => Ok(None),
            Some(raw) => parse(&raw)
                .map(Some)
                .ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp {raw:?}"))),
        }
    }
}

fn null_as_empty<'de, D>(deserializer: D) -> std::result::Result<Vec<serde_json::Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<serde_json::Value>>::deserialize(deserializer)?.unwrap_or_default())
}

// ---------------------------------------------------------------------------
// Normalization
// ---------------------------------------------------------------------------

/// Convert a raw row into an [`Issue`]. Rows missing either coordinate are
/// dropped here so they never reach ranking or the map.
pub fn normalize_record(raw: RawIssueRecord) -> Option<Issue> {
    let location = match (raw.latitude, raw.longitude) {
        (Some(lat), Some(lng)) if lat.is_finite() && lng.is_finite() => GeoPoint::new(lat, lng),
        _ => {
            debug!(issue_id = raw.id, "Dropping issue without coordinates");
            return None;
        }
    };

    let status = match raw.status.as_deref() {
        None => IssueStatus::Submitted,
        Some(s) => s.parse().unwrap_or_else(|_| {
            warn!(issue_id = raw.id, status = s, "Unknown status, treating as Submitted");
            IssueStatus::Submitted
        }),
    };

    let department = raw
        .department
        .filter(|d| !d.trim().is_empty())
        .unwrap_or_else(|| UNASSIGNED_DEPARTMENT.to_string());

    let description = raw.content.unwrap_or_default();
    let reported_at = raw.created_at;

    // Stamps that predate the report are clock skew; pin them to the report.
    let not_before_report = |at: Option<DateTime<Utc>>, column: &str| {
        at.map(|at| {
            if at < reported_at {
                warn!(issue_id = raw.id, column, "Timestamp precedes report date, clamping");
                reported_at
            } else {
                at
            }
        })
    };

    Some(Issue {
        id: raw.id,
        title: derive_title(&description),
        department,
        status,
        location: Some(location),
        upvotes: saturating_u32(raw.likes.len()),
        comment_count: saturating_u32(raw.comments.len()),
        image_url: raw.image_url.filter(|url| !url.is_empty()),
        reported_at,
        acknowledged_at: not_before_report(raw.acknowledged_at, "acknowledged_at"),
        in_progress_at: not_before_report(raw.in_progress_at, "in_progress_at"),
        resolved_at: not_before_report(raw.completed_at, "completed_at"),
        description,
    })
}

/// First line of the description, shortened for list views.
fn derive_title(description: &str) -> String {
    let first_line = description.lines().next().unwrap_or("").trim();
    if first_line.chars().count() <= MAX_TITLE_CHARS {
        return first_line.to_string();
    }
    let mut title: String = first_line.chars().take(MAX_TITLE_CHARS - 1).collect();
    title.push('…');
    title
}

fn saturating_u32(n: usize) -> u32 {
    u32::try_from(n).unwrap_or(u32::MAX)
}

// ---------------------------------------------------------------------------
// IssueRepository
// ---------------------------------------------------------------------------

/// Fetch/update front for the rest of the engine.
#[derive(Clone)]
pub struct IssueRepository {
    store: Arc<dyn IssueStore>,
}

impl IssueRepository {
    pub fn new(store: Arc<dyn IssueStore>) -> Self {
        Self { store }
    }

    /// All issues with usable coordinates. A failed fetch yields an empty
    /// vector: callers must read that as "no data available", not "no issues".
    pub async fn fetch_issues(&self) -> Vec<Issue> {
        let records = match self.store.fetch_all().await {
            Ok(records) => records,
            Err(e) => {
                warn!(error = %e, "Issue fetch failed, returning empty collection");
                return Vec::new();
            }
        };

        let fetched = records.len();
        let issues: Vec<Issue> = records.into_iter().filter_map(normalize_record).collect();
        info!(fetched, kept = issues.len(), "Fetched issues");
        issues
    }

    /// Persist a partial update. Errors are logged and returned.
    pub async fn update_issue(&self, id: i64, patch: &IssuePatch) -> Result<()> {
        self.store.update(id, patch).await.inspect_err(|e| {
            warn!(issue_id = id, error = %e, "Issue update rejected by store");
        })
    }
}

/// Decode a PostgREST `posts` array row by row. Rows that do not fit
/// [`RawIssueRecord`] are dropped with a warning; only a body that is not a
/// JSON array fails.
pub fn decode_posts(body: &str) -> Result<Vec<RawIssueRecord>> {
    let rows: Vec<serde_json::Value> = serde_json::from_str(body)?;
    let records = rows
        .into_iter()
        .filter_map(|row| {
            let issue_id = row.get("id").and_then(serde_json::Value::as_i64);
            serde_json::from_value::<RawIssueRecord>(row)
                .inspect_err(|e| warn!(issue_id, error = %e, "Dropping malformed post"))
                .ok()
        })
        .collect();
    Ok(records)
}

// ---------------------------------------------------------------------------
// SupabaseStore (PostgREST over HTTP)
// ---------------------------------------------------------------------------

const POST_COLUMNS: &str = "id,content,status,department,created_at,completed_at,\
acknowledged_at,in_progress_at,image_url,latitude,longitude,likes(id),comments(id)";

pub struct SupabaseStore {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl SupabaseStore {
    pub fn new(base_url: &str, api_key: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        })
    }

    fn posts_url(&self) -> String {
        format!("{}/rest/v1/posts", self.base_url)
    }

    fn authorized(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        req.header("apikey", &self.api_key).bearer_auth(&self.api_key)
    }
}

#[async_trait]
impl IssueStore for SupabaseStore {
    async fn fetch_all(&self) -> Result<Vec<RawIssueRecord>> {
        let resp = self
            .authorized(self.client.get(self.posts_url()))
            .query(&[("select", POST_COLUMNS)])
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            bail!("Supabase fetch failed (status {}): {}", status.as_u16(), body);
        }

        let body = resp.text().await?;
        decode_posts(&body)
    }

    async fn update(&self, id: i64, patch: &IssuePatch) -> Result<()> {
        let resp = self
            .authorized(self.client.patch(self.posts_url()))
            .query(&[("id", format!("eq.{id}"))])
            .header("Prefer", "return=representation")
            .json(patch)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            bail!("Supabase update failed (status {}): {}", status.as_u16(), body);
        }

        // PostgREST answers 200 with `[]` when the filter matched nothing.
        let updated: Vec<serde_json::Value> = resp.json().await?;
        if updated.is_empty() {
            bail!("No post with id {id}");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{raw_record, MockStore};
    use chrono::TimeZone;

    #[test]
    fn upvotes_come_from_likes_cardinality() {
        let mut raw = raw_record(1, "Roads");
        raw.likes = vec![serde_json::json!({"id": 1}), serde_json::json!({"id": 2})];
        raw.comments = vec![serde_json::json!({"id": 9})];

        let issue = normalize_record(raw).unwrap();
        assert_eq!(issue.upvotes, 2);
        assert_eq!(issue.comment_count, 1);
    }

    #[test]
    fn records_missing_a_coordinate_are_dropped() {
        let mut no_lat = raw_record(1, "Roads");
        no_lat.latitude = None;
        let mut no_lng = raw_record(2, "Roads");
        no_lng.longitude = None;

        assert!(normalize_record(no_lat).is_none());
        assert!(normalize_record(no_lng).is_none());
        assert!(normalize_record(raw_record(3, "Roads")).is_some());
    }

    #[test]
    fn unknown_status_and_missing_department_get_defaults() {
        let mut raw = raw_record(1, "Roads");
        raw.status = Some("pending".to_string());
        raw.department = None;

        let issue = normalize_record(raw).unwrap();
        assert_eq!(issue.status, IssueStatus::Submitted);
        assert_eq!(issue.department, UNASSIGNED_DEPARTMENT);
    }

    #[test]
    fn title_is_first_line_of_content() {
        let mut raw = raw_record(1, "Water");
        raw.content = Some("Water pipe leakage\nLeaking near town hall.".to_string());
        assert_eq!(normalize_record(raw).unwrap().title, "Water pipe leakage");

        let mut long = raw_record(2, "Water");
        long.content = Some("x".repeat(200));
        let title = normalize_record(long).unwrap().title;
        assert_eq!(title.chars().count(), MAX_TITLE_CHARS);
        assert!(title.ends_with('…'));
    }

    #[test]
    fn resolution_before_report_is_clamped() {
        let mut raw = raw_record(1, "Roads");
        raw.status = Some("Completed".to_string());
        raw.completed_at = Some(raw.created_at - chrono::Duration::hours(2));

        let issue = normalize_record(raw).unwrap();
        assert_eq!(issue.resolved_at, Some(issue.reported_at));
    }

    #[test]
    fn deserializes_postgrest_row() {
        let body = r#"{
            "id": 42,
            "content": "Streetlight not working",
            "status": "Work in Progress",
            "department": "Electricity",
            "created_at": "2025-09-21T10:30:00+00:00",
            "completed_at": null,
            "in_progress_at": "2025-09-22 08:15:00.123",
            "image_url": "https://cdn.example/light.jpeg",
            "latitude": 12.9726,
            "longitude": 77.5956,
            "likes": [{"id": 1}, {"id": 2}, {"id": 3}],
            "comments": null
        }"#;

        let raw: RawIssueRecord = serde_json::from_str(body).unwrap();
        assert_eq!(raw.likes.len(), 3);
        assert!(raw.comments.is_empty());
        assert!(raw.acknowledged_at.is_none());

        let issue = normalize_record(raw).unwrap();
        assert_eq!(issue.status, IssueStatus::WorkInProgress);
        assert_eq!(
            issue.reported_at,
            Utc.with_ymd_and_hms(2025, 9, 21, 10, 30, 0).unwrap()
        );
        assert!(issue.in_progress_at.is_some());
    }

    #[test]
    fn malformed_row_does_not_sink_the_fetch() {
        let body = r#"[
            {"id": 1, "content": "Pothole", "status": "Submitted", "department": "Roads",
             "created_at": "2025-01-01T00:00:00Z", "latitude": 12.97, "longitude": 77.59,
             "likes": [], "comments": []},
            {"id": 2, "content": "Leak", "status": "Submitted", "department": "Water",
             "created_at": null, "latitude": 12.97, "longitude": 77.59,
             "likes": [], "comments": []},
            {"id": 3, "content": "Outage", "department": "Electricity",
             "created_at": "2025-01-01T00:00:00Z", "latitude": "north", "longitude": 77.59}
        ]"#;

        let records = decode_posts(body).unwrap();
        let issues: Vec<Issue> = records.into_iter().filter_map(normalize_record).collect();
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].id, 1);
    }

    #[test]
    fn non_array_body_is_an_error() {
        assert!(decode_posts(r#"{"message": "JWT expired"}"#).is_err());
    }

    #[test]
    fn patch_only_serializes_set_fields() {
        let at = Utc.with_ymd_and_hms(2025, 1, 1, 1, 0, 0).unwrap();
        let patch = IssuePatch::transition(IssueStatus::Completed, at);
        let json = serde_json::to_value(&patch).unwrap();

        assert_eq!(json["status"], "Completed");
        assert_eq!(json["completed_at"], "2025-01-01T01:00:00Z");
        assert!(json.get("acknowledged_at").is_none());
        assert!(json.get("in_progress_at").is_none());

        let submitted = serde_json::to_value(IssuePatch::transition(IssueStatus::Submitted, at)).unwrap();
        assert_eq!(submitted, serde_json::json!({"status": "Submitted"}));
    }

    #[tokio::test]
    async fn failed_fetch_yields_empty_collection() {
        let store = Arc::new(MockStore::new(vec![raw_record(1, "Roads")]));
        store.fail_fetches(true);
        let repo = IssueRepository::new(store);

        assert!(repo.fetch_issues().await.is_empty());
    }

    #[tokio::test]
    async fn fetch_filters_unlocated_records() {
        let mut unlocated = raw_record(2, "Water");
        unlocated.longitude = None;
        let store = Arc::new(MockStore::new(vec![raw_record(1, "Roads"), unlocated]));
        let repo = IssueRepository::new(store);

        let issues = repo.fetch_issues().await;
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].id, 1);
    }

    #[tokio::test]
    async fn update_errors_are_returned() {
        let store = Arc::new(MockStore::new(vec![raw_record(1, "Roads")]));
        store.fail_updates(true);
        let repo = IssueRepository::new(store);

        let patch = IssuePatch::transition(IssueStatus::Acknowledged, Utc::now());
        assert!(repo.update_issue(1, &patch).await.is_err());
    }
}
