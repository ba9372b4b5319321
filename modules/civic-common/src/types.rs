use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::CivicError;

// --- Geo Types ---

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

impl GeoPoint {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Great-circle distance to `other` in kilometers.
    pub fn distance_km(&self, other: &GeoPoint) -> f64 {
        haversine_km(self.lat, self.lng, other.lat, other.lng)
    }
}

/// Haversine great-circle distance between two lat/lng points in kilometers.
///
/// Models the Earth as a sphere of radius 6371 km; ellipsoidal flattening is
/// ignored, so results can be off by up to ~0.5%.
pub fn haversine_km(lat1: f64, lng1: f64, lat2: f64, lng2: f64) -> f64 {
    const EARTH_RADIUS_KM: f64 = 6371.0;
    let d_lat = (lat2 - lat1).to_radians();
    let d_lng = (lng2 - lng1).to_radians();
    let lat1_r = lat1.to_radians();
    let lat2_r = lat2.to_radians();

    let a = (d_lat / 2.0).sin().powi(2) + lat1_r.cos() * lat2_r.cos() * (d_lng / 2.0).sin().powi(2);
    // Rounding can push `a` a hair past 1.0 for antipodal points.
    let c = 2.0 * a.clamp(0.0, 1.0).sqrt().asin();
    EARTH_RADIUS_KM * c
}

// --- Enums ---

/// Colour used when a status or department is drawn on the map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarkerColor {
    Red,
    Green,
    Blue,
    Orange,
    Grey,
    Black,
}

impl std::fmt::Display for MarkerColor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MarkerColor::Red => write!(f, "red"),
            MarkerColor::Green => write!(f, "green"),
            MarkerColor::Blue => write!(f, "blue"),
            MarkerColor::Orange => write!(f, "orange"),
            MarkerColor::Grey => write!(f, "grey"),
            MarkerColor::Black => write!(f, "black"),
        }
    }
}

/// Marker colour for a department. Departments outside the known set share
/// the black default bucket.
pub fn department_color(department: &str) -> MarkerColor {
    match department {
        "Roads" => MarkerColor::Red,
        "Electricity" => MarkerColor::Green,
        "Water" => MarkerColor::Blue,
        _ => MarkerColor::Black,
    }
}

/// Store column that records when an issue entered a status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimestampField {
    AcknowledgedAt,
    InProgressAt,
    ResolvedAt,
}

impl TimestampField {
    /// Column name in the `posts` table.
    pub fn column(self) -> &'static str {
        match self {
            TimestampField::AcknowledgedAt => "acknowledged_at",
            TimestampField::InProgressAt => "in_progress_at",
            TimestampField::ResolvedAt => "completed_at",
        }
    }
}

/// Resolution lifecycle. Ordered, but any status may follow any other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum IssueStatus {
    Submitted,
    Acknowledged,
    #[serde(rename = "Work in Progress")]
    WorkInProgress,
    Completed,
}

impl IssueStatus {
    pub const ALL: [IssueStatus; 4] = [
        IssueStatus::Submitted,
        IssueStatus::Acknowledged,
        IssueStatus::WorkInProgress,
        IssueStatus::Completed,
    ];

    /// String stored in the `status` column.
    pub fn as_str(self) -> &'static str {
        match self {
            IssueStatus::Submitted => "Submitted",
            IssueStatus::Acknowledged => "Acknowledged",
            IssueStatus::WorkInProgress => "Work in Progress",
            IssueStatus::Completed => "Completed",
        }
    }

    pub fn display_color(self) -> MarkerColor {
        match self {
            IssueStatus::Submitted => MarkerColor::Grey,
            IssueStatus::Acknowledged => MarkerColor::Orange,
            IssueStatus::WorkInProgress => MarkerColor::Blue,
            IssueStatus::Completed => MarkerColor::Green,
        }
    }

    /// Timestamp stamped on entry into this status. `Submitted` has none;
    /// its time is the immutable report date.
    pub fn timestamp_field(self) -> Option<TimestampField> {
        match self {
            IssueStatus::Submitted => None,
            IssueStatus::Acknowledged => Some(TimestampField::AcknowledgedAt),
            IssueStatus::WorkInProgress => Some(TimestampField::InProgressAt),
            IssueStatus::Completed => Some(TimestampField::ResolvedAt),
        }
    }

    pub fn is_resolved(self) -> bool {
        matches!(self, IssueStatus::Completed)
    }
}

impl std::fmt::Display for IssueStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for IssueStatus {
    type Err = CivicError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        IssueStatus::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| CivicError::UnknownStatus(s.to_string()))
    }
}

// --- Issue ---

/// A citizen-reported civic problem. Identity and report date never change;
/// status and the lifecycle timestamps move together through transitions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Issue {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub department: String,
    pub status: IssueStatus,
    pub location: Option<GeoPoint>,
    pub upvotes: u32,
    pub comment_count: u32,
    pub image_url: Option<String>,
    pub reported_at: DateTime<Utc>,
    pub acknowledged_at: Option<DateTime<Utc>>,
    pub in_progress_at: Option<DateTime<Utc>>,
    pub resolved_at: Option<DateTime<Utc>>,
}

impl Issue {
    /// Current value of a lifecycle timestamp.
    pub fn timestamp(&self, field: TimestampField) -> Option<DateTime<Utc>> {
        match field {
            TimestampField::AcknowledgedAt => self.acknowledged_at,
            TimestampField::InProgressAt => self.in_progress_at,
            TimestampField::ResolvedAt => self.resolved_at,
        }
    }

    pub fn set_timestamp(&mut self, field: TimestampField, at: DateTime<Utc>) {
        match field {
            TimestampField::AcknowledgedAt => self.acknowledged_at = Some(at),
            TimestampField::InProgressAt => self.in_progress_at = Some(at),
            TimestampField::ResolvedAt => self.resolved_at = Some(at),
        }
    }

    /// Time from report to resolution, when the issue has been resolved.
    pub fn resolution_time(&self) -> Option<chrono::Duration> {
        self.resolved_at.map(|resolved| resolved - self.reported_at)
    }
}
