//! Priority ranking, radius filtering and heatmap weights.
//!
//! Pure functions over an issue slice. Place-name resolution lives in
//! `location_search`; by the time a centre reaches this module it is either
//! a resolved point or absent.

use serde::Serialize;

use civic_common::{GeoPoint, Issue};

/// Radius used by the priority list when none is configured.
pub const DEFAULT_RADIUS_KM: f64 = 10.0;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Department picker value. `"All"` disables the filter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum DepartmentFilter {
    #[default]
    All,
    Only(String),
}

impl DepartmentFilter {
    pub fn matches(&self, department: &str) -> bool {
        match self {
            DepartmentFilter::All => true,
            DepartmentFilter::Only(wanted) => wanted == department,
        }
    }
}

impl From<&str> for DepartmentFilter {
    fn from(value: &str) -> Self {
        if value == "All" {
            DepartmentFilter::All
        } else {
            DepartmentFilter::Only(value.to_string())
        }
    }
}

/// One heatmap sample. Serializes as `[lat, lng, weight]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct HeatPoint(pub f64, pub f64, pub f64);

impl HeatPoint {
    pub fn lat(&self) -> f64 {
        self.0
    }

    pub fn lng(&self) -> f64 {
        self.1
    }

    pub fn weight(&self) -> f64 {
        self.2
    }
}

// ---------------------------------------------------------------------------
// Ranking
// ---------------------------------------------------------------------------

/// Rank issues for the priority list.
///
/// 1. Stable sort by upvotes, most first.
/// 2. Keep the filtered department.
/// 3. With a centre, keep issues within `radius_km` (inclusive). Issues
///    without a location cannot be placed and are dropped while a centre is
///    active.
pub fn rank_by_priority(
    issues: &[Issue],
    department: &DepartmentFilter,
    center: Option<GeoPoint>,
    radius_km: f64,
) -> Vec<Issue> {
    let mut ranked: Vec<Issue> = issues.to_vec();
    ranked.sort_by(|a, b| b.upvotes.cmp(&a.upvotes));

    ranked.retain(|issue| department.matches(&issue.department));

    if let Some(center) = center {
        ranked.retain(|issue| within_radius(issue, &center, radius_km));
    }
    ranked
}

pub fn within_radius(issue: &Issue, center: &GeoPoint, radius_km: f64) -> bool {
    issue
        .location
        .is_some_and(|loc| loc.distance_km(center) <= radius_km)
}

/// Distinct departments in first-seen order, for the department picker.
pub fn department_options(issues: &[Issue]) -> Vec<String> {
    let mut seen: Vec<String> = Vec::new();
    for issue in issues {
        if !seen.iter().any(|d| *d == issue.department) {
            seen.push(issue.department.clone());
        }
    }
    seen
}

// ---------------------------------------------------------------------------
// Heatmap
// ---------------------------------------------------------------------------

/// Heat sample per located issue, weighted `upvotes + 1` so an issue nobody
/// has upvoted still shows. Unlocated issues are skipped.
pub fn heatmap_points(issues: &[Issue]) -> Vec<HeatPoint> {
    issues
        .iter()
        .filter_map(|issue| {
            issue
                .location
                .map(|loc| HeatPoint(loc.lat, loc.lng, f64::from(issue.upvotes) + 1.0))
        })
        .collect()
}
