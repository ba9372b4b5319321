//! Map dashboard: status counts, department badges, the visible marker set,
//! the heatmap layer, map recentring, and status updates from the detail view.

use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};

use civic_common::{department_color, GeoPoint, Issue, IssueStatus, MarkerColor};

use crate::aggregation::{status_summary, unresolved_by_department, DepartmentCount, StatusSummary};
use crate::board::IssueBoard;
use crate::ranking::{heatmap_points, DepartmentFilter, HeatPoint};
use crate::store::IssueRepository;
use crate::traits::Geocoder;
use crate::transitions::{StatusManager, TransitionError};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardSummary {
    pub status: StatusSummary,
    pub unresolved_by_department: Vec<DepartmentCount>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Marker {
    pub issue_id: i64,
    pub position: GeoPoint,
    pub color: MarkerColor,
}

pub struct MapDashboard {
    board: IssueBoard,
    repo: IssueRepository,
    manager: StatusManager,
    geocoder: Arc<dyn Geocoder>,
    filter: DepartmentFilter,
    default_center: GeoPoint,
    center: GeoPoint,
    show_heatmap: bool,
}

impl MapDashboard {
    pub fn new(repo: IssueRepository, geocoder: Arc<dyn Geocoder>, default_center: GeoPoint) -> Self {
        Self {
            board: IssueBoard::default(),
            manager: StatusManager::new(repo.clone()),
            repo,
            geocoder,
            filter: DepartmentFilter::All,
            default_center,
            center: default_center,
            show_heatmap: true,
        }
    }

    /// Refetch and swap in the whole collection.
    pub async fn refresh(&mut self) -> usize {
        let issues = self.repo.fetch_issues().await;
        self.board.replace_all(issues);
        self.board.len()
    }

    pub fn board(&self) -> &IssueBoard {
        &self.board
    }

    pub fn summary(&self) -> DashboardSummary {
        DashboardSummary {
            status: status_summary(self.board.issues()),
            unresolved_by_department: unresolved_by_department(self.board.issues()),
        }
    }

    pub fn set_filter(&mut self, filter: DepartmentFilter) {
        self.filter = filter;
    }

    pub fn filter(&self) -> &DepartmentFilter {
        &self.filter
    }

    /// Unresolved issues in the active department.
    pub fn visible_issues(&self) -> Vec<&Issue> {
        self.board
            .issues()
            .iter()
            .filter(|issue| !issue.status.is_resolved() && self.filter.matches(&issue.department))
            .collect()
    }

    pub fn markers(&self) -> Vec<Marker> {
        self.visible_issues()
            .into_iter()
            .filter_map(|issue| {
                issue.location.map(|position| Marker {
                    issue_id: issue.id,
                    position,
                    color: department_color(&issue.department),
                })
            })
            .collect()
    }

    pub fn heatmap(&self) -> Vec<HeatPoint> {
        let visible: Vec<Issue> = self.visible_issues().into_iter().cloned().collect();
        heatmap_points(&visible)
    }

    pub fn toggle_heatmap(&mut self) -> bool {
        self.show_heatmap = !self.show_heatmap;
        self.show_heatmap
    }

    pub fn show_heatmap(&self) -> bool {
        self.show_heatmap
    }

    pub fn center(&self) -> GeoPoint {
        self.center
    }

    /// Recentre on a named place. Blank input is ignored; no match or a
    /// failed lookup resets to the default centre.
    pub async fn search_location(&mut self, name: &str) -> GeoPoint {
        let name = name.trim();
        if name.is_empty() {
            return self.center;
        }

        self.center = match self.geocoder.resolve(name).await {
            Ok(Some(point)) => point,
            Ok(None) => {
                info!(place = name, "No location found, resetting map centre");
                self.default_center
            }
            Err(e) => {
                warn!(place = name, error = %e, "Location lookup failed, resetting map centre");
                self.default_center
            }
        };
        self.center
    }

    /// Open the detail view for an issue and centre the map on it.
    pub fn select(&mut self, id: i64) -> Option<&Issue> {
        let location = self.board.select(id)?.location;
        if let Some(location) = location {
            self.center = location;
        }
        self.board.selected()
    }

    pub fn close_detail(&mut self) {
        self.board.clear_selection();
    }

    pub async fn update_status(&mut self, id: i64, status: IssueStatus) -> Result<Issue, TransitionError> {
        self.manager.transition(&mut self.board, id, status).await
    }
}
