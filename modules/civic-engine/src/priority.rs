use std::sync::Arc;
use std::time::Duration;

use civic_common::{GeoPoint, Issue};

use crate::location_search::LocationSearch;
use crate::ranking::{department_options, rank_by_priority, DepartmentFilter};
use crate::store::IssueRepository;
use crate::traits::Geocoder;

/// State behind the priority listing: the fetched issues, the department
/// picker, and the debounced location filter.
pub struct PriorityList {
    issues: Vec<Issue>,
    department: DepartmentFilter,
    search: LocationSearch,
    radius_km: f64,
}

impl PriorityList {
    pub fn new(geocoder: Arc<dyn Geocoder>, debounce: Duration, radius_km: f64) -> Self {
        Self {
            issues: Vec::new(),
            department: DepartmentFilter::All,
            search: LocationSearch::new(geocoder, debounce),
            radius_km,
        }
    }

    /// Replace the issue snapshot with a fresh fetch.
    pub async fn load(&mut self, repo: &IssueRepository) -> usize {
        self.issues = repo.fetch_issues().await;
        self.issues.len()
    }

    pub fn set_issues(&mut self, issues: Vec<Issue>) {
        self.issues = issues;
    }

    pub fn set_department(&mut self, department: DepartmentFilter) {
        self.department = department;
    }

    /// Feed the location input. Resolution happens after the debounce
    /// window; until then `ranked()` uses the previous centre.
    pub fn set_location_query(&self, query: &str) -> u64 {
        self.search.set_query(query)
    }

    pub fn location(&self) -> &LocationSearch {
        &self.search
    }

    pub fn center(&self) -> Option<GeoPoint> {
        self.search.current()
    }

    pub fn departments(&self) -> Vec<String> {
        department_options(&self.issues)
    }

    pub fn ranked(&self) -> Vec<Issue> {
        rank_by_priority(&self.issues, &self.department, self.center(), self.radius_km)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::location_search::DEFAULT_DEBOUNCE;
    use crate::ranking::DEFAULT_RADIUS_KM;
    use crate::testing::{issue_at, MockGeocoder, BANGALORE, CHENNAI};

    fn ids(issues: &[Issue]) -> Vec<i64> {
        issues.iter().map(|i| i.id).collect()
    }

    fn sample() -> Vec<Issue> {
        vec![
            issue_at(1, "Roads", BANGALORE, 3),
            issue_at(2, "Water", CHENNAI, 15),
            issue_at(3, "Roads", CHENNAI, 8),
            issue_at(4, "Water", BANGALORE, 7),
        ]
    }

    #[tokio::test(start_paused = true)]
    async fn location_filter_applies_after_debounce() {
        let geocoder = Arc::new(MockGeocoder::new().on_place("Chennai", CHENNAI));
        let mut list = PriorityList::new(geocoder, DEFAULT_DEBOUNCE, DEFAULT_RADIUS_KM);
        list.set_issues(sample());

        list.set_location_query("Chennai");
        assert_eq!(ids(&list.ranked()), vec![2, 3, 4, 1]);

        tokio::time::sleep(Duration::from_millis(600)).await;
        assert_eq!(ids(&list.ranked()), vec![2, 3]);

        list.set_department(DepartmentFilter::from("Roads"));
        assert_eq!(ids(&list.ranked()), vec![3]);
    }

    #[tokio::test(start_paused = true)]
    async fn unresolved_location_falls_back_to_department_filter() {
        let geocoder = Arc::new(MockGeocoder::new().failing("Gotham"));
        let mut list = PriorityList::new(geocoder, DEFAULT_DEBOUNCE, DEFAULT_RADIUS_KM);
        list.set_issues(sample());
        list.set_department(DepartmentFilter::from("Water"));

        list.set_location_query("Gotham");
        tokio::time::sleep(Duration::from_millis(600)).await;

        assert_eq!(list.center(), None);
        assert_eq!(ids(&list.ranked()), vec![2, 4]);
    }

    #[test]
    fn departments_follow_issue_order() {
        let geocoder = Arc::new(MockGeocoder::new());
        let mut list = PriorityList::new(geocoder, DEFAULT_DEBOUNCE, DEFAULT_RADIUS_KM);
        list.set_issues(sample());
        assert_eq!(list.departments(), vec!["Roads", "Water"]);
    }
}
