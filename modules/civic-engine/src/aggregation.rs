//! Department statistics for the leaderboard and dashboard badges.
//!
//! Everything here is a pure function of the issue slice and is recomputed
//! whenever the board changes. Nothing is persisted.

use serde::Serialize;

use civic_common::{Issue, IssueStatus};

const MINUTES_PER_HOUR: i64 = 60;
const MINUTES_PER_DAY: i64 = 1440;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// One leaderboard row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DepartmentStats {
    pub department: String,
    pub solved_count: usize,
    pub total_count: usize,
    /// 0–100, rounded to two decimals.
    pub solved_percentage: f64,
    /// Floor of the mean resolution time over solved issues. Zero when the
    /// department has solved nothing.
    pub avg_resolution_minutes: i64,
    pub avg_resolution_formatted: String,
}

/// Unresolved issue count for one department (dashboard filter badge).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DepartmentCount {
    pub department: String,
    pub count: usize,
}

/// Issue counts by status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatusSummary {
    pub total: usize,
    pub submitted: usize,
    pub acknowledged: usize,
    pub in_progress: usize,
    pub completed: usize,
    /// Everything not completed; the "All" badge.
    pub unresolved: usize,
}

// ---------------------------------------------------------------------------
// Leaderboard
// ---------------------------------------------------------------------------

/// Group issues by department (verbatim, first-seen order) and rank the
/// groups: solve percentage descending, then average resolution ascending.
///
/// A department that has solved nothing averages 0 minutes, so among
/// departments tied at 0% it ranks as if it resolved instantly. That quirk is
/// kept deliberately to match the published leaderboard.
pub fn department_stats(issues: &[Issue]) -> Vec<DepartmentStats> {
    let mut stats: Vec<DepartmentStats> = group_by_department(issues)
        .into_iter()
        .map(|(department, group)| stats_for_group(department, &group))
        .collect();

    // Stable: rows tied on both keys keep first-seen order.
    stats.sort_by(|a, b| {
        b.solved_percentage
            .total_cmp(&a.solved_percentage)
            .then(a.avg_resolution_minutes.cmp(&b.avg_resolution_minutes))
    });
    stats
}

fn stats_for_group(department: &str, group: &[&Issue]) -> DepartmentStats {
    let solved: Vec<&Issue> = group
        .iter()
        .copied()
        .filter(|issue| issue.status == IssueStatus::Completed)
        .collect();
    let solved_count = solved.len();
    let total_count = group.len();

    let solved_percentage = if total_count > 0 {
        round2(solved_count as f64 / total_count as f64 * 100.0)
    } else {
        0.0
    };

    // Completed issues missing a resolution stamp add nothing to the total
    // but still count in the divisor.
    let total_ms: i64 = solved
        .iter()
        .filter_map(|issue| issue.resolution_time())
        .map(|d| d.num_milliseconds())
        .sum();

    let avg_resolution_minutes = if solved_count > 0 {
        (total_ms as f64 / solved_count as f64 / 60_000.0).floor() as i64
    } else {
        0
    };

    DepartmentStats {
        department: department.to_string(),
        solved_count,
        total_count,
        solved_percentage,
        avg_resolution_minutes,
        avg_resolution_formatted: format_resolution_time(avg_resolution_minutes),
    }
}

/// Render whole minutes using only the largest unit that fits:
/// `"N day(s)"`, `"N hour(s)"`, or `"N minute(s)"`.
pub fn format_resolution_time(minutes: i64) -> String {
    if minutes >= MINUTES_PER_DAY {
        format!("{} day(s)", minutes / MINUTES_PER_DAY)
    } else if minutes >= MINUTES_PER_HOUR {
        format!("{} hour(s)", minutes / MINUTES_PER_HOUR)
    } else {
        format!("{} minute(s)", minutes.max(0))
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn group_by_department(issues: &[Issue]) -> Vec<(&str, Vec<&Issue>)> {
    let mut groups: Vec<(&str, Vec<&Issue>)> = Vec::new();
    for issue in issues {
        match groups.iter_mut().find(|(dept, _)| *dept == issue.department) {
            Some((_, group)) => group.push(issue),
            None => groups.push((issue.department.as_str(), vec![issue])),
        }
    }
    groups
}

// ---------------------------------------------------------------------------
// Dashboard counts
// ---------------------------------------------------------------------------

/// Count issues that are not completed, per department, in first-seen order.
pub fn unresolved_by_department(issues: &[Issue]) -> Vec<DepartmentCount> {
    let mut counts: Vec<DepartmentCount> = Vec::new();
    for issue in issues.iter().filter(|i| !i.status.is_resolved()) {
        match counts.iter_mut().find(|c| c.department == issue.department) {
            Some(entry) => entry.count += 1,
            None => counts.push(DepartmentCount {
                department: issue.department.clone(),
                count: 1,
            }),
        }
    }
    counts
}

pub fn status_summary(issues: &[Issue]) -> StatusSummary {
    let mut summary = StatusSummary {
        total: issues.len(),
        ..Default::default()
    };
    for issue in issues {
        match issue.status {
            IssueStatus::Submitted => summary.submitted += 1,
            IssueStatus::Acknowledged => summary.acknowledged += 1,
            IssueStatus::WorkInProgress => summary.in_progress += 1,
            IssueStatus::Completed => summary.completed += 1,
        }
    }
    summary.unresolved = summary.total - summary.completed;
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{resolved_issue, test_issue};

    #[test]
    fn single_department_scenario() {
        let mut solved = resolved_issue(1, "Roads", 60);
        solved.upvotes = 5;
        let mut open = test_issue(2, "Roads");
        open.upvotes = 1;

        let stats = department_stats(&[solved, open]);
        assert_eq!(
            stats,
            vec![DepartmentStats {
                department: "Roads".to_string(),
                solved_count: 1,
                total_count: 2,
                solved_percentage: 50.0,
                avg_resolution_minutes: 60,
                avg_resolution_formatted: "1 hour(s)".to_string(),
            }]
        );
    }

    #[test]
    fn faster_department_wins_percentage_tie() {
        // Both 90% solved; D2 averages 10 minutes, D1 30.
        let mut issues = Vec::new();
        for i in 0..9 {
            issues.push(resolved_issue(i, "D1", 30));
        }
        issues.push(test_issue(9, "D1"));
        for i in 10..19 {
            issues.push(resolved_issue(i, "D2", 10));
        }
        issues.push(test_issue(19, "D2"));

        let stats = department_stats(&issues);
        assert_eq!(stats[0].department, "D2");
        assert_eq!(stats[0].solved_percentage, 90.0);
        assert_eq!(stats[1].department, "D1");
    }

    #[test]
    fn higher_percentage_ranks_first() {
        let issues = vec![
            test_issue(1, "Water"),
            resolved_issue(2, "Water", 5),
            resolved_issue(3, "Electricity", 5000),
        ];
        let stats = department_stats(&issues);
        assert_eq!(stats[0].department, "Electricity");
        assert_eq!(stats[0].solved_percentage, 100.0);
        assert_eq!(stats[1].solved_percentage, 50.0);
    }

    #[test]
    fn zero_solved_sorts_as_instantaneous() {
        // Both 0% with a 0 min average: a full tie, so first-seen order holds.
        let issues = vec![test_issue(1, "Parks"), test_issue(2, "Water")];
        let stats = department_stats(&issues);
        assert!(stats.iter().all(|s| s.avg_resolution_minutes == 0));
        assert_eq!(stats[0].department, "Parks");
        assert_eq!(stats[0].avg_resolution_formatted, "0 minute(s)");
    }

    #[test]
    fn percentage_rounds_to_two_decimals() {
        let issues = vec![
            resolved_issue(1, "Roads", 10),
            test_issue(2, "Roads"),
            test_issue(3, "Roads"),
        ];
        let stats = department_stats(&issues);
        assert_eq!(stats[0].solved_percentage, 33.33);
    }

    #[test]
    fn average_floors_to_whole_minutes() {
        let mut a = resolved_issue(1, "Roads", 0);
        a.resolved_at = Some(a.reported_at + chrono::Duration::seconds(90));
        let b = resolved_issue(2, "Roads", 2);

        // (90s + 120s) / 2 = 105s → 1 minute
        let stats = department_stats(&[a, b]);
        assert_eq!(stats[0].avg_resolution_minutes, 1);
    }

    #[test]
    fn completed_without_stamp_counts_in_divisor() {
        let mut stampless = resolved_issue(1, "Roads", 0);
        stampless.resolved_at = None;
        let timed = resolved_issue(2, "Roads", 120);

        let stats = department_stats(&[stampless, timed]);
        assert_eq!(stats[0].solved_count, 2);
        assert_eq!(stats[0].avg_resolution_minutes, 60);
    }

    #[test]
    fn grouping_is_verbatim() {
        let issues = vec![test_issue(1, "Roads"), test_issue(2, "roads")];
        assert_eq!(department_stats(&issues).len(), 2);
    }

    #[test]
    fn counts_stay_within_bounds() {
        let issues = vec![
            resolved_issue(1, "Roads", 10),
            test_issue(2, "Water"),
            resolved_issue(3, "Water", 1500),
            test_issue(4, "Electricity"),
        ];
        for row in department_stats(&issues) {
            assert!(row.solved_count <= row.total_count);
            assert!((0.0..=100.0).contains(&row.solved_percentage));
        }
    }

    #[test]
    fn empty_input_gives_empty_leaderboard() {
        assert!(department_stats(&[]).is_empty());
    }

    #[test]
    fn formats_with_largest_unit_only() {
        assert_eq!(format_resolution_time(0), "0 minute(s)");
        assert_eq!(format_resolution_time(59), "59 minute(s)");
        assert_eq!(format_resolution_time(60), "1 hour(s)");
        assert_eq!(format_resolution_time(1439), "23 hour(s)");
        assert_eq!(format_resolution_time(1440), "1 day(s)");
        assert_eq!(format_resolution_time(1440 + 180), "1 day(s)");
        assert_eq!(format_resolution_time(10_000), "6 day(s)");
    }

    #[test]
    fn unresolved_counts_skip_completed() {
        let issues = vec![
            test_issue(1, "Water"),
            resolved_issue(2, "Roads", 10),
            test_issue(3, "Roads"),
            test_issue(4, "Water"),
        ];
        assert_eq!(
            unresolved_by_department(&issues),
            vec![
                DepartmentCount { department: "Water".to_string(), count: 2 },
                DepartmentCount { department: "Roads".to_string(), count: 1 },
            ]
        );
    }

    #[test]
    fn status_summary_counts_each_status() {
        let mut acked = test_issue(2, "Roads");
        acked.status = IssueStatus::Acknowledged;
        let mut wip = test_issue(3, "Roads");
        wip.status = IssueStatus::WorkInProgress;

        let summary = status_summary(&[
            test_issue(1, "Roads"),
            acked,
            wip,
            resolved_issue(4, "Water", 10),
        ]);
        assert_eq!(
            summary,
            StatusSummary {
                total: 4,
                submitted: 1,
                acknowledged: 1,
                in_progress: 1,
                completed: 1,
                unresolved: 3,
            }
        );
    }
}
