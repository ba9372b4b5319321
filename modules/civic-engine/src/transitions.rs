//! Status transitions.
//!
//! Any status may follow any other; the manager never rejects a "backward"
//! move. A transition stamps only the target status's timestamp, persists
//! `{status, <column>}` through the store, and touches the board only after
//! the store accepts the write.

use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::info;

use civic_common::{Issue, IssueStatus};

use crate::board::IssueBoard;
use crate::store::{IssuePatch, IssueRepository};

#[derive(Debug, Error)]
pub enum TransitionError {
    #[error("Issue {0} is not on the board")]
    UnknownIssue(i64),

    #[error("Store rejected status update for issue {id}: {message}")]
    Rejected { id: i64, message: String },
}

/// Apply `target` to a copy of `issue` at time `now`, returning the updated
/// copy and the patch that persists it. Stamps never precede the report date.
pub fn apply_status(issue: &Issue, target: IssueStatus, now: DateTime<Utc>) -> (Issue, IssuePatch) {
    let at = now.max(issue.reported_at);
    let mut updated = issue.clone();
    updated.status = target;
    if let Some(field) = target.timestamp_field() {
        updated.set_timestamp(field, at);
    }
    (updated, IssuePatch::transition(target, at))
}

pub struct StatusManager {
    repo: IssueRepository,
}

impl StatusManager {
    pub fn new(repo: IssueRepository) -> Self {
        Self { repo }
    }

    /// Move issue `id` to `target` using the current time.
    pub async fn transition(
        &self,
        board: &mut IssueBoard,
        id: i64,
        target: IssueStatus,
    ) -> Result<Issue, TransitionError> {
        self.transition_at(board, id, target, Utc::now()).await
    }

    /// Move issue `id` to `target` as of `now`. On a store failure the board
    /// is left exactly as it was; retrying with the same target is safe.
    pub async fn transition_at(
        &self,
        board: &mut IssueBoard,
        id: i64,
        target: IssueStatus,
        now: DateTime<Utc>,
    ) -> Result<Issue, TransitionError> {
        let current = board.get(id).ok_or(TransitionError::UnknownIssue(id))?;
        let from = current.status;
        let (updated, patch) = apply_status(current, target, now);

        self.repo
            .update_issue(id, &patch)
            .await
            .map_err(|e| TransitionError::Rejected {
                id,
                message: e.to_string(),
            })?;

        board.replace_issue(updated.clone());

        info!(issue_id = id, from = %from, to = %target, "Issue status updated");
        Ok(updated)
    }
}
