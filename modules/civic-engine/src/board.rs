use civic_common::Issue;

/// The owned, versioned in-memory issue collection.
///
/// Readers borrow `issues()` and hand the slice to the pure aggregation and
/// ranking functions. The collection only changes through `replace_all`
/// (after a fetch) and `replace_issue` (after a persisted status change);
/// each swaps in a whole new vector and bumps `version`.
#[derive(Debug, Clone, Default)]
pub struct IssueBoard {
    issues: Vec<Issue>,
    version: u64,
    selected: Option<Issue>,
}

impl IssueBoard {
    pub fn new(issues: Vec<Issue>) -> Self {
        Self {
            issues,
            version: 0,
            selected: None,
        }
    }

    pub fn issues(&self) -> &[Issue] {
        &self.issues
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn len(&self) -> usize {
        self.issues.len()
    }

    pub fn is_empty(&self) -> bool {
        self.issues.is_empty()
    }

    pub fn get(&self, id: i64) -> Option<&Issue> {
        self.issues.iter().find(|issue| issue.id == id)
    }

    pub fn selected(&self) -> Option<&Issue> {
        self.selected.as_ref()
    }

    /// Select the issue with `id` for the detail view.
    pub fn select(&mut self, id: i64) -> Option<&Issue> {
        self.selected = self.get(id).cloned();
        self.selected.as_ref()
    }

    pub fn clear_selection(&mut self) {
        self.selected = None;
    }

    /// Swap in a freshly fetched collection. A selection survives only if
    /// its issue is still present, and then reflects the fetched copy.
    pub fn replace_all(&mut self, issues: Vec<Issue>) {
        let selected = self
            .selected
            .as_ref()
            .and_then(|sel| issues.iter().find(|issue| issue.id == sel.id).cloned());

        self.issues = issues;
        self.selected = selected;
        self.version += 1;
    }

    /// Replace one issue by id, keeping every other issue as-is. Returns
    /// false, leaving the board untouched, if no issue has that id.
    pub(crate) fn replace_issue(&mut self, updated: Issue) -> bool {
        if self.get(updated.id).is_none() {
            return false;
        }

        let next: Vec<Issue> = self
            .issues
            .iter()
            .map(|issue| {
                if issue.id == updated.id {
                    updated.clone()
                } else {
                    issue.clone()
                }
            })
            .collect();

        if self.selected.as_ref().is_some_and(|sel| sel.id == updated.id) {
            self.selected = Some(updated);
        }
        self.issues = next;
        self.version += 1;
        true
    }
}
