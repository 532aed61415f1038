//! Optimistic edits of remote issue state.

use super::Logic;
use crate::model::Issue;
use crate::repo_id::RepoId;

impl Logic {
    /// Applies `labels` locally and publishes, then sends them to the source.
    ///
    /// If the source rejects the change, `original_labels` are restored and
    /// published again.
    pub async fn replace_issue_labels(
        &self,
        issue: &Issue,
        labels: &[String],
        original_labels: &[String],
    ) -> bool {
        self.replace_issue_labels_ui(issue, labels);

        tracing::info!(
            repo = %issue.repo_id,
            "Sending labels {:?} for {} to the repository source",
            labels,
            issue
        );
        let mut updated = issue.clone();
        updated.labels = labels.to_vec();

        match self.source.replace_labels(&updated, labels).await {
            Ok(()) => true,
            Err(e) => {
                self.replace_issue_labels_ui(issue, original_labels);
                tracing::error!(repo = %issue.repo_id, "Failed to replace labels of {}: {}", issue, e);
                false
            }
        }
    }

    /// Sets an issue's labels in the cache and publishes. Returns false if the
    /// issue is no longer cached.
    pub fn replace_issue_labels_ui(&self, issue: &Issue, labels: &[String]) -> bool {
        tracing::info!(
            repo = %issue.repo_id,
            "Applying labels {:?} to {} in UI",
            labels,
            issue
        );
        let applied = self
            .store
            .write(|s| {
                s.update_issue(&issue.repo_id, issue.id, |cached| {
                    cached.labels = labels.to_vec();
                })
            })
            .is_some();
        self.publish_cached();
        applied
    }

    /// Opens or closes an issue remotely; on success the cache follows.
    pub async fn edit_issue_state(&self, repo_id: &RepoId, issue_id: u64, open: bool) -> bool {
        match self.source.edit_state(repo_id, issue_id, open).await {
            Ok(true) => {
                self.store.write(|s| {
                    s.update_issue(repo_id, issue_id, |cached| cached.is_open = open)
                });
                self.publish_cached();
                true
            }
            Ok(false) => {
                tracing::info!(repo = %repo_id, "State change of #{} was not applied", issue_id);
                false
            }
            Err(e) => {
                tracing::warn!(repo = %repo_id, "Failed to edit state of #{}: {}", issue_id, e);
                false
            }
        }
    }
}
