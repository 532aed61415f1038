//! Non-self update metadata retrieval.

use std::collections::{BTreeMap, HashMap};

use futures::future::join_all;

use super::Logic;
use crate::model::{Issue, IssueMetadata};
use crate::repo_id::RepoId;

impl Logic {
    /// Fetches metadata for exactly `issues`, computes their non-self update
    /// times and merges the result into the store.
    pub async fn get_issue_metadata(&self, repo_id: &RepoId, issues: &[Issue]) -> bool {
        tracing::info!(
            "Getting metadata for issues {}",
            issues
                .iter()
                .map(|i| i.id.to_string())
                .collect::<Vec<_>>()
                .join(", ")
        );
        self.status
            .display_message(&format!("Getting metadata for {}...", repo_id));

        let current_user = self.current_user();
        let raw = match self.source.fetch_metadata(repo_id, issues).await {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!("Failed to get metadata for {}: {}", repo_id, e);
                self.status
                    .display_message(&format!("Could not get metadata for {}", repo_id));
                return false;
            }
        };

        let metadata: HashMap<u64, IssueMetadata> = raw
            .into_iter()
            .map(|(id, raw)| (id, IssueMetadata::full(raw, current_user.as_deref())))
            .collect();

        self.status
            .display_message(&format!("Received metadata from {}!", repo_id));
        let updated = self
            .store
            .write(|s| s.insert_metadata(repo_id, &metadata, current_user.as_deref()));
        tracing::debug!("Merged metadata into {} issues of {}", updated, repo_id);
        true
    }

    /// Runs one metadata request per repository concurrently and waits for all.
    ///
    /// Returns how many repositories succeeded.
    pub(crate) async fn resolve_metadata(&self, to_update: &BTreeMap<RepoId, Vec<Issue>>) -> usize {
        join_all(
            to_update
                .iter()
                .map(|(repo_id, issues)| self.get_issue_metadata(repo_id, issues)),
        )
        .await
        .into_iter()
        .filter(|ok| *ok)
        .count()
    }
}
