//! The filter/metadata/sort pipeline and publishing.

use chrono::Utc;
use futures::future::join_all;

use super::Logic;
use crate::filter::{FilterExpression, FilterResults};
use crate::repo_id::RepoId;

impl Logic {
    /// Opens repositories named in `expressions`, fetches the metadata their
    /// `updated` panels need, then filters, sorts and publishes.
    pub async fn filter_sort_refresh(&self, expressions: &[FilterExpression]) -> FilterResults {
        self.open_repositories_in_filters(expressions).await;
        self.refresh_views(expressions).await
    }

    /// Re-runs the view pipeline over the presenter's active expressions.
    pub async fn republish(&self) -> FilterResults {
        let expressions = self.presenter.current_active_expressions();
        self.refresh_views(&expressions).await
    }

    /// Publishes the cached state without any network round, for optimistic edits.
    pub fn publish_cached(&self) -> FilterResults {
        let expressions = self.presenter.current_active_expressions();
        let snapshot = self.store.snapshot();
        let results = self
            .filter
            .filter_and_sort(&expressions, &snapshot, Utc::now());
        self.presenter.publish(&snapshot, &results);
        results
    }

    async fn open_repositories_in_filters(&self, expressions: &[FilterExpression]) {
        let to_open: Vec<RepoId> = self
            .filter
            .repos_to_open(expressions)
            .into_iter()
            .filter(|id| self.store.read(|s| !s.is_present(id) && !s.is_pending(id)))
            .collect();
        if to_open.is_empty() {
            return;
        }
        join_all(to_open.iter().map(|id| self.open(id, false))).await;
    }

    async fn refresh_views(&self, expressions: &[FilterExpression]) -> FilterResults {
        let to_update = self
            .filter
            .tally(expressions, &self.store.snapshot(), Utc::now());

        if !to_update.is_empty() {
            let succeeded = self.resolve_metadata(&to_update).await;
            if succeeded < to_update.len() {
                tracing::debug!(
                    "Metadata resolved for {} of {} repositories",
                    succeeded,
                    to_update.len()
                );
            }
            self.refresh_rate_limit().await;
        }

        // Phase A is complete, including all merges.
        let snapshot = self.store.snapshot();
        let results = self
            .filter
            .filter_and_sort(expressions, &snapshot, Utc::now());
        self.presenter.publish(&snapshot, &results);
        results
    }
}
