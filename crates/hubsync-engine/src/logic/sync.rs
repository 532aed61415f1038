//! Repository open and refresh lifecycles.

use std::sync::Arc;

use futures::future::join_all;
use hubsync_core::SourceError;
use thiserror::Error;

use super::Logic;
use crate::model::Model;
use crate::repo_id::RepoId;
use crate::store::StoreError;

/// Why an open did not produce a model.
#[derive(Debug, Error)]
pub enum OpenError {
    #[error("{0} does not exist or is not accessible")]
    Invalid(RepoId),

    #[error(transparent)]
    Source(#[from] SourceError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl OpenError {
    /// Short text for the status line.
    pub fn user_message(&self) -> &'static str {
        match self {
            OpenError::Invalid(_) => "Repository not found. Check the name and try again.",
            OpenError::Source(e) => e.user_message(),
            OpenError::Store(_) => "The repository could not be stored.",
        }
    }
}

impl Logic {
    pub async fn open_primary_repository(&self, repo_id: &str) -> bool {
        self.open_repository(repo_id, true).await
    }

    pub async fn open_repository_from_filter(&self, repo_id: &str) -> bool {
        self.open_repository(repo_id, false).await
    }

    /// Opens a repository, resolving to true only if a new model was added.
    ///
    /// Already open or pending repositories cause no network activity; a
    /// primary open of one still republishes, since panels without a `repo`
    /// qualifier follow the default repository.
    pub async fn open_repository(&self, repo_id: &str, is_primary: bool) -> bool {
        let repo_id = match RepoId::parse(repo_id) {
            Ok(id) => id,
            Err(e) => {
                tracing::warn!("Refusing to open repository: {}", e);
                return false;
            }
        };
        self.open(&repo_id, is_primary).await
    }

    pub(crate) async fn open(&self, repo_id: &RepoId, is_primary: bool) -> bool {
        if is_primary {
            self.prefs.set_last_viewed_repository(repo_id);
        }

        if !self.store.write(|s| s.queue_pending(repo_id)) {
            if is_primary {
                self.make_default(repo_id);
                self.republish().await;
            }
            return false;
        }

        if let Err(e) = self.fetch_into_store(repo_id).await {
            self.store.write(|s| s.drop_pending(repo_id));
            match &e {
                OpenError::Store(_) => tracing::error!("Failed to store {}: {}", repo_id, e),
                _ => tracing::warn!("Failed to open {}: {}", repo_id, e),
            }
            self.status
                .display_message(&format!("Could not open {}: {}", repo_id, e.user_message()));
            return false;
        }

        if is_primary {
            self.make_default(repo_id);
        }
        self.republish().await;
        self.presenter.repository_opened(repo_id);
        self.refresh_rate_limit().await;
        true
    }

    /// validate -> fetch -> store
    async fn fetch_into_store(&self, repo_id: &RepoId) -> Result<(), OpenError> {
        if !self.source.is_valid(repo_id).await? {
            return Err(OpenError::Invalid(repo_id.clone()));
        }

        tracing::info!("Opening {}", repo_id);
        self.status.display_message(&format!("Opening {}", repo_id));

        let model = self.source.fetch_full(repo_id).await?;
        self.store.write(|s| s.add_from_pending(repo_id, model))?;
        Ok(())
    }

    fn make_default(&self, repo_id: &RepoId) {
        if let Err(e) = self.store.write(|s| s.set_default_repo(repo_id)) {
            tracing::debug!("Not switching default repository: {}", e);
        }
    }

    /// Refreshes every present model concurrently, then republishes.
    ///
    /// A model whose refresh fails keeps its previous snapshot. Returns false
    /// without doing anything while refresh is suppressed.
    pub async fn refresh(&self) -> bool {
        if self.is_refresh_suppressed() {
            tracing::info!("Refresh suppressed, keeping the current view");
            return false;
        }

        let models: Vec<Arc<Model>> = self.store.read(|s| s.models().cloned().collect());
        let message = format!(
            "Refreshing {}",
            models
                .iter()
                .map(|m| m.repo_id.to_string())
                .collect::<Vec<_>>()
                .join(", ")
        );
        tracing::info!("{}", message);
        self.status.display_message(&message);

        let refreshed = join_all(models.iter().map(|model| async move {
            match self.source.refresh(model).await {
                Ok(fresh) => Some(fresh),
                Err(e) => {
                    tracing::warn!("Failed to refresh {}: {}", model.repo_id, e);
                    None
                }
            }
        }))
        .await;

        self.store.write(|s| {
            let mut fresh: Vec<Model> = refreshed.into_iter().flatten().collect();
            // Repositories removed mid-refresh stay removed; those that failed
            // or opened mid-refresh keep what is stored now.
            let merged: Vec<Arc<Model>> = s
                .models()
                .map(|current| {
                    match fresh.iter().position(|m| m.repo_id == current.repo_id) {
                        Some(index) => Arc::new(fresh.swap_remove(index)),
                        None => Arc::clone(current),
                    }
                })
                .collect();
            s.replace_all(merged);
        });

        self.republish().await;
        self.refresh_rate_limit().await;
        true
    }
}
