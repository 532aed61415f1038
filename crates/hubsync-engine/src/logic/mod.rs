//! Coordinators tying the store, the filter engine and the remote source together.
//!
//! Every network round ends by refreshing the rate-limit cell, so the
//! presenter's quota display is current after any remote call. Network
//! faults are logged and reported as `false`; they never escape a coordinator.

mod metadata;
mod mutation;
mod sync;
mod views;

use std::collections::{BTreeSet, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

pub use sync::OpenError;

use crate::filter::FilterEngine;
use crate::model::Model;
use crate::prefs::Preferences;
use crate::presenter::{Presenter, StatusSink, TracingStatus};
use crate::rate_limit::{RateLimit, RateLimitCell};
use crate::repo_id::RepoId;
use crate::source::{Credentials, RemoteSource};
use crate::store::{SharedStore, StoreSnapshot};

pub struct Logic {
    store: SharedStore,
    source: Arc<dyn RemoteSource>,
    presenter: Arc<dyn Presenter>,
    status: Arc<dyn StatusSink>,
    prefs: Arc<dyn Preferences>,
    filter: FilterEngine,
    rate_limit: RateLimitCell,
    refresh_suppressed: AtomicBool,
}

impl Logic {
    pub fn new(
        source: Arc<dyn RemoteSource>,
        presenter: Arc<dyn Presenter>,
        prefs: Arc<dyn Preferences>,
    ) -> Self {
        Self {
            store: SharedStore::new(),
            source,
            presenter,
            status: Arc::new(TracingStatus),
            prefs,
            filter: FilterEngine::new(),
            rate_limit: RateLimitCell::new(),
            refresh_suppressed: AtomicBool::new(false),
        }
    }

    pub fn with_status(mut self, status: Arc<dyn StatusSink>) -> Self {
        self.status = status;
        self
    }

    pub fn snapshot(&self) -> StoreSnapshot {
        self.store.snapshot()
    }

    pub fn get_repo(&self, repo_id: &str) -> Option<Arc<Model>> {
        let repo_id = RepoId::parse(repo_id).ok()?;
        self.store.read(|s| s.get(&repo_id))
    }

    pub fn is_pending(&self, repo_id: &str) -> bool {
        RepoId::parse(repo_id).is_ok_and(|id| self.store.read(|s| s.is_pending(&id)))
    }

    /// Lower-cased ids of every present repository.
    pub fn open_repositories(&self) -> BTreeSet<String> {
        self.store.read(|s| {
            s.present_ids()
                .iter()
                .map(|id| id.key().to_string())
                .collect()
        })
    }

    pub fn is_already_open(&self, repo_id: &str) -> bool {
        self.open_repositories().contains(&repo_id.trim().to_lowercase())
    }

    /// Fails unless the repository is present or pending.
    pub fn set_default_repo(&self, repo_id: &str) -> bool {
        let Ok(repo_id) = RepoId::parse(repo_id) else {
            return false;
        };
        match self.store.write(|s| s.set_default_repo(&repo_id)) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!("Cannot make {} the default repository: {}", repo_id, e);
                false
            }
        }
    }

    pub fn default_repo(&self) -> Option<RepoId> {
        self.store.read(|s| s.default_repo().cloned())
    }

    pub fn stored_repos(&self) -> BTreeSet<String> {
        self.source.stored_repo_ids()
    }

    pub async fn remove_stored_repository(&self, repo_id: &str) -> bool {
        let Ok(repo_id) = RepoId::parse(repo_id) else {
            return false;
        };
        match self.source.remove_repo(&repo_id).await {
            Ok(removed) => removed,
            Err(e) => {
                tracing::warn!("Failed to remove stored repository {}: {}", repo_id, e);
                false
            }
        }
    }

    /// Drops every present model not named in `in_use`. The default
    /// repository always counts as in use.
    pub fn remove_unused_models(&self, in_use: &HashSet<RepoId>) -> Vec<RepoId> {
        self.store.write(|s| {
            let default = s.default_repo().cloned();
            let unused: Vec<RepoId> = s
                .present_ids()
                .into_iter()
                .filter(|id| !in_use.contains(id) && default.as_ref() != Some(id))
                .collect();
            for id in &unused {
                s.remove_by_id(id);
            }
            unused
        })
    }

    /// While set, [`Logic::refresh`] does nothing, keeping the current view stable.
    pub fn set_refresh_suppressed(&self, suppressed: bool) {
        self.refresh_suppressed.store(suppressed, Ordering::SeqCst);
    }

    pub fn is_refresh_suppressed(&self) -> bool {
        self.refresh_suppressed.load(Ordering::SeqCst)
    }

    pub async fn login(&self, credentials: &Credentials) -> bool {
        match self.source.login(credentials).await {
            Ok(true) => {
                tracing::info!("Logged in as {}", credentials.username);
                self.prefs.set_last_login_username(&credentials.username);
                true
            }
            Ok(false) => {
                tracing::info!("Login rejected for {}", credentials.username);
                false
            }
            Err(e) => {
                tracing::warn!("Login failed: {}", e);
                false
            }
        }
    }

    pub fn rate_limit(&self) -> Option<RateLimit> {
        self.rate_limit.get()
    }

    /// Fetches the remaining quota and forwards it to the presenter.
    pub async fn refresh_rate_limit(&self) -> Option<RateLimit> {
        match self.source.rate_limit_status().await {
            Ok(limit) => {
                tracing::debug!(
                    remaining = limit.remaining,
                    reset = limit.reset_epoch_millis,
                    "Rate limit updated"
                );
                self.rate_limit.set(limit);
                self.presenter.update_rate_limits(limit);
                Some(limit)
            }
            Err(e) => {
                tracing::warn!("Failed to retrieve rate limit: {}", e);
                None
            }
        }
    }

    fn current_user(&self) -> Option<String> {
        self.prefs.last_login_username()
    }
}
