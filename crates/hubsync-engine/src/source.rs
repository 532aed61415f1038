//! Boundary to the remote issue tracker.

use std::collections::{BTreeSet, HashMap};

use async_trait::async_trait;
use hubsync_core::SourceError;

use crate::model::{Issue, Model, RawMetadata};
use crate::rate_limit::RateLimit;
use crate::repo_id::RepoId;

pub type SourceResult<T> = Result<T, SourceError>;

/// Login credentials handed to [`RemoteSource::login`].
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub secret: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            secret: secret.into(),
        }
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("secret", &"<redacted>")
            .finish()
    }
}

/// A repository data source. Implementations perform the network calls;
/// the engine never assumes a wire format.
#[async_trait]
pub trait RemoteSource: Send + Sync {
    async fn is_valid(&self, repo_id: &RepoId) -> SourceResult<bool>;

    async fn fetch_full(&self, repo_id: &RepoId) -> SourceResult<Model>;

    /// Incremental refresh; returns the replacement snapshot.
    async fn refresh(&self, model: &Model) -> SourceResult<Model>;

    async fn fetch_metadata(
        &self,
        repo_id: &RepoId,
        issues: &[Issue],
    ) -> SourceResult<HashMap<u64, RawMetadata>>;

    async fn replace_labels(&self, issue: &Issue, labels: &[String]) -> SourceResult<()>;

    async fn edit_state(&self, repo_id: &RepoId, issue_id: u64, open: bool) -> SourceResult<bool>;

    async fn login(&self, credentials: &Credentials) -> SourceResult<bool>;

    async fn rate_limit_status(&self) -> SourceResult<RateLimit>;

    /// Repositories the source has data for.
    fn stored_repo_ids(&self) -> BTreeSet<String>;

    async fn remove_repo(&self, repo_id: &RepoId) -> SourceResult<bool>;
}
