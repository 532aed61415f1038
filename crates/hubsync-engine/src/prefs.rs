//! Session preferences the engine reads and records.
//!
//! Persisting them is the caller's business; [`MemoryPreferences`] keeps them
//! for the lifetime of the process.

use parking_lot::RwLock;

use crate::repo_id::RepoId;

pub trait Preferences: Send + Sync {
    fn set_last_viewed_repository(&self, repo_id: &RepoId);

    fn last_viewed_repository(&self) -> Option<RepoId>;

    /// Identity excluded from non-self update computation.
    fn last_login_username(&self) -> Option<String>;

    fn set_last_login_username(&self, username: &str);
}

#[derive(Debug, Default)]
pub struct MemoryPreferences {
    last_viewed: RwLock<Option<RepoId>>,
    last_login: RwLock<Option<String>>,
}

impl MemoryPreferences {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_login(username: impl Into<String>) -> Self {
        Self {
            last_viewed: RwLock::new(None),
            last_login: RwLock::new(Some(username.into())),
        }
    }
}

impl Preferences for MemoryPreferences {
    fn set_last_viewed_repository(&self, repo_id: &RepoId) {
        *self.last_viewed.write() = Some(repo_id.clone());
    }

    fn last_viewed_repository(&self) -> Option<RepoId> {
        self.last_viewed.read().clone()
    }

    fn last_login_username(&self) -> Option<String> {
        self.last_login.read().clone()
    }

    fn set_last_login_username(&self, username: &str) {
        *self.last_login.write() = Some(username.to_string());
    }
}
