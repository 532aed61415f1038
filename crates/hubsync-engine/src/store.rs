//! Per-repository model cache.
//!
//! Each repository id is in exactly one slot state: absent, pending (an open
//! is in flight) or present with a [`Model`]. Models are held behind `Arc`
//! and edited copy-on-write, so a [`StoreSnapshot`] taken by a reader never
//! observes a model mid-replacement.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use parking_lot::RwLock;
use thiserror::Error;

use crate::model::{Issue, IssueMetadata, Model};
use crate::repo_id::RepoId;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("{0} is not pending")]
    NotPending(RepoId),

    #[error("{0} is neither pending nor present")]
    NotTracked(RepoId),

    #[error("model for {model} cannot be stored under {slot}")]
    MismatchedModel { slot: RepoId, model: RepoId },
}

#[derive(Debug, Clone)]
enum RepoSlot {
    Pending,
    Present(Arc<Model>),
}

#[derive(Debug, Default)]
pub struct ModelStore {
    slots: BTreeMap<RepoId, RepoSlot>,
    default_repo: Option<RepoId>,
}

impl ModelStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks `repo_id` pending. Returns false if it is already pending or present.
    pub fn queue_pending(&mut self, repo_id: &RepoId) -> bool {
        if self.slots.contains_key(repo_id) {
            return false;
        }
        self.slots.insert(repo_id.clone(), RepoSlot::Pending);
        true
    }

    pub fn is_pending(&self, repo_id: &RepoId) -> bool {
        matches!(self.slots.get(repo_id), Some(RepoSlot::Pending))
    }

    pub fn is_present(&self, repo_id: &RepoId) -> bool {
        matches!(self.slots.get(repo_id), Some(RepoSlot::Present(_)))
    }

    pub fn get(&self, repo_id: &RepoId) -> Option<Arc<Model>> {
        match self.slots.get(repo_id) {
            Some(RepoSlot::Present(model)) => Some(Arc::clone(model)),
            _ => None,
        }
    }

    /// Transitions a pending repository to present.
    pub fn add_from_pending(&mut self, repo_id: &RepoId, model: Model) -> Result<(), StoreError> {
        if model.repo_id != *repo_id {
            return Err(StoreError::MismatchedModel {
                slot: repo_id.clone(),
                model: model.repo_id,
            });
        }
        match self.slots.get_mut(repo_id) {
            Some(slot) if matches!(slot, RepoSlot::Pending) => {
                *slot = RepoSlot::Present(Arc::new(model));
                Ok(())
            }
            _ => Err(StoreError::NotPending(repo_id.clone())),
        }
    }

    /// Forgets a pending repository whose open did not complete.
    pub fn drop_pending(&mut self, repo_id: &RepoId) -> bool {
        if !self.is_pending(repo_id) {
            return false;
        }
        self.slots.remove(repo_id);
        self.clear_default_if(repo_id);
        true
    }

    /// Swaps every present model for `models`; pending entries are untouched.
    ///
    /// A model for an id that is currently pending is skipped, since that
    /// repository's open owns the transition to present.
    pub fn replace_all<M: Into<Arc<Model>>>(&mut self, models: impl IntoIterator<Item = M>) {
        self.slots.retain(|_, slot| matches!(slot, RepoSlot::Pending));
        for model in models {
            let model = model.into();
            if self.slots.contains_key(&model.repo_id) {
                tracing::debug!("Skipping replacement for pending {}", model.repo_id);
                continue;
            }
            self.slots
                .insert(model.repo_id.clone(), RepoSlot::Present(model));
        }
        if let Some(default) = self.default_repo.clone() {
            if !self.slots.contains_key(&default) {
                self.default_repo = None;
            }
        }
    }

    /// Merges metadata into the named repository's issues.
    ///
    /// Returns the number of issues updated; zero if the repository is not present.
    pub fn insert_metadata(
        &mut self,
        repo_id: &RepoId,
        metadata: &HashMap<u64, IssueMetadata>,
        current_user: Option<&str>,
    ) -> usize {
        match self.slots.get_mut(repo_id) {
            Some(RepoSlot::Present(model)) => {
                Arc::make_mut(model).insert_metadata(metadata, current_user)
            }
            _ => 0,
        }
    }

    /// Applies `edit` to one cached issue, returning its result if the issue exists.
    pub fn update_issue<R>(
        &mut self,
        repo_id: &RepoId,
        issue_id: u64,
        edit: impl FnOnce(&mut Issue) -> R,
    ) -> Option<R> {
        match self.slots.get_mut(repo_id) {
            Some(RepoSlot::Present(model)) => Arc::make_mut(model).issue_mut(issue_id).map(edit),
            _ => None,
        }
    }

    /// Removes a present model. Pending and absent ids are left alone.
    pub fn remove_by_id(&mut self, repo_id: &RepoId) -> bool {
        if !self.is_present(repo_id) {
            return false;
        }
        self.slots.remove(repo_id);
        self.clear_default_if(repo_id);
        true
    }

    pub fn set_default_repo(&mut self, repo_id: &RepoId) -> Result<(), StoreError> {
        if !self.slots.contains_key(repo_id) {
            return Err(StoreError::NotTracked(repo_id.clone()));
        }
        self.default_repo = Some(repo_id.clone());
        Ok(())
    }

    pub fn default_repo(&self) -> Option<&RepoId> {
        self.default_repo.as_ref()
    }

    pub fn present_ids(&self) -> Vec<RepoId> {
        self.models().map(|m| m.repo_id.clone()).collect()
    }

    pub fn models(&self) -> impl Iterator<Item = &Arc<Model>> {
        self.slots.values().filter_map(|slot| match slot {
            RepoSlot::Present(model) => Some(model),
            RepoSlot::Pending => None,
        })
    }

    pub fn snapshot(&self) -> StoreSnapshot {
        StoreSnapshot {
            models: self.models().cloned().collect(),
            default_repo: self.default_repo.clone(),
        }
    }

    fn clear_default_if(&mut self, repo_id: &RepoId) {
        if self.default_repo.as_ref() == Some(repo_id) {
            self.default_repo = None;
        }
    }
}

/// Immutable view of the present models at one instant.
#[derive(Debug, Clone, Default)]
pub struct StoreSnapshot {
    models: Vec<Arc<Model>>,
    default_repo: Option<RepoId>,
}

impl StoreSnapshot {
    pub fn models(&self) -> &[Arc<Model>] {
        &self.models
    }

    pub fn get(&self, repo_id: &RepoId) -> Option<&Model> {
        self.models
            .iter()
            .find(|m| m.repo_id == *repo_id)
            .map(|m| m.as_ref())
    }

    pub fn default_repo(&self) -> Option<&RepoId> {
        self.default_repo.as_ref()
    }

    /// All cached issues, grouped by repository in id order.
    pub fn issues(&self) -> impl Iterator<Item = &Issue> {
        self.models.iter().flat_map(|m| m.issues.iter())
    }
}

/// Cloneable handle that serializes every mutation of a [`ModelStore`].
///
/// The closure-based API keeps locks from being held across an `.await`.
#[derive(Debug, Clone, Default)]
pub struct SharedStore {
    inner: Arc<RwLock<ModelStore>>,
}

impl SharedStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn read<R>(&self, f: impl FnOnce(&ModelStore) -> R) -> R {
        f(&self.inner.read())
    }

    pub fn write<R>(&self, f: impl FnOnce(&mut ModelStore) -> R) -> R {
        f(&mut self.inner.write())
    }

    pub fn snapshot(&self) -> StoreSnapshot {
        self.inner.read().snapshot()
    }
}
