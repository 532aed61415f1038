//! Cached snapshot types: one [`Model`] per open repository.

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use crate::repo_id::RepoId;

/// Repository label
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Label {
    pub name: String,
    /// Hex color without `#`
    pub color: String,
}

/// Repository milestone
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Milestone {
    pub id: u64,
    pub title: String,
    pub is_open: bool,
    pub due_on: Option<DateTime<Utc>>,
}

/// A user who can be assigned issues
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub login: String,
    pub name: Option<String>,
}

/// A single comment or timeline event on an issue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Activity {
    pub actor: String,
    pub created_at: DateTime<Utc>,
}

impl Activity {
    pub fn new(actor: impl Into<String>, created_at: DateTime<Utc>) -> Self {
        Self {
            actor: actor.into(),
            created_at,
        }
    }
}

/// Raw per-issue activity as returned by a repository source.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawMetadata {
    pub comments: Vec<Activity>,
    pub events: Vec<Activity>,
}

/// Derived issue data: the latest activity not authored by the current user.
///
/// Always rebuilt from the full raw activity, never patched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssueMetadata {
    pub comments: Vec<Activity>,
    pub events: Vec<Activity>,
    pub non_self_updated_at: Option<DateTime<Utc>>,
    /// Login the non-self computation excluded, if any
    pub computed_for: Option<String>,
}

impl IssueMetadata {
    /// Computes metadata from raw activity, excluding `current_user`'s own actions.
    pub fn full(raw: RawMetadata, current_user: Option<&str>) -> Self {
        let non_self_updated_at = raw
            .comments
            .iter()
            .chain(raw.events.iter())
            .filter(|activity| !is_same_user(&activity.actor, current_user))
            .map(|activity| activity.created_at)
            .max();

        Self {
            comments: raw.comments,
            events: raw.events,
            non_self_updated_at,
            computed_for: current_user.map(str::to_string),
        }
    }

    /// Recomputes against a (possibly different) current user.
    pub fn recomputed(&self, current_user: Option<&str>) -> Self {
        Self::full(
            RawMetadata {
                comments: self.comments.clone(),
                events: self.events.clone(),
            },
            current_user,
        )
    }
}

fn is_same_user(actor: &str, current_user: Option<&str>) -> bool {
    current_user.is_some_and(|user| actor.eq_ignore_ascii_case(user))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Issue {
    pub repo_id: RepoId,
    /// Issue number, unique within the repository
    pub id: u64,
    pub title: String,
    pub body: String,
    pub author: String,
    pub labels: Vec<String>,
    pub milestone: Option<String>,
    pub assignee: Option<String>,
    pub is_open: bool,
    pub is_read: bool,
    pub comment_count: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub metadata: Option<IssueMetadata>,
}

impl Issue {
    /// Latest activity by someone other than the current user.
    ///
    /// Without metadata this is the raw update time. With metadata but no
    /// foreign activity, the issue has not changed for us since creation.
    pub fn non_self_updated_at(&self) -> DateTime<Utc> {
        match &self.metadata {
            Some(metadata) => metadata.non_self_updated_at.unwrap_or(self.created_at),
            None => self.updated_at,
        }
    }

    pub fn has_label(&self, name: &str) -> bool {
        self.labels.iter().any(|l| l.eq_ignore_ascii_case(name))
    }
}

impl std::fmt::Display for Issue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{} {}", self.id, self.title)
    }
}

/// Snapshot of one repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Model {
    pub repo_id: RepoId,
    pub issues: Vec<Issue>,
    pub labels: Vec<Label>,
    pub milestones: Vec<Milestone>,
    pub users: Vec<User>,
    /// When the source produced this snapshot
    pub fetched_at: DateTime<Utc>,
}

impl Model {
    pub fn empty(repo_id: RepoId) -> Self {
        Self {
            repo_id,
            issues: Vec::new(),
            labels: Vec::new(),
            milestones: Vec::new(),
            users: Vec::new(),
            fetched_at: Utc::now(),
        }
    }

    pub fn issue(&self, id: u64) -> Option<&Issue> {
        self.issues.iter().find(|i| i.id == id)
    }

    pub fn issue_mut(&mut self, id: u64) -> Option<&mut Issue> {
        self.issues.iter_mut().find(|i| i.id == id)
    }

    /// Replaces metadata on every issue named in `metadata`; unknown ids are ignored.
    ///
    /// Returns how many issues were updated.
    pub fn insert_metadata(
        &mut self,
        metadata: &HashMap<u64, IssueMetadata>,
        current_user: Option<&str>,
    ) -> usize {
        let mut updated = 0;
        for issue in &mut self.issues {
            if let Some(entry) = metadata.get(&issue.id) {
                issue.metadata = Some(entry.recomputed(current_user));
                updated += 1;
            }
        }
        updated
    }
}
