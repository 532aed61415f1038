//! Wire payloads to engine model types.

use chrono::{DateTime, Utc};
use hubsync_engine::{Activity, Issue, Label, Milestone, Model, RawMetadata, RepoId, User};

use crate::types::{
    GitHubComment, GitHubEvent, GitHubIssue, GitHubLabel, GitHubMilestone, GitHubUser,
};

/// Login shown for content whose author account is gone.
pub const GHOST_LOGIN: &str = "ghost";

pub fn issue(repo_id: &RepoId, wire: GitHubIssue) -> Issue {
    Issue {
        repo_id: repo_id.clone(),
        id: wire.number,
        title: wire.title,
        body: wire.body.unwrap_or_default(),
        author: wire
            .user
            .map(|u| u.login)
            .unwrap_or_else(|| GHOST_LOGIN.to_string()),
        labels: wire.labels.into_iter().map(|l| l.name).collect(),
        milestone: wire.milestone.map(|m| m.title),
        assignee: wire.assignee.map(|u| u.login),
        is_open: wire.state.eq_ignore_ascii_case("open"),
        is_read: false,
        comment_count: wire.comments,
        created_at: wire.created_at,
        updated_at: wire.updated_at,
        metadata: None,
    }
}

/// Issues only; the issues endpoint also returns pull requests.
pub fn issues(repo_id: &RepoId, wire: Vec<GitHubIssue>) -> Vec<Issue> {
    wire.into_iter()
        .filter(|i| !i.is_pull_request())
        .map(|i| issue(repo_id, i))
        .collect()
}

pub fn label(wire: GitHubLabel) -> Label {
    Label {
        name: wire.name,
        color: wire.color,
    }
}

pub fn milestone(wire: GitHubMilestone) -> Milestone {
    Milestone {
        id: wire.number,
        title: wire.title,
        is_open: wire.state.eq_ignore_ascii_case("open"),
        due_on: wire.due_on,
    }
}

pub fn user(wire: GitHubUser) -> User {
    User {
        login: wire.login,
        name: wire.name,
    }
}

pub fn raw_metadata(comments: Vec<GitHubComment>, events: Vec<GitHubEvent>) -> RawMetadata {
    RawMetadata {
        comments: comments
            .into_iter()
            .map(|c| activity(c.user, c.created_at))
            .collect(),
        events: events
            .into_iter()
            .map(|e| activity(e.actor, e.created_at))
            .collect(),
    }
}

fn activity(actor: Option<GitHubUser>, at: DateTime<Utc>) -> Activity {
    Activity::new(
        actor
            .map(|u| u.login)
            .unwrap_or_else(|| GHOST_LOGIN.to_string()),
        at,
    )
}

/// Folds issues changed since `previous` was fetched into a copy of it.
///
/// Metadata survives only on issues whose update time did not move.
pub fn merge_issues(previous: &Model, changed: Vec<Issue>) -> Vec<Issue> {
    let mut merged = previous.issues.clone();
    for mut fresh in changed {
        match merged.iter_mut().find(|i| i.id == fresh.id) {
            Some(existing) => {
                if existing.updated_at == fresh.updated_at {
                    fresh.metadata = existing.metadata.take();
                }
                *existing = fresh;
            }
            None => merged.push(fresh),
        }
    }
    merged
}
