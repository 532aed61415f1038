//! Predicate evaluation of a [`FilterExpression`] against one issue.

use chrono::{DateTime, Duration, Utc};

use super::expression::{FilterExpression, IssueState, Qualifier};
use crate::model::Issue;
use crate::repo_id::RepoId;

/// Whether metadata may be consulted.
///
/// The tally pass runs before metadata has been fetched, so `updated` falls
/// back to the raw update time there.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvalMode {
    Tally,
    Full,
}

#[derive(Debug, Clone, Copy)]
pub struct EvalContext<'a> {
    pub now: DateTime<Utc>,
    pub default_repo: Option<&'a RepoId>,
    pub mode: EvalMode,
}

impl<'a> EvalContext<'a> {
    pub fn new(now: DateTime<Utc>, default_repo: Option<&'a RepoId>, mode: EvalMode) -> Self {
        Self {
            now,
            default_repo,
            mode,
        }
    }
}

/// Evaluates `expr` against `issue`, including implicit default-repo scoping.
pub fn matches(expr: &FilterExpression, issue: &Issue, ctx: &EvalContext<'_>) -> bool {
    if expr.repo_ids().is_empty() {
        if let Some(default_repo) = ctx.default_repo {
            if issue.repo_id != *default_repo {
                return false;
            }
        }
    }
    eval(expr, issue, ctx)
}

fn eval(expr: &FilterExpression, issue: &Issue, ctx: &EvalContext<'_>) -> bool {
    match expr {
        FilterExpression::Empty => true,
        FilterExpression::Qualifier(q) => eval_qualifier(q, issue, ctx),
        FilterExpression::And(left, right) => eval(left, issue, ctx) && eval(right, issue, ctx),
        FilterExpression::Or(left, right) => eval(left, issue, ctx) || eval(right, issue, ctx),
        FilterExpression::Not(inner) => !eval(inner, issue, ctx),
    }
}

fn eval_qualifier(qualifier: &Qualifier, issue: &Issue, ctx: &EvalContext<'_>) -> bool {
    match qualifier {
        Qualifier::Repo(repo_id) => issue.repo_id == *repo_id,
        Qualifier::Sort(_) => true,
        Qualifier::Updated(None) => true,
        Qualifier::Updated(Some(hours)) => {
            let updated = match ctx.mode {
                EvalMode::Tally => issue.updated_at,
                EvalMode::Full => issue.non_self_updated_at(),
            };
            within(updated, ctx.now, Duration::try_hours(i64::from(*hours)))
        }
        Qualifier::Keyword(text) => contains_ci(&issue.title, text) || contains_ci(&issue.body, text),
        Qualifier::Title(text) => contains_ci(&issue.title, text),
        Qualifier::Body(text) => contains_ci(&issue.body, text),
        Qualifier::Label(name) => issue.has_label(name),
        Qualifier::Milestone(title) => eq_ci(issue.milestone.as_deref(), title),
        Qualifier::Assignee(login) => eq_ci(issue.assignee.as_deref(), login),
        Qualifier::Author(login) => issue.author.eq_ignore_ascii_case(login),
        Qualifier::State(IssueState::Open) => issue.is_open,
        Qualifier::State(IssueState::Closed) => !issue.is_open,
        Qualifier::Read(read) => issue.is_read == *read,
        Qualifier::Id(id) => issue.id == *id,
        Qualifier::CreatedWithinDays(days) => {
            within(issue.created_at, ctx.now, Duration::try_days(i64::from(*days)))
        }
    }
}

/// A window reaching past chrono's range has no lower bound.
fn within(moment: DateTime<Utc>, now: DateTime<Utc>, window: Option<Duration>) -> bool {
    match window.and_then(|w| now.checked_sub_signed(w)) {
        Some(cutoff) => moment >= cutoff,
        None => true,
    }
}

fn contains_ci(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

fn eq_ci(value: Option<&str>, expected: &str) -> bool {
    value.is_some_and(|v| v.eq_ignore_ascii_case(expected))
}
