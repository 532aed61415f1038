//! Two-phase filter pipeline.
//!
//! Phase A ([`FilterEngine::tally`]) finds, per repository, the issues whose
//! panels need non-self update metadata. Once that metadata is merged,
//! phase B ([`FilterEngine::filter_and_sort`]) produces each expression's
//! sorted result list.

pub mod eval;
pub mod expression;
pub mod sort;

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use chrono::{DateTime, Utc};

pub use eval::{matches, EvalContext, EvalMode};
pub use expression::{FilterExpression, IssueState, Qualifier, SortField, SortKey};
pub use sort::SortOrder;

use crate::model::Issue;
use crate::repo_id::RepoId;
use crate::store::StoreSnapshot;

/// Sorted issues for one expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterResult {
    pub issues: Vec<Issue>,
    /// The expression carried an `updated` qualifier
    pub uses_updated: bool,
}

pub type FilterResults = HashMap<FilterExpression, FilterResult>;

#[derive(Debug, Clone, Copy, Default)]
pub struct FilterEngine;

impl FilterEngine {
    pub fn new() -> Self {
        Self
    }

    /// Every repository named by a `repo` qualifier in `expressions`.
    pub fn repos_to_open(&self, expressions: &[FilterExpression]) -> BTreeSet<RepoId> {
        expressions
            .iter()
            .flat_map(|expr| expr.repo_ids())
            .cloned()
            .collect()
    }

    /// Phase A: issues matched by expressions with an `updated` qualifier,
    /// grouped by repository, each issue listed once.
    pub fn tally(
        &self,
        expressions: &[FilterExpression],
        snapshot: &StoreSnapshot,
        now: DateTime<Utc>,
    ) -> BTreeMap<RepoId, Vec<Issue>> {
        let ctx = EvalContext::new(now, snapshot.default_repo(), EvalMode::Tally);
        let mut seen: HashSet<(RepoId, u64)> = HashSet::new();
        let mut to_update: BTreeMap<RepoId, Vec<Issue>> = BTreeMap::new();

        for expr in expressions.iter().filter(|e| e.has_updated_qualifier()) {
            for issue in snapshot.issues().filter(|issue| matches(expr, issue, &ctx)) {
                if seen.insert((issue.repo_id.clone(), issue.id)) {
                    to_update
                        .entry(issue.repo_id.clone())
                        .or_default()
                        .push(issue.clone());
                }
            }
        }

        to_update
    }

    /// Phase B: filter and sort every distinct expression once.
    pub fn filter_and_sort(
        &self,
        expressions: &[FilterExpression],
        snapshot: &StoreSnapshot,
        now: DateTime<Utc>,
    ) -> FilterResults {
        let ctx = EvalContext::new(now, snapshot.default_repo(), EvalMode::Full);
        let mut results = FilterResults::new();

        for expr in expressions {
            if results.contains_key(expr) {
                continue;
            }
            let mut issues: Vec<Issue> = snapshot
                .issues()
                .filter(|issue| matches(expr, issue, &ctx))
                .cloned()
                .collect();
            SortOrder::for_expression(expr).sort(&mut issues);

            results.insert(
                expr.clone(),
                FilterResult {
                    issues,
                    uses_updated: expr.has_updated_qualifier(),
                },
            );
        }

        results
    }
}
