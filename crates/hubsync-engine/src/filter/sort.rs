//! Comparator selection and compound sort keys.

use std::cmp::Ordering;

use super::expression::{FilterExpression, SortField, SortKey};
use crate::model::Issue;

/// Compiled ordering for one expression's result list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortOrder {
    keys: Vec<SortKey>,
    /// `Updated` keys compare non-self update times
    non_self_updates: bool,
}

impl SortOrder {
    /// Picks the ordering for `expr`:
    /// the first `sort` qualifier in declaration order, else newest non-self
    /// update first when an `updated` qualifier is present, else highest id first.
    pub fn for_expression(expr: &FilterExpression) -> Self {
        let has_updated = expr.has_updated_qualifier();
        let keys = match expr.first_sort_keys() {
            Some(keys) => keys.to_vec(),
            None if has_updated => vec![SortKey::desc(SortField::Updated)],
            None => vec![SortKey::desc(SortField::Id)],
        };
        Self {
            keys,
            non_self_updates: has_updated,
        }
    }

    pub fn keys(&self) -> &[SortKey] {
        &self.keys
    }

    /// Compares by each key in turn, then ascending id and repository.
    pub fn compare(&self, a: &Issue, b: &Issue) -> Ordering {
        self.keys
            .iter()
            .map(|key| {
                let ordering = self.compare_field(key.field, a, b);
                if key.descending {
                    ordering.reverse()
                } else {
                    ordering
                }
            })
            .find(|ordering| ordering.is_ne())
            .unwrap_or_else(|| a.id.cmp(&b.id).then_with(|| a.repo_id.cmp(&b.repo_id)))
    }

    pub fn sort(&self, issues: &mut [Issue]) {
        issues.sort_by(|a, b| self.compare(a, b));
    }

    fn compare_field(&self, field: SortField, a: &Issue, b: &Issue) -> Ordering {
        match field {
            SortField::Id => a.id.cmp(&b.id),
            SortField::Title => a.title.to_lowercase().cmp(&b.title.to_lowercase()),
            SortField::Created => a.created_at.cmp(&b.created_at),
            SortField::Updated if self.non_self_updates => {
                a.non_self_updated_at().cmp(&b.non_self_updated_at())
            }
            SortField::Updated => a.updated_at.cmp(&b.updated_at),
            SortField::Assignee => cmp_optional_ci(a.assignee.as_deref(), b.assignee.as_deref()),
            SortField::Milestone => {
                cmp_optional_ci(a.milestone.as_deref(), b.milestone.as_deref())
            }
            // Open issues first
            SortField::State => b.is_open.cmp(&a.is_open),
            SortField::Comments => a.comment_count.cmp(&b.comment_count),
        }
    }
}

/// Present values sort before missing ones, case-insensitively.
fn cmp_optional_ci(a: Option<&str>, b: Option<&str>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.to_lowercase().cmp(&b.to_lowercase()),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}
