//! Filter expression trees, as produced by the (external) filter text parser.

use crate::repo_id::RepoId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IssueState {
    Open,
    Closed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SortField {
    Id,
    Title,
    Created,
    /// Non-self update time when the expression also has an `updated`
    /// qualifier, raw update time otherwise.
    Updated,
    Assignee,
    Milestone,
    State,
    Comments,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SortKey {
    pub field: SortField,
    pub descending: bool,
}

impl SortKey {
    pub fn asc(field: SortField) -> Self {
        Self {
            field,
            descending: false,
        }
    }

    pub fn desc(field: SortField) -> Self {
        Self {
            field,
            descending: true,
        }
    }
}

/// A single predicate node.
///
/// `Repo`, `Sort` and `Updated` are meta-qualifiers: they scope, order or
/// request metadata rather than test an issue's content.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Qualifier {
    Repo(RepoId),
    Sort(Vec<SortKey>),
    /// Requires non-self update metadata; optionally only issues updated
    /// within the last N hours.
    Updated(Option<u32>),

    Keyword(String),
    Title(String),
    Body(String),
    Label(String),
    Milestone(String),
    Assignee(String),
    Author(String),
    State(IssueState),
    Read(bool),
    Id(u64),
    CreatedWithinDays(u32),
}

impl Qualifier {
    pub fn is_meta(&self) -> bool {
        matches!(
            self,
            Qualifier::Repo(_) | Qualifier::Sort(_) | Qualifier::Updated(_)
        )
    }
}

/// Immutable boolean tree of qualifiers. Compared and hashed by value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub enum FilterExpression {
    /// Matches everything in scope
    #[default]
    Empty,
    Qualifier(Qualifier),
    And(Box<FilterExpression>, Box<FilterExpression>),
    Or(Box<FilterExpression>, Box<FilterExpression>),
    Not(Box<FilterExpression>),
}

impl From<Qualifier> for FilterExpression {
    fn from(qualifier: Qualifier) -> Self {
        FilterExpression::Qualifier(qualifier)
    }
}

impl FilterExpression {
    pub fn and(self, other: impl Into<FilterExpression>) -> Self {
        FilterExpression::And(Box::new(self), Box::new(other.into()))
    }

    pub fn or(self, other: impl Into<FilterExpression>) -> Self {
        FilterExpression::Or(Box::new(self), Box::new(other.into()))
    }

    #[allow(clippy::should_implement_trait)]
    pub fn not(self) -> Self {
        FilterExpression::Not(Box::new(self))
    }

    /// All qualifiers matching `pred`, left to right.
    pub fn find(&self, pred: impl Fn(&Qualifier) -> bool) -> Vec<&Qualifier> {
        let mut found = Vec::new();
        self.collect(&pred, &mut found);
        found
    }

    fn collect<'a>(&'a self, pred: &dyn Fn(&Qualifier) -> bool, out: &mut Vec<&'a Qualifier>) {
        match self {
            FilterExpression::Empty => {}
            FilterExpression::Qualifier(q) => {
                if pred(q) {
                    out.push(q);
                }
            }
            FilterExpression::And(left, right) | FilterExpression::Or(left, right) => {
                left.collect(pred, out);
                right.collect(pred, out);
            }
            FilterExpression::Not(inner) => inner.collect(pred, out),
        }
    }

    pub fn meta_qualifiers(&self) -> Vec<&Qualifier> {
        self.find(Qualifier::is_meta)
    }

    pub fn has_updated_qualifier(&self) -> bool {
        !self.find(|q| matches!(q, Qualifier::Updated(_))).is_empty()
    }

    /// Repositories named by `repo` qualifiers.
    pub fn repo_ids(&self) -> Vec<&RepoId> {
        self.find(|q| matches!(q, Qualifier::Repo(_)))
            .into_iter()
            .filter_map(|q| match q {
                Qualifier::Repo(id) => Some(id),
                _ => None,
            })
            .collect()
    }

    /// Keys of the first `sort` qualifier, if any.
    pub fn first_sort_keys(&self) -> Option<&[SortKey]> {
        self.meta_qualifiers().into_iter().find_map(|q| match q {
            Qualifier::Sort(keys) => Some(keys.as_slice()),
            _ => None,
        })
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;

    #[test]
    fn test_find_is_declaration_order() {
        let expr = FilterExpression::from(Qualifier::Sort(vec![SortKey::asc(SortField::Title)]))
            .and(Qualifier::Label("bug".into()))
            .or(FilterExpression::from(Qualifier::Sort(vec![SortKey::desc(SortField::Id)])).not());

        let metas = expr.meta_qualifiers();
        assert_eq!(metas.len(), 2);
        assert_eq!(
            expr.first_sort_keys(),
            Some([SortKey::asc(SortField::Title)].as_slice())
        );
    }

    #[test]
    fn test_repo_ids() {
        let a = RepoId::parse("a/b").unwrap();
        let expr = FilterExpression::from(Qualifier::Repo(a.clone()))
            .or(Qualifier::Repo(RepoId::parse("C/D").unwrap()));
        let ids = expr.repo_ids();
        assert_eq!(ids.len(), 2);
        assert_eq!(ids[0], &a);
    }

    #[test]
    fn test_has_updated_qualifier_inside_negation() {
        let expr = FilterExpression::from(Qualifier::Updated(Some(24))).not();
        assert!(expr.has_updated_qualifier());
        assert!(!FilterExpression::Empty.has_updated_qualifier());
    }

    #[test]
    fn test_equal_expressions_hash_alike() {
        use std::collections::HashSet;
        let make = || FilterExpression::from(Qualifier::Label("bug".into())).and(Qualifier::Read(false));
        let set: HashSet<_> = [make(), make()].into_iter().collect();
        assert_eq!(set.len(), 1);
    }
}
