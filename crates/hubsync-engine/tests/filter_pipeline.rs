//! Filter, metadata and sort pipeline driven through `Logic`.
#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use std::sync::atomic::Ordering;

use common::{
    harness, hours_ago, issue, model, published_ids, repo, FakeSource, RecordingPresenter,
    CURRENT_USER,
};
use hubsync_engine::{
    Activity, FilterExpression, FilterResults, Issue, Preferences, Qualifier, RawMetadata,
    SortField, SortKey,
};

fn issue_updated(repo_id: &str, id: u64, hours: i64) -> Issue {
    let mut issue = issue(repo_id, id, &[]);
    issue.updated_at = hours_ago(hours);
    issue
}

/// Issue 1 was last touched by the current user only, issue 2 by alice two
/// hours ago, issue 3 by bob three hours ago.
fn source_with_activity() -> FakeSource {
    let source = FakeSource::new().with_repo(model(
        "a/b",
        vec![
            issue_updated("a/b", 1, 1),
            issue_updated("a/b", 2, 2),
            issue_updated("a/b", 3, 3),
        ],
    ));
    source.set_metadata(
        1,
        RawMetadata {
            comments: vec![Activity::new(CURRENT_USER, hours_ago(1))],
            events: vec![],
        },
    );
    source.set_metadata(
        2,
        RawMetadata {
            comments: vec![Activity::new("alice", hours_ago(2))],
            events: vec![],
        },
    );
    source.set_metadata(
        3,
        RawMetadata {
            comments: vec![],
            events: vec![Activity::new("bob", hours_ago(3))],
        },
    );
    source
}

fn ids(results: &FilterResults, expr: &FilterExpression) -> Vec<u64> {
    results[expr].issues.iter().map(|i| i.id).collect()
}

#[tokio::test]
async fn test_repo_qualifier_opens_repository_once_as_secondary() {
    let h = harness(
        FakeSource::new().with_repo(model("a/b", vec![issue("a/b", 1, &[])])),
        RecordingPresenter::default(),
    );
    let expr = FilterExpression::from(Qualifier::Repo(repo("A/B")));

    let first = h.logic.filter_sort_refresh(&[expr.clone()]).await;
    let second = h.logic.filter_sort_refresh(&[expr.clone()]).await;

    assert_eq!(ids(&first, &expr), vec![1]);
    assert_eq!(ids(&second, &expr), vec![1]);
    assert_eq!(FakeSource::calls(&h.source.valid_calls), 1);
    assert_eq!(FakeSource::calls(&h.source.fetch_calls), 1);
    assert_eq!(h.logic.default_repo(), None);
    assert!(h.prefs.last_viewed_repository().is_none());
}

#[tokio::test]
async fn test_unknown_repo_qualifier_yields_empty_result() {
    let h = harness(FakeSource::new(), RecordingPresenter::default());
    let expr = FilterExpression::from(Qualifier::Repo(repo("ghost/repo")));

    let results = h.logic.filter_sort_refresh(&[expr.clone()]).await;

    assert!(results[&expr].issues.is_empty());
    assert!(!h.logic.is_pending("ghost/repo"));
}

#[tokio::test]
async fn test_updated_orders_by_non_self_activity() {
    let h = harness(source_with_activity(), RecordingPresenter::default());
    assert!(h.logic.open_primary_repository("a/b").await);

    let updated = FilterExpression::from(Qualifier::Updated(None));
    let plain = FilterExpression::from(Qualifier::State(hubsync_engine::IssueState::Open));
    let explicit = FilterExpression::from(Qualifier::Updated(None))
        .and(Qualifier::Sort(vec![SortKey::asc(SortField::Id)]));

    let results = h
        .logic
        .filter_sort_refresh(&[updated.clone(), plain.clone(), explicit.clone()])
        .await;

    assert_eq!(ids(&results, &updated), vec![2, 3, 1]);
    assert_eq!(ids(&results, &plain), vec![3, 2, 1]);
    assert_eq!(ids(&results, &explicit), vec![1, 2, 3]);
    assert!(results[&updated].uses_updated);
    assert!(!results[&plain].uses_updated);
}

#[tokio::test]
async fn test_metadata_requested_only_for_tallied_issues() {
    let source = source_with_activity();
    source.set_remote(model(
        "a/b",
        vec![
            issue_updated("a/b", 1, 1),
            issue_updated("a/b", 2, 2),
            issue_updated("a/b", 3, 3),
            issue_updated("a/b", 4, 100),
        ],
    ));
    let h = harness(source, RecordingPresenter::default());
    assert!(h.logic.open_primary_repository("a/b").await);

    let day = FilterExpression::from(Qualifier::Updated(Some(24)));
    let results = h
        .logic
        .filter_sort_refresh(&[day.clone(), day.clone()])
        .await;

    assert_eq!(
        h.source.metadata_requests(),
        vec![(repo("a/b"), vec![1, 2, 3])]
    );
    // Issue 1 only changed through the current user's own activity.
    assert_eq!(ids(&results, &day), vec![2, 3]);
    assert_eq!(results.len(), 1);
}

#[tokio::test]
async fn test_metadata_round_reports_status_and_rate_limit() {
    let h = harness(source_with_activity(), RecordingPresenter::default());
    assert!(h.logic.open_primary_repository("a/b").await);
    let rate_calls = FakeSource::calls(&h.source.rate_calls);
    let rate_limits = h.presenter.rate_limits().len();
    let status_before = h.status.messages().len();

    let updated = FilterExpression::from(Qualifier::Updated(None));
    h.logic.filter_sort_refresh(&[updated]).await;

    assert_eq!(h.source.metadata_requests().len(), 1);
    assert_eq!(FakeSource::calls(&h.source.rate_calls), rate_calls + 1);
    assert_eq!(h.presenter.rate_limits().len(), rate_limits + 1);
    assert_eq!(
        h.status.messages()[status_before..].to_vec(),
        vec![
            "Getting metadata for a/b...".to_string(),
            "Received metadata from a/b!".to_string(),
        ]
    );
}

#[tokio::test]
async fn test_no_updated_qualifier_means_no_metadata_round() {
    let h = harness(source_with_activity(), RecordingPresenter::default());
    assert!(h.logic.open_primary_repository("a/b").await);
    let rate_calls = FakeSource::calls(&h.source.rate_calls);

    let expr = FilterExpression::from(Qualifier::Id(2));
    let results = h.logic.filter_sort_refresh(&[expr.clone()]).await;

    assert_eq!(ids(&results, &expr), vec![2]);
    assert!(h.source.metadata_requests().is_empty());
    assert_eq!(FakeSource::calls(&h.source.rate_calls), rate_calls);
}

#[tokio::test]
async fn test_metadata_failure_still_publishes() {
    let source = source_with_activity();
    source.fail_metadata.store(true, Ordering::SeqCst);
    let h = harness(source, RecordingPresenter::default());
    assert!(h.logic.open_primary_repository("a/b").await);
    let publishes = h.presenter.publish_count();

    let updated = FilterExpression::from(Qualifier::Updated(None));
    let results = h.logic.filter_sort_refresh(&[updated.clone()]).await;

    // Without metadata the raw update time decides.
    assert_eq!(ids(&results, &updated), vec![1, 2, 3]);
    assert_eq!(h.presenter.publish_count(), publishes + 1);
    assert_eq!(published_ids(&h.presenter, &updated), vec![1, 2, 3]);
}

#[tokio::test]
async fn test_expressions_without_repo_follow_default() {
    let h = harness(
        FakeSource::new()
            .with_repo(model("a/one", vec![issue("a/one", 1, &["bug"])]))
            .with_repo(model("a/two", vec![issue("a/two", 7, &["bug"])])),
        RecordingPresenter::default(),
    );
    assert!(h.logic.open_primary_repository("a/one").await);
    assert!(h.logic.open_repository_from_filter("a/two").await);

    let scoped = FilterExpression::from(Qualifier::Label("BUG".into()));
    let explicit = FilterExpression::from(Qualifier::Repo(repo("a/two")))
        .and(Qualifier::Label("bug".into()));
    let results = h
        .logic
        .filter_sort_refresh(&[scoped.clone(), explicit.clone()])
        .await;

    assert_eq!(ids(&results, &scoped), vec![1]);
    assert_eq!(ids(&results, &explicit), vec![7]);

    assert!(!h.logic.open_primary_repository("a/two").await);
    let results = h.logic.filter_sort_refresh(&[scoped.clone()]).await;
    assert_eq!(ids(&results, &scoped), vec![7]);
}

#[tokio::test]
async fn test_republish_uses_presenter_expressions() {
    let expr = FilterExpression::from(Qualifier::Label("bug".into()));
    let h = harness(
        FakeSource::new().with_repo(model(
            "a/b",
            vec![issue("a/b", 1, &["bug"]), issue("a/b", 2, &[])],
        )),
        RecordingPresenter::with_expressions(vec![expr.clone()]),
    );

    assert!(h.logic.open_primary_repository("a/b").await);

    assert_eq!(published_ids(&h.presenter, &expr), vec![1]);
    let results = h.logic.republish().await;
    assert_eq!(ids(&results, &expr), vec![1]);
}
