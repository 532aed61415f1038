//! Optimistic label and state edits.
#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use std::sync::atomic::Ordering;

use common::{harness, issue, model, repo, FakeSource, RecordingPresenter};
use hubsync_engine::{FilterExpression, Qualifier};

fn labels(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}

fn all_issues() -> FilterExpression {
    FilterExpression::from(Qualifier::Repo(repo("a/b")))
}

async fn opened(source: FakeSource) -> common::Harness {
    let h = harness(
        source.with_repo(model("a/b", vec![issue("a/b", 1, &["bug"])])),
        RecordingPresenter::with_expressions(vec![all_issues()]),
    );
    assert!(h.logic.open_primary_repository("a/b").await);
    h
}

fn cached_labels(h: &common::Harness) -> Vec<String> {
    h.logic.get_repo("a/b").unwrap().issue(1).unwrap().labels.clone()
}

#[tokio::test]
async fn test_label_change_rolls_back_on_failure() {
    let source = FakeSource::new();
    source.fail_labels.store(true, Ordering::SeqCst);
    let h = opened(source).await;
    let before = h.presenter.publish_count();
    let original = h.logic.get_repo("a/b").unwrap().issue(1).unwrap().clone();

    let ok = h
        .logic
        .replace_issue_labels(&original, &labels(&["bug", "p1"]), &labels(&["bug"]))
        .await;

    assert!(!ok);
    assert_eq!(cached_labels(&h), labels(&["bug"]));

    let publishes = h.presenter.publishes();
    assert_eq!(publishes.len(), before + 2);
    let optimistic = &publishes[before][&all_issues()].issues[0];
    assert_eq!(optimistic.labels, labels(&["bug", "p1"]));
    let reverted = &publishes[before + 1][&all_issues()].issues[0];
    assert_eq!(reverted.labels, labels(&["bug"]));
}

#[tokio::test]
async fn test_label_change_sticks_on_success() {
    let h = opened(FakeSource::new()).await;
    let before = h.presenter.publish_count();
    let original = h.logic.get_repo("a/b").unwrap().issue(1).unwrap().clone();

    let ok = h
        .logic
        .replace_issue_labels(&original, &labels(&["feature"]), &labels(&["bug"]))
        .await;

    assert!(ok);
    assert_eq!(cached_labels(&h), labels(&["feature"]));
    assert_eq!(h.presenter.publish_count(), before + 1);
    assert_eq!(h.source.label_requests(), vec![labels(&["feature"])]);
}

#[tokio::test]
async fn test_label_change_on_uncached_issue() {
    let h = opened(FakeSource::new()).await;
    let stray = issue("a/b", 99, &[]);

    assert!(!h.logic.replace_issue_labels_ui(&stray, &labels(&["bug"])));
    assert_eq!(cached_labels(&h), labels(&["bug"]));
}

#[tokio::test]
async fn test_edit_state_updates_cache_on_success() {
    let h = opened(FakeSource::new()).await;

    assert!(h.logic.edit_issue_state(&repo("a/b"), 1, false).await);
    assert!(!h.logic.get_repo("a/b").unwrap().issue(1).unwrap().is_open);

    assert!(!h.logic.edit_issue_state(&repo("a/b"), 42, false).await);
}

#[tokio::test]
async fn test_edit_state_failure_leaves_cache() {
    let source = FakeSource::new();
    source.fail_state.store(true, Ordering::SeqCst);
    let h = opened(source).await;
    let before = h.presenter.publish_count();

    assert!(!h.logic.edit_issue_state(&repo("a/b"), 1, false).await);

    assert!(h.logic.get_repo("a/b").unwrap().issue(1).unwrap().is_open);
    assert_eq!(h.presenter.publish_count(), before);
}
