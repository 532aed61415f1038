//! Shared fakes for engine integration tests.
#![allow(dead_code, clippy::unwrap_used, clippy::expect_used)]

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use hubsync_core::{GitHubError, NetworkError, SourceError};
use hubsync_engine::{
    Credentials, FilterExpression, FilterResults, Issue, Logic, MemoryPreferences, Model,
    Presenter, RateLimit, RawMetadata, RemoteSource, RepoId, SourceResult, StatusSink,
    StoreSnapshot,
};
use parking_lot::Mutex;

pub const CURRENT_USER: &str = "me";

pub fn repo(s: &str) -> RepoId {
    RepoId::parse(s).unwrap()
}

pub fn hours_ago(hours: i64) -> DateTime<Utc> {
    Utc::now() - Duration::hours(hours)
}

pub fn issue(repo_id: &str, id: u64, labels: &[&str]) -> Issue {
    Issue {
        repo_id: repo(repo_id),
        id,
        title: format!("Issue {id}"),
        body: String::new(),
        author: "alice".into(),
        labels: labels.iter().map(|l| l.to_string()).collect(),
        milestone: None,
        assignee: None,
        is_open: true,
        is_read: false,
        comment_count: 0,
        created_at: hours_ago(48),
        updated_at: hours_ago(1),
        metadata: None,
    }
}

pub fn model(repo_id: &str, issues: Vec<Issue>) -> Model {
    let mut model = Model::empty(repo(repo_id));
    model.issues = issues;
    model
}

fn network_failure() -> SourceError {
    SourceError::Network(NetworkError::ConnectionFailed("simulated".into()))
}

/// In-memory remote: `remote` is what the tracker currently holds.
#[derive(Default)]
pub struct FakeSource {
    remote: Mutex<BTreeMap<RepoId, Model>>,
    metadata: Mutex<HashMap<u64, RawMetadata>>,
    failing_refresh: Mutex<HashSet<RepoId>>,
    metadata_requests: Mutex<Vec<(RepoId, Vec<u64>)>>,
    label_requests: Mutex<Vec<Vec<String>>>,
    pub fail_fetch: AtomicBool,
    pub fail_labels: AtomicBool,
    pub fail_metadata: AtomicBool,
    pub fail_state: AtomicBool,
    pub valid_calls: AtomicUsize,
    pub fetch_calls: AtomicUsize,
    pub refresh_calls: AtomicUsize,
    pub rate_calls: AtomicUsize,
}

impl FakeSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_repo(self, model: Model) -> Self {
        self.set_remote(model);
        self
    }

    pub fn set_remote(&self, model: Model) {
        self.remote.lock().insert(model.repo_id.clone(), model);
    }

    pub fn fail_refresh_for(&self, repo_id: &str) {
        self.failing_refresh.lock().insert(repo(repo_id));
    }

    pub fn set_metadata(&self, issue_id: u64, raw: RawMetadata) {
        self.metadata.lock().insert(issue_id, raw);
    }

    pub fn metadata_requests(&self) -> Vec<(RepoId, Vec<u64>)> {
        self.metadata_requests.lock().clone()
    }

    pub fn label_requests(&self) -> Vec<Vec<String>> {
        self.label_requests.lock().clone()
    }

    pub fn calls(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RemoteSource for FakeSource {
    async fn is_valid(&self, repo_id: &RepoId) -> SourceResult<bool> {
        self.valid_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.remote.lock().contains_key(repo_id))
    }

    async fn fetch_full(&self, repo_id: &RepoId) -> SourceResult<Model> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_fetch.load(Ordering::SeqCst) {
            return Err(SourceError::Network(NetworkError::Timeout));
        }
        self.remote
            .lock()
            .get(repo_id)
            .cloned()
            .ok_or_else(|| SourceError::GitHub(GitHubError::RepoNotFound(repo_id.to_string())))
    }

    async fn refresh(&self, model: &Model) -> SourceResult<Model> {
        self.refresh_calls.fetch_add(1, Ordering::SeqCst);
        if self.failing_refresh.lock().contains(&model.repo_id) {
            return Err(network_failure());
        }
        Ok(self
            .remote
            .lock()
            .get(&model.repo_id)
            .cloned()
            .unwrap_or_else(|| model.clone()))
    }

    async fn fetch_metadata(
        &self,
        repo_id: &RepoId,
        issues: &[Issue],
    ) -> SourceResult<HashMap<u64, RawMetadata>> {
        let mut ids: Vec<u64> = issues.iter().map(|i| i.id).collect();
        ids.sort_unstable();
        self.metadata_requests
            .lock()
            .push((repo_id.clone(), ids.clone()));
        if self.fail_metadata.load(Ordering::SeqCst) {
            return Err(network_failure());
        }
        let metadata = self.metadata.lock();
        Ok(ids
            .into_iter()
            .map(|id| (id, metadata.get(&id).cloned().unwrap_or_default()))
            .collect())
    }

    async fn replace_labels(&self, _issue: &Issue, labels: &[String]) -> SourceResult<()> {
        self.label_requests.lock().push(labels.to_vec());
        if self.fail_labels.load(Ordering::SeqCst) {
            return Err(network_failure());
        }
        Ok(())
    }

    async fn edit_state(&self, repo_id: &RepoId, issue_id: u64, open: bool) -> SourceResult<bool> {
        if self.fail_state.load(Ordering::SeqCst) {
            return Err(network_failure());
        }
        let mut remote = self.remote.lock();
        let issue = remote
            .get_mut(repo_id)
            .and_then(|m| m.issue_mut(issue_id));
        match issue {
            Some(issue) => {
                issue.is_open = open;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn login(&self, credentials: &Credentials) -> SourceResult<bool> {
        Ok(credentials.secret == "correct")
    }

    async fn rate_limit_status(&self) -> SourceResult<RateLimit> {
        let n = self.rate_calls.fetch_add(1, Ordering::SeqCst) as u32;
        Ok(RateLimit::new(5000 - n - 1, 1_767_225_600_000))
    }

    fn stored_repo_ids(&self) -> BTreeSet<String> {
        self.remote
            .lock()
            .keys()
            .map(|id| id.as_str().to_string())
            .collect()
    }

    async fn remove_repo(&self, repo_id: &RepoId) -> SourceResult<bool> {
        Ok(self.remote.lock().remove(repo_id).is_some())
    }
}

/// Records everything the engine publishes.
#[derive(Default)]
pub struct RecordingPresenter {
    expressions: Mutex<Vec<FilterExpression>>,
    publishes: Mutex<Vec<FilterResults>>,
    rate_limits: Mutex<Vec<RateLimit>>,
    opened: Mutex<Vec<RepoId>>,
}

impl RecordingPresenter {
    pub fn with_expressions(expressions: Vec<FilterExpression>) -> Self {
        Self {
            expressions: Mutex::new(expressions),
            ..Self::default()
        }
    }

    pub fn publish_count(&self) -> usize {
        self.publishes.lock().len()
    }

    pub fn last_publish(&self) -> Option<FilterResults> {
        self.publishes.lock().last().cloned()
    }

    pub fn publishes(&self) -> Vec<FilterResults> {
        self.publishes.lock().clone()
    }

    pub fn rate_limits(&self) -> Vec<RateLimit> {
        self.rate_limits.lock().clone()
    }

    pub fn opened(&self) -> Vec<RepoId> {
        self.opened.lock().clone()
    }
}

impl Presenter for RecordingPresenter {
    fn publish(&self, _snapshot: &StoreSnapshot, results: &FilterResults) {
        self.publishes.lock().push(results.clone());
    }

    fn update_rate_limits(&self, limit: RateLimit) {
        self.rate_limits.lock().push(limit);
    }

    fn current_active_expressions(&self) -> Vec<FilterExpression> {
        self.expressions.lock().clone()
    }

    fn repository_opened(&self, repo_id: &RepoId) {
        self.opened.lock().push(repo_id.clone());
    }
}

/// Keeps every status line in order.
#[derive(Default)]
pub struct RecordingStatus {
    messages: Mutex<Vec<String>>,
}

impl RecordingStatus {
    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().clone()
    }
}

impl StatusSink for RecordingStatus {
    fn display_message(&self, message: &str) {
        self.messages.lock().push(message.to_string());
    }
}

pub struct Harness {
    pub source: Arc<FakeSource>,
    pub presenter: Arc<RecordingPresenter>,
    pub status: Arc<RecordingStatus>,
    pub prefs: Arc<MemoryPreferences>,
    pub logic: Logic,
}

pub fn harness(source: FakeSource, presenter: RecordingPresenter) -> Harness {
    let source = Arc::new(source);
    let presenter = Arc::new(presenter);
    let status = Arc::new(RecordingStatus::default());
    let prefs = Arc::new(MemoryPreferences::with_login(CURRENT_USER));
    let logic =
        Logic::new(source.clone(), presenter.clone(), prefs.clone()).with_status(status.clone());
    Harness {
        source,
        presenter,
        status,
        prefs,
        logic,
    }
}

/// Ids of the issues published for `expr` in the latest publish.
pub fn published_ids(presenter: &RecordingPresenter, expr: &FilterExpression) -> Vec<u64> {
    presenter
        .last_publish()
        .and_then(|results| results.get(expr).cloned())
        .map(|result| result.issues.iter().map(|i| i.id).collect())
        .unwrap_or_default()
}
