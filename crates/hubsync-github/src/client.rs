//! GitHub REST implementation of [`RemoteSource`].

use std::collections::{BTreeSet, HashMap};
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use futures::future::try_join_all;
use hubsync_core::{Config, GitHubError, ReqwestErrorExt, SourceError};
use hubsync_engine::{
    Credentials, Issue, Label, Milestone, Model, RateLimit, RawMetadata, RemoteSource, RepoId,
    SourceResult, User,
};
use parking_lot::RwLock;
use reqwest::{header, Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use url::Url;

use crate::convert;
use crate::retry::{with_retry, RetryConfig};
use crate::types::{
    GitHubComment, GitHubEvent, GitHubIssue, GitHubLabel, GitHubMilestone, GitHubUser,
    RateLimitResponse, UpdateIssueRequest,
};

const API_VERSION: &str = "2022-11-28";
const PER_PAGE: usize = 100;
/// Incremental refreshes ask for changes this long before the last fetch,
/// so clock skew against the server cannot hide an update.
const SINCE_OVERLAP_MINUTES: i64 = 5;

pub struct GitHubSource {
    base_url: Url,
    client: Client,
    token: RwLock<Option<String>>,
    user_agent: String,
    retry: RetryConfig,
    /// Display ids of repositories downloaded this session
    stored: RwLock<BTreeSet<String>>,
}

impl GitHubSource {
    pub fn new(api_url: &str, token: Option<String>) -> Result<Self> {
        Self::with_settings(
            api_url,
            token,
            "hubsync",
            Duration::from_secs(30),
            RetryConfig::default(),
        )
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Self::with_settings(
            &config.github.api_url,
            config.github.effective_token(),
            &config.github.user_agent,
            Duration::from_secs(config.sync.request_timeout_secs),
            RetryConfig {
                max_retries: config.sync.max_retries,
                ..RetryConfig::default()
            },
        )
    }

    pub fn with_settings(
        api_url: &str,
        token: Option<String>,
        user_agent: &str,
        timeout: Duration,
        retry: RetryConfig,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to create HTTP client")?;

        // Url::join drops the last path segment unless it ends with '/'.
        let mut base = api_url.trim().to_string();
        if !base.ends_with('/') {
            base.push('/');
        }
        let base_url =
            Url::parse(&base).with_context(|| format!("Invalid GitHub API URL: {}", api_url))?;

        Ok(Self {
            base_url,
            client,
            token: RwLock::new(token),
            user_agent: user_agent.to_string(),
            retry,
            stored: RwLock::new(BTreeSet::new()),
        })
    }

    pub fn is_authenticated(&self) -> bool {
        self.token.read().is_some()
    }

    fn authorize(&self, req: RequestBuilder, token: Option<&str>) -> RequestBuilder {
        let req = req
            .header(header::ACCEPT, "application/vnd.github+json")
            .header(header::USER_AGENT, self.user_agent.as_str())
            .header("X-GitHub-Api-Version", API_VERSION);
        match token {
            Some(token) => req.header(header::AUTHORIZATION, format!("Bearer {}", token)),
            None => req,
        }
    }

    fn url(&self, path: &str) -> SourceResult<Url> {
        self.base_url
            .join(path)
            .map_err(|e| SourceError::Other(format!("Invalid request path {}: {}", path, e)))
    }

    fn repo_url(&self, repo_id: &RepoId, suffix: &str) -> SourceResult<Url> {
        self.url(&format!(
            "repos/{}/{}{}",
            repo_id.owner(),
            repo_id.name(),
            suffix
        ))
    }

    async fn send<F>(&self, build: F) -> SourceResult<Response>
    where
        F: Fn() -> RequestBuilder,
    {
        let token = self.token.read().clone();
        self.send_as(build, token.as_deref()).await
    }

    async fn send_as<F>(&self, build: F, token: Option<&str>) -> SourceResult<Response>
    where
        F: Fn() -> RequestBuilder,
    {
        let response = with_retry(&self.retry, || self.authorize(build(), token).send())
            .await
            .map_err(|e| SourceError::Network(e.into_network_error()))?;
        check_response(response).await
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> SourceResult<T> {
        let response = self.send(|| self.client.get(url.clone())).await?;
        json(response).await
    }

    async fn get_paged<T: DeserializeOwned>(
        &self,
        url: Url,
        query: &[(&str, String)],
    ) -> SourceResult<Vec<T>> {
        let mut items = Vec::new();
        let mut page: usize = 1;
        loop {
            let paging = [("per_page", PER_PAGE.to_string()), ("page", page.to_string())];
            tracing::debug!("GET {} page {}", url, page);
            let response = self
                .send(|| self.client.get(url.clone()).query(query).query(&paging))
                .await?;
            let link = header_str(&response, "link").map(str::to_owned);
            let batch: Vec<T> = json(response).await?;
            let more = has_next_page(link.as_deref(), batch.len());
            items.extend(batch);
            if !more {
                return Ok(items);
            }
            page += 1;
        }
    }

    async fn fetch_issues(
        &self,
        repo_id: &RepoId,
        since: Option<DateTime<Utc>>,
    ) -> SourceResult<Vec<Issue>> {
        let mut query = vec![("state", "all".to_string())];
        if let Some(since) = since {
            query.push(("since", since.to_rfc3339_opts(SecondsFormat::Secs, true)));
        }
        let url = self.repo_url(repo_id, "/issues")?;
        let wire: Vec<GitHubIssue> = self.get_paged(url, &query).await?;
        Ok(convert::issues(repo_id, wire))
    }

    async fn fetch_repo_data(
        &self,
        repo_id: &RepoId,
    ) -> SourceResult<(Vec<Label>, Vec<Milestone>, Vec<User>)> {
        let labels_url = self.repo_url(repo_id, "/labels")?;
        let milestones_url = self.repo_url(repo_id, "/milestones")?;
        let assignees_url = self.repo_url(repo_id, "/assignees")?;
        let milestone_query = [("state", "all".to_string())];

        let (labels, milestones, users) = futures::try_join!(
            self.get_paged::<GitHubLabel>(labels_url, &[]),
            self.get_paged::<GitHubMilestone>(milestones_url, &milestone_query),
            self.get_paged::<GitHubUser>(assignees_url, &[]),
        )?;

        Ok((
            labels.into_iter().map(convert::label).collect(),
            milestones.into_iter().map(convert::milestone).collect(),
            users.into_iter().map(convert::user).collect(),
        ))
    }

    fn remember(&self, repo_id: &RepoId) {
        let mut stored = self.stored.write();
        stored.retain(|id| !id.eq_ignore_ascii_case(repo_id.as_str()));
        stored.insert(repo_id.as_str().to_string());
    }
}

#[async_trait]
impl RemoteSource for GitHubSource {
    async fn is_valid(&self, repo_id: &RepoId) -> SourceResult<bool> {
        let url = self.repo_url(repo_id, "")?;
        match self.send(|| self.client.get(url.clone())).await {
            Ok(_) => Ok(true),
            Err(e) if is_not_found(&e) => {
                tracing::debug!("{} not found", repo_id);
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    async fn fetch_full(&self, repo_id: &RepoId) -> SourceResult<Model> {
        let fetched_at = Utc::now();
        tracing::info!("Downloading {}", repo_id);

        let (issues, (labels, milestones, users)) = futures::try_join!(
            self.fetch_issues(repo_id, None),
            self.fetch_repo_data(repo_id),
        )
        .map_err(|e| repo_not_found(e, repo_id))?;

        tracing::info!("Fetched {} issues from {}", issues.len(), repo_id);
        self.remember(repo_id);
        Ok(Model {
            repo_id: repo_id.clone(),
            issues,
            labels,
            milestones,
            users,
            fetched_at,
        })
    }

    async fn refresh(&self, model: &Model) -> SourceResult<Model> {
        let fetched_at = Utc::now();
        let repo_id = &model.repo_id;

        let (changed, (labels, milestones, users)) = futures::try_join!(
            self.fetch_issues(repo_id, Some(refresh_since(model.fetched_at))),
            self.fetch_repo_data(repo_id),
        )
        .map_err(|e| repo_not_found(e, repo_id))?;

        tracing::debug!(
            "{} issues of {} changed since {}",
            changed.len(),
            repo_id,
            model.fetched_at
        );
        Ok(Model {
            repo_id: repo_id.clone(),
            issues: convert::merge_issues(model, changed),
            labels,
            milestones,
            users,
            fetched_at,
        })
    }

    async fn fetch_metadata(
        &self,
        repo_id: &RepoId,
        issues: &[Issue],
    ) -> SourceResult<HashMap<u64, RawMetadata>> {
        let requests = issues.iter().map(|issue| async move {
            let comments_url = self.repo_url(repo_id, &format!("/issues/{}/comments", issue.id))?;
            let events_url = self.repo_url(repo_id, &format!("/issues/{}/events", issue.id))?;
            let (comments, events) = futures::try_join!(
                self.get_paged::<GitHubComment>(comments_url, &[]),
                self.get_paged::<GitHubEvent>(events_url, &[]),
            )?;
            Ok::<_, SourceError>((issue.id, convert::raw_metadata(comments, events)))
        });

        let metadata = try_join_all(requests).await?;
        tracing::debug!("Fetched metadata for {} issues of {}", metadata.len(), repo_id);
        Ok(metadata.into_iter().collect())
    }

    async fn replace_labels(&self, issue: &Issue, labels: &[String]) -> SourceResult<()> {
        let url = self.repo_url(&issue.repo_id, &format!("/issues/{}", issue.id))?;
        let body = UpdateIssueRequest {
            labels: Some(labels.to_vec()),
            ..Default::default()
        };
        self.send(|| self.client.patch(url.clone()).json(&body))
            .await?;
        tracing::info!("Replaced labels of {} in {}", issue, issue.repo_id);
        Ok(())
    }

    async fn edit_state(&self, repo_id: &RepoId, issue_id: u64, open: bool) -> SourceResult<bool> {
        let url = self.repo_url(repo_id, &format!("/issues/{}", issue_id))?;
        let body = UpdateIssueRequest {
            state: Some(if open { "open" } else { "closed" }.to_string()),
            ..Default::default()
        };
        match self.send(|| self.client.patch(url.clone()).json(&body)).await {
            Ok(_) => Ok(true),
            Err(e) if is_not_found(&e) => Ok(false),
            Err(e) => Err(e),
        }
    }

    async fn login(&self, credentials: &Credentials) -> SourceResult<bool> {
        let url = self.url("user")?;
        let response = match self
            .send_as(|| self.client.get(url.clone()), Some(&credentials.secret))
            .await
        {
            Ok(response) => response,
            Err(SourceError::GitHub(GitHubError::Unauthorized)) => return Ok(false),
            Err(e) => return Err(e),
        };

        let user: GitHubUser = json(response).await?;
        if !user.login.eq_ignore_ascii_case(&credentials.username) {
            tracing::warn!(
                "Token belongs to {}, not {}",
                user.login,
                credentials.username
            );
            return Ok(false);
        }
        *self.token.write() = Some(credentials.secret.clone());
        Ok(true)
    }

    async fn rate_limit_status(&self) -> SourceResult<RateLimit> {
        let limits: RateLimitResponse = self.get_json(self.url("rate_limit")?).await?;
        let core = limits.resources.core;
        Ok(RateLimit::new(core.remaining, core.reset.saturating_mul(1000)))
    }

    fn stored_repo_ids(&self) -> BTreeSet<String> {
        self.stored.read().clone()
    }

    async fn remove_repo(&self, repo_id: &RepoId) -> SourceResult<bool> {
        let mut stored = self.stored.write();
        let before = stored.len();
        stored.retain(|id| !id.eq_ignore_ascii_case(repo_id.as_str()));
        Ok(stored.len() != before)
    }
}

async fn check_response(response: Response) -> SourceResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    if let Some(reset_epoch_millis) = exhausted_rate_limit(&response) {
        return Err(GitHubError::RateLimited { reset_epoch_millis }.into());
    }
    let message = response.text().await.unwrap_or_default();
    Err(GitHubError::from_status(status.as_u16(), message).into())
}

/// Reset time of an exhausted quota, if that is why the request failed.
fn exhausted_rate_limit(response: &Response) -> Option<i64> {
    if !matches!(
        response.status(),
        StatusCode::FORBIDDEN | StatusCode::TOO_MANY_REQUESTS
    ) {
        return None;
    }
    if header_str(response, "x-ratelimit-remaining")? != "0" {
        return None;
    }
    let reset: i64 = header_str(response, "x-ratelimit-reset")?.parse().ok()?;
    Some(reset.saturating_mul(1000))
}

/// A short page ends a listing; otherwise the `Link` header decides when
/// the server sends one.
fn has_next_page(link: Option<&str>, batch_len: usize) -> bool {
    if batch_len < PER_PAGE {
        return false;
    }
    match link {
        Some(link) => link.split(',').any(|part| part.contains("rel=\"next\"")),
        None => true,
    }
}

fn refresh_since(fetched_at: DateTime<Utc>) -> DateTime<Utc> {
    chrono::Duration::try_minutes(SINCE_OVERLAP_MINUTES)
        .and_then(|overlap| fetched_at.checked_sub_signed(overlap))
        .unwrap_or(fetched_at)
}

fn header_str<'a>(response: &'a Response, name: &str) -> Option<&'a str> {
    response.headers().get(name)?.to_str().ok()
}

async fn json<T: DeserializeOwned>(response: Response) -> SourceResult<T> {
    response
        .json()
        .await
        .map_err(|e| SourceError::Network(e.into_network_error()))
}

fn is_not_found(e: &SourceError) -> bool {
    matches!(
        e,
        SourceError::GitHub(GitHubError::ApiError { status: 404, .. })
            | SourceError::GitHub(GitHubError::RepoNotFound(_))
    )
}

fn repo_not_found(e: SourceError, repo_id: &RepoId) -> SourceError {
    if is_not_found(&e) {
        GitHubError::RepoNotFound(repo_id.to_string()).into()
    } else {
        e
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;

    #[test]
    fn test_base_url_keeps_path_prefix() {
        let source = GitHubSource::new("https://ghe.example.com/api/v3", None).unwrap();
        let repo_id = RepoId::parse("a/b").unwrap();
        assert_eq!(
            source.repo_url(&repo_id, "/issues").unwrap().as_str(),
            "https://ghe.example.com/api/v3/repos/a/b/issues"
        );
        assert!(!source.is_authenticated());
    }

    #[test]
    fn test_invalid_api_url_rejected() {
        assert!(GitHubSource::new("not a url", None).is_err());
    }

    #[test]
    fn test_not_found_classification() {
        let e: SourceError = GitHubError::from_status(404, "Not Found").into();
        assert!(is_not_found(&e));
        let repo_id = RepoId::parse("a/b").unwrap();
        assert!(matches!(
            repo_not_found(e, &repo_id),
            SourceError::GitHub(GitHubError::RepoNotFound(_))
        ));
        let e: SourceError = GitHubError::Unauthorized.into();
        assert!(!is_not_found(&e));
    }

    #[test]
    fn test_has_next_page() {
        let next = r#"<https://api.github.com/repos/a/b/issues?page=3>; rel="next", <https://api.github.com/repos/a/b/issues?page=9>; rel="last""#;
        let final_page = r#"<https://api.github.com/repos/a/b/issues?page=1>; rel="first", <https://api.github.com/repos/a/b/issues?page=8>; rel="prev""#;
        assert!(has_next_page(Some(next), PER_PAGE));
        assert!(!has_next_page(Some(final_page), PER_PAGE));
        assert!(has_next_page(None, PER_PAGE));
        assert!(!has_next_page(Some(next), PER_PAGE - 1));
    }

    #[test]
    fn test_refresh_since_overlaps_last_fetch() {
        use chrono::TimeZone;
        let fetched_at = Utc.with_ymd_and_hms(2026, 2, 1, 0, 0, 0).unwrap();
        assert_eq!(
            refresh_since(fetched_at),
            Utc.with_ymd_and_hms(2026, 1, 31, 23, 55, 0).unwrap()
        );
        assert_eq!(refresh_since(DateTime::<Utc>::MIN_UTC), DateTime::<Utc>::MIN_UTC);
    }
}
