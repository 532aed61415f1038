//! Terminal presenter: prints each panel when its contents change.

use std::fmt::Write as _;

use hubsync_engine::{
    FilterExpression, FilterResults, Issue, Presenter, RateLimit, RepoId, StoreSnapshot,
};
use parking_lot::Mutex;

use crate::args::Panel;

pub struct ConsolePresenter {
    panels: Vec<Panel>,
    last_printed: Mutex<Option<String>>,
}

impl ConsolePresenter {
    pub fn new(panels: Vec<Panel>) -> Self {
        Self {
            panels,
            last_printed: Mutex::new(None),
        }
    }

    pub fn expressions(&self) -> Vec<FilterExpression> {
        self.panels.iter().map(|p| p.expression.clone()).collect()
    }

    pub fn render(&self, results: &FilterResults) -> String {
        let mut out = String::new();
        for panel in &self.panels {
            let issues = results
                .get(&panel.expression)
                .map(|r| r.issues.as_slice())
                .unwrap_or_default();
            let _ = writeln!(out, "== {} ({} issues) ==", panel.title, issues.len());
            for issue in issues {
                let _ = writeln!(out, "  {}", issue_line(issue));
            }
        }
        out
    }
}

fn issue_line(issue: &Issue) -> String {
    let mut line = format!("{}#{:<5} {}", issue.repo_id, issue.id, issue.title);
    if !issue.labels.is_empty() {
        let _ = write!(line, "  [{}]", issue.labels.join(", "));
    }
    if let Some(assignee) = &issue.assignee {
        let _ = write!(line, "  @{}", assignee);
    }
    if !issue.is_open {
        line.push_str("  (closed)");
    }
    line
}

impl Presenter for ConsolePresenter {
    fn publish(&self, _snapshot: &StoreSnapshot, results: &FilterResults) {
        let rendered = self.render(results);
        let mut last = self.last_printed.lock();
        if last.as_deref() == Some(rendered.as_str()) {
            tracing::debug!("Views unchanged");
            return;
        }
        print!("{}", rendered);
        *last = Some(rendered);
    }

    fn update_rate_limits(&self, limit: RateLimit) {
        match limit.reset_at() {
            Some(reset) => tracing::info!(
                remaining = limit.remaining,
                "Rate limit: {} requests left, resets at {}",
                limit.remaining,
                reset.format("%H:%M:%S")
            ),
            None => tracing::info!("Rate limit: {} requests left", limit.remaining),
        }
    }

    fn current_active_expressions(&self) -> Vec<FilterExpression> {
        self.expressions()
    }

    fn repository_opened(&self, repo_id: &RepoId) {
        tracing::info!("Opened {}", repo_id);
    }
}
