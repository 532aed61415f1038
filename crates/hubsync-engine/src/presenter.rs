//! Observer interfaces owned by the presentation layer.

use crate::filter::{FilterExpression, FilterResults};
use crate::rate_limit::RateLimit;
use crate::repo_id::RepoId;
use crate::store::StoreSnapshot;

/// Receives engine output. Calls arrive from whichever task completed the
/// work, so implementations marshal onto their own UI context if they have one.
pub trait Presenter: Send + Sync {
    fn publish(&self, snapshot: &StoreSnapshot, results: &FilterResults);

    fn update_rate_limits(&self, limit: RateLimit);

    /// Filter expressions of every active panel.
    fn current_active_expressions(&self) -> Vec<FilterExpression>;

    fn repository_opened(&self, _repo_id: &RepoId) {}
}

/// Advisory progress messages ("Opening owner/name").
pub trait StatusSink: Send + Sync {
    fn display_message(&self, message: &str);
}

/// Writes status messages to the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingStatus;

impl StatusSink for TracingStatus {
    fn display_message(&self, message: &str) {
        tracing::info!(target: "hubsync::status", "{}", message);
    }
}
