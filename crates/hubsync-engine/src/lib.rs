//! Client-side synchronization and query engine for remote issue trackers.
//!
//! [`Logic`] keeps one cached [`Model`] per open repository up to date from a
//! [`RemoteSource`], evaluates filter expressions against the cache and hands
//! sorted results to a [`Presenter`].

pub mod filter;
pub mod logic;
pub mod model;
pub mod prefs;
pub mod presenter;
pub mod rate_limit;
pub mod repo_id;
pub mod source;
pub mod store;

pub use filter::{
    FilterEngine, FilterExpression, FilterResult, FilterResults, IssueState, Qualifier,
    SortField, SortKey, SortOrder,
};
pub use logic::{Logic, OpenError};
pub use model::{Activity, Issue, IssueMetadata, Label, Milestone, Model, RawMetadata, User};
pub use prefs::{MemoryPreferences, Preferences};
pub use presenter::{Presenter, StatusSink, TracingStatus};
pub use rate_limit::{RateLimit, RateLimitCell};
pub use repo_id::RepoId;
pub use source::{Credentials, RemoteSource, SourceResult};
pub use store::{ModelStore, SharedStore, StoreError, StoreSnapshot};
