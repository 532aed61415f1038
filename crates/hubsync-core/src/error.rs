//! Centralized error types for HubSync.
//!
//! This module provides a typed error hierarchy that:
//! - Separates validation faults (rejected before any I/O) from network faults
//! - Provides user-friendly messages suitable for status display
//! - Preserves full error context for logging

use thiserror::Error;

/// Network-related errors (HTTP, connectivity).
#[derive(Debug, Error)]
pub enum NetworkError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Request timed out")]
    Timeout,

    #[error("Server error: {status} - {message}")]
    ServerError { status: u16, message: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl NetworkError {
    pub fn user_message(&self) -> &'static str {
        match self {
            NetworkError::ConnectionFailed(_) => {
                "Unable to connect. Check your internet connection."
            }
            NetworkError::Timeout => "The request timed out. Please try again.",
            NetworkError::ServerError { status, .. } if *status >= 500 => {
                "The server is experiencing issues. Please try again later."
            }
            NetworkError::ServerError { .. } => "The request failed. Please try again.",
            NetworkError::InvalidResponse(_) => {
                "Received an unexpected response. Please try again."
            }
        }
    }
}

/// GitHub API errors.
#[derive(Debug, Error)]
pub enum GitHubError {
    #[error("Rate limited (resets at {reset_epoch_millis})")]
    RateLimited { reset_epoch_millis: i64 },

    #[error("Repository not found: {0}")]
    RepoNotFound(String),

    #[error("Unauthorized - token may be invalid or expired")]
    Unauthorized,

    #[error("Forbidden - insufficient permissions")]
    Forbidden,

    #[error("API error: {status} - {message}")]
    ApiError { status: u16, message: String },
}

impl GitHubError {
    /// Classify a non-success HTTP status.
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        match status {
            401 => GitHubError::Unauthorized,
            403 => GitHubError::Forbidden,
            _ => GitHubError::ApiError {
                status,
                message: message.into(),
            },
        }
    }

    pub fn user_message(&self) -> &'static str {
        match self {
            GitHubError::RateLimited { .. } => {
                "GitHub rate limit exceeded. Please wait and try again."
            }
            GitHubError::RepoNotFound(_) => "Repository not found. Check the name and try again.",
            GitHubError::Unauthorized => "GitHub authentication failed. Please sign in again.",
            GitHubError::Forbidden => "You don't have permission to access this resource.",
            GitHubError::ApiError { status, .. } if *status >= 500 => {
                "GitHub is experiencing issues. Please try again later."
            }
            GitHubError::ApiError { .. } => "GitHub request failed. Please try again.",
        }
    }
}

/// Malformed `owner/name` repository ids. Always raised before any I/O.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RepoIdError {
    #[error("Repository id is empty")]
    Empty,

    #[error("Repository id '{0}' must contain exactly one '/'")]
    WrongSeparatorCount(String),

    #[error("Repository id '{0}' has an empty owner or name")]
    EmptySegment(String),

    #[error("Repository id '{0}' contains whitespace")]
    Whitespace(String),
}

/// Failure reported by a repository data source.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error(transparent)]
    Network(#[from] NetworkError),

    #[error(transparent)]
    GitHub(#[from] GitHubError),

    #[error("{0}")]
    Other(String),
}

impl SourceError {
    pub fn user_message(&self) -> &'static str {
        match self {
            SourceError::Network(e) => e.user_message(),
            SourceError::GitHub(e) => e.user_message(),
            SourceError::Other(_) => "The repository source failed. Please try again.",
        }
    }
}

/// Extension trait for converting reqwest errors to our error types.
pub trait ReqwestErrorExt {
    fn into_network_error(self) -> NetworkError;
}

impl ReqwestErrorExt for reqwest::Error {
    fn into_network_error(self) -> NetworkError {
        if self.is_timeout() {
            NetworkError::Timeout
        } else if self.is_connect() {
            NetworkError::ConnectionFailed(self.to_string())
        } else if self.is_decode() {
            NetworkError::InvalidResponse(self.to_string())
        } else if let Some(status) = self.status() {
            NetworkError::ServerError {
                status: status.as_u16(),
                message: self.to_string(),
            }
        } else {
            NetworkError::ConnectionFailed(self.to_string())
        }
    }
}
