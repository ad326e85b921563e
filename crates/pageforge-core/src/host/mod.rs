//! Repository host abstraction.
//!
//! [`RepositoryHost`] is the seam between the publisher and the remote
//! version-control service. It reports raw outcomes (including "already
//! exists", "not found" and "conflict") as distinct [`HostError`] variants and
//! leaves the decision of which of those count as success to the caller.
//!
//! The production implementation is [`github::GithubClient`]; an in-memory
//! fake lives in [`crate::fakes`].

pub mod github;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub use github::GithubClient;

/// Errors reported by a repository host.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HostError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("repository already exists: {0}")]
    AlreadyExists(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("unexpected status {status}: {message}")]
    Status { status: u16, message: String },

    #[error("could not decode host response: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for HostError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            HostError::Decode(err.to_string())
        } else {
            HostError::Transport(err.to_string())
        }
    }
}

/// Result type for host operations.
pub type HostResult<T> = std::result::Result<T, HostError>;

/// Parameters of a repository creation call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewRepository {
    pub name: String,
    pub description: String,
    pub private: bool,
    pub auto_init: bool,
    pub license_template: Option<String>,
}

impl NewRepository {
    /// Public, auto-initialized, MIT-licensed repository.
    pub fn public(name: &str) -> Self {
        Self {
            name: name.to_string(),
            description: format!("Deployment for task {name}"),
            private: false,
            auto_init: true,
            license_template: Some("mit".to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RepositoryInfo {
    pub html_url: String,
}

/// Stored metadata of one file path.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FileMetadata {
    pub path: String,
    /// Revision marker to pass back for a safe replace.
    pub sha: String,
}

/// A file write. `sha` is the prior revision marker, `None` for a new file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileWrite {
    pub path: String,
    pub content: String,
    pub message: String,
    pub sha: Option<String>,
    pub branch: Option<String>,
}

/// Revisions produced by a file write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileCommit {
    /// New revision marker of the file.
    pub blob_sha: String,
    /// Commit that introduced it.
    pub commit_sha: String,
}

/// Branch and directory the static site is served from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PagesSource {
    pub branch: String,
    pub path: String,
}

impl PagesSource {
    pub fn root_of(branch: &str) -> Self {
        Self {
            branch: branch.to_string(),
            path: "/".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PagesSite {
    #[serde(default)]
    pub html_url: Option<String>,
}

/// Remote repository operations used by one deployment round.
#[async_trait]
pub trait RepositoryHost: Send + Sync {
    /// Host of the public web UI, e.g. `github.com`.
    fn web_host(&self) -> &str;

    /// Create a repository owned by the authenticated account.
    async fn create_repository(&self, repo: &NewRepository) -> HostResult<RepositoryInfo>;

    /// Metadata of a file on `branch`. `HostError::NotFound` when the path
    /// has no file there.
    async fn file_metadata(
        &self,
        owner: &str,
        repo: &str,
        path: &str,
        branch: &str,
    ) -> HostResult<FileMetadata>;

    /// Create or replace a file.
    async fn put_file(&self, owner: &str, repo: &str, write: &FileWrite)
        -> HostResult<FileCommit>;

    /// Turn on static hosting. `HostError::Conflict` when already configured.
    async fn enable_pages(&self, owner: &str, repo: &str, source: &PagesSource)
        -> HostResult<PagesSite>;

    /// Head commit of a branch.
    async fn branch_head(&self, owner: &str, repo: &str, branch: &str) -> HostResult<String>;
}
