//! Repository publishing: create-or-reuse, conditional file writes, hosting.

use std::sync::Arc;

use tracing::{debug, info};

use crate::host::{
    FileCommit, FileWrite, HostError, HostResult, NewRepository, PagesSource, RepositoryHost,
};

/// Result of ensuring the task repository exists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnsuredRepository {
    pub url: String,
    /// `true` when an earlier round (or anything else) already created it.
    pub existed: bool,
}

/// Commit message for a file write: round 1 adds, later rounds update.
pub fn commit_message(path: &str, round: u32) -> String {
    if round <= 1 {
        format!("Add {path}")
    } else {
        format!("Update {path} for Round {round}")
    }
}

pub struct RepositoryPublisher {
    host: Arc<dyn RepositoryHost>,
    owner: String,
    branch: String,
}

impl RepositoryPublisher {
    pub fn new(host: Arc<dyn RepositoryHost>, owner: impl Into<String>, branch: impl Into<String>) -> Self {
        Self {
            host,
            owner: owner.into(),
            branch: branch.into(),
        }
    }

    pub fn branch(&self) -> &str {
        &self.branch
    }

    /// Public web URL of a repository of this owner.
    pub fn repository_url(&self, task: &str) -> String {
        format!("https://{}/{}/{}", self.host.web_host(), self.owner, task)
    }

    /// Public URL of the static site served from a repository.
    pub fn hosting_url(&self, task: &str) -> String {
        format!("https://{}.github.io/{}/", self.owner.to_lowercase(), task)
    }

    /// Create the repository, treating "already exists" as reuse.
    ///
    /// Ownership of an existing repository is not verified.
    pub async fn ensure_repository(&self, task: &str) -> HostResult<EnsuredRepository> {
        match self.host.create_repository(&NewRepository::public(task)).await {
            Ok(info) => {
                info!(repo = %task, url = %info.html_url, "Repository created");
                Ok(EnsuredRepository {
                    url: info.html_url,
                    existed: false,
                })
            }
            Err(HostError::AlreadyExists(message)) => {
                info!(repo = %task, %message, "Repository already exists, reusing");
                Ok(EnsuredRepository {
                    url: self.repository_url(task),
                    existed: true,
                })
            }
            Err(err) => Err(err),
        }
    }

    /// Current revision marker of `path` on the publishing branch, `None`
    /// when the file does not exist there.
    pub async fn current_revision(&self, task: &str, path: &str) -> HostResult<Option<String>> {
        match self
            .host
            .file_metadata(&self.owner, task, path, &self.branch)
            .await
        {
            Ok(meta) => Ok(Some(meta.sha)),
            Err(HostError::NotFound(_)) => Ok(None),
            Err(err) => Err(err),
        }
    }

    /// Write `content` to `path` on the publishing branch, looking up the
    /// stored revision marker immediately before the write. A stale marker is reported as
    /// `HostError::Conflict` and not retried.
    pub async fn write_file(
        &self,
        task: &str,
        path: &str,
        content: &str,
        message: &str,
    ) -> HostResult<FileCommit> {
        let sha = self.current_revision(task, path).await?;
        debug!(repo = %task, path = %path, existing = sha.is_some(), "Resolved file revision");

        let write = FileWrite {
            path: path.to_string(),
            content: content.to_string(),
            message: message.to_string(),
            sha,
            branch: Some(self.branch.clone()),
        };
        let commit = self.host.put_file(&self.owner, task, &write).await?;
        info!(repo = %task, path = %path, commit = %commit.commit_sha, "File written");
        Ok(commit)
    }

    /// Enable static hosting from the root of the publishing branch.
    /// "Already configured" counts as success.
    pub async fn enable_hosting(&self, task: &str) -> HostResult<String> {
        let source = PagesSource::root_of(&self.branch);
        match self.host.enable_pages(&self.owner, task, &source).await {
            Ok(site) => {
                let url = site.html_url.unwrap_or_else(|| self.hosting_url(task));
                info!(repo = %task, url = %url, "Hosting enabled");
                Ok(url)
            }
            Err(HostError::Conflict(message)) => {
                debug!(repo = %task, %message, "Hosting already configured");
                Ok(self.hosting_url(task))
            }
            Err(err) => Err(err),
        }
    }
}
