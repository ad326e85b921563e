//! Head revision lookup after publishing.

use std::sync::Arc;

use tracing::debug;

use crate::host::{HostResult, RepositoryHost};

pub struct CommitResolver {
    host: Arc<dyn RepositoryHost>,
    owner: String,
}

impl CommitResolver {
    pub fn new(host: Arc<dyn RepositoryHost>, owner: impl Into<String>) -> Self {
        Self {
            host,
            owner: owner.into(),
        }
    }

    /// Latest commit on `branch`. Any failure, including a missing branch, is
    /// returned to the caller.
    pub async fn latest_revision(&self, task: &str, branch: &str) -> HostResult<String> {
        let sha = self.host.branch_head(&self.owner, task, branch).await?;
        debug!(repo = %task, branch = %branch, sha = %sha, "Resolved head revision");
        Ok(sha)
    }
}
