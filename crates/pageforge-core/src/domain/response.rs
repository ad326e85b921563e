//! The single response produced per invocation.

use serde::{Deserialize, Serialize};

use super::error::{ErrorClass, PageforgeError};
use super::notification::DeploymentReceipt;

/// Success or failure body returned to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DeployResponse {
    Success {
        status: String,
        repo_url: String,
        commit_sha: String,
        pages_url: String,
    },
    Failure {
        error: String,
    },
}

impl DeployResponse {
    pub fn success(receipt: DeploymentReceipt) -> Self {
        DeployResponse::Success {
            status: "success".to_string(),
            repo_url: receipt.repo_url,
            commit_sha: receipt.commit_sha,
            pages_url: receipt.pages_url,
        }
    }

    pub fn failure(err: &PageforgeError) -> Self {
        DeployResponse::Failure {
            error: err.to_string(),
        }
    }

    /// Map a pipeline result to its response and transport class.
    pub fn from_result(result: Result<DeploymentReceipt, PageforgeError>) -> (Option<ErrorClass>, Self) {
        match result {
            Ok(receipt) => (None, Self::success(receipt)),
            Err(err) => (Some(err.class()), Self::failure(&err)),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, DeployResponse::Success { .. })
    }
}
