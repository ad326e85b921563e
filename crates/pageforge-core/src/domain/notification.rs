//! Evaluator notification payload and the receipt of a finished round.

use serde::{Deserialize, Serialize};

use super::request::TaskRequest;

/// Published locations and revision of a completed round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentReceipt {
    pub repo_url: String,
    pub commit_sha: String,
    pub pages_url: String,
}

/// Body posted to the evaluation callback. Built once per run and resent
/// unchanged on every retry; the receiver keys on `nonce` + `round`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationPayload {
    pub email: String,
    pub task: String,
    pub round: u32,
    pub nonce: String,
    pub repo_url: String,
    pub commit_sha: String,
    pub pages_url: String,
}

impl NotificationPayload {
    pub fn new(request: &TaskRequest, receipt: &DeploymentReceipt) -> Self {
        Self {
            email: request.email.clone(),
            task: request.task.clone(),
            round: request.round,
            nonce: request.nonce.clone(),
            repo_url: receipt.repo_url.clone(),
            commit_sha: receipt.commit_sha.clone(),
            pages_url: receipt.pages_url.clone(),
        }
    }
}
