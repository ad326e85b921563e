//! Domain models for Pageforge.
//!
//! Canonical definitions for the entities of one deployment round:
//! - `TaskRequest`: validated inbound request
//! - `ArtifactBundle`: generated (or fallback) documents
//! - `NotificationPayload`: what the evaluator receives
//! - `DeployResponse`: what the caller receives

pub mod artifact;
pub mod credential;
pub mod error;
pub mod notification;
pub mod request;
pub mod response;
pub mod stage;

pub use artifact::{
    ArtifactBundle, Document, DocumentOrigin, COMPANION_PATH, PRIMARY_PATH, PUBLISH_BRANCH,
};
pub use credential::ExpectedSecret;
pub use error::{ErrorClass, PageforgeError, Result, ValidationError};
pub use notification::{DeploymentReceipt, NotificationPayload};
pub use request::{validate_task_name, Attachment, RawTaskRequest, TaskRequest};
pub use response::DeployResponse;
pub use stage::Stage;
