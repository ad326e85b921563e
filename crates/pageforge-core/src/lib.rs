//! Pageforge Core Library
//!
//! Turns a task brief into a published static site: generates the documents,
//! commits them to a per-task repository, enables hosting, resolves the
//! published revision and notifies the evaluator.

pub mod backoff;
pub mod config;
pub mod domain;
pub mod fakes;
pub mod generator;
pub mod host;
pub mod notifier;
pub mod obs;
pub mod orchestrator;
pub mod publisher;
pub mod resolver;
pub mod telemetry;

pub use backoff::{with_backoff, AttemptReport, BackoffPolicy, Sleeper, TokioSleeper};
pub use config::{AppConfig, ConfigError, GithubConfig, LlmConfig};
pub use domain::{
    ArtifactBundle, Attachment, DeployResponse, DeploymentReceipt, Document, DocumentOrigin,
    ErrorClass, ExpectedSecret, NotificationPayload, PUBLISH_BRANCH, PageforgeError,
    RawTaskRequest, Result, Stage, TaskRequest, ValidationError,
};
pub use generator::{
    ArtifactGenerator, ChatCompletionsProvider, GenerationError, GenerationProvider,
    GenerationRequest,
};
pub use host::{GithubClient, HostError, RepositoryHost};
pub use notifier::{CallbackTransport, EvaluationNotifier, HttpCallbackTransport};
pub use orchestrator::{Collaborators, Orchestrator};
pub use publisher::{EnsuredRepository, RepositoryPublisher};
pub use resolver::CommitResolver;
pub use telemetry::init_tracing;

/// Crate version, reported by the binaries.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
