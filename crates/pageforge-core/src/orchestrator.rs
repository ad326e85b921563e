//! One deployment round, end to end.
//!
//! `ValidateInput → GenerateArtifacts → EnsureRepository → WriteFiles →
//! EnableHosting → ResolveRevision → Notify`. Any stage except
//! generation can end the round; nothing already published is rolled back.

use std::sync::Arc;
use std::time::Instant;

use uuid::Uuid;

use crate::backoff::{BackoffPolicy, Sleeper, TokioSleeper};
use crate::config::AppConfig;
use crate::domain::{
    DeployResponse, DeploymentReceipt, ErrorClass, ExpectedSecret, NotificationPayload,
    PageforgeError, RawTaskRequest, Result, Stage, TaskRequest, PUBLISH_BRANCH,
};
use crate::generator::{ArtifactGenerator, ChatCompletionsProvider, GenerationProvider, HttpParams};
use crate::host::{GithubClient, HostError, RepositoryHost};
use crate::notifier::{CallbackTransport, EvaluationNotifier, HttpCallbackTransport};
use crate::obs;
use crate::publisher::{commit_message, RepositoryPublisher};
use crate::resolver::CommitResolver;

/// Remote collaborators of a round.
pub struct Collaborators {
    pub provider: Arc<dyn GenerationProvider>,
    pub host: Arc<dyn RepositoryHost>,
    pub callback: Arc<dyn CallbackTransport>,
    pub sleeper: Arc<dyn Sleeper>,
}

pub struct Orchestrator {
    secret: ExpectedSecret,
    generator: ArtifactGenerator,
    publisher: RepositoryPublisher,
    resolver: CommitResolver,
    notifier: EvaluationNotifier,
}

impl Orchestrator {
    pub fn new(
        secret: ExpectedSecret,
        owner: &str,
        notify: BackoffPolicy,
        collaborators: Collaborators,
    ) -> Self {
        let Collaborators {
            provider,
            host,
            callback,
            sleeper,
        } = collaborators;
        Self {
            secret,
            generator: ArtifactGenerator::new(provider),
            publisher: RepositoryPublisher::new(host.clone(), owner, PUBLISH_BRANCH),
            resolver: CommitResolver::new(host, owner),
            notifier: EvaluationNotifier::new(callback, sleeper, notify),
        }
    }

    /// Wire the production collaborators from process configuration.
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let collaborators = Collaborators {
            provider: Arc::new(ChatCompletionsProvider::new(
                &config.llm,
                HttpParams::default(),
            )?),
            host: Arc::new(GithubClient::new(&config.github)?),
            callback: Arc::new(HttpCallbackTransport::new()?),
            sleeper: Arc::new(TokioSleeper),
        };
        Ok(Self::new(
            ExpectedSecret::new(&config.expected_secret),
            &config.github.owner,
            config.notify,
            collaborators,
        ))
    }

    /// Check the credential, then the request shape. No remote call happens
    /// unless both pass.
    pub fn admit(&self, raw: RawTaskRequest) -> Result<TaskRequest> {
        self.secret.verify(raw.secret.as_deref())?;
        Ok(raw.validate()?)
    }

    /// Run a round for an unvalidated request.
    pub async fn handle(&self, raw: RawTaskRequest) -> Result<DeploymentReceipt> {
        let request = match self.admit(raw) {
            Ok(request) => request,
            Err(err) => {
                obs::emit_run_failed(err.stage(), &err);
                return Err(err);
            }
        };
        self.run(&request).await
    }

    /// Run a round and map the outcome to the caller-facing response.
    pub async fn respond(&self, raw: RawTaskRequest) -> (Option<ErrorClass>, DeployResponse) {
        DeployResponse::from_result(self.handle(raw).await)
    }

    /// Run every stage after validation for an already admitted request.
    pub async fn run(&self, request: &TaskRequest) -> Result<DeploymentReceipt> {
        let run_id = Uuid::new_v4().to_string();
        let _span = obs::RunSpan::enter(&run_id, &request.task, request.round);
        let started = Instant::now();
        obs::emit_run_started(
            &request.task,
            request.round,
            request.attachments.len(),
            request.checks.len(),
        );

        match self.stages(request).await {
            Ok(receipt) => {
                obs::emit_run_finished(
                    &receipt.repo_url,
                    &receipt.commit_sha,
                    started.elapsed().as_millis() as u64,
                );
                Ok(receipt)
            }
            Err(err) => {
                obs::emit_run_failed(err.stage(), &err);
                Err(err)
            }
        }
    }

    async fn stages(&self, request: &TaskRequest) -> Result<DeploymentReceipt> {
        let task = request.task.as_str();

        let mut clock = Instant::now();
        let bundle = self.generator.generate_bundle(request).await;
        clock = completed(Stage::GenerateArtifacts, clock);

        let repository = self
            .publisher
            .ensure_repository(task)
            .await
            .map_err(publish_err(Stage::EnsureRepository))?;
        clock = completed(Stage::EnsureRepository, clock);

        for (path, document) in bundle.files() {
            let message = commit_message(path, request.round);
            self.publisher
                .write_file(task, path, &document.content, &message)
                .await
                .map_err(publish_err(Stage::WriteFiles))?;
        }
        clock = completed(Stage::WriteFiles, clock);

        let pages_url = self
            .publisher
            .enable_hosting(task)
            .await
            .map_err(publish_err(Stage::EnableHosting))?;
        clock = completed(Stage::EnableHosting, clock);

        let branch = self.publisher.branch();
        let commit_sha = self
            .resolver
            .latest_revision(task, branch)
            .await
            .map_err(|source| PageforgeError::Resolve {
                branch: branch.to_string(),
                source,
            })?;
        clock = completed(Stage::ResolveRevision, clock);

        let receipt = DeploymentReceipt {
            repo_url: repository.url,
            commit_sha,
            pages_url,
        };
        let payload = NotificationPayload::new(request, &receipt);
        let report = self.notifier.notify(&request.evaluation_url, &payload).await;
        if !report.succeeded {
            return Err(PageforgeError::NotificationExhausted {
                attempts: report.attempts,
            });
        }
        completed(Stage::Notify, clock);

        Ok(receipt)
    }
}

fn completed(stage: Stage, since: Instant) -> Instant {
    obs::emit_stage_completed(stage, since.elapsed().as_millis() as u64);
    Instant::now()
}

fn publish_err(stage: Stage) -> impl Fn(HostError) -> PageforgeError {
    move |source| PageforgeError::Publish { stage, source }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fakes::{MemoryRepositoryHost, RecordingSleeper, ScriptedCallback, ScriptedProvider};

    const PAGE: &str = "<!doctype html><html><body>ok</body></html>";

    fn orchestrator(host: Arc<MemoryRepositoryHost>, callback: Arc<ScriptedCallback>) -> Orchestrator {
        Orchestrator::new(
            ExpectedSecret::new("s3cret"),
            "octo",
            BackoffPolicy::default(),
            Collaborators {
                provider: Arc::new(ScriptedProvider::new(
                    Ok(PAGE.to_string()),
                    Ok("# Demo\n".to_string()),
                )),
                host,
                callback,
                sleeper: Arc::new(RecordingSleeper::new()),
            },
        )
    }

    fn raw(secret: &str) -> RawTaskRequest {
        RawTaskRequest {
            email: Some("student@example.com".to_string()),
            secret: Some(secret.to_string()),
            task: Some("demo".to_string()),
            round: Some(1),
            nonce: Some("n-1".to_string()),
            brief: Some("A page".to_string()),
            checks: None,
            evaluation_url: Some("https://eval.example.com/cb".to_string()),
            attachments: None,
        }
    }

    #[tokio::test]
    async fn round_reaches_done() {
        let host = Arc::new(MemoryRepositoryHost::new());
        let callback = Arc::new(ScriptedCallback::always_ok());
        let orch = orchestrator(host.clone(), callback.clone());

        let receipt = orch.handle(raw("s3cret")).await.unwrap();
        assert_eq!(receipt.repo_url, "https://github.com/octo/demo");
        assert_eq!(receipt.pages_url, "https://octo.github.io/demo/");
        assert_eq!(host.file_content("demo", "index.html").as_deref(), Some(PAGE));
        assert_eq!(callback.received()[0].1.commit_sha, receipt.commit_sha);
    }

    #[tokio::test]
    async fn bad_secret_is_forbidden() {
        let host = Arc::new(MemoryRepositoryHost::new());
        let orch = orchestrator(host.clone(), Arc::new(ScriptedCallback::always_ok()));

        let (class, response) = orch.respond(raw("wrong")).await;
        assert_eq!(class, Some(ErrorClass::Forbidden));
        assert!(!response.is_success());
        assert_eq!(host.total_calls(), 0);
    }

    #[tokio::test]
    async fn write_failure_names_stage() {
        let host = Arc::new(MemoryRepositoryHost::new());
        host.fail_next(
            crate::fakes::HostOp::PutFile,
            HostError::Status {
                status: 500,
                message: "boom".to_string(),
            },
        );
        let callback = Arc::new(ScriptedCallback::always_ok());
        let orch = orchestrator(host, callback.clone());

        let err = orch.handle(raw("s3cret")).await.unwrap_err();
        assert_eq!(err.stage(), Some(Stage::WriteFiles));
        assert_eq!(err.class(), ErrorClass::Downstream);
        assert_eq!(callback.call_count(), 0);
    }
}
