//! End-to-end deployment rounds against the in-memory collaborators.

use std::sync::Arc;
use std::time::Duration;

use pageforge_core::fakes::{
    HostOp, MemoryRepositoryHost, RecordingSleeper, ScriptedCallback, ScriptedProvider,
};
use pageforge_core::{
    Attachment, BackoffPolicy, Collaborators, ErrorClass, ExpectedSecret, HostError, Orchestrator,
    PageforgeError, RawTaskRequest, RepositoryHost, Stage, PUBLISH_BRANCH,
};

const OWNER: &str = "Octo-Student";
const SECRET: &str = "correct horse";
const PAGE: &str = "<!DOCTYPE html>\n<html><head><title>Demo</title></head><body>hi</body></html>";
const README: &str = "# demo\n\nA demo page.\n";

struct Harness {
    provider: Arc<ScriptedProvider>,
    host: Arc<MemoryRepositoryHost>,
    callback: Arc<ScriptedCallback>,
    sleeper: Arc<RecordingSleeper>,
    orchestrator: Orchestrator,
}

fn harness(provider: ScriptedProvider, callback: ScriptedCallback) -> Harness {
    let provider = Arc::new(provider);
    let host = Arc::new(MemoryRepositoryHost::new().with_owner(OWNER));
    let callback = Arc::new(callback);
    let sleeper = Arc::new(RecordingSleeper::new());
    let orchestrator = Orchestrator::new(
        ExpectedSecret::new(SECRET),
        OWNER,
        BackoffPolicy::default(),
        Collaborators {
            provider: provider.clone(),
            host: host.clone(),
            callback: callback.clone(),
            sleeper: sleeper.clone(),
        },
    );
    Harness {
        provider,
        host,
        callback,
        sleeper,
        orchestrator,
    }
}

fn happy() -> Harness {
    harness(
        ScriptedProvider::new(Ok(PAGE.to_string()), Ok(README.to_string())),
        ScriptedCallback::always_ok(),
    )
}

fn request(task: &str, round: i64) -> RawTaskRequest {
    RawTaskRequest {
        email: Some("student@example.com".to_string()),
        secret: Some(SECRET.to_string()),
        task: Some(task.to_string()),
        round: Some(round),
        nonce: Some(format!("nonce-{round}")),
        brief: Some("Render a greeting page".to_string()),
        checks: Some(vec!["Page has a title".to_string()]),
        evaluation_url: Some("https://eval.example.com/notify".to_string()),
        attachments: Some(vec![Attachment {
            name: "sample.csv".to_string(),
            url: "data:text/csv;base64,YSxiCjEsMgo=".to_string(),
        }]),
    }
}

#[tokio::test]
async fn first_round_publishes_and_notifies() {
    let h = happy();

    let receipt = h.orchestrator.handle(request("demo", 1)).await.unwrap();

    assert_eq!(receipt.repo_url, format!("https://github.com/{OWNER}/demo"));
    assert_eq!(receipt.pages_url, "https://octo-student.github.io/demo/");
    assert_eq!(h.host.file_content("demo", "index.html").as_deref(), Some(PAGE));
    assert_eq!(h.host.file_content("demo", "README.md").as_deref(), Some(README));
    assert!(h.host.pages_enabled("demo"));

    let sent = h.callback.received();
    assert_eq!(sent.len(), 1);
    let (url, payload) = &sent[0];
    assert_eq!(url, "https://eval.example.com/notify");
    assert_eq!(payload.repo_url, receipt.repo_url);
    assert_eq!(payload.commit_sha, receipt.commit_sha);
    assert_eq!(payload.nonce, "nonce-1");
    assert_eq!(payload.round, 1);
    assert_eq!(h.provider.call_count(), 2);
}

#[tokio::test]
async fn second_round_replaces_files_using_markers() {
    let h = happy();

    let first = h.orchestrator.handle(request("demo", 1)).await.unwrap();
    let index_marker = h.host.file_sha("demo", "index.html").unwrap();
    let readme_marker = h.host.file_sha("demo", "README.md").unwrap();

    let second = h.orchestrator.handle(request("demo", 2)).await.unwrap();

    assert_eq!(second.repo_url, first.repo_url);
    assert_ne!(second.commit_sha, first.commit_sha);

    let writes = h.host.writes();
    let round_two: Vec<_> = writes.iter().skip(2).collect();
    assert_eq!(round_two.len(), 2);
    assert_eq!(round_two[0].path, "index.html");
    assert_eq!(round_two[0].sha.as_deref(), Some(index_marker.as_str()));
    assert_eq!(round_two[0].message, "Update index.html for Round 2");
    assert_eq!(round_two[1].path, "README.md");
    assert_eq!(round_two[1].sha.as_deref(), Some(readme_marker.as_str()));
}

#[tokio::test]
async fn failing_provider_publishes_fallback_documents() {
    let h = harness(ScriptedProvider::failing(), ScriptedCallback::always_ok());

    h.orchestrator.handle(request("demo", 1)).await.unwrap();

    let page = h.host.file_content("demo", "index.html").unwrap();
    assert!(!page.is_empty());
    assert!(page.contains("Automatic generation failed"));
    assert!(page.contains("Render a greeting page"));
    let readme = h.host.file_content("demo", "README.md").unwrap();
    assert!(readme.contains("MIT License"));
}

#[tokio::test]
async fn unmarked_output_is_replaced_by_fallback() {
    let h = harness(
        ScriptedProvider::new(
            Ok("Sure! Here is a page you could build.".to_string()),
            Ok(README.to_string()),
        ),
        ScriptedCallback::always_ok(),
    );

    h.orchestrator.handle(request("demo", 1)).await.unwrap();

    let page = h.host.file_content("demo", "index.html").unwrap();
    assert!(page.contains("Automatic generation failed"));
    assert_eq!(h.host.file_content("demo", "README.md").as_deref(), Some(README));
}

#[tokio::test]
async fn callback_recovers_after_two_failures() {
    let h = harness(
        ScriptedProvider::new(Ok(PAGE.to_string()), Ok(README.to_string())),
        ScriptedCallback::with_fallback(vec![Ok(503), Err("reset".to_string())], Ok(200)),
    );

    h.orchestrator.handle(request("demo", 1)).await.unwrap();

    assert_eq!(h.callback.call_count(), 3);
    assert_eq!(
        h.sleeper.delays(),
        vec![Duration::from_secs(1), Duration::from_secs(2)]
    );
}

#[tokio::test]
async fn exhausted_callback_fails_the_round_after_publishing() {
    let h = harness(
        ScriptedProvider::new(Ok(PAGE.to_string()), Ok(README.to_string())),
        ScriptedCallback::always_failing(),
    );

    let err = h.orchestrator.handle(request("demo", 1)).await.unwrap_err();

    assert!(matches!(
        err,
        PageforgeError::NotificationExhausted { attempts: 5 }
    ));
    assert_eq!(err.stage(), Some(Stage::Notify));
    assert_eq!(err.class(), ErrorClass::Downstream);
    assert_eq!(h.callback.call_count(), 5);
    assert_eq!(
        h.sleeper.delays(),
        vec![1, 2, 4, 8]
            .into_iter()
            .map(Duration::from_secs)
            .collect::<Vec<_>>()
    );
    // Already published content stays in place.
    assert!(h.host.pages_enabled("demo"));
}

#[tokio::test]
async fn existing_repository_is_reused() {
    let h = happy();
    h.orchestrator.handle(request("demo", 1)).await.unwrap();

    let receipt = h.orchestrator.handle(request("demo", 2)).await.unwrap();

    assert_eq!(receipt.repo_url, format!("https://github.com/{OWNER}/demo"));
    assert_eq!(h.host.calls(HostOp::CreateRepository), 2);
    assert_eq!(h.callback.call_count(), 2);
}

#[tokio::test]
async fn repository_creation_failure_stops_before_writes() {
    let h = happy();
    h.host.fail_next(
        HostOp::CreateRepository,
        HostError::Status {
            status: 401,
            message: "Bad credentials".to_string(),
        },
    );

    let err = h.orchestrator.handle(request("demo", 1)).await.unwrap_err();

    assert_eq!(err.stage(), Some(Stage::EnsureRepository));
    assert!(h.host.writes().is_empty());
    assert_eq!(h.callback.call_count(), 0);
}

#[tokio::test]
async fn missing_fields_make_no_remote_calls() {
    let fields = [
        "email",
        "task",
        "nonce",
        "brief",
        "evaluation_url",
    ];
    for field in fields {
        let h = happy();
        let mut raw = request("demo", 1);
        match field {
            "email" => raw.email = None,
            "task" => raw.task = None,
            "nonce" => raw.nonce = None,
            "brief" => raw.brief = None,
            _ => raw.evaluation_url = None,
        }

        let (class, response) = h.orchestrator.respond(raw).await;

        assert_eq!(class, Some(ErrorClass::Rejected), "field {field}");
        assert!(!response.is_success());
        assert_eq!(h.provider.call_count(), 0, "field {field}");
        assert_eq!(h.host.total_calls(), 0, "field {field}");
        assert_eq!(h.callback.call_count(), 0, "field {field}");
    }
}

#[tokio::test]
async fn wrong_or_missing_secret_is_forbidden_without_side_effects() {
    for secret in [None, Some("guess".to_string())] {
        let h = happy();
        let mut raw = request("demo", 1);
        raw.secret = secret;

        let (class, _) = h.orchestrator.respond(raw).await;

        assert_eq!(class, Some(ErrorClass::Forbidden));
        assert_eq!(h.provider.call_count(), 0);
        assert_eq!(h.host.total_calls(), 0);
    }
}

#[tokio::test]
async fn stale_marker_is_surfaced_not_retried() {
    let h = happy();
    h.orchestrator.handle(request("demo", 1)).await.unwrap();
    let writes_before = h.host.writes().len();
    h.host.fail_next(
        HostOp::PutFile,
        HostError::Conflict("index.html does not match".to_string()),
    );

    let err = h.orchestrator.handle(request("demo", 2)).await.unwrap_err();

    match &err {
        PageforgeError::Publish { stage, source } => {
            assert_eq!(*stage, Stage::WriteFiles);
            assert!(matches!(source, HostError::Conflict(_)));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(h.host.writes().len(), writes_before + 1);
    assert_eq!(h.callback.call_count(), 1);
}

#[tokio::test]
async fn hosting_failure_stops_before_resolving_or_notifying() {
    let h = happy();
    h.host.fail_next(
        HostOp::EnablePages,
        HostError::Status {
            status: 500,
            message: "pages backend unavailable".to_string(),
        },
    );

    let err = h.orchestrator.handle(request("demo", 1)).await.unwrap_err();

    assert!(matches!(
        err,
        PageforgeError::Publish {
            source: HostError::Status { status: 500, .. },
            ..
        }
    ));
    assert_eq!(err.stage(), Some(Stage::EnableHosting));
    assert_eq!(err.class(), ErrorClass::Downstream);
    assert!(h.host.file_content("demo", "index.html").is_some());
    assert_eq!(h.host.calls(HostOp::BranchHead), 0);
    assert_eq!(h.callback.call_count(), 0);
}

#[tokio::test]
async fn unresolvable_head_fails_the_round_without_notifying() {
    let h = happy();
    h.host.fail_next(
        HostOp::BranchHead,
        HostError::NotFound("Branch not found".to_string()),
    );

    let err = h.orchestrator.handle(request("demo", 1)).await.unwrap_err();

    match &err {
        PageforgeError::Resolve { branch, source } => {
            assert_eq!(branch, "main");
            assert!(matches!(source, HostError::NotFound(_)));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(err.stage(), Some(Stage::ResolveRevision));
    assert_eq!(err.class(), ErrorClass::Downstream);
    assert!(h.host.pages_enabled("demo"));
    assert_eq!(h.callback.call_count(), 0);
}

#[tokio::test]
async fn every_write_targets_the_served_branch() {
    let h = happy();

    let receipt = h.orchestrator.handle(request("demo", 1)).await.unwrap();

    let writes = h.host.writes();
    assert_eq!(writes.len(), 2);
    assert!(writes
        .iter()
        .all(|write| write.branch.as_deref() == Some(PUBLISH_BRANCH)));
    let head = h
        .host
        .branch_head(OWNER, "demo", PUBLISH_BRANCH)
        .await
        .unwrap();
    assert_eq!(head, receipt.commit_sha);
}

#[tokio::test]
async fn provider_never_sees_secret() {
    let h = happy();
    h.orchestrator.handle(request("demo", 1)).await.unwrap();

    for generation in h.provider.requests() {
        assert!(!generation.prompt.contains(SECRET));
        assert!(!generation.system.contains(SECRET));
    }
}
