//! Structured observability hooks for the deployment round lifecycle.
//!
//! This module provides:
//! - Run-scoped tracing spans via the `RunSpan` RAII guard
//! - Emission functions for key lifecycle events: start, stage completion,
//!   generation fallback, notification retries, finish and failure
//!
//! Events are emitted at `info!` level (warnings for degraded paths). Secrets
//! and document bodies are never logged.

use tracing::{info, warn};

use crate::domain::Stage;

/// RAII guard that enters a run-scoped tracing span for the duration of a round.
///
/// # Example
///
/// ```ignore
/// let _span = RunSpan::enter("0b6f...", "captcha-solver", 2);
/// // every event below carries run_id, task and round
/// ```
pub struct RunSpan {
    _span: tracing::span::EnteredSpan,
}

impl RunSpan {
    pub fn enter(run_id: &str, task: &str, round: u32) -> Self {
        let span = tracing::info_span!("pageforge.run", run_id = %run_id, task = %task, round = round);
        Self {
            _span: span.entered(),
        }
    }
}

pub fn emit_run_started(task: &str, round: u32, attachments: usize, checks: usize) {
    info!(
        event = "run.started",
        task = %task,
        round = round,
        attachments = attachments,
        checks = checks,
    );
}

pub fn emit_stage_completed(stage: Stage, elapsed_ms: u64) {
    info!(event = "stage.completed", stage = %stage, elapsed_ms = elapsed_ms);
}

/// Emit event: a document was replaced by its fallback (warning level).
pub fn emit_generation_fallback(document: &str, error: &dyn std::fmt::Display) {
    warn!(event = "generation.fallback", document = %document, error = %error);
}

/// Emit event: one callback attempt failed (warning level).
pub fn emit_notify_attempt_failed(attempt: u32, reason: &str) {
    warn!(event = "notify.attempt_failed", attempt = attempt, reason = %reason);
}

pub fn emit_run_finished(repo_url: &str, commit_sha: &str, duration_ms: u64) {
    info!(
        event = "run.finished",
        repo_url = %repo_url,
        commit_sha = %commit_sha,
        duration_ms = duration_ms,
    );
}

/// Emit event: the round ended in `Failed` (warning level).
pub fn emit_run_failed(stage: Option<Stage>, error: &dyn std::fmt::Display) {
    let stage = stage.map(Stage::as_str).unwrap_or("unknown");
    warn!(event = "run.failed", stage = %stage, error = %error);
}
