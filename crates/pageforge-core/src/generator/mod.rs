//! Artifact generation with deterministic fallback.
//!
//! Each document is requested exactly once. Any failure (transport, provider
//! status, empty text, wrong shape) is logged and replaced by a locally
//! rendered fallback, so generation never fails a round.

pub mod prompt;
pub mod provider;

use std::sync::Arc;

use futures::future::join;

use crate::domain::{ArtifactBundle, Attachment, Document, TaskRequest};
use crate::obs;

pub use provider::{
    ChatCompletionsProvider, GenerationError, GenerationProvider, GenerationRequest, HttpParams,
};

pub struct ArtifactGenerator {
    provider: Arc<dyn GenerationProvider>,
}

impl ArtifactGenerator {
    pub fn new(provider: Arc<dyn GenerationProvider>) -> Self {
        Self { provider }
    }

    /// Generate the primary HTML document.
    pub async fn generate(
        &self,
        brief: &str,
        attachments: &[Attachment],
        checks: &[String],
    ) -> Document {
        let request = prompt::primary_request(brief, attachments, checks);
        match self.try_primary(&request).await {
            Ok(html) => Document::generated(html),
            Err(err) => {
                obs::emit_generation_fallback("primary", &err);
                Document::fallback(prompt::fallback_document(brief))
            }
        }
    }

    async fn try_primary(&self, request: &GenerationRequest) -> Result<String, GenerationError> {
        let raw = self.provider.complete(request).await?;
        let html = prompt::strip_code_fences(&raw);
        prompt::check_document_shape(&html)?;
        Ok(html)
    }

    /// Generate the companion README.
    pub async fn generate_companion(&self, brief: &str, task: &str) -> Document {
        let request = prompt::companion_request(brief, task);
        let result = self
            .provider
            .complete(&request)
            .await
            .map(|raw| prompt::strip_code_fences(&raw))
            .and_then(|text| {
                if text.is_empty() {
                    Err(GenerationError::EmptyContent)
                } else {
                    Ok(text)
                }
            });

        match result {
            Ok(markdown) => Document::generated(markdown),
            Err(err) => {
                obs::emit_generation_fallback("companion", &err);
                Document::fallback(prompt::fallback_readme(task, brief))
            }
        }
    }

    /// Generate both documents concurrently.
    pub async fn generate_bundle(&self, request: &TaskRequest) -> ArtifactBundle {
        let (primary, companion) = join(
            self.generate(&request.brief, &request.attachments, &request.checks),
            self.generate_companion(&request.brief, &request.task),
        )
        .await;
        ArtifactBundle { primary, companion }
    }
}
