//! Generated documents for one round.

use serde::{Deserialize, Serialize};

/// Repository path of the primary single-page document.
pub const PRIMARY_PATH: &str = "index.html";

/// Repository path of the companion description.
pub const COMPANION_PATH: &str = "README.md";

/// Branch both documents are committed to and the site is served from.
/// Repositories are created with auto-init, so it is their default branch.
pub const PUBLISH_BRANCH: &str = "main";

/// Where a document's content came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentOrigin {
    Generated,
    Fallback,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub content: String,
    pub origin: DocumentOrigin,
}

impl Document {
    pub fn generated(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            origin: DocumentOrigin::Generated,
        }
    }

    pub fn fallback(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            origin: DocumentOrigin::Fallback,
        }
    }

    pub fn is_fallback(&self) -> bool {
        self.origin == DocumentOrigin::Fallback
    }
}

/// Primary document plus companion README, created fresh every run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactBundle {
    pub primary: Document,
    pub companion: Document,
}

impl ArtifactBundle {
    /// Files to publish, in write order.
    pub fn files(&self) -> [(&'static str, &Document); 2] {
        [(PRIMARY_PATH, &self.primary), (COMPANION_PATH, &self.companion)]
    }
}
