//! Pipeline stages of a single deployment round.

use serde::{Deserialize, Serialize};

/// Linear stages a round moves through; a round past `Notify` is done. A
/// failure can end the round at any stage except `GenerateArtifacts`, which
/// degrades to fallback documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    ValidateInput,
    GenerateArtifacts,
    EnsureRepository,
    WriteFiles,
    EnableHosting,
    ResolveRevision,
    Notify,
}

impl Stage {
    pub const fn as_str(self) -> &'static str {
        match self {
            Stage::ValidateInput => "validate_input",
            Stage::GenerateArtifacts => "generate_artifacts",
            Stage::EnsureRepository => "ensure_repository",
            Stage::WriteFiles => "write_files",
            Stage::EnableHosting => "enable_hosting",
            Stage::ResolveRevision => "resolve_revision",
            Stage::Notify => "notify",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
