//! Caller credential verification.

use sha2::{Digest, Sha256};

use super::error::PageforgeError;

/// The credential callers must present, held only as a SHA-256 digest so the
/// comparison runs over fixed-length values regardless of input length.
#[derive(Clone)]
pub struct ExpectedSecret {
    digest: [u8; 32],
}

impl ExpectedSecret {
    pub fn new(secret: &str) -> Self {
        Self {
            digest: digest(secret),
        }
    }

    pub fn matches(&self, presented: &str) -> bool {
        let other = digest(presented);
        self.digest
            .iter()
            .zip(other.iter())
            .fold(0u8, |acc, (a, b)| acc | (a ^ b))
            == 0
    }

    /// Check an optional presented credential. Missing and mismatched
    /// credentials are both authorization failures.
    pub fn verify(&self, presented: Option<&str>) -> Result<(), PageforgeError> {
        match presented {
            None | Some("") => Err(PageforgeError::Unauthorized(
                "missing secret".to_string(),
            )),
            Some(value) if self.matches(value) => Ok(()),
            Some(_) => Err(PageforgeError::Unauthorized(
                "secret does not match".to_string(),
            )),
        }
    }
}

impl std::fmt::Debug for ExpectedSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("ExpectedSecret(<redacted>)")
    }
}

fn digest(value: &str) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(value.as_bytes());
    hasher.finalize().into()
}
