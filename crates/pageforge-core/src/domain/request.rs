//! Inbound task requests.
//!
//! A request arrives as a [`RawTaskRequest`] where every field is optional, is
//! checked against the expected credential, and is then validated into a
//! [`TaskRequest`] whose required fields are guaranteed non-empty.

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use super::error::ValidationError;

/// Maximum repository name length accepted by the hosting target.
pub const MAX_TASK_LEN: usize = 100;

/// A file attached to the brief, usually a data URI or a plain URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    pub name: String,
    pub url: String,
}

/// Task request exactly as received, before any checks.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawTaskRequest {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub secret: Option<String>,
    #[serde(default)]
    pub task: Option<String>,
    #[serde(default)]
    pub round: Option<i64>,
    #[serde(default)]
    pub nonce: Option<String>,
    #[serde(default)]
    pub brief: Option<String>,
    #[serde(default)]
    pub checks: Option<Vec<String>>,
    #[serde(default)]
    pub evaluation_url: Option<String>,
    #[serde(default)]
    pub attachments: Option<Vec<Attachment>>,
}

/// A validated request for one round of one task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskRequest {
    pub email: String,
    pub task: String,
    pub round: u32,
    pub nonce: String,
    pub brief: String,
    pub checks: Vec<String>,
    pub evaluation_url: String,
    pub attachments: Vec<Attachment>,
}

impl RawTaskRequest {
    /// Parse a JSON body. Syntax or type errors become
    /// [`ValidationError::MalformedBody`].
    pub fn from_json(body: &[u8]) -> Result<Self, ValidationError> {
        serde_json::from_slice(body).map_err(|e| ValidationError::MalformedBody(e.to_string()))
    }

    /// Validate every field except the credential.
    pub fn validate(self) -> Result<TaskRequest, ValidationError> {
        let email = required(self.email, "email")?;
        let task = required(self.task, "task")?;
        validate_task_name(&task)?;
        let nonce = required(self.nonce, "nonce")?;
        let brief = required(self.brief, "brief")?;
        let evaluation_url = required(self.evaluation_url, "evaluation_url")?;

        let round = match self.round {
            None => 1,
            Some(r) if r >= 1 && r <= i64::from(u32::MAX) => r as u32,
            Some(r) => return Err(ValidationError::InvalidRound(r)),
        };

        Ok(TaskRequest {
            email,
            task,
            round,
            nonce,
            brief,
            checks: self.checks.unwrap_or_default(),
            evaluation_url,
            attachments: self.attachments.unwrap_or_default(),
        })
    }
}

fn required(value: Option<String>, field: &'static str) -> Result<String, ValidationError> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(ValidationError::MissingField { field }),
    }
}

fn task_name_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[A-Za-z0-9._-]+$").expect("static regex"))
}

/// A task identifier doubles as the repository name, so it must be a token
/// the hosting target accepts verbatim.
pub fn validate_task_name(task: &str) -> Result<(), ValidationError> {
    let invalid = |reason: &str| ValidationError::InvalidTask {
        task: task.to_string(),
        reason: reason.to_string(),
    };

    if task.len() > MAX_TASK_LEN {
        return Err(invalid("longer than 100 characters"));
    }
    if task == "." || task == ".." {
        return Err(invalid("reserved name"));
    }
    if !task_name_pattern().is_match(task) {
        return Err(invalid(
            "only ASCII letters, digits, '.', '-' and '_' are allowed",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn complete() -> RawTaskRequest {
        RawTaskRequest {
            email: Some("student@example.com".to_string()),
            secret: Some("s3cret".to_string()),
            task: Some("captcha-solver-3f2a".to_string()),
            round: Some(1),
            nonce: Some("ab12-cd34".to_string()),
            brief: Some("Build a captcha solver page".to_string()),
            checks: Some(vec!["Page has a title".to_string()]),
            evaluation_url: Some("https://eval.example.com/notify".to_string()),
            attachments: None,
        }
    }

    #[test]
    fn validates_complete_request() {
        let req = complete().validate().unwrap();
        assert_eq!(req.task, "captcha-solver-3f2a");
        assert_eq!(req.round, 1);
        assert_eq!(req.checks.len(), 1);
        assert!(req.attachments.is_empty());
    }

    #[test]
    fn round_defaults_to_one_only_when_absent() {
        let mut raw = complete();
        raw.round = None;
        assert_eq!(raw.validate().unwrap().round, 1);

        let mut raw = complete();
        raw.round = Some(0);
        assert_eq!(
            raw.validate().unwrap_err(),
            ValidationError::InvalidRound(0)
        );

        let mut raw = complete();
        raw.round = Some(-3);
        assert!(raw.validate().is_err());
    }

    #[test]
    fn each_required_field_is_enforced() {
        let cases: Vec<(&str, fn(&mut RawTaskRequest))> = vec![
            ("email", |r| r.email = None),
            ("task", |r| r.task = None),
            ("nonce", |r| r.nonce = Some(String::new())),
            ("brief", |r| r.brief = Some("   ".to_string())),
            ("evaluation_url", |r| r.evaluation_url = None),
        ];
        for (field, strip) in cases {
            let mut raw = complete();
            strip(&mut raw);
            assert_eq!(
                raw.validate().unwrap_err(),
                ValidationError::MissingField { field },
                "field {field}"
            );
        }
    }

    #[test]
    fn rejects_unusable_repository_names() {
        assert!(validate_task_name("my-app_v2.1").is_ok());
        assert!(validate_task_name("has space").is_err());
        assert!(validate_task_name("slash/name").is_err());
        assert!(validate_task_name("..").is_err());
        assert!(validate_task_name(&"a".repeat(101)).is_err());
    }

    #[test]
    fn parses_wire_format() {
        let body = br#"{
            "email": "student@example.com",
            "secret": "s3cret",
            "task": "markdown-to-html",
            "round": 2,
            "nonce": "n-1",
            "brief": "Render markdown",
            "checks": ["Uses marked"],
            "evaluation_url": "https://eval.example.com/notify",
            "attachments": [{"name": "input.md", "url": "data:text/markdown;base64,IyBIaQ=="}]
        }"#;
        let raw = RawTaskRequest::from_json(body).unwrap();
        let req = raw.validate().unwrap();
        assert_eq!(req.round, 2);
        assert_eq!(req.attachments[0].name, "input.md");
    }

    #[test]
    fn malformed_body_is_a_validation_error() {
        let err = RawTaskRequest::from_json(b"{not json").unwrap_err();
        assert!(matches!(err, ValidationError::MalformedBody(_)));

        let err = RawTaskRequest::from_json(br#"{"round": "two"}"#).unwrap_err();
        assert!(matches!(err, ValidationError::MalformedBody(_)));
    }
}
