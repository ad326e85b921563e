//! Prompt templates, output cleanup and fallback documents.

use std::fmt::Write as _;
use std::sync::OnceLock;

use regex::Regex;

use super::provider::{GenerationError, GenerationRequest};
use crate::domain::Attachment;

/// Attachment references longer than this are cut in the prompt; data URIs
/// can be megabytes.
pub const ATTACHMENT_PREVIEW_CHARS: usize = 100;

pub const DOCUMENT_START: &str = "<!doctype html>";
pub const DOCUMENT_END: &str = "</html>";

const PRIMARY_SYSTEM: &str = "You are an expert web developer. You write complete, \
self-contained single-page applications as one HTML file with inline CSS and JavaScript. \
You reply with the HTML document only.";

const COMPANION_SYSTEM: &str = "You are a technical writer. You write concise, \
professional README.md files in GitHub-flavoured Markdown.";

const MIT_NOTICE: &str = "This project is released under the MIT License. See the LICENSE file for details.";

pub fn format_attachments(attachments: &[Attachment]) -> String {
    if attachments.is_empty() {
        return "(none)".to_string();
    }
    let mut out = String::new();
    for attachment in attachments {
        let preview: String = attachment.url.chars().take(ATTACHMENT_PREVIEW_CHARS).collect();
        let ellipsis = if attachment.url.chars().count() > ATTACHMENT_PREVIEW_CHARS {
            "..."
        } else {
            ""
        };
        let _ = writeln!(out, "- {}: {}{}", attachment.name, preview, ellipsis);
    }
    out
}

pub fn format_checks(checks: &[String]) -> String {
    if checks.is_empty() {
        return "(none)".to_string();
    }
    let mut out = String::new();
    for (i, check) in checks.iter().enumerate() {
        let _ = writeln!(out, "{}. {}", i + 1, check);
    }
    out
}

pub fn primary_request(brief: &str, attachments: &[Attachment], checks: &[String]) -> GenerationRequest {
    let prompt = format!(
        "Build a single-page web application for the following brief.\n\n\
         ## Brief\n{brief}\n\n\
         ## Attachments\n{attachments}\n\
         ## Evaluation checks\nThe page will be evaluated against these checks:\n{checks}\n\
         ## Output format\n\
         - Return ONE complete HTML document and nothing else.\n\
         - Start with <!DOCTYPE html> and end with </html>.\n\
         - Inline all CSS and JavaScript; CDN links are allowed.\n\
         - No explanations, no commentary, no Markdown code fences.\n",
        brief = brief.trim(),
        attachments = format_attachments(attachments),
        checks = format_checks(checks),
    );
    GenerationRequest {
        system: PRIMARY_SYSTEM.to_string(),
        prompt,
    }
}

pub fn companion_request(brief: &str, task: &str) -> GenerationRequest {
    let prompt = format!(
        "Write a README.md for the project `{task}`.\n\n\
         ## Brief\n{brief}\n\n\
         Include: a title, a summary, setup (open index.html or visit the GitHub Pages URL), \
         usage, a short explanation of how the code works, and a License section stating MIT.\n\
         Return only the Markdown, without code fences around the whole document.\n",
        brief = brief.trim(),
    );
    GenerationRequest {
        system: COMPANION_SYSTEM.to_string(),
        prompt,
    }
}

fn fence_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?s)^\s*```[A-Za-z0-9_-]*[ \t]*\r?\n(.*?)\r?\n?```\s*$").expect("static regex")
    })
}

/// Remove a Markdown code fence wrapping the whole text, if present.
///
/// Text that opens and closes with two separate fenced blocks is left as is:
/// the wrapper only counts when its body holds no fence line of its own.
pub fn strip_code_fences(text: &str) -> String {
    match fence_pattern().captures(text) {
        Some(caps) if !has_fence_line(&caps[1]) => caps[1].trim().to_string(),
        _ => text.trim().to_string(),
    }
}

fn has_fence_line(body: &str) -> bool {
    body.lines().any(|line| line.trim_start().starts_with("```"))
}

/// Check the primary document starts and ends with the document markers.
pub fn check_document_shape(html: &str) -> Result<(), GenerationError> {
    let head: String = html.chars().take(DOCUMENT_START.len()).collect();
    if !head.eq_ignore_ascii_case(DOCUMENT_START) {
        return Err(GenerationError::MalformedShape(
            "document does not start with <!DOCTYPE html>".to_string(),
        ));
    }
    let tail_ok = html.len() >= DOCUMENT_END.len()
        && html
            .get(html.len() - DOCUMENT_END.len()..)
            .map(|tail| tail.eq_ignore_ascii_case(DOCUMENT_END))
            .unwrap_or(false);
    if !tail_ok {
        return Err(GenerationError::MalformedShape(
            "document does not end with </html>".to_string(),
        ));
    }
    Ok(())
}

pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            other => out.push(other),
        }
    }
    out
}

/// Minimal page used when generation fails.
pub fn fallback_document(brief: &str) -> String {
    format!(
        "<!DOCTYPE html>\n\
         <html lang=\"en\">\n\
         <head>\n\
         <meta charset=\"utf-8\">\n\
         <meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n\
         <title>Task Application</title>\n\
         <style>body {{ font-family: system-ui, sans-serif; max-width: 48rem; margin: 2rem auto; padding: 0 1rem; }} \
         .notice {{ padding: 1rem; border: 1px solid #d97706; background: #fffbeb; }}</style>\n\
         </head>\n\
         <body>\n\
         <h1>Task Application</h1>\n\
         <p class=\"notice\" id=\"generation-status\">Automatic generation failed; this is a placeholder page.</p>\n\
         <h2>Brief</h2>\n\
         <p id=\"brief\">{}</p>\n\
         </body>\n\
         </html>",
        escape_html(brief.trim())
    )
}

/// Minimal README used when companion generation fails.
pub fn fallback_readme(task: &str, brief: &str) -> String {
    format!(
        "# {task}\n\n\
         ## Summary\n\n{brief}\n\n\
         ## Usage\n\nOpen `index.html` in a browser, or visit the GitHub Pages site for this repository.\n\n\
         ## License\n\n{MIT_NOTICE}\n",
        brief = brief.trim(),
    )
}
