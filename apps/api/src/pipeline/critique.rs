//! Self-Critique Validator — checks a rewritten bullet against the resume for
//! unsupported claims.
//!
//! Issues are a tagged type rather than bare strings so the presentation
//! layer can distinguish a real finding from "the tool was down" with a
//! type-level match instead of magic-substring comparisons. On the wire,
//! `ToolUnavailable` still serializes to the documented marker string.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::llm_client::{parse_json, ChatCompleter, CompletionOptions, LlmError};
use crate::pipeline::prompts::{CRITIQUE_PROMPT_TEMPLATE, CRITIQUE_SYSTEM};

const CRITIQUE_OPTIONS: CompletionOptions = CompletionOptions {
    temperature: 0.2,
    max_tokens: 600,
};

/// Wire marker for `CritiqueIssue::ToolUnavailable`. Documented for the
/// presentation layer, which filters it from user-facing issue lists.
pub const TOOL_UNAVAILABLE_MARKER: &str = "critique_api_error";

/// One critique issue: either a genuine finding about the rewritten bullet,
/// or a marker that the validator itself was unavailable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum CritiqueIssue {
    Finding(String),
    ToolUnavailable,
}

impl CritiqueIssue {
    pub fn is_tool_unavailable(&self) -> bool {
        matches!(self, CritiqueIssue::ToolUnavailable)
    }
}

impl From<String> for CritiqueIssue {
    fn from(s: String) -> Self {
        if s == TOOL_UNAVAILABLE_MARKER {
            CritiqueIssue::ToolUnavailable
        } else {
            CritiqueIssue::Finding(s)
        }
    }
}

impl From<CritiqueIssue> for String {
    fn from(issue: CritiqueIssue) -> Self {
        match issue {
            CritiqueIssue::Finding(text) => text,
            CritiqueIssue::ToolUnavailable => TOOL_UNAVAILABLE_MARKER.to_string(),
        }
    }
}

/// Verdict on one rewritten bullet.
///
/// `is_supported` is true only when the model's verdict was affirmative AND
/// no findings were extracted — a finding always flips it to false.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CritiqueResult {
    pub is_supported: bool,
    pub issues: Vec<CritiqueIssue>,
    pub evidence_snippets: Vec<String>,
    pub self_critique: String,
}

/// Expected JSON shape of the critique model response. Every field defaults
/// so a sparse-but-valid response still parses.
#[derive(Debug, Deserialize)]
struct CritiquePayload {
    #[serde(default)]
    self_critique: String,
    #[serde(default = "default_true")]
    is_supported_by_resume: bool,
    #[serde(default)]
    issues: Vec<String>,
    #[serde(default)]
    evidence_snippets: Vec<String>,
}

fn default_true() -> bool {
    true
}

/// Runs the self-critique pass for one bullet. Never fails: LLM trouble
/// yields the documented fallback with `is_supported = false` and a single
/// `ToolUnavailable` issue.
pub async fn critique_bullet(
    llm: &dyn ChatCompleter,
    original: &str,
    improved: &str,
    resume_text: &str,
    job_description: &str,
) -> CritiqueResult {
    let prompt = CRITIQUE_PROMPT_TEMPLATE
        .replace("{original_bullet}", original)
        .replace("{improved_bullet}", improved)
        .replace("{resume_text}", resume_text)
        .replace("{job_description}", job_description);

    let payload = match llm.complete(&prompt, CRITIQUE_SYSTEM, CRITIQUE_OPTIONS).await {
        Ok(text) => parse_json::<CritiquePayload>(&text),
        Err(e) => Err(e),
    };

    match payload {
        Ok(payload) => {
            let issues: Vec<CritiqueIssue> = payload
                .issues
                .into_iter()
                .filter(|i| !i.trim().is_empty())
                .map(CritiqueIssue::Finding)
                .collect();

            let is_supported = payload.is_supported_by_resume && issues.is_empty();
            let mut self_critique = payload.self_critique;

            // A supported verdict must carry evidence or say why it has none.
            if is_supported && payload.evidence_snippets.is_empty() {
                if !self_critique.is_empty() {
                    self_critique.push(' ');
                }
                self_critique.push_str("No supporting resume quotes were cited for this verdict.");
            }

            CritiqueResult {
                is_supported,
                issues,
                evidence_snippets: payload.evidence_snippets,
                self_critique,
            }
        }
        Err(e) => {
            warn!("Self-critique unavailable for bullet, using fallback: {e}");
            fallback_critique(&e)
        }
    }
}

/// The degraded-mode critique: conservative verdict plus the unavailability
/// marker the presentation layer knows to filter out.
fn fallback_critique(error: &LlmError) -> CritiqueResult {
    let self_critique = match error {
        LlmError::MissingApiKey => {
            "The automated fact-check is unavailable without an LLM credential; \
             the rewritten bullet could not be verified against the resume."
                .to_string()
        }
        e => format!(
            "The automated fact-check was unavailable ({e}); \
             the rewritten bullet could not be verified against the resume."
        ),
    };

    CritiqueResult {
        is_supported: false,
        issues: vec![CritiqueIssue::ToolUnavailable],
        evidence_snippets: Vec::new(),
        self_critique,
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
