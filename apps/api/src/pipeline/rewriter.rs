//! Bullet Rewriter — LLM-backed rewrite of a single bullet with graceful
//! degradation.
//!
//! The degraded-mode contract is first-class here, not an afterthought: any
//! `LlmError` (transport, quota, missing credential, unparsable output)
//! produces a complete fallback `RewriteResult` carrying the original bullet
//! and a human-readable notice. Callers always get a full result.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::llm_client::prompts::HONESTY_INSTRUCTION;
use crate::llm_client::{parse_json, ChatCompleter, CompletionOptions, LlmError};
use crate::pipeline::extractor::Bullet;
use crate::pipeline::prompts::{
    RELEVANCE_REWRITE_PROMPT_TEMPLATE, RELEVANCE_REWRITE_SYSTEM, REWRITE_PROMPT_TEMPLATE,
    REWRITE_SYSTEM,
};
use crate::pipeline::relevance::RelevanceMatch;

const REWRITE_OPTIONS: CompletionOptions = CompletionOptions {
    temperature: 0.4,
    max_tokens: 800,
};

const RELEVANCE_REWRITE_OPTIONS: CompletionOptions = CompletionOptions {
    temperature: 0.5,
    max_tokens: 800,
};

/// Result of rewriting one bullet. `improved` is always a single statement.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RewriteResult {
    pub original: String,
    pub improved: String,
    pub explanation: String,
    pub why_it_works: String,
}

/// Result of the amplified relevance-targeted rewrite used by re-improve.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelevanceRewrite {
    pub improved: String,
    pub explanation: String,
    pub why_it_works: String,
    pub relevance_improvements: String,
}

/// Expected JSON shape of the rewrite model response.
#[derive(Debug, Deserialize)]
struct RewritePayload {
    improved: String,
    #[serde(default)]
    explanation: String,
    #[serde(default)]
    why_it_works: String,
}

#[derive(Debug, Deserialize)]
struct RelevanceRewritePayload {
    improved: String,
    #[serde(default)]
    explanation: String,
    #[serde(default)]
    why_it_works: String,
    #[serde(default)]
    relevance_improvements: String,
}

/// Rewrites one bullet for the target job. Never fails: LLM trouble yields
/// the documented fallback where `improved == original`.
pub async fn rewrite_bullet(
    llm: &dyn ChatCompleter,
    bullet: &Bullet,
    relevance: &RelevanceMatch,
    resume_text: &str,
    job_description: &str,
) -> RewriteResult {
    let prompt = REWRITE_PROMPT_TEMPLATE
        .replace("{honesty_instruction}", HONESTY_INSTRUCTION)
        .replace("{bullet}", &bullet.text)
        .replace("{resume_text}", resume_text)
        .replace("{job_description}", job_description)
        .replace("{jd_excerpt}", &relevance.matched_jd_excerpt);

    let payload = match llm.complete(&prompt, REWRITE_SYSTEM, REWRITE_OPTIONS).await {
        Ok(text) => parse_json::<RewritePayload>(&text),
        Err(e) => Err(e),
    };

    match payload {
        Ok(payload) if !payload.improved.trim().is_empty() => RewriteResult {
            original: bullet.text.trim().to_string(),
            improved: single_statement(&payload.improved),
            explanation: payload.explanation,
            why_it_works: payload.why_it_works,
        },
        Ok(_) => {
            warn!("Rewrite model returned an empty bullet; keeping original");
            fallback_rewrite(bullet, &LlmError::EmptyContent)
        }
        Err(e) => {
            warn!("Rewrite unavailable for bullet, using fallback: {e}");
            fallback_rewrite(bullet, &e)
        }
    }
}

/// The degraded-mode rewrite: original text back, with notices explaining
/// that automated improvement was unavailable.
fn fallback_rewrite(bullet: &Bullet, error: &LlmError) -> RewriteResult {
    let explanation = match error {
        LlmError::MissingApiKey => {
            "No LLM credential is configured; returned the original bullet.".to_string()
        }
        e => format!("Automated improvement was unavailable ({e}); returned the original bullet."),
    };

    RewriteResult {
        original: bullet.text.trim().to_string(),
        improved: bullet.text.trim().to_string(),
        explanation,
        why_it_works: "Acts as a safe fallback until the language model is available again."
            .to_string(),
    }
}

/// The amplified rewrite for the re-improve loop: pushes the current bullet
/// toward `target_relevance` by leaning on JD keywords. Same fallback
/// contract as `rewrite_bullet`, keyed on the current (not original) text.
pub async fn rewrite_for_relevance(
    llm: &dyn ChatCompleter,
    current_bullet: &str,
    original_bullet: &str,
    resume_text: &str,
    job_description: &str,
    current_relevance: f32,
    target_relevance: f32,
) -> RelevanceRewrite {
    let prompt = RELEVANCE_REWRITE_PROMPT_TEMPLATE
        .replace("{honesty_instruction}", HONESTY_INSTRUCTION)
        .replace("{current_bullet}", current_bullet)
        .replace("{original_bullet}", original_bullet)
        .replace("{resume_text}", resume_text)
        .replace("{job_description}", job_description)
        .replace("{current_pct}", &format!("{:.0}", current_relevance * 100.0))
        .replace("{target_pct}", &format!("{:.0}", target_relevance * 100.0));

    let payload = match llm
        .complete(&prompt, RELEVANCE_REWRITE_SYSTEM, RELEVANCE_REWRITE_OPTIONS)
        .await
    {
        Ok(text) => parse_json::<RelevanceRewritePayload>(&text),
        Err(e) => Err(e),
    };

    match payload {
        Ok(payload) if !payload.improved.trim().is_empty() => RelevanceRewrite {
            improved: single_statement(&payload.improved),
            explanation: payload.explanation,
            why_it_works: payload.why_it_works,
            relevance_improvements: payload.relevance_improvements,
        },
        Ok(_) | Err(_) => {
            warn!("Relevance rewrite unavailable; keeping current bullet");
            RelevanceRewrite {
                improved: current_bullet.trim().to_string(),
                explanation: "Automated improvement was unavailable; returned the current bullet."
                    .to_string(),
                why_it_works: "Acts as a safe fallback until the language model is available again."
                    .to_string(),
                relevance_improvements: String::new(),
            }
        }
    }
}

/// Collapses model output to a single bullet statement: first non-empty line,
/// leading list markers stripped.
fn single_statement(text: &str) -> String {
    text.lines()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .unwrap_or("")
        .trim_start_matches(['-', '•', '*', '·', ' '])
        .trim()
        .to_string()
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
