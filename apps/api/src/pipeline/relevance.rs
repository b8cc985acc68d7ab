//! Relevance Mapper — pluggable, trait-based scorer that measures each resume
//! bullet against the job description and picks the best-matching JD excerpt.
//!
//! Default: `KeywordRelevanceScorer` (pure-Rust, fast, deterministic, fully
//! testable). An embedding-based backend can implement the same trait and be
//! swapped in `AppState` without touching the pipeline or handlers.

use std::collections::HashSet;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::pipeline::extractor::Bullet;

/// How a single bullet relates to the job description.
///
/// `score` is always in `[0, 1]` (clamped at this boundary) and deterministic
/// for identical inputs under the same backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelevanceMatch {
    pub bullet: String,
    pub score: f32,
    pub matched_jd_excerpt: String,
}

/// The relevance scorer trait. Implement this to swap backends without
/// touching the orchestrator, handlers, or caller code.
///
/// Carried in `AppState` as `Arc<dyn RelevanceScorer>`.
#[async_trait]
pub trait RelevanceScorer: Send + Sync {
    /// Scores every bullet against the JD. One result per input bullet,
    /// same order. Must not fail on an empty JD: that case yields score 0
    /// and an empty excerpt for every bullet.
    async fn map_bullets(
        &self,
        bullets: &[Bullet],
        job_description: &str,
    ) -> Result<Vec<RelevanceMatch>, AppError>;

    /// Scores a single piece of text against the full JD. Used by the
    /// re-improve loop to measure whether a rewrite moved the needle.
    async fn score_one(&self, text: &str, job_description: &str) -> Result<f32, AppError>;
}

// ────────────────────────────────────────────────────────────────────────────
// KeywordRelevanceScorer — default lexical implementation
// ────────────────────────────────────────────────────────────────────────────

/// Pure-Rust keyword-overlap scorer. Fast, deterministic, no LLM call.
///
/// Algorithm:
/// 1. Lowercase both texts, split into words, drop stop words.
/// 2. similarity = min(2 × Jaccard(bullet_words, jd_words), 1.0)
/// 3. Excerpt = the JD sentence/section maximizing similarity, first
///    occurrence winning ties.
pub struct KeywordRelevanceScorer;

#[async_trait]
impl RelevanceScorer for KeywordRelevanceScorer {
    async fn map_bullets(
        &self,
        bullets: &[Bullet],
        job_description: &str,
    ) -> Result<Vec<RelevanceMatch>, AppError> {
        Ok(map_bullets_to_jd(bullets, job_description))
    }

    async fn score_one(&self, text: &str, job_description: &str) -> Result<f32, AppError> {
        Ok(keyword_similarity(text, job_description))
    }
}

const MAX_JD_CHUNKS: usize = 50;
const MIN_SENTENCE_LEN: usize = 20;
const MIN_SECTION_LEN: usize = 30;
/// Excerpt length when the JD has no usable sentences or sections.
const FALLBACK_EXCERPT_CHARS: usize = 200;

const STOP_WORDS: &[&str] = &[
    "the", "a", "an", "and", "or", "but", "in", "on", "at", "to", "for", "of", "with", "by",
    "from", "as", "is", "was", "are", "were", "been", "be", "have", "has", "had", "do", "does",
    "did", "will", "would", "should", "could", "may", "might", "must", "can",
];

fn map_bullets_to_jd(bullets: &[Bullet], job_description: &str) -> Vec<RelevanceMatch> {
    if job_description.trim().is_empty() {
        return bullets
            .iter()
            .map(|b| RelevanceMatch {
                bullet: b.text.clone(),
                score: 0.0,
                matched_jd_excerpt: String::new(),
            })
            .collect();
    }

    let chunks = extract_jd_chunks(job_description);

    bullets
        .iter()
        .map(|bullet| {
            if chunks.is_empty() {
                // No usable chunks: score against the whole JD.
                return RelevanceMatch {
                    bullet: bullet.text.clone(),
                    score: keyword_similarity(&bullet.text, job_description),
                    matched_jd_excerpt: job_description
                        .chars()
                        .take(FALLBACK_EXCERPT_CHARS)
                        .collect(),
                };
            }

            let mut best_score = 0.0_f32;
            let mut best_chunk = chunks[0].as_str();

            // Strict `>` keeps the first occurrence on ties.
            for chunk in &chunks {
                let score = keyword_similarity(&bullet.text, chunk);
                if score > best_score {
                    best_score = score;
                    best_chunk = chunk;
                }
            }

            RelevanceMatch {
                bullet: bullet.text.clone(),
                score: best_score,
                matched_jd_excerpt: best_chunk.to_string(),
            }
        })
        .collect()
}

/// Keyword-overlap similarity in `[0, 1]`. Jaccard over stop-word-filtered
/// word sets, scaled ×2 so realistic bullet/JD pairs spread across the range.
fn keyword_similarity(text: &str, jd_text: &str) -> f32 {
    let text_words = content_words(text);
    let jd_words = content_words(jd_text);

    if text_words.is_empty() || jd_words.is_empty() {
        return 0.0;
    }

    let intersection = text_words.intersection(&jd_words).count();
    let union = text_words.union(&jd_words).count();

    let similarity = intersection as f32 / union as f32;
    (similarity * 2.0).clamp(0.0, 1.0)
}

fn content_words(text: &str) -> HashSet<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty() && !STOP_WORDS.contains(w))
        .map(str::to_string)
        .collect()
}

/// Candidate excerpts: JD sentences first, then blank-line sections, in
/// document order. Capped to keep the per-bullet scan bounded.
fn extract_jd_chunks(job_description: &str) -> Vec<String> {
    let mut chunks: Vec<String> = Vec::new();

    let flattened = job_description.replace('\n', " ");
    for sentence in flattened.split('.') {
        let sentence = sentence.trim();
        if sentence.len() > MIN_SENTENCE_LEN {
            chunks.push(sentence.to_string());
        }
    }

    for section in job_description.split("\n\n") {
        let section = section.trim();
        if section.len() > MIN_SECTION_LEN {
            chunks.push(section.to_string());
        }
    }

    chunks.truncate(MAX_JD_CHUNKS);
    chunks
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
