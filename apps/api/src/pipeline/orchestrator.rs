//! Pipeline Orchestrator — sequences extraction, relevance mapping, rewrite,
//! and self-critique over all bullets, and hosts the re-improve operation.
//!
//! Flow: extract → map (one batched call) → per-bullet rewrite + critique
//! (concurrent tokio tasks) → re-join in original bullet order.
//!
//! Isolation rule: no bullet's failure may abort its siblings or the run.
//! Rewrite and critique already degrade internally; this module additionally
//! absorbs scorer failures (zero scores) and task panics (degraded bullet).

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::errors::AppError;
use crate::llm_client::ChatCompleter;
use crate::pipeline::critique::{critique_bullet, CritiqueIssue, CritiqueResult};
use crate::pipeline::extractor::{extract_bullets, Bullet};
use crate::pipeline::relevance::{RelevanceMatch, RelevanceScorer};
use crate::pipeline::rewriter::{rewrite_bullet, rewrite_for_relevance, RewriteResult};

// ────────────────────────────────────────────────────────────────────────────
// Data models
// ────────────────────────────────────────────────────────────────────────────

/// The unit returned to the caller: one bullet with its rewrite, critique,
/// and relevance data, addressed by its stable position in the response list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImprovedBullet {
    pub original: String,
    pub improved: String,
    pub explanation: String,
    pub why_it_works: String,
    pub self_critique: String,
    pub is_supported_by_resume: bool,
    pub issues: Vec<CritiqueIssue>,
    pub evidence_snippets: Vec<String>,
    pub relevance_score: f32,
    pub matched_jd_snippet: String,
    /// Present only after a re-improve call.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub relevance_improvements: Option<String>,
}

impl ImprovedBullet {
    fn assemble(rewrite: RewriteResult, critique: CritiqueResult, relevance: RelevanceMatch) -> Self {
        Self {
            original: rewrite.original,
            improved: rewrite.improved,
            explanation: rewrite.explanation,
            why_it_works: rewrite.why_it_works,
            self_critique: critique.self_critique,
            is_supported_by_resume: critique.is_supported,
            issues: critique.issues,
            evidence_snippets: critique.evidence_snippets,
            relevance_score: relevance.score,
            matched_jd_snippet: relevance.matched_jd_excerpt,
            relevance_improvements: None,
        }
    }

    /// Fully degraded bullet, used when per-bullet work failed outside the
    /// rewrite/critique fallback paths (a panicked task).
    fn degraded(bullet_text: &str, relevance: RelevanceMatch) -> Self {
        let text = bullet_text.trim().to_string();
        Self {
            original: text.clone(),
            improved: text,
            explanation: "Processing for this bullet failed unexpectedly; returned the original."
                .to_string(),
            why_it_works: "Acts as a safe fallback until the pipeline is available again."
                .to_string(),
            self_critique: "The automated fact-check did not run for this bullet.".to_string(),
            is_supported_by_resume: false,
            issues: vec![CritiqueIssue::ToolUnavailable],
            evidence_snippets: Vec::new(),
            relevance_score: relevance.score,
            matched_jd_snippet: relevance.matched_jd_excerpt,
            relevance_improvements: None,
        }
    }
}

/// Input for the re-improve operation: everything the caller knows about one
/// low-relevance bullet. Stateless by design — repeated calls with the same
/// arguments are independent fresh attempts.
#[derive(Debug, Clone, Deserialize)]
pub struct ReimproveRequest {
    pub current_bullet: String,
    pub original_bullet: String,
    pub resume_text: String,
    pub job_description: String,
    pub current_relevance: f32,
    pub target_relevance: f32,
}

/// Result of one re-improve attempt. `new_relevance_score` is best-effort:
/// it may be lower than the caller's current score, since the underlying
/// rewrite is non-deterministic. That is a valid result, not an error.
#[derive(Debug, Clone, Serialize)]
pub struct ReimprovedBullet {
    pub improved: String,
    pub explanation: String,
    pub why_it_works: String,
    pub relevance_improvements: String,
    pub self_critique: String,
    pub is_supported_by_resume: bool,
    pub issues: Vec<CritiqueIssue>,
    pub evidence_snippets: Vec<String>,
    pub new_relevance_score: f32,
}

// ────────────────────────────────────────────────────────────────────────────
// Primary pipeline
// ────────────────────────────────────────────────────────────────────────────

/// Runs the full pipeline for one (resume, JD) pair.
///
/// Returns one `ImprovedBullet` per extracted bullet, in extraction order
/// regardless of task completion order. Zero extracted bullets yield an
/// empty list, not an error.
pub async fn run_pipeline(
    llm: Arc<dyn ChatCompleter>,
    scorer: Arc<dyn RelevanceScorer>,
    resume_text: &str,
    job_description: &str,
) -> Result<Vec<ImprovedBullet>, AppError> {
    let bullets = extract_bullets(resume_text);
    if bullets.is_empty() {
        info!("No bullets extracted; returning empty result");
        return Ok(Vec::new());
    }
    info!("Extracted {} bullets", bullets.len());

    // One batched relevance call before any rewrite: rewrites need excerpts.
    // Scorer failure degrades to zero scores rather than aborting the run.
    let matches = match scorer.map_bullets(&bullets, job_description).await {
        Ok(matches) if matches.len() == bullets.len() => matches,
        Ok(matches) => {
            warn!(
                "Scorer returned {} matches for {} bullets; degrading to zero scores",
                matches.len(),
                bullets.len()
            );
            zero_matches(&bullets)
        }
        Err(e) => {
            warn!("Relevance scoring failed, degrading to zero scores: {e}");
            zero_matches(&bullets)
        }
    };

    let resume: Arc<str> = Arc::from(resume_text);
    let jd: Arc<str> = Arc::from(job_description);

    // Fan out per-bullet work; completion order is irrelevant because results
    // are re-joined by awaiting the handles in spawn order.
    let mut tasks = Vec::with_capacity(bullets.len());
    for (bullet, relevance) in bullets.into_iter().zip(matches.into_iter()) {
        let llm = Arc::clone(&llm);
        let resume = Arc::clone(&resume);
        let jd = Arc::clone(&jd);
        let fallback = (bullet.text.clone(), relevance.clone());

        let handle = tokio::spawn(async move {
            let rewrite = rewrite_bullet(llm.as_ref(), &bullet, &relevance, &resume, &jd).await;
            let critique = critique_bullet(
                llm.as_ref(),
                &rewrite.original,
                &rewrite.improved,
                &resume,
                &jd,
            )
            .await;
            ImprovedBullet::assemble(rewrite, critique, relevance)
        });
        tasks.push((handle, fallback));
    }

    let mut improved = Vec::with_capacity(tasks.len());
    for (handle, (bullet_text, relevance)) in tasks {
        match handle.await {
            Ok(result) => improved.push(result),
            Err(e) => {
                error!("Bullet task panicked, degrading that bullet only: {e}");
                improved.push(ImprovedBullet::degraded(&bullet_text, relevance));
            }
        }
    }

    info!("Pipeline produced {} improved bullets", improved.len());
    Ok(improved)
}

fn zero_matches(bullets: &[Bullet]) -> Vec<RelevanceMatch> {
    bullets
        .iter()
        .map(|b| RelevanceMatch {
            bullet: b.text.clone(),
            score: 0.0,
            matched_jd_excerpt: String::new(),
        })
        .collect()
}

// ────────────────────────────────────────────────────────────────────────────
// Re-improve
// ────────────────────────────────────────────────────────────────────────────

/// One fresh attempt to push a bullet toward `target_relevance`.
///
/// Re-invokes the rewrite with the amplified keyword instruction, re-scores
/// the result against the same JD, then re-critiques. Improvement is
/// best-effort and explicitly non-monotonic; a score that did not improve is
/// still returned. Bounding repeated attempts is the caller's policy — the
/// core keeps no cross-call state to count them with.
pub async fn reimprove_bullet(
    llm: &dyn ChatCompleter,
    scorer: &dyn RelevanceScorer,
    request: &ReimproveRequest,
) -> Result<ReimprovedBullet, AppError> {
    if request.current_bullet.trim().is_empty() || request.original_bullet.trim().is_empty() {
        return Err(AppError::Validation(
            "current_bullet and original_bullet cannot be empty".to_string(),
        ));
    }
    for (name, value) in [
        ("current_relevance", request.current_relevance),
        ("target_relevance", request.target_relevance),
    ] {
        if !(0.0..=1.0).contains(&value) {
            return Err(AppError::Validation(format!(
                "{name} must be between 0.0 and 1.0"
            )));
        }
    }

    let rewrite = rewrite_for_relevance(
        llm,
        &request.current_bullet,
        &request.original_bullet,
        &request.resume_text,
        &request.job_description,
        request.current_relevance,
        request.target_relevance,
    )
    .await;

    let new_relevance_score = match scorer
        .score_one(&rewrite.improved, &request.job_description)
        .await
    {
        Ok(score) => score.clamp(0.0, 1.0),
        Err(e) => {
            warn!("Re-scoring failed, reporting zero relevance: {e}");
            0.0
        }
    };

    if new_relevance_score <= request.current_relevance {
        info!(
            "Re-improve did not raise relevance ({} -> {}); returning result anyway",
            request.current_relevance, new_relevance_score
        );
    }

    let critique = critique_bullet(
        llm,
        &request.original_bullet,
        &rewrite.improved,
        &request.resume_text,
        &request.job_description,
    )
    .await;

    Ok(ReimprovedBullet {
        improved: rewrite.improved,
        explanation: rewrite.explanation,
        why_it_works: rewrite.why_it_works,
        relevance_improvements: rewrite.relevance_improvements,
        self_critique: critique.self_critique,
        is_supported_by_resume: critique.is_supported,
        issues: critique.issues,
        evidence_snippets: critique.evidence_snippets,
        new_relevance_score,
    })
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm_client::test_support::MockCompleter;
    use crate::llm_client::LlmError;
    use crate::pipeline::prompts::{CRITIQUE_SYSTEM, REWRITE_SYSTEM};
    use crate::pipeline::relevance::KeywordRelevanceScorer;

    const REWRITE_JSON: &str = r#"{"improved": "Engineered a React and Node.js web application serving production traffic",
        "explanation": "Aligned with the JD's React requirement",
        "why_it_works": "Leads with the stack the role asks for"}"#;

    const CRITIQUE_JSON: &str = r#"{"self_critique": "Claims are traceable to the resume.",
        "is_supported_by_resume": true,
        "issues": [],
        "evidence_snippets": ["Developed a web application using React and Node.js"]}"#;

    /// Answers rewrite and critique prompts with canned JSON, keyed on the
    /// system prompt the stage used.
    fn happy_completer() -> MockCompleter {
        MockCompleter::with(|_, system| {
            if system == CRITIQUE_SYSTEM {
                Ok(CRITIQUE_JSON.to_string())
            } else {
                Ok(REWRITE_JSON.to_string())
            }
        })
    }

    #[tokio::test]
    async fn test_scenario_a_single_react_bullet() {
        let llm: Arc<dyn ChatCompleter> = Arc::new(happy_completer());
        let scorer: Arc<dyn RelevanceScorer> = Arc::new(KeywordRelevanceScorer);

        let result = run_pipeline(
            llm,
            scorer,
            "Developed a web application using React and Node.js",
            "Looking for a full-stack developer with React experience",
        )
        .await
        .unwrap();

        assert_eq!(result.len(), 1);
        let bullet = &result[0];
        assert!(bullet.relevance_score > 0.0, "shared term React must score");
        assert!(!bullet.improved.is_empty());
        assert!(bullet.is_supported_by_resume);
        assert!(bullet.issues.is_empty());
    }

    #[tokio::test]
    async fn test_scenario_b_empty_resume_yields_empty_list() {
        let llm: Arc<dyn ChatCompleter> = Arc::new(MockCompleter::failing());
        let scorer: Arc<dyn RelevanceScorer> = Arc::new(KeywordRelevanceScorer);

        let result = run_pipeline(llm, scorer, "", "any job description").await.unwrap();
        assert!(result.is_empty());
    }

    #[tokio::test]
    async fn test_scenario_c_per_bullet_failure_isolation() {
        // Outage only for the bullet mentioning Kafka; the other succeeds.
        let llm: Arc<dyn ChatCompleter> = Arc::new(MockCompleter::with(|prompt, system| {
            if system == REWRITE_SYSTEM && prompt.contains("ORIGINAL BULLET:\nOperated Kafka") {
                return Err(LlmError::Api {
                    status: 503,
                    message: "simulated outage".to_string(),
                });
            }
            if system == CRITIQUE_SYSTEM {
                Ok(CRITIQUE_JSON.to_string())
            } else {
                Ok(REWRITE_JSON.to_string())
            }
        }));
        let scorer: Arc<dyn RelevanceScorer> = Arc::new(KeywordRelevanceScorer);

        let result = run_pipeline(
            llm,
            scorer,
            "- Operated Kafka clusters\n- Built a React dashboard",
            "React experience required for this role",
        )
        .await
        .unwrap();

        assert_eq!(result.len(), 2);
        // Failed bullet: fallback rewrite, original preserved.
        assert_eq!(result[0].improved, result[0].original);
        assert_eq!(result[0].original, "Operated Kafka clusters");
        // Healthy bullet: genuine rewrite from the model.
        assert_ne!(result[1].improved, result[1].original);
    }

    #[tokio::test]
    async fn test_output_length_and_order_match_extraction() {
        let llm: Arc<dyn ChatCompleter> = Arc::new(MockCompleter::failing());
        let scorer: Arc<dyn RelevanceScorer> = Arc::new(KeywordRelevanceScorer);

        let resume = "- alpha bullet text\n- beta bullet text\n- gamma bullet text";
        let result = run_pipeline(llm, scorer, resume, "some JD text here").await.unwrap();

        assert_eq!(result.len(), 3);
        assert_eq!(result[0].original, "alpha bullet text");
        assert_eq!(result[1].original, "beta bullet text");
        assert_eq!(result[2].original, "gamma bullet text");
    }

    #[tokio::test]
    async fn test_total_outage_still_returns_complete_set() {
        let llm: Arc<dyn ChatCompleter> = Arc::new(MockCompleter::failing());
        let scorer: Arc<dyn RelevanceScorer> = Arc::new(KeywordRelevanceScorer);

        let result = run_pipeline(
            llm,
            scorer,
            "- Built a service\n- Led a team",
            "engineering role",
        )
        .await
        .unwrap();

        assert_eq!(result.len(), 2);
        for bullet in &result {
            assert_eq!(bullet.improved, bullet.original);
            assert!(!bullet.is_supported_by_resume);
            assert_eq!(bullet.issues, vec![CritiqueIssue::ToolUnavailable]);
        }
    }

    #[tokio::test]
    async fn test_empty_jd_still_produces_full_results_with_zero_scores() {
        let llm: Arc<dyn ChatCompleter> = Arc::new(happy_completer());
        let scorer: Arc<dyn RelevanceScorer> = Arc::new(KeywordRelevanceScorer);

        let result = run_pipeline(llm, scorer, "- Built a billing service", "")
            .await
            .unwrap();

        assert_eq!(result.len(), 1);
        assert_eq!(result[0].relevance_score, 0.0);
        assert!(result[0].matched_jd_snippet.is_empty());
    }

    fn reimprove_request() -> ReimproveRequest {
        ReimproveRequest {
            current_bullet: "Built a dashboard".to_string(),
            original_bullet: "Built a dashboard".to_string(),
            resume_text: "Built a dashboard with React".to_string(),
            job_description: "React experience required for this frontend role".to_string(),
            current_relevance: 0.2,
            target_relevance: 0.8,
        }
    }

    #[tokio::test]
    async fn test_reimprove_rescores_against_jd() {
        let llm = MockCompleter::with(|_, system| {
            if system == CRITIQUE_SYSTEM {
                Ok(CRITIQUE_JSON.to_string())
            } else {
                Ok(r#"{"improved": "Built a React dashboard used by the frontend team",
                       "explanation": "e", "why_it_works": "w",
                       "relevance_improvements": "Addresses the React requirement"}"#
                    .to_string())
            }
        });
        let scorer = KeywordRelevanceScorer;

        let result = reimprove_bullet(&llm, &scorer, &reimprove_request())
            .await
            .unwrap();
        assert!(result.new_relevance_score > 0.0);
        assert_eq!(result.relevance_improvements, "Addresses the React requirement");
    }

    #[tokio::test]
    async fn test_reimprove_twice_with_identical_arguments_is_independent() {
        let llm = happy_completer();
        let scorer = KeywordRelevanceScorer;
        let request = reimprove_request();

        let first = reimprove_bullet(&llm, &scorer, &request).await.unwrap();
        let second = reimprove_bullet(&llm, &scorer, &request).await.unwrap();

        assert_eq!(first.improved, second.improved);
        assert_eq!(first.new_relevance_score, second.new_relevance_score);
    }

    #[tokio::test]
    async fn test_reimprove_non_improving_score_is_not_an_error() {
        // Outage: the fallback keeps the current bullet, so the new score can
        // only match or trail the caller's current figure.
        let llm = MockCompleter::failing();
        let scorer = KeywordRelevanceScorer;
        let mut request = reimprove_request();
        request.current_relevance = 0.9;

        let result = reimprove_bullet(&llm, &scorer, &request).await.unwrap();
        assert_eq!(result.improved, "Built a dashboard");
        assert!(result.new_relevance_score <= 0.9 + f32::EPSILON);
    }

    #[tokio::test]
    async fn test_reimprove_rejects_out_of_range_relevance() {
        let llm = happy_completer();
        let scorer = KeywordRelevanceScorer;
        let mut request = reimprove_request();
        request.target_relevance = 1.5;

        let result = reimprove_bullet(&llm, &scorer, &request).await;
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_reimprove_rejects_empty_bullet() {
        let llm = happy_completer();
        let scorer = KeywordRelevanceScorer;
        let mut request = reimprove_request();
        request.current_bullet = "   ".to_string();

        let result = reimprove_bullet(&llm, &scorer, &request).await;
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[test]
    fn test_improved_bullet_wire_field_names() {
        let bullet = ImprovedBullet {
            original: "o".to_string(),
            improved: "i".to_string(),
            explanation: "e".to_string(),
            why_it_works: "w".to_string(),
            self_critique: "s".to_string(),
            is_supported_by_resume: true,
            issues: vec![],
            evidence_snippets: vec![],
            relevance_score: 0.5,
            matched_jd_snippet: "m".to_string(),
            relevance_improvements: None,
        };
        let value = serde_json::to_value(&bullet).unwrap();
        for field in [
            "original",
            "improved",
            "explanation",
            "why_it_works",
            "self_critique",
            "is_supported_by_resume",
            "issues",
            "evidence_snippets",
            "relevance_score",
            "matched_jd_snippet",
        ] {
            assert!(value.get(field).is_some(), "missing wire field {field}");
        }
        // Optional field absent until a re-improve call fills it.
        assert!(value.get("relevance_improvements").is_none());
    }
}
