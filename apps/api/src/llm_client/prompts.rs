// Shared prompt constants and prompt-building utilities.
// Each service that needs LLM calls defines its own prompts.rs alongside it.
// This file contains cross-cutting prompt fragments.

/// Common honesty instruction appended to all rewrite prompts.
pub const HONESTY_INSTRUCTION: &str = "\
    CRITICAL: Preserve factual correctness based on the original bullet and \
    the full resume context. Do NOT invent achievements, metrics, or \
    technologies that are not present in the resume. Do NOT exaggerate the \
    candidate's role or impact. If the resume does not support a claim, \
    omit it entirely.";
