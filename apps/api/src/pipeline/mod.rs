// The bullet improvement pipeline.
// Implements: extraction, relevance mapping, rewrite, self-critique, orchestration.
// All LLM calls go through llm_client — no direct Groq calls here.

pub mod critique;
pub mod extractor;
pub mod handlers;
pub mod orchestrator;
pub mod prompts;
pub mod relevance;
pub mod rewriter;
