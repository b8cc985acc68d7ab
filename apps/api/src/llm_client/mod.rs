/// LLM Client — the single point of entry for all Groq API calls in the reviewer.
///
/// ARCHITECTURAL RULE: No other module may call the Groq API directly.
/// All LLM interactions MUST go through this module.
///
/// Model: llama-3.3-70b-versatile (hardcoded — do not make configurable to prevent drift)
use async_trait::async_trait;
use reqwest::Client;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

pub mod prompts;

const GROQ_API_URL: &str = "https://api.groq.com/openai/v1/chat/completions";
/// The model used for all LLM calls in the reviewer.
/// This is intentionally hardcoded to prevent accidental drift.
pub const MODEL: &str = "llama-3.3-70b-versatile";
const MAX_RETRIES: u32 = 3;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("no LLM API credential configured")]
    MissingApiKey,

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("rate limited after {retries} retries")]
    RateLimited { retries: u32 },

    #[error("LLM returned empty content")]
    EmptyContent,
}

/// Sampling parameters for a single completion call.
/// Each pipeline stage picks its own temperature and token budget.
#[derive(Debug, Clone, Copy)]
pub struct CompletionOptions {
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Default for CompletionOptions {
    fn default() -> Self {
        Self {
            temperature: 0.4,
            max_tokens: 800,
        }
    }
}

/// The injected text-completion capability. Pipeline stages depend on this
/// trait, never on `GroqClient` directly, so tests can substitute a double
/// that produces deterministic output or deterministic failures.
#[async_trait]
pub trait ChatCompleter: Send + Sync {
    async fn complete(
        &self,
        prompt: &str,
        system: &str,
        options: CompletionOptions,
    ) -> Result<String, LlmError>;
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
    response_format: ResponseFormat,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    format_type: &'static str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Usage {
    prompt_tokens: u32,
    completion_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct GroqError {
    error: GroqErrorBody,
}

#[derive(Debug, Deserialize)]
struct GroqErrorBody {
    message: String,
}

/// The production LLM client. Wraps the Groq OpenAI-compatible chat
/// completions API with retry logic and structured output helpers.
///
/// The API key is optional on purpose: without one, every call fails with
/// `LlmError::MissingApiKey` and the pipeline's per-bullet fallback paths
/// take over. A missing credential degrades output, it never crashes a run.
#[derive(Clone)]
pub struct GroqClient {
    client: Client,
    api_key: Option<String>,
}

impl GroqClient {
    pub fn new(api_key: Option<String>, timeout_secs: u64) -> Self {
        Self {
            client: Client::builder()
                .timeout(std::time::Duration::from_secs(timeout_secs))
                .build()
                .expect("Failed to build HTTP client"),
            api_key,
        }
    }

    /// Makes a raw call to the Groq API, returning the completion text.
    /// Retries on 429 (rate limit) and 5xx errors with exponential backoff.
    /// Transport timeouts surface as `LlmError::Http` like any other failure.
    async fn call(
        &self,
        prompt: &str,
        system: &str,
        options: CompletionOptions,
    ) -> Result<String, LlmError> {
        let api_key = self.api_key.as_deref().ok_or(LlmError::MissingApiKey)?;

        let request_body = ChatRequest {
            model: MODEL,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system,
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
            temperature: options.temperature,
            max_tokens: options.max_tokens,
            response_format: ResponseFormat {
                format_type: "json_object",
            },
        };

        let mut last_error: Option<LlmError> = None;

        for attempt in 0..MAX_RETRIES {
            if attempt > 0 {
                // Exponential backoff: 1s, 2s, 4s
                let delay = std::time::Duration::from_millis(1000 * (1 << (attempt - 1)));
                warn!(
                    "LLM call attempt {} failed, retrying after {}ms...",
                    attempt,
                    delay.as_millis()
                );
                tokio::time::sleep(delay).await;
            }

            let response = self
                .client
                .post(GROQ_API_URL)
                .bearer_auth(api_key)
                .header("content-type", "application/json")
                .json(&request_body)
                .send()
                .await;

            let response = match response {
                Ok(r) => r,
                Err(e) => {
                    last_error = Some(LlmError::Http(e));
                    continue;
                }
            };

            let status = response.status();

            if status.as_u16() == 429 || status.is_server_error() {
                let body = response.text().await.unwrap_or_default();
                warn!("LLM API returned {}: {}", status, body);
                last_error = Some(LlmError::Api {
                    status: status.as_u16(),
                    message: body,
                });
                continue;
            }

            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                // Try to parse error message
                let message = serde_json::from_str::<GroqError>(&body)
                    .map(|e| e.error.message)
                    .unwrap_or(body);
                return Err(LlmError::Api {
                    status: status.as_u16(),
                    message,
                });
            }

            let chat_response: ChatResponse = response.json().await?;

            if let Some(usage) = &chat_response.usage {
                debug!(
                    "LLM call succeeded: prompt_tokens={}, completion_tokens={}",
                    usage.prompt_tokens, usage.completion_tokens
                );
            }

            let content = chat_response
                .choices
                .into_iter()
                .next()
                .and_then(|c| c.message.content)
                .filter(|c| !c.trim().is_empty())
                .ok_or(LlmError::EmptyContent)?;

            return Ok(content);
        }

        Err(last_error.unwrap_or(LlmError::RateLimited {
            retries: MAX_RETRIES,
        }))
    }
}

#[async_trait]
impl ChatCompleter for GroqClient {
    async fn complete(
        &self,
        prompt: &str,
        system: &str,
        options: CompletionOptions,
    ) -> Result<String, LlmError> {
        self.call(prompt, system, options).await
    }
}

/// Deserializes LLM output as JSON, stripping markdown code fences first.
/// Unparsable model output is an `LlmError`, never a crash — callers route
/// it into their fallback paths like any other capability failure.
pub fn parse_json<T: DeserializeOwned>(text: &str) -> Result<T, LlmError> {
    let text = strip_json_fences(text);
    serde_json::from_str(text).map_err(LlmError::Parse)
}

/// Strips ```json ... ``` or ``` ... ``` code fences from LLM output.
fn strip_json_fences(text: &str) -> &str {
    let text = text.trim();
    if let Some(stripped) = text.strip_prefix("```json") {
        stripped
            .trim_start()
            .strip_suffix("```")
            .map(|s| s.trim())
            .unwrap_or(stripped.trim_start())
    } else if let Some(stripped) = text.strip_prefix("```") {
        stripped
            .trim_start()
            .strip_suffix("```")
            .map(|s| s.trim())
            .unwrap_or(stripped.trim_start())
    } else {
        text
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;

    type Handler = Box<dyn Fn(&str, &str) -> Result<String, LlmError> + Send + Sync>;

    /// Deterministic `ChatCompleter` double for pipeline tests.
    pub struct MockCompleter {
        handler: Handler,
    }

    impl MockCompleter {
        /// Returns the same completion text for every call.
        pub fn returning(text: &str) -> Self {
            let text = text.to_string();
            Self {
                handler: Box::new(move |_, _| Ok(text.clone())),
            }
        }

        /// Fails every call with a simulated API outage.
        pub fn failing() -> Self {
            Self {
                handler: Box::new(|_, _| {
                    Err(LlmError::Api {
                        status: 503,
                        message: "simulated outage".to_string(),
                    })
                }),
            }
        }

        /// Fails every call as if no credential were configured.
        pub fn without_credentials() -> Self {
            Self {
                handler: Box::new(|_, _| Err(LlmError::MissingApiKey)),
            }
        }

        /// Dispatches on (prompt, system) for per-call behavior.
        pub fn with(handler: impl Fn(&str, &str) -> Result<String, LlmError> + Send + Sync + 'static) -> Self {
            Self {
                handler: Box::new(handler),
            }
        }
    }

    #[async_trait]
    impl ChatCompleter for MockCompleter {
        async fn complete(
            &self,
            prompt: &str,
            system: &str,
            _options: CompletionOptions,
        ) -> Result<String, LlmError> {
            (self.handler)(prompt, system)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_json_fences_with_json_tag() {
        let input = "```json\n{\"key\": \"value\"}\n```";
        assert_eq!(strip_json_fences(input), "{\"key\": \"value\"}");
    }

    #[test]
    fn test_strip_json_fences_without_tag() {
        let input = "```\n{\"key\": \"value\"}\n```";
        assert_eq!(strip_json_fences(input), "{\"key\": \"value\"}");
    }

    #[test]
    fn test_strip_json_fences_no_fences() {
        let input = "{\"key\": \"value\"}";
        assert_eq!(strip_json_fences(input), "{\"key\": \"value\"}");
    }

    #[test]
    fn test_parse_json_through_fences() {
        #[derive(Deserialize)]
        struct Payload {
            improved: String,
        }
        let input = "```json\n{\"improved\": \"Shipped the thing\"}\n```";
        let payload: Payload = parse_json(input).unwrap();
        assert_eq!(payload.improved, "Shipped the thing");
    }

    #[test]
    fn test_parse_json_garbage_is_parse_error() {
        let result: Result<serde_json::Value, _> = parse_json("I am not JSON, sorry.");
        assert!(matches!(result, Err(LlmError::Parse(_))));
    }

    #[test]
    fn test_client_without_key_fails_with_missing_api_key() {
        let client = GroqClient::new(None, 5);
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        let result = rt.block_on(client.call("prompt", "system", CompletionOptions::default()));
        assert!(matches!(result, Err(LlmError::MissingApiKey)));
    }
}
