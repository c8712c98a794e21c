//! Chat-completion HTTP client.
//!
//! Posts OpenAI-compatible requests with a single user message and a
//! wall-clock deadline, classifies non-success responses into the
//! [`ApiError`] taxonomy, and never retries; retry policy is the caller's.

use std::time::Duration;

use serde::Deserialize;
use serde_json::{Value, json};
use tokio_util::sync::CancellationToken;

use crate::api::provider::{Provider, ResolvedCall, resolve_call};
use crate::error::{ApiError, Error, Result};

/// Default per-call wall-clock budget in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 300;

/// Default completion budget when the caller does not pass one.
const DEFAULT_MAX_TOKENS: u32 = 4096;

/// Per-call overrides.
#[derive(Debug, Clone, Default)]
pub struct CallOptions {
    /// Model override (defaults per provider / `DS_MODEL`).
    pub model: Option<String>,
    /// Endpoint override (defaults to `DS_EP` or the DeepSeek endpoint).
    pub endpoint: Option<String>,
    /// Maximum completion tokens.
    pub max_tokens: Option<u32>,
}

/// Chat-completion client.
///
/// Cheap to construct; the underlying connection pool is shared per client.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    timeout: Duration,
}

impl ApiClient {
    /// Creates a client with the default 300 s deadline.
    pub fn new() -> Result<Self> {
        Self::with_timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }

    /// Creates a client with a custom per-call deadline.
    pub fn with_timeout(timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Config {
                message: format!("http client: {e}"),
            })?;
        Ok(Self { http, timeout })
    }

    /// Sends one prompt and returns the completion text.
    ///
    /// The provider is selected from the endpoint, credentials are read from
    /// the provider's environment variable, and a missing key fails before
    /// any request is made. `choices[0].message.content` is returned; when
    /// the provider leaves `content` empty but supplies `reasoning_content`,
    /// the reasoning text is returned instead.
    ///
    /// Cancelling `cancel` aborts the in-flight request and returns
    /// [`Error::Cancelled`].
    pub async fn call(
        &self,
        prompt: &str,
        options: &CallOptions,
        cancel: &CancellationToken,
    ) -> Result<String> {
        let resolved = resolve_call(
            options.endpoint.as_deref(),
            options.model.as_deref(),
            |name| std::env::var(name).ok(),
        )?;

        let work = self.perform(prompt, options, &resolved);
        tokio::select! {
            () = cancel.cancelled() => Err(Error::Cancelled),
            result = work => result,
        }
    }

    async fn perform(
        &self,
        prompt: &str,
        options: &CallOptions,
        resolved: &ResolvedCall,
    ) -> Result<String> {
        let url = format!("{}/chat/completions", resolved.endpoint);
        let payload = build_payload(
            resolved.provider,
            &resolved.model,
            prompt,
            options.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
        );

        tracing::debug!(
            provider = resolved.provider.name(),
            model = %resolved.model,
            prompt_chars = prompt.len(),
            "chat completion request"
        );

        let response = self
            .http
            .post(&url)
            .bearer_auth(&resolved.api_key)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .json(&payload)
            .send()
            .await
            .map_err(|e| transport_error(resolved.provider, &e, self.timeout))?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| transport_error(resolved.provider, &e, self.timeout))?;

        if !(200..300).contains(&status) {
            return Err(classify_status(resolved.provider, status, &body).into());
        }

        extract_content(resolved.provider, &body)
    }
}

/// Builds the chat-completion payload; SiliconFlow carries fixed sampling
/// parameters on top of the shared fields.
fn build_payload(provider: Provider, model: &str, prompt: &str, max_tokens: u32) -> Value {
    let mut payload = json!({
        "model": model,
        "messages": [{"role": "user", "content": prompt}],
        "max_tokens": max_tokens,
        "stream": false,
    });
    if provider == Provider::SiliconFlow
        && let Some(map) = payload.as_object_mut()
    {
        map.insert("temperature".to_string(), json!(0.2));
        map.insert("top_p".to_string(), json!(0.7));
    }
    payload
}

/// Maps a reqwest failure onto the taxonomy.
fn transport_error(provider: Provider, err: &reqwest::Error, timeout: Duration) -> Error {
    if err.is_timeout() {
        ApiError::Timeout {
            provider: provider.name(),
            seconds: timeout.as_secs(),
        }
        .into()
    } else {
        ApiError::Transport {
            provider: provider.name(),
            message: err.to_string(),
        }
        .into()
    }
}

/// Classifies a non-2xx status into the error taxonomy.
fn classify_status(provider: Provider, status: u16, body: &str) -> ApiError {
    let name = provider.name();
    match status {
        401 => ApiError::Auth {
            provider: name,
            env_var: provider.key_env(),
        },
        402 if provider == Provider::DeepSeek => ApiError::Quota { provider: name },
        400 | 402 | 422 => ApiError::InvalidArgument {
            provider: name,
            message: provider_message(body),
        },
        429 => ApiError::RateLimited { provider: name },
        503 | 504 => ApiError::Overloaded {
            provider: name,
            status,
        },
        500 => ApiError::Server { provider: name },
        other => ApiError::Transport {
            provider: name,
            message: format!("HTTP {other}: {}", provider_message(body)),
        },
    }
}

/// Pulls the provider's own error message out of the body, verbatim.
fn provider_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| {
            v.pointer("/error/message")
                .or_else(|| v.get("message"))
                .and_then(Value::as_str)
                .map(str::to_string)
        })
        .unwrap_or_else(|| {
            let trimmed = body.trim();
            if trimmed.is_empty() {
                "no response body".to_string()
            } else {
                trimmed.chars().take(200).collect()
            }
        })
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    reasoning_content: Option<String>,
}

/// Extracts the completion text, falling back to the reasoning sidecar when
/// `content` is empty.
fn extract_content(provider: Provider, body: &str) -> Result<String> {
    let parsed: ChatCompletionResponse =
        serde_json::from_str(body).map_err(|e| ApiError::BadResponse {
            provider: provider.name(),
            message: e.to_string(),
        })?;

    let message = parsed
        .choices
        .into_iter()
        .next()
        .map(|c| c.message)
        .ok_or_else(|| ApiError::BadResponse {
            provider: provider.name(),
            message: "response carried no choices".to_string(),
        })?;

    let content = message.content.unwrap_or_default();
    if content.is_empty() {
        if let Some(reasoning) = message.reasoning_content
            && !reasoning.is_empty()
        {
            return Ok(reasoning);
        }
        return Err(ApiError::BadResponse {
            provider: provider.name(),
            message: "empty completion content".to_string(),
        }
        .into());
    }
    Ok(content)
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn test_build_payload_shared_fields() {
        let payload = build_payload(Provider::DeepSeek, "deepseek-chat", "hello", 512);
        assert_eq!(payload["model"], "deepseek-chat");
        assert_eq!(payload["messages"][0]["role"], "user");
        assert_eq!(payload["messages"][0]["content"], "hello");
        assert_eq!(payload["max_tokens"], 512);
        assert_eq!(payload["stream"], false);
        assert!(payload.get("temperature").is_none());
    }

    #[test]
    fn test_build_payload_siliconflow_sampling() {
        let payload = build_payload(
            Provider::SiliconFlow,
            "moonshotai/Kimi-K2-Instruct",
            "hi",
            256,
        );
        assert_eq!(payload["temperature"], 0.2);
        assert_eq!(payload["top_p"], 0.7);
    }

    #[test]
    fn test_classify_auth() {
        let err = classify_status(Provider::DeepSeek, 401, "{}");
        assert!(matches!(
            err,
            ApiError::Auth {
                env_var: "DS_KEY",
                ..
            }
        ));
    }

    #[test]
    fn test_classify_quota_deepseek_only() {
        assert!(matches!(
            classify_status(Provider::DeepSeek, 402, "{}"),
            ApiError::Quota { .. }
        ));
        assert!(matches!(
            classify_status(Provider::SiliconFlow, 402, "{}"),
            ApiError::InvalidArgument { .. }
        ));
    }

    #[test]
    fn test_classify_argument_carries_provider_message() {
        let body = r#"{"error":{"message":"model not found"}}"#;
        let err = classify_status(Provider::DeepSeek, 400, body);
        match err {
            ApiError::InvalidArgument { message, .. } => {
                assert_eq!(message, "model not found");
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_classify_transients() {
        assert!(classify_status(Provider::DeepSeek, 429, "").is_transient());
        assert!(classify_status(Provider::DeepSeek, 500, "").is_transient());
        assert!(classify_status(Provider::DeepSeek, 503, "").is_transient());
        assert!(classify_status(Provider::DeepSeek, 504, "").is_transient());
    }

    #[test]
    fn test_provider_message_fallbacks() {
        assert_eq!(
            provider_message(r#"{"message":"direct"}"#),
            "direct"
        );
        assert_eq!(provider_message("plain text error"), "plain text error");
        assert_eq!(provider_message("  "), "no response body");
    }

    #[test]
    fn test_extract_content() {
        let body = r#"{"choices":[{"message":{"content":"总结文本"}}]}"#;
        assert_eq!(
            extract_content(Provider::DeepSeek, body).unwrap(),
            "总结文本"
        );
    }

    #[test]
    fn test_extract_reasoning_fallback() {
        let body =
            r#"{"choices":[{"message":{"content":"","reasoning_content":"thinking text"}}]}"#;
        assert_eq!(
            extract_content(Provider::DeepSeek, body).unwrap(),
            "thinking text"
        );
    }

    #[test]
    fn test_extract_empty_is_error() {
        let body = r#"{"choices":[{"message":{"content":""}}]}"#;
        assert!(extract_content(Provider::DeepSeek, body).is_err());

        let body = r#"{"choices":[]}"#;
        assert!(extract_content(Provider::DeepSeek, body).is_err());
    }

    #[tokio::test]
    async fn test_call_without_key_fails_before_http() {
        // Endpoint names a host that does not exist; with no key configured
        // the call must fail on configuration, not on transport.
        let client = ApiClient::with_timeout(Duration::from_millis(50)).unwrap();
        let options = CallOptions {
            endpoint: Some("https://deepseek.invalid/v1".to_string()),
            model: None,
            max_tokens: None,
        };
        // Guard against an ambient key leaking into the test environment.
        if std::env::var("DS_KEY").is_ok() {
            return;
        }
        let err = client
            .call("hello", &options, &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Config { .. }), "got {err:?}");
        assert!(err.to_string().contains("DS_KEY"));
    }

    #[tokio::test]
    async fn test_call_cancelled() {
        let client = ApiClient::new().unwrap();
        let cancel = CancellationToken::new();
        cancel.cancel();

        // Either outcome is an error: Cancelled when a key is configured,
        // Config when it is not (resolution runs before the select).
        let options = CallOptions::default();
        let result = client.call("hello", &options, &cancel).await;
        assert!(result.is_err());
    }
}
