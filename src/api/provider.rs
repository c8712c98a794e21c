//! Provider detection and per-call resolution.
//!
//! Providers are distinguished by endpoint substring: anything containing
//! `siliconflow` is provider SiliconFlow, everything else defaults to
//! DeepSeek. Each provider carries its own env-var key, default model, and
//! extra payload fields.

use crate::error::{Error, Result};

/// Default DeepSeek endpoint (`DS_EP` overrides).
pub const DEFAULT_DEEPSEEK_ENDPOINT: &str = "https://api.deepseek.com/v1";

/// Default DeepSeek model (`DS_MODEL` overrides).
const DEFAULT_DEEPSEEK_MODEL: &str = "deepseek-chat";

/// Default SiliconFlow model.
const DEFAULT_SILICONFLOW_MODEL: &str = "moonshotai/Kimi-K2-Instruct";

/// A supported chat-completion provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    /// SiliconFlow (endpoint contains "siliconflow").
    SiliconFlow,
    /// DeepSeek (the default).
    DeepSeek,
}

impl Provider {
    /// Detects the provider from an endpoint URL.
    #[must_use]
    pub fn detect(endpoint: &str) -> Self {
        if endpoint.contains("siliconflow") {
            Self::SiliconFlow
        } else {
            Self::DeepSeek
        }
    }

    /// Provider name used in error messages.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::SiliconFlow => "siliconflow",
            Self::DeepSeek => "deepseek",
        }
    }

    /// Environment variable holding the provider's API key.
    #[must_use]
    pub const fn key_env(self) -> &'static str {
        match self {
            Self::SiliconFlow => "SF_KEY",
            Self::DeepSeek => "DS_KEY",
        }
    }

    /// Default model when neither the call nor the environment names one.
    #[must_use]
    pub const fn default_model(self) -> &'static str {
        match self {
            Self::SiliconFlow => DEFAULT_SILICONFLOW_MODEL,
            Self::DeepSeek => DEFAULT_DEEPSEEK_MODEL,
        }
    }
}

/// A fully resolved call target.
#[derive(Debug, Clone)]
pub struct ResolvedCall {
    /// Detected provider.
    pub provider: Provider,
    /// Endpoint base URL, without a trailing slash.
    pub endpoint: String,
    /// Model identifier.
    pub model: String,
    /// API key for the provider.
    pub api_key: String,
}

/// Resolves endpoint, model, and credentials for one call.
///
/// `lookup` supplies environment variables (tests inject a closure). The
/// key for the *selected* provider must be present; a missing key is a
/// configuration error raised before any HTTP request, naming the variable
/// to set.
pub fn resolve_call<F>(
    endpoint_override: Option<&str>,
    model_override: Option<&str>,
    lookup: F,
) -> Result<ResolvedCall>
where
    F: Fn(&str) -> Option<String>,
{
    let endpoint = endpoint_override
        .map(str::to_string)
        .or_else(|| lookup("DS_EP"))
        .unwrap_or_else(|| DEFAULT_DEEPSEEK_ENDPOINT.to_string());
    let endpoint = endpoint.trim_end_matches('/').to_string();

    let provider = Provider::detect(&endpoint);

    let model = model_override.map(str::to_string).unwrap_or_else(|| {
        match provider {
            // DS_MODEL only applies to the default provider.
            Provider::DeepSeek => lookup("DS_MODEL"),
            Provider::SiliconFlow => None,
        }
        .unwrap_or_else(|| provider.default_model().to_string())
    });

    let api_key = lookup(provider.key_env())
        .filter(|key| !key.trim().is_empty())
        .ok_or_else(|| Error::Config {
            message: format!(
                "missing {} for provider {}",
                provider.key_env(),
                provider.name()
            ),
        })?;

    Ok(ResolvedCall {
        provider,
        endpoint,
        model,
        api_key,
    })
}
