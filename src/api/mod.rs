//! LLM provider access.
//!
//! One client, two OpenAI-compatible chat-completion providers selected by
//! endpoint substring. The client performs a single request per call with a
//! wall-clock deadline and classifies failures into a typed taxonomy; retry
//! policy belongs to callers.

mod client;
mod provider;

pub use client::{ApiClient, CallOptions, DEFAULT_TIMEOUT_SECS};
pub use provider::{DEFAULT_DEEPSEEK_ENDPOINT, Provider, ResolvedCall, resolve_call};
