//! # appgen-llm
//!
//! The model backend boundary of appgen.
//!
//! ## Core Concepts
//! - **Provider**: Trait-based chat-completion client (OpenAI-compatible HTTP, scripted)
//! - **Tools**: Function definitions the model may call, and the calls it makes
//! - **Structured output**: A typed value requested through a forced function call
//! - **Usage**: Token accounting across calls

pub mod provider;
pub mod schema;
pub mod structured;

pub use appgen_error::{Error, ErrorKind, ErrorStatus, Result};
pub use provider::{
    ChatMessage, CompletionRequest, CompletionResponse, FinishReason, LlmProvider, OpenAIProvider,
    ProviderConfig, ProviderError, ProviderType, Role, ScriptedProvider, ToolCall, ToolChoice,
    ToolDefinition, Tracked, Usage, UsageTracker,
};
pub use structured::StructuredClient;
