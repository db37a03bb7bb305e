//! Tool-using agent
//!
//! Drives a model through repeated tool calls until it answers with plain
//! text. Each turn sends the whole conversation plus the tool definitions;
//! every requested call is executed against the toolbox and its output is
//! appended as a tool message for the next turn.

use appgen_error::{Error, Result};
use appgen_llm::{ChatMessage, CompletionRequest, LlmProvider, ToolDefinition};
use tracing::{debug, info};

use crate::tools::{self, Toolbox};

/// Model turns allowed per run before giving up.
pub const DEFAULT_MAX_ITERATIONS: usize = 25;

pub struct ToolAgent<P, T> {
    provider: P,
    toolbox: T,
    tools: Vec<ToolDefinition>,
    max_iterations: usize,
    model: Option<String>,
    temperature: Option<f32>,
    max_tokens: Option<usize>,
}

impl<P: LlmProvider, T: Toolbox> ToolAgent<P, T> {
    pub fn new(provider: P, toolbox: T) -> Self {
        Self {
            provider,
            toolbox,
            tools: tools::tool_definitions(),
            max_iterations: DEFAULT_MAX_ITERATIONS,
            model: None,
            temperature: None,
            max_tokens: None,
        }
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    pub fn with_model(mut self, model: Option<String>) -> Self {
        self.model = model;
        self
    }

    pub fn with_temperature(mut self, temperature: Option<f32>) -> Self {
        self.temperature = temperature;
        self
    }

    /// Cap on completion tokens per model turn
    pub fn with_max_tokens(mut self, max_tokens: Option<usize>) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn toolbox(&self) -> &T {
        &self.toolbox
    }

    /// Run the conversation to completion and return the model's final text.
    pub async fn run(&self, system: &str, user: &str) -> Result<String> {
        let mut messages = vec![ChatMessage::system(system), ChatMessage::user(user)];

        for iteration in 1..=self.max_iterations {
            let request = CompletionRequest::new(messages.clone())
                .with_model_opt(self.model.as_deref())
                .with_temperature_opt(self.temperature)
                .with_max_tokens_opt(self.max_tokens)
                .with_tools(self.tools.clone());

            let response = self.provider.complete(request).await.map_err(|e| {
                Error::tool_agent_failed(format!("model call failed: {}", e))
                    .with_operation("tool_agent::run")
                    .with_context("provider", self.provider.name())
                    .with_context("iteration", iteration.to_string())
                    .set_source(e)
            })?;

            if response.tool_calls.is_empty() {
                let answer = response.content.unwrap_or_default();
                info!(iterations = iteration, "tool agent finished");
                return Ok(answer);
            }

            debug!(
                iteration,
                calls = response.tool_calls.len(),
                "model requested tool calls"
            );

            let calls = response.tool_calls;
            messages.push(ChatMessage::assistant_tool_calls(response.content, calls.clone()));
            for call in &calls {
                let output = tools::dispatch(&self.toolbox, call);
                messages.push(ChatMessage::tool_result(call.id.clone(), output));
            }
        }

        Err(Error::tool_call_limit_exceeded(self.max_iterations).with_operation("tool_agent::run"))
    }
}
