//! Structured-output client
//!
//! Asks the model for a value of a given type by offering a single function
//! tool whose parameters are the type's JSON schema, and forcing the model
//! to call it.

use appgen_error::{Error, Result};
use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::provider::{ChatMessage, CompletionRequest, CompletionResponse, LlmProvider, ToolChoice};
use crate::schema;

pub struct StructuredClient<P> {
    provider: P,
    model: Option<String>,
    temperature: Option<f32>,
    max_tokens: Option<usize>,
}

impl<P: LlmProvider> StructuredClient<P> {
    pub fn new(provider: P) -> Self {
        Self {
            provider,
            model: None,
            temperature: None,
            max_tokens: None,
        }
    }

    pub fn with_model(mut self, model: Option<String>) -> Self {
        self.model = model;
        self
    }

    pub fn with_temperature(mut self, temperature: Option<f32>) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: Option<usize>) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Request a `T` for `prompt`.
    ///
    /// `Ok(None)` means the model produced no value at all: no function call
    /// and no JSON in its reply, or a literal `null`. JSON that is present but
    /// does not fit `T` is a `ParseFailed` error.
    pub async fn invoke<T>(&self, prompt: &str) -> Result<Option<T>>
    where
        T: JsonSchema + DeserializeOwned,
    {
        let tool = schema::tool_for::<T>(format!(
            "Return the result as a {} object matching this schema.",
            T::schema_name()
        ));
        let tool_name = tool.name.clone();

        let request = CompletionRequest::new(vec![ChatMessage::user(prompt)])
            .with_model_opt(self.model.as_deref())
            .with_temperature_opt(self.temperature)
            .with_max_tokens_opt(self.max_tokens)
            .with_tools(vec![tool])
            .with_tool_choice(ToolChoice::Function {
                name: tool_name.clone(),
            });

        debug!(schema = %tool_name, "structured call");
        let response = self
            .provider
            .complete(request)
            .await
            .map_err(|e| e.into_error("structured::invoke").with_context("schema", tool_name.clone()))?;

        parse_response(&tool_name, response)
    }
}

fn parse_response<T: DeserializeOwned>(tool_name: &str, response: CompletionResponse) -> Result<Option<T>> {
    let value: serde_json::Value = if let Some(call) = response
        .tool_calls
        .iter()
        .find(|c| c.name == tool_name)
        .or_else(|| response.tool_calls.first())
    {
        if call.name != tool_name {
            warn!(expected = tool_name, got = %call.name, "model called an unexpected function");
        }
        if call.arguments.trim().is_empty() {
            return Ok(None);
        }
        serde_json::from_str(&call.arguments).map_err(|e| {
            Error::parse_failed(format!("function arguments are not JSON: {}", e))
                .with_operation("structured::parse")
                .with_context("schema", tool_name)
                .set_source(e)
        })?
    } else {
        // Without a function call only a JSON reply counts; prose means no value.
        let text = response.content.as_deref().map(schema::extract_json).unwrap_or("");
        match serde_json::from_str(text) {
            Ok(value) => value,
            Err(_) => {
                debug!(schema = %tool_name, "model replied without structured output");
                return Ok(None);
            }
        }
    };

    if value.is_null() {
        return Ok(None);
    }

    serde_json::from_value(value).map(Some).map_err(|e| {
        Error::parse_failed(format!("model output does not match {}: {}", tool_name, e))
            .with_operation("structured::parse")
            .with_context("schema", tool_name)
            .set_source(e)
    })
}
