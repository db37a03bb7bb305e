use appgen_error::{Error, Result};
use appgen_llm::{LlmProvider, StructuredClient};
use tracing::info;

use crate::prompts;
use crate::state::{Plan, StateUpdate};

/// Turn the user's request into a `Plan`.
pub async fn run<P: LlmProvider>(client: &StructuredClient<P>, user_prompt: &str) -> Result<StateUpdate> {
    if user_prompt.trim().is_empty() {
        return Err(Error::invalid_argument("user prompt is empty").with_operation("planner"));
    }

    let plan: Plan = client
        .invoke(&prompts::planner_prompt(user_prompt))
        .await?
        .ok_or_else(|| Error::planner_failed("planner did not return a valid response"))?;

    info!(name = %plan.name, files = plan.features.len(), "plan ready");

    Ok(StateUpdate {
        plan: Some(plan),
        ..Default::default()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use appgen_error::ErrorKind;
    use appgen_llm::{CompletionResponse, ScriptedProvider, ToolCall};
    use serde_json::json;

    #[tokio::test]
    async fn test_plan_from_model() {
        let provider = ScriptedProvider::new(vec![CompletionResponse::with_tool_calls(vec![
            ToolCall::new(
                "call_0",
                "Plan",
                json!({
                    "name": "Todo",
                    "description": "A todo list",
                    "techstack": "html, javascript",
                    "features": [{"path": "index.html", "purpose": "markup"}]
                }),
            ),
        ])]);

        let update = run(&StructuredClient::new(&provider), "a todo app").await.unwrap();
        let plan = update.plan.unwrap();
        assert_eq!(plan.name, "Todo");
        assert_eq!(plan.features[0].path, "index.html");
        assert!(update.task_plan.is_none());

        let prompt = provider.requests()[0].messages[0].content.clone().unwrap();
        assert!(prompt.contains("a todo app"));
    }

    #[tokio::test]
    async fn test_no_plan_is_planner_failure() {
        let provider = ScriptedProvider::new(vec![CompletionResponse::empty()]);
        let err = run(&StructuredClient::new(&provider), "a todo app").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::PlannerFailed);
    }

    #[tokio::test]
    async fn test_prose_reply_is_planner_failure() {
        let provider = ScriptedProvider::new(vec![CompletionResponse::text(
            "I'm sorry, I can't produce a plan for that.",
        )]);
        let err = run(&StructuredClient::new(&provider), "a todo app").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::PlannerFailed);
    }

    #[tokio::test]
    async fn test_blank_prompt_never_reaches_the_model() {
        let provider = ScriptedProvider::new(vec![]);
        let err = run(&StructuredClient::new(&provider), "  \n").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
        assert!(provider.requests().is_empty());
    }
}
