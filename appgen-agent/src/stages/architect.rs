use appgen_error::{Error, Result};
use appgen_llm::{LlmProvider, StructuredClient};
use tracing::info;

use crate::prompts;
use crate::state::{Plan, StateUpdate, TaskPlan};

/// Expand a `Plan` into ordered implementation steps.
///
/// The returned task plan always carries the input plan, whatever the model
/// put in that slot.
pub async fn run<P: LlmProvider>(client: &StructuredClient<P>, plan: &Plan) -> Result<StateUpdate> {
    let mut task_plan: TaskPlan = client
        .invoke(&prompts::architect_prompt(plan))
        .await?
        .ok_or_else(|| Error::architect_failed("architect did not return a valid response"))?;

    task_plan.plan = Some(plan.clone());

    info!(steps = task_plan.implementation_steps.len(), "task plan ready");

    Ok(StateUpdate {
        task_plan: Some(task_plan),
        ..Default::default()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::FileSpec;
    use appgen_error::ErrorKind;
    use appgen_llm::{CompletionResponse, ScriptedProvider, ToolCall};
    use serde_json::json;

    fn plan() -> Plan {
        Plan {
            name: "Calculator".into(),
            description: "Adds numbers".into(),
            techstack: "html, javascript".into(),
            features: vec![FileSpec {
                path: "index.html".into(),
                purpose: "page".into(),
            }],
        }
    }

    #[tokio::test]
    async fn test_attaches_the_input_plan() {
        let provider = ScriptedProvider::new(vec![CompletionResponse::with_tool_calls(vec![
            ToolCall::new(
                "call_0",
                "TaskPlan",
                json!({
                    "implementation_steps": [
                        {"file_path": "index.html", "task_description": "markup"},
                        {"file_path": "app.js", "task_description": "logic"}
                    ],
                    "plan": {"name": "Something else", "description": "", "techstack": "", "features": []}
                }),
            ),
        ])]);

        let update = run(&StructuredClient::new(&provider), &plan()).await.unwrap();
        let task_plan = update.task_plan.unwrap();
        assert_eq!(task_plan.implementation_steps.len(), 2);
        assert_eq!(task_plan.plan, Some(plan()));
        assert!(update.plan.is_none());
    }

    #[tokio::test]
    async fn test_null_is_architect_failure() {
        let provider = ScriptedProvider::new(vec![CompletionResponse::with_tool_calls(vec![
            ToolCall::new("call_0", "TaskPlan", serde_json::Value::Null),
        ])]);
        let err = run(&StructuredClient::new(&provider), &plan()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ArchitectFailed);
        assert_eq!(err.operation(), "architect");
    }

    #[tokio::test]
    async fn test_prose_reply_is_architect_failure() {
        let provider = ScriptedProvider::new(vec![CompletionResponse::text(
            "Here is how I would split the work: first the page, then the script.",
        )]);
        let err = run(&StructuredClient::new(&provider), &plan()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ArchitectFailed);
    }
}
