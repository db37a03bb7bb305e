use appgen_error::Result;
use appgen_llm::LlmProvider;
use tracing::{debug, info};

use crate::prompts;
use crate::state::{CoderState, StateUpdate, Status, TaskPlan};
use crate::tool_agent::ToolAgent;
use crate::tools::Toolbox;

/// Carry out one implementation step, or report `Done` once none are left.
///
/// The first call starts a fresh cursor over `task_plan`; later calls pick
/// up `coder_state` where the previous step left it.
pub async fn run<P, T>(
    agent: &ToolAgent<P, T>,
    task_plan: &TaskPlan,
    coder_state: Option<CoderState>,
) -> Result<StateUpdate>
where
    P: LlmProvider,
    T: Toolbox,
{
    let mut coder_state = coder_state.unwrap_or_else(|| CoderState::new(task_plan.clone()));

    if coder_state.is_exhausted() {
        info!(steps = coder_state.current_step_idx, "all steps implemented");
        return Ok(StateUpdate {
            coder_state: Some(coder_state),
            status: Some(Status::Done),
            ..Default::default()
        });
    }
    let task = coder_state.task_plan.implementation_steps[coder_state.current_step_idx].clone();

    info!(
        step = coder_state.current_step_idx + 1,
        of = coder_state.task_plan.implementation_steps.len(),
        file = %task.file_path,
        "coding step"
    );

    let existing = agent
        .toolbox()
        .read_file(&task.file_path)
        .map_err(|e| e.with_context("step", coder_state.current_step_idx.to_string()))?;

    let summary = agent
        .run(&prompts::coder_system_prompt(), &prompts::coder_user_prompt(&task, &existing))
        .await
        .map_err(|e| e.with_context("file", task.file_path.clone()))?;
    debug!(file = %task.file_path, summary = %summary, "coder finished step");

    coder_state.current_file_content = Some(existing);
    coder_state.current_step_idx += 1;

    Ok(StateUpdate {
        coder_state: Some(coder_state),
        ..Default::default()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::ImplementationTask;
    use crate::tools::{ProjectFs, WRITE_FILE};
    use appgen_llm::{CompletionResponse, ScriptedProvider, ToolCall};
    use serde_json::json;

    fn task_plan(files: &[&str]) -> TaskPlan {
        TaskPlan::new(
            files
                .iter()
                .map(|f| ImplementationTask {
                    file_path: f.to_string(),
                    task_description: format!("implement {}", f),
                })
                .collect(),
        )
    }

    #[tokio::test]
    async fn test_empty_plan_is_done_without_model_calls() {
        let dir = tempfile::tempdir().unwrap();
        let fs = ProjectFs::new(dir.path()).unwrap();
        let provider = ScriptedProvider::new(vec![]);
        let agent = ToolAgent::new(&provider, &fs);

        let update = run(&agent, &task_plan(&[]), None).await.unwrap();
        assert_eq!(update.status, Some(Status::Done));
        assert_eq!(update.coder_state.unwrap().current_step_idx, 0);
        assert!(provider.requests().is_empty());
    }

    #[tokio::test]
    async fn test_step_reads_existing_content_and_advances() {
        let dir = tempfile::tempdir().unwrap();
        let fs = ProjectFs::new(dir.path()).unwrap();
        fs.write_file("app.py", "old body").unwrap();

        let provider = ScriptedProvider::new(vec![
            CompletionResponse::with_tool_calls(vec![ToolCall::new(
                "call_0",
                WRITE_FILE,
                json!({"path": "app.py", "content": "new body"}),
            )]),
            CompletionResponse::text("rewrote app.py"),
        ]);
        let agent = ToolAgent::new(&provider, &fs);

        let update = run(&agent, &task_plan(&["app.py", "b.py"]), None).await.unwrap();
        assert!(update.status.is_none());

        let coder_state = update.coder_state.unwrap();
        assert_eq!(coder_state.current_step_idx, 1);
        assert_eq!(coder_state.current_file_content.as_deref(), Some("old body"));
        assert_eq!(fs.read_file("app.py").unwrap(), "new body");

        let user = provider.requests()[0].messages[1].content.clone().unwrap();
        assert!(user.contains("Task: implement app.py"));
        assert!(user.contains("File: app.py"));
        assert!(user.contains("old body"));
    }

    #[tokio::test]
    async fn test_exhausted_cursor_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let fs = ProjectFs::new(dir.path()).unwrap();
        let provider = ScriptedProvider::new(vec![]);
        let agent = ToolAgent::new(&provider, &fs);

        let plan = task_plan(&["a.py"]);
        let mut finished = CoderState::new(plan.clone());
        finished.current_step_idx = 1;

        for _ in 0..2 {
            let update = run(&agent, &plan, Some(finished.clone())).await.unwrap();
            assert_eq!(update.status, Some(Status::Done));
            assert_eq!(update.coder_state, Some(finished.clone()));
        }
        assert!(provider.requests().is_empty());
        assert!(fs.list_files().unwrap().is_empty());
    }
}
