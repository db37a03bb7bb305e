//! Orchestrator
//!
//! A fixed state machine over the three stages:
//!
//! ```text
//! Planner -> Architect -> Coder --(status != DONE)--> Coder
//!                           \----(status == DONE)---> End
//! ```

use std::fmt;

use appgen_error::{Error, Result};
use appgen_llm::{LlmProvider, StructuredClient};
use tracing::{debug, info};

use crate::config::PipelineConfig;
use crate::stages::{architect, coder, planner};
use crate::state::PipelineState;
use crate::tool_agent::ToolAgent;
use crate::tools::Toolbox;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Node {
    Planner,
    Architect,
    Coder,
    End,
}

impl Node {
    pub const ENTRY: Node = Node::Planner;

    /// The node to run after this one, given the state it produced.
    pub fn next(self, state: &PipelineState) -> Node {
        match self {
            Node::Planner => Node::Architect,
            Node::Architect => Node::Coder,
            Node::Coder if state.is_done() => Node::End,
            Node::Coder => Node::Coder,
            Node::End => Node::End,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Node::Planner => "planner",
            Node::Architect => "architect",
            Node::Coder => "coder",
            Node::End => "end",
        }
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Runs a user request through planner, architect and coder.
pub struct Pipeline<P, T> {
    provider: P,
    toolbox: T,
    config: PipelineConfig,
}

impl<P: LlmProvider, T: Toolbox> Pipeline<P, T> {
    pub fn new(provider: P, toolbox: T) -> Self {
        Self::with_config(provider, toolbox, PipelineConfig::default())
    }

    pub fn with_config(provider: P, toolbox: T, config: PipelineConfig) -> Self {
        Self {
            provider,
            toolbox,
            config,
        }
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    pub fn toolbox(&self) -> &T {
        &self.toolbox
    }

    /// Run from the entry node to `End` and return the final state.
    pub async fn run(&self, user_prompt: &str) -> Result<PipelineState> {
        info!(provider = self.provider.name(), "pipeline started");

        let mut state = PipelineState::new(user_prompt);
        let mut node = Node::ENTRY;
        while node != Node::End {
            node = self.step(node, &mut state).await?;
        }

        info!(
            steps = state.coder_state.as_ref().map(|c| c.current_step_idx).unwrap_or(0),
            "pipeline finished"
        );
        Ok(state)
    }

    /// Execute `node`, merge its update into `state` and return the next node.
    pub async fn step(&self, node: Node, state: &mut PipelineState) -> Result<Node> {
        debug!(node = %node, "entering node");

        let update = match node {
            Node::Planner => planner::run(&self.structured(), &state.user_prompt).await?,
            Node::Architect => {
                let plan = state.plan.as_ref().ok_or_else(|| missing("plan", node))?;
                architect::run(&self.structured(), plan).await?
            }
            Node::Coder => {
                let task_plan = state.task_plan.as_ref().ok_or_else(|| missing("task_plan", node))?;
                coder::run(&self.tool_agent(), task_plan, state.coder_state.clone()).await?
            }
            Node::End => return Ok(Node::End),
        };

        state.merge(update);
        Ok(node.next(state))
    }

    fn structured(&self) -> StructuredClient<&P> {
        StructuredClient::new(&self.provider)
            .with_model(self.config.model.clone())
            .with_temperature(self.config.temperature)
            .with_max_tokens(self.config.max_tokens)
    }

    fn tool_agent(&self) -> ToolAgent<&P, &T> {
        ToolAgent::new(&self.provider, &self.toolbox)
            .with_max_iterations(self.config.max_tool_iterations)
            .with_model(self.config.model.clone())
            .with_temperature(self.config.temperature)
            .with_max_tokens(self.config.max_tokens)
    }
}

fn missing(key: &str, node: Node) -> Error {
    Error::unexpected(format!("{} reached without a {}", node, key))
        .with_operation("pipeline::step")
        .with_context("node", node.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::Status;
    use crate::tools::{ProjectFs, READ_FILE, WRITE_FILE};
    use appgen_error::ErrorKind;
    use appgen_llm::{CompletionResponse, ScriptedProvider, ToolCall};
    use serde_json::json;

    fn plan_response() -> CompletionResponse {
        CompletionResponse::with_tool_calls(vec![ToolCall::new(
            "plan",
            "Plan",
            json!({
                "name": "Calculator",
                "description": "A tiny calculator",
                "techstack": "html, javascript",
                "features": [
                    {"path": "index.html", "purpose": "markup"},
                    {"path": "app.js", "purpose": "logic"}
                ]
            }),
        )])
    }

    fn task_plan_response(files: &[&str]) -> CompletionResponse {
        let steps: Vec<_> = files
            .iter()
            .map(|f| json!({"file_path": f, "task_description": format!("implement {}", f)}))
            .collect();
        CompletionResponse::with_tool_calls(vec![ToolCall::new(
            "tasks",
            "TaskPlan",
            json!({ "implementation_steps": steps }),
        )])
    }

    fn write(path: &str, content: &str) -> CompletionResponse {
        CompletionResponse::with_tool_calls(vec![ToolCall::new(
            format!("write_{}", path),
            WRITE_FILE,
            json!({"path": path, "content": content}),
        )])
    }

    #[test]
    fn test_transitions() {
        let mut state = PipelineState::new("x");
        assert_eq!(Node::ENTRY, Node::Planner);
        assert_eq!(Node::Planner.next(&state), Node::Architect);
        assert_eq!(Node::Architect.next(&state), Node::Coder);
        assert_eq!(Node::Coder.next(&state), Node::Coder);

        state.status = Some(Status::Done);
        assert_eq!(Node::Coder.next(&state), Node::End);
        assert_eq!(Node::End.next(&state), Node::End);
    }

    #[tokio::test]
    async fn test_full_run_writes_every_file() {
        let dir = tempfile::tempdir().unwrap();
        let fs = ProjectFs::new(dir.path().join("generated_project")).unwrap();
        let provider = ScriptedProvider::new(vec![
            plan_response(),
            task_plan_response(&["index.html", "app.js", "index.html"]),
            write("index.html", "<script src=\"app.js\"></script>"),
            CompletionResponse::text("markup done"),
            CompletionResponse::with_tool_calls(vec![ToolCall::new(
                "look",
                READ_FILE,
                json!({"path": "index.html"}),
            )]),
            write("app.js", "console.log(1)"),
            CompletionResponse::text("logic done"),
            write("index.html", "<h1>Calc</h1><script src=\"app.js\"></script>"),
            CompletionResponse::text("title added"),
        ]);

        let pipeline = Pipeline::new(&provider, &fs);
        let state = pipeline.run("build a calculator").await.unwrap();

        assert!(state.is_done());
        assert_eq!(provider.remaining(), 0);

        let plan = state.plan.clone().unwrap();
        let task_plan = state.task_plan.clone().unwrap();
        assert_eq!(task_plan.plan, Some(plan));

        let coder = state.coder_state.unwrap();
        assert_eq!(coder.current_step_idx, 3);
        assert_eq!(
            coder.current_file_content.as_deref(),
            Some("<script src=\"app.js\"></script>")
        );

        assert_eq!(fs.list_files().unwrap(), vec!["app.js", "index.html"]);
        assert_eq!(
            fs.read_file("index.html").unwrap(),
            "<h1>Calc</h1><script src=\"app.js\"></script>"
        );
    }

    #[tokio::test]
    async fn test_no_steps_finishes_without_coding() {
        let dir = tempfile::tempdir().unwrap();
        let fs = ProjectFs::new(dir.path()).unwrap();
        let provider = ScriptedProvider::new(vec![plan_response(), task_plan_response(&[])]);

        let state = Pipeline::new(&provider, &fs).run("nothing").await.unwrap();
        assert!(state.is_done());
        assert_eq!(state.coder_state.unwrap().current_step_idx, 0);
        assert_eq!(provider.requests().len(), 2);
    }

    #[tokio::test]
    async fn test_step_by_step_index_is_monotonic() {
        let dir = tempfile::tempdir().unwrap();
        let fs = ProjectFs::new(dir.path()).unwrap();
        let provider = ScriptedProvider::new(vec![
            plan_response(),
            task_plan_response(&["a.js", "b.js"]),
            CompletionResponse::text("a"),
            CompletionResponse::text("b"),
        ]);
        let pipeline = Pipeline::new(&provider, &fs);

        let mut state = PipelineState::new("two files");
        let mut node = Node::ENTRY;
        let mut visited = vec![];
        let mut last_idx = 0;
        while node != Node::End {
            visited.push(node);
            node = pipeline.step(node, &mut state).await.unwrap();
            if let Some(coder) = &state.coder_state {
                assert!(coder.current_step_idx >= last_idx);
                last_idx = coder.current_step_idx;
            }
        }

        assert_eq!(
            visited,
            vec![Node::Planner, Node::Architect, Node::Coder, Node::Coder, Node::Coder]
        );
        assert_eq!(last_idx, 2);

        // Running the coder again once done changes nothing.
        let before = state.clone();
        assert_eq!(pipeline.step(Node::Coder, &mut state).await.unwrap(), Node::End);
        assert_eq!(state, before);
    }

    #[tokio::test]
    async fn test_planner_failure_stops_the_run() {
        let dir = tempfile::tempdir().unwrap();
        let fs = ProjectFs::new(dir.path()).unwrap();
        let provider = ScriptedProvider::new(vec![CompletionResponse::empty()]);
        let pipeline = Pipeline::new(&provider, &fs);

        let err = pipeline.run("anything").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::PlannerFailed);

        let mut state = PipelineState::new("anything");
        provider.push(CompletionResponse::empty());
        assert!(pipeline.step(Node::Planner, &mut state).await.is_err());
        assert!(state.plan.is_none());
    }

    #[tokio::test]
    async fn test_architect_without_plan_is_unexpected() {
        let dir = tempfile::tempdir().unwrap();
        let fs = ProjectFs::new(dir.path()).unwrap();
        let provider = ScriptedProvider::new(vec![]);

        let mut state = PipelineState::new("x");
        let err = Pipeline::new(&provider, &fs)
            .step(Node::Architect, &mut state)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unexpected);
        assert!(provider.requests().is_empty());
    }

    #[tokio::test]
    async fn test_tool_limit_aborts_but_keeps_written_files() {
        let dir = tempfile::tempdir().unwrap();
        let fs = ProjectFs::new(dir.path()).unwrap();
        let provider = ScriptedProvider::new(vec![
            plan_response(),
            task_plan_response(&["index.html"]),
            write("index.html", "v1"),
            write("index.html", "v2"),
        ]);
        let config = PipelineConfig {
            max_tool_iterations: 2,
            max_tokens: Some(1024),
            ..Default::default()
        };

        let err = Pipeline::with_config(&provider, &fs, config)
            .run("x")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ToolCallLimitExceeded);
        assert!(provider.requests().iter().all(|r| r.max_tokens == Some(1024)));
        assert_eq!(fs.read_file("index.html").unwrap(), "v2");
    }
}
