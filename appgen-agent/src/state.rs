//! Data model shared by the pipeline stages.
//!
//! `Plan` and `TaskPlan` double as the schemas the model fills in, so their
//! doc comments end up in the prompt as field descriptions.

use std::collections::BTreeMap;

use schemars::JsonSchema;
use serde::{Deserialize, Deserializer, Serialize};

/// One file the application needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct FileSpec {
    /// Path of the file to create or modify, relative to the project root
    pub path: String,
    /// What the file is for, e.g. 'main application logic' or 'styling'
    pub purpose: String,
}

/// High-level description of the application to build.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Plan {
    /// Name of the application
    pub name: String,
    /// One-line description of the application
    pub description: String,
    /// Technologies to use, e.g. 'python, flask' or 'javascript, react'
    pub techstack: String,
    /// Files to create, each with a path and a purpose
    pub features: Vec<FileSpec>,
}

/// One unit of coding work against a single file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ImplementationTask {
    /// Path of the file this step creates or modifies
    pub file_path: String,
    /// Detailed description of what to implement in the file
    pub task_description: String,
}

/// Ordered implementation steps derived from a plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct TaskPlan {
    /// Implementation steps, in the order they should be carried out
    pub implementation_steps: Vec<ImplementationTask>,

    /// The plan this task plan was derived from, attached by the architect.
    #[serde(default, deserialize_with = "lenient_plan", skip_serializing_if = "Option::is_none")]
    #[schemars(skip)]
    pub plan: Option<Plan>,

    /// Keys the model returned that are not modelled above. Carried, never read.
    #[serde(flatten)]
    #[schemars(skip)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl TaskPlan {
    pub fn new(implementation_steps: Vec<ImplementationTask>) -> Self {
        Self {
            implementation_steps,
            plan: None,
            extra: BTreeMap::new(),
        }
    }
}

/// A `plan` value that does not parse is dropped rather than failing the
/// whole task plan; the architect overwrites it anyway.
fn lenient_plan<'de, D>(deserializer: D) -> Result<Option<Plan>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value.and_then(|v| serde_json::from_value(v).ok()))
}

/// Cursor over a task plan's implementation steps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoderState {
    pub task_plan: TaskPlan,
    pub current_step_idx: usize,
    /// Content of the file handled by the most recent step, as read before editing.
    pub current_file_content: Option<String>,
}

impl CoderState {
    pub fn new(task_plan: TaskPlan) -> Self {
        Self {
            task_plan,
            current_step_idx: 0,
            current_file_content: None,
        }
    }

    pub fn is_exhausted(&self) -> bool {
        self.current_step_idx >= self.task_plan.implementation_steps.len()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Status {
    Done,
}

/// Everything the orchestrator threads through the stages.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PipelineState {
    pub user_prompt: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plan: Option<Plan>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_plan: Option<TaskPlan>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coder_state: Option<CoderState>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<Status>,
}

impl PipelineState {
    pub fn new(user_prompt: impl Into<String>) -> Self {
        Self {
            user_prompt: user_prompt.into(),
            ..Default::default()
        }
    }

    /// Apply a stage's partial update. Only keys the update sets are touched.
    pub fn merge(&mut self, update: StateUpdate) {
        if let Some(plan) = update.plan {
            self.plan = Some(plan);
        }
        if let Some(task_plan) = update.task_plan {
            self.task_plan = Some(task_plan);
        }
        if let Some(coder_state) = update.coder_state {
            self.coder_state = Some(coder_state);
        }
        if let Some(status) = update.status {
            self.status = Some(status);
        }
    }

    pub fn is_done(&self) -> bool {
        self.status == Some(Status::Done)
    }
}

/// Partial update returned by a stage.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StateUpdate {
    pub plan: Option<Plan>,
    pub task_plan: Option<TaskPlan>,
    pub coder_state: Option<CoderState>,
    pub status: Option<Status>,
}
