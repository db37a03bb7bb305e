//! # appgen agent
//!
//! Turns a one-sentence request into a project on disk:
//! 1. The planner asks the model for a `Plan` (name, stack, files)
//! 2. The architect expands it into ordered `ImplementationTask`s
//! 3. The coder runs a tool-using agent once per task, reading and writing
//!    files through a `Toolbox`
//! 4. The orchestrator loops the coder until every task is done
//!
//! Everything model-facing goes through `appgen_llm::LlmProvider`, so the
//! whole pipeline runs against a `ScriptedProvider` in tests.

pub mod config;
pub mod graph;
pub mod prompts;
pub mod stages;
pub mod state;
pub mod tool_agent;
pub mod tools;

pub use config::PipelineConfig;
pub use graph::{Node, Pipeline};
pub use state::{
    CoderState, FileSpec, ImplementationTask, PipelineState, Plan, StateUpdate, Status, TaskPlan,
};
pub use tool_agent::{ToolAgent, DEFAULT_MAX_ITERATIONS};
pub use tools::{ProjectFs, Toolbox, DEFAULT_PROJECT_ROOT};

/// The schemas the planner and architect ask the model to fill in.
pub fn schema_summary() -> serde_json::Value {
    use appgen_llm::schema::parameters_for;

    serde_json::json!({
        "Plan": parameters_for::<Plan>(),
        "TaskPlan": parameters_for::<TaskPlan>(),
    })
}
