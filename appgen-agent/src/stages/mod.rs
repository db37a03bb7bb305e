//! The three pipeline stages.
//!
//! Each stage takes exactly the state it needs and returns the partial
//! update the orchestrator merges back.

pub mod architect;
pub mod coder;
pub mod planner;
