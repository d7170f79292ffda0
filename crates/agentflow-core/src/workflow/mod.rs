//! Workflow engine: sequential multi-agent pipelines.
//!
//! ```text
//! WorkflowInput (+ file) ──► InputAdapter ──► step 1
//!                                              │ output
//!                      validate / repair ──► step 2 ──► ... ──► final_output
//!                                              │
//!                                       ExecutionContext
//! ```
//!
//! Workflows come either from the store (`WorkflowSpec`) or from a YAML
//! file (`WorkflowDefinition`) resolved against the agent catalog.

pub mod adapter;
pub mod definition;
pub mod executor;
pub mod registry;

pub use adapter::InputAdapter;
pub use definition::{StepDefinition, WorkflowDefinition};
pub use executor::WorkflowEngine;
pub use registry::{AgentRegistry, AgentServices};
