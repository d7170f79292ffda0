pub mod agent;
pub mod execution;
pub mod workflow;

pub use agent::*;
pub use execution::*;
pub use workflow::*;
