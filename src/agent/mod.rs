// Agent module - tool-call dispatch and plan running

pub mod config;
pub mod dispatcher;
pub mod error;
pub mod runner;

pub use config::AgentConfig;
pub use dispatcher::{
    DispatchOutcome, DispatchState, Dispatcher, first_tool_call, plain_content,
};
pub use error::AgentError;
pub use runner::{CancelToken, PlanHandle, PlanReport, PlanRunner, PlanStep, format_result};
