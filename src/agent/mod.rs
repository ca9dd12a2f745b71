pub mod context;
pub mod orchestrator;
pub mod system_prompt;

pub use orchestrator::{ResponseOrchestrator, ERROR_REPLY, NO_RESPONSE_REPLY, TOOL_DONE_REPLY};
