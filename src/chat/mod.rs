//! The conversation layer: phases, per-session state, the model's action
//! set, prompt templates, and the orchestrator that ties them together.

pub mod actions;
pub mod orchestrator;
pub mod phase;
pub mod prompts;
pub mod state;

pub use orchestrator::ChatOrchestrator;
pub use phase::Phase;
pub use state::{ConversationState, UserField};
