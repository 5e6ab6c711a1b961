//! Conversation state machine
//!
//! Pure transitions over `(Phase, Input)`; effects are executed by the runtime.

mod effect;
pub mod event;
pub mod state;
pub(crate) mod transition;

#[cfg(test)]
mod proptests;

pub use effect::Effect;
pub use event::Event;
pub use state::{ConversationState, TurnContext, UserId};
pub use transition::{prompts, transition};
