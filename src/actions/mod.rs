//! Randomized session actions
//!
//! A closed catalog of six action classes dispatched by pattern match. The
//! swarm itself only uses this for the one-shot action after a session
//! becomes active and, when configured, for a periodic driver.

mod catalog;
mod dispatcher;

pub use catalog::{
    Action, ActionKind, BlockInteraction, WorldInteraction, BLOCK_REACH, CHAT_MESSAGES, COMMANDS,
};
pub use dispatcher::{ActionDispatcher, ActionOutcome};
