mod chat;
pub mod prompts;
mod provider;

pub use provider::{CompletionOptions, LlmBackend, LlmProvider};
