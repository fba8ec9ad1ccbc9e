mod client;
pub mod prompt;
pub mod response;

pub use client::{GeminiClient, TextGenerator};
pub use response::ScriptDraft;
