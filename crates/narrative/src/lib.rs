pub mod schema;
pub mod prompt;
pub mod llm;

pub use schema::{ChatMessage, NarrativePrompt, Role};
pub use prompt::build_story_prompt;
pub use llm::{CompletionClient, CompletionConfig, CompletionService, NarrativeGenerator};
