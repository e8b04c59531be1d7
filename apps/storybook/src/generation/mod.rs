// Story Generation Engine
// Implements: stage chain, pipeline orchestration, moderation gate, illustration consistency.
// All model calls go through llm_client; nothing here speaks HTTP.

pub mod illustrations;
pub mod pipeline;
pub mod prompts;
pub mod schemas;
pub mod stage;

pub use pipeline::{StoryPipeline, StoryRequest};
pub use schemas::StoryOutput;
