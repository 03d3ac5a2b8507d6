//! Chat-completion providers used by the agents.

pub mod llm;

pub use llm::{
    LlmConfig, LlmError, LlmMessage, LlmProvider, LlmResponse, LlmRole, LlmUsageTracker,
    MockProvider, OpenAiProvider,
};
