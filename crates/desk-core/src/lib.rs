//! desk-core: Shared library for the service-desk assistant
//!
//! Provides:
//! - Configuration loading (desk.toml + environment overrides)
//! - Chat message model shared by the agent and the tools
//! - OpenAI-compatible chat client with tool binding

pub mod chat;
pub mod config;
pub mod openai;

pub use chat::{
    ChatMessage, ChatModel, Content, ContentBlock, FunctionCall, FunctionDefinition, ImageUrl,
    Role, ToolCall, ToolDefinition,
};
pub use config::Config;
pub use openai::OpenAiClient;
