//! Agent state management

use desk_core::ChatMessage;

/// Instruction prepended to every model turn
pub const DEFAULT_SYSTEM_PROMPT: &str = "\
You are a very polite service desk agent. You use the provided search engine to look up information. \
You are allowed to make multiple calls (either together or in sequence). \
Only look up information when you are sure of what you want. \
If you need to look up some information before asking a follow up question, you are allowed to do that!

If the user uploads an image, please understand the image and try to continue the conversation. \
If you are unable to understand the image, ask the user to provide more information.

At the end of the interaction (when the user query is resolved or when you need to have someone look at it offline) \
you create a ServiceNow ticket and a ServiceNow knowledge article.
Share the ticket number back to the user for future reference.
Thank the user for the opportunity to serve and end the call.";

/// Configuration for the agent
#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// System prompt, sent with every model turn but never stored
    pub system_prompt: String,
    /// Maximum model turns per run
    pub max_iterations: usize,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            max_iterations: 25,
        }
    }
}

impl AgentConfig {
    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self
    }

    pub fn with_max_iterations(mut self, max: usize) -> Self {
        self.max_iterations = max;
        self
    }
}

/// Outcome of one agent run
#[derive(Debug, Clone, Default)]
pub struct AgentState {
    /// Messages appended to the thread during this run
    pub messages: Vec<ChatMessage>,
    /// Model turns taken
    pub iteration: usize,
    /// Tool calls executed
    pub tool_calls: usize,
    /// Whether the model gave a final reply
    pub finished: bool,
    /// Final response (if finished)
    pub final_response: Option<String>,
    /// Why the run stopped without a final reply
    pub error: Option<String>,
}

impl AgentState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_message(&mut self, message: ChatMessage) {
        self.messages.push(message);
    }

    pub fn mark_finished(&mut self, response: String) {
        self.finished = true;
        self.final_response = Some(response);
    }

    pub fn mark_error(&mut self, error: String) {
        self.error = Some(error);
    }

    pub fn increment_iteration(&mut self) {
        self.iteration += 1;
    }

    /// Text to show the user for this run
    pub fn reply(&self) -> String {
        match (&self.final_response, &self.error) {
            (Some(response), _) => response.clone(),
            (None, Some(error)) => error.clone(),
            (None, None) => String::new(),
        }
    }
}
