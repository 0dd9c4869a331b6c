//! Agent loop implementation

use std::sync::Arc;

use anyhow::{Context, Result};
use desk_core::{ChatMessage, ChatModel, ToolDefinition};
use tracing::{debug, info, instrument, warn};

use crate::checkpoint::{CheckpointStore, ThreadId};
use crate::tools::router::ToolRouter;
use crate::tools::ToolContext;

use super::state::{AgentConfig, AgentState};

/// The agent loop orchestrator
pub struct AgentLoop {
    model: Arc<dyn ChatModel>,
    router: ToolRouter,
    store: Arc<dyn CheckpointStore>,
    config: AgentConfig,
}

impl AgentLoop {
    pub fn new(
        model: Arc<dyn ChatModel>,
        router: ToolRouter,
        store: Arc<dyn CheckpointStore>,
        config: AgentConfig,
    ) -> Self {
        Self {
            model,
            router,
            store,
            config,
        }
    }

    pub fn store(&self) -> &Arc<dyn CheckpointStore> {
        &self.store
    }

    /// Append `message` to the thread and run until the model stops calling tools
    #[instrument(skip(self, message), fields(thread = %thread))]
    pub async fn run(&self, thread: &ThreadId, message: ChatMessage) -> Result<AgentState> {
        info!(max_iterations = self.config.max_iterations, "Starting agent loop");
        let mut state = AgentState::new();

        self.commit(thread, &mut state, message)?;

        let tool_defs = self.tool_definitions();
        let tool_ctx = ToolContext::new(thread.clone());

        while !state.finished && state.iteration < self.config.max_iterations {
            state.increment_iteration();

            let reply = self.model_turn(thread, &tool_defs).await?;
            let tool_calls = reply.tool_calls.clone();
            let text = reply.text();
            self.commit(thread, &mut state, reply)?;

            if tool_calls.is_empty() {
                info!(iterations = state.iteration, "Agent completed");
                state.mark_finished(text);
                break;
            }

            debug!(tool_count = tool_calls.len(), "Processing tool calls");
            for call in &tool_calls {
                let result = self.router.route(call, &tool_ctx).await;
                state.tool_calls += 1;

                let message = ChatMessage::tool_result(&call.id, &call.function.name, result.content());
                self.commit(thread, &mut state, message)?;
            }
        }

        if !state.finished {
            warn!(max_iterations = self.config.max_iterations, "Agent reached maximum iterations");
            state.mark_error(format!(
                "Agent reached maximum iterations ({})",
                self.config.max_iterations
            ));
        }

        info!(
            finished = state.finished,
            iterations = state.iteration,
            tool_calls = state.tool_calls,
            "Agent loop completed"
        );

        Ok(state)
    }

    /// Replay the full thread, behind the system prompt, to the model
    async fn model_turn(&self, thread: &ThreadId, tool_defs: &[ToolDefinition]) -> Result<ChatMessage> {
        let history = self.store.load(thread)?;

        let mut messages = Vec::with_capacity(history.len() + 1);
        messages.push(ChatMessage::system(self.config.system_prompt.clone()));
        messages.extend(history);

        debug!(messages = messages.len(), "Calling model");
        self.model
            .chat(&messages, tool_defs)
            .await
            .context("Model invocation failed")
    }

    fn commit(&self, thread: &ThreadId, state: &mut AgentState, message: ChatMessage) -> Result<()> {
        self.store.append(thread, std::slice::from_ref(&message))?;
        state.add_message(message);
        Ok(())
    }

    fn tool_definitions(&self) -> Vec<ToolDefinition> {
        self.router.registry().tool_definitions()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checkpoint::MemoryCheckpointStore;
    use crate::test_support::ScriptedModel;
    use crate::tools::registry::ToolRegistry;
    use crate::tools::{
        str_arg, ParameterProperty, ParameterSchema, Tool, ToolContext, ToolKind, ToolResult,
    };
    use async_trait::async_trait;
    use desk_core::{ContentBlock, Role, ToolCall};
    use serde_json::{json, Value};

    struct FakeSearch;

    #[async_trait]
    impl Tool for FakeSearch {
        fn kind(&self) -> ToolKind {
            ToolKind::GetHelp
        }

        fn description(&self) -> &str {
            "fake search"
        }

        fn parameters_schema(&self) -> ParameterSchema {
            ParameterSchema::new().with_required("query", ParameterProperty::string("q"))
        }

        async fn execute(&self, args: &Value, _ctx: &ToolContext) -> Result<ToolResult> {
            Ok(ToolResult::success(format!("steps for {}", str_arg(args, "query")?)))
        }
    }

    struct FailingIncident;

    #[async_trait]
    impl Tool for FailingIncident {
        fn kind(&self) -> ToolKind {
            ToolKind::CreateIncident
        }

        fn description(&self) -> &str {
            "always rejected"
        }

        fn parameters_schema(&self) -> ParameterSchema {
            ParameterSchema::new()
        }

        async fn execute(&self, _args: &Value, _ctx: &ToolContext) -> Result<ToolResult> {
            Ok(ToolResult::error("{\"error\":\"Insufficient rights\"}"))
        }
    }

    fn agent(model: Arc<ScriptedModel>, max_iterations: usize) -> (AgentLoop, Arc<MemoryCheckpointStore>) {
        let mut registry = ToolRegistry::new();
        registry.register(FakeSearch).unwrap();
        registry.register(FailingIncident).unwrap();

        let store = Arc::new(MemoryCheckpointStore::new());
        let config = AgentConfig::default()
            .with_system_prompt("be polite")
            .with_max_iterations(max_iterations);

        let agent = AgentLoop::new(model, ToolRouter::new(registry), store.clone(), config);
        (agent, store)
    }

    fn search_call(id: &str, query: &str) -> ToolCall {
        ToolCall::new(id, "get_help", json!({ "query": query }))
    }

    /// Every tool call is answered, in order, before the next assistant turn
    fn assert_calls_answered(history: &[ChatMessage]) {
        for (idx, msg) in history.iter().enumerate() {
            if msg.role != Role::Assistant || !msg.has_tool_calls() {
                continue;
            }

            // results recorded before the next model turn
            let rest = &history[idx + 1..];
            let window_len = rest
                .iter()
                .position(|m| m.role == Role::Assistant)
                .unwrap_or(rest.len());
            let window = &rest[..window_len];

            assert_eq!(window.len(), msg.tool_calls.len());
            for (call, answer) in msg.tool_calls.iter().zip(window) {
                assert_eq!(answer.role, Role::Tool);
                assert_eq!(answer.tool_call_id.as_deref(), Some(call.id.as_str()));
            }
            for call in &msg.tool_calls {
                let answered = window
                    .iter()
                    .filter(|m| m.tool_call_id.as_deref() == Some(call.id.as_str()))
                    .count();
                assert_eq!(answered, 1, "call {} answered {} times", call.id, answered);
            }
        }
    }

    #[tokio::test]
    async fn test_reply_without_tools_finishes_in_one_turn() {
        let model = Arc::new(ScriptedModel::new(vec![ChatMessage::assistant("Hello! How can I help?")]));
        let (agent, store) = agent(model.clone(), 5);
        let thread = ThreadId::default();

        let state = agent.run(&thread, ChatMessage::user("hi")).await.unwrap();

        assert!(state.finished);
        assert_eq!(state.iteration, 1);
        assert_eq!(state.tool_calls, 0);
        assert_eq!(state.reply(), "Hello! How can I help?");

        let history = store.load(&thread).unwrap();
        assert_eq!(history.len(), 2);
        assert!(history.iter().all(|m| m.role != Role::System));

        let calls = model.calls();
        assert_eq!(calls[0][0], ChatMessage::system("be polite"));
        assert_eq!(calls[0][1], ChatMessage::user("hi"));
    }

    #[tokio::test]
    async fn test_tool_turn_then_final_reply() {
        let model = Arc::new(ScriptedModel::new(vec![
            ChatMessage::assistant_with_tools(
                "",
                vec![
                    search_call("call_1", "vpn"),
                    ToolCall::new("call_2", "create_servicenow_incident", json!({})),
                ],
            ),
            ChatMessage::assistant("Your ticket could not be created, but here are the steps."),
        ]));
        let (agent, store) = agent(model.clone(), 5);
        let thread = ThreadId::default();

        let state = agent.run(&thread, ChatMessage::user("vpn broken")).await.unwrap();

        assert!(state.finished);
        assert_eq!(state.iteration, 2);
        assert_eq!(state.tool_calls, 2);

        let history = store.load(&thread).unwrap();
        let roles: Vec<Role> = history.iter().map(|m| m.role).collect();
        assert_eq!(
            roles,
            vec![Role::User, Role::Assistant, Role::Tool, Role::Tool, Role::Assistant]
        );
        assert_eq!(history[2].text(), "steps for vpn");
        assert_eq!(history[2].name.as_deref(), Some("get_help"));
        // failures are passed through unchanged
        assert_eq!(history[3].text(), "{\"error\":\"Insufficient rights\"}");
        assert_calls_answered(&history);

        // second model turn sees the tool results
        let calls = model.calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[1].len(), 5);
        assert_eq!(calls[1][4].tool_call_id.as_deref(), Some("call_2"));
    }

    #[tokio::test]
    async fn test_unknown_and_invalid_calls_are_still_answered() {
        let model = Arc::new(ScriptedModel::new(vec![
            ChatMessage::assistant_with_tools(
                "",
                vec![
                    ToolCall::new("call_x", "reboot_server", json!({})),
                    ToolCall::new("call_y", "get_help", json!({"q": 1})),
                ],
            ),
            ChatMessage::assistant("Sorry about that."),
        ]));
        let (agent, store) = agent(model, 5);
        let thread = ThreadId::default();

        agent.run(&thread, ChatMessage::user("help")).await.unwrap();

        let history = store.load(&thread).unwrap();
        assert_calls_answered(&history);
        assert_eq!(history[2].text(), "Unknown tool: reboot_server");
        assert_eq!(history[3].text(), "Tool error: Missing required parameter: query");
    }

    #[tokio::test]
    async fn test_history_is_append_only_across_runs() {
        let model = Arc::new(ScriptedModel::new(vec![
            ChatMessage::assistant_with_tools("", vec![search_call("call_1", "printer")]),
            ChatMessage::assistant("Power cycle it."),
            ChatMessage::assistant("Glad it worked!"),
        ]));
        let (agent, store) = agent(model.clone(), 5);
        let thread = ThreadId::default();

        agent.run(&thread, ChatMessage::user("printer offline")).await.unwrap();
        let first = store.load(&thread).unwrap();

        let image = ChatMessage::user(vec![
            ContentBlock::text("it works now"),
            ContentBlock::image_url("data:image/png;base64,AAAA"),
        ]);
        let state = agent.run(&thread, image).await.unwrap();
        let second = store.load(&thread).unwrap();

        assert_eq!(&second[..first.len()], first.as_slice());
        assert_eq!(second.len(), first.len() + 2);
        assert_eq!(state.messages.len(), 2);

        // the full thread is replayed on every turn
        let calls = model.calls();
        assert_eq!(calls[2].len(), 1 + first.len() + 1);
    }

    #[tokio::test]
    async fn test_turn_limit_stops_a_model_that_never_finishes() {
        let model = Arc::new(ScriptedModel::repeating(ChatMessage::assistant_with_tools(
            "",
            vec![search_call("call_loop", "again")],
        )));
        let (agent, store) = agent(model.clone(), 3);
        let thread = ThreadId::default();

        let state = agent.run(&thread, ChatMessage::user("loop")).await.unwrap();

        assert!(!state.finished);
        assert_eq!(state.iteration, 3);
        assert_eq!(state.tool_calls, 3);
        assert_eq!(state.reply(), "Agent reached maximum iterations (3)");
        assert_eq!(model.calls().len(), 3);

        let history = store.load(&thread).unwrap();
        assert_eq!(history.len(), 1 + 3 * 2);
        assert_eq!(history.last().unwrap().role, Role::Tool);
        // the same call id comes back every turn and is answered once per turn
        let answers = history
            .iter()
            .filter(|m| m.tool_call_id.as_deref() == Some("call_loop"))
            .count();
        assert_eq!(answers, 3);
        assert_calls_answered(&history);
    }

    #[tokio::test]
    async fn test_model_error_propagates() {
        let model = Arc::new(ScriptedModel::new(vec![]));
        let (agent, store) = agent(model, 5);
        let thread = ThreadId::default();

        let err = agent.run(&thread, ChatMessage::user("hi")).await.unwrap_err();
        assert!(format!("{:#}", err).contains("Model invocation failed"));
        // the human turn was already recorded
        assert_eq!(store.len(&thread).unwrap(), 1);
    }
}
