//! Context-gathering stage — the bounded tool loop.
//!
//! Flow: prompt → LLM → if tool calls → execute tools → inject results →
//! LLM → repeat. Stops when the model stops calling tools, the iteration cap
//! is hit, or the turn is cancelled. The output is not the model's answer —
//! it is a blob of tool observations the streaming stage grounds the real
//! answer in.

use serde_json::json;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::provider::{ChatRequest, LlmProvider};
use crate::tools::{to_definitions, Tool};

/// Reasoning-iteration cap; prevents unbounded tool-call loops.
pub const MAX_ITERATIONS: usize = 3;

const RESEARCH_SYSTEM_PROMPT: &str = "You are a research assistant with access to tools:\n\
- get_current_time: returns the current time and date (always use this for time/date questions)\n\
- web_search: searches the web for information about companies, topics, or current events\n\n\
Use web_search whenever the question concerns facts you cannot know offline, \
and get_current_time for anything involving the current time or date. \
Call the tools you need before answering.";

/// One recorded tool invocation.
#[derive(Debug, Clone)]
pub struct ToolStep {
    pub name: String,
    pub input: String,
    pub observation: String,
}

/// What the stage hands back to the orchestrator. Never an error: a failed
/// reasoning pass degrades into an error-annotated blob with `tool_error`
/// set, and the turn carries on.
#[derive(Debug, Clone, Default)]
pub struct GatheredContext {
    pub context: String,
    pub tool_error: bool,
}

impl GatheredContext {
    pub fn is_empty(&self) -> bool {
        self.context.trim().is_empty()
    }
}

/// Run the research pass for one turn.
///
/// `history` holds prior user utterances (oldest first), excluding the
/// in-flight message, which arrives as `message`.
pub async fn gather(
    provider: &dyn LlmProvider,
    model: &str,
    max_tokens: u32,
    message: &str,
    history: &[String],
    tools: &[Box<dyn Tool>],
    cancel: &CancellationToken,
) -> GatheredContext {
    let mut raw: Vec<serde_json::Value> = history
        .iter()
        .map(|h| json!({ "role": "user", "content": h }))
        .collect();
    raw.push(json!({ "role": "user", "content": message }));

    let mut steps: Vec<ToolStep> = Vec::new();

    for iteration in 0..MAX_ITERATIONS {
        if cancel.is_cancelled() {
            debug!(iteration, "research loop cancelled");
            break;
        }

        let mut req = ChatRequest::new(model, RESEARCH_SYSTEM_PROMPT, max_tokens);
        req.tools = to_definitions(tools);
        req.raw_messages = Some(raw.clone());

        debug!(iteration, "research loop iteration");

        let response = match provider.send(&req).await {
            Ok(r) => r,
            Err(e) => {
                warn!(error = %e, "research reasoning pass failed");
                return GatheredContext {
                    context: format!("Tool execution failed: {e}"),
                    tool_error: true,
                };
            }
        };

        if response.tool_calls.is_empty() {
            info!(iteration, steps = steps.len(), "research loop complete");
            break;
        }

        // echo the assistant's tool-call message back into the transcript
        let call_entries: Vec<serde_json::Value> = response
            .tool_calls
            .iter()
            .map(|call| {
                json!({
                    "id": call.id,
                    "type": "function",
                    "function": {
                        "name": call.name,
                        "arguments": call.input.to_string(),
                    },
                })
            })
            .collect();
        raw.push(json!({
            "role": "assistant",
            "content": response.content,
            "tool_calls": call_entries,
        }));

        for call in &response.tool_calls {
            if cancel.is_cancelled() {
                debug!("research loop cancelled mid-execution");
                return GatheredContext {
                    context: render_steps(&steps),
                    tool_error: false,
                };
            }
            let input = call
                .input
                .get("input")
                .and_then(|v| v.as_str())
                .unwrap_or_default()
                .to_string();
            let result = match tools.iter().find(|t| t.name() == call.name) {
                Some(tool) => {
                    debug!(tool = %call.name, "executing tool");
                    tool.execute(&input).await
                }
                None => crate::tools::ToolResult::error(format!("unknown tool: {}", call.name)),
            };
            raw.push(json!({
                "role": "tool",
                "tool_call_id": call.id,
                "content": result.content.clone(),
            }));
            steps.push(ToolStep {
                name: call.name.clone(),
                input,
                observation: result.content,
            });
        }
    }

    GatheredContext {
        context: render_steps(&steps),
        tool_error: false,
    }
}

/// Concatenate recorded steps into the context blob, in call order.
pub fn render_steps(steps: &[ToolStep]) -> String {
    steps
        .iter()
        .map(|s| {
            format!(
                "[{name}] Input: {input}\n[{name}] Result: {obs}\n\n",
                name = s.name,
                input = s.input,
                obs = s.observation
            )
        })
        .collect()
}
