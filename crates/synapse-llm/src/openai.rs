//! OpenAI-compatible streaming chat-completions client.
//!
//! Speaks the `/v1/chat/completions` SSE protocol used by OpenAI and the
//! many compatible gateways. Tool-call arguments arrive as incremental JSON
//! string fragments keyed by index; [`ChunkAssembler`] accumulates them into
//! complete [`ToolCallRequest`]s. The assembler is pure state so the
//! delta-handling logic is testable without a network.

use async_trait::async_trait;
use eventsource_stream::Eventsource;
use futures::StreamExt;
use serde::Deserialize;
use serde_json::{Value, json};
use std::collections::BTreeMap;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use synapse_core::events::StreamEvent;
use synapse_core::messages::{ChatMessage, ToolCallRequest, UsageReport};

use crate::errors::{LlmError, Result};
use crate::finish::map_finish_reason;
use crate::traits::{ChatRequest, EventStream, LlmProvider};

// ─────────────────────────────────────────────────────────────────────────────
// Wire types
// ─────────────────────────────────────────────────────────────────────────────

/// One SSE chunk of a streaming chat completion.
#[derive(Debug, Deserialize)]
pub struct ChatCompletionChunk {
    /// Choice deltas (we only use index 0).
    #[serde(default)]
    pub choices: Vec<ChunkChoice>,
    /// Usage, present on the final chunk when `include_usage` is set.
    #[serde(default)]
    pub usage: Option<WireUsage>,
}

/// A single choice delta.
#[derive(Debug, Deserialize)]
pub struct ChunkChoice {
    /// Incremental content.
    #[serde(default)]
    pub delta: ChunkDelta,
    /// Present on the chunk that ends the choice.
    #[serde(default)]
    pub finish_reason: Option<String>,
}

/// Delta payload within a choice.
#[derive(Debug, Default, Deserialize)]
pub struct ChunkDelta {
    /// Text fragment.
    #[serde(default)]
    pub content: Option<String>,
    /// Tool-call fragments.
    #[serde(default)]
    pub tool_calls: Option<Vec<WireToolCallDelta>>,
}

/// Incremental tool-call fragment.
#[derive(Debug, Deserialize)]
pub struct WireToolCallDelta {
    /// Slot index — stable across fragments of the same call.
    pub index: u32,
    /// Call ID, present on the first fragment.
    #[serde(default)]
    pub id: Option<String>,
    /// Function name/argument fragments.
    #[serde(default)]
    pub function: Option<WireFunctionDelta>,
}

/// Function fragment within a tool-call delta.
#[derive(Debug, Deserialize)]
pub struct WireFunctionDelta {
    /// Function name, present on the first fragment.
    #[serde(default)]
    pub name: Option<String>,
    /// Argument JSON fragment.
    #[serde(default)]
    pub arguments: Option<String>,
}

/// Usage block on the final chunk.
#[derive(Debug, Deserialize)]
pub struct WireUsage {
    /// Total prompt tokens.
    #[serde(default)]
    pub prompt_tokens: Option<u64>,
    /// Completion tokens.
    #[serde(default)]
    pub completion_tokens: Option<u64>,
    /// Cached-token breakdown.
    #[serde(default)]
    pub prompt_tokens_details: Option<PromptTokensDetails>,
}

/// Cached-token detail within usage.
#[derive(Debug, Deserialize)]
pub struct PromptTokensDetails {
    /// Prompt tokens served from cache.
    #[serde(default)]
    pub cached_tokens: Option<u64>,
}

impl WireUsage {
    fn into_report(self) -> UsageReport {
        UsageReport {
            prompt_tokens: self.prompt_tokens,
            cached_prompt_tokens: self.prompt_tokens_details.and_then(|d| d.cached_tokens),
            completion_tokens: self.completion_tokens,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Request body
// ─────────────────────────────────────────────────────────────────────────────

fn wire_message(message: &ChatMessage) -> Value {
    match message {
        ChatMessage::User { content } => json!({ "role": "user", "content": content }),
        ChatMessage::Assistant { content } => json!({ "role": "assistant", "content": content }),
        ChatMessage::AssistantToolCalls { text, tool_calls } => {
            let calls: Vec<Value> = tool_calls
                .iter()
                .map(|tc| {
                    json!({
                        "id": tc.id,
                        "type": "function",
                        "function": {
                            "name": tc.name,
                            "arguments": tc.arguments.to_string(),
                        },
                    })
                })
                .collect();
            json!({ "role": "assistant", "content": text, "tool_calls": calls })
        }
        ChatMessage::ToolResult {
            tool_call_id,
            output,
            ..
        } => json!({
            "role": "tool",
            "tool_call_id": tool_call_id,
            "content": output.to_string(),
        }),
    }
}

/// Build the JSON body for a streaming chat completion.
pub fn build_request_body(request: &ChatRequest) -> Value {
    let mut messages = vec![json!({ "role": "system", "content": request.system })];
    messages.extend(request.messages.iter().map(wire_message));

    let mut body = json!({
        "model": request.model,
        "temperature": request.temperature,
        "messages": messages,
        "stream": true,
        "stream_options": { "include_usage": true },
    });
    if !request.tools.is_empty() {
        let tools: Vec<Value> = request
            .tools
            .iter()
            .map(|t| json!({ "type": "function", "function": t }))
            .collect();
        body["tools"] = Value::Array(tools);
    }
    body
}

// ─────────────────────────────────────────────────────────────────────────────
// Chunk assembly
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Default)]
struct PartialToolCall {
    id: String,
    name: String,
    arguments: String,
}

/// Accumulates SSE chunks into [`StreamEvent`]s.
///
/// Tool-call fragments are buffered per index until the stream ends, at
/// which point complete calls are emitted followed by `Done`.
#[derive(Default)]
pub struct ChunkAssembler {
    pending: BTreeMap<u32, PartialToolCall>,
    finish_reason: Option<String>,
    usage: Option<UsageReport>,
}

impl ChunkAssembler {
    /// Create a fresh assembler.
    pub fn new() -> Self {
        Self::default()
    }

    /// Absorb one chunk, returning events it produced immediately.
    pub fn absorb(&mut self, chunk: ChatCompletionChunk) -> Vec<StreamEvent> {
        let mut events = Vec::new();

        if let Some(usage) = chunk.usage {
            self.usage = Some(usage.into_report());
        }

        for choice in chunk.choices {
            if let Some(reason) = choice.finish_reason {
                self.finish_reason = Some(reason);
            }
            if let Some(content) = choice.delta.content {
                if !content.is_empty() {
                    events.push(StreamEvent::TextDelta { delta: content });
                }
            }
            for fragment in choice.delta.tool_calls.unwrap_or_default() {
                let slot = self.pending.entry(fragment.index).or_default();
                if let Some(id) = fragment.id {
                    slot.id = id;
                }
                if let Some(function) = fragment.function {
                    if let Some(name) = function.name {
                        slot.name = name;
                        events.push(StreamEvent::ToolCallStart {
                            tool_call_id: slot.id.clone(),
                            name: slot.name.clone(),
                        });
                    }
                    if let Some(args) = function.arguments {
                        slot.arguments.push_str(&args);
                    }
                }
            }
        }

        events
    }

    /// Finish the stream: emit completed tool calls and the `Done` event.
    pub fn finish(self) -> Vec<StreamEvent> {
        let mut events = Vec::new();
        for (_, partial) in self.pending {
            let arguments = if partial.arguments.is_empty() {
                json!({})
            } else {
                serde_json::from_str(&partial.arguments).unwrap_or_else(|e| {
                    warn!(tool = %partial.name, error = %e, "unparseable tool arguments");
                    Value::String(partial.arguments)
                })
            };
            events.push(StreamEvent::ToolCallEnd {
                tool_call: ToolCallRequest::new(partial.id, partial.name, arguments),
            });
        }
        events.push(StreamEvent::Done {
            finish_reason: map_finish_reason(self.finish_reason.as_deref()),
            usage: self.usage,
        });
        events
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Provider
// ─────────────────────────────────────────────────────────────────────────────

/// Streaming provider for OpenAI-compatible chat-completions endpoints.
#[derive(Debug)]
pub struct OpenAiCompatibleProvider {
    name: String,
    base_url: String,
    api_key: String,
    http: reqwest::Client,
}

impl OpenAiCompatibleProvider {
    /// Create a provider. Fails with [`LlmError::Configuration`] when the
    /// API key is empty — resolution must not get as far as the network.
    pub fn new(
        name: impl Into<String>,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Result<Self> {
        let name = name.into();
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(LlmError::Configuration(name));
        }
        Ok(Self {
            name,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
            http: reqwest::Client::new(),
        })
    }
}

fn decode_chunk(data: &str) -> Result<ChatCompletionChunk> {
    serde_json::from_str(data).map_err(|e| LlmError::Decode(e.to_string()))
}

#[async_trait]
impl LlmProvider for OpenAiCompatibleProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn stream_chat(
        &self,
        request: ChatRequest,
        cancel: CancellationToken,
    ) -> Result<EventStream> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = build_request_body(&request);

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let mut sse = response.bytes_stream().eventsource();
        let stream = async_stream::stream! {
            yield StreamEvent::Start;
            let mut assembler = ChunkAssembler::new();
            loop {
                let event = tokio::select! {
                    () = cancel.cancelled() => break,
                    event = sse.next() => event,
                };
                match event {
                    Some(Ok(event)) => {
                        if event.data == "[DONE]" {
                            for out in assembler.finish() {
                                yield out;
                            }
                            return;
                        }
                        match decode_chunk(&event.data) {
                            Ok(chunk) => {
                                for out in assembler.absorb(chunk) {
                                    yield out;
                                }
                            }
                            Err(e) => {
                                yield StreamEvent::Error { error: e.to_string() };
                                return;
                            }
                        }
                    }
                    Some(Err(e)) => {
                        yield StreamEvent::Error { error: e.to_string() };
                        return;
                    }
                    // Stream ended without [DONE]; flush what we have.
                    None => {
                        for out in assembler.finish() {
                            yield out;
                        }
                        return;
                    }
                }
            }
        };
        Ok(Box::pin(stream))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use synapse_core::events::FinishReason;
    use synapse_core::tools::{ToolDefinition, ToolParameterSchema};

    fn chunk(data: &str) -> ChatCompletionChunk {
        serde_json::from_str(data).unwrap()
    }

    #[test]
    fn assembler_text_deltas() {
        let mut asm = ChunkAssembler::new();
        let events =
            asm.absorb(chunk(r#"{"choices":[{"delta":{"content":"Hel"}}]}"#));
        assert_eq!(
            events,
            vec![StreamEvent::TextDelta { delta: "Hel".into() }]
        );
        let events = asm.absorb(chunk(r#"{"choices":[{"delta":{"content":"lo"}}]}"#));
        assert_eq!(events, vec![StreamEvent::TextDelta { delta: "lo".into() }]);
    }

    #[test]
    fn assembler_accumulates_tool_call_fragments() {
        let mut asm = ChunkAssembler::new();
        let events = asm.absorb(chunk(
            r#"{"choices":[{"delta":{"tool_calls":[
                {"index":0,"id":"call_1","function":{"name":"calculator","arguments":""}}
            ]}}]}"#,
        ));
        assert_eq!(
            events,
            vec![StreamEvent::ToolCallStart {
                tool_call_id: "call_1".into(),
                name: "calculator".into(),
            }]
        );
        let _ = asm.absorb(chunk(
            r#"{"choices":[{"delta":{"tool_calls":[
                {"index":0,"function":{"arguments":"{\"operation\":\"add\","}}
            ]}}]}"#,
        ));
        let _ = asm.absorb(chunk(
            r#"{"choices":[{"delta":{"tool_calls":[
                {"index":0,"function":{"arguments":"\"a\":5,\"b\":3}"}}
            ]}},{"delta":{},"finish_reason":"tool_calls"}]}"#,
        ));

        let events = asm.finish();
        assert_eq!(events.len(), 2);
        match &events[0] {
            StreamEvent::ToolCallEnd { tool_call } => {
                assert_eq!(tool_call.id, "call_1");
                assert_eq!(tool_call.name, "calculator");
                assert_eq!(tool_call.arguments["operation"], "add");
                assert_eq!(tool_call.arguments["a"], 5);
            }
            other => panic!("expected ToolCallEnd, got {other:?}"),
        }
        match &events[1] {
            StreamEvent::Done { finish_reason, .. } => {
                assert_eq!(*finish_reason, FinishReason::ToolCalls);
            }
            other => panic!("expected Done, got {other:?}"),
        }
    }

    #[test]
    fn assembler_parallel_tool_calls_keep_order() {
        let mut asm = ChunkAssembler::new();
        let _ = asm.absorb(chunk(
            r#"{"choices":[{"delta":{"tool_calls":[
                {"index":1,"id":"call_b","function":{"name":"second","arguments":"{}"}},
                {"index":0,"id":"call_a","function":{"name":"first","arguments":"{}"}}
            ]}}]}"#,
        ));
        let events = asm.finish();
        match (&events[0], &events[1]) {
            (
                StreamEvent::ToolCallEnd { tool_call: a },
                StreamEvent::ToolCallEnd { tool_call: b },
            ) => {
                assert_eq!(a.id, "call_a");
                assert_eq!(b.id, "call_b");
            }
            other => panic!("expected two ToolCallEnd, got {other:?}"),
        }
    }

    #[test]
    fn assembler_captures_usage() {
        let mut asm = ChunkAssembler::new();
        let _ = asm.absorb(chunk(
            r#"{"choices":[{"delta":{},"finish_reason":"stop"}]}"#,
        ));
        let _ = asm.absorb(chunk(
            r#"{"choices":[],"usage":{"prompt_tokens":100,"completion_tokens":50,
                "prompt_tokens_details":{"cached_tokens":40}}}"#,
        ));
        let events = asm.finish();
        match &events[0] {
            StreamEvent::Done {
                finish_reason,
                usage,
            } => {
                assert_eq!(*finish_reason, FinishReason::Stop);
                let usage = usage.unwrap();
                assert_eq!(usage.prompt_tokens, Some(100));
                assert_eq!(usage.cached_prompt_tokens, Some(40));
                assert_eq!(usage.completion_tokens, Some(50));
            }
            other => panic!("expected Done, got {other:?}"),
        }
    }

    #[test]
    fn assembler_done_without_usage() {
        let asm = ChunkAssembler::new();
        let events = asm.finish();
        assert_eq!(
            events,
            vec![StreamEvent::Done {
                finish_reason: FinishReason::Stop,
                usage: None,
            }]
        );
    }

    #[test]
    fn request_body_shape() {
        let request = ChatRequest {
            model: "gpt-4.1".into(),
            temperature: 0.2,
            system: "Be helpful".into(),
            messages: vec![ChatMessage::User {
                content: "What is a neuron?".into(),
            }],
            tools: vec![ToolDefinition {
                name: "calculator".into(),
                description: "Arithmetic".into(),
                parameters: ToolParameterSchema::empty(),
            }],
        };
        let body = build_request_body(&request);
        assert_eq!(body["model"], "gpt-4.1");
        assert_eq!(body["stream"], true);
        assert_eq!(body["stream_options"]["include_usage"], true);
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["role"], "user");
        assert_eq!(body["tools"][0]["function"]["name"], "calculator");
    }

    #[test]
    fn request_body_tool_turns() {
        let request = ChatRequest {
            model: "m".into(),
            temperature: 0.0,
            system: "s".into(),
            messages: vec![
                ChatMessage::AssistantToolCalls {
                    text: None,
                    tool_calls: vec![ToolCallRequest::new(
                        "call_1",
                        "calculator",
                        json!({"a": 1}),
                    )],
                },
                ChatMessage::ToolResult {
                    tool_call_id: "call_1".into(),
                    tool_name: "calculator".into(),
                    output: json!({"result": 1}),
                    is_error: false,
                },
            ],
            tools: vec![],
        };
        let body = build_request_body(&request);
        let assistant = &body["messages"][1];
        assert_eq!(assistant["tool_calls"][0]["id"], "call_1");
        assert_eq!(assistant["tool_calls"][0]["type"], "function");
        let tool = &body["messages"][2];
        assert_eq!(tool["role"], "tool");
        assert_eq!(tool["tool_call_id"], "call_1");
        assert!(body.get("tools").is_none());
    }

    #[test]
    fn malformed_chunk_is_decode_error() {
        let err = decode_chunk("not json").unwrap_err();
        assert!(matches!(err, LlmError::Decode(_)));
        assert!(err.to_string().starts_with("stream decode error"));
    }

    #[test]
    fn empty_api_key_is_configuration_error() {
        let err =
            OpenAiCompatibleProvider::new("openai", "https://api.openai.com/v1", "  ").unwrap_err();
        assert!(matches!(err, LlmError::Configuration(name) if name == "openai"));
    }

    #[test]
    fn base_url_trailing_slash_trimmed() {
        let provider =
            OpenAiCompatibleProvider::new("openai", "https://api.openai.com/v1/", "sk-test")
                .unwrap();
        assert_eq!(provider.base_url, "https://api.openai.com/v1");
    }
}
