//! Event types for agent operation.
//!
//! Two event families:
//!
//! - **[`StreamEvent`]**: Low-level LLM streaming events from a provider
//!   (text deltas, tool call construction, done/error).
//! - **[`AgentEvent`]**: The caller-facing output protocol — a sequence of
//!   typed events a client renderer consumes as newline-delimited JSON.
//!
//! `StreamEvent` is purely in-memory (never persisted). `AgentEvent` is the
//! orchestrator's public stream contract.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::messages::{ToolCallRequest, UsageReport, UsageTotals};

/// Provider-reported terminal cause of a step.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    /// Normal completion.
    Stop,
    /// Output token limit reached.
    Length,
    /// Blocked by the provider's safety filter.
    ContentFilter,
    /// The model wants to call tools.
    ToolCalls,
    /// Terminated by an error.
    Error,
    /// Anything else (including an exhausted turn budget).
    Other,
}

impl FinishReason {
    /// Whether this reason ends the turn loop (tool calls continue it).
    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::ToolCalls)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// StreamEvent — LLM provider streaming events
// ─────────────────────────────────────────────────────────────────────────────

/// Events emitted while a provider streams one LLM response.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    /// Stream started.
    Start,
    /// Incremental text content.
    TextDelta {
        /// Text fragment.
        delta: String,
    },
    /// A tool call has begun streaming.
    ToolCallStart {
        /// Tool call ID.
        #[serde(rename = "toolCallId")]
        tool_call_id: String,
        /// Tool name.
        name: String,
    },
    /// A tool call is fully constructed.
    ToolCallEnd {
        /// Complete tool call.
        #[serde(rename = "toolCall")]
        tool_call: ToolCallRequest,
    },
    /// Stream completed.
    Done {
        /// Why the model stopped.
        #[serde(rename = "finishReason")]
        finish_reason: FinishReason,
        /// Usage for this call, when the provider reported it.
        #[serde(skip_serializing_if = "Option::is_none")]
        usage: Option<UsageReport>,
    },
    /// Stream error.
    Error {
        /// Error message.
        error: String,
    },
}

// ─────────────────────────────────────────────────────────────────────────────
// AgentEvent — caller-facing output protocol
// ─────────────────────────────────────────────────────────────────────────────

/// Typed output events streamed to the orchestrator's caller.
///
/// Every variant has a fixed required-field shape; the embedding server
/// frames them as newline-delimited JSON.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AgentEvent {
    /// Incremental assistant text.
    TextDelta {
        /// Text fragment.
        delta: String,
    },
    /// The model requested a tool call.
    ToolCall {
        /// Tool call ID.
        #[serde(rename = "toolCallId")]
        tool_call_id: String,
        /// Tool name.
        name: String,
        /// Call arguments.
        arguments: Value,
    },
    /// A tool call produced a result (or a synthetic rate-limit answer).
    ToolResult {
        /// Originating tool call ID.
        #[serde(rename = "toolCallId")]
        tool_call_id: String,
        /// Tool name.
        name: String,
        /// Tool output.
        output: Value,
        /// Whether the output describes a failure.
        #[serde(rename = "isError")]
        is_error: bool,
    },
    /// Terminal stream error. No further events follow.
    Error {
        /// Error message.
        message: String,
    },
    /// Terminal finish event. No further events follow.
    Finish {
        /// Why the run ended.
        reason: FinishReason,
        /// Accumulated usage across all steps of the run.
        usage: UsageTotals,
    },
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn finish_reason_serde() {
        assert_eq!(
            serde_json::to_string(&FinishReason::ContentFilter).unwrap(),
            "\"content_filter\""
        );
        assert_eq!(
            serde_json::from_str::<FinishReason>("\"tool_calls\"").unwrap(),
            FinishReason::ToolCalls
        );
    }

    #[test]
    fn finish_reason_terminality() {
        assert!(FinishReason::Stop.is_terminal());
        assert!(FinishReason::Length.is_terminal());
        assert!(FinishReason::ContentFilter.is_terminal());
        assert!(FinishReason::Other.is_terminal());
        assert!(!FinishReason::ToolCalls.is_terminal());
    }

    #[test]
    fn stream_event_tagged() {
        let event = StreamEvent::TextDelta {
            delta: "hello".into(),
        };
        let v = serde_json::to_value(&event).unwrap();
        assert_eq!(v["type"], "text_delta");
        assert_eq!(v["delta"], "hello");
    }

    #[test]
    fn done_event_omits_absent_usage() {
        let event = StreamEvent::Done {
            finish_reason: FinishReason::Stop,
            usage: None,
        };
        let v = serde_json::to_value(&event).unwrap();
        assert_eq!(v["finishReason"], "stop");
        assert!(v.get("usage").is_none());
    }

    #[test]
    fn agent_event_wire_shape() {
        let event = AgentEvent::ToolResult {
            tool_call_id: "call_1".into(),
            name: "calculator".into(),
            output: json!({"result": 8}),
            is_error: false,
        };
        let v = serde_json::to_value(&event).unwrap();
        assert_eq!(v["type"], "tool_result");
        assert_eq!(v["toolCallId"], "call_1");
        assert_eq!(v["output"]["result"], 8);
        assert_eq!(v["isError"], false);
    }

    #[test]
    fn finish_event_carries_totals() {
        let event = AgentEvent::Finish {
            reason: FinishReason::Stop,
            usage: UsageTotals {
                input_tokens: 100,
                cached_input_tokens: 0,
                completion_tokens: 50,
            },
        };
        let v = serde_json::to_value(&event).unwrap();
        assert_eq!(v["reason"], "stop");
        assert_eq!(v["usage"]["inputTokens"], 100);
        assert_eq!(v["usage"]["completionTokens"], 50);
    }

    #[test]
    fn agent_event_round_trip() {
        let events = vec![
            AgentEvent::TextDelta { delta: "a".into() },
            AgentEvent::ToolCall {
                tool_call_id: "call_1".into(),
                name: "calculator".into(),
                arguments: json!({"a": 1}),
            },
            AgentEvent::Error {
                message: "boom".into(),
            },
        ];
        for event in events {
            let line = serde_json::to_string(&event).unwrap();
            let back: AgentEvent = serde_json::from_str(&line).unwrap();
            assert_eq!(back, event);
        }
    }
}
