//! Provider-native conversation messages and token usage types.
//!
//! [`ChatMessage`] is the in-memory turn representation the orchestrator
//! feeds to an LLM provider. It is a tagged union with one variant per
//! persisted entity tag, so the codec can pattern-match on the tag instead
//! of probing JSON fields.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A tool invocation requested by the model.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolCallRequest {
    /// Provider-assigned tool call ID.
    pub id: String,
    /// Registered tool name.
    pub name: String,
    /// Deserialized call arguments.
    pub arguments: Value,
}

impl ToolCallRequest {
    /// Create a new tool call request.
    pub fn new(id: impl Into<String>, name: impl Into<String>, arguments: Value) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            arguments,
        }
    }
}

/// One conversational turn in the LLM-native shape.
///
/// Variants map 1:1 onto the persisted message entity tags:
/// `user`, `ai_message`, `ai_tool`, `tool`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "snake_case")]
pub enum ChatMessage {
    /// A user turn with raw text content.
    User {
        /// Message text.
        content: String,
    },
    /// An assistant turn with plain text content.
    Assistant {
        /// Message text.
        content: String,
    },
    /// An assistant turn that issued one or more tool calls.
    AssistantToolCalls {
        /// Optional preamble text emitted before the calls.
        #[serde(skip_serializing_if = "Option::is_none")]
        text: Option<String>,
        /// Requested tool calls, in emission order.
        #[serde(rename = "toolCalls")]
        tool_calls: Vec<ToolCallRequest>,
    },
    /// A tool's result turn, keyed by the originating call.
    ToolResult {
        /// ID of the `ai_tool` turn's call this answers.
        #[serde(rename = "toolCallId")]
        tool_call_id: String,
        /// Name of the tool that produced this result.
        #[serde(rename = "toolName")]
        tool_name: String,
        /// Tool output (arbitrary JSON).
        output: Value,
        /// Whether the output describes a failure.
        #[serde(rename = "isError", default)]
        is_error: bool,
    },
}

/// Token usage as reported by a provider for one LLM call.
///
/// All fields are optional: providers may omit usage entirely, and absent
/// usage is not an error anywhere downstream.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageReport {
    /// Total prompt tokens (cached share included).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompt_tokens: Option<u64>,
    /// Prompt tokens served from the provider's cache.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cached_prompt_tokens: Option<u64>,
    /// Completion tokens.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completion_tokens: Option<u64>,
}

/// Accumulated usage totals across an orchestrator run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageTotals {
    /// Non-cached input tokens.
    pub input_tokens: u64,
    /// Cached input tokens.
    pub cached_input_tokens: u64,
    /// Completion tokens.
    pub completion_tokens: u64,
}

impl UsageTotals {
    /// Fold one provider report into the running totals.
    pub fn absorb(&mut self, report: &UsageReport) {
        let cached = report.cached_prompt_tokens.unwrap_or(0);
        if let Some(prompt) = report.prompt_tokens {
            self.input_tokens += prompt.saturating_sub(cached);
            self.cached_input_tokens += cached;
        }
        if let Some(completion) = report.completion_tokens {
            self.completion_tokens += completion;
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
