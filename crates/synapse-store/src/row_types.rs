//! Flat row structs mirroring the persisted tables.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Message entity tag — one variant per persisted row kind.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageEntity {
    /// A user turn.
    User,
    /// An assistant turn with plain text.
    AiMessage,
    /// An assistant turn that issued tool calls.
    AiTool,
    /// A tool's result turn.
    Tool,
}

impl MessageEntity {
    /// Column value for this entity.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::AiMessage => "ai_message",
            Self::AiTool => "ai_tool",
            Self::Tool => "tool",
        }
    }

    /// Parse a column value.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "user" => Some(Self::User),
            "ai_message" => Some(Self::AiMessage),
            "ai_tool" => Some(Self::AiTool),
            "tool" => Some(Self::Tool),
            _ => None,
        }
    }
}

/// Token consumption category.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenType {
    /// Prompt tokens not served from cache.
    InputNoncached,
    /// Prompt tokens served from cache.
    InputCached,
    /// Completion tokens.
    Completion,
}

impl TokenType {
    /// Column value for this token type.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::InputNoncached => "input_noncached",
            Self::InputCached => "input_cached",
            Self::Completion => "completion",
        }
    }

    /// Parse a column value.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "input_noncached" => Some(Self::InputNoncached),
            "input_cached" => Some(Self::InputCached),
            "completion" => Some(Self::Completion),
            _ => None,
        }
    }
}

/// A `threads` row.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThreadRow {
    /// Thread ID (`thr_…`).
    pub id: String,
    /// Owning user.
    pub user_id: String,
    /// Optional project scope.
    pub project_id: Option<String>,
    /// Optional virtual-lab scope.
    pub virtual_lab_id: Option<String>,
    /// Display title.
    pub title: String,
    /// RFC 3339 creation timestamp.
    pub created_at: String,
    /// RFC 3339 last-update timestamp (bumped on each new message).
    pub updated_at: String,
}

/// A `messages` row.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageRow {
    /// Message ID (`msg_…`).
    pub id: String,
    /// Owning thread.
    pub thread_id: String,
    /// Entity tag.
    pub entity: MessageEntity,
    /// JSON content payload (shape tagged by `entity`).
    pub content: Value,
    /// Whether the turn finished writing. Immutable once set.
    pub is_complete: bool,
    /// RFC 3339 creation timestamp.
    pub created_at: String,
}

/// A `tool_calls` row — child of an `ai_tool` message.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolCallRow {
    /// Tool call ID (provider-assigned).
    pub id: String,
    /// Owning message (entity must be `ai_tool`).
    pub message_id: String,
    /// Registered tool name.
    pub name: String,
    /// JSON-serialized arguments.
    pub arguments: Value,
    /// Human-validation state, when the tool demands validation.
    pub validated: Option<String>,
}

/// A `token_consumption` row — child of an LLM-produced message.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenConsumptionRow {
    /// Record ID (`tok_…`).
    pub id: String,
    /// Owning message.
    pub message_id: String,
    /// Consumption category.
    pub token_type: TokenType,
    /// Non-negative token count.
    pub count: u64,
    /// Task tag (e.g. `chat_completion`).
    pub task: String,
    /// Model identifier the call used.
    pub model: String,
}

/// One message with its child tool calls, as loaded for history replay.
#[derive(Clone, Debug, PartialEq)]
pub struct MessageRecord {
    /// The message row.
    pub message: MessageRow,
    /// Child tool calls (empty unless entity is `ai_tool`).
    pub tool_calls: Vec<ToolCallRow>,
}

/// One ranked full-text search hit.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchHit {
    /// Matched message ID.
    pub message_id: String,
    /// Thread containing the message.
    pub thread_id: String,
    /// Entity tag of the message.
    pub entity: MessageEntity,
    /// Highlighted snippet around the match.
    pub snippet: String,
    /// BM25 score (lower is better).
    pub score: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entity_round_trip() {
        for entity in [
            MessageEntity::User,
            MessageEntity::AiMessage,
            MessageEntity::AiTool,
            MessageEntity::Tool,
        ] {
            assert_eq!(MessageEntity::parse(entity.as_str()), Some(entity));
        }
        assert_eq!(MessageEntity::parse("bogus"), None);
    }

    #[test]
    fn token_type_round_trip() {
        for tt in [
            TokenType::InputNoncached,
            TokenType::InputCached,
            TokenType::Completion,
        ] {
            assert_eq!(TokenType::parse(tt.as_str()), Some(tt));
        }
        assert_eq!(TokenType::parse("bogus"), None);
    }

    #[test]
    fn entity_serde_matches_column_values() {
        assert_eq!(
            serde_json::to_string(&MessageEntity::AiTool).unwrap(),
            "\"ai_tool\""
        );
        assert_eq!(
            serde_json::to_string(&TokenType::InputNoncached).unwrap(),
            "\"input_noncached\""
        );
    }
}
