//! Persisted conversation rows ↔ provider-native messages.
//!
//! Decoding is lossy by policy: a historical row whose payload fails to
//! parse is skipped with a warning, never an error — one corrupt row must
//! not make a whole thread unreadable. Encoding (what the orchestrator
//! persists through the store) is the exact inverse of decoding, so a
//! decode of freshly written rows reproduces the in-memory history.

use serde_json::Value;
use tracing::warn;

use synapse_core::messages::{ChatMessage, ToolCallRequest};
use synapse_store::row_types::{MessageEntity, MessageRecord};

/// Convert a thread's persisted history into provider-native messages.
pub fn decode_history(records: &[MessageRecord]) -> Vec<ChatMessage> {
    records.iter().filter_map(decode_record).collect()
}

fn decode_record(record: &MessageRecord) -> Option<ChatMessage> {
    let message = &record.message;
    match message.entity {
        MessageEntity::User => text_of(&message.content)
            .map(|content| ChatMessage::User { content })
            .or_else(|| skip(&message.id, "user payload missing text")),
        MessageEntity::AiMessage => text_of(&message.content)
            .map(|content| ChatMessage::Assistant { content })
            .or_else(|| skip(&message.id, "ai_message payload missing text")),
        MessageEntity::AiTool => {
            if record.tool_calls.is_empty() {
                return skip(&message.id, "ai_tool row without tool calls");
            }
            let text = text_of(&message.content).filter(|t| !t.is_empty());
            let tool_calls = record
                .tool_calls
                .iter()
                .map(|call| {
                    ToolCallRequest::new(&call.id, &call.name, call.arguments.clone())
                })
                .collect();
            Some(ChatMessage::AssistantToolCalls { text, tool_calls })
        }
        MessageEntity::Tool => {
            let content = &message.content;
            let tool_call_id = content.get("toolCallId").and_then(Value::as_str);
            let tool_name = content.get("toolName").and_then(Value::as_str);
            let (Some(tool_call_id), Some(tool_name)) = (tool_call_id, tool_name) else {
                return skip(&message.id, "tool payload missing call id or name");
            };
            Some(ChatMessage::ToolResult {
                tool_call_id: tool_call_id.to_string(),
                tool_name: tool_name.to_string(),
                output: content.get("output").cloned().unwrap_or(Value::Null),
                is_error: content
                    .get("isError")
                    .and_then(Value::as_bool)
                    .unwrap_or(false),
            })
        }
    }
}

fn text_of(content: &Value) -> Option<String> {
    content
        .get("text")
        .and_then(Value::as_str)
        .map(String::from)
}

fn skip(message_id: &str, reason: &str) -> Option<ChatMessage> {
    warn!(message_id, reason, "skipping malformed history row");
    None
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use serde_json::json;

    use synapse_store::connection::{new_in_memory, ConnectionConfig};
    use synapse_store::row_types::{MessageRow, ToolCallRow};
    use synapse_store::run_migrations;
    use synapse_store::store::{
        AssistantTurn, ChatStore, CreateThreadOptions, ToolResultRecord,
    };

    use super::*;

    fn row(id: &str, entity: MessageEntity, content: Value) -> MessageRecord {
        MessageRecord {
            message: MessageRow {
                id: id.to_string(),
                thread_id: "thr_1".to_string(),
                entity,
                content,
                is_complete: true,
                created_at: "2026-01-01T00:00:00Z".to_string(),
            },
            tool_calls: Vec::new(),
        }
    }

    #[test]
    fn decodes_full_conversation() {
        let mut ai_tool = row("msg_2", MessageEntity::AiTool, json!({"text": "computing"}));
        ai_tool.tool_calls.push(ToolCallRow {
            id: "call_1".to_string(),
            message_id: "msg_2".to_string(),
            name: "calculator".to_string(),
            arguments: json!({"operation": "add", "a": 5, "b": 3}),
            validated: None,
        });
        let records = vec![
            row("msg_1", MessageEntity::User, json!({"text": "add 5 and 3"})),
            ai_tool,
            row(
                "msg_3",
                MessageEntity::Tool,
                json!({
                    "toolCallId": "call_1",
                    "toolName": "calculator",
                    "output": {"result": 8},
                    "isError": false
                }),
            ),
            row("msg_4", MessageEntity::AiMessage, json!({"text": "it is 8"})),
        ];

        let history = decode_history(&records);
        assert_eq!(history.len(), 4);
        assert_eq!(
            history[0],
            ChatMessage::User {
                content: "add 5 and 3".to_string()
            }
        );
        match &history[1] {
            ChatMessage::AssistantToolCalls { text, tool_calls } => {
                assert_eq!(text.as_deref(), Some("computing"));
                assert_eq!(tool_calls[0].id, "call_1");
                assert_eq!(tool_calls[0].arguments["b"], 3);
            }
            other => panic!("expected tool-call turn, got {other:?}"),
        }
        match &history[2] {
            ChatMessage::ToolResult {
                tool_call_id,
                output,
                is_error,
                ..
            } => {
                assert_eq!(tool_call_id, "call_1");
                assert_eq!(output["result"], 8);
                assert!(!is_error);
            }
            other => panic!("expected tool result, got {other:?}"),
        }
        assert_eq!(
            history[3],
            ChatMessage::Assistant {
                content: "it is 8".to_string()
            }
        );
    }

    #[test]
    fn empty_preamble_text_decodes_to_none() {
        let mut record = row("msg_1", MessageEntity::AiTool, json!({"text": ""}));
        record.tool_calls.push(ToolCallRow {
            id: "call_1".to_string(),
            message_id: "msg_1".to_string(),
            name: "calculator".to_string(),
            arguments: json!({}),
            validated: None,
        });
        match &decode_history(&[record])[0] {
            ChatMessage::AssistantToolCalls { text, .. } => assert!(text.is_none()),
            other => panic!("expected tool-call turn, got {other:?}"),
        }
    }

    #[test]
    fn malformed_rows_are_skipped_silently() {
        let records = vec![
            row("msg_1", MessageEntity::User, json!({"no_text": true})),
            row("msg_2", MessageEntity::Tool, json!({"output": {}})),
            row("msg_3", MessageEntity::AiTool, json!({"text": "orphan"})),
            row("msg_4", MessageEntity::User, json!({"text": "survives"})),
        ];
        let history = decode_history(&records);
        assert_eq!(history.len(), 1);
        assert_eq!(
            history[0],
            ChatMessage::User {
                content: "survives".to_string()
            }
        );
    }

    #[test]
    fn decode_inverts_store_writes() {
        let pool = new_in_memory(&ConnectionConfig::default()).unwrap();
        let _ = run_migrations(&pool.get().unwrap()).unwrap();
        let store = ChatStore::new(pool);
        let thread = store
            .create_thread(&CreateThreadOptions {
                user_id: "u1",
                ..Default::default()
            })
            .unwrap();

        let calls = vec![ToolCallRequest::new(
            "call_1",
            "calculator",
            json!({"operation": "add", "a": 5, "b": 3}),
        )];
        let _ = store.append_user_message(&thread.id, "add 5 and 3").unwrap();
        let _ = store
            .persist_assistant_turn(&AssistantTurn {
                thread_id: &thread.id,
                text: None,
                tool_calls: &calls,
                usage: None,
                model: "m",
                selected_tools: None,
                complexity: None,
            })
            .unwrap();
        let _ = store
            .persist_tool_results(
                &thread.id,
                &[ToolResultRecord {
                    tool_call_id: "call_1".to_string(),
                    tool_name: "calculator".to_string(),
                    output: json!({"result": 8.0}),
                    is_error: false,
                }],
            )
            .unwrap();
        let _ = store
            .persist_assistant_turn(&AssistantTurn {
                thread_id: &thread.id,
                text: Some("it is 8"),
                tool_calls: &[],
                usage: None,
                model: "m",
                selected_tools: None,
                complexity: None,
            })
            .unwrap();

        let history = decode_history(&store.history(&thread.id).unwrap());
        assert_eq!(
            history,
            vec![
                ChatMessage::User {
                    content: "add 5 and 3".to_string()
                },
                ChatMessage::AssistantToolCalls {
                    text: None,
                    tool_calls: calls,
                },
                ChatMessage::ToolResult {
                    tool_call_id: "call_1".to_string(),
                    tool_name: "calculator".to_string(),
                    output: json!({"result": 8.0}),
                    is_error: false,
                },
                ChatMessage::Assistant {
                    content: "it is 8".to_string()
                },
            ]
        );
    }

    #[test]
    fn tool_result_error_flag_defaults_false() {
        let record = row(
            "msg_1",
            MessageEntity::Tool,
            json!({"toolCallId": "call_1", "toolName": "t", "output": null}),
        );
        match &decode_history(&[record])[0] {
            ChatMessage::ToolResult { is_error, .. } => assert!(!is_error),
            other => panic!("expected tool result, got {other:?}"),
        }
    }
}
