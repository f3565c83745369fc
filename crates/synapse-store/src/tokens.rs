//! Provider usage report → token consumption rows.
//!
//! The accounting matrix: an absent usage report produces no rows at all,
//! while a report with zero counts still produces rows recording the zero.
//! Cached prompt tokens are split out of the prompt total, so the
//! `input_noncached` row carries `prompt - cached`.

use synapse_core::ids::new_token_record_id;
use synapse_core::messages::UsageReport;

use crate::row_types::{TokenConsumptionRow, TokenType};

/// Build consumption rows for one LLM-produced message.
pub fn consumption_rows(
    message_id: &str,
    model: &str,
    task: &str,
    usage: Option<&UsageReport>,
) -> Vec<TokenConsumptionRow> {
    let Some(usage) = usage else {
        return Vec::new();
    };

    let mut rows = Vec::with_capacity(3);
    let mut push = |token_type: TokenType, count: u64| {
        rows.push(TokenConsumptionRow {
            id: new_token_record_id(),
            message_id: message_id.to_string(),
            token_type,
            count,
            task: task.to_string(),
            model: model.to_string(),
        });
    };

    let cached = usage.cached_prompt_tokens.unwrap_or(0);
    if let Some(prompt) = usage.prompt_tokens {
        push(TokenType::InputNoncached, prompt.saturating_sub(cached));
    }
    if let Some(cached) = usage.cached_prompt_tokens {
        push(TokenType::InputCached, cached);
    }
    if let Some(completion) = usage.completion_tokens {
        push(TokenType::Completion, completion);
    }
    rows
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
