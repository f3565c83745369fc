//! # Finish Reason Mapping
//!
//! Maps provider-specific finish reasons to unified [`FinishReason`] values.
//! OpenAI-compatible APIs use:
//! - `"stop"` -> normal completion
//! - `"length"` -> max tokens reached
//! - `"tool_calls"` -> model wants to call tools
//! - `"content_filter"` -> blocked by safety filter
//! - `null` -> treated as normal completion

use synapse_core::events::FinishReason;

/// Map an OpenAI-style finish reason string to a unified [`FinishReason`].
pub fn map_finish_reason(reason: Option<&str>) -> FinishReason {
    match reason {
        Some("length") => FinishReason::Length,
        Some("tool_calls") => FinishReason::ToolCalls,
        Some("content_filter") => FinishReason::ContentFilter,
        Some("stop") | None => FinishReason::Stop,
        Some(_) => FinishReason::Other,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stop() {
        assert_eq!(map_finish_reason(Some("stop")), FinishReason::Stop);
    }

    #[test]
    fn length() {
        assert_eq!(map_finish_reason(Some("length")), FinishReason::Length);
    }

    #[test]
    fn tool_calls() {
        assert_eq!(map_finish_reason(Some("tool_calls")), FinishReason::ToolCalls);
    }

    #[test]
    fn content_filter() {
        assert_eq!(
            map_finish_reason(Some("content_filter")),
            FinishReason::ContentFilter
        );
    }

    #[test]
    fn null_defaults_to_stop() {
        assert_eq!(map_finish_reason(None), FinishReason::Stop);
    }

    #[test]
    fn unknown_maps_to_other() {
        assert_eq!(map_finish_reason(Some("something_new")), FinishReason::Other);
    }
}
