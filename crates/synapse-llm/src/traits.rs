//! The [`LlmProvider`] trait and chat request types.

use async_trait::async_trait;
use futures::stream::BoxStream;
use tokio_util::sync::CancellationToken;

use synapse_core::events::StreamEvent;
use synapse_core::messages::ChatMessage;
use synapse_core::tools::ToolDefinition;

use crate::errors::Result;

/// A boxed stream of provider events.
///
/// Errors surface as [`StreamEvent::Error`] items so consumers handle a
/// single event shape; the stream ends after `Done` or `Error`.
pub type EventStream = BoxStream<'static, StreamEvent>;

/// One LLM call: history, tools, and sampling parameters.
///
/// All configuration is explicit call input — there is no hidden global
/// state behind a request.
#[derive(Clone, Debug)]
pub struct ChatRequest {
    /// Bare model name (provider prefix already stripped).
    pub model: String,
    /// Sampling temperature.
    pub temperature: f32,
    /// System instruction.
    pub system: String,
    /// Conversation history, oldest first.
    pub messages: Vec<ChatMessage>,
    /// Callable tool definitions for this step.
    pub tools: Vec<ToolDefinition>,
}

/// A streaming LLM provider.
///
/// Implementations stream incremental text and tool-call construction and
/// decide, based on model output, whether the step terminates with a plain
/// answer or with tool-call requests.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Provider name used in `provider/model` identifiers.
    fn name(&self) -> &str;

    /// Start one streaming chat completion.
    ///
    /// Fails fast (before yielding a stream) on configuration or connection
    /// errors; mid-stream failures arrive as [`StreamEvent::Error`] items.
    /// Cancelling `cancel` ends the stream promptly.
    async fn stream_chat(&self, request: ChatRequest, cancel: CancellationToken)
    -> Result<EventStream>;
}
